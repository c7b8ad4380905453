//! HTTP surface tests
//!
//! Drives the axum router directly with `tower::ServiceExt::oneshot`:
//! bearer-token auth, JSON bodies, and the stable error envelope.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use sqlx::sqlite::SqlitePoolOptions;
use tower::ServiceExt;
use uuid::Uuid;

use callsheet::access::Role;
use callsheet::{api, AppState};

struct Harness {
    state: Arc<AppState>,
    owner_token: String,
}

async fn setup() -> Harness {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    let state = AppState::new(pool);

    let owner = Uuid::new_v4();
    let owner_token = "owner-token".to_string();
    state.store.insert_token(&owner_token, owner).await.unwrap();

    Harness { state, owner_token }
}

async fn token_for(h: &Harness, user: Uuid) -> String {
    let token = format!("token-{}", user);
    h.state.store.insert_token(&token, user).await.unwrap();
    token
}

fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(h: &Harness, req: Request<Body>) -> (StatusCode, Value) {
    let response = api::router(h.state.clone()).oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::String(
            String::from_utf8_lossy(&bytes).into_owned(),
        ))
    };
    (status, value)
}

/// Provision root -> department -> committee -> team over the API and
/// return (committee_id, team_id, lead_token, coordinator_token).
async fn provision_tree(h: &Harness) -> (Uuid, Uuid, String, String) {
    let event = Uuid::new_v4();
    let (status, root) = send(
        h,
        request(
            "POST",
            "/api/workspaces",
            Some(&h.owner_token),
            Some(json!({"name": "Summit", "event_id": event})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let root_id: Uuid = root["id"].as_str().unwrap().parse().unwrap();

    let (status, dept) = send(
        h,
        request(
            "POST",
            "/api/workspaces",
            Some(&h.owner_token),
            Some(json!({"name": "Ops", "parent_workspace_id": root_id})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let dept_id: Uuid = dept["id"].as_str().unwrap().parse().unwrap();

    let manager = Uuid::new_v4();
    let manager_token = token_for(h, manager).await;
    let (status, _) = send(
        h,
        request(
            "PUT",
            &format!("/api/workspaces/{}/members", dept_id),
            Some(&h.owner_token),
            Some(json!({"user_id": manager, "role": "operations_manager"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, committee) = send(
        h,
        request(
            "POST",
            "/api/workspaces",
            Some(&manager_token),
            Some(json!({"name": "Stage", "parent_workspace_id": dept_id})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let committee_id: Uuid = committee["id"].as_str().unwrap().parse().unwrap();

    let lead = Uuid::new_v4();
    let lead_token = token_for(h, lead).await;
    let (status, _) = send(
        h,
        request(
            "PUT",
            &format!("/api/workspaces/{}/members", committee_id),
            Some(&manager_token),
            Some(json!({"user_id": lead, "role": "event_lead"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, team) = send(
        h,
        request(
            "POST",
            "/api/workspaces",
            Some(&lead_token),
            Some(json!({"name": "Crew", "parent_workspace_id": committee_id})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let team_id: Uuid = team["id"].as_str().unwrap().parse().unwrap();

    let coordinator = Uuid::new_v4();
    let coordinator_token = token_for(h, coordinator).await;
    let (status, _) = send(
        h,
        request(
            "PUT",
            &format!("/api/workspaces/{}/members", team_id),
            Some(&lead_token),
            Some(json!({"user_id": coordinator, "role": "event_coordinator"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    (committee_id, team_id, lead_token, coordinator_token)
}

#[tokio::test]
async fn health_needs_no_auth() {
    let h = setup().await;
    let (status, body) = send(&h, request("GET", "/health", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("ok".to_string()));
}

#[tokio::test]
async fn missing_token_is_unauthorized() {
    let h = setup().await;
    let (status, body) = send(
        &h,
        request(
            "POST",
            "/api/workspaces",
            None,
            Some(json!({"name": "X", "event_id": Uuid::new_v4()})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn unknown_token_is_unauthorized() {
    let h = setup().await;
    let (status, _) = send(
        &h,
        request(
            "POST",
            "/api/workspaces",
            Some("bogus"),
            Some(json!({"name": "X", "event_id": Uuid::new_v4()})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn role_matrix_projection() {
    let h = setup().await;
    let (status, body) = send(&h, request("GET", "/api/roles", None, None)).await;
    assert_eq!(status, StatusCode::OK);

    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 5);
    assert_eq!(rows[0]["role"], "workspace_owner");
    assert_eq!(rows[0]["manages"], json!(["operations_manager"]));
}

#[tokio::test]
async fn can_manage_projection_matches_rule() {
    let h = setup().await;

    let (status, body) = send(
        &h,
        request(
            "GET",
            "/api/roles/can-manage?acting=event_lead&target=event_coordinator",
            None,
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["can_manage"], json!(true));

    let (_, body) = send(
        &h,
        request(
            "GET",
            "/api/roles/can-manage?acting=workspace_owner&target=event_coordinator",
            None,
            None,
        ),
    )
    .await;
    assert_eq!(body["can_manage"], json!(false));
}

#[tokio::test]
async fn authorize_probe_reports_decision() {
    let h = setup().await;
    let (committee, _, lead_token, _) = provision_tree(&h).await;

    let (status, body) = send(
        &h,
        request(
            "GET",
            &format!(
                "/api/authorize?workspace_id={}&capability=assign_tasks",
                committee
            ),
            Some(&lead_token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["allowed"], json!(true));
    assert_eq!(body["role"], "event_lead");

    // The owner has no membership in the committee: allowed=false, not 403.
    let (status, body) = send(
        &h,
        request(
            "GET",
            &format!(
                "/api/authorize?workspace_id={}&capability=assign_tasks",
                committee
            ),
            Some(&h.owner_token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["allowed"], json!(false));
}

#[tokio::test]
async fn delegation_flow_over_http() {
    let h = setup().await;
    let (committee, team, lead_token, coordinator_token) = provision_tree(&h).await;

    let (status, item) = send(
        &h,
        request(
            "POST",
            "/api/delegations",
            Some(&lead_token),
            Some(json!({
                "source_workspace_id": committee,
                "target_workspace_id": team,
                "title": "Staff the desk",
                "description": "Two volunteers per shift",
                "is_synced": true,
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(item["delegation_status"], "pending_accept");
    let item_id = item["id"].as_str().unwrap();

    let (status, item) = send(
        &h,
        request(
            "POST",
            &format!("/api/delegations/{}/decision", item_id),
            Some(&coordinator_token),
            Some(json!({"accept": true})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(item["delegation_status"], "accepted");

    let (status, item) = send(
        &h,
        request(
            "POST",
            &format!("/api/delegations/{}/advance", item_id),
            Some(&coordinator_token),
            Some(json!({"status": "in_progress"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(item["delegation_status"], "in_progress");

    // Skipping straight from in_progress back to accepted is a conflict.
    let (status, body) = send(
        &h,
        request(
            "POST",
            &format!("/api/delegations/{}/decision", item_id),
            Some(&coordinator_token),
            Some(json!({"accept": false})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "forbidden_transition");

    let (status, item) = send(
        &h,
        request(
            "POST",
            &format!("/api/delegations/{}/advance", item_id),
            Some(&coordinator_token),
            Some(json!({"status": "completed"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(item["delegation_status"], "completed");
}

#[tokio::test]
async fn delegation_forbidden_for_marketing_lead() {
    let h = setup().await;
    let (committee, team, _lead_token, _) = provision_tree(&h).await;

    // Seed a marketing lead next to the event lead.
    let marketer = Uuid::new_v4();
    let marketer_token = token_for(&h, marketer).await;
    h.state
        .store
        .upsert_membership(
            committee,
            marketer,
            Role::MarketingLead,
            callsheet::models::MembershipStatus::Active,
        )
        .await
        .unwrap();

    let (status, body) = send(
        &h,
        request(
            "POST",
            "/api/delegations",
            Some(&marketer_token),
            Some(json!({
                "source_workspace_id": committee,
                "target_workspace_id": team,
                "title": "Posters",
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");
    assert!(body["reason"].as_str().unwrap().contains("assign_tasks"));
}

#[tokio::test]
async fn budget_flow_over_http() {
    let h = setup().await;
    let (committee, team, lead_token, coordinator_token) = provision_tree(&h).await;

    let (status, req_body) = send(
        &h,
        request(
            "POST",
            "/api/budget/requests",
            Some(&coordinator_token),
            Some(json!({
                "requesting_workspace_id": team,
                "target_workspace_id": committee,
                "amount": 5000,
                "reason": "AV rentals",
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(req_body["status"], "pending");
    let request_id = req_body["id"].as_str().unwrap();

    let (status, reviewed) = send(
        &h,
        request(
            "POST",
            &format!("/api/budget/requests/{}/review", request_id),
            Some(&lead_token),
            Some(json!({"approve": true, "notes": "go ahead"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reviewed["status"], "approved");

    // Second review conflicts.
    let (status, body) = send(
        &h,
        request(
            "POST",
            &format!("/api/budget/requests/{}/review", request_id),
            Some(&lead_token),
            Some(json!({"approve": false})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "already_reviewed");

    let (status, forecast) = send(
        &h,
        request(
            "GET",
            &format!("/api/workspaces/{}/forecast", team),
            Some(&coordinator_token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(forecast["allocated"], 5000);
    assert_eq!(forecast["used"], 0);
    assert_eq!(forecast["health"], "healthy");
}

#[tokio::test]
async fn invalid_budget_amount_is_bad_request() {
    let h = setup().await;
    let (committee, team, _, coordinator_token) = provision_tree(&h).await;

    let (status, body) = send(
        &h,
        request(
            "POST",
            "/api/budget/requests",
            Some(&coordinator_token),
            Some(json!({
                "requesting_workspace_id": team,
                "target_workspace_id": committee,
                "amount": 0,
                "reason": "nothing",
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_amount");
}

#[tokio::test]
async fn template_catalog_and_application_over_http() {
    let h = setup().await;
    let (committee, _, lead_token, _) = provision_tree(&h).await;

    let (status, sets) = send(&h, request("GET", "/api/templates", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = sets
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["id"].as_str().unwrap())
        .collect();
    assert!(ids.contains(&"conference"));

    let (status, body) = send(
        &h,
        request(
            "POST",
            &format!("/api/workspaces/{}/apply-template", committee),
            Some(&lead_token),
            Some(json!({
                "template_set_id": "conference",
                "start_date": "2025-06-01T00:00:00Z",
                "event_duration_days": 30,
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let created = body["created"].as_u64().unwrap();
    assert!(created > 0);

    let tasks = h.state.store.tasks_for_workspace(committee).await.unwrap();
    assert_eq!(tasks.len() as u64, created);

    // Unknown set comes back as a typed 404.
    let (status, body) = send(
        &h,
        request(
            "POST",
            &format!("/api/workspaces/{}/apply-template", committee),
            Some(&lead_token),
            Some(json!({"template_set_id": "festival"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "template_set_not_found");
}

#[tokio::test]
async fn archive_refuses_while_children_active() {
    let h = setup().await;
    let event = Uuid::new_v4();
    let (_, root) = send(
        &h,
        request(
            "POST",
            "/api/workspaces",
            Some(&h.owner_token),
            Some(json!({"name": "Summit", "event_id": event})),
        ),
    )
    .await;
    let root_id = root["id"].as_str().unwrap().to_string();
    send(
        &h,
        request(
            "POST",
            "/api/workspaces",
            Some(&h.owner_token),
            Some(json!({"name": "Ops", "parent_workspace_id": root_id})),
        ),
    )
    .await;

    let (status, body) = send(
        &h,
        request(
            "POST",
            &format!("/api/workspaces/{}/archive", root_id),
            Some(&h.owner_token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");
}
