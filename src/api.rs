//! HTTP surface over the coordination engines
//!
//! Thin JSON handlers: resolve the bearer token to an actor, hand the
//! request to the matching engine, serialize its result. All authorization
//! lives behind the engine calls.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::access::{Capability, Role, RoleSummary};
use crate::budget::{BudgetForecast, BudgetRequest, Expense};
use crate::delegation::{
    DeadlineExtensionRequest, DelegatedItem, DelegationDraft, DelegationStatus, SourceEdits,
};
use crate::error::{AppError, Result};
use crate::models::{Membership, Workspace};
use crate::templates::{ApplyOptions, TaskTemplateSet};
use crate::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/workspaces", post(create_workspace))
        .route("/api/workspaces/:id/archive", post(archive_workspace))
        .route("/api/workspaces/:id/members", put(assign_member))
        .route(
            "/api/workspaces/:id/members/:user_id",
            axum::routing::delete(remove_member),
        )
        .route("/api/authorize", get(authorize_probe))
        .route("/api/roles", get(role_matrix))
        .route("/api/roles/can-manage", get(can_manage))
        .route("/api/delegations", post(create_delegation))
        .route("/api/delegations/:id/decision", post(decide_delegation))
        .route("/api/delegations/:id/advance", post(advance_delegation))
        .route("/api/delegations/:id", axum::routing::patch(edit_delegation))
        .route("/api/delegations/:id/extensions", post(request_extension))
        .route("/api/extensions/:id/review", post(review_extension))
        .route("/api/budget/requests", post(submit_budget_request))
        .route("/api/budget/requests/:id/review", post(review_budget_request))
        .route("/api/workspaces/:id/expenses", post(record_expense))
        .route("/api/expenses/:id/settle", post(settle_expense))
        .route("/api/workspaces/:id/forecast", get(forecast))
        .route("/api/templates", get(available_templates))
        .route("/api/workspaces/:id/apply-template", post(apply_template))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

/// Resolve the Authorization bearer token to an actor id.
async fn actor(state: &AppState, headers: &HeaderMap) -> Result<Uuid> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::Unauthorized("missing bearer token".to_string()))?;

    state
        .identity
        .resolve(token)
        .await?
        .ok_or_else(|| AppError::Unauthorized("unknown token".to_string()))
}

// Workspace provisioning

#[derive(Debug, Deserialize)]
struct CreateWorkspaceRequest {
    name: String,
    /// Required for ROOT workspaces, ignored otherwise.
    event_id: Option<Uuid>,
    parent_workspace_id: Option<Uuid>,
}

async fn create_workspace(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateWorkspaceRequest>,
) -> Result<Json<Workspace>> {
    let actor_id = actor(&state, &headers).await?;
    let workspace = match body.parent_workspace_id {
        Some(parent) => {
            state
                .provisioning
                .provision_child(parent, &body.name, actor_id)
                .await?
        }
        None => {
            let event_id = body.event_id.ok_or_else(|| {
                AppError::BadRequest("event_id is required for a root workspace".to_string())
            })?;
            state
                .provisioning
                .provision_root(event_id, &body.name, actor_id)
                .await?
        }
    };
    Ok(Json(workspace))
}

async fn archive_workspace(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<Workspace>> {
    let actor_id = actor(&state, &headers).await?;
    Ok(Json(state.provisioning.archive(id, actor_id).await?))
}

#[derive(Debug, Deserialize)]
struct AssignMemberRequest {
    user_id: Uuid,
    role: Role,
}

async fn assign_member(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(body): Json<AssignMemberRequest>,
) -> Result<Json<Membership>> {
    let actor_id = actor(&state, &headers).await?;
    let membership = state
        .provisioning
        .assign_role(id, body.user_id, body.role, actor_id)
        .await?;
    Ok(Json(membership))
}

async fn remove_member(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<serde_json::Value>> {
    let actor_id = actor(&state, &headers).await?;
    state
        .provisioning
        .remove_member(id, user_id, actor_id)
        .await?;
    Ok(Json(serde_json::json!({"removed": true})))
}

// Access-control projections

#[derive(Debug, Deserialize)]
struct AuthorizeQuery {
    workspace_id: Uuid,
    capability: Capability,
}

#[derive(Debug, Serialize)]
struct AuthorizeResponse {
    allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

async fn authorize_probe(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<AuthorizeQuery>,
) -> Result<Json<AuthorizeResponse>> {
    let actor_id = actor(&state, &headers).await?;
    let response = match state
        .access
        .authorize(actor_id, query.workspace_id, query.capability)
        .await
    {
        Ok(role) => AuthorizeResponse {
            allowed: true,
            role: Some(role),
            reason: None,
        },
        Err(err @ (AppError::NotAMember(_) | AppError::Forbidden(_))) => AuthorizeResponse {
            allowed: false,
            role: None,
            reason: Some(err.to_string()),
        },
        Err(other) => return Err(other),
    };
    Ok(Json(response))
}

async fn role_matrix(State(state): State<Arc<AppState>>) -> Json<Vec<RoleSummary>> {
    Json(state.access.matrix().summary())
}

#[derive(Debug, Deserialize)]
struct CanManageQuery {
    acting: Role,
    target: Role,
}

#[derive(Debug, Serialize)]
struct CanManageResponse {
    can_manage: bool,
}

async fn can_manage(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CanManageQuery>,
) -> Json<CanManageResponse> {
    Json(CanManageResponse {
        can_manage: state.access.can_manage(query.acting, query.target),
    })
}

// Delegation

#[derive(Debug, Deserialize)]
struct CreateDelegationRequest {
    source_workspace_id: Uuid,
    target_workspace_id: Uuid,
    title: String,
    #[serde(default)]
    description: String,
    due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    is_synced: bool,
}

async fn create_delegation(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateDelegationRequest>,
) -> Result<Json<DelegatedItem>> {
    let actor_id = actor(&state, &headers).await?;
    let item = state
        .delegation
        .delegate(
            body.source_workspace_id,
            body.target_workspace_id,
            DelegationDraft {
                title: body.title,
                description: body.description,
                due_date: body.due_date,
                is_synced: body.is_synced,
            },
            actor_id,
        )
        .await?;
    Ok(Json(item))
}

#[derive(Debug, Deserialize)]
struct DecisionRequest {
    accept: bool,
}

async fn decide_delegation(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(body): Json<DecisionRequest>,
) -> Result<Json<DelegatedItem>> {
    let actor_id = actor(&state, &headers).await?;
    let item = state
        .delegation
        .accept_or_reject(id, actor_id, body.accept)
        .await?;
    Ok(Json(item))
}

#[derive(Debug, Deserialize)]
struct AdvanceRequest {
    status: DelegationStatus,
}

async fn advance_delegation(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(body): Json<AdvanceRequest>,
) -> Result<Json<DelegatedItem>> {
    let actor_id = actor(&state, &headers).await?;
    let item = state.delegation.advance(id, body.status, actor_id).await?;
    Ok(Json(item))
}

#[derive(Debug, Deserialize)]
struct EditDelegationRequest {
    title: Option<String>,
    description: Option<String>,
    due_date: Option<DateTime<Utc>>,
}

async fn edit_delegation(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(body): Json<EditDelegationRequest>,
) -> Result<Json<DelegatedItem>> {
    let actor_id = actor(&state, &headers).await?;
    let item = state
        .delegation
        .sync_from_source(
            id,
            SourceEdits {
                title: body.title,
                description: body.description,
                due_date: body.due_date,
            },
            actor_id,
        )
        .await?;
    Ok(Json(item))
}

#[derive(Debug, Deserialize)]
struct ExtensionRequestBody {
    requested_due_date: DateTime<Utc>,
    justification: String,
}

async fn request_extension(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(body): Json<ExtensionRequestBody>,
) -> Result<Json<DeadlineExtensionRequest>> {
    let actor_id = actor(&state, &headers).await?;
    let request = state
        .delegation
        .request_extension(id, body.requested_due_date, body.justification, actor_id)
        .await?;
    Ok(Json(request))
}

#[derive(Debug, Deserialize)]
struct ReviewRequest {
    approve: bool,
}

async fn review_extension(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(body): Json<ReviewRequest>,
) -> Result<Json<DeadlineExtensionRequest>> {
    let actor_id = actor(&state, &headers).await?;
    let request = state
        .delegation
        .review_extension(id, body.approve, actor_id)
        .await?;
    Ok(Json(request))
}

// Budget workflow

#[derive(Debug, Deserialize)]
struct BudgetRequestBody {
    requesting_workspace_id: Uuid,
    target_workspace_id: Uuid,
    amount: i64,
    reason: String,
}

async fn submit_budget_request(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<BudgetRequestBody>,
) -> Result<Json<BudgetRequest>> {
    let actor_id = actor(&state, &headers).await?;
    let request = state
        .budget
        .submit_request(
            body.requesting_workspace_id,
            body.target_workspace_id,
            body.amount,
            body.reason,
            actor_id,
        )
        .await?;
    Ok(Json(request))
}

#[derive(Debug, Deserialize)]
struct BudgetReviewBody {
    approve: bool,
    notes: Option<String>,
}

async fn review_budget_request(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(body): Json<BudgetReviewBody>,
) -> Result<Json<BudgetRequest>> {
    let actor_id = actor(&state, &headers).await?;
    let request = state
        .budget
        .review(id, body.approve, actor_id, body.notes)
        .await?;
    Ok(Json(request))
}

#[derive(Debug, Deserialize)]
struct ExpenseBody {
    amount: i64,
    #[serde(default)]
    description: String,
}

async fn record_expense(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(body): Json<ExpenseBody>,
) -> Result<Json<Expense>> {
    let actor_id = actor(&state, &headers).await?;
    let expense = state
        .budget
        .record_expense(id, body.amount, body.description, actor_id)
        .await?;
    Ok(Json(expense))
}

async fn settle_expense(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<Expense>> {
    let actor_id = actor(&state, &headers).await?;
    Ok(Json(state.budget.settle_expense(id, actor_id).await?))
}

async fn forecast(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<BudgetForecast>> {
    let actor_id = actor(&state, &headers).await?;
    Ok(Json(state.budget.forecast(id, actor_id).await?))
}

// Templates

async fn available_templates(State(state): State<Arc<AppState>>) -> Json<Vec<TaskTemplateSet>> {
    Json(state.templates.available_sets())
}

#[derive(Debug, Deserialize)]
struct ApplyTemplateRequest {
    template_set_id: String,
    start_date: Option<DateTime<Utc>>,
    event_duration_days: Option<i64>,
    #[serde(default)]
    skip_template_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ApplyTemplateResponse {
    created: u32,
}

async fn apply_template(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(body): Json<ApplyTemplateRequest>,
) -> Result<Json<ApplyTemplateResponse>> {
    let actor_id = actor(&state, &headers).await?;
    let created = state
        .templates
        .apply(
            id,
            &body.template_set_id,
            actor_id,
            ApplyOptions {
                start_date: body.start_date,
                event_duration_days: body.event_duration_days.unwrap_or(30),
                skip_template_ids: body.skip_template_ids,
            },
        )
        .await?;
    Ok(Json(ApplyTemplateResponse { created }))
}
