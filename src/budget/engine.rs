//! Budget workflow engine
//!
//! Moves budget requests from a child workspace up to a managing ancestor
//! and, on approval, grows the requester's ledger in the same transaction
//! that stamps the decision. Forecasting is a read-only projection over the
//! ledger and pending expenses; its health bands advise, never block.

use chrono::Utc;
use uuid::Uuid;

use super::ledger::{BudgetForecast, BudgetRequest, BudgetRequestStatus, Expense, ExpenseStatus};
use crate::access::{AccessControlEngine, Capability};
use crate::error::{AppError, Result};
use crate::events::{EngineEvent, EventBus};
use crate::hierarchy::HierarchyModel;
use crate::store::Store;

const DEFAULT_CURRENCY: &str = "INR";

#[derive(Clone)]
pub struct BudgetWorkflowEngine {
    store: Store,
    access: AccessControlEngine,
    events: EventBus,
}

impl BudgetWorkflowEngine {
    pub fn new(store: Store, access: AccessControlEngine, events: EventBus) -> Self {
        Self {
            store,
            access,
            events,
        }
    }

    async fn currency_for(&self, workspace_id: Uuid) -> Result<String> {
        Ok(self
            .store
            .get_ledger(workspace_id)
            .await?
            .map(|l| l.currency)
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()))
    }

    /// Submit a request for funds to an ancestor workspace.
    pub async fn submit_request(
        &self,
        requesting_workspace_id: Uuid,
        target_workspace_id: Uuid,
        amount: i64,
        reason: impl Into<String>,
        actor_id: Uuid,
    ) -> Result<BudgetRequest> {
        if amount <= 0 {
            return Err(AppError::InvalidAmount(format!(
                "requested amount must be positive, got {}",
                amount
            )));
        }

        self.access
            .authorize(actor_id, requesting_workspace_id, Capability::EditSettings)
            .await?;

        let workspace = self.store.get_workspace(requesting_workspace_id).await?;
        let hierarchy =
            HierarchyModel::new(self.store.workspaces_for_event(workspace.event_id).await?);
        if hierarchy.get(target_workspace_id).is_none()
            || !hierarchy.is_descendant(requesting_workspace_id, target_workspace_id)?
        {
            return Err(AppError::NotADescendant(format!(
                "workspace {} is not an ancestor of {}",
                target_workspace_id, requesting_workspace_id
            )));
        }

        let request = BudgetRequest {
            id: Uuid::new_v4(),
            requesting_workspace_id,
            target_workspace_id,
            requested_amount: amount,
            reason: reason.into(),
            status: BudgetRequestStatus::Pending,
            requested_by: actor_id,
            reviewed_by: None,
            reviewed_at: None,
            review_notes: None,
            created_at: Utc::now(),
        };
        self.store.insert_budget_request(&request).await?;

        self.events.emit(EngineEvent::BudgetRequested {
            request_id: request.id,
            requesting_workspace_id,
            target_workspace_id,
            amount,
        });

        Ok(request)
    }

    /// Decide a pending request. The reviewer must hold budget approval in
    /// the target workspace. Exactly one of two concurrent reviewers wins;
    /// the loser gets `AlreadyReviewed` and the ledger grows exactly once.
    pub async fn review(
        &self,
        request_id: Uuid,
        approve: bool,
        reviewer_id: Uuid,
        notes: Option<String>,
    ) -> Result<BudgetRequest> {
        let request = self.store.get_budget_request(request_id).await?;
        self.access
            .authorize(
                reviewer_id,
                request.target_workspace_id,
                Capability::ApproveBudget,
            )
            .await?;

        let currency = self.currency_for(request.requesting_workspace_id).await?;
        let decided = self
            .store
            .decide_budget_request(
                request_id,
                approve,
                reviewer_id,
                notes.as_deref(),
                request.requesting_workspace_id,
                request.requested_amount,
                &currency,
            )
            .await?;
        if !decided {
            return Err(AppError::AlreadyReviewed(format!(
                "budget request {} was already decided",
                request_id
            )));
        }

        self.events.emit(EngineEvent::BudgetReviewed {
            request_id,
            approved: approve,
            reviewer_id,
        });

        self.store.get_budget_request(request_id).await
    }

    /// Record a pending expense; it feeds the projection until settled.
    pub async fn record_expense(
        &self,
        workspace_id: Uuid,
        amount: i64,
        description: impl Into<String>,
        actor_id: Uuid,
    ) -> Result<Expense> {
        if amount <= 0 {
            return Err(AppError::InvalidAmount(format!(
                "expense amount must be positive, got {}",
                amount
            )));
        }

        self.access
            .authorize(actor_id, workspace_id, Capability::EditSettings)
            .await?;

        let expense = Expense {
            id: Uuid::new_v4(),
            workspace_id,
            amount,
            description: description.into(),
            status: ExpenseStatus::Pending,
            created_at: Utc::now(),
            settled_at: None,
        };
        self.store.insert_expense(&expense).await?;
        Ok(expense)
    }

    /// Settle a pending expense, moving its amount into the ledger's
    /// `used`. Guarded: settling twice is refused.
    pub async fn settle_expense(&self, expense_id: Uuid, actor_id: Uuid) -> Result<Expense> {
        let expense = self.store.get_expense(expense_id).await?;
        self.access
            .authorize(actor_id, expense.workspace_id, Capability::EditSettings)
            .await?;

        let currency = self.currency_for(expense.workspace_id).await?;
        let settled = self.store.settle_expense(expense_id, &currency).await?;
        if !settled {
            return Err(AppError::AlreadyReviewed(format!(
                "expense {} was already settled",
                expense_id
            )));
        }

        self.events.emit(EngineEvent::ExpenseSettled {
            expense_id,
            workspace_id: expense.workspace_id,
            amount: expense.amount,
        });

        self.store.get_expense(expense_id).await
    }

    /// Read-only budget projection for one workspace. A missing ledger
    /// reads as zeros.
    pub async fn forecast(&self, workspace_id: Uuid, actor_id: Uuid) -> Result<BudgetForecast> {
        self.access
            .authorize(actor_id, workspace_id, Capability::ViewReports)
            .await?;

        let (allocated, used) = match self.store.get_ledger(workspace_id).await? {
            Some(ledger) => (ledger.allocated, ledger.used),
            None => (0, 0),
        };
        let pending = self.store.pending_expense_total(workspace_id).await?;

        Ok(BudgetForecast::compute(workspace_id, allocated, used, pending))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{Role, RoleCapabilityMatrix};
    use crate::budget::HealthBand;
    use crate::models::MembershipStatus;
    use crate::store::test_support::{memory_store, seed_tree, SeededTree};
    use std::sync::Arc;

    struct Fixture {
        engine: BudgetWorkflowEngine,
        store: Store,
        tree: SeededTree,
        coordinator: Uuid,
        lead: Uuid,
        marketer: Uuid,
    }

    async fn fixture() -> Fixture {
        let store = memory_store().await;
        let tree = seed_tree(&store).await;

        let coordinator = Uuid::new_v4();
        let lead = Uuid::new_v4();
        let marketer = Uuid::new_v4();
        store
            .upsert_membership(
                tree.team,
                coordinator,
                Role::EventCoordinator,
                MembershipStatus::Active,
            )
            .await
            .unwrap();
        store
            .upsert_membership(tree.committee, lead, Role::EventLead, MembershipStatus::Active)
            .await
            .unwrap();
        store
            .upsert_membership(
                tree.committee,
                marketer,
                Role::MarketingLead,
                MembershipStatus::Active,
            )
            .await
            .unwrap();

        let access = AccessControlEngine::new(
            store.clone(),
            Arc::new(RoleCapabilityMatrix::builtin()),
        );
        let engine = BudgetWorkflowEngine::new(store.clone(), access, EventBus::new());

        Fixture {
            engine,
            store,
            tree,
            coordinator,
            lead,
            marketer,
        }
    }

    #[tokio::test]
    async fn test_submit_and_approve_creates_ledger() {
        let f = fixture().await;
        // TEAM requests 5000 from its COMMITTEE parent; the team has no
        // ledger row yet.
        let request = f
            .engine
            .submit_request(f.tree.team, f.tree.committee, 5_000, "AV rentals", f.coordinator)
            .await
            .unwrap();
        assert_eq!(request.status, BudgetRequestStatus::Pending);

        let reviewed = f
            .engine
            .review(request.id, true, f.lead, Some("approved".to_string()))
            .await
            .unwrap();
        assert_eq!(reviewed.status, BudgetRequestStatus::Approved);
        assert_eq!(reviewed.reviewed_by, Some(f.lead));
        assert!(reviewed.reviewed_at.is_some());

        let ledger = f.store.get_ledger(f.tree.team).await.unwrap().unwrap();
        assert_eq!(ledger.allocated, 5_000);
        assert_eq!(ledger.used, 0);
    }

    #[tokio::test]
    async fn test_approval_accumulates_allocation() {
        let f = fixture().await;
        for amount in [1_000, 2_500] {
            let request = f
                .engine
                .submit_request(f.tree.team, f.tree.committee, amount, "supplies", f.coordinator)
                .await
                .unwrap();
            f.engine.review(request.id, true, f.lead, None).await.unwrap();
        }

        let ledger = f.store.get_ledger(f.tree.team).await.unwrap().unwrap();
        assert_eq!(ledger.allocated, 3_500);
    }

    #[tokio::test]
    async fn test_rejection_mutates_nothing() {
        let f = fixture().await;
        let request = f
            .engine
            .submit_request(f.tree.team, f.tree.committee, 5_000, "AV", f.coordinator)
            .await
            .unwrap();

        let reviewed = f
            .engine
            .review(request.id, false, f.lead, Some("over scope".to_string()))
            .await
            .unwrap();
        assert_eq!(reviewed.status, BudgetRequestStatus::Rejected);
        assert_eq!(reviewed.review_notes.as_deref(), Some("over scope"));
        assert!(f.store.get_ledger(f.tree.team).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_second_review_gets_already_reviewed() {
        let f = fixture().await;
        let request = f
            .engine
            .submit_request(f.tree.team, f.tree.committee, 5_000, "AV", f.coordinator)
            .await
            .unwrap();

        f.engine.review(request.id, true, f.lead, None).await.unwrap();
        let result = f.engine.review(request.id, false, f.lead, None).await;
        assert!(matches!(result, Err(AppError::AlreadyReviewed(_))));

        let ledger = f.store.get_ledger(f.tree.team).await.unwrap().unwrap();
        assert_eq!(ledger.allocated, 5_000);
    }

    #[tokio::test]
    async fn test_amount_must_be_positive() {
        let f = fixture().await;
        for amount in [0, -500] {
            let result = f
                .engine
                .submit_request(f.tree.team, f.tree.committee, amount, "bad", f.coordinator)
                .await;
            assert!(matches!(result, Err(AppError::InvalidAmount(_))));
        }
    }

    #[tokio::test]
    async fn test_target_must_be_ancestor() {
        let f = fixture().await;
        // Committee member asking its own child for funds: not an ancestor.
        let result = f
            .engine
            .submit_request(f.tree.committee, f.tree.team, 1_000, "down", f.lead)
            .await;
        assert!(matches!(result, Err(AppError::NotADescendant(_))));

        // Self is not an ancestor either.
        let result = f
            .engine
            .submit_request(f.tree.team, f.tree.team, 1_000, "self", f.coordinator)
            .await;
        assert!(matches!(result, Err(AppError::NotADescendant(_))));
    }

    #[tokio::test]
    async fn test_grandparent_target_is_allowed() {
        let f = fixture().await;
        let owner = Uuid::new_v4();
        f.store
            .upsert_membership(
                f.tree.department,
                owner,
                Role::OperationsManager,
                MembershipStatus::Active,
            )
            .await
            .unwrap();

        let request = f
            .engine
            .submit_request(f.tree.team, f.tree.department, 800, "skip a level", f.coordinator)
            .await
            .unwrap();
        let reviewed = f.engine.review(request.id, true, owner, None).await.unwrap();
        assert_eq!(reviewed.status, BudgetRequestStatus::Approved);
    }

    #[tokio::test]
    async fn test_reviewer_needs_approve_budget_in_target() {
        let f = fixture().await;
        let request = f
            .engine
            .submit_request(f.tree.team, f.tree.committee, 5_000, "AV", f.coordinator)
            .await
            .unwrap();

        // MarketingLead sits in the target workspace but cannot approve.
        let result = f.engine.review(request.id, true, f.marketer, None).await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));

        // The requester is not a member of the target at all.
        let result = f.engine.review(request.id, true, f.coordinator, None).await;
        assert!(matches!(result, Err(AppError::NotAMember(_))));
    }

    #[tokio::test]
    async fn test_forecast_bands() {
        let f = fixture().await;

        // Allocate 10_000 via an approved request.
        let request = f
            .engine
            .submit_request(f.tree.team, f.tree.committee, 10_000, "budget", f.coordinator)
            .await
            .unwrap();
        f.engine.review(request.id, true, f.lead, None).await.unwrap();

        // Settle 5_000 and leave 3_500 pending: 85% projected.
        let settled = f
            .engine
            .record_expense(f.tree.team, 5_000, "deposit", f.coordinator)
            .await
            .unwrap();
        f.engine
            .settle_expense(settled.id, f.coordinator)
            .await
            .unwrap();
        f.engine
            .record_expense(f.tree.team, 3_500, "pending vendor", f.coordinator)
            .await
            .unwrap();

        let forecast = f.engine.forecast(f.tree.team, f.coordinator).await.unwrap();
        assert_eq!(forecast.allocated, 10_000);
        assert_eq!(forecast.used, 5_000);
        assert_eq!(forecast.pending_expenses, 3_500);
        assert_eq!(forecast.projected_spend, 8_500);
        assert_eq!(forecast.health, HealthBand::High);
        assert!((forecast.utilization - 0.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_forecast_overage_never_blocks_recording() {
        let f = fixture().await;
        let request = f
            .engine
            .submit_request(f.tree.team, f.tree.committee, 1_000, "small", f.coordinator)
            .await
            .unwrap();
        f.engine.review(request.id, true, f.lead, None).await.unwrap();

        // Recording past the allocation succeeds; the projection reports it.
        f.engine
            .record_expense(f.tree.team, 2_000, "overrun", f.coordinator)
            .await
            .unwrap();
        let forecast = f.engine.forecast(f.tree.team, f.coordinator).await.unwrap();
        assert_eq!(forecast.health, HealthBand::OverBudget);
    }

    #[tokio::test]
    async fn test_forecast_without_ledger_reads_zeros() {
        let f = fixture().await;
        let forecast = f.engine.forecast(f.tree.team, f.coordinator).await.unwrap();
        assert_eq!(forecast.allocated, 0);
        assert_eq!(forecast.used, 0);
        assert_eq!(forecast.health, HealthBand::Healthy);
    }

    #[tokio::test]
    async fn test_settle_expense_twice() {
        let f = fixture().await;
        let expense = f
            .engine
            .record_expense(f.tree.team, 500, "prints", f.coordinator)
            .await
            .unwrap();

        f.engine
            .settle_expense(expense.id, f.coordinator)
            .await
            .unwrap();
        let result = f.engine.settle_expense(expense.id, f.coordinator).await;
        assert!(matches!(result, Err(AppError::AlreadyReviewed(_))));
    }

    #[tokio::test]
    async fn test_concurrent_reviews_commit_exactly_once() {
        let f = fixture().await;
        let request = f
            .engine
            .submit_request(f.tree.team, f.tree.committee, 5_000, "AV", f.coordinator)
            .await
            .unwrap();

        let second_lead = Uuid::new_v4();
        f.store
            .upsert_membership(
                f.tree.committee,
                second_lead,
                Role::EventLead,
                MembershipStatus::Active,
            )
            .await
            .unwrap();

        let (a, b) = tokio::join!(
            f.engine.review(request.id, true, f.lead, None),
            f.engine.review(request.id, true, second_lead, None),
        );

        let successes = [&a, &b].iter().filter(|r| r.is_ok()).count();
        let already = [&a, &b]
            .iter()
            .filter(|r| matches!(r, Err(AppError::AlreadyReviewed(_))))
            .count();
        assert_eq!(successes, 1);
        assert_eq!(already, 1);

        // The ledger grew by exactly one requested amount.
        let ledger = f.store.get_ledger(f.tree.team).await.unwrap().unwrap();
        assert_eq!(ledger.allocated, 5_000);
    }
}
