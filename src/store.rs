//! Database store for workspaces, delegation, budgets, and tasks
//!
//! All state transitions that can race (delegation status, extension and
//! budget reviews, expense settlement) are expressed as conditional updates
//! whose predicate carries the expected current status; callers interpret
//! the affected-row count. The store never checks in application code what
//! the predicate can check in SQL.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePool;
use uuid::Uuid;

use crate::access::Role;
use crate::budget::{
    BudgetLedger, BudgetRequest, BudgetRequestStatus, Expense, ExpenseStatus,
};
use crate::delegation::{
    DeadlineExtensionRequest, DelegatedItem, DelegationStatus, ExtensionStatus,
};
use crate::error::{AppError, Result};
use crate::models::{
    Membership, MembershipStatus, Workspace, WorkspaceLevel, WorkspaceStatus,
};
use crate::templates::{MaterializedTask, NewTask, TaskStatus};

/// Database store
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // Workspace operations

    pub async fn create_workspace(
        &self,
        event_id: Uuid,
        name: &str,
        level: WorkspaceLevel,
        parent_workspace_id: Option<Uuid>,
    ) -> Result<Workspace> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO workspaces (id, event_id, name, level, parent_workspace_id, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(event_id.to_string())
        .bind(name)
        .bind(level.as_str())
        .bind(parent_workspace_id.map(|u| u.to_string()))
        .bind(WorkspaceStatus::Active.as_str())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(Workspace {
            id,
            event_id,
            name: name.to_string(),
            level,
            parent_workspace_id,
            status: WorkspaceStatus::Active,
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn get_workspace(&self, id: Uuid) -> Result<Workspace> {
        let row = sqlx::query_as::<_, WorkspaceRow>(
            r#"
            SELECT id, event_id, name, level, parent_workspace_id, status, created_at, updated_at
            FROM workspaces
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Workspace {} not found", id)))?;

        row.try_into()
    }

    pub async fn workspaces_for_event(&self, event_id: Uuid) -> Result<Vec<Workspace>> {
        let rows = sqlx::query_as::<_, WorkspaceRow>(
            r#"
            SELECT id, event_id, name, level, parent_workspace_id, status, created_at, updated_at
            FROM workspaces
            WHERE event_id = ?
            ORDER BY created_at ASC
            "#,
        )
        .bind(event_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }

    pub async fn set_workspace_status(&self, id: Uuid, status: WorkspaceStatus) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE workspaces SET status = ?, updated_at = ? WHERE id = ?
            "#,
        )
        .bind(status.as_str())
        .bind(Utc::now())
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn count_active_children(&self, id: Uuid) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM workspaces
            WHERE parent_workspace_id = ? AND status = 'active'
            "#,
        )
        .bind(id.to_string())
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    // Membership operations

    pub async fn upsert_membership(
        &self,
        workspace_id: Uuid,
        user_id: Uuid,
        role: Role,
        status: MembershipStatus,
    ) -> Result<Membership> {
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO memberships (workspace_id, user_id, role, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(workspace_id, user_id)
            DO UPDATE SET role = excluded.role, status = excluded.status, updated_at = excluded.updated_at
            "#,
        )
        .bind(workspace_id.to_string())
        .bind(user_id.to_string())
        .bind(role.as_str())
        .bind(status.as_str())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(Membership {
            workspace_id,
            user_id,
            role,
            status,
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn get_membership(
        &self,
        workspace_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Membership>> {
        let row = sqlx::query_as::<_, MembershipRow>(
            r#"
            SELECT workspace_id, user_id, role, status, created_at, updated_at
            FROM memberships
            WHERE workspace_id = ? AND user_id = ?
            "#,
        )
        .bind(workspace_id.to_string())
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.try_into()).transpose()
    }

    pub async fn members_of(&self, workspace_id: Uuid) -> Result<Vec<Membership>> {
        let rows = sqlx::query_as::<_, MembershipRow>(
            r#"
            SELECT workspace_id, user_id, role, status, created_at, updated_at
            FROM memberships
            WHERE workspace_id = ?
            ORDER BY created_at ASC
            "#,
        )
        .bind(workspace_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }

    // Task operations

    pub async fn create_task(&self, draft: NewTask) -> Result<MaterializedTask> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let dependencies = serde_json::to_string(
            &draft.dependencies.iter().map(|u| u.to_string()).collect::<Vec<_>>(),
        )
        .map_err(|e| AppError::Internal(format!("Failed to encode dependencies: {}", e)))?;
        let tags = serde_json::to_string(&draft.tags)
            .map_err(|e| AppError::Internal(format!("Failed to encode tags: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO tasks (id, workspace_id, title, description, category, priority, due_date,
                               dependencies, tags, template_id, is_from_template,
                               estimated_duration_hours, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(draft.workspace_id.to_string())
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(draft.category.as_str())
        .bind(draft.priority.as_str())
        .bind(draft.due_date)
        .bind(&dependencies)
        .bind(&tags)
        .bind(draft.template_id.as_deref())
        .bind(draft.is_from_template)
        .bind(draft.estimated_duration_hours.map(|h| h as i64))
        .bind(TaskStatus::Open.as_str())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(MaterializedTask {
            id,
            workspace_id: draft.workspace_id,
            title: draft.title,
            description: draft.description,
            category: draft.category,
            priority: draft.priority,
            due_date: draft.due_date,
            dependencies: draft.dependencies,
            tags: draft.tags,
            template_id: draft.template_id,
            is_from_template: draft.is_from_template,
            estimated_duration_hours: draft.estimated_duration_hours,
            status: TaskStatus::Open,
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn get_task(&self, id: Uuid) -> Result<MaterializedTask> {
        let row = sqlx::query_as::<_, TaskRow>(
            r#"
            SELECT id, workspace_id, title, description, category, priority, due_date,
                   dependencies, tags, template_id, is_from_template,
                   estimated_duration_hours, status, created_at, updated_at
            FROM tasks
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Task {} not found", id)))?;

        row.try_into()
    }

    pub async fn tasks_for_workspace(&self, workspace_id: Uuid) -> Result<Vec<MaterializedTask>> {
        let rows = sqlx::query_as::<_, TaskRow>(
            r#"
            SELECT id, workspace_id, title, description, category, priority, due_date,
                   dependencies, tags, template_id, is_from_template,
                   estimated_duration_hours, status, created_at, updated_at
            FROM tasks
            WHERE workspace_id = ?
            ORDER BY created_at ASC
            "#,
        )
        .bind(workspace_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }

    /// Guarded open -> completed transition; false when the task was
    /// already completed.
    pub async fn complete_task(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE tasks SET status = 'completed', updated_at = ? WHERE id = ? AND status = 'open'
            "#,
        )
        .bind(Utc::now())
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    // Delegated item operations

    pub async fn insert_delegated_item(&self, item: &DelegatedItem) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO delegated_items (id, source_workspace_id, target_workspace_id, title,
                                         description, due_date, delegation_status, is_synced,
                                         mirror_task_id, created_by, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(item.id.to_string())
        .bind(item.source_workspace_id.to_string())
        .bind(item.target_workspace_id.to_string())
        .bind(&item.title)
        .bind(&item.description)
        .bind(item.due_date)
        .bind(item.delegation_status.as_str())
        .bind(item.is_synced)
        .bind(item.mirror_task_id.map(|u| u.to_string()))
        .bind(item.created_by.to_string())
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_delegated_item(&self, id: Uuid) -> Result<DelegatedItem> {
        let row = sqlx::query_as::<_, DelegatedItemRow>(
            r#"
            SELECT id, source_workspace_id, target_workspace_id, title, description, due_date,
                   delegation_status, is_synced, mirror_task_id, created_by, created_at, updated_at
            FROM delegated_items
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Delegated item {} not found", id)))?;

        row.try_into()
    }

    pub async fn delegations_for_target(&self, workspace_id: Uuid) -> Result<Vec<DelegatedItem>> {
        let rows = sqlx::query_as::<_, DelegatedItemRow>(
            r#"
            SELECT id, source_workspace_id, target_workspace_id, title, description, due_date,
                   delegation_status, is_synced, mirror_task_id, created_by, created_at, updated_at
            FROM delegated_items
            WHERE target_workspace_id = ?
            ORDER BY created_at ASC
            "#,
        )
        .bind(workspace_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }

    /// Guarded status transition. The allowed-from set rides in the UPDATE
    /// predicate so two racing actors cannot both move the item; false
    /// means the item was not in an allowed state.
    pub async fn transition_delegation(
        &self,
        id: Uuid,
        allowed_from: &[DelegationStatus],
        to: DelegationStatus,
    ) -> Result<bool> {
        let now = Utc::now();
        let result = match allowed_from {
            [only] => {
                sqlx::query(
                    r#"
                    UPDATE delegated_items SET delegation_status = ?, updated_at = ?
                    WHERE id = ? AND delegation_status = ?
                    "#,
                )
                .bind(to.as_str())
                .bind(now)
                .bind(id.to_string())
                .bind(only.as_str())
                .execute(&self.pool)
                .await?
            }
            [first, second] => {
                sqlx::query(
                    r#"
                    UPDATE delegated_items SET delegation_status = ?, updated_at = ?
                    WHERE id = ? AND delegation_status IN (?, ?)
                    "#,
                )
                .bind(to.as_str())
                .bind(now)
                .bind(id.to_string())
                .bind(first.as_str())
                .bind(second.as_str())
                .execute(&self.pool)
                .await?
            }
            _ => {
                return Err(AppError::Internal(format!(
                    "no transition into {} is defined",
                    to.as_str()
                )))
            }
        };

        Ok(result.rows_affected() > 0)
    }

    /// Source-side field edits; None leaves a column untouched.
    pub async fn update_delegation_fields(
        &self,
        id: Uuid,
        title: Option<&str>,
        description: Option<&str>,
        due_date: Option<DateTime<Utc>>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE delegated_items
            SET title = COALESCE(?, title),
                description = COALESCE(?, description),
                due_date = COALESCE(?, due_date),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(title)
        .bind(description)
        .bind(due_date)
        .bind(Utc::now())
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // Extension request operations

    /// Insert a new extension request. The partial unique index on
    /// (delegated_item_id) WHERE status = 'pending' turns a second open
    /// request into `ExtensionAlreadyPending`.
    pub async fn insert_extension_request(
        &self,
        request: &DeadlineExtensionRequest,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO extension_requests (id, delegated_item_id, requested_due_date,
                                            justification, status, requested_by, reviewer_id,
                                            created_at, resolved_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(request.id.to_string())
        .bind(request.delegated_item_id.to_string())
        .bind(request.requested_due_date)
        .bind(&request.justification)
        .bind(request.status.as_str())
        .bind(request.requested_by.to_string())
        .bind(request.reviewer_id.map(|u| u.to_string()))
        .bind(request.created_at)
        .bind(request.resolved_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e))
                if matches!(e.kind(), sqlx::error::ErrorKind::UniqueViolation) =>
            {
                Err(AppError::ExtensionAlreadyPending(format!(
                    "item {} already has an open extension request",
                    request.delegated_item_id
                )))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get_extension_request(&self, id: Uuid) -> Result<DeadlineExtensionRequest> {
        let row = sqlx::query_as::<_, ExtensionRow>(
            r#"
            SELECT id, delegated_item_id, requested_due_date, justification, status,
                   requested_by, reviewer_id, created_at, resolved_at
            FROM extension_requests
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Extension request {} not found", id)))?;

        row.try_into()
    }

    /// Decide a pending extension request. Approval rewrites the item's due
    /// date in the same transaction; false means the request was already
    /// decided.
    pub async fn decide_extension(
        &self,
        request_id: Uuid,
        approve: bool,
        reviewer_id: Uuid,
        delegated_item_id: Uuid,
        requested_due_date: DateTime<Utc>,
    ) -> Result<bool> {
        let now = Utc::now();
        let status = if approve {
            ExtensionStatus::Approved
        } else {
            ExtensionStatus::Rejected
        };

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE extension_requests
            SET status = ?, reviewer_id = ?, resolved_at = ?
            WHERE id = ? AND status = 'pending'
            "#,
        )
        .bind(status.as_str())
        .bind(reviewer_id.to_string())
        .bind(now)
        .bind(request_id.to_string())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        if approve {
            sqlx::query(
                r#"
                UPDATE delegated_items SET due_date = ?, updated_at = ? WHERE id = ?
                "#,
            )
            .bind(requested_due_date)
            .bind(now)
            .bind(delegated_item_id.to_string())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    // Budget operations

    pub async fn insert_budget_request(&self, request: &BudgetRequest) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO budget_requests (id, requesting_workspace_id, target_workspace_id,
                                         requested_amount, reason, status, requested_by,
                                         reviewed_by, reviewed_at, review_notes, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(request.id.to_string())
        .bind(request.requesting_workspace_id.to_string())
        .bind(request.target_workspace_id.to_string())
        .bind(request.requested_amount)
        .bind(&request.reason)
        .bind(request.status.as_str())
        .bind(request.requested_by.to_string())
        .bind(request.reviewed_by.map(|u| u.to_string()))
        .bind(request.reviewed_at)
        .bind(request.review_notes.as_deref())
        .bind(request.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_budget_request(&self, id: Uuid) -> Result<BudgetRequest> {
        let row = sqlx::query_as::<_, BudgetRequestRow>(
            r#"
            SELECT id, requesting_workspace_id, target_workspace_id, requested_amount, reason,
                   status, requested_by, reviewed_by, reviewed_at, review_notes, created_at
            FROM budget_requests
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Budget request {} not found", id)))?;

        row.try_into()
    }

    /// Decide a pending budget request. The status stamp and the ledger
    /// increment commit as one transaction: a reader can never observe an
    /// approved request whose ledger was not yet incremented. False means
    /// another reviewer got there first.
    pub async fn decide_budget_request(
        &self,
        request_id: Uuid,
        approve: bool,
        reviewer_id: Uuid,
        review_notes: Option<&str>,
        requesting_workspace_id: Uuid,
        requested_amount: i64,
        currency: &str,
    ) -> Result<bool> {
        let now = Utc::now();
        let status = if approve {
            BudgetRequestStatus::Approved
        } else {
            BudgetRequestStatus::Rejected
        };

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE budget_requests
            SET status = ?, reviewed_by = ?, reviewed_at = ?, review_notes = ?
            WHERE id = ? AND status = 'pending'
            "#,
        )
        .bind(status.as_str())
        .bind(reviewer_id.to_string())
        .bind(now)
        .bind(review_notes)
        .bind(request_id.to_string())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        if approve {
            sqlx::query(
                r#"
                INSERT INTO budget_ledgers (workspace_id, allocated, used, currency, updated_at)
                VALUES (?, ?, 0, ?, ?)
                ON CONFLICT(workspace_id)
                DO UPDATE SET allocated = allocated + excluded.allocated, updated_at = excluded.updated_at
                "#,
            )
            .bind(requesting_workspace_id.to_string())
            .bind(requested_amount)
            .bind(currency)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    pub async fn get_ledger(&self, workspace_id: Uuid) -> Result<Option<BudgetLedger>> {
        let row = sqlx::query_as::<_, LedgerRow>(
            r#"
            SELECT workspace_id, allocated, used, currency, updated_at
            FROM budget_ledgers
            WHERE workspace_id = ?
            "#,
        )
        .bind(workspace_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.try_into()).transpose()
    }

    pub async fn insert_expense(&self, expense: &Expense) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO expenses (id, workspace_id, amount, description, status, created_at, settled_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(expense.id.to_string())
        .bind(expense.workspace_id.to_string())
        .bind(expense.amount)
        .bind(&expense.description)
        .bind(expense.status.as_str())
        .bind(expense.created_at)
        .bind(expense.settled_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_expense(&self, id: Uuid) -> Result<Expense> {
        let row = sqlx::query_as::<_, ExpenseRow>(
            r#"
            SELECT id, workspace_id, amount, description, status, created_at, settled_at
            FROM expenses
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Expense {} not found", id)))?;

        row.try_into()
    }

    /// Settle a pending expense: guarded status flip plus the `used`
    /// increment on the workspace ledger, as one transaction. False means
    /// the expense was already settled.
    pub async fn settle_expense(&self, id: Uuid, currency: &str) -> Result<bool> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, ExpenseRow>(
            r#"
            SELECT id, workspace_id, amount, description, status, created_at, settled_at
            FROM expenses
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Expense {} not found", id)))?;
        let expense: Expense = row.try_into()?;

        let result = sqlx::query(
            r#"
            UPDATE expenses SET status = 'settled', settled_at = ? WHERE id = ? AND status = 'pending'
            "#,
        )
        .bind(now)
        .bind(id.to_string())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(
            r#"
            INSERT INTO budget_ledgers (workspace_id, allocated, used, currency, updated_at)
            VALUES (?, 0, ?, ?, ?)
            ON CONFLICT(workspace_id)
            DO UPDATE SET used = used + excluded.used, updated_at = excluded.updated_at
            "#,
        )
        .bind(expense.workspace_id.to_string())
        .bind(expense.amount)
        .bind(currency)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    pub async fn pending_expense_total(&self, workspace_id: Uuid) -> Result<i64> {
        let (total,): (i64,) = sqlx::query_as(
            r#"
            SELECT COALESCE(SUM(amount), 0) FROM expenses
            WHERE workspace_id = ? AND status = 'pending'
            "#,
        )
        .bind(workspace_id.to_string())
        .fetch_one(&self.pool)
        .await?;

        Ok(total)
    }

    // Token operations

    pub async fn insert_token(&self, token: &str, user_id: Uuid) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO api_tokens (token, user_id, created_at) VALUES (?, ?, ?)
            "#,
        )
        .bind(token)
        .bind(user_id.to_string())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn resolve_token(&self, token: &str) -> Result<Option<Uuid>> {
        let row: Option<(String,)> = sqlx::query_as(
            r#"
            SELECT user_id FROM api_tokens WHERE token = ?
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(user_id,)| {
            Uuid::parse_str(&user_id)
                .map_err(|e| AppError::Internal(format!("Invalid UUID: {}", e)))
        })
        .transpose()
    }
}

// Internal row types for sqlx

fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| AppError::Internal(format!("Invalid UUID: {}", e)))
}

fn parse_opt_uuid(s: Option<String>) -> Result<Option<Uuid>> {
    s.as_deref().map(parse_uuid).transpose()
}

#[derive(sqlx::FromRow)]
struct WorkspaceRow {
    id: String,
    event_id: String,
    name: String,
    level: String,
    parent_workspace_id: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<WorkspaceRow> for Workspace {
    type Error = AppError;

    fn try_from(row: WorkspaceRow) -> Result<Self> {
        Ok(Workspace {
            id: parse_uuid(&row.id)?,
            event_id: parse_uuid(&row.event_id)?,
            name: row.name,
            level: row
                .level
                .parse()
                .map_err(|e| AppError::Internal(format!("Invalid level: {}", e)))?,
            parent_workspace_id: parse_opt_uuid(row.parent_workspace_id)?,
            status: row
                .status
                .parse()
                .map_err(|e| AppError::Internal(format!("Invalid status: {}", e)))?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct MembershipRow {
    workspace_id: String,
    user_id: String,
    role: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<MembershipRow> for Membership {
    type Error = AppError;

    fn try_from(row: MembershipRow) -> Result<Self> {
        Ok(Membership {
            workspace_id: parse_uuid(&row.workspace_id)?,
            user_id: parse_uuid(&row.user_id)?,
            role: row
                .role
                .parse()
                .map_err(|e| AppError::Internal(format!("Invalid role: {}", e)))?,
            status: row
                .status
                .parse()
                .map_err(|e| AppError::Internal(format!("Invalid status: {}", e)))?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct TaskRow {
    id: String,
    workspace_id: String,
    title: String,
    description: String,
    category: String,
    priority: String,
    due_date: Option<DateTime<Utc>>,
    dependencies: String,
    tags: String,
    template_id: Option<String>,
    is_from_template: bool,
    estimated_duration_hours: Option<i64>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TaskRow> for MaterializedTask {
    type Error = AppError;

    fn try_from(row: TaskRow) -> Result<Self> {
        let dependency_strings: Vec<String> = serde_json::from_str(&row.dependencies)
            .map_err(|e| AppError::Internal(format!("Invalid dependencies column: {}", e)))?;
        let dependencies = dependency_strings
            .iter()
            .map(|s| parse_uuid(s))
            .collect::<Result<Vec<_>>>()?;
        let tags: Vec<String> = serde_json::from_str(&row.tags)
            .map_err(|e| AppError::Internal(format!("Invalid tags column: {}", e)))?;

        Ok(MaterializedTask {
            id: parse_uuid(&row.id)?,
            workspace_id: parse_uuid(&row.workspace_id)?,
            title: row.title,
            description: row.description,
            category: row
                .category
                .parse()
                .map_err(|e| AppError::Internal(format!("Invalid category: {}", e)))?,
            priority: row
                .priority
                .parse()
                .map_err(|e| AppError::Internal(format!("Invalid priority: {}", e)))?,
            due_date: row.due_date,
            dependencies,
            tags,
            template_id: row.template_id,
            is_from_template: row.is_from_template,
            estimated_duration_hours: row.estimated_duration_hours.map(|h| h as u32),
            status: row
                .status
                .parse()
                .map_err(|e| AppError::Internal(format!("Invalid status: {}", e)))?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct DelegatedItemRow {
    id: String,
    source_workspace_id: String,
    target_workspace_id: String,
    title: String,
    description: String,
    due_date: Option<DateTime<Utc>>,
    delegation_status: String,
    is_synced: bool,
    mirror_task_id: Option<String>,
    created_by: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<DelegatedItemRow> for DelegatedItem {
    type Error = AppError;

    fn try_from(row: DelegatedItemRow) -> Result<Self> {
        Ok(DelegatedItem {
            id: parse_uuid(&row.id)?,
            source_workspace_id: parse_uuid(&row.source_workspace_id)?,
            target_workspace_id: parse_uuid(&row.target_workspace_id)?,
            title: row.title,
            description: row.description,
            due_date: row.due_date,
            delegation_status: row
                .delegation_status
                .parse()
                .map_err(|e| AppError::Internal(format!("Invalid delegation status: {}", e)))?,
            is_synced: row.is_synced,
            mirror_task_id: parse_opt_uuid(row.mirror_task_id)?,
            created_by: parse_uuid(&row.created_by)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ExtensionRow {
    id: String,
    delegated_item_id: String,
    requested_due_date: DateTime<Utc>,
    justification: String,
    status: String,
    requested_by: String,
    reviewer_id: Option<String>,
    created_at: DateTime<Utc>,
    resolved_at: Option<DateTime<Utc>>,
}

impl TryFrom<ExtensionRow> for DeadlineExtensionRequest {
    type Error = AppError;

    fn try_from(row: ExtensionRow) -> Result<Self> {
        Ok(DeadlineExtensionRequest {
            id: parse_uuid(&row.id)?,
            delegated_item_id: parse_uuid(&row.delegated_item_id)?,
            requested_due_date: row.requested_due_date,
            justification: row.justification,
            status: row
                .status
                .parse()
                .map_err(|e| AppError::Internal(format!("Invalid extension status: {}", e)))?,
            requested_by: parse_uuid(&row.requested_by)?,
            reviewer_id: parse_opt_uuid(row.reviewer_id)?,
            created_at: row.created_at,
            resolved_at: row.resolved_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct LedgerRow {
    workspace_id: String,
    allocated: i64,
    used: i64,
    currency: String,
    updated_at: DateTime<Utc>,
}

impl TryFrom<LedgerRow> for BudgetLedger {
    type Error = AppError;

    fn try_from(row: LedgerRow) -> Result<Self> {
        Ok(BudgetLedger {
            workspace_id: parse_uuid(&row.workspace_id)?,
            allocated: row.allocated,
            used: row.used,
            currency: row.currency,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct BudgetRequestRow {
    id: String,
    requesting_workspace_id: String,
    target_workspace_id: String,
    requested_amount: i64,
    reason: String,
    status: String,
    requested_by: String,
    reviewed_by: Option<String>,
    reviewed_at: Option<DateTime<Utc>>,
    review_notes: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<BudgetRequestRow> for BudgetRequest {
    type Error = AppError;

    fn try_from(row: BudgetRequestRow) -> Result<Self> {
        Ok(BudgetRequest {
            id: parse_uuid(&row.id)?,
            requesting_workspace_id: parse_uuid(&row.requesting_workspace_id)?,
            target_workspace_id: parse_uuid(&row.target_workspace_id)?,
            requested_amount: row.requested_amount,
            reason: row.reason,
            status: row
                .status
                .parse()
                .map_err(|e| AppError::Internal(format!("Invalid request status: {}", e)))?,
            requested_by: parse_uuid(&row.requested_by)?,
            reviewed_by: parse_opt_uuid(row.reviewed_by)?,
            reviewed_at: row.reviewed_at,
            review_notes: row.review_notes,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ExpenseRow {
    id: String,
    workspace_id: String,
    amount: i64,
    description: String,
    status: String,
    created_at: DateTime<Utc>,
    settled_at: Option<DateTime<Utc>>,
}

impl TryFrom<ExpenseRow> for Expense {
    type Error = AppError;

    fn try_from(row: ExpenseRow) -> Result<Self> {
        Ok(Expense {
            id: parse_uuid(&row.id)?,
            workspace_id: parse_uuid(&row.workspace_id)?,
            amount: row.amount,
            description: row.description,
            status: row
                .status
                .parse()
                .map_err(|e| AppError::Internal(format!("Invalid expense status: {}", e)))?,
            created_at: row.created_at,
            settled_at: row.settled_at,
        })
    }
}
