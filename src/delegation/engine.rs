//! Delegation engine
//!
//! Moves work items from an ancestor workspace to a descendant and keeps
//! the two sides synchronized: completion mirrors target -> source, field
//! edits mirror source -> target, and deadline extensions are negotiated
//! between the two memberships. Authorization is evaluated in full before
//! any mutation; transition races are settled by the store's guarded
//! updates.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::item::{DeadlineExtensionRequest, DelegatedItem, DelegationStatus};
use crate::access::{AccessControlEngine, Capability};
use crate::error::{AppError, Result};
use crate::events::{EngineEvent, EventBus};
use crate::hierarchy::HierarchyModel;
use crate::store::Store;
use crate::templates::NewTask;

/// Caller-supplied fields for a new delegation.
#[derive(Debug, Clone)]
pub struct DelegationDraft {
    pub title: String,
    pub description: String,
    pub due_date: Option<DateTime<Utc>>,
    /// Mirror completion back to a task in the source workspace.
    pub is_synced: bool,
}

/// Source-side edits propagated to the delegated item.
#[derive(Debug, Clone, Default)]
pub struct SourceEdits {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct DelegationEngine {
    store: Store,
    access: AccessControlEngine,
    events: EventBus,
}

impl DelegationEngine {
    pub fn new(store: Store, access: AccessControlEngine, events: EventBus) -> Self {
        Self {
            store,
            access,
            events,
        }
    }

    async fn hierarchy_for(&self, workspace_id: Uuid) -> Result<HierarchyModel> {
        let workspace = self.store.get_workspace(workspace_id).await?;
        let workspaces = self.store.workspaces_for_event(workspace.event_id).await?;
        Ok(HierarchyModel::new(workspaces))
    }

    /// Delegate a work item from `source` to a strict descendant `target`.
    pub async fn delegate(
        &self,
        source_workspace_id: Uuid,
        target_workspace_id: Uuid,
        draft: DelegationDraft,
        actor_id: Uuid,
    ) -> Result<DelegatedItem> {
        self.access
            .authorize(actor_id, source_workspace_id, Capability::AssignTasks)
            .await?;

        let hierarchy = self.hierarchy_for(source_workspace_id).await?;
        if hierarchy.get(target_workspace_id).is_none()
            || !hierarchy.is_descendant(target_workspace_id, source_workspace_id)?
        {
            return Err(AppError::NotADescendant(format!(
                "workspace {} is not a descendant of {}",
                target_workspace_id, source_workspace_id
            )));
        }

        let mut item = DelegatedItem::new(
            source_workspace_id,
            target_workspace_id,
            &draft.title,
            actor_id,
        )
        .with_description(&draft.description);
        if let Some(due) = draft.due_date {
            item = item.with_due_date(due);
        }

        if draft.is_synced {
            let mut mirror = NewTask::manual(source_workspace_id, &draft.title)
                .with_description(&draft.description);
            mirror.due_date = draft.due_date;
            let mirror = self.store.create_task(mirror).await?;
            item = item.with_mirror(mirror.id);
        }

        self.store.insert_delegated_item(&item).await?;

        self.events.emit(EngineEvent::DelegationCreated {
            item_id: item.id,
            source_workspace_id,
            target_workspace_id,
            title: item.title.clone(),
        });

        tracing::debug!(item_id = %item.id, %source_workspace_id, %target_workspace_id, "work delegated");
        Ok(item)
    }

    /// Target-side decision on a freshly delegated item.
    pub async fn accept_or_reject(
        &self,
        item_id: Uuid,
        actor_id: Uuid,
        accept: bool,
    ) -> Result<DelegatedItem> {
        let item = self.store.get_delegated_item(item_id).await?;
        self.access
            .authorize(actor_id, item.target_workspace_id, Capability::EditTasks)
            .await?;

        let to = if accept {
            DelegationStatus::Accepted
        } else {
            DelegationStatus::Rejected
        };

        let moved = self
            .store
            .transition_delegation(item_id, to.allowed_from(), to)
            .await?;
        if !moved {
            return Err(AppError::ForbiddenTransition(format!(
                "item {} cannot move from {} to {}",
                item_id,
                item.delegation_status.as_str(),
                to.as_str()
            )));
        }

        let event = if accept {
            EngineEvent::DelegationAccepted {
                item_id,
                actor_id,
            }
        } else {
            EngineEvent::DelegationRejected {
                item_id,
                actor_id,
            }
        };
        self.events.emit(event);

        self.store.get_delegated_item(item_id).await
    }

    /// Move an accepted item forward: ACCEPTED -> IN_PROGRESS -> COMPLETED.
    ///
    /// Completing a synced item also completes its mirror task in the
    /// source workspace; status propagation is target -> source only.
    pub async fn advance(
        &self,
        item_id: Uuid,
        new_status: DelegationStatus,
        actor_id: Uuid,
    ) -> Result<DelegatedItem> {
        if !matches!(
            new_status,
            DelegationStatus::InProgress | DelegationStatus::Completed
        ) {
            return Err(AppError::ForbiddenTransition(format!(
                "advance cannot target {}",
                new_status.as_str()
            )));
        }

        let item = self.store.get_delegated_item(item_id).await?;
        self.access
            .authorize(actor_id, item.target_workspace_id, Capability::EditTasks)
            .await?;

        let moved = self
            .store
            .transition_delegation(item_id, new_status.allowed_from(), new_status)
            .await?;
        if !moved {
            return Err(AppError::ForbiddenTransition(format!(
                "item {} cannot move from {} to {}",
                item_id,
                item.delegation_status.as_str(),
                new_status.as_str()
            )));
        }

        if new_status == DelegationStatus::Completed && item.is_synced {
            if let Some(mirror_task_id) = item.mirror_task_id {
                self.store.complete_task(mirror_task_id).await?;
            }
        }

        self.events.emit(EngineEvent::DelegationAdvanced {
            item_id,
            status: new_status,
            actor_id,
        });

        self.store.get_delegated_item(item_id).await
    }

    /// Source-side edits of title/description/due date, propagated to the
    /// delegated item. Never flows the other way.
    pub async fn sync_from_source(
        &self,
        item_id: Uuid,
        edits: SourceEdits,
        actor_id: Uuid,
    ) -> Result<DelegatedItem> {
        let item = self.store.get_delegated_item(item_id).await?;
        self.access
            .authorize(actor_id, item.source_workspace_id, Capability::EditTasks)
            .await?;

        self.store
            .update_delegation_fields(
                item_id,
                edits.title.as_deref(),
                edits.description.as_deref(),
                edits.due_date,
            )
            .await?;

        self.store.get_delegated_item(item_id).await
    }

    /// Target-side request to push out the due date. One open request per
    /// item at a time.
    pub async fn request_extension(
        &self,
        item_id: Uuid,
        requested_due_date: DateTime<Utc>,
        justification: impl Into<String>,
        actor_id: Uuid,
    ) -> Result<DeadlineExtensionRequest> {
        let item = self.store.get_delegated_item(item_id).await?;
        self.access
            .require_member(actor_id, item.target_workspace_id)
            .await?;

        if item.delegation_status.is_terminal() {
            return Err(AppError::ForbiddenTransition(format!(
                "item {} is already {}",
                item_id,
                item.delegation_status.as_str()
            )));
        }

        let request =
            DeadlineExtensionRequest::new(item_id, requested_due_date, justification, actor_id);
        self.store.insert_extension_request(&request).await?;

        self.events.emit(EngineEvent::ExtensionRequested {
            request_id: request.id,
            item_id,
            requested_due_date,
        });

        Ok(request)
    }

    /// Source-side review of an extension request. Approval rewrites the
    /// item's due date; rejection leaves it untouched.
    pub async fn review_extension(
        &self,
        request_id: Uuid,
        approve: bool,
        actor_id: Uuid,
    ) -> Result<DeadlineExtensionRequest> {
        let request = self.store.get_extension_request(request_id).await?;
        let item = self
            .store
            .get_delegated_item(request.delegated_item_id)
            .await?;
        self.access
            .authorize(actor_id, item.source_workspace_id, Capability::AssignTasks)
            .await?;

        let decided = self
            .store
            .decide_extension(
                request_id,
                approve,
                actor_id,
                item.id,
                request.requested_due_date,
            )
            .await?;
        if !decided {
            return Err(AppError::AlreadyReviewed(format!(
                "extension request {} was already decided",
                request_id
            )));
        }

        self.events.emit(EngineEvent::ExtensionReviewed {
            request_id,
            item_id: item.id,
            approved: approve,
            reviewer_id: actor_id,
        });

        self.store.get_extension_request(request_id).await
    }

    pub async fn items_for_workspace(&self, workspace_id: Uuid) -> Result<Vec<DelegatedItem>> {
        self.store.delegations_for_target(workspace_id).await
    }
}
