//! Workspace provisioning and membership administration
//!
//! Enforces the structural invariants at the only place structure changes:
//! a child sits exactly one level below its parent, archival refuses while
//! active children exist, and role assignment obeys the one-level-below
//! management rule.

use uuid::Uuid;

use crate::access::{AccessControlEngine, Capability, Role};
use crate::error::{AppError, Result};
use crate::events::{EngineEvent, EventBus};
use crate::models::{Membership, MembershipStatus, Workspace, WorkspaceStatus};
use crate::store::Store;

#[derive(Clone)]
pub struct ProvisioningEngine {
    store: Store,
    access: AccessControlEngine,
    events: EventBus,
}

impl ProvisioningEngine {
    pub fn new(store: Store, access: AccessControlEngine, events: EventBus) -> Self {
        Self {
            store,
            access,
            events,
        }
    }

    /// Bootstrap an event's ROOT workspace. The organizer becomes its
    /// WORKSPACE_OWNER; every later structural change is authorized against
    /// the tree this creates.
    pub async fn provision_root(
        &self,
        event_id: Uuid,
        name: &str,
        organizer_id: Uuid,
    ) -> Result<Workspace> {
        let workspace = self
            .store
            .create_workspace(event_id, name, crate::models::WorkspaceLevel::Root, None)
            .await?;
        self.store
            .upsert_membership(
                workspace.id,
                organizer_id,
                Role::WorkspaceOwner,
                MembershipStatus::Active,
            )
            .await?;

        self.events.emit(EngineEvent::MembershipChanged {
            workspace_id: workspace.id,
            user_id: organizer_id,
        });

        Ok(workspace)
    }

    /// Create a child workspace one level below `parent_id`. The level is
    /// derived, not chosen: skipping levels is structurally impossible.
    pub async fn provision_child(
        &self,
        parent_id: Uuid,
        name: &str,
        actor_id: Uuid,
    ) -> Result<Workspace> {
        self.access
            .authorize(actor_id, parent_id, Capability::EditSettings)
            .await?;

        let parent = self.store.get_workspace(parent_id).await?;
        if parent.status != WorkspaceStatus::Active {
            return Err(AppError::BadRequest(format!(
                "workspace {} is archived",
                parent_id
            )));
        }
        let level = parent.level.child().ok_or_else(|| {
            AppError::BadRequest(format!(
                "a {} workspace cannot have children",
                parent.level.as_str()
            ))
        })?;

        self.store
            .create_workspace(parent.event_id, name, level, Some(parent_id))
            .await
    }

    /// Archive a workspace. Never a hard delete, and refused while active
    /// children exist.
    pub async fn archive(&self, workspace_id: Uuid, actor_id: Uuid) -> Result<Workspace> {
        self.access
            .authorize(actor_id, workspace_id, Capability::EditSettings)
            .await?;

        let children = self.store.count_active_children(workspace_id).await?;
        if children > 0 {
            return Err(AppError::BadRequest(format!(
                "workspace {} still has {} active child workspace(s)",
                workspace_id, children
            )));
        }

        self.store
            .set_workspace_status(workspace_id, WorkspaceStatus::Archived)
            .await?;
        self.store.get_workspace(workspace_id).await
    }

    /// Assign `role` to `user_id` in `workspace_id`.
    ///
    /// The actor manages from the parent workspace: an active membership
    /// there with `manageTeam`, and a role exactly one level above the one
    /// being assigned. The role must also match the workspace's own level.
    pub async fn assign_role(
        &self,
        workspace_id: Uuid,
        user_id: Uuid,
        role: Role,
        actor_id: Uuid,
    ) -> Result<Membership> {
        let workspace = self.store.get_workspace(workspace_id).await?;

        if self.access.matrix().level_of(role) != Some(workspace.level) {
            return Err(AppError::BadRequest(format!(
                "role {} does not belong at the {} level",
                role.as_str(),
                workspace.level.as_str()
            )));
        }

        let parent_id = workspace.parent_workspace_id.ok_or_else(|| {
            AppError::Forbidden(
                "root workspace roles are fixed at provisioning".to_string(),
            )
        })?;
        let acting_role = self
            .access
            .authorize(actor_id, parent_id, Capability::ManageTeam)
            .await?;

        if !self.access.can_manage(acting_role, role) {
            return Err(AppError::Forbidden(format!(
                "role {} manages only the level immediately below; it cannot assign {}",
                acting_role.as_str(),
                role.as_str()
            )));
        }

        let membership = self
            .store
            .upsert_membership(workspace_id, user_id, role, MembershipStatus::Active)
            .await?;

        self.events.emit(EngineEvent::MembershipChanged {
            workspace_id,
            user_id,
        });

        Ok(membership)
    }

    /// Remove a member. Same management gate as assignment; the record is
    /// kept with REMOVED status.
    pub async fn remove_member(
        &self,
        workspace_id: Uuid,
        user_id: Uuid,
        actor_id: Uuid,
    ) -> Result<()> {
        let workspace = self.store.get_workspace(workspace_id).await?;
        let membership = self
            .store
            .get_membership(workspace_id, user_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "user {} has no membership in workspace {}",
                    user_id, workspace_id
                ))
            })?;

        let parent_id = workspace.parent_workspace_id.ok_or_else(|| {
            AppError::Forbidden("root workspace roles are fixed at provisioning".to_string())
        })?;
        let acting_role = self
            .access
            .authorize(actor_id, parent_id, Capability::ManageTeam)
            .await?;
        if !self.access.can_manage(acting_role, membership.role) {
            return Err(AppError::Forbidden(format!(
                "role {} cannot manage {}",
                acting_role.as_str(),
                membership.role.as_str()
            )));
        }

        self.store
            .upsert_membership(workspace_id, user_id, membership.role, MembershipStatus::Removed)
            .await?;

        self.events.emit(EngineEvent::MembershipChanged {
            workspace_id,
            user_id,
        });

        Ok(())
    }
}
