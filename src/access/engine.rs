//! Access-control decisions
//!
//! Pure decision functions over the role-capability matrix plus the
//! workspace-scoped membership lookup. No side effects; all mutation
//! happens in the calling engines after authorization passes in full.

use std::sync::Arc;

use uuid::Uuid;

use super::capability::Capability;
use super::role::{Role, RoleCapabilityMatrix};
use crate::error::{AppError, Result};
use crate::models::MembershipStatus;
use crate::store::Store;

#[derive(Clone)]
pub struct AccessControlEngine {
    store: Store,
    matrix: Arc<RoleCapabilityMatrix>,
}

impl AccessControlEngine {
    pub fn new(store: Store, matrix: Arc<RoleCapabilityMatrix>) -> Self {
        Self { store, matrix }
    }

    pub fn matrix(&self) -> &RoleCapabilityMatrix {
        &self.matrix
    }

    pub fn has_capability(&self, role: Role, capability: Capability) -> bool {
        self.matrix.has_capability(role, capability)
    }

    /// A role manages exactly the roles one level below its own. This single
    /// rule gates every "can manage" display and role-assignment action.
    pub fn can_manage(&self, acting: Role, target: Role) -> bool {
        self.matrix.can_manage(acting, target)
    }

    /// Resolve the user's ACTIVE membership for the workspace; fail
    /// `NotAMember` without one. Membership is workspace-scoped: a role held
    /// elsewhere in the tree grants nothing here.
    pub async fn require_member(&self, user_id: Uuid, workspace_id: Uuid) -> Result<Role> {
        let membership = self
            .store
            .get_membership(workspace_id, user_id)
            .await?
            .filter(|m| m.status == MembershipStatus::Active)
            .ok_or_else(|| {
                AppError::NotAMember(format!(
                    "user {} has no active membership in workspace {}",
                    user_id, workspace_id
                ))
            })?;
        Ok(membership.role)
    }

    /// Full authorization: membership resolution, then capability check.
    pub async fn authorize(
        &self,
        user_id: Uuid,
        workspace_id: Uuid,
        capability: Capability,
    ) -> Result<Role> {
        let role = self.require_member(user_id, workspace_id).await?;
        if !self.has_capability(role, capability) {
            return Err(AppError::Forbidden(format!(
                "role {} lacks {} in workspace {}",
                role.as_str(),
                capability.as_str(),
                workspace_id
            )));
        }
        Ok(role)
    }
}
