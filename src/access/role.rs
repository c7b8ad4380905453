//! Roles and the role-capability matrix
//!
//! Each role is pinned to exactly one hierarchy level and carries a fixed
//! capability set. The matrix is an immutable value injected into the
//! engines at construction, so tests can substitute alternates; it is the
//! single source of truth shared by authorization checks and the
//! caller-facing summary projection.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::capability::{Capability, CapabilitySet};
use crate::models::WorkspaceLevel;

/// Symbolic role names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    WorkspaceOwner,
    OperationsManager,
    EventLead,
    MarketingLead,
    EventCoordinator,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::WorkspaceOwner => "workspace_owner",
            Role::OperationsManager => "operations_manager",
            Role::EventLead => "event_lead",
            Role::MarketingLead => "marketing_lead",
            Role::EventCoordinator => "event_coordinator",
        }
    }

    pub fn all() -> Vec<Role> {
        vec![
            Role::WorkspaceOwner,
            Role::OperationsManager,
            Role::EventLead,
            Role::MarketingLead,
            Role::EventCoordinator,
        ]
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "workspace_owner" => Ok(Role::WorkspaceOwner),
            "operations_manager" => Ok(Role::OperationsManager),
            "event_lead" => Ok(Role::EventLead),
            "marketing_lead" => Ok(Role::MarketingLead),
            "event_coordinator" => Ok(Role::EventCoordinator),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

/// Level plus capability set for one role.
#[derive(Debug, Clone)]
struct RoleSpec {
    level: WorkspaceLevel,
    capabilities: CapabilitySet,
}

/// Immutable role -> (level, capabilities) lookup table.
#[derive(Debug, Clone)]
pub struct RoleCapabilityMatrix {
    roles: HashMap<Role, RoleSpec>,
}

/// Serializable per-role summary for UI-facing output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleSummary {
    pub role: Role,
    pub level: WorkspaceLevel,
    pub capabilities: Vec<Capability>,
    /// Roles this role may manage: exactly those one level below.
    pub manages: Vec<Role>,
}

impl RoleCapabilityMatrix {
    /// The platform's built-in role table.
    pub fn builtin() -> Self {
        let mut roles = HashMap::new();

        roles.insert(
            Role::WorkspaceOwner,
            RoleSpec {
                level: WorkspaceLevel::Root,
                capabilities: Capability::all().into(),
            },
        );

        roles.insert(
            Role::OperationsManager,
            RoleSpec {
                level: WorkspaceLevel::Department,
                capabilities: vec![
                    Capability::CreateTasks,
                    Capability::EditTasks,
                    Capability::DeleteTasks,
                    Capability::AssignTasks,
                    Capability::PostMessages,
                    Capability::Broadcast,
                    Capability::InviteTeam,
                    Capability::ManageTeam,
                    Capability::ViewReports,
                    Capability::ExportReports,
                    Capability::EditSettings,
                    Capability::ApproveBudget,
                ]
                .into(),
            },
        );

        roles.insert(
            Role::EventLead,
            RoleSpec {
                level: WorkspaceLevel::Committee,
                capabilities: vec![
                    Capability::CreateTasks,
                    Capability::EditTasks,
                    Capability::DeleteTasks,
                    Capability::AssignTasks,
                    Capability::PostMessages,
                    Capability::InviteTeam,
                    Capability::ManageTeam,
                    Capability::ViewReports,
                    Capability::EditSettings,
                    Capability::ApproveBudget,
                ]
                .into(),
            },
        );

        // Same level as EventLead, much narrower breadth.
        roles.insert(
            Role::MarketingLead,
            RoleSpec {
                level: WorkspaceLevel::Committee,
                capabilities: vec![Capability::EditTasks, Capability::PostMessages].into(),
            },
        );

        roles.insert(
            Role::EventCoordinator,
            RoleSpec {
                level: WorkspaceLevel::Team,
                capabilities: vec![
                    Capability::CreateTasks,
                    Capability::EditTasks,
                    Capability::AssignTasks,
                    Capability::PostMessages,
                    Capability::ViewReports,
                    Capability::EditSettings,
                ]
                .into(),
            },
        );

        Self { roles }
    }

    /// Construct from explicit entries; used by tests to substitute
    /// alternate matrices.
    pub fn from_entries(
        entries: impl IntoIterator<Item = (Role, WorkspaceLevel, CapabilitySet)>,
    ) -> Self {
        let roles = entries
            .into_iter()
            .map(|(role, level, capabilities)| {
                (
                    role,
                    RoleSpec {
                        level,
                        capabilities,
                    },
                )
            })
            .collect();
        Self { roles }
    }

    pub fn level_of(&self, role: Role) -> Option<WorkspaceLevel> {
        self.roles.get(&role).map(|spec| spec.level)
    }

    pub fn capabilities_of(&self, role: Role) -> Option<&CapabilitySet> {
        self.roles.get(&role).map(|spec| &spec.capabilities)
    }

    pub fn has_capability(&self, role: Role, cap: Capability) -> bool {
        self.capabilities_of(role).is_some_and(|caps| caps.has(cap))
    }

    /// A role manages exactly the roles one level below its own; never its
    /// own level, never higher, never skipping.
    pub fn can_manage(&self, acting: Role, target: Role) -> bool {
        match (self.level_of(acting), self.level_of(target)) {
            (Some(a), Some(t)) => t.rank() == a.rank() + 1,
            _ => false,
        }
    }

    /// Per-role summary rows for the read-only matrix projection.
    pub fn summary(&self) -> Vec<RoleSummary> {
        let mut rows: Vec<RoleSummary> = Role::all()
            .into_iter()
            .filter_map(|role| {
                let spec = self.roles.get(&role)?;
                let manages = Role::all()
                    .into_iter()
                    .filter(|&other| self.can_manage(role, other))
                    .collect();
                let mut capabilities = spec.capabilities.to_vec();
                capabilities.sort_by_key(|c| c.as_str());
                Some(RoleSummary {
                    role,
                    level: spec.level,
                    capabilities,
                    manages,
                })
            })
            .collect();
        rows.sort_by_key(|r| r.level.rank());
        rows
    }
}
