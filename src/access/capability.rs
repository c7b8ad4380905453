//! Capability model for workspace roles
//!
//! Defines the set of capabilities a role can grant within one workspace.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Capabilities grantable to roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Can create tasks in the workspace
    CreateTasks,
    /// Can edit existing tasks
    EditTasks,
    /// Can delete tasks
    DeleteTasks,
    /// Can assign tasks, including delegating them to descendant workspaces
    AssignTasks,
    /// Can post messages to the workspace feed
    PostMessages,
    /// Can broadcast announcements to descendant workspaces
    Broadcast,
    /// Can invite new members
    InviteTeam,
    /// Can change member roles and remove members
    ManageTeam,
    /// Can view workspace reports
    ViewReports,
    /// Can export workspace reports
    ExportReports,
    /// Can edit workspace settings, including budget submissions
    EditSettings,
    /// Can approve budget requests from descendant workspaces
    ApproveBudget,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::CreateTasks => "create_tasks",
            Capability::EditTasks => "edit_tasks",
            Capability::DeleteTasks => "delete_tasks",
            Capability::AssignTasks => "assign_tasks",
            Capability::PostMessages => "post_messages",
            Capability::Broadcast => "broadcast",
            Capability::InviteTeam => "invite_team",
            Capability::ManageTeam => "manage_team",
            Capability::ViewReports => "view_reports",
            Capability::ExportReports => "export_reports",
            Capability::EditSettings => "edit_settings",
            Capability::ApproveBudget => "approve_budget",
        }
    }

    /// Get all capabilities
    pub fn all() -> HashSet<Capability> {
        let mut caps = HashSet::new();
        caps.insert(Capability::CreateTasks);
        caps.insert(Capability::EditTasks);
        caps.insert(Capability::DeleteTasks);
        caps.insert(Capability::AssignTasks);
        caps.insert(Capability::PostMessages);
        caps.insert(Capability::Broadcast);
        caps.insert(Capability::InviteTeam);
        caps.insert(Capability::ManageTeam);
        caps.insert(Capability::ViewReports);
        caps.insert(Capability::ExportReports);
        caps.insert(Capability::EditSettings);
        caps.insert(Capability::ApproveBudget);
        caps
    }
}

impl std::str::FromStr for Capability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create_tasks" => Ok(Capability::CreateTasks),
            "edit_tasks" => Ok(Capability::EditTasks),
            "delete_tasks" => Ok(Capability::DeleteTasks),
            "assign_tasks" => Ok(Capability::AssignTasks),
            "post_messages" => Ok(Capability::PostMessages),
            "broadcast" => Ok(Capability::Broadcast),
            "invite_team" => Ok(Capability::InviteTeam),
            "manage_team" => Ok(Capability::ManageTeam),
            "view_reports" => Ok(Capability::ViewReports),
            "export_reports" => Ok(Capability::ExportReports),
            "edit_settings" => Ok(Capability::EditSettings),
            "approve_budget" => Ok(Capability::ApproveBudget),
            _ => Err(format!("Invalid capability: {}", s)),
        }
    }
}

/// A set of capabilities with helper methods
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CapabilitySet {
    capabilities: HashSet<Capability>,
}

impl CapabilitySet {
    pub fn new() -> Self {
        Self {
            capabilities: HashSet::new(),
        }
    }

    pub fn has(&self, cap: Capability) -> bool {
        self.capabilities.contains(&cap)
    }

    pub fn add(&mut self, cap: Capability) {
        self.capabilities.insert(cap);
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }

    pub fn inner(&self) -> &HashSet<Capability> {
        &self.capabilities
    }

    pub fn to_vec(&self) -> Vec<Capability> {
        self.capabilities.iter().copied().collect()
    }
}

impl From<HashSet<Capability>> for CapabilitySet {
    fn from(capabilities: HashSet<Capability>) -> Self {
        Self { capabilities }
    }
}

impl From<Vec<Capability>> for CapabilitySet {
    fn from(capabilities: Vec<Capability>) -> Self {
        Self {
            capabilities: capabilities.into_iter().collect(),
        }
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        Self {
            capabilities: iter.into_iter().collect(),
        }
    }
}
