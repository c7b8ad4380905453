//! Data models for workspaces and memberships

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Level of a workspace in the event hierarchy.
///
/// Levels form a strict total order; every workspace sits exactly one step
/// below its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkspaceLevel {
    Root,
    Department,
    Committee,
    Team,
}

impl WorkspaceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkspaceLevel::Root => "root",
            WorkspaceLevel::Department => "department",
            WorkspaceLevel::Committee => "committee",
            WorkspaceLevel::Team => "team",
        }
    }

    /// Depth from the root: ROOT = 0, TEAM = 3.
    pub fn rank(&self) -> u8 {
        match self {
            WorkspaceLevel::Root => 0,
            WorkspaceLevel::Department => 1,
            WorkspaceLevel::Committee => 2,
            WorkspaceLevel::Team => 3,
        }
    }

    /// The only level allowed directly below this one.
    pub fn child(&self) -> Option<WorkspaceLevel> {
        match self {
            WorkspaceLevel::Root => Some(WorkspaceLevel::Department),
            WorkspaceLevel::Department => Some(WorkspaceLevel::Committee),
            WorkspaceLevel::Committee => Some(WorkspaceLevel::Team),
            WorkspaceLevel::Team => None,
        }
    }
}

impl std::str::FromStr for WorkspaceLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "root" => Ok(WorkspaceLevel::Root),
            "department" => Ok(WorkspaceLevel::Department),
            "committee" => Ok(WorkspaceLevel::Committee),
            "team" => Ok(WorkspaceLevel::Team),
            _ => Err(format!("Invalid workspace level: {}", s)),
        }
    }
}

/// Lifecycle status of a workspace. Workspaces are archived, never deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkspaceStatus {
    Active,
    Archived,
}

impl WorkspaceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkspaceStatus::Active => "active",
            WorkspaceStatus::Archived => "archived",
        }
    }
}

impl std::str::FromStr for WorkspaceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(WorkspaceStatus::Active),
            "archived" => Ok(WorkspaceStatus::Archived),
            _ => Err(format!("Invalid workspace status: {}", s)),
        }
    }
}

/// A node in the event's workspace tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workspace {
    pub id: Uuid,
    pub event_id: Uuid,
    pub name: String,
    pub level: WorkspaceLevel,
    /// None only for ROOT workspaces.
    pub parent_workspace_id: Option<Uuid>,
    pub status: WorkspaceStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Status of a membership record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipStatus {
    Active,
    Pending,
    Removed,
}

impl MembershipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipStatus::Active => "active",
            MembershipStatus::Pending => "pending",
            MembershipStatus::Removed => "removed",
        }
    }
}

impl std::str::FromStr for MembershipStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(MembershipStatus::Active),
            "pending" => Ok(MembershipStatus::Pending),
            "removed" => Ok(MembershipStatus::Removed),
            _ => Err(format!("Invalid membership status: {}", s)),
        }
    }
}

/// A user's role within one workspace.
///
/// Users hold independent memberships in multiple workspaces; every
/// capability check is scoped to a single workspace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Membership {
    pub workspace_id: Uuid,
    pub user_id: Uuid,
    pub role: crate::access::Role,
    pub status: MembershipStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
