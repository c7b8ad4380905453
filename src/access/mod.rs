//! Workspace-scoped access control
//!
//! Roles are pinned to hierarchy levels and carry fixed capability sets;
//! the engine answers "can this user do this here" and "can this role
//! manage that role" without side effects.

pub mod capability;
pub mod engine;
pub mod role;

pub use capability::{Capability, CapabilitySet};
pub use engine::AccessControlEngine;
pub use role::{Role, RoleCapabilityMatrix, RoleSummary};
