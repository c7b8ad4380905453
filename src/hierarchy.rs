//! In-memory model of one event's workspace tree
//!
//! Loaded from the workspace table and indexed by parent id. Answers the
//! ancestry questions every engine depends on: who is above, who is below,
//! and at what level.

use std::collections::HashMap;

use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{Workspace, WorkspaceLevel};

/// Indexed view of a single event's workspace hierarchy.
#[derive(Debug, Clone)]
pub struct HierarchyModel {
    workspaces: HashMap<Uuid, Workspace>,
    children: HashMap<Uuid, Vec<Uuid>>,
}

impl HierarchyModel {
    /// Build the model from an event's workspace set.
    pub fn new(workspaces: Vec<Workspace>) -> Self {
        let mut children: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for ws in &workspaces {
            if let Some(parent) = ws.parent_workspace_id {
                children.entry(parent).or_default().push(ws.id);
            }
        }
        let workspaces = workspaces.into_iter().map(|w| (w.id, w)).collect();
        Self {
            workspaces,
            children,
        }
    }

    pub fn get(&self, workspace_id: Uuid) -> Option<&Workspace> {
        self.workspaces.get(&workspace_id)
    }

    pub fn level_of(&self, workspace_id: Uuid) -> Result<WorkspaceLevel> {
        self.workspaces
            .get(&workspace_id)
            .map(|w| w.level)
            .ok_or_else(|| AppError::NotFound(format!("Workspace {} not found", workspace_id)))
    }

    /// Walk the parent chain from `workspace_id` to its root, nearest first.
    ///
    /// A cycle must never be persisted, but the walk is bounded by the
    /// workspace count so corrupt data fails with `CycleDetected` instead of
    /// looping forever. A chain that dead-ends anywhere but a ROOT is the
    /// same integrity fault.
    pub fn ancestors_of(&self, workspace_id: Uuid) -> Result<Vec<Uuid>> {
        let start = self
            .workspaces
            .get(&workspace_id)
            .ok_or_else(|| AppError::NotFound(format!("Workspace {} not found", workspace_id)))?;

        let mut ancestors = Vec::new();
        let mut current = start;
        let max_hops = self.workspaces.len();

        while let Some(parent_id) = current.parent_workspace_id {
            if ancestors.len() >= max_hops {
                tracing::error!(
                    workspace_id = %workspace_id,
                    "parent chain exceeded workspace count; hierarchy contains a cycle"
                );
                return Err(AppError::CycleDetected(format!(
                    "parent chain of workspace {} does not terminate",
                    workspace_id
                )));
            }
            let parent = self.workspaces.get(&parent_id).ok_or_else(|| {
                AppError::CycleDetected(format!(
                    "workspace {} references missing parent {}",
                    current.id, parent_id
                ))
            })?;
            ancestors.push(parent_id);
            current = parent;
        }

        if current.level != WorkspaceLevel::Root {
            return Err(AppError::CycleDetected(format!(
                "parent chain of workspace {} terminates at non-root {}",
                workspace_id, current.id
            )));
        }

        Ok(ancestors)
    }

    /// All workspaces transitively below `workspace_id`.
    pub fn descendants_of(&self, workspace_id: Uuid) -> Vec<Uuid> {
        let mut result = Vec::new();
        let mut frontier = vec![workspace_id];
        while let Some(id) = frontier.pop() {
            if let Some(kids) = self.children.get(&id) {
                for &kid in kids {
                    // Bounded by construction: children indexes each row once.
                    result.push(kid);
                    frontier.push(kid);
                }
            }
        }
        result
    }

    /// True iff `a` is a strict descendant of `b`.
    pub fn is_descendant(&self, a: Uuid, b: Uuid) -> Result<bool> {
        if a == b {
            return Ok(false);
        }
        Ok(self.ancestors_of(a)?.contains(&b))
    }

    /// The ROOT workspace above `workspace_id` (itself, if already ROOT).
    pub fn root_of(&self, workspace_id: Uuid) -> Result<Uuid> {
        let ancestors = self.ancestors_of(workspace_id)?;
        Ok(ancestors.last().copied().unwrap_or(workspace_id))
    }
}
