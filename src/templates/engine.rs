//! Template application engine
//!
//! Expands a named template set into concrete tasks inside one workspace.
//! Templates are processed in the set's declared order, dependency
//! references are remapped through a running template-id -> task-id map,
//! and due dates are derived from the event's start and duration.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use super::catalog;
use super::template::{NewTask, TaskCategory, TaskTemplateSet};
use crate::access::{AccessControlEngine, Capability};
use crate::error::{AppError, Result};
use crate::events::{EngineEvent, EventBus};
use crate::store::Store;

/// Options for one template application.
#[derive(Debug, Clone)]
pub struct ApplyOptions {
    /// Event start; defaults to the moment of application.
    pub start_date: Option<DateTime<Utc>>,
    pub event_duration_days: i64,
    pub skip_template_ids: Vec<String>,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self {
            start_date: None,
            event_duration_days: 30,
            skip_template_ids: Vec::new(),
        }
    }
}

/// Due date for one template: the category's lead fraction of the event
/// duration ahead of the start, except POST_EVENT which trails the start by
/// a fixed week.
fn due_date_for(category: TaskCategory, start: DateTime<Utc>, duration_days: i64) -> DateTime<Utc> {
    match category {
        TaskCategory::PostEvent => start + Duration::days(7),
        _ => {
            let lead = (duration_days as f64 * category.lead_fraction()).floor() as i64;
            start - Duration::days(lead)
        }
    }
}

#[derive(Clone)]
pub struct TemplateApplicationEngine {
    store: Store,
    access: AccessControlEngine,
    events: EventBus,
}

impl TemplateApplicationEngine {
    pub fn new(store: Store, access: AccessControlEngine, events: EventBus) -> Self {
        Self {
            store,
            access,
            events,
        }
    }

    /// The template sets available for application.
    pub fn available_sets(&self) -> Vec<TaskTemplateSet> {
        catalog::builtin_sets()
    }

    /// Materialize a template set into `workspace_id`, returning the number
    /// of tasks created.
    ///
    /// Authorization and set lookup are all-or-nothing: both are checked
    /// before the first task exists. Creation itself is one task at a time
    /// in declared order and does not roll back; re-applying a set creates
    /// duplicates.
    pub async fn apply(
        &self,
        workspace_id: Uuid,
        template_set_id: &str,
        actor_id: Uuid,
        options: ApplyOptions,
    ) -> Result<u32> {
        self.access
            .authorize(actor_id, workspace_id, Capability::CreateTasks)
            .await?;

        let set = catalog::find_set(template_set_id)
            .ok_or_else(|| AppError::TemplateSetNotFound(template_set_id.to_string()))?;

        let start = options.start_date.unwrap_or_else(Utc::now);
        let mut materialized: HashMap<&str, Uuid> = HashMap::new();
        let mut created = 0u32;

        for template in &set.templates {
            if options
                .skip_template_ids
                .iter()
                .any(|skip| skip == template.id)
            {
                continue;
            }

            // Remap via the running map: a reference to a skipped or
            // not-yet-processed template is dropped, not an error. Declared
            // order is assumed to already respect dependency order.
            let dependencies: Vec<Uuid> = template
                .dependencies
                .iter()
                .filter_map(|dep| match materialized.get(dep) {
                    Some(task_id) => Some(*task_id),
                    None => {
                        tracing::debug!(
                            template = template.id,
                            dependency = dep,
                            "dropping unresolvable template dependency"
                        );
                        None
                    }
                })
                .collect();

            let task = self
                .store
                .create_task(NewTask {
                    workspace_id,
                    title: template.name.to_string(),
                    description: template.description.to_string(),
                    category: template.category,
                    priority: template.priority,
                    due_date: Some(due_date_for(
                        template.category,
                        start,
                        options.event_duration_days,
                    )),
                    dependencies,
                    tags: template.tags.iter().map(|t| t.to_string()).collect(),
                    template_id: Some(template.id.to_string()),
                    is_from_template: true,
                    estimated_duration_hours: Some(template.estimated_duration_hours),
                })
                .await?;

            materialized.insert(template.id, task.id);
            created += 1;
        }

        self.events.emit(EngineEvent::TemplatesApplied {
            workspace_id,
            template_set_id: set.id.to_string(),
            created,
        });

        tracing::debug!(%workspace_id, set = set.id, created, "template set applied");
        Ok(created)
    }
}
