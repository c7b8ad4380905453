//! Task templates and materialized tasks

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Category of a task; drives the due-date offset when a template is
/// materialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskCategory {
    Setup,
    Marketing,
    Registration,
    Logistics,
    Technical,
    PostEvent,
}

impl TaskCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskCategory::Setup => "setup",
            TaskCategory::Marketing => "marketing",
            TaskCategory::Registration => "registration",
            TaskCategory::Logistics => "logistics",
            TaskCategory::Technical => "technical",
            TaskCategory::PostEvent => "post_event",
        }
    }

    /// Fraction of the event duration by which tasks of this category lead
    /// the start date. POST_EVENT has no offset; it trails the start by a
    /// fixed week regardless of duration.
    pub fn lead_fraction(&self) -> f64 {
        match self {
            TaskCategory::Setup => 0.7,
            TaskCategory::Marketing => 0.5,
            TaskCategory::Registration => 0.6,
            TaskCategory::Logistics => 0.2,
            TaskCategory::Technical => 0.3,
            TaskCategory::PostEvent => 0.5,
        }
    }
}

impl std::str::FromStr for TaskCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "setup" => Ok(TaskCategory::Setup),
            "marketing" => Ok(TaskCategory::Marketing),
            "registration" => Ok(TaskCategory::Registration),
            "logistics" => Ok(TaskCategory::Logistics),
            "technical" => Ok(TaskCategory::Technical),
            "post_event" => Ok(TaskCategory::PostEvent),
            _ => Err(format!("Invalid task category: {}", s)),
        }
    }
}

/// Priority level for tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low = 0,
    Normal = 1,
    High = 2,
    Urgent = 3,
}

impl Default for TaskPriority {
    fn default() -> Self {
        TaskPriority::Normal
    }
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Normal => "normal",
            TaskPriority::High => "high",
            TaskPriority::Urgent => "urgent",
        }
    }
}

impl std::str::FromStr for TaskPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(TaskPriority::Low),
            "normal" => Ok(TaskPriority::Normal),
            "high" => Ok(TaskPriority::High),
            "urgent" => Ok(TaskPriority::Urgent),
            _ => Err(format!("Invalid task priority: {}", s)),
        }
    }
}

/// Completion status of a workspace task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Open,
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Open => "open",
            TaskStatus::Completed => "completed",
        }
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(TaskStatus::Open),
            "completed" => Ok(TaskStatus::Completed),
            _ => Err(format!("Invalid task status: {}", s)),
        }
    }
}

/// One blueprint task inside a template set. Immutable reference data;
/// `dependencies` name other template ids within the same set.
#[derive(Debug, Clone, Serialize)]
pub struct TaskTemplate {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub category: TaskCategory,
    pub priority: TaskPriority,
    pub estimated_duration_hours: u32,
    pub dependencies: &'static [&'static str],
    pub tags: &'static [&'static str],
    pub is_default: bool,
}

/// A named group of templates for one event type.
#[derive(Debug, Clone, Serialize)]
pub struct TaskTemplateSet {
    pub id: &'static str,
    pub event_type: &'static str,
    pub name: &'static str,
    pub templates: Vec<TaskTemplate>,
}

/// A concrete workspace task. Either authored directly, created as the
/// source-side mirror of a synced delegation, or materialized from a
/// template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterializedTask {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub title: String,
    pub description: String,
    pub category: TaskCategory,
    pub priority: TaskPriority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    /// Ids of other tasks in the same workspace this task depends on.
    pub dependencies: Vec<Uuid>,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    pub is_from_template: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_duration_hours: Option<u32>,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Draft for task creation; the store assigns id and timestamps.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub workspace_id: Uuid,
    pub title: String,
    pub description: String,
    pub category: TaskCategory,
    pub priority: TaskPriority,
    pub due_date: Option<DateTime<Utc>>,
    pub dependencies: Vec<Uuid>,
    pub tags: Vec<String>,
    pub template_id: Option<String>,
    pub is_from_template: bool,
    pub estimated_duration_hours: Option<u32>,
}

impl NewTask {
    pub fn manual(workspace_id: Uuid, title: impl Into<String>) -> Self {
        Self {
            workspace_id,
            title: title.into(),
            description: String::new(),
            category: TaskCategory::Setup,
            priority: TaskPriority::Normal,
            due_date: None,
            dependencies: Vec::new(),
            tags: Vec::new(),
            template_id: None,
            is_from_template: false,
            estimated_duration_hours: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_due_date(mut self, due_date: DateTime<Utc>) -> Self {
        self.due_date = Some(due_date);
        self
    }
}
