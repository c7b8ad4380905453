//! Task templates and their materialization into workspaces

pub mod catalog;
pub mod engine;
pub mod template;

pub use engine::{ApplyOptions, TemplateApplicationEngine};
pub use template::{
    MaterializedTask, NewTask, TaskCategory, TaskPriority, TaskStatus, TaskTemplate,
    TaskTemplateSet,
};
