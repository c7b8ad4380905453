//! Cross-workspace work delegation
//!
//! Items flow from an ancestor workspace to a strict descendant, advance
//! through a forward-only status machine, and optionally mirror completion
//! back to the source.

pub mod engine;
pub mod item;

pub use engine::{DelegationDraft, DelegationEngine, SourceEdits};
pub use item::{DeadlineExtensionRequest, DelegatedItem, DelegationStatus, ExtensionStatus};
