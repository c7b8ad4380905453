//! Engine event channel
//!
//! Every mutating operation fires one event on a broadcast channel. This is
//! the notification collaborator seam: delivery is best-effort and
//! fire-and-forget, and a send with no live subscriber is not an error —
//! notification failure must never fail the underlying operation.

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::delegation::DelegationStatus;

/// Events emitted by the coordination engines
#[derive(Debug, Clone)]
pub enum EngineEvent {
    DelegationCreated {
        item_id: Uuid,
        source_workspace_id: Uuid,
        target_workspace_id: Uuid,
        title: String,
    },
    DelegationAccepted {
        item_id: Uuid,
        actor_id: Uuid,
    },
    DelegationRejected {
        item_id: Uuid,
        actor_id: Uuid,
    },
    DelegationAdvanced {
        item_id: Uuid,
        status: DelegationStatus,
        actor_id: Uuid,
    },
    ExtensionRequested {
        request_id: Uuid,
        item_id: Uuid,
        requested_due_date: DateTime<Utc>,
    },
    ExtensionReviewed {
        request_id: Uuid,
        item_id: Uuid,
        approved: bool,
        reviewer_id: Uuid,
    },
    BudgetRequested {
        request_id: Uuid,
        requesting_workspace_id: Uuid,
        target_workspace_id: Uuid,
        amount: i64,
    },
    BudgetReviewed {
        request_id: Uuid,
        approved: bool,
        reviewer_id: Uuid,
    },
    ExpenseSettled {
        expense_id: Uuid,
        workspace_id: Uuid,
        amount: i64,
    },
    TemplatesApplied {
        workspace_id: Uuid,
        template_set_id: String,
        created: u32,
    },
    MembershipChanged {
        workspace_id: Uuid,
        user_id: Uuid,
    },
}

/// Shared sender handed to every engine.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<EngineEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(256);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.tx.subscribe()
    }

    /// Best-effort emit; a lagging or absent subscriber never fails the
    /// operation that produced the event.
    pub fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
