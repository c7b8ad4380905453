//! Delegated items and deadline-extension requests
//!
//! A delegated item hands a task or checklist from an ancestor workspace to
//! a descendant. Its status only ever moves forward; the persisted guard in
//! the store enforces the same transitions under concurrency.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of a delegated item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DelegationStatus {
    /// Delegated but not yet accepted by the target workspace
    PendingAccept,
    /// Accepted, not yet started
    Accepted,
    /// Work underway in the target workspace
    InProgress,
    /// Finished; mirrors back to the source when synced
    Completed,
    /// Declined by the target workspace
    Rejected,
}

impl DelegationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DelegationStatus::PendingAccept => "pending_accept",
            DelegationStatus::Accepted => "accepted",
            DelegationStatus::InProgress => "in_progress",
            DelegationStatus::Completed => "completed",
            DelegationStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, DelegationStatus::Completed | DelegationStatus::Rejected)
    }

    /// The statuses an item must currently hold for a transition into
    /// `self` to be legal. Drives both entity-level validation and the SQL
    /// update predicate.
    pub fn allowed_from(&self) -> &'static [DelegationStatus] {
        match self {
            DelegationStatus::PendingAccept => &[],
            DelegationStatus::Accepted => &[DelegationStatus::PendingAccept],
            DelegationStatus::InProgress => &[DelegationStatus::Accepted],
            DelegationStatus::Completed => &[DelegationStatus::InProgress],
            DelegationStatus::Rejected => {
                &[DelegationStatus::PendingAccept, DelegationStatus::Accepted]
            }
        }
    }
}

impl std::str::FromStr for DelegationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending_accept" => Ok(DelegationStatus::PendingAccept),
            "accepted" => Ok(DelegationStatus::Accepted),
            "in_progress" => Ok(DelegationStatus::InProgress),
            "completed" => Ok(DelegationStatus::Completed),
            "rejected" => Ok(DelegationStatus::Rejected),
            _ => Err(format!("Invalid delegation status: {}", s)),
        }
    }
}

/// A task or checklist delegated from a source workspace to a strict
/// descendant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DelegatedItem {
    pub id: Uuid,
    pub source_workspace_id: Uuid,
    pub target_workspace_id: Uuid,
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    pub delegation_status: DelegationStatus,
    /// Completion in the target mirrors back to `mirror_task_id` in the
    /// source. Status flows target -> source only; field edits flow
    /// source -> target only.
    pub is_synced: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mirror_task_id: Option<Uuid>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DelegatedItem {
    pub fn new(
        source_workspace_id: Uuid,
        target_workspace_id: Uuid,
        title: impl Into<String>,
        created_by: Uuid,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            source_workspace_id,
            target_workspace_id,
            title: title.into(),
            description: String::new(),
            due_date: None,
            delegation_status: DelegationStatus::PendingAccept,
            is_synced: false,
            mirror_task_id: None,
            created_by,
            created_at: now,
            updated_at: now,
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

    /// Link completion mirroring back to a task in the source workspace.
    pub fn with_mirror(mut self, mirror_task_id: Uuid) -> Self {
        self.is_synced = true;
        self.mirror_task_id = Some(mirror_task_id);
        self
    }

    /// Entity-level transition check; the store applies the same predicate
    /// inside the UPDATE so racing actors cannot replay or regress a state.
    pub fn transition(&mut self, next: DelegationStatus) -> Result<(), String> {
        if !next.allowed_from().contains(&self.delegation_status) {
            return Err(format!(
                "cannot move item from {} to {}",
                self.delegation_status.as_str(),
                next.as_str()
            ));
        }
        self.delegation_status = next;
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// Status of a deadline-extension request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtensionStatus {
    Pending,
    Approved,
    Rejected,
}

impl ExtensionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtensionStatus::Pending => "pending",
            ExtensionStatus::Approved => "approved",
            ExtensionStatus::Rejected => "rejected",
        }
    }
}

impl std::str::FromStr for ExtensionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ExtensionStatus::Pending),
            "approved" => Ok(ExtensionStatus::Approved),
            "rejected" => Ok(ExtensionStatus::Rejected),
            _ => Err(format!("Invalid extension status: {}", s)),
        }
    }
}

/// A target-side request to push out a delegated item's due date.
///
/// Only one may be open per item at a time; approval rewrites the item's
/// due date, rejection leaves it untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadlineExtensionRequest {
    pub id: Uuid,
    pub delegated_item_id: Uuid,
    pub requested_due_date: DateTime<Utc>,
    pub justification: String,
    pub status: ExtensionStatus,
    pub requested_by: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewer_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

impl DeadlineExtensionRequest {
    pub fn new(
        delegated_item_id: Uuid,
        requested_due_date: DateTime<Utc>,
        justification: impl Into<String>,
        requested_by: Uuid,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            delegated_item_id,
            requested_due_date,
            justification: justification.into(),
            status: ExtensionStatus::Pending,
            requested_by,
            reviewer_id: None,
            created_at: Utc::now(),
            resolved_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_item() -> DelegatedItem {
        DelegatedItem::new(Uuid::new_v4(), Uuid::new_v4(), "Book caterer", Uuid::new_v4())
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            DelegationStatus::PendingAccept,
            DelegationStatus::Accepted,
            DelegationStatus::InProgress,
            DelegationStatus::Completed,
            DelegationStatus::Rejected,
        ] {
            assert_eq!(status.as_str().parse::<DelegationStatus>().unwrap(), status);
        }
        assert!("declined".parse::<DelegationStatus>().is_err());
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(DelegationStatus::Completed.is_terminal());
        assert!(DelegationStatus::Rejected.is_terminal());
        assert!(!DelegationStatus::PendingAccept.is_terminal());
        assert!(!DelegationStatus::Accepted.is_terminal());
        assert!(!DelegationStatus::InProgress.is_terminal());
    }

    #[test]
    fn test_new_item_defaults() {
        let item = make_item();
        assert_eq!(item.delegation_status, DelegationStatus::PendingAccept);
        assert!(!item.is_synced);
        assert!(item.mirror_task_id.is_none());
        assert!(item.due_date.is_none());
    }

    #[test]
    fn test_with_mirror_sets_synced() {
        let mirror = Uuid::new_v4();
        let item = make_item().with_mirror(mirror);
        assert!(item.is_synced);
        assert_eq!(item.mirror_task_id, Some(mirror));
    }

    #[test]
    fn test_forward_path() {
        let mut item = make_item();
        item.transition(DelegationStatus::Accepted).unwrap();
        item.transition(DelegationStatus::InProgress).unwrap();
        item.transition(DelegationStatus::Completed).unwrap();
        assert_eq!(item.delegation_status, DelegationStatus::Completed);
    }

    #[test]
    fn test_reject_from_pending_and_accepted_only() {
        let mut item = make_item();
        assert!(item.clone().transition(DelegationStatus::Rejected).is_ok());

        item.transition(DelegationStatus::Accepted).unwrap();
        assert!(item.clone().transition(DelegationStatus::Rejected).is_ok());

        item.transition(DelegationStatus::InProgress).unwrap();
        assert!(item.transition(DelegationStatus::Rejected).is_err());
    }

    #[test]
    fn test_no_skipping_forward() {
        let mut item = make_item();
        assert!(item.transition(DelegationStatus::InProgress).is_err());
        assert!(item.transition(DelegationStatus::Completed).is_err());
    }

    #[test]
    fn test_no_regression() {
        let mut item = make_item();
        item.transition(DelegationStatus::Accepted).unwrap();
        item.transition(DelegationStatus::InProgress).unwrap();
        item.transition(DelegationStatus::Completed).unwrap();

        assert!(item.transition(DelegationStatus::InProgress).is_err());
        assert!(item.transition(DelegationStatus::Accepted).is_err());
        assert!(item.transition(DelegationStatus::PendingAccept).is_err());
    }

    #[test]
    fn test_every_transition_pair_matches_allowed_from() {
        let all = [
            DelegationStatus::PendingAccept,
            DelegationStatus::Accepted,
            DelegationStatus::InProgress,
            DelegationStatus::Completed,
            DelegationStatus::Rejected,
        ];
        for from in all {
            for to in all {
                let mut item = make_item();
                item.delegation_status = from;
                let expected = to.allowed_from().contains(&from);
                assert_eq!(
                    item.transition(to).is_ok(),
                    expected,
                    "{} -> {}",
                    from.as_str(),
                    to.as_str()
                );
            }
        }
    }

    #[test]
    fn test_extension_request_new() {
        let item = make_item();
        let requester = Uuid::new_v4();
        let due = Utc::now();
        let request = DeadlineExtensionRequest::new(item.id, due, "vendor delay", requester);

        assert_eq!(request.delegated_item_id, item.id);
        assert_eq!(request.status, ExtensionStatus::Pending);
        assert_eq!(request.requested_by, requester);
        assert!(request.reviewer_id.is_none());
        assert!(request.resolved_at.is_none());
    }

    #[test]
    fn test_extension_status_round_trip() {
        for status in [
            ExtensionStatus::Pending,
            ExtensionStatus::Approved,
            ExtensionStatus::Rejected,
        ] {
            assert_eq!(status.as_str().parse::<ExtensionStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_item_serialization() {
        let item = make_item();
        let json = serde_json::to_string(&item).unwrap();
        assert!(json.contains("pending_accept"));
        assert!(json.contains("Book caterer"));
    }
}
