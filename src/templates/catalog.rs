//! Built-in template sets
//!
//! Tenant-independent reference data. Template ids are stable strings;
//! dependency references point at earlier templates in the same set's
//! declared order, which the application engine relies on when remapping.

use super::template::{TaskCategory, TaskPriority, TaskTemplate, TaskTemplateSet};

/// All shipped template sets.
pub fn builtin_sets() -> Vec<TaskTemplateSet> {
    vec![conference_set(), workshop_set()]
}

/// Look up one set by id.
pub fn find_set(id: &str) -> Option<TaskTemplateSet> {
    builtin_sets().into_iter().find(|set| set.id == id)
}

fn conference_set() -> TaskTemplateSet {
    TaskTemplateSet {
        id: "conference",
        event_type: "conference",
        name: "Conference launch checklist",
        templates: vec![
            TaskTemplate {
                id: "setup-venue-booking",
                name: "Book the venue",
                description: "Shortlist venues, negotiate rates, sign the contract",
                category: TaskCategory::Setup,
                priority: TaskPriority::Urgent,
                estimated_duration_hours: 20,
                dependencies: &[],
                tags: &["venue", "contract"],
                is_default: true,
            },
            TaskTemplate {
                id: "setup-budget-plan",
                name: "Draft the master budget",
                description: "Allocate budget across departments and committees",
                category: TaskCategory::Setup,
                priority: TaskPriority::High,
                estimated_duration_hours: 8,
                dependencies: &[],
                tags: &["budget"],
                is_default: true,
            },
            TaskTemplate {
                id: "marketing-announcement",
                name: "Publish the announcement",
                description: "Launch site, social posts, and the first mailer",
                category: TaskCategory::Marketing,
                priority: TaskPriority::High,
                estimated_duration_hours: 12,
                dependencies: &["setup-venue-booking"],
                tags: &["announcement"],
                is_default: true,
            },
            TaskTemplate {
                id: "marketing-speaker-outreach",
                name: "Open speaker outreach",
                description: "Invite keynotes and open the call for proposals",
                category: TaskCategory::Marketing,
                priority: TaskPriority::Normal,
                estimated_duration_hours: 16,
                dependencies: &["marketing-announcement"],
                tags: &["speakers", "cfp"],
                is_default: true,
            },
            TaskTemplate {
                id: "registration-open",
                name: "Open registration",
                description: "Configure ticket tiers and open public registration",
                category: TaskCategory::Registration,
                priority: TaskPriority::High,
                estimated_duration_hours: 10,
                dependencies: &["setup-venue-booking", "marketing-announcement"],
                tags: &["tickets"],
                is_default: true,
            },
            TaskTemplate {
                id: "technical-av-setup",
                name: "Plan AV and streaming",
                description: "Stage AV requirements, streaming vendor, recording plan",
                category: TaskCategory::Technical,
                priority: TaskPriority::Normal,
                estimated_duration_hours: 14,
                dependencies: &["setup-venue-booking"],
                tags: &["av", "streaming"],
                is_default: true,
            },
            TaskTemplate {
                id: "logistics-catering",
                name: "Confirm catering",
                description: "Finalize menus and headcount with the caterer",
                category: TaskCategory::Logistics,
                priority: TaskPriority::Normal,
                estimated_duration_hours: 6,
                dependencies: &["registration-open"],
                tags: &["catering"],
                is_default: true,
            },
            TaskTemplate {
                id: "logistics-signage",
                name: "Produce signage",
                description: "Wayfinding, stage backdrops, sponsor walls",
                category: TaskCategory::Logistics,
                priority: TaskPriority::Low,
                estimated_duration_hours: 8,
                dependencies: &["setup-venue-booking"],
                tags: &["print"],
                is_default: false,
            },
            TaskTemplate {
                id: "post-event-survey",
                name: "Send the attendee survey",
                description: "Survey attendees and compile the feedback report",
                category: TaskCategory::PostEvent,
                priority: TaskPriority::Normal,
                estimated_duration_hours: 4,
                dependencies: &["registration-open"],
                tags: &["feedback"],
                is_default: true,
            },
            TaskTemplate {
                id: "post-event-retro",
                name: "Run the team retrospective",
                description: "Retro across committees; archive learnings",
                category: TaskCategory::PostEvent,
                priority: TaskPriority::Low,
                estimated_duration_hours: 3,
                dependencies: &["post-event-survey"],
                tags: &["retro"],
                is_default: false,
            },
        ],
    }
}

fn workshop_set() -> TaskTemplateSet {
    TaskTemplateSet {
        id: "workshop",
        event_type: "workshop",
        name: "Workshop checklist",
        templates: vec![
            TaskTemplate {
                id: "setup-room-booking",
                name: "Book the room",
                description: "Reserve a room sized for the expected cohort",
                category: TaskCategory::Setup,
                priority: TaskPriority::High,
                estimated_duration_hours: 3,
                dependencies: &[],
                tags: &["venue"],
                is_default: true,
            },
            TaskTemplate {
                id: "marketing-invites",
                name: "Send invitations",
                description: "Target list, invite mailer, reminder sequence",
                category: TaskCategory::Marketing,
                priority: TaskPriority::Normal,
                estimated_duration_hours: 4,
                dependencies: &["setup-room-booking"],
                tags: &["invites"],
                is_default: true,
            },
            TaskTemplate {
                id: "technical-materials",
                name: "Prepare materials",
                description: "Slides, lab environments, handouts",
                category: TaskCategory::Technical,
                priority: TaskPriority::High,
                estimated_duration_hours: 10,
                dependencies: &[],
                tags: &["materials"],
                is_default: true,
            },
            TaskTemplate {
                id: "post-event-survey",
                name: "Send the feedback survey",
                description: "Short survey to participants",
                category: TaskCategory::PostEvent,
                priority: TaskPriority::Normal,
                estimated_duration_hours: 1,
                dependencies: &["marketing-invites"],
                tags: &["feedback"],
                is_default: true,
            },
        ],
    }
}
