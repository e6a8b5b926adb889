use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Milestone;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelineEventKind {
    MilestoneCreated,
    MilestoneUpdated,
    StatusChanged,
    DependencySet,
    CommentAdded,
    OverdueDetected,
}

impl TimelineEventKind {
    /// Redis channel the event is published on. Consumed by the portal's
    /// dashboard refresh, never by this service.
    pub fn channel(&self) -> &'static str {
        match self {
            TimelineEventKind::MilestoneCreated => "timeline.milestone.created",
            TimelineEventKind::MilestoneUpdated => "timeline.milestone.updated",
            TimelineEventKind::StatusChanged => "timeline.milestone.status_changed",
            TimelineEventKind::DependencySet => "timeline.milestone.dependency_set",
            TimelineEventKind::CommentAdded => "timeline.milestone.comment_added",
            TimelineEventKind::OverdueDetected => "timeline.milestone.overdue",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub id: Uuid,
    pub document_id: Uuid,
    pub milestone_id: Uuid,
    pub kind: TimelineEventKind,
    pub occurred_at: DateTime<Utc>,
    pub payload: serde_json::Value,
}

impl TimelineEvent {
    pub fn new(
        kind: TimelineEventKind,
        milestone: &Milestone,
        payload: serde_json::Value,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_id: milestone.document.id,
            milestone_id: milestone.id,
            kind,
            occurred_at,
            payload,
        }
    }
}
