use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use legis_core::{MilestoneStatus, NotificationKind, Priority};

// Requests carry free-text document_type/status/priority the way the portal
// forms submit them; the gateway parses them into the closed enumerations and
// rejects anything else at the boundary.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMilestoneRequest {
    pub document_type: String,
    pub name: String,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub assigned_to: Option<Uuid>,
    pub dependency_id: Option<Uuid>,
    pub requested_by: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateMilestoneRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub assigned_to: Option<Uuid>,
    pub note: Option<String>,
    pub requested_by: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRequest {
    pub status: String,
    pub note: Option<String>,
    pub requested_by: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetDependencyRequest {
    pub dependency_id: Option<Uuid>,
    pub requested_by: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddCommentRequest {
    pub author_id: Uuid,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListNotificationsQuery {
    pub user_id: Uuid,
    pub unread_only: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MilestoneView {
    pub id: Uuid,
    pub document_id: Uuid,
    pub document_type: String,
    pub name: String,
    pub description: Option<String>,
    pub status: MilestoneStatus,
    pub priority: Priority,
    pub start_date: Option<NaiveDate>,
    pub due_date: NaiveDate,
    pub completed_date: Option<NaiveDate>,
    pub assigned_to: Option<Uuid>,
    pub dependency_id: Option<Uuid>,
    pub notes: Option<String>,
    pub actual_duration_days: Option<i64>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MilestoneDetailView {
    pub milestone: MilestoneView,
    pub ready: bool,
    pub dependents: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentProgressView {
    pub document_id: Uuid,
    pub total: i64,
    pub pending: i64,
    pub in_progress: i64,
    pub completed: i64,
    pub delayed: i64,
    pub cancelled: i64,
    pub completion_percent: u8,
    pub overdue: i64,
    pub next_due: Option<NaiveDate>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineResponse {
    pub document_id: Uuid,
    pub milestones: Vec<MilestoneView>,
    pub progress: DocumentProgressView,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentView {
    pub id: Uuid,
    pub milestone_id: Uuid,
    pub author_id: Uuid,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationView {
    pub id: Uuid,
    pub milestone_id: Uuid,
    pub user_id: Uuid,
    pub kind: NotificationKind,
    pub message: String,
    pub read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
