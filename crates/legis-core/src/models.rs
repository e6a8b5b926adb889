use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::TimelineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Ordinance,
    Resolution,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Ordinance => "ordinance",
            DocumentType::Resolution => "resolution",
        }
    }

    pub fn parse(value: &str) -> Result<Self, TimelineError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ordinance" => Ok(DocumentType::Ordinance),
            "resolution" => Ok(DocumentType::Resolution),
            _ => Err(TimelineError::Validation(
                "document_type must be ordinance or resolution".to_string(),
            )),
        }
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference into the external document registry. The timeline service only
/// scopes milestones by it and never mutates the document itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRef {
    pub id: Uuid,
    pub doc_type: DocumentType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneStatus {
    Pending,
    InProgress,
    Completed,
    Delayed,
    Cancelled,
}

impl MilestoneStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MilestoneStatus::Pending => "pending",
            MilestoneStatus::InProgress => "in_progress",
            MilestoneStatus::Completed => "completed",
            MilestoneStatus::Delayed => "delayed",
            MilestoneStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Result<Self, TimelineError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(MilestoneStatus::Pending),
            "in_progress" => Ok(MilestoneStatus::InProgress),
            "completed" => Ok(MilestoneStatus::Completed),
            "delayed" => Ok(MilestoneStatus::Delayed),
            "cancelled" => Ok(MilestoneStatus::Cancelled),
            _ => Err(TimelineError::Validation(
                "status must be one of pending, in_progress, completed, delayed, cancelled"
                    .to_string(),
            )),
        }
    }

    /// Completed and cancelled milestones accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, MilestoneStatus::Completed | MilestoneStatus::Cancelled)
    }
}

impl std::fmt::Display for MilestoneStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
    Emergency,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
            Priority::Emergency => "emergency",
        }
    }

    pub fn parse(value: &str) -> Result<Self, TimelineError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            "urgent" => Ok(Priority::Urgent),
            "emergency" => Ok(Priority::Emergency),
            _ => Err(TimelineError::Validation(
                "priority must be one of low, medium, high, urgent, emergency".to_string(),
            )),
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Milestone {
    pub id: Uuid,
    pub document: DocumentRef,
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

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Assignment,
    StatusUpdate,
    Comment,
    Overdue,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Assignment => "assignment",
            NotificationKind::StatusUpdate => "status_update",
            NotificationKind::Comment => "comment",
            NotificationKind::Overdue => "overdue",
        }
    }

    pub fn parse(value: &str) -> Result<Self, TimelineError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "assignment" => Ok(NotificationKind::Assignment),
            "status_update" => Ok(NotificationKind::StatusUpdate),
            "comment" => Ok(NotificationKind::Comment),
            "overdue" => Ok(NotificationKind::Overdue),
            _ => Err(TimelineError::Validation(
                "kind must be one of assignment, status_update, comment, overdue".to_string(),
            )),
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub milestone_id: Uuid,
    pub user_id: Uuid,
    pub kind: NotificationKind,
    pub message: String,
    pub read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub milestone_id: Uuid,
    pub author_id: Uuid,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parse_accepts_stored_spellings() {
        assert_eq!(
            MilestoneStatus::parse(" In_Progress ").unwrap(),
            MilestoneStatus::InProgress
        );
        assert_eq!(
            MilestoneStatus::parse("completed").unwrap(),
            MilestoneStatus::Completed
        );
        assert!(MilestoneStatus::parse("done").is_err());
    }

    #[test]
    fn status_roundtrips_through_as_str() {
        for status in [
            MilestoneStatus::Pending,
            MilestoneStatus::InProgress,
            MilestoneStatus::Completed,
            MilestoneStatus::Delayed,
            MilestoneStatus::Cancelled,
        ] {
            assert_eq!(MilestoneStatus::parse(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn terminal_statuses() {
        assert!(MilestoneStatus::Completed.is_terminal());
        assert!(MilestoneStatus::Cancelled.is_terminal());
        assert!(!MilestoneStatus::Delayed.is_terminal());
    }

    #[test]
    fn priority_orders_by_urgency() {
        assert!(Priority::Emergency > Priority::Urgent);
        assert!(Priority::Urgent > Priority::High);
        assert!(Priority::High > Priority::Medium);
        assert!(Priority::Medium > Priority::Low);
    }

    #[test]
    fn document_type_parse_rejects_unknown() {
        assert_eq!(
            DocumentType::parse("Ordinance").unwrap(),
            DocumentType::Ordinance
        );
        assert!(DocumentType::parse("amendment").is_err());
    }
}
