use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::errors::TimelineError;
use crate::models::{Comment, Milestone, Notification, NotificationKind};

#[async_trait]
pub trait MilestoneStore: Send + Sync {
    async fn insert(&self, milestone: &Milestone) -> Result<(), TimelineError>;

    async fn get(&self, id: Uuid) -> Result<Milestone, TimelineError>;

    /// No ordering guarantee; callers sort for display.
    async fn list_by_document(&self, document_id: Uuid) -> Result<Vec<Milestone>, TimelineError>;

    /// Compare-and-swap update keyed on `milestone.version`. Returns the
    /// stored row with the version bumped, or `StaleUpdate` when another
    /// writer got there first.
    async fn update(&self, milestone: &Milestone) -> Result<Milestone, TimelineError>;

    /// Milestones past their due date and not in a terminal status.
    async fn list_overdue(&self, today: NaiveDate) -> Result<Vec<Milestone>, TimelineError>;
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn insert(&self, notification: &Notification) -> Result<(), TimelineError>;

    async fn list_for_user(
        &self,
        user_id: Uuid,
        unread_only: bool,
    ) -> Result<Vec<Notification>, TimelineError>;

    async fn exists_unread(
        &self,
        milestone_id: Uuid,
        user_id: Uuid,
        kind: NotificationKind,
    ) -> Result<bool, TimelineError>;

    /// Marks the notification read; the first read timestamp wins.
    async fn mark_read(
        &self,
        id: Uuid,
        read_at: DateTime<Utc>,
    ) -> Result<Notification, TimelineError>;
}

#[async_trait]
pub trait CommentStore: Send + Sync {
    async fn insert(&self, comment: &Comment) -> Result<(), TimelineError>;

    async fn list_by_milestone(
        &self,
        milestone_id: Uuid,
    ) -> Result<Vec<Comment>, TimelineError>;
}
