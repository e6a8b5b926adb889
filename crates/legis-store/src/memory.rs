//! In-memory stores, used by the engine's tests and embeddable callers.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use legis_core::{
    Comment, CommentStore, Milestone, MilestoneStore, Notification, NotificationKind,
    NotificationStore, TimelineError,
};

#[derive(Default)]
pub struct MemoryMilestoneStore {
    rows: RwLock<HashMap<Uuid, Milestone>>,
}

#[async_trait]
impl MilestoneStore for MemoryMilestoneStore {
    async fn insert(&self, milestone: &Milestone) -> Result<(), TimelineError> {
        let mut rows = self.rows.write().await;
        rows.insert(milestone.id, milestone.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Milestone, TimelineError> {
        let rows = self.rows.read().await;
        rows.get(&id).cloned().ok_or(TimelineError::NotFound(id))
    }

    async fn list_by_document(&self, document_id: Uuid) -> Result<Vec<Milestone>, TimelineError> {
        let rows = self.rows.read().await;
        Ok(rows
            .values()
            .filter(|milestone| milestone.document.id == document_id)
            .cloned()
            .collect())
    }

    async fn update(&self, milestone: &Milestone) -> Result<Milestone, TimelineError> {
        let mut rows = self.rows.write().await;
        let stored = rows
            .get_mut(&milestone.id)
            .ok_or(TimelineError::NotFound(milestone.id))?;
        if stored.version != milestone.version {
            return Err(TimelineError::StaleUpdate(milestone.id));
        }
        let mut next = milestone.clone();
        next.version += 1;
        *stored = next.clone();
        Ok(next)
    }

    async fn list_overdue(&self, today: NaiveDate) -> Result<Vec<Milestone>, TimelineError> {
        let rows = self.rows.read().await;
        Ok(rows
            .values()
            .filter(|milestone| milestone.due_date < today && !milestone.status.is_terminal())
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct MemoryNotificationStore {
    rows: RwLock<Vec<Notification>>,
}

#[async_trait]
impl NotificationStore for MemoryNotificationStore {
    async fn insert(&self, notification: &Notification) -> Result<(), TimelineError> {
        let mut rows = self.rows.write().await;
        rows.push(notification.clone());
        Ok(())
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
        unread_only: bool,
    ) -> Result<Vec<Notification>, TimelineError> {
        let rows = self.rows.read().await;
        // reverse insertion order stands in for created_at DESC
        Ok(rows
            .iter()
            .rev()
            .filter(|notification| notification.user_id == user_id)
            .filter(|notification| !unread_only || !notification.read)
            .cloned()
            .collect())
    }

    async fn exists_unread(
        &self,
        milestone_id: Uuid,
        user_id: Uuid,
        kind: NotificationKind,
    ) -> Result<bool, TimelineError> {
        let rows = self.rows.read().await;
        Ok(rows.iter().any(|notification| {
            notification.milestone_id == milestone_id
                && notification.user_id == user_id
                && notification.kind == kind
                && !notification.read
        }))
    }

    async fn mark_read(
        &self,
        id: Uuid,
        read_at: DateTime<Utc>,
    ) -> Result<Notification, TimelineError> {
        let mut rows = self.rows.write().await;
        let notification = rows
            .iter_mut()
            .find(|notification| notification.id == id)
            .ok_or(TimelineError::NotFound(id))?;
        if !notification.read {
            notification.read = true;
            notification.read_at = Some(read_at);
        }
        Ok(notification.clone())
    }
}

#[derive(Default)]
pub struct MemoryCommentStore {
    rows: RwLock<Vec<Comment>>,
}

#[async_trait]
impl CommentStore for MemoryCommentStore {
    async fn insert(&self, comment: &Comment) -> Result<(), TimelineError> {
        let mut rows = self.rows.write().await;
        rows.push(comment.clone());
        Ok(())
    }

    async fn list_by_milestone(
        &self,
        milestone_id: Uuid,
    ) -> Result<Vec<Comment>, TimelineError> {
        let rows = self.rows.read().await;
        Ok(rows
            .iter()
            .rev()
            .filter(|comment| comment.milestone_id == milestone_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use legis_core::{DocumentRef, DocumentType, MilestoneStatus, Priority};

    use super::*;

    fn milestone(id: u128, due: (i32, u32, u32), status: MilestoneStatus) -> Milestone {
        let created = Utc.with_ymd_and_hms(2025, 1, 2, 8, 0, 0).unwrap();
        Milestone {
            id: Uuid::from_u128(id),
            document: DocumentRef {
                id: Uuid::from_u128(900),
                doc_type: DocumentType::Ordinance,
            },
            name: format!("milestone-{id}"),
            description: None,
            status,
            priority: Priority::Medium,
            start_date: None,
            due_date: NaiveDate::from_ymd_opt(due.0, due.1, due.2).unwrap(),
            completed_date: None,
            assigned_to: None,
            dependency_id: None,
            notes: None,
            actual_duration_days: None,
            version: 1,
            created_at: created,
            updated_at: created,
        }
    }

    #[tokio::test]
    async fn get_unknown_is_not_found() {
        let store = MemoryMilestoneStore::default();
        let err = store.get(Uuid::from_u128(1)).await.unwrap_err();
        assert!(matches!(err, TimelineError::NotFound(_)));
    }

    #[tokio::test]
    async fn update_is_a_compare_and_swap_on_version() {
        let store = MemoryMilestoneStore::default();
        let m = milestone(1, (2025, 2, 1), MilestoneStatus::Pending);
        store.insert(&m).await.unwrap();

        let mut first = m.clone();
        first.status = MilestoneStatus::InProgress;
        let stored = store.update(&first).await.unwrap();
        assert_eq!(stored.version, 2);

        // second writer still holds version 1
        let mut second = m.clone();
        second.status = MilestoneStatus::Cancelled;
        let err = store.update(&second).await.unwrap_err();
        assert!(matches!(err, TimelineError::StaleUpdate(_)));
        assert_eq!(
            store.get(m.id).await.unwrap().status,
            MilestoneStatus::InProgress
        );
    }

    #[tokio::test]
    async fn overdue_listing_excludes_terminal_statuses() {
        let store = MemoryMilestoneStore::default();
        store
            .insert(&milestone(1, (2025, 1, 10), MilestoneStatus::Pending))
            .await
            .unwrap();
        store
            .insert(&milestone(2, (2025, 1, 10), MilestoneStatus::Completed))
            .await
            .unwrap();
        store
            .insert(&milestone(3, (2025, 1, 10), MilestoneStatus::Cancelled))
            .await
            .unwrap();
        store
            .insert(&milestone(4, (2025, 2, 1), MilestoneStatus::Pending))
            .await
            .unwrap();

        let today = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        let overdue = store.list_overdue(today).await.unwrap();
        assert_eq!(overdue.len(), 1);
        assert_eq!(overdue[0].id, Uuid::from_u128(1));
    }

    #[tokio::test]
    async fn mark_read_keeps_the_first_read_time() {
        let store = MemoryNotificationStore::default();
        let created = Utc.with_ymd_and_hms(2025, 1, 2, 8, 0, 0).unwrap();
        let notification = Notification {
            id: Uuid::from_u128(1),
            milestone_id: Uuid::from_u128(10),
            user_id: Uuid::from_u128(7),
            kind: NotificationKind::Assignment,
            message: "assigned".to_string(),
            read: false,
            read_at: None,
            created_at: created,
        };
        store.insert(&notification).await.unwrap();

        let first = Utc.with_ymd_and_hms(2025, 1, 3, 9, 0, 0).unwrap();
        let second = Utc.with_ymd_and_hms(2025, 1, 4, 9, 0, 0).unwrap();
        assert_eq!(
            store.mark_read(notification.id, first).await.unwrap().read_at,
            Some(first)
        );
        assert_eq!(
            store.mark_read(notification.id, second).await.unwrap().read_at,
            Some(first)
        );
    }
}
