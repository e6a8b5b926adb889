//! Notification construction and dispatch.
//!
//! Delivery is "persist for later retrieval"; no transport lives here. A
//! dispatch failure or timeout surfaces as `Dispatch` and never rolls back
//! the state change that triggered it.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use legis_core::{Milestone, Notification, NotificationKind, NotificationStore, TimelineError};

pub const DEFAULT_DISPATCH_TIMEOUT: Duration = Duration::from_secs(5);

pub struct NotificationDispatcher<N> {
    store: N,
    timeout: Duration,
}

impl<N: NotificationStore> NotificationDispatcher<N> {
    pub fn new(store: N) -> Self {
        Self::with_timeout(store, DEFAULT_DISPATCH_TIMEOUT)
    }

    pub fn with_timeout(store: N, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    pub fn store(&self) -> &N {
        &self.store
    }

    pub async fn assignment(
        &self,
        milestone: &Milestone,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Notification, TimelineError> {
        let message = format!(
            "You have been assigned milestone '{}', due {}",
            milestone.name, milestone.due_date
        );
        self.persist(build(
            milestone.id,
            user_id,
            NotificationKind::Assignment,
            message,
            now,
        ))
        .await
    }

    /// Targets the assignee; a milestone with no assignee is silently
    /// dropped and reported as `None`.
    pub async fn status_update(
        &self,
        milestone: &Milestone,
        now: DateTime<Utc>,
    ) -> Result<Option<Notification>, TimelineError> {
        let Some(user_id) = milestone.assigned_to else {
            debug!("milestone {} has no assignee, dropping status notification", milestone.id);
            return Ok(None);
        };
        let message = format!("Milestone '{}' is now {}", milestone.name, milestone.status);
        self.persist(build(
            milestone.id,
            user_id,
            NotificationKind::StatusUpdate,
            message,
            now,
        ))
        .await
        .map(Some)
    }

    /// Skipped when the assignee wrote the comment themselves, or when there
    /// is nobody to tell.
    pub async fn comment(
        &self,
        milestone: &Milestone,
        author_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<Notification>, TimelineError> {
        let Some(user_id) = milestone.assigned_to else {
            return Ok(None);
        };
        if user_id == author_id {
            return Ok(None);
        }
        let message = format!("New comment on milestone '{}'", milestone.name);
        self.persist(build(
            milestone.id,
            user_id,
            NotificationKind::Comment,
            message,
            now,
        ))
        .await
        .map(Some)
    }

    pub async fn overdue(
        &self,
        milestone: &Milestone,
        now: DateTime<Utc>,
    ) -> Result<Option<Notification>, TimelineError> {
        let Some(user_id) = milestone.assigned_to else {
            return Ok(None);
        };
        let message = format!(
            "Milestone '{}' is overdue (was due {})",
            milestone.name, milestone.due_date
        );
        self.persist(build(
            milestone.id,
            user_id,
            NotificationKind::Overdue,
            message,
            now,
        ))
        .await
        .map(Some)
    }

    async fn persist(&self, notification: Notification) -> Result<Notification, TimelineError> {
        match tokio::time::timeout(self.timeout, self.store.insert(&notification)).await {
            Ok(Ok(())) => Ok(notification),
            Ok(Err(err)) => Err(TimelineError::Dispatch(err.to_string())),
            Err(_) => Err(TimelineError::Dispatch(format!(
                "notification store did not answer within {:?}",
                self.timeout
            ))),
        }
    }
}

fn build(
    milestone_id: Uuid,
    user_id: Uuid,
    kind: NotificationKind,
    message: String,
    now: DateTime<Utc>,
) -> Notification {
    Notification {
        id: Uuid::new_v4(),
        milestone_id,
        user_id,
        kind,
        message,
        read: false,
        read_at: None,
        created_at: now,
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::{NaiveDate, TimeZone};
    use legis_core::{DocumentRef, DocumentType, MilestoneStatus, Priority};
    use legis_store::memory::MemoryNotificationStore;

    use super::*;

    fn milestone(assigned_to: Option<Uuid>) -> Milestone {
        let created = Utc.with_ymd_and_hms(2025, 1, 2, 8, 0, 0).unwrap();
        Milestone {
            id: Uuid::from_u128(1),
            document: DocumentRef {
                id: Uuid::from_u128(900),
                doc_type: DocumentType::Ordinance,
            },
            name: "public hearing".to_string(),
            description: None,
            status: MilestoneStatus::InProgress,
            priority: Priority::Urgent,
            start_date: None,
            due_date: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
            completed_date: None,
            assigned_to,
            dependency_id: None,
            notes: None,
            actual_duration_days: None,
            version: 1,
            created_at: created,
            updated_at: created,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 20, 9, 0, 0).unwrap()
    }

    struct FailingStore;

    #[async_trait]
    impl NotificationStore for FailingStore {
        async fn insert(&self, _notification: &Notification) -> Result<(), TimelineError> {
            Err(TimelineError::Storage(anyhow::anyhow!(
                "connection refused"
            )))
        }

        async fn list_for_user(
            &self,
            _user_id: Uuid,
            _unread_only: bool,
        ) -> Result<Vec<Notification>, TimelineError> {
            Ok(Vec::new())
        }

        async fn exists_unread(
            &self,
            _milestone_id: Uuid,
            _user_id: Uuid,
            _kind: NotificationKind,
        ) -> Result<bool, TimelineError> {
            Ok(false)
        }

        async fn mark_read(
            &self,
            id: Uuid,
            _read_at: DateTime<Utc>,
        ) -> Result<Notification, TimelineError> {
            Err(TimelineError::NotFound(id))
        }
    }

    struct StalledStore;

    #[async_trait]
    impl NotificationStore for StalledStore {
        async fn insert(&self, _notification: &Notification) -> Result<(), TimelineError> {
            std::future::pending::<()>().await;
            unreachable!()
        }

        async fn list_for_user(
            &self,
            _user_id: Uuid,
            _unread_only: bool,
        ) -> Result<Vec<Notification>, TimelineError> {
            Ok(Vec::new())
        }

        async fn exists_unread(
            &self,
            _milestone_id: Uuid,
            _user_id: Uuid,
            _kind: NotificationKind,
        ) -> Result<bool, TimelineError> {
            Ok(false)
        }

        async fn mark_read(
            &self,
            id: Uuid,
            _read_at: DateTime<Utc>,
        ) -> Result<Notification, TimelineError> {
            Err(TimelineError::NotFound(id))
        }
    }

    #[tokio::test]
    async fn status_update_persists_for_assignee() {
        let dispatcher = NotificationDispatcher::new(MemoryNotificationStore::default());
        let assignee = Uuid::from_u128(7);
        let sent = dispatcher
            .status_update(&milestone(Some(assignee)), now())
            .await
            .unwrap()
            .expect("notification expected");
        assert_eq!(sent.user_id, assignee);
        assert_eq!(sent.kind, NotificationKind::StatusUpdate);
        assert_eq!(sent.message, "Milestone 'public hearing' is now in_progress");
        assert!(!sent.read);

        let stored = dispatcher
            .store()
            .list_for_user(assignee, true)
            .await
            .unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, sent.id);
    }

    #[tokio::test]
    async fn missing_assignee_drops_without_error() {
        let dispatcher = NotificationDispatcher::new(MemoryNotificationStore::default());
        assert!(dispatcher
            .status_update(&milestone(None), now())
            .await
            .unwrap()
            .is_none());
        assert!(dispatcher
            .overdue(&milestone(None), now())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn comment_by_the_assignee_is_not_echoed_back() {
        let dispatcher = NotificationDispatcher::new(MemoryNotificationStore::default());
        let assignee = Uuid::from_u128(7);
        let m = milestone(Some(assignee));
        assert!(dispatcher.comment(&m, assignee, now()).await.unwrap().is_none());
        assert!(dispatcher
            .comment(&m, Uuid::from_u128(8), now())
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn store_failure_surfaces_as_dispatch_error() {
        let dispatcher = NotificationDispatcher::new(FailingStore);
        let err = dispatcher
            .assignment(&milestone(None), Uuid::from_u128(7), now())
            .await
            .unwrap_err();
        assert!(matches!(err, TimelineError::Dispatch(_)));
    }

    #[tokio::test]
    async fn stalled_store_times_out_instead_of_hanging() {
        let dispatcher =
            NotificationDispatcher::with_timeout(StalledStore, Duration::from_millis(20));
        let err = dispatcher
            .status_update(&milestone(Some(Uuid::from_u128(7))), now())
            .await
            .unwrap_err();
        assert!(matches!(err, TimelineError::Dispatch(_)));
    }
}
