//! Command/query facade over the milestone, notification, and comment stores.
//!
//! Mutations of one document's milestone set serialize on a per-document
//! mutex held for validate-then-persist, so dependency checks always see a
//! consistent snapshot and two transitions of the same milestone cannot
//! interleave. The store update is additionally a compare-and-swap on the
//! milestone version.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info};
use uuid::Uuid;

use legis_core::{
    Comment, CommentStore, DocumentRef, Milestone, MilestoneStatus, MilestoneStore, Notification,
    NotificationKind, NotificationStore, Priority, TimelineError,
};

use crate::graph;
use crate::lifecycle;
use crate::notify::NotificationDispatcher;
use crate::progress::{self, StatusCounts};

#[derive(Debug, Clone)]
pub struct NewMilestone {
    pub document: DocumentRef,
    pub name: String,
    pub description: Option<String>,
    pub priority: Priority,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub assigned_to: Option<Uuid>,
    pub dependency_id: Option<Uuid>,
}

/// Partial edit. Status moves only through `transition`; the dependency only
/// through `set_dependency`.
#[derive(Debug, Clone, Default)]
pub struct MilestonePatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub assigned_to: Option<Uuid>,
    pub note: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MilestoneDetail {
    pub milestone: Milestone,
    pub ready: bool,
    pub dependents: Vec<Uuid>,
}

#[derive(Debug, Clone)]
pub struct DocumentProgress {
    pub document_id: Uuid,
    pub total: usize,
    pub counts: StatusCounts,
    pub completion_percent: u8,
    pub overdue: usize,
    pub next_due: Option<NaiveDate>,
}

#[derive(Default)]
struct DocumentLocks {
    inner: RwLock<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl DocumentLocks {
    async fn acquire(&self, document_id: Uuid) -> Arc<Mutex<()>> {
        if let Some(lock) = self.inner.read().await.get(&document_id) {
            return lock.clone();
        }
        let mut writable = self.inner.write().await;
        writable
            .entry(document_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

pub struct TimelineService<M, N, C> {
    milestones: M,
    dispatcher: NotificationDispatcher<N>,
    comments: C,
    locks: DocumentLocks,
}

impl<M, N, C> TimelineService<M, N, C>
where
    M: MilestoneStore,
    N: NotificationStore,
    C: CommentStore,
{
    pub fn new(milestones: M, notifications: N, comments: C) -> Self {
        Self {
            milestones,
            dispatcher: NotificationDispatcher::new(notifications),
            comments,
            locks: DocumentLocks::default(),
        }
    }

    pub fn with_dispatch_timeout(
        milestones: M,
        notifications: N,
        comments: C,
        timeout: Duration,
    ) -> Self {
        Self {
            milestones,
            dispatcher: NotificationDispatcher::with_timeout(notifications, timeout),
            comments,
            locks: DocumentLocks::default(),
        }
    }

    pub async fn create_milestone(
        &self,
        new: NewMilestone,
        actor: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Milestone, TimelineError> {
        let name = new.name.trim().to_string();
        if name.is_empty() {
            return Err(TimelineError::Validation(
                "milestone name is required".to_string(),
            ));
        }
        let due_date = new
            .due_date
            .ok_or_else(|| TimelineError::Validation("due_date is required".to_string()))?;

        let id = Uuid::new_v4();
        let lock = self.locks.acquire(new.document.id).await;
        let _guard = lock.lock().await;

        if let Some(dependency_id) = new.dependency_id {
            let snapshot = self.milestones.list_by_document(new.document.id).await?;
            graph::validate_dependency(&snapshot, id, dependency_id)?;
        }

        let milestone = Milestone {
            id,
            document: new.document,
            name,
            description: trimmed(new.description),
            status: MilestoneStatus::Pending,
            priority: new.priority,
            start_date: new.start_date,
            due_date,
            completed_date: None,
            assigned_to: new.assigned_to,
            dependency_id: new.dependency_id,
            notes: None,
            actual_duration_days: None,
            version: 1,
            created_at: now,
            updated_at: now,
        };
        self.milestones.insert(&milestone).await?;
        info!(
            "milestone {} created for document {} by {}",
            milestone.id, milestone.document.id, actor
        );

        if let Some(user_id) = milestone.assigned_to {
            self.dispatcher.assignment(&milestone, user_id, now).await?;
        }

        Ok(milestone)
    }

    pub async fn update_milestone(
        &self,
        milestone_id: Uuid,
        patch: MilestonePatch,
        actor: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Milestone, TimelineError> {
        let current = self.milestones.get(milestone_id).await?;
        let lock = self.locks.acquire(current.document.id).await;
        let _guard = lock.lock().await;

        let mut milestone = self.milestones.get(milestone_id).await?;
        if let Some(name) = patch.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(TimelineError::Validation(
                    "milestone name is required".to_string(),
                ));
            }
            milestone.name = name;
        }
        if patch.description.is_some() {
            milestone.description = trimmed(patch.description);
        }
        if let Some(priority) = patch.priority {
            milestone.priority = priority;
        }
        if let Some(start_date) = patch.start_date {
            milestone.start_date = Some(start_date);
        }
        if let Some(due_date) = patch.due_date {
            milestone.due_date = due_date;
        }
        let newly_assigned = match patch.assigned_to {
            Some(user_id) if milestone.assigned_to != Some(user_id) => {
                milestone.assigned_to = Some(user_id);
                Some(user_id)
            }
            _ => None,
        };
        if let Some(note) = patch.note.as_deref() {
            lifecycle::append_note(&mut milestone, note);
        }
        milestone.updated_at = now;

        let stored = self.milestones.update(&milestone).await?;
        info!("milestone {} updated by {}", stored.id, actor);

        if let Some(user_id) = newly_assigned {
            self.dispatcher.assignment(&stored, user_id, now).await?;
        }

        Ok(stored)
    }

    /// Moves a milestone along the status state machine. The dependency
    /// graph never gates this; readiness is informational only.
    pub async fn transition(
        &self,
        milestone_id: Uuid,
        to: MilestoneStatus,
        note: Option<&str>,
        actor: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Milestone, TimelineError> {
        let current = self.milestones.get(milestone_id).await?;
        let lock = self.locks.acquire(current.document.id).await;
        let _guard = lock.lock().await;

        let mut milestone = self.milestones.get(milestone_id).await?;
        lifecycle::apply_transition(&mut milestone, to, note, now)?;
        let stored = self.milestones.update(&milestone).await?;
        info!(
            "milestone {} moved to {} by {}",
            stored.id, stored.status, actor
        );

        // The state change above is authoritative; a dispatch failure is
        // reported but never undoes it.
        self.dispatcher.status_update(&stored, now).await?;

        Ok(stored)
    }

    pub async fn set_dependency(
        &self,
        milestone_id: Uuid,
        dependency_id: Option<Uuid>,
        actor: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Milestone, TimelineError> {
        let current = self.milestones.get(milestone_id).await?;
        let lock = self.locks.acquire(current.document.id).await;
        let _guard = lock.lock().await;

        let snapshot = self.milestones.list_by_document(current.document.id).await?;
        let mut milestone = snapshot
            .iter()
            .find(|candidate| candidate.id == milestone_id)
            .cloned()
            .ok_or(TimelineError::NotFound(milestone_id))?;

        if let Some(target_id) = dependency_id {
            graph::validate_dependency(&snapshot, milestone_id, target_id)?;
        }

        milestone.dependency_id = dependency_id;
        milestone.updated_at = now;
        let stored = self.milestones.update(&milestone).await?;
        match dependency_id {
            Some(target_id) => info!(
                "milestone {} now depends on {} (set by {})",
                stored.id, target_id, actor
            ),
            None => info!("milestone {} dependency cleared by {}", stored.id, actor),
        }

        Ok(stored)
    }

    pub async fn milestone_detail(
        &self,
        milestone_id: Uuid,
    ) -> Result<MilestoneDetail, TimelineError> {
        let milestone = self.milestones.get(milestone_id).await?;
        let snapshot = self
            .milestones
            .list_by_document(milestone.document.id)
            .await?;
        let ready = graph::is_ready(&snapshot, milestone_id)?;
        let dependents = graph::dependents_of(&snapshot, milestone_id);
        Ok(MilestoneDetail {
            milestone,
            ready,
            dependents,
        })
    }

    /// Document timeline in display order: due date ascending, then priority
    /// with the most urgent first.
    pub async fn timeline(&self, document_id: Uuid) -> Result<Vec<Milestone>, TimelineError> {
        let mut milestones = self.milestones.list_by_document(document_id).await?;
        milestones.sort_by(|a, b| {
            a.due_date
                .cmp(&b.due_date)
                .then_with(|| b.priority.cmp(&a.priority))
        });
        Ok(milestones)
    }

    pub async fn progress(
        &self,
        document_id: Uuid,
        today: NaiveDate,
    ) -> Result<DocumentProgress, TimelineError> {
        let milestones = self.milestones.list_by_document(document_id).await?;
        Ok(DocumentProgress {
            document_id,
            total: milestones.len(),
            counts: progress::status_counts(&milestones),
            completion_percent: progress::completion_percent(&milestones),
            overdue: progress::overdue_count(&milestones, today),
            next_due: progress::next_due(&milestones),
        })
    }

    pub async fn add_comment(
        &self,
        milestone_id: Uuid,
        author_id: Uuid,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<Comment, TimelineError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(TimelineError::Validation(
                "comment text is required".to_string(),
            ));
        }
        let milestone = self.milestones.get(milestone_id).await?;

        let comment = Comment {
            id: Uuid::new_v4(),
            milestone_id,
            author_id,
            text: text.to_string(),
            created_at: now,
        };
        self.comments.insert(&comment).await?;

        self.dispatcher.comment(&milestone, author_id, now).await?;

        Ok(comment)
    }

    pub async fn comments(&self, milestone_id: Uuid) -> Result<Vec<Comment>, TimelineError> {
        self.comments.list_by_milestone(milestone_id).await
    }

    pub async fn notifications(
        &self,
        user_id: Uuid,
        unread_only: bool,
    ) -> Result<Vec<Notification>, TimelineError> {
        self.dispatcher.store().list_for_user(user_id, unread_only).await
    }

    pub async fn mark_notification_read(
        &self,
        notification_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Notification, TimelineError> {
        self.dispatcher.store().mark_read(notification_id, now).await
    }

    /// Dispatches one overdue notification per overdue milestone/assignee,
    /// skipping anyone who already has an unread one. Individual dispatch
    /// failures are logged and do not stop the sweep.
    pub async fn sweep_overdue(
        &self,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Vec<(Milestone, Notification)>, TimelineError> {
        let overdue = self.milestones.list_overdue(today).await?;
        let mut dispatched = Vec::new();
        for milestone in overdue {
            let Some(user_id) = milestone.assigned_to else {
                continue;
            };
            if self
                .dispatcher
                .store()
                .exists_unread(milestone.id, user_id, NotificationKind::Overdue)
                .await?
            {
                continue;
            }
            match self.dispatcher.overdue(&milestone, now).await {
                Ok(Some(notification)) => dispatched.push((milestone, notification)),
                Ok(None) => {}
                Err(err) => {
                    error!("overdue dispatch failed for milestone {}: {err}", milestone.id);
                }
            }
        }
        Ok(dispatched)
    }
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}
