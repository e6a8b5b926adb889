//! Postgres-backed stores. Enumerations are stored as text and parsed back
//! through the core parsers; a row that fails to parse reads as a storage
//! failure, not as caller input error. See schema.sql for the tables.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use legis_core::{
    Comment, CommentStore, DocumentRef, DocumentType, Milestone, MilestoneStatus, MilestoneStore,
    Notification, NotificationKind, NotificationStore, Priority, TimelineError,
};

pub struct PgMilestoneStore {
    pool: PgPool,
}

impl PgMilestoneStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const MILESTONE_COLUMNS: &str = r#"
    id, document_id, document_type, name, description, status, priority,
    start_date, due_date, completed_date, assigned_to, dependency_id,
    notes, actual_duration_days, version, created_at, updated_at
"#;

#[async_trait]
impl MilestoneStore for PgMilestoneStore {
    async fn insert(&self, milestone: &Milestone) -> Result<(), TimelineError> {
        sqlx::query(
            r#"
            INSERT INTO milestones (
                id, document_id, document_type, name, description, status, priority,
                start_date, due_date, completed_date, assigned_to, dependency_id,
                notes, actual_duration_days, version, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $16)
            "#,
        )
        .bind(milestone.id)
        .bind(milestone.document.id)
        .bind(milestone.document.doc_type.as_str())
        .bind(&milestone.name)
        .bind(&milestone.description)
        .bind(milestone.status.as_str())
        .bind(milestone.priority.as_str())
        .bind(milestone.start_date)
        .bind(milestone.due_date)
        .bind(milestone.completed_date)
        .bind(milestone.assigned_to)
        .bind(milestone.dependency_id)
        .bind(&milestone.notes)
        .bind(milestone.actual_duration_days)
        .bind(milestone.version)
        .bind(milestone.created_at)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Milestone, TimelineError> {
        let row = sqlx::query(&format!(
            "SELECT {MILESTONE_COLUMNS} FROM milestones WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?
        .ok_or(TimelineError::NotFound(id))?;

        milestone_from_row(&row)
    }

    async fn list_by_document(&self, document_id: Uuid) -> Result<Vec<Milestone>, TimelineError> {
        let rows = sqlx::query(&format!(
            "SELECT {MILESTONE_COLUMNS} FROM milestones WHERE document_id = $1"
        ))
        .bind(document_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        rows.iter().map(milestone_from_row).collect()
    }

    async fn update(&self, milestone: &Milestone) -> Result<Milestone, TimelineError> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE milestones SET
                name = $3,
                description = $4,
                status = $5,
                priority = $6,
                start_date = $7,
                due_date = $8,
                completed_date = $9,
                assigned_to = $10,
                dependency_id = $11,
                notes = $12,
                actual_duration_days = $13,
                version = version + 1,
                updated_at = $14
            WHERE id = $1 AND version = $2
            RETURNING {MILESTONE_COLUMNS}
            "#
        ))
        .bind(milestone.id)
        .bind(milestone.version)
        .bind(&milestone.name)
        .bind(&milestone.description)
        .bind(milestone.status.as_str())
        .bind(milestone.priority.as_str())
        .bind(milestone.start_date)
        .bind(milestone.due_date)
        .bind(milestone.completed_date)
        .bind(milestone.assigned_to)
        .bind(milestone.dependency_id)
        .bind(&milestone.notes)
        .bind(milestone.actual_duration_days)
        .bind(milestone.updated_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;

        match row {
            Some(row) => milestone_from_row(&row),
            None => {
                // distinguish a lost CAS race from a missing row
                let exists =
                    sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM milestones WHERE id = $1)")
                        .bind(milestone.id)
                        .fetch_one(&self.pool)
                        .await
                        .map_err(storage_error)?;
                if exists {
                    Err(TimelineError::StaleUpdate(milestone.id))
                } else {
                    Err(TimelineError::NotFound(milestone.id))
                }
            }
        }
    }

    async fn list_overdue(&self, today: NaiveDate) -> Result<Vec<Milestone>, TimelineError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {MILESTONE_COLUMNS}
            FROM milestones
            WHERE due_date < $1 AND status NOT IN ('completed', 'cancelled')
            "#
        ))
        .bind(today)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        rows.iter().map(milestone_from_row).collect()
    }
}

pub struct PgNotificationStore {
    pool: PgPool,
}

impl PgNotificationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const NOTIFICATION_COLUMNS: &str =
    "id, milestone_id, user_id, kind, message, read, read_at, created_at";

#[async_trait]
impl NotificationStore for PgNotificationStore {
    async fn insert(&self, notification: &Notification) -> Result<(), TimelineError> {
        sqlx::query(
            r#"
            INSERT INTO notifications (
                id, milestone_id, user_id, kind, message, read, read_at, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(notification.id)
        .bind(notification.milestone_id)
        .bind(notification.user_id)
        .bind(notification.kind.as_str())
        .bind(&notification.message)
        .bind(notification.read)
        .bind(notification.read_at)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(())
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
        unread_only: bool,
    ) -> Result<Vec<Notification>, TimelineError> {
        let sql = if unread_only {
            format!(
                r#"
                SELECT {NOTIFICATION_COLUMNS}
                FROM notifications
                WHERE user_id = $1 AND read = FALSE
                ORDER BY created_at DESC
                "#
            )
        } else {
            format!(
                r#"
                SELECT {NOTIFICATION_COLUMNS}
                FROM notifications
                WHERE user_id = $1
                ORDER BY created_at DESC
                "#
            )
        };

        let rows = sqlx::query(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?;

        rows.iter().map(notification_from_row).collect()
    }

    async fn exists_unread(
        &self,
        milestone_id: Uuid,
        user_id: Uuid,
        kind: NotificationKind,
    ) -> Result<bool, TimelineError> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM notifications
                WHERE milestone_id = $1 AND user_id = $2 AND kind = $3 AND read = FALSE
            )
            "#,
        )
        .bind(milestone_id)
        .bind(user_id)
        .bind(kind.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(storage_error)
    }

    async fn mark_read(
        &self,
        id: Uuid,
        read_at: DateTime<Utc>,
    ) -> Result<Notification, TimelineError> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE notifications
            SET read = TRUE, read_at = COALESCE(read_at, $2)
            WHERE id = $1
            RETURNING {NOTIFICATION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(read_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?
        .ok_or(TimelineError::NotFound(id))?;

        notification_from_row(&row)
    }
}

pub struct PgCommentStore {
    pool: PgPool,
}

impl PgCommentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CommentStore for PgCommentStore {
    async fn insert(&self, comment: &Comment) -> Result<(), TimelineError> {
        sqlx::query(
            r#"
            INSERT INTO comments (id, milestone_id, author_id, text, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(comment.id)
        .bind(comment.milestone_id)
        .bind(comment.author_id)
        .bind(&comment.text)
        .bind(comment.created_at)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(())
    }

    async fn list_by_milestone(
        &self,
        milestone_id: Uuid,
    ) -> Result<Vec<Comment>, TimelineError> {
        let rows = sqlx::query(
            r#"
            SELECT id, milestone_id, author_id, text, created_at
            FROM comments
            WHERE milestone_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(milestone_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        rows.iter().map(comment_from_row).collect()
    }
}

fn milestone_from_row(row: &PgRow) -> Result<Milestone, TimelineError> {
    let doc_type_raw: String = row.try_get("document_type").map_err(storage_error)?;
    let status_raw: String = row.try_get("status").map_err(storage_error)?;
    let priority_raw: String = row.try_get("priority").map_err(storage_error)?;

    Ok(Milestone {
        id: row.try_get("id").map_err(storage_error)?,
        document: DocumentRef {
            id: row.try_get("document_id").map_err(storage_error)?,
            doc_type: DocumentType::parse(&doc_type_raw)
                .map_err(|_| stored_value_error("document_type", &doc_type_raw))?,
        },
        name: row.try_get("name").map_err(storage_error)?,
        description: row.try_get("description").map_err(storage_error)?,
        status: MilestoneStatus::parse(&status_raw)
            .map_err(|_| stored_value_error("status", &status_raw))?,
        priority: Priority::parse(&priority_raw)
            .map_err(|_| stored_value_error("priority", &priority_raw))?,
        start_date: row.try_get("start_date").map_err(storage_error)?,
        due_date: row.try_get("due_date").map_err(storage_error)?,
        completed_date: row.try_get("completed_date").map_err(storage_error)?,
        assigned_to: row.try_get("assigned_to").map_err(storage_error)?,
        dependency_id: row.try_get("dependency_id").map_err(storage_error)?,
        notes: row.try_get("notes").map_err(storage_error)?,
        actual_duration_days: row.try_get("actual_duration_days").map_err(storage_error)?,
        version: row.try_get("version").map_err(storage_error)?,
        created_at: row.try_get("created_at").map_err(storage_error)?,
        updated_at: row.try_get("updated_at").map_err(storage_error)?,
    })
}

fn notification_from_row(row: &PgRow) -> Result<Notification, TimelineError> {
    let kind_raw: String = row.try_get("kind").map_err(storage_error)?;
    Ok(Notification {
        id: row.try_get("id").map_err(storage_error)?,
        milestone_id: row.try_get("milestone_id").map_err(storage_error)?,
        user_id: row.try_get("user_id").map_err(storage_error)?,
        kind: NotificationKind::parse(&kind_raw)
            .map_err(|_| stored_value_error("kind", &kind_raw))?,
        message: row.try_get("message").map_err(storage_error)?,
        read: row.try_get("read").map_err(storage_error)?,
        read_at: row.try_get("read_at").map_err(storage_error)?,
        created_at: row.try_get("created_at").map_err(storage_error)?,
    })
}

fn comment_from_row(row: &PgRow) -> Result<Comment, TimelineError> {
    Ok(Comment {
        id: row.try_get("id").map_err(storage_error)?,
        milestone_id: row.try_get("milestone_id").map_err(storage_error)?,
        author_id: row.try_get("author_id").map_err(storage_error)?,
        text: row.try_get("text").map_err(storage_error)?,
        created_at: row.try_get("created_at").map_err(storage_error)?,
    })
}

fn storage_error<E>(err: E) -> TimelineError
where
    E: std::error::Error + Send + Sync + 'static,
{
    TimelineError::Storage(anyhow::Error::new(err))
}

fn stored_value_error(column: &str, value: &str) -> TimelineError {
    TimelineError::Storage(anyhow::anyhow!(
        "stored {column} '{value}' is not a recognized value"
    ))
}
