use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result as AnyResult;
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{error, info};
use uuid::Uuid;

use legis_core::{
    Comment, DocumentRef, DocumentType, Milestone, MilestoneStatus, Notification, Priority,
    TimelineError, TimelineEvent, TimelineEventKind,
};
use legis_platform::{
    AddCommentRequest, CommentView, CreateMilestoneRequest, DocumentProgressView, EventBus,
    ListNotificationsQuery, MilestoneDetailView, MilestoneView, NotificationView, ServiceConfig,
    SetDependencyRequest, TimelineResponse, TransitionRequest, UpdateMilestoneRequest,
    connect_database,
};
use legis_store::{PgCommentStore, PgMilestoneStore, PgNotificationStore};
use legis_timeline::{DocumentProgress, MilestonePatch, NewMilestone, TimelineService};

type Service = TimelineService<PgMilestoneStore, PgNotificationStore, PgCommentStore>;

#[derive(Clone)]
struct AppState {
    service: Arc<Service>,
    bus: EventBus,
}

#[tokio::main]
async fn main() -> AnyResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "legis_gateway=info".to_string()),
        )
        .init();

    let config = ServiceConfig::from_env("0.0.0.0:8080")?;
    let pool = connect_database(&config.database_url).await?;
    let bus = EventBus::connect(&config.redis_url)?;

    let service = Arc::new(TimelineService::new(
        PgMilestoneStore::new(pool.clone()),
        PgNotificationStore::new(pool.clone()),
        PgCommentStore::new(pool),
    ));

    let state = AppState { service, bus };
    let router = Router::new()
        .route("/healthz", get(healthz))
        .route(
            "/documents/{document_id}/milestones",
            post(create_milestone),
        )
        .route("/documents/{document_id}/timeline", get(get_timeline))
        .route("/documents/{document_id}/progress", get(get_progress))
        .route(
            "/milestones/{milestone_id}",
            get(get_milestone).patch(update_milestone),
        )
        .route(
            "/milestones/{milestone_id}/transition",
            post(transition_milestone),
        )
        .route("/milestones/{milestone_id}/dependency", post(set_dependency))
        .route(
            "/milestones/{milestone_id}/comments",
            get(list_comments).post(add_comment),
        )
        .route("/notifications", get(list_notifications))
        .route(
            "/notifications/{notification_id}/read",
            post(mark_notification_read),
        )
        .with_state(state);

    let addr: SocketAddr = config.http_addr.parse()?;
    info!("gateway listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}

async fn healthz() -> &'static str {
    "ok"
}

async fn create_milestone(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
    Json(payload): Json<CreateMilestoneRequest>,
) -> Result<(StatusCode, Json<MilestoneView>), (StatusCode, String)> {
    let doc_type = DocumentType::parse(&payload.document_type).map_err(error_response)?;
    let priority = match payload.priority.as_deref() {
        Some(value) => Priority::parse(value).map_err(error_response)?,
        None => Priority::Medium,
    };

    let now = Utc::now();
    let milestone = state
        .service
        .create_milestone(
            NewMilestone {
                document: DocumentRef {
                    id: document_id,
                    doc_type,
                },
                name: payload.name,
                description: payload.description,
                priority,
                start_date: payload.start_date,
                due_date: payload.due_date,
                assigned_to: payload.assigned_to,
                dependency_id: payload.dependency_id,
            },
            payload.requested_by,
            now,
        )
        .await
        .map_err(error_response)?;

    publish(
        &state,
        TimelineEvent::new(
            TimelineEventKind::MilestoneCreated,
            &milestone,
            json!({ "name": milestone.name, "due_date": milestone.due_date }),
            now,
        ),
    )
    .await;

    Ok((StatusCode::CREATED, Json(milestone_view(milestone))))
}

async fn get_timeline(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
) -> Result<Json<TimelineResponse>, (StatusCode, String)> {
    let now = Utc::now();
    let milestones = state
        .service
        .timeline(document_id)
        .await
        .map_err(error_response)?;
    let progress = state
        .service
        .progress(document_id, now.date_naive())
        .await
        .map_err(error_response)?;

    Ok(Json(TimelineResponse {
        document_id,
        milestones: milestones.into_iter().map(milestone_view).collect(),
        progress: progress_view(progress, now),
    }))
}

async fn get_progress(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
) -> Result<Json<DocumentProgressView>, (StatusCode, String)> {
    let now = Utc::now();
    let progress = state
        .service
        .progress(document_id, now.date_naive())
        .await
        .map_err(error_response)?;

    Ok(Json(progress_view(progress, now)))
}

async fn get_milestone(
    State(state): State<AppState>,
    Path(milestone_id): Path<Uuid>,
) -> Result<Json<MilestoneDetailView>, (StatusCode, String)> {
    let detail = state
        .service
        .milestone_detail(milestone_id)
        .await
        .map_err(error_response)?;

    Ok(Json(MilestoneDetailView {
        milestone: milestone_view(detail.milestone),
        ready: detail.ready,
        dependents: detail.dependents,
    }))
}

async fn update_milestone(
    State(state): State<AppState>,
    Path(milestone_id): Path<Uuid>,
    Json(payload): Json<UpdateMilestoneRequest>,
) -> Result<Json<MilestoneView>, (StatusCode, String)> {
    let priority = match payload.priority.as_deref() {
        Some(value) => Some(Priority::parse(value).map_err(error_response)?),
        None => None,
    };

    let now = Utc::now();
    let milestone = state
        .service
        .update_milestone(
            milestone_id,
            MilestonePatch {
                name: payload.name,
                description: payload.description,
                priority,
                start_date: payload.start_date,
                due_date: payload.due_date,
                assigned_to: payload.assigned_to,
                note: payload.note,
            },
            payload.requested_by,
            now,
        )
        .await
        .map_err(error_response)?;

    publish(
        &state,
        TimelineEvent::new(
            TimelineEventKind::MilestoneUpdated,
            &milestone,
            json!({ "version": milestone.version }),
            now,
        ),
    )
    .await;

    Ok(Json(milestone_view(milestone)))
}

async fn transition_milestone(
    State(state): State<AppState>,
    Path(milestone_id): Path<Uuid>,
    Json(payload): Json<TransitionRequest>,
) -> Result<Json<MilestoneView>, (StatusCode, String)> {
    let status = MilestoneStatus::parse(&payload.status).map_err(error_response)?;

    let now = Utc::now();
    let milestone = state
        .service
        .transition(
            milestone_id,
            status,
            payload.note.as_deref(),
            payload.requested_by,
            now,
        )
        .await
        .map_err(error_response)?;

    publish(
        &state,
        TimelineEvent::new(
            TimelineEventKind::StatusChanged,
            &milestone,
            json!({ "status": milestone.status }),
            now,
        ),
    )
    .await;

    Ok(Json(milestone_view(milestone)))
}

async fn set_dependency(
    State(state): State<AppState>,
    Path(milestone_id): Path<Uuid>,
    Json(payload): Json<SetDependencyRequest>,
) -> Result<Json<MilestoneView>, (StatusCode, String)> {
    let now = Utc::now();
    let milestone = state
        .service
        .set_dependency(
            milestone_id,
            payload.dependency_id,
            payload.requested_by,
            now,
        )
        .await
        .map_err(error_response)?;

    publish(
        &state,
        TimelineEvent::new(
            TimelineEventKind::DependencySet,
            &milestone,
            json!({ "dependency_id": milestone.dependency_id }),
            now,
        ),
    )
    .await;

    Ok(Json(milestone_view(milestone)))
}

async fn add_comment(
    State(state): State<AppState>,
    Path(milestone_id): Path<Uuid>,
    Json(payload): Json<AddCommentRequest>,
) -> Result<(StatusCode, Json<CommentView>), (StatusCode, String)> {
    let now = Utc::now();
    let comment = state
        .service
        .add_comment(milestone_id, payload.author_id, &payload.text, now)
        .await
        .map_err(error_response)?;

    // the event needs the document scope, which the comment itself lacks
    match state.service.milestone_detail(milestone_id).await {
        Ok(detail) => {
            publish(
                &state,
                TimelineEvent::new(
                    TimelineEventKind::CommentAdded,
                    &detail.milestone,
                    json!({ "comment_id": comment.id, "author_id": comment.author_id }),
                    now,
                ),
            )
            .await;
        }
        Err(err) => error!("failed to load milestone for comment event: {err}"),
    }

    Ok((StatusCode::CREATED, Json(comment_view(comment))))
}

async fn list_comments(
    State(state): State<AppState>,
    Path(milestone_id): Path<Uuid>,
) -> Result<Json<Vec<CommentView>>, (StatusCode, String)> {
    let comments = state
        .service
        .comments(milestone_id)
        .await
        .map_err(error_response)?;

    Ok(Json(comments.into_iter().map(comment_view).collect()))
}

async fn list_notifications(
    State(state): State<AppState>,
    Query(query): Query<ListNotificationsQuery>,
) -> Result<Json<Vec<NotificationView>>, (StatusCode, String)> {
    let notifications = state
        .service
        .notifications(query.user_id, query.unread_only.unwrap_or(false))
        .await
        .map_err(error_response)?;

    Ok(Json(
        notifications.into_iter().map(notification_view).collect(),
    ))
}

async fn mark_notification_read(
    State(state): State<AppState>,
    Path(notification_id): Path<Uuid>,
) -> Result<Json<NotificationView>, (StatusCode, String)> {
    let notification = state
        .service
        .mark_notification_read(notification_id, Utc::now())
        .await
        .map_err(error_response)?;

    Ok(Json(notification_view(notification)))
}

async fn publish(state: &AppState, event: TimelineEvent) {
    // events feed the dashboard refresh; losing one never fails the command
    if let Err(err) = state.bus.publish_event(&event).await {
        error!("failed to publish timeline event: {err}");
    }
}

fn milestone_view(milestone: Milestone) -> MilestoneView {
    MilestoneView {
        id: milestone.id,
        document_id: milestone.document.id,
        document_type: milestone.document.doc_type.to_string(),
        name: milestone.name,
        description: milestone.description,
        status: milestone.status,
        priority: milestone.priority,
        start_date: milestone.start_date,
        due_date: milestone.due_date,
        completed_date: milestone.completed_date,
        assigned_to: milestone.assigned_to,
        dependency_id: milestone.dependency_id,
        notes: milestone.notes,
        actual_duration_days: milestone.actual_duration_days,
        version: milestone.version,
        created_at: milestone.created_at,
        updated_at: milestone.updated_at,
    }
}

fn progress_view(progress: DocumentProgress, generated_at: DateTime<Utc>) -> DocumentProgressView {
    DocumentProgressView {
        document_id: progress.document_id,
        total: progress.total as i64,
        pending: progress.counts.pending as i64,
        in_progress: progress.counts.in_progress as i64,
        completed: progress.counts.completed as i64,
        delayed: progress.counts.delayed as i64,
        cancelled: progress.counts.cancelled as i64,
        completion_percent: progress.completion_percent,
        overdue: progress.overdue as i64,
        next_due: progress.next_due,
        generated_at,
    }
}

fn comment_view(comment: Comment) -> CommentView {
    CommentView {
        id: comment.id,
        milestone_id: comment.milestone_id,
        author_id: comment.author_id,
        text: comment.text,
        created_at: comment.created_at,
    }
}

fn notification_view(notification: Notification) -> NotificationView {
    NotificationView {
        id: notification.id,
        milestone_id: notification.milestone_id,
        user_id: notification.user_id,
        kind: notification.kind,
        message: notification.message,
        read: notification.read,
        read_at: notification.read_at,
        created_at: notification.created_at,
    }
}

fn error_response(err: TimelineError) -> (StatusCode, String) {
    match &err {
        TimelineError::Validation(_) => (StatusCode::BAD_REQUEST, err.to_string()),
        TimelineError::NotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        TimelineError::InvalidDependency(_) => (StatusCode::UNPROCESSABLE_ENTITY, err.to_string()),
        TimelineError::InvalidTransition { .. } | TimelineError::StaleUpdate(_) => {
            (StatusCode::CONFLICT, err.to_string())
        }
        TimelineError::Dispatch(_) => {
            // the state change already stands; only the notification failed
            error!("notification dispatch failed: {err}");
            (
                StatusCode::BAD_GATEWAY,
                format!("change saved, but {err}"),
            )
        }
        TimelineError::CorruptGraph(_) | TimelineError::Storage(_) => {
            error!("{err}");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}
