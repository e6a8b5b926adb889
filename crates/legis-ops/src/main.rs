use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use serde_json::json;
use tracing::{error, info};

use legis_core::{TimelineEvent, TimelineEventKind};
use legis_platform::{EventBus, ServiceConfig, connect_database};
use legis_store::{PgCommentStore, PgMilestoneStore, PgNotificationStore};
use legis_timeline::TimelineService;

type Service = TimelineService<PgMilestoneStore, PgNotificationStore, PgCommentStore>;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "legis_ops=info".to_string()),
        )
        .init();

    let config = ServiceConfig::worker_from_env()?;
    let pool = connect_database(&config.database_url).await?;
    let bus = EventBus::connect(&config.redis_url)?;

    let service = TimelineService::new(
        PgMilestoneStore::new(pool.clone()),
        PgNotificationStore::new(pool.clone()),
        PgCommentStore::new(pool),
    );

    let mut ticker = tokio::time::interval(Duration::from_secs(config.sweep_interval_secs));
    info!(
        "overdue sweep running every {} seconds",
        config.sweep_interval_secs
    );

    loop {
        ticker.tick().await;
        if let Err(err) = run_sweep(&service, &bus).await {
            error!("overdue sweep failed: {err:#}");
        }
    }
}

async fn run_sweep(service: &Service, bus: &EventBus) -> Result<()> {
    let now = Utc::now();
    let dispatched = service.sweep_overdue(now.date_naive(), now).await?;
    if dispatched.is_empty() {
        return Ok(());
    }

    info!("dispatched {} overdue notifications", dispatched.len());
    for (milestone, notification) in &dispatched {
        let event = TimelineEvent::new(
            TimelineEventKind::OverdueDetected,
            milestone,
            json!({ "notification_id": notification.id, "due_date": milestone.due_date }),
            now,
        );
        if let Err(err) = bus.publish_event(&event).await {
            error!(
                "failed to publish overdue event for milestone {}: {err}",
                milestone.id
            );
        }
    }

    Ok(())
}
