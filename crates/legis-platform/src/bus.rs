use anyhow::Result;
use redis::{AsyncCommands, Client};

use legis_core::TimelineEvent;

/// Publishes timeline events for the portal's dashboard refresh. Channels
/// are derived from the event kind; payloads are JSON.
#[derive(Clone)]
pub struct EventBus {
    client: Client,
}

impl EventBus {
    pub fn connect(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url)?;
        Ok(Self { client })
    }

    pub async fn publish_event(&self, event: &TimelineEvent) -> Result<()> {
        let mut connection = self.client.get_multiplexed_async_connection().await?;
        let serialized = serde_json::to_string(event)?;
        let _: i64 = connection.publish(event.kind.channel(), serialized).await?;
        Ok(())
    }
}
