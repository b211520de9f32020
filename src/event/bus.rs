use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

use crate::game::state::TableId;

use super::events::TableEvent;

const TABLE_CHANNEL_CAPACITY: usize = 128;

/// Event bus for distributing table events throughout the application
///
/// Each table gets its own broadcast channel, so subscribers see a table's
/// events in exactly the order that table emitted them.
#[derive(Debug, Clone)]
pub struct EventBus {
    /// Table-specific event channels: table_id -> sender
    table_channels: Arc<RwLock<HashMap<TableId, broadcast::Sender<TableEvent>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            table_channels: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Emits an event to all subscribers of the event's table.
    pub async fn emit(&self, event: TableEvent) {
        let table_id = event.table_id();
        let sender = self.sender_for(table_id).await;

        match sender.send(event) {
            Ok(receiver_count) => {
                debug!(
                    table_id = %table_id,
                    receivers = receiver_count,
                    "Table event emitted"
                );
            }
            Err(_) => {
                debug!(table_id = %table_id, "Table event emitted with no receivers");
            }
        }
    }

    /// Subscribe to events for a specific table.
    pub async fn subscribe(&self, table_id: TableId) -> broadcast::Receiver<TableEvent> {
        self.sender_for(table_id).await.subscribe()
    }

    /// Drops a terminated table's channel.
    pub async fn remove_table(&self, table_id: TableId) {
        let mut channels = self.table_channels.write().await;
        channels.remove(&table_id);
    }

    async fn sender_for(&self, table_id: TableId) -> broadcast::Sender<TableEvent> {
        {
            let channels = self.table_channels.read().await;
            if let Some(sender) = channels.get(&table_id) {
                return sender.clone();
            }
        }

        debug!(table_id = %table_id, "Creating table event channel");
        let mut channels = self.table_channels.write().await;
        channels
            .entry(table_id)
            .or_insert_with(|| broadcast::channel(TABLE_CHANNEL_CAPACITY).0)
            .clone()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
