use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use tricktable::websockets::{ConnectionManager, WebSocketMessage};

// ============================================================================
// Mock Infrastructure
// ============================================================================

/// Connection manager that captures every outbound message per player so
/// tests can assert on exactly what each seat was told.
#[derive(Clone)]
pub struct MockConnectionManager {
    sent_messages: Arc<RwLock<HashMap<Uuid, VecDeque<String>>>>,
}

impl MockConnectionManager {
    pub fn new() -> Self {
        Self {
            sent_messages: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Pops the oldest pending message for a player, if any.
    pub async fn consume_message_for(&self, player_id: Uuid) -> Option<WebSocketMessage> {
        let mut messages = self.sent_messages.write().await;
        let raw = messages.get_mut(&player_id)?.pop_front()?;
        Some(serde_json::from_str(&raw).expect("mock should only hold valid messages"))
    }

    /// Waits until the player's next message arrives. Panics after 2 seconds
    /// of silence; async delivery should be far faster than that.
    pub async fn next_message_for(&self, player_id: Uuid) -> WebSocketMessage {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        loop {
            if let Some(message) = self.consume_message_for(player_id).await {
                return message;
            }
            if tokio::time::Instant::now() > deadline {
                panic!("no message arrived for {player_id} within 2s");
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    /// Asserts that nothing arrives for the player within the given window.
    pub async fn assert_silent(&self, player_id: Uuid, window: Duration) {
        tokio::time::sleep(window).await;
        let messages = self.sent_messages.read().await;
        let pending = messages.get(&player_id).map(VecDeque::len).unwrap_or(0);
        assert_eq!(pending, 0, "expected silence for {player_id}");
    }

    pub async fn pending_count_for(&self, player_id: Uuid) -> usize {
        let messages = self.sent_messages.read().await;
        messages.get(&player_id).map(VecDeque::len).unwrap_or(0)
    }

    pub async fn clear_messages(&self) {
        self.sent_messages.write().await.clear();
    }
}

#[async_trait]
impl ConnectionManager for MockConnectionManager {
    async fn add_connection(&self, player_id: Uuid, _sender: mpsc::UnboundedSender<String>) {
        self.sent_messages
            .write()
            .await
            .entry(player_id)
            .or_default();
    }

    async fn remove_connection(&self, player_id: Uuid) {
        self.sent_messages.write().await.remove(&player_id);
    }

    async fn send_to_player(&self, player_id: Uuid, message: &str) {
        self.sent_messages
            .write()
            .await
            .entry(player_id)
            .or_default()
            .push_back(message.to_string());
    }

    async fn send_to_players(&self, player_ids: &[Uuid], message: &str) {
        for player_id in player_ids {
            self.send_to_player(*player_id, message).await;
        }
    }
}
