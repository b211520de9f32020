use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::event::{RejectReason, TableEvent};

/// Message types for WebSocket communication
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    // Client -> Server
    JoinLobby,
    PlayCard,
    Leave,

    // Server -> Client
    Connected,
    LobbyQueued,
    TableFormed,
    HandDealt,
    YourTurn,
    CardPlayed,
    TrickResolved,
    MoveRejected,
    GameOver,
    Error,
}

/// Metadata for WebSocket messages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSocketMessageMeta {
    pub timestamp: DateTime<Utc>,
    pub player_id: Option<Uuid>,
}

/// Base structure for WebSocket messages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSocketMessage {
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub payload: serde_json::Value,
    pub meta: Option<WebSocketMessageMeta>,
}

impl WebSocketMessage {
    pub fn new(message_type: MessageType, payload: serde_json::Value) -> Self {
        Self {
            message_type,
            payload,
            meta: Some(WebSocketMessageMeta {
                timestamp: Utc::now(),
                player_id: None,
            }),
        }
    }

    /// Wire rendering of a table event. Cards travel as short codes ("QS").
    pub fn from_event(event: &TableEvent) -> Self {
        match event {
            TableEvent::TableFormed { table_id, seats } => Self::new(
                MessageType::TableFormed,
                json!({
                    "table_id": table_id,
                    "seats": seats.iter().map(|s| json!({
                        "seat": s.seat,
                        "player_id": s.player_id,
                        "display_name": s.display_name,
                    })).collect::<Vec<_>>(),
                }),
            ),
            TableEvent::HandDealt {
                table_id,
                seat,
                cards,
            } => Self::new(
                MessageType::HandDealt,
                json!({
                    "table_id": table_id,
                    "seat": seat,
                    "cards": cards.iter().map(|c| c.to_string()).collect::<Vec<_>>(),
                }),
            ),
            TableEvent::YourTurn { table_id, seat } => Self::new(
                MessageType::YourTurn,
                json!({ "table_id": table_id, "seat": seat }),
            ),
            TableEvent::CardPlayed {
                table_id,
                seat,
                card,
            } => Self::new(
                MessageType::CardPlayed,
                json!({
                    "table_id": table_id,
                    "seat": seat,
                    "card": card.to_string(),
                }),
            ),
            TableEvent::TrickResolved {
                table_id,
                winning_seat,
                cards,
            } => Self::new(
                MessageType::TrickResolved,
                json!({
                    "table_id": table_id,
                    "winning_seat": winning_seat,
                    "cards": cards.iter().map(|(seat, card)| json!({
                        "seat": seat,
                        "card": card.to_string(),
                    })).collect::<Vec<_>>(),
                }),
            ),
            TableEvent::MoveRejected {
                table_id,
                seat,
                reason,
            } => Self::new(
                MessageType::MoveRejected,
                json!({
                    "table_id": table_id,
                    "seat": seat,
                    "reason": reason,
                }),
            ),
            TableEvent::GameOver {
                table_id,
                scores,
                cause,
            } => Self::new(
                MessageType::GameOver,
                json!({
                    "table_id": table_id,
                    "scores": scores.iter().map(|(seat, tricks)| json!({
                        "seat": seat,
                        "tricks": tricks,
                    })).collect::<Vec<_>>(),
                    "cause": cause,
                }),
            ),
        }
    }

    /// Rejection sent outside any table context (no binding, bad claim).
    pub fn rejection(seat: Option<usize>, reason: RejectReason) -> Self {
        Self::new(
            MessageType::MoveRejected,
            json!({ "seat": seat, "reason": reason }),
        )
    }

    pub fn error(message: &str) -> Self {
        Self::new(MessageType::Error, json!({ "message": message }))
    }
}

/// Client-to-Server message payloads
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayCardPayload {
    pub seat: usize,
    /// Card short code, e.g. "QS"
    pub card: String,
}

/// Server-to-Client message payloads
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectedPayload {
    pub player_id: Uuid,
    pub display_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LobbyQueuedPayload {
    pub position: usize,
}
