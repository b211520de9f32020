use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::dispatcher::ClientAction;
use crate::game::{Card, Seat};
use crate::session::PlayerIdentity;
use crate::shared::AppState;

use super::messages::{MessageType, PlayCardPayload, WebSocketMessage};

/// Upgrades the connection and runs the socket for its lifetime.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    // Handshake: mint an identity and announce it to the client
    let identity = state.dispatcher.connect().await;
    let (sender, mut outbound) = mpsc::unbounded_channel::<String>();
    state.connections.add_connection(identity.id, sender).await;

    let connected = WebSocketMessage::new(
        MessageType::Connected,
        json!({
            "player_id": identity.id,
            "display_name": identity.display_name,
        }),
    );
    match serde_json::to_string(&connected) {
        Ok(text) => {
            if ws_sender.send(Message::Text(text)).await.is_err() {
                state
                    .dispatcher
                    .dispatch(ClientAction::Disconnect {
                        player_id: identity.id,
                    })
                    .await;
                return;
            }
        }
        Err(e) => warn!(error = %e, "Failed to serialize handshake"),
    }

    // Pump dispatcher fan-out into the socket
    let send_task = tokio::spawn(async move {
        while let Some(message) = outbound.recv().await {
            if ws_sender.send(Message::Text(message)).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(message)) = ws_receiver.next().await {
        match message {
            Message::Text(text) => handle_client_message(&state, &identity, &text).await,
            Message::Close(_) => break,
            _ => {}
        }
    }

    debug!(player_id = %identity.id, "Socket closed");
    state
        .dispatcher
        .dispatch(ClientAction::Disconnect {
            player_id: identity.id,
        })
        .await;
    send_task.abort();
}

async fn handle_client_message(state: &AppState, identity: &PlayerIdentity, text: &str) {
    let message: WebSocketMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(e) => {
            warn!(player_id = %identity.id, error = %e, "Unparseable client message");
            send_error(state, identity, "Malformed message").await;
            return;
        }
    };

    match message.message_type {
        MessageType::JoinLobby => {
            state
                .dispatcher
                .dispatch(ClientAction::JoinLobby {
                    player_id: identity.id,
                })
                .await;
        }
        MessageType::PlayCard => {
            let payload: PlayCardPayload = match serde_json::from_value(message.payload) {
                Ok(payload) => payload,
                Err(e) => {
                    warn!(player_id = %identity.id, error = %e, "Bad play payload");
                    send_error(state, identity, "Malformed play").await;
                    return;
                }
            };
            let card = match Card::from_string(&payload.card) {
                Ok(card) => card,
                Err(code) => {
                    warn!(player_id = %identity.id, card = %code, "Unknown card code");
                    send_error(state, identity, "Unknown card").await;
                    return;
                }
            };
            state
                .dispatcher
                .dispatch(ClientAction::PlayCard {
                    player_id: identity.id,
                    seat: Seat::new(payload.seat),
                    card,
                })
                .await;
        }
        MessageType::Leave => {
            state
                .dispatcher
                .dispatch(ClientAction::Disconnect {
                    player_id: identity.id,
                })
                .await;
        }
        other => {
            warn!(player_id = %identity.id, message_type = ?other, "Client sent a server-only message type");
            send_error(state, identity, "Unsupported message type").await;
        }
    }
}

async fn send_error(state: &AppState, identity: &PlayerIdentity, message: &str) {
    if let Ok(text) = serde_json::to_string(&WebSocketMessage::error(message)) {
        state.connections.send_to_player(identity.id, &text).await;
    }
}
