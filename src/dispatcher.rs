use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::event::{Audience, EventBus, RejectReason, TableEvent};
use crate::game::{Card, Seat, TableCommand, TableId, TableManager};
use crate::lobby::{JoinOutcome, Lobby, TableObserver};
use crate::session::{DisplayNameGenerator, PlayerIdentity, SessionRegistry};
use crate::websockets::{ConnectionManager, LobbyQueuedPayload, MessageType, WebSocketMessage};

/// Inbound player actions after transport decoding. The `player_id` is taken
/// from the connection that delivered the action, never from the payload.
#[derive(Debug, Clone)]
pub enum ClientAction {
    JoinLobby {
        player_id: Uuid,
    },
    PlayCard {
        player_id: Uuid,
        seat: Seat,
        card: Card,
    },
    Disconnect {
        player_id: Uuid,
    },
}

/// The one component that talks to the transport layer.
///
/// Inbound: authorizes actions against the session registry, then delegates
/// to the lobby or the right table. Outbound: `TableFanout` forwards each
/// table's events to its seats in emission order.
pub struct Dispatcher {
    lobby: Arc<Lobby>,
    manager: Arc<TableManager>,
    registry: Arc<SessionRegistry>,
    connections: Arc<dyn ConnectionManager>,
    names: Arc<dyn DisplayNameGenerator>,
}

impl Dispatcher {
    pub fn new(
        lobby: Arc<Lobby>,
        manager: Arc<TableManager>,
        registry: Arc<SessionRegistry>,
        connections: Arc<dyn ConnectionManager>,
        names: Arc<dyn DisplayNameGenerator>,
    ) -> Self {
        Self {
            lobby,
            manager,
            registry,
            connections,
            names,
        }
    }

    /// Handshake: mints a fresh identity and registers it.
    pub async fn connect(&self) -> PlayerIdentity {
        let display_name = self.names.generate().await;
        let identity = PlayerIdentity::new(display_name);
        info!(
            player_id = %identity.id,
            display_name = %identity.display_name,
            "Player connected"
        );
        self.registry.register(identity.clone()).await;
        identity
    }

    /// Routes one inbound action. All outcomes reach the player as messages
    /// or events; errors never escape to the transport.
    pub async fn dispatch(&self, action: ClientAction) {
        match action {
            ClientAction::JoinLobby { player_id } => self.on_join_lobby(player_id).await,
            ClientAction::PlayCard {
                player_id,
                seat,
                card,
            } => self.on_play_card(player_id, seat, card).await,
            ClientAction::Disconnect { player_id } => self.on_disconnect(player_id).await,
        }
    }

    async fn on_join_lobby(&self, player_id: Uuid) {
        let Some(identity) = self.registry.identity(player_id).await else {
            warn!(player_id = %player_id, "Join from unknown player");
            self.send(player_id, WebSocketMessage::error("Not connected"))
                .await;
            return;
        };

        match self.lobby.join(identity).await {
            Ok(JoinOutcome::Queued { position }) => {
                let payload = serde_json::to_value(LobbyQueuedPayload { position })
                    .unwrap_or(serde_json::Value::Null);
                self.send(
                    player_id,
                    WebSocketMessage::new(MessageType::LobbyQueued, payload),
                )
                .await;
            }
            Ok(JoinOutcome::Seated { table_id, .. }) => {
                // TableFormed and HandDealt events tell the whole table
                debug!(player_id = %player_id, table_id = %table_id, "Join completed a table");
            }
            Err(e) => {
                self.send(player_id, WebSocketMessage::error(&e.to_string()))
                    .await;
            }
        }
    }

    async fn on_play_card(&self, player_id: Uuid, seat: Seat, card: Card) {
        let Some(binding) = self.registry.lookup(player_id).await else {
            warn!(player_id = %player_id, "Play from a player with no seat");
            self.send(
                player_id,
                WebSocketMessage::rejection(Some(seat.index()), RejectReason::Unauthorized),
            )
            .await;
            return;
        };

        // The registry's own binding decides, not the payload's claim
        if !self
            .registry
            .authorize(player_id, seat, binding.table_id)
            .await
        {
            self.send(
                player_id,
                WebSocketMessage::rejection(Some(seat.index()), RejectReason::Unauthorized),
            )
            .await;
            return;
        }

        let Some(handle) = self.manager.get_table(binding.table_id).await else {
            // Binding outlived its table; nothing to play into
            self.send(
                player_id,
                WebSocketMessage::rejection(Some(seat.index()), RejectReason::OutOfPhase),
            )
            .await;
            return;
        };

        if handle.send(TableCommand::Play { seat, card }).await.is_err() {
            self.send(
                player_id,
                WebSocketMessage::rejection(Some(seat.index()), RejectReason::OutOfPhase),
            )
            .await;
        }
    }

    async fn on_disconnect(&self, player_id: Uuid) {
        info!(player_id = %player_id, "Player disconnected");

        // Queued players vanish without disturbing the queue order
        self.lobby.leave(player_id).await;

        // Seated players hand their seat to the timeout policy
        if let Some(binding) = self.registry.lookup(player_id).await {
            if let Some(handle) = self.manager.get_table(binding.table_id).await {
                let _ = handle
                    .send(TableCommand::SeatDisconnected { seat: binding.seat })
                    .await;
            }
        }

        self.registry.remove(player_id).await;
        self.connections.remove_connection(player_id).await;
    }

    async fn send(&self, player_id: Uuid, message: WebSocketMessage) {
        match serde_json::to_string(&message) {
            Ok(text) => self.connections.send_to_player(player_id, &text).await,
            Err(e) => warn!(error = %e, "Failed to serialize outbound message"),
        }
    }
}

/// Per-table event fan-out.
///
/// Attached by the lobby before a table is told to begin, so the forwarder
/// is subscribed before the first event exists. One forwarding task per
/// table delivers events sequentially, which preserves the table's emission
/// order for every seat even when seats live on different connections.
pub struct TableFanout {
    event_bus: EventBus,
    connections: Arc<dyn ConnectionManager>,
}

impl TableFanout {
    pub fn new(event_bus: EventBus, connections: Arc<dyn ConnectionManager>) -> Self {
        Self {
            event_bus,
            connections,
        }
    }
}

#[async_trait]
impl TableObserver for TableFanout {
    async fn table_seated(&self, table_id: TableId, seating: &[(PlayerIdentity, Seat)]) {
        let receiver = self.event_bus.subscribe(table_id).await;
        let seat_players: HashMap<Seat, Uuid> =
            seating.iter().map(|(player, seat)| (*seat, player.id)).collect();
        let everyone: Vec<Uuid> = seating.iter().map(|(player, _)| player.id).collect();

        debug!(table_id = %table_id, seats = everyone.len(), "Attaching table fan-out");
        tokio::spawn(forward_table_events(
            table_id,
            receiver,
            seat_players,
            everyone,
            self.connections.clone(),
        ));
    }
}

async fn forward_table_events(
    table_id: TableId,
    mut receiver: broadcast::Receiver<TableEvent>,
    seat_players: HashMap<Seat, Uuid>,
    everyone: Vec<Uuid>,
    connections: Arc<dyn ConnectionManager>,
) {
    loop {
        match receiver.recv().await {
            Ok(event) => {
                let last = matches!(event, TableEvent::GameOver { .. });
                let message = WebSocketMessage::from_event(&event);
                let text = match serde_json::to_string(&message) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(table_id = %table_id, error = %e, "Unserializable event dropped");
                        continue;
                    }
                };

                match event.audience() {
                    Audience::Table => connections.send_to_players(&everyone, &text).await,
                    Audience::Seat(seat) => {
                        if let Some(player_id) = seat_players.get(&seat) {
                            connections.send_to_player(*player_id, &text).await;
                        }
                    }
                }

                if last {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(
                    table_id = %table_id,
                    skipped = skipped,
                    "Fan-out lagged behind table events"
                );
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }

    debug!(table_id = %table_id, "Table fan-out finished");
}
