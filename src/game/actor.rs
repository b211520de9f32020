use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::event::{EventBus, RejectReason, SeatInfo, TableEvent};
use crate::game::cards::Card;
use crate::game::config::{TableConfig, TimeoutPolicy};
use crate::game::messages::TableCommand;
use crate::game::state::{GameOverCause, PlayOutcome, Seat, TableError, TableId, TableState};
use crate::rules::RuleEngine;
use crate::session::SessionRegistry;

const INBOX_CAPACITY: usize = 64;

/// Handle for sending commands to a running table actor.
#[derive(Clone)]
pub struct TableHandle {
    sender: mpsc::Sender<TableCommand>,
    table_id: TableId,
}

impl TableHandle {
    pub fn table_id(&self) -> TableId {
        self.table_id
    }

    /// Enqueues a command. Fails only once the table has terminated.
    pub async fn send(&self, command: TableCommand) -> Result<(), TableClosed> {
        self.sender.send(command).await.map_err(|_| TableClosed)
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("table has terminated")]
pub struct TableClosed;

/// One table's independent unit of sequential execution.
///
/// The actor exclusively owns its `TableState` and processes its inbox one
/// command at a time, which is what guarantees the no-concurrent-transitions
/// contract without any lock on the state. Waiting for a move holds no
/// thread; the actor parks in `select!` over the inbox and the turn deadline.
pub struct TableActor {
    state: TableState,
    config: TableConfig,
    engine: RuleEngine,
    inbox: mpsc::Receiver<TableCommand>,
    event_bus: EventBus,
    registry: Arc<SessionRegistry>,
    turn_deadline: Option<Instant>,
}

impl TableActor {
    /// Spawns the actor task and returns the handle for reaching it.
    pub fn spawn(
        state: TableState,
        config: TableConfig,
        engine: RuleEngine,
        event_bus: EventBus,
        registry: Arc<SessionRegistry>,
    ) -> (TableHandle, tokio::task::JoinHandle<()>) {
        let (sender, inbox) = mpsc::channel(INBOX_CAPACITY);
        let table_id = state.id();

        let actor = Self {
            state,
            config,
            engine,
            inbox,
            event_bus,
            registry,
            turn_deadline: None,
        };

        let join = tokio::spawn(actor.run());
        (TableHandle { sender, table_id }, join)
    }

    async fn run(mut self) {
        info!(
            table_id = %self.state.id(),
            seats = self.state.seat_count(),
            rule_set = self.engine.rule_set_name(),
            "Table actor started"
        );

        loop {
            let deadline = self.turn_deadline;
            let done = tokio::select! {
                command = self.inbox.recv() => match command {
                    Some(command) => self.handle(command).await,
                    // All handles dropped: nobody can reach this table anymore
                    None => true,
                },
                _ = sleep_until_or_forever(deadline) => self.on_turn_expired().await,
            };

            if done {
                break;
            }
        }

        info!(table_id = %self.state.id(), "Table actor stopped");
    }

    /// Processes one command. Returns true when the table is finished.
    async fn handle(&mut self, command: TableCommand) -> bool {
        match command {
            TableCommand::Begin => self.on_begin().await,
            TableCommand::Play { seat, card } => self.submit_play(seat, card).await,
            TableCommand::SeatDisconnected { seat } => self.on_seat_disconnected(seat).await,
            TableCommand::Shutdown => {
                warn!(table_id = %self.state.id(), "Table shut down externally");
                self.state.abort();
                self.release_seats().await;
                true
            }
        }
    }

    /// `Forming -> Dealing -> AwaitingMove(lead)`, with the formation, the
    /// per-seat hands, and the first turn announced in that order.
    async fn on_begin(&mut self) -> bool {
        let table_id = self.state.id();

        if let Err(e) = self.state.deal(self.config.hand_size()) {
            // Begin is sent exactly once by the lobby; a second one is a bug
            warn!(table_id = %table_id, error = %e, "Ignoring redundant begin");
            return false;
        }

        let seats: Vec<SeatInfo> = self
            .state
            .players()
            .iter()
            .enumerate()
            .map(|(index, player)| SeatInfo {
                seat: Seat::new(index),
                player_id: player.id,
                display_name: player.display_name.clone(),
            })
            .collect();
        self.event_bus
            .emit(TableEvent::TableFormed { table_id, seats })
            .await;

        for index in 0..self.state.seat_count() {
            let seat = Seat::new(index);
            self.event_bus
                .emit(TableEvent::HandDealt {
                    table_id,
                    seat,
                    cards: self.state.hand(seat).to_vec(),
                })
                .await;
        }

        // Dealing always leaves a seat to act
        if let Some(lead) = self.state.turn() {
            self.announce_turn(lead).await;
        }
        false
    }

    async fn submit_play(&mut self, seat: Seat, card: Card) -> bool {
        let table_id = self.state.id();

        match self.state.apply_play(seat, card, &self.engine) {
            Ok(PlayOutcome::Duplicate) => {
                // Redelivery of an accepted play: swallow it
                debug!(table_id = %table_id, seat = %seat, card = %card, "Duplicate play ignored");
                false
            }
            Ok(PlayOutcome::Played { next }) => {
                self.event_bus
                    .emit(TableEvent::CardPlayed {
                        table_id,
                        seat,
                        card,
                    })
                    .await;
                self.announce_turn(next).await;
                false
            }
            Ok(PlayOutcome::TrickComplete {
                winner,
                cards,
                final_scores,
            }) => {
                self.event_bus
                    .emit(TableEvent::CardPlayed {
                        table_id,
                        seat,
                        card,
                    })
                    .await;
                self.event_bus
                    .emit(TableEvent::TrickResolved {
                        table_id,
                        winning_seat: winner,
                        cards,
                    })
                    .await;

                match final_scores {
                    Some(scores) => {
                        self.finish(scores, GameOverCause::Completed).await;
                        true
                    }
                    None => {
                        self.announce_turn(winner).await;
                        false
                    }
                }
            }
            Err(TableError::NotYourTurn { expected, actual }) => {
                debug!(
                    table_id = %table_id,
                    expected = %expected,
                    actual = %actual,
                    "Out-of-turn play rejected"
                );
                self.reject(actual, RejectReason::NotYourTurn).await;
                false
            }
            Err(TableError::IllegalMove { seat, card }) => {
                debug!(table_id = %table_id, seat = %seat, card = %card, "Illegal play rejected");
                self.reject(seat, RejectReason::IllegalMove).await;
                // The acting seat is re-prompted; its deadline keeps running
                false
            }
            Err(TableError::OutOfPhase) => {
                // Client-side fault: playing into a game that is not active
                warn!(table_id = %table_id, seat = %seat, "Play arrived out of phase");
                self.reject(seat, RejectReason::OutOfPhase).await;
                false
            }
            Err(TableError::RuleEngine(failure)) => {
                error!(
                    table_id = %table_id,
                    error = %failure,
                    "Rule engine failure; terminating table"
                );
                self.state.abort();
                let scores = self.state.scores();
                self.finish(
                    scores,
                    GameOverCause::RuleEngineFailure {
                        detail: failure.to_string(),
                    },
                )
                .await;
                true
            }
        }
    }

    async fn on_seat_disconnected(&mut self, seat: Seat) -> bool {
        info!(table_id = %self.state.id(), seat = %seat, "Seat disconnected");
        self.state.mark_absent(seat);
        self.registry.unbind_seat(self.state.id(), seat).await;

        // Mid-turn disconnect gets the same treatment as a timeout, now
        if self.state.turn() == Some(seat) {
            self.turn_deadline = Some(Instant::now());
        }
        false
    }

    /// Deadline expiry: the configured policy acts for the silent seat.
    async fn on_turn_expired(&mut self) -> bool {
        let Some(seat) = self.state.turn() else {
            self.turn_deadline = None;
            return false;
        };

        info!(
            table_id = %self.state.id(),
            seat = %seat,
            policy = ?self.config.timeout_policy,
            "Turn deadline expired"
        );

        match self.config.timeout_policy {
            TimeoutPolicy::Forfeit => {
                self.state.abort();
                let scores = self.state.scores();
                self.finish(scores, GameOverCause::Forfeit { seat }).await;
                true
            }
            TimeoutPolicy::ForcedPlay => {
                let legal = match self.engine.legal_moves(&self.state.rules_view(), seat) {
                    Ok(moves) => moves,
                    Err(failure) => {
                        error!(
                            table_id = %self.state.id(),
                            error = %failure,
                            "Rule engine failure during forced play"
                        );
                        self.state.abort();
                        let scores = self.state.scores();
                        self.finish(
                            scores,
                            GameOverCause::RuleEngineFailure {
                                detail: failure.to_string(),
                            },
                        )
                        .await;
                        return true;
                    }
                };

                // A seat with cards always has a legal discard under the
                // standard rules; an empty list means the state is beyond
                // saving
                let Some(card) = legal.into_iter().min() else {
                    error!(table_id = %self.state.id(), seat = %seat, "No forced play available");
                    self.state.abort();
                    let scores = self.state.scores();
                    self.finish(scores, GameOverCause::Forfeit { seat }).await;
                    return true;
                };

                self.submit_play(seat, card).await
            }
        }
    }

    async fn announce_turn(&mut self, seat: Seat) {
        self.event_bus
            .emit(TableEvent::YourTurn {
                table_id: self.state.id(),
                seat,
            })
            .await;

        // An absent seat never acts; let the policy fire immediately
        self.turn_deadline = if self.state.is_absent(seat) {
            Some(Instant::now())
        } else {
            Some(Instant::now() + self.config.turn_timeout)
        };
    }

    async fn reject(&self, seat: Seat, reason: RejectReason) {
        self.event_bus
            .emit(TableEvent::MoveRejected {
                table_id: self.state.id(),
                seat,
                reason,
            })
            .await;
    }

    /// Terminal path: release every seat, then announce the outcome. Seats
    /// are already free to rejoin the lobby by the time they read the result.
    async fn finish(&mut self, scores: Vec<(Seat, u32)>, cause: GameOverCause) {
        self.turn_deadline = None;
        self.release_seats().await;
        self.event_bus
            .emit(TableEvent::GameOver {
                table_id: self.state.id(),
                scores,
                cause,
            })
            .await;
    }

    async fn release_seats(&self) {
        let released = self.registry.unbind_table(self.state.id()).await;
        debug!(table_id = %self.state.id(), released = released, "Seat bindings released");
    }
}

async fn sleep_until_or_forever(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
