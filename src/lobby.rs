use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::game::{Seat, TableCommand, TableId, TableManager};
use crate::session::{PlayerIdentity, SessionRegistry};

#[derive(Debug, Clone, Error)]
pub enum LobbyError {
    #[error("Player already waiting in the lobby")]
    AlreadyQueued,
    #[error("Player is already seated at a table")]
    AlreadySeated,
    #[error("Table formation failed")]
    FormationFailed,
}

/// Result of a lobby join: either waiting, or seated at a table that just
/// reached its quota.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    /// Still waiting; `position` is 1-based within the queue.
    Queued { position: usize },
    /// This join completed the quota and formed a table.
    Seated { table_id: TableId, seat: Seat },
}

/// Hook invoked after a table's seats are bound but before the table is told
/// to begin. The dispatcher uses this to attach its event fan-out so no
/// event of the new table can be missed.
#[async_trait]
pub trait TableObserver: Send + Sync {
    async fn table_seated(&self, table_id: TableId, seating: &[(PlayerIdentity, Seat)]);
}

/// Observer that does nothing; for wiring where no fan-out is wanted.
pub struct NoopTableObserver;

#[async_trait]
impl TableObserver for NoopTableObserver {
    async fn table_seated(&self, _table_id: TableId, _seating: &[(PlayerIdentity, Seat)]) {}
}

/// Matches waiting players into tables.
///
/// The queue is strictly FIFO: when it reaches the seat quota, exactly quota
/// players are removed oldest-first and seated in queue order. The queue
/// mutex is the only serialization point; it is always taken before any
/// table is created, never the other way around.
pub struct Lobby {
    queue: Mutex<VecDeque<PlayerIdentity>>,
    quota: usize,
    manager: Arc<TableManager>,
    registry: Arc<SessionRegistry>,
    observer: Arc<dyn TableObserver>,
}

impl Lobby {
    pub fn new(
        quota: usize,
        manager: Arc<TableManager>,
        registry: Arc<SessionRegistry>,
        observer: Arc<dyn TableObserver>,
    ) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            quota,
            manager,
            registry,
            observer,
        }
    }

    pub fn quota(&self) -> usize {
        self.quota
    }

    pub async fn queue_len(&self) -> usize {
        self.queue.lock().await.len()
    }

    /// Adds a player to the queue, forming a table if that fills the quota.
    pub async fn join(&self, identity: PlayerIdentity) -> Result<JoinOutcome, LobbyError> {
        if self.registry.is_bound(identity.id).await {
            return Err(LobbyError::AlreadySeated);
        }

        let players = {
            let mut queue = self.queue.lock().await;
            if queue.iter().any(|p| p.id == identity.id) {
                return Err(LobbyError::AlreadyQueued);
            }

            queue.push_back(identity.clone());
            debug!(
                player_id = %identity.id,
                queue_len = queue.len(),
                quota = self.quota,
                "Player queued"
            );

            if queue.len() < self.quota {
                return Ok(JoinOutcome::Queued {
                    position: queue.len(),
                });
            }

            // Quota reached: remove exactly quota players, oldest first
            queue.drain(0..self.quota).collect::<Vec<_>>()
        };

        let table_id = self.form_table(players).await?;
        Ok(JoinOutcome::Seated {
            table_id,
            // The completing joiner was last in queue order
            seat: Seat::new(self.quota - 1),
        })
    }

    /// Removes a queued player. Other players keep their positions. No-op
    /// for players who are not queued.
    pub async fn leave(&self, player_id: Uuid) -> bool {
        let mut queue = self.queue.lock().await;
        let before = queue.len();
        queue.retain(|p| p.id != player_id);
        before != queue.len()
    }

    async fn form_table(&self, players: Vec<PlayerIdentity>) -> Result<TableId, LobbyError> {
        let handle = self.manager.create_table(players.clone()).await;
        let table_id = handle.table_id();

        let mut seating = Vec::with_capacity(players.len());
        for (index, player) in players.iter().enumerate() {
            let seat = Seat::new(index);
            if let Err(e) = self.registry.bind(player.id, table_id, seat).await {
                error!(
                    table_id = %table_id,
                    player_id = %player.id,
                    error = %e,
                    "Seat binding failed; abandoning table"
                );
                self.registry.unbind_table(table_id).await;
                let _ = handle.send(TableCommand::Shutdown).await;
                return Err(LobbyError::FormationFailed);
            }
            seating.push((player.clone(), seat));
        }

        // Fan-out must be attached before the first event can fire
        self.observer.table_seated(table_id, &seating).await;

        handle
            .send(TableCommand::Begin)
            .await
            .map_err(|_| LobbyError::FormationFailed)?;

        info!(
            table_id = %table_id,
            seats = seating.len(),
            "Table formed from lobby queue"
        );
        Ok(table_id)
    }
}
