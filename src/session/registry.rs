use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::game::state::{Seat, TableId};

use super::models::PlayerIdentity;

/// Where a player currently sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionBinding {
    pub table_id: TableId,
    pub seat: Seat,
}

#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    #[error("player {0} is not connected")]
    UnknownPlayer(Uuid),

    #[error("player {0} is already seated at a table")]
    AlreadyBound(Uuid),
}

/// Tracks connected identities and their seat bindings.
///
/// Invariant: at most one binding per player at any time. `authorize`
/// compares a claimed seat against this registry's own view, never against
/// anything the message payload says, so a client cannot spoof a seat.
pub struct SessionRegistry {
    identities: Arc<RwLock<HashMap<Uuid, PlayerIdentity>>>,
    bindings: Arc<RwLock<HashMap<Uuid, SessionBinding>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            identities: Arc::new(RwLock::new(HashMap::new())),
            bindings: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Records a freshly-handshaken identity.
    pub async fn register(&self, identity: PlayerIdentity) {
        debug!(player_id = %identity.id, display_name = %identity.display_name, "Registering identity");
        let mut identities = self.identities.write().await;
        identities.insert(identity.id, identity);
    }

    /// Drops an identity and any binding it holds. Returns the identity if
    /// it was known.
    pub async fn remove(&self, player_id: Uuid) -> Option<PlayerIdentity> {
        self.bindings.write().await.remove(&player_id);
        let mut identities = self.identities.write().await;
        identities.remove(&player_id)
    }

    pub async fn identity(&self, player_id: Uuid) -> Option<PlayerIdentity> {
        self.identities.read().await.get(&player_id).cloned()
    }

    /// Binds a player to a seat. Rejects unknown players and players who
    /// already hold a binding anywhere in the system.
    pub async fn bind(
        &self,
        player_id: Uuid,
        table_id: TableId,
        seat: Seat,
    ) -> Result<(), RegistryError> {
        if self.identity(player_id).await.is_none() {
            return Err(RegistryError::UnknownPlayer(player_id));
        }

        let mut bindings = self.bindings.write().await;
        if bindings.contains_key(&player_id) {
            return Err(RegistryError::AlreadyBound(player_id));
        }

        debug!(player_id = %player_id, table_id = %table_id, seat = %seat, "Binding seat");
        bindings.insert(player_id, SessionBinding { table_id, seat });
        Ok(())
    }

    pub async fn unbind(&self, player_id: Uuid) -> Option<SessionBinding> {
        let mut bindings = self.bindings.write().await;
        bindings.remove(&player_id)
    }

    /// Releases the binding for one seat at a table, if any. Used when a
    /// seated player disconnects mid-game.
    pub async fn unbind_seat(&self, table_id: TableId, seat: Seat) -> Option<Uuid> {
        let mut bindings = self.bindings.write().await;
        let player = bindings
            .iter()
            .find(|(_, binding)| binding.table_id == table_id && binding.seat == seat)
            .map(|(player_id, _)| *player_id)?;
        bindings.remove(&player);
        Some(player)
    }

    /// Releases every binding for a terminated table.
    pub async fn unbind_table(&self, table_id: TableId) -> usize {
        let mut bindings = self.bindings.write().await;
        let before = bindings.len();
        bindings.retain(|_, binding| binding.table_id != table_id);
        before - bindings.len()
    }

    pub async fn lookup(&self, player_id: Uuid) -> Option<SessionBinding> {
        self.bindings.read().await.get(&player_id).copied()
    }

    pub async fn is_bound(&self, player_id: Uuid) -> bool {
        self.lookup(player_id).await.is_some()
    }

    /// Whether `player_id` may act as `claimed_seat` at `table_id`.
    pub async fn authorize(&self, player_id: Uuid, claimed_seat: Seat, table_id: TableId) -> bool {
        match self.lookup(player_id).await {
            Some(binding) => {
                let authorized = binding.table_id == table_id && binding.seat == claimed_seat;
                if !authorized {
                    warn!(
                        player_id = %player_id,
                        claimed_seat = %claimed_seat,
                        bound_seat = %binding.seat,
                        "Seat claim does not match binding"
                    );
                }
                authorized
            }
            None => {
                warn!(player_id = %player_id, "Action from a player with no binding");
                false
            }
        }
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
