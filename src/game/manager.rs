use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::event::EventBus;
use crate::game::actor::{TableActor, TableHandle};
use crate::game::config::TableConfig;
use crate::game::state::{TableId, TableState};
use crate::rules::{RuleEngine, RuleSet};
use crate::session::{PlayerIdentity, SessionRegistry};

/// Creates table actors and tracks the live ones.
///
/// Handles disappear from the map on their own: a reaper task watches each
/// actor and cleans up its entry and event channel when the actor stops.
pub struct TableManager {
    /// A mapping from table ID to the running table's handle
    tables: Arc<RwLock<HashMap<TableId, TableHandle>>>,
    config: TableConfig,
    rules: Arc<dyn RuleSet>,
    event_bus: EventBus,
    registry: Arc<SessionRegistry>,
}

impl TableManager {
    pub fn new(
        config: TableConfig,
        rules: Arc<dyn RuleSet>,
        event_bus: EventBus,
        registry: Arc<SessionRegistry>,
    ) -> Self {
        Self {
            tables: Arc::new(RwLock::new(HashMap::new())),
            config,
            rules,
            event_bus,
            registry,
        }
    }

    /// Spawns a new table in `Forming` for the given players, seat order
    /// matching `players` order. The table does not deal until it receives
    /// `TableCommand::Begin`.
    pub async fn create_table(&self, players: Vec<PlayerIdentity>) -> TableHandle {
        let table_id = Uuid::new_v4();
        info!(
            table_id = %table_id,
            seats = players.len(),
            "Creating table"
        );

        let state = TableState::new(table_id, players, self.config.trump);
        let engine = RuleEngine::new(self.rules.clone(), self.config.rule_query_budget);
        let (handle, join) = TableActor::spawn(
            state,
            self.config.clone(),
            engine,
            self.event_bus.clone(),
            self.registry.clone(),
        );

        let mut tables = self.tables.write().await;
        tables.insert(table_id, handle.clone());
        drop(tables);

        // Reap the entry once the actor stops, however it stopped
        let tables = self.tables.clone();
        let event_bus = self.event_bus.clone();
        tokio::spawn(async move {
            let _ = join.await;
            tables.write().await.remove(&table_id);
            event_bus.remove_table(table_id).await;
            debug!(table_id = %table_id, "Table reaped");
        });

        handle
    }

    pub async fn get_table(&self, table_id: TableId) -> Option<TableHandle> {
        let tables = self.tables.read().await;
        tables.get(&table_id).cloned()
    }

    pub async fn has_table(&self, table_id: TableId) -> bool {
        let tables = self.tables.read().await;
        tables.contains_key(&table_id)
    }

    pub async fn table_count(&self) -> usize {
        let tables = self.tables.read().await;
        tables.len()
    }
}
