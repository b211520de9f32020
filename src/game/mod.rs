// Public API
pub use actor::{TableActor, TableClosed, TableHandle};
pub use cards::{Card, Rank, Suit};
pub use config::{TableConfig, TimeoutPolicy};
pub use manager::TableManager;
pub use messages::TableCommand;
pub use state::{
    GameOverCause, GamePhase, PlayOutcome, ResolvedTrick, Seat, TableError, TableId, TableState,
};

// Internal modules
pub mod actor;
pub mod cards;
pub mod config;
pub mod manager;
pub mod messages;
pub mod state;
