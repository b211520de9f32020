// Library crate for the trick-taking table server
// This file exposes the public API for integration tests

pub mod dispatcher;
pub mod event;
pub mod game;
pub mod lobby;
pub mod rules;
pub mod session;
pub mod shared;
pub mod websockets;

// Re-export commonly used types for easier access in tests
pub use dispatcher::{ClientAction, Dispatcher, TableFanout};
pub use event::{Audience, EventBus, RejectReason, TableEvent};
pub use game::{Card, GameOverCause, Rank, Seat, Suit, TableConfig, TableManager, TimeoutPolicy};
pub use lobby::{JoinOutcome, Lobby, LobbyError, TableObserver};
pub use rules::{RuleEngine, RuleEngineFailure, RuleSet, StandardRules};
pub use session::{PlayerIdentity, SessionRegistry};
pub use shared::{AppError, AppState};
pub use websockets::{ConnectionManager, MessageType, WebSocketMessage};
