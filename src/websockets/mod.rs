// Public API
pub use connection_manager::{ConnectionManager, InMemoryConnectionManager};
pub use handler::websocket_handler;
pub use messages::{
    ConnectedPayload, LobbyQueuedPayload, MessageType, PlayCardPayload, WebSocketMessage,
    WebSocketMessageMeta,
};

// Internal modules
mod connection_manager;
mod handler;
mod messages;
