use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

use crate::dispatcher::{Dispatcher, TableFanout};
use crate::event::EventBus;
use crate::game::{TableConfig, TableManager};
use crate::lobby::Lobby;
use crate::rules::RuleSet;
use crate::session::{DisplayNameGenerator, SessionRegistry};
use crate::websockets::ConnectionManager;

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub connections: Arc<dyn ConnectionManager>,
    pub registry: Arc<SessionRegistry>,
    pub manager: Arc<TableManager>,
    pub event_bus: EventBus,
}

impl AppState {
    /// Wires the core together. The lobby gets the dispatcher's fan-out as
    /// its table observer, so subscriptions exist before a table begins.
    pub fn new(
        config: TableConfig,
        rules: Arc<dyn RuleSet>,
        connections: Arc<dyn ConnectionManager>,
        names: Arc<dyn DisplayNameGenerator>,
    ) -> Self {
        let registry = Arc::new(SessionRegistry::new());
        let event_bus = EventBus::new();
        let manager = Arc::new(TableManager::new(
            config.clone(),
            rules,
            event_bus.clone(),
            registry.clone(),
        ));
        let fanout = Arc::new(TableFanout::new(event_bus.clone(), connections.clone()));
        let lobby = Arc::new(Lobby::new(
            config.seat_quota,
            manager.clone(),
            registry.clone(),
            fanout,
        ));
        let dispatcher = Arc::new(Dispatcher::new(
            lobby,
            manager.clone(),
            registry.clone(),
            connections.clone(),
            names,
        ));

        Self {
            dispatcher,
            connections,
            registry,
            manager,
            event_bus,
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal server error")]
    Internal,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(json!({
            "error": error_message
        }));

        (status, body).into_response()
    }
}
