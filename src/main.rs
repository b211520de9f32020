use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use tricktable::{
    session::PetNameGenerator,
    shared::{AppError, AppState},
    websockets::{websocket_handler, InMemoryConnectionManager},
    StandardRules, TableConfig,
};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tricktable=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting trick-taking table server");

    let config = TableConfig::from_env();
    let rules = Arc::new(StandardRules::new(config.trump));
    let connections = Arc::new(InMemoryConnectionManager::new());
    let names = Arc::new(PetNameGenerator::new());
    let app_state = AppState::new(config, rules, connections, names);

    let app = Router::new()
        .route("/", get(|| async { "tricktable server" }))
        .route("/health", get(|| async { "ok" }))
        .route("/tables/:table_id", get(table_status))
        .route("/ws", get(websocket_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
    info!("Server running on http://localhost:3000");
    axum::serve(listener, app).await.unwrap();
}

async fn table_status(
    Path(table_id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    if state.manager.has_table(table_id).await {
        Ok(Json(json!({ "table_id": table_id, "status": "RUNNING" })))
    } else {
        Err(AppError::NotFound(format!("No table {}", table_id)))
    }
}
