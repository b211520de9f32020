use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A connected player: opaque unique id plus a generated display name.
/// Created on the connection handshake, immutable afterwards, and destroyed
/// when the connection goes away.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerIdentity {
    pub id: Uuid,
    pub display_name: String,
    pub connected_at: DateTime<Utc>,
}

impl PlayerIdentity {
    pub fn new(display_name: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            display_name,
            connected_at: Utc::now(),
        }
    }

    pub fn with_name(display_name: &str) -> Self {
        Self::new(display_name.to_string())
    }
}

/// Trait for generating display names on handshake
#[async_trait]
pub trait DisplayNameGenerator: Send + Sync {
    async fn generate(&self) -> String;
}

/// Pet name-based display name generator
pub struct PetNameGenerator;

impl PetNameGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PetNameGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DisplayNameGenerator for PetNameGenerator {
    async fn generate(&self) -> String {
        petname::Petnames::default().generate_one(2, "-")
    }
}
