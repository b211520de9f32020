// Public API - what other modules can use
pub use models::{DisplayNameGenerator, PetNameGenerator, PlayerIdentity};
pub use registry::{RegistryError, SessionBinding, SessionRegistry};

// Internal modules
mod models;
mod registry;
