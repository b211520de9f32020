// Event-driven architecture components
//
// Tables publish facts about their state transitions here; the dispatcher
// subscribes per table and fans events out to the seats concerned.

// Public API - what other modules can use
pub use bus::EventBus;
pub use events::{Audience, RejectReason, SeatInfo, TableEvent};

// Internal modules
mod bus;
mod events;
