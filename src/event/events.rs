use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::cards::Card;
use crate::game::state::{GameOverCause, Seat, TableId};

/// Why a submitted action was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectReason {
    /// Sender's binding does not match the claimed seat.
    Unauthorized,
    /// Right seat, wrong moment in rotation.
    NotYourTurn,
    /// The rule engine judged the move illegal.
    IllegalMove,
    /// Action arrived in a phase where it cannot apply.
    OutOfPhase,
}

/// A seat assignment as announced when a table forms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatInfo {
    pub seat: Seat,
    pub player_id: Uuid,
    pub display_name: String,
}

/// Who should see an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    /// Every seat at the table.
    Table,
    /// Exactly one seat.
    Seat(Seat),
}

/// Events a table emits as it moves through its state machine.
///
/// Events are facts about things that have already happened. Each carries its
/// table id so routing never needs out-of-band context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TableEvent {
    /// A table filled its quota and its seats are bound.
    TableFormed {
        table_id: TableId,
        seats: Vec<SeatInfo>,
    },

    /// A seat's dealt hand. Private to that seat.
    HandDealt {
        table_id: TableId,
        seat: Seat,
        cards: Vec<Card>,
    },

    /// The named seat must act next.
    YourTurn { table_id: TableId, seat: Seat },

    /// A play was accepted into the current trick.
    CardPlayed {
        table_id: TableId,
        seat: Seat,
        card: Card,
    },

    /// A completed trick was scored and cleared.
    TrickResolved {
        table_id: TableId,
        winning_seat: Seat,
        cards: Vec<(Seat, Card)>,
    },

    /// An action was rejected. Private to the offending seat.
    MoveRejected {
        table_id: TableId,
        seat: Seat,
        reason: RejectReason,
    },

    /// The game ended, cleanly or otherwise.
    GameOver {
        table_id: TableId,
        scores: Vec<(Seat, u32)>,
        cause: GameOverCause,
    },
}

impl TableEvent {
    /// The table this event belongs to.
    pub fn table_id(&self) -> TableId {
        match self {
            TableEvent::TableFormed { table_id, .. } => *table_id,
            TableEvent::HandDealt { table_id, .. } => *table_id,
            TableEvent::YourTurn { table_id, .. } => *table_id,
            TableEvent::CardPlayed { table_id, .. } => *table_id,
            TableEvent::TrickResolved { table_id, .. } => *table_id,
            TableEvent::MoveRejected { table_id, .. } => *table_id,
            TableEvent::GameOver { table_id, .. } => *table_id,
        }
    }

    /// Short name for logging.
    pub fn event_type(&self) -> &'static str {
        match self {
            TableEvent::TableFormed { .. } => "table_formed",
            TableEvent::HandDealt { .. } => "hand_dealt",
            TableEvent::YourTurn { .. } => "your_turn",
            TableEvent::CardPlayed { .. } => "card_played",
            TableEvent::TrickResolved { .. } => "trick_resolved",
            TableEvent::MoveRejected { .. } => "move_rejected",
            TableEvent::GameOver { .. } => "game_over",
        }
    }

    /// Whether everyone at the table sees this, or one seat only.
    pub fn audience(&self) -> Audience {
        match self {
            TableEvent::HandDealt { seat, .. } => Audience::Seat(*seat),
            TableEvent::MoveRejected { seat, .. } => Audience::Seat(*seat),
            _ => Audience::Table,
        }
    }
}
