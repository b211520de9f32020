use crate::game::cards::Card;
use crate::game::state::Seat;

/// Commands accepted by a table actor's inbox. Processed strictly one at a
/// time in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableCommand {
    /// Lobby signal: every seat is bound, deal and begin play.
    Begin,

    /// An authorized seat proposes a card.
    Play { seat: Seat, card: Card },

    /// The player at `seat` disconnected; the timeout policy takes over.
    SeatDisconnected { seat: Seat },

    /// Tear the table down without finishing the game.
    Shutdown,
}
