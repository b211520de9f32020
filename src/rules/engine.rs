use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, warn};

use crate::game::cards::{Card, Suit};
use crate::game::state::Seat;

/// Read-only projection of table state handed to rule queries.
///
/// Queries receive borrows only, so a rule base has no way to mutate the
/// table. This is what makes speculative calls (legal-move hints) safe.
pub struct RulesView<'a> {
    /// Per-seat hands, indexed by seat position.
    pub hands: &'a [Vec<Card>],
    /// Plays into the current trick, in play order.
    pub trick: &'a [(Seat, Card)],
    /// Trump suit, if the active rule set uses one.
    pub trump: Option<Suit>,
}

impl RulesView<'_> {
    /// Suit of the card that led the current trick, if any.
    pub fn lead_suit(&self) -> Option<Suit> {
        self.trick.first().map(|(_, card)| card.suit)
    }
}

/// A defect inside the rule base itself, as opposed to a move being illegal.
#[derive(Debug, Clone, Error)]
pub enum RuleBaseError {
    #[error("winner queried on an empty trick")]
    EmptyTrick,

    #[error("seat {0} is not part of this game")]
    UnknownSeat(Seat),

    #[error("rule evaluation exceeded {0} inference steps")]
    InferenceLimit(usize),

    #[error("no winner rule matched the completed trick")]
    NoWinnerRule,
}

/// Failure of the rule engine as a whole. Fatal to the table that sees it -
/// never downgraded to "move is illegal".
#[derive(Debug, Clone, Error)]
pub enum RuleEngineFailure {
    #[error("rule base failed during {query}: {source}")]
    Malformed {
        query: &'static str,
        source: RuleBaseError,
    },

    #[error("rule query {query} exceeded its {budget:?} budget")]
    BudgetExceeded {
        query: &'static str,
        budget: Duration,
    },
}

/// A pluggable rule base. Implementations must be pure: deterministic,
/// side-effect-free functions of the view they are given.
pub trait RuleSet: Send + Sync {
    /// Human-readable name for logging.
    fn name(&self) -> &'static str;

    /// Whether `seat` may play `card` given the current view.
    fn legal_play(&self, view: &RulesView, seat: Seat, card: Card) -> Result<bool, RuleBaseError>;

    /// The seat that wins the completed trick in `view` and leads next.
    fn trick_winner(&self, view: &RulesView) -> Result<Seat, RuleBaseError>;

    /// Whether no further legal moves exist for any seat.
    fn terminal(&self, view: &RulesView) -> Result<bool, RuleBaseError>;
}

/// Adapter between the table state machine and a rule base.
///
/// Every query runs under a wall-clock budget; a query that overruns it is
/// reported as a `RuleEngineFailure`, which the table treats as fatal.
#[derive(Clone)]
pub struct RuleEngine {
    rules: Arc<dyn RuleSet>,
    query_budget: Duration,
}

impl RuleEngine {
    pub fn new(rules: Arc<dyn RuleSet>, query_budget: Duration) -> Self {
        Self {
            rules,
            query_budget,
        }
    }

    pub fn rule_set_name(&self) -> &'static str {
        self.rules.name()
    }

    pub fn is_legal(
        &self,
        view: &RulesView,
        seat: Seat,
        card: Card,
    ) -> Result<bool, RuleEngineFailure> {
        self.bounded("legal_play", |rules| rules.legal_play(view, seat, card))
    }

    pub fn resolve_trick(&self, view: &RulesView) -> Result<Seat, RuleEngineFailure> {
        self.bounded("trick_winner", |rules| rules.trick_winner(view))
    }

    pub fn is_terminal(&self, view: &RulesView) -> Result<bool, RuleEngineFailure> {
        self.bounded("terminal", |rules| rules.terminal(view))
    }

    /// Every card `seat` could legally play right now. Purely speculative;
    /// used for forced plays and client hints.
    pub fn legal_moves(&self, view: &RulesView, seat: Seat) -> Result<Vec<Card>, RuleEngineFailure> {
        let hand = view
            .hands
            .get(seat.index())
            .ok_or(RuleEngineFailure::Malformed {
                query: "legal_moves",
                source: RuleBaseError::UnknownSeat(seat),
            })?;

        let mut moves = Vec::new();
        for card in hand {
            if self.is_legal(view, seat, *card)? {
                moves.push(*card);
            }
        }
        Ok(moves)
    }

    fn bounded<T>(
        &self,
        query: &'static str,
        run: impl FnOnce(&dyn RuleSet) -> Result<T, RuleBaseError>,
    ) -> Result<T, RuleEngineFailure> {
        let started = Instant::now();
        let result = run(self.rules.as_ref());
        let elapsed = started.elapsed();

        if elapsed > self.query_budget {
            warn!(
                rule_set = self.rules.name(),
                query = query,
                elapsed_ms = elapsed.as_millis() as u64,
                budget_ms = self.query_budget.as_millis() as u64,
                "Rule query exceeded its budget"
            );
            return Err(RuleEngineFailure::BudgetExceeded {
                query,
                budget: self.query_budget,
            });
        }

        debug!(
            rule_set = self.rules.name(),
            query = query,
            elapsed_us = elapsed.as_micros() as u64,
            "Rule query answered"
        );

        result.map_err(|source| RuleEngineFailure::Malformed { query, source })
    }
}
