use tracing::trace;

use crate::game::cards::{Card, Suit};
use crate::game::state::Seat;

use super::engine::{RuleBaseError, RuleSet, RulesView};

/// Upper bound on constraint evaluations per query. A well-formed rule base
/// answers in a handful of steps; hitting this means the base is malformed.
const INFERENCE_LIMIT: usize = 4096;

/// Primitive conditions a legality clause can require.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Constraint {
    /// The acting seat actually holds the proposed card.
    HoldsCard,
    /// No card has been played into the current trick.
    TrickEmpty,
    /// The proposed card matches the suit that led the trick.
    FollowsLeadSuit,
    /// The acting seat holds no card of the lead suit.
    VoidInLeadSuit,
}

/// A legality clause: the play is legal if every constraint in `all` holds.
/// The play is legal overall if any clause is satisfied.
struct Clause {
    name: &'static str,
    all: &'static [Constraint],
}

const LEGALITY_CLAUSES: &[Clause] = &[
    Clause {
        name: "lead_any_card",
        all: &[Constraint::HoldsCard, Constraint::TrickEmpty],
    },
    Clause {
        name: "follow_lead_suit",
        all: &[Constraint::HoldsCard, Constraint::FollowsLeadSuit],
    },
    Clause {
        name: "discard_when_void",
        all: &[Constraint::HoldsCard, Constraint::VoidInLeadSuit],
    },
];

/// Card filters tried in order to pick the trick winner: the highest rank
/// among the first filter that matches any played card wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WinnerFilter {
    TrumpCards,
    LeadSuitCards,
}

const WINNER_FILTERS: &[WinnerFilter] = &[WinnerFilter::TrumpCards, WinnerFilter::LeadSuitCards];

/// The default rule base: follow the lead suit if able, discard otherwise;
/// highest trump wins the trick, else highest card of the lead suit. One
/// trick won is one point, and the game ends when hands are exhausted.
pub struct StandardRules {
    trump: Option<Suit>,
}

impl StandardRules {
    pub fn new(trump: Option<Suit>) -> Self {
        Self { trump }
    }

    fn check(
        &self,
        constraint: Constraint,
        view: &RulesView,
        seat: Seat,
        card: Card,
        steps: &mut usize,
    ) -> Result<bool, RuleBaseError> {
        *steps += 1;
        if *steps > INFERENCE_LIMIT {
            return Err(RuleBaseError::InferenceLimit(INFERENCE_LIMIT));
        }

        let hand = view
            .hands
            .get(seat.index())
            .ok_or(RuleBaseError::UnknownSeat(seat))?;

        let holds = match constraint {
            Constraint::HoldsCard => hand.contains(&card),
            Constraint::TrickEmpty => view.trick.is_empty(),
            Constraint::FollowsLeadSuit => match view.lead_suit() {
                Some(lead) => card.suit == lead,
                None => false,
            },
            Constraint::VoidInLeadSuit => match view.lead_suit() {
                Some(lead) => !hand.iter().any(|c| c.suit == lead),
                None => false,
            },
        };
        Ok(holds)
    }
}

impl RuleSet for StandardRules {
    fn name(&self) -> &'static str {
        "standard-trick-taking"
    }

    fn legal_play(&self, view: &RulesView, seat: Seat, card: Card) -> Result<bool, RuleBaseError> {
        let mut steps = 0;

        'clauses: for clause in LEGALITY_CLAUSES {
            for constraint in clause.all {
                if !self.check(*constraint, view, seat, card, &mut steps)? {
                    continue 'clauses;
                }
            }

            trace!(
                clause = clause.name,
                seat = %seat,
                card = %card,
                "Legality clause satisfied"
            );
            return Ok(true);
        }

        Ok(false)
    }

    fn trick_winner(&self, view: &RulesView) -> Result<Seat, RuleBaseError> {
        if view.trick.is_empty() {
            return Err(RuleBaseError::EmptyTrick);
        }

        // lead_suit is Some whenever the trick is non-empty
        let lead = view.lead_suit().ok_or(RuleBaseError::EmptyTrick)?;

        for filter in WINNER_FILTERS {
            let matches = view.trick.iter().filter(|(_, card)| match filter {
                WinnerFilter::TrumpCards => Some(card.suit) == self.trump.or(view.trump),
                WinnerFilter::LeadSuitCards => card.suit == lead,
            });

            if let Some((seat, card)) = matches.max_by_key(|(_, card)| card.rank) {
                trace!(filter = ?filter, winner = %seat, card = %card, "Winner filter matched");
                return Ok(*seat);
            }
        }

        // The lead card always matches the lead-suit filter
        Err(RuleBaseError::NoWinnerRule)
    }

    fn terminal(&self, view: &RulesView) -> Result<bool, RuleBaseError> {
        Ok(view.hands.iter().all(|hand| hand.is_empty()))
    }
}
