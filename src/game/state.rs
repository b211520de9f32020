use std::collections::HashSet;
use std::fmt;

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::game::cards::{Card, Suit};
use crate::rules::{RuleBaseError, RuleEngine, RuleEngineFailure, RulesView};
use crate::session::PlayerIdentity;

pub type TableId = Uuid;

/// A fixed position at a table, bound to one player for the game's lifetime.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Seat(usize);

impl Seat {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(&self) -> usize {
        self.0
    }

    /// The seat after this one in fixed rotation order.
    pub fn next(&self, seat_count: usize) -> Seat {
        Seat((self.0 + 1) % seat_count)
    }
}

impl fmt::Display for Seat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of a single game. `AwaitingMove` covers both an empty trick and
/// a trick in progress; the trick's fill level lives in the state itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    Forming,
    Dealing,
    AwaitingMove(Seat),
    TrickResolved,
    RoundComplete,
    GameOver,
}

/// Why a game reached `GameOver`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameOverCause {
    /// All tricks played out.
    Completed,
    /// A seat forfeited (timeout or disconnect under the forfeit policy).
    Forfeit { seat: Seat },
    /// The rule engine failed; the game cannot continue.
    RuleEngineFailure { detail: String },
}

#[derive(Debug, Clone, Error)]
pub enum TableError {
    #[error("seat {expected} is to act, not seat {actual}")]
    NotYourTurn { expected: Seat, actual: Seat },

    #[error("seat {seat} may not play {card}")]
    IllegalMove { seat: Seat, card: Card },

    #[error("action not valid in the current phase")]
    OutOfPhase,

    #[error(transparent)]
    RuleEngine(#[from] RuleEngineFailure),
}

/// A resolved trick: who won it and what was played into it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedTrick {
    pub winner: Seat,
    pub cards: Vec<(Seat, Card)>,
}

/// Result of applying one play to the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayOutcome {
    /// Redelivery of an already-accepted play; nothing changed.
    Duplicate,
    /// Play accepted, trick still open, `next` is to act.
    Played { next: Seat },
    /// Play accepted and it completed the trick.
    TrickComplete {
        winner: Seat,
        cards: Vec<(Seat, Card)>,
        /// Final scores when this trick ended the game.
        final_scores: Option<Vec<(Seat, u32)>>,
    },
}

/// Full state of one game. Exclusively owned by its table actor; nothing
/// outside the actor ever holds a mutable reference.
#[derive(Debug, Clone)]
pub struct TableState {
    id: TableId,
    players: Vec<PlayerIdentity>,
    hands: Vec<Vec<Card>>,
    trick: Vec<(Seat, Card)>,
    resolved: Vec<ResolvedTrick>,
    /// Every card each seat has had accepted this game. Duplicate deliveries
    /// of an accepted play are detected here.
    played: Vec<HashSet<Card>>,
    scores: Vec<u32>,
    absent: Vec<bool>,
    phase: GamePhase,
    trump: Option<Suit>,
}

impl TableState {
    pub fn new(id: TableId, players: Vec<PlayerIdentity>, trump: Option<Suit>) -> Self {
        let seat_count = players.len();
        Self {
            id,
            players,
            hands: vec![Vec::new(); seat_count],
            trick: Vec::new(),
            resolved: Vec::new(),
            played: vec![HashSet::new(); seat_count],
            scores: vec![0; seat_count],
            absent: vec![false; seat_count],
            phase: GamePhase::Forming,
            trump,
        }
    }

    pub fn id(&self) -> TableId {
        self.id
    }

    pub fn seat_count(&self) -> usize {
        self.players.len()
    }

    pub fn players(&self) -> &[PlayerIdentity] {
        &self.players
    }

    pub fn player_at(&self, seat: Seat) -> Option<&PlayerIdentity> {
        self.players.get(seat.index())
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    /// The unique seat that must act, if play is active.
    pub fn turn(&self) -> Option<Seat> {
        match self.phase {
            GamePhase::AwaitingMove(seat) => Some(seat),
            _ => None,
        }
    }

    pub fn hand(&self, seat: Seat) -> &[Card] {
        &self.hands[seat.index()]
    }

    pub fn trick(&self) -> &[(Seat, Card)] {
        &self.trick
    }

    pub fn resolved_tricks(&self) -> &[ResolvedTrick] {
        &self.resolved
    }

    pub fn scores(&self) -> Vec<(Seat, u32)> {
        self.scores
            .iter()
            .enumerate()
            .map(|(i, score)| (Seat::new(i), *score))
            .collect()
    }

    pub fn is_absent(&self, seat: Seat) -> bool {
        self.absent[seat.index()]
    }

    pub fn mark_absent(&mut self, seat: Seat) {
        self.absent[seat.index()] = true;
    }

    /// View handed to rule queries. Borrows only; the engine cannot mutate us.
    pub fn rules_view(&self) -> RulesView<'_> {
        RulesView {
            hands: &self.hands,
            trick: &self.trick,
            trump: self.trump,
        }
    }

    /// `Forming -> Dealing -> AwaitingMove(lead)`. Shuffles the deck, deals
    /// each seat an equal hand, and hands the turn to seat 0.
    pub fn deal(&mut self, hand_size: usize) -> Result<(), TableError> {
        if self.phase != GamePhase::Forming {
            return Err(TableError::OutOfPhase);
        }
        self.phase = GamePhase::Dealing;

        let mut deck = Card::full_deck();
        deck.shuffle(&mut rand::rng());

        for seat in 0..self.seat_count() {
            let mut hand: Vec<Card> = deck.drain(0..hand_size).collect();
            hand.sort();
            self.hands[seat] = hand;
        }

        self.phase = GamePhase::AwaitingMove(Seat::new(0));
        Ok(())
    }

    /// Runs one play through the validation pipeline and, if accepted,
    /// advances the state machine.
    ///
    /// Rejections (`NotYourTurn`, `IllegalMove`, `OutOfPhase`) leave the
    /// state untouched. A `RuleEngine` error also leaves the pipeline, but
    /// the caller must treat it as fatal for the whole table.
    pub fn apply_play(
        &mut self,
        seat: Seat,
        card: Card,
        engine: &RuleEngine,
    ) -> Result<PlayOutcome, TableError> {
        let expected = match self.phase {
            GamePhase::AwaitingMove(turn) => turn,
            _ => return Err(TableError::OutOfPhase),
        };

        // Idempotence: a redelivered accepted play must not double-count
        if self
            .played
            .get(seat.index())
            .is_some_and(|cards| cards.contains(&card))
        {
            return Ok(PlayOutcome::Duplicate);
        }

        if seat != expected {
            return Err(TableError::NotYourTurn {
                expected,
                actual: seat,
            });
        }

        if !engine.is_legal(&self.rules_view(), seat, card)? {
            return Err(TableError::IllegalMove { seat, card });
        }

        // Accepted: move the card from the hand into the trick
        let hand = &mut self.hands[seat.index()];
        let position = hand
            .iter()
            .position(|c| *c == card)
            .ok_or(TableError::IllegalMove { seat, card })?;
        hand.remove(position);
        self.trick.push((seat, card));
        self.played[seat.index()].insert(card);

        if self.trick.len() < self.seat_count() {
            let next = seat.next(self.seat_count());
            self.phase = GamePhase::AwaitingMove(next);
            return Ok(PlayOutcome::Played { next });
        }

        // One card from every seat: resolve the trick
        self.phase = GamePhase::TrickResolved;
        let winner = engine.resolve_trick(&self.rules_view())?;
        if winner.index() >= self.seat_count() {
            // A rule base naming a nonexistent seat is as broken as one
            // that cannot answer at all
            return Err(TableError::RuleEngine(RuleEngineFailure::Malformed {
                query: "trick_winner",
                source: RuleBaseError::UnknownSeat(winner),
            }));
        }
        let cards = std::mem::take(&mut self.trick);
        self.scores[winner.index()] += 1;
        self.resolved.push(ResolvedTrick {
            winner,
            cards: cards.clone(),
        });

        if engine.is_terminal(&self.rules_view())? {
            self.phase = GamePhase::RoundComplete;
            let final_scores = self.scores();
            self.phase = GamePhase::GameOver;
            return Ok(PlayOutcome::TrickComplete {
                winner,
                cards,
                final_scores: Some(final_scores),
            });
        }

        self.phase = GamePhase::AwaitingMove(winner);
        Ok(PlayOutcome::TrickComplete {
            winner,
            cards,
            final_scores: None,
        })
    }

    /// Ends the game early (forfeit or rule engine failure).
    pub fn abort(&mut self) {
        self.phase = GamePhase::GameOver;
    }

    /// Cards accounted for anywhere: hands, the open trick, resolved tricks.
    /// After dealing this must always equal the dealt deck.
    pub fn cards_in_play(&self) -> Vec<Card> {
        let mut cards: Vec<Card> = self.hands.iter().flatten().copied().collect();
        cards.extend(self.trick.iter().map(|(_, c)| *c));
        for trick in &self.resolved {
            cards.extend(trick.cards.iter().map(|(_, c)| *c));
        }
        cards
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::StandardRules;
    use std::sync::Arc;
    use std::time::Duration;

    fn identity(name: &str) -> PlayerIdentity {
        PlayerIdentity::with_name(name)
    }

    fn engine() -> RuleEngine {
        RuleEngine::new(Arc::new(StandardRules::new(None)), Duration::from_secs(1))
    }

    fn forming_state() -> TableState {
        TableState::new(
            Uuid::new_v4(),
            vec![
                identity("alice"),
                identity("bob"),
                identity("carol"),
                identity("dave"),
            ],
            None,
        )
    }

    fn dealt_state() -> TableState {
        let mut state = forming_state();
        state.deal(13).unwrap();
        state
    }

    /// Plays a legal card for whichever seat is to act.
    fn play_any_legal(state: &mut TableState, engine: &RuleEngine) -> PlayOutcome {
        let seat = state.turn().expect("game should be active");
        let legal = engine.legal_moves(&state.rules_view(), seat).unwrap();
        let card = legal[0];
        state.apply_play(seat, card, engine).unwrap()
    }

    fn assert_deck_conserved(state: &TableState) {
        let cards = state.cards_in_play();
        assert_eq!(cards.len(), 52);
        let unique: HashSet<Card> = cards.iter().copied().collect();
        assert_eq!(unique.len(), 52, "a card was duplicated or lost");
    }

    #[test]
    fn test_deal_transitions_to_awaiting_lead() {
        let mut state = forming_state();
        assert_eq!(state.phase(), GamePhase::Forming);

        state.deal(13).unwrap();
        assert_eq!(state.phase(), GamePhase::AwaitingMove(Seat::new(0)));
        for seat in 0..4 {
            assert_eq!(state.hand(Seat::new(seat)).len(), 13);
        }
        assert_deck_conserved(&state);
    }

    #[test]
    fn test_deal_twice_is_out_of_phase() {
        let mut state = dealt_state();
        assert!(matches!(state.deal(13), Err(TableError::OutOfPhase)));
    }

    #[test]
    fn test_play_before_dealing_is_out_of_phase() {
        let mut state = forming_state();
        let result = state.apply_play(Seat::new(0), Card::from_string("AS").unwrap(), &engine());
        assert!(matches!(result, Err(TableError::OutOfPhase)));
    }

    #[test]
    fn test_out_of_turn_play_is_rejected_without_state_change() {
        let mut state = dealt_state();
        let engine = engine();

        let wrong_seat = Seat::new(2);
        let card = state.hand(wrong_seat)[0];
        let result = state.apply_play(wrong_seat, card, &engine);

        assert!(matches!(result, Err(TableError::NotYourTurn { .. })));
        assert_eq!(state.turn(), Some(Seat::new(0)));
        assert_eq!(state.trick().len(), 0);
        assert_deck_conserved(&state);
    }

    #[test]
    fn test_card_not_in_hand_is_illegal_and_turn_unchanged() {
        let mut state = dealt_state();
        let engine = engine();

        // A card seat 0 does not hold must exist somewhere in the other hands
        let foreign = state.hand(Seat::new(1))[0];
        let result = state.apply_play(Seat::new(0), foreign, &engine);

        assert!(matches!(result, Err(TableError::IllegalMove { .. })));
        assert_eq!(state.turn(), Some(Seat::new(0)));
        assert_eq!(state.hand(Seat::new(0)).len(), 13);
        assert_deck_conserved(&state);
    }

    #[test]
    fn test_legal_play_advances_rotation() {
        let mut state = dealt_state();
        let engine = engine();

        let outcome = play_any_legal(&mut state, &engine);
        assert_eq!(outcome, PlayOutcome::Played { next: Seat::new(1) });
        assert_eq!(state.turn(), Some(Seat::new(1)));
        assert_eq!(state.trick().len(), 1);
        assert_deck_conserved(&state);
    }

    #[test]
    fn test_full_trick_resolves_to_one_winner_who_leads() {
        let mut state = dealt_state();
        let engine = engine();

        for _ in 0..3 {
            play_any_legal(&mut state, &engine);
        }
        let outcome = play_any_legal(&mut state, &engine);

        match outcome {
            PlayOutcome::TrickComplete {
                winner,
                cards,
                final_scores,
            } => {
                assert!(winner.index() < 4);
                assert_eq!(cards.len(), 4);
                assert!(final_scores.is_none());
                assert_eq!(state.turn(), Some(winner));
                assert_eq!(
                    state.scores().iter().map(|(_, s)| *s).sum::<u32>(),
                    1,
                    "exactly one trick point awarded"
                );
            }
            other => panic!("expected trick completion, got {:?}", other),
        }
        assert_eq!(state.trick().len(), 0, "trick cleared on resolution");
        assert_deck_conserved(&state);
    }

    #[test]
    fn test_duplicate_play_is_idempotent() {
        let mut state = dealt_state();
        let engine = engine();

        let seat = Seat::new(0);
        let card = engine.legal_moves(&state.rules_view(), seat).unwrap()[0];
        state.apply_play(seat, card, &engine).unwrap();

        let trick_before = state.trick().to_vec();
        let turn_before = state.turn();
        let outcome = state.apply_play(seat, card, &engine).unwrap();

        assert_eq!(outcome, PlayOutcome::Duplicate);
        assert_eq!(state.trick(), trick_before.as_slice());
        assert_eq!(state.turn(), turn_before);
        assert_deck_conserved(&state);
    }

    #[test]
    fn test_turn_pointer_is_always_unique_through_a_full_game() {
        let mut state = dealt_state();
        let engine = engine();

        let mut plays = 0;
        while state.phase() != GamePhase::GameOver {
            // At most one seat to act at any time
            let to_act: Vec<Seat> = (0..4)
                .map(Seat::new)
                .filter(|s| state.turn() == Some(*s))
                .collect();
            assert_eq!(to_act.len(), 1);

            play_any_legal(&mut state, &engine);
            assert_deck_conserved(&state);
            plays += 1;
        }

        assert_eq!(plays, 52, "every dealt card gets played exactly once");
        assert_eq!(state.resolved_tricks().len(), 13);
        assert_eq!(
            state.scores().iter().map(|(_, s)| *s).sum::<u32>(),
            13,
            "one point per trick"
        );
    }

    #[test]
    fn test_game_over_reports_final_scores() {
        let mut state = dealt_state();
        let engine = engine();

        let mut last = None;
        while state.phase() != GamePhase::GameOver {
            last = Some(play_any_legal(&mut state, &engine));
        }

        match last {
            Some(PlayOutcome::TrickComplete {
                final_scores: Some(scores),
                ..
            }) => {
                assert_eq!(scores.len(), 4);
                assert_eq!(scores.iter().map(|(_, s)| *s).sum::<u32>(), 13);
            }
            other => panic!("expected terminal trick, got {:?}", other),
        }
    }

    #[test]
    fn test_abort_reaches_game_over() {
        let mut state = dealt_state();
        state.abort();
        assert_eq!(state.phase(), GamePhase::GameOver);
        assert_eq!(state.turn(), None);
    }
}
