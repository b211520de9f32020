//! Test assertion helpers for verifying delivered messages
#![allow(dead_code)] // Test utilities may not all be used in every test

use tricktable::websockets::{MessageType, WebSocketMessage};
use tricktable::PlayerIdentity;

use super::setup::TestSetup;

// ============================================================================
// Assertion Helpers
// ============================================================================

/// Asserts the next message for `player` has the expected type, returning it
/// for payload checks.
pub async fn expect_message(
    setup: &TestSetup,
    player: &PlayerIdentity,
    expected: MessageType,
) -> WebSocketMessage {
    let message = setup.mock.next_message_for(player.id).await;
    assert_eq!(
        message.message_type, expected,
        "{} received wrong message type (payload: {})",
        player.display_name, message.payload
    );
    message
}

/// Asserts every listed player receives the same message type next, and that
/// all broadcast payloads agree. Returns the first payload.
pub async fn expect_broadcast(
    setup: &TestSetup,
    players: &[PlayerIdentity],
    expected: MessageType,
) -> WebSocketMessage {
    let mut first: Option<WebSocketMessage> = None;
    for player in players {
        let message = expect_message(setup, player, expected.clone()).await;
        if let Some(reference) = &first {
            assert_eq!(
                reference.payload, message.payload,
                "broadcast payloads must match for every seat"
            );
        } else {
            first = Some(message);
        }
    }
    first.expect("at least one player to assert on")
}

/// Asserts a CARD_PLAYED broadcast for the given seat and card.
pub async fn expect_card_played(
    setup: &TestSetup,
    players: &[PlayerIdentity],
    seat: usize,
    card: &str,
) {
    let message = expect_broadcast(setup, players, MessageType::CardPlayed).await;
    assert_eq!(message.payload["seat"], seat);
    assert_eq!(message.payload["card"], card);
}

/// Asserts a YOUR_TURN broadcast naming the given seat.
pub async fn expect_your_turn(setup: &TestSetup, players: &[PlayerIdentity], seat: usize) {
    let message = expect_broadcast(setup, players, MessageType::YourTurn).await;
    assert_eq!(message.payload["seat"], seat);
}

/// Asserts a TRICK_RESOLVED broadcast and returns the winning seat.
pub async fn expect_trick_resolved(setup: &TestSetup, players: &[PlayerIdentity]) -> usize {
    let message = expect_broadcast(setup, players, MessageType::TrickResolved).await;
    let winner = message.payload["winning_seat"]
        .as_u64()
        .expect("winning seat in payload") as usize;
    assert_eq!(message.payload["cards"].as_array().unwrap().len(), 4);
    winner
}
