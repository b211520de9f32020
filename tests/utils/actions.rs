use uuid::Uuid;

use tricktable::dispatcher::ClientAction;
use tricktable::websockets::MessageType;
use tricktable::{Card, PlayerIdentity, Seat, Suit};

use super::setup::TestSetup;

// ============================================================================
// Action Helpers
// ============================================================================

pub async fn connect_players(setup: &TestSetup, count: usize) -> Vec<PlayerIdentity> {
    let mut players = Vec::with_capacity(count);
    for _ in 0..count {
        players.push(setup.state.dispatcher.connect().await);
    }
    players
}

pub async fn join_lobby(setup: &TestSetup, player_id: Uuid) {
    setup
        .state
        .dispatcher
        .dispatch(ClientAction::JoinLobby { player_id })
        .await;
}

pub async fn play_card(setup: &TestSetup, player_id: Uuid, seat: usize, card: Card) {
    setup
        .state
        .dispatcher
        .dispatch(ClientAction::PlayCard {
            player_id,
            seat: Seat::new(seat),
            card,
        })
        .await;
}

pub async fn disconnect(setup: &TestSetup, player_id: Uuid) {
    setup
        .state
        .dispatcher
        .dispatch(ClientAction::Disconnect { player_id })
        .await;
}

// ============================================================================
// Table Driver
// ============================================================================

/// Drives a formed four-seat table from the clients' point of view, tracking
/// each seat's hand and the current lead suit from the delivered messages.
pub struct TableDriver {
    pub players: Vec<PlayerIdentity>,
    pub table_id: Uuid,
    pub hands: Vec<Vec<Card>>,
    pub lead_suit: Option<Suit>,
    trick_plays: usize,
}

impl TableDriver {
    /// Connects four players, joins them all, and consumes the formation
    /// traffic: queue acks, TABLE_FORMED, each seat's HAND_DEALT, and the
    /// opening YOUR_TURN for seat 0.
    pub async fn form(setup: &TestSetup) -> Self {
        let players = connect_players(setup, 4).await;
        for player in &players {
            join_lobby(setup, player.id).await;
        }

        // The first three joiners are told they are waiting
        for (i, player) in players.iter().take(3).enumerate() {
            let message = setup.mock.next_message_for(player.id).await;
            assert_eq!(message.message_type, MessageType::LobbyQueued);
            assert_eq!(message.payload["position"], i + 1);
        }

        let mut table_id = None;
        let mut hands = vec![Vec::new(); 4];
        for (seat, player) in players.iter().enumerate() {
            let formed = setup.mock.next_message_for(player.id).await;
            assert_eq!(formed.message_type, MessageType::TableFormed);
            let id: Uuid = serde_json::from_value(formed.payload["table_id"].clone())
                .expect("table id in formation message");
            if let Some(existing) = table_id {
                assert_eq!(existing, id, "all seats see the same table");
            }
            table_id = Some(id);

            // Seats are announced in arrival order
            let seats = formed.payload["seats"].as_array().unwrap();
            assert_eq!(seats.len(), 4);
            assert_eq!(seats[seat]["player_id"], serde_json::json!(player.id));

            let dealt = setup.mock.next_message_for(player.id).await;
            assert_eq!(dealt.message_type, MessageType::HandDealt);
            assert_eq!(dealt.payload["seat"], seat);
            hands[seat] = dealt.payload["cards"]
                .as_array()
                .unwrap()
                .iter()
                .map(|v| Card::from_string(v.as_str().unwrap()).unwrap())
                .collect();
            assert_eq!(hands[seat].len(), 13);

            let turn = setup.mock.next_message_for(player.id).await;
            assert_eq!(turn.message_type, MessageType::YourTurn);
            assert_eq!(turn.payload["seat"], 0);
        }

        Self {
            players,
            table_id: table_id.unwrap(),
            hands,
            lead_suit: None,
            trick_plays: 0,
        }
    }

    /// A card `seat` may legally play right now, from its tracked hand.
    pub fn legal_card(&self, seat: usize) -> Card {
        let hand = &self.hands[seat];
        match self.lead_suit {
            Some(lead) => hand
                .iter()
                .find(|c| c.suit == lead)
                .copied()
                .unwrap_or(hand[0]),
            None => hand[0],
        }
    }

    /// A card `seat` does not hold; useful for provoking rejections.
    pub fn foreign_card(&self, seat: usize) -> Card {
        let other = (seat + 1) % 4;
        self.hands[other][0]
    }

    /// Submits a play and updates the tracked state as if accepted.
    pub async fn play(&mut self, setup: &TestSetup, seat: usize, card: Card) {
        play_card(setup, self.players[seat].id, seat, card).await;
        self.hands[seat].retain(|c| *c != card);
        if self.trick_plays == 0 {
            self.lead_suit = Some(card.suit);
        }
        self.trick_plays += 1;
        if self.trick_plays == 4 {
            self.trick_plays = 0;
            self.lead_suit = None;
        }
    }
}
