use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::game::cards::Suit;

/// What happens when a seat fails to act before the turn deadline, or has
/// disconnected when its turn comes around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeoutPolicy {
    /// The lowest-ranked legal card is played on the seat's behalf.
    ForcedPlay,
    /// The table ends immediately; the absent seat forfeits.
    Forfeit,
}

/// Per-table configuration. One value is built at startup and shared by every
/// table the lobby creates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableConfig {
    /// Number of seats a table must fill before play begins.
    pub seat_quota: usize,
    /// How long a seat may think before the timeout policy applies.
    pub turn_timeout: Duration,
    pub timeout_policy: TimeoutPolicy,
    /// Wall-clock budget for a single rule engine query.
    pub rule_query_budget: Duration,
    /// Optional trump suit for the default rule set.
    pub trump: Option<Suit>,
}

impl TableConfig {
    /// Builds a config from environment variables, falling back to defaults
    /// for anything unset or unparseable.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(quota) = env_parse::<usize>("SEAT_QUOTA") {
            // A one-seat table can never form a trick
            if quota >= 2 {
                config.seat_quota = quota;
            }
        }
        if let Some(secs) = env_parse::<u64>("TURN_TIMEOUT_SECS") {
            config.turn_timeout = Duration::from_secs(secs);
        }
        if let Some(policy) = std::env::var("TIMEOUT_POLICY").ok().as_deref() {
            match policy {
                "forfeit" => config.timeout_policy = TimeoutPolicy::Forfeit,
                "forced_play" => config.timeout_policy = TimeoutPolicy::ForcedPlay,
                _ => {}
            }
        }
        if let Some(millis) = env_parse::<u64>("RULE_QUERY_BUDGET_MS") {
            config.rule_query_budget = Duration::from_millis(millis);
        }

        config
    }

    /// Cards dealt to each seat. The deck is dealt out evenly; any remainder
    /// stays out of play for that game.
    pub fn hand_size(&self) -> usize {
        52 / self.seat_quota
    }
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            seat_quota: 4,
            turn_timeout: Duration::from_secs(30),
            timeout_policy: TimeoutPolicy::ForcedPlay,
            rule_query_budget: Duration::from_millis(500),
            trump: None,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}
