//! Coordinator configuration.

use std::ops::RangeInclusive;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Limits and defaults for [`RoomCoordinator`](crate::RoomCoordinator).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// `expires_at - created_at` for new rooms. Advisory: rooms past it stay
    /// usable until the expiry sweep removes them.
    pub room_ttl: Duration,

    /// How many random codes to try before giving up on `create_room`.
    pub code_attempts: u32,

    /// Participant rows a room may hold. Reconnects don't count.
    pub max_participants: usize,

    /// Countdown used when `start_race` is called without one.
    pub default_countdown_secs: u32,

    /// Upper bound on a requested countdown.
    pub max_countdown_secs: u32,

    /// Upper bound on a generated race text, and on `word_target`.
    pub max_word_count: u32,

    /// Longest timed test a host may configure, in seconds.
    pub max_duration_secs: u32,

    /// Accepted `typing_font_size` values, in pixels.
    pub typing_font_sizes: RangeInclusive<u32>,

    /// Accepted ghost writer paces, in words per minute.
    pub ghost_writer_speeds: RangeInclusive<u32>,

    /// Longest accepted host or participant name, in characters.
    pub max_name_len: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            room_ttl: Duration::from_secs(24 * 60 * 60),
            code_attempts: 16,
            max_participants: 16,
            default_countdown_secs: 5,
            max_countdown_secs: 30,
            max_word_count: 500,
            max_duration_secs: 600,
            typing_font_sizes: 12..=64,
            ghost_writer_speeds: 1..=300,
            max_name_len: 32,
        }
    }
}

impl CoordinatorConfig {
    pub(crate) fn room_ttl_millis(&self) -> i64 {
        i64::try_from(self.room_ttl.as_millis()).unwrap_or(i64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinator_config_default() {
        let config = CoordinatorConfig::default();
        assert_eq!(config.room_ttl, Duration::from_secs(86_400));
        assert_eq!(config.code_attempts, 16);
        assert_eq!(config.max_participants, 16);
        assert_eq!(config.default_countdown_secs, 5);
        assert_eq!(config.max_duration_secs, 600);
        assert!(config.typing_font_sizes.contains(&24));
        assert_eq!(config.room_ttl_millis(), 86_400_000);
    }
}
