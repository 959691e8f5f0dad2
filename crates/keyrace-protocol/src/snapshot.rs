//! The composite room view pushed to subscribers.

use serde::{Deserialize, Serialize};

use crate::{Participant, ParticipantId, Room, SessionId};

/// A participant row plus the fields derived from the room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantView {
    #[serde(flatten)]
    pub participant: Participant,
    pub is_host: bool,
}

/// One line of the race leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Standing {
    pub participant_id: ParticipantId,
    pub name: String,
    /// 1-based place in the current ordering.
    pub rank: u32,
    /// Irrevocable finish position, if finished.
    pub position: Option<u32>,
    pub progress: f64,
    pub wpm: f64,
    pub words_typed: u32,
    pub is_finished: bool,
    /// Did not finish: the race is over and this participant never completed.
    pub dnf: bool,
}

/// Everything a client needs to render a room, at one committed revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomSnapshot {
    /// Store revision this snapshot was projected from. Strictly increases
    /// with every committed mutation of the room.
    pub revision: u64,
    /// Server wall clock (epoch ms) when the snapshot was taken. Clients use
    /// it to correct their clock before deriving the countdown.
    pub server_time: i64,
    pub room: Room,
    /// Rows in arrival order.
    pub participants: Vec<ParticipantView>,
    /// Ranked leaderboard; empty outside race mode.
    pub standings: Vec<Standing>,
    /// Derived "race over" flag. The room itself stays `Active` until reset.
    pub race_over: bool,
}

impl RoomSnapshot {
    pub fn participant(&self, session_id: &SessionId) -> Option<&ParticipantView> {
        self.participants
            .iter()
            .find(|view| view.participant.session_id == *session_id)
    }

    /// Countdown remaining at the snapshot's own server time.
    pub fn countdown_remaining_ms(&self) -> Option<i64> {
        self.room.countdown_remaining_ms(self.server_time)
    }
}
