//! Projection of a stored document into the snapshot clients see.

use keyrace_protocol::{ParticipantView, Room, RoomSnapshot, TestMode};
use keyrace_store::{ParticipantTable, RoomDocument};

use crate::RankingEngine;

/// Whether the current race is over at `now`.
///
/// Only an active race room whose countdown has elapsed can be over. It
/// then is over when someone ended it, when every racer has finished, or
/// when a timed race has run its duration. A racer is an entrant (ready at
/// the start) who is connected or has already finished. A disconnected
/// non-finisher does not hold the race open, and neither does a late joiner.
pub fn race_over(room: &Room, participants: &ParticipantTable, now: i64) -> bool {
    if !(room.is_active() && room.is_race() && room.race_has_begun(now)) {
        return false;
    }
    if room.race_end_time.is_some() {
        return true;
    }

    let mut racers = participants
        .entrants()
        .filter(|p| p.is_connected || p.is_finished())
        .peekable();
    if racers.peek().is_some() && racers.all(|p| p.is_finished()) {
        return true;
    }

    match (room.settings.mode, room.race_start_time) {
        (TestMode::Time, Some(start)) => {
            now >= start.saturating_add(i64::from(room.settings.duration) * 1_000)
        }
        _ => false,
    }
}

/// Builds the composite view of `document` as of `now`.
pub fn project(document: &RoomDocument, now: i64) -> RoomSnapshot {
    let room = &document.room;
    let over = race_over(room, &document.participants, now);
    let standings = match (room.is_race(), room.is_active()) {
        (false, _) => Vec::new(),
        (true, true) => RankingEngine.standings(document.participants.entrants(), over),
        (true, false) => RankingEngine.standings(&document.participants, over),
    };

    RoomSnapshot {
        revision: document.revision,
        server_time: now,
        room: room.clone(),
        participants: document
            .participants
            .iter()
            .map(|p| ParticipantView {
                is_host: room.is_host(&p.session_id),
                participant: p.clone(),
            })
            .collect(),
        standings,
        race_over: over,
    }
}
