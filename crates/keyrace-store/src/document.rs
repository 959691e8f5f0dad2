//! One room and its participants, stored and committed together.

use keyrace_protocol::{Participant, ParticipantId, Room, SessionId};
use serde::{Deserialize, Serialize};

use crate::ParticipantTable;

/// The unit of storage, locking, and change notification.
///
/// `room.ready_participants` mirrors `Participant::is_ready`; the helpers
/// here update both sides together so a committed document never has them
/// disagree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomDocument {
    pub room: Room,
    pub participants: ParticipantTable,
    /// Bumped by the store on every commit that changes the document.
    pub revision: u64,
}

impl RoomDocument {
    pub fn new(room: Room) -> Self {
        Self {
            room,
            participants: ParticipantTable::new(),
            revision: 1,
        }
    }

    /// Sets one session's readiness on both the row and the room's ready
    /// set. Returns `false` if the session has no row.
    pub fn set_ready(&mut self, session_id: &SessionId, ready: bool) -> bool {
        let Some(row) = self.participants.by_session_mut(session_id) else {
            return false;
        };
        row.is_ready = ready;
        if ready {
            self.room.ready_participants.insert(session_id.clone());
        } else {
            self.room.ready_participants.remove(session_id);
        }
        true
    }

    /// Un-readies everyone.
    pub fn clear_readiness(&mut self) {
        for row in self.participants.iter_mut() {
            row.is_ready = false;
        }
        self.room.ready_participants.clear();
    }

    /// Deletes a row together with its ready mark.
    pub fn remove_participant(&mut self, id: ParticipantId) -> Option<Participant> {
        let removed = self.participants.remove(id)?;
        self.room.ready_participants.remove(&removed.session_id);
        Some(removed)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use keyrace_protocol::{GameMode, RoomCode, RoomId, RoomSettings, RoomStatus};

    use super::*;

    fn sid(s: &str) -> SessionId {
        SessionId::new(s).unwrap()
    }

    fn document() -> RoomDocument {
        let room = Room {
            id: RoomId(1),
            code: RoomCode::parse("ABCDE").unwrap(),
            host_session_id: sid("host"),
            host_display_name: "Host".into(),
            status: RoomStatus::Waiting,
            game_mode: GameMode::Race,
            settings: RoomSettings::for_mode(GameMode::Race),
            target_text: None,
            race_start_time: None,
            race_end_time: None,
            ready_participants: BTreeSet::new(),
            created_at: 0,
            expires_at: 1_000,
        };
        let mut doc = RoomDocument::new(room);
        doc.participants.upsert(RoomId(1), sid("a"), "A".into(), None, 0);
        doc.participants.upsert(RoomId(1), sid("b"), "B".into(), None, 0);
        doc
    }

    #[test]
    fn test_set_ready_updates_row_and_room_together() {
        let mut doc = document();

        assert!(doc.set_ready(&sid("a"), true));
        assert!(doc.participants.by_session(&sid("a")).unwrap().is_ready);
        assert!(doc.room.ready_participants.contains(&sid("a")));

        assert!(doc.set_ready(&sid("a"), false));
        assert!(!doc.participants.by_session(&sid("a")).unwrap().is_ready);
        assert!(doc.room.ready_participants.is_empty());
    }

    #[test]
    fn test_set_ready_unknown_session_changes_nothing() {
        let mut doc = document();
        let before = doc.clone();
        assert!(!doc.set_ready(&sid("ghost"), true));
        assert_eq!(doc, before);
    }

    #[test]
    fn test_clear_readiness_unreadies_everyone() {
        let mut doc = document();
        doc.set_ready(&sid("a"), true);
        doc.set_ready(&sid("b"), true);

        doc.clear_readiness();

        assert!(doc.room.ready_participants.is_empty());
        assert!(doc.participants.iter().all(|p| !p.is_ready));
    }

    #[test]
    fn test_remove_participant_drops_ready_mark() {
        let mut doc = document();
        doc.set_ready(&sid("a"), true);
        let id = doc.participants.by_session(&sid("a")).unwrap().id;

        let removed = doc.remove_participant(id).unwrap();

        assert_eq!(removed.session_id, sid("a"));
        assert!(!doc.room.ready_participants.contains(&sid("a")));
        assert_eq!(doc.participants.len(), 1);
    }
}
