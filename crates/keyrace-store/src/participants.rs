//! The participant rows of one room.

use std::collections::BTreeMap;

use keyrace_protocol::{Participant, ParticipantId, RoomId, SessionId};
use serde::{Deserialize, Serialize};

/// Outcome of [`ParticipantTable::upsert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    /// A new row was created.
    Inserted(ParticipantId),
    /// The session already had a row; it was updated in place.
    Reconnected(ParticipantId),
}

impl Upsert {
    pub fn participant_id(self) -> ParticipantId {
        match self {
            Self::Inserted(id) | Self::Reconnected(id) => id,
        }
    }
}

/// Participant rows in arrival order.
///
/// Holds at most one row per session. Ids are allocated from a counter that
/// never goes backwards, so a session that leaves and joins again gets a
/// fresh, later id.
///
/// A session may be attached through several sockets at once (two tabs).
/// The table counts them per row, and only the last one closing marks the
/// row disconnected.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ParticipantTable {
    rows: Vec<Participant>,
    next_id: u64,
    #[serde(default)]
    attached: BTreeMap<ParticipantId, u32>,
}

impl ParticipantTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Participant> {
        self.rows.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Participant> {
        self.rows.iter_mut()
    }

    pub fn by_session(&self, session_id: &SessionId) -> Option<&Participant> {
        self.rows.iter().find(|p| p.session_id == *session_id)
    }

    pub fn by_session_mut(&mut self, session_id: &SessionId) -> Option<&mut Participant> {
        self.rows.iter_mut().find(|p| p.session_id == *session_id)
    }

    pub fn by_id(&self, id: ParticipantId) -> Option<&Participant> {
        self.rows.iter().find(|p| p.id == id)
    }

    pub fn by_id_mut(&mut self, id: ParticipantId) -> Option<&mut Participant> {
        self.rows.iter_mut().find(|p| p.id == id)
    }

    pub fn contains_session(&self, session_id: &SessionId) -> bool {
        self.by_session(session_id).is_some()
    }

    /// Inserts a row for `session_id`, or refreshes the existing one.
    /// Either way one more connection is attached to the row.
    ///
    /// A reconnect keeps id, readiness, stats and position; it overwrites
    /// the name (last write wins) and avatar, and marks the row connected.
    pub fn upsert(
        &mut self,
        room_id: RoomId,
        session_id: SessionId,
        name: String,
        avatar: Option<String>,
        now: i64,
    ) -> Upsert {
        if let Some(existing) = self.by_session_mut(&session_id) {
            existing.name = name;
            existing.avatar = avatar;
            existing.is_connected = true;
            let id = existing.id;
            *self.attached.entry(id).or_default() += 1;
            return Upsert::Reconnected(id);
        }

        self.next_id += 1;
        let id = ParticipantId(self.next_id);
        self.rows
            .push(Participant::new(id, room_id, session_id, name, avatar, now));
        self.attached.insert(id, 1);
        Upsert::Inserted(id)
    }

    /// Releases one connection of row `id`. When none remain the row is
    /// marked disconnected and `true` is returned.
    pub fn detach(&mut self, id: ParticipantId) -> bool {
        if let Some(count) = self.attached.get_mut(&id) {
            if *count > 1 {
                *count -= 1;
                return false;
            }
        }
        self.attached.remove(&id);
        match self.by_id_mut(id) {
            Some(row) => {
                row.is_connected = false;
                true
            }
            None => false,
        }
    }

    /// Open connections attached to row `id`.
    pub fn attached(&self, id: ParticipantId) -> u32 {
        self.attached.get(&id).copied().unwrap_or(0)
    }

    /// Deletes a row. Returns it if it existed.
    pub fn remove(&mut self, id: ParticipantId) -> Option<Participant> {
        let index = self.rows.iter().position(|p| p.id == id)?;
        self.attached.remove(&id);
        Some(self.rows.remove(index))
    }

    pub fn connected(&self) -> impl Iterator<Item = &Participant> {
        self.rows.iter().filter(|p| p.is_connected)
    }

    /// `true` when at least one participant is connected and every
    /// connected participant is ready. Disconnected rows don't count.
    pub fn all_connected_ready(&self) -> bool {
        let mut connected = self.connected().peekable();
        connected.peek().is_some() && connected.all(|p| p.is_ready)
    }

    /// Rows taking part in the running race.
    ///
    /// Readiness is frozen while a room is active, so these are exactly the
    /// rows that were ready when the race started. Anyone who joined after
    /// that is watching, not racing.
    pub fn entrants(&self) -> impl Iterator<Item = &Participant> {
        self.rows.iter().filter(|p| p.is_ready)
    }

    /// Number of rows holding a finish position in the current race epoch.
    pub fn positioned_count(&self) -> usize {
        self.rows.iter().filter(|p| p.position.is_some()).count()
    }

    /// Clears race fields on every row (stats, finish, position, typed text).
    pub fn clear_race_fields(&mut self) {
        for row in &mut self.rows {
            row.clear_race_fields();
        }
    }
}

impl<'a> IntoIterator for &'a ParticipantTable {
    type Item = &'a Participant;
    type IntoIter = std::slice::Iter<'a, Participant>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
