//! Live ordering and finish positions.
//!
//! Two separate things live here:
//!
//! - **Positions** are irrevocable. A participant gets one exactly once, at
//!   the moment they first report `is_finished`, as `1 + how many already
//!   hold one`. The caller must run this inside the room's transaction so
//!   two simultaneous finishers can't both read the same count.
//! - **Ordering** is recomputed on every snapshot: finishers by position,
//!   then everyone else by progress, words typed, and arrival.

use std::cmp::Ordering;

use keyrace_protocol::{Participant, ParticipantId, Standing};
use keyrace_store::ParticipantTable;

#[derive(Debug, Clone, Copy, Default)]
pub struct RankingEngine;

impl RankingEngine {
    /// Gives `id` the next free finish position and records `now` as its
    /// finish time.
    ///
    /// Returns the position, or `None` if the row doesn't exist or already
    /// has one (positions never change once assigned).
    pub fn assign_position(
        &self,
        participants: &mut ParticipantTable,
        id: ParticipantId,
        now: i64,
    ) -> Option<u32> {
        let next = u32::try_from(participants.positioned_count()).ok()? + 1;
        let row = participants.by_id_mut(id)?;
        if row.position.is_some() {
            return None;
        }
        row.position = Some(next);
        row.finish_time.get_or_insert(now);
        Some(next)
    }

    /// Compares two participants for the leaderboard.
    pub fn compare(&self, a: &Participant, b: &Participant) -> Ordering {
        match (a.is_finished(), b.is_finished()) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (true, true) => finish_key(a)
                .cmp(&finish_key(b))
                .then_with(|| a.id.cmp(&b.id)),
            (false, false) => b
                .stats
                .progress
                .total_cmp(&a.stats.progress)
                .then_with(|| b.stats.words_typed.cmp(&a.stats.words_typed))
                .then_with(|| a.id.cmp(&b.id)),
        }
    }

    /// Participants in leaderboard order.
    pub fn order<'a>(
        &self,
        participants: impl IntoIterator<Item = &'a Participant>,
    ) -> Vec<&'a Participant> {
        let mut ordered: Vec<&Participant> = participants.into_iter().collect();
        ordered.sort_by(|a, b| self.compare(a, b));
        ordered
    }

    /// The leaderboard. Once `race_over`, every unfinished participant is
    /// marked DNF; they already sort after all finishers.
    pub fn standings<'a>(
        &self,
        participants: impl IntoIterator<Item = &'a Participant>,
        race_over: bool,
    ) -> Vec<Standing> {
        self.order(participants)
            .into_iter()
            .zip(1u32..)
            .map(|(p, rank)| Standing {
                participant_id: p.id,
                name: p.name.clone(),
                rank,
                position: p.position,
                progress: p.stats.progress,
                wpm: p.stats.wpm,
                words_typed: p.stats.words_typed,
                is_finished: p.is_finished(),
                dnf: race_over && !p.is_finished(),
            })
            .collect()
    }
}

/// Position first; a finisher without one (there shouldn't be any in race
/// mode) falls back to finish time behind all positioned rows.
fn finish_key(p: &Participant) -> (u32, i64) {
    (
        p.position.unwrap_or(u32::MAX),
        p.finish_time.unwrap_or(i64::MAX),
    )
}

#[cfg(test)]
mod tests {
    use keyrace_protocol::{RoomId, SessionId};

    use super::*;

    fn table(names: &[&str]) -> ParticipantTable {
        let mut table = ParticipantTable::new();
        for name in names {
            table.upsert(
                RoomId(1),
                SessionId::new(*name).unwrap(),
                (*name).to_string(),
                None,
                0,
            );
        }
        table
    }

    fn id_of(table: &ParticipantTable, name: &str) -> ParticipantId {
        table.iter().find(|p| p.name == name).unwrap().id
    }

    fn finish(table: &mut ParticipantTable, name: &str, now: i64) -> Option<u32> {
        let id = id_of(table, name);
        table.by_id_mut(id).unwrap().stats.is_finished = true;
        RankingEngine.assign_position(table, id, now)
    }

    fn set_progress(table: &mut ParticipantTable, name: &str, progress: f64, words: u32) {
        let id = id_of(table, name);
        let row = table.by_id_mut(id).unwrap();
        row.stats.progress = progress;
        row.stats.words_typed = words;
    }

    fn names(ordered: &[&Participant]) -> Vec<String> {
        ordered.iter().map(|p| p.name.clone()).collect()
    }

    #[test]
    fn test_assign_position_counts_up_from_one() {
        let mut t = table(&["a", "b", "c"]);
        assert_eq!(finish(&mut t, "b", 10), Some(1));
        assert_eq!(finish(&mut t, "a", 20), Some(2));
        assert_eq!(finish(&mut t, "c", 30), Some(3));
        assert_eq!(t.by_id(id_of(&t, "a")).unwrap().finish_time, Some(20));
    }

    #[test]
    fn test_assign_position_twice_keeps_first() {
        let mut t = table(&["a", "b"]);
        assert_eq!(finish(&mut t, "a", 10), Some(1));
        assert_eq!(finish(&mut t, "a", 99), None);

        let row = t.by_id(id_of(&t, "a")).unwrap();
        assert_eq!(row.position, Some(1));
        assert_eq!(row.finish_time, Some(10));
        assert_eq!(finish(&mut t, "b", 20), Some(2));
    }

    #[test]
    fn test_assign_position_unknown_participant_is_none() {
        let mut t = table(&["a"]);
        assert_eq!(RankingEngine.assign_position(&mut t, ParticipantId(77), 0), None);
        assert_eq!(t.positioned_count(), 0);
    }

    #[test]
    fn test_order_finishers_by_position_then_progress() {
        let mut t = table(&["a", "b", "c", "d"]);
        set_progress(&mut t, "a", 40.0, 8);
        set_progress(&mut t, "c", 70.0, 14);
        finish(&mut t, "d", 10);
        finish(&mut t, "b", 20);

        assert_eq!(names(&RankingEngine.order(&t)), ["d", "b", "c", "a"]);
    }

    #[test]
    fn test_order_ties_break_on_words_then_arrival() {
        let mut t = table(&["a", "b", "c"]);
        set_progress(&mut t, "a", 50.0, 10);
        set_progress(&mut t, "b", 50.0, 12);
        set_progress(&mut t, "c", 50.0, 10);

        assert_eq!(names(&RankingEngine.order(&t)), ["b", "a", "c"]);
    }

    #[test]
    fn test_standings_race_over_marks_unfinished_dnf_after_finishers() {
        let mut t = table(&["a", "b", "c"]);
        set_progress(&mut t, "a", 95.0, 19);
        finish(&mut t, "c", 10);

        let live = RankingEngine.standings(&t, false);
        assert!(live.iter().all(|s| !s.dnf));

        let over = RankingEngine.standings(&t, true);
        let summary: Vec<(&str, u32, Option<u32>, bool)> = over
            .iter()
            .map(|s| (s.name.as_str(), s.rank, s.position, s.dnf))
            .collect();
        assert_eq!(
            summary,
            [
                ("c", 1, Some(1), false),
                ("a", 2, None, true),
                ("b", 3, None, true),
            ]
        );
    }
}
