//! The room coordinator: every state transition a room goes through.
//!
//! Each operation is one [`RoomStore::transact`] over one room document,
//! so checks and writes happen under the same per-room lock and subscribers
//! only ever see the committed result. Nothing here runs on a timer: a race
//! starts by writing a future `race_start_time`, and every client counts
//! down to it on its own.

use std::ops::RangeInclusive;
use std::sync::Arc;

use keyrace_protocol::{
    Difficulty, GameMode, ParticipantId, ProgressReport, Room, RoomCode, RoomId, RoomSettings,
    RoomSnapshot, RoomStatus, SessionId, SettingsPatch,
};
use keyrace_store::{Commit, DocumentFeed, RoomDocument, RoomStore, StoreError, Upsert};

use crate::{
    Clock, CoordinatorConfig, RaceTextGenerator, RankingEngine, RoomError, SystemClock,
    code::random_code, view,
};

// ---------------------------------------------------------------------------
// Operation results
// ---------------------------------------------------------------------------

/// Result of [`RoomCoordinator::join_room`].
#[derive(Debug, Clone)]
pub struct Joined {
    pub participant_id: ParticipantId,
    /// `true` when the session already had a row and was reattached to it.
    pub reconnected: bool,
    pub snapshot: RoomSnapshot,
}

/// What happened to a progress report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressOutcome {
    /// Stats were stored.
    Recorded,
    /// This report finished the participant. `position` is set in race
    /// mode.
    Finished { position: Option<u32> },
    /// Out of order, or the participant had already finished.
    Ignored,
}

// ---------------------------------------------------------------------------
// RoomCoordinator
// ---------------------------------------------------------------------------

/// Orchestrates rooms on top of a [`RoomStore`].
///
/// The caller's [`SessionId`] is the only credential: host-only operations
/// compare it with `room.host_session_id`, self-service ones look up the
/// caller's own row by it.
pub struct RoomCoordinator<S, C = SystemClock> {
    store: Arc<S>,
    clock: C,
    config: CoordinatorConfig,
    ranking: RankingEngine,
}

impl<S: RoomStore> RoomCoordinator<S> {
    pub fn new(store: Arc<S>, config: CoordinatorConfig) -> Self {
        Self::with_clock(store, config, SystemClock)
    }
}

impl<S: RoomStore, C: Clock> RoomCoordinator<S, C> {
    pub fn with_clock(store: Arc<S>, config: CoordinatorConfig, clock: C) -> Self {
        Self {
            store,
            clock,
            config,
            ranking: RankingEngine,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn now(&self) -> i64 {
        self.clock.now_millis()
    }

    // -- lifecycle -----------------------------------------------------------

    /// Creates a room hosted by `host`. The host is not added as a
    /// participant; they join like anyone else.
    pub async fn create_room(
        &self,
        host: &SessionId,
        host_name: &str,
        game_mode: GameMode,
    ) -> Result<RoomDocument, RoomError> {
        let host_name = self.validate_name("host name", host_name)?;

        for _ in 0..self.config.code_attempts {
            let code = random_code(&mut rand::rng());
            let now = self.now();
            let expires_at = now.saturating_add(self.config.room_ttl_millis());
            let build = |id: RoomId| Room {
                id,
                code: code.clone(),
                host_session_id: host.clone(),
                host_display_name: host_name.clone(),
                status: RoomStatus::Waiting,
                game_mode,
                settings: RoomSettings::for_mode(game_mode),
                target_text: None,
                race_start_time: None,
                race_end_time: None,
                ready_participants: Default::default(),
                created_at: now,
                expires_at,
            };

            match self.store.insert_room(code.clone(), build).await {
                Ok(document) => {
                    tracing::info!(
                        room_id = %document.room.id,
                        %code,
                        %host,
                        mode = %game_mode,
                        "room created"
                    );
                    return Ok(document);
                }
                Err(StoreError::CodeTaken(_)) => {
                    tracing::debug!(%code, "room code collision, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        tracing::warn!(attempts = self.config.code_attempts, "room code space exhausted");
        Err(RoomError::CodeSpaceExhausted(self.config.code_attempts))
    }

    /// Joins the room with `code`, or reattaches the session's existing row.
    pub async fn join_room(
        &self,
        code: &RoomCode,
        session: &SessionId,
        name: &str,
        avatar: Option<String>,
    ) -> Result<Joined, RoomError> {
        let name = self.validate_name("name", name)?;
        let room_id = self
            .store
            .find_by_code(code)
            .await
            .ok_or_else(|| RoomError::CodeNotFound(code.clone()))?;
        let now = self.now();
        let max = self.config.max_participants;

        let commit = self
            .store
            .transact(room_id, |doc| {
                if !doc.participants.contains_session(session) && doc.participants.len() >= max {
                    return Err(RoomError::precondition(format!(
                        "room is full ({max} participants)"
                    )));
                }
                Ok(doc
                    .participants
                    .upsert(room_id, session.clone(), name, avatar, now))
            })
            .await
            .map_err(|e| not_found_as(e, RoomError::CodeNotFound(code.clone())))?;

        let reconnected = matches!(commit.value, Upsert::Reconnected(_));
        let participant_id = commit.value.participant_id();
        tracing::info!(%room_id, %participant_id, %session, reconnected, "participant joined");

        Ok(Joined {
            participant_id,
            reconnected,
            snapshot: view::project(&commit.document, now),
        })
    }

    /// Removes the caller's own row.
    pub async fn leave_room(
        &self,
        room_id: RoomId,
        session: &SessionId,
    ) -> Result<RoomDocument, RoomError> {
        let commit = self
            .transact(room_id, |doc| {
                let id = own_row(doc, session)?;
                doc.remove_participant(id);
                Ok(id)
            })
            .await?;
        tracing::info!(%room_id, participant_id = %commit.value, "participant left");
        Ok(commit.document)
    }

    /// Releases one of the caller's connections. The row is marked
    /// disconnected once its last connection is gone; nothing else changes.
    pub async fn disconnect(
        &self,
        room_id: RoomId,
        session: &SessionId,
    ) -> Result<RoomDocument, RoomError> {
        let commit = self
            .transact(room_id, |doc| {
                let id = own_row(doc, session)?;
                Ok(doc.participants.detach(id))
            })
            .await?;
        if commit.value {
            tracing::debug!(%room_id, %session, "participant disconnected");
        } else {
            tracing::debug!(%room_id, %session, "connection closed, session still attached");
        }
        Ok(commit.document)
    }

    /// Host-only teardown of the room and all its rows.
    pub async fn delete_room(
        &self,
        room_id: RoomId,
        session: &SessionId,
    ) -> Result<RoomDocument, RoomError> {
        let document = self.load(room_id).await?;
        if !document.room.is_host(session) {
            return Err(RoomError::Permission("delete the room"));
        }
        let deleted = self
            .store
            .delete_room(room_id)
            .await
            .map_err(|e| not_found_as(e.into(), RoomError::RoomNotFound(room_id)))?;
        tracing::info!(%room_id, participants = deleted.participants.len(), "room deleted");
        Ok(deleted)
    }

    /// Deletes every room whose `expires_at` has passed.
    pub async fn purge_expired(&self) -> Vec<RoomId> {
        let now = self.now();
        let mut purged = Vec::new();
        for room_id in self.store.expired_rooms(now).await {
            if self.store.delete_room(room_id).await.is_ok() {
                purged.push(room_id);
            }
        }
        if !purged.is_empty() {
            tracing::info!(count = purged.len(), "expired rooms purged");
        }
        purged
    }

    // -- configuration -------------------------------------------------------

    /// Host-only partial settings update. Any real change un-readies
    /// everyone, since they agreed to the old settings.
    ///
    /// Every supplied field is range-checked before the room is touched; one
    /// bad field rejects the whole patch.
    pub async fn update_settings(
        &self,
        room_id: RoomId,
        session: &SessionId,
        patch: &SettingsPatch,
    ) -> Result<RoomDocument, RoomError> {
        self.validate_settings(patch)?;
        let commit = self
            .transact(room_id, |doc| {
                require_host(doc, session, "change settings")?;
                require_waiting(doc, "settings can't change during a race")?;
                let changed = doc.room.settings.apply(patch);
                if changed {
                    doc.clear_readiness();
                }
                Ok(changed)
            })
            .await?;
        if commit.value {
            tracing::info!(%room_id, "settings updated");
        }
        Ok(commit.document)
    }

    /// Host-only: stores a literal race text, or generates one.
    ///
    /// Non-blank `custom_text` wins. Otherwise `word_count` words are drawn
    /// at `difficulty` (unrecognized names mean medium), each defaulting to
    /// the room's settings.
    pub async fn set_race_text(
        &self,
        room_id: RoomId,
        session: &SessionId,
        difficulty: Option<&str>,
        word_count: Option<u32>,
        custom_text: Option<&str>,
    ) -> Result<RoomDocument, RoomError> {
        if let Some(count) = word_count {
            within("word_count", count, 1..=self.config.max_word_count)?;
        }
        let custom = custom_text.map(str::trim).filter(|t| !t.is_empty());

        let commit = self
            .transact(room_id, |doc| {
                require_host(doc, session, "set the race text")?;
                require_race(doc)?;
                require_waiting(doc, "race text can't change during a race")?;

                let text = match custom {
                    Some(text) => text.to_string(),
                    None => {
                        let difficulty = difficulty
                            .map(Difficulty::parse_lenient)
                            .unwrap_or(doc.room.settings.difficulty);
                        let count = word_count.unwrap_or(doc.room.settings.word_target);
                        RaceTextGenerator::new().generate(difficulty, count as usize)
                    }
                };
                doc.room.target_text = Some(text);
                Ok(())
            })
            .await?;
        tracing::info!(%room_id, custom = custom.is_some(), "race text set");
        Ok(commit.document)
    }

    // -- readiness -----------------------------------------------------------

    /// Self-service readiness toggle. Refused once the room is active: the
    /// countdown is not interrupted, the host resets instead.
    pub async fn set_ready(
        &self,
        room_id: RoomId,
        session: &SessionId,
        ready: bool,
    ) -> Result<RoomDocument, RoomError> {
        let commit = self
            .transact(room_id, |doc| {
                own_row(doc, session)?;
                require_waiting(doc, "readiness is locked while the race runs")?;
                doc.set_ready(session, ready);
                Ok(())
            })
            .await?;
        tracing::debug!(%room_id, %session, ready, "readiness changed");
        Ok(commit.document)
    }

    // -- race ----------------------------------------------------------------

    /// Host-only: anchors the countdown and opens a new race epoch.
    pub async fn start_race(
        &self,
        room_id: RoomId,
        session: &SessionId,
        countdown_secs: Option<u32>,
    ) -> Result<RoomDocument, RoomError> {
        let countdown = countdown_secs.unwrap_or(self.config.default_countdown_secs);
        if countdown > self.config.max_countdown_secs {
            return Err(RoomError::validation(
                "countdown",
                format!("must be at most {} seconds", self.config.max_countdown_secs),
            ));
        }
        let now = self.now();

        let commit = self
            .transact(room_id, |doc| {
                require_host(doc, session, "start the race")?;
                require_race(doc)?;
                if doc.room.is_active() {
                    return Err(RoomError::precondition("race already started"));
                }
                if doc.participants.connected().next().is_none() {
                    return Err(RoomError::precondition("nobody is connected"));
                }
                if !doc.participants.all_connected_ready() {
                    let waiting = doc
                        .participants
                        .connected()
                        .filter(|p| !p.is_ready)
                        .count();
                    return Err(RoomError::precondition(format!(
                        "{waiting} connected participant(s) not ready"
                    )));
                }

                if doc.room.target_text.is_none() {
                    let settings = &doc.room.settings;
                    doc.room.target_text = Some(
                        RaceTextGenerator::new()
                            .generate(settings.difficulty, settings.word_target as usize),
                    );
                }
                doc.participants.clear_race_fields();
                doc.room.status = RoomStatus::Active;
                doc.room.race_start_time = Some(now + i64::from(countdown) * 1_000);
                doc.room.race_end_time = None;
                Ok(())
            })
            .await?;
        tracing::info!(
            %room_id,
            countdown_secs = countdown,
            racers = commit.document.participants.connected().count(),
            "race started"
        );
        Ok(commit.document)
    }

    /// Stores the caller's latest stats and handles their first finish.
    ///
    /// In race mode reports are accepted only between the end of the
    /// countdown and the end of the race, and only from entrants: a session
    /// that joined after the start watches the race without a place in it.
    pub async fn report_progress(
        &self,
        room_id: RoomId,
        session: &SessionId,
        report: ProgressReport,
    ) -> Result<(ProgressOutcome, RoomDocument), RoomError> {
        let now = self.now();
        let ranking = self.ranking;
        let stats = report.stats.sanitized();

        let commit = self
            .transact(room_id, |doc| {
                let id = own_row(doc, session)?;
                if doc.room.is_race() {
                    if !doc.room.is_active() {
                        return Err(RoomError::precondition("no race is running"));
                    }
                    if !doc.room.race_has_begun(now) {
                        return Err(RoomError::precondition("countdown has not finished"));
                    }
                    if doc.room.race_end_time.is_some() {
                        return Ok(ProgressOutcome::Ignored);
                    }
                    if !doc.participants.entrants().any(|p| p.id == id) {
                        return Err(RoomError::precondition("joined after the race started"));
                    }
                }
                let is_race = doc.room.is_race();

                let Some(row) = doc.participants.by_id_mut(id) else {
                    return Err(RoomError::NotInRoom {
                        room_id,
                        session_id: session.clone(),
                    });
                };
                if row.is_finished() || stats.time_elapsed < row.stats.time_elapsed {
                    return Ok(ProgressOutcome::Ignored);
                }

                row.stats = stats;
                row.typed_progress = report.typed_progress;
                if let Some(text) = report.typed_text {
                    row.typed_text = text;
                }
                if !stats.is_finished {
                    return Ok(ProgressOutcome::Recorded);
                }

                row.finish_time = Some(now);
                let position = if is_race {
                    ranking.assign_position(&mut doc.participants, id, now)
                } else {
                    None
                };
                Ok(ProgressOutcome::Finished { position })
            })
            .await?;

        if let ProgressOutcome::Finished { position } = commit.value {
            tracing::info!(%room_id, %session, ?position, wpm = stats.wpm, "participant finished");
        }
        Ok((commit.value, commit.document))
    }

    /// Records the end of the race. Any participant may call it; the first
    /// recorded end time stays.
    pub async fn end_race(
        &self,
        room_id: RoomId,
        session: &SessionId,
    ) -> Result<RoomDocument, RoomError> {
        let now = self.now();
        let commit = self
            .transact(room_id, |doc| {
                if !doc.room.is_host(session) {
                    own_row(doc, session)?;
                }
                require_race(doc)?;
                if !doc.room.is_active() {
                    return Err(RoomError::precondition("no race is running"));
                }
                doc.room.race_end_time.get_or_insert(now);
                Ok(())
            })
            .await?;
        if commit.changed {
            tracing::info!(%room_id, %session, "race ended");
        }
        Ok(commit.document)
    }

    /// Host-only: back to waiting with every race field cleared, in one
    /// commit.
    pub async fn reset_for_new_race(
        &self,
        room_id: RoomId,
        session: &SessionId,
    ) -> Result<RoomDocument, RoomError> {
        let commit = self
            .transact(room_id, |doc| {
                require_host(doc, session, "reset the race")?;
                doc.room.status = RoomStatus::Waiting;
                doc.room.race_start_time = None;
                doc.room.race_end_time = None;
                doc.room.target_text = None;
                doc.clear_readiness();
                doc.participants.clear_race_fields();
                Ok(())
            })
            .await?;
        tracing::info!(%room_id, "room reset for a new race");
        Ok(commit.document)
    }

    // -- moderation ----------------------------------------------------------

    /// Host-only removal of another participant's row. The kicked client's
    /// subscription sees its row disappear in this same commit.
    pub async fn kick(
        &self,
        room_id: RoomId,
        session: &SessionId,
        target: ParticipantId,
    ) -> Result<RoomDocument, RoomError> {
        let commit = self
            .transact(room_id, |doc| {
                require_host(doc, session, "kick participants")?;
                let row = doc
                    .participants
                    .by_id(target)
                    .ok_or(RoomError::ParticipantNotFound(target))?;
                if row.session_id == *session {
                    return Err(RoomError::validation("participant_id", "the host can't kick itself"));
                }
                let removed = doc.remove_participant(target);
                Ok(removed.map(|p| p.session_id))
            })
            .await?;
        if let Some(kicked) = commit.value {
            tracing::info!(%room_id, participant_id = %target, session = %kicked, "participant kicked");
        }
        Ok(commit.document)
    }

    // -- reads ---------------------------------------------------------------

    pub async fn load(&self, room_id: RoomId) -> Result<RoomDocument, RoomError> {
        self.store
            .load(room_id)
            .await
            .map_err(|e| not_found_as(e.into(), RoomError::RoomNotFound(room_id)))
    }

    pub async fn snapshot(&self, room_id: RoomId) -> Result<RoomSnapshot, RoomError> {
        let document = self.load(room_id).await?;
        Ok(self.project(&document))
    }

    /// Projects a document at the current time.
    pub fn project(&self, document: &RoomDocument) -> RoomSnapshot {
        view::project(document, self.now())
    }

    /// The room's committed-document feed.
    pub async fn feed(&self, room_id: RoomId) -> Result<DocumentFeed, RoomError> {
        self.store
            .subscribe(room_id)
            .await
            .map_err(|e| not_found_as(e.into(), RoomError::RoomNotFound(room_id)))
    }

    // -- helpers -------------------------------------------------------------

    async fn transact<T, F>(
        &self,
        room_id: RoomId,
        f: F,
    ) -> Result<Commit<T>, RoomError>
    where
        T: Send,
        F: FnOnce(&mut RoomDocument) -> Result<T, RoomError> + Send,
    {
        self.store
            .transact(room_id, f)
            .await
            .map_err(|e| not_found_as(e, RoomError::RoomNotFound(room_id)))
    }

    fn validate_name(&self, field: &'static str, name: &str) -> Result<String, RoomError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RoomError::validation(field, "must not be empty"));
        }
        if name.chars().count() > self.config.max_name_len {
            return Err(RoomError::validation(
                field,
                format!("longer than {} characters", self.config.max_name_len),
            ));
        }
        Ok(name.to_string())
    }

    fn validate_settings(&self, patch: &SettingsPatch) -> Result<(), RoomError> {
        let config = &self.config;
        if let Some(words) = patch.word_target {
            within("word_target", words, 1..=config.max_word_count)?;
        }
        if let Some(duration) = patch.duration {
            within("duration", duration, 1..=config.max_duration_secs)?;
        }
        if let Some(size) = patch.typing_font_size {
            within("typing_font_size", size, config.typing_font_sizes.clone())?;
        }
        if let Some(speed) = patch.ghost_writer_speed {
            within("ghost_writer_speed", speed, config.ghost_writer_speeds.clone())?;
        }
        Ok(())
    }
}

fn within(field: &'static str, value: u32, range: RangeInclusive<u32>) -> Result<(), RoomError> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(RoomError::validation(
            field,
            format!("must be between {} and {}", range.start(), range.end()),
        ))
    }
}

/// Rewrites a store-level "room not found" into the caller-facing variant.
fn not_found_as(error: RoomError, replacement: RoomError) -> RoomError {
    match error {
        RoomError::Store(StoreError::RoomNotFound(_)) => replacement,
        other => other,
    }
}

fn own_row(doc: &RoomDocument, session: &SessionId) -> Result<ParticipantId, RoomError> {
    doc.participants
        .by_session(session)
        .map(|p| p.id)
        .ok_or_else(|| RoomError::NotInRoom {
            room_id: doc.room.id,
            session_id: session.clone(),
        })
}

fn require_host(doc: &RoomDocument, session: &SessionId, action: &'static str) -> Result<(), RoomError> {
    if doc.room.is_host(session) {
        Ok(())
    } else {
        Err(RoomError::Permission(action))
    }
}

fn require_race(doc: &RoomDocument) -> Result<(), RoomError> {
    if doc.room.is_race() {
        Ok(())
    } else {
        Err(RoomError::precondition(format!(
            "room is in {} mode, not race mode",
            doc.room.game_mode
        )))
    }
}

fn require_waiting(doc: &RoomDocument, reason: &str) -> Result<(), RoomError> {
    if doc.room.is_active() {
        Err(RoomError::precondition(reason))
    } else {
        Ok(())
    }
}
