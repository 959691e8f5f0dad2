//! Room and participant records.
//!
//! These are the rows the store persists and the coordinator mutates. They
//! carry only the helpers that keep a single record consistent; anything
//! that looks across records (readiness of the whole room, ranking) lives
//! in the room crate.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{ParticipantId, RoomCode, RoomId, SessionId};

// ---------------------------------------------------------------------------
// Enumerations
// ---------------------------------------------------------------------------

/// Lifecycle status of a room.
///
/// ```text
/// Waiting ──(start, everyone ready)──→ Active ──(reset)──→ Waiting
/// ```
///
/// There is no "finished" status: a race being over is derived from the
/// participants, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    #[default]
    Waiting,
    Active,
}

impl std::fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Waiting => write!(f, "waiting"),
            Self::Active => write!(f, "active"),
        }
    }
}

/// What kind of session a room hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    #[default]
    Practice,
    Race,
    Lesson,
}

impl std::fmt::Display for GameMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Practice => write!(f, "practice"),
            Self::Race => write!(f, "race"),
            Self::Lesson => write!(f, "lesson"),
        }
    }
}

/// How a single typing test is bounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestMode {
    /// Type for `duration` seconds.
    #[default]
    Time,
    /// Type `word_target` words.
    Words,
    /// Type one quote of `quote_length`.
    Quote,
    /// No bound; the typist stops when they like.
    Zen,
}

/// Vocabulary tier for generated race text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    Easy,
    #[default]
    Medium,
    Hard,
    Expert,
}

impl Difficulty {
    pub const ALL: [Difficulty; 5] = [
        Self::Beginner,
        Self::Easy,
        Self::Medium,
        Self::Hard,
        Self::Expert,
    ];

    /// Parses a tier name, case-insensitively. Anything unrecognized falls
    /// back to [`Difficulty::Medium`].
    pub fn parse_lenient(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "beginner" => Self::Beginner,
            "easy" => Self::Easy,
            "medium" => Self::Medium,
            "hard" => Self::Hard,
            "expert" => Self::Expert,
            _ => Self::Medium,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
            Self::Expert => "expert",
        }
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteLength {
    Short,
    #[default]
    Medium,
    Long,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Per-room test settings. Always fully populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSettings {
    pub mode: TestMode,
    /// Seconds, for [`TestMode::Time`].
    pub duration: u32,
    /// Words, for [`TestMode::Words`] and race text generation.
    pub word_target: u32,
    pub difficulty: Difficulty,
    pub punctuation: bool,
    pub numbers: bool,
    pub capitalization: bool,
    pub quote_length: QuoteLength,
    pub ghost_writer_enabled: bool,
    /// Ghost writer pace in words per minute.
    pub ghost_writer_speed: u32,
    pub sound_enabled: bool,
    /// Pixels.
    pub typing_font_size: u32,
    pub text_align: TextAlign,
}

impl RoomSettings {
    /// Defaults seeded at room creation. Race rooms get a shorter text on
    /// an easier tier so a round finishes quickly.
    pub fn for_mode(game_mode: GameMode) -> Self {
        let base = Self {
            mode: TestMode::Time,
            duration: 30,
            word_target: 50,
            difficulty: Difficulty::Medium,
            punctuation: false,
            numbers: false,
            capitalization: false,
            quote_length: QuoteLength::Medium,
            ghost_writer_enabled: false,
            ghost_writer_speed: 40,
            sound_enabled: false,
            typing_font_size: 24,
            text_align: TextAlign::Left,
        };
        match game_mode {
            GameMode::Race => Self {
                mode: TestMode::Words,
                word_target: 25,
                difficulty: Difficulty::Easy,
                ..base
            },
            GameMode::Practice | GameMode::Lesson => base,
        }
    }

    /// Merges a partial update. Returns `true` if any field changed.
    pub fn apply(&mut self, patch: &SettingsPatch) -> bool {
        let before = self.clone();

        macro_rules! merge {
            ($($field:ident),* $(,)?) => {
                $(if let Some(value) = patch.$field {
                    self.$field = value;
                })*
            };
        }
        merge!(
            mode,
            duration,
            word_target,
            difficulty,
            punctuation,
            numbers,
            capitalization,
            quote_length,
            ghost_writer_enabled,
            ghost_writer_speed,
            sound_enabled,
            typing_font_size,
            text_align,
        );

        *self != before
    }
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self::for_mode(GameMode::default())
    }
}

/// A partial settings update. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsPatch {
    pub mode: Option<TestMode>,
    pub duration: Option<u32>,
    pub word_target: Option<u32>,
    pub difficulty: Option<Difficulty>,
    pub punctuation: Option<bool>,
    pub numbers: Option<bool>,
    pub capitalization: Option<bool>,
    pub quote_length: Option<QuoteLength>,
    pub ghost_writer_enabled: Option<bool>,
    pub ghost_writer_speed: Option<u32>,
    pub sound_enabled: Option<bool>,
    pub typing_font_size: Option<u32>,
    pub text_align: Option<TextAlign>,
}

impl SettingsPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

// ---------------------------------------------------------------------------
// Room
// ---------------------------------------------------------------------------

/// One room's configuration, lifecycle status, and race anchor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub code: RoomCode,
    pub host_session_id: SessionId,
    pub host_display_name: String,
    pub status: RoomStatus,
    pub game_mode: GameMode,
    pub settings: RoomSettings,
    /// The text everyone races on. Race rooms only.
    pub target_text: Option<String>,
    /// Epoch ms at which the countdown ends and typing begins. Set only
    /// while `Active` in race mode.
    pub race_start_time: Option<i64>,
    pub race_end_time: Option<i64>,
    /// Sessions that have confirmed readiness. Mirrors `Participant::is_ready`.
    pub ready_participants: BTreeSet<SessionId>,
    pub created_at: i64,
    /// Advisory TTL consumed by an external sweeper.
    pub expires_at: i64,
}

impl Room {
    pub fn is_host(&self, session_id: &SessionId) -> bool {
        self.host_session_id == *session_id
    }

    pub fn is_race(&self) -> bool {
        self.game_mode == GameMode::Race
    }

    pub fn is_active(&self) -> bool {
        self.status == RoomStatus::Active
    }

    /// Milliseconds left on the countdown at `now`, or `None` when no race
    /// is anchored. Zero once typing has begun.
    pub fn countdown_remaining_ms(&self, now: i64) -> Option<i64> {
        self.race_start_time.map(|start| (start - now).max(0))
    }

    /// `true` once the countdown anchor has been reached.
    pub fn race_has_begun(&self, now: i64) -> bool {
        self.race_start_time.is_some_and(|start| now >= start)
    }
}

// ---------------------------------------------------------------------------
// Participant
// ---------------------------------------------------------------------------

/// Live statistics a participant reports while typing.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RaceStats {
    pub wpm: f64,
    /// Percent, 0–100.
    pub accuracy: f64,
    /// Percent of the target completed, 0–100.
    pub progress: f64,
    pub words_typed: u32,
    /// Milliseconds since the participant started typing.
    pub time_elapsed: u64,
    pub is_finished: bool,
}

impl RaceStats {
    /// Clamps client-reported numbers into range. Non-finite values become 0.
    pub fn sanitized(self) -> Self {
        fn clamp(value: f64, max: f64) -> f64 {
            if value.is_finite() { value.clamp(0.0, max) } else { 0.0 }
        }
        Self {
            wpm: clamp(self.wpm, f64::MAX),
            accuracy: clamp(self.accuracy, 100.0),
            progress: clamp(self.progress, 100.0),
            ..self
        }
    }
}

/// A progress message from a typing client.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProgressReport {
    pub stats: RaceStats,
    /// Characters typed so far.
    #[serde(default)]
    pub typed_progress: u32,
    #[serde(default)]
    pub typed_text: Option<String>,
}

/// One session's membership and live state within a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub room_id: RoomId,
    pub session_id: SessionId,
    pub name: String,
    pub avatar: Option<String>,
    pub is_connected: bool,
    pub is_ready: bool,
    pub stats: RaceStats,
    /// Server-observed epoch ms at which `stats.is_finished` first became true.
    pub finish_time: Option<i64>,
    /// Irrevocable finish rank within the current race epoch.
    pub position: Option<u32>,
    pub typed_progress: u32,
    pub typed_text: String,
    pub joined_at: i64,
}

impl Participant {
    pub fn new(
        id: ParticipantId,
        room_id: RoomId,
        session_id: SessionId,
        name: String,
        avatar: Option<String>,
        joined_at: i64,
    ) -> Self {
        Self {
            id,
            room_id,
            session_id,
            name,
            avatar,
            is_connected: true,
            is_ready: false,
            stats: RaceStats::default(),
            finish_time: None,
            position: None,
            typed_progress: 0,
            typed_text: String::new(),
            joined_at,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.stats.is_finished
    }

    /// Zeroes everything a race writes: stats, finish, position, typed text.
    /// Membership, connection state and readiness are left alone.
    pub fn clear_race_fields(&mut self) {
        self.stats = RaceStats::default();
        self.finish_time = None;
        self.position = None;
        self.typed_progress = 0;
        self.typed_text.clear();
    }
}
