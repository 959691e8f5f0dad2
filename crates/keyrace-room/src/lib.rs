//! Room coordination for Keyrace.
//!
//! Everything that decides what happens to a room lives here, on top of a
//! [`keyrace_store::RoomStore`]:
//!
//! - [`RoomCoordinator`]: create, join, ready-check, start, progress,
//!   finish, reset, kick, delete
//! - [`RankingEngine`]: finish positions and the live leaderboard
//! - [`RaceTextGenerator`]: random race texts per difficulty tier
//! - [`Clock`]: where "now" comes from ([`SystemClock`] in production)
//! - [`CoordinatorConfig`]: limits and defaults

mod clock;
mod code;
mod config;
mod coordinator;
mod error;
mod ranking;
mod text;
mod view;

pub use clock::{Clock, FixedClock, ManualClock, SystemClock};
pub use code::random_code;
pub use config::CoordinatorConfig;
pub use coordinator::{Joined, ProgressOutcome, RoomCoordinator};
pub use error::RoomError;
pub use ranking::RankingEngine;
pub use text::{RaceTextGenerator, ThreadLocal, vocabulary};
pub use view::{project, race_over};
