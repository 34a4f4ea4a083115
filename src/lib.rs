//! Node Survival
//!
//! Core of a small real-time survival game: keep a network of nodes alive
//! through random disasters, earn sats, and win upgrade votes.
//!
//! - [`game::reducer`] - deterministic state machine
//! - [`game::scheduler`] - timers that synthesize timed actions
//! - [`game::session`] - the single dispatch point tying both together
//! - [`scores`] - persisted high scores

pub mod config;
pub mod game;
pub mod scores;
pub mod util;
