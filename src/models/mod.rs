//! Domain models for the presentation scheduler.
//!
//! # Core Concepts
//!
//! - [`Project`]: A registered NGO project, the source of scheduling candidates.
//! - [`Candidate`]: A project offered to a planning session. Carries a `claimed`
//!   flag that is true exactly while it is bound to a [`ScheduleItem`].
//! - [`TimeSlot`]: A fixed-length presentation interval plus its trailing gap,
//!   generated from a [`ScheduleConfig`].
//! - [`BreakWindow`]: Lunch or dinner, during which no slot may run.
//! - [`ScheduleRecord`]: A persisted day of presentations.
//!
//! Times of day are [`ClockTime`] values exchanged as `HH:MM`; the day itself
//! travels as a UTC-midnight instant.

mod candidate;
mod project;
mod schedule;
mod time;

pub use candidate::*;
pub use project::*;
pub use schedule::*;
pub use time::*;
