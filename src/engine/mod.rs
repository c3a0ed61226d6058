//! The presentation scheduling engine.
//!
//! Two layers, used leaf first:
//!
//! - [`generate_slots`] turns a working window, break windows and durations
//!   into an ordered list of non-overlapping [`TimeSlot`](crate::models::TimeSlot)s.
//! - [`Schedule`] maps candidates onto those slots ([`split_and_map`]) and
//!   keeps the slot/candidate binding consistent through [`Schedule::assign`]
//!   and [`Schedule::unassign`] until [`Schedule::validate_for_save`] passes.
//!
//! Everything here is synchronous and in-memory.

mod allocator;
mod error;
mod slots;
mod validate;

pub use allocator::*;
pub use error::ScheduleError;
pub use slots::{generate_slots, slots_for};
pub use validate::{check_complete, validate_save_input};
