use thiserror::Error;
use uuid::Uuid;

/// Failures of the scheduling engine.
///
/// None of these leave the schedule half-modified: an operation that returns
/// an error has not touched any state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("slot {0} not found")]
    InvalidSlot(u32),

    #[error("candidate {0} not found")]
    UnknownCandidate(Uuid),

    #[error("candidate {candidate_id} is already assigned to slot {slot_id}")]
    AlreadyClaimed { candidate_id: Uuid, slot_id: u32 },

    #[error("schedule is incomplete: {unassigned} slot(s) have no project")]
    IncompleteSchedule { unassigned: usize },

    #[error("project {0} appears in more than one slot")]
    DuplicateProject(Uuid),

    #[error("slot {0} appears more than once")]
    DuplicateSlot(u32),

    #[error("slot {0} does not match the slots generated for this configuration")]
    UnknownSlot(u32),
}
