use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::project::{FileRef, Project};

/// A project eligible to be bound to a presentation slot.
///
/// `claimed` is true exactly while the candidate is bound to a schedule item.
/// It can only be changed through the schedule's `assign`/`unassign`, so it is
/// readable but not writable from outside the crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub attachment: Option<FileRef>,
    #[serde(default)]
    pub(crate) claimed: bool,
}

impl Candidate {
    pub fn new(id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            attachment: None,
            claimed: false,
        }
    }

    pub fn with_attachment(mut self, attachment: FileRef) -> Self {
        self.attachment = Some(attachment);
        self
    }

    pub fn is_claimed(&self) -> bool {
        self.claimed
    }
}

impl From<Project> for Candidate {
    fn from(p: Project) -> Self {
        Self {
            id: p.id,
            name: p.name,
            attachment: p.attachment,
            claimed: false,
        }
    }
}

/// Request for a list of candidates to fill a schedule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateRequest {
    /// How many candidates the schedule wants.
    pub desired_count: u32,
    /// Projects the operator already picked; returned first when they exist.
    #[serde(default)]
    pub selected_ids: Vec<Uuid>,
}
