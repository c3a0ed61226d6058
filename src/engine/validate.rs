//! Checks a schedule must pass before it may be persisted.

use std::collections::HashSet;

use crate::models::{SaveScheduleInput, ScheduleItem};

use super::slots::slots_for;
use super::ScheduleError;

/// Fail with `IncompleteSchedule` if any item has no project.
pub fn check_complete(items: &[ScheduleItem]) -> Result<(), ScheduleError> {
    let unassigned = items.iter().filter(|i| !i.is_assigned()).count();
    if unassigned > 0 {
        return Err(ScheduleError::IncompleteSchedule { unassigned });
    }
    Ok(())
}

/// Full check of a save request arriving from outside the engine.
///
/// A session built through [`Schedule`](super::Schedule) already upholds all of
/// this; the server cannot assume its clients did. Every item's slot must be
/// one the configuration generates, with identical times.
pub fn validate_save_input(input: &SaveScheduleInput) -> Result<(), ScheduleError> {
    let generated: HashSet<_> = slots_for(&input.config)?.into_iter().collect();
    check_complete(&input.schedule_items)?;

    let mut slots = HashSet::new();
    let mut projects = HashSet::new();
    for item in &input.schedule_items {
        if !slots.insert(item.slot.id) {
            return Err(ScheduleError::DuplicateSlot(item.slot.id));
        }
        if !generated.contains(&item.slot) {
            return Err(ScheduleError::UnknownSlot(item.slot.id));
        }
        if let Some(project_id) = item.project_id {
            if !projects.insert(project_id) {
                return Err(ScheduleError::DuplicateProject(project_id));
            }
        }
    }

    Ok(())
}
