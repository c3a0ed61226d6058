//! Slot generation: turns a working window into discrete presentation slots.

use crate::models::{BreakWindow, ClockTime, ScheduleConfig, TimeSlot, MINUTES_PER_DAY};

use super::ScheduleError;

impl ScheduleConfig {
    /// Reject configurations that cannot describe a presentation day.
    ///
    /// Checked before generation so a mistyped window is reported instead of
    /// quietly producing zero slots.
    pub fn validate(&self) -> Result<(), ScheduleError> {
        if self.presentation_length_minutes == 0 {
            return Err(ScheduleError::InvalidConfiguration(
                "presentation length must be greater than zero".to_string(),
            ));
        }
        if self.presentation_length_minutes > MINUTES_PER_DAY {
            return Err(ScheduleError::InvalidConfiguration(format!(
                "presentation length {} exceeds a day",
                self.presentation_length_minutes
            )));
        }
        if self.gap_between_minutes > MINUTES_PER_DAY {
            return Err(ScheduleError::InvalidConfiguration(format!(
                "gap {} exceeds a day",
                self.gap_between_minutes
            )));
        }
        for (label, time) in [("start", self.start_time), ("end", self.end_time)] {
            if !time.is_time_of_day() {
                return Err(ScheduleError::InvalidConfiguration(format!(
                    "{} time {} is not a time of day",
                    label, time
                )));
            }
        }
        if self.end_time <= self.start_time {
            return Err(ScheduleError::InvalidConfiguration(format!(
                "end time {} must be after start time {}",
                self.end_time, self.start_time
            )));
        }

        for (label, window) in [("lunch", &self.lunch), ("dinner", &self.dinner)] {
            let Some(window) = window else { continue };
            if window.end <= window.start {
                return Err(ScheduleError::InvalidConfiguration(format!(
                    "{} break ends ({}) before it starts ({})",
                    label, window.end, window.start
                )));
            }
            if window.start < self.start_time || window.end > self.end_time {
                return Err(ScheduleError::InvalidConfiguration(format!(
                    "{} break {}-{} is outside the working window {}-{}",
                    label, window.start, window.end, self.start_time, self.end_time
                )));
            }
        }

        Ok(())
    }
}

/// Generate the ordered slot list for a working window.
///
/// The cursor starts at `start_time` and moves by `presentation_length + gap`
/// per step while a whole presentation still fits before `end_time`. A
/// position whose presentation overlaps any break is not emitted, but the
/// cursor still advances by one step from it; it does not jump to the end of
/// the break. Ids are assigned in emission order starting at 0. Generation
/// stops if a slot's end or gap end cannot be represented.
pub fn generate_slots(
    start_time: ClockTime,
    end_time: ClockTime,
    presentation_length: u32,
    gap: u32,
    breaks: &[BreakWindow],
) -> Vec<TimeSlot> {
    let mut slots = Vec::new();
    if presentation_length == 0 {
        return slots;
    }

    let mut cursor = start_time;
    let mut next_id = 0;
    let mut skipped = 0usize;

    loop {
        let Some(presentation_end) = cursor.checked_add(presentation_length) else {
            break;
        };
        if presentation_end > end_time {
            break;
        }
        let Some(gap_end) = presentation_end.checked_add(gap) else {
            tracing::warn!("Gap of {} minutes after {} overflows; stopping", gap, presentation_end);
            break;
        };

        if breaks.iter().any(|b| b.intersects(cursor, presentation_end)) {
            skipped += 1;
        } else {
            slots.push(TimeSlot {
                id: next_id,
                presentation_start: cursor,
                presentation_end,
                gap_end,
            });
            next_id += 1;
        }

        cursor = gap_end;
    }

    tracing::debug!(
        "Generated {} slots between {} and {} ({} positions skipped for breaks)",
        slots.len(),
        start_time,
        end_time,
        skipped
    );

    slots
}

/// Validate `config` and generate its slots.
pub fn slots_for(config: &ScheduleConfig) -> Result<Vec<TimeSlot>, ScheduleError> {
    config.validate()?;
    Ok(generate_slots(
        config.start_time,
        config.end_time,
        config.presentation_length_minutes,
        config.gap_between_minutes,
        &config.breaks(),
    ))
}
