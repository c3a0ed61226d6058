use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::project::FileRef;
use super::time::ClockTime;

/// One discrete presentation slot plus its trailing gap.
///
/// Slots are immutable once generated. `id` is the 0-based emission index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeSlot {
    pub id: u32,
    pub presentation_start: ClockTime,
    pub presentation_end: ClockTime,
    pub gap_end: ClockTime,
}

impl TimeSlot {
    /// Whether the presentation interval `[start, end)` intersects `window`.
    pub fn overlaps(&self, window: &BreakWindow) -> bool {
        window.intersects(self.presentation_start, self.presentation_end)
    }
}

/// A configured break (lunch, dinner) during which nobody presents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakWindow {
    pub start: ClockTime,
    pub end: ClockTime,
}

impl BreakWindow {
    pub fn new(start: ClockTime, end: ClockTime) -> Self {
        Self { start, end }
    }

    /// Half-open intersection test against `[start, end)`.
    pub fn intersects(&self, start: ClockTime, end: ClockTime) -> bool {
        start < self.end && self.start < end
    }
}

/// Parameters for one presentation day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    pub start_time: ClockTime,
    pub end_time: ClockTime,
    pub presentation_length_minutes: u32,
    pub gap_between_minutes: u32,
    #[serde(default)]
    pub lunch: Option<BreakWindow>,
    #[serde(default)]
    pub dinner: Option<BreakWindow>,
    pub presentations_before_break: u32,
    pub presentations_after_break: u32,
    pub total_presentation_count: u32,
}

impl ScheduleConfig {
    /// Configured breaks, lunch first.
    pub fn breaks(&self) -> Vec<BreakWindow> {
        self.lunch.iter().chain(self.dinner.iter()).copied().collect()
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            start_time: ClockTime::from_minutes(8 * 60),
            end_time: ClockTime::from_minutes(16 * 60),
            presentation_length_minutes: 45,
            gap_between_minutes: 5,
            lunch: Some(BreakWindow::new(
                ClockTime::from_minutes(12 * 60 + 30),
                ClockTime::from_minutes(13 * 60 + 30),
            )),
            dinner: None,
            presentations_before_break: 4,
            presentations_after_break: 3,
            total_presentation_count: 7,
        }
    }
}

/// A slot and the project bound to it, if any.
///
/// Items are created unbound when slots are generated and only change through
/// the schedule's `assign` and `unassign`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleItem {
    pub slot: TimeSlot,
    pub project_id: Option<Uuid>,
    pub project_name: Option<String>,
    pub attachment: Option<FileRef>,
}

impl ScheduleItem {
    pub fn unassigned(slot: TimeSlot) -> Self {
        Self {
            slot,
            project_id: None,
            project_name: None,
            attachment: None,
        }
    }

    pub fn is_assigned(&self) -> bool {
        self.project_id.is_some()
    }
}

/// Request body for creating (POST) or updating (PUT) a schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveScheduleInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_id: Option<Uuid>,
    /// UTC midnight of the presentation day.
    pub date: DateTime<Utc>,
    #[serde(flatten)]
    pub config: ScheduleConfig,
    pub schedule_items: Vec<ScheduleItem>,
}

/// A persisted presentation schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleRecord {
    pub id: Uuid,
    /// UTC midnight of the presentation day.
    pub date: DateTime<Utc>,
    #[serde(flatten)]
    pub config: ScheduleConfig,
    pub schedule_items: Vec<ScheduleItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Summary row for schedule listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleSummary {
    pub id: Uuid,
    pub date: DateTime<Utc>,
    pub item_count: u32,
    pub updated_at: DateTime<Utc>,
}
