//! Allocation of candidates onto slots and the editable [`Schedule`] aggregate.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use crate::models::*;

use super::slots::slots_for;
use super::validate::check_complete;
use super::ScheduleError;

/// How many presentations go before and after the lunch break.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakSplit {
    pub before: usize,
    pub after: usize,
}

impl BreakSplit {
    pub fn total(&self) -> usize {
        self.before + self.after
    }
}

/// Clamp the requested before/after counts to what `available` candidates allow.
///
/// The total is `min(total_presentation_count, available)`. The before-count is
/// clamped first; any shortfall is always absorbed by the after-count, never by
/// the before-count, so the two always sum to the total.
pub fn clamp_split(config: &ScheduleConfig, available: usize) -> BreakSplit {
    let total = (config.total_presentation_count as usize).min(available);
    let before = (config.presentations_before_break as usize).min(total);
    let mut after = (config.presentations_after_break as usize).min(total - before);
    if before + after < total {
        after = total - before;
    }
    BreakSplit { before, after }
}

/// Map candidates onto slots, before-lunch slots first.
///
/// Slots starting before the lunch break (all slots if there is no lunch) feed
/// the before-group; the rest feed the after-group. Candidates are taken in the
/// order given; callers put priority candidates first. Candidates beyond the
/// selected slots are left out and stay unclaimed.
pub fn split_and_map(
    candidates: &[Candidate],
    config: &ScheduleConfig,
    slots: &[TimeSlot],
) -> Vec<ScheduleItem> {
    let split = clamp_split(config, candidates.len());

    let (before_slots, after_slots): (Vec<&TimeSlot>, Vec<&TimeSlot>) =
        slots.iter().partition(|slot| match &config.lunch {
            Some(lunch) => slot.presentation_start < lunch.start,
            None => true,
        });

    if before_slots.len() < split.before || after_slots.len() < split.after {
        tracing::warn!(
            "Not enough slots for requested split: want {}+{}, have {}+{}",
            split.before,
            split.after,
            before_slots.len(),
            after_slots.len()
        );
    }

    before_slots
        .into_iter()
        .take(split.before)
        .chain(after_slots.into_iter().take(split.after))
        .take(split.total())
        .zip(candidates)
        .map(|(slot, candidate)| ScheduleItem {
            slot: *slot,
            project_id: Some(candidate.id),
            project_name: Some(candidate.name.clone()),
            attachment: candidate.attachment.clone(),
        })
        .collect()
}

/// Put pre-selected candidates in front of a fetched candidate list.
///
/// A pre-selected candidate found in `fetched` (matched by id) moves to the
/// front in pre-selection order and keeps its own attachment when it has one.
/// Pre-selected ids missing from `fetched` are ignored.
pub fn merge_preselected(fetched: Vec<Candidate>, preselected: &[Candidate]) -> Vec<Candidate> {
    let mut rest = fetched;
    let mut merged = Vec::with_capacity(rest.len());

    for chosen in preselected {
        let Some(pos) = rest.iter().position(|c| c.id == chosen.id) else {
            tracing::debug!("Ignoring pre-selected candidate {} not in fetched list", chosen.id);
            continue;
        };
        let mut candidate = rest.remove(pos);
        if chosen.attachment.is_some() {
            candidate.attachment = chosen.attachment.clone();
        }
        merged.push(candidate);
    }

    merged.extend(rest);
    merged
}

/// A change to the slot/project mapping, for the UI to render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ScheduleEvent {
    Assigned {
        slot_id: u32,
        candidate_id: Uuid,
        /// Candidate that held the slot before and was released.
        replaced: Option<Uuid>,
    },
    Unassigned {
        slot_id: u32,
        candidate_id: Uuid,
    },
}

/// One day of presentations being edited.
///
/// Owns the configuration, the candidate pool and the schedule items. Every
/// candidate id bound to an item is claimed, and every claimed candidate is
/// bound to exactly one item.
#[derive(Debug, Clone, Serialize)]
pub struct Schedule {
    config: ScheduleConfig,
    date: NaiveDate,
    candidates: Vec<Candidate>,
    items: Vec<ScheduleItem>,
}

impl Schedule {
    /// Generate slots for `config` and fill them from `candidates`.
    ///
    /// Duplicate candidate ids keep their first occurrence. Incoming `claimed`
    /// flags are ignored and recomputed from the resulting items. The same
    /// inputs always produce the same schedule.
    pub fn prepare(
        config: ScheduleConfig,
        candidates: Vec<Candidate>,
        date: NaiveDate,
    ) -> Result<Self, ScheduleError> {
        let slots = slots_for(&config)?;

        let mut seen = HashSet::new();
        let mut candidates: Vec<Candidate> = candidates
            .into_iter()
            .filter(|c| seen.insert(c.id))
            .map(|mut c| {
                c.claimed = false;
                c
            })
            .collect();

        let items = split_and_map(&candidates, &config, &slots);
        for item in &items {
            if let Some(c) = candidates.iter_mut().find(|c| Some(c.id) == item.project_id) {
                c.claimed = true;
            }
        }

        tracing::info!(
            "Prepared schedule for {}: {} slots generated, {} items, {} candidates",
            date,
            slots.len(),
            items.len(),
            candidates.len()
        );

        Ok(Self {
            config,
            date,
            candidates,
            items,
        })
    }

    /// Rebuild an editable schedule from a persisted record.
    ///
    /// Every project bound in the record becomes a claimed candidate. A project
    /// that somehow appears twice stays on its first slot only. The record does
    /// not carry the unscheduled projects, so `unclaimed()` starts empty; use
    /// [`Schedule::extend_pool`] to offer more candidates.
    pub fn from_record(record: &ScheduleRecord) -> Self {
        let mut candidates: Vec<Candidate> = Vec::new();
        let mut items = Vec::with_capacity(record.schedule_items.len());

        for item in &record.schedule_items {
            let mut item = item.clone();
            if let Some(id) = item.project_id {
                if candidates.iter().any(|c| c.id == id) {
                    tracing::warn!("Project {} bound twice in schedule {}", id, record.id);
                    item = ScheduleItem::unassigned(item.slot);
                } else {
                    candidates.push(Candidate {
                        id,
                        name: item.project_name.clone().unwrap_or_default(),
                        attachment: item.attachment.clone(),
                        claimed: true,
                    });
                }
            }
            items.push(item);
        }

        Self {
            config: record.config.clone(),
            date: instant_to_date(record.date),
            candidates,
            items,
        }
    }

    /// Add candidates to the pool without touching any assignment.
    ///
    /// Ids already in the pool are skipped. New candidates start unclaimed.
    /// Returns how many were added.
    pub fn extend_pool(&mut self, candidates: Vec<Candidate>) -> usize {
        let before = self.candidates.len();
        for mut candidate in candidates {
            if self.candidates.iter().any(|c| c.id == candidate.id) {
                continue;
            }
            candidate.claimed = false;
            self.candidates.push(candidate);
        }
        self.candidates.len() - before
    }

    pub fn config(&self) -> &ScheduleConfig {
        &self.config
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn items(&self) -> &[ScheduleItem] {
        &self.items
    }

    pub fn item(&self, slot_id: u32) -> Option<&ScheduleItem> {
        self.items.iter().find(|i| i.slot.id == slot_id)
    }

    /// Candidates not bound to any slot.
    pub fn unclaimed(&self) -> impl Iterator<Item = &Candidate> {
        self.candidates.iter().filter(|c| !c.claimed)
    }

    pub fn claimed(&self) -> impl Iterator<Item = &Candidate> {
        self.candidates.iter().filter(|c| c.claimed)
    }

    /// Bind `candidate_id` to `slot_id`.
    ///
    /// If the slot already holds another candidate, that candidate is released.
    /// Assigning a candidate to the slot it already occupies changes nothing.
    pub fn assign(&mut self, slot_id: u32, candidate_id: Uuid) -> Result<ScheduleEvent, ScheduleError> {
        let item_idx = self
            .items
            .iter()
            .position(|i| i.slot.id == slot_id)
            .ok_or(ScheduleError::InvalidSlot(slot_id))?;
        let cand_idx = self
            .candidates
            .iter()
            .position(|c| c.id == candidate_id)
            .ok_or(ScheduleError::UnknownCandidate(candidate_id))?;

        if self.candidates[cand_idx].claimed {
            let holder = self
                .items
                .iter()
                .find(|i| i.project_id == Some(candidate_id))
                .map(|i| i.slot.id);
            if holder == Some(slot_id) {
                return Ok(ScheduleEvent::Assigned {
                    slot_id,
                    candidate_id,
                    replaced: None,
                });
            }
            return Err(ScheduleError::AlreadyClaimed {
                candidate_id,
                slot_id: holder.unwrap_or(slot_id),
            });
        }

        let replaced = self.items[item_idx].project_id;
        if let Some(previous) = replaced {
            if let Some(c) = self.candidates.iter_mut().find(|c| c.id == previous) {
                c.claimed = false;
            }
        }

        let candidate = &mut self.candidates[cand_idx];
        candidate.claimed = true;
        let item = &mut self.items[item_idx];
        item.project_id = Some(candidate.id);
        item.project_name = Some(candidate.name.clone());
        item.attachment = candidate.attachment.clone();

        tracing::debug!("Assigned candidate {} to slot {}", candidate_id, slot_id);

        Ok(ScheduleEvent::Assigned {
            slot_id,
            candidate_id,
            replaced,
        })
    }

    /// Release whatever candidate is bound to `slot_id`.
    ///
    /// Returns `Ok(None)` when the slot was already empty.
    pub fn unassign(&mut self, slot_id: u32) -> Result<Option<ScheduleEvent>, ScheduleError> {
        let item = self
            .items
            .iter_mut()
            .find(|i| i.slot.id == slot_id)
            .ok_or(ScheduleError::InvalidSlot(slot_id))?;

        let Some(candidate_id) = item.project_id.take() else {
            return Ok(None);
        };
        item.project_name = None;
        item.attachment = None;

        if let Some(c) = self.candidates.iter_mut().find(|c| c.id == candidate_id) {
            c.claimed = false;
        }

        tracing::debug!("Unassigned candidate {} from slot {}", candidate_id, slot_id);

        Ok(Some(ScheduleEvent::Unassigned {
            slot_id,
            candidate_id,
        }))
    }

    /// Check that every slot has a project. The only check required before saving.
    pub fn validate_for_save(&self) -> Result<(), ScheduleError> {
        check_complete(&self.items)
    }

    /// Build the persistence payload, refusing incomplete schedules.
    pub fn to_save_input(&self, schedule_id: Option<Uuid>) -> Result<SaveScheduleInput, ScheduleError> {
        self.validate_for_save()?;
        Ok(SaveScheduleInput {
            schedule_id,
            date: date_to_instant(self.date),
            config: self.config.clone(),
            schedule_items: self.items.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> ClockTime {
        s.parse().unwrap()
    }

    fn candidates(n: usize) -> Vec<Candidate> {
        (0..n)
            .map(|i| Candidate::new(Uuid::new_v4(), format!("Project {}", i)))
            .collect()
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 5, 4).unwrap()
    }

    fn config(before: u32, after: u32, total: u32) -> ScheduleConfig {
        ScheduleConfig {
            presentations_before_break: before,
            presentations_after_break: after,
            total_presentation_count: total,
            ..ScheduleConfig::default()
        }
    }

    /// Claimed candidates and bound items must be in one-to-one correspondence.
    fn assert_bijection(schedule: &Schedule) {
        let bound: Vec<Uuid> = schedule.items().iter().filter_map(|i| i.project_id).collect();
        let unique: HashSet<Uuid> = bound.iter().copied().collect();
        assert_eq!(bound.len(), unique.len(), "a candidate is bound twice");

        let claimed: HashSet<Uuid> = schedule.claimed().map(|c| c.id).collect();
        assert_eq!(claimed, unique);
    }

    #[test]
    fn clamp_absorbs_shortfall_in_after_count() {
        let split = clamp_split(&config(2, 1, 6), 10);
        assert_eq!(split, BreakSplit { before: 2, after: 4 });
    }

    #[test]
    fn clamp_never_exceeds_available_candidates() {
        let split = clamp_split(&config(5, 5, 10), 3);
        assert_eq!(split, BreakSplit { before: 3, after: 0 });

        let split = clamp_split(&config(2, 5, 10), 4);
        assert_eq!(split, BreakSplit { before: 2, after: 2 });
    }

    #[test]
    fn clamp_total_is_min_of_requested_and_available() {
        for requested in 0..8u32 {
            for available in 0..8usize {
                for before in 0..5u32 {
                    for after in 0..5u32 {
                        let split = clamp_split(&config(before, after, requested), available);
                        assert_eq!(split.total(), (requested as usize).min(available));
                    }
                }
            }
        }
    }

    #[test]
    fn maps_before_group_ahead_of_lunch() {
        let cands = candidates(5);
        let cfg = config(3, 2, 5);
        let slots = slots_for(&cfg).unwrap();
        let items = split_and_map(&cands, &cfg, &slots);

        assert_eq!(items.len(), 5);
        let lunch = cfg.lunch.unwrap();
        assert!(items[2].slot.presentation_start < lunch.start);
        assert!(items[3].slot.presentation_start >= lunch.end);
        assert_eq!(items[3].slot.id, 5);
        assert_eq!(items[0].project_id, Some(cands[0].id));
        assert_eq!(items[4].project_id, Some(cands[4].id));
    }

    #[test]
    fn without_lunch_every_slot_is_before_the_break() {
        let cands = candidates(4);
        let cfg = ScheduleConfig {
            lunch: None,
            ..config(1, 3, 4)
        };
        let slots = slots_for(&cfg).unwrap();
        let items = split_and_map(&cands, &cfg, &slots);

        // only the before-group can be filled
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].slot.id, 0);
    }

    #[test]
    fn never_maps_more_items_than_slots() {
        let cands = candidates(20);
        let cfg = ScheduleConfig {
            start_time: t("09:00"),
            end_time: t("11:00"),
            lunch: None,
            ..config(20, 0, 20)
        };
        let slots = slots_for(&cfg).unwrap();
        let items = split_and_map(&cands, &cfg, &slots);
        assert_eq!(items.len(), slots.len());
    }

    #[test]
    fn extra_candidates_remain_unclaimed() {
        let cands = candidates(5);
        let schedule = Schedule::prepare(config(3, 0, 3), cands, day()).unwrap();

        assert_eq!(schedule.items().len(), 3);
        assert!(schedule.items().iter().all(|i| i.project_id.is_some()));
        assert_eq!(schedule.unclaimed().count(), 2);
        assert_bijection(&schedule);
    }

    #[test]
    fn prepare_is_deterministic() {
        let cands = candidates(6);
        let a = Schedule::prepare(config(3, 3, 6), cands.clone(), day()).unwrap();
        let b = Schedule::prepare(config(3, 3, 6), cands, day()).unwrap();
        assert_eq!(a.items(), b.items());
        assert_eq!(a.candidates(), b.candidates());
    }

    #[test]
    fn prepare_drops_duplicate_candidates_and_resets_claims() {
        let mut cands = candidates(2);
        cands.push(cands[0].clone());
        cands[1].claimed = true;

        let schedule = Schedule::prepare(config(0, 0, 0), cands, day()).unwrap();
        assert_eq!(schedule.candidates().len(), 2);
        assert!(schedule.items().is_empty());
        assert_eq!(schedule.claimed().count(), 0);
    }

    #[test]
    fn prepare_rejects_invalid_configuration() {
        let cfg = ScheduleConfig {
            end_time: t("07:00"),
            ..ScheduleConfig::default()
        };
        let err = Schedule::prepare(cfg, candidates(3), day()).unwrap_err();
        assert!(matches!(err, ScheduleError::InvalidConfiguration(_)));
    }

    #[test]
    fn assign_then_unassign_restores_state() {
        let cands = candidates(4);
        let mut schedule = Schedule::prepare(config(2, 1, 3), cands, day()).unwrap();
        let spare = schedule.unclaimed().next().unwrap().id;

        schedule.unassign(0).unwrap();
        let before = schedule.clone();

        let event = schedule.assign(0, spare).unwrap();
        assert_eq!(
            event,
            ScheduleEvent::Assigned {
                slot_id: 0,
                candidate_id: spare,
                replaced: None
            }
        );
        assert_bijection(&schedule);

        schedule.unassign(0).unwrap();
        assert_eq!(schedule.items(), before.items());
        assert_eq!(schedule.candidates(), before.candidates());
        assert!(!schedule.candidates().iter().find(|c| c.id == spare).unwrap().is_claimed());
    }

    #[test]
    fn double_assignment_is_rejected() {
        let cands = candidates(3);
        let mut schedule = Schedule::prepare(config(2, 0, 2), cands, day()).unwrap();
        let c1 = schedule.unclaimed().next().unwrap().id;
        schedule.unassign(0).unwrap();
        schedule.unassign(1).unwrap();

        schedule.assign(0, c1).unwrap();
        let err = schedule.assign(1, c1).unwrap_err();
        assert_eq!(
            err,
            ScheduleError::AlreadyClaimed {
                candidate_id: c1,
                slot_id: 0
            }
        );
        assert_eq!(schedule.item(0).unwrap().project_id, Some(c1));
        assert_eq!(schedule.item(1).unwrap().project_id, None);
        assert_bijection(&schedule);
    }

    #[test]
    fn reassigning_same_slot_is_a_noop() {
        let mut schedule = Schedule::prepare(config(1, 0, 1), candidates(1), day()).unwrap();
        let c = schedule.items()[0].project_id.unwrap();
        let snapshot = schedule.clone();

        schedule.assign(0, c).unwrap();
        assert_eq!(schedule.items(), snapshot.items());
        assert_eq!(schedule.candidates(), snapshot.candidates());
    }

    #[test]
    fn assigning_over_an_occupied_slot_releases_previous_candidate() {
        let cands = candidates(3);
        let mut schedule = Schedule::prepare(config(2, 0, 2), cands, day()).unwrap();
        let occupant = schedule.item(0).unwrap().project_id.unwrap();
        let spare = schedule.unclaimed().next().unwrap().id;

        let event = schedule.assign(0, spare).unwrap();
        assert_eq!(
            event,
            ScheduleEvent::Assigned {
                slot_id: 0,
                candidate_id: spare,
                replaced: Some(occupant)
            }
        );
        assert!(schedule.unclaimed().any(|c| c.id == occupant));
        assert_bijection(&schedule);
    }

    #[test]
    fn unknown_slot_and_candidate_are_rejected_without_changes() {
        let mut schedule = Schedule::prepare(config(1, 0, 1), candidates(2), day()).unwrap();
        let spare = schedule.unclaimed().next().unwrap().id;
        let snapshot = schedule.clone();

        assert_eq!(schedule.assign(42, spare), Err(ScheduleError::InvalidSlot(42)));
        let stranger = Uuid::new_v4();
        assert_eq!(
            schedule.assign(0, stranger),
            Err(ScheduleError::UnknownCandidate(stranger))
        );
        assert_eq!(schedule.unassign(42), Err(ScheduleError::InvalidSlot(42)));

        assert_eq!(schedule.items(), snapshot.items());
        assert_eq!(schedule.candidates(), snapshot.candidates());
    }

    #[test]
    fn unassigning_an_empty_slot_is_not_an_error() {
        let mut schedule = Schedule::prepare(config(1, 0, 1), candidates(1), day()).unwrap();
        assert!(schedule.unassign(0).unwrap().is_some());
        assert_eq!(schedule.unassign(0).unwrap(), None);
    }

    #[test]
    fn validate_for_save_fails_iff_a_slot_is_empty() {
        let mut schedule = Schedule::prepare(config(2, 1, 3), candidates(3), day()).unwrap();
        assert!(schedule.validate_for_save().is_ok());

        let c = schedule.item(1).unwrap().project_id.unwrap();
        schedule.unassign(1).unwrap();
        assert_eq!(
            schedule.validate_for_save(),
            Err(ScheduleError::IncompleteSchedule { unassigned: 1 })
        );
        assert!(schedule.to_save_input(None).is_err());

        schedule.assign(1, c).unwrap();
        let input = schedule.to_save_input(None).unwrap();
        assert_eq!(input.schedule_items.len(), 3);
        assert_eq!(input.date.to_rfc3339(), "2026-05-04T00:00:00+00:00");
    }

    #[test]
    fn merge_puts_preselected_first_and_keeps_their_attachment() {
        let fetched = candidates(4);
        let deck = FileRef {
            name: "deck.pdf".to_string(),
            url: "/files/deck.pdf".to_string(),
        };
        let pre = vec![
            fetched[2].clone().with_attachment(deck.clone()),
            Candidate::new(Uuid::new_v4(), "Gone"),
            fetched[0].clone(),
        ];

        let merged = merge_preselected(fetched.clone(), &pre);
        let ids: Vec<Uuid> = merged.iter().map(|c| c.id).collect();
        assert_eq!(
            ids,
            vec![fetched[2].id, fetched[0].id, fetched[1].id, fetched[3].id]
        );
        assert_eq!(merged[0].attachment, Some(deck));
        assert_eq!(merged[1].attachment, None);
    }

    #[test]
    fn from_record_claims_bound_projects() {
        let schedule = Schedule::prepare(config(2, 1, 3), candidates(3), day()).unwrap();
        let input = schedule.to_save_input(None).unwrap();
        let now = chrono::Utc::now();
        let record = ScheduleRecord {
            id: Uuid::new_v4(),
            date: input.date,
            config: input.config,
            schedule_items: input.schedule_items,
            created_at: now,
            updated_at: now,
        };

        let resumed = Schedule::from_record(&record);
        assert_eq!(resumed.date(), day());
        assert_eq!(resumed.items(), schedule.items());
        assert_eq!(resumed.claimed().count(), 3);
        assert_bijection(&resumed);
    }

    #[test]
    fn resumed_pool_can_be_extended_with_fetched_candidates() {
        let cands = candidates(5);
        let schedule = Schedule::prepare(config(2, 1, 3), cands.clone(), day()).unwrap();
        let input = schedule.to_save_input(None).unwrap();
        let now = chrono::Utc::now();
        let record = ScheduleRecord {
            id: Uuid::new_v4(),
            date: input.date,
            config: input.config,
            schedule_items: input.schedule_items,
            created_at: now,
            updated_at: now,
        };

        let mut resumed = Schedule::from_record(&record);
        assert_eq!(resumed.unclaimed().count(), 0);

        let mut fetched = cands.clone();
        fetched[4].claimed = true;
        assert_eq!(resumed.extend_pool(fetched), 2);
        assert_eq!(resumed.items(), schedule.items());
        assert_eq!(resumed.unclaimed().count(), 2);
        assert_bijection(&resumed);

        let spare = cands[4].id;
        resumed.assign(0, spare).unwrap();
        assert_eq!(resumed.item(0).unwrap().project_id, Some(spare));
        assert_bijection(&resumed);
    }
}
