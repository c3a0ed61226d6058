//! Planning sessions: one operator editing one presentation day.
//!
//! A [`PlanningSession`] owns the [`Schedule`] aggregate for the duration of an
//! edit. It talks to the outside world through a [`ScheduleBackend`] for two
//! things only: fetching candidates and persisting the finished schedule.
//! While one `prepare` or `save` is outstanding, a second call is ignored.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use crate::db::Database;
use crate::engine::{merge_preselected, Schedule, ScheduleError, ScheduleEvent};
use crate::models::*;

/// Where candidates come from and where finished schedules go.
pub trait ScheduleBackend {
    /// Candidates in the order the backend proposes them.
    fn fetch_candidates(
        &self,
        request: &CandidateRequest,
    ) -> impl Future<Output = anyhow::Result<Vec<Candidate>>> + Send;

    /// Create (no `schedule_id`) or update (with `schedule_id`) a schedule.
    fn persist_schedule(
        &self,
        input: &SaveScheduleInput,
    ) -> impl Future<Output = anyhow::Result<ScheduleRecord>> + Send;
}

/// Sessions can run directly against a local database.
impl ScheduleBackend for Database {
    fn fetch_candidates(
        &self,
        request: &CandidateRequest,
    ) -> impl Future<Output = anyhow::Result<Vec<Candidate>>> + Send {
        async move { self.get_candidates(request) }
    }

    fn persist_schedule(
        &self,
        input: &SaveScheduleInput,
    ) -> impl Future<Output = anyhow::Result<ScheduleRecord>> + Send {
        async move {
            match input.schedule_id {
                Some(id) => self
                    .update_schedule(id, input.clone())?
                    .ok_or_else(|| anyhow::anyhow!("Schedule {} not found", id)),
                None => self.create_schedule(input.clone()),
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    #[error("no schedule prepared yet")]
    NotPrepared,

    #[error("backend request failed: {0:#}")]
    Backend(anyhow::Error),
}

/// Clears the in-flight flag when the request finishes, however it finishes.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct PlanningSession<B> {
    backend: B,
    schedule_id: Mutex<Option<Uuid>>,
    schedule: Mutex<Option<Schedule>>,
    in_flight: AtomicBool,
}

impl<B: ScheduleBackend> PlanningSession<B> {
    /// A session for a schedule that has never been saved.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            schedule_id: Mutex::new(None),
            schedule: Mutex::new(None),
            in_flight: AtomicBool::new(false),
        }
    }

    /// A session editing an existing record; saving updates it in place.
    pub fn resume(backend: B, record: &ScheduleRecord) -> Self {
        Self {
            backend,
            schedule_id: Mutex::new(Some(record.id)),
            schedule: Mutex::new(Some(Schedule::from_record(record))),
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn schedule_id(&self) -> Option<Uuid> {
        *self.schedule_id.lock().expect("session lock poisoned")
    }

    /// A copy of the current aggregate, if one has been prepared.
    pub fn schedule(&self) -> Option<Schedule> {
        self.lock_schedule().clone()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Fetch candidates and build a fresh schedule for `config`.
    ///
    /// Returns `Ok(None)` without doing anything if another request is in
    /// flight. On any failure the previous schedule is kept as it was.
    pub async fn prepare(
        &self,
        config: ScheduleConfig,
        date: NaiveDate,
        preselected: &[Candidate],
    ) -> Result<Option<Vec<ScheduleItem>>, SessionError> {
        let Some(_flight) = self.begin() else {
            tracing::debug!("Ignoring prepare: a request is already in flight");
            return Ok(None);
        };

        config.validate()?;

        let request = CandidateRequest {
            desired_count: config.total_presentation_count,
            selected_ids: preselected.iter().map(|c| c.id).collect(),
        };
        let fetched = self
            .backend
            .fetch_candidates(&request)
            .await
            .map_err(SessionError::Backend)?;
        tracing::debug!("Fetched {} candidates", fetched.len());

        let candidates = merge_preselected(fetched, preselected);
        let schedule = Schedule::prepare(config, candidates, date)?;
        let items = schedule.items().to_vec();

        *self.lock_schedule() = Some(schedule);
        Ok(Some(items))
    }

    pub fn assign(&self, slot_id: u32, candidate_id: Uuid) -> Result<ScheduleEvent, SessionError> {
        let mut guard = self.lock_schedule();
        let schedule = guard.as_mut().ok_or(SessionError::NotPrepared)?;
        Ok(schedule.assign(slot_id, candidate_id)?)
    }

    pub fn unassign(&self, slot_id: u32) -> Result<Option<ScheduleEvent>, SessionError> {
        let mut guard = self.lock_schedule();
        let schedule = guard.as_mut().ok_or(SessionError::NotPrepared)?;
        Ok(schedule.unassign(slot_id)?)
    }

    /// Validate and persist the schedule.
    ///
    /// Creates a new record the first time and updates it afterwards. Returns
    /// `Ok(None)` without doing anything if another request is in flight.
    pub async fn save(&self) -> Result<Option<ScheduleRecord>, SessionError> {
        let Some(_flight) = self.begin() else {
            tracing::debug!("Ignoring save: a request is already in flight");
            return Ok(None);
        };

        let input = {
            let guard = self.lock_schedule();
            let schedule = guard.as_ref().ok_or(SessionError::NotPrepared)?;
            schedule.to_save_input(self.schedule_id())?
        };

        let record = self
            .backend
            .persist_schedule(&input)
            .await
            .map_err(SessionError::Backend)?;

        *self.schedule_id.lock().expect("session lock poisoned") = Some(record.id);
        tracing::info!("Saved schedule {} for {}", record.id, instant_to_date(record.date));
        Ok(Some(record))
    }

    fn begin(&self) -> Option<InFlight<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlight(&self.in_flight))
    }

    fn lock_schedule(&self) -> MutexGuard<'_, Option<Schedule>> {
        self.schedule.lock().expect("session lock poisoned")
    }
}
