mod schema;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, Row, Transaction};
use thiserror::Error;
use uuid::Uuid;

use crate::engine::validate_save_input;
use crate::models::*;

/// Storage-level rejections that callers may want to surface to users.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DbError {
    #[error("project {0} not found")]
    UnknownProject(Uuid),

    #[error("project {0} is scheduled and cannot be deleted")]
    ProjectInUse(Uuid),
}

pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        tracing::debug!("Opened database at {}", path.display());
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn default_path() -> Result<PathBuf> {
        let dirs = directories::ProjectDirs::from("", "", "presentation-scheduler")
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        Ok(dirs.data_dir().join("scheduler.db"))
    }

    pub fn open_default() -> Result<Self> {
        Self::open(Self::default_path()?)
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        schema::run_migrations(&conn)
    }

    // ============================================================
    // Project operations
    // ============================================================

    pub fn get_all_projects(&self) -> Result<Vec<Project>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, name, description, attachment_name, attachment_url, created_at, updated_at
             FROM projects ORDER BY name, created_at",
        )?;

        let projects = stmt
            .query_map([], project_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(projects)
    }

    pub fn get_project(&self, id: Uuid) -> Result<Option<Project>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let project = conn
            .query_row(
                "SELECT id, name, description, attachment_name, attachment_url, created_at, updated_at
                 FROM projects WHERE id = ?",
                [id.to_string()],
                project_from_row,
            )
            .optional()?;
        Ok(project)
    }

    pub fn create_project(&self, input: CreateProjectInput) -> Result<Project> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let id = Uuid::new_v4();
        let now = Utc::now();
        let (attachment_name, attachment_url) = split_file_ref(&input.attachment);

        conn.execute(
            "INSERT INTO projects (id, name, description, attachment_name, attachment_url, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            (
                id.to_string(),
                &input.name,
                &input.description,
                attachment_name,
                attachment_url,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ),
        )?;

        Ok(Project {
            id,
            name: input.name,
            description: input.description,
            attachment: input.attachment,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn update_project(&self, id: Uuid, input: UpdateProjectInput) -> Result<Option<Project>> {
        let Some(existing) = self.get_project(id)? else {
            return Ok(None);
        };

        let conn = self.conn.lock().expect("database lock poisoned");
        let now = Utc::now();
        let name = input.name.unwrap_or(existing.name);
        let description = input.description.or(existing.description);
        let attachment = input.attachment.or(existing.attachment);
        let (attachment_name, attachment_url) = split_file_ref(&attachment);

        conn.execute(
            "UPDATE projects SET name = ?, description = ?, attachment_name = ?, attachment_url = ?, updated_at = ?
             WHERE id = ?",
            (
                &name,
                &description,
                attachment_name,
                attachment_url,
                now.to_rfc3339(),
                id.to_string(),
            ),
        )?;

        Ok(Some(Project {
            id,
            name,
            description,
            attachment,
            created_at: existing.created_at,
            updated_at: now,
        }))
    }

    pub fn delete_project(&self, id: Uuid) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let scheduled: i64 = conn.query_row(
            "SELECT COUNT(*) FROM schedule_items WHERE project_id = ?",
            [id.to_string()],
            |row| row.get(0),
        )?;
        if scheduled > 0 {
            return Err(DbError::ProjectInUse(id).into());
        }

        let rows = conn.execute("DELETE FROM projects WHERE id = ?", [id.to_string()])?;
        Ok(rows > 0)
    }

    // ============================================================
    // Candidate selection
    // ============================================================

    /// Candidates for a planning session.
    ///
    /// Selected projects that exist come first, in request order; the rest of
    /// the list is filled with other projects by name until `desired_count`
    /// (or the number of selected projects, if larger) is reached.
    pub fn get_candidates(&self, request: &CandidateRequest) -> Result<Vec<Candidate>> {
        let mut remaining = self.get_all_projects()?;
        let mut candidates = Vec::new();

        for id in &request.selected_ids {
            if let Some(pos) = remaining.iter().position(|p| p.id == *id) {
                candidates.push(Candidate::from(remaining.remove(pos)));
            }
        }

        let limit = (request.desired_count as usize).max(candidates.len());
        let fill = limit - candidates.len();
        candidates.extend(remaining.into_iter().take(fill).map(Candidate::from));

        Ok(candidates)
    }

    // ============================================================
    // Schedule operations
    // ============================================================

    pub fn list_schedules(&self) -> Result<Vec<ScheduleSummary>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT s.id, s.date, COUNT(i.slot_id), s.updated_at
             FROM schedules s LEFT JOIN schedule_items i ON i.schedule_id = s.id
             GROUP BY s.id ORDER BY s.date DESC, s.created_at DESC",
        )?;

        let schedules = stmt
            .query_map([], |row| {
                Ok(ScheduleSummary {
                    id: parse_uuid(row.get::<_, String>(0)?),
                    date: date_to_instant(parse_date(row.get::<_, String>(1)?)),
                    item_count: row.get(2)?,
                    updated_at: parse_datetime(row.get::<_, String>(3)?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(schedules)
    }

    pub fn get_schedule(&self, id: Uuid) -> Result<Option<ScheduleRecord>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        read_schedule(&conn, id)
    }

    /// Persist a new schedule. The input must pass [`validate_save_input`].
    pub fn create_schedule(&self, input: SaveScheduleInput) -> Result<ScheduleRecord> {
        validate_save_input(&input)?;

        let mut conn = self.conn.lock().expect("database lock poisoned");
        let tx = conn.transaction()?;
        ensure_projects_exist(&tx, &input.schedule_items)?;

        let id = Uuid::new_v4();
        let now = Utc::now().to_rfc3339();
        let config = &input.config;
        let (lunch_start, lunch_end) = split_break(&config.lunch);
        let (dinner_start, dinner_end) = split_break(&config.dinner);

        tx.execute(
            "INSERT INTO schedules (id, date, start_time, end_time, presentation_length, gap_between,
                lunch_start, lunch_end, dinner_start, dinner_end,
                presentations_before_break, presentations_after_break, total_presentation_count,
                created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            rusqlite::params![
                id.to_string(),
                format_date(instant_to_date(input.date)),
                config.start_time.minutes(),
                config.end_time.minutes(),
                config.presentation_length_minutes,
                config.gap_between_minutes,
                lunch_start,
                lunch_end,
                dinner_start,
                dinner_end,
                config.presentations_before_break,
                config.presentations_after_break,
                config.total_presentation_count,
                &now,
                &now,
            ],
        )?;
        write_items(&tx, id, &input.schedule_items)?;

        let record = read_schedule(&tx, id)?
            .ok_or_else(|| anyhow::anyhow!("Schedule vanished after insert"))?;
        tx.commit()?;

        tracing::info!(
            "Created schedule {} for {} with {} items",
            id,
            instant_to_date(input.date),
            input.schedule_items.len()
        );
        Ok(record)
    }

    /// Replace an existing schedule's configuration and items.
    pub fn update_schedule(&self, id: Uuid, input: SaveScheduleInput) -> Result<Option<ScheduleRecord>> {
        validate_save_input(&input)?;

        let mut conn = self.conn.lock().expect("database lock poisoned");
        let tx = conn.transaction()?;
        ensure_projects_exist(&tx, &input.schedule_items)?;

        let config = &input.config;
        let (lunch_start, lunch_end) = split_break(&config.lunch);
        let (dinner_start, dinner_end) = split_break(&config.dinner);

        let rows = tx.execute(
            "UPDATE schedules SET date = ?, start_time = ?, end_time = ?, presentation_length = ?,
                gap_between = ?, lunch_start = ?, lunch_end = ?, dinner_start = ?, dinner_end = ?,
                presentations_before_break = ?, presentations_after_break = ?,
                total_presentation_count = ?, updated_at = ?
             WHERE id = ?",
            rusqlite::params![
                format_date(instant_to_date(input.date)),
                config.start_time.minutes(),
                config.end_time.minutes(),
                config.presentation_length_minutes,
                config.gap_between_minutes,
                lunch_start,
                lunch_end,
                dinner_start,
                dinner_end,
                config.presentations_before_break,
                config.presentations_after_break,
                config.total_presentation_count,
                Utc::now().to_rfc3339(),
                id.to_string(),
            ],
        )?;
        if rows == 0 {
            return Ok(None);
        }

        tx.execute(
            "DELETE FROM schedule_items WHERE schedule_id = ?",
            [id.to_string()],
        )?;
        write_items(&tx, id, &input.schedule_items)?;

        let record = read_schedule(&tx, id)?;
        tx.commit()?;

        tracing::info!("Updated schedule {} with {} items", id, input.schedule_items.len());
        Ok(record)
    }

    pub fn delete_schedule(&self, id: Uuid) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute("DELETE FROM schedules WHERE id = ?", [id.to_string()])?;
        Ok(rows > 0)
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
        }
    }
}

fn project_from_row(row: &Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: parse_uuid(row.get::<_, String>(0)?),
        name: row.get(1)?,
        description: row.get(2)?,
        attachment: join_file_ref(row.get(3)?, row.get(4)?),
        created_at: parse_datetime(row.get::<_, String>(5)?),
        updated_at: parse_datetime(row.get::<_, String>(6)?),
    })
}

fn read_schedule(conn: &Connection, id: Uuid) -> Result<Option<ScheduleRecord>> {
    let header = conn
        .query_row(
            "SELECT id, date, start_time, end_time, presentation_length, gap_between,
                lunch_start, lunch_end, dinner_start, dinner_end,
                presentations_before_break, presentations_after_break, total_presentation_count,
                created_at, updated_at
             FROM schedules WHERE id = ?",
            [id.to_string()],
            |row| {
                Ok(ScheduleRecord {
                    id: parse_uuid(row.get::<_, String>(0)?),
                    date: date_to_instant(parse_date(row.get::<_, String>(1)?)),
                    config: ScheduleConfig {
                        start_time: ClockTime::from_minutes(row.get(2)?),
                        end_time: ClockTime::from_minutes(row.get(3)?),
                        presentation_length_minutes: row.get(4)?,
                        gap_between_minutes: row.get(5)?,
                        lunch: join_break(row.get(6)?, row.get(7)?),
                        dinner: join_break(row.get(8)?, row.get(9)?),
                        presentations_before_break: row.get(10)?,
                        presentations_after_break: row.get(11)?,
                        total_presentation_count: row.get(12)?,
                    },
                    schedule_items: Vec::new(),
                    created_at: parse_datetime(row.get::<_, String>(13)?),
                    updated_at: parse_datetime(row.get::<_, String>(14)?),
                })
            },
        )
        .optional()?;

    let Some(mut record) = header else {
        return Ok(None);
    };

    let mut stmt = conn.prepare(
        "SELECT slot_id, presentation_start, presentation_end, gap_end,
            project_id, project_name, attachment_name, attachment_url
         FROM schedule_items WHERE schedule_id = ? ORDER BY slot_id",
    )?;
    record.schedule_items = stmt
        .query_map([id.to_string()], |row| {
            Ok(ScheduleItem {
                slot: TimeSlot {
                    id: row.get(0)?,
                    presentation_start: ClockTime::from_minutes(row.get(1)?),
                    presentation_end: ClockTime::from_minutes(row.get(2)?),
                    gap_end: ClockTime::from_minutes(row.get(3)?),
                },
                project_id: Some(parse_uuid(row.get::<_, String>(4)?)),
                project_name: Some(row.get(5)?),
                attachment: join_file_ref(row.get(6)?, row.get(7)?),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Some(record))
}

fn ensure_projects_exist(tx: &Transaction<'_>, items: &[ScheduleItem]) -> Result<()> {
    let mut stmt = tx.prepare("SELECT COUNT(*) FROM projects WHERE id = ?")?;
    for project_id in items.iter().filter_map(|i| i.project_id) {
        let count: i64 = stmt.query_row([project_id.to_string()], |row| row.get(0))?;
        if count == 0 {
            return Err(DbError::UnknownProject(project_id).into());
        }
    }
    Ok(())
}

/// Items must already be validated as complete.
fn write_items(tx: &Transaction<'_>, schedule_id: Uuid, items: &[ScheduleItem]) -> Result<()> {
    let mut stmt = tx.prepare(
        "INSERT INTO schedule_items (schedule_id, slot_id, presentation_start, presentation_end, gap_end,
            project_id, project_name, attachment_name, attachment_url)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )?;

    for item in items {
        let project_id = item
            .project_id
            .ok_or_else(|| anyhow::anyhow!("slot {} has no project", item.slot.id))?;
        let (attachment_name, attachment_url) = split_file_ref(&item.attachment);
        stmt.execute(rusqlite::params![
            schedule_id.to_string(),
            item.slot.id,
            item.slot.presentation_start.minutes(),
            item.slot.presentation_end.minutes(),
            item.slot.gap_end.minutes(),
            project_id.to_string(),
            item.project_name.clone().unwrap_or_default(),
            attachment_name,
            attachment_url,
        ])?;
    }

    Ok(())
}

fn split_file_ref(file: &Option<FileRef>) -> (Option<String>, Option<String>) {
    match file {
        Some(f) => (Some(f.name.clone()), Some(f.url.clone())),
        None => (None, None),
    }
}

fn join_file_ref(name: Option<String>, url: Option<String>) -> Option<FileRef> {
    match (name, url) {
        (Some(name), Some(url)) => Some(FileRef { name, url }),
        _ => None,
    }
}

fn split_break(window: &Option<BreakWindow>) -> (Option<u32>, Option<u32>) {
    match window {
        Some(w) => (Some(w.start.minutes()), Some(w.end.minutes())),
        None => (None, None),
    }
}

fn join_break(start: Option<u32>, end: Option<u32>) -> Option<BreakWindow> {
    match (start, end) {
        (Some(start), Some(end)) => Some(BreakWindow::new(
            ClockTime::from_minutes(start),
            ClockTime::from_minutes(end),
        )),
        _ => None,
    }
}

fn parse_uuid(s: String) -> Uuid {
    Uuid::parse_str(&s).unwrap_or_else(|_| Uuid::nil())
}

fn parse_datetime(s: String) -> chrono::DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn parse_date(s: String) -> NaiveDate {
    NaiveDate::parse_from_str(&s, "%Y-%m-%d").unwrap_or_default()
}
