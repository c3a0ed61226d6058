use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use presentation_scheduler::client::SchedulerClient;
use presentation_scheduler::config::{self, ServerConfig};
use presentation_scheduler::engine::{generate_slots, Schedule};
use presentation_scheduler::models::*;
use presentation_scheduler::session::{PlanningSession, ScheduleBackend};
use presentation_scheduler::{api, db};

#[derive(Parser)]
#[command(name = "psched")]
#[command(about = "Plan a day of NGO project presentations")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Port for HTTP API (overrides SCHEDULER_PORT)
        #[arg(short, long)]
        port: Option<u16>,

        /// SQLite database file (overrides SCHEDULER_DB_PATH)
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Print the slots a day configuration produces
    Slots {
        #[command(flatten)]
        day: DayArgs,

        /// Store these day parameters as the defaults for later runs
        #[arg(long)]
        write_defaults: bool,
    },
    /// Prepare a schedule from current candidates and optionally save it
    Plan {
        #[command(flatten)]
        day: DayArgs,

        /// Presentation day (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,

        /// Projects to schedule first (repeatable)
        #[arg(long = "select")]
        selected: Vec<Uuid>,

        /// Edit an existing schedule instead of creating a new one
        #[arg(long)]
        schedule: Option<Uuid>,

        /// Use the local database instead of the HTTP API
        #[arg(long)]
        local: bool,

        /// Persist the prepared schedule
        #[arg(long)]
        save: bool,
    },
}

/// Day parameters. Unset values come from the schedule defaults file.
#[derive(Args)]
struct DayArgs {
    /// JSON schedule configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    start: Option<ClockTime>,

    #[arg(long)]
    end: Option<ClockTime>,

    /// Presentation length in minutes
    #[arg(long)]
    length: Option<u32>,

    /// Gap between presentations in minutes
    #[arg(long)]
    gap: Option<u32>,

    /// Lunch break as HH:MM-HH:MM, or "none"
    #[arg(long, value_parser = parse_break)]
    lunch: Option<BreakArg>,

    /// Dinner break as HH:MM-HH:MM, or "none"
    #[arg(long, value_parser = parse_break)]
    dinner: Option<BreakArg>,

    #[arg(long)]
    before: Option<u32>,

    #[arg(long)]
    after: Option<u32>,

    /// Total number of presentations
    #[arg(long)]
    total: Option<u32>,
}

impl DayArgs {
    fn resolve(&self) -> anyhow::Result<ScheduleConfig> {
        let mut config = match &self.config {
            Some(path) => config::load_schedule_file(path)?,
            None => config::load_schedule_defaults(),
        };

        if let Some(v) = self.start {
            config.start_time = v;
        }
        if let Some(v) = self.end {
            config.end_time = v;
        }
        if let Some(v) = self.length {
            config.presentation_length_minutes = v;
        }
        if let Some(v) = self.gap {
            config.gap_between_minutes = v;
        }
        if let Some(BreakArg(v)) = self.lunch {
            config.lunch = v;
        }
        if let Some(BreakArg(v)) = self.dinner {
            config.dinner = v;
        }
        if let Some(v) = self.before {
            config.presentations_before_break = v;
        }
        if let Some(v) = self.after {
            config.presentations_after_break = v;
        }
        if let Some(v) = self.total {
            config.total_presentation_count = v;
        }

        Ok(config)
    }
}

/// A break given on the command line; `none` clears the configured one.
#[derive(Clone, Copy)]
struct BreakArg(Option<BreakWindow>);

fn parse_break(s: &str) -> Result<BreakArg, String> {
    if s.eq_ignore_ascii_case("none") {
        return Ok(BreakArg(None));
    }
    let (start, end) = s
        .split_once('-')
        .ok_or_else(|| format!("expected HH:MM-HH:MM, got '{}'", s))?;
    let start: ClockTime = start.parse().map_err(|e: ParseClockTimeError| e.to_string())?;
    let end: ClockTime = end.parse().map_err(|e: ParseClockTimeError| e.to_string())?;
    Ok(BreakArg(Some(BreakWindow::new(start, end))))
}

/// Initialize tracing to stderr so printed schedules stay clean on stdout
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG")
            .unwrap_or_else(|_| "presentation_scheduler=debug,tower_http=debug".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn open_database(path: Option<PathBuf>) -> anyhow::Result<db::Database> {
    let db = match path {
        Some(path) => db::Database::open(path)?,
        None => db::Database::open_default()?,
    };
    db.migrate()?;
    Ok(db)
}

async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    let db = open_database(config.db_path.clone())?;
    let app = api::create_router_with_config(db, &config);

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", config.port)).await?;
    tracing::info!("Scheduler listening on http://127.0.0.1:{}", config.port);

    axum::serve(listener, app).await?;
    Ok(())
}

fn print_slots(slots: &[TimeSlot]) {
    if slots.is_empty() {
        println!("No slots fit this configuration.");
        return;
    }
    for slot in slots {
        println!(
            "#{:<3} {} - {}  (gap until {})",
            slot.id, slot.presentation_start, slot.presentation_end, slot.gap_end
        );
    }
}

fn print_schedule(schedule: &Schedule) {
    println!("Schedule for {}", schedule.date());
    for item in schedule.items() {
        let who = item.project_name.as_deref().unwrap_or("(unassigned)");
        println!(
            "#{:<3} {} - {}  {}",
            item.slot.id, item.slot.presentation_start, item.slot.presentation_end, who
        );
    }
    let spare: Vec<&str> = schedule.unclaimed().map(|c| c.name.as_str()).collect();
    if !spare.is_empty() {
        println!("Unscheduled: {}", spare.join(", "));
    }
}

async fn plan<B: ScheduleBackend>(
    session: PlanningSession<B>,
    config: ScheduleConfig,
    date: NaiveDate,
    selected: &[Uuid],
    save: bool,
) -> anyhow::Result<()> {
    // Existing assignments keep their attachments when re-prepared
    let preselected: Vec<Candidate> = match session.schedule() {
        Some(existing) => {
            let mut claimed: Vec<Candidate> = existing.claimed().cloned().collect();
            claimed.retain(|c| !selected.contains(&c.id));
            selected
                .iter()
                .map(|id| Candidate::new(*id, ""))
                .chain(claimed)
                .collect()
        }
        None => selected.iter().map(|id| Candidate::new(*id, "")).collect(),
    };

    session.prepare(config, date, &preselected).await?;
    let schedule = session
        .schedule()
        .ok_or_else(|| anyhow::anyhow!("No schedule was prepared"))?;
    print_schedule(&schedule);

    if save {
        if let Some(record) = session.save().await? {
            println!("Saved schedule {}", record.id);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Some(Commands::Serve { port, db }) => {
            let mut config = ServerConfig::from_env();
            if let Some(port) = port {
                config.port = port;
            }
            if db.is_some() {
                config.db_path = db;
            }
            serve(config).await?;
        }
        Some(Commands::Slots {
            day,
            write_defaults,
        }) => {
            let config = day.resolve()?;
            config.validate()?;
            if write_defaults {
                let path = config::schedule_config_path()?;
                config::save_schedule_file(&path, &config)?;
                println!("Saved defaults to {}", path.display());
            }
            let slots = generate_slots(
                config.start_time,
                config.end_time,
                config.presentation_length_minutes,
                config.gap_between_minutes,
                &config.breaks(),
            );
            print_slots(&slots);
        }
        Some(Commands::Plan {
            day,
            date,
            selected,
            schedule,
            local,
            save,
        }) => {
            let config = day.resolve()?;
            if local {
                let db = open_database(ServerConfig::from_env().db_path)?;
                let session = match schedule {
                    Some(id) => {
                        let record = db
                            .get_schedule(id)?
                            .ok_or_else(|| anyhow::anyhow!("Schedule {} not found", id))?;
                        PlanningSession::resume(db, &record)
                    }
                    None => PlanningSession::new(db),
                };
                plan(session, config, date, &selected, save).await?;
            } else {
                let client = SchedulerClient::from_env();
                let session = match schedule {
                    Some(id) => {
                        let record = client.get_schedule(id).await?;
                        PlanningSession::resume(client, &record)
                    }
                    None => PlanningSession::new(client),
                };
                plan(session, config, date, &selected, save).await?;
            }
        }
        None => serve(ServerConfig::from_env()).await?,
    }

    Ok(())
}
