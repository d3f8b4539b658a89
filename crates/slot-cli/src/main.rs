//! `slots` CLI — compute availability, export it as CSV and check slot conflicts.
//!
//! ## Usage
//!
//! ```sh
//! # Availability for a week, events read from stdin
//! echo '[]' | slots check --from 2024-06-03 --to 2024-06-09
//!
//! # Same, from a file, as CSV in Berlin time
//! slots check --from 2024-06-03 --to 2024-06-09 -i events.json --timezone Europe/Berlin --format csv
//!
//! # Custom rules and buffer from a TOML file
//! slots check --from 2024-06-03 --to 2024-06-09 -i events.json --config rules.toml
//!
//! # Common free time of several users
//! slots group --from 2024-06-03 --to 2024-06-07 -i team.json
//!
//! # Which proposed slots collide with existing events
//! slots conflicts --slots proposed.json -i events.json
//! ```
//!
//! Diagnostics go to stderr and follow `RUST_LOG` (default `warn`).

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::de::DeserializeOwned;
use slot_engine::config::parse_timezone;
use slot_engine::{
    export_csv, find_conflicts, AvailabilityEngine, AvailabilitySnapshot, EngineConfig,
    ScheduledEvent, TimeSlot, UserSchedule,
};
use std::io::{self, Read};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "slots", version, about = "Availability slot engine CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute your own availability against a list of events
    Check {
        #[command(flatten)]
        range: RangeArgs,
        /// JSON array of events (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Compute availability for several users and their common free slots
    Group {
        #[command(flatten)]
        range: RangeArgs,
        /// JSON array of `{userId, profile, events}` (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// List overlaps between proposed slots and events (no buffer applied)
    Conflicts {
        /// JSON array of `{start, end}` slots
        #[arg(long)]
        slots: String,
        /// JSON array of events (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
}

#[derive(Args)]
struct RangeArgs {
    /// First day, inclusive (YYYY-MM-DD)
    #[arg(long)]
    from: NaiveDate,
    /// Last day, inclusive (YYYY-MM-DD)
    #[arg(long)]
    to: NaiveDate,
    /// IANA timezone for slot windows and CSV times (overrides the config file)
    #[arg(long)]
    timezone: Option<String>,
    /// TOML file with `timezone`, `buffer_minutes` and `[rules]`
    #[arg(long)]
    config: Option<String>,
}

#[derive(Args)]
struct OutputArgs {
    #[arg(long, value_enum, default_value_t = Format::Json)]
    format: Format,
    /// Output file (writes to stdout if omitted)
    #[arg(short, long)]
    output: Option<String>,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Json,
    Csv,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    match Cli::parse().command {
        Commands::Check {
            range,
            input,
            output,
        } => {
            let engine = build_engine(&range)?;
            let events: Vec<ScheduledEvent> =
                parse_json(&read_input(input.as_deref())?, "events")?;
            debug!(events = events.len(), "loaded events");
            let snapshot = engine.compute_availability(range.from, range.to, &events);
            write_snapshot(&snapshot, &engine, &output)?;
        }
        Commands::Group {
            range,
            input,
            output,
        } => {
            let engine = build_engine(&range)?;
            let users: Vec<UserSchedule> = parse_json(&read_input(input.as_deref())?, "users")?;
            debug!(users = users.len(), "loaded user schedules");
            let snapshot = engine.compute_group_availability(range.from, range.to, &users);
            info!(
                common = snapshot.summary.common_free_slots.len(),
                "computed group availability"
            );
            write_snapshot(&snapshot, &engine, &output)?;
        }
        Commands::Conflicts {
            slots,
            input,
            output,
        } => {
            let slots: Vec<TimeSlot> = parse_json(&read_file(&slots)?, "slots")?;
            let events: Vec<ScheduledEvent> =
                parse_json(&read_input(input.as_deref())?, "events")?;
            let conflicts = find_conflicts(&slots, &events);
            debug!(conflicts = conflicts.len(), "checked slots");
            let json = serde_json::to_string_pretty(&conflicts)?;
            write_output(output.as_deref(), &format!("{json}\n"))?;
        }
    }

    Ok(())
}

/// Engine from the optional config file, with `--timezone` applied on top.
fn build_engine(range: &RangeArgs) -> Result<AvailabilityEngine> {
    if range.from > range.to {
        anyhow::bail!(
            "--from ({}) must not be after --to ({})",
            range.from,
            range.to
        );
    }

    let mut config = match range.config.as_deref() {
        Some(path) => toml::from_str::<EngineConfig>(&read_file(path)?)
            .with_context(|| format!("Failed to parse config file: {}", path))?,
        None => EngineConfig::default(),
    };
    if let Some(timezone) = range.timezone.as_deref() {
        config.timezone = parse_timezone(timezone)?;
    }
    debug!(timezone = %config.timezone, buffer = config.buffer_minutes, "engine configured");

    AvailabilityEngine::from_config(config).context("Invalid engine configuration")
}

fn write_snapshot(
    snapshot: &AvailabilitySnapshot,
    engine: &AvailabilityEngine,
    output: &OutputArgs,
) -> Result<()> {
    let rendered = match output.format {
        Format::Json => format!("{}\n", serde_json::to_string_pretty(snapshot)?),
        Format::Csv => export_csv(snapshot, &engine.config().timezone),
    };
    write_output(output.output.as_deref(), &rendered)
}

fn parse_json<T: DeserializeOwned>(raw: &str, what: &str) -> Result<T> {
    serde_json::from_str(raw).with_context(|| format!("Failed to parse {} JSON", what))
}

fn read_file(path: &str) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path))
}

fn read_input(path: Option<&str>) -> Result<String> {
    match path {
        Some(path) => read_file(path),
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}

fn write_output(path: Option<&str>, content: &str) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write file: {}", path))?;
        }
        None => {
            print!("{}", content);
        }
    }
    Ok(())
}
