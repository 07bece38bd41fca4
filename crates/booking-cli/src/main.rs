//! `booking` CLI — check sitter availability and admit bookings from the command line.
//!
//! State lives in a JSON snapshot (sitters, settings, slots, bookings). Every
//! subcommand prints JSON to stdout; logs go to stderr.
//!
//! ## Usage
//!
//! ```sh
//! # How a free-form time is read
//! booking parse-time "5 PM"
//!
//! # Preview the daily intervals of a range
//! booking expand --start-date 2024-06-01 --end-date 2024-06-03
//!
//! # Full diagnostic availability check
//! booking check -s state.json --sitter sitter-1 --start-date 2024-06-10 --end-date 2024-06-12
//!
//! # Admit a booking and write the updated snapshot
//! booking book -s state.json --client client-9 --sitter sitter-1 \
//!     --start-date 2024-06-10 --end-date 2024-06-12 -o state.next.json
//!
//! # Active sitters free for a range
//! booking sitters -s state.json --start-date 2024-06-10 --end-date 2024-06-10 --pet-type dog
//! ```

use std::collections::BTreeSet;

use anyhow::{Context, Result};
use booking_engine::time::{self, format_minutes, parse_request_date, try_parse_time};
use booking_engine::{
    AvailabilityQuery, BookingRequest, ClientId, ClockTime, EngineConfig, LogNotifier,
    RangeExpander, Scheduler, ServiceDetails, SitterId, SitterSearch, Snapshot,
};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(
    name = "booking",
    version,
    about = "Sitter availability and booking admission"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Engine configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Business timezone, overriding the configuration (IANA name)
    #[arg(long, global = true)]
    timezone: Option<String>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Show how a free-form time of day is interpreted
    ParseTime {
        text: String,
        /// Value used when the text does not match (HH:mm); defaults to the configured start time
        #[arg(long)]
        fallback: Option<ClockTime>,
    },
    /// Expand a date range into daily intervals
    Expand {
        #[command(flatten)]
        range: RangeArgs,
        /// Per-day amount in cents
        #[arg(long)]
        rate: Option<u64>,
    },
    /// Run every availability rule for a sitter and range
    Check {
        /// Snapshot file
        #[arg(short, long)]
        state: String,
        #[arg(long)]
        sitter: String,
        #[command(flatten)]
        range: RangeArgs,
        /// Reference instant for the advance-notice rule (RFC 3339); defaults to now
        #[arg(long)]
        now: Option<DateTime<Utc>>,
    },
    /// Admit a booking request and write the updated snapshot
    Book {
        /// Snapshot file
        #[arg(short, long)]
        state: String,
        /// Where to write the updated snapshot (overwrites --state if omitted)
        #[arg(short, long)]
        output: Option<String>,
        #[arg(long)]
        client: String,
        #[arg(long)]
        sitter: Option<String>,
        #[command(flatten)]
        range: RangeArgs,
        #[arg(long, default_value = "pet_sitting")]
        service_type: String,
        #[arg(long, default_value_t = 1)]
        pet_count: u8,
        /// Pet type (repeatable)
        #[arg(long = "pet-type")]
        pet_types: Vec<String>,
        #[arg(long)]
        notes: Option<String>,
        /// Per-day amount in cents
        #[arg(long)]
        rate: Option<u64>,
        /// Creation timestamp (RFC 3339); defaults to now
        #[arg(long)]
        now: Option<DateTime<Utc>>,
    },
    /// List active sitters free for every day of a range
    Sitters {
        /// Snapshot file
        #[arg(short, long)]
        state: String,
        #[command(flatten)]
        range: RangeArgs,
        /// Required pet type (repeatable)
        #[arg(long = "pet-type")]
        pet_types: Vec<String>,
    },
}

#[derive(Args)]
struct RangeArgs {
    /// First day (YYYY-MM-DD or RFC 3339)
    #[arg(long, value_parser = date_arg)]
    start_date: NaiveDate,
    /// Last day, inclusive
    #[arg(long, value_parser = date_arg)]
    end_date: NaiveDate,
    /// Daily start time ("09:00", "9 AM", "9")
    #[arg(long)]
    start_time: Option<String>,
    /// Daily end time
    #[arg(long)]
    end_time: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(cli.config.as_deref(), cli.timezone.as_deref())?;

    match cli.command {
        Commands::ParseTime { text, fallback } => {
            let fallback = fallback.unwrap_or(config.default_start_time);
            let matched = try_parse_time(&text);
            let minutes = matched.unwrap_or(fallback.minutes());
            print_json(&json!({
                "input": text,
                "matched": matched.is_some(),
                "minutes": minutes,
                "time": format_minutes(minutes),
            }))?;
        }
        Commands::Expand { range, rate } => {
            let intervals = RangeExpander::new(&config)
                .intervals(
                    range.start_date,
                    range.end_date,
                    range.start_time.as_deref(),
                    range.end_time.as_deref(),
                )
                .context("Failed to expand date range")?;
            let daily_rate = rate.unwrap_or(config.default_daily_rate);
            let total_amount = daily_rate
                .checked_mul(intervals.len() as u64)
                .with_context(|| {
                    format!(
                        "Total for {} days at {} cents per day is out of range",
                        intervals.len(),
                        daily_rate
                    )
                })?;
            print_json(&json!({
                "timezone": config.timezone.name(),
                "days": intervals.len(),
                "daily_rate": daily_rate,
                "total_amount": total_amount,
                "intervals": intervals,
            }))?;
        }
        Commands::Check {
            state,
            sitter,
            range,
            now,
        } => {
            let (_, mut scheduler) = load_state(&state, config)?;
            let query = AvailabilityQuery {
                sitter_id: SitterId::new(sitter),
                start_date: range.start_date,
                end_date: range.end_date,
                start_time: range.start_time,
                end_time: range.end_time,
            };
            let report = scheduler
                .check_availability(&query, now.unwrap_or_else(Utc::now))
                .context("Failed to check availability")?;
            let mut value = serde_json::to_value(&report)?;
            value["messages"] = json!(report.messages());
            print_json(&value)?;
        }
        Commands::Book {
            state,
            output,
            client,
            sitter,
            range,
            service_type,
            pet_count,
            pet_types,
            notes,
            rate,
            now,
        } => {
            let (mut snapshot, mut scheduler) = load_state(&state, config)?;
            let request = BookingRequest {
                client_id: ClientId::new(client),
                sitter_id: sitter.map(SitterId::new),
                start_date: range.start_date,
                end_date: range.end_date,
                start_time: range.start_time,
                end_time: range.end_time,
                service: ServiceDetails {
                    service_type,
                    pet_count,
                    pet_types: pet_types.into_iter().collect(),
                    notes,
                },
                daily_rate: rate,
            };
            let admission = scheduler
                .create_booking(request, now.unwrap_or_else(Utc::now))
                .context("Booking request rejected")?;

            snapshot.refresh(&scheduler);
            let target = output.as_deref().unwrap_or(&state);
            let content = snapshot
                .to_json_pretty()
                .context("Failed to serialize snapshot")?;
            std::fs::write(target, content)
                .with_context(|| format!("Failed to write file: {}", target))?;
            tracing::info!(path = target, "snapshot written");

            print_json(&admission)?;
        }
        Commands::Sitters {
            state,
            range,
            pet_types,
        } => {
            let (_, scheduler) = load_state(&state, config)?;
            let search = SitterSearch {
                start_date: range.start_date,
                end_date: range.end_date,
                start_time: range.start_time,
                end_time: range.end_time,
                pet_types: pet_types.into_iter().collect::<BTreeSet<_>>(),
            };
            let sitters = scheduler
                .find_available_sitters(&search)
                .context("Failed to search sitters")?;
            print_json(&sitters)?;
        }
    }

    Ok(())
}

/// Logs go to stderr so stdout stays machine-readable. `RUST_LOG` wins over `-v`.
fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_config(path: Option<&str>, timezone: Option<&str>) -> Result<EngineConfig> {
    let mut config = match path {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("Failed to load config: {}", path))?,
        None => EngineConfig::default(),
    };
    if let Some(name) = timezone {
        config.timezone = time::parse_timezone(name).context("Invalid --timezone")?;
    }
    tracing::debug!(timezone = %config.timezone, "configuration loaded");
    Ok(config)
}

fn load_state(path: &str, config: EngineConfig) -> Result<(Snapshot, Scheduler)> {
    let json =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path))?;
    let snapshot = Snapshot::from_json(&json)
        .with_context(|| format!("Failed to parse snapshot: {}", path))?;
    let scheduler = snapshot
        .to_scheduler(config, LogNotifier)
        .with_context(|| format!("Snapshot {} is inconsistent", path))?;
    Ok((snapshot, scheduler))
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    let pretty = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", pretty);
    Ok(())
}

fn date_arg(s: &str) -> std::result::Result<NaiveDate, String> {
    parse_request_date(s).map_err(|e| e.to_string())
}
