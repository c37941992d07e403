use std::path::PathBuf;

use anyhow::Context;
use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::warn;
use tracing_subscriber::EnvFilter;

mod aggregate;
mod analyzer;
mod classify;
mod config;
mod db;
mod error;
mod fetch_gate;
mod models;
mod report;
mod seed;
mod select;
mod session;
mod store;

use config::NetStatsConfig;
use db::PgSampleStore;
use error::NetStatsError;
use fetch_gate::FixedProbe;
use models::LiveLinkInfo;
use session::NetStats;
use store::{Backend, MemoryStore, SampleStore};

#[derive(Parser)]
#[command(name = "netstats-planner")]
#[command(about = "Plans data fetches around historical Wi-Fi and mobile link quality", long_about = None)]
struct Cli {
    /// JSON file overriding thresholds, lookahead, bucket width, or seeding
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Use a freshly seeded in-memory store instead of Postgres
    #[arg(long, global = true)]
    in_memory: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct WindowArgs {
    /// Day to analyse (defaults to today)
    #[arg(long)]
    date: Option<NaiveDate>,
    /// Plan as if it were this time of day, HH:MM (defaults to now)
    #[arg(long, value_parser = parse_time_of_day)]
    at: Option<NaiveTime>,
}

impl WindowArgs {
    fn resolve(&self) -> (NaiveDate, NaiveDateTime) {
        let local = Local::now().naive_local();
        let date = self.date.unwrap_or(local.date());
        let now = self.at.map(|time| date.and_time(time)).unwrap_or(local);
        (date, now)
    }
}

fn parse_time_of_day(value: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(value, "%H:%M").map_err(|err| format!("expected HH:MM: {err}"))
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Generate synthetic history for the weeks before today
    Seed {
        #[arg(long)]
        weeks: Option<u32>,
    },
    /// Import raw samples from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Classify the day's slots and list the usable ones
    Analyze {
        #[command(flatten)]
        window: WindowArgs,
    },
    /// Recommend the next time to fetch
    Next {
        #[command(flatten)]
        window: WindowArgs,
        /// Use the first usable bucket instead of the within-the-hour policy
        #[arg(long)]
        coarse: bool,
    },
    /// Check whether a live link reading is good enough to fetch right now
    Fetchable {
        #[arg(long)]
        connected: bool,
        #[arg(long)]
        link_speed: f64,
        #[arg(long)]
        signal_strength: f64,
    },
    /// Generate a markdown report
    Report {
        #[command(flatten)]
        window: WindowArgs,
        #[arg(long, default_value = "fetch-windows.md")]
        out: PathBuf,
    },
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_env("NETSTATS_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn postgres(config: &NetStatsConfig) -> anyhow::Result<PgSampleStore> {
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a Postgres instance (or pass --in-memory)")?;
    PgSampleStore::connect(&database_url, config.bucket_minutes).await
}

async fn backend(in_memory: bool, config: &NetStatsConfig) -> anyhow::Result<Backend> {
    if in_memory {
        return Ok(Backend::Memory(MemoryStore::new(config.bucket_minutes)));
    }
    Ok(Backend::Postgres(postgres(config).await?))
}

/// Opens the store, runs the initial analysis, and re-runs it for `--date`
/// when that is not today.
async fn planner(
    store: Backend,
    config: &NetStatsConfig,
    window: &WindowArgs,
    cancel: &CancellationToken,
) -> anyhow::Result<(NetStats<Backend>, NaiveDateTime)> {
    let (date, now) = window.resolve();
    let stats = NetStats::new(store, config.clone());
    stats.init(now, cancel).await?;
    if date != now.date() {
        stats.run_analysis(Some(date), now, cancel).await?;
    }
    Ok((stats, now))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = NetStatsConfig::load(cli.config.as_deref())?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted; cancelling pending store operations");
            on_interrupt.cancel();
        }
    });

    match cli.command {
        Commands::InitDb => {
            let store = postgres(&config).await?;
            db::init_db(store.pool()).await?;
            println!("Schema ready.");
        }
        Commands::Seed { weeks } => {
            let store = postgres(&config).await?;
            let mut plan = config.seed.clone();
            if let Some(weeks) = weeks {
                plan.weeks = weeks;
            }
            let today = Local::now().date_naive();
            let samples = seed::generate(&plan, config.bucket_minutes, today);
            store.stage_samples(samples).await;
            let inserted = store.save().await?;
            println!("Inserted {inserted} synthetic samples.");
        }
        Commands::Import { csv } => {
            let store = postgres(&config).await?;
            let inserted = db::import_csv(&store, &csv).await?;
            println!("Inserted {inserted} samples from {}.", csv.display());
        }
        Commands::Analyze { window } => {
            let store = backend(cli.in_memory, &config).await?;
            let (stats, _) = planner(store, &config, &window, &cancel).await?;
            let session = stats.session();

            println!(
                "{} ({}): {} Wi-Fi slots, {} mobile fallback slots",
                session.date,
                session.date.format("%A"),
                session.wifi_slots.len(),
                session.mobile_slots.len()
            );
            for slot in &session.wifi_slots {
                println!(
                    "- wifi   {} link {:.1} signal {:.1} ({:.0} B/s)",
                    slot.time().format("%H:%M"),
                    slot.summary.avg_wifi_link_speed,
                    slot.summary.avg_wifi_signal_strength,
                    slot.summary.avg_wifi_bytes_per_second
                );
            }
            for slot in &session.mobile_slots {
                println!(
                    "- mobile {} signal {:.1} ({:.0} B/s)",
                    slot.time().format("%H:%M"),
                    slot.summary.avg_mobile_signal_strength,
                    slot.summary.avg_mobile_bytes_per_second
                );
            }
            if !session.corrupt_buckets.is_empty() {
                println!(
                    "Skipped {} buckets with no samples.",
                    session.corrupt_buckets.len()
                );
            }
        }
        Commands::Next { window, coarse } => {
            let store = backend(cli.in_memory, &config).await?;
            let (stats, now) = planner(store, &config, &window, &cancel).await?;

            if coarse {
                match stats.next_coarse_window(now) {
                    Ok(at) => println!("Next good window starts at {}.", at.format("%H:%M")),
                    Err(NetStatsError::NoGoodTimeToday) => {
                        println!("No good connection time was found for today.")
                    }
                    Err(err) => return Err(err.into()),
                }
            } else {
                let recommendation = stats.next_best_slot(now)?;
                println!("Next fetch: {}", report::describe_recommendation(&recommendation));
                if let Some(slot) = recommendation.slot() {
                    println!(
                        "Wi-Fi usable: {}, mobile usable: {}",
                        slot.wifi_usable, slot.mobile_usable
                    );
                }
            }
        }
        Commands::Fetchable {
            connected,
            link_speed,
            signal_strength,
        } => {
            let probe = FixedProbe(LiveLinkInfo {
                connected,
                link_speed,
                signal_strength,
            });
            // The live check never touches history, so an unopened store is enough.
            let stats = NetStats::new(MemoryStore::new(config.bucket_minutes), config.clone());
            if stats.is_fetchable_now(&probe) {
                println!("Fetchable now.");
            } else {
                println!("Not fetchable now.");
            }
        }
        Commands::Report { window, out } => {
            let store = backend(cli.in_memory, &config).await?;
            let (stats, now) = planner(store, &config, &window, &cancel).await?;
            let recommendation = stats.next_best_slot(now)?;
            let report = report::build_report(&stats.session(), now, &recommendation);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
