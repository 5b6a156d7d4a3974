use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tabled::{settings::Style, Table, Tabled};

use pulsecoach::config::AppConfig;
use pulsecoach::error::ErrorSeverity;
use pulsecoach::education::{default_catalogue, EducationPlanner};
use pulsecoach::logging::{init_logging, LogLevel};
use pulsecoach::seed::DemoDataGenerator;
use pulsecoach::simulation::{ChatMessage, CoachResponder, DelayedTasks, DeviceSync};
use pulsecoach::{
    Dashboard, JsonFileStore, Priority, PulseCoachError, Recommendation, RecordStore, StoreError,
};

/// PulseCoach - Sleep and Recovery Coaching CLI
///
/// Tracks sleep and recovery records, summarizes trends over a rolling
/// window and turns the latest readings into prioritized recommendations.
#[derive(Parser)]
#[command(name = "pulsecoach")]
#[command(version)]
#[command(about = "Sleep and recovery coaching CLI", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Overrides the record store directory
    #[arg(short, long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fill the store with generated demo records
    Seed {
        /// Number of days ending today
        #[arg(short = 'n', long, default_value = "30")]
        days: u32,

        /// Seed for reproducible data
        #[arg(short, long)]
        seed: Option<u64>,
    },

    /// Show sleep and recovery trends
    Trends {
        /// Window in days (default from config)
        #[arg(short = 'n', long)]
        days: Option<u32>,
    },

    /// Show recommendations for the latest records
    Recommend,

    /// Print the full dashboard overview as JSON
    Overview {
        /// Window in days (default from config)
        #[arg(short = 'n', long)]
        days: Option<u32>,
    },

    /// Send a message to the coach and wait for the reply
    Chat {
        /// Message text
        message: String,
    },

    /// Simulate a wearable sync for a day
    Sync {
        /// Day to sync (YYYY-MM-DD, default today)
        #[arg(long)]
        date: Option<String>,
    },

    /// Suggest learning modules for the current readings
    Modules,

    /// Show configuration
    Config {
        /// Print the effective configuration
        #[arg(short, long)]
        list: bool,

        /// Write the effective configuration to the config path
        #[arg(short, long)]
        save: bool,
    },
}

#[derive(Tabled)]
struct TrendRow {
    #[tabled(rename = "Metric")]
    metric: &'static str,
    #[tabled(rename = "Average")]
    average: String,
}

impl TrendRow {
    fn new(metric: &'static str, average: String) -> Self {
        Self { metric, average }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load_or_default(cli.config.as_deref());
    config.logging.level = LogLevel::from_verbosity(config.logging.level, cli.verbose);
    init_logging(&config.logging)?;

    if let Some(dir) = &cli.data_dir {
        config.settings.data_dir = dir.clone();
    }

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;

    match run(cli, config, &runtime) {
        Ok(()) => Ok(()),
        Err(e) => match e.downcast_ref::<PulseCoachError>() {
            Some(err) => {
                match err.severity() {
                    ErrorSeverity::Warning => tracing::warn!(error = %err, "Command refused"),
                    _ => tracing::error!(error = %err, "Command failed"),
                }
                eprintln!("{} {}", "✗".red().bold(), err.user_message());
                std::process::exit(1);
            }
            None => Err(e),
        },
    }
}

fn run(cli: Cli, mut config: AppConfig, runtime: &tokio::runtime::Runtime) -> Result<()> {
    let store = Arc::new(JsonFileStore::open(&config.settings.data_dir)?);
    let demo_seed = config.simulation.seed;
    let generator = move || match demo_seed {
        Some(seed) => DemoDataGenerator::with_seed(seed),
        None => DemoDataGenerator::from_entropy(),
    };

    match cli.command {
        Commands::Seed { days, seed } => {
            println!("{}", "Seeding demo records...".green().bold());
            let mut demo = match seed {
                Some(seed) => DemoDataGenerator::with_seed(seed),
                None => generator(),
            };
            let (sleep, recovery) = demo.history(Utc::now().date_naive(), days);

            let mut added = 0;
            let mut skipped = 0;
            for record in sleep {
                tally(store.add_sleep(record), &mut added, &mut skipped)?;
            }
            for record in recovery {
                tally(store.add_recovery(record), &mut added, &mut skipped)?;
            }

            println!("  Store: {}", store.dir().display());
            println!("  Added: {}  Skipped (already present): {}", added, skipped);
            println!("{}", "✓ Seeding completed".green());
        }

        Commands::Trends { days } => {
            let days = days.unwrap_or(config.settings.default_window_days);
            let dashboard = Dashboard::new(Arc::clone(&store), config.thresholds.clone());
            let sleep = dashboard.sleep_trend(days)?;
            let recovery = dashboard.recovery_trend(days)?;

            println!("{}", format!("Trends over the last {} days", days).cyan().bold());
            println!(
                "  {} sleep records, {} recovery records",
                sleep.record_count, recovery.record_count
            );

            let rows = vec![
                TrendRow::new("Sleep duration (h)", format!("{:.1}", sleep.average_duration)),
                TrendRow::new("Sleep quality", format!("{:.0}", sleep.average_quality)),
                TrendRow::new("Sleep efficiency (%)", format!("{:.0}", sleep.average_efficiency)),
                TrendRow::new("Overnight HRV (ms)", format!("{:.0}", sleep.average_hrv)),
                TrendRow::new("Readiness", format!("{:.0}", recovery.average_readiness)),
                TrendRow::new("Recovery", format!("{:.0}", recovery.average_recovery)),
                TrendRow::new("Strain", format!("{:.1}", recovery.average_strain)),
                TrendRow::new("Stress", format!("{:.0}", recovery.average_stress)),
                TrendRow::new("Body battery", format!("{:.0}", recovery.average_body_battery)),
            ];
            println!("{}", Table::new(rows).with(Style::rounded()));
            println!("  Sleep quality trend: {:?}", sleep.direction);
            println!("  Readiness trend: {:?}", recovery.direction);
        }

        Commands::Recommend => {
            let dashboard = Dashboard::new(Arc::clone(&store), config.thresholds.clone());
            let recommendations = dashboard.recommendations()?;
            println!("{}", "Recommendations".magenta().bold());
            for rec in &recommendations {
                print_recommendation(rec);
            }
        }

        Commands::Overview { days } => {
            let days = days.unwrap_or(config.settings.default_window_days);
            let dashboard = Dashboard::new(Arc::clone(&store), config.thresholds.clone());
            let overview = dashboard.overview(days)?;
            println!("{}", serde_json::to_string_pretty(&overview)?);
        }

        Commands::Chat { message } => {
            let responder = CoachResponder::new(
                DelayedTasks::new(),
                Arc::new(Mutex::new(generator())),
                config.simulation.coach_reply_delay(),
            );
            let message = ChatMessage::from_user(message);
            println!("{} {}", "You:".bold(), message.content);
            println!("{}", "Coach is typing...".dimmed());

            let reply = runtime.block_on(async { responder.respond(&message).join().await })?;
            if let Some(reply) = reply {
                println!("{} {}", "Coach:".green().bold(), reply.content);
            }
        }

        Commands::Sync { date } => {
            let date = match date {
                Some(d) => NaiveDate::parse_from_str(&d, "%Y-%m-%d")
                    .with_context(|| format!("Invalid date: {} (expected YYYY-MM-DD)", d))?,
                None => Utc::now().date_naive(),
            };
            let sync = DeviceSync::new(
                Arc::clone(&store),
                DelayedTasks::new(),
                Arc::new(Mutex::new(generator().with_source("wearable"))),
                config.simulation.device_sync_delay(),
            );
            println!("{}", format!("Syncing device data for {}...", date).yellow().bold());

            let outcome = runtime.block_on(async { sync.sync_day(date).join().await })?;
            if let Some(result) = outcome {
                result?;
                println!("{}", "✓ Sync completed".yellow());
            }
        }

        Commands::Modules => {
            let catalogue = default_catalogue();
            let sleep = store.latest_sleep()?;
            let recovery = store.latest_recovery()?;
            let picks = EducationPlanner::recommend_modules(
                &config.thresholds,
                sleep.as_ref(),
                recovery.as_ref(),
                &catalogue,
                &[],
            );

            println!("{}", "Suggested learning modules".blue().bold());
            for module in picks {
                println!(
                    "  • {} ({:?}, {} lessons, {} min)",
                    module.title, module.difficulty, module.lessons, module.duration_minutes
                );
            }
        }

        Commands::Config { list, save } => {
            if list {
                println!("{}", toml::to_string_pretty(&config)?);
            }
            if save {
                let path = cli.config.unwrap_or_else(AppConfig::default_config_path);
                config.save_to_file(&path)?;
                println!("{} {}", "✓ Configuration saved to".white(), path.display());
            }
            if !list && !save {
                println!("Config file: {}", AppConfig::default_config_path().display());
                println!("Data directory: {}", config.settings.data_dir.display());
            }
        }
    }

    Ok(())
}

/// Count an insert, treating duplicates as already seeded
fn tally(result: pulsecoach::Result<()>, added: &mut u32, skipped: &mut u32) -> Result<()> {
    match result {
        Ok(()) => *added += 1,
        Err(PulseCoachError::Store(StoreError::Duplicate { .. })) => *skipped += 1,
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

fn print_recommendation(rec: &Recommendation) {
    let badge = match rec.priority {
        Priority::Critical => "CRITICAL".red().bold(),
        Priority::High => "HIGH".red(),
        Priority::Medium => "MEDIUM".yellow(),
        Priority::Low => "LOW".normal(),
    };
    println!(
        "\n[{}] {} ({}, {}% confidence)",
        badge,
        rec.title.bold(),
        rec.kind,
        rec.confidence
    );
    println!("  {}", rec.description);
    println!("  {}", rec.reasoning.dimmed());
    for (i, action) in rec.action_items.iter().enumerate() {
        println!("  {}. {}", i + 1, action);
    }
    println!("  Impact: {}  Timeframe: {}", rec.expected_impact, rec.timeframe);
}
