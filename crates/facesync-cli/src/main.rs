use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use facesync_core::push::drain_day;
use facesync_core::{AttendanceApi, AttendanceCache, Config, EmployeeCode};
use facesync_erp::ErpClient;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "facesync", about = "facesync attendance tools")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, global = true, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a day's cached attendance to ERPNext and clear what was accepted
    Push {
        /// Day to push (YYYY-MM-DD); defaults to today
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },
    /// Print the cached attendance for a day
    Status {
        /// Day to show (YYYY-MM-DD); defaults to today
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },
    /// Look up an employee's shift in ERPNext
    Shift {
        /// Employee code
        employee: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)
        .with_context(|| format!("loading configuration from {}", cli.config.display()))?;
    let today = Local::now().date_naive();

    match cli.command {
        Commands::Push { date } => {
            let date = date.unwrap_or(today);
            let api = ErpClient::from_config(&config)?;
            let mut cache = AttendanceCache::load(&config.cache_path);

            let report = drain_day(&mut cache, &api, date)?;
            println!(
                "{date}: {} pushed, {} failed",
                report.forwarded.len(),
                report.failed.len()
            );
            for employee in &report.failed {
                tracing::warn!(employee = %employee, %date, "attendance not accepted; kept in cache");
            }
            if !report.failed.is_empty() {
                bail!("{} record(s) were not accepted; rerun to retry", report.failed.len());
            }
        }
        Commands::Status { date } => {
            let date = date.unwrap_or(today);
            let cache = AttendanceCache::load(&config.cache_path);
            match cache.day(date) {
                Some(day) => println!("{}", serde_json::to_string_pretty(day)?),
                None => println!("{date}: no cached attendance"),
            }
        }
        Commands::Shift { employee } => {
            let api = ErpClient::from_config(&config)?;
            let code = EmployeeCode::new(employee);
            match api.fetch_shift(&code) {
                Ok(shift) => println!("{code}: {} - {}", shift.start, shift.end),
                Err(e) => {
                    tracing::error!(employee = %code, operation = "fetch_shift", reason = %e, "shift lookup failed");
                    bail!("{code}: {e}")
                }
            }
        }
    }

    Ok(())
}
