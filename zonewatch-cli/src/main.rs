//! ZoneWatch CLI — timeline, extraction, monitoring and watchlist commands.
//!
//! Commands:
//! - `resolve` — show the fetch day and mode for an execute day
//! - `extract` — extract and store zones for symbols on a fetch day
//! - `decode add|list` — manage the decode list of a day
//! - `track` — extract missing zones and add symbols to an execute day
//! - `monitor` — evaluate a decode list (optionally alerts only, JSON, or watch)
//! - `alerts` — shorthand for `monitor --alerts`
//! - `zones` — list stored zones for a symbol and fetch day
//! - `calendar` — list trading days in a range
//! - `watchlist save|list|load|delete` — named timeline + symbol snapshots

use anyhow::{bail, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use zonewatch_core::parse_date;
use zonewatch_runner::{
    AppConfig, DecodeRequest, MonitorReport, NoProgress, ServiceError, StdoutProgress, ZoneService,
    DEFAULT_CONFIG_FILE,
};

#[derive(Parser)]
#[command(
    name = "zonewatch",
    about = "ZoneWatch — intraday supply/demand zone extraction and monitoring"
)]
struct Cli {
    /// Path to the TOML config file. A missing file means defaults.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Debug-level logging (overrides RUST_LOG).
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    /// Treat this date as today (YYYY-MM-DD).
    #[arg(long, global = true, value_parser = date_arg)]
    today: Option<NaiveDate>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the fetch day and mode for an execute day.
    Resolve {
        /// Execute day (YYYY-MM-DD).
        #[arg(value_parser = date_arg)]
        execute_day: NaiveDate,

        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Extract and store zones for symbols on a fetch day.
    Extract {
        #[arg(required = true)]
        symbols: Vec<String>,

        /// Fetch day (YYYY-MM-DD).
        #[arg(long, value_parser = date_arg)]
        date: NaiveDate,

        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Decode-list management.
    Decode {
        #[command(subcommand)]
        action: DecodeAction,
    },
    /// Resolve an execute day, extract missing zones for its fetch day, and
    /// add the symbols to its decode list.
    Track {
        #[arg(required = true)]
        symbols: Vec<String>,

        /// Execute day (YYYY-MM-DD). Defaults to the current trading day.
        #[arg(long, value_parser = date_arg)]
        date: Option<NaiveDate>,
    },
    /// Evaluate the decode list of a day against its zones.
    Monitor {
        /// Decode day (YYYY-MM-DD). Defaults to the current trading day.
        #[arg(long, value_parser = date_arg)]
        date: Option<NaiveDate>,

        /// Only inside and near rows.
        #[arg(long, default_value_t = false)]
        alerts: bool,

        /// Re-run every `monitor.refresh_interval_ms` until interrupted.
        #[arg(long, default_value_t = false)]
        watch: bool,

        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Inside and near rows of a decode list.
    Alerts {
        #[arg(long, value_parser = date_arg)]
        date: Option<NaiveDate>,

        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// List stored zones for a symbol and fetch day.
    Zones {
        symbol: String,

        /// Fetch day (YYYY-MM-DD).
        #[arg(long, value_parser = date_arg)]
        date: NaiveDate,

        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// List trading days in an inclusive range.
    Calendar {
        #[arg(long, value_parser = date_arg)]
        from: NaiveDate,

        #[arg(long, value_parser = date_arg)]
        to: NaiveDate,
    },
    /// Watchlist management.
    Watchlist {
        #[command(subcommand)]
        action: WatchlistAction,
    },
}

#[derive(Subcommand)]
enum DecodeAction {
    /// Add symbols to a decode day. The fetch day is derived unless given.
    Add {
        #[arg(required = true)]
        symbols: Vec<String>,

        /// Decode day (YYYY-MM-DD).
        #[arg(long, value_parser = date_arg)]
        date: NaiveDate,

        /// Fetch day (YYYY-MM-DD); must match the calendar's.
        #[arg(long, value_parser = date_arg)]
        fetch_date: Option<NaiveDate>,
    },
    /// Show the decode list of a day.
    List {
        #[arg(long, value_parser = date_arg)]
        date: NaiveDate,

        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum WatchlistAction {
    /// Save symbols under a name, bound to an execute day.
    Save {
        name: String,

        #[arg(required = true)]
        symbols: Vec<String>,

        /// Execute day (YYYY-MM-DD).
        #[arg(long, value_parser = date_arg)]
        date: NaiveDate,

        #[arg(long, default_value = "")]
        description: String,
    },
    /// List saved watchlists, most recently updated first.
    List {
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Load a watchlist and evaluate it.
    Load {
        name: String,

        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Delete a watchlist.
    Delete { name: String },
}

fn date_arg(s: &str) -> Result<NaiveDate, String> {
    parse_date(s).map_err(|e| e.to_string())
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        match e.downcast_ref::<ServiceError>() {
            Some(service_err) => eprintln!("Error [{}]: {e:#}", service_err.kind().as_str()),
            None => eprintln!("Error: {e:#}"),
        }
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let config = AppConfig::load(&cli.config)?;
    let today = cli.today.unwrap_or_else(|| chrono::Local::now().date_naive());
    debug!(config = %cli.config.display(), %today, "starting");

    // Calendar listing needs no database or data source.
    let command = match cli.command {
        Commands::Calendar { from, to } => return run_calendar(&config, from, to),
        other => other,
    };

    let service = ZoneService::from_config(config, today)?;

    match command {
        Commands::Resolve { execute_day, json } => {
            let ctx = service.resolve(execute_day, today)?;
            if json {
                print_json(&ctx)?;
            } else {
                println!("Execute day: {}", ctx.execute_day);
                println!("Fetch day:   {}", ctx.fetch_day);
                println!("Mode:        {}", ctx.mode);
            }
        }
        Commands::Extract { symbols, date, json } => {
            let report = if json {
                service.extract(&symbols, date, &NoProgress)?
            } else {
                service.extract(&symbols, date, &StdoutProgress)?
            };
            if json {
                print_json(&report)?;
            }
            if report.failed() > 0 {
                bail!("{} of {} symbol(s) failed", report.failed(), report.outcomes.len());
            }
        }
        Commands::Decode { action } => run_decode(&service, action)?,
        Commands::Track { symbols, date } => {
            let execute_day = match date {
                Some(d) => d,
                None => service.resolver().calendar().current_trading_day(today)?,
            };
            let tracked = service.track(&symbols, execute_day, today, &StdoutProgress)?;
            println!(
                "Tracking {} symbol(s) on {} ({} new decode entries)",
                tracked.extraction.outcomes.len(),
                tracked.context,
                tracked.added
            );
            println!();
            print_report(&service.evaluate(Some(tracked.context.execute_day), today)?);
        }
        Commands::Monitor {
            date,
            alerts,
            watch,
            json,
        } => run_monitor(&service, date, cli.today, alerts, watch, json)?,
        Commands::Alerts { date, json } => {
            let report = service.alerts(date, today)?;
            if json {
                print_json(&report)?;
            } else {
                print_report(&report);
            }
        }
        Commands::Zones { symbol, date, json } => {
            let zones = service.zones(&symbol, date)?;
            if json {
                print_json(&zones)?;
            } else if zones.is_empty() {
                println!("No zones stored for {} on {date}.", symbol.trim().to_uppercase());
            } else {
                println!(
                    "{:<6} {:<12} {:<8} {:>10} {:>10} {:<9} {:<20}",
                    "Id", "Symbol", "Type", "Low", "High", "Impulse", "Impulse window"
                );
                println!("{}", "-".repeat(81));
                for stored in &zones {
                    let z = &stored.zone;
                    println!(
                        "{:<6} {:<12} {:<8} {:>10.2} {:>10.2} {:<9} {}–{}",
                        stored.id,
                        z.symbol,
                        z.zone_type.as_str(),
                        z.zone_low,
                        z.zone_high,
                        z.impulse_strength.as_str(),
                        z.impulse_start_time.format("%H:%M"),
                        z.impulse_end_time.format("%H:%M"),
                    );
                }
            }
        }
        Commands::Watchlist { action } => run_watchlist(&service, action, today)?,
        Commands::Calendar { from, to } => run_calendar(service.config(), from, to)?,
    }

    Ok(())
}

fn run_calendar(config: &AppConfig, from: NaiveDate, to: NaiveDate) -> Result<()> {
    if from > to {
        bail!("--from {from} is after --to {to}");
    }
    let calendar = config.calendar.trading_calendar();
    let days = calendar.trading_days_between(from, to);
    for day in &days {
        println!("{day} {}", day.format("%a"));
    }
    println!("{} trading day(s)", days.len());
    Ok(())
}

fn run_decode(service: &ZoneService, action: DecodeAction) -> Result<()> {
    match action {
        DecodeAction::Add {
            symbols,
            date,
            fetch_date,
        } => {
            let fetch_date = match fetch_date {
                Some(f) => f,
                None => service.fetch_day_for(date)?,
            };
            let request = DecodeRequest {
                decode_date: date,
                symbols,
                fetch_date,
            };
            let added = service.add_decode_entries(&request)?;
            println!("Added {added} symbol(s) to {date} (fetch day {fetch_date})");
        }
        DecodeAction::List { date, json } => {
            let entries = service.decode_entries(date)?;
            if json {
                print_json(&entries)?;
            } else if entries.is_empty() {
                println!("Decode list for {date} is empty.");
            } else {
                println!("Decode list for {date}:");
                for entry in &entries {
                    println!("  {:<12} fetch {}", entry.symbol, entry.fetch_date);
                }
            }
        }
    }
    Ok(())
}

fn run_monitor(
    service: &ZoneService,
    date: Option<NaiveDate>,
    today_override: Option<NaiveDate>,
    alerts_only: bool,
    watch: bool,
    json: bool,
) -> Result<()> {
    let interval = Duration::from_millis(service.config().monitor.refresh_interval_ms);
    loop {
        // Re-read the clock each pass so a watch across midnight moves on.
        let today = today_override.unwrap_or_else(|| chrono::Local::now().date_naive());
        let report = if alerts_only {
            service.alerts(date, today)?
        } else {
            service.evaluate(date, today)?
        };
        if json {
            print_json(&report)?;
        } else {
            print_report(&report);
        }
        if !watch {
            return Ok(());
        }
        std::thread::sleep(interval);
        if !json {
            println!();
        }
    }
}

fn run_watchlist(service: &ZoneService, action: WatchlistAction, today: NaiveDate) -> Result<()> {
    match action {
        WatchlistAction::Save {
            name,
            symbols,
            date,
            description,
        } => {
            let mut session = service.session();
            session.set_execute_day(date, today)?;
            session.add_symbols(&symbols)?;
            let saved = service.save_watchlist(&name, &description, &session)?;
            println!(
                "Saved '{}': {} symbol(s), execute {} / fetch {}",
                saved.name,
                saved.symbols.len(),
                saved.execute_day,
                saved.fetch_day
            );
        }
        WatchlistAction::List { json } => {
            let lists = service.list_watchlists()?;
            if json {
                print_json(&lists)?;
            } else if lists.is_empty() {
                println!("No saved watchlists.");
            } else {
                println!("{:<20} {:<12} {:>7}  {:<20} {}", "Name", "Execute", "Symbols", "Updated", "Description");
                println!("{}", "-".repeat(80));
                for wl in &lists {
                    println!(
                        "{:<20} {:<12} {:>7}  {:<20} {}",
                        wl.name,
                        wl.execute_day.to_string(),
                        wl.symbols.len(),
                        wl.updated_at.format("%Y-%m-%d %H:%M"),
                        wl.description
                    );
                }
            }
        }
        WatchlistAction::Load { name, json } => {
            let mut session = service.session();
            let ctx = service.load_watchlist(&name, &mut session, today)?;
            let report = service.evaluate_session(&session)?;
            if json {
                print_json(&report)?;
            } else {
                println!("Loaded '{name}' on {ctx}: {}", session.symbols().join(", "));
                println!();
                print_report(&report);
            }
        }
        WatchlistAction::Delete { name } => {
            if service.delete_watchlist(&name)? {
                println!("Deleted '{name}'.");
            } else {
                bail!("no watchlist named '{name}'");
            }
        }
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_report(report: &MonitorReport) {
    println!("=== Monitor: {} ===", report.context);
    if report.rows.is_empty() {
        println!("(no symbols)");
        return;
    }
    println!(
        "{:<12} {:>10} {:<8} {:>19} {:>9}  {:<20} {:<13}",
        "Symbol", "Price", "Type", "Zone", "Dist %", "Status", "Reaction"
    );
    println!("{}", "-".repeat(97));
    for row in &report.rows {
        let price = row.price.map_or_else(|| "-".to_string(), |p| format!("{p:.2}"));
        let (zone_type, zone) = match &row.zone {
            Some(z) => (z.zone_type.to_string(), format!("{:.2}–{:.2}", z.zone_low, z.zone_high)),
            None => ("-".to_string(), "-".to_string()),
        };
        let distance = row
            .distance_percent
            .map_or_else(|| "-".to_string(), |d| format!("{d:+.2}"));
        let reaction = row.reaction.map_or("-", |r| r.as_str());
        println!(
            "{:<12} {:>10} {:<8} {:>19} {:>9}  {:<20} {:<13}",
            row.symbol,
            price,
            zone_type,
            zone,
            distance,
            row.status.to_string(),
            reaction
        );
        if let Some(note) = &row.note {
            println!("{:<12} {note}", "");
        }
    }
    let alerts = report.rows.iter().filter(|r| r.status.is_alert()).count();
    println!();
    println!("{} symbol(s), {alerts} alert(s)", report.rows.len());
}
