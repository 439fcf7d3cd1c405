//! Checkout simulator CLI
//!
//! ```bash
//! # Default supermarket: 5 checkouts, a customer every 20 minutes, 8 hours
//! checkout-sim
//!
//! # Same parameters read as customers per hour
//! checkout-sim --rate-units per-hour
//!
//! # Three checkouts, JSON output
//! checkout-sim -n 3 --seed 7 --json
//!
//! # How many checkouts does the bank need?
//! checkout-sim --config bank.toml sweep --max-servers 8 --csv
//! ```

use std::error::Error;
use std::io;
use std::path::PathBuf;

use checkout_queue::{
    MetricError, RateUnits, Simulation, SimulationConfig, SimulationReport, TieBreak, sweep,
};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Checkout-bank queueing simulator
///
/// Customers join the checkout with the shortest estimated wait. Reports the
/// mean time in the system, the mean number queued at arrival and per-checkout
/// utilization.
#[derive(Parser, Debug)]
#[command(name = "checkout-sim")]
#[command(version, about, long_about = None)]
struct Cli {
    /// TOML file with simulation parameters; flags override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Arrival parameter, read according to --rate-units
    #[arg(long)]
    arrival_rate: Option<f64>,

    /// Service parameter of one checkout, read according to --rate-units
    #[arg(long)]
    service_rate: Option<f64>,

    /// literal (parameters are mean minutes) or per-hour
    #[arg(long)]
    rate_units: Option<RateUnits>,

    /// Number of checkouts
    #[arg(short = 'n', long)]
    servers: Option<usize>,

    /// Simulated minutes
    #[arg(long)]
    horizon: Option<f64>,

    #[arg(long)]
    seed: Option<u64>,

    /// first-index or random
    #[arg(long)]
    tie_break: Option<TieBreak>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one simulation (default)
    Run,
    /// Run the same workload for a range of checkout counts
    Sweep {
        #[arg(long, default_value = "1")]
        min_servers: usize,

        #[arg(long)]
        max_servers: usize,

        /// Worker threads; defaults to rayon's global pool
        #[arg(long)]
        threads: Option<usize>,

        /// Print one CSV row per checkout count
        #[arg(long)]
        csv: bool,
    },
}

impl Cli {
    fn simulation_config(&self) -> Result<SimulationConfig, Box<dyn Error>> {
        let mut config = match &self.config {
            Some(path) => SimulationConfig::from_file(path)?,
            None => SimulationConfig::default(),
        };
        if let Some(rate) = self.arrival_rate {
            config.arrival_rate = rate;
        }
        if let Some(rate) = self.service_rate {
            config.service_rate = rate;
        }
        if let Some(n) = self.servers {
            config.num_servers = n;
        }
        if let Some(horizon) = self.horizon {
            config.horizon_minutes = horizon;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(units) = self.rate_units {
            config.rate_units = units;
        }
        if let Some(tie_break) = self.tie_break {
            config.tie_break = tie_break;
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,checkout_queue=info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.simulation_config()?;

    match cli.command {
        None | Some(Command::Run) => {
            let report = Simulation::new(config)?.run();
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
        }
        Some(Command::Sweep {
            min_servers,
            max_servers,
            threads,
            csv,
        }) => {
            let reports = sweep(&config, min_servers, max_servers, threads)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&reports)?);
            } else if csv {
                write_sweep_csv(&reports)?;
            } else {
                print_sweep(&reports);
            }
        }
    }
    Ok(())
}

fn or_missing(value: Result<f64, MetricError>) -> String {
    match value {
        Ok(v) => format!("{v:.2}"),
        Err(e) => format!("n/a ({e})"),
    }
}

fn print_report(report: &SimulationReport) {
    let metrics = &report.metrics;
    println!("Mean time in queue: {} minutes", or_missing(metrics.mean_wait()));
    println!("Mean customers in queue: {}", or_missing(metrics.mean_queue()));
    for server in &report.servers {
        println!("Utilization of checkout {}: {:.2}", server.id, server.utilization);
    }
    println!(
        "Customers: {} arrived, {} served, {} still inside",
        metrics.customers_arrived, metrics.customers_served, report.customers_in_flight
    );
}

fn print_sweep(reports: &[SimulationReport]) {
    println!("{:>10} {:>10} {:>12} {:>10} {:>10}", "checkouts", "served", "mean wait", "mean queue", "mean util");
    for report in reports {
        let metrics = &report.metrics;
        println!(
            "{:>10} {:>10} {:>12} {:>10} {:>10.2}",
            report.config.num_servers,
            metrics.customers_served,
            metrics.mean_wait_minutes.map_or("n/a".to_string(), |w| format!("{w:.2}")),
            metrics.mean_queue_length.map_or("n/a".to_string(), |q| format!("{q:.2}")),
            mean_utilization(report),
        );
    }
}

fn mean_utilization(report: &SimulationReport) -> f64 {
    let utilization = &report.metrics.utilization;
    if utilization.is_empty() {
        return 0.0;
    }
    utilization.iter().sum::<f64>() / utilization.len() as f64
}

fn write_sweep_csv(reports: &[SimulationReport]) -> Result<(), Box<dyn Error>> {
    let mut writer = csv::Writer::from_writer(io::stdout());
    writer.write_record([
        "checkouts",
        "arrived",
        "served",
        "mean_wait_minutes",
        "mean_queue_length",
        "mean_utilization",
    ])?;
    for report in reports {
        let metrics = &report.metrics;
        writer.write_record([
            report.config.num_servers.to_string(),
            metrics.customers_arrived.to_string(),
            metrics.customers_served.to_string(),
            metrics.mean_wait_minutes.map_or(String::new(), |w| w.to_string()),
            metrics.mean_queue_length.map_or(String::new(), |q| q.to_string()),
            mean_utilization(report).to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}
