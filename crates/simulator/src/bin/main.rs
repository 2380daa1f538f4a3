//! Disco Simulator CLI
//!
//! Runs one of the example models and logs its statistics report.

use clap::{Parser, Subcommand};
use disco_simulator::{run_bank, run_tank, BankConfig, SimulatorConfig, TankConfig};
use disco_stats::Collector;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "disco-sim")]
#[command(about = "Run example models on the combined simulation kernel")]
#[command(version)]
struct Cli {
    /// Random seed
    #[arg(long, default_value = "12345", global = true)]
    seed: u64,

    /// Simulated time at which the run stops
    #[arg(long, default_value = "1000", global = true)]
    horizon: f64,

    /// Stop after this many dispatched events
    #[arg(long, global = true)]
    max_events: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bank with one waiting line and several tellers (M/M/c)
    Bank {
        /// Number of tellers
        #[arg(long, default_value = "2")]
        tellers: usize,

        /// Mean time between arrivals
        #[arg(long, default_value = "1.0")]
        interarrival: f64,

        /// Mean service time
        #[arg(long, default_value = "1.6")]
        service: f64,
    },

    /// Tank filled continuously and drained between two marks
    Tank {
        /// Inflow rate
        #[arg(long, default_value = "2.0")]
        inflow: f64,

        /// Drain rate while the drain is open
        #[arg(long, default_value = "5.0")]
        outflow: f64,

        /// Level at which the drain closes
        #[arg(long, default_value = "1.0")]
        low: f64,

        /// Level at which the drain opens
        #[arg(long, default_value = "10.0")]
        high: f64,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut config = SimulatorConfig::new(cli.horizon).with_seed(cli.seed);
    if let Some(max_events) = cli.max_events {
        config = config.with_max_events(max_events);
    }

    match cli.command {
        Commands::Bank {
            tellers,
            interarrival,
            service,
        } => {
            let bank = BankConfig::default()
                .with_tellers(tellers)
                .with_mean_interarrival(interarrival)
                .with_mean_service(service);
            let report = run_bank(&config, &bank)?;
            report.log();

            println!("Bank ({} tellers, rho = {:.3})", tellers, bank.utilization());
            println!("  customers served: {}", report.customers_served());
            println!("  mean wait:        {:.3}", report.wait.mean());
            println!("  mean line length: {:.3}", report.line_length.mean(report.end_time));
            println!(
                "  teller use:       {:.3}",
                report.busy.mean(report.end_time) / tellers as f64
            );
            println!("  events:           {}", report.stats.events_dispatched);
        }

        Commands::Tank {
            inflow,
            outflow,
            low,
            high,
        } => {
            let tank = TankConfig::default()
                .with_inflow(inflow)
                .with_outflow(outflow)
                .with_marks(low, high);
            let report = run_tank(&config, &tank)?;
            report.log();

            println!("Tank (marks {} / {})", low, high);
            println!("  cycles:           {}", report.cycles.observations());
            println!("  mean cycle time:  {:.3}", report.cycle_time.mean());
            println!("  expected cycle:   {:.3}", tank.cycle_time());
            println!("  final level:      {:.3}", report.final_level);
            println!("  state events:     {}", report.stats.state_events);
            println!("  integration steps: {}", report.stats.integration_steps);
        }
    }

    Ok(())
}
