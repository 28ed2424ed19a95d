use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use policyguard::config::{AppConfig, LogFormat, LoggingConfig};
use policyguard::simulate::{Action, SimulationDriver};
use policyguard::store::SecurityDataStore;

#[derive(Parser)]
#[command(
    name = "policyguard",
    about = "Model security showcase backend for a tax-policy prediction demo",
    version,
    long_about = None
)]
struct Cli {
    /// Path to a TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the dashboard API server
    Serve {
        /// Bind address (overrides the config file)
        #[arg(long)]
        bind: Option<String>,
    },

    /// Run tester actions against a fresh store and print the result
    Simulate {
        /// Action to run: normal or outlier
        #[arg(long, default_value = "normal")]
        action: String,

        /// Number of submissions
        #[arg(long, default_value = "1")]
        count: u32,

        /// Enable server-side validation and store the default inputs first
        #[arg(long)]
        validate: bool,

        /// Change GDP growth after storing inputs (implies --validate)
        #[arg(long)]
        tamper: bool,

        /// Seed for reproducible draws
        #[arg(long)]
        seed: Option<u64>,

        /// Skip the simulated processing delay
        #[arg(long)]
        no_delay: bool,

        /// JSON output for machine parsing
        #[arg(long)]
        json: bool,
    },

    /// Print the seed store contents as JSON
    Seed,
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));

    match logging.format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::resolve(cli.config.as_deref())?;
    init_tracing(&config.logging);

    match cli.command {
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            tracing::info!(bind = %config.server.bind, "Starting policyguard");
            policyguard::serve(config).await?;
        }
        Commands::Simulate {
            action,
            count,
            validate,
            tamper,
            seed,
            no_delay,
            json,
        } => {
            let action: Action = action.parse().map_err(|e: String| anyhow!(e))?;
            let mut settings = config.simulation.clone();
            if no_delay {
                settings = settings.without_latency();
            }

            let store = SecurityDataStore::shared();
            let driver = Arc::new(match seed {
                Some(seed) => SimulationDriver::with_seed(store.clone(), settings, seed),
                None => SimulationDriver::new(store.clone(), settings),
            });

            if validate || tamper {
                driver.set_validation(true).await;
                driver.store_inputs().await;
            }
            if tamper {
                let mut inputs = driver.inputs().await;
                inputs.gdp_growth = "12.5".to_string();
                driver.set_inputs(inputs).await;
            }

            let mut outcomes = Vec::with_capacity(count as usize);
            for _ in 0..count {
                outcomes.push(driver.submit(action).await?);
            }
            let snapshot = store.read().await.snapshot();

            if json {
                let report = serde_json::json!({
                    "outcomes": outcomes,
                    "store": snapshot,
                });
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("\npolicyguard simulation ({} x {})", count, action);
                println!("{:<10} | {:<8} | {:<10} | Message", "Regime", "Score", "Confidence");
                println!("{:-<10}-|-{:-<8}-|-{:-<10}-|-{:-<40}", "", "", "", "");
                for outcome in &outcomes {
                    println!(
                        "{:<10} | {:<8.3} | {:<10.3} | {}",
                        outcome.regime,
                        outcome.sample.score(),
                        outcome.sample.confidence(),
                        outcome.log_entry.message
                    );
                }

                println!("\n=== Anomaly Series ===");
                for point in &snapshot.anomaly_series {
                    println!(
                        "{:<10} score {:.3}  normal {:.3}  poisoned {:.3}",
                        point.time, point.score, point.normal, point.poisoned
                    );
                }
                println!("\n=== Feature Scores ===");
                for entry in &snapshot.anomalous_inputs {
                    println!("{:<14} : {:.2}", entry.feature, entry.score);
                }
                println!();
            }
        }
        Commands::Seed => {
            let snapshot = SecurityDataStore::new().snapshot();
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
    }

    Ok(())
}
