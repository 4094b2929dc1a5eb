use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use ippool::{Config, Error, Result, codec};

#[derive(Parser)]
#[command(name = "ippool")]
#[command(author, version, about = "An in-memory IPv4 address pool", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "pool.json")]
    config: PathBuf,

    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the configured range and pool options.
    Inspect,
    /// Print the configuration as JSON.
    ShowConfig,
    /// Split the configured range after `at` addresses.
    Split {
        #[arg(long)]
        at: u32,
    },
    /// Run concurrent acquire/release churn against a pool.
    Simulate {
        #[arg(long, default_value_t = 4)]
        workers: usize,
        #[arg(long, default_value_t = 1000)]
        rounds: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .init();

    let config = Config::load_or_create(&cli.config).await?;

    match cli.command.unwrap_or(Commands::Inspect) {
        Commands::Inspect => {
            let range = config.range()?;
            let options = config.pool_options();

            println!("{:<14} {}", "Range:", range);
            println!("{:<14} {}", "Addresses:", range.size());
            println!(
                "{:<14} {}",
                "Private:",
                codec::is_private(range.begin()) && codec::is_private(range.end())
            );
            println!("{:<14} {}", "Max size:", options.max_size);
            println!("{:<14} {}", "Looping:", options.looping);
            println!("{:<14} {}", "Skip .0/.255:", options.skip_reserved);
            Ok(())
        }
        Commands::ShowConfig => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
        Commands::Split { at } => {
            let (left, right) = config.range()?.split(at)?;
            println!("{} ({} addresses)", left, left.size());
            println!("{} ({} addresses)", right, right.size());
            Ok(())
        }
        Commands::Simulate { workers, rounds } => {
            let pool = Arc::new(config.build_pool()?);
            info!(
                "Simulating {} workers x {} rounds on {}",
                workers,
                rounds,
                pool.range()
            );

            let mut handles = Vec::with_capacity(workers);
            for _ in 0..workers {
                let pool = Arc::clone(&pool);
                handles.push(tokio::spawn(async move {
                    let mut held = VecDeque::new();
                    let mut exhausted = 0usize;
                    for round in 0..rounds {
                        match pool.acquire() {
                            Ok(address) => held.push_back(address),
                            Err(Error::Exhausted) => exhausted += 1,
                            Err(error) => return Err(error),
                        }
                        if round % 2 == 1
                            && let Some(address) = held.pop_front()
                        {
                            pool.release(address)?;
                        }
                        tokio::task::yield_now().await;
                    }
                    for address in held {
                        pool.release(address)?;
                    }
                    Ok::<_, Error>(exhausted)
                }));
            }

            let mut exhausted = 0;
            for handle in handles {
                match handle.await {
                    Ok(result) => exhausted += result?,
                    Err(error) => error!("Worker task failed: {}", error),
                }
            }
            if exhausted > 0 {
                warn!("Pool was exhausted {} time(s) during the run", exhausted);
            }

            println!("{}", serde_json::to_string_pretty(&pool.stats())?);
            Ok(())
        }
    }
}
