//! Order Tagger CLI - one-off synchronization runs.
//!
//! # Usage
//!
//! ```bash
//! # Recompute sequence tags for January 2024
//! ot-cli run --from 2024-01-01 --to 2024-01-31
//!
//! # Use position-based counting (only when the window covers every
//! # customer's complete order history)
//! ot-cli run --from 2020-01-01 --to 2024-12-31 --count-strategy position
//! ```
//!
//! Configuration comes from the same environment variables as the
//! server (`SHOPIFY_STORE`, `SHOPIFY_ADMIN_TOKEN`, ...).

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

use order_tagger_core::DateWindow;
use order_tagger_server::config::ServerConfig;
use order_tagger_server::shopify::{RequestGate, RestClient};
use order_tagger_server::sync::{CountStrategy, OrderSequencer};

#[derive(Parser)]
#[command(name = "ot-cli")]
#[command(author, version, about = "Order Tagger CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one synchronization pass over a date window
    Run {
        /// Window start day (YYYY-MM-DD)
        #[arg(long)]
        from: String,

        /// Window end day (YYYY-MM-DD, inclusive)
        #[arg(long)]
        to: String,

        /// Prior-order counting strategy (`query` or `position`)
        #[arg(long)]
        count_strategy: Option<CountStrategy>,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Run {
            from,
            to,
            count_strategy,
        } => {
            let mut config = ServerConfig::from_env()?;
            if let Some(strategy) = count_strategy {
                config.sync.count_strategy = strategy;
            }

            let window = DateWindow::parse(&from, &to)?;

            let gate = RequestGate::new(config.rate_limit.clone());
            let client = RestClient::new(&config.shopify, gate)?;
            let sequencer = OrderSequencer::new(client, config.sync.clone());

            let report = sequencer.run(&window).await?;
            tracing::info!(
                orders_seen = report.orders_seen,
                orders_tagged = report.orders_tagged,
                orders_skipped = report.orders_skipped,
                orders_failed = report.orders_failed,
                customers = report.customers,
                "run finished"
            );
        }
    }
    Ok(())
}
