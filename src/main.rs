//! tradeterm entry point
//!
//! Orchestrates:
//! 1. Env + logging + config initialization
//! 2. Exchange client construction (simulated unless a vendor SDK backend
//!    is wired in by the integration layer)
//! 3. Host assembly + boot
//! 4. Console line loop dispatching commands until EOF or Ctrl+C

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};

use tradeterm::app::{build_host, HostDeps};
use tradeterm::commands;
use tradeterm::config::{init_logging, load_config};
use tradeterm::exchange::sim::{SimRest, SimStream};
use tradeterm::plugins::core::notifications::TracingSink;
use tradeterm::plugins::core::LogApi;

const CONFIG_PATH: &str = "config.yaml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_logging();

    let config = load_config(std::path::Path::new(CONFIG_PATH))?;

    info!(
        symbol = %config.symbol,
        authenticated = config.has_credentials(),
        "starting terminal"
    );

    let stream = Arc::new(SimStream::new());
    let rest = Arc::new(SimRest::new(&config.symbol));

    let host = build_host(
        &config,
        HostDeps {
            stream,
            rest,
            sink: Arc::new(TracingSink),
        },
    )?;

    host.boot().await?;

    let log = host.capability::<dyn LogApi>()?;
    log.log_output("terminal ready; type a command (ctrl+c to quit)")
        .await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                break;
            }
            line = lines.next_line() => {
                match line? {
                    Some(line) => {
                        if let Err(e) = commands::dispatch(&host, &line).await {
                            log.log_output(&format!("error: {e:#}")).await;
                            error!(error = %e, "command failed");
                        }
                    }
                    None => break, // stdin closed
                }
            }
        }
    }

    Ok(())
}
