//! Customer/Order Query Service entry point
//!
//! ```text
//! ┌──────────┐    ┌──────────┐    ┌──────────┐    ┌──────────┐
//! │  Config  │───▶│ Logging  │───▶│  Store   │───▶│ Gateway  │
//! │  (YAML)  │    │(tracing) │    │(PG / mem)│    │  (axum)  │
//! └──────────┘    └──────────┘    └──────────┘    └──────────┘
//! ```

use anyhow::Context;

use customer_orders::config::AppConfig;
use customer_orders::{gateway, logging, store};

fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

/// Get port override from command line (--port argument)
fn get_port_override() -> Option<u16> {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if args[i] == "--port" && i + 1 < args.len() {
            return args[i + 1].parse().ok();
        }
    }
    None
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = get_env();
    let mut app_config = AppConfig::load(&env)?;
    if let Some(port) = get_port_override() {
        app_config.server.port = port;
    }

    let _log_guard = logging::init_logging(&app_config);

    tracing::info!(
        revision = env!("BUILD_REVISION"),
        storage = ?app_config.storage,
        "Starting customer_orders in {} mode",
        env
    );

    let store = store::open_store(&app_config)
        .await
        .context("Failed to open store")?;

    gateway::run_server(&app_config.server, store).await
}
