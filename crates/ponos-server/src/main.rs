//! # Ponos
//!
//! Periodic job dispatcher: reads `ponos.toml`, fires every schedule entry on
//! its trigger expression and enqueues the job through the configured driver.
//!
//! Runtime control happens through signals:
//! - **USR1**: print the schedule table
//! - **USR2**: dry-run every entry
//! - **INT/TERM**: stop and wait for in-flight jobs

use ponos_config::{ConfigLoader, PonosConfig};
use ponos_core::{init_logging, LoggingConfig, PonosResult};
use ponos_jobs::{register_metrics, Controller, DriverRegistry};
use ponos_server::{report, signals, startup};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    let loader = ConfigLoader::from_default_location();
    let loaded = loader.load();

    let logging = loaded
        .as_ref()
        .map(|config| config.logging.clone())
        .unwrap_or_else(|_| LoggingConfig::default());
    if let Err(e) = init_logging(&logging) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    startup::print_banner(env!("CARGO_PKG_VERSION"), std::process::id());

    let result = match loaded {
        Ok(config) => {
            info!(module = "boot", "Read configuration from {}", loader.path().display());
            run(config).await
        }
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        error!(module = "boot", error = %e, "Stopping");
        std::process::exit(e.exit_code());
    }
}

async fn run(config: PonosConfig) -> PonosResult<()> {
    info!(module = "boot", "Looking up for driver: {}", config.driver);
    let mut driver = DriverRegistry::with_defaults().resolve(&config.driver)?;
    driver.configure(&config.redis).await?;

    register_metrics();

    info!(module = "boot", "Building schedule...");
    let grace = config.shutdown_grace();
    let controller = Controller::new(config.schedule, Arc::from(driver), grace)?;
    controller.start()?;

    info!("Built schedule:");
    println!("{}", report::render_schedule(&controller.schedule_rows()));

    let (commands_tx, commands_rx) = mpsc::channel(16);
    signals::spawn_listener(commands_tx)?;
    startup::print_usage();

    let idle = controller
        .run(commands_rx, |rows| {
            println!("{}", report::render_schedule(rows));
            info!("Done.");
        })
        .await;

    if !idle {
        warn!(in_flight = controller.dispatcher().in_flight(), "Exiting with jobs still in flight");
    }
    info!("Ponos stopped");

    Ok(())
}
