pub mod cli;
pub mod db;
pub mod device;
pub mod sensing;
pub mod settings;
pub mod utils;

use anyhow::{Context, Result};
use log::{error, info, warn};
use tokio_util::sync::CancellationToken;

use cli::Command;
use db::Database;
use device::{SimulatedConnector, SimulatedState};
use sensing::Collector;
use settings::{CollectorSettings, DeviceBackend};

/// Proximity distance the simulated robot reports, in millimeters.
const SIMULATED_PROXIMITY_MM: f64 = 150.0;

/// Entry point shared by the binary: `count` prints the number of stored
/// readings, anything else collects until the process is told to stop.
pub fn run() -> Result<()> {
    let settings = CollectorSettings::load();
    let command = Command::from_args(std::env::args().skip(1));

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;

    match command {
        Command::Count => runtime.block_on(count_records(&settings)),
        Command::Run => {
            utils::init_logging(&settings.log_path, settings.log_level())?;
            info!("vector-collector starting up...");
            for warning in settings.warnings() {
                warn!("{warning}");
            }
            runtime.block_on(collect(settings))
        }
    }
}

async fn count_records(settings: &CollectorSettings) -> Result<()> {
    let database = Database::new(settings.storage_path())?;
    let count = database.count_readings().await?;
    println!("{count}");
    Ok(())
}

async fn collect(settings: CollectorSettings) -> Result<()> {
    let database = Database::new(settings.storage_path())?;

    let connector = match settings.device.backend {
        DeviceBackend::Simulated => SimulatedConnector::new(SimulatedState::roaming(
            settings.camera.expected_image_bytes(),
            SIMULATED_PROXIMITY_MM,
        )),
    };
    info!(
        "collecting from {} ({:?} backend) into {}",
        settings.device.name,
        settings.device.backend,
        database.path().display()
    );

    let cancel_token = CancellationToken::new();
    tokio::spawn(shutdown_signal(cancel_token.clone()));

    let mut collector = Collector::new(connector, database, settings);
    collector.run_forever(cancel_token).await;

    info!("Shutdown complete");
    Ok(())
}

/// Cancel `cancel_token` on Ctrl-C or SIGTERM.
async fn shutdown_signal(cancel_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!("failed to install SIGTERM handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C signal"),
        _ = terminate => info!("Received terminate signal"),
    }

    cancel_token.cancel();
}
