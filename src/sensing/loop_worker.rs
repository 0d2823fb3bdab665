use chrono::Local;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::path::Path;
use tokio::time::{sleep, Duration};
use tokio_util::sync::CancellationToken;

use crate::{
    db::{Database, NewReading},
    device::{DeviceConnector, DeviceStatus, RobotDevice},
    settings::{CollectorSettings, Cooldowns, ImageValidation},
};

use super::capture::{capture_image, capture_proximity, validate_image_size};
use super::error::{CollectorError, FailureKind};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

/// Where a collection cycle currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    Disconnected,
    Connecting,
    Connected,
    Gated,
    Sampling,
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    Collected {
        reading_id: i64,
        image_bytes: usize,
        prox_mm: f64,
    },
    /// Connected, but the charging state ruled out sampling.
    Gated(DeviceStatus),
    /// Shutdown was requested while the device was held; it has been released.
    Cancelled,
}

#[derive(Debug)]
pub struct CycleReport {
    pub result: Result<CycleOutcome, CollectorError>,
    pub cooldown: Duration,
    /// Extra settle time after the cooldown. Zero unless the cycle held a
    /// device connection and ran to completion.
    pub recovery: Duration,
}

/// Sampling only happens when the robot is known to be off its charger.
pub fn should_sample(status: DeviceStatus) -> bool {
    matches!(status, DeviceStatus::Idle)
}

pub fn cooldown_for(result: &Result<CycleOutcome, CollectorError>, cooldowns: &Cooldowns) -> Duration {
    match result {
        Ok(CycleOutcome::Collected { .. }) => cooldowns.after_success(),
        Ok(CycleOutcome::Gated(_)) => cooldowns.after_gated(),
        Ok(CycleOutcome::Cancelled) => Duration::ZERO,
        Err(err) => match err.kind() {
            FailureKind::Connection => cooldowns.after_connection_failure(),
            // The cycle itself ran to completion; only the frame was rejected.
            FailureKind::Validation => cooldowns.after_success(),
            FailureKind::SensorUnavailable | FailureKind::Unhandled => cooldowns.after_failure(),
        },
    }
}

/// The recovery delay follows cycles that completed while connected. A cycle
/// that failed after connecting already sleeps the failure cooldown.
pub fn recovery_for(
    result: &Result<CycleOutcome, CollectorError>,
    connected: bool,
    cooldowns: &Cooldowns,
) -> Duration {
    let completed = match result {
        Ok(CycleOutcome::Collected { .. }) | Ok(CycleOutcome::Gated(_)) => true,
        Ok(CycleOutcome::Cancelled) => false,
        Err(err) => err.kind() == FailureKind::Validation,
    };

    if connected && completed {
        cooldowns.recovery()
    } else {
        Duration::ZERO
    }
}

pub struct Collector<C: DeviceConnector> {
    connector: C,
    db: Database,
    settings: CollectorSettings,
    rng: StdRng,
    phase: CyclePhase,
}

impl<C: DeviceConnector> Collector<C> {
    pub fn new(connector: C, db: Database, settings: CollectorSettings) -> Self {
        Self {
            connector,
            db,
            settings,
            rng: StdRng::from_entropy(),
            phase: CyclePhase::Disconnected,
        }
    }

    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn phase(&self) -> CyclePhase {
        self.phase
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    fn set_phase(&mut self, phase: CyclePhase) {
        log_debug!("cycle phase {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
    }

    /// Run cycles until `cancel_token` fires. Cycle errors are logged and
    /// absorbed; they only influence how long the loop sleeps.
    pub async fn run_forever(&mut self, cancel_token: CancellationToken) {
        while !cancel_token.is_cancelled() {
            let report = self.run_cycle_until(&cancel_token).await;
            if matches!(report.result, Ok(CycleOutcome::Cancelled)) {
                break;
            }

            if !self.pause(report.cooldown, &cancel_token).await {
                break;
            }

            // Give transient SDK errors time to clear before reconnecting.
            if !self.pause(report.recovery, &cancel_token).await {
                break;
            }
        }

        log_info!("collector loop shutting down");
    }

    /// Sleep for `duration`; returns false if cancelled first.
    async fn pause(&self, duration: Duration, cancel_token: &CancellationToken) -> bool {
        if duration.is_zero() {
            return !cancel_token.is_cancelled();
        }

        log_debug!(
            "{} sleeping for {} seconds",
            Local::now().format("%Y-%m-%d %H:%M:%S %z"),
            duration.as_secs_f64()
        );

        tokio::select! {
            _ = sleep(duration) => true,
            _ = cancel_token.cancelled() => false,
        }
    }

    /// One connect / check / sample / disconnect pass. Never panics on device
    /// or storage failures; they come back in the report.
    pub async fn run_cycle(&mut self) -> CycleReport {
        self.run_cycle_until(&CancellationToken::new()).await
    }

    /// Like [`Collector::run_cycle`], but gives up on the device work as soon
    /// as `cancel_token` fires. The device is disconnected either way.
    pub async fn run_cycle_until(&mut self, cancel_token: &CancellationToken) -> CycleReport {
        self.set_phase(CyclePhase::Connecting);
        log_info!("connecting to {}", self.settings.device.name);

        let mut device = match self.connector.connect() {
            Ok(device) => device,
            Err(err) => return self.finish(Err(CollectorError::Connection(err)), false),
        };

        self.set_phase(CyclePhase::Connected);
        log_info!("connected!");

        let result = tokio::select! {
            result = self.collect(&mut device) => result,
            _ = cancel_token.cancelled() => Ok(CycleOutcome::Cancelled),
        };

        if let Err(err) = device.disconnect() {
            log_warn!("failed to disconnect cleanly: {err}");
        }

        self.finish(result, true)
    }

    fn finish(&mut self, result: Result<CycleOutcome, CollectorError>, connected: bool) -> CycleReport {
        let cooldown = cooldown_for(&result, &self.settings.cooldowns);
        let recovery = recovery_for(&result, connected, &self.settings.cooldowns);

        match &result {
            Ok(CycleOutcome::Collected {
                reading_id,
                image_bytes,
                prox_mm,
            }) => {
                log_info!(
                    "stored reading {reading_id} ({image_bytes} bytes, prox {prox_mm}mm); letting robot roam around"
                );
                self.set_phase(CyclePhase::Disconnected);
            }
            Ok(CycleOutcome::Gated(status)) => {
                log_info!("robot isn't ready yet ({status})");
                self.set_phase(CyclePhase::Disconnected);
            }
            Ok(CycleOutcome::Cancelled) => {
                log_info!("cycle cancelled; robot released");
                self.set_phase(CyclePhase::Disconnected);
            }
            Err(err) => {
                match err.kind() {
                    FailureKind::Connection => log_warn!("{}", err.chain()),
                    FailureKind::Validation => log_error!("{}", err.chain()),
                    FailureKind::SensorUnavailable => log_warn!("{}", err.chain()),
                    FailureKind::Unhandled => {
                        log_error!("exception while trying to collect: {}", err.chain());
                        log_debug!("{err:?}");
                    }
                }
                self.set_phase(CyclePhase::Failed);
            }
        }

        CycleReport {
            result,
            cooldown,
            recovery,
        }
    }

    async fn collect(&mut self, device: &mut C::Device) -> Result<CycleOutcome, CollectorError> {
        log_info!("getting robot state");
        sleep(self.settings.polling.settle_delay()).await;

        if let Some(battery) = device.battery_state()? {
            log_info!("battery voltage: {:.2}", battery.battery_volts);
        }

        let status = DeviceStatus::from_raw(device.status()?);
        if !should_sample(status) {
            self.set_phase(CyclePhase::Gated);
            log_info!("robot is not sampling: {status}");
            self.maybe_say_charging(device);
            return Ok(CycleOutcome::Gated(status));
        }

        self.set_phase(CyclePhase::Sampling);
        log_info!("collecting sensor data");

        let prox_mm = capture_proximity(device, &self.settings.polling).await?;
        let image = capture_image(device, &self.settings.polling).await?;

        if let Some(path) = self.settings.latest_image_path.as_deref() {
            save_latest_image(path, &image).await;
        }

        let expected = self.settings.camera.expected_image_bytes();
        if self.settings.image_validation == ImageValidation::Strict
            && !validate_image_size(&image, expected)
        {
            return Err(CollectorError::ImageSize {
                actual: image.len(),
                expected,
            });
        }

        log_info!("prox: {prox_mm}");
        let image_bytes = image.len();
        let reading_id = self
            .db
            .insert_reading(&NewReading {
                image,
                prox: prox_mm,
            })
            .await?;

        Ok(CycleOutcome::Collected {
            reading_id,
            image_bytes,
            prox_mm,
        })
    }

    fn maybe_say_charging(&mut self, device: &mut C::Device) {
        let Some(phrase) = &self.settings.charging_phrase else {
            return;
        };

        if self.rng.gen_bool(phrase.probability) {
            if let Err(err) = device.say_text(&phrase.text) {
                log_warn!("failed to speak charging phrase: {err}");
            }
        }
    }
}

async fn save_latest_image(path: &Path, image: &[u8]) {
    if let Err(err) = tokio::fs::write(path, image).await {
        log_warn!("failed to write latest image to {}: {err}", path.display());
    }
}
