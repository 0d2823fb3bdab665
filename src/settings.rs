use anyhow::{bail, Context, Result};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

pub const CONFIG_PATH_ENV: &str = "VECTOR_COLLECTOR_CONFIG";
pub const DATABASE_PATH_ENV: &str = "VECTOR_COLLECTOR_DB";
pub const DEBUG_ENV: &str = "VECTOR_COLLECTOR_DEBUG";

const DEFAULT_CONFIG_PATH: &str = "collector.json";
const DEFAULT_DATABASE_PATH: &str = "vector.db";
/// Where the simulated backend writes when no database path was configured.
pub const SIMULATED_DATABASE_PATH: &str = "vector-simulated.db";

/// Camera frame geometry used to derive the expected raw frame size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    pub width: usize,
    pub height: usize,
    pub bytes_per_pixel: usize,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            width: 640,
            height: 360,
            bytes_per_pixel: 3,
        }
    }
}

impl CameraSettings {
    pub fn expected_image_bytes(&self) -> usize {
        self.width * self.height * self.bytes_per_pixel
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageValidation {
    /// Discard the cycle when the frame length differs from the camera geometry.
    Strict,
    Disabled,
}

/// Fixed sleeps between cycles, in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Cooldowns {
    pub success_secs: u64,
    pub gated_secs: u64,
    pub failure_secs: u64,
    pub connection_failure_secs: u64,
    /// Applied after every connected cycle that ran to completion.
    pub recovery_secs: u64,
}

impl Default for Cooldowns {
    fn default() -> Self {
        Self {
            success_secs: 1,
            gated_secs: 180,
            failure_secs: 60,
            connection_failure_secs: 3600,
            recovery_secs: 60,
        }
    }
}

impl Cooldowns {
    pub fn after_success(&self) -> Duration {
        Duration::from_secs(self.success_secs)
    }

    pub fn after_gated(&self) -> Duration {
        Duration::from_secs(self.gated_secs)
    }

    pub fn after_failure(&self) -> Duration {
        Duration::from_secs(self.failure_secs)
    }

    pub fn after_connection_failure(&self) -> Duration {
        Duration::from_secs(self.connection_failure_secs)
    }

    pub fn recovery(&self) -> Duration {
        Duration::from_secs(self.recovery_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingSettings {
    pub image_interval_ms: u64,
    pub proximity_interval_ms: u64,
    /// Gives the SDK time to populate status and sensor state after connecting.
    pub settle_delay_ms: u64,
    /// `None` waits for sensor data forever.
    pub capture_timeout_ms: Option<u64>,
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            image_interval_ms: 100,
            proximity_interval_ms: 1000,
            settle_delay_ms: 250,
            capture_timeout_ms: None,
        }
    }
}

impl PollingSettings {
    pub fn image_interval(&self) -> Duration {
        Duration::from_millis(self.image_interval_ms)
    }

    pub fn proximity_interval(&self) -> Duration {
        Duration::from_millis(self.proximity_interval_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn capture_timeout(&self) -> Option<Duration> {
        self.capture_timeout_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChargingPhrase {
    pub probability: f64,
    pub text: String,
}

impl Default for ChargingPhrase {
    fn default() -> Self {
        Self {
            probability: 0.05,
            text: "I'm still charging.".into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceBackend {
    Simulated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceSettings {
    pub name: String,
    pub backend: DeviceBackend,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            name: "vector".into(),
            backend: DeviceBackend::Simulated,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorSettings {
    pub database_path: PathBuf,
    pub log_path: PathBuf,
    pub debug: bool,
    /// Raw bytes of the most recent frame are written here, if set.
    pub latest_image_path: Option<PathBuf>,
    pub camera: CameraSettings,
    pub image_validation: ImageValidation,
    pub cooldowns: Cooldowns,
    pub polling: PollingSettings,
    pub charging_phrase: Option<ChargingPhrase>,
    pub device: DeviceSettings,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            log_path: PathBuf::from("vector.log"),
            debug: true,
            latest_image_path: Some(PathBuf::from("latest_image")),
            camera: CameraSettings::default(),
            image_validation: ImageValidation::Strict,
            cooldowns: Cooldowns::default(),
            polling: PollingSettings::default(),
            charging_phrase: Some(ChargingPhrase::default()),
            device: DeviceSettings::default(),
        }
    }
}

impl CollectorSettings {
    /// The lenient profile: no frame size check and no spoken phrase.
    pub fn relaxed() -> Self {
        Self {
            image_validation: ImageValidation::Disabled,
            charging_phrase: None,
            ..Self::default()
        }
    }

    /// Load settings from `VECTOR_COLLECTOR_CONFIG` (or `collector.json`) and
    /// apply environment overrides.
    pub fn load() -> Self {
        let path = std::env::var_os(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

        let mut settings = match Self::from_file(&path) {
            Ok(settings) => settings,
            Err(err) => {
                // The logger is not up yet; stderr is the only sink.
                eprintln!("ignoring settings file {}: {err:#}", path.display());
                Self::default()
            }
        };
        settings.apply_env_overrides();
        settings
    }

    /// Read settings from a JSON file. A missing file yields the defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        Self::from_json(&contents)
            .with_context(|| format!("Failed to parse settings in {}", path.display()))
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(contents)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Some(db_path) = std::env::var_os(DATABASE_PATH_ENV) {
            self.database_path = PathBuf::from(db_path);
        }

        if let Ok(value) = std::env::var(DEBUG_ENV) {
            self.debug = value == "1" || value.eq_ignore_ascii_case("true");
        }
    }

    /// The database to open. The simulated backend is kept out of the default
    /// `vector.db` unless a path was chosen explicitly.
    pub fn storage_path(&self) -> PathBuf {
        let is_default = self.database_path == Path::new(DEFAULT_DATABASE_PATH);
        match self.device.backend {
            DeviceBackend::Simulated if is_default => PathBuf::from(SIMULATED_DATABASE_PATH),
            DeviceBackend::Simulated => self.database_path.clone(),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        if self.debug {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.camera.expected_image_bytes() == 0 {
            bail!("camera geometry yields an empty frame");
        }
        if self.polling.image_interval_ms == 0 || self.polling.proximity_interval_ms == 0 {
            bail!("polling intervals must be greater than zero");
        }
        if let Some(phrase) = &self.charging_phrase {
            if !(0.0..=1.0).contains(&phrase.probability) {
                bail!(
                    "charging phrase probability {} is outside [0, 1]",
                    phrase.probability
                );
            }
        }
        Ok(())
    }

    /// Legal but suspicious settings, reported once logging is up.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.cooldowns.connection_failure_secs == 0 {
            warnings.push(
                "connection failure cooldown is zero; an unreachable robot will be retried in a tight loop"
                    .to_string(),
            );
        }
        if self.device.backend == DeviceBackend::Simulated {
            warnings.push(format!(
                "device backend is simulated: readings in {} are synthetic frames, not robot data",
                self.storage_path().display()
            ));
        }
        warnings
    }
}
