mod capture;
mod error;
mod loop_worker;

pub use capture::{capture_image, capture_proximity, validate_image_size};
pub use error::{CollectorError, FailureKind, Sensor};
pub use loop_worker::{
    cooldown_for, recovery_for, should_sample, Collector, CycleOutcome, CyclePhase, CycleReport,
};
