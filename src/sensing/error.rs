use std::error::Error as _;
use std::time::Duration;

use thiserror::Error;

use crate::device::DeviceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sensor {
    Camera,
    Proximity,
}

impl std::fmt::Display for Sensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sensor::Camera => f.write_str("camera frame"),
            Sensor::Proximity => f.write_str("proximity reading"),
        }
    }
}

/// Everything that can end a collection cycle early.
#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("failed to connect to robot")]
    Connection(#[source] DeviceError),

    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error("timed out after {waited:?} waiting for {sensor}")]
    TimedOut { sensor: Sensor, waited: Duration },

    #[error("image size of {actual} does not match expected size of {expected}")]
    ImageSize { actual: usize, expected: usize },

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Coarse classification the loop uses to pick a cooldown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Connection,
    SensorUnavailable,
    Validation,
    Unhandled,
}

impl CollectorError {
    pub fn kind(&self) -> FailureKind {
        match self {
            CollectorError::Connection(_) => FailureKind::Connection,
            CollectorError::TimedOut { .. } => FailureKind::SensorUnavailable,
            CollectorError::ImageSize { .. } => FailureKind::Validation,
            CollectorError::Device(_) | CollectorError::Storage(_) => FailureKind::Unhandled,
        }
    }

    /// The error and all of its causes, outermost first.
    pub fn chain(&self) -> String {
        let mut message = self.to_string();
        let mut source = self.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_errors() {
        let unreachable = CollectorError::Connection(DeviceError::Unreachable("no route".into()));
        assert_eq!(unreachable.kind(), FailureKind::Connection);
        assert_eq!(
            CollectorError::from(DeviceError::Disconnected).kind(),
            FailureKind::Unhandled
        );
        assert_eq!(
            CollectorError::ImageSize { actual: 1, expected: 2 }.kind(),
            FailureKind::Validation
        );
        assert_eq!(
            CollectorError::TimedOut {
                sensor: Sensor::Camera,
                waited: Duration::from_secs(1)
            }
            .kind(),
            FailureKind::SensorUnavailable
        );
    }

    #[test]
    fn chain_includes_device_cause() {
        let err = CollectorError::Connection(DeviceError::Unreachable("no route".into()));
        assert_eq!(
            err.chain(),
            "failed to connect to robot: robot unreachable: no route"
        );
    }
}
