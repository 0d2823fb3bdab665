//! Device boundary.
//!
//! The collector only talks to the robot through these two traits, so the
//! SDK client (or the in-process simulation) can be swapped without touching
//! the loop.

mod simulated;
mod status;

pub use simulated::{SimulatedConnector, SimulatedRobot, SimulatedState};
pub use status::{DeviceStatus, STATUS_CHARGING, STATUS_ON_CHARGER};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeviceError {
    /// The robot could not be reached at all.
    #[error("robot unreachable: {0}")]
    Unreachable(String),

    /// The connection dropped after it was established.
    #[error("robot connection lost")]
    Disconnected,

    /// Any other failure reported by the SDK.
    #[error("robot SDK error: {0}")]
    Sdk(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatteryState {
    pub battery_volts: f64,
}

/// A live connection to the robot.
pub trait RobotDevice {
    /// Raw status bitmask, `None` while the SDK has not reported one yet.
    fn status(&mut self) -> Result<Option<u32>, DeviceError>;

    fn battery_state(&mut self) -> Result<Option<BatteryState>, DeviceError>;

    /// Raw bytes of the most recent camera frame, if one has arrived.
    fn latest_image(&mut self) -> Result<Option<Vec<u8>>, DeviceError>;

    /// Most recent proximity distance in millimeters, if one has arrived.
    fn proximity_mm(&mut self) -> Result<Option<f64>, DeviceError>;

    fn say_text(&mut self, text: &str) -> Result<(), DeviceError>;

    fn disconnect(&mut self) -> Result<(), DeviceError>;
}

/// Produces device connections, one per collection cycle.
pub trait DeviceConnector {
    type Device: RobotDevice;

    fn connect(&mut self) -> Result<Self::Device, DeviceError>;
}
