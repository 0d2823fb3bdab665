use std::sync::{Arc, Mutex, MutexGuard};

use tokio::{sync::watch, time::Instant};

use super::{BatteryState, DeviceConnector, DeviceError, RobotDevice};

/// Scripted robot state shared between the connector, every connection it
/// hands out, and whoever holds a clone of the connector.
#[derive(Debug, Clone, Default)]
pub struct SimulatedState {
    pub reachable: bool,
    pub status: Option<u32>,
    pub battery_volts: Option<f64>,
    pub image: Option<Vec<u8>>,
    pub proximity_mm: Option<f64>,
    /// Number of frame polls answered with "not ready" before the frame shows up.
    pub image_ready_after: u32,
    pub proximity_ready_after: u32,
    /// Fail the status read with an SDK error.
    pub fail_status: bool,

    pub connects: u32,
    pub connect_times: Vec<Instant>,
    pub disconnects: u32,
    pub image_reads: u32,
    pub proximity_reads: u32,
    pub spoken: Vec<String>,
}

impl SimulatedState {
    /// A robot off its charger with a frame of `image_bytes` bytes in view.
    pub fn roaming(image_bytes: usize, proximity_mm: f64) -> Self {
        Self {
            reachable: true,
            status: Some(0),
            battery_volts: Some(3.9),
            image: Some(vec![0u8; image_bytes]),
            proximity_mm: Some(proximity_mm),
            ..Self::default()
        }
    }
}

fn lock(state: &Mutex<SimulatedState>) -> MutexGuard<'_, SimulatedState> {
    match state.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[derive(Debug, Clone)]
pub struct SimulatedConnector {
    state: Arc<Mutex<SimulatedState>>,
    connects_tx: Arc<watch::Sender<u32>>,
}

impl Default for SimulatedConnector {
    fn default() -> Self {
        Self::new(SimulatedState::default())
    }
}

impl SimulatedConnector {
    pub fn new(state: SimulatedState) -> Self {
        let (connects_tx, _) = watch::channel(state.connects);
        Self {
            state: Arc::new(Mutex::new(state)),
            connects_tx: Arc::new(connects_tx),
        }
    }

    /// Follows the number of successful connects.
    pub fn subscribe_connects(&self) -> watch::Receiver<u32> {
        self.connects_tx.subscribe()
    }

    /// Inspect or change the scripted state.
    pub fn with_state<R>(&self, f: impl FnOnce(&mut SimulatedState) -> R) -> R {
        f(&mut lock(&self.state))
    }

    pub fn snapshot(&self) -> SimulatedState {
        lock(&self.state).clone()
    }
}

impl DeviceConnector for SimulatedConnector {
    type Device = SimulatedRobot;

    fn connect(&mut self) -> Result<SimulatedRobot, DeviceError> {
        let mut state = lock(&self.state);
        if !state.reachable {
            return Err(DeviceError::Unreachable("simulated robot is offline".into()));
        }
        state.connects += 1;
        state.connect_times.push(Instant::now());
        self.connects_tx.send_replace(state.connects);
        Ok(SimulatedRobot {
            state: Arc::clone(&self.state),
            image_polls: 0,
            proximity_polls: 0,
            connected: true,
        })
    }
}

#[derive(Debug)]
pub struct SimulatedRobot {
    state: Arc<Mutex<SimulatedState>>,
    image_polls: u32,
    proximity_polls: u32,
    connected: bool,
}

impl SimulatedRobot {
    fn ensure_connected(&self) -> Result<(), DeviceError> {
        if self.connected {
            Ok(())
        } else {
            Err(DeviceError::Disconnected)
        }
    }
}

impl RobotDevice for SimulatedRobot {
    fn status(&mut self) -> Result<Option<u32>, DeviceError> {
        self.ensure_connected()?;
        let state = lock(&self.state);
        if state.fail_status {
            return Err(DeviceError::Sdk("status stream closed".into()));
        }
        Ok(state.status)
    }

    fn battery_state(&mut self) -> Result<Option<BatteryState>, DeviceError> {
        self.ensure_connected()?;
        Ok(lock(&self.state)
            .battery_volts
            .map(|battery_volts| BatteryState { battery_volts }))
    }

    fn latest_image(&mut self) -> Result<Option<Vec<u8>>, DeviceError> {
        self.ensure_connected()?;
        let mut state = lock(&self.state);
        state.image_reads += 1;
        if self.image_polls < state.image_ready_after {
            self.image_polls += 1;
            return Ok(None);
        }
        Ok(state.image.clone())
    }

    fn proximity_mm(&mut self) -> Result<Option<f64>, DeviceError> {
        self.ensure_connected()?;
        let mut state = lock(&self.state);
        state.proximity_reads += 1;
        if self.proximity_polls < state.proximity_ready_after {
            self.proximity_polls += 1;
            return Ok(None);
        }
        Ok(state.proximity_mm)
    }

    fn say_text(&mut self, text: &str) -> Result<(), DeviceError> {
        self.ensure_connected()?;
        lock(&self.state).spoken.push(text.to_string());
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), DeviceError> {
        if self.connected {
            self.connected = false;
            lock(&self.state).disconnects += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offline_robot_refuses_connection() {
        let mut connector = SimulatedConnector::new(SimulatedState::default());
        assert!(matches!(
            connector.connect(),
            Err(DeviceError::Unreachable(_))
        ));
        assert_eq!(connector.snapshot().connects, 0);
    }

    #[test]
    fn connects_are_published() {
        let mut connector = SimulatedConnector::new(SimulatedState::roaming(8, 50.0));
        let connects = connector.subscribe_connects();

        connector.connect().unwrap();
        connector.connect().unwrap();

        assert_eq!(*connects.borrow(), 2);
        assert_eq!(connector.snapshot().connect_times.len(), 2);
    }

    #[test]
    fn frame_appears_after_configured_polls() {
        let mut connector = SimulatedConnector::new(SimulatedState {
            image_ready_after: 2,
            ..SimulatedState::roaming(8, 50.0)
        });
        let mut robot = connector.connect().unwrap();

        assert!(robot.latest_image().unwrap().is_none());
        assert!(robot.latest_image().unwrap().is_none());
        assert_eq!(robot.latest_image().unwrap().map(|img| img.len()), Some(8));
        assert_eq!(connector.snapshot().image_reads, 3);
    }

    #[test]
    fn reads_fail_after_disconnect() {
        let mut connector = SimulatedConnector::new(SimulatedState::roaming(8, 50.0));
        let mut robot = connector.connect().unwrap();
        robot.disconnect().unwrap();
        robot.disconnect().unwrap();

        assert!(matches!(robot.status(), Err(DeviceError::Disconnected)));
        assert_eq!(connector.snapshot().disconnects, 1);
    }
}
