use tokio::time::{sleep, Duration, Instant};

use crate::device::{DeviceError, RobotDevice};
use crate::settings::PollingSettings;

use super::error::{CollectorError, Sensor};

const ENABLE_LOGS: bool = true;

use crate::log_debug;

/// Poll `read` every `interval` until it yields a value. Without a timeout
/// this waits for as long as the device keeps answering "not ready".
async fn wait_for<T, F>(
    sensor: Sensor,
    interval: Duration,
    timeout: Option<Duration>,
    mut read: F,
) -> Result<T, CollectorError>
where
    F: FnMut() -> Result<Option<T>, DeviceError>,
{
    let started = Instant::now();
    loop {
        if let Some(value) = read()? {
            return Ok(value);
        }

        let waited = started.elapsed();
        if let Some(limit) = timeout {
            if waited >= limit {
                return Err(CollectorError::TimedOut { sensor, waited });
            }
        }

        log_debug!("waiting for {sensor} ({}ms so far)", waited.as_millis());
        sleep(interval).await;
    }
}

pub async fn capture_image<D: RobotDevice>(
    device: &mut D,
    polling: &PollingSettings,
) -> Result<Vec<u8>, CollectorError> {
    wait_for(
        Sensor::Camera,
        polling.image_interval(),
        polling.capture_timeout(),
        || device.latest_image(),
    )
    .await
}

/// Distance in millimeters.
pub async fn capture_proximity<D: RobotDevice>(
    device: &mut D,
    polling: &PollingSettings,
) -> Result<f64, CollectorError> {
    wait_for(
        Sensor::Proximity,
        polling.proximity_interval(),
        polling.capture_timeout(),
        || device.proximity_mm(),
    )
    .await
}

pub fn validate_image_size(image: &[u8], expected: usize) -> bool {
    image.len() == expected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{DeviceConnector, SimulatedConnector, SimulatedState};

    #[tokio::test(start_paused = true)]
    async fn image_capture_waits_until_frame_is_ready() {
        let mut connector = SimulatedConnector::new(SimulatedState {
            image_ready_after: 5,
            ..SimulatedState::roaming(64, 80.0)
        });
        let mut robot = connector.connect().unwrap();
        let started = Instant::now();

        let image = capture_image(&mut robot, &PollingSettings::default())
            .await
            .unwrap();

        assert_eq!(image.len(), 64);
        assert_eq!(connector.snapshot().image_reads, 6);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(500) && elapsed < Duration::from_millis(600));
    }

    #[tokio::test(start_paused = true)]
    async fn proximity_capture_polls_at_its_own_interval() {
        let mut connector = SimulatedConnector::new(SimulatedState {
            proximity_ready_after: 2,
            ..SimulatedState::roaming(64, 42.5)
        });
        let mut robot = connector.connect().unwrap();
        let started = Instant::now();

        let prox = capture_proximity(&mut robot, &PollingSettings::default())
            .await
            .unwrap();

        assert_eq!(prox, 42.5);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(2) && elapsed < Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn capture_times_out_when_configured() {
        let mut connector = SimulatedConnector::new(SimulatedState {
            image: None,
            ..SimulatedState::roaming(0, 42.5)
        });
        let mut robot = connector.connect().unwrap();
        let polling = PollingSettings {
            capture_timeout_ms: Some(1_000),
            ..PollingSettings::default()
        };

        let err = capture_image(&mut robot, &polling).await.unwrap_err();
        match err {
            CollectorError::TimedOut { sensor, waited } => {
                assert_eq!(sensor, Sensor::Camera);
                assert!(waited >= Duration::from_secs(1));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn device_errors_abort_polling() {
        let mut connector = SimulatedConnector::new(SimulatedState::roaming(64, 42.5));
        let mut robot = connector.connect().unwrap();
        robot.disconnect().unwrap();

        let err = capture_proximity(&mut robot, &PollingSettings::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CollectorError::Device(DeviceError::Disconnected)));
    }

    #[test]
    fn size_check_requires_exact_length() {
        assert!(validate_image_size(&[0u8; 691_200], 691_200));
        assert!(!validate_image_size(&[0u8; 691_199], 691_200));
        assert!(!validate_image_size(&[], 691_200));
    }
}
