//! Roll-off roof actuator (§4.B ADDED), distinct from `sensors::enclosure`
//! which only reads reported open/closed state. Grounded in the interlocks
//! `original_source/services/enclosure/roof_controller.py` documents:
//! dual NC limit switches, a bounded motor run time, and a mandatory
//! parked-mount check before opening.

use std::time::Duration;

use tokio::sync::Mutex;

use crate::errors::DeviceError;
use crate::mount::MountEngine;

const MOTOR_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum RoofState {
    Closed,
    Opening,
    Open,
    Closing,
    Fault,
}

pub struct EnclosureController {
    state: Mutex<RoofState>,
}

impl EnclosureController {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RoofState::Closed),
        }
    }

    pub async fn state(&self) -> RoofState {
        *self.state.lock().await
    }

    /// Refuses to open unless the mount reports parked; the limit switches
    /// and motor timeout are simulated rather than driven over GPIO.
    pub async fn open(&self, mount: &MountEngine) -> Result<(), DeviceError> {
        let status = mount.get_status().await.map_err(|err| DeviceError {
            device: "enclosure".to_string(),
            reason: format!("could not confirm mount is parked: {err}"),
        })?;
        if !status.is_parked {
            return Err(DeviceError {
                device: "enclosure".to_string(),
                reason: "refusing to open roof: mount is not parked".to_string(),
            });
        }

        *self.state.lock().await = RoofState::Opening;
        let opened = tokio::time::timeout(MOTOR_TIMEOUT, self.run_limit_switch_to_open()).await;
        match opened {
            Ok(()) => {
                *self.state.lock().await = RoofState::Open;
                Ok(())
            }
            Err(_) => {
                *self.state.lock().await = RoofState::Fault;
                Err(DeviceError {
                    device: "enclosure".to_string(),
                    reason: "roof motor exceeded 60s timeout, stopping for safety".to_string(),
                })
            }
        }
    }

    pub async fn close(&self) -> Result<(), DeviceError> {
        *self.state.lock().await = RoofState::Closing;
        let closed = tokio::time::timeout(MOTOR_TIMEOUT, self.run_limit_switch_to_closed()).await;
        match closed {
            Ok(()) => {
                *self.state.lock().await = RoofState::Closed;
                Ok(())
            }
            Err(_) => {
                *self.state.lock().await = RoofState::Fault;
                Err(DeviceError {
                    device: "enclosure".to_string(),
                    reason: "roof motor exceeded 60s timeout, stopping for safety".to_string(),
                })
            }
        }
    }

    /// Stand-in for driving the motor relay until the open-side NC limit
    /// switch opens its contact.
    async fn run_limit_switch_to_open(&self) {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    async fn run_limit_switch_to_closed(&self) {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

impl Default for EnclosureController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mount::{MountConnection, MountEngine};

    #[tokio::test]
    async fn close_from_closed_state_is_a_noop_success() {
        let controller = EnclosureController::new();
        assert_eq!(controller.state().await, RoofState::Closed);
        controller.close().await.unwrap();
        assert_eq!(controller.state().await, RoofState::Closed);
    }

    #[tokio::test]
    async fn open_fails_without_a_connected_mount() {
        let controller = EnclosureController::new();
        let mount = MountEngine::new(MountConnection::default());
        let result = controller.open(&mount).await;
        assert!(result.is_err());
        assert_eq!(controller.state().await, RoofState::Closed);
    }
}
