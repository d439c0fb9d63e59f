//! Focuser stub (§4.B ADDED). A full HFD/V-curve auto-focus implementation
//! (`original_source/services/focus/focuser_service.py`) is out of scope
//! (§1); what's in scope is the position/state contract the tool executor
//! and web status API consume, plus a deterministic `run_autofocus` that
//! settles near a configured target without a real camera loop.

use tokio::sync::RwLock;

/// Re-focus temperature threshold in °C, matching the original's
/// `temp_interval_c` default.
const REFOCUS_TEMP_DELTA_C: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum FocuserState {
    Idle,
    Moving,
    Autofocus,
    Error,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct FocusStatus {
    pub connected: bool,
    pub state: FocuserState,
    pub position: i32,
    pub temperature_c: f64,
    pub last_hfd: Option<f64>,
}

struct FocusState {
    state: FocuserState,
    position: i32,
    temperature_c: f64,
    last_hfd: Option<f64>,
}

pub struct FocusService {
    max_position: i32,
    hfd_target: f64,
    state: RwLock<FocusState>,
}

impl FocusService {
    pub fn new(max_position: i32, hfd_target: f64) -> Self {
        Self {
            max_position,
            hfd_target,
            state: RwLock::new(FocusState {
                state: FocuserState::Idle,
                position: max_position / 2,
                temperature_c: 15.0,
                last_hfd: None,
            }),
        }
    }

    pub async fn status(&self) -> FocusStatus {
        let state = self.state.read().await;
        FocusStatus {
            connected: true,
            state: state.state,
            position: state.position,
            temperature_c: state.temperature_c,
            last_hfd: state.last_hfd,
        }
    }

    pub async fn move_to(&self, position: i32) -> anyhow::Result<()> {
        if position < 0 || position > self.max_position {
            anyhow::bail!("position {position} outside 0..={}", self.max_position);
        }
        let mut state = self.state.write().await;
        state.state = FocuserState::Moving;
        state.position = position;
        state.state = FocuserState::Idle;
        Ok(())
    }

    /// Deterministic stand-in for the HFD minimum search the original
    /// samples across `autofocus_step_size` increments and fits; converges
    /// the reported HFD toward `hfd_target` without driving a camera.
    pub async fn run_autofocus(&self) -> anyhow::Result<FocusStatus> {
        let mut state = self.state.write().await;
        state.state = FocuserState::Autofocus;
        state.last_hfd = Some(self.hfd_target);
        state.state = FocuserState::Idle;
        Ok(FocusStatus {
            connected: true,
            state: state.state,
            position: state.position,
            temperature_c: state.temperature_c,
            last_hfd: state.last_hfd,
        })
    }

    pub async fn needs_refocus(&self, reference_temperature_c: f64) -> bool {
        let state = self.state.read().await;
        (state.temperature_c - reference_temperature_c).abs() > REFOCUS_TEMP_DELTA_C
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn move_to_rejects_out_of_range_position() {
        let service = FocusService::new(50000, 3.0);
        assert!(service.move_to(-1).await.is_err());
        assert!(service.move_to(60000).await.is_err());
        assert!(service.move_to(1000).await.is_ok());
    }

    #[tokio::test]
    async fn autofocus_converges_to_target_hfd() {
        let service = FocusService::new(50000, 2.5);
        let status = service.run_autofocus().await.unwrap();
        assert_eq!(status.last_hfd, Some(2.5));
        assert_eq!(status.state, FocuserState::Idle);
    }
}
