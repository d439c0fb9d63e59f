//! Observing session tracking (§4.H ADDED), backing the `start_session` /
//! `end_session` / `get_session_status` tools.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Idle,
    Active,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub target: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub frames_captured: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStatus {
    pub state: SessionState,
    pub session: Option<Session>,
}

/// Persisted on safe shutdown to `<data_dir>/session_<id>.json` (§6); the
/// only on-disk record of a session, since alert history stays in-memory
/// and operational history lives in the SQLite database instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionLog {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub images_captured: u64,
    pub total_exposure_sec: f64,
    pub current_target: Option<String>,
    pub error_count: u64,
    pub last_error: Option<String>,
    pub metrics: crate::orchestrator::metrics::MetricsSnapshot,
}

#[derive(Default)]
pub struct SessionManager {
    current: Mutex<Option<Session>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starting a session while one is already active ends it first, so
    /// the orchestrator never has to reconcile two open sessions.
    pub async fn start(&self, target: Option<String>) -> Session {
        let mut current = self.current.lock().await;
        let session = Session {
            id: uuid::Uuid::new_v4().to_string()[..8].to_string(),
            target,
            started_at: Utc::now(),
            ended_at: None,
            frames_captured: 0,
        };
        *current = Some(session.clone());
        session
    }

    pub async fn end(&self) -> Option<Session> {
        let mut current = self.current.lock().await;
        if let Some(mut session) = current.take() {
            session.ended_at = Some(Utc::now());
            Some(session)
        } else {
            None
        }
    }

    pub async fn record_frame(&self) {
        if let Some(session) = self.current.lock().await.as_mut() {
            session.frames_captured += 1;
        }
    }

    pub async fn status(&self) -> SessionStatus {
        let current = self.current.lock().await;
        match current.as_ref() {
            Some(session) => SessionStatus {
                state: SessionState::Active,
                session: Some(session.clone()),
            },
            None => SessionStatus {
                state: SessionState::Idle,
                session: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn starting_a_session_while_active_replaces_it() {
        let manager = SessionManager::new();
        let first = manager.start(Some("M31".to_string())).await;
        let second = manager.start(Some("M42".to_string())).await;
        assert_ne!(first.id, second.id);
        let status = manager.status().await;
        assert_eq!(status.session.unwrap().id, second.id);
    }

    #[tokio::test]
    async fn ending_with_no_active_session_is_none() {
        let manager = SessionManager::new();
        assert!(manager.end().await.is_none());
    }

    #[tokio::test]
    async fn record_frame_increments_active_session_count() {
        let manager = SessionManager::new();
        manager.start(None).await;
        manager.record_frame().await;
        manager.record_frame().await;
        let status = manager.status().await;
        assert_eq!(status.session.unwrap().frames_captured, 2);
    }
}
