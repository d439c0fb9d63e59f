//! **[ADDED]** Web status API (§4.H): a small `axum` router exposing
//! read-only orchestrator state and a handful of operator-control
//! endpoints alongside the voice/tool surface, grounded in the teacher's
//! `web/mod.rs` `AppState` + `ApiResponse` pattern.

pub mod handlers;
pub mod server;

pub use server::start_web_server;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::orchestrator::Orchestrator;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
}

impl AppState {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            timestamp: Utc::now(),
        }
    }
}

impl ApiResponse<()> {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
            timestamp: Utc::now(),
        }
    }
}
