//! Operator session.
//!
//! The screens only run for a signed-in operator. The session lives in memory
//! for the lifetime of the process; there is no credential check because the
//! store API itself is unauthenticated.

use chrono::{DateTime, Utc};
use std::sync::Mutex;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub session_id: String,
    pub operator: String,
    pub signed_in_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct SessionState {
    current: Mutex<Option<Session>>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a session for `operator`, replacing any existing one.
    pub fn sign_in(&self, operator: &str) -> Result<Session, String> {
        let operator = operator.trim();
        if operator.is_empty() {
            return Err("Operator name is required".into());
        }
        let session = Session {
            session_id: Uuid::new_v4().to_string(),
            operator: operator.to_string(),
            signed_in_at: Utc::now(),
        };
        let mut current = self.current.lock().map_err(|e| e.to_string())?;
        if let Some(previous) = current.replace(session.clone()) {
            info!(session_id = %previous.session_id, "replacing existing session");
        }
        info!(session_id = %session.session_id, operator = %session.operator, "signed in");
        Ok(session)
    }

    pub fn sign_out(&self) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(session) = current.take() {
            info!(session_id = %session.session_id, "signed out");
        }
    }

    pub fn current(&self) -> Option<Session> {
        self.current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// The active session, or an error telling the operator to sign in.
    pub fn require(&self) -> Result<Session, String> {
        self.current()
            .ok_or_else(|| "Not signed in: start a session first".to_string())
    }
}
