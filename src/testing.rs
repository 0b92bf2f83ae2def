//! Scripted in-memory store used by unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use serde_json::Value;

use crate::api::RemoteStore;
use crate::error::ApiError;

struct Scripted {
    delay: Duration,
    response: Result<Value, ApiError>,
}

/// Responses are queued per path and consumed in order. Unscripted calls
/// fail with a transport error, like an unreachable server.
#[derive(Default)]
pub struct ScriptedStore {
    responses: Mutex<HashMap<String, VecDeque<Scripted>>>,
    calls: Mutex<Vec<String>>,
    posted: Mutex<Vec<Value>>,
}

impl ScriptedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, path: &str, response: Result<Value, ApiError>) {
        self.respond_after(path, Duration::ZERO, response);
    }

    pub fn respond_after(&self, path: &str, delay: Duration, response: Result<Value, ApiError>) {
        self.responses
            .lock()
            .expect("responses lock")
            .entry(path.to_string())
            .or_default()
            .push_back(Scripted { delay, response });
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn posted_bodies(&self) -> Vec<Value> {
        self.posted.lock().expect("posted lock").clone()
    }

    fn next(&self, path: &str) -> Scripted {
        self.responses
            .lock()
            .expect("responses lock")
            .get_mut(path)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Scripted {
                delay: Duration::ZERO,
                response: Err(ApiError::Transport(format!("no scripted response for {path}"))),
            })
    }
}

impl RemoteStore for ScriptedStore {
    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value, ApiError> {
        let call = if query.is_empty() {
            format!("GET {path}")
        } else {
            let pairs: Vec<String> = query.iter().map(|(k, v)| format!("{k}={v}")).collect();
            format!("GET {path}?{}", pairs.join("&"))
        };
        self.calls.lock().expect("calls lock").push(call);
        let scripted = self.next(path);
        if !scripted.delay.is_zero() {
            tokio::time::sleep(scripted.delay).await;
        }
        scripted.response
    }

    async fn post_json(&self, path: &str, body: Value) -> Result<Value, ApiError> {
        self.calls
            .lock()
            .expect("calls lock")
            .push(format!("POST {path}"));
        self.posted.lock().expect("posted lock").push(body);
        let scripted = self.next(path);
        if !scripted.delay.is_zero() {
            tokio::time::sleep(scripted.delay).await;
        }
        scripted.response
    }
}
