// src/remote/client.rs

//! The remote API client seam.
//!
//! Handlers never talk HTTP directly: they call
//! [`RemoteClient::invoke`] with a service method name and JSON
//! parameters, and get back a decoded payload or a structured failure.
//! The blocking [`HttpRemoteClient`] is the production implementation;
//! [`ScriptedClient`] replays canned outcomes for tests.

use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;
use thiserror::Error;

/// One remote call failure: either the transport never produced a
/// response, or the API answered with an error payload.
#[derive(Error, Debug, Clone)]
pub enum ClientError {
    #[error("transport failure calling {method}: {detail}")]
    Transport { method: String, detail: String },
    #[error("API error calling {method}: {status} {reason}: {message}")]
    Api {
        method: String,
        status: u16,
        reason: String,
        message: String,
    },
}

/// The one operation the rest of the program needs from the remote API.
pub trait RemoteClient {
    fn invoke(&self, method: &str, params: &Value) -> Result<Value, ClientError>;
}

/// Blocking JSON-over-HTTP client with a static bearer token. Credential
/// acquisition is the operator's problem; this client just presents
/// whatever token the configuration carries.
#[derive(Debug)]
pub struct HttpRemoteClient {
    http: reqwest::blocking::Client,
    base_url: String,
    auth_token: Option<String>,
}

impl HttpRemoteClient {
    pub fn new(base_url: &str, auth_token: Option<String>) -> Self {
        Self {
            http: reqwest::blocking::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_token,
        }
    }
}

impl RemoteClient for HttpRemoteClient {
    fn invoke(&self, method: &str, params: &Value) -> Result<Value, ClientError> {
        let url = format!("{}/{}", self.base_url, method);
        let mut request = self.http.post(&url).json(params);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().map_err(|e| ClientError::Transport {
            method: method.to_string(),
            detail: e.to_string(),
        })?;

        let status = response.status().as_u16();
        if response.status().is_success() {
            response.json().map_err(|e| ClientError::Transport {
                method: method.to_string(),
                detail: format!("invalid JSON payload: {}", e),
            })
        } else {
            let body: Value = response.json().unwrap_or(Value::Null);
            let (reason, message) = extract_error_fields(&body);
            Err(ClientError::Api {
                method: method.to_string(),
                status,
                reason,
                message,
            })
        }
    }
}

/// Pulls the reason/message pair out of an API error body of the shape
/// `{"error": {"message": ..., "errors": [{"reason": ..., "message": ...}]}}`.
/// Missing pieces degrade to empty strings; classification falls back to
/// the status code.
fn extract_error_fields(body: &Value) -> (String, String) {
    let error = &body["error"];
    let first = &error["errors"][0];
    let reason = first["reason"]
        .as_str()
        .or_else(|| error["status"].as_str())
        .unwrap_or("")
        .to_string();
    let message = first["message"]
        .as_str()
        .or_else(|| error["message"].as_str())
        .unwrap_or("")
        .to_string();
    (reason, message)
}

/// Test double: replays a queue of canned outcomes and records every
/// invocation.
#[derive(Debug, Default)]
pub struct ScriptedClient {
    outcomes: Mutex<VecDeque<Result<Value, ClientError>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedClient {
    pub fn new(outcomes: Vec<Result<Value, ClientError>>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Number of invocations made so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Convenience for an API-error outcome.
    pub fn api_error(method: &str, status: u16, reason: &str, message: &str) -> ClientError {
        ClientError::Api {
            method: method.to_string(),
            status,
            reason: reason.to_string(),
            message: message.to_string(),
        }
    }

    /// Convenience for a transport-error outcome.
    pub fn transport_error(method: &str, detail: &str) -> ClientError {
        ClientError::Transport {
            method: method.to_string(),
            detail: detail.to_string(),
        }
    }
}

impl RemoteClient for ScriptedClient {
    fn invoke(&self, method: &str, _params: &Value) -> Result<Value, ClientError> {
        self.calls.lock().unwrap().push(method.to_string());
        self.outcomes.lock().unwrap().pop_front().unwrap_or_else(|| {
            Err(ClientError::Transport {
                method: method.to_string(),
                detail: "scripted client exhausted".to_string(),
            })
        })
    }
}

// MARK: --- UNIT TESTS ---
