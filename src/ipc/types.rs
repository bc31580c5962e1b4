use serde::Deserialize;

use crate::remote::Remote;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Live-capture run in progress. The UI holds no session bookkeeping; the
/// sidecar owns the session id and start instant until `capture.stop`.
pub struct CaptureSession {
    pub class_id: String,
    pub session_id: String,
    pub started_at: String,
}

pub struct AppState {
    pub remote: Option<Remote>,
    pub capture: Option<CaptureSession>,
}
