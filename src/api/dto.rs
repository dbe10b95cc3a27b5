//! Data Transfer Objects
//!
//! Request and response types of the membership API that are not plain
//! model records.

use serde::{Deserialize, Serialize};

use crate::api::auth::Claims;

/// Response of `GET /status`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub http_status: u16,
    pub http_message: String,
    pub authorization_connected: bool,
    pub database_connected: bool,
}

/// Body of `PATCH /members/:id/note`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NoteRequest {
    #[serde(default)]
    pub note: Option<String>,
}

/// Response of `GET /session/current`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    pub token_claims: Claims,
}

/// Body of a `202 Accepted` response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Accepted {
    pub status: u16,
    pub message: String,
}

impl Default for Accepted {
    fn default() -> Self {
        Self {
            status: 202,
            message: "Accepted".to_string(),
        }
    }
}
