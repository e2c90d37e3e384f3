//! Request and reply messages exchanged with the scope client.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CMD_DISCONNECT: i32 = -1;
pub const CMD_MODEL_INFO_QUERY: i32 = 0;
pub const CMD_SCOPE_REQUEST: i32 = 1;
pub const CMD_TUNE_PARAMS: i32 = 2;
pub const CMD_MODEL_INFO_REPLY: i32 = 3;
pub const CMD_SCOPE_REPLY: i32 = 4;
pub const CMD_ERROR_REPLY: i32 = 6;

/// Errors raised while decoding or encoding protocol messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    Malformed(String),

    #[error("failed to encode reply: {0}")]
    Encode(String),
}

/// Bare envelope used to peek at the command code before decoding the body.
///
/// The code is required: a message without one is malformed, never an
/// implicit disconnect.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "Command")]
    command: i32,
}

/// An inbound request, keyed by its command code.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Disconnect,
    ModelInfoQuery,
    Scope(ScopeRequest),
    TuneParams(TuneParamsRequest),
    Unknown(i32),
}

impl Request {
    /// Decodes a raw JSON message into a typed request.
    pub fn decode(raw: &str) -> Result<Self, ProtocolError> {
        let envelope: Envelope =
            serde_json::from_str(raw).map_err(|e| ProtocolError::Malformed(e.to_string()))?;
        match envelope.command {
            CMD_DISCONNECT => Ok(Request::Disconnect),
            CMD_MODEL_INFO_QUERY => Ok(Request::ModelInfoQuery),
            CMD_SCOPE_REQUEST => serde_json::from_str(raw)
                .map(Request::Scope)
                .map_err(|e| ProtocolError::Malformed(e.to_string())),
            CMD_TUNE_PARAMS => serde_json::from_str(raw)
                .map(Request::TuneParams)
                .map_err(|e| ProtocolError::Malformed(e.to_string())),
            code => Ok(Request::Unknown(code)),
        }
    }
}

/// Waveform capture request (command 1).
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ScopeRequest {
    pub transaction_id: i32,
    pub signals: Vec<i32>,
    pub num_samples: i32,
    pub decimation_period: i32,
    pub trigger_channel: i32,
    pub trigger_edge: i32,
    pub trigger_value: f64,
    pub trigger_delay: i32,
}

/// Positional parameter tuning request (command 2).
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct TuneParamsRequest {
    pub values: Vec<f64>,
}

/// Model description reply (command 3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ModelInfoReply {
    pub command: i32,
    pub base_time_step: f64,
    pub checksum: String,
    pub num_signals: i32,
    pub num_parameters: i32,
}

impl ModelInfoReply {
    pub fn new(base_time_step: f64, checksum: String, num_signals: i32, num_parameters: i32) -> Self {
        Self {
            command: CMD_MODEL_INFO_REPLY,
            base_time_step,
            checksum,
            num_signals,
            num_parameters,
        }
    }
}

/// Capture data reply (command 4); `samples` is sample-major flattened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ScopeReply {
    pub command: i32,
    pub transaction_id: i32,
    pub error_code: i32,
    pub num_samples: i32,
    pub sample_time: f64,
    pub signals: Vec<i32>,
    pub samples: Vec<f64>,
}

impl ScopeReply {
    pub fn new(
        transaction_id: i32,
        error_code: i32,
        sample_time: f64,
        signals: Vec<i32>,
        samples: Vec<f64>,
    ) -> Self {
        let num_samples = if signals.is_empty() {
            0
        } else {
            (samples.len() / signals.len()) as i32
        };
        Self {
            command: CMD_SCOPE_REPLY,
            transaction_id,
            error_code,
            num_samples,
            sample_time,
            signals,
            samples,
        }
    }
}

/// Textual error reply (command 6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ErrorReply {
    pub command: i32,
    pub error_message: String,
}

impl ErrorReply {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            command: CMD_ERROR_REPLY,
            error_message: message.into(),
        }
    }

    pub fn unsupported_command() -> Self {
        Self::new("Unsupported Command.")
    }
}

/// Serializes any reply to its wire representation.
pub fn encode<T: Serialize>(reply: &T) -> Result<String, ProtocolError> {
    serde_json::to_string(reply).map_err(|e| ProtocolError::Encode(e.to_string()))
}
