use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::observability::metrics::get_metrics;

pub const INVALID_JSON_MESSAGE: &str = "Invalid JSON response";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PayloadStatus {
    Success,
    Error,
    #[default]
    #[serde(other)]
    Unknown,
}

/// Backend envelope: `{ "status": "success"|"error", "message": ..., "data": ... }`
/// tagged with the HTTP status it arrived with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiPayload {
    #[serde(default)]
    pub status: PayloadStatus,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(skip)]
    pub http_status: u16,
}

impl ApiPayload {
    /// Synthetic payload for a body that was not structured data.
    pub fn invalid(http_status: u16) -> Self {
        Self {
            status: PayloadStatus::Error,
            message: Some(INVALID_JSON_MESSAGE.to_owned()),
            data: None,
            http_status,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == PayloadStatus::Success
    }

    /// Decode `data`, treating a missing or null field as `T::default()`.
    pub fn data_as<T: DeserializeOwned + Default>(&self) -> Result<T, serde_json::Error> {
        match &self.data {
            None | Some(Value::Null) => Ok(T::default()),
            Some(value) => T::deserialize(value),
        }
    }
}

/// Parse a response body as an [`ApiPayload`]. Never fails: a body that is
/// not a JSON object becomes [`ApiPayload::invalid`] with the response status.
pub async fn parse_json_safe(response: reqwest::Response) -> ApiPayload {
    let http_status = response.status().as_u16();
    let decoded = match response.bytes().await {
        Ok(bytes) => decode_payload(&bytes, http_status).map_err(|e| e.to_string()),
        Err(e) => Err(e.to_string()),
    };
    match decoded {
        Ok(payload) => payload,
        Err(message) => {
            debug!(http_status, "response body is not a payload object: {}", message);
            get_metrics().await.invalid_payloads.inc();
            ApiPayload::invalid(http_status)
        }
    }
}

pub fn parse_payload_bytes(bytes: &[u8], http_status: u16) -> ApiPayload {
    decode_payload(bytes, http_status).unwrap_or_else(|e| {
        debug!(http_status, "response body is not a payload object: {}", e);
        ApiPayload::invalid(http_status)
    })
}

fn decode_payload(bytes: &[u8], http_status: u16) -> Result<ApiPayload, serde_json::Error> {
    // derived struct impls also accept arrays, only objects are payloads
    let value = match serde_json::from_slice::<Value>(bytes)? {
        value @ Value::Object(_) => value,
        other => {
            return Err(serde::de::Error::invalid_type(
                serde::de::Unexpected::Other(json_kind(&other)),
                &"a payload object",
            ))
        }
    };
    let mut payload = ApiPayload::deserialize(value)?;
    payload.http_status = http_status;
    Ok(payload)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
