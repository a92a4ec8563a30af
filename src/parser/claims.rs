use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use serde_json::{Map, Value};
use tracing::debug;

/// base64url, padding optional
const JWT_PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decode the payload segment of a JWT-shaped string.
///
/// No signature check happens here. The result is for display only and must
/// never gate an action. Any malformed input yields `None`.
pub fn decode_claims(token: &str) -> Option<Map<String, Value>> {
    let parts: Vec<&str> = token.trim().split('.').collect();
    if parts.len() != 3 {
        debug!(segments = parts.len(), "credential is not a three segment token");
        return None;
    }

    // some issuers emit the standard alphabet, fold it into url-safe first
    let payload = parts[1].replace('+', "-").replace('/', "_");
    let decoded = JWT_PAYLOAD_ENGINE
        .decode(payload.as_bytes())
        .inspect_err(|e| debug!("credential payload is not base64url: {}", e))
        .ok()?;

    match serde_json::from_slice::<Value>(&decoded) {
        Ok(Value::Object(claims)) => Some(claims),
        Ok(_) => {
            debug!("credential payload is not a JSON object");
            None
        }
        Err(e) => {
            debug!("credential payload is not JSON: {}", e);
            None
        }
    }
}

/// Single string claim, empty strings count as absent.
pub fn string_claim(token: &str, name: &str) -> Option<String> {
    decode_claims(token)?
        .get(name)
        .and_then(Value::as_str)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

pub fn email_from_jwt(token: &str) -> Option<String> {
    string_claim(token, "email")
}
