use std::fmt;

use http::HeaderValue;

use crate::parser::claims::email_from_jwt;

/// Opaque bearer credential. Never empty once constructed.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    value: String,
}

impl Credential {
    /// `None` for empty or whitespace-only input.
    pub fn new(value: impl AsRef<str>) -> Option<Self> {
        let value = value.as_ref().trim();
        if value.is_empty() {
            return None;
        }
        Some(Self { value: value.to_owned() })
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Display-only email claim.
    pub fn email(&self) -> Option<String> {
        email_from_jwt(&self.value)
    }

    /// `Authorization` header value.
    pub fn bearer_header(&self) -> Result<HeaderValue, http::header::InvalidHeaderValue> {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", self.value))?;
        value.set_sensitive(true);
        Ok(value)
    }

    /// Raw value for the legacy `x-jwt-assertion` header.
    pub fn assertion_header(&self) -> Result<HeaderValue, http::header::InvalidHeaderValue> {
        let mut value = HeaderValue::from_str(&self.value)?;
        value.set_sensitive(true);
        Ok(value)
    }
}

// keep the secret out of logs
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("len", &self.value.len())
            .field("email", &self.email())
            .finish()
    }
}
