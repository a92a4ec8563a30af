use std::time::Duration;

use anyhow::Result;
use http::header::{HeaderName, AUTHORIZATION};
use http::{HeaderMap, HeaderValue, Method};
use reqwest::{Client, Response};
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, error};

use crate::api::error::{ApiError, FetchError};
use crate::cache::credential::Credential;
use crate::cache::session::CredentialError;
use crate::config::proc_loader::normalize_base;
use crate::config::settings::{AuthHeaderStyle, SettingsConfig};
use crate::observability::metrics::get_metrics;

pub const JWT_ASSERTION_HEADER: &str = "x-jwt-assertion";

/// Everything but the address of one request.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub headers: HeaderMap,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self::new(Method::GET)
    }
}

impl RequestOptions {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            headers: HeaderMap::new(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get() -> Self {
        Self::new(Method::GET)
    }

    pub fn post() -> Self {
        Self::new(Method::POST)
    }

    pub fn put() -> Self {
        Self::new(Method::PUT)
    }

    pub fn delete() -> Self {
        Self::new(Method::DELETE)
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.push((key.to_owned(), value.into()));
        self
    }

    /// JSON body; `Content-Type` is set when the request is built.
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Attach the credential in the configured header style.
    pub fn authorized(self, credential: &Credential, style: AuthHeaderStyle) -> Result<Self, CredentialError> {
        match style {
            AuthHeaderStyle::Bearer => {
                let value = credential.bearer_header().map_err(|_| CredentialError::InvalidHeader)?;
                Ok(self.header(AUTHORIZATION, value))
            }
            AuthHeaderStyle::JwtAssertion => {
                let value = credential.assertion_header().map_err(|_| CredentialError::InvalidHeader)?;
                Ok(self.header(HeaderName::from_static(JWT_ASSERTION_HEADER), value))
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base: String,
    timeout: Duration,
    debug: bool,
    header_style: AuthHeaderStyle,
}

impl ApiClient {
    pub fn new(client: Client, base: &str, timeout: Duration) -> Self {
        Self {
            client,
            base: normalize_base(base),
            timeout,
            debug: false,
            header_style: AuthHeaderStyle::default(),
        }
    }

    pub fn from_settings(settings: &SettingsConfig, header_style: AuthHeaderStyle) -> Result<Self> {
        let client = Client::builder().build()?;
        Ok(Self::new(client, &settings.api_base, Duration::from_millis(settings.timeout_ms))
            .with_debug(settings.debug)
            .with_header_style(header_style))
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_header_style(mut self, header_style: AuthHeaderStyle) -> Self {
        self.header_style = header_style;
        self
    }

    pub fn header_style(&self) -> AuthHeaderStyle {
        self.header_style
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Base address + path with exactly one slash between them.
    /// An empty base leaves the path relative to the current origin.
    pub fn api_url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base, path)
        } else {
            format!("{}/{}", self.base, path)
        }
    }

    /// Issue one request bounded by the configured timeout.
    ///
    /// Any HTTP status is a success here; callers inspect status and body.
    pub async fn fetch(&self, path: &str, options: RequestOptions) -> Result<Response, FetchError> {
        let url = self.api_url(path);
        let metrics = get_metrics().await;
        let method_label = options.method.as_str().to_owned();
        metrics.api_requests.with_label_values(&[method_label.as_str()]).inc();

        let mut request = self.client.request(options.method.clone(), &url).headers(options.headers);
        if !options.query.is_empty() {
            request = request.query(&options.query);
        }
        if let Some(body) = &options.body {
            request = request.json(body);
        }

        if self.debug {
            debug!(method = %options.method, url = %url, "api request");
        }
        let start = Instant::now();
        // the timer is dropped with the future when the response wins
        let outcome = match tokio::time::timeout(self.timeout, request.send()).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) if e.is_timeout() => Err(FetchError::Timeout { url: url.clone() }),
            Ok(Err(e)) if e.is_builder() => Err(FetchError::InvalidUrl { url: url.clone(), message: e.to_string() }),
            Ok(Err(e)) => Err(FetchError::Network { url: url.clone(), source: e }),
            Err(_) => Err(FetchError::Timeout { url: url.clone() }),
        };
        let elapsed = start.elapsed();
        metrics
            .api_request_duration
            .with_label_values(&[method_label.as_str()])
            .observe(elapsed.as_secs_f64());

        match &outcome {
            Ok(response) => {
                if self.debug {
                    debug!(
                        url = %url,
                        status = response.status().as_u16(),
                        elapsed_ms = elapsed.as_millis() as u64,
                        "api response"
                    );
                }
            }
            Err(e) => {
                metrics.api_failures.with_label_values(&[e.reason()]).inc();
                error!(url = %url, elapsed_ms = elapsed.as_millis() as u64, "{}", e);
            }
        }
        outcome
    }

    /// `fetch` with the credential attached in the configured header style.
    pub async fn fetch_authorized(
        &self,
        path: &str,
        options: RequestOptions,
        credential: &Credential,
    ) -> Result<Response, ApiError> {
        let options = options.authorized(credential, self.header_style)?;
        Ok(self.fetch(path, options).await?)
    }
}
