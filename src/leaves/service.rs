use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use crate::api::client::{ApiClient, RequestOptions};
use crate::api::error::ApiError;
use crate::api::payload::{parse_json_safe, ApiPayload};
use crate::cache::credential::Credential;
use crate::cache::session::{CredentialError, Session};
use crate::leaves::report::ReportFilter;
use crate::leaves::types::{CurrentUser, Leave, LeaveAction, LeaveStatus, LeaveSubmission};
use crate::leaves::validate::{validate, LeaveForm};

/// Outcome of a mutating call: the backend's message, or a fixed one when
/// it sent none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Acknowledged {
    pub leave_id: String,
    pub message: String,
}

/// Leave API operations. Every call resolves the credential first and sends
/// nothing when none is available.
#[derive(Clone)]
pub struct LeaveService {
    session: Session,
    client: ApiClient,
}

impl LeaveService {
    pub fn new(session: Session, client: ApiClient) -> Self {
        Self { session, client }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub async fn current_user(&self) -> Result<CurrentUser, ApiError> {
        let credential = self.session.resolve().await?;
        let payload = self.call("/api/users/me", RequestOptions::get(), &credential).await?;
        let mut user: CurrentUser = data_or_rejected(&payload, "Failed to load user")?;
        if user.email.is_none() {
            user.email = credential.email();
        }
        Ok(user)
    }

    /// Requests owned by `user_id`, or by the credential's email when `None`.
    pub async fn my_leaves(&self, user_id: Option<&str>) -> Result<Vec<Leave>, ApiError> {
        let credential = self.session.resolve().await?;
        let user_id = match user_id {
            Some(user_id) => user_id.to_owned(),
            None => credential.email().ok_or(CredentialError::MissingClaim("email"))?,
        };
        let options = RequestOptions::get().query("user_id", user_id);
        let payload = self.call("/api/leaves", options, &credential).await?;
        data_or_rejected(&payload, "Failed to fetch leaves")
    }

    /// The caller's own rows for reports. No `user_id` is sent; the backend
    /// scopes the list to the credential.
    pub async fn own_leaves(&self) -> Result<Vec<Leave>, ApiError> {
        let credential = self.session.resolve().await?;
        let payload = self.call("/api/leaves", RequestOptions::get(), &credential).await?;
        data_or_rejected(&payload, "Failed to load")
    }

    pub async fn submit(&self, form: &LeaveForm) -> Result<Acknowledged, ApiError> {
        let valid = validate(form)?;
        let credential = self.session.resolve().await?;
        let user_id = credential.email().ok_or(CredentialError::MissingClaim("email"))?;

        let submission = LeaveSubmission {
            leave_id: Uuid::new_v4().to_string(),
            user_id,
            leave_type: valid.leave_type,
            start_date: valid.start_date,
            end_date: valid.end_date,
            reason: valid.reason,
            status: LeaveStatus::Pending,
        };
        let options = RequestOptions::post().json(to_body(&submission)?);
        let payload = self.call("/api/leaves", options, &credential).await?;
        let message = message_or_rejected(payload, "Failed to submit leave request", "Leave request submitted")?;
        info!(leave_id = %submission.leave_id, "leave request submitted");
        Ok(Acknowledged { leave_id: submission.leave_id, message })
    }

    pub async fn update(&self, leave_id: &str, form: &LeaveForm) -> Result<Acknowledged, ApiError> {
        let valid = validate(form)?;
        let credential = self.session.resolve().await?;
        let options = RequestOptions::put().json(to_body(&valid)?);
        let payload = self.call(&leave_path(leave_id), options, &credential).await?;
        let message = message_or_rejected(payload, "Failed to update leave request", "Leave request updated")?;
        Ok(Acknowledged { leave_id: leave_id.to_owned(), message })
    }

    pub async fn delete(&self, leave_id: &str) -> Result<Acknowledged, ApiError> {
        let credential = self.session.resolve().await?;
        let payload = self.call(&leave_path(leave_id), RequestOptions::delete(), &credential).await?;
        let message = message_or_rejected(payload, "Failed to delete leave request", "Leave request deleted")?;
        Ok(Acknowledged { leave_id: leave_id.to_owned(), message })
    }

    pub async fn pending(&self) -> Result<Vec<Leave>, ApiError> {
        let credential = self.session.resolve().await?;
        let payload = self.call("/api/admin/leaves/pending", RequestOptions::get(), &credential).await?;
        data_or_rejected(&payload, "Failed to load pending leaves")
    }

    pub async fn approve(&self, leave_id: &str) -> Result<Acknowledged, ApiError> {
        self.act(leave_id, "approve", "Leave approved").await
    }

    pub async fn reject(&self, leave_id: &str) -> Result<Acknowledged, ApiError> {
        self.act(leave_id, "reject", "Leave rejected").await
    }

    /// Organisation-wide rows for reports. The filter is sent as query
    /// parameters and also applied locally.
    pub async fn org_leaves(&self, filter: &ReportFilter) -> Result<Vec<Leave>, ApiError> {
        let credential = self.session.resolve().await?;
        let mut options = RequestOptions::get();
        for (key, value) in filter.query() {
            options = options.query(&key, value);
        }
        let payload = self.call("/api/admin/leaves", options, &credential).await?;
        let rows: Vec<Leave> = data_or_rejected(&payload, "Failed to load")?;
        Ok(filter.apply(&rows).into_iter().cloned().collect())
    }

    async fn act(&self, leave_id: &str, action: &str, done: &str) -> Result<Acknowledged, ApiError> {
        let credential = self.session.resolve().await?;
        let options = RequestOptions::post().json(to_body(&LeaveAction { leave_id })?);
        let path = format!("/api/admin/leaves/{}", action);
        let payload = self.call(&path, options, &credential).await?;
        let message = message_or_rejected(payload, "Action failed", done)?;
        Ok(Acknowledged { leave_id: leave_id.to_owned(), message })
    }

    async fn call(&self, path: &str, options: RequestOptions, credential: &Credential) -> Result<ApiPayload, ApiError> {
        let response = self.client.fetch_authorized(path, options, credential).await?;
        let payload = parse_json_safe(response).await;
        debug!(path, http_status = payload.http_status, status = ?payload.status, "api payload");
        Ok(payload)
    }
}

fn leave_path(leave_id: &str) -> String {
    format!("/api/leaves/{}", leave_id)
}

fn to_body<T: Serialize>(value: &T) -> Result<Value, ApiError> {
    serde_json::to_value(value).map_err(|source| ApiError::Decode { http_status: 0, source })
}

fn rejected(payload: &ApiPayload, fallback: &str) -> ApiError {
    ApiError::Rejected {
        http_status: payload.http_status,
        message: payload
            .message
            .clone()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| fallback.to_owned()),
    }
}

fn data_or_rejected<T: DeserializeOwned + Default>(payload: &ApiPayload, fallback: &str) -> Result<T, ApiError> {
    if !payload.is_success() {
        return Err(rejected(payload, fallback));
    }
    payload
        .data_as()
        .map_err(|source| ApiError::Decode { http_status: payload.http_status, source })
}

fn message_or_rejected(payload: ApiPayload, fallback: &str, done: &str) -> Result<String, ApiError> {
    if !payload.is_success() {
        return Err(rejected(&payload, fallback));
    }
    Ok(payload.message.filter(|m| !m.is_empty()).unwrap_or_else(|| done.to_owned()))
}
