// Leave API calls end to end: routes, query parameters, bodies, the bearer
// header and how backend answers turn into results.

#[cfg(test)]
mod test {

    use std::sync::{Arc, Mutex};
    use std::time::{Duration, Instant};

    use axum::extract::RawQuery;
    use axum::http::HeaderMap;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use httpmock::Method::{DELETE, GET, POST, PUT};
    use httpmock::MockServer;
    use serde_json::{json, Value};

    use crate::api::payload::INVALID_JSON_MESSAGE;
    use crate::api::{ApiError, FetchError};
    use crate::cache::session::{CredentialError, Session};
    use crate::leaves::LeaveService;
    use crate::leaves::report::ReportFilter;
    use crate::leaves::types::{LeaveStatus, LeaveType};
    use crate::leaves::validate::LeaveForm;
    use crate::store::MemoryStore;
    use crate::tests::common::{api_client, counter, hits, jwt_for, service, spawn_axum};

    fn row(user: &str, kind: &str, start: &str, end: &str, status: &str) -> Value {
        json!({
            "leave_id": format!("{}-{}", user, start),
            "user_id": user,
            "leave_type": kind,
            "start_date": start,
            "end_date": end,
            "reason": "family matters",
            "status": status,
            "created_at": "2024-01-01T08:00:00Z"
        })
    }

    fn form(leave_type: &str, start: &str, end: &str, reason: &str) -> LeaveForm {
        LeaveForm {
            leave_type: leave_type.to_owned(),
            start_date: start.to_owned(),
            end_date: end.to_owned(),
            reason: reason.to_owned(),
        }
    }

    #[tokio::test]
    async fn my_leaves_sends_bearer_and_email_filter() {
        let server = MockServer::start_async().await;
        let token = jwt_for("ann@corp.io");
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/leaves")
                    .query_param("user_id", "ann@corp.io")
                    .header("authorization", format!("Bearer {}", token));
                then.status(200)
                    .header("Content-Type", "application/json")
                    .json_body(json!({
                        "status": "success",
                        "data": [row("ann@corp.io", "sick", "2024-02-01", "2024-02-02", "approved")]
                    }));
            })
            .await;

        let leaves = service(&server.base_url(), Some(&token)).my_leaves(None).await.unwrap();
        mock.assert_async().await;
        assert_eq!(leaves.len(), 1);
        assert_eq!(leaves[0].kind(), Some(LeaveType::Sick));
        assert_eq!(leaves[0].state(), Some(LeaveStatus::Approved));
    }

    #[tokio::test]
    async fn no_credential_means_no_request() {
        let calls = counter();
        let seen = calls.clone();
        let router = Router::new().fallback(move || {
            let seen = seen.clone();
            async move {
                seen.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                Json(json!({"status":"success","data":[]}))
            }
        });
        let (handle, addr) = spawn_axum(router).await;
        let api = service(&format!("http://{}", addr), None);

        let err = api.my_leaves(Some("ann@corp.io")).await.unwrap_err();
        assert!(matches!(err, ApiError::Credential(CredentialError::Unavailable)));
        assert_eq!(err.user_message(), "Missing auth token");
        assert!(api.pending().await.is_err());
        assert!(api.approve("l-1").await.is_err());
        assert!(api.submit(&form("annual", "2024-05-01", "2024-05-02", "a long enough reason")).await.is_err());
        assert_eq!(hits(&calls), 0);
        handle.abort();
    }

    #[tokio::test]
    async fn domain_error_message_is_passed_through() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/admin/leaves/pending");
                then.status(403).json_body(json!({"status":"error","message":"Admin access required"}));
            })
            .await;

        let err = service(&server.base_url(), Some("tok")).pending().await.unwrap_err();
        match &err {
            ApiError::Rejected { http_status, message } => {
                assert_eq!(*http_status, 403);
                assert_eq!(message, "Admin access required");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(err.user_message(), "Admin access required");
    }

    #[tokio::test]
    async fn approve_posts_the_id_and_falls_back_to_a_fixed_message() {
        let server = MockServer::start_async().await;
        let approve = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/admin/leaves/approve")
                    .header("authorization", "Bearer tok")
                    .json_body(json!({"leave_id": "l-7"}));
                then.status(200).json_body(json!({"status":"success","message":"Leave approved successfully"}));
            })
            .await;
        let reject = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/admin/leaves/reject");
                then.status(500).json_body(json!({"status":"error"}));
            })
            .await;

        let api = service(&server.base_url(), Some("tok"));
        let done = api.approve("l-7").await.unwrap();
        assert_eq!(done.leave_id, "l-7");
        assert_eq!(done.message, "Leave approved successfully");
        approve.assert_async().await;

        let err = api.reject("l-7").await.unwrap_err();
        assert_eq!(err.user_message(), "Action failed");
        reject.assert_async().await;
    }

    #[tokio::test]
    async fn html_answer_is_reported_as_invalid_json_with_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/users/me");
                then.status(502).body("<html>Bad Gateway</html>");
            })
            .await;

        let err = service(&server.base_url(), Some("tok")).current_user().await.unwrap_err();
        assert!(matches!(err, ApiError::Rejected { http_status: 502, .. }));
        assert_eq!(err.user_message(), INVALID_JSON_MESSAGE);
    }

    #[tokio::test]
    async fn current_user_reads_admin_flag_and_falls_back_to_claim_email() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/users/me");
                then.status(200).json_body(json!({"status":"success","data":{"isAdmin":true}}));
            })
            .await;

        let user = service(&server.base_url(), Some(&jwt_for("boss@corp.io"))).current_user().await.unwrap();
        assert!(user.is_admin);
        assert_eq!(user.email.as_deref(), Some("boss@corp.io"));
    }

    #[tokio::test]
    async fn unexpected_data_shape_is_a_decode_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/admin/leaves/pending");
                then.status(200).json_body(json!({"status":"success","data":{"rows":[]}}));
            })
            .await;

        let err = service(&server.base_url(), Some("tok")).pending().await.unwrap_err();
        assert!(matches!(err, ApiError::Decode { http_status: 200, .. }));
    }

    #[tokio::test]
    async fn submit_builds_a_pending_request_for_the_claim_email() {
        let captured: Arc<Mutex<Option<Value>>> = Arc::new(Mutex::new(None));
        let sink = captured.clone();
        let router = Router::new().route(
            "/api/leaves",
            post(move |Json(body): Json<Value>| {
                let sink = sink.clone();
                async move {
                    *sink.lock().unwrap() = Some(body);
                    Json(json!({"status":"success","message":"Leave request submitted successfully"}))
                }
            }),
        );
        let (handle, addr) = spawn_axum(router).await;
        let api = service(&format!("http://{}", addr), Some(&jwt_for("ann@corp.io")));

        let done = api
            .submit(&form("Annual", "2024-05-01", "2024-05-03", "  visiting family abroad "))
            .await
            .unwrap();
        assert_eq!(done.message, "Leave request submitted successfully");

        let body = captured.lock().unwrap().clone().unwrap();
        assert_eq!(body["leave_id"], done.leave_id.as_str());
        assert!(uuid::Uuid::parse_str(&done.leave_id).is_ok());
        assert_eq!(body["user_id"], "ann@corp.io");
        assert_eq!(body["leave_type"], "annual");
        assert_eq!(body["start_date"], "2024-05-01");
        assert_eq!(body["end_date"], "2024-05-03");
        assert_eq!(body["reason"], "visiting family abroad");
        assert_eq!(body["status"], "pending");
        handle.abort();
    }

    #[tokio::test]
    async fn invalid_form_or_missing_email_sends_nothing() {
        let calls = counter();
        let seen = calls.clone();
        let router = Router::new().fallback(move || {
            let seen = seen.clone();
            async move {
                seen.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                Json(json!({"status":"success"}))
            }
        });
        let (handle, addr) = spawn_axum(router).await;
        let base = format!("http://{}", addr);

        let err = service(&base, Some(&jwt_for("ann@corp.io")))
            .submit(&form("annual", "2024-05-03", "2024-05-01", "short"))
            .await
            .unwrap_err();
        match &err {
            ApiError::Validation(errors) => assert_eq!(errors.fields().len(), 2),
            other => panic!("unexpected error: {:?}", other),
        }

        let err = service(&base, Some("opaque-token"))
            .submit(&form("annual", "2024-05-01", "2024-05-01", "a long enough reason"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Credential(CredentialError::MissingClaim("email"))));
        assert_eq!(hits(&calls), 0);
        handle.abort();
    }

    #[tokio::test]
    async fn update_and_delete_address_the_request_by_id() {
        let server = MockServer::start_async().await;
        let update = server
            .mock_async(|when, then| {
                when.method(PUT).path("/api/leaves/l-9").json_body(json!({
                    "leave_type": "casual",
                    "start_date": "2024-07-01",
                    "end_date": "2024-07-01",
                    "reason": "moving apartments"
                }));
                then.status(200).json_body(json!({"status":"success"}));
            })
            .await;
        let delete = server
            .mock_async(|when, then| {
                when.method(DELETE).path("/api/leaves/l-9");
                then.status(200).json_body(json!({"status":"success","message":"Deleted"}));
            })
            .await;

        let api = service(&server.base_url(), Some("tok"));
        let updated = api.update("l-9", &form("casual", "2024-07-01", "2024-07-01", "moving apartments")).await.unwrap();
        assert_eq!(updated.message, "Leave request updated");
        assert_eq!(api.delete("l-9").await.unwrap().message, "Deleted");
        update.assert_async().await;
        delete.assert_async().await;
    }

    #[tokio::test]
    async fn org_leaves_sends_the_filter_and_applies_it_locally() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/admin/leaves")
                    .query_param("start", "2024-03-01")
                    .query_param("type", "all")
                    .query_param("status", "approved")
                    .query_param("employee", "ann@corp.io");
                then.status(200).json_body(json!({
                    "status": "success",
                    "data": [
                        row("Ann@Corp.io", "annual", "2024-03-04", "2024-03-06", "approved"),
                        row("bob@corp.io", "annual", "2024-03-04", "2024-03-06", "approved"),
                        row("ann@corp.io", "sick", "2024-02-01", "2024-02-02", "approved"),
                        row("ann@corp.io", "sick", "2024-03-10", "2024-03-10", "pending")
                    ]
                }));
            })
            .await;

        let filter = ReportFilter {
            status: Some(LeaveStatus::Approved),
            start: chrono::NaiveDate::from_ymd_opt(2024, 3, 1),
            employee: Some("Ann@corp.io ".to_owned()),
            ..ReportFilter::default()
        };
        let rows = service(&server.base_url(), Some("tok")).org_leaves(&filter).await.unwrap();
        mock.assert_async().await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].user_id, "Ann@Corp.io");
    }

    #[tokio::test]
    async fn own_leaves_needs_no_email_claim_and_sends_no_user_filter() {
        let seen_query: Arc<Mutex<Option<Option<String>>>> = Arc::new(Mutex::new(None));
        let seen = seen_query.clone();
        let router = Router::new().route(
            "/api/leaves",
            get(move |RawQuery(query): RawQuery| {
                let seen = seen.clone();
                async move {
                    *seen.lock().unwrap() = Some(query);
                    Json(json!({
                        "status": "success",
                        "data": [row("me@corp.io", "casual", "2024-04-01", "2024-04-01", "approved")]
                    }))
                }
            }),
        );
        let (handle, addr) = spawn_axum(router).await;
        let api = service(&format!("http://{}", addr), Some("opaque-token"));

        let err = api.my_leaves(None).await.unwrap_err();
        assert!(matches!(err, ApiError::Credential(CredentialError::MissingClaim("email"))));
        assert!(seen_query.lock().unwrap().is_none());

        let rows = api.own_leaves().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].user_id, "me@corp.io");
        assert_eq!(*seen_query.lock().unwrap(), Some(None));
        handle.abort();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn stored_token_is_sent_and_a_slow_backend_times_out() {
        let seen_auth: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));
        let seen = seen_auth.clone();
        let router = Router::new().route(
            "/api/admin/leaves/pending",
            get(move |headers: HeaderMap| {
                let seen = seen.clone();
                async move {
                    *seen.lock().unwrap() =
                        headers.get("authorization").and_then(|v| v.to_str().ok()).map(str::to_owned);
                    tokio::time::sleep(Duration::from_secs(2)).await;
                    Json(json!({"status":"success","data":[]}))
                }
            }),
        );
        let (handle, addr) = spawn_axum(router).await;
        let store = Arc::new(MemoryStore::with_entry("jwt", "stored-token"));
        let session = Session::builder().store(store).build();
        let api = LeaveService::new(session, api_client(&format!("http://{}", addr), Duration::from_millis(100)));

        let started = Instant::now();
        let err = api.pending().await.unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(matches!(err, ApiError::Fetch(FetchError::Timeout { .. })));
        assert_eq!(err.user_message(), "Request timed out");
        assert_eq!(seen_auth.lock().unwrap().as_deref(), Some("Bearer stored-token"));
        handle.abort();
    }
}
