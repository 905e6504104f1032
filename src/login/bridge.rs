//! Login form and JSON submission endpoint.

use axum::body::Body;
use axum::http::header::{self, HeaderValue};
use axum::http::{Method, Request, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::config::ProxyConfig;
use crate::error::ProxyError;
use crate::http::request::read_body;
use crate::upstream::Upstream;

const PAGE_TEMPLATE: &str = include_str!("login.html");

pub const EMAIL_NOT_FOUND: &str = "email does not exist";
pub const NO_PASSWORD: &str =
    "this account signs in with Google or Clever, use that sign-in method on the game site instead";
pub const LOGIN_FAILED: &str = "login failed";

/// Body accepted by the submission endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginSubmission {
    pub email: String,
    pub password: String,
}

/// What the email check says about an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountStatus {
    Missing,
    /// Exists but signs in through a third-party provider.
    NoPassword,
    Password,
}

/// Read the email-check answer. `exists` is required; a missing
/// `hasPassword` means the account has one.
pub fn account_status(info: &Value) -> Result<AccountStatus, ProxyError> {
    let exists = info
        .get("exists")
        .and_then(Value::as_bool)
        .ok_or_else(|| {
            ProxyError::UnexpectedResponse(format!("email check without 'exists': {}", info))
        })?;
    if !exists {
        return Ok(AccountStatus::Missing);
    }
    match info.get("hasPassword").and_then(Value::as_bool) {
        Some(false) => Ok(AccountStatus::NoPassword),
        _ => Ok(AccountStatus::Password),
    }
}

/// Read the credential-submission answer: `Err` carries the message shown
/// to the user.
pub fn credentials_result(body: &[u8]) -> Result<(), String> {
    let reply: Value = serde_json::from_slice(body).map_err(|_| LOGIN_FAILED.to_string())?;
    if let Some(message) = reply.get("message") {
        return Err(match message {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        });
    }
    match reply.get("user") {
        Some(user) if !user.is_null() => Ok(()),
        _ => Err(LOGIN_FAILED.to_string()),
    }
}

fn json_reply(status: StatusCode, body: Value) -> Response {
    (status, Json(body)).into_response()
}

fn user_error(message: impl Into<String>) -> Response {
    json_reply(StatusCode::OK, json!({ "error": message.into() }))
}

/// Serves the login form and relays submissions to the upstream.
pub struct LoginBridge {
    upstream: Arc<Upstream>,
    page: String,
    email_check_path: String,
    credentials_path: String,
    max_body_size: usize,
}

impl LoginBridge {
    pub fn new(upstream: Arc<Upstream>, config: &ProxyConfig) -> Self {
        let page = PAGE_TEMPLATE
            .replace("{{SUBMIT_PATH}}", &config.login.submit_path)
            .replace("{{JOIN_PATH}}", &config.routing.join_path);
        Self {
            upstream,
            page,
            email_check_path: config.login.email_check_path.clone(),
            credentials_path: config.login.credentials_path.clone(),
            max_body_size: config.limits.max_body_size,
        }
    }

    /// The login form.
    pub fn page(&self) -> Response {
        Html(self.page.clone()).into_response()
    }

    /// Handle a submission.
    pub async fn submit(&self, request: Request<Body>) -> Result<Response, ProxyError> {
        if request.method() != Method::POST {
            return Ok(json_reply(
                StatusCode::METHOD_NOT_ALLOWED,
                json!({ "error": "method not allowed" }),
            ));
        }

        let body = match read_body(request.into_body(), self.max_body_size).await {
            Ok(body) => body,
            Err(e) => {
                tracing::debug!(error = %e, "Unreadable login submission");
                return Ok(json_reply(
                    StatusCode::BAD_REQUEST,
                    json!({ "error": "invalid request body" }),
                ));
            }
        };
        let submission: LoginSubmission = match serde_json::from_slice(&body) {
            Ok(submission) => submission,
            Err(e) => {
                tracing::debug!(error = %e, "Rejected login submission");
                return Ok(json_reply(
                    StatusCode::BAD_REQUEST,
                    json!({ "error": "invalid JSON body" }),
                ));
            }
        };

        let info: Value = self
            .upstream
            .post_json(&self.email_check_path, &json!({ "email": submission.email }))
            .await?
            .json()
            .await?;
        match account_status(&info)? {
            AccountStatus::Missing => return Ok(user_error(EMAIL_NOT_FOUND)),
            AccountStatus::NoPassword => return Ok(user_error(NO_PASSWORD)),
            AccountStatus::Password => {}
        }

        let reply = self
            .upstream
            .post_json(
                &self.credentials_path,
                &json!({ "email": submission.email, "password": submission.password }),
            )
            .await?;
        let cookies: Vec<HeaderValue> = reply
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .cloned()
            .collect();
        let body = reply.bytes().await?;

        match credentials_result(&body) {
            Ok(()) => {
                tracing::info!(cookies = cookies.len(), "Login bridged");
                let mut response = json_reply(StatusCode::OK, json!({ "success": true }));
                for cookie in cookies {
                    response.headers_mut().append(header::SET_COOKIE, cookie);
                }
                Ok(response)
            }
            Err(message) => Ok(user_error(message)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_missing() {
        assert_eq!(
            account_status(&json!({ "exists": false })).unwrap(),
            AccountStatus::Missing
        );
    }

    #[test]
    fn account_without_password() {
        assert_eq!(
            account_status(&json!({ "exists": true, "hasPassword": false })).unwrap(),
            AccountStatus::NoPassword
        );
        assert_eq!(
            account_status(&json!({ "exists": true })).unwrap(),
            AccountStatus::Password
        );
    }

    #[test]
    fn email_check_without_exists_is_internal_error() {
        assert!(matches!(
            account_status(&json!({ "ok": true })),
            Err(ProxyError::UnexpectedResponse(_))
        ));
    }

    #[test]
    fn credentials_message_becomes_error() {
        assert_eq!(
            credentials_result(br#"{"message":"Incorrect password"}"#),
            Err("Incorrect password".to_string())
        );
    }

    #[test]
    fn credentials_without_user_is_generic_error() {
        assert_eq!(credentials_result(br#"{}"#), Err(LOGIN_FAILED.to_string()));
        assert_eq!(
            credentials_result(br#"{"user":null}"#),
            Err(LOGIN_FAILED.to_string())
        );
        assert_eq!(
            credentials_result(b"<html>502</html>"),
            Err(LOGIN_FAILED.to_string())
        );
    }

    #[test]
    fn credentials_with_user_succeeds() {
        assert_eq!(credentials_result(br#"{"user":{"_id":"u1"}}"#), Ok(()));
    }

    #[test]
    fn page_points_at_configured_paths() {
        let config = ProxyConfig::default();
        let upstream = Arc::new(
            Upstream::with_client(
                reqwest::Client::new(),
                url::Url::parse(&config.upstream.origin).unwrap(),
            )
            .unwrap(),
        );
        let bridge = LoginBridge::new(upstream, &config);
        assert!(bridge.page.contains("fetch(\"/proxy-login/submit\""));
        assert!(bridge.page.contains("location.href = \"/join\""));
        assert!(!bridge.page.contains("{{"));
    }
}
