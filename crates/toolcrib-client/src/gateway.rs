//! HTTP gateway — request helper and global status-code policy.
//!
//! All model and collection traffic flows through the [`Gateway`] trait.
//! The reqwest-backed [`HttpGateway`] attaches the bearer token, enforces
//! the expected data-status convention, and routes 401/403 into the auth
//! context instead of surfacing them per call.

use std::{future::Future, sync::Arc, time::Duration};

use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::{
  auth::AuthContext,
  error::{Error, Result},
};

// ─── Response envelope ───────────────────────────────────────────────────────

/// The server's uniform response wrapper.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Envelope {
  /// Operation outcome tag (`"created"`, `"updated"`, `"deleted"`, …).
  pub status:    Option<String>,
  #[serde(default)]
  pub data:      Value,
  /// Total page count for paginated list responses.
  pub last_page: Option<u32>,
}

// ─── Gateway trait ───────────────────────────────────────────────────────────

/// Abstraction over the REST gateway.
///
/// `Ok(None)` means the response was consumed by the global 401/403 policy;
/// callers leave their own state untouched and report nothing. When
/// `expected_status` is given, a successful response whose envelope status
/// does not match it is an error.
pub trait Gateway: Send + Sync {
  fn get<'a>(
    &'a self,
    url: &'a str,
    params: &'a [(String, String)],
  ) -> impl Future<Output = Result<Option<Envelope>>> + Send + 'a;

  fn post<'a>(
    &'a self,
    url: &'a str,
    body: &'a Value,
    expected_status: Option<&'static str>,
  ) -> impl Future<Output = Result<Option<Envelope>>> + Send + 'a;

  fn put<'a>(
    &'a self,
    url: &'a str,
    body: &'a Value,
    expected_status: Option<&'static str>,
  ) -> impl Future<Output = Result<Option<Envelope>>> + Send + 'a;

  fn delete<'a>(
    &'a self,
    url: &'a str,
    expected_status: Option<&'static str>,
  ) -> impl Future<Output = Result<Option<Envelope>>> + Send + 'a;
}

// ─── HTTP implementation ─────────────────────────────────────────────────────

/// Connection settings for the REST API.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
  pub base_url: String,
}

/// reqwest-backed [`Gateway`].
///
/// Cheap to clone — the inner [`reqwest::Client`] is `Arc`-based and the
/// auth context is shared.
#[derive(Clone)]
pub struct HttpGateway {
  client: reqwest::Client,
  config: GatewayConfig,
  auth:   Arc<AuthContext>,
}

impl HttpGateway {
  pub fn new(config: GatewayConfig, auth: Arc<AuthContext>) -> Result<Self> {
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(30))
      .build()?;
    Ok(Self { client, config, auth })
  }

  pub fn auth(&self) -> &Arc<AuthContext> {
    &self.auth
  }

  fn url(&self, path: &str) -> String {
    format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
  }

  async fn dispatch(
    &self,
    method: Method,
    path: &str,
    params: &[(String, String)],
    body: Option<&Value>,
    expected_status: Option<&'static str>,
  ) -> Result<Option<Envelope>> {
    let url = self.url(path);
    let request_id = Uuid::new_v4();
    tracing::debug!(%request_id, %method, %url, "dispatching request");

    let mut request = self.client.request(method.clone(), &url);
    if !params.is_empty() {
      request = request.query(params);
    }
    if let Some(body) = body {
      request = request.json(body);
    }
    if let Some(token) = self.auth.token() {
      request = request.bearer_auth(token);
    }

    let response = request.send().await?;
    let status = response.status();

    if status == StatusCode::UNAUTHORIZED {
      tracing::warn!(%request_id, %url, "unauthorized; clearing session");
      self.auth.clear_session();
      return Ok(None);
    }
    if status == StatusCode::FORBIDDEN {
      tracing::warn!(%request_id, %url, "permission denied");
      self.auth.permission_denied();
      return Ok(None);
    }

    if !status.is_success() {
      let message = response
        .json::<Value>()
        .await
        .ok()
        .as_ref()
        .and_then(|payload| payload.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| {
          status.canonical_reason().unwrap_or("request failed").to_string()
        });
      return Err(Error::Api {
        method: method.to_string(),
        url,
        status: status.as_u16(),
        message,
      });
    }

    let envelope: Envelope = response.json().await?;
    if let Some(expected) = expected_status {
      if envelope.status.as_deref() != Some(expected) {
        return Err(Error::UnexpectedDataStatus {
          expected,
          got: envelope.status,
        });
      }
    }
    tracing::debug!(%request_id, data_status = ?envelope.status, "request complete");
    Ok(Some(envelope))
  }

  // ── Session endpoints ─────────────────────────────────────────────────

  /// `POST /oauth/token` with the password grant; installs the returned
  /// token into the auth context on success.
  ///
  /// Dispatched outside the 401 policy: a 401 here means bad credentials
  /// and must surface to the caller rather than trigger a logout.
  pub async fn login(&self, username: &str, password: &str) -> Result<()> {
    let url = self.url("/oauth/token");
    let body = serde_json::json!({
      "grant_type": "password",
      "username":   username,
      "password":   password,
    });

    let response = self.client.post(&url).json(&body).send().await?;
    let status = response.status();
    if !status.is_success() {
      return Err(Error::Api {
        method: "POST".to_string(),
        url,
        status: status.as_u16(),
        message: "login failed".to_string(),
      });
    }

    let payload: Value = response.json().await?;
    let token = payload
      .get("access_token")
      .and_then(Value::as_str)
      .ok_or(Error::UnexpectedPayload("a token response"))?;
    self.auth.set_session(token.to_string(), username.to_string());
    Ok(())
  }

  /// `DELETE /oauth/token/<token>`, then clear the local session even when
  /// the server call failed.
  pub async fn logout(&self) -> Result<()> {
    let result = match self.auth.token() {
      Some(token) => {
        let path = format!("/oauth/token/{token}");
        self
          .dispatch(Method::DELETE, &path, &[], None, None)
          .await
          .map(|_| ())
      }
      None => Ok(()),
    };
    self.auth.clear_session();
    result
  }
}

impl Gateway for HttpGateway {
  async fn get<'a>(
    &'a self,
    url: &'a str,
    params: &'a [(String, String)],
  ) -> Result<Option<Envelope>> {
    self.dispatch(Method::GET, url, params, None, None).await
  }

  async fn post<'a>(
    &'a self,
    url: &'a str,
    body: &'a Value,
    expected_status: Option<&'static str>,
  ) -> Result<Option<Envelope>> {
    self
      .dispatch(Method::POST, url, &[], Some(body), expected_status)
      .await
  }

  async fn put<'a>(
    &'a self,
    url: &'a str,
    body: &'a Value,
    expected_status: Option<&'static str>,
  ) -> Result<Option<Envelope>> {
    self
      .dispatch(Method::PUT, url, &[], Some(body), expected_status)
      .await
  }

  async fn delete<'a>(
    &'a self,
    url: &'a str,
    expected_status: Option<&'static str>,
  ) -> Result<Option<Envelope>> {
    self
      .dispatch(Method::DELETE, url, &[], None, expected_status)
      .await
  }
}
