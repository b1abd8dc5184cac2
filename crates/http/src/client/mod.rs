//! CampusKart HTTP client
//!
//! [`CampusClient::request`] is the single entry point every endpoint wrapper
//! goes through. Protected calls carry the session's access token; a 401 on a
//! protected call refreshes the token once and replays the request once.

pub mod auth;
pub mod body;
pub mod error;
pub mod resources;
pub mod retry;

pub use body::{MultipartForm, RequestBody, RequestOptions};
pub use error::ClientError;
pub use resources::{Collection, IntoRequestBody, ListQuery, Resource};
pub use retry::{AuthMode, Outcome, RetryPolicy, classify};

use campuskart_core::{RefreshRequest, Session, TokenResponse};
use reqwest::header::{self, HeaderValue};
use reqwest::{Client, ClientBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;

/// Base URL used when none is configured
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";

const REFRESH_PATH: &str = "/token/refresh/";
const USER_AGENT: &str = concat!("campuskart-client/", env!("CARGO_PKG_VERSION"));

/// CampusKart API client
#[derive(Clone)]
pub struct CampusClient {
    client: Client,
    base_url: String,
    session: Arc<Session>,
    retry_policy: RetryPolicy,
}

impl CampusClient {
    /// Create a client for `base_url` with a fresh in-memory session
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::builder().base_url(base_url).build()
    }

    /// Create a new client builder
    pub fn builder() -> CampusClientBuilder {
        CampusClientBuilder::default()
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry_policy
    }

    /// Resolve `path` against the base URL; absolute URLs pass through
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Issue a call and return its JSON body.
    ///
    /// Returns `Ok(None)` for 204 and for non-JSON success bodies.
    pub async fn request(
        &self,
        path: &str,
        options: &RequestOptions,
        auth: AuthMode,
    ) -> Result<Option<Value>, ClientError> {
        let url = self.url(path);

        let mut token = match auth {
            AuthMode::Public => None,
            AuthMode::Required => Some(
                self.session
                    .access_token()
                    .await
                    .ok_or(ClientError::AuthenticationRequired)?,
            ),
        };

        let mut attempt: u8 = 0;
        loop {
            let response = self.send(&url, options, token.as_deref()).await?;
            let status = response.status();
            debug!(method = %options.method, path, attempt, status = status.as_u16(), "Response received");

            match classify(status, auth, attempt, self.retry_policy) {
                Outcome::Done => return read_body(response).await,
                Outcome::Failed => return Err(read_failure(response).await),
                Outcome::NeedsRefresh => {
                    let original = read_failure(response).await;
                    let stale = token.take().unwrap_or_default();

                    match self.refresh_access(&stale).await {
                        Ok(fresh) => {
                            token = Some(fresh);
                            attempt += 1;
                        }
                        Err(e) => {
                            warn!(path, error = %e, "Token refresh failed; session cleared");
                            return Err(original.into_refresh_failed());
                        }
                    }
                }
            }
        }
    }

    /// [`CampusClient::request`] deserialized into `T`; a null body
    /// deserializes as JSON `null`
    pub async fn request_json<T: DeserializeOwned>(
        &self,
        path: &str,
        options: &RequestOptions,
        auth: AuthMode,
    ) -> Result<T, ClientError> {
        let value = self.request(path, options, auth).await?;
        Ok(serde_json::from_value(value.unwrap_or(Value::Null))?)
    }

    async fn send(
        &self,
        url: &str,
        options: &RequestOptions,
        token: Option<&str>,
    ) -> Result<Response, ClientError> {
        let mut request = options.apply(self.client.request(options.method.clone(), url))?;

        if !options.body.is_multipart() {
            request = request.header(header::ACCEPT, HeaderValue::from_static("application/json"));
        }
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        Ok(request.send().await?)
    }

    /// Obtain a usable access token after `stale` was rejected.
    ///
    /// Refreshes are serialised on the session: a caller that waited on
    /// another refresh reuses its result instead of refreshing again. On any
    /// failure the session is expired before the error is returned.
    async fn refresh_access(&self, stale: &str) -> Result<String, ClientError> {
        let _guard = self.session.refresh_guard().await;

        match self.session.access_token().await {
            Some(current) if current != stale => {
                debug!("Access token already refreshed by a concurrent request");
                return Ok(current);
            }
            Some(_) => {}
            None => return Err(ClientError::AuthenticationRequired),
        }

        match self.fetch_new_access().await {
            Ok(access) => Ok(access),
            Err(e) => {
                if let Err(store_err) = self.session.expire().await {
                    warn!(error = %store_err, "Failed to clear token store after refresh failure");
                }
                Err(e)
            }
        }
    }

    async fn fetch_new_access(&self) -> Result<String, ClientError> {
        let refresh = self
            .session
            .refresh_token()
            .await
            .ok_or(ClientError::AuthenticationRequired)?;

        debug!("Refreshing access token");
        let response = self
            .client
            .post(self.url(REFRESH_PATH))
            .header(header::ACCEPT, HeaderValue::from_static("application/json"))
            .json(&RefreshRequest { refresh })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(read_failure(response).await);
        }

        let tokens: TokenResponse = response.json().await?;
        let Some(access) = tokens
            .access
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
        else {
            return Err(ClientError::request_failed(
                status.as_u16(),
                Some(json!({"detail": "Refresh response did not include an access token"})),
            ));
        };

        self.session
            .replace_access(&access, tokens.refresh.as_deref())
            .await?;
        Ok(access)
    }
}

fn is_json(response: &Response) -> bool {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains("application/json"))
}

async fn read_body(response: Response) -> Result<Option<Value>, ClientError> {
    if response.status() == StatusCode::NO_CONTENT || !is_json(&response) {
        return Ok(None);
    }

    let bytes = response.bytes().await?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    Ok(Some(serde_json::from_slice(&bytes)?))
}

/// Turn a non-success response into [`ClientError::RequestFailed`]; an
/// unreadable or non-JSON error body yields no payload
async fn read_failure(response: Response) -> ClientError {
    let status = response.status().as_u16();
    let payload = if is_json(&response) {
        match response.bytes().await {
            Ok(bytes) => serde_json::from_slice(&bytes).ok(),
            Err(_) => None,
        }
    } else {
        None
    };
    ClientError::request_failed(status, payload)
}

/// Builder for [`CampusClient`]
#[derive(Default)]
pub struct CampusClientBuilder {
    base_url: Option<String>,
    session: Option<Arc<Session>>,
    retry_policy: RetryPolicy,
    timeout: Option<Duration>,
    user_agent: Option<String>,
}

impl CampusClientBuilder {
    /// Set the base URL (defaults to [`DEFAULT_BASE_URL`])
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Share an existing session with this client
    pub fn session(mut self, session: Arc<Session>) -> Self {
        self.session = Some(session);
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Build the client
    pub fn build(self) -> Result<CampusClient, ClientError> {
        let base_url = self
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        url::Url::parse(&base_url)
            .map_err(|e| ClientError::Configuration(format!("invalid base_url `{base_url}`: {e}")))?;

        // Ensure base_url ends without a trailing slash
        let base_url = base_url.trim_end_matches('/').to_string();

        let mut client_builder = ClientBuilder::new();

        if let Some(timeout) = self.timeout {
            client_builder = client_builder.timeout(timeout);
        }

        client_builder =
            client_builder.user_agent(self.user_agent.unwrap_or_else(|| USER_AGENT.to_string()));

        Ok(CampusClient {
            client: client_builder.build()?,
            base_url,
            session: self
                .session
                .unwrap_or_else(|| Arc::new(Session::in_memory())),
            retry_policy: self.retry_policy,
        })
    }
}
