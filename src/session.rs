//! Authenticated HTTP session against the GLPI REST API.
//!
//! The gateway starts unauthenticated. The first outbound call performs the
//! `initSession` handshake; the returned session token is attached to every
//! later request. Concurrent first calls share a single handshake, and a
//! failed handshake leaves the gateway unauthenticated so the next call
//! tries again.
//!
//! There is no retry logic: transport failures and API errors propagate to
//! the caller as-is.
//!
//! # Security
//!
//! Tokens are never logged. Error bodies are sanitized before they are
//! stored in an error.

use reqwest::{Client, Method, RequestBuilder, Response};
use serde_json::Value;
use tokio::sync::OnceCell;

use crate::config::Config;
use crate::error::{error_array_message, GlpiError};

/// Maximum length for HTTP error response bodies kept in errors.
const MAX_ERROR_BODY_LEN: usize = 500;

/// Body of an outbound request.
#[derive(Debug, Clone, Default)]
pub enum Body {
    /// No body.
    #[default]
    Empty,
    /// A pre-serialized body sent verbatim.
    Raw(String),
    /// A structured body serialized to JSON.
    Json(Value),
}

/// Owns the HTTP client and the GLPI session token.
///
/// One gateway is shared by every resource client of a [`Glpi`](crate::Glpi)
/// handle.
pub struct SessionGateway {
    /// The underlying HTTP client (cloning is cheap).
    http: Client,

    /// Base URL of the REST API, without trailing slash.
    base_url: String,

    /// SECURITY: Never log this value!
    user_token: String,

    /// SECURITY: Never log this value!
    app_token: String,

    /// Set once by a successful `initSession`.
    session_token: OnceCell<String>,
}

impl SessionGateway {
    /// Creates an unauthenticated gateway from configuration.
    ///
    /// # Errors
    ///
    /// Returns `GlpiError::HttpClient` if the HTTP client fails to initialize.
    pub fn new(config: &Config) -> Result<Self, GlpiError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(GlpiError::HttpClient)?;

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            user_token: config.user_token().to_string(),
            app_token: config.app_token().to_string(),
            session_token: OnceCell::new(),
        })
    }

    /// Returns true once a session token has been obtained.
    pub fn is_authenticated(&self) -> bool {
        self.session_token.initialized()
    }

    /// Establishes the session if needed and returns its token.
    ///
    /// # Errors
    ///
    /// Returns `GlpiError::Session` when GLPI rejects the handshake.
    pub async fn ensure_session(&self) -> Result<&str, GlpiError> {
        self.session_token
            .get_or_try_init(|| self.init_session())
            .await
            .map(String::as_str)
    }

    async fn init_session(&self) -> Result<String, GlpiError> {
        tracing::debug!("Opening GLPI session");

        let url = format!("{}/initSession", self.base_url);
        let response = self
            .with_auth_headers(self.http.get(&url))
            .send()
            .await?;

        match self.read_json(response).await? {
            Value::Array(items) => {
                let message = error_array_message(&items);
                tracing::warn!(error = %self.sanitize(&message), "GLPI rejected initSession");
                Err(GlpiError::session(message))
            }
            Value::Object(map) => match map.get("session_token").and_then(Value::as_str) {
                Some(token) => {
                    tracing::info!("GLPI session established");
                    Ok(token.to_string())
                }
                None => Err(GlpiError::session(
                    "initSession response carries no session_token",
                )),
            },
            other => Err(GlpiError::session(format!(
                "unexpected initSession response: {}",
                other
            ))),
        }
    }

    /// Sends a request and returns the parsed JSON response verbatim.
    ///
    /// `path` is appended to the base URL and may carry a query string.
    /// The response shape is left to the caller: GLPI answers errors with a
    /// `[code, message]` array, usually alongside a 4xx status.
    ///
    /// # Errors
    ///
    /// Returns `GlpiError::Session` if the session cannot be established,
    /// `GlpiError::Http` on transport failure, and `GlpiError::HttpStatus`
    /// or `GlpiError::Serialization` when the body is not JSON.
    pub async fn request(&self, method: Method, path: &str, body: Body) -> Result<Value, GlpiError> {
        let session_token = self.ensure_session().await?;
        let url = format!("{}{}", self.base_url, path);

        tracing::debug!(method = %method, path = %path, "Making GLPI API request");

        let mut req = self
            .with_auth_headers(self.http.request(method, &url))
            .header("Session-Token", session_token);

        req = match body {
            Body::Empty => req,
            Body::Raw(raw) => req.body(raw),
            Body::Json(value) => req.body(serde_json::to_vec(&value)?),
        };

        let response = req.send().await?;
        self.read_json(response).await
    }

    fn with_auth_headers(&self, req: RequestBuilder) -> RequestBuilder {
        req.header("Content-Type", "application/json")
            .header("Authorization", format!("user_token {}", self.user_token))
            .header("App-Token", &self.app_token)
    }

    /// Parses a response body as JSON, whatever its status.
    async fn read_json(&self, response: Response) -> Result<Value, GlpiError> {
        let status = response.status();
        let body = response.text().await?;

        tracing::trace!(status = %status, body = %self.sanitize(&body), "GLPI API response");

        match serde_json::from_str::<Value>(&body) {
            Ok(value) => Ok(value),
            Err(_) if !status.is_success() => {
                let body = self.sanitize(&body);
                let body = if body.len() > MAX_ERROR_BODY_LEN {
                    let cut = (0..=MAX_ERROR_BODY_LEN)
                        .rev()
                        .find(|i| body.is_char_boundary(*i))
                        .unwrap_or(0);
                    format!("{}...[truncated]", &body[..cut])
                } else {
                    body
                };
                Err(GlpiError::HttpStatus { status, body })
            }
            Err(e) => Err(GlpiError::Serialization(e)),
        }
    }

    fn sanitize(&self, message: &str) -> String {
        let session = self.session_token.get().map(String::as_str).unwrap_or("");
        GlpiError::sanitize_message(message, &[&self.user_token, &self.app_token, session])
    }
}

impl std::fmt::Debug for SessionGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionGateway")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.is_authenticated())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_gateway() -> SessionGateway {
        let config = Config::new("https://glpi.example.com/apirest.php", "user123", "app456").unwrap();
        SessionGateway::new(&config).unwrap()
    }

    #[test]
    fn test_new_gateway_is_unauthenticated() {
        let gateway = test_gateway();
        assert!(!gateway.is_authenticated());
        let debug = format!("{:?}", gateway);
        assert!(debug.contains("authenticated: false"));
        assert!(!debug.contains("user123"));
    }

    #[test]
    fn test_sanitize_strips_tokens() {
        let gateway = test_gateway();
        let cleaned = gateway.sanitize("bad token user123 for app456");
        assert_eq!(cleaned, "bad token [REDACTED] for [REDACTED]");
    }

    #[test]
    fn test_unreachable_host_leaves_gateway_unauthenticated() {
        let config = Config::new("http://127.0.0.1:9", "user123", "app456")
            .unwrap()
            .with_timeout(std::time::Duration::from_secs(2));
        let gateway = SessionGateway::new(&config).unwrap();

        let result = tokio_test::block_on(gateway.ensure_session());
        assert!(matches!(result, Err(GlpiError::Http(_))));
        assert!(!gateway.is_authenticated());
    }
}
