//! Configuration for connecting to a GLPI instance.
//!
//! Values are loaded from environment variables, with validation to ensure
//! all required values are present.

use std::env;
use std::fmt;
use std::time::Duration;

use url::Url;

use crate::error::GlpiError;

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for connecting to the GLPI REST API.
///
/// The tokens are kept private and redacted from `Debug` output.
#[derive(Clone)]
pub struct Config {
    /// Base URL of the REST API (e.g., `https://glpi.example.com/apirest.php`).
    pub base_url: String,

    /// Transport timeout applied to every request.
    pub timeout: Duration,

    /// Skip TLS certificate verification (self-signed installations).
    pub accept_invalid_certs: bool,

    user_token: String,
    app_token: String,
}

impl Config {
    /// Builds a configuration from explicit values.
    ///
    /// # Errors
    ///
    /// Returns `GlpiError::Config` if the URL is malformed or a token is
    /// empty or a placeholder.
    pub fn new(
        base_url: impl Into<String>,
        user_token: impl Into<String>,
        app_token: impl Into<String>,
    ) -> Result<Self, GlpiError> {
        let base_url = Self::validate_base_url(base_url.into())?;
        let user_token = user_token.into();
        let app_token = app_token.into();
        Self::validate_token("user token", &user_token)?;
        Self::validate_token("app token", &app_token)?;

        Ok(Config {
            base_url,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            accept_invalid_certs: false,
            user_token,
            app_token,
        })
    }

    /// Loads configuration from environment variables.
    ///
    /// # Required Environment Variables
    ///
    /// - `GLPI_URL`: base URL of the REST API
    /// - `GLPI_USER_TOKEN`: personal API token of the GLPI user
    /// - `GLPI_APP_TOKEN`: API client application token
    ///
    /// # Optional
    ///
    /// - `GLPI_TIMEOUT_SECS`: request timeout (default 30)
    /// - `GLPI_ACCEPT_INVALID_CERTS`: `true`/`1` to skip TLS verification
    ///
    /// # Errors
    ///
    /// Returns `GlpiError::Config` if any required variable is missing
    /// or if values fail validation.
    pub fn from_env() -> Result<Self, GlpiError> {
        let base_url = Self::get_required_env("GLPI_URL")?;
        let user_token = Self::get_required_env("GLPI_USER_TOKEN")?;
        let app_token = Self::get_required_env("GLPI_APP_TOKEN")?;

        let mut config = Self::new(base_url, user_token, app_token)?;

        if let Some(raw) = Self::get_optional_env("GLPI_TIMEOUT_SECS") {
            config.timeout = Self::parse_timeout(&raw)?;
        }
        if let Some(raw) = Self::get_optional_env("GLPI_ACCEPT_INVALID_CERTS") {
            config.accept_invalid_certs = Self::parse_bool("GLPI_ACCEPT_INVALID_CERTS", &raw)?;
        }

        Ok(config)
    }

    /// Sets the transport timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Enables or disables TLS certificate verification.
    pub fn with_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    /// The user token sent in the `Authorization` header.
    pub fn user_token(&self) -> &str {
        &self.user_token
    }

    /// The application token sent in the `App-Token` header.
    pub fn app_token(&self) -> &str {
        &self.app_token
    }

    fn get_required_env(name: &str) -> Result<String, GlpiError> {
        Self::get_optional_env(name).ok_or_else(|| GlpiError::missing_env(name))
    }

    fn get_optional_env(name: &str) -> Option<String> {
        env::var(name).ok().filter(|value| !value.trim().is_empty())
    }

    /// Validates and normalizes the base URL.
    fn validate_base_url(url: String) -> Result<String, GlpiError> {
        let url = url.trim().trim_end_matches('/').to_string();

        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(GlpiError::invalid_config(
                "GLPI_URL must start with http:// or https://",
            ));
        }
        Url::parse(&url)
            .map_err(|e| GlpiError::invalid_config(format!("GLPI_URL is not a valid URL: {}", e)))?;

        Ok(url)
    }

    /// Rejects empty and placeholder tokens.
    fn validate_token(label: &str, token: &str) -> Result<(), GlpiError> {
        if token.trim().is_empty() {
            return Err(GlpiError::invalid_config(format!("{} is empty", label)));
        }

        let lower = token.to_lowercase();
        let placeholder_patterns = ["your_token", "your_app_token", "placeholder", "changeme"];
        if placeholder_patterns.iter().any(|p| lower.contains(p)) {
            return Err(GlpiError::invalid_config(format!(
                "{} appears to be a placeholder value",
                label
            )));
        }

        Ok(())
    }

    fn parse_timeout(raw: &str) -> Result<Duration, GlpiError> {
        raw.trim()
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .ok_or_else(|| {
                GlpiError::invalid_config("GLPI_TIMEOUT_SECS must be a positive integer")
            })
    }

    fn parse_bool(name: &str, raw: &str) -> Result<bool, GlpiError> {
        match raw.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(GlpiError::invalid_config(format!(
                "{} must be a boolean",
                name
            ))),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .field("user_token", &"[REDACTED]")
            .field("app_token", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Environment-driven loading is not tested here; tests run in parallel.

    #[test]
    fn test_validate_base_url_removes_trailing_slash() {
        let result =
            Config::validate_base_url("https://glpi.example.com/apirest.php/".to_string()).unwrap();
        assert_eq!(result, "https://glpi.example.com/apirest.php");
    }

    #[test]
    fn test_validate_base_url_requires_scheme() {
        assert!(Config::validate_base_url("glpi.example.com".to_string()).is_err());
    }

    #[test]
    fn test_validate_token_rejects_placeholder() {
        assert!(Config::validate_token("user token", "your_token_here").is_err());
        assert!(Config::validate_token("user token", "  ").is_err());
    }

    #[test]
    fn test_validate_token_accepts_real_token() {
        assert!(Config::validate_token("app token", "q56hqkniwot8wntb3z1qarka5atf365taaa2uyjrn").is_ok());
    }

    #[test]
    fn test_parse_timeout() {
        assert_eq!(Config::parse_timeout("12").unwrap(), Duration::from_secs(12));
        assert!(Config::parse_timeout("0").is_err());
        assert!(Config::parse_timeout("soon").is_err());
    }

    #[test]
    fn test_parse_bool() {
        assert!(Config::parse_bool("X", "TRUE").unwrap());
        assert!(!Config::parse_bool("X", "0").unwrap());
        assert!(Config::parse_bool("X", "maybe").is_err());
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let config = Config::new("https://glpi.example.com", "usertok123", "apptok456").unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("usertok123"));
        assert!(!debug.contains("apptok456"));
        assert_eq!(config.user_token(), "usertok123");
        assert_eq!(config.timeout, Duration::from_secs(30));
    }
}
