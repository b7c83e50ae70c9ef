use serde::Deserialize;
use std::{env, fs, path::Path, time::Duration};
use url::Url;

use crate::email::HttpEmailChallenger;
use crate::types::CookieName;

/// Default session cookie name.
pub const DEFAULT_COOKIE_NAME: &str = "pb_auth";

/// Default address of the identity service.
pub const DEFAULT_IDENTITY_SERVICE_URL: &str = "http://127.0.0.1:8090";

pub const ENV_COOKIE_NAME: &str = "SESSION_GATE_COOKIE_NAME";
pub const ENV_IDENTITY_URL: &str = "SESSION_GATE_IDENTITY_URL";
pub const ENV_TIMEOUT_SECONDS: &str = "SESSION_GATE_TIMEOUT_SECONDS";

/// Settings supplied by the embedding application.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Name of the cookie carrying the session token
    #[serde(default = "default_cookie_name")]
    pub cookie_name: CookieName,
    /// Base address of the identity service that sends challenge emails
    #[serde(default = "default_identity_service_url")]
    pub identity_service_url: Url,
    /// Overall timeout for identity service calls; `None` means no timeout
    #[serde(default)]
    pub request_timeout_seconds: Option<u64>,
}

fn default_cookie_name() -> CookieName {
    CookieName::new(DEFAULT_COOKIE_NAME)
}

fn default_identity_service_url() -> Url {
    Url::parse(DEFAULT_IDENTITY_SERVICE_URL).expect("default identity service URL is valid")
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            identity_service_url: default_identity_service_url(),
            request_timeout_seconds: None,
        }
    }
}

impl SessionConfig {
    /// Read the configuration from `SESSION_GATE_*` environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read the configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)?;
        let config: SessionConfig = serde_json::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("Invalid config file {}: {}", path.display(), e))?;
        config.validate()?;
        Ok(config)
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut config = Self::default();

        if let Some(name) = lookup(ENV_COOKIE_NAME) {
            config.cookie_name = CookieName::new(name);
        }
        if let Some(url) = lookup(ENV_IDENTITY_URL) {
            config.identity_service_url = Url::parse(&url)
                .map_err(|e| anyhow::anyhow!("{} is not a valid URL: {}", ENV_IDENTITY_URL, e))?;
        }
        if let Some(secs) = lookup(ENV_TIMEOUT_SECONDS) {
            let secs = secs.trim().parse::<u64>().map_err(|e| {
                anyhow::anyhow!("{} must be a number of seconds: {}", ENV_TIMEOUT_SECONDS, e)
            })?;
            config.request_timeout_seconds = Some(secs);
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would produce unusable cookies or requests.
    pub fn validate(&self) -> anyhow::Result<()> {
        let name = self.cookie_name.as_str();
        if name.is_empty() {
            return Err(anyhow::anyhow!("Cookie name must not be empty"));
        }
        if name
            .chars()
            .any(|c| c.is_control() || c.is_whitespace() || "()<>@,;:\\\"/[]?={}".contains(c))
        {
            return Err(anyhow::anyhow!("Cookie name `{}` contains invalid characters", name));
        }
        if !matches!(self.identity_service_url.scheme(), "http" | "https") {
            return Err(anyhow::anyhow!(
                "Identity service URL must use http or https, got `{}`",
                self.identity_service_url
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_seconds.map(Duration::from_secs)
    }

    /// Build the shared HTTP client for identity service calls.
    pub fn build_http_client(&self) -> anyhow::Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = self.request_timeout() {
            builder = builder.timeout(timeout);
        }
        Ok(builder.build()?)
    }

    /// Build an email challenger for the configured identity service.
    pub fn email_challenger(&self) -> anyhow::Result<HttpEmailChallenger> {
        Ok(HttpEmailChallenger::new(self.identity_service_url.as_str())
            .with_client(self.build_http_client()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = SessionConfig::default();
        assert_eq!(config.cookie_name.as_str(), "pb_auth");
        assert_eq!(config.identity_service_url.as_str(), "http://127.0.0.1:8090/");
        assert!(config.request_timeout().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_identity_service_url_parses() {
        let url = Url::parse(DEFAULT_IDENTITY_SERVICE_URL).unwrap();
        assert_eq!(url, default_identity_service_url());
        assert_eq!(url.scheme(), "http");
        assert_eq!(url.port(), Some(8090));
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = SessionConfig::from_lookup(lookup_from(&[
            (ENV_COOKIE_NAME, "app_session"),
            (ENV_IDENTITY_URL, "https://id.example.com"),
            (ENV_TIMEOUT_SECONDS, " 15 "),
        ]))
        .unwrap();

        assert_eq!(config.cookie_name.as_str(), "app_session");
        assert_eq!(config.identity_service_url.host_str(), Some("id.example.com"));
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(15)));
    }

    #[test]
    fn test_from_lookup_empty_uses_defaults() {
        let config = SessionConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.cookie_name.as_str(), DEFAULT_COOKIE_NAME);
    }

    #[test]
    fn test_from_lookup_rejects_bad_values() {
        assert!(SessionConfig::from_lookup(lookup_from(&[(ENV_IDENTITY_URL, "::nope")])).is_err());
        assert!(SessionConfig::from_lookup(lookup_from(&[(ENV_TIMEOUT_SECONDS, "soon")])).is_err());
        assert!(SessionConfig::from_lookup(lookup_from(&[(ENV_COOKIE_NAME, "bad name")])).is_err());
        assert!(
            SessionConfig::from_lookup(lookup_from(&[(ENV_IDENTITY_URL, "ftp://files.example.com")]))
                .is_err()
        );
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "cookie_name": "sid",
                "identity_service_url": "http://localhost:8090",
                "request_timeout_seconds": 5
            }}"#
        )
        .unwrap();

        let config = SessionConfig::load(file.path()).unwrap();
        assert_eq!(config.cookie_name.as_str(), "sid");
        assert_eq!(config.identity_service_url.port(), Some(8090));
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_load_partial_file_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "request_timeout_seconds": 2 }}"#).unwrap();

        let config = SessionConfig::load(file.path()).unwrap();
        assert_eq!(config.cookie_name.as_str(), DEFAULT_COOKIE_NAME);
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(2)));
    }

    #[test]
    fn test_load_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(SessionConfig::load(file.path()).is_err());
        assert!(SessionConfig::load("/nonexistent/session-gate.json").is_err());
    }

    #[test]
    fn test_email_challenger_uses_configured_url() {
        let config = SessionConfig {
            request_timeout_seconds: Some(3),
            ..Default::default()
        };
        let challenger = config.email_challenger().unwrap();
        assert_eq!(challenger.base_url(), "http://127.0.0.1:8090/");
    }
}
