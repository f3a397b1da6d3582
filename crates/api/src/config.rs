use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use muse_providers::bridge::{
    ModelSpec, PollConfig, DEFAULT_MODEL_LABEL, DEFAULT_MODEL_NAME, DEFAULT_MODEL_VERSION,
};

use crate::auth::jwt::JwtConfig;

const REPLICATE_PLACEHOLDER: &str = "your_replicate_api_token_here";
const OPENAI_PLACEHOLDER: &str = "your_openai_api_key_here";

/// Startup configuration failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A required variable is unset or empty.
    #[error("{0} must be set")]
    Missing(&'static str),

    /// A variable is set but cannot be parsed.
    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },

    /// A provider credential is absent or a placeholder.
    #[error("{0}")]
    Credential(String),
}

/// Outcome of validating a provider credential once at startup.
#[derive(Clone, PartialEq, Eq)]
pub enum ProviderCredential {
    Configured(String),
    Missing(ConfigError),
}

impl ProviderCredential {
    pub fn is_configured(&self) -> bool {
        matches!(self, Self::Configured(_))
    }

    pub fn token(&self) -> Result<&str, &ConfigError> {
        match self {
            Self::Configured(token) => Ok(token),
            Self::Missing(err) => Err(err),
        }
    }
}

impl fmt::Debug for ProviderCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configured(_) => f.write_str("Configured(<redacted>)"),
            Self::Missing(err) => f.debug_tuple("Missing").field(err).finish(),
        }
    }
}

/// Settings of the primary (asynchronous job) image service.
#[derive(Debug, Clone)]
pub struct ImageServiceConfig {
    pub credential: ProviderCredential,
    pub api_url: String,
    pub model: ModelSpec,
    pub poll: PollConfig,
}

/// Settings of the OpenAI-compatible text and fallback image service.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub credential: ProviderCredential,
    pub api_url: String,
    pub text_model: String,
    pub image_model: String,
}

/// Server configuration loaded from environment variables.
///
/// All fields except the JWT secret have defaults suitable for local
/// development. Provider credentials may be missing: the affected
/// requests then fail with a configuration error instead of the process.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3001`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `330`). Kept above the
    /// poll ceiling so a full generation fits in one request.
    pub request_timeout_secs: u64,
    /// Postgres URL. `None` selects the in-memory store.
    pub database_url: Option<String>,
    pub jwt: JwtConfig,
    pub image: ImageServiceConfig,
    pub openai: OpenAiConfig,
}

impl ServerConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                   | Default                         |
    /// |---------------------------|---------------------------------|
    /// | `HOST`                    | `0.0.0.0`                       |
    /// | `PORT`                    | `3001`                          |
    /// | `CORS_ORIGINS`            | `http://localhost:5173,http://127.0.0.1:5173` |
    /// | `REQUEST_TIMEOUT_SECS`    | `330`                           |
    /// | `DATABASE_URL`            | unset (in-memory store)         |
    /// | `JWT_SECRET`              | **required**                    |
    /// | `JWT_AUDIENCE`            | unset                           |
    /// | `REPLICATE_API_TOKEN`     | unset                           |
    /// | `REPLICATE_API_URL`       | `https://api.replicate.com/v1`  |
    /// | `IMAGE_MODEL_VERSION`     | `google/imagen-4`               |
    /// | `IMAGE_MODEL_NAME`        | `imagen-4`                      |
    /// | `IMAGE_MODEL_LABEL`       | `Imagen-4`                      |
    /// | `IMAGE_POLL_INTERVAL_MS`  | `5000`                          |
    /// | `IMAGE_POLL_MAX_ATTEMPTS` | `60`                            |
    /// | `IMAGE_POLL_BACKOFF`      | `1.0`                           |
    /// | `IMAGE_POLL_MAX_DELAY_MS` | `30000`                         |
    /// | `OPENAI_API_KEY`          | unset                           |
    /// | `OPENAI_API_URL`          | `https://api.openai.com/v1`     |
    /// | `OPENAI_TEXT_MODEL`       | `gpt-3.5-turbo`                 |
    /// | `OPENAI_IMAGE_MODEL`      | `dall-e-3`                      |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let host = var("HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = parse_or(&var, "PORT", 3001u16)?;

        let cors_origins: Vec<String> = var("CORS_ORIGINS")
            .unwrap_or_else(|| "http://localhost:5173,http://127.0.0.1:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs = parse_or(&var, "REQUEST_TIMEOUT_SECS", 330u64)?;
        let database_url = var("DATABASE_URL");

        let jwt = JwtConfig {
            secret: var("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?,
            audience: var("JWT_AUDIENCE"),
        };

        let poll_defaults = PollConfig::default();
        let poll = PollConfig {
            interval: Duration::from_millis(parse_or(
                &var,
                "IMAGE_POLL_INTERVAL_MS",
                poll_defaults.interval.as_millis() as u64,
            )?),
            max_attempts: parse_or(&var, "IMAGE_POLL_MAX_ATTEMPTS", poll_defaults.max_attempts)?,
            backoff_multiplier: parse_or(
                &var,
                "IMAGE_POLL_BACKOFF",
                poll_defaults.backoff_multiplier,
            )?,
            max_interval: Duration::from_millis(parse_or(
                &var,
                "IMAGE_POLL_MAX_DELAY_MS",
                poll_defaults.max_interval.as_millis() as u64,
            )?),
        };
        if poll.max_attempts == 0 {
            return Err(ConfigError::Invalid {
                name: "IMAGE_POLL_MAX_ATTEMPTS",
                reason: "must be at least 1".into(),
            });
        }
        if !poll.backoff_multiplier.is_finite() || poll.backoff_multiplier < 1.0 {
            return Err(ConfigError::Invalid {
                name: "IMAGE_POLL_BACKOFF",
                reason: "must be a finite number >= 1.0".into(),
            });
        }

        let image = ImageServiceConfig {
            credential: replicate_credential(var("REPLICATE_API_TOKEN")),
            api_url: var("REPLICATE_API_URL")
                .unwrap_or_else(|| muse_providers::replicate::DEFAULT_API_URL.into()),
            model: ModelSpec {
                version: var("IMAGE_MODEL_VERSION").unwrap_or_else(|| DEFAULT_MODEL_VERSION.into()),
                name: var("IMAGE_MODEL_NAME").unwrap_or_else(|| DEFAULT_MODEL_NAME.into()),
                label: var("IMAGE_MODEL_LABEL").unwrap_or_else(|| DEFAULT_MODEL_LABEL.into()),
            },
            poll,
        };

        let openai = OpenAiConfig {
            credential: openai_credential(var("OPENAI_API_KEY")),
            api_url: var("OPENAI_API_URL")
                .unwrap_or_else(|| muse_providers::openai::DEFAULT_API_URL.into()),
            text_model: var("OPENAI_TEXT_MODEL")
                .unwrap_or_else(|| muse_providers::openai::DEFAULT_TEXT_MODEL.into()),
            image_model: var("OPENAI_IMAGE_MODEL")
                .unwrap_or_else(|| muse_providers::openai::DEFAULT_IMAGE_MODEL.into()),
        };

        Ok(Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            database_url,
            jwt,
            image,
            openai,
        })
    }

    /// Worst-case duration of one image generation's polling phase.
    pub fn poll_ceiling(&self) -> Duration {
        let poll = &self.image.poll;
        let mut delay = poll.interval;
        let mut total = Duration::ZERO;
        for _ in 0..poll.max_attempts {
            total += delay;
            delay = muse_providers::bridge::next_interval(delay, poll);
        }
        total
    }
}

fn parse_or<T, V>(var: &V, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
    V: Fn(&str) -> Option<String>,
{
    match var(name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
    }
}

fn replicate_credential(token: Option<String>) -> ProviderCredential {
    match token.map(|t| t.trim().to_string()) {
        Some(t) if t != REPLICATE_PLACEHOLDER => ProviderCredential::Configured(t),
        _ => ProviderCredential::Missing(ConfigError::Credential(
            "Replicate API token not configured".into(),
        )),
    }
}

fn openai_credential(key: Option<String>) -> ProviderCredential {
    match key.map(|k| k.trim().to_string()) {
        Some(k) if k != OPENAI_PLACEHOLDER && k.starts_with("sk-") => {
            ProviderCredential::Configured(k)
        }
        Some(k) if k != OPENAI_PLACEHOLDER => ProviderCredential::Missing(
            ConfigError::Credential("OpenAI API key is invalid".into()),
        ),
        _ => ProviderCredential::Missing(ConfigError::Credential(
            "OpenAI API key not configured".into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use assert_matches::assert_matches;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn defaults_apply() {
        let config = load(&[("JWT_SECRET", "s3cret")]).unwrap();
        assert_eq!(config.port, 3001);
        assert_eq!(config.request_timeout_secs, 330);
        assert_eq!(config.database_url, None);
        assert_eq!(config.image.model.version, "google/imagen-4");
        assert_eq!(config.image.model.label, "Imagen-4");
        assert_eq!(config.image.poll, PollConfig::default());
        assert_eq!(config.openai.text_model, "gpt-3.5-turbo");
        assert_eq!(config.cors_origins.len(), 2);
        assert!(!config.image.credential.is_configured());
        assert!(!config.openai.credential.is_configured());
    }

    #[test]
    fn image_model_label_is_configurable() {
        let config = load(&[
            ("JWT_SECRET", "s"),
            ("IMAGE_MODEL_NAME", "flux-schnell"),
            ("IMAGE_MODEL_LABEL", "FLUX Schnell"),
        ])
        .unwrap();
        assert_eq!(config.image.model.name, "flux-schnell");
        assert_eq!(config.image.model.label, "FLUX Schnell");
    }

    #[test]
    fn jwt_secret_is_required() {
        assert_matches!(load(&[]), Err(ConfigError::Missing("JWT_SECRET")));
        assert_matches!(
            load(&[("JWT_SECRET", "   ")]),
            Err(ConfigError::Missing("JWT_SECRET"))
        );
    }

    #[test]
    fn malformed_numbers_are_fatal() {
        assert_matches!(
            load(&[("JWT_SECRET", "s"), ("PORT", "eighty")]),
            Err(ConfigError::Invalid { name: "PORT", .. })
        );
        assert_matches!(
            load(&[("JWT_SECRET", "s"), ("IMAGE_POLL_MAX_ATTEMPTS", "0")]),
            Err(ConfigError::Invalid { name: "IMAGE_POLL_MAX_ATTEMPTS", .. })
        );
        assert_matches!(
            load(&[("JWT_SECRET", "s"), ("IMAGE_POLL_BACKOFF", "0.5")]),
            Err(ConfigError::Invalid { name: "IMAGE_POLL_BACKOFF", .. })
        );
    }

    #[test]
    fn placeholder_tokens_count_as_missing() {
        let config = load(&[
            ("JWT_SECRET", "s"),
            ("REPLICATE_API_TOKEN", "your_replicate_api_token_here"),
            ("OPENAI_API_KEY", "your_openai_api_key_here"),
        ])
        .unwrap();
        assert_eq!(
            config.image.credential.token().unwrap_err().to_string(),
            "Replicate API token not configured"
        );
        assert!(!config.openai.credential.is_configured());
    }

    #[test]
    fn openai_key_needs_sk_prefix() {
        let config = load(&[("JWT_SECRET", "s"), ("OPENAI_API_KEY", "pk-123")]).unwrap();
        assert!(!config.openai.credential.is_configured());

        let config = load(&[("JWT_SECRET", "s"), ("OPENAI_API_KEY", "sk-123")]).unwrap();
        assert_eq!(config.openai.credential.token(), Ok("sk-123"));
    }

    #[test]
    fn credential_debug_is_redacted() {
        let config = load(&[("JWT_SECRET", "s"), ("REPLICATE_API_TOKEN", "r8_topsecret")]).unwrap();
        let debug = format!("{:?}", config.image.credential);
        assert!(!debug.contains("topsecret"));
    }

    #[test]
    fn default_timeout_exceeds_poll_ceiling() {
        let config = load(&[("JWT_SECRET", "s")]).unwrap();
        assert_eq!(config.poll_ceiling(), Duration::from_secs(300));
        assert!(Duration::from_secs(config.request_timeout_secs) > config.poll_ceiling());
    }
}
