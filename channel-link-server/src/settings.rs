//! Settings / Configuration.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::{path::PathBuf, time::Duration};
use url::Url;

/// Prefix of environment variables overriding settings
const ENV_PREFIX: &str = "CHANNEL_LINK";

/// Names of environments for channel-link-server.
/// Overrides serialization to force lower case in settings and
/// environment variables
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AppEnvironment {
    /// Local environment (local testing).
    Local,
    /// Official Develop environment.
    Dev,
    /// Official environment.
    Staging,
    /// Official Production environment.
    Prod,
}

/// Implement display to force environment to lower case
impl std::fmt::Display for AppEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", format!("{self:?}").to_lowercase())
    }
}

/// Database settings.
#[derive(Clone, Debug, Deserialize)]
pub struct Database {
    /// Database URL
    pub url: String,
    /// Connect Timeout
    pub connect_timeout: u64,
}

/// Server settings.
#[derive(Clone, Debug, Deserialize)]
pub struct Server {
    /// Server [AppEnvironment].
    pub environment: AppEnvironment,
    /// Server port.
    pub port: u16,
    /// Server metrics port.
    pub metrics_port: u16,
    /// Server timeout in milliseconds.
    pub timeout_ms: u64,
}

/// Identity user pool settings.
#[derive(Clone, Debug, Deserialize)]
pub struct IdentityPool {
    /// Endpoint of the user pool admin API
    pub endpoint: Url,
    /// The user pool that owns the identities
    pub user_pool_id: String,
    /// Profile attribute holding the bound channel id
    #[serde(default = "default_channel_attribute")]
    pub channel_attribute: String,
    /// Http client settings for talking to the user pool
    #[serde(default)]
    pub http_client: HttpClient,
}

fn default_channel_attribute() -> String {
    "custom:channel_id".to_string()
}

/// Messaging platform interaction settings.
#[derive(Clone, Debug, Deserialize)]
pub struct Interactions {
    /// Hex-encoded ed25519 public key interactions are signed with
    pub public_key: String,
}

#[derive(Clone, Debug, Deserialize)]
/// Application settings.
pub struct Settings {
    /// Database settings
    pub database: Database,
    /// Server settings
    pub server: Server,
    /// Identity user pool settings
    pub identity_pool: IdentityPool,
    /// Interaction webhook settings
    pub interactions: Interactions,
    /// The path where the settings file resides.
    /// This can't actually be configured in the settings file itself, for obvious reasons.
    #[serde(skip)]
    pub path: Option<PathBuf>,
}

impl Settings {
    /// Load settings.
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        Self::load_with_env(config_path, Environment::with_prefix(ENV_PREFIX))
    }

    fn load_with_env(
        config_path: Option<PathBuf>,
        environment: Environment,
    ) -> Result<Self, ConfigError> {
        let path = config_path
            .unwrap_or(PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config/settings.toml"));
        // inject environment variables naming them properly on the settings
        // e.g. [interactions] public_key="foo"
        // would be injected with environment variable CHANNEL_LINK_INTERACTIONS__PUBLIC_KEY="foo"
        let s = Config::builder()
            .add_source(File::with_name(&path.as_path().display().to_string()))
            .add_source(
                environment
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        let mut settings: Self = s.try_deserialize()?;
        settings.path = Some(path);
        Ok(settings)
    }
}

/// Http-client retry options.
#[derive(Clone, Debug, Deserialize)]
pub struct HttpClientRetryOptions {
    /// Retry count.
    pub count: u32,
    /// Retry lower bounds for [reqwest_retry::policies::ExponentialBackoff].
    pub bounds_low_ms: u64,
    /// Retry upper bounds for [reqwest_retry::policies::ExponentialBackoff].
    pub bounds_high_ms: u64,
}

impl Default for HttpClientRetryOptions {
    fn default() -> Self {
        Self {
            bounds_high_ms: 5_000,
            bounds_low_ms: 100,
            count: 3,
        }
    }
}

/// Settings for Http clients.
#[derive(Clone, Debug, Deserialize)]
pub struct HttpClient {
    /// Optional timeout for idle sockets being kept-alive.
    /// Using `None` to disable timeout.
    pub pool_idle_timeout_ms: Option<u64>,
    #[serde(default)]
    /// Http-client retry options.
    pub retry_options: HttpClientRetryOptions,
    /// Client timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self {
            pool_idle_timeout_ms: Some(5_000),
            retry_options: HttpClientRetryOptions::default(),
            timeout_ms: 30_000,
        }
    }
}

impl HttpClient {
    /// Convert `pool_idle_timeout_ms` to [Duration].
    pub fn pool_idle_timeout(&self) -> Option<Duration> {
        self.pool_idle_timeout_ms.and_then(|timeout| {
            if timeout != 0 {
                Some(Duration::from_millis(timeout))
            } else {
                None
            }
        })
    }

    /// Convert `timeout_ms` to [Duration].
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
