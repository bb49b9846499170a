// Configuration types module
// Defines all configuration-related data structures

use serde::Deserialize;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    pub http: HttpConfig,
    pub signnow: SignNowConfig,
    pub samples: SamplesConfig,
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub access_log: bool,
    /// Access log format (combined, common, json, or custom pattern)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log_format() -> String {
    "combined".to_string()
}

impl LoggingConfig {
    pub fn is_debug(&self) -> bool {
        self.level.eq_ignore_ascii_case("debug")
    }
}

/// Performance configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive_timeout: u64,
    pub read_timeout: u64,
    pub write_timeout: u64,
    pub max_connections: Option<u64>,
}

/// HTTP configuration
#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub server_name: String,
    pub enable_cors: bool,
    pub max_body_size: u64,
}

/// Remote e-signature API credentials
#[derive(Deserialize, Clone)]
pub struct SignNowConfig {
    pub api_host: String,
    /// Base64 `client_id:client_secret` sent as Basic auth on token requests
    #[serde(default)]
    pub basic_token: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
    /// Pre-issued bearer token; skips the password grant when set
    #[serde(default)]
    pub access_token: Option<String>,
    /// Seconds
    pub request_timeout: u64,
}

// Credentials stay out of debug output
impl std::fmt::Debug for SignNowConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignNowConfig")
            .field("api_host", &self.api_host)
            .field("user", &self.user)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

/// Sample catalog and callback settings
#[derive(Debug, Deserialize, Clone)]
pub struct SamplesConfig {
    /// Base of every callback URL handed to the remote service
    pub public_url: String,
    pub static_dir: String,
    /// TOML catalog replacing the built-in one
    #[serde(default)]
    pub catalog_file: Option<String>,
    /// Minutes
    pub link_expiration: u32,
}
