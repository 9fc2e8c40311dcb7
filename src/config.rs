//! Configuration module for chathub.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::{ChatHubError, Result};

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Hub configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HubConfig {
    /// Capacity of the register/unregister/broadcast command channel.
    #[serde(default = "default_command_capacity")]
    pub command_capacity: usize,
    /// Capacity of each connection's outbound queue.
    #[serde(default = "default_send_queue_capacity")]
    pub send_queue_capacity: usize,
}

fn default_command_capacity() -> usize {
    256
}

fn default_send_queue_capacity() -> usize {
    256
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            command_capacity: default_command_capacity(),
            send_queue_capacity: default_send_queue_capacity(),
        }
    }
}

/// Per-connection transport configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionConfig {
    /// Maximum inbound frame size in bytes.
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
    /// Time allowed between pongs before the peer is considered dead.
    #[serde(default = "default_pong_wait")]
    pub pong_wait_secs: u64,
    /// Time allowed for a single write to the peer.
    #[serde(default = "default_write_wait")]
    pub write_wait_secs: u64,
    /// Display name used when the peer does not supply one.
    #[serde(default = "default_username")]
    pub default_username: String,
}

fn default_max_message_size() -> usize {
    512
}

fn default_pong_wait() -> u64 {
    60
}

fn default_write_wait() -> u64 {
    10
}

fn default_username() -> String {
    "Anonymous".to_string()
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            max_message_size: default_max_message_size(),
            pong_wait_secs: default_pong_wait(),
            write_wait_secs: default_write_wait(),
            default_username: default_username(),
        }
    }
}

/// Runtime form of [`ConnectionConfig`] used by the connection pumps.
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    /// Maximum inbound frame size in bytes.
    pub max_message_size: usize,
    /// Idle read deadline, extended on every pong.
    pub pong_wait: Duration,
    /// Interval between pings. Always shorter than `pong_wait`.
    pub ping_period: Duration,
    /// Deadline for a single write.
    pub write_wait: Duration,
    /// Capacity of the outbound queue.
    pub send_queue_capacity: usize,
}

impl ConnectionSettings {
    /// Build settings from the connection and hub sections.
    pub fn new(connection: &ConnectionConfig, hub: &HubConfig) -> Self {
        Self::with_timings(
            connection.max_message_size,
            Duration::from_secs(connection.pong_wait_secs),
            Duration::from_secs(connection.write_wait_secs),
            hub.send_queue_capacity,
        )
    }

    /// Build settings from explicit durations.
    ///
    /// The ping period is derived as nine tenths of `pong_wait`.
    pub fn with_timings(
        max_message_size: usize,
        pong_wait: Duration,
        write_wait: Duration,
        send_queue_capacity: usize,
    ) -> Self {
        Self {
            max_message_size,
            pong_wait,
            ping_period: pong_wait * 9 / 10,
            write_wait,
            send_queue_capacity,
        }
    }
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self::new(&ConnectionConfig::default(), &HubConfig::default())
    }
}

/// Web front-end configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    /// Directory containing `index.html`.
    #[serde(default = "default_template_path")]
    pub template_path: String,
    /// Directory served under `/static`.
    #[serde(default = "default_static_path")]
    pub static_path: String,
    /// Whether to serve static files.
    #[serde(default = "default_serve_static")]
    pub serve_static: bool,
    /// CORS allowed origins.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_template_path() -> String {
    "web/templates".to_string()
}

fn default_static_path() -> String {
    "web/static".to_string()
}

fn default_serve_static() -> bool {
    true
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            template_path: default_template_path(),
            static_path: default_static_path(),
            serve_static: default_serve_static(),
            cors_origins: vec![],
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level or filter directives (`info`, `chathub=debug,tower_http=info`).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/chathub.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Hub configuration.
    #[serde(default)]
    pub hub: HubConfig,
    /// Connection configuration.
    #[serde(default)]
    pub connection: ConnectionConfig,
    /// Web front-end configuration.
    #[serde(default)]
    pub web: WebConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ChatHubError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| ChatHubError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `CHATHUB_HOST`, `CHATHUB_PORT`: listen address
    /// - `CHATHUB_TEMPLATE_DIR`, `CHATHUB_STATIC_DIR`: web asset locations
    /// - `CHATHUB_LOG_LEVEL`: log level
    ///
    /// Empty values and unparsable ports are ignored.
    pub fn apply_env_overrides(&mut self) {
        if let Some(host) = non_empty_env("CHATHUB_HOST") {
            self.server.host = host;
        }
        if let Some(port) = non_empty_env("CHATHUB_PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!("Ignoring invalid CHATHUB_PORT: {}", port),
            }
        }
        if let Some(dir) = non_empty_env("CHATHUB_TEMPLATE_DIR") {
            self.web.template_path = dir;
        }
        if let Some(dir) = non_empty_env("CHATHUB_STATIC_DIR") {
            self.web.static_path = dir;
        }
        if let Some(level) = non_empty_env("CHATHUB_LOG_LEVEL") {
            self.logging.level = level;
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.hub.command_capacity == 0 {
            return Err(ChatHubError::Validation(
                "hub.command_capacity must be greater than zero".to_string(),
            ));
        }
        if self.hub.send_queue_capacity == 0 {
            return Err(ChatHubError::Validation(
                "hub.send_queue_capacity must be greater than zero".to_string(),
            ));
        }
        if self.connection.max_message_size == 0 {
            return Err(ChatHubError::Validation(
                "connection.max_message_size must be greater than zero".to_string(),
            ));
        }
        if self.connection.pong_wait_secs == 0 || self.connection.write_wait_secs == 0 {
            return Err(ChatHubError::Validation(
                "connection.pong_wait_secs and connection.write_wait_secs must be at least 1"
                    .to_string(),
            ));
        }
        Ok(())
    }

    /// Address the server binds to, as `host:port`.
    pub fn address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Runtime settings for connection pumps.
    pub fn connection_settings(&self) -> ConnectionSettings {
        ConnectionSettings::new(&self.connection, &self.hub)
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);

        assert_eq!(config.hub.command_capacity, 256);
        assert_eq!(config.hub.send_queue_capacity, 256);

        assert_eq!(config.connection.max_message_size, 512);
        assert_eq!(config.connection.pong_wait_secs, 60);
        assert_eq!(config.connection.write_wait_secs, 10);
        assert_eq!(config.connection.default_username, "Anonymous");

        assert_eq!(config.web.template_path, "web/templates");
        assert_eq!(config.web.static_path, "web/static");
        assert!(config.web.serve_static);
        assert!(config.web.cors_origins.is_empty());

        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.file, "logs/chathub.log");
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[server]
host = "127.0.0.1"
port = 9000

[hub]
command_capacity = 64
send_queue_capacity = 32

[connection]
max_message_size = 1024
pong_wait_secs = 30
write_wait_secs = 5
default_username = "Guest"

[web]
template_path = "custom/templates"
static_path = "custom/static"
serve_static = false
cors_origins = ["http://localhost:5173"]

[logging]
level = "debug"
file = "custom/logs/app.log"
"#;

        let config = Config::parse(toml).unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.hub.command_capacity, 64);
        assert_eq!(config.hub.send_queue_capacity, 32);
        assert_eq!(config.connection.max_message_size, 1024);
        assert_eq!(config.connection.pong_wait_secs, 30);
        assert_eq!(config.connection.write_wait_secs, 5);
        assert_eq!(config.connection.default_username, "Guest");
        assert_eq!(config.web.template_path, "custom/templates");
        assert_eq!(config.web.static_path, "custom/static");
        assert!(!config.web.serve_static);
        assert_eq!(config.web.cors_origins, vec!["http://localhost:5173"]);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.file, "custom/logs/app.log");
        assert_eq!(config.address(), "127.0.0.1:9000");
    }

    #[test]
    fn test_parse_partial_config() {
        let toml = r#"
[server]
port = 3000
"#;

        let config = Config::parse(toml).unwrap();

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.hub.send_queue_capacity, 256);
        assert_eq!(config.connection.default_username, "Anonymous");
    }

    #[test]
    fn test_parse_empty_config() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.connection.max_message_size, 512);
    }

    #[test]
    fn test_parse_invalid_config() {
        let result = Config::parse("this is not valid toml [[[");

        assert!(result.is_err());
        if let Err(ChatHubError::Config(msg)) = result {
            assert!(msg.contains("config parse error"));
        } else {
            panic!("Expected Config error");
        }
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = Config::load("nonexistent.toml");
        assert!(matches!(result, Err(ChatHubError::Io(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[hub]\nsend_queue_capacity = 8").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.hub.send_queue_capacity, 8);
    }

    #[test]
    fn test_apply_env_overrides() {
        let original = std::env::var("CHATHUB_TEMPLATE_DIR").ok();

        std::env::set_var("CHATHUB_TEMPLATE_DIR", "/srv/templates");
        let mut config = Config::default();
        config.apply_env_overrides();
        assert_eq!(config.web.template_path, "/srv/templates");

        // Empty values leave the configured value alone
        std::env::set_var("CHATHUB_TEMPLATE_DIR", "");
        let mut config = Config::default();
        config.web.template_path = "original".to_string();
        config.apply_env_overrides();
        assert_eq!(config.web.template_path, "original");

        if let Some(val) = original {
            std::env::set_var("CHATHUB_TEMPLATE_DIR", val);
        } else {
            std::env::remove_var("CHATHUB_TEMPLATE_DIR");
        }
    }

    #[test]
    fn test_load_with_env_overrides_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[web]\nstatic_path = \"from/file\"\n[server]\nport = 9100").unwrap();

        let original = std::env::var("CHATHUB_STATIC_DIR").ok();
        std::env::set_var("CHATHUB_STATIC_DIR", "/srv/static");

        let config = Config::load_with_env(file.path()).unwrap();
        assert_eq!(config.web.static_path, "/srv/static");
        assert_eq!(config.server.port, 9100);

        if let Some(val) = original {
            std::env::set_var("CHATHUB_STATIC_DIR", val);
        } else {
            std::env::remove_var("CHATHUB_STATIC_DIR");
        }
    }

    #[test]
    fn test_validate_default() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_zero_queue_capacity() {
        let mut config = Config::default();
        config.hub.send_queue_capacity = 0;

        let result = config.validate();
        if let Err(ChatHubError::Validation(msg)) = result {
            assert!(msg.contains("send_queue_capacity"));
        } else {
            panic!("Expected Validation error");
        }
    }

    #[test]
    fn test_validate_zero_pong_wait() {
        let mut config = Config::default();
        config.connection.pong_wait_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_connection_settings_ping_period() {
        let settings = Config::default().connection_settings();

        assert_eq!(settings.pong_wait, Duration::from_secs(60));
        assert_eq!(settings.ping_period, Duration::from_secs(54));
        assert!(settings.ping_period < settings.pong_wait);
        assert_eq!(settings.write_wait, Duration::from_secs(10));
        assert_eq!(settings.send_queue_capacity, 256);
        assert_eq!(settings.max_message_size, 512);
    }
}
