use clap::Parser;
use lib_dashsync::{SyncConfig, TransportKind};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

/// Config file read when `--config-path` is not given.
const DEFAULT_CONFIG_FILE: &str = "dash_client.conf";

#[derive(Parser, Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[clap(about = "Telemetry dashboard sync client", version)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[clap(long, env = "DASH_CONFIG_PATH", help = "Path to the JSON configuration file.")]
    pub config_path: Option<PathBuf>,

    #[clap(long, env = "DASH_LOG_DIR", help = "Directory for log files.")]
    pub log_dir: Option<PathBuf>,

    #[clap(long, env = "DASH_LOG_LEVEL", help = "Logging level (trace, debug, info, warn, error).")]
    pub log_level: Option<String>,

    #[clap(long, env = "DASH_TRANSPORT", help = "Transport to start with (eventStream, webSocket, poll).")]
    pub transport: Option<TransportKind>,

    #[clap(long, env = "DASH_PUSH_URL", help = "Event stream or WebSocket endpoint.")]
    pub push_url: Option<Url>,

    #[clap(long, env = "DASH_POLL_URL", help = "Long-poll endpoint.")]
    pub poll_url: Option<Url>,

    #[clap(long, env = "DASH_MESSAGE_CAPACITY", help = "Number of transient messages shown at once.")]
    pub message_capacity: Option<usize>,

    #[clap(long, env = "DASH_POLL_RETRY_DELAY_MS", help = "Delay in milliseconds before retrying a failed poll.")]
    pub poll_retry_delay_ms: Option<u64>,

    #[clap(long, env = "DASH_REQUEST_TIMEOUT_SECS", help = "Upper bound in seconds on a single poll request.")]
    pub request_timeout_secs: Option<u64>,

    #[clap(long, env = "DASH_AUTH_TOKEN", help = "Bearer token for the HTTP transports.")]
    pub auth_token: Option<String>,

    #[clap(long, env = "DASH_FALLBACK_TO_POLL", help = "Restart on the poll transport if the push stream fails (true/false).")]
    pub fallback_to_poll: Option<bool>,
}

impl Config {
    // Merge two Config structs, where 'other' overrides 'self' for Some values
    fn merge(self, other: Config) -> Config {
        Config {
            config_path: other.config_path.or(self.config_path),
            log_dir: other.log_dir.or(self.log_dir),
            log_level: other.log_level.or(self.log_level),
            transport: other.transport.or(self.transport),
            push_url: other.push_url.or(self.push_url),
            poll_url: other.poll_url.or(self.poll_url),
            message_capacity: other.message_capacity.or(self.message_capacity),
            poll_retry_delay_ms: other.poll_retry_delay_ms.or(self.poll_retry_delay_ms),
            request_timeout_secs: other.request_timeout_secs.or(self.request_timeout_secs),
            auth_token: other.auth_token.or(self.auth_token),
            fallback_to_poll: other.fallback_to_poll.or(self.fallback_to_poll),
        }
    }

    pub fn log_dir(&self) -> PathBuf {
        self.log_dir.clone().unwrap_or_else(|| PathBuf::from("./logs"))
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or("info")
    }

    pub fn fallback_to_poll(&self) -> bool {
        self.fallback_to_poll.unwrap_or(false)
    }

    /// Projects the resolved settings onto the engine configuration.
    pub fn to_sync_config(&self) -> SyncConfig {
        let defaults = SyncConfig::default();
        SyncConfig {
            transport: self.transport.unwrap_or(defaults.transport),
            push_url: self.push_url.clone(),
            poll_url: self.poll_url.clone(),
            message_capacity: self.message_capacity.unwrap_or(defaults.message_capacity),
            poll_retry_delay_ms: self.poll_retry_delay_ms.unwrap_or(defaults.poll_retry_delay_ms),
            request_timeout_secs: self.request_timeout_secs.unwrap_or(defaults.request_timeout_secs),
            auth_token: self.auth_token.clone(),
            ..defaults
        }
    }
}

fn default_config() -> Config {
    Config {
        log_dir: Some(PathBuf::from("./logs")),
        log_level: Some("info".to_string()),
        transport: Some(TransportKind::EventStream),
        push_url: Url::parse("http://localhost:8000/events").ok(),
        poll_url: Url::parse("http://localhost:8000/events/poll").ok(),
        message_capacity: Some(2),
        poll_retry_delay_ms: Some(1000),
        request_timeout_secs: Some(60),
        fallback_to_poll: Some(false),
        ..Default::default()
    }
}

/// Resolves the client configuration: defaults, then the JSON config file,
/// then environment variables and CLI arguments (already folded into `cli` by clap).
pub fn load_config(cli: Config) -> Config {
    let config_file_path = cli
        .config_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    let mut current_config = default_config();

    if let Some(file_config) = read_config_file(&config_file_path) {
        current_config = current_config.merge(file_config);
    }

    current_config.merge(cli)
}

fn read_config_file(path: &Path) -> Option<Config> {
    if !path.exists() {
        // Logging is not up yet at this point.
        eprintln!("Config file not found at {}. Using defaults and environment/CLI variables.", path.display());
        return None;
    }

    match fs::read_to_string(path) {
        Ok(config_str) => match serde_json::from_str::<Config>(&config_str) {
            Ok(file_config) => Some(file_config),
            Err(e) => {
                eprintln!("Failed to parse config file {}: {}. Falling back to other sources.", path.display(), e);
                None
            }
        },
        Err(e) => {
            eprintln!("Failed to read config file {}: {}. Falling back to other sources.", path.display(), e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_file_overrides_defaults_and_cli_overrides_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"transport":"webSocket","pushUrl":"ws://car.local:9000/feed","logLevel":"warn","messageCapacity":3}}"#
        )
        .unwrap();

        let cli = Config {
            config_path: Some(file.path().to_path_buf()),
            log_level: Some("debug".to_string()),
            ..Default::default()
        };
        let config = load_config(cli);

        assert_eq!(config.transport, Some(TransportKind::WebSocket));
        assert_eq!(config.push_url.as_ref().map(Url::as_str), Some("ws://car.local:9000/feed"));
        assert_eq!(config.message_capacity, Some(3));
        assert_eq!(config.log_level(), "debug");
        // Untouched keys keep their defaults.
        assert_eq!(config.poll_retry_delay_ms, Some(1000));
    }

    #[test]
    fn test_missing_or_broken_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cli = Config {
            config_path: Some(dir.path().join("absent.conf")),
            ..Default::default()
        };
        let config = load_config(cli.clone());
        assert_eq!(config, default_config().merge(cli));

        let broken = dir.path().join("broken.conf");
        fs::write(&broken, "{ not json").unwrap();
        let config = load_config(Config {
            config_path: Some(broken),
            ..Default::default()
        });
        assert_eq!(config.transport, Some(TransportKind::EventStream));
    }

    #[test]
    fn test_to_sync_config() {
        let config = load_config(Config {
            config_path: Some(PathBuf::from("/nonexistent/dash_client.conf")),
            transport: Some(TransportKind::Poll),
            poll_retry_delay_ms: Some(250),
            ..Default::default()
        });
        let sync = config.to_sync_config();

        assert_eq!(sync.transport, TransportKind::Poll);
        assert_eq!(sync.poll_retry_delay_ms, 250);
        assert_eq!(sync.poll_url.unwrap().as_str(), "http://localhost:8000/events/poll");
        assert_eq!(sync.message_capacity, 2);
    }
}
