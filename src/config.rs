use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_PATH: &str = "config/chat.json";
pub const GATEWAY_URL_ENV: &str = "CHAT_GATEWAY_URL";

const DEFAULT_GATEWAY_URL: &str = "ws://localhost:3333";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_gateway_url")]
    pub gateway_url: String,
    /// Upper bound for identify / room / contacts round trips.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_gateway_url() -> String {
    DEFAULT_GATEWAY_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            gateway_url: default_gateway_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl AppConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Ưu tiên: tham số CLI > biến môi trường > file cấu hình.
    pub fn with_overrides(
        mut self,
        env_gateway_url: Option<String>,
        cli_gateway_url: Option<String>,
        cli_timeout_secs: Option<u64>,
    ) -> Self {
        if let Some(url) = cli_gateway_url.or(env_gateway_url) {
            if !url.trim().is_empty() {
                self.gateway_url = url.trim().to_string();
            }
        }
        if let Some(secs) = cli_timeout_secs {
            self.request_timeout_secs = secs;
        }
        self
    }
}

fn is_websocket_url(url: &str) -> bool {
    url.starts_with("ws://") || url.starts_with("wss://")
}

/// Đọc cấu hình gateway; file thiếu hoặc hỏng thì dùng mặc định.
pub fn load_config(path: &str) -> AppConfig {
    let file = Path::new(path);
    let content = match fs::read_to_string(file) {
        Ok(content) => content,
        Err(err) => {
            log::info!("No gateway config at {} ({err}); using defaults", file.display());
            return AppConfig::default();
        }
    };

    let mut config = match serde_json::from_str::<AppConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            log::warn!("Ignoring malformed gateway config {}: {err}", file.display());
            return AppConfig::default();
        }
    };

    if !is_websocket_url(&config.gateway_url) {
        log::warn!(
            "gateway_url `{}` in {} is not a ws:// or wss:// address; using {DEFAULT_GATEWAY_URL}",
            config.gateway_url,
            file.display()
        );
        config.gateway_url = default_gateway_url();
    }
    log::debug!(
        "Gateway config from {}: {} (timeout {}s)",
        file.display(),
        config.gateway_url,
        config.request_timeout_secs
    );
    config
}

pub fn save_config(path: &str, config: &AppConfig) -> std::io::Result<()> {
    let file = Path::new(path);
    if let Some(dir) = file.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    let mut json = serde_json::to_string_pretty(config)?;
    json.push('\n');
    fs::write(file, json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn scratch_path() -> String {
        std::env::temp_dir()
            .join(format!("gateway-chat-{}", Uuid::new_v4()))
            .join("chat.json")
            .to_string_lossy()
            .into_owned()
    }

    #[test]
    fn missing_file_gives_defaults() {
        let config = load_config(&scratch_path());
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn save_then_load() {
        let path = scratch_path();
        let config = AppConfig {
            gateway_url: "wss://chat.example.com".to_string(),
            request_timeout_secs: 8,
        };

        save_config(&path, &config).unwrap();
        assert_eq!(load_config(&path), config);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let path = scratch_path();
        save_config(&path, &AppConfig::default()).unwrap();
        fs::write(&path, r#"{ "gateway_url": "ws://10.0.0.2:3333" }"#).unwrap();

        let config = load_config(&path);
        assert_eq!(config.gateway_url, "ws://10.0.0.2:3333");
        assert_eq!(config.request_timeout_secs, 5);
    }

    #[test]
    fn invalid_file_falls_back_to_defaults() {
        let path = scratch_path();
        save_config(&path, &AppConfig::default()).unwrap();
        fs::write(&path, "not json").unwrap();
        assert_eq!(load_config(&path), AppConfig::default());
    }

    #[test]
    fn non_websocket_url_in_file_is_replaced() {
        let path = scratch_path();
        save_config(&path, &AppConfig::default()).unwrap();
        fs::write(
            &path,
            r#"{ "gateway_url": "http://chat.example.com", "request_timeout_secs": 9 }"#,
        )
        .unwrap();

        let config = load_config(&path);
        assert_eq!(config.gateway_url, "ws://localhost:3333");
        assert_eq!(config.request_timeout_secs, 9);
    }

    #[test]
    fn cli_beats_env_beats_file() {
        let file = AppConfig::default();

        let from_env = file
            .clone()
            .with_overrides(Some("ws://env:1".into()), None, None);
        assert_eq!(from_env.gateway_url, "ws://env:1");

        let from_cli = file.with_overrides(
            Some("ws://env:1".into()),
            Some("ws://cli:2".into()),
            Some(0),
        );
        assert_eq!(from_cli.gateway_url, "ws://cli:2");
        assert_eq!(from_cli.request_timeout(), Duration::from_secs(1));
    }
}
