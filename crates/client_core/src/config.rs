use std::{collections::HashMap, fs, path::Path, time::Duration};

use tracing::warn;

pub const SETTINGS_FILE: &str = "rla-client.toml";

const MIN_POLL_DELAY_MS: u64 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub server_url: String,
    pub poll_delay_ms: u64,
    pub request_timeout_ms: u64,
    /// Enables the debug event source on the coordinator.
    pub debug: bool,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8888".into(),
            poll_delay_ms: 5_000,
            request_timeout_ms: 10_000,
            debug: false,
        }
    }
}

impl ClientSettings {
    pub fn poll_delay(&self) -> Duration {
        Duration::from_millis(self.poll_delay_ms.max(MIN_POLL_DELAY_MS))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Defaults, then `rla-client.toml` in the working directory, then `APP__*`
/// environment variables.
pub fn load_settings() -> ClientSettings {
    load_settings_from(Path::new(SETTINGS_FILE), |key| std::env::var(key).ok())
}

pub fn load_settings_from(
    path: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> ClientSettings {
    let mut settings = ClientSettings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        match toml::from_str::<HashMap<String, toml::Value>>(&raw) {
            Ok(file_cfg) => {
                for (key, value) in file_cfg {
                    let value = match value {
                        toml::Value::String(s) => s,
                        other => other.to_string(),
                    };
                    apply(&mut settings, &key, &value);
                }
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "ignoring unreadable settings file")
            }
        }
    }

    for (key, var) in [
        ("server_url", "APP__SERVER_URL"),
        ("poll_delay_ms", "APP__POLL_DELAY_MS"),
        ("request_timeout_ms", "APP__REQUEST_TIMEOUT_MS"),
        ("debug", "APP__DEBUG"),
    ] {
        if let Some(v) = env(var) {
            apply(&mut settings, key, &v);
        }
    }

    settings
}

fn apply(settings: &mut ClientSettings, key: &str, value: &str) {
    match key {
        "server_url" => settings.server_url = value.to_string(),
        "poll_delay_ms" => match value.parse::<u64>() {
            Ok(parsed) => settings.poll_delay_ms = parsed.max(MIN_POLL_DELAY_MS),
            Err(_) => warn!(key, value, "ignoring invalid poll delay"),
        },
        "request_timeout_ms" => match value.parse::<u64>() {
            Ok(parsed) => settings.request_timeout_ms = parsed,
            Err(_) => warn!(key, value, "ignoring invalid request timeout"),
        },
        "debug" => match value.parse::<bool>() {
            Ok(parsed) => settings.debug = parsed,
            Err(_) => warn!(key, value, "ignoring invalid debug flag"),
        },
        _ => warn!(key, "unknown settings key"),
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
