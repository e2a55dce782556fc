//! TOML configuration file schema and parsing.
//!
//! Example config file:
//!
//! ```toml
//! log_format = "pretty"
//!
//! [defaults]
//! pass_delay_ms = 30000
//! request_timeout_ms = 10000
//!
//! [store]
//! path = "restock.jsonl"
//!
//! [telegram]
//! chat_id = "123456789"
//! # bot_token falls back to the TELEGRAM_TOKEN environment variable
//!
//! [[source]]
//! name = "argos"
//! marker = "add-to-trolley-button-button"
//! items = [
//!   { name = "console", url = "https://www.argos.co.uk/product/123" },
//! ]
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use restock_core::{MonitorConfig, Target};

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_log_format")]
    pub log_format: String,

    #[serde(default)]
    pub defaults: DefaultsConfig,

    #[serde(default)]
    pub store: Option<StoreConfig>,

    #[serde(default)]
    pub telegram: Option<TelegramConfig>,

    #[serde(default)]
    pub source: Vec<SourceDef>,
}

fn default_log_format() -> String {
    "pretty".into()
}

#[derive(Debug, Clone, Deserialize)]
pub struct DefaultsConfig {
    #[serde(default = "default_pass_delay_ms")]
    pub pass_delay_ms: u64,

    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    #[serde(default = "default_event_limit")]
    pub event_limit: usize,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            pass_delay_ms: default_pass_delay_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            event_limit: default_event_limit(),
        }
    }
}

fn default_pass_delay_ms() -> u64 {
    30_000
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    100
}

fn default_event_limit() -> usize {
    200
}

impl DefaultsConfig {
    pub fn to_monitor_config(&self) -> MonitorConfig {
        MonitorConfig::default()
            .with_pass_delay(self.pass_delay_ms)
            .with_request_timeout(self.request_timeout_ms)
            .with_max_retries(self.max_retries)
            .with_retry_backoff(self.retry_backoff_ms)
            .with_event_limit(self.event_limit)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: Option<String>,

    #[serde(default)]
    pub chat_id: Option<String>,

    #[serde(default = "default_telegram_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_telegram_retries")]
    pub max_retries: u32,
}

fn default_telegram_timeout_ms() -> u64 {
    5000
}

fn default_telegram_retries() -> u32 {
    2
}

impl TelegramConfig {
    /// Resolve credentials, falling back to the environment variables the
    /// original deployment used.
    pub fn credentials(&self) -> Result<(String, String), String> {
        let token = self
            .bot_token
            .clone()
            .or_else(|| std::env::var("TELEGRAM_TOKEN").ok())
            .ok_or("Telegram bot token not set (config bot_token or TELEGRAM_TOKEN)")?;
        let chat_id = self
            .chat_id
            .clone()
            .or_else(|| std::env::var("TELEGRAM_CHAT_ID").ok())
            .ok_or("Telegram chat id not set (config chat_id or TELEGRAM_CHAT_ID)")?;
        Ok((token, chat_id))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceDef {
    pub name: String,
    pub marker: String,

    #[serde(default)]
    pub items: Vec<ItemDef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ItemDef {
    pub name: String,
    pub url: String,
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {}", path.display(), e))?;

        let config: AppConfig = toml::from_str(&content)
            .map_err(|e| format!("Failed to parse config file {}: {}", path.display(), e))?;

        config.validate()?;
        Ok(config)
    }

    /// Targets in configuration order, grouped by source.
    pub fn to_targets(&self) -> Vec<Target> {
        self.source
            .iter()
            .flat_map(|s| {
                s.items
                    .iter()
                    .map(|item| Target::new(&s.name, &item.name, &item.url))
            })
            .collect()
    }

    fn validate(&self) -> Result<(), String> {
        let mut source_names = std::collections::HashSet::new();
        for s in &self.source {
            if s.name.is_empty() {
                return Err("Source name must not be empty".into());
            }
            if !source_names.insert(&s.name) {
                return Err(format!("Duplicate source name: {}", s.name));
            }
            if s.marker.is_empty() {
                return Err(format!("Source '{}' has an empty marker", s.name));
            }
            if s.items.is_empty() {
                return Err(format!("Source '{}' has no items", s.name));
            }
            let mut item_names = std::collections::HashSet::new();
            for (i, item) in s.items.iter().enumerate() {
                if item.name.is_empty() {
                    return Err(format!(
                        "Empty item name in source '{}' at index {}",
                        s.name, i
                    ));
                }
                if !item_names.insert(&item.name) {
                    return Err(format!(
                        "Duplicate item name '{}' in source '{}'",
                        item.name, s.name
                    ));
                }
                let parsed = url::Url::parse(&item.url).map_err(|e| {
                    format!(
                        "Invalid item URL in source '{}' at index {}: {} ({})",
                        s.name, i, item.url, e
                    )
                })?;
                if parsed.scheme() != "http" && parsed.scheme() != "https" {
                    return Err(format!(
                        "Item URL must use http or https in source '{}': {}",
                        s.name, item.url
                    ));
                }
            }
        }

        match self.log_format.as_str() {
            "pretty" | "json" => {}
            other => {
                return Err(format!(
                    "Invalid log_format '{}': must be 'pretty' or 'json'",
                    other
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal_config() {
        let toml = r#"
[[source]]
name = "argos"
marker = "add-to-trolley-button-button"
items = [
  { name = "console", url = "https://www.argos.co.uk/product/123" },
]
"#;
        let config: AppConfig = toml::from_str(toml).unwrap();
        config.validate().unwrap();
        assert_eq!(config.source.len(), 1);
        assert_eq!(config.source[0].name, "argos");
        assert_eq!(config.defaults.pass_delay_ms, 30_000);
        assert_eq!(config.log_format, "pretty");
        assert!(config.store.is_none());

        let targets = config.to_targets();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].source, "argos");
        assert_eq!(targets[0].item, "console");
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
log_format = "json"

[defaults]
pass_delay_ms = 60000
request_timeout_ms = 5000
max_retries = 1
event_limit = 50

[store]
path = "data/restock.jsonl"

[telegram]
bot_token = "tok"
chat_id = "42"
timeout_ms = 3000

[[source]]
name = "argos"
marker = "add-to-trolley-button-button"
items = [
  { name = "console", url = "https://www.argos.co.uk/product/123" },
  { name = "monitor", url = "https://www.argos.co.uk/product/456" },
]

[[source]]
name = "currys"
marker = "data-button='add-to-basket'"
items = [
  { name = "gpu", url = "https://www.currys.co.uk/product/789" },
]
"#;
        let config: AppConfig = toml::from_str(toml).unwrap();
        config.validate().unwrap();

        assert_eq!(config.log_format, "json");
        assert_eq!(config.defaults.pass_delay_ms, 60_000);
        assert_eq!(config.store.as_ref().unwrap().path, PathBuf::from("data/restock.jsonl"));

        let telegram = config.telegram.as_ref().unwrap();
        assert_eq!(telegram.timeout_ms, 3000);
        assert_eq!(telegram.max_retries, 2); // default
        let (token, chat_id) = telegram.credentials().unwrap();
        assert_eq!(token, "tok");
        assert_eq!(chat_id, "42");

        let mc = config.defaults.to_monitor_config();
        assert_eq!(mc.pass_delay.as_millis(), 60_000);
        assert_eq!(mc.request_timeout.as_millis(), 5000);
        assert_eq!(mc.max_retries, 1);
        assert_eq!(mc.event_limit, 50);

        let targets = config.to_targets();
        assert_eq!(targets.len(), 3);
        assert_eq!(targets[2].source, "currys");
        assert_eq!(targets[2].item, "gpu");
    }

    #[test]
    fn validate_rejects_duplicate_source_names() {
        let toml = r#"
[[source]]
name = "same"
marker = "buy"
items = [{ name = "a", url = "https://a.com/1" }]

[[source]]
name = "same"
marker = "buy"
items = [{ name = "b", url = "https://b.com/2" }]
"#;
        let config: AppConfig = toml::from_str(toml).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.contains("Duplicate source name"), "{}", err);
    }

    #[test]
    fn validate_rejects_duplicate_item_names_within_source() {
        let toml = r#"
[[source]]
name = "argos"
marker = "buy"
items = [
  { name = "console", url = "https://a.com/1" },
  { name = "console", url = "https://a.com/2" },
]
"#;
        let config: AppConfig = toml::from_str(toml).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.contains("Duplicate item name"), "{}", err);
    }

    #[test]
    fn validate_rejects_empty_items() {
        let toml = r#"
[[source]]
name = "argos"
marker = "buy"
items = []
"#;
        let config: AppConfig = toml::from_str(toml).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.contains("has no items"), "{}", err);
    }

    #[test]
    fn validate_rejects_invalid_url() {
        let toml = r#"
[[source]]
name = "argos"
marker = "buy"
items = [{ name = "console", url = "not-a-url" }]
"#;
        let config: AppConfig = toml::from_str(toml).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.contains("Invalid item URL"), "{}", err);
    }

    #[test]
    fn validate_rejects_non_http_url() {
        let toml = r#"
[[source]]
name = "argos"
marker = "buy"
items = [{ name = "console", url = "ftp://a.com/1" }]
"#;
        let config: AppConfig = toml::from_str(toml).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.contains("must use http or https"), "{}", err);
    }

    #[test]
    fn validate_rejects_invalid_log_format() {
        let toml = r#"
log_format = "xml"

[[source]]
name = "argos"
marker = "buy"
items = [{ name = "console", url = "https://a.com/1" }]
"#;
        let config: AppConfig = toml::from_str(toml).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.contains("Invalid log_format"), "{}", err);
    }

    #[test]
    fn validate_rejects_empty_marker() {
        let toml = r#"
[[source]]
name = "argos"
marker = ""
items = [{ name = "console", url = "https://a.com/1" }]
"#;
        let config: AppConfig = toml::from_str(toml).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.contains("empty marker"), "{}", err);
    }
}
