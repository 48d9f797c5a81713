use crate::adapters::http::RetryPolicy;
use crate::core::stats_cache::StatisticsPolicy;
use crate::core::tracker::WeatherRule;
use crate::utils::error::{Result, TrackerError};
use crate::utils::validation::{
    validate_non_empty_string, validate_path, validate_positive_number, validate_url, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_WEATHER_URL: &str = "http://api.weatherapi.com/v1";
pub const DEFAULT_DATABASE_PATH: &str = "./package-tracker.db";
const MAX_WINDOW_DAYS: u64 = 36_500;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    pub package_source: PackageSourceConfig,
    #[serde(default)]
    pub weather: WeatherConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub statistics: StatisticsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageSourceConfig {
    pub base_url: String,
    pub timeout_seconds: Option<u64>,
    pub retry_attempts: Option<u32>,
    pub retry_delay_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WeatherConfig {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub retry_attempts: Option<u32>,
    pub retry_delay_ms: Option<u64>,
    pub cold_threshold_c: Option<f64>,
    pub hot_threshold_c: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    pub database_path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatisticsConfig {
    pub freshness_days: Option<u64>,
    pub history_days: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: Option<String>,
    pub json: Option<bool>,
}

fn retry_policy(attempts: Option<u32>, delay_ms: Option<u64>) -> RetryPolicy {
    let defaults = RetryPolicy::default();
    RetryPolicy {
        retries: attempts.unwrap_or(defaults.retries),
        delay: delay_ms.map(Duration::from_millis).unwrap_or(defaults.delay),
    }
}

impl PackageSourceConfig {
    pub fn timeout_seconds(&self) -> u64 {
        self.timeout_seconds.unwrap_or(10)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        retry_policy(self.retry_attempts, self.retry_delay_ms)
    }
}

impl WeatherConfig {
    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_WEATHER_URL)
    }

    pub fn timeout_seconds(&self) -> u64 {
        self.timeout_seconds.unwrap_or(5)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        retry_policy(self.retry_attempts, self.retry_delay_ms)
    }

    pub fn rule(&self) -> WeatherRule {
        let defaults = WeatherRule::default();
        WeatherRule {
            cold_below_c: self.cold_threshold_c.unwrap_or(defaults.cold_below_c),
            hot_above_c: self.hot_threshold_c.unwrap_or(defaults.hot_above_c),
        }
    }
}

impl StorageConfig {
    pub fn database_path(&self) -> &str {
        self.database_path.as_deref().unwrap_or(DEFAULT_DATABASE_PATH)
    }
}

impl StatisticsConfig {
    pub fn policy(&self) -> StatisticsPolicy {
        let defaults = StatisticsPolicy::default();
        StatisticsPolicy {
            freshness: self
                .freshness_days
                .map(days)
                .unwrap_or(defaults.freshness),
            history: self.history_days.map(days).unwrap_or(defaults.history),
        }
    }
}

fn days(n: u64) -> chrono::Duration {
    chrono::Duration::days(n.min(i64::MAX as u64 / 86_400_000) as i64)
}

impl LoggingConfig {
    pub fn level(&self) -> &str {
        self.level.as_deref().unwrap_or("info")
    }

    pub fn json(&self) -> bool {
        self.json.unwrap_or(false)
    }
}

impl TrackerConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| TrackerError::Config {
            message: format!("cannot read {}: {}", path.as_ref().display(), e),
        })?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| TrackerError::Config {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${WEATHER_API_KEY})，未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| TrackerError::Config {
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        if self.package_source.base_url.trim().is_empty() {
            return Err(TrackerError::MissingConfig {
                field: "package_source.base_url".to_string(),
            });
        }
        validate_url("package_source.base_url", &self.package_source.base_url)?;
        validate_positive_number(
            "package_source.timeout_seconds",
            self.package_source.timeout_seconds(),
            1,
        )?;

        validate_url("weather.base_url", self.weather.base_url())?;
        validate_positive_number("weather.timeout_seconds", self.weather.timeout_seconds(), 1)?;
        if let Some(key) = &self.weather.api_key {
            validate_non_empty_string("weather.api_key", key)?;
            if key.starts_with("${") {
                tracing::warn!("⚠️ weather.api_key references an unset variable: {}", key);
            }
        }
        let rule = self.weather.rule();
        if rule.cold_below_c > rule.hot_above_c {
            return Err(TrackerError::InvalidConfigValue {
                field: "weather.cold_threshold_c".to_string(),
                value: rule.cold_below_c.to_string(),
                reason: format!("must not exceed hot_threshold_c ({})", rule.hot_above_c),
            });
        }

        validate_path("storage.database_path", self.storage.database_path())?;

        if let Some(freshness) = self.statistics.freshness_days {
            validate_positive_number("statistics.freshness_days", freshness, 1)?;
        }
        if let Some(history) = self.statistics.history_days {
            validate_positive_number("statistics.history_days", history, 1)?;
        }
        for (field, value) in [
            ("statistics.freshness_days", self.statistics.freshness_days),
            ("statistics.history_days", self.statistics.history_days),
        ] {
            if let Some(days) = value.filter(|d| *d > MAX_WINDOW_DAYS) {
                return Err(TrackerError::InvalidConfigValue {
                    field: field.to_string(),
                    value: days.to_string(),
                    reason: format!("must not exceed {} days", MAX_WINDOW_DAYS),
                });
            }
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level()) {
            return Err(TrackerError::InvalidConfigValue {
                field: "logging.level".to_string(),
                value: self.logging.level().to_string(),
                reason: format!("Valid levels: {}", valid_levels.join(", ")),
            });
        }

        Ok(())
    }
}

impl Validate for TrackerConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let toml_content = r#"
[package_source]
base_url = "https://carrier.example.com/api/PackageTracking"
"#;

        let config = TrackerConfig::from_toml_str(toml_content).unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(config.weather.base_url(), DEFAULT_WEATHER_URL);
        assert_eq!(config.storage.database_path(), DEFAULT_DATABASE_PATH);
        let policy = config.statistics.policy();
        assert_eq!(policy.freshness, chrono::Duration::days(3));
        assert_eq!(policy.history, chrono::Duration::days(60));
        assert_eq!(config.package_source.retry_policy(), RetryPolicy::default());
    }

    #[test]
    fn test_full_config() {
        let toml_content = r#"
[package_source]
base_url = "https://carrier.example.com/api/PackageTracking"
timeout_seconds = 3
retry_attempts = 4
retry_delay_ms = 50

[weather]
base_url = "https://weather.example.com/v1"
api_key = "abc123"
cold_threshold_c = 5.0
hot_threshold_c = 30.0

[storage]
database_path = "/var/lib/tracker/packages.db"

[statistics]
freshness_days = 1
history_days = 30

[logging]
level = "debug"
json = true
"#;

        let config = TrackerConfig::from_toml_str(toml_content).unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(config.package_source.retry_policy().retries, 4);
        assert_eq!(
            config.package_source.retry_policy().delay,
            Duration::from_millis(50)
        );
        assert_eq!(config.weather.rule().hot_above_c, 30.0);
        assert_eq!(config.statistics.policy().history, chrono::Duration::days(30));
        assert!(config.logging.json());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("TEST_TRACKER_WEATHER_KEY", "from-env");

        let toml_content = r#"
[package_source]
base_url = "https://carrier.example.com"

[weather]
api_key = "${TEST_TRACKER_WEATHER_KEY}"
"#;

        let config = TrackerConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.weather.api_key.as_deref(), Some("from-env"));

        std::env::remove_var("TEST_TRACKER_WEATHER_KEY");
    }

    #[test]
    fn test_config_validation() {
        let bad_url = r#"
[package_source]
base_url = "invalid-url"
"#;
        let config = TrackerConfig::from_toml_str(bad_url).unwrap();
        assert!(config.validate().is_err());

        let blank_url = r#"
[package_source]
base_url = "  "
"#;
        let config = TrackerConfig::from_toml_str(blank_url).unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, TrackerError::MissingConfig { .. }));
        assert_eq!(err.exit_code(), 1);

        let zero_window = r#"
[package_source]
base_url = "https://carrier.example.com"

[statistics]
freshness_days = 0
"#;
        let config = TrackerConfig::from_toml_str(zero_window).unwrap();
        assert!(config.validate().is_err());

        let endless_history = r#"
[package_source]
base_url = "https://carrier.example.com"

[statistics]
history_days = 1000000
"#;
        let config = TrackerConfig::from_toml_str(endless_history).unwrap();
        assert!(config.validate().is_err());

        let inverted = r#"
[package_source]
base_url = "https://carrier.example.com"

[weather]
cold_threshold_c = 25.0
hot_threshold_c = 20.0
"#;
        let config = TrackerConfig::from_toml_str(inverted).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_package_source_is_parse_error() {
        let err = TrackerConfig::from_toml_str("[storage]\n").unwrap_err();
        assert!(matches!(err, TrackerError::Config { .. }));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();

        let toml_content = r#"
[package_source]
base_url = "https://carrier.example.com"

[storage]
database_path = "./data/tracker.db"
"#;

        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = TrackerConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.storage.database_path(), "./data/tracker.db");
    }
}
