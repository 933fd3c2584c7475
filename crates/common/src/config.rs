use crate::Result;
use anyhow::anyhow;
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

// TOML configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub band: BandConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_backtest_days")]
    pub backtest_days: u32,
    #[serde(default = "default_daily_errors_limit")]
    pub daily_errors_limit: u32,
}

#[derive(Debug, Deserialize)]
pub struct BandConfig {
    #[serde(default = "default_band_upper_base")]
    pub upper_base: f64,
    #[serde(default = "default_band_upper_multiplier")]
    pub upper_multiplier: f64,
}

#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_rust_log_format")]
    pub rust_log_format: String,
}

// Default values
fn default_backtest_days() -> u32 {
    56 // 8週間
}
fn default_daily_errors_limit() -> u32 {
    120
}
fn default_band_upper_base() -> f64 {
    1000.0
}
fn default_band_upper_multiplier() -> f64 {
    3.0
}
fn default_rust_log_format() -> String {
    "json".to_string()
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            backtest_days: default_backtest_days(),
            daily_errors_limit: default_daily_errors_limit(),
        }
    }
}

impl Default for BandConfig {
    fn default() -> Self {
        Self {
            upper_base: default_band_upper_base(),
            upper_multiplier: default_band_upper_multiplier(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            rust_log_format: default_rust_log_format(),
        }
    }
}

static CONFIG: Lazy<Config> = Lazy::new(|| {
    load_config().unwrap_or_else(|e| {
        eprintln!(
            "Warning: Failed to load config files: {}. Using defaults.",
            e
        );
        Config::default()
    })
});

static CONFIG_STORE: Lazy<Arc<Mutex<HashMap<String, String>>>> =
    Lazy::new(|| Arc::new(Mutex::new(HashMap::new())));

pub fn get(name: &str) -> Result<String> {
    // Priority 1: CONFIG_STORE (runtime overrides)
    if let Some(value) = get_from_store(name) {
        if value.is_empty() {
            return Err(anyhow!("{} is empty", name));
        }
        return Ok(value);
    }

    // Priority 2: Environment variables
    if let Ok(val) = std::env::var(name)
        && !val.is_empty()
    {
        return Ok(val);
    }

    // Priority 3: TOML config
    let toml_value = match name {
        "ACCURACY_BACKTEST_DAYS" => Some(CONFIG.metrics.backtest_days.to_string()),
        "ACCURACY_DAILY_ERRORS_LIMIT" => Some(CONFIG.metrics.daily_errors_limit.to_string()),
        "BAND_UPPER_BASE" => Some(CONFIG.band.upper_base.to_string()),
        "BAND_UPPER_MULTIPLIER" => Some(CONFIG.band.upper_multiplier.to_string()),
        "RUST_LOG_FORMAT" => Some(CONFIG.logging.rust_log_format.clone()),
        _ => None,
    };

    if let Some(value) = toml_value
        && !value.is_empty()
    {
        return Ok(value);
    }

    Err(anyhow!("Configuration key not found: {}", name))
}

/// 設定値をパースして返す。未設定・パース失敗時は default。
pub fn get_or<T: FromStr>(name: &str, default: T) -> T {
    get(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// テスト用: 設定値を上書きする
///
/// 注: `#[cfg(test)]` にすると他クレート(accuracy等)のテストから参照できないため
/// `#[doc(hidden)]` で公開している
#[doc(hidden)]
pub fn set(name: &str, value: &str) {
    if let Ok(mut store) = CONFIG_STORE.lock() {
        store.insert(name.to_string(), value.to_string());
    }
}

/// テスト用: 設定値を CONFIG_STORE から削除する
#[doc(hidden)]
pub fn remove(name: &str) {
    if let Ok(mut store) = CONFIG_STORE.lock() {
        store.remove(name);
    }
}

/// テスト用: CONFIG_STORE に値をセットし、Drop 時に自動で元に戻す RAII ガード。
///
/// テストが途中で panic しても確実にクリーンアップされる。
#[doc(hidden)]
pub struct ConfigGuard {
    key: String,
    previous: Option<String>,
}

impl ConfigGuard {
    pub fn new(key: &str, value: &str) -> Self {
        let previous = get_from_store(key);
        set(key, value);
        Self {
            key: key.to_string(),
            previous,
        }
    }
}

impl Drop for ConfigGuard {
    fn drop(&mut self) {
        match &self.previous {
            Some(prev) => set(&self.key, prev),
            None => remove(&self.key),
        }
    }
}

fn get_from_store(name: &str) -> Option<String> {
    if let Ok(store) = CONFIG_STORE.lock() {
        store.get(name).cloned()
    } else {
        None
    }
}

/// Load configuration from TOML files with priority:
/// 1. config/config.local.toml (git-ignored, for local overrides)
/// 2. config/config.toml (git-managed template)
/// 3. Default values
fn load_config() -> Result<Config> {
    let mut config = Config::default();

    // Load base config from config.toml
    let base_path = "config/config.toml";
    if Path::new(base_path).exists() {
        let content = fs::read_to_string(base_path)?;
        config = toml::from_str(&content)?;
    }

    // Override with local config if exists
    let local_path = "config/config.local.toml";
    if Path::new(local_path).exists() {
        let content = fs::read_to_string(local_path)?;
        let local_config: Config = toml::from_str(&content)?;
        merge_config(&mut config, local_config);
    }

    Ok(config)
}

/// Merge local config into base config (local values override base values)
fn merge_config(base: &mut Config, local: Config) {
    // Metrics
    if local.metrics.backtest_days != default_backtest_days() {
        base.metrics.backtest_days = local.metrics.backtest_days;
    }
    if local.metrics.daily_errors_limit != default_daily_errors_limit() {
        base.metrics.daily_errors_limit = local.metrics.daily_errors_limit;
    }

    // Band
    if local.band.upper_base != default_band_upper_base() {
        base.band.upper_base = local.band.upper_base;
    }
    if local.band.upper_multiplier != default_band_upper_multiplier() {
        base.band.upper_multiplier = local.band.upper_multiplier;
    }

    // Logging
    if local.logging.rust_log_format != default_rust_log_format() {
        base.logging.rust_log_format = local.logging.rust_log_format;
    }
}
