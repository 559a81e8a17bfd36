// src/config.rs

use std::env;
use std::str::FromStr;
use std::time::Duration;

use dotenvy::dotenv;
use validator::Validate;

use crate::error::AppError;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8081";
pub const DEFAULT_MONITOR_INTERVAL_MS: u64 = 2000;
pub const DEFAULT_FACE_SCORE_THRESHOLD: f32 = 0.5;
pub const DEFAULT_FACE_INPUT_SIZE: u32 = 224;
pub const DEFAULT_BRIGHTNESS_THRESHOLD: f32 = 50.0;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Validate)]
pub struct Config {
    #[validate(url)]
    pub api_base_url: String,
    pub rust_log: String,
    pub log_dir: String,

    #[validate(range(min = 100, max = 60000))]
    pub monitor_interval_ms: u64,
    #[validate(range(min = 0.0, max = 1.0))]
    pub face_score_threshold: f32,
    #[validate(range(min = 32, max = 1024))]
    pub face_input_size: u32,
    #[validate(range(min = 0.0, max = 255.0))]
    pub brightness_threshold: f32,

    /// 0 disables the client-side timeout.
    pub http_timeout_secs: u64,
    /// 0 means acquisition waits indefinitely.
    pub media_acquire_timeout_secs: u64,
    pub submit_assignment_enabled: bool,

    pub jotform_name: Option<String>,
    pub course_name: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            rust_log: "info".to_string(),
            log_dir: "logs".to_string(),
            monitor_interval_ms: DEFAULT_MONITOR_INTERVAL_MS,
            face_score_threshold: DEFAULT_FACE_SCORE_THRESHOLD,
            face_input_size: DEFAULT_FACE_INPUT_SIZE,
            brightness_threshold: DEFAULT_BRIGHTNESS_THRESHOLD,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            media_acquire_timeout_secs: 0,
            submit_assignment_enabled: true,
            jotform_name: None,
            course_name: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenv().ok();

        Self::from_vars(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    /// Unset keys fall back to the defaults; malformed values are errors.
    pub fn from_vars<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let config = Self {
            api_base_url: lookup("API_BASE_URL").unwrap_or(defaults.api_base_url),
            rust_log: lookup("RUST_LOG").unwrap_or(defaults.rust_log),
            log_dir: lookup("LOG_DIR").unwrap_or(defaults.log_dir),
            monitor_interval_ms: parse_or(&lookup, "MONITOR_INTERVAL_MS", defaults.monitor_interval_ms)?,
            face_score_threshold: parse_or(&lookup, "FACE_SCORE_THRESHOLD", defaults.face_score_threshold)?,
            face_input_size: parse_or(&lookup, "FACE_INPUT_SIZE", defaults.face_input_size)?,
            brightness_threshold: parse_or(&lookup, "BRIGHTNESS_THRESHOLD", defaults.brightness_threshold)?,
            http_timeout_secs: parse_or(&lookup, "HTTP_TIMEOUT_SECS", defaults.http_timeout_secs)?,
            media_acquire_timeout_secs: parse_or(
                &lookup,
                "MEDIA_ACQUIRE_TIMEOUT_SECS",
                defaults.media_acquire_timeout_secs,
            )?,
            submit_assignment_enabled: parse_or(
                &lookup,
                "SUBMIT_ASSIGNMENT_ENABLED",
                defaults.submit_assignment_enabled,
            )?,
            jotform_name: lookup("JOTFORM_NAME").filter(|v| !v.trim().is_empty()),
            course_name: lookup("COURSE_NAME").filter(|v| !v.trim().is_empty()),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn monitor_interval(&self) -> Duration {
        Duration::from_millis(self.monitor_interval_ms)
    }

    pub fn http_timeout(&self) -> Option<Duration> {
        (self.http_timeout_secs > 0).then(|| Duration::from_secs(self.http_timeout_secs))
    }

    pub fn media_acquire_timeout(&self) -> Option<Duration> {
        (self.media_acquire_timeout_secs > 0)
            .then(|| Duration::from_secs(self.media_acquire_timeout_secs))
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, AppError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("{} has an invalid value: {:?}", key, raw))),
        None => Ok(default),
    }
}
