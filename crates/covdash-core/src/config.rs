use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

pub const DEFAULT_DASHBOARD_URL: &str = "https://www.uwec.edu/coronavirus-updates/dashboard/";
pub const DEFAULT_ARCHIVE_DIR: &str = "./data/daily_website_saves";
pub const DEFAULT_SERIES_PATH: &str = "./data/covid_table.csv";
pub const DEFAULT_IMAGE_MARKER: &str = "UW-EauClaireCOVID-19DataTrackerDashboard";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Every setting has a default; only malformed values fail.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let non_empty = |var: &str, default: &str| -> Result<String, ConfigError> {
        let raw = or_default(var, default);
        if raw.trim().is_empty() {
            return Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        Ok(raw)
    };

    let env = parse_environment(&or_default("COVDASH_ENV", "development"))?;
    let log_level = or_default("COVDASH_LOG_LEVEL", "info");

    let dashboard_url = or_default("COVDASH_DASHBOARD_URL", DEFAULT_DASHBOARD_URL);
    validate_http_url("COVDASH_DASHBOARD_URL", &dashboard_url)?;

    let archive_dir = PathBuf::from(non_empty("COVDASH_ARCHIVE_DIR", DEFAULT_ARCHIVE_DIR)?);
    let series_path = PathBuf::from(non_empty("COVDASH_SERIES_PATH", DEFAULT_SERIES_PATH)?);
    let image_marker = non_empty("COVDASH_IMAGE_MARKER", DEFAULT_IMAGE_MARKER)?;

    let request_timeout_secs = parse_u64("COVDASH_REQUEST_TIMEOUT_SECS", "30")?;
    if request_timeout_secs == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "COVDASH_REQUEST_TIMEOUT_SECS".to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    let user_agent = or_default("COVDASH_USER_AGENT", "covdash/0.1 (dashboard-archiver)");
    let lock_timeout_ms = parse_u64("COVDASH_LOCK_TIMEOUT_MS", "5000")?;

    let ocr_binary = non_empty("COVDASH_OCR_BINARY", "tesseract")?;
    let ocr_language = non_empty("COVDASH_OCR_LANGUAGE", "eng")?;

    Ok(AppConfig {
        env,
        log_level,
        dashboard_url,
        archive_dir,
        series_path,
        image_marker,
        request_timeout_secs,
        user_agent,
        lock_timeout_ms,
        ocr_binary,
        ocr_language,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "COVDASH_ENV".to_string(),
            reason: format!("unknown environment \"{other}\""),
        }),
    }
}

fn validate_http_url(var: &str, raw: &str) -> Result<(), ConfigError> {
    let rest = raw
        .strip_prefix("https://")
        .or_else(|| raw.strip_prefix("http://"));
    match rest {
        Some(host_and_path) if !host_and_path.is_empty() && !host_and_path.starts_with('/') => {
            Ok(())
        }
        _ => Err(ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: format!("\"{raw}\" is not an absolute http(s) URL"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
