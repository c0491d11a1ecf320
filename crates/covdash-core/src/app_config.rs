use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Process-wide settings, resolved once at the binary entry point and then
/// handed to library constructors field by field.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub log_level: String,
    /// Dashboard page fetched on every capture cycle.
    pub dashboard_url: String,
    /// Root directory of the capture archive.
    pub archive_dir: PathBuf,
    /// CSV time series that extracted observations are appended to.
    pub series_path: PathBuf,
    /// Substring that marks an image URL as a relevant chart image.
    pub image_marker: String,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    /// How long a writer waits on a busy per-prefix naming lock.
    pub lock_timeout_ms: u64,
    pub ocr_binary: String,
    pub ocr_language: String,
}
