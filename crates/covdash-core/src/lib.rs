//! Shared types for the dashboard archiver: configuration, content hashing,
//! the parsed document model, and the capture/observation records.

pub mod app_config;
pub mod capture;
pub mod config;
pub mod document;
pub mod hash;
pub mod observation;

pub use app_config::{AppConfig, Environment};
pub use capture::{hash_images, Capture, CaptureDraft, CaptureName, ImageHashes, ImageSet};
pub use config::{load_app_config, load_app_config_from_env};
pub use document::{image_identifier, ChartImage, Document};
pub use hash::{digest, Content, ContentDigest, HashError};
pub use observation::{percent_of, NumericObservation};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
