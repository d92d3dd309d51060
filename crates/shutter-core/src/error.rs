//! Error types for Shutter

use crate::variant::ShaderVariant;
use thiserror::Error;

/// The main error type for Shutter operations
#[derive(Debug, Error)]
pub enum ShutterError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(String),

    #[error("TOML serialization error: {0}")]
    TomlSerError(String),

    #[error("JSON error: {0}")]
    JsonError(String),

    #[error("Mesh layout does not match shader variant {variant}: missing {missing}")]
    LayoutMismatch {
        variant: ShaderVariant,
        missing: &'static str,
    },

    #[error("Invalid mesh: {0}")]
    InvalidMesh(String),

    #[error("GPU resource already allocated: {0}")]
    AlreadyAllocated(&'static str),

    #[error("Offscreen render target is incomplete: {0}")]
    IncompleteTarget(String),

    #[error("Unknown shader variant: {0}")]
    UnknownVariant(String),

    #[error("Import error: {0}")]
    ImportError(String),

    #[error("Image write error: {0}")]
    ImageWriteError(String),

    #[error("Render error: {0}")]
    RenderError(String),

    #[error("Config error: {0}")]
    ConfigError(String),
}

/// Result type alias for Shutter operations
pub type Result<T> = std::result::Result<T, ShutterError>;

impl From<toml::de::Error> for ShutterError {
    fn from(err: toml::de::Error) -> Self {
        ShutterError::TomlParseError(err.to_string())
    }
}

impl From<toml::ser::Error> for ShutterError {
    fn from(err: toml::ser::Error) -> Self {
        ShutterError::TomlSerError(err.to_string())
    }
}

impl From<serde_json::Error> for ShutterError {
    fn from(err: serde_json::Error) -> Self {
        ShutterError::JsonError(err.to_string())
    }
}
