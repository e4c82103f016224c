//! Layered error definitions
//!
//! Categorized by source: config / bus / capture / codec / inference / sink

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Bus Errors =====
    /// Topic requested with a payload schema that differs from the registered one
    #[error("topic '{topic}' schema mismatch: registered {registered}, requested {requested}")]
    TopicSchemaMismatch {
        topic: String,
        registered: String,
        requested: String,
    },

    // ===== Capture Errors =====
    /// Video source could not be opened
    #[error("unable to open video source '{uri}': {message}")]
    SourceOpen { uri: String, message: String },

    /// Frame capture failed mid-stream
    #[error("capture error from '{source_id}': {message}")]
    Capture { source_id: String, message: String },

    // ===== Codec Errors =====
    /// Frame encode failure
    #[error("frame encode error: {message}")]
    Encode { message: String },

    /// Frame decode failure
    #[error("frame decode error: {message}")]
    Decode { message: String },

    // ===== Inference Errors =====
    /// Detection model could not be initialized
    #[error("unsupported model variant '{variant}': {message}")]
    ModelInit { variant: String, message: String },

    /// Per-frame inference failure
    #[error("inference error for source '{source_id}': {message}")]
    Inference { source_id: String, message: String },

    // ===== Sink Errors =====
    /// Sink write error
    #[error("sink '{sink_name}' write error: {message}")]
    SinkWrite { sink_name: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create source open error
    pub fn source_open(uri: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SourceOpen {
            uri: uri.into(),
            message: message.into(),
        }
    }

    /// Create decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Create encode error
    pub fn encode(message: impl Into<String>) -> Self {
        Self::Encode {
            message: message.into(),
        }
    }

    /// Create inference error
    pub fn inference(source_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Inference {
            source_id: source_id.into(),
            message: message.into(),
        }
    }

    /// Create sink write error
    pub fn sink_write(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkWrite {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }
}
