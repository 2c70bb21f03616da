//! Error types for percept.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PerceptError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Audio path errors
    #[error("Audio capture failed: {message}")]
    AudioCapture { message: String },

    #[error("Chunk size mismatch: expected {expected} samples, got {actual}")]
    ChunkSizeMismatch { expected: usize, actual: usize },

    #[error("Speech classification failed: {message}")]
    SpeechClassification { message: String },

    #[error("Transcription failed: {message}")]
    Transcription { message: String },

    // Vision path errors
    #[error("Frame capture failed: {message}")]
    FrameCapture { message: String },

    #[error("Scene classification failed: {message}")]
    SceneClassification { message: String },

    // Publishing errors
    #[error("Event sink failed: {message}")]
    Sink { message: String },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, PerceptError>;
