//! Error types for podcraft-gen
//!
//! Defines engine error types using thiserror for clear error propagation.
//! Conditions that are recovered by degrading (skipped mastering stages,
//! encoder-tier exhaustion) are represented in return types, not here; this
//! enum carries the failures that propagate to the dispatcher boundary.

use thiserror::Error;

/// Main error type for the generation engine
#[derive(Error, Debug)]
pub enum Error {
    /// Requested intent is outside the closed pipeline set
    #[error("unknown pipeline: {0}")]
    UnknownPipeline(String),

    /// Model output could not be parsed into the expected script shape
    #[error("invalid script: {0}")]
    InvalidScript(String),

    /// Language-model transport failure
    #[error("script model error: {0}")]
    Model(String),

    /// Text-to-speech failure for one segment (after the single retry)
    #[error("speech synthesis failed: {0}")]
    Synthesis(String),

    /// Zero usable audio segments came out of the audio phase
    #[error("no audio produced for any segment")]
    NoAudioProduced,

    /// Every input segment failed to decode; nothing to assemble
    #[error("no valid audio segments to master")]
    NoValidSegments,

    /// Audio decoding errors
    #[error("audio decode error: {0}")]
    Decode(String),

    /// Object storage upload failure
    #[error("upload failed: {0}")]
    Upload(String),

    /// Episode metadata write failure
    #[error("episode persist failed: {0}")]
    Persist(String),

    /// Configuration loading or validation errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Database connection or query errors
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type using the engine Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(
            Error::UnknownPipeline("news".to_string()).to_string(),
            "unknown pipeline: news"
        );
        assert_eq!(
            Error::NoAudioProduced.to_string(),
            "no audio produced for any segment"
        );
        assert_eq!(
            Error::NoValidSegments.to_string(),
            "no valid audio segments to master"
        );
    }

    #[test]
    fn error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }

    #[test]
    fn from_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Error = io.into();
        assert!(err.to_string().contains("missing"));
    }
}
