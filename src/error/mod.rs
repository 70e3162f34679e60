//! Error handling module for moshpit

use thiserror::Error;

/// Main error type for moshpit operations
///
/// Every variant is terminal for the run that produced it. Nothing is
/// retried internally; a caller that wants another attempt starts over with
/// a fresh source.
#[derive(Error, Debug)]
pub enum MoshError {
    /// Reading the input stream failed
    #[error("Failed to read input stream: {0}")]
    SourceRead(#[source] std::io::Error),

    /// Writing the output stream failed; earlier writes are not undone
    #[error("Failed to write output stream: {0}")]
    SinkWrite(#[source] std::io::Error),

    /// No frame marker was found within the buffer cap
    #[error("Frame exceeds the maximum frame size of {limit} bytes without a chunk marker")]
    FrameTooLarge { limit: usize },

    /// Scene detection threshold outside [0, 1]
    #[error("Scene detection threshold must be a value between 0 and 1, got {value}")]
    InvalidThreshold { value: f64 },

    /// A scene timestamp appeared before the frame rate was announced
    #[error("Could not find fps value of input file before the first scene change")]
    MissingFrameRate,

    /// The external analysis tool failed
    #[error("{tool} failed: {message}")]
    ExternalTool { tool: String, message: String },

    /// Invalid configuration
    #[error("Invalid configuration: {message}")]
    Config { message: String },

    /// A background worker panicked or was aborted
    #[error("Worker failed: {message}")]
    Worker { message: String },

    /// I/O error outside the scan loop (opening files and the like)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MoshError {
    /// Build an [`MoshError::ExternalTool`] error
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ExternalTool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Build an [`MoshError::Config`] error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

/// Result type alias for moshpit operations
pub type MoshResult<T> = std::result::Result<T, MoshError>;
