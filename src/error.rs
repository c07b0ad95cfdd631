//! Error types and handling for the Panchangam bot
//!
//! [`PanchangamError`] covers configuration and input validation.
//! [`PipelineError`] is the per-request taxonomy the flow controller turns
//! into replies.

use thiserror::Error;

/// Main error type for configuration and input checks
#[derive(Error, Debug)]
pub enum PanchangamError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Input validation errors
    #[error("Invalid input: {message}")]
    Validation { message: String },
}

impl PanchangamError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

/// Why the rendering engine did not produce an image
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderFailure {
    /// The copied region could not be pasted as a picture
    #[error("no paste target: the copied region did not produce a picture")]
    NoPasteTarget,

    /// The clipboard held no image after copying the picture
    #[error("clipboard empty: no image was captured from the clipboard")]
    ClipboardEmpty,

    /// The engine failed for any other reason (crash, timeout, missing output)
    #[error("rendering engine failed: {message}")]
    Engine { message: String },
}

/// Failure of one stage of the sun-times pipeline
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// No coordinates for the requested location
    #[error("no coordinates found for '{query}'")]
    NotFound { query: String },

    /// The geocoding service could not be reached or answered garbage
    #[error("geocoding service unavailable: {message}")]
    GeocodingUnavailable { message: String },

    /// Solar-time provider failure or a day without sunrise/sunset
    #[error("solar time service error: {message}")]
    Service { message: String },

    /// The canonical workbook could not be copied, read or written
    #[error("document error: {message}")]
    Document { message: String },

    /// The region could not be rendered to an image
    #[error("render error: {0}")]
    Render(RenderFailure),

    /// This host has no rendering engine for workbooks
    #[error("rendering is not supported on this platform ({platform})")]
    UnsupportedPlatform { platform: String },
}

impl PipelineError {
    pub fn not_found<S: Into<String>>(query: S) -> Self {
        Self::NotFound {
            query: query.into(),
        }
    }

    pub fn geocoding_unavailable<S: Into<String>>(message: S) -> Self {
        Self::GeocodingUnavailable {
            message: message.into(),
        }
    }

    pub fn service<S: Into<String>>(message: S) -> Self {
        Self::Service {
            message: message.into(),
        }
    }

    pub fn document<S: Into<String>>(message: S) -> Self {
        Self::Document {
            message: message.into(),
        }
    }

    pub fn engine<S: Into<String>>(message: S) -> Self {
        Self::Render(RenderFailure::Engine {
            message: message.into(),
        })
    }

    #[must_use]
    pub fn unsupported_platform() -> Self {
        Self::UnsupportedPlatform {
            platform: std::env::consts::OS.to_string(),
        }
    }

    /// Whether the conversation should keep waiting for another location
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PipelineError::NotFound { .. } | PipelineError::GeocodingUnavailable { .. }
        )
    }

    /// Message shown to the requester
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            PipelineError::NotFound { .. } => {
                "Sorry, I couldn't find coordinates for that location. Please try again."
                    .to_string()
            }
            PipelineError::GeocodingUnavailable { .. } => {
                "The location service is not responding right now. Please send the location again."
                    .to_string()
            }
            PipelineError::Service { message } => {
                format!("Could not compute sunrise and sunset times: {message}")
            }
            PipelineError::Document { message } => {
                format!("An error occurred while updating the Panchangam table: {message}")
            }
            PipelineError::Render(failure) => {
                format!("An error occurred while rendering the Panchangam table: {failure}")
            }
            PipelineError::UnsupportedPlatform { platform } => format!(
                "Rendering the Panchangam table is not supported on this server ({platform})."
            ),
        }
    }
}

impl From<RenderFailure> for PipelineError {
    fn from(failure: RenderFailure) -> Self {
        PipelineError::Render(failure)
    }
}
