//! Error types for guestbook.
//!
//! This module defines the crate-wide error type. Each subsystem keeps its own
//! narrower error (`CameraError`, `TransportError`, `ValidationErrors`) and
//! converts into [`Error`] at the crate boundary.

use thiserror::Error;

use crate::camera::CameraError;
use crate::form::ValidationErrors;
use crate::transport::TransportError;

/// The main error type for guestbook operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Device Errors ===
    /// The camera could not be opened, played or read.
    #[error("camera error: {0}")]
    Camera(#[from] CameraError),

    // === Form Errors ===
    /// One or more fields failed validation; nothing was sent.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    /// A submission is already in flight for this form.
    #[error("a submission is already in progress")]
    SubmissionInFlight,

    // === Transport Errors ===
    /// The submission request failed.
    #[error("submission failed: {0}")]
    Transport(#[from] TransportError),

    // === Image Errors ===
    /// Encoding or decoding a still image failed.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// A data URL could not be parsed.
    #[error("invalid data URL: {reason}")]
    DataUrl {
        /// Why the data URL was rejected.
        reason: String,
    },

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for guestbook operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a data URL error.
    #[must_use]
    pub fn data_url(reason: impl Into<String>) -> Self {
        Self::DataUrl {
            reason: reason.into(),
        }
    }

    /// Create a configuration validation error.
    #[must_use]
    pub fn config_validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            message: message.into(),
        }
    }

    /// Check if this error came from client-side validation.
    #[must_use]
    pub fn is_validation_error(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if this error came from the camera device.
    #[must_use]
    pub fn is_device_error(&self) -> bool {
        matches!(self, Self::Camera(_))
    }

    /// Check if this error came from the submission transport.
    #[must_use]
    pub fn is_transport_error(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}
