//! Submission transport.
//!
//! Encodes a [`GuestEntry`] as `multipart/form-data` and POSTs it once to the
//! guest book endpoint. There is no retry: any failure is returned to the
//! caller as a [`TransportError`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Url;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::entry::{GuestEntry, GuestbookRecord};
use crate::still::StillImage;

/// Shown when the server gives no usable message.
pub const GENERIC_FAILURE_MESSAGE: &str = "Failed to submit guest book";

/// Upload filename of the selfie part.
pub const SELFIE_FILENAME: &str = "selfie.png";

/// Upload filename of the signature part.
pub const SIGNATURE_FILENAME: &str = "signature.png";

/// Errors raised while submitting an entry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The request could not be sent or the body could not be read.
    #[error("network error: {0}")]
    Network(String),

    /// The request exceeded the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// The server answered with a non-success status.
    #[error("server rejected submission with status {status}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// `message` from the error envelope, if any.
        message: Option<String>,
    },

    /// A success status arrived with a body that is not a `{ data: .. }`
    /// envelope around a record.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The multipart body could not be built.
    #[error("failed to encode request: {0}")]
    Encoding(String),
}

impl TransportError {
    /// The single top-level message shown to the user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Rejected {
                message: Some(message),
                ..
            } => message.clone(),
            _ => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }

    fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;

/// Success envelope: the record lives under `data`.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    /// Wrapped payload.
    pub data: T,
}

/// Error envelope.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorEnvelope {
    /// Human-readable reason, shown verbatim.
    #[serde(default)]
    pub message: Option<String>,
}

/// Something that can deliver a validated entry to the backend.
#[async_trait]
pub trait GuestbookTransport: Send + Sync {
    /// Submit `entry` and return the stored record.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] on any network, status or decoding
    /// failure.
    async fn submit(&self, entry: &GuestEntry) -> Result<GuestbookRecord>;
}

/// Thin reqwest client for the guest book endpoint.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    endpoint: Url,
}

impl HttpTransport {
    /// Create a transport posting to `endpoint` with the given timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;
        Ok(Self { http, endpoint })
    }

    /// Create a transport from loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured base URL is invalid or the client
    /// cannot be built.
    pub fn from_config(config: &Config) -> crate::Result<Self> {
        Ok(Self::new(config.endpoint()?, config.timeout())?)
    }

    /// The submission URL.
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl GuestbookTransport for HttpTransport {
    async fn submit(&self, entry: &GuestEntry) -> Result<GuestbookRecord> {
        let form = build_form(entry)?;
        debug!(
            endpoint = %self.endpoint,
            selfie_bytes = entry.selfie_image.len(),
            signature_bytes = entry.signature_image.len(),
            "Submitting guest book entry"
        );

        let response = self
            .http
            .post(self.endpoint.clone())
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                let err = TransportError::from_reqwest(&e);
                warn!(error = %err, "Guest book request failed");
                err
            })?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::from_reqwest(&e))?;

        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorEnvelope>(&body)
                .ok()
                .and_then(|envelope| envelope.message)
                .filter(|message| !message.trim().is_empty());
            warn!(
                status = status.as_u16(),
                message = message.as_deref().unwrap_or(""),
                "Guest book submission rejected"
            );
            return Err(TransportError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let envelope: Envelope<GuestbookRecord> = serde_json::from_slice(&body)
            .map_err(|e| TransportError::MalformedResponse(e.to_string()))?;
        info!(id = envelope.data.id.as_deref().unwrap_or(""), "Guest book entry submitted");
        Ok(envelope.data)
    }
}

/// Build the multipart body: four text parts, then the two images.
///
/// # Errors
///
/// Returns [`TransportError::Encoding`] if an image's MIME type is not a
/// valid header value.
pub fn build_form(entry: &GuestEntry) -> Result<Form> {
    Ok(Form::new()
        .text("name", entry.name.clone())
        .text("origin", entry.origin.clone())
        .text("purpose", entry.purpose.clone())
        .text("reason", entry.reason.clone())
        .part("selfie_image", image_part(&entry.selfie_image, SELFIE_FILENAME)?)
        .part(
            "signature_image",
            image_part(&entry.signature_image, SIGNATURE_FILENAME)?,
        ))
}

fn image_part(image: &StillImage, filename: &'static str) -> Result<Part> {
    Part::bytes(image.bytes().to_vec())
        .file_name(filename)
        .mime_str(image.content_type())
        .map_err(|e| TransportError::Encoding(format!("{filename}: {e}")))
}
