//! Camera capture widget.
//!
//! [`SelfieCapture`] drives a [`CameraDevice`] through three states:
//!
//! ```text
//! Idle --open_camera--> Live --take_photo--> Captured
//!   ^                    |                      |
//!   +----- failure ------+                      |
//!                        ^------- retake -------+
//! ```
//!
//! The widget exclusively owns at most one [`VideoStream`]. Every path that
//! leaves `Live` (capture, retake, close, drop) stops the stream before
//! anything else happens, so two streams are never live for one widget.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::still::{Raster, StillImage};

/// Shown when the device cannot be acquired.
pub const ACCESS_FAILED_MESSAGE: &str =
    "Unable to access the camera. Make sure permission has been granted.";

/// Shown when the stream opened but the preview refused to play.
pub const PLAYBACK_BLOCKED_MESSAGE: &str = "Camera playback was blocked.";

/// Errors raised while acquiring or reading the camera.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CameraError {
    /// The user or the OS refused camera access.
    #[error("camera permission denied")]
    PermissionDenied,

    /// No matching device, or it is busy.
    #[error("camera unavailable: {0}")]
    Unavailable(String),

    /// The stream opened but preview playback was refused.
    #[error("camera playback blocked: {0}")]
    PlaybackBlocked(String),

    /// A still was requested while no stream is live.
    #[error("camera is not streaming")]
    NotStreaming,

    /// Reading or encoding the current frame failed.
    #[error("failed to capture frame: {0}")]
    Frame(String),
}

impl CameraError {
    /// The inline message shown beside the widget.
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::PlaybackBlocked(_) => PLAYBACK_BLOCKED_MESSAGE,
            Self::PermissionDenied
            | Self::Unavailable(_)
            | Self::NotStreaming
            | Self::Frame(_) => ACCESS_FAILED_MESSAGE,
        }
    }

    /// Check if this error is a permission refusal.
    #[must_use]
    pub fn is_permission_error(&self) -> bool {
        matches!(self, Self::PermissionDenied)
    }
}

/// Result type for camera operations.
pub type Result<T> = std::result::Result<T, CameraError>;

/// Which way the requested camera faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Facing {
    /// Front camera, facing the user.
    #[default]
    User,
    /// Rear camera.
    Environment,
}

/// Constraints passed to [`CameraDevice::open`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreamRequest {
    /// Requested camera direction.
    pub facing: Facing,
    /// Whether audio is requested alongside video.
    pub audio: bool,
}

impl StreamRequest {
    /// Front-facing video, no audio.
    #[must_use]
    pub fn selfie() -> Self {
        Self {
            facing: Facing::User,
            audio: false,
        }
    }
}

/// A source of video streams (the platform camera API).
///
/// Implementations handle the OS permission prompt; once granted, later
/// calls in the same session are expected to reuse it.
#[async_trait]
pub trait CameraDevice: Send + Sync {
    /// Name of this device (for logging).
    fn name(&self) -> &str;

    /// Acquire a live stream matching `request`.
    ///
    /// # Errors
    ///
    /// Returns [`CameraError::PermissionDenied`] or
    /// [`CameraError::Unavailable`] when no stream can be acquired.
    async fn open(&self, request: StreamRequest) -> Result<Box<dyn VideoStream>>;
}

/// A live handle to a video input.
#[async_trait]
pub trait VideoStream: Send {
    /// Native frame size in pixels.
    fn resolution(&self) -> (u32, u32);

    /// Start the preview.
    ///
    /// # Errors
    ///
    /// Returns [`CameraError::PlaybackBlocked`] if playback is refused.
    async fn play(&mut self) -> Result<()>;

    /// Copy the current frame at native resolution.
    ///
    /// # Errors
    ///
    /// Returns [`CameraError::Frame`] if no frame is available.
    fn grab_frame(&mut self) -> Result<Raster>;

    /// Release the device. Must be idempotent.
    fn stop(&mut self);
}

/// Widget state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraState {
    /// No stream, no still.
    Idle,
    /// Stream open, preview rendering.
    Live,
    /// Still held, stream released.
    Captured,
}

impl fmt::Display for CameraState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Live => write!(f, "live"),
            Self::Captured => write!(f, "captured"),
        }
    }
}

/// Snapshot of a [`SelfieCapture`] for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CameraStatus {
    /// Current state.
    pub state: CameraState,
    /// Whether a stream has been granted during this session.
    pub has_permission: bool,
    /// Number of stills captured since construction.
    pub capture_count: u64,
    /// Inline error message, if the last action failed.
    pub error: Option<&'static str>,
}

/// The selfie capture widget.
pub struct SelfieCapture {
    device: Arc<dyn CameraDevice>,
    stream: Option<Box<dyn VideoStream>>,
    value: watch::Sender<Option<StillImage>>,
    error: Option<CameraError>,
    has_permission: bool,
    capture_count: u64,
}

impl fmt::Debug for SelfieCapture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelfieCapture")
            .field("device", &self.device.name())
            .field("state", &self.state())
            .field("error", &self.error)
            .field("capture_count", &self.capture_count)
            .finish_non_exhaustive()
    }
}

impl SelfieCapture {
    /// Create an idle widget bound to `device`.
    #[must_use]
    pub fn new(device: Arc<dyn CameraDevice>) -> Self {
        let (value, _) = watch::channel(None);
        Self {
            device,
            stream: None,
            value,
            error: None,
            has_permission: false,
            capture_count: 0,
        }
    }

    /// Current state, derived from the held stream and still.
    #[must_use]
    pub fn state(&self) -> CameraState {
        if self.stream.is_some() {
            CameraState::Live
        } else if self.value.borrow().is_some() {
            CameraState::Captured
        } else {
            CameraState::Idle
        }
    }

    /// Whether a stream is currently held.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.stream.is_some()
    }

    /// The current still, if one has been captured.
    #[must_use]
    pub fn value(&self) -> Option<StillImage> {
        self.value.borrow().clone()
    }

    /// Subscribe to still changes. A notification is sent on capture and
    /// on retake (with `None`).
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<StillImage>> {
        self.value.subscribe()
    }

    /// The last device error, cleared on the next open attempt.
    #[must_use]
    pub fn error(&self) -> Option<&CameraError> {
        self.error.as_ref()
    }

    /// Status snapshot for rendering.
    #[must_use]
    pub fn status(&self) -> CameraStatus {
        CameraStatus {
            state: self.state(),
            has_permission: self.has_permission,
            capture_count: self.capture_count,
            error: self.error.as_ref().map(CameraError::user_message),
        }
    }

    /// Open the front camera and start the preview.
    ///
    /// Any stream still held is stopped first. On failure the widget is
    /// left `Idle` (or `Captured` if a still is held) with the error
    /// recorded for display.
    ///
    /// # Errors
    ///
    /// Returns the device or playback error.
    pub async fn open_camera(&mut self) -> Result<()> {
        self.release();
        self.error = None;

        let stream = match self.device.open(StreamRequest::selfie()).await {
            Ok(stream) => stream,
            Err(e) => {
                warn!(device = self.device.name(), error = %e, "Failed to open camera");
                self.error = Some(e.clone());
                return Err(e);
            }
        };
        self.has_permission = true;

        let (width, height) = stream.resolution();
        debug!(device = self.device.name(), width, height, "Camera stream opened");
        let stream = self.stream.insert(stream);

        if let Err(e) = stream.play().await {
            warn!(device = self.device.name(), error = %e, "Camera playback failed");
            self.release();
            self.error = Some(e.clone());
            return Err(e);
        }
        Ok(())
    }

    /// Freeze the current frame into a PNG still and release the stream.
    ///
    /// # Errors
    ///
    /// Returns [`CameraError::NotStreaming`] outside `Live`, or
    /// [`CameraError::Frame`] if the frame cannot be read or encoded. The
    /// stream stays open after a frame error so the user can try again.
    pub fn take_photo(&mut self) -> Result<StillImage> {
        let stream = self.stream.as_mut().ok_or(CameraError::NotStreaming)?;

        let encoded = stream.grab_frame().and_then(|frame| {
            StillImage::png(&frame).map_err(|e| CameraError::Frame(e.to_string()))
        });
        let still = match encoded {
            Ok(still) => still,
            Err(e) => {
                warn!(error = %e, "Failed to capture photo");
                self.error = Some(e.clone());
                return Err(e);
            }
        };

        self.release();
        self.capture_count += 1;
        debug!(bytes = still.len(), "Photo captured");
        self.value.send_replace(Some(still.clone()));
        Ok(still)
    }

    /// Discard the held still and reopen the camera.
    ///
    /// # Errors
    ///
    /// Returns the device or playback error from reopening.
    pub async fn retake(&mut self) -> Result<()> {
        self.release();
        self.value.send_replace(None);
        debug!("Retaking photo");
        self.open_camera().await
    }

    /// Stop the preview without capturing.
    pub fn close(&mut self) {
        self.release();
    }

    /// Drop the stream, the still and any error.
    pub fn reset(&mut self) {
        self.release();
        self.error = None;
        if self.value.borrow().is_some() {
            self.value.send_replace(None);
        }
    }

    fn release(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.stop();
            debug!(device = self.device.name(), "Camera stream released");
        }
    }
}

impl Drop for SelfieCapture {
    fn drop(&mut self) {
        self.release();
    }
}
