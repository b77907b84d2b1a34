//! `guestbook` - Visitor guest book form with selfie and signature capture
//!
//! This library provides the widgets and controller behind a visitor sign-in
//! form: a camera selfie widget, a freehand signature pad, field validation,
//! and a multipart submission client for the guest book API.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use guestbook::{CameraDevice, Config, FormController, HttpTransport, SignatureOptions};
//!
//! # async fn run(camera: Arc<dyn CameraDevice>) -> guestbook::Result<()> {
//! let config = Config::load()?;
//! let transport = HttpTransport::from_config(&config)?;
//! let signature = SignatureOptions::from_config(&config.signature, 2.0);
//! let mut form = FormController::new(Arc::new(transport), camera, signature);
//! form.set_name("Jane Doe");
//! form.selfie_mut().open_camera().await?;
//! form.selfie_mut().take_photo()?;
//! // ...fill the remaining fields and sign, then:
//! form.submit().await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod camera;
pub mod config;
pub mod entry;
pub mod error;
pub mod form;
pub mod logging;
pub mod signature;
pub mod still;
pub mod transport;

#[cfg(test)]
mod test_support;

pub use camera::{CameraDevice, CameraError, CameraState, SelfieCapture, VideoStream};
pub use config::Config;
pub use entry::{GuestEntry, GuestbookRecord, PURPOSE_OPTIONS};
pub use error::{Error, Result};
pub use form::{Field, FormController, FormStatus, GuestForm, ValidationErrors};
pub use logging::init_logging;
pub use signature::{Point, SignatureOptions, SignaturePad};
pub use still::{Raster, StillImage};
pub use transport::{GuestbookTransport, HttpTransport, TransportError};
