//! Still images and raster buffers.
//!
//! A [`Raster`] is an in-progress RGBA pixel buffer (a camera frame or the
//! signature surface). A [`StillImage`] is the encoded snapshot produced from
//! it, ready to be attached to a submission.

use std::io::Cursor;
use std::sync::OnceLock;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::{ImageFormat, ImageReader, Rgba, RgbaImage};
use regex::Regex;

use crate::error::{Error, Result};

/// MIME type used when nothing better can be determined.
pub const FALLBACK_MIME: &str = "application/octet-stream";

/// MIME type of stills produced by the capture widgets.
pub const PNG_MIME: &str = "image/png";

/// Opaque white, the background of a fresh signature surface.
pub const WHITE: Rgba<u8> = Rgba([0xff, 0xff, 0xff, 0xff]);

/// Opaque black, the default ink color.
pub const BLACK: Rgba<u8> = Rgba([0x00, 0x00, 0x00, 0xff]);

fn data_url_header() -> &'static Regex {
    static HEADER: OnceLock<Regex> = OnceLock::new();
    HEADER.get_or_init(|| {
        Regex::new(r"^data:(?P<mime>[^;,]*)(?P<params>(?:;[^;,]*)*)$")
            .expect("Invalid data URL header pattern")
    })
}

/// An RGBA pixel buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    pixels: RgbaImage,
}

impl Raster {
    /// Create a raster filled with a single color.
    #[must_use]
    pub fn filled(width: u32, height: u32, color: Rgba<u8>) -> Self {
        Self {
            pixels: RgbaImage::from_pixel(width, height, color),
        }
    }

    /// Wrap raw RGBA bytes laid out row by row.
    ///
    /// # Errors
    ///
    /// Returns an error if `data` is not exactly `width * height * 4` bytes.
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let len = data.len();
        RgbaImage::from_raw(width, height, data)
            .map(|pixels| Self { pixels })
            .ok_or_else(|| {
                Error::internal(format!(
                    "RGBA buffer of {len} bytes does not match {width}x{height}"
                ))
            })
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Read a pixel, or `None` when out of bounds.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba<u8>> {
        self.pixels.get_pixel_checked(x, y).copied()
    }

    /// Overwrite every pixel with `color`.
    pub fn fill(&mut self, color: Rgba<u8>) {
        for pixel in self.pixels.pixels_mut() {
            *pixel = color;
        }
    }

    /// Composite `color` over the pixel at (`x`, `y`) with the given coverage
    /// in `0.0..=1.0`. Out-of-bounds writes are ignored.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn blend(&mut self, x: u32, y: u32, color: Rgba<u8>, coverage: f32) {
        let Some(dst) = self.pixels.get_pixel_mut_checked(x, y) else {
            return;
        };
        let alpha = coverage.clamp(0.0, 1.0) * f32::from(color.0[3]) / 255.0;
        for channel in 0..3 {
            let src = f32::from(color.0[channel]);
            let old = f32::from(dst.0[channel]);
            dst.0[channel] = (src * alpha + old * (1.0 - alpha)).round() as u8;
        }
        let old_alpha = f32::from(dst.0[3]) / 255.0;
        dst.0[3] = ((alpha + old_alpha * (1.0 - alpha)) * 255.0).round() as u8;
    }

    /// Count pixels that differ from `color`.
    #[must_use]
    pub fn count_not(&self, color: Rgba<u8>) -> usize {
        self.pixels.pixels().filter(|p| **p != color).count()
    }

    /// Borrow the underlying image buffer.
    #[must_use]
    pub fn as_image(&self) -> &RgbaImage {
        &self.pixels
    }
}

/// An encoded, immutable snapshot ready for upload.
#[derive(Clone, PartialEq, Eq)]
pub struct StillImage {
    mime: Option<String>,
    bytes: Vec<u8>,
}

impl std::fmt::Debug for StillImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StillImage")
            .field("mime", &self.mime)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl StillImage {
    /// Wrap already-encoded bytes with an optional declared MIME type.
    #[must_use]
    pub fn new(bytes: Vec<u8>, mime: Option<String>) -> Self {
        Self { mime, bytes }
    }

    /// Encode a raster as PNG.
    ///
    /// # Errors
    ///
    /// Returns an error if the PNG encoder fails.
    pub fn png(raster: &Raster) -> Result<Self> {
        let mut out = Cursor::new(Vec::new());
        raster.as_image().write_to(&mut out, ImageFormat::Png)?;
        Ok(Self {
            mime: Some(PNG_MIME.to_string()),
            bytes: out.into_inner(),
        })
    }

    /// Parse a `data:<mime>;base64,<payload>` URL.
    ///
    /// A header without a MIME type yields a still with no declared type.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is not a base64 data URL or the payload
    /// does not decode.
    pub fn from_data_url(url: &str) -> Result<Self> {
        let (header, payload) = url
            .split_once(',')
            .ok_or_else(|| Error::data_url("missing ',' separator"))?;
        let caps = data_url_header()
            .captures(header)
            .ok_or_else(|| Error::data_url("header must start with 'data:'"))?;

        let is_base64 = caps
            .name("params")
            .is_some_and(|p| p.as_str().split(';').any(|param| param == "base64"));
        if !is_base64 {
            return Err(Error::data_url("only base64 payloads are supported"));
        }

        let mime = caps
            .name("mime")
            .map(|m| m.as_str().trim())
            .filter(|m| !m.is_empty())
            .map(str::to_string);
        let bytes = STANDARD
            .decode(payload.trim())
            .map_err(|e| Error::data_url(e.to_string()))?;
        Ok(Self { mime, bytes })
    }

    /// Render as a base64 data URL.
    #[must_use]
    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.content_type(),
            STANDARD.encode(&self.bytes)
        )
    }

    /// The declared MIME type, if any.
    #[must_use]
    pub fn declared_mime(&self) -> Option<&str> {
        self.mime.as_deref()
    }

    /// The MIME type to send: declared, else sniffed, else
    /// [`FALLBACK_MIME`].
    #[must_use]
    pub fn content_type(&self) -> &str {
        if let Some(mime) = self.mime.as_deref() {
            return mime;
        }
        image::guess_format(&self.bytes).map_or(FALLBACK_MIME, |format| format.to_mime_type())
    }

    /// Encoded bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consume into the encoded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Encoded size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the still carries no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Pixel dimensions read from the encoded header.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not a recognizable image.
    pub fn dimensions(&self) -> Result<(u32, u32)> {
        let reader = ImageReader::new(Cursor::new(&self.bytes))
            .with_guessed_format()
            .map_err(|e| Error::internal(format!("failed to read image header: {e}")))?;
        Ok(reader.into_dimensions()?)
    }

    /// Decode back into a raster.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes do not decode.
    pub fn decode(&self) -> Result<Raster> {
        let pixels = image::load_from_memory(&self.bytes)?.to_rgba8();
        Ok(Raster { pixels })
    }
}
