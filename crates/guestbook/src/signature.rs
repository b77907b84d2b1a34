//! Signature capture widget.
//!
//! A fixed-size drawing surface backed by a pixel buffer scaled by the
//! device pixel ratio. Pointer coordinates are in display units; strokes are
//! rasterized in buffer pixels with round caps and joins.

use std::fmt;

use image::Rgba;
use tokio::sync::watch;
use tracing::{debug, trace};

use crate::config::SignatureConfig;
use crate::error::Result;
use crate::still::{Raster, StillImage, BLACK, WHITE};

/// Largest backing buffer side, in device pixels.
pub const MAX_BUFFER_SIDE: u32 = 16_384;

/// A pointer position relative to the surface's top-left corner, in display
/// units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    /// Horizontal offset.
    pub x: f32,
    /// Vertical offset.
    pub y: f32,
}

impl Point {
    /// Create a point.
    #[must_use]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Surface geometry and ink.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignatureOptions {
    /// Display width.
    pub width: u32,
    /// Display height.
    pub height: u32,
    /// Device pixel ratio, read once at construction.
    pub pixel_ratio: f32,
    /// Stroke width in display units.
    pub stroke_width: f32,
    /// Ink color.
    pub ink: Rgba<u8>,
    /// Background color.
    pub paper: Rgba<u8>,
}

impl Default for SignatureOptions {
    fn default() -> Self {
        Self::from_config(&SignatureConfig::default(), 1.0)
    }
}

impl SignatureOptions {
    /// Black ink on white paper with the given geometry.
    #[must_use]
    pub fn plain(width: u32, height: u32, pixel_ratio: f32) -> Self {
        Self {
            width,
            height,
            pixel_ratio,
            stroke_width: SignatureConfig::default().stroke_width,
            ink: BLACK,
            paper: WHITE,
        }
    }

    /// Build options from configuration and the current pixel ratio.
    #[must_use]
    pub fn from_config(config: &SignatureConfig, pixel_ratio: f32) -> Self {
        let [r, g, b] = config.stroke_color;
        let [pr, pg, pb] = config.background_color;
        Self {
            width: config.width,
            height: config.height,
            pixel_ratio,
            stroke_width: config.stroke_width,
            ink: Rgba([r, g, b, 0xff]),
            paper: Rgba([pr, pg, pb, 0xff]),
        }
    }

    /// The pixel ratio actually used: non-positive or non-finite values fall
    /// back to 1.
    #[must_use]
    pub fn effective_ratio(&self) -> f32 {
        if self.pixel_ratio.is_finite() && self.pixel_ratio > 0.0 {
            self.pixel_ratio
        } else {
            1.0
        }
    }

    /// Pixel buffer size: display size times the pixel ratio, truncated
    /// to whole pixels and kept within `1..=MAX_BUFFER_SIDE`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn buffer_size(&self) -> (u32, u32) {
        let ratio = f64::from(self.effective_ratio());
        let scale = |len: u32| {
            ((f64::from(len) * ratio).floor() as u32).clamp(1, MAX_BUFFER_SIDE)
        };
        (scale(self.width), scale(self.height))
    }
}

/// The signature capture widget.
pub struct SignaturePad {
    options: SignatureOptions,
    raster: Raster,
    cursor: Option<Point>,
    value: watch::Sender<Option<StillImage>>,
}

impl fmt::Debug for SignaturePad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignaturePad")
            .field("options", &self.options)
            .field("drawing", &self.is_drawing())
            .field("has_value", &self.value.borrow().is_some())
            .finish_non_exhaustive()
    }
}

impl Default for SignaturePad {
    fn default() -> Self {
        Self::new(SignatureOptions::default())
    }
}

impl SignaturePad {
    /// Create a blank surface.
    #[must_use]
    pub fn new(options: SignatureOptions) -> Self {
        let (width, height) = options.buffer_size();
        let (value, _) = watch::channel(None);
        debug!(width, height, ratio = options.effective_ratio(), "Signature surface created");
        Self {
            options,
            raster: Raster::filled(width, height, options.paper),
            cursor: None,
            value,
        }
    }

    /// Surface options.
    #[must_use]
    pub fn options(&self) -> &SignatureOptions {
        &self.options
    }

    /// Backing pixel buffer.
    #[must_use]
    pub fn raster(&self) -> &Raster {
        &self.raster
    }

    /// Whether a stroke is in progress.
    #[must_use]
    pub fn is_drawing(&self) -> bool {
        self.cursor.is_some()
    }

    /// Whether nothing but background is on the surface.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.raster.count_not(self.options.paper) == 0
    }

    /// The committed signature, `None` when nothing has been committed since
    /// the last clear.
    #[must_use]
    pub fn value(&self) -> Option<StillImage> {
        self.value.borrow().clone()
    }

    /// Subscribe to commits and clears.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<StillImage>> {
        self.value.subscribe()
    }

    /// Begin a stroke at `at`. Nothing is painted until the pointer moves.
    pub fn pointer_down(&mut self, at: Point) {
        trace!(x = at.x, y = at.y, "Stroke started");
        self.cursor = Some(at);
    }

    /// Extend the active stroke to `to`. Ignored when no stroke is active.
    pub fn pointer_move(&mut self, to: Point) {
        let Some(from) = self.cursor else {
            return;
        };
        self.stroke_segment(from, to);
        self.cursor = Some(to);
    }

    /// End the active stroke and commit the surface.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding the surface fails.
    pub fn pointer_up(&mut self) -> Result<()> {
        self.end_stroke()
    }

    /// Same as [`SignaturePad::pointer_up`]; a no-op when not drawing.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding the surface fails.
    pub fn pointer_leave(&mut self) -> Result<()> {
        self.end_stroke()
    }

    /// Wipe the surface and report an empty signature.
    pub fn clear(&mut self) {
        self.raster.fill(self.options.paper);
        self.cursor = None;
        self.value.send_replace(None);
        debug!("Signature cleared");
    }

    fn end_stroke(&mut self) -> Result<()> {
        if self.cursor.take().is_none() {
            return Ok(());
        }
        let still = StillImage::png(&self.raster)?;
        debug!(bytes = still.len(), "Signature committed");
        self.value.send_replace(Some(still));
        Ok(())
    }

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_precision_loss,
        clippy::cast_sign_loss
    )]
    fn stroke_segment(&mut self, from: Point, to: Point) {
        let ratio = self.options.effective_ratio();
        let (ax, ay) = (from.x * ratio, from.y * ratio);
        let (bx, by) = (to.x * ratio, to.y * ratio);
        let radius = self.options.stroke_width * ratio / 2.0;

        let max_x = i64::from(self.raster.width()) - 1;
        let max_y = i64::from(self.raster.height()) - 1;
        let x0 = ((ax.min(bx) - radius - 1.0).floor() as i64).max(0);
        let x1 = ((ax.max(bx) + radius + 1.0).ceil() as i64).min(max_x);
        let y0 = ((ay.min(by) - radius - 1.0).floor() as i64).max(0);
        let y1 = ((ay.max(by) + radius + 1.0).ceil() as i64).min(max_y);
        if x0 > x1 || y0 > y1 {
            return;
        }

        for y in y0..=y1 {
            for x in x0..=x1 {
                let center = (x as f32 + 0.5, y as f32 + 0.5);
                let distance = distance_to_segment(center, (ax, ay), (bx, by));
                let coverage = (radius + 0.5 - distance).clamp(0.0, 1.0);
                if coverage > 0.0 {
                    self.raster.blend(x as u32, y as u32, self.options.ink, coverage);
                }
            }
        }
    }
}

/// Distance from `p` to the segment `a`-`b`; degenerates to point distance
/// when `a == b`.
fn distance_to_segment(p: (f32, f32), a: (f32, f32), b: (f32, f32)) -> f32 {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let len_sq = dx * dx + dy * dy;
    let t = if len_sq > 0.0 {
        (((p.0 - a.0) * dx + (p.1 - a.1) * dy) / len_sq).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let (cx, cy) = (a.0 + t * dx, a.1 + t * dy);
    ((p.0 - cx).powi(2) + (p.1 - cy).powi(2)).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draw_line(pad: &mut SignaturePad) {
        pad.pointer_down(Point::new(10.0, 10.0));
        pad.pointer_move(Point::new(40.0, 20.0));
        pad.pointer_move(Point::new(80.0, 20.0));
    }

    #[test]
    fn test_buffer_size_scales_with_ratio() {
        assert_eq!(SignatureOptions::plain(300, 150, 1.0).buffer_size(), (300, 150));
        assert_eq!(SignatureOptions::plain(300, 150, 2.0).buffer_size(), (600, 300));
        assert_eq!(SignatureOptions::plain(300, 150, 1.5).buffer_size(), (450, 225));
    }

    #[test]
    fn test_buffer_size_truncates_fractional_pixels() {
        assert_eq!(SignatureOptions::plain(301, 151, 1.5).buffer_size(), (451, 226));
        assert_eq!(SignatureOptions::plain(1, 1, 0.4).buffer_size(), (1, 1));
    }

    #[test]
    fn test_buffer_size_is_capped() {
        let options = SignatureOptions::plain(u32::MAX, 4096, 8.0);
        assert_eq!(options.buffer_size(), (MAX_BUFFER_SIDE, MAX_BUFFER_SIDE));
    }

    #[test]
    fn test_invalid_ratio_falls_back_to_one() {
        assert_eq!(SignatureOptions::plain(100, 50, 0.0).buffer_size(), (100, 50));
        assert_eq!(SignatureOptions::plain(100, 50, f32::NAN).buffer_size(), (100, 50));
    }

    #[test]
    fn test_new_surface_is_blank_white() {
        let pad = SignaturePad::new(SignatureOptions::plain(100, 50, 2.0));
        assert_eq!(pad.raster().width(), 200);
        assert_eq!(pad.raster().height(), 100);
        assert!(pad.is_blank());
        assert_eq!(pad.raster().pixel(0, 0), Some(WHITE));
        assert!(pad.value().is_none());
        assert!(!pad.is_drawing());
    }

    #[test]
    fn test_options_from_config() {
        let config = SignatureConfig {
            stroke_color: [0x11, 0x22, 0x33],
            ..SignatureConfig::default()
        };
        let options = SignatureOptions::from_config(&config, 3.0);
        assert_eq!(options.ink, Rgba([0x11, 0x22, 0x33, 0xff]));
        assert_eq!(options.paper, WHITE);
        assert_eq!(options.buffer_size(), (1440, 720));
    }

    #[test]
    fn test_draw_and_release_commits_scaled_image() {
        let mut pad = SignaturePad::new(SignatureOptions::plain(120, 60, 2.0));
        let rx = pad.subscribe();

        draw_line(&mut pad);
        assert!(pad.is_drawing());
        assert!(!pad.is_blank());
        assert!(!rx.has_changed().unwrap());

        pad.pointer_up().unwrap();
        assert!(!pad.is_drawing());
        assert!(rx.has_changed().unwrap());

        let still = pad.value().unwrap();
        assert!(!still.is_empty());
        assert_eq!(still.dimensions().unwrap(), (240, 120));

        // Midpoint of the second segment, in buffer pixels, is inked.
        let decoded = still.decode().unwrap();
        assert_eq!(decoded.pixel(120, 40), Some(BLACK));
        assert_eq!(decoded.pixel(0, 0), Some(WHITE));
    }

    #[test]
    fn test_move_without_down_draws_nothing() {
        let mut pad = SignaturePad::new(SignatureOptions::plain(50, 50, 1.0));
        pad.pointer_move(Point::new(5.0, 5.0));
        pad.pointer_move(Point::new(45.0, 45.0));
        assert!(pad.is_blank());
    }

    #[test]
    fn test_down_alone_paints_nothing() {
        let mut pad = SignaturePad::new(SignatureOptions::plain(50, 50, 1.0));
        pad.pointer_down(Point::new(25.0, 25.0));
        assert!(pad.is_blank());
    }

    #[test]
    fn test_leave_without_stroke_is_noop() {
        let mut pad = SignaturePad::new(SignatureOptions::plain(50, 50, 1.0));
        let rx = pad.subscribe();

        pad.pointer_leave().unwrap();
        pad.pointer_up().unwrap();

        assert!(!rx.has_changed().unwrap());
        assert!(pad.value().is_none());
    }

    #[test]
    fn test_leave_during_stroke_commits() {
        let mut pad = SignaturePad::new(SignatureOptions::plain(50, 50, 1.0));
        let rx = pad.subscribe();

        pad.pointer_down(Point::new(5.0, 5.0));
        pad.pointer_move(Point::new(20.0, 20.0));
        pad.pointer_leave().unwrap();

        assert!(rx.has_changed().unwrap());
        assert!(pad.value().is_some());

        // A second leave after the stroke ended changes nothing.
        let rx = pad.subscribe();
        pad.pointer_leave().unwrap();
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn test_every_release_recommits() {
        let mut pad = SignaturePad::new(SignatureOptions::plain(100, 50, 1.0));

        pad.pointer_down(Point::new(5.0, 5.0));
        pad.pointer_move(Point::new(30.0, 5.0));
        pad.pointer_up().unwrap();
        let first = pad.value().unwrap();

        pad.pointer_down(Point::new(5.0, 40.0));
        pad.pointer_move(Point::new(90.0, 40.0));
        pad.pointer_up().unwrap();
        let second = pad.value().unwrap();

        assert_ne!(first, second);
        let decoded = second.decode().unwrap();
        assert_eq!(decoded.pixel(15, 5), Some(BLACK));
        assert_eq!(decoded.pixel(60, 40), Some(BLACK));
    }

    #[test]
    fn test_clear_resets_surface_and_value() {
        let mut pad = SignaturePad::new(SignatureOptions::plain(60, 30, 2.0));
        draw_line(&mut pad);
        pad.pointer_up().unwrap();
        assert!(pad.value().is_some());

        let mut rx = pad.subscribe();
        pad.clear();

        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().is_none());
        assert!(pad.value().is_none());
        assert!(pad.is_blank());
        assert_eq!(pad.raster().width(), 120);
    }

    #[test]
    fn test_clear_mid_stroke_ends_stroke() {
        let mut pad = SignaturePad::new(SignatureOptions::plain(60, 30, 1.0));
        draw_line(&mut pad);
        pad.clear();
        assert!(!pad.is_drawing());

        let rx = pad.subscribe();
        pad.pointer_up().unwrap();
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn test_round_cap_extends_past_endpoint() {
        let mut pad = SignaturePad::new(SignatureOptions {
            stroke_width: 10.0,
            ..SignatureOptions::plain(100, 100, 1.0)
        });
        pad.pointer_down(Point::new(20.0, 50.0));
        pad.pointer_move(Point::new(60.0, 50.0));

        // Inside the cap radius beyond the endpoint, but not beyond it.
        assert_eq!(pad.raster().pixel(62, 50), Some(BLACK));
        assert_eq!(pad.raster().pixel(70, 50), Some(WHITE));
        assert_eq!(pad.raster().pixel(40, 40), Some(WHITE));
    }

    #[test]
    fn test_strokes_outside_surface_are_clipped() {
        let mut pad = SignaturePad::new(SignatureOptions::plain(20, 20, 1.0));
        pad.pointer_down(Point::new(-50.0, -50.0));
        pad.pointer_move(Point::new(-10.0, -40.0));
        assert!(pad.is_blank());

        pad.pointer_move(Point::new(30.0, 30.0));
        assert!(!pad.is_blank());
    }

    #[test]
    fn test_distance_to_segment() {
        assert!((distance_to_segment((5.0, 3.0), (0.0, 0.0), (10.0, 0.0)) - 3.0).abs() < 1e-6);
        assert!((distance_to_segment((13.0, 4.0), (0.0, 0.0), (10.0, 0.0)) - 5.0).abs() < 1e-6);
        assert!((distance_to_segment((3.0, 4.0), (0.0, 0.0), (0.0, 0.0)) - 5.0).abs() < 1e-6);
    }
}
