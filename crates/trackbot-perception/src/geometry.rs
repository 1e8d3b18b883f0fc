//! Pixel-space helpers for detector adapters.
//!
//! Detector wrappers report bounding boxes in pixels; the control core wants
//! positions normalized to `[-1, 1]` around the frame center.  These helpers
//! do that conversion once, at the boundary.

use trackbot_types::{DetectionLabel, DetectionResult};

/// Reference box width (px) observed at [`REFERENCE_DISTANCE`].
pub const REFERENCE_WIDTH_PX: f32 = 200.0;
/// Distance, in relative units, at which a target is [`REFERENCE_WIDTH_PX`] wide.
pub const REFERENCE_DISTANCE: f32 = 100.0;

/// Axis-aligned bounding box in pixel coordinates (top-left origin).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Center point in pixels.
    pub fn center(&self) -> (f32, f32) {
        (
            self.x as f32 + self.width as f32 / 2.0,
            self.y as f32 + self.height as f32 / 2.0,
        )
    }

    /// Convert to a normalized detection for a `frame_width` x `frame_height`
    /// frame.  Width and area are reported as fractions of the frame and the
    /// distance is estimated from the box width.
    pub fn to_detection(
        &self,
        label: DetectionLabel,
        confidence: f32,
        frame_width: u32,
        frame_height: u32,
    ) -> DetectionResult {
        let (cx, cy) = self.center();
        let (nx, ny) = normalize_point(cx, cy, frame_width, frame_height);
        let frame_area = frame_width as f32 * frame_height as f32;
        let mut detection = DetectionResult::new(label, nx, ny, confidence);
        if frame_area > 0.0 {
            let area = (self.width as f32 * self.height as f32 / frame_area).min(1.0);
            let width = (self.width as f32 / frame_width as f32).min(1.0);
            detection = detection.with_area(area).with_width(width);
        }
        if let Some(distance) = estimate_distance(self.width) {
            detection = detection.with_distance(distance);
        }
        detection
    }
}

/// Map a pixel position to `[-1, 1]` relative to the frame center
/// (`+x` right, `+y` down).  Points outside the frame are clamped.
pub fn normalize_point(px: f32, py: f32, frame_width: u32, frame_height: u32) -> (f32, f32) {
    let axis = |p: f32, extent: u32| {
        if extent == 0 {
            return 0.0;
        }
        let half = extent as f32 / 2.0;
        ((p - half) / half).clamp(-1.0, 1.0)
    };
    (axis(px, frame_width), axis(py, frame_height))
}

/// Relative distance from apparent width, by similar triangles against the
/// reference box.  `None` for a zero-width box.
pub fn estimate_distance(box_width_px: u32) -> Option<f32> {
    (box_width_px > 0).then(|| REFERENCE_WIDTH_PX * REFERENCE_DISTANCE / box_width_px as f32)
}
