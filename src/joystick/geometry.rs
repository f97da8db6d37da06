//! Screen-space geometry for the touch joystick.
//!
//! Coordinates are CSS client pixels as reported by the touch surface:
//! x grows to the right, y grows downward.
//!
//! # Clamping
//!
//! Displacements are clamped radially (circular, not per-axis) so that
//! diagonal drags reach magnitude 1.0 exactly at the rim.

use serde::{Deserialize, Serialize};

/// A point in client coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// On-screen bounding box of the joystick base.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Square rect of side `size` centered on `center`.
    pub fn centered(center: Point, size: f64) -> Self {
        Self::new(center.x - size / 2.0, center.y - size / 2.0, size, size)
    }

    /// Midpoint of the rectangle (the joystick anchor).
    pub fn center(&self) -> Point {
        Point::new(self.left + self.width / 2.0, self.top + self.height / 2.0)
    }
}

/// Normalized stick deflection, inside the unit disk.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StickVector {
    pub x: f64,
    pub y: f64,
}

impl StickVector {
    pub const ZERO: StickVector = StickVector { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean length, 0.0..=1.0 for emitted vectors.
    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// Direction in radians, `atan2(y, x)`.
    pub fn angle(&self) -> f64 {
        self.y.atan2(self.x)
    }
}

/// Clamp a raw displacement to a circle of radius `max_distance`.
///
/// The displacement keeps its angle (`atan2(dy, dx)`); only its length is
/// limited to `max_distance`. NaN components count as zero displacement on
/// that axis, infinite ones clamp to the rim.
///
/// # Returns
/// * `(x, y)` - Clamped displacement in pixels
///
/// # Example
/// ```
/// use tvremote_gw::joystick::geometry::clamp_displacement;
///
/// // Inside the circle: unchanged
/// let (x, y) = clamp_displacement(0.0, 30.0, 75.0);
/// assert!(x.abs() < 1e-9 && (y - 30.0).abs() < 1e-9);
///
/// // Outside: pulled back onto the rim
/// let (x, y) = clamp_displacement(150.0, 0.0, 75.0);
/// assert!((x - 75.0).abs() < 1e-9 && y.abs() < 1e-9);
/// ```
pub fn clamp_displacement(dx: f64, dy: f64, max_distance: f64) -> (f64, f64) {
    let dx = if dx.is_nan() { 0.0 } else { dx };
    let dy = if dy.is_nan() { 0.0 } else { dy };

    let distance = (dx * dx + dy * dy).sqrt();
    let clamped = distance.min(max_distance);
    let angle = dy.atan2(dx);

    (angle.cos() * clamped, angle.sin() * clamped)
}

/// Displacement from `anchor` to `raw`, clamped to `radius` and divided by it.
///
/// This is the vector handed to the move callback.
pub fn normalized_offset(anchor: Point, raw: Point, radius: f64) -> (StickVector, Point) {
    let (x, y) = clamp_displacement(raw.x - anchor.x, raw.y - anchor.y, radius);
    (StickVector::new(x / radius, y / radius), Point::new(x, y))
}
