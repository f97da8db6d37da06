//! Touch and pointer input model
//!
//! Both browser touch events and pointer (mouse/pen) events are folded into
//! one [`InputEvent`]: a phase plus the list of touch points that changed.
//! A pointer event is simply a touch event with a single changed point.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::joystick::geometry::Point;

/// Identity of one input point (touch identifier or pointer id)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PointerId(pub i64);

impl fmt::Display for PointerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One changed input point in client coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TouchPoint {
    pub id: PointerId,
    pub x: f64,
    pub y: f64,
}

impl TouchPoint {
    pub fn new(id: i64, x: f64, y: f64) -> Self {
        Self {
            id: PointerId(id),
            x,
            y,
        }
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Lifecycle phase of an input event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Start,
    Move,
    End,
    /// Environment-level cancel (e.g. the OS took over the touch)
    Cancel,
}

/// A touch/pointer event with the points that changed in it
#[derive(Debug, Clone, PartialEq)]
pub struct InputEvent {
    pub phase: Phase,
    pub changed: Vec<TouchPoint>,
}

impl InputEvent {
    pub fn new(phase: Phase, changed: Vec<TouchPoint>) -> Self {
        Self { phase, changed }
    }

    /// Single-point event, as produced by pointer (mouse/pen) input
    pub fn pointer(phase: Phase, id: i64, x: f64, y: f64) -> Self {
        Self::new(phase, vec![TouchPoint::new(id, x, y)])
    }

    /// The changed point carrying `id`, if this event touches it
    pub fn find(&self, id: PointerId) -> Option<&TouchPoint> {
        self.changed.iter().find(|t| t.id == id)
    }

    /// First changed point (the one that starts a gesture)
    pub fn first(&self) -> Option<&TouchPoint> {
        self.changed.first()
    }
}
