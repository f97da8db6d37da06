//! Touch joystick
//!
//! A circular on-screen control: the user drags a knob away from the center
//! and the joystick reports a normalized vector in the unit disk, then a
//! single stop when the finger lifts.
//!
//! - [`geometry`] - points, rects and the radial clamp
//! - [`gesture`] - the `Idle` / `Tracking(id)` state machine
//! - [`controller`] - [`Joystick`], wiring input events to a [`JoystickListener`]

pub mod controller;
pub mod geometry;
pub mod gesture;

pub use controller::{Joystick, JoystickError, JoystickHost, JoystickListener};
pub use geometry::{Point, Rect, StickVector};
pub use gesture::GestureState;
