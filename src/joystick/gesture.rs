//! Single-gesture tracking state machine
//!
//! At most one gesture is in flight. Transitions are guarded: a start is
//! only accepted from `Idle`, and moves/ends only count when they carry the
//! identifier being tracked. Everything else is silently dropped.

use crate::input::PointerId;

/// Gesture state of one joystick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GestureState {
    #[default]
    Idle,
    Tracking(PointerId),
}

impl GestureState {
    /// Try to start tracking `id`.
    ///
    /// Returns false (and changes nothing) when a gesture is already active.
    pub fn begin(&mut self, id: PointerId) -> bool {
        match self {
            GestureState::Idle => {
                *self = GestureState::Tracking(id);
                true
            }
            GestureState::Tracking(_) => false,
        }
    }

    /// Whether `id` is the gesture currently being tracked
    pub fn is_tracking(&self, id: PointerId) -> bool {
        matches!(self, GestureState::Tracking(active) if *active == id)
    }

    /// Finish the gesture carried by `id`.
    ///
    /// Returns false when `id` is not the tracked identifier.
    pub fn finish(&mut self, id: PointerId) -> bool {
        if self.is_tracking(id) {
            *self = GestureState::Idle;
            true
        } else {
            false
        }
    }

    /// Drop whatever is being tracked, returning the identifier if any
    pub fn reset(&mut self) -> Option<PointerId> {
        match std::mem::take(self) {
            GestureState::Idle => None,
            GestureState::Tracking(id) => Some(id),
        }
    }

    /// Currently tracked identifier
    pub fn active(&self) -> Option<PointerId> {
        match self {
            GestureState::Idle => None,
            GestureState::Tracking(id) => Some(*id),
        }
    }
}
