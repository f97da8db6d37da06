//! Touch joystick controller
//!
//! Translates raw touch/pointer input on a circular control into a stream of
//! normalized direction vectors, tracking exactly one gesture at a time.
//!
//! # Lifecycle
//!
//! ```text
//!            start (id)                 end/cancel (id)
//!   Idle ─────────────────► Tracking(id) ───────────────► Idle
//!            on_move                     on_stop
//!            begin_capture               end_capture
//! ```
//!
//! Moves for the tracked id emit `on_move`; events for any other id are dropped.

use thiserror::Error;
use tracing::{debug, trace};

use super::geometry::{normalized_offset, Point, Rect, StickVector};
use super::gesture::GestureState;
use crate::config::{AnchorPolicy, JoystickConfig};
use crate::input::{InputEvent, Phase, PointerId};

/// Knob diameter is the base diameter divided by this
const STICK_SIZE_RATIO: f64 = 2.5;

#[derive(Debug, Error, PartialEq)]
pub enum JoystickError {
    #[error("joystick size must be a positive finite number, got {0}")]
    InvalidSize(f64),
}

/// Receiver of joystick output
pub trait JoystickListener {
    /// Called on every accepted position update, `x, y ∈ [-1, 1]`
    fn on_move(&mut self, vector: StickVector);

    /// Called exactly once when the tracked gesture ends or is cancelled
    fn on_stop(&mut self);
}

/// The surface hosting the joystick.
///
/// `bounds` is queried on every position update. The capture pair brackets
/// each gesture: `begin_capture` when a gesture is accepted, `end_capture`
/// when it ends, is cancelled, or the joystick is torn down. Hosts that route
/// move/end events from a wider scope than the control itself (a window,
/// a socket) attach that routing here.
pub trait JoystickHost {
    fn bounds(&self) -> Rect;

    fn begin_capture(&mut self) {}

    fn end_capture(&mut self) {}
}

/// A fixed rectangle is the simplest host: no layout changes, no routing.
impl JoystickHost for Rect {
    fn bounds(&self) -> Rect {
        *self
    }
}

/// Touch joystick bound to a host surface and a listener
pub struct Joystick<H, L> {
    host: H,
    listener: L,
    size: f64,
    radius: f64,
    anchor_policy: AnchorPolicy,
    state: GestureState,
    /// Clamped offset of the knob from the anchor, in pixels
    position: Point,
    /// Anchor captured at gesture start (fixed policy only)
    fixed_anchor: Option<Point>,
}

impl<H: JoystickHost, L: JoystickListener> Joystick<H, L> {
    /// Create a joystick for the given host and listener
    pub fn new(config: &JoystickConfig, host: H, listener: L) -> Result<Self, JoystickError> {
        if !config.size.is_finite() || config.size <= 0.0 {
            return Err(JoystickError::InvalidSize(config.size));
        }

        Ok(Self {
            host,
            listener,
            size: config.size,
            radius: config.size / 2.0,
            anchor_policy: config.anchor,
            state: GestureState::Idle,
            position: Point::default(),
            fixed_anchor: None,
        })
    }

    /// Feed one input event through the state machine
    pub fn handle(&mut self, event: &InputEvent) {
        match event.phase {
            Phase::Start => self.on_start(event),
            Phase::Move => self.on_move(event),
            Phase::End | Phase::Cancel => self.on_end(event),
        }
    }

    /// Release the gesture (if any) and its capture.
    ///
    /// A gesture still in flight is finished normally, so its `on_stop`
    /// still fires once.
    pub fn teardown(&mut self) {
        if let Some(id) = self.state.reset() {
            debug!("Joystick torn down mid-gesture {}", id);
            self.release();
        }
    }

    fn on_start(&mut self, event: &InputEvent) {
        let Some(touch) = event.first() else {
            return;
        };

        if !self.state.begin(touch.id) {
            trace!(
                "Ignoring start for {} while tracking {:?}",
                touch.id,
                self.state.active()
            );
            return;
        }

        debug!("Gesture started by {}", touch.id);

        if self.anchor_policy == AnchorPolicy::Fixed {
            self.fixed_anchor = Some(self.host.bounds().center());
        }
        self.host.begin_capture();
        self.update(touch.position());
    }

    fn on_move(&mut self, event: &InputEvent) {
        let Some(id) = self.state.active() else {
            return;
        };

        if let Some(touch) = event.find(id) {
            self.update(touch.position());
        }
    }

    fn on_end(&mut self, event: &InputEvent) {
        let Some(id) = self.state.active() else {
            return;
        };

        if event.find(id).is_some() && self.state.finish(id) {
            debug!("Gesture {} ended ({:?})", id, event.phase);
            self.release();
        }
    }

    fn update(&mut self, raw: Point) {
        let anchor = match (self.anchor_policy, self.fixed_anchor) {
            (AnchorPolicy::Fixed, Some(anchor)) => anchor,
            _ => self.host.bounds().center(),
        };

        let (vector, offset) = normalized_offset(anchor, raw, self.radius);
        self.position = offset;

        trace!("Joystick vector ({:.3}, {:.3})", vector.x, vector.y);
        self.listener.on_move(vector);
    }

    /// Settle after the gesture left the state machine
    fn release(&mut self) {
        self.position = Point::default();
        self.fixed_anchor = None;
        self.listener.on_stop();
        self.host.end_capture();
    }

    /// Knob offset from the anchor in pixels, `(0, 0)` when idle
    pub fn position(&self) -> Point {
        self.position
    }

    pub fn is_active(&self) -> bool {
        self.state.active().is_some()
    }

    pub fn active_pointer(&self) -> Option<PointerId> {
        self.state.active()
    }

    /// Base diameter in pixels
    pub fn size(&self) -> f64 {
        self.size
    }

    /// Maximum knob travel in pixels (half the size)
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Knob diameter in pixels; cosmetic, for clients drawing the control
    pub fn stick_size(&self) -> f64 {
        self.size / STICK_SIZE_RATIO
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn listener(&self) -> &L {
        &self.listener
    }

    pub fn listener_mut(&mut self) -> &mut L {
        &mut self.listener
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::TouchPoint;
    use proptest::prelude::*;

    const EPS: f64 = 1e-9;

    #[derive(Default)]
    struct Recorder {
        moves: Vec<StickVector>,
        stops: usize,
    }

    impl JoystickListener for Recorder {
        fn on_move(&mut self, vector: StickVector) {
            self.moves.push(vector);
        }

        fn on_stop(&mut self) {
            self.stops += 1;
        }
    }

    struct TestHost {
        rect: Rect,
        captures_begun: usize,
        captures_ended: usize,
    }

    impl TestHost {
        fn at(center: Point, size: f64) -> Self {
            Self {
                rect: Rect::centered(center, size),
                captures_begun: 0,
                captures_ended: 0,
            }
        }
    }

    impl JoystickHost for TestHost {
        fn bounds(&self) -> Rect {
            self.rect
        }

        fn begin_capture(&mut self) {
            self.captures_begun += 1;
        }

        fn end_capture(&mut self) {
            self.captures_ended += 1;
        }
    }

    fn config(size: f64, anchor: AnchorPolicy) -> JoystickConfig {
        JoystickConfig { size, anchor }
    }

    fn make_joystick(anchor: AnchorPolicy) -> Joystick<TestHost, Recorder> {
        Joystick::new(
            &config(150.0, anchor),
            TestHost::at(Point::new(100.0, 100.0), 150.0),
            Recorder::default(),
        )
        .unwrap()
    }

    fn touch(phase: Phase, id: i64, x: f64, y: f64) -> InputEvent {
        InputEvent::pointer(phase, id, x, y)
    }

    fn assert_vector(v: StickVector, x: f64, y: f64, tolerance: f64) {
        assert!(
            (v.x - x).abs() < tolerance && (v.y - y).abs() < tolerance,
            "expected ({}, {}), got ({}, {})",
            x,
            y,
            v.x,
            v.y
        );
    }

    #[test]
    fn test_scenario_start_move_end() {
        let mut joystick = make_joystick(AnchorPolicy::Live);
        assert_eq!(joystick.radius(), 75.0);

        joystick.handle(&touch(Phase::Start, 1, 100.0, 130.0));
        assert_eq!(joystick.listener().moves.len(), 1);
        assert_vector(joystick.listener().moves[0], 0.0, 0.4, EPS);

        joystick.handle(&touch(Phase::Move, 1, 175.0, 130.0));
        let v = joystick.listener().moves[1];
        assert_vector(v, 0.9285, 0.3714, 0.001);
        assert!((v.magnitude() - 1.0).abs() < EPS);
        assert!((v.angle() - 30.0f64.atan2(75.0)).abs() < EPS);

        joystick.handle(&touch(Phase::End, 1, 175.0, 130.0));
        assert_eq!(joystick.listener().stops, 1);
        assert_eq!(joystick.position(), Point::new(0.0, 0.0));
        assert!(!joystick.is_active());
    }

    #[test]
    fn test_second_start_is_ignored() {
        let mut joystick = make_joystick(AnchorPolicy::Live);

        joystick.handle(&touch(Phase::Start, 1, 100.0, 110.0));
        joystick.handle(&touch(Phase::Start, 2, 150.0, 100.0));
        assert_eq!(joystick.listener().moves.len(), 1);
        assert_eq!(joystick.active_pointer(), Some(PointerId(1)));

        // Second pointer's moves and lift are ignored too
        joystick.handle(&touch(Phase::Move, 2, 160.0, 100.0));
        joystick.handle(&touch(Phase::End, 2, 160.0, 100.0));
        assert_eq!(joystick.listener().moves.len(), 1);
        assert_eq!(joystick.listener().stops, 0);

        // First gesture still tracked
        joystick.handle(&touch(Phase::Move, 1, 100.0, 70.0));
        assert_eq!(joystick.listener().moves.len(), 2);
        assert_vector(joystick.listener().moves[1], 0.0, -0.4, EPS);
        assert_eq!(joystick.host().captures_begun, 1);
    }

    #[test]
    fn test_stop_fires_exactly_once() {
        let mut joystick = make_joystick(AnchorPolicy::Live);

        joystick.handle(&touch(Phase::Start, 4, 100.0, 100.0));
        joystick.handle(&touch(Phase::End, 4, 100.0, 100.0));
        joystick.handle(&touch(Phase::End, 4, 100.0, 100.0));
        joystick.handle(&touch(Phase::Cancel, 4, 100.0, 100.0));
        joystick.teardown();

        assert_eq!(joystick.listener().stops, 1);
        assert_eq!(joystick.host().captures_begun, 1);
        assert_eq!(joystick.host().captures_ended, 1);
    }

    #[test]
    fn test_cancel_behaves_like_end() {
        let mut joystick = make_joystick(AnchorPolicy::Live);

        joystick.handle(&touch(Phase::Start, 1, 120.0, 100.0));
        joystick.handle(&touch(Phase::Cancel, 1, 120.0, 100.0));

        assert_eq!(joystick.listener().stops, 1);
        assert_eq!(joystick.position(), Point::default());
        assert_eq!(joystick.host().captures_ended, 1);
    }

    #[test]
    fn test_new_gesture_after_stop() {
        let mut joystick = make_joystick(AnchorPolicy::Live);

        joystick.handle(&touch(Phase::Start, 1, 130.0, 100.0));
        joystick.handle(&touch(Phase::End, 1, 130.0, 100.0));
        joystick.handle(&touch(Phase::Start, 2, 70.0, 100.0));

        assert_eq!(joystick.active_pointer(), Some(PointerId(2)));
        assert_vector(joystick.listener().moves[1], -0.4, 0.0, EPS);
        assert!((joystick.position().x + 30.0).abs() < EPS);
    }

    #[test]
    fn test_moves_before_start_are_ignored() {
        let mut joystick = make_joystick(AnchorPolicy::Live);

        joystick.handle(&touch(Phase::Move, 1, 130.0, 100.0));
        joystick.handle(&touch(Phase::End, 1, 130.0, 100.0));

        assert!(joystick.listener().moves.is_empty());
        assert_eq!(joystick.listener().stops, 0);
        assert_eq!(joystick.host().captures_ended, 0);
    }

    #[test]
    fn test_multi_touch_event_picks_tracked_point() {
        let mut joystick = make_joystick(AnchorPolicy::Live);

        // Gesture starts with the first changed touch
        joystick.handle(&InputEvent::new(
            Phase::Start,
            vec![TouchPoint::new(5, 100.0, 160.0), TouchPoint::new(6, 0.0, 0.0)],
        ));
        assert_eq!(joystick.active_pointer(), Some(PointerId(5)));

        // Move event carrying both points: only #5 counts
        joystick.handle(&InputEvent::new(
            Phase::Move,
            vec![TouchPoint::new(6, 400.0, 400.0), TouchPoint::new(5, 100.0, 40.0)],
        ));
        assert_vector(joystick.listener().moves[1], 0.0, -60.0 / 75.0, EPS);

        // Lifting the other finger does not end the gesture
        joystick.handle(&InputEvent::new(Phase::End, vec![TouchPoint::new(6, 0.0, 0.0)]));
        assert!(joystick.is_active());
    }

    #[test]
    fn test_empty_start_is_ignored() {
        let mut joystick = make_joystick(AnchorPolicy::Live);
        joystick.handle(&InputEvent::new(Phase::Start, vec![]));
        assert!(!joystick.is_active());
        assert_eq!(joystick.host().captures_begun, 0);
    }

    #[test]
    fn test_live_anchor_follows_layout_shift() {
        let mut joystick = make_joystick(AnchorPolicy::Live);

        joystick.handle(&touch(Phase::Start, 1, 100.0, 100.0));
        joystick.host_mut().rect = Rect::centered(Point::new(100.0, 50.0), 150.0);
        joystick.handle(&touch(Phase::Move, 1, 100.0, 100.0));

        assert_vector(joystick.listener().moves[1], 0.0, 50.0 / 75.0, EPS);
    }

    #[test]
    fn test_fixed_anchor_ignores_layout_shift() {
        let mut joystick = make_joystick(AnchorPolicy::Fixed);

        joystick.handle(&touch(Phase::Start, 1, 100.0, 100.0));
        joystick.host_mut().rect = Rect::centered(Point::new(100.0, 50.0), 150.0);
        joystick.handle(&touch(Phase::Move, 1, 100.0, 100.0));
        assert_vector(joystick.listener().moves[1], 0.0, 0.0, EPS);

        // The next gesture picks up the new layout
        joystick.handle(&touch(Phase::End, 1, 100.0, 100.0));
        joystick.handle(&touch(Phase::Start, 2, 100.0, 100.0));
        assert_vector(joystick.listener().moves[2], 0.0, 50.0 / 75.0, EPS);
    }

    #[test]
    fn test_teardown_mid_gesture() {
        let mut joystick = make_joystick(AnchorPolicy::Live);

        joystick.teardown();
        assert_eq!(joystick.listener().stops, 0);
        assert_eq!(joystick.host().captures_ended, 0);

        joystick.handle(&touch(Phase::Start, 1, 140.0, 100.0));
        joystick.teardown();
        assert_eq!(joystick.listener().stops, 1);
        assert_eq!(joystick.host().captures_ended, 1);
        assert!(!joystick.is_active());
    }

    #[test]
    fn test_sizes() {
        let joystick = make_joystick(AnchorPolicy::Live);
        assert_eq!(joystick.size(), 150.0);
        assert!((joystick.stick_size() - 60.0).abs() < EPS);
    }

    #[test]
    fn test_invalid_size_rejected() {
        let rect = Rect::new(0.0, 0.0, 10.0, 10.0);
        for size in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            let result = Joystick::new(&config(size, AnchorPolicy::Live), rect, Recorder::default());
            assert!(matches!(result, Err(JoystickError::InvalidSize(_))));
        }
    }

    fn arb_event() -> impl Strategy<Value = InputEvent> {
        let phase = prop_oneof![
            Just(Phase::Start),
            Just(Phase::Move),
            Just(Phase::End),
            Just(Phase::Cancel),
        ];
        (phase, 0i64..3, -500.0f64..500.0, -500.0f64..500.0)
            .prop_map(|(phase, id, x, y)| InputEvent::pointer(phase, id, x, y))
    }

    proptest! {
        #[test]
        fn prop_gesture_invariants_hold(events in proptest::collection::vec(arb_event(), 0..60)) {
            let mut joystick = make_joystick(AnchorPolicy::Live);
            let mut accepted_starts = 0usize;

            for event in &events {
                let was_active = joystick.is_active();
                joystick.handle(event);
                if event.phase == Phase::Start && !was_active {
                    accepted_starts += 1;
                }

                let listener = joystick.listener();
                prop_assert!(listener.moves.iter().all(|v| v.magnitude() <= 1.0 + 1e-9));
                if !joystick.is_active() {
                    prop_assert_eq!(joystick.position(), Point::default());
                }
            }

            let open = usize::from(joystick.is_active());
            prop_assert_eq!(joystick.listener().stops + open, accepted_starts);
            prop_assert_eq!(joystick.host().captures_begun, accepted_starts);
            prop_assert_eq!(joystick.host().captures_ended, joystick.listener().stops);
        }
    }
}
