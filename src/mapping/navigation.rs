//! Joystick to D-pad translation
//!
//! Quantizes joystick vectors into one of four directions and turns a held
//! direction into a key press followed by auto-repeat, like holding a D-pad
//! button on a physical remote.

use std::time::{Duration, Instant};
use tracing::debug;

use super::RemoteKey;
use crate::config::NavigationConfig;
use crate::joystick::{JoystickListener, StickVector};

/// Quantized joystick direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Quantize a joystick vector
    ///
    /// # Arguments
    /// * `vector` - Normalized joystick vector (screen axes, +y is down)
    /// * `deadzone` - Magnitude below which the stick counts as neutral
    ///
    /// # Returns
    /// The dominant direction, or None inside the deadzone. Ties go to the
    /// horizontal axis.
    pub fn from_vector(vector: StickVector, deadzone: f64) -> Option<Self> {
        let magnitude = vector.magnitude();
        if magnitude.is_nan() || magnitude <= 0.0 || magnitude < deadzone {
            return None;
        }

        let direction = if vector.x.abs() >= vector.y.abs() {
            if vector.x > 0.0 {
                Direction::Right
            } else {
                Direction::Left
            }
        } else if vector.y > 0.0 {
            Direction::Down
        } else {
            Direction::Up
        };

        Some(direction)
    }

    pub fn key(self) -> RemoteKey {
        match self {
            Direction::Up => RemoteKey::DpadUp,
            Direction::Down => RemoteKey::DpadDown,
            Direction::Left => RemoteKey::DpadLeft,
            Direction::Right => RemoteKey::DpadRight,
        }
    }
}

/// Joystick listener producing repeated D-pad keys.
///
/// The listener callbacks only record the held direction; keys are pulled
/// with [`NavigationMapper::poll`], which the session calls on every event
/// and on a periodic tick so that holding still keeps repeating.
#[derive(Debug, Clone)]
pub struct NavigationMapper {
    deadzone: f64,
    repeat_delay: Duration,
    repeat_interval: Duration,
    held: Option<Direction>,
    /// Direction entered but its first press not yet pulled
    press_pending: bool,
    next_repeat: Option<Instant>,
}

impl NavigationMapper {
    pub fn new(config: &NavigationConfig) -> Self {
        Self {
            deadzone: config.deadzone,
            repeat_delay: Duration::from_millis(config.repeat_delay_ms),
            repeat_interval: Duration::from_millis(config.repeat_interval_ms),
            held: None,
            press_pending: false,
            next_repeat: None,
        }
    }

    /// Direction currently held, if any
    pub fn held(&self) -> Option<Direction> {
        self.held
    }

    /// Key due at `now`, if any.
    ///
    /// Entering a direction yields its key on the next poll. Holding it yields
    /// the key again once `repeat_delay` has passed, then every
    /// `repeat_interval`.
    pub fn poll(&mut self, now: Instant) -> Option<RemoteKey> {
        let direction = self.held?;

        if self.press_pending {
            self.press_pending = false;
            self.next_repeat = Some(now + self.repeat_delay);
            return Some(direction.key());
        }

        match self.next_repeat {
            Some(due) if now >= due => {
                self.next_repeat = Some(now + self.repeat_interval);
                Some(direction.key())
            }
            _ => None,
        }
    }
}

impl JoystickListener for NavigationMapper {
    fn on_move(&mut self, vector: StickVector) {
        let direction = Direction::from_vector(vector, self.deadzone);
        if direction == self.held {
            return;
        }

        debug!("Navigation direction {:?} -> {:?}", self.held, direction);
        self.held = direction;
        self.press_pending = direction.is_some();
        self.next_repeat = None;
    }

    fn on_stop(&mut self) {
        self.held = None;
        self.press_pending = false;
        self.next_repeat = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapper() -> NavigationMapper {
        NavigationMapper::new(&NavigationConfig {
            deadzone: 0.35,
            repeat_delay_ms: 400,
            repeat_interval_ms: 150,
        })
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_quantize_directions() {
        let dz = 0.35;
        assert_eq!(Direction::from_vector(StickVector::new(0.0, -0.9), dz), Some(Direction::Up));
        assert_eq!(Direction::from_vector(StickVector::new(0.0, 0.9), dz), Some(Direction::Down));
        assert_eq!(Direction::from_vector(StickVector::new(-0.9, 0.2), dz), Some(Direction::Left));
        assert_eq!(Direction::from_vector(StickVector::new(0.93, 0.37), dz), Some(Direction::Right));
    }

    #[test]
    fn test_quantize_deadzone_and_ties() {
        assert_eq!(Direction::from_vector(StickVector::new(0.0, 0.3), 0.35), None);
        assert_eq!(Direction::from_vector(StickVector::ZERO, 0.0), None);
        assert_eq!(Direction::from_vector(StickVector::new(0.5, 0.5), 0.35), Some(Direction::Right));
        assert_eq!(Direction::from_vector(StickVector::new(-0.5, -0.5), 0.35), Some(Direction::Left));
    }

    #[test]
    fn test_direction_keys() {
        assert_eq!(Direction::Up.key(), RemoteKey::DpadUp);
        assert_eq!(Direction::Right.key(), RemoteKey::DpadRight);
    }

    #[test]
    fn test_press_then_repeat() {
        let mut mapper = mapper();
        let t0 = Instant::now();

        assert_eq!(mapper.poll(t0), None);

        mapper.on_move(StickVector::new(0.0, -0.8));
        assert_eq!(mapper.poll(t0), Some(RemoteKey::DpadUp));
        assert_eq!(mapper.poll(t0 + ms(100)), None);

        // Further moves in the same direction do not re-press
        mapper.on_move(StickVector::new(0.1, -1.0));
        assert_eq!(mapper.poll(t0 + ms(399)), None);

        assert_eq!(mapper.poll(t0 + ms(400)), Some(RemoteKey::DpadUp));
        assert_eq!(mapper.poll(t0 + ms(500)), None);
        assert_eq!(mapper.poll(t0 + ms(550)), Some(RemoteKey::DpadUp));
        assert_eq!(mapper.poll(t0 + ms(700)), Some(RemoteKey::DpadUp));
    }

    #[test]
    fn test_direction_change_presses_immediately() {
        let mut mapper = mapper();
        let t0 = Instant::now();

        mapper.on_move(StickVector::new(0.9, 0.0));
        assert_eq!(mapper.poll(t0), Some(RemoteKey::DpadRight));

        mapper.on_move(StickVector::new(0.0, 0.9));
        assert_eq!(mapper.held(), Some(Direction::Down));
        assert_eq!(mapper.poll(t0 + ms(10)), Some(RemoteKey::DpadDown));
        assert_eq!(mapper.poll(t0 + ms(400)), None);
        assert_eq!(mapper.poll(t0 + ms(410)), Some(RemoteKey::DpadDown));
    }

    #[test]
    fn test_back_to_deadzone_stops_repeat() {
        let mut mapper = mapper();
        let t0 = Instant::now();

        mapper.on_move(StickVector::new(-0.9, 0.0));
        assert_eq!(mapper.poll(t0), Some(RemoteKey::DpadLeft));

        mapper.on_move(StickVector::new(-0.1, 0.0));
        assert_eq!(mapper.held(), None);
        assert_eq!(mapper.poll(t0 + ms(1000)), None);
    }

    #[test]
    fn test_stop_sends_nothing() {
        let mut mapper = mapper();
        let t0 = Instant::now();

        mapper.on_move(StickVector::new(0.0, 0.9));
        mapper.on_stop();

        assert_eq!(mapper.held(), None);
        assert_eq!(mapper.poll(t0), None);
        assert_eq!(mapper.poll(t0 + ms(1000)), None);
    }
}
