//! Key vocabulary and UI-to-key translations
//!
//! Every command a device receives is a [`RemoteKey`]. The touch client's
//! widgets (D-pad, media bar, navigation buttons, joystick) are translated
//! into keys here so the device layer never deals with UI concepts.

pub mod navigation;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub use navigation::{Direction, NavigationMapper};

/// Named key accepted by the device API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteKey {
    Home,
    Back,
    VolumeUp,
    VolumeDown,
    VolumeMute,
    Menu,
    RecentApps,
    DpadUp,
    DpadDown,
    DpadLeft,
    DpadRight,
    DpadCenter,
    #[serde(alias = "media_play_pause")]
    PlayPause,
    #[serde(alias = "media_stop")]
    Stop,
    #[serde(alias = "media_next")]
    Next,
    #[serde(alias = "media_previous")]
    Previous,
    Enter,
    Space,
    Backspace,
    Tab,
    Power,
    Sleep,
    WakeUp,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown key name '{0}'")]
pub struct KeyParseError(pub String);

impl RemoteKey {
    /// Every key, in API listing order
    pub const ALL: [RemoteKey; 23] = [
        RemoteKey::Home,
        RemoteKey::Back,
        RemoteKey::VolumeUp,
        RemoteKey::VolumeDown,
        RemoteKey::VolumeMute,
        RemoteKey::Menu,
        RemoteKey::RecentApps,
        RemoteKey::DpadUp,
        RemoteKey::DpadDown,
        RemoteKey::DpadLeft,
        RemoteKey::DpadRight,
        RemoteKey::DpadCenter,
        RemoteKey::PlayPause,
        RemoteKey::Stop,
        RemoteKey::Next,
        RemoteKey::Previous,
        RemoteKey::Enter,
        RemoteKey::Space,
        RemoteKey::Backspace,
        RemoteKey::Tab,
        RemoteKey::Power,
        RemoteKey::Sleep,
        RemoteKey::WakeUp,
    ];

    /// Canonical API name
    pub fn as_str(&self) -> &'static str {
        match self {
            RemoteKey::Home => "home",
            RemoteKey::Back => "back",
            RemoteKey::VolumeUp => "volume_up",
            RemoteKey::VolumeDown => "volume_down",
            RemoteKey::VolumeMute => "volume_mute",
            RemoteKey::Menu => "menu",
            RemoteKey::RecentApps => "recent_apps",
            RemoteKey::DpadUp => "dpad_up",
            RemoteKey::DpadDown => "dpad_down",
            RemoteKey::DpadLeft => "dpad_left",
            RemoteKey::DpadRight => "dpad_right",
            RemoteKey::DpadCenter => "dpad_center",
            RemoteKey::PlayPause => "play_pause",
            RemoteKey::Stop => "stop",
            RemoteKey::Next => "next",
            RemoteKey::Previous => "previous",
            RemoteKey::Enter => "enter",
            RemoteKey::Space => "space",
            RemoteKey::Backspace => "backspace",
            RemoteKey::Tab => "tab",
            RemoteKey::Power => "power",
            RemoteKey::Sleep => "sleep",
            RemoteKey::WakeUp => "wake_up",
        }
    }

    /// Whether this is one of the directional pad keys
    pub fn is_directional(&self) -> bool {
        matches!(
            self,
            RemoteKey::DpadUp | RemoteKey::DpadDown | RemoteKey::DpadLeft | RemoteKey::DpadRight
        )
    }
}

impl fmt::Display for RemoteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RemoteKey {
    type Err = KeyParseError;

    /// Parse a key name, case-insensitive. The web client's `media_*` names
    /// are accepted for the transport keys.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        let canonical = match name.as_str() {
            "media_play_pause" => "play_pause",
            "media_stop" => "stop",
            "media_next" => "next",
            "media_previous" => "previous",
            other => other,
        };

        RemoteKey::ALL
            .iter()
            .copied()
            .find(|key| key.as_str() == canonical)
            .ok_or_else(|| KeyParseError(s.to_string()))
    }
}

/// D-pad widget buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DPadDirection {
    Up,
    Down,
    Left,
    Right,
    Center,
}

impl From<DPadDirection> for RemoteKey {
    fn from(direction: DPadDirection) -> Self {
        match direction {
            DPadDirection::Up => RemoteKey::DpadUp,
            DPadDirection::Down => RemoteKey::DpadDown,
            DPadDirection::Left => RemoteKey::DpadLeft,
            DPadDirection::Right => RemoteKey::DpadRight,
            DPadDirection::Center => RemoteKey::DpadCenter,
        }
    }
}

/// Media bar buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaAction {
    PlayPause,
    Stop,
    Next,
    Previous,
    VolumeUp,
    VolumeDown,
}

impl From<MediaAction> for RemoteKey {
    fn from(action: MediaAction) -> Self {
        match action {
            MediaAction::PlayPause => RemoteKey::PlayPause,
            MediaAction::Stop => RemoteKey::Stop,
            MediaAction::Next => RemoteKey::Next,
            MediaAction::Previous => RemoteKey::Previous,
            MediaAction::VolumeUp => RemoteKey::VolumeUp,
            MediaAction::VolumeDown => RemoteKey::VolumeDown,
        }
    }
}

/// Navigation row buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavButton {
    Back,
    Home,
    Menu,
}

impl From<NavButton> for RemoteKey {
    fn from(button: NavButton) -> Self {
        match button {
            NavButton::Back => RemoteKey::Back,
            NavButton::Home => RemoteKey::Home,
            NavButton::Menu => RemoteKey::Menu,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_every_canonical_name() {
        for key in RemoteKey::ALL {
            assert_eq!(key.as_str().parse::<RemoteKey>(), Ok(key));
        }
    }

    #[test]
    fn test_parse_media_aliases() {
        assert_eq!("media_play_pause".parse(), Ok(RemoteKey::PlayPause));
        assert_eq!("media_stop".parse(), Ok(RemoteKey::Stop));
        assert_eq!("media_next".parse(), Ok(RemoteKey::Next));
        assert_eq!("media_previous".parse(), Ok(RemoteKey::Previous));
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("DPAD_UP".parse(), Ok(RemoteKey::DpadUp));
        assert_eq!(" Home ".parse(), Ok(RemoteKey::Home));
    }

    #[test]
    fn test_parse_unknown() {
        let err = "self_destruct".parse::<RemoteKey>().unwrap_err();
        assert_eq!(err, KeyParseError("self_destruct".to_string()));
        assert_eq!(err.to_string(), "unknown key name 'self_destruct'");
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(serde_json::to_string(&RemoteKey::WakeUp).unwrap(), "\"wake_up\"");
        let key: RemoteKey = serde_json::from_str("\"media_next\"").unwrap();
        assert_eq!(key, RemoteKey::Next);
    }

    #[test]
    fn test_widget_translations() {
        assert_eq!(RemoteKey::from(DPadDirection::Center), RemoteKey::DpadCenter);
        assert_eq!(RemoteKey::from(MediaAction::VolumeDown), RemoteKey::VolumeDown);
        assert_eq!(RemoteKey::from(NavButton::Menu), RemoteKey::Menu);
        assert!(RemoteKey::from(DPadDirection::Left).is_directional());
        assert!(!RemoteKey::DpadCenter.is_directional());
    }
}
