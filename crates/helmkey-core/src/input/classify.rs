// ── Key classifier ──
//
// Table-driven mapping from raw (type, code, value) triples to symbolic
// keys and press/release/repeat actions.

use serde::{Serialize, Serializer};

use super::decoder::RawEvent;

/// `EV_KEY` from `linux/input-event-codes.h`.
pub const EV_KEY: u16 = 1;

/// Press state carried in a key event's `value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum KeyAction {
    Up,
    Down,
    Repeat,
}

impl KeyAction {
    pub fn from_value(value: i32) -> Option<Self> {
        match value {
            0 => Some(Self::Up),
            1 => Some(Self::Down),
            2 => Some(Self::Repeat),
            _ => None,
        }
    }
}

/// Key codes the remote (or a keyboard standing in for it) can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString, strum::IntoStaticStr)]
pub enum KeyName {
    #[strum(serialize = "KEY_ESC")]
    Esc,
    #[strum(serialize = "KEY_ENTER")]
    Enter,
    #[strum(serialize = "KEY_UP")]
    Up,
    #[strum(serialize = "KEY_LEFT")]
    Left,
    #[strum(serialize = "KEY_RIGHT")]
    Right,
    #[strum(serialize = "KEY_DOWN")]
    Down,
    #[strum(serialize = "KEY_MUTE")]
    Mute,
    #[strum(serialize = "KEY_VOLUMEDOWN")]
    VolumeDown,
    #[strum(serialize = "KEY_VOLUMEUP")]
    VolumeUp,
    #[strum(serialize = "KEY_NEXTSONG")]
    NextSong,
    #[strum(serialize = "KEY_PLAYPAUSE")]
    PlayPause,
    #[strum(serialize = "KEY_PREVIOUSSONG")]
    PreviousSong,
    #[strum(serialize = "KEY_STOPCD")]
    StopCd,
    #[strum(serialize = "KEY_PLAYCD")]
    PlayCd,
    #[strum(serialize = "KEY_PAUSECD")]
    PauseCd,
    #[strum(serialize = "KEY_PLAY")]
    Play,
    #[strum(serialize = "KEY_NEXT")]
    Next,
    #[strum(serialize = "KEY_PREVIOUS")]
    Previous,
}

impl KeyName {
    pub fn from_code(code: u16) -> Option<Self> {
        let name = match code {
            1 => Self::Esc,
            28 => Self::Enter,
            103 => Self::Up,
            105 => Self::Left,
            106 => Self::Right,
            108 => Self::Down,
            113 => Self::Mute,
            114 => Self::VolumeDown,
            115 => Self::VolumeUp,
            163 => Self::NextSong,
            164 => Self::PlayPause,
            165 => Self::PreviousSong,
            166 => Self::StopCd,
            200 => Self::PlayCd,
            201 => Self::PauseCd,
            207 => Self::Play,
            407 => Self::Next,
            412 => Self::Previous,
            _ => return None,
        };
        Some(name)
    }

    pub fn code(self) -> u16 {
        match self {
            Self::Esc => 1,
            Self::Enter => 28,
            Self::Up => 103,
            Self::Left => 105,
            Self::Right => 106,
            Self::Down => 108,
            Self::Mute => 113,
            Self::VolumeDown => 114,
            Self::VolumeUp => 115,
            Self::NextSong => 163,
            Self::PlayPause => 164,
            Self::PreviousSong => 165,
            Self::StopCd => 166,
            Self::PlayCd => 200,
            Self::PauseCd => 201,
            Self::Play => 207,
            Self::Next => 407,
            Self::Previous => 412,
        }
    }

    /// The navigation key this code drives, if any.
    pub fn remote_key(self) -> Option<RemoteKey> {
        match self {
            Self::VolumeUp => Some(RemoteKey::VolumeUp),
            Self::VolumeDown => Some(RemoteKey::VolumeDown),
            Self::NextSong | Self::Next => Some(RemoteKey::Next),
            Self::PreviousSong | Self::Previous => Some(RemoteKey::Prev),
            Self::PlayPause | Self::PlayCd | Self::Play => Some(RemoteKey::Play),
            _ => None,
        }
    }
}

impl Serialize for KeyName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let name: &'static str = (*self).into();
        serializer.serialize_str(name)
    }
}

/// The input alphabet of the remote-control state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display, strum::EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum RemoteKey {
    VolumeUp,
    VolumeDown,
    Next,
    Prev,
    Play,
}

impl RemoteKey {
    /// Canonical key code used when a host injects a press.
    pub fn key_name(self) -> KeyName {
        match self {
            Self::VolumeUp => KeyName::VolumeUp,
            Self::VolumeDown => KeyName::VolumeDown,
            Self::Next => KeyName::NextSong,
            Self::Prev => KeyName::PreviousSong,
            Self::Play => KeyName::PlayPause,
        }
    }
}

/// A key event translated into the symbolic vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedEvent {
    pub type_name: &'static str,
    /// `None` for key codes outside the table; such events are never acted on.
    pub code_name: Option<KeyName>,
    pub code: u16,
    pub action: KeyAction,
}

impl ClassifiedEvent {
    /// A synthetic press of `key`.
    pub fn press(key: RemoteKey) -> Self {
        let name = key.key_name();
        Self {
            type_name: "KEY",
            code_name: Some(name),
            code: name.code(),
            action: KeyAction::Down,
        }
    }

    pub fn remote_key(&self) -> Option<RemoteKey> {
        self.code_name.and_then(KeyName::remote_key)
    }
}

/// Classify one raw record. Non-key records and values outside
/// {0, 1, 2} yield `None`.
pub fn classify(event: &RawEvent) -> Option<ClassifiedEvent> {
    if event.type_code != EV_KEY {
        return None;
    }
    let action = KeyAction::from_value(event.value)?;
    Some(ClassifiedEvent {
        type_name: "KEY",
        code_name: KeyName::from_code(event.code),
        code: event.code,
        action,
    })
}
