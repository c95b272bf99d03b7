use glam::Vec2;
use serde::{Deserialize, Serialize};
use winit::keyboard::{Key, NamedKey as WinitNamedKey};

/// Identifier for a keyboard key, named after DOM `KeyboardEvent.key` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyCode {
    Named(NamedKey),
    Character(char),
    Digit(u8),
    Function(u8),
}

impl KeyCode {
    pub const ENTER: Self = Self::Named(NamedKey::Enter);

    /// Parses a DOM key name such as `"Enter"`, `"ArrowLeft"`, `"a"` or `"F5"`.
    pub fn from_name(name: &str) -> Option<Self> {
        if let Some(key) = parse_named_key(name) {
            return Some(key);
        }
        let mut chars = name.chars();
        if let (Some(ch), None) = (chars.next(), chars.next()) {
            if ch.is_ascii_alphabetic() {
                return Some(Self::Character(ch.to_ascii_uppercase()));
            }
            if let Some(digit) = ch.to_digit(10) {
                return Some(Self::Digit(digit as u8));
            }
            if ch == ' ' {
                return Some(Self::Named(NamedKey::Space));
            }
        }
        if let Some(function) = name.strip_prefix('F') {
            if let Ok(index) = function.parse::<u8>() {
                if (1..=24).contains(&index) {
                    return Some(Self::Function(index));
                }
            }
        }
        None
    }

    /// Maps winit's logical key, which carries the same meaning as the DOM `key`.
    pub fn from_winit(key: &Key) -> Option<Self> {
        match key {
            Key::Named(named) => {
                let named = match named {
                    WinitNamedKey::Enter => NamedKey::Enter,
                    WinitNamedKey::Space => NamedKey::Space,
                    WinitNamedKey::Tab => NamedKey::Tab,
                    WinitNamedKey::Escape => NamedKey::Escape,
                    WinitNamedKey::Backspace => NamedKey::Backspace,
                    WinitNamedKey::ArrowLeft => NamedKey::Left,
                    WinitNamedKey::ArrowRight => NamedKey::Right,
                    WinitNamedKey::ArrowUp => NamedKey::Up,
                    WinitNamedKey::ArrowDown => NamedKey::Down,
                    WinitNamedKey::Home => NamedKey::Home,
                    WinitNamedKey::End => NamedKey::End,
                    WinitNamedKey::PageUp => NamedKey::PageUp,
                    WinitNamedKey::PageDown => NamedKey::PageDown,
                    WinitNamedKey::Shift => NamedKey::Shift,
                    WinitNamedKey::Control => NamedKey::Control,
                    WinitNamedKey::Alt => NamedKey::Alt,
                    _ => return None,
                };
                Some(Self::Named(named))
            }
            Key::Character(text) => Self::from_name(text.as_str()),
            _ => None,
        }
    }
}

fn parse_named_key(name: &str) -> Option<KeyCode> {
    use NamedKey::*;
    let key = match name {
        "Enter" => Enter,
        "Space" | "Spacebar" => Space,
        "Tab" => Tab,
        "ArrowLeft" | "Left" => Left,
        "ArrowRight" | "Right" => Right,
        "ArrowUp" | "Up" => Up,
        "ArrowDown" | "Down" => Down,
        "Escape" | "Esc" => Escape,
        "Backspace" => Backspace,
        "Home" => Home,
        "End" => End,
        "PageUp" => PageUp,
        "PageDown" => PageDown,
        "Shift" => Shift,
        "Control" => Control,
        "Alt" => Alt,
        _ => return None,
    };
    Some(KeyCode::Named(key))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NamedKey {
    Enter,
    Space,
    Tab,
    Left,
    Right,
    Up,
    Down,
    Escape,
    Backspace,
    Home,
    End,
    PageUp,
    PageDown,
    Shift,
    Control,
    Alt,
}

/// Identifier for a mouse button, numbered like DOM `MouseEvent.button`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MouseButton(u8);

impl MouseButton {
    pub const LEFT: Self = Self(0);
    pub const MIDDLE: Self = Self(1);
    pub const RIGHT: Self = Self(2);

    pub fn new(index: u8) -> Self {
        Self(index)
    }

    pub fn index(self) -> u8 {
        self.0
    }

    pub fn from_winit(button: winit::event::MouseButton) -> Self {
        use winit::event::MouseButton as Winit;
        match button {
            Winit::Left => Self::LEFT,
            Winit::Middle => Self::MIDDLE,
            Winit::Right => Self::RIGHT,
            Winit::Back => Self(3),
            Winit::Forward => Self(4),
            Winit::Other(value) => Self(value.min(u8::MAX as u16) as u8),
        }
    }
}

/// Drawable area in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    /// Maps a pixel position to normalized device coordinates: x grows to
    /// the right, y grows upwards, both within [-1, 1].
    pub fn normalize(&self, x: f32, y: f32) -> Vec2 {
        let nx = (x / self.width as f32) * 2.0 - 1.0;
        let ny = -(y / self.height as f32) * 2.0 + 1.0;
        Vec2::new(nx, ny).clamp(Vec2::splat(-1.0), Vec2::splat(1.0))
    }
}
