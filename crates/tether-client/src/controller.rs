//! Input reports in the server's numbering.
//!
//! Keys use GLFW key codes; mouse buttons are 0 (left) and 1 (right).

use serde::Serialize;
use tether_engine::input::{InputSnapshot, Key, MouseButton};

/// Body of the reply to `get_controller`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControllerReport {
    pub keyboard: Vec<i32>,
    pub mouse: Vec<i32>,
    pub cursor_cur_pos: [f32; 2],
    pub cursor_last_pos: [f32; 2],
    pub cursor_scroll_pos: [f32; 2],
}

impl ControllerReport {
    /// Report with nothing held and the cursor at the origin.
    pub fn idle() -> Self {
        Self {
            keyboard: Vec::new(),
            mouse: Vec::new(),
            cursor_cur_pos: [0.0; 2],
            cursor_last_pos: [0.0; 2],
            cursor_scroll_pos: [0.0; 2],
        }
    }

    /// Converts an engine snapshot. Keys and buttons outside the tables are dropped.
    pub fn from_snapshot(snap: &InputSnapshot) -> Self {
        let mut keyboard: Vec<i32> = snap.keys_down.iter().filter_map(|k| key_code(*k)).collect();
        keyboard.sort_unstable();
        keyboard.dedup();

        let mut mouse: Vec<i32> = snap
            .buttons_down
            .iter()
            .filter_map(|b| button_code(*b))
            .collect();
        mouse.sort_unstable();
        mouse.dedup();

        Self {
            keyboard,
            mouse,
            cursor_cur_pos: [snap.pointer_pos.0, snap.pointer_pos.1],
            cursor_last_pos: [snap.last_pointer_pos.0, snap.last_pointer_pos.1],
            cursor_scroll_pos: [snap.scroll.0, snap.scroll.1],
        }
    }
}

/// GLFW key code for `key`.
pub fn key_code(key: Key) -> Option<i32> {
    let code = match key {
        Key::Space => 32,

        Key::Digit0 => 48,
        Key::Digit1 => 49,
        Key::Digit2 => 50,
        Key::Digit3 => 51,
        Key::Digit4 => 52,
        Key::Digit5 => 53,
        Key::Digit6 => 54,
        Key::Digit7 => 55,
        Key::Digit8 => 56,
        Key::Digit9 => 57,

        Key::A => 65,
        Key::B => 66,
        Key::C => 67,
        Key::D => 68,
        Key::E => 69,
        Key::F => 70,
        Key::G => 71,
        Key::H => 72,
        Key::I => 73,
        Key::J => 74,
        Key::K => 75,
        Key::L => 76,
        Key::M => 77,
        Key::N => 78,
        Key::O => 79,
        Key::P => 80,
        Key::Q => 81,
        Key::R => 82,
        Key::S => 83,
        Key::T => 84,
        Key::U => 85,
        Key::V => 86,
        Key::W => 87,
        Key::X => 88,
        Key::Y => 89,
        Key::Z => 90,

        Key::Escape => 256,
        Key::Enter => 257,
        Key::Tab => 258,
        Key::Backspace => 259,
        Key::Insert => 260,
        Key::Delete => 261,
        Key::ArrowRight => 262,
        Key::ArrowLeft => 263,
        Key::ArrowDown => 264,
        Key::ArrowUp => 265,
        Key::PageUp => 266,
        Key::PageDown => 267,
        Key::Home => 268,
        Key::End => 269,

        Key::F1 => 290,
        Key::F2 => 291,
        Key::F3 => 292,
        Key::F4 => 293,
        Key::F5 => 294,
        Key::F6 => 295,
        Key::F7 => 296,
        Key::F8 => 297,
        Key::F9 => 298,
        Key::F10 => 299,
        Key::F11 => 300,
        Key::F12 => 301,

        Key::ShiftLeft => 340,
        Key::ControlLeft => 341,
        Key::AltLeft => 342,
        Key::SuperLeft => 343,
        Key::ShiftRight => 344,
        Key::ControlRight => 345,
        Key::AltRight => 346,
        Key::SuperRight => 347,

        Key::Unknown(_) => return None,
    };
    Some(code)
}

/// Server button number for `button`.
pub fn button_code(button: MouseButton) -> Option<i32> {
    match button {
        MouseButton::Left => Some(0),
        MouseButton::Right => Some(1),
        _ => None,
    }
}
