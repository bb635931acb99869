use std::collections::HashSet;

use super::types::{InputEvent, Key, KeyState, MouseButton, MouseButtonState, PointerMoveEvent};

/// Current input state for the window.
///
/// Holds "is down" sets, the pointer position and the scroll offset
/// accumulated since the last report. Readers take an [`InputSnapshot`];
/// [`InputState::commit_snapshot`] marks that snapshot as delivered.
#[derive(Debug, Default)]
pub struct InputState {
    /// Whether the window is focused.
    pub focused: bool,

    /// Last known pointer position in logical pixels. Kept after the pointer leaves.
    pub pointer_pos: (f32, f32),

    /// Set of currently held keys.
    pub keys_down: HashSet<Key>,

    /// Set of currently held mouse buttons.
    pub buttons_down: HashSet<MouseButton>,

    scroll: (f32, f32),
    reported_pointer_pos: (f32, f32),
}

/// Immutable copy of the input state at one instant.
///
/// Key and button lists are sorted so reports are deterministic.
#[derive(Debug, Clone, PartialEq)]
pub struct InputSnapshot {
    pub keys_down: Vec<Key>,
    pub buttons_down: Vec<MouseButton>,
    pub pointer_pos: (f32, f32),
    /// Pointer position at the previous committed snapshot.
    pub last_pointer_pos: (f32, f32),
    /// Scroll offset accumulated since the previous committed snapshot.
    pub scroll: (f32, f32),
}

impl InputState {
    /// Applies a platform-agnostic input event to the current state.
    pub fn apply_event(&mut self, ev: InputEvent) {
        match ev {
            InputEvent::Focused(f) => {
                self.focused = f;
                if !f {
                    // Releases are not delivered while unfocused; drop everything held.
                    self.keys_down.clear();
                    self.buttons_down.clear();
                }
            }

            InputEvent::PointerMoved(PointerMoveEvent { x, y }) => {
                self.pointer_pos = (x, y);
            }

            InputEvent::PointerLeft => {
                self.buttons_down.clear();
            }

            InputEvent::Key { key, state, .. } => match state {
                KeyState::Pressed => {
                    self.keys_down.insert(key);
                }
                KeyState::Released => {
                    self.keys_down.remove(&key);
                }
            },

            InputEvent::PointerButton { button, state } => match state {
                MouseButtonState::Pressed => {
                    self.buttons_down.insert(button);
                }
                MouseButtonState::Released => {
                    self.buttons_down.remove(&button);
                }
            },

            InputEvent::MouseWheel(delta) => {
                let (x, y) = delta.offsets();
                self.scroll.0 += x;
                self.scroll.1 += y;
            }
        }
    }

    pub fn key_down(&self, key: Key) -> bool {
        self.keys_down.contains(&key)
    }

    /// Scroll offset accumulated since the last commit.
    pub fn pending_scroll(&self) -> (f32, f32) {
        self.scroll
    }

    /// Captures the current state without modifying it.
    pub fn snapshot(&self) -> InputSnapshot {
        let mut keys_down: Vec<Key> = self.keys_down.iter().copied().collect();
        keys_down.sort_unstable();

        let mut buttons_down: Vec<MouseButton> = self.buttons_down.iter().copied().collect();
        buttons_down.sort_unstable();

        InputSnapshot {
            keys_down,
            buttons_down,
            pointer_pos: self.pointer_pos,
            last_pointer_pos: self.reported_pointer_pos,
            scroll: self.scroll,
        }
    }

    /// Marks the current pointer position as reported and resets the scroll accumulator.
    pub fn commit_snapshot(&mut self) {
        self.reported_pointer_pos = self.pointer_pos;
        self.scroll = (0.0, 0.0);
    }

    /// Takes a snapshot and commits it in one step.
    pub fn take_snapshot(&mut self) -> InputSnapshot {
        let snap = self.snapshot();
        self.commit_snapshot();
        snap
    }
}
