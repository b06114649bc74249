//! Keyboard and mouse input state.
//!
//! The [`Input`] resource tracks which keys/buttons are currently pressed,
//! just pressed this frame, or just released this frame. [`Mouse`] holds the
//! cursor position in window pixels plus the motion and scroll accumulated
//! since the last frame.
//!
//! Updated by the window event handler; the per-frame parts are cleared at
//! the end of every engine tick.

use std::collections::HashSet;
use std::hash::Hash;

use glam::Vec2;

pub use winit::event::MouseButton;
pub use winit::keyboard::KeyCode;

/// Tracks the state of a set of inputs (keys or mouse buttons).
///
/// - `pressed`: currently held down
/// - `just_pressed`: pressed this frame (not held last frame)
/// - `just_released`: released this frame
pub struct Input<T: Eq + Hash + Copy> {
    pressed: HashSet<T>,
    just_pressed: HashSet<T>,
    just_released: HashSet<T>,
}

impl<T: Eq + Hash + Copy> Input<T> {
    pub fn new() -> Self {
        Self {
            pressed: HashSet::new(),
            just_pressed: HashSet::new(),
            just_released: HashSet::new(),
        }
    }

    /// Returns `true` if the input is currently held down.
    pub fn pressed(&self, input: T) -> bool {
        self.pressed.contains(&input)
    }

    pub fn any_pressed(&self, inputs: &[T]) -> bool {
        inputs.iter().any(|i| self.pressed.contains(i))
    }

    /// Returns `true` if the input was pressed this frame.
    pub fn just_pressed(&self, input: T) -> bool {
        self.just_pressed.contains(&input)
    }

    /// Returns `true` if the input was released this frame.
    pub fn just_released(&self, input: T) -> bool {
        self.just_released.contains(&input)
    }

    /// Records a press. Repeated presses of a held input are ignored.
    pub fn press(&mut self, input: T) {
        if self.pressed.insert(input) {
            self.just_pressed.insert(input);
        }
    }

    pub fn release(&mut self, input: T) {
        if self.pressed.remove(&input) {
            self.just_released.insert(input);
        }
    }

    /// Clear per-frame state.
    pub(crate) fn clear_just(&mut self) {
        self.just_pressed.clear();
        self.just_released.clear();
    }
}

impl<T: Eq + Hash + Copy> Default for Input<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Cursor state in window coordinates (origin top-left, y down).
#[derive(Debug, Clone, Copy, Default)]
pub struct Mouse {
    pub position: Vec2,
    /// Cursor motion since the previous frame.
    pub delta: Vec2,
    /// Scroll lines since the previous frame, positive away from the user.
    pub scroll: f32,
}

impl Mouse {
    pub fn move_to(&mut self, position: Vec2) {
        self.delta += position - self.position;
        self.position = position;
    }

    pub fn scroll_by(&mut self, lines: f32) {
        self.scroll += lines;
    }

    pub(crate) fn clear_frame(&mut self) {
        self.delta = Vec2::ZERO;
        self.scroll = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_and_release_track_edges() {
        let mut keys = Input::<KeyCode>::new();
        keys.press(KeyCode::KeyW);
        assert!(keys.pressed(KeyCode::KeyW));
        assert!(keys.just_pressed(KeyCode::KeyW));

        keys.clear_just();
        keys.press(KeyCode::KeyW);
        assert!(!keys.just_pressed(KeyCode::KeyW));

        keys.release(KeyCode::KeyW);
        assert!(keys.just_released(KeyCode::KeyW));
        assert!(!keys.pressed(KeyCode::KeyW));
    }

    #[test]
    fn any_pressed_checks_all() {
        let mut keys = Input::<KeyCode>::new();
        keys.press(KeyCode::KeyQ);
        assert!(keys.any_pressed(&[KeyCode::KeyE, KeyCode::KeyQ]));
        assert!(!keys.any_pressed(&[KeyCode::KeyE]));
    }

    #[test]
    fn mouse_accumulates_motion_until_cleared() {
        let mut mouse = Mouse::default();
        mouse.move_to(Vec2::new(10.0, 5.0));
        mouse.move_to(Vec2::new(12.0, 4.0));
        mouse.scroll_by(1.0);
        assert_eq!(mouse.delta, Vec2::new(12.0, 4.0));
        assert_eq!(mouse.scroll, 1.0);

        mouse.clear_frame();
        assert_eq!(mouse.delta, Vec2::ZERO);
        assert_eq!(mouse.position, Vec2::new(12.0, 4.0));
    }
}
