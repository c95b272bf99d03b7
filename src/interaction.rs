use glam::Vec2;
use log::debug;

use crate::input::{KeyCode, Viewport};
use crate::scene::PartId;

/// Clip an input event asked to play.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Press,
    Release,
}

/// Turns keyboard and pointer events into press/release triggers.
///
/// Keyboard and pointer paths share one pressed flag without further
/// coordination: mixing them can fire a release while the press clip is
/// still running.
#[derive(Debug, Clone, PartialEq)]
pub struct InputHandler {
    target: Option<PartId>,
    pressed: bool,
    pointer: Vec2,
}

impl InputHandler {
    /// `target` is the interactive part; without one every event is ignored.
    pub fn new(target: Option<PartId>) -> Self {
        Self {
            target,
            pressed: false,
            pointer: Vec2::ZERO,
        }
    }

    pub fn target(&self) -> Option<PartId> {
        self.target
    }

    pub fn is_pressed(&self) -> bool {
        self.pressed
    }

    /// Last pointer position in normalized device coordinates.
    pub fn pointer(&self) -> Vec2 {
        self.pointer
    }

    pub fn on_key_down(&mut self, key: KeyCode) -> Option<Trigger> {
        debug!("key down: {key:?}");
        if key != KeyCode::ENTER || self.pressed {
            return None;
        }
        self.press()
    }

    pub fn on_key_up(&mut self, key: KeyCode) -> Option<Trigger> {
        debug!("key up: {key:?}");
        if key != KeyCode::ENTER {
            return None;
        }
        self.release()
    }

    pub fn on_pointer_move(&mut self, x: f32, y: f32, viewport: Viewport) {
        self.pointer = viewport.normalize(x, y);
    }

    /// `hit` is the nearest part under the pointer, if any.
    pub fn on_pointer_down(&mut self, hit: Option<PartId>) -> Option<Trigger> {
        if self.pressed || hit.is_none() || hit != self.target {
            return None;
        }
        self.press()
    }

    /// Releases wherever the pointer is.
    pub fn on_pointer_up(&mut self) -> Option<Trigger> {
        if !self.pressed {
            return None;
        }
        self.release()
    }

    fn press(&mut self) -> Option<Trigger> {
        self.target?;
        self.pressed = true;
        Some(Trigger::Press)
    }

    fn release(&mut self) -> Option<Trigger> {
        self.target?;
        self.pressed = false;
        Some(Trigger::Release)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::NamedKey;
    use crate::scene::{Model, Transform};

    fn parts() -> (PartId, PartId) {
        let mut model = Model::new();
        let keycap = model.add_part("sa_low", None, Transform::IDENTITY);
        let case = model.add_part("case", None, Transform::IDENTITY);
        (keycap, case)
    }

    #[test]
    fn enter_toggles_pressed_state() {
        let (keycap, _) = parts();
        let mut input = InputHandler::new(Some(keycap));
        assert_eq!(input.on_key_down(KeyCode::ENTER), Some(Trigger::Press));
        assert!(input.is_pressed());
        assert_eq!(input.on_key_down(KeyCode::ENTER), None);
        assert_eq!(input.on_key_up(KeyCode::ENTER), Some(Trigger::Release));
        assert!(!input.is_pressed());
    }

    #[test]
    fn pressed_state_tracks_down_up_parity() {
        let (keycap, _) = parts();
        for downs in 0..5 {
            let mut input = InputHandler::new(Some(keycap));
            let mut expected = false;
            for i in 0..downs {
                input.on_key_down(KeyCode::ENTER);
                expected = true;
                if i + 1 < downs {
                    input.on_key_up(KeyCode::ENTER);
                    expected = false;
                }
            }
            assert_eq!(input.is_pressed(), expected, "after {downs} presses");
        }
    }

    #[test]
    fn other_keys_are_ignored() {
        let (keycap, _) = parts();
        let mut input = InputHandler::new(Some(keycap));
        assert_eq!(input.on_key_down(KeyCode::Named(NamedKey::Space)), None);
        assert_eq!(input.on_key_up(KeyCode::Character('A')), None);
        assert!(!input.is_pressed());
    }

    #[test]
    fn pointer_down_requires_hit_on_target() {
        let (keycap, case) = parts();
        let mut input = InputHandler::new(Some(keycap));
        assert_eq!(input.on_pointer_down(None), None);
        assert_eq!(input.on_pointer_down(Some(case)), None);
        assert!(!input.is_pressed());

        assert_eq!(input.on_pointer_down(Some(keycap)), Some(Trigger::Press));
        assert!(input.is_pressed());
        assert_eq!(input.on_pointer_down(Some(keycap)), None);
    }

    #[test]
    fn pointer_up_releases_only_when_pressed() {
        let (keycap, _) = parts();
        let mut input = InputHandler::new(Some(keycap));
        assert_eq!(input.on_pointer_up(), None);
        input.on_pointer_down(Some(keycap));
        assert_eq!(input.on_pointer_up(), Some(Trigger::Release));
        assert!(!input.is_pressed());
    }

    #[test]
    fn keyboard_release_applies_to_pointer_press() {
        let (keycap, _) = parts();
        let mut input = InputHandler::new(Some(keycap));
        input.on_pointer_down(Some(keycap));
        assert_eq!(input.on_key_up(KeyCode::ENTER), Some(Trigger::Release));
        assert_eq!(input.on_pointer_up(), None);
    }

    #[test]
    fn missing_target_makes_everything_a_no_op() {
        let mut input = InputHandler::new(None);
        assert_eq!(input.on_key_down(KeyCode::ENTER), None);
        assert_eq!(input.on_pointer_down(None), None);
        assert!(!input.is_pressed());
    }

    #[test]
    fn pointer_move_normalizes() {
        let mut input = InputHandler::new(None);
        input.on_pointer_move(200.0, 0.0, Viewport::new(400, 300));
        assert_eq!(input.pointer(), Vec2::new(0.0, 1.0));
    }
}
