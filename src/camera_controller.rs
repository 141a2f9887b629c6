//! Maps mouse and keyboard state onto the orbit camera.
//!
//! Middle-drag rotates, Shift + middle-drag pans and Ctrl + middle-drag zooms.
//! The wheel zooms through [`CameraController::on_scroll`] and is only forwarded
//! while the viewport is hovered.

use glam::Vec2;
use winit::event::MouseButton;
use winit::keyboard::KeyCode;

use crate::camera::Camera;
use crate::input::{Edge, Input, KeyEdge};

/// Scroll lines are scaled by this before being fed to [`Camera::zoom`].
pub const SCROLL_ZOOM_FACTOR: f32 = 5.0;

/// Which camera motion the held buttons select this frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CameraGesture {
    /// Shift + middle mouse.
    Pan,
    /// Ctrl + middle mouse.
    Zoom,
    /// Middle mouse alone.
    Rotate,
}

impl CameraGesture {
    /// Pan beats zoom beats rotate when several modifiers are held.
    pub fn from_input(input: &Input) -> Option<Self> {
        if !input.mouse_down(MouseButton::Middle) {
            return None;
        }
        if input.key_down(KeyCode::ShiftLeft) {
            Some(CameraGesture::Pan)
        } else if input.key_down(KeyCode::ControlLeft) {
            Some(CameraGesture::Zoom)
        } else {
            Some(CameraGesture::Rotate)
        }
    }
}

/// Drives the editor [`Camera`] from polled mouse and keyboard state.
///
/// Owns the camera; the editor borrows it through [`CameraController::camera`].
///
/// # Example
/// ```ignore
/// let mut controller = CameraController::new(Camera::new());
///
/// // Once per frame, before any panel reads the camera:
/// controller.on_update(&input, viewport_hovered);
/// let view = controller.camera().view_matrix();
/// ```
#[derive(Debug)]
pub struct CameraController {
    camera: Camera,
    last_pointer: Vec2,
    middle: KeyEdge,
    dragging: bool,
}

impl CameraController {
    pub fn new(camera: Camera) -> Self {
        Self {
            camera,
            last_pointer: Vec2::ZERO,
            middle: KeyEdge::new(),
            dragging: false,
        }
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    /// Whether a camera drag that started over the viewport is still running.
    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Sample the pointer once and apply at most one of pan, zoom or rotate.
    ///
    /// A drag only starts when the middle button goes down over the viewport, and
    /// keeps going until it is released even if the pointer leaves. Returns whether
    /// the camera moved.
    pub fn on_update(&mut self, input: &Input, viewport_hovered: bool) -> bool {
        let pointer = input.mouse_position();
        let delta = pointer - self.last_pointer;
        self.last_pointer = pointer;

        match self.middle.sample(input.mouse_down(MouseButton::Middle)) {
            Edge::Pressed => self.dragging = viewport_hovered,
            Edge::Released | Edge::Idle => self.dragging = false,
            Edge::Held => {}
        }

        if !self.dragging || delta == Vec2::ZERO {
            return false;
        }

        match CameraGesture::from_input(input) {
            Some(CameraGesture::Pan) => self.camera.pan(delta),
            Some(CameraGesture::Zoom) => self.camera.zoom(delta.y),
            Some(CameraGesture::Rotate) => self.camera.rotate(delta),
            None => return false,
        }
        self.camera.update_vectors();
        true
    }

    /// Apply a scroll step, in lines.
    pub fn on_scroll(&mut self, lines: f32) {
        self.camera.zoom(lines * SCROLL_ZOOM_FACTOR);
        self.camera.update_vectors();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start_drag(controller: &mut CameraController, input: &mut Input) {
        input.move_cursor(Vec2::new(100.0, 100.0));
        input.press_mouse(MouseButton::Middle);
        controller.on_update(input, true);
    }

    #[test]
    fn precedence_is_pan_then_zoom_then_rotate() {
        let mut input = Input::new();
        input.press_mouse(MouseButton::Middle);
        assert_eq!(CameraGesture::from_input(&input), Some(CameraGesture::Rotate));

        input.press_key(KeyCode::ControlLeft);
        assert_eq!(CameraGesture::from_input(&input), Some(CameraGesture::Zoom));

        input.press_key(KeyCode::ShiftLeft);
        assert_eq!(CameraGesture::from_input(&input), Some(CameraGesture::Pan));

        input.release_mouse(MouseButton::Middle);
        assert_eq!(CameraGesture::from_input(&input), None);
    }

    #[test]
    fn rotate_drag_changes_yaw_only() {
        let mut controller = CameraController::new(Camera::new());
        let mut input = Input::new();
        start_drag(&mut controller, &mut input);

        let before = controller.camera().clone();
        input.move_cursor(Vec2::new(140.0, 100.0));
        assert!(controller.on_update(&input, true));

        assert_ne!(controller.camera().yaw, before.yaw);
        assert_eq!(controller.camera().pitch, before.pitch);
        assert_eq!(controller.camera().target, before.target);
        assert_eq!(controller.camera().distance, before.distance);
    }

    #[test]
    fn pan_drag_moves_target_only() {
        let mut controller = CameraController::new(Camera::new());
        let mut input = Input::new();
        input.press_key(KeyCode::ShiftLeft);
        start_drag(&mut controller, &mut input);

        let before = controller.camera().clone();
        input.move_cursor(Vec2::new(120.0, 80.0));
        controller.on_update(&input, true);

        assert_ne!(controller.camera().target, before.target);
        assert_eq!(controller.camera().yaw, before.yaw);
    }

    #[test]
    fn zoom_drag_uses_vertical_delta() {
        let mut controller = CameraController::new(Camera::new());
        let mut input = Input::new();
        input.press_key(KeyCode::ControlLeft);
        start_drag(&mut controller, &mut input);

        let before = controller.camera().distance;
        input.move_cursor(Vec2::new(300.0, 110.0));
        controller.on_update(&input, true);
        assert!(controller.camera().distance < before);
    }

    #[test]
    fn drag_started_outside_viewport_is_ignored() {
        let mut controller = CameraController::new(Camera::new());
        let mut input = Input::new();
        input.move_cursor(Vec2::new(10.0, 10.0));
        input.press_mouse(MouseButton::Middle);
        controller.on_update(&input, false);

        input.move_cursor(Vec2::new(50.0, 10.0));
        assert!(!controller.on_update(&input, true));
        assert!(!controller.is_dragging());
    }

    #[test]
    fn delta_is_measured_against_last_sample() {
        let mut controller = CameraController::new(Camera::new());
        let mut input = Input::new();
        start_drag(&mut controller, &mut input);

        input.move_cursor(Vec2::new(110.0, 100.0));
        controller.on_update(&input, true);
        let after_first = controller.camera().yaw;

        // No pointer movement since the last sample: nothing to apply.
        assert!(!controller.on_update(&input, true));
        assert_eq!(controller.camera().yaw, after_first);
    }

    #[test]
    fn scroll_zooms_in() {
        let mut controller = CameraController::new(Camera::new());
        let before = controller.camera().distance;
        controller.on_scroll(1.0);
        assert!(controller.camera().distance < before);
    }
}
