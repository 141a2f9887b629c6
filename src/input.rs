use std::collections::HashSet;

use glam::Vec2;
use winit::event::{ElementState, MouseButton, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// Polled keyboard and mouse state.
///
/// Window events update it as they arrive; the editor reads it once per frame.
/// Nothing here is queued, so a consumer always sees the latest state.
#[derive(Debug, Default)]
pub struct Input {
    keys_down: HashSet<KeyCode>,
    mouse_buttons_down: HashSet<MouseButton>,
    mouse_position: Vec2,
}

impl Input {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process a window event and update input state.
    pub fn handle_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key) = event.physical_key {
                    match event.state {
                        ElementState::Pressed => self.press_key(key),
                        ElementState::Released => self.release_key(key),
                    }
                }
            }
            WindowEvent::MouseInput { state, button, .. } => match state {
                ElementState::Pressed => self.press_mouse(*button),
                ElementState::Released => self.release_mouse(*button),
            },
            WindowEvent::CursorMoved { position, .. } => {
                self.move_cursor(Vec2::new(position.x as f32, position.y as f32));
            }
            WindowEvent::Focused(false) => {
                // Releases are never delivered to an unfocused window.
                self.keys_down.clear();
                self.mouse_buttons_down.clear();
            }
            _ => {}
        }
    }

    pub fn press_key(&mut self, key: KeyCode) {
        self.keys_down.insert(key);
    }

    pub fn release_key(&mut self, key: KeyCode) {
        self.keys_down.remove(&key);
    }

    pub fn press_mouse(&mut self, button: MouseButton) {
        self.mouse_buttons_down.insert(button);
    }

    pub fn release_mouse(&mut self, button: MouseButton) {
        self.mouse_buttons_down.remove(&button);
    }

    pub fn move_cursor(&mut self, position: Vec2) {
        self.mouse_position = position;
    }

    /// Returns true if the key is currently held down.
    pub fn key_down(&self, key: KeyCode) -> bool {
        self.keys_down.contains(&key)
    }

    /// Returns true if the mouse button is currently held down.
    pub fn mouse_down(&self, button: MouseButton) -> bool {
        self.mouse_buttons_down.contains(&button)
    }

    /// Current mouse position in window coordinates.
    pub fn mouse_position(&self) -> Vec2 {
        self.mouse_position
    }
}

/// Edge of a boolean signal between two consecutive samples.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Edge {
    /// Went from up to down this sample.
    Pressed,
    /// Went from down to up this sample.
    Released,
    /// Down on both samples.
    Held,
    /// Up on both samples.
    Idle,
}

/// Turns a level signal (key held, gizmo in use) into discrete edges.
///
/// Each call to [`KeyEdge::sample`] compares against the previous sample, so it
/// must be called exactly once per frame for a given signal.
#[derive(Clone, Copy, Debug, Default)]
pub struct KeyEdge {
    previous: bool,
}

impl KeyEdge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sample(&mut self, current: bool) -> Edge {
        let edge = match (self.previous, current) {
            (false, true) => Edge::Pressed,
            (true, false) => Edge::Released,
            (true, true) => Edge::Held,
            (false, false) => Edge::Idle,
        };
        self.previous = current;
        edge
    }
}
