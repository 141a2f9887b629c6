//! Discrete input events delivered to the editor.
//!
//! Continuous state (held keys, cursor position, buttons) is polled from
//! [`Input`](crate::input::Input). Only key presses and scroll steps arrive as
//! events, collected while the window pumps and drained once per frame.

use std::collections::VecDeque;

use winit::event::{ElementState, MouseScrollDelta, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Event {
    /// A key went down. Auto-repeat is filtered out.
    KeyPressed(KeyCode),
    /// Scroll wheel movement in lines.
    Scroll { x: f32, y: f32 },
}

/// FIFO of events between window pumps and the next editor frame.
#[derive(Debug, Default)]
pub struct EventQueue {
    pending: VecDeque<Event>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: Event) {
        self.pending.push_back(event);
    }

    /// Translate a window event, queueing it if it is one of the two tracked kinds.
    pub fn handle_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state == ElementState::Pressed && !event.repeat {
                    if let PhysicalKey::Code(key) = event.physical_key {
                        self.push(Event::KeyPressed(key));
                    }
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let (x, y) = match delta {
                    MouseScrollDelta::LineDelta(x, y) => (*x, *y),
                    MouseScrollDelta::PixelDelta(pos) => (pos.x as f32 / 120.0, pos.y as f32 / 120.0),
                };
                self.push(Event::Scroll { x, y });
            }
            _ => {}
        }
    }

    /// Take every queued event, oldest first.
    pub fn drain(&mut self) -> impl Iterator<Item = Event> + '_ {
        self.pending.drain(..)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_preserves_order_and_empties() {
        let mut queue = EventQueue::new();
        queue.push(Event::KeyPressed(KeyCode::Space));
        queue.push(Event::Scroll { x: 0.0, y: 1.0 });

        let events: Vec<_> = queue.drain().collect();
        assert_eq!(
            events,
            vec![
                Event::KeyPressed(KeyCode::Space),
                Event::Scroll { x: 0.0, y: 1.0 }
            ]
        );
        assert!(queue.is_empty());
    }
}
