//! # Vantage
//!
//! **A small desktop 3D scene editor built on wgpu and egui.**
//!
//! The window holds a World Outliner on the left, property panels on the right and a
//! 3D viewport in the middle. The viewport renders the scene offscreen in two passes
//! (a shadow depth pass for the active directional light, then a lit color pass) and
//! shows the result as an image. Objects are selected by clicking and moved with an
//! axis gizmo; holding Alt while starting a drag duplicates the object first.
//!
//! ## Quick Start
//!
//! ```no_run
//! use vantage::{AppConfig, run};
//!
//! fn main() -> vantage::Result<()> {
//!     run(AppConfig::new().size(1280, 720))
//! }
//! ```
//!
//! The scene store is usable without a window:
//!
//! ```
//! use vantage::scene::{BaseEntityKind, Scene};
//! use vantage::Transform;
//!
//! let mut scene = Scene::new();
//! let cube = scene.create_base_entity(BaseEntityKind::Cube);
//! let copy = scene.duplicate_entity(cube).unwrap();
//! assert_eq!(scene.name(copy), "Cube_1");
//! assert_eq!(*scene.component::<Transform>(copy), *scene.component::<Transform>(cube));
//! ```
//!
//! ## Controls
//!
//! - **Middle drag** orbits the viewport camera, **Shift** + middle drag pans and
//!   **Ctrl** + middle drag or the **scroll wheel** zooms
//! - **Space** cycles the gizmo between select, translate, rotate and scale
//! - **Delete** removes the selected entity

mod app;
pub mod bridge;
pub mod camera;
pub mod camera_controller;
pub mod config;
pub mod editor;
mod egui_host;
pub mod error;
pub mod events;
pub mod framebuffer;
pub mod geometry;
pub mod gizmo;
mod gpu;
pub mod importer;
pub mod input;
pub mod light;
pub mod mesh;
pub mod picking;
pub mod render;
pub mod scene;
pub mod transform;

pub use app::{run, starter_scene};
pub use camera::Camera;
pub use camera_controller::CameraController;
pub use config::{AppConfig, WindowSize};
pub use editor::Editor;
pub use error::{EditorError, Result};
pub use events::{Event, EventQueue};
pub use framebuffer::Framebuffer;
pub use gizmo::{GizmoOperation, ObjectManipulator};
pub use gpu::GpuContext;
pub use input::Input;
pub use light::{DirectionalLight, Light, LightKind, PointLight, ShadowResolution};
pub use render::{RecordingRenderer, RenderCall, RenderSettings, SceneRenderer};
pub use transform::Transform;

// Re-export glam math types for convenience
pub use glam::{Mat4, Vec2, Vec3};

// Re-export commonly used winit and hecs types for convenience
pub use hecs::Entity;
pub use winit::keyboard::KeyCode;
