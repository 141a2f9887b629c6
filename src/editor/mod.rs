//! The editor shell: panels, viewport and the per-frame orchestration.
//!
//! One call to [`Editor::frame`] runs the whole frame in a fixed order:
//!
//! 1. camera update from polled input
//! 2. menu bar and side panels (outliner, properties, bridges)
//! 3. viewport resize detection
//! 4. shadow depth pass, then color pass
//! 5. viewport image and gizmo manipulation
//! 6. click picking
//! 7. selection sync
//!
//! Discrete events (key presses, scroll) are delivered separately through
//! [`Editor::handle_event`] before the frame runs.

mod panels;

use glam::Vec2;
use hecs::Entity;
use winit::keyboard::KeyCode;

use crate::camera::Camera;
use crate::camera_controller::CameraController;
use crate::error::Result;
use crate::events::Event;
use crate::gizmo::{AxisGizmo, GizmoOperation, GizmoPointer, ObjectManipulator};
use crate::input::Input;
use crate::light::Light;
use crate::picking::{Ray, pick};
use crate::render::SceneRenderer;
use crate::scene::Scene;

/// Key that cycles the gizmo operation.
pub const CYCLE_GIZMO_KEY: KeyCode = KeyCode::Space;
/// Key that removes the selected entity.
pub const DELETE_KEY: KeyCode = KeyCode::Delete;

/// Exponential smoothing of the FPS readout.
const FPS_SMOOTHING: f32 = 0.1;

pub struct Editor {
    scene: Scene,
    controller: CameraController,
    manipulator: ObjectManipulator,
    gizmo: AxisGizmo,
    selection: Option<Entity>,
    /// Selection the cached views below were last built for.
    synced_selection: Option<Entity>,
    selected_point_light: Option<Entity>,
    rename_buffer: String,
    import_path: String,
    /// Viewport size in physical pixels as of the last resize.
    viewport_size: Option<(u32, u32)>,
    viewport_hovered: bool,
    keyboard_captured: bool,
    /// Directional slot the renderer last received; `None` until the first push.
    pushed_light: Option<Option<Entity>>,
    fps: f32,
}

impl Editor {
    pub fn new(scene: Scene) -> Self {
        Self {
            scene,
            controller: CameraController::new(Camera::new()),
            manipulator: ObjectManipulator::new(),
            gizmo: AxisGizmo::new(),
            selection: None,
            synced_selection: None,
            selected_point_light: None,
            rename_buffer: String::new(),
            import_path: String::new(),
            viewport_size: None,
            viewport_hovered: false,
            keyboard_captured: false,
            pushed_light: None,
            fps: 0.0,
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn camera(&self) -> &Camera {
        self.controller.camera()
    }

    pub fn selection(&self) -> Option<Entity> {
        self.selection
    }

    /// Entity of the selected point light, refreshed on selection change.
    pub fn selected_point_light(&self) -> Option<Entity> {
        self.selected_point_light
    }

    /// Label edit buffer of the Object panel.
    pub fn rename_buffer(&self) -> &str {
        &self.rename_buffer
    }

    pub fn gizmo_operation(&self) -> GizmoOperation {
        self.manipulator.operation
    }

    /// Last viewport size handed to the renderer, in physical pixels.
    pub fn viewport_size(&self) -> Option<(u32, u32)> {
        self.viewport_size
    }

    /// Change the selection and resync cached views right away.
    pub fn select(&mut self, entity: Option<Entity>) {
        self.selection = entity;
        self.sync_selection();
    }

    /// React to a key press or scroll step.
    ///
    /// Key presses are ignored while a text field has keyboard focus. Scroll
    /// only zooms while the pointer is over the viewport.
    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::KeyPressed(_) if self.keyboard_captured => {}
            Event::KeyPressed(CYCLE_GIZMO_KEY) => {
                self.manipulator.cycle_operation();
            }
            Event::KeyPressed(DELETE_KEY) => self.delete_selection(),
            Event::KeyPressed(_) => {}
            Event::Scroll { y, .. } => {
                if self.viewport_hovered && y != 0.0 {
                    self.controller.on_scroll(y);
                }
            }
        }
    }

    /// Remove the selected entity, if any, and clear the selection.
    pub fn delete_selection(&mut self) {
        let Some(entity) = self.selection else {
            return;
        };
        let name = self.scene.name(entity);
        match self.scene.destroy_entity(entity) {
            Ok(()) => log::info!("deleted {name}"),
            Err(err) => log::warn!("could not delete {name}: {err}"),
        }
        self.select(None);
    }

    /// Run one editor frame.
    ///
    /// `dt` is the time since the previous frame in seconds. Errors come from
    /// render target allocation and end the session.
    pub fn frame(
        &mut self,
        ctx: &egui::Context,
        input: &Input,
        renderer: &mut dyn SceneRenderer,
        dt: f32,
    ) -> Result<()> {
        self.controller.on_update(input, self.viewport_hovered);
        self.scene.update(dt);
        if dt > 0.0 {
            self.fps += (1.0 / dt - self.fps) * FPS_SMOOTHING;
        }

        let mut result = Ok(());

        self.menu_bar(ctx);
        self.outliner(ctx);
        let light_changed = self.properties(ctx, renderer);
        let active = self.scene.directional_light();
        if light_changed || self.pushed_light != Some(active) {
            result = renderer.update_light(&self.scene);
            self.pushed_light = Some(active);
        }

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                if let Err(err) = self.viewport(ui, input, renderer) {
                    result = Err(err);
                }
            });

        self.sync_selection();
        self.keyboard_captured = ctx.wants_keyboard_input();
        result
    }

    /// Viewer 3D: resize, both passes, image, gizmo and picking.
    fn viewport(
        &mut self,
        ui: &mut egui::Ui,
        input: &Input,
        renderer: &mut dyn SceneRenderer,
    ) -> Result<()> {
        let available = ui.available_size();
        let pixels_per_point = ui.ctx().pixels_per_point();
        let size = (
            (available.x * pixels_per_point).round().max(1.0) as u32,
            (available.y * pixels_per_point).round().max(1.0) as u32,
        );
        self.detect_resize(size, renderer)?;

        renderer.render_depth_pass(&self.scene);
        renderer.render_color_pass(&self.scene, self.controller.camera(), self.selection);

        let response = match renderer.viewport_texture() {
            Some(texture) => ui.add(
                egui::Image::new(egui::load::SizedTexture::new(texture, available))
                    .sense(egui::Sense::click()),
            ),
            None => ui.allocate_response(available, egui::Sense::click()),
        };
        let rect = response.rect;
        self.viewport_hovered = response.hovered();

        let (pointer_pos, pointer_down) =
            ui.input(|i| (i.pointer.latest_pos(), i.pointer.primary_down()));
        let pointer = pointer_pos
            .filter(|pos| self.gizmo.is_dragging() || rect.contains(*pos))
            .map(|pos| GizmoPointer {
                position: Vec2::new(pos.x - rect.min.x, pos.y - rect.min.y),
                viewport: Vec2::new(rect.width(), rect.height()),
                down: pointer_down,
            });
        self.gizmo.set_pointer(pointer);

        let camera = self.controller.camera();
        let (view, projection) = (camera.view_matrix(), camera.projection_matrix());
        let outcome = self.manipulator.manipulate(
            &mut self.scene,
            &mut self.selection,
            &mut self.gizmo,
            view,
            projection,
            input,
        );
        if outcome.light_moved {
            renderer.update_light(&self.scene)?;
        }
        self.gizmo.paint(ui.painter(), rect);

        if response.clicked() && !outcome.using && !self.gizmo.is_hovered() {
            if let Some(pos) = response.interact_pointer_pos() {
                let ray = Ray::from_viewport(
                    Vec2::new(pos.x - rect.min.x, pos.y - rect.min.y),
                    Vec2::new(rect.width(), rect.height()),
                    view,
                    projection,
                );
                self.selection = pick(&self.scene, &ray).map(|hit| hit.entity);
            }
        }

        ui.painter().text(
            rect.left_top() + egui::vec2(8.0, 8.0),
            egui::Align2::LEFT_TOP,
            self.manipulator.operation.label(),
            egui::FontId::proportional(14.0),
            egui::Color32::from_gray(200),
        );
        Ok(())
    }

    /// Resize the viewport target and camera when the panel size changed.
    ///
    /// Returns whether anything was resized. Calling it again with the same
    /// size does nothing.
    pub fn detect_resize(
        &mut self,
        size: (u32, u32),
        renderer: &mut dyn SceneRenderer,
    ) -> Result<bool> {
        if self.viewport_size == Some(size) {
            return Ok(false);
        }
        let (width, height) = size;
        log::debug!("viewport resized to {width}x{height}");
        renderer.resize_viewport(width, height)?;
        self.controller
            .camera_mut()
            .update_aspect_ratio(width as f32 / height as f32);
        self.viewport_size = Some(size);
        Ok(true)
    }

    /// Rebuild the views that mirror the selection, if it changed.
    fn sync_selection(&mut self) {
        if self.selection.is_some_and(|entity| !self.scene.contains(entity)) {
            self.selection = None;
        }
        if self.selection == self.synced_selection {
            return;
        }
        self.synced_selection = self.selection;
        self.on_selection_changed();
    }

    fn on_selection_changed(&mut self) {
        self.rename_buffer = self
            .selection
            .map(|entity| self.scene.name(entity))
            .unwrap_or_default();
        self.selected_point_light = self.selection.filter(|&entity| {
            self.scene
                .try_component::<Light>(entity)
                .is_ok_and(|light| light.as_point().is_some())
        });
    }

    /// Release GPU resources through the renderer. Safe to call more than once.
    pub fn free(&mut self, renderer: &mut dyn SceneRenderer) {
        renderer.free();
    }
}
