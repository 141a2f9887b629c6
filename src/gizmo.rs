//! Viewport manipulation of the selected entity.
//!
//! - [`Manipulator`]: the seam to a gizmo widget (matrices in, dragged matrix out)
//! - [`AxisGizmo`]: the built-in three-axis widget, fed with pointer samples
//! - [`ObjectManipulator`]: applies a manipulator to the scene selection, with
//!   duplicate-on-drag and light synchronization

use glam::{Mat4, Quat, Vec2, Vec3};
use hecs::Entity;
use winit::keyboard::KeyCode;

use crate::input::{Edge, Input, KeyEdge};
use crate::light::Light;
use crate::scene::Scene;
use crate::transform::Transform;

pub(crate) const GIZMO_AXIS_LENGTH_PX: f32 = 80.0;
pub(crate) const GIZMO_PICK_RADIUS_PX: f32 = 8.0;
pub(crate) const ROTATE_RADIANS_PER_PX: f32 = 0.01;
pub(crate) const SCALE_MIN_RATIO: f32 = 0.05;
pub(crate) const SCALE_MAX_RATIO: f32 = 20.0;

/// Held while starting a translate drag to drag a copy instead.
pub const DUPLICATE_MODIFIER: KeyCode = KeyCode::AltLeft;

/// Gizmo mode, cycled with Space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GizmoOperation {
    #[default]
    Idle,
    Translate,
    Rotate,
    Scale,
}

impl GizmoOperation {
    /// `Idle -> Translate -> Rotate -> Scale -> Idle`.
    pub fn next(self) -> Self {
        match self {
            GizmoOperation::Idle => GizmoOperation::Translate,
            GizmoOperation::Translate => GizmoOperation::Rotate,
            GizmoOperation::Rotate => GizmoOperation::Scale,
            GizmoOperation::Scale => GizmoOperation::Idle,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            GizmoOperation::Idle => "Select",
            GizmoOperation::Translate => "Translate",
            GizmoOperation::Rotate => "Rotate",
            GizmoOperation::Scale => "Scale",
        }
    }
}

/// An interactive transform widget.
pub trait Manipulator {
    /// Run one frame of the widget for `model`.
    ///
    /// Returns whether a handle is being dragged this frame. While dragging,
    /// `model` may be rewritten in place.
    fn manipulate(
        &mut self,
        view: Mat4,
        projection: Mat4,
        operation: GizmoOperation,
        model: &mut Mat4,
    ) -> bool;
}

/// Pointer state inside the viewport, in pixels from its top-left corner.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GizmoPointer {
    pub position: Vec2,
    pub viewport: Vec2,
    pub down: bool,
}

#[derive(Clone, Copy, Debug)]
struct AxisDrag {
    axis: usize,
    last: Vec2,
}

#[derive(Clone, Copy, Debug)]
struct Handles {
    origin: Vec2,
    ends: [Option<Vec2>; 3],
    active: Option<usize>,
    hovered: Option<usize>,
}

/// Three colored axis handles drawn over the viewport.
///
/// Translate and rotate act along world axes, scale along the object's own
/// axes. Call [`AxisGizmo::set_pointer`] before each frame's manipulation and
/// [`AxisGizmo::paint`] after it.
#[derive(Debug, Default)]
pub struct AxisGizmo {
    pointer: Option<GizmoPointer>,
    was_down: bool,
    drag: Option<AxisDrag>,
    handles: Option<Handles>,
}

impl AxisGizmo {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` when the pointer is outside the viewport and no drag is running.
    pub fn set_pointer(&mut self, pointer: Option<GizmoPointer>) {
        self.pointer = pointer;
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Whether the pointer is over a handle, so a click there is not a pick.
    pub fn is_hovered(&self) -> bool {
        self.handles.is_some_and(|h| h.hovered.is_some() || h.active.is_some())
    }

    /// Draw the handles from the last [`Manipulator::manipulate`] call.
    pub fn paint(&self, painter: &egui::Painter, viewport: egui::Rect) {
        let Some(handles) = self.handles else {
            return;
        };
        let to_screen = |p: Vec2| viewport.min + egui::vec2(p.x, p.y);
        let colors = [
            egui::Color32::from_rgb(230, 70, 70),
            egui::Color32::from_rgb(90, 200, 90),
            egui::Color32::from_rgb(80, 130, 240),
        ];
        for (axis, end) in handles.ends.iter().enumerate() {
            let Some(end) = end else {
                continue;
            };
            let highlighted = handles.active == Some(axis) || handles.hovered == Some(axis);
            let color = if highlighted {
                egui::Color32::YELLOW
            } else {
                colors[axis]
            };
            painter.line_segment(
                [to_screen(handles.origin), to_screen(*end)],
                egui::Stroke::new(3.0, color),
            );
            painter.circle_filled(to_screen(*end), 5.0, color);
        }
        painter.circle_filled(to_screen(handles.origin), 3.0, egui::Color32::WHITE);
    }
}

impl Manipulator for AxisGizmo {
    fn manipulate(
        &mut self,
        view: Mat4,
        projection: Mat4,
        operation: GizmoOperation,
        model: &mut Mat4,
    ) -> bool {
        let pointer = match (operation, self.pointer) {
            (GizmoOperation::Idle, _) | (_, None) => {
                self.drag = None;
                self.handles = None;
                self.was_down = false;
                return false;
            }
            (_, Some(pointer)) => pointer,
        };

        let view_projection = projection * view;
        let origin = model.w_axis.truncate();
        let Some(origin_px) = project(view_projection, origin, pointer.viewport) else {
            self.drag = None;
            self.handles = None;
            return false;
        };

        let axes = handle_axes(model, operation);
        // Unit screen direction and pixels per world unit of each axis.
        let screen_axes: [Option<(Vec2, f32)>; 3] = std::array::from_fn(|i| {
            let end = project(view_projection, origin + axes[i], pointer.viewport)?;
            let d = end - origin_px;
            let length = d.length();
            (length > 1e-3).then(|| (d / length, length))
        });
        let ends = screen_axes.map(|axis| axis.map(|(dir, _)| origin_px + dir * GIZMO_AXIS_LENGTH_PX));
        let hovered = nearest_handle(origin_px, &ends, pointer.position);

        let pressed = pointer.down && !self.was_down;
        self.was_down = pointer.down;
        if !pointer.down {
            self.drag = None;
        } else if pressed {
            self.drag = hovered.map(|axis| AxisDrag {
                axis,
                last: pointer.position,
            });
        }

        if let Some(drag) = &mut self.drag {
            let delta = pointer.position - drag.last;
            drag.last = pointer.position;
            if let Some((dir, pixels_per_unit)) = screen_axes[drag.axis] {
                if delta != Vec2::ZERO {
                    apply_drag(model, operation, axes[drag.axis], dir, pixels_per_unit, delta);
                }
            }
        }

        self.handles = Some(Handles {
            origin: origin_px,
            ends,
            active: self.drag.map(|d| d.axis),
            hovered,
        });
        self.drag.is_some()
    }
}

fn handle_axes(model: &Mat4, operation: GizmoOperation) -> [Vec3; 3] {
    match operation {
        GizmoOperation::Scale => [
            model.x_axis.truncate().normalize_or(Vec3::X),
            model.y_axis.truncate().normalize_or(Vec3::Y),
            model.z_axis.truncate().normalize_or(Vec3::Z),
        ],
        _ => [Vec3::X, Vec3::Y, Vec3::Z],
    }
}

fn apply_drag(
    model: &mut Mat4,
    operation: GizmoOperation,
    axis: Vec3,
    screen_dir: Vec2,
    pixels_per_unit: f32,
    delta: Vec2,
) {
    let along = delta.dot(screen_dir);
    match operation {
        GizmoOperation::Translate => {
            let offset = axis * (along / pixels_per_unit);
            model.w_axis += offset.extend(0.0);
        }
        GizmoOperation::Rotate => {
            let across = delta.dot(screen_dir.perp());
            let rotation = Quat::from_axis_angle(axis, across * ROTATE_RADIANS_PER_PX);
            let pivot = model.w_axis.truncate();
            *model = Mat4::from_translation(pivot)
                * Mat4::from_quat(rotation)
                * Mat4::from_translation(-pivot)
                * *model;
        }
        GizmoOperation::Scale => {
            let ratio = (1.0 + along / GIZMO_AXIS_LENGTH_PX).clamp(SCALE_MIN_RATIO, SCALE_MAX_RATIO);
            let index = [model.x_axis, model.y_axis, model.z_axis]
                .iter()
                .position(|column| column.truncate().normalize_or_zero().abs_diff_eq(axis, 1e-4))
                .unwrap_or(0);
            let mut scale = Vec3::ONE;
            scale[index] = ratio;
            *model *= Mat4::from_scale(scale);
        }
        GizmoOperation::Idle => {}
    }
}

fn nearest_handle(origin: Vec2, ends: &[Option<Vec2>; 3], pointer: Vec2) -> Option<usize> {
    ends.iter()
        .enumerate()
        .filter_map(|(axis, end)| Some((axis, distance_to_segment(pointer, origin, (*end)?))))
        .filter(|(_, distance)| *distance <= GIZMO_PICK_RADIUS_PX)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(axis, _)| axis)
}

fn distance_to_segment(point: Vec2, a: Vec2, b: Vec2) -> f32 {
    let ab = b - a;
    let t = if ab.length_squared() > 0.0 {
        ((point - a).dot(ab) / ab.length_squared()).clamp(0.0, 1.0)
    } else {
        0.0
    };
    point.distance(a + ab * t)
}

/// World point to viewport pixels, or `None` behind the camera.
pub(crate) fn project(view_projection: Mat4, point: Vec3, viewport: Vec2) -> Option<Vec2> {
    let clip = view_projection * point.extend(1.0);
    if clip.w <= 1e-6 {
        return None;
    }
    let ndc = clip.truncate() / clip.w;
    Some(Vec2::new(
        (ndc.x + 1.0) * 0.5 * viewport.x,
        (1.0 - ndc.y) * 0.5 * viewport.y,
    ))
}

/// What one frame of manipulation did to the scene.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ManipulationOutcome {
    /// A handle is being dragged.
    pub using: bool,
    /// The copy spawned by duplicate-on-drag; it is now the selection.
    pub duplicated: Option<Entity>,
    /// The selected transform was rewritten.
    pub moved: bool,
    /// The selection carries a light whose placement was re-synced.
    pub light_moved: bool,
}

/// Applies a [`Manipulator`] to the editor selection.
///
/// Holding [`DUPLICATE_MODIFIER`] while a translate drag runs duplicates the
/// selection once and moves the copy. The duplicate latch re-arms only once
/// the drag has ended and the modifier has been let go, so neither tapping the
/// modifier mid-drag nor holding it across two drags spawns a second copy.
#[derive(Debug, Default)]
pub struct ObjectManipulator {
    pub operation: GizmoOperation,
    in_use: KeyEdge,
    modifier: KeyEdge,
    duplicated: bool,
}

impl ObjectManipulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance to the next gizmo mode and return it.
    pub fn cycle_operation(&mut self) -> GizmoOperation {
        self.operation = self.operation.next();
        log::debug!("gizmo operation: {}", self.operation.label());
        self.operation
    }

    /// Whether a copy was already spawned during the current drag.
    pub fn duplicate_consumed(&self) -> bool {
        self.duplicated
    }

    pub fn manipulate(
        &mut self,
        scene: &mut Scene,
        selection: &mut Option<Entity>,
        manipulator: &mut dyn Manipulator,
        view: Mat4,
        projection: Mat4,
        input: &Input,
    ) -> ManipulationOutcome {
        let target = selection.filter(|&entity| scene.has_component::<Transform>(entity));
        let (Some(entity), false) = (target, self.operation == GizmoOperation::Idle) else {
            self.end_drag(false, input);
            return ManipulationOutcome::default();
        };

        let before = scene.component::<Transform>(entity).model_matrix();
        let mut model = before;
        let using = manipulator.manipulate(view, projection, self.operation, &mut model);
        self.end_drag(using, input);

        let mut outcome = ManipulationOutcome {
            using,
            ..Default::default()
        };

        let mut entity = entity;
        if using
            && self.operation == GizmoOperation::Translate
            && input.key_down(DUPLICATE_MODIFIER)
            && !self.duplicated
        {
            match scene.duplicate_entity(entity) {
                Ok(copy) => {
                    log::debug!("duplicated {} on drag", scene.name(entity));
                    *selection = Some(copy);
                    outcome.duplicated = Some(copy);
                    entity = copy;
                }
                Err(err) => log::warn!("duplicate on drag failed: {err}"),
            }
            self.duplicated = true;
        }

        if using && model != before {
            outcome.moved = scene.component_mut::<Transform>(entity).set_from_matrix(&model);
            if outcome.moved {
                if let Ok(mut light) = scene.try_component_mut::<Light>(entity) {
                    let transform = scene.component::<Transform>(entity);
                    light.sync_transform(&transform);
                    outcome.light_moved = true;
                }
            }
        }

        outcome
    }

    fn end_drag(&mut self, using: bool, input: &Input) {
        let drag = self.in_use.sample(using);
        let modifier = self.modifier.sample(input.key_down(DUPLICATE_MODIFIER));
        let up = |edge: Edge| matches!(edge, Edge::Released | Edge::Idle);
        if up(drag) && up(modifier) {
            self.duplicated = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::BaseEntityKind;

    fn camera() -> (Mat4, Mat4) {
        let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO, Vec3::Y);
        let projection = Mat4::perspective_rh(45f32.to_radians(), 1.0, 0.1, 100.0);
        (view, projection)
    }

    fn pointer(x: f32, y: f32, down: bool) -> Option<GizmoPointer> {
        Some(GizmoPointer {
            position: Vec2::new(x, y),
            viewport: Vec2::splat(800.0),
            down,
        })
    }

    /// Drags by a fixed offset every frame it is told to.
    struct ScriptedManipulator {
        frames: Vec<bool>,
        step: Vec3,
    }

    impl Manipulator for ScriptedManipulator {
        fn manipulate(&mut self, _: Mat4, _: Mat4, _: GizmoOperation, model: &mut Mat4) -> bool {
            let using = if self.frames.is_empty() {
                false
            } else {
                self.frames.remove(0)
            };
            if using {
                model.w_axis += self.step.extend(0.0);
            }
            using
        }
    }

    #[test]
    fn operations_cycle_in_fixed_order() {
        let mut manipulator = ObjectManipulator::new();
        let seen: Vec<_> = (0..4).map(|_| manipulator.cycle_operation()).collect();
        assert_eq!(
            seen,
            [
                GizmoOperation::Translate,
                GizmoOperation::Rotate,
                GizmoOperation::Scale,
                GizmoOperation::Idle
            ]
        );
    }

    #[test]
    fn projection_centers_the_origin() {
        let (view, projection) = camera();
        let p = project(projection * view, Vec3::ZERO, Vec2::splat(800.0)).unwrap();
        assert!(p.abs_diff_eq(Vec2::splat(400.0), 1e-3));
        assert!(project(projection * view, Vec3::new(0.0, 0.0, 20.0), Vec2::splat(800.0)).is_none());
    }

    #[test]
    fn dragging_x_handle_translates_along_x() {
        let (view, projection) = camera();
        let mut gizmo = AxisGizmo::new();
        let mut model = Mat4::IDENTITY;

        gizmo.set_pointer(pointer(440.0, 400.0, false));
        assert!(!gizmo.manipulate(view, projection, GizmoOperation::Translate, &mut model));
        assert!(gizmo.is_hovered());

        gizmo.set_pointer(pointer(440.0, 400.0, true));
        assert!(gizmo.manipulate(view, projection, GizmoOperation::Translate, &mut model));

        gizmo.set_pointer(pointer(480.0, 400.0, true));
        assert!(gizmo.manipulate(view, projection, GizmoOperation::Translate, &mut model));
        assert!(model.w_axis.x > 0.3);
        assert!(model.w_axis.y.abs() < 1e-4 && model.w_axis.z.abs() < 1e-4);

        gizmo.set_pointer(pointer(480.0, 400.0, false));
        assert!(!gizmo.manipulate(view, projection, GizmoOperation::Translate, &mut model));
    }

    #[test]
    fn press_away_from_handles_does_not_drag() {
        let (view, projection) = camera();
        let mut gizmo = AxisGizmo::new();
        let mut model = Mat4::IDENTITY;
        gizmo.set_pointer(pointer(100.0, 700.0, true));
        assert!(!gizmo.manipulate(view, projection, GizmoOperation::Translate, &mut model));
        assert_eq!(model, Mat4::IDENTITY);
    }

    #[test]
    fn idle_gizmo_never_drags() {
        let (view, projection) = camera();
        let mut gizmo = AxisGizmo::new();
        let mut model = Mat4::IDENTITY;
        gizmo.set_pointer(pointer(440.0, 400.0, true));
        assert!(!gizmo.manipulate(view, projection, GizmoOperation::Idle, &mut model));
        assert!(!gizmo.is_hovered());
    }

    #[test]
    fn modifier_tap_during_one_drag_duplicates_once() {
        let mut scene = Scene::new();
        let cube = scene.create_base_entity(BaseEntityKind::Cube);
        let mut selection = Some(cube);
        let mut manipulator = ObjectManipulator::new();
        manipulator.operation = GizmoOperation::Translate;
        let mut widget = ScriptedManipulator {
            frames: vec![true; 6],
            step: Vec3::X,
        };
        let (view, projection) = camera();
        let mut input = Input::new();

        let mut copies = 0;
        for frame in 0..6 {
            if frame % 2 == 0 {
                input.press_key(DUPLICATE_MODIFIER);
            } else {
                input.release_key(DUPLICATE_MODIFIER);
            }
            let outcome = manipulator.manipulate(
                &mut scene,
                &mut selection,
                &mut widget,
                view,
                projection,
                &input,
            );
            copies += outcome.duplicated.is_some() as usize;
        }
        assert_eq!(copies, 1);
        assert_eq!(scene.len(), 2);
        assert_ne!(selection, Some(cube));
    }

    #[test]
    fn new_drag_can_duplicate_again() {
        let mut scene = Scene::new();
        let cube = scene.create_base_entity(BaseEntityKind::Cube);
        let mut selection = Some(cube);
        let mut manipulator = ObjectManipulator::new();
        manipulator.operation = GizmoOperation::Translate;
        let mut widget = ScriptedManipulator {
            frames: vec![true, true, false, true, true],
            step: Vec3::X,
        };
        let (view, projection) = camera();
        let mut input = Input::new();

        for frame in 0..5 {
            match frame {
                0 | 3 => input.press_key(DUPLICATE_MODIFIER),
                2 => input.release_key(DUPLICATE_MODIFIER),
                _ => {}
            }
            manipulator.manipulate(&mut scene, &mut selection, &mut widget, view, projection, &input);
        }
        assert_eq!(scene.len(), 3);
    }

    #[test]
    fn holding_modifier_across_two_drags_duplicates_once() {
        let mut scene = Scene::new();
        let cube = scene.create_base_entity(BaseEntityKind::Cube);
        let mut selection = Some(cube);
        let mut manipulator = ObjectManipulator::new();
        manipulator.operation = GizmoOperation::Translate;
        let mut widget = ScriptedManipulator {
            frames: vec![true, true, false, false, true, true],
            step: Vec3::X,
        };
        let (view, projection) = camera();
        let mut input = Input::new();
        input.press_key(DUPLICATE_MODIFIER);

        let mut copies = 0;
        for _ in 0..6 {
            let outcome = manipulator.manipulate(
                &mut scene,
                &mut selection,
                &mut widget,
                view,
                projection,
                &input,
            );
            copies += outcome.duplicated.is_some() as usize;
        }
        assert_eq!(copies, 1);
        assert_eq!(scene.len(), 2);
        assert!(manipulator.duplicate_consumed());
    }

    #[test]
    fn moving_a_point_light_resyncs_its_position() {
        let mut scene = Scene::new();
        let lamp = scene.create_base_entity(BaseEntityKind::PointLight);
        let mut selection = Some(lamp);
        let mut manipulator = ObjectManipulator::new();
        manipulator.operation = GizmoOperation::Translate;
        let mut widget = ScriptedManipulator {
            frames: vec![true],
            step: Vec3::new(1.0, 0.0, 0.0),
        };
        let (view, projection) = camera();

        let outcome = manipulator.manipulate(
            &mut scene,
            &mut selection,
            &mut widget,
            view,
            projection,
            &Input::new(),
        );
        assert!(outcome.moved && outcome.light_moved);
        let light = scene.component::<Light>(lamp);
        let position = light.as_point().unwrap().position();
        assert!(position.abs_diff_eq(Vec3::new(1.0, 3.0, 0.0), 1e-4));
    }
}
