use vantage::gizmo::{AxisGizmo, DUPLICATE_MODIFIER, GizmoOperation, GizmoPointer, ObjectManipulator};
use vantage::scene::{BaseEntityKind, Scene};
use vantage::{Entity, Input, Mat4, Transform, Vec2, Vec3};

struct Rig {
    scene: Scene,
    selection: Option<Entity>,
    gizmo: AxisGizmo,
    manipulator: ObjectManipulator,
    input: Input,
    view: Mat4,
    projection: Mat4,
}

impl Rig {
    fn new() -> (Self, Entity) {
        let mut scene = Scene::new();
        let cube = scene.create_base_entity(BaseEntityKind::Cube);
        scene.component_mut::<Transform>(cube).location = Vec3::ZERO;

        let mut manipulator = ObjectManipulator::new();
        manipulator.operation = GizmoOperation::Translate;

        let rig = Self {
            scene,
            selection: Some(cube),
            gizmo: AxisGizmo::new(),
            manipulator,
            input: Input::new(),
            view: Mat4::look_at_rh(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO, Vec3::Y),
            projection: Mat4::perspective_rh(45f32.to_radians(), 1.0, 0.1, 100.0),
        };
        (rig, cube)
    }

    /// One frame with the pointer at `x` on the horizontal center line of an
    /// 800x800 viewport. The X handle of an object at the origin sits at x = 440.
    fn frame(&mut self, x: f32, down: bool) -> vantage::gizmo::ManipulationOutcome {
        self.gizmo.set_pointer(Some(GizmoPointer {
            position: Vec2::new(x, 400.0),
            viewport: Vec2::splat(800.0),
            down,
        }));
        let outcome = self.manipulator.manipulate(
            &mut self.scene,
            &mut self.selection,
            &mut self.gizmo,
            self.view,
            self.projection,
            &self.input,
        );
        outcome
    }
}

#[test]
fn one_continuous_drag_spawns_exactly_one_copy() {
    let (mut rig, cube) = Rig::new();
    rig.input.press_key(DUPLICATE_MODIFIER);

    rig.frame(440.0, false);
    let start = rig.frame(440.0, true);
    assert!(start.using);
    let copy = start.duplicated.expect("drag start duplicates");
    assert_eq!(rig.selection, Some(copy));

    for step in 1..=30 {
        let outcome = rig.frame(440.0 + step as f32 * 2.0, true);
        assert!(outcome.using);
        assert_eq!(outcome.duplicated, None);
    }

    assert_eq!(rig.scene.len(), 2);
    assert_eq!(rig.scene.name(copy), "Cube_1");
    assert!(rig.scene.component::<Transform>(copy).location.x > 0.5);
    assert_eq!(rig.scene.component::<Transform>(cube).location, Vec3::ZERO);
}

#[test]
fn releasing_the_drag_rearms_duplication() {
    let (mut rig, cube) = Rig::new();
    rig.input.press_key(DUPLICATE_MODIFIER);

    rig.frame(440.0, true);
    rig.frame(460.0, true);
    rig.frame(460.0, false);
    assert!(rig.manipulator.duplicate_consumed(), "modifier still held");

    rig.input.release_key(DUPLICATE_MODIFIER);
    rig.frame(460.0, false);
    assert!(!rig.manipulator.duplicate_consumed());

    rig.selection = Some(cube);
    rig.input.press_key(DUPLICATE_MODIFIER);
    rig.frame(440.0, false);
    let second = rig.frame(440.0, true);
    assert!(second.duplicated.is_some());
    assert_eq!(rig.scene.len(), 3);
}

#[test]
fn modifier_held_across_two_drags_spawns_one_copy() {
    let (mut rig, cube) = Rig::new();
    rig.input.press_key(DUPLICATE_MODIFIER);

    let mut copies = 0;
    for _ in 0..2 {
        rig.selection = Some(cube);
        rig.frame(440.0, false);
        copies += rig.frame(440.0, true).duplicated.is_some() as usize;
        rig.frame(470.0, true);
        rig.frame(470.0, false);
    }

    assert_eq!(copies, 1);
    assert_eq!(rig.scene.len(), 2);
}

#[test]
fn drag_without_modifier_moves_the_original() {
    let (mut rig, cube) = Rig::new();

    rig.frame(440.0, true);
    for step in 1..=10 {
        assert_eq!(rig.frame(440.0 + step as f32 * 3.0, true).duplicated, None);
    }

    assert_eq!(rig.scene.len(), 1);
    assert_eq!(rig.selection, Some(cube));
    assert!(rig.scene.component::<Transform>(cube).location.x > 0.25);
}

#[test]
fn modifier_alone_does_not_duplicate() {
    let (mut rig, _) = Rig::new();
    rig.input.press_key(DUPLICATE_MODIFIER);

    for _ in 0..5 {
        rig.frame(100.0, false);
    }
    assert_eq!(rig.scene.len(), 1);
}
