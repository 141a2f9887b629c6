use std::collections::HashSet;

use vantage::light::PointLight;
use vantage::scene::{BaseEntityKind, Scene};
use vantage::{Mat4, Transform, Vec3};

fn assert_unique_labels(scene: &Scene) {
    let names: Vec<String> = scene.entities().map(|entity| scene.name(entity)).collect();
    let distinct: HashSet<&String> = names.iter().collect();
    assert_eq!(distinct.len(), names.len(), "duplicate labels in {names:?}");
}

#[test]
fn labels_stay_unique_through_creates_renames_and_deletes() {
    let mut scene = Scene::new();
    let mut live = Vec::new();

    for round in 0..6 {
        live.push(scene.create_entity("Cube"));
        live.push(scene.create_entity("Cube_1"));
        live.push(scene.create_base_entity(BaseEntityKind::PointLight));
        assert_unique_labels(&scene);

        let target = live[round % live.len()];
        scene.rename_entity(target, "Cube").unwrap();
        assert_unique_labels(&scene);

        let copy = scene.duplicate_entity(target).unwrap();
        live.push(copy);
        assert_unique_labels(&scene);

        if round % 2 == 1 {
            let removed = live.remove(0);
            scene.destroy_entity(removed).unwrap();
            live.push(scene.create_entity("Cube"));
            assert_unique_labels(&scene);
        }
    }
}

#[test]
fn blank_rename_still_produces_a_unique_label() {
    let mut scene = Scene::new();
    let a = scene.create_entity("Entity");
    let b = scene.create_entity("Thing");
    let name = scene.rename_entity(b, "   ").unwrap();
    assert_ne!(name, scene.name(a));
    assert_unique_labels(&scene);
}

fn assert_close(a: Vec3, b: Vec3, tolerance: f32, what: &str) {
    assert!(
        (a - b).abs().max_element() < tolerance,
        "{what}: expected {b:?}, got {a:?}"
    );
}

#[test]
fn compose_then_decompose_round_trips() {
    let locations = [
        Vec3::ZERO,
        Vec3::new(1.5, -2.0, 3.25),
        Vec3::new(-40.0, 12.0, 0.5),
    ];
    let angles = [-175.0, -120.0, -60.0, -5.0, 0.0, 30.0, 95.0, 170.0];
    let pitches = [-80.0, -45.0, 0.0, 20.0, 75.0];
    let scales = [
        Vec3::ONE,
        Vec3::new(0.5, 2.0, 1.25),
        Vec3::new(3.0, 0.01, 0.7),
    ];

    for location in locations {
        for scale in scales {
            for &roll in &angles {
                for &pitch in &pitches {
                    for &yaw in &angles {
                        let original = Transform::new()
                            .location(location)
                            .rotation(Vec3::new(roll, pitch, yaw))
                            .scale(scale);
                        let decomposed = Transform::decompose(&original.model_matrix()).unwrap();

                        assert_close(decomposed.location, original.location, 1e-4, "location");
                        assert_close(decomposed.scale, original.scale, 1e-3, "scale");
                        assert_close(decomposed.rotation, original.rotation, 1e-2, "rotation");
                    }
                }
            }
        }
    }
}

#[test]
fn out_of_range_pitch_decomposes_to_the_same_matrix() {
    for pitch in [-170.0, -100.0, 135.0, 180.0] {
        let original = Transform::new()
            .location(Vec3::new(1.0, 2.0, 3.0))
            .rotation(Vec3::new(25.0, pitch, -40.0));
        let matrix = original.model_matrix();
        let decomposed = Transform::decompose(&matrix).unwrap();

        assert!(decomposed.rotation.y.abs() <= 90.0 + 1e-3);
        assert!(
            decomposed.model_matrix().abs_diff_eq(matrix, 1e-4),
            "pitch {pitch} did not reproduce its matrix"
        );
    }
}

#[test]
fn degenerate_matrices_never_produce_nan() {
    for matrix in [
        Mat4::ZERO,
        Mat4::from_scale(Vec3::new(0.0, 1.0, 1.0)),
        Mat4::from_scale(Vec3::new(0.0, 0.0, 2.0)),
    ] {
        let decomposed = Transform::decompose(&matrix).unwrap();
        assert!(decomposed.model_matrix().is_finite());
    }
    assert!(Transform::decompose(&Mat4::from_scale(Vec3::splat(f32::NAN))).is_none());
}

#[test]
fn attenuation_depends_only_on_radius() {
    let fresh = PointLight::new(50.0);
    let expected = (fresh.linear(), fresh.quadratic());

    let mut light = PointLight::new(7.0);
    for radius in [600.0, 50.0, 13.0, 200.0, 50.0, 50.0] {
        light.set_radius(radius);
    }
    assert_eq!((light.linear(), light.quadratic()), expected);

    let mut other = PointLight::new(300.0);
    other.set_radius(50.0);
    assert_eq!((other.linear(), other.quadratic()), expected);
}
