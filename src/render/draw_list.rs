//! Per-pass lists of what to draw, built from the scene without touching the GPU.

use std::sync::Arc;

use glam::{Mat4, Quat, Vec3};
use hecs::Entity;

use crate::geometry::Geometry;
use crate::light::{Light, LightKind};
use crate::scene::{MeshComponent, Scene};
use crate::transform::Transform;

use super::uniforms::ObjectUniforms;
use super::RendererSettings;

/// Edge length of the cube drawn at each light.
pub const LIGHT_MARKER_SIZE: f32 = 0.3;

#[derive(Clone, Debug)]
pub struct DrawItem {
    /// `None` for particles.
    pub entity: Option<Entity>,
    pub geometry: Arc<Geometry>,
    pub object: ObjectUniforms,
    pub selected: bool,
}

#[derive(Clone, Debug, Default)]
pub struct DrawList {
    pub items: Vec<DrawItem>,
}

impl DrawList {
    /// Every entity with both a mesh and a transform, in creation order.
    ///
    /// Selection plays no part here: the selected entity casts shadows like
    /// any other.
    pub fn shadow_casters(scene: &Scene) -> Self {
        let items = scene
            .entities()
            .filter_map(|entity| mesh_item(scene, entity, None))
            .collect();
        Self { items }
    }

    /// Meshes, then light markers, then particles.
    pub fn color(scene: &Scene, selection: Option<Entity>, settings: &RendererSettings) -> Self {
        let mut items: Vec<DrawItem> = scene
            .entities()
            .filter_map(|entity| mesh_item(scene, entity, selection))
            .collect();

        if settings.show_light_markers {
            let cube = scene.cube_geometry();
            items.extend(scene.entities().filter_map(|entity| {
                let transform = scene.try_component::<Transform>(entity).ok()?;
                let light = scene.try_component::<Light>(entity).ok()?;
                let rotation = match light.kind {
                    LightKind::Point(_) => Quat::IDENTITY,
                    LightKind::Directional(_) => {
                        Quat::from_mat4(&transform.rotation_matrix())
                    }
                };
                let model = Mat4::from_scale_rotation_translation(
                    Vec3::splat(LIGHT_MARKER_SIZE),
                    rotation,
                    transform.location,
                );
                let color = light.color.clamp(Vec3::ZERO, Vec3::ONE);
                Some(DrawItem {
                    entity: Some(entity),
                    geometry: Arc::clone(cube),
                    object: ObjectUniforms::unlit(model, color),
                    selected: selection == Some(entity),
                })
            }));
        }

        if settings.show_particles {
            let cube = scene.cube_geometry();
            for system in scene.particle_systems() {
                let size = Vec3::splat(system.settings.size.max(0.0));
                items.extend(system.particles().iter().map(|particle| {
                    let model = Mat4::from_scale_rotation_translation(
                        size,
                        Quat::IDENTITY,
                        particle.position,
                    );
                    DrawItem {
                        entity: None,
                        geometry: Arc::clone(cube),
                        object: ObjectUniforms::unlit(model, system.color_of(particle)),
                        selected: false,
                    }
                }));
            }
        }

        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

fn mesh_item(scene: &Scene, entity: Entity, selection: Option<Entity>) -> Option<DrawItem> {
    let transform = scene.try_component::<Transform>(entity).ok()?;
    let mesh = scene.try_component::<MeshComponent>(entity).ok()?;
    Some(DrawItem {
        entity: Some(entity),
        geometry: Arc::clone(&mesh.geometry),
        object: ObjectUniforms::lit(transform.model_matrix(), &mesh.material.uniforms()),
        selected: selection == Some(entity),
    })
}
