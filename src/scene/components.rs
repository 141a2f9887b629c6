//! Component types stored on scene entities.
//!
//! The set is closed: [`Label`], [`Transform`](crate::Transform),
//! [`MeshComponent`] and [`Light`](crate::Light). Duplication and the inspector
//! panels enumerate exactly these.

use std::sync::Arc;

use bytemuck::Zeroable;
use glam::Vec3;

use crate::geometry::Geometry;

/// Display name and outliner group of an entity.
///
/// Names are unique within a scene; [`Scene`](super::Scene) enforces that on
/// creation, rename and duplication.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Label {
    pub name: String,
    /// Index into [`Scene::groups`](super::Scene::groups).
    pub group_id: usize,
}

impl Label {
    pub fn new(name: impl Into<String>, group_id: usize) -> Self {
        Self {
            name: name.into(),
            group_id,
        }
    }
}

/// Drawable geometry plus the material it is shaded with.
///
/// Geometry is shared between entities; the material is owned, so cloning a
/// component gives the copy its own material.
#[derive(Clone, Debug)]
pub struct MeshComponent {
    pub geometry: Arc<Geometry>,
    pub material: Material,
}

impl MeshComponent {
    pub fn new(geometry: Arc<Geometry>) -> Self {
        Self {
            geometry,
            material: Material::default(),
        }
    }

    pub fn with_material(mut self, material: Material) -> Self {
        self.material = material;
        self
    }
}

/// Material values as laid out in the per-draw uniform block.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniforms {
    pub diffuse: [f32; 3],
    pub roughness: f32,
    pub shininess: f32,
    pub _padding: [f32; 3],
}

/// Flat-color material with a roughness-derived specular exponent.
///
/// `diffuse` and `roughness` are public so GUI widgets can edit them in place.
/// After such an edit the matching hook ([`Material::update_diffuse`],
/// [`Material::update_roughness`]) must run; it refreshes the derived shininess
/// and the cached uniform block the renderer uploads.
#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    pub diffuse: Vec3,
    pub roughness: f32,
    shininess: f32,
    uniforms: MaterialUniforms,
}

impl Default for Material {
    fn default() -> Self {
        Self::new(Vec3::splat(0.8), 0.5)
    }
}

impl Material {
    pub const MAX_SHININESS: f32 = 1024.0;

    pub fn new(diffuse: Vec3, roughness: f32) -> Self {
        let mut material = Self {
            diffuse,
            roughness,
            shininess: 0.0,
            uniforms: MaterialUniforms::zeroed(),
        };
        material.update_roughness();
        material.update_diffuse();
        material
    }

    pub fn set_diffuse(&mut self, diffuse: Vec3) {
        self.diffuse = diffuse;
        self.update_diffuse();
    }

    pub fn set_roughness(&mut self, roughness: f32) {
        self.roughness = roughness;
        self.update_roughness();
    }

    /// Refresh cached state after `diffuse` changed.
    pub fn update_diffuse(&mut self) {
        self.uniforms.diffuse = self.diffuse.to_array();
    }

    /// Clamp `roughness` to `[0, 1]` and re-derive shininess.
    ///
    /// Shininess is the Blinn-Phong exponent `2 / r^2 - 2`, kept within
    /// `[1, MAX_SHININESS]`.
    pub fn update_roughness(&mut self) {
        self.roughness = self.roughness.clamp(0.0, 1.0);
        let r2 = self.roughness * self.roughness;
        self.shininess = if r2 > 0.0 {
            (2.0 / r2 - 2.0).clamp(1.0, Self::MAX_SHININESS)
        } else {
            Self::MAX_SHININESS
        };
        self.uniforms.roughness = self.roughness;
        self.uniforms.shininess = self.shininess;
    }

    pub fn shininess(&self) -> f32 {
        self.shininess
    }

    pub fn uniforms(&self) -> MaterialUniforms {
        self.uniforms
    }
}

/// Entities the "Add" menu can create.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BaseEntityKind {
    Plane,
    Cube,
    PointLight,
    DirectionalLight,
}

impl BaseEntityKind {
    pub fn default_name(self) -> &'static str {
        match self {
            BaseEntityKind::Plane => "Plane",
            BaseEntityKind::Cube => "Cube",
            BaseEntityKind::PointLight => "Point Light",
            BaseEntityKind::DirectionalLight => "Directional Light",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roughness_hook_derives_shininess() {
        let mut material = Material::default();
        material.roughness = 0.5;
        material.update_roughness();
        assert_eq!(material.shininess(), 6.0);
        assert_eq!(material.uniforms().shininess, 6.0);
    }

    #[test]
    fn field_edit_is_invisible_until_hook_runs() {
        let mut material = Material::default();
        material.diffuse = Vec3::new(1.0, 0.0, 0.0);
        assert_ne!(material.uniforms().diffuse, [1.0, 0.0, 0.0]);
        material.update_diffuse();
        assert_eq!(material.uniforms().diffuse, [1.0, 0.0, 0.0]);
    }

    #[test]
    fn extreme_roughness_stays_in_range() {
        let mut material = Material::default();
        material.set_roughness(0.0);
        assert_eq!(material.shininess(), Material::MAX_SHININESS);
        material.set_roughness(4.0);
        assert_eq!(material.roughness, 1.0);
        assert_eq!(material.shininess(), 1.0);
    }

    #[test]
    fn cloned_mesh_component_owns_its_material() {
        let original = MeshComponent::new(Geometry::cube());
        let mut copy = original.clone();
        copy.material.set_diffuse(Vec3::ZERO);

        assert!(Arc::ptr_eq(&original.geometry, &copy.geometry));
        assert_ne!(original.material, copy.material);
    }
}
