//! Point and directional lights.
//!
//! A [`Light`] is a component: shared color and intensity plus a [`LightKind`]
//! carrying the fields of one variant. Derived values (point attenuation,
//! directional direction) are recomputed by their setters only, so the render path
//! can read them every frame without redoing the math.

use glam::{Mat4, Vec3};

use crate::transform::Transform;

/// Smallest and largest radius the inspector offers for point lights.
pub const POINT_RADIUS_RANGE: std::ops::RangeInclusive<f32> = 7.0..=600.0;

/// Light component attached to an entity.
#[derive(Clone, Debug, PartialEq)]
pub struct Light {
    /// Linear RGB color.
    pub color: Vec3,
    /// Non-negative multiplier on `color`.
    pub intensity: f32,
    pub kind: LightKind,
}

#[derive(Clone, Debug, PartialEq)]
pub enum LightKind {
    Point(PointLight),
    Directional(DirectionalLight),
}

impl Light {
    pub fn point(radius: f32) -> Self {
        Self {
            color: Vec3::ONE,
            intensity: 1.0,
            kind: LightKind::Point(PointLight::new(radius)),
        }
    }

    pub fn directional() -> Self {
        Self {
            color: Vec3::ONE,
            intensity: 1.0,
            kind: LightKind::Directional(DirectionalLight::default()),
        }
    }

    pub fn with_color(mut self, color: Vec3) -> Self {
        self.color = color;
        self
    }

    pub fn with_intensity(mut self, intensity: f32) -> Self {
        self.set_intensity(intensity);
        self
    }

    /// Negative values are clamped to zero.
    pub fn set_intensity(&mut self, intensity: f32) {
        self.intensity = intensity.max(0.0);
    }

    /// `color * intensity`, what the shader actually receives.
    pub fn radiance(&self) -> Vec3 {
        self.color * self.intensity
    }

    pub fn as_point(&self) -> Option<&PointLight> {
        match &self.kind {
            LightKind::Point(point) => Some(point),
            LightKind::Directional(_) => None,
        }
    }

    pub fn as_point_mut(&mut self) -> Option<&mut PointLight> {
        match &mut self.kind {
            LightKind::Point(point) => Some(point),
            LightKind::Directional(_) => None,
        }
    }

    pub fn as_directional(&self) -> Option<&DirectionalLight> {
        match &self.kind {
            LightKind::Directional(directional) => Some(directional),
            LightKind::Point(_) => None,
        }
    }

    pub fn as_directional_mut(&mut self) -> Option<&mut DirectionalLight> {
        match &mut self.kind {
            LightKind::Directional(directional) => Some(directional),
            LightKind::Point(_) => None,
        }
    }

    /// Copy placement from the owning entity's transform into the light's cache.
    pub fn sync_transform(&mut self, transform: &Transform) {
        match &mut self.kind {
            LightKind::Point(point) => point.set_position(transform.location),
            LightKind::Directional(directional) => directional.set_rotation(transform.rotation),
        }
    }
}

/// Omni light with distance attenuation.
#[derive(Clone, Debug, PartialEq)]
pub struct PointLight {
    radius: f32,
    linear: f32,
    quadratic: f32,
    position: Vec3,
}

impl PointLight {
    pub fn new(radius: f32) -> Self {
        let mut light = Self {
            radius,
            linear: 0.0,
            quadratic: 0.0,
            position: Vec3::ZERO,
        };
        light.set_radius(radius);
        light
    }

    /// Set the reach of the light and recompute the attenuation terms.
    ///
    /// `linear = 4.5 / r` and `quadratic = 75 / r^2`, which leaves roughly 1% of
    /// the intensity at distance `r`. The radius is clamped to [`POINT_RADIUS_RANGE`].
    pub fn set_radius(&mut self, radius: f32) {
        let radius = radius.clamp(*POINT_RADIUS_RANGE.start(), *POINT_RADIUS_RANGE.end());
        self.radius = radius;
        self.linear = 4.5 / radius;
        self.quadratic = 75.0 / (radius * radius);
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn linear(&self) -> f32 {
        self.linear
    }

    pub fn quadratic(&self) -> f32 {
        self.quadratic
    }

    /// Attenuation factor at `distance` from the light.
    pub fn attenuation(&self, distance: f32) -> f32 {
        1.0 / (1.0 + self.linear * distance + self.quadratic * distance * distance)
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }
}

/// Shadow map edge length in texels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ShadowResolution {
    R1024,
    #[default]
    R2048,
    R4096,
}

impl ShadowResolution {
    pub const ALL: [ShadowResolution; 3] = [
        ShadowResolution::R1024,
        ShadowResolution::R2048,
        ShadowResolution::R4096,
    ];

    pub fn texels(self) -> u32 {
        match self {
            ShadowResolution::R1024 => 1024,
            ShadowResolution::R2048 => 2048,
            ShadowResolution::R4096 => 4096,
        }
    }
}

impl std::fmt::Display for ShadowResolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.texels())
    }
}

/// Sun-like light with an orthographic shadow frustum.
#[derive(Clone, Debug, PartialEq)]
pub struct DirectionalLight {
    rotation: Vec3,
    direction: Vec3,
    /// Half extent of the orthographic frustum.
    pub size: f32,
    pub near: f32,
    pub far: f32,
    /// How far back along the light direction the shadow camera sits.
    pub offset: f32,
    pub resolution: ShadowResolution,
    /// Filter shadow edges instead of a single hard comparison.
    pub soft: bool,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        let mut light = Self {
            rotation: Vec3::ZERO,
            direction: Vec3::NEG_Z,
            size: 20.0,
            near: 0.1,
            far: 100.0,
            offset: 40.0,
            resolution: ShadowResolution::default(),
            soft: true,
        };
        light.set_rotation(Vec3::new(-60.0, 30.0, 0.0));
        light
    }
}

impl DirectionalLight {
    /// Euler degrees, same convention as [`Transform::rotation`].
    pub fn rotation(&self) -> Vec3 {
        self.rotation
    }

    /// Set the orientation and recompute the travel direction of the light.
    pub fn set_rotation(&mut self, degrees: Vec3) {
        self.rotation = degrees;
        let rotation = Transform::new().rotation(degrees).rotation_matrix();
        self.direction = rotation.transform_vector3(Vec3::NEG_Z).normalize_or(Vec3::NEG_Y);
    }

    /// Unit vector the light travels along.
    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    /// View matrix of the shadow camera looking at `focus`.
    pub fn light_view(&self, focus: Vec3) -> Mat4 {
        let eye = focus - self.direction * self.offset;
        let up = if self.direction.cross(Vec3::Y).length_squared() < 1e-6 {
            Vec3::Z
        } else {
            Vec3::Y
        };
        Mat4::look_at_rh(eye, focus, up)
    }

    pub fn light_projection(&self) -> Mat4 {
        Mat4::orthographic_rh(
            -self.size, self.size, -self.size, self.size, self.near, self.far,
        )
    }

    /// Light-space view-projection used by the depth pass and for shadow lookups.
    pub fn light_space_matrix(&self, focus: Vec3) -> Mat4 {
        self.light_projection() * self.light_view(focus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attenuation_is_pure_function_of_radius() {
        let mut light = PointLight::new(50.0);
        let first = (light.linear(), light.quadratic());

        light.set_radius(300.0);
        light.set_radius(12.0);
        light.set_radius(50.0);
        assert_eq!((light.linear(), light.quadratic()), first);

        let other = PointLight::new(50.0);
        assert_eq!((other.linear(), other.quadratic()), first);
        assert_eq!(first, (4.5 / 50.0, 75.0 / 2500.0));
    }

    #[test]
    fn attenuation_falls_with_distance() {
        let light = PointLight::new(50.0);
        assert_eq!(light.attenuation(0.0), 1.0);
        assert!(light.attenuation(10.0) > light.attenuation(40.0));
        assert!(light.attenuation(50.0) < 0.05);
    }

    #[test]
    fn radius_is_clamped() {
        let mut light = PointLight::new(1.0);
        assert_eq!(light.radius(), 7.0);
        light.set_radius(10_000.0);
        assert_eq!(light.radius(), 600.0);
    }

    #[test]
    fn intensity_is_never_negative() {
        let light = Light::point(50.0).with_intensity(-3.0);
        assert_eq!(light.intensity, 0.0);
    }

    #[test]
    fn directional_rotation_drives_direction() {
        let mut light = DirectionalLight::default();
        light.set_rotation(Vec3::new(-90.0, 0.0, 0.0));
        assert!((light.direction() - Vec3::NEG_Y).length() < 1e-5);

        light.set_rotation(Vec3::ZERO);
        assert!((light.direction() - Vec3::NEG_Z).length() < 1e-5);
    }

    #[test]
    fn light_space_matrix_maps_focus_inside_frustum() {
        let light = DirectionalLight::default();
        let clip = light.light_space_matrix(Vec3::ZERO).project_point3(Vec3::ZERO);
        assert!(clip.x.abs() < 1e-4 && clip.y.abs() < 1e-4);
        assert!(clip.z > 0.0 && clip.z < 1.0);
    }

    #[test]
    fn straight_down_light_has_valid_view() {
        let mut light = DirectionalLight::default();
        light.set_rotation(Vec3::new(-90.0, 0.0, 0.0));
        assert!(light.light_space_matrix(Vec3::ZERO).is_finite());
    }

    #[test]
    fn sync_transform_updates_variant_cache() {
        let transform = Transform::from_location(Vec3::new(1.0, 2.0, 3.0));
        let mut point = Light::point(50.0);
        point.sync_transform(&transform);
        assert_eq!(point.as_point().map(PointLight::position), Some(transform.location));
    }
}
