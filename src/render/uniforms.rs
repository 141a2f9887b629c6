//! GPU uniform layouts and the CPU-side values that fill them.
//!
//! These structs mirror the WGSL structs in `shaders/scene.wgsl` and
//! `shaders/shadow.wgsl` field for field.

use glam::{Mat4, Vec3};

use crate::camera::Camera;
use crate::light::{Light, LightKind, ShadowResolution};
use crate::scene::{MaterialUniforms, Scene};

use super::RenderSettings;

/// Point lights beyond this many are ignored by the color pass.
pub const MAX_POINT_LIGHTS: usize = 8;

/// Everything the renderer caches about the shadow-casting light.
///
/// Rebuilt only by [`SceneRenderer::update_light`](super::SceneRenderer::update_light).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SunState {
    pub direction: Vec3,
    pub radiance: Vec3,
    pub light_view_proj: Mat4,
    pub soft: bool,
    pub resolution: ShadowResolution,
}

impl SunState {
    /// Shadow frusta are centered on the world origin.
    pub const FOCUS: Vec3 = Vec3::ZERO;

    pub fn from_scene(scene: &Scene) -> Option<Self> {
        let entity = scene.directional_light()?;
        let light = scene.try_component::<Light>(entity).ok()?;
        let directional = light.as_directional()?;
        Some(Self {
            direction: directional.direction(),
            radiance: light.radiance(),
            light_view_proj: directional.light_space_matrix(Self::FOCUS),
            soft: directional.soft,
            resolution: directional.resolution,
        })
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PointLightUniform {
    /// xyz position, w linear attenuation.
    pub position: [f32; 4],
    /// rgb radiance, w quadratic attenuation.
    pub color: [f32; 4],
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FrameUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub light_view_proj: [[f32; 4]; 4],
    pub camera_pos: [f32; 4],
    /// xyz travel direction of the sun, w is 1 when there is a sun.
    pub sun_direction: [f32; 4],
    /// rgb sun radiance, w ambient factor.
    pub sun_color: [f32; 4],
    /// bias, normal bias, shadow texel size, PCF radius.
    pub shadow_params: [f32; 4],
    pub outline_color: [f32; 4],
    /// point light count, shadows enabled, soft shadows, unused.
    pub counts: [u32; 4],
    pub point_lights: [PointLightUniform; MAX_POINT_LIGHTS],
}

impl FrameUniforms {
    pub fn new(
        scene: &Scene,
        camera: &Camera,
        sun: Option<&SunState>,
        settings: &RenderSettings,
        shadow_map_size: u32,
    ) -> Self {
        let mut point_lights = [PointLightUniform::default(); MAX_POINT_LIGHTS];
        let mut point_count = 0;
        for entity in scene.entities() {
            let Ok(light) = scene.try_component::<Light>(entity) else {
                continue;
            };
            let LightKind::Point(point) = &light.kind else {
                continue;
            };
            if point_count == MAX_POINT_LIGHTS {
                log::trace!("more than {MAX_POINT_LIGHTS} point lights, extra ones skipped");
                break;
            }
            let radiance = light.radiance();
            point_lights[point_count] = PointLightUniform {
                position: point.position().extend(point.linear()).to_array(),
                color: radiance.extend(point.quadratic()).to_array(),
            };
            point_count += 1;
        }

        let shadows = &settings.shadows;
        let renderer = &settings.renderer;
        let (sun_direction, sun_color, light_view_proj, soft) = match sun {
            Some(sun) => (
                sun.direction.extend(1.0),
                sun.radiance.extend(renderer.ambient),
                sun.light_view_proj,
                sun.soft,
            ),
            None => (
                Vec3::NEG_Y.extend(0.0),
                Vec3::ZERO.extend(renderer.ambient),
                Mat4::IDENTITY,
                false,
            ),
        };
        let cast_shadows = shadows.enabled && sun.is_some();

        Self {
            view_proj: camera.view_projection().to_cols_array_2d(),
            light_view_proj: light_view_proj.to_cols_array_2d(),
            camera_pos: camera.position().extend(1.0).to_array(),
            sun_direction: sun_direction.to_array(),
            sun_color: sun_color.to_array(),
            shadow_params: [
                shadows.bias,
                shadows.normal_bias,
                1.0 / shadow_map_size.max(1) as f32,
                shadows.kernel.radius() as f32,
            ],
            outline_color: Vec3::from(renderer.outline_color).extend(1.0).to_array(),
            counts: [point_count as u32, cast_shadows as u32, soft as u32, 0],
            point_lights,
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ShadowUniforms {
    pub light_view_proj: [[f32; 4]; 4],
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ObjectUniforms {
    pub model: [[f32; 4]; 4],
    pub normal_matrix: [[f32; 4]; 4],
    /// rgb diffuse, w roughness.
    pub diffuse: [f32; 4],
    /// shininess, unlit flag, outline scale, unused.
    pub params: [f32; 4],
}

impl ObjectUniforms {
    /// A lit mesh.
    pub fn lit(model: Mat4, material: &MaterialUniforms) -> Self {
        Self {
            model: model.to_cols_array_2d(),
            normal_matrix: normal_matrix(model).to_cols_array_2d(),
            diffuse: [
                material.diffuse[0],
                material.diffuse[1],
                material.diffuse[2],
                material.roughness,
            ],
            params: [material.shininess, 0.0, 1.0, 0.0],
        }
    }

    /// A flat-colored helper such as a light marker or particle.
    pub fn unlit(model: Mat4, color: Vec3) -> Self {
        Self {
            model: model.to_cols_array_2d(),
            normal_matrix: normal_matrix(model).to_cols_array_2d(),
            diffuse: color.extend(1.0).to_array(),
            params: [1.0, 1.0, 1.0, 0.0],
        }
    }

    pub fn with_outline_scale(mut self, scale: f32) -> Self {
        self.params[2] = scale;
        self
    }

    pub fn is_unlit(&self) -> bool {
        self.params[1] > 0.5
    }
}

fn normal_matrix(model: Mat4) -> Mat4 {
    if model.determinant().abs() > f32::EPSILON {
        model.inverse().transpose()
    } else {
        Mat4::IDENTITY
    }
}
