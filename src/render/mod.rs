//! Scene rendering: a shadow depth pass followed by a lit color pass.
//!
//! The editor talks to rendering only through [`SceneRenderer`]. Every frame
//! it calls [`SceneRenderer::render_depth_pass`] and then
//! [`SceneRenderer::render_color_pass`], in that order, and shows
//! [`SceneRenderer::viewport_texture`] as an image. Viewport and shadow map
//! sizes are independent: the viewport follows the panel, the shadow map
//! follows the active directional light's resolution setting.
//!
//! - [`GpuSceneRenderer`]: the wgpu implementation
//! - [`RecordingRenderer`]: a GPU-free implementation that records calls

mod draw_list;
mod gpu;
mod recording;
mod uniforms;

use hecs::Entity;

use crate::camera::Camera;
use crate::error::Result;
use crate::light::ShadowResolution;
use crate::scene::Scene;

pub use draw_list::{DrawItem, DrawList, LIGHT_MARKER_SIZE};
pub use gpu::GpuSceneRenderer;
pub use recording::{RecordingRenderer, RenderCall};
pub use uniforms::{
    FrameUniforms, MAX_POINT_LIGHTS, ObjectUniforms, PointLightUniform, ShadowUniforms, SunState,
};

/// The render seam between the editor and the GPU.
pub trait SceneRenderer {
    /// Resize the viewport target. A call with the current size does nothing
    /// and returns `Ok(false)`.
    fn resize_viewport(&mut self, width: u32, height: u32) -> Result<bool>;

    fn viewport_size(&self) -> (u32, u32);

    /// Resize the shadow map. A call with the current resolution does nothing
    /// and returns `Ok(false)`.
    fn resize_shadow_map(&mut self, resolution: ShadowResolution) -> Result<bool>;

    /// Edge length of the shadow map in texels.
    fn shadow_map_size(&self) -> u32;

    /// Re-derive cached directional light state after a light edit.
    ///
    /// Also applies a changed shadow resolution. Nothing else re-reads the
    /// directional light, so edits are invisible until this runs.
    fn update_light(&mut self, scene: &Scene) -> Result<()>;

    /// Rasterize shadow casters from the directional light into the shadow map.
    fn render_depth_pass(&mut self, scene: &Scene);

    /// Draw the scene from `camera` into the viewport target, sampling the
    /// shadow map from the preceding depth pass.
    fn render_color_pass(&mut self, scene: &Scene, camera: &Camera, selection: Option<Entity>);

    /// GUI handle of the viewport image, once registered.
    fn viewport_texture(&self) -> Option<egui::TextureId>;

    fn settings(&self) -> &RenderSettings;

    fn settings_mut(&mut self) -> &mut RenderSettings;

    /// Release GPU targets. Called once at teardown.
    fn free(&mut self);
}

/// Look of the color pass.
#[derive(Clone, Debug, PartialEq)]
pub struct RendererSettings {
    pub clear_color: [f32; 3],
    /// Fraction of the diffuse color that is always visible.
    pub ambient: f32,
    pub show_light_markers: bool,
    pub show_particles: bool,
    pub outline_selection: bool,
    pub outline_color: [f32; 3],
    /// Outline hull scale relative to the selected mesh.
    pub outline_scale: f32,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            clear_color: [0.11, 0.11, 0.13],
            ambient: 0.12,
            show_light_markers: true,
            show_particles: true,
            outline_selection: true,
            outline_color: [1.0, 0.6, 0.1],
            outline_scale: 1.04,
        }
    }
}

/// Percentage-closer filter footprint for soft shadows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum PcfKernel {
    X3,
    #[default]
    X5,
    X7,
}

impl PcfKernel {
    pub const ALL: [PcfKernel; 3] = [PcfKernel::X3, PcfKernel::X5, PcfKernel::X7];

    /// Taps on each side of the center texel.
    pub fn radius(self) -> u32 {
        match self {
            PcfKernel::X3 => 1,
            PcfKernel::X5 => 2,
            PcfKernel::X7 => 3,
        }
    }
}

impl std::fmt::Display for PcfKernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let side = self.radius() * 2 + 1;
        write!(f, "{side}x{side}")
    }
}

/// Shadow lookup parameters. Map size and softness live on the light itself.
#[derive(Clone, Debug, PartialEq)]
pub struct ShadowSettings {
    pub enabled: bool,
    /// Depth offset subtracted before comparison.
    pub bias: f32,
    /// World-space offset along the surface normal before projecting.
    pub normal_bias: f32,
    pub kernel: PcfKernel,
}

impl Default for ShadowSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            bias: 0.002,
            normal_bias: 0.02,
            kernel: PcfKernel::default(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderSettings {
    pub renderer: RendererSettings,
    pub shadows: ShadowSettings,
}
