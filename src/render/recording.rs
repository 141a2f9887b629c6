use hecs::Entity;

use crate::camera::Camera;
use crate::error::Result;
use crate::light::ShadowResolution;
use crate::scene::Scene;

use super::draw_list::DrawList;
use super::uniforms::SunState;
use super::{RenderSettings, SceneRenderer};

/// One observed call on a [`RecordingRenderer`].
#[derive(Clone, Debug, PartialEq)]
pub enum RenderCall {
    ResizeViewport { width: u32, height: u32 },
    ResizeShadowMap(u32),
    UpdateLight,
    DepthPass { casters: usize },
    ColorPass { items: usize, selection: Option<Entity> },
    Free,
}

/// A [`SceneRenderer`] without a GPU.
///
/// Sizes, the cached sun and allocation counts behave like the real renderer;
/// drawing is replaced by recording what would have been drawn.
#[derive(Debug)]
pub struct RecordingRenderer {
    pub calls: Vec<RenderCall>,
    viewport: (u32, u32),
    shadow_map: u32,
    viewport_allocations: usize,
    shadow_allocations: usize,
    sun: Option<SunState>,
    settings: RenderSettings,
    freed: bool,
}

impl Default for RecordingRenderer {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

impl RecordingRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            calls: Vec::new(),
            viewport: (width.max(1), height.max(1)),
            shadow_map: ShadowResolution::default().texels(),
            viewport_allocations: 1,
            shadow_allocations: 1,
            sun: None,
            settings: RenderSettings::default(),
            freed: false,
        }
    }

    /// Number of times the viewport target was allocated, creation included.
    pub fn viewport_allocations(&self) -> usize {
        self.viewport_allocations
    }

    pub fn shadow_allocations(&self) -> usize {
        self.shadow_allocations
    }

    pub fn sun(&self) -> Option<&SunState> {
        self.sun.as_ref()
    }

    pub fn is_freed(&self) -> bool {
        self.freed
    }

    /// Calls of a pass, in order, without the bookkeeping ones.
    pub fn passes(&self) -> Vec<&RenderCall> {
        self.calls
            .iter()
            .filter(|call| {
                matches!(
                    call,
                    RenderCall::DepthPass { .. } | RenderCall::ColorPass { .. }
                )
            })
            .collect()
    }
}

impl SceneRenderer for RecordingRenderer {
    fn resize_viewport(&mut self, width: u32, height: u32) -> Result<bool> {
        let size = (width.max(1), height.max(1));
        if size == self.viewport {
            return Ok(false);
        }
        self.viewport = size;
        self.viewport_allocations += 1;
        self.calls.push(RenderCall::ResizeViewport {
            width: size.0,
            height: size.1,
        });
        Ok(true)
    }

    fn viewport_size(&self) -> (u32, u32) {
        self.viewport
    }

    fn resize_shadow_map(&mut self, resolution: ShadowResolution) -> Result<bool> {
        if resolution.texels() == self.shadow_map {
            return Ok(false);
        }
        self.shadow_map = resolution.texels();
        self.shadow_allocations += 1;
        self.calls.push(RenderCall::ResizeShadowMap(self.shadow_map));
        Ok(true)
    }

    fn shadow_map_size(&self) -> u32 {
        self.shadow_map
    }

    fn update_light(&mut self, scene: &Scene) -> Result<()> {
        self.calls.push(RenderCall::UpdateLight);
        self.sun = SunState::from_scene(scene);
        if let Some(resolution) = self.sun.map(|sun| sun.resolution) {
            self.resize_shadow_map(resolution)?;
        }
        Ok(())
    }

    fn render_depth_pass(&mut self, scene: &Scene) {
        let casters = DrawList::shadow_casters(scene).len();
        self.calls.push(RenderCall::DepthPass { casters });
    }

    fn render_color_pass(&mut self, scene: &Scene, _camera: &Camera, selection: Option<Entity>) {
        let items = DrawList::color(scene, selection, &self.settings.renderer).len();
        self.calls.push(RenderCall::ColorPass { items, selection });
    }

    fn viewport_texture(&self) -> Option<egui::TextureId> {
        Some(egui::TextureId::User(0))
    }

    fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    fn settings_mut(&mut self) -> &mut RenderSettings {
        &mut self.settings
    }

    fn free(&mut self) {
        if !self.freed {
            self.freed = true;
            self.calls.push(RenderCall::Free);
        }
    }
}
