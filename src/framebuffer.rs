//! Off-screen render targets.
//!
//! A [`Framebuffer`] is a set of wgpu textures used as render attachments and
//! sampled afterwards. It comes in two kinds, fixed at creation:
//!
//! - [`FramebufferKind::Rendering`]: sRGB color plus depth-stencil, shown in
//!   the viewport panel as an image
//! - [`FramebufferKind::Depth`]: a single depth texture with a comparison
//!   sampler, read by the color pass for shadow lookups
//!
//! Resizing reallocates the textures but keeps the same `Framebuffer` value, so
//! anything holding it keeps working; [`Framebuffer::generation`] changes so
//! bind groups built from the old views can be rebuilt. GPU storage is
//! released by [`Framebuffer::free`], exactly once.
//!
//! The depth sampler clamps to edge; the shader treats coordinates outside
//! `[0, 1]` as lit, which is what border clamping would give.

use crate::error::{EditorError, Result};

/// Color format of rendering targets.
pub const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;
/// Depth-stencil format of rendering targets. The stencil marks the selection.
pub const DEPTH_STENCIL_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24PlusStencil8;
/// Format of shadow maps.
pub const SHADOW_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FramebufferKind {
    Rendering,
    Depth,
}

struct Attachment {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

pub struct Framebuffer {
    label: String,
    kind: FramebufferKind,
    width: u32,
    height: u32,
    color: Option<Attachment>,
    depth: Attachment,
    sampler: wgpu::Sampler,
    generation: u64,
    freed: bool,
}

impl std::fmt::Debug for Framebuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Framebuffer")
            .field("label", &self.label)
            .field("kind", &self.kind)
            .field("size", &(self.width, self.height))
            .field("generation", &self.generation)
            .field("freed", &self.freed)
            .finish()
    }
}

impl Framebuffer {
    /// Color + depth-stencil target.
    pub fn create_rendering_buffer(
        device: &wgpu::Device,
        label: &str,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        Self::create(device, label, FramebufferKind::Rendering, width, height)
    }

    /// Depth-only shadow target.
    pub fn create_depth_buffer(
        device: &wgpu::Device,
        label: &str,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        Self::create(device, label, FramebufferKind::Depth, width, height)
    }

    fn create(
        device: &wgpu::Device,
        label: &str,
        kind: FramebufferKind,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        let (width, height) = (width.max(1), height.max(1));
        let (color, depth) = allocate(device, label, kind, width, height)?;

        let sampler = match kind {
            FramebufferKind::Rendering => device.create_sampler(&wgpu::SamplerDescriptor {
                label: Some(label),
                mag_filter: wgpu::FilterMode::Linear,
                min_filter: wgpu::FilterMode::Linear,
                ..Default::default()
            }),
            FramebufferKind::Depth => device.create_sampler(&wgpu::SamplerDescriptor {
                label: Some(label),
                address_mode_u: wgpu::AddressMode::ClampToEdge,
                address_mode_v: wgpu::AddressMode::ClampToEdge,
                mag_filter: wgpu::FilterMode::Linear,
                min_filter: wgpu::FilterMode::Linear,
                compare: Some(wgpu::CompareFunction::LessEqual),
                ..Default::default()
            }),
        };

        log::debug!("created {kind:?} framebuffer '{label}' {width}x{height}");
        Ok(Self {
            label: label.to_owned(),
            kind,
            width,
            height,
            color,
            depth,
            sampler,
            generation: 0,
            freed: false,
        })
    }

    /// Reallocate storage at a new size, keeping the kind.
    ///
    /// Returns `Ok(false)` without touching the GPU when the size is unchanged.
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) -> Result<bool> {
        let (width, height) = (width.max(1), height.max(1));
        if (width, height) == (self.width, self.height) && !self.freed {
            return Ok(false);
        }

        let (color, depth) = allocate(device, &self.label, self.kind, width, height)?;
        self.release();
        self.color = color;
        self.depth = depth;
        self.width = width;
        self.height = height;
        self.generation += 1;
        self.freed = false;

        log::debug!("resized framebuffer '{}' to {width}x{height}", self.label);
        Ok(true)
    }

    /// Begin a render pass targeting this framebuffer.
    ///
    /// Clears every attachment and sets the viewport to the full target.
    /// The pass ends, and the target is unbound, when the returned value drops.
    pub fn bind<'e>(
        &'e self,
        encoder: &'e mut wgpu::CommandEncoder,
        clear_color: wgpu::Color,
    ) -> wgpu::RenderPass<'e> {
        let color_attachment = self.color.as_ref().map(|color| wgpu::RenderPassColorAttachment {
            view: &color.view,
            depth_slice: None,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(clear_color),
                store: wgpu::StoreOp::Store,
            },
        });
        let stencil_ops = (self.kind == FramebufferKind::Rendering).then_some(wgpu::Operations {
            load: wgpu::LoadOp::Clear(0),
            store: wgpu::StoreOp::Store,
        });

        // Depth-only targets take no color slot at all, not an empty one.
        let color_attachments = [color_attachment];
        let color_attachments: &[_] = if color_attachments[0].is_some() {
            &color_attachments
        } else {
            &[]
        };

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(&self.label),
            color_attachments,
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_viewport(0.0, 0.0, self.width as f32, self.height as f32, 0.0, 1.0);
        pass
    }

    /// Destroy the GPU textures. Later calls are ignored with a warning.
    pub fn free(&mut self) {
        if self.freed {
            log::warn!("framebuffer '{}' freed twice", self.label);
            return;
        }
        self.release();
        self.freed = true;
        log::debug!("freed framebuffer '{}'", self.label);
    }

    fn release(&mut self) {
        if let Some(color) = &self.color {
            color.texture.destroy();
        }
        self.depth.texture.destroy();
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn kind(&self) -> FramebufferKind {
        self.kind
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bumped on every reallocation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_freed(&self) -> bool {
        self.freed
    }

    /// Color view of a rendering target; `None` for depth targets.
    pub fn color_view(&self) -> Option<&wgpu::TextureView> {
        self.color.as_ref().map(|c| &c.view)
    }

    pub fn depth_view(&self) -> &wgpu::TextureView {
        &self.depth.view
    }

    pub fn sampler(&self) -> &wgpu::Sampler {
        &self.sampler
    }
}

impl Drop for Framebuffer {
    fn drop(&mut self) {
        if !self.freed {
            log::warn!("framebuffer '{}' dropped without free()", self.label);
        }
    }
}

fn allocate(
    device: &wgpu::Device,
    label: &str,
    kind: FramebufferKind,
    width: u32,
    height: u32,
) -> Result<(Option<Attachment>, Attachment)> {
    let max = device.limits().max_texture_dimension_2d;
    if width > max || height > max {
        let reason = format!("{width}x{height} exceeds the device limit of {max}");
        log::error!("framebuffer '{label}' is incomplete: {reason}");
        return Err(EditorError::IncompleteFramebuffer {
            label: label.to_owned(),
            reason,
        });
    }

    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let color = (kind == FramebufferKind::Rendering).then(|| {
        attachment(
            device,
            label,
            COLOR_FORMAT,
            width,
            height,
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        )
    });
    let depth = match kind {
        FramebufferKind::Rendering => attachment(
            device,
            label,
            DEPTH_STENCIL_FORMAT,
            width,
            height,
            wgpu::TextureUsages::RENDER_ATTACHMENT,
        ),
        FramebufferKind::Depth => attachment(
            device,
            label,
            SHADOW_FORMAT,
            width,
            height,
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        ),
    };

    if let Some(err) = pollster::block_on(device.pop_error_scope()) {
        log::error!("framebuffer '{label}' is incomplete: {err}");
        return Err(EditorError::IncompleteFramebuffer {
            label: label.to_owned(),
            reason: err.to_string(),
        });
    }
    Ok((color, depth))
}

fn attachment(
    device: &wgpu::Device,
    label: &str,
    format: wgpu::TextureFormat,
    width: u32,
    height: u32,
    usage: wgpu::TextureUsages,
) -> Attachment {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    Attachment { texture, view }
}
