use std::collections::{HashMap, HashSet};
use std::num::NonZeroU64;

use hecs::Entity;

use crate::camera::Camera;
use crate::error::Result;
use crate::framebuffer::{COLOR_FORMAT, DEPTH_STENCIL_FORMAT, Framebuffer, SHADOW_FORMAT};
use crate::geometry::GeometryId;
use crate::gpu::GpuContext;
use crate::light::ShadowResolution;
use crate::mesh::{Mesh, Vertex3d};
use crate::scene::Scene;

use super::draw_list::DrawList;
use super::uniforms::{FrameUniforms, ObjectUniforms, ShadowUniforms, SunState};
use super::{RenderSettings, SceneRenderer};

const SELECTION_STENCIL: u32 = 1;

/// Per-draw uniforms packed at aligned offsets in one buffer.
///
/// Each draw binds its slice with a dynamic offset, so every object keeps its
/// own model matrix and material within a single submission.
struct ObjectBuffer {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    stride: u64,
    capacity: usize,
}

impl ObjectBuffer {
    fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, capacity: usize) -> Self {
        let align = device.limits().min_uniform_buffer_offset_alignment as u64;
        let size = std::mem::size_of::<ObjectUniforms>() as u64;
        let stride = size.div_ceil(align) * align;
        let capacity = capacity.max(1);

        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Object Uniforms"),
            size: stride * capacity as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Object Bind Group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: NonZeroU64::new(size),
                }),
            }],
        });

        Self {
            buffer,
            bind_group,
            stride,
            capacity,
        }
    }

    fn offset(&self, index: usize) -> u32 {
        (self.stride * index as u64) as u32
    }

    fn write(&self, queue: &wgpu::Queue, objects: &[ObjectUniforms]) {
        let mut bytes = vec![0u8; self.stride as usize * objects.len()];
        for (i, object) in objects.iter().enumerate() {
            let start = i * self.stride as usize;
            let data = bytemuck::bytes_of(object);
            bytes[start..start + data.len()].copy_from_slice(data);
        }
        if !bytes.is_empty() {
            queue.write_buffer(&self.buffer, 0, &bytes);
        }
    }
}

struct Pipelines {
    color: wgpu::RenderPipeline,
    selected: wgpu::RenderPipeline,
    outline: wgpu::RenderPipeline,
    shadow: wgpu::RenderPipeline,
}

/// The wgpu [`SceneRenderer`].
///
/// Bind groups:
/// - **Group 0**: frame uniforms, shadow map and comparison sampler (color
///   pass), or the light matrix alone (depth pass)
/// - **Group 1**: per-draw object uniforms at a dynamic offset
pub struct GpuSceneRenderer {
    device: wgpu::Device,
    queue: wgpu::Queue,
    settings: RenderSettings,
    viewport: Framebuffer,
    shadow_map: Framebuffer,
    pipelines: Pipelines,
    frame_uniforms: wgpu::Buffer,
    frame_layout: wgpu::BindGroupLayout,
    frame_bind_group: wgpu::BindGroup,
    frame_bind_generation: u64,
    shadow_uniforms: wgpu::Buffer,
    shadow_bind_group: wgpu::BindGroup,
    object_layout: wgpu::BindGroupLayout,
    objects: ObjectBuffer,
    meshes: HashMap<GeometryId, Mesh>,
    sun: Option<SunState>,
    texture_id: Option<egui::TextureId>,
    registered_generation: u64,
    freed: bool,
}

impl GpuSceneRenderer {
    pub fn new(gpu: &GpuContext, width: u32, height: u32) -> Result<Self> {
        let device = gpu.device.clone();
        let queue = gpu.queue.clone();

        let viewport = Framebuffer::create_rendering_buffer(&device, "Viewport", width, height)?;
        let texels = ShadowResolution::default().texels();
        let shadow_map = Framebuffer::create_depth_buffer(&device, "Shadow Map", texels, texels)?;

        let frame_uniforms = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Frame Uniforms"),
            size: std::mem::size_of::<FrameUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let frame_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Frame Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Depth,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                    count: None,
                },
            ],
        });
        let frame_bind_group =
            create_frame_bind_group(&device, &frame_layout, &frame_uniforms, &shadow_map);

        let shadow_uniforms = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Shadow Uniforms"),
            size: std::mem::size_of::<ShadowUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let shadow_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Shadow Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });
        let shadow_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Shadow Bind Group"),
            layout: &shadow_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: shadow_uniforms.as_entire_binding(),
            }],
        });

        let object_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Object Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(std::mem::size_of::<ObjectUniforms>() as u64),
                },
                count: None,
            }],
        });
        let objects = ObjectBuffer::new(&device, &object_layout, 64);

        let pipelines = create_pipelines(&device, &frame_layout, &shadow_layout, &object_layout);

        Ok(Self {
            device,
            queue,
            settings: RenderSettings::default(),
            viewport,
            shadow_map,
            pipelines,
            frame_uniforms,
            frame_layout,
            frame_bind_group,
            frame_bind_generation: 0,
            shadow_uniforms,
            shadow_bind_group,
            object_layout,
            objects,
            meshes: HashMap::new(),
            sun: None,
            texture_id: None,
            registered_generation: 0,
            freed: false,
        })
    }

    /// Point the GUI's viewport image at the current color target.
    ///
    /// Registers the texture on first use and re-points the same id after the
    /// target was reallocated. Call after the GUI frame, before painting.
    pub fn sync_viewport_texture(&mut self, painter: &mut egui_wgpu::Renderer) {
        let Some(view) = self.viewport.color_view() else {
            return;
        };
        match self.texture_id {
            None => {
                let id = painter.register_native_texture(&self.device, view, wgpu::FilterMode::Linear);
                self.texture_id = Some(id);
                self.registered_generation = self.viewport.generation();
            }
            Some(id) if self.registered_generation != self.viewport.generation() => {
                painter.update_egui_texture_from_wgpu_texture(
                    &self.device,
                    view,
                    wgpu::FilterMode::Linear,
                    id,
                );
                self.registered_generation = self.viewport.generation();
            }
            Some(_) => {}
        }
    }

    /// Forget the GUI registration of the viewport image.
    pub fn release_viewport_texture(&mut self, painter: &mut egui_wgpu::Renderer) {
        if let Some(id) = self.texture_id.take() {
            painter.free_texture(&id);
        }
    }

    /// Upload unseen geometry and write per-draw uniforms for `list`.
    fn prepare(&mut self, list: &DrawList, outline_scale: f32) {
        for item in &list.items {
            self.meshes
                .entry(item.geometry.id())
                .or_insert_with(|| Mesh::upload(&self.device, &item.geometry));
        }

        if list.len() > self.objects.capacity {
            let capacity = list.len().next_power_of_two();
            log::debug!("growing object uniforms to {capacity} slots");
            self.objects = ObjectBuffer::new(&self.device, &self.object_layout, capacity);
        }

        let objects: Vec<ObjectUniforms> = list
            .items
            .iter()
            .map(|item| {
                let scale = if item.selected { outline_scale } else { 1.0 };
                item.object.with_outline_scale(scale)
            })
            .collect();
        self.objects.write(&self.queue, &objects);
    }

    fn refresh_frame_bind_group(&mut self) {
        if self.frame_bind_generation != self.shadow_map.generation() {
            self.frame_bind_group = create_frame_bind_group(
                &self.device,
                &self.frame_layout,
                &self.frame_uniforms,
                &self.shadow_map,
            );
            self.frame_bind_generation = self.shadow_map.generation();
        }
    }
}

impl SceneRenderer for GpuSceneRenderer {
    fn resize_viewport(&mut self, width: u32, height: u32) -> Result<bool> {
        self.viewport.resize(&self.device, width, height)
    }

    fn viewport_size(&self) -> (u32, u32) {
        (self.viewport.width(), self.viewport.height())
    }

    fn resize_shadow_map(&mut self, resolution: ShadowResolution) -> Result<bool> {
        let texels = resolution.texels();
        let resized = self.shadow_map.resize(&self.device, texels, texels)?;
        if resized {
            log::info!("shadow map resolution set to {resolution}");
        }
        Ok(resized)
    }

    fn shadow_map_size(&self) -> u32 {
        self.shadow_map.width()
    }

    fn update_light(&mut self, scene: &Scene) -> Result<()> {
        self.sun = SunState::from_scene(scene);
        if let Some(sun) = self.sun {
            self.resize_shadow_map(sun.resolution)?;
        }
        log::trace!("light state refreshed: {:?}", self.sun.map(|s| s.direction));
        Ok(())
    }

    fn render_depth_pass(&mut self, scene: &Scene) {
        let list = DrawList::shadow_casters(scene);
        self.prepare(&list, 1.0);

        let light_view_proj = self
            .sun
            .map(|sun| sun.light_view_proj)
            .unwrap_or(glam::Mat4::IDENTITY);
        self.queue.write_buffer(
            &self.shadow_uniforms,
            0,
            bytemuck::bytes_of(&ShadowUniforms {
                light_view_proj: light_view_proj.to_cols_array_2d(),
            }),
        );

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Depth Pass Encoder"),
            });
        {
            let mut pass = self.shadow_map.bind(&mut encoder, wgpu::Color::BLACK);
            if self.sun.is_some() && self.settings.shadows.enabled {
                pass.set_pipeline(&self.pipelines.shadow);
                pass.set_bind_group(0, &self.shadow_bind_group, &[]);
                for (i, item) in list.items.iter().enumerate() {
                    let Some(mesh) = self.meshes.get(&item.geometry.id()) else {
                        continue;
                    };
                    pass.set_bind_group(1, &self.objects.bind_group, &[self.objects.offset(i)]);
                    mesh.draw(&mut pass);
                }
            }
        }
        self.queue.submit(std::iter::once(encoder.finish()));
    }

    fn render_color_pass(&mut self, scene: &Scene, camera: &Camera, selection: Option<Entity>) {
        let list = DrawList::color(scene, selection, &self.settings.renderer);
        self.prepare(&list, self.settings.renderer.outline_scale);
        self.refresh_frame_bind_group();

        let frame = FrameUniforms::new(
            scene,
            camera,
            self.sun.as_ref(),
            &self.settings,
            self.shadow_map.width(),
        );
        self.queue
            .write_buffer(&self.frame_uniforms, 0, bytemuck::bytes_of(&frame));

        let [r, g, b] = self.settings.renderer.clear_color;
        let clear = wgpu::Color {
            r: r as f64,
            g: g as f64,
            b: b as f64,
            a: 1.0,
        };
        let outline = self.settings.renderer.outline_selection;

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Color Pass Encoder"),
            });
        {
            let mut pass = self.viewport.bind(&mut encoder, clear);
            pass.set_bind_group(0, &self.frame_bind_group, &[]);
            pass.set_stencil_reference(SELECTION_STENCIL);

            for (i, item) in list.items.iter().enumerate() {
                let Some(mesh) = self.meshes.get(&item.geometry.id()) else {
                    continue;
                };
                let pipeline = if item.selected && outline {
                    &self.pipelines.selected
                } else {
                    &self.pipelines.color
                };
                pass.set_pipeline(pipeline);
                pass.set_bind_group(1, &self.objects.bind_group, &[self.objects.offset(i)]);
                mesh.draw(&mut pass);
            }

            if outline {
                pass.set_pipeline(&self.pipelines.outline);
                for (i, item) in list.items.iter().enumerate().filter(|(_, item)| item.selected) {
                    let Some(mesh) = self.meshes.get(&item.geometry.id()) else {
                        continue;
                    };
                    pass.set_bind_group(1, &self.objects.bind_group, &[self.objects.offset(i)]);
                    mesh.draw(&mut pass);
                }
            }
        }
        self.queue.submit(std::iter::once(encoder.finish()));

        let live: HashSet<GeometryId> = list.items.iter().map(|item| item.geometry.id()).collect();
        self.meshes.retain(|id, _| live.contains(id));
    }

    fn viewport_texture(&self) -> Option<egui::TextureId> {
        self.texture_id
    }

    fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    fn settings_mut(&mut self) -> &mut RenderSettings {
        &mut self.settings
    }

    fn free(&mut self) {
        if self.freed {
            return;
        }
        self.viewport.free();
        self.shadow_map.free();
        self.meshes.clear();
        self.freed = true;
    }
}

fn create_frame_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    uniforms: &wgpu::Buffer,
    shadow_map: &Framebuffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Frame Bind Group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: uniforms.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(shadow_map.depth_view()),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(shadow_map.sampler()),
            },
        ],
    })
}

fn create_pipelines(
    device: &wgpu::Device,
    frame_layout: &wgpu::BindGroupLayout,
    shadow_layout: &wgpu::BindGroupLayout,
    object_layout: &wgpu::BindGroupLayout,
) -> Pipelines {
    let scene_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("Scene Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/scene.wgsl").into()),
    });
    let shadow_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("Shadow Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/shadow.wgsl").into()),
    });

    let scene_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Scene Pipeline Layout"),
        bind_group_layouts: &[frame_layout, object_layout],
        push_constant_ranges: &[],
    });
    let depth_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Shadow Pipeline Layout"),
        bind_group_layouts: &[shadow_layout, object_layout],
        push_constant_ranges: &[],
    });

    let write_selection = wgpu::StencilFaceState {
        compare: wgpu::CompareFunction::Always,
        fail_op: wgpu::StencilOperation::Keep,
        depth_fail_op: wgpu::StencilOperation::Keep,
        pass_op: wgpu::StencilOperation::Replace,
    };
    let outside_selection = wgpu::StencilFaceState {
        compare: wgpu::CompareFunction::NotEqual,
        fail_op: wgpu::StencilOperation::Keep,
        depth_fail_op: wgpu::StencilOperation::Keep,
        pass_op: wgpu::StencilOperation::Keep,
    };

    let scene_pipeline = |label: &str,
                          vs: &str,
                          fs: &str,
                          buffers: &[wgpu::VertexBufferLayout<'static>],
                          cull_mode: Option<wgpu::Face>,
                          depth_write_enabled: bool,
                          depth_compare: wgpu::CompareFunction,
                          stencil: wgpu::StencilState| {
        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(&scene_layout),
            vertex: wgpu::VertexState {
                module: &scene_shader,
                entry_point: Some(vs),
                buffers,
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &scene_shader,
                entry_point: Some(fs),
                targets: &[Some(wgpu::ColorTargetState {
                    format: COLOR_FORMAT,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode,
                front_face: wgpu::FrontFace::Ccw,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_STENCIL_FORMAT,
                depth_write_enabled,
                depth_compare,
                stencil,
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        })
    };

    let color = scene_pipeline(
        "Color Pipeline",
        "vs",
        "fs",
        &[Vertex3d::LAYOUT],
        Some(wgpu::Face::Back),
        true,
        wgpu::CompareFunction::Less,
        wgpu::StencilState::default(),
    );
    let selected = scene_pipeline(
        "Selected Pipeline",
        "vs",
        "fs",
        &[Vertex3d::LAYOUT],
        Some(wgpu::Face::Back),
        true,
        wgpu::CompareFunction::Less,
        wgpu::StencilState {
            front: write_selection,
            back: write_selection,
            read_mask: 0xff,
            write_mask: 0xff,
        },
    );
    let outline = scene_pipeline(
        "Outline Pipeline",
        "vs_outline",
        "fs_outline",
        &[Vertex3d::LAYOUT],
        None,
        false,
        wgpu::CompareFunction::Always,
        wgpu::StencilState {
            front: outside_selection,
            back: outside_selection,
            read_mask: 0xff,
            write_mask: 0,
        },
    );

    let shadow = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("Shadow Pipeline"),
        layout: Some(&depth_layout),
        vertex: wgpu::VertexState {
            module: &shadow_shader,
            entry_point: Some("vs"),
            buffers: &[Vertex3d::POSITION_LAYOUT],
            compilation_options: Default::default(),
        },
        fragment: None,
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            cull_mode: None,
            ..Default::default()
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: SHADOW_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::LessEqual,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState {
                constant: 2,
                slope_scale: 2.0,
                clamp: 0.0,
            },
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    });

    Pipelines {
        color,
        selected,
        outline,
        shadow,
    }
}
