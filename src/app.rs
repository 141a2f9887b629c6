//! Window, event loop and the per-frame glue between winit, egui and the editor.
//!
//! One redraw is one editor frame:
//!
//! 1. Drain queued key presses and scroll steps into the editor
//! 2. Run the GUI, which runs [`Editor::frame`] (camera, panels, both passes)
//! 3. Point the viewport image at the current color target
//! 4. Paint the GUI to the swapchain and present
//!
//! Closing the window frees the framebuffers once, then leaves the loop.

use std::sync::Arc;
use std::time::Instant;

use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowAttributes, WindowId};

use crate::config::AppConfig;
use crate::editor::Editor;
use crate::egui_host::{EguiFrameOutput, EguiHost};
use crate::error::{EditorError, Result};
use crate::events::EventQueue;
use crate::gpu::GpuContext;
use crate::input::Input;
use crate::render::GpuSceneRenderer;
use crate::scene::{BaseEntityKind, Scene};

/// Open the editor window and run until it is closed.
///
/// Returns the first fatal error, after the loop has exited.
pub fn run(config: AppConfig) -> Result<()> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = VantageApp {
        state: AppState::Pending(config),
        error: None,
    };
    event_loop.run_app(&mut app)?;

    match app.error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// The scene shown on startup.
pub fn starter_scene() -> Scene {
    let mut scene = Scene::new();
    scene.create_base_entity(BaseEntityKind::Plane);
    scene.create_base_entity(BaseEntityKind::Cube);
    scene.create_base_entity(BaseEntityKind::DirectionalLight);
    scene.create_base_entity(BaseEntityKind::PointLight);
    scene
}

struct VantageApp {
    state: AppState,
    error: Option<EditorError>,
}

enum AppState {
    Pending(AppConfig),
    Running(Box<Running>),
    Closed,
}

struct Running {
    window: Arc<Window>,
    gpu: GpuContext,
    egui: EguiHost,
    painter: egui_wgpu::Renderer,
    renderer: GpuSceneRenderer,
    editor: Editor,
    input: Input,
    events: EventQueue,
    last_frame: Instant,
    freed: bool,
}

impl Running {
    fn new(event_loop: &ActiveEventLoop, config: &AppConfig) -> Result<Self> {
        let attributes = WindowAttributes::default()
            .with_title(&config.title)
            .with_inner_size(winit::dpi::PhysicalSize::new(config.width, config.height));
        let window = Arc::new(event_loop.create_window(attributes)?);
        log::info!("window created at {}x{}", config.width, config.height);

        let gpu = GpuContext::new(window.clone())?;
        let egui = EguiHost::new(&window);
        let painter = egui_wgpu::Renderer::new(
            &gpu.device,
            gpu.config.format,
            egui_wgpu::RendererOptions::default(),
        );
        let renderer = GpuSceneRenderer::new(&gpu, 1, 1)?;

        let editor = Editor::new(starter_scene());

        window.request_redraw();
        Ok(Self {
            window,
            gpu,
            egui,
            painter,
            renderer,
            editor,
            input: Input::new(),
            events: EventQueue::new(),
            last_frame: Instant::now(),
            freed: false,
        })
    }

    fn redraw(&mut self) -> Result<()> {
        let now = Instant::now();
        let dt = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;

        for event in self.events.drain() {
            self.editor.handle_event(event);
        }

        let mut result = Ok(());
        let output = self.egui.run_ui(&self.window, |ctx| {
            result = self
                .editor
                .frame(ctx, &self.input, &mut self.renderer, dt);
        });
        result?;

        self.renderer.sync_viewport_texture(&mut self.painter);
        self.paint(output);
        self.window.request_redraw();
        Ok(())
    }

    fn paint(&mut self, output: EguiFrameOutput) {
        let frame = match self.gpu.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.gpu.reconfigure();
                return;
            }
            Err(err) => {
                log::warn!("skipping frame: {err}");
                return;
            }
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let device = &self.gpu.device;
        let queue = &self.gpu.queue;
        for (id, delta) in &output.textures_delta.set {
            self.painter.update_texture(device, queue, *id, delta);
        }

        let screen = egui_wgpu::ScreenDescriptor {
            size_in_pixels: output.screen_size_px,
            pixels_per_point: output.pixels_per_point,
        };
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Egui Encoder"),
        });
        let mut commands = self.painter.update_buffers(
            device,
            queue,
            &mut encoder,
            &output.clipped_primitives,
            &screen,
        );

        {
            let mut pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("Egui Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &view,
                        depth_slice: None,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    occlusion_query_set: None,
                    timestamp_writes: None,
                })
                .forget_lifetime();
            self.painter
                .render(&mut pass, &output.clipped_primitives, &screen);
        }

        commands.push(encoder.finish());
        queue.submit(commands);
        frame.present();

        for id in &output.textures_delta.free {
            self.painter.free_texture(id);
        }
    }

    /// Free GPU targets. Only the first call does anything.
    fn teardown(&mut self) {
        if self.freed {
            return;
        }
        self.renderer.release_viewport_texture(&mut self.painter);
        self.editor.free(&mut self.renderer);
        self.freed = true;
        log::info!("framebuffers released");
    }
}

impl ApplicationHandler for VantageApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let AppState::Pending(config) = &self.state else {
            return;
        };
        match Running::new(event_loop, config) {
            Ok(running) => self.state = AppState::Running(Box::new(running)),
            Err(err) => {
                self.error = Some(err);
                self.state = AppState::Closed;
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let AppState::Running(running) = &mut self.state else {
            return;
        };

        let consumed = running.egui.on_window_event(&running.window, &event);
        running.input.handle_event(&event);
        if !consumed || matches!(event, WindowEvent::MouseWheel { .. }) {
            running.events.handle_event(&event);
        }

        match event {
            WindowEvent::CloseRequested => {
                running.teardown();
                self.state = AppState::Closed;
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                running.gpu.resize(size.width, size.height);
            }
            WindowEvent::RedrawRequested => {
                if let Err(err) = running.redraw() {
                    running.teardown();
                    self.error = Some(err);
                    self.state = AppState::Closed;
                    event_loop.exit();
                }
            }
            _ => {}
        }
    }
}
