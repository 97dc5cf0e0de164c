mod objects;

use anyhow::{Context, Result};
use clap::Parser;
use egui::Context as EguiContext;
use glam::{Quat, Vec3};
use objects::{LightObject, LightShape, SdfObject, Shape};
use sdfray_common::{Color, Transform};
use sdfray_render::RayMarchSettings;
use sdfray_render_wgpu::{Backdrop, OrbitCamera, RAYMARCH_SHADER, RayMarchFeature};
use sdfray_scene::{MaterialRef, SceneContext, SdfMaterial};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{DeviceEvent, ElementState, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

#[derive(Parser)]
#[command(name = "sdfray-desktop", about = "SDF ray-march viewer")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// YAML ray-march settings
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Compute entry point to dispatch
    #[arg(long)]
    kernel: Option<String>,

    /// Samples per pixel (1..=16)
    #[arg(long)]
    msaa: Option<u32>,

    /// WGSL program to load instead of the bundled kernel
    #[arg(long)]
    program: Option<PathBuf>,
}

/// Application state.
struct AppState {
    scene: SceneContext,
    objects: Vec<SdfObject>,
    lights: Vec<LightObject>,
    palette: Vec<(&'static str, MaterialRef)>,
    camera: OrbitCamera,
    selected: Option<usize>,
    show_inspector: bool,
    preview: bool,
    animate: bool,
    msaa: u32,
    spawned: usize,
    // Input state
    mouse_captured: bool,
    last_frame: Instant,
    time: f32,
}

impl AppState {
    fn new(msaa: u32) -> Self {
        let red = MaterialRef::new(SdfMaterial {
            smoothness: 0.8,
            specular_power: 24.0,
            ..SdfMaterial::with_albedo(Color::rgb(0.85, 0.2, 0.15))
        });
        let steel = MaterialRef::new(SdfMaterial {
            smoothness: 1.0,
            specular_power: 64.0,
            ambient: Color::rgb(0.2, 0.25, 0.3),
            ..SdfMaterial::with_albedo(Color::rgb(0.6, 0.65, 0.7))
        });
        let glass = MaterialRef::new(SdfMaterial {
            opacity: 0.4,
            ..SdfMaterial::with_albedo(Color::rgb(0.3, 0.7, 1.0))
        });
        let marker = MaterialRef::new(SdfMaterial {
            lit: false,
            ..SdfMaterial::with_albedo(Color::rgb(1.0, 0.85, 0.1))
        });

        let objects = vec![
            SdfObject::new(
                "Red Ball",
                Shape::Sphere { radius: 0.5 },
                Transform::from_position(Vec3::new(0.0, 0.5, 0.0)),
                Some(red.clone()),
            ),
            SdfObject::new(
                "Glass Ball",
                Shape::Sphere { radius: 0.75 },
                Transform::from_position(Vec3::new(-2.0, 0.75, -1.0)),
                Some(glass.clone()),
            ),
            SdfObject::new(
                "Steel Box",
                Shape::Box,
                Transform {
                    position: Vec3::new(2.0, 0.6, 0.0),
                    rotation: Quat::from_rotation_y(0.6),
                    scale: Vec3::new(1.2, 1.2, 0.8),
                },
                Some(steel.clone()),
            ),
            SdfObject::new(
                "Guide Line",
                Shape::Segment {
                    length: 4.0,
                    thickness: 0.002,
                    perspective: false,
                },
                Transform::from_position(Vec3::new(-2.0, 0.02, 2.0)).looking_along(Vec3::X),
                Some(marker.clone()),
            ),
        ];
        let lights = vec![
            LightObject::new(
                "Sun",
                LightShape::Directional,
                Transform::default().looking_along(Vec3::new(-0.4, -1.0, -0.3)),
                Color::WHITE,
                1.0,
            ),
            LightObject::new(
                "Lamp",
                LightShape::Point,
                Transform::from_position(Vec3::new(0.0, 3.0, 2.0)),
                Color::rgb(1.0, 0.9, 0.7),
                4.0,
            ),
        ];

        let mut state = Self {
            scene: SceneContext::new(),
            objects,
            lights,
            palette: vec![("Red", red), ("Steel", steel), ("Glass", glass), ("Marker", marker)],
            camera: OrbitCamera::default(),
            selected: None,
            show_inspector: true,
            preview: false,
            animate: true,
            msaa,
            spawned: 0,
            mouse_captured: false,
            last_frame: Instant::now(),
            time: 0.0,
        };
        for object in &mut state.objects {
            object.enable(&mut state.scene);
        }
        for light in &mut state.lights {
            light.enable(&mut state.scene);
        }
        state
    }

    fn update(&mut self, dt: f32) {
        self.time += dt;
        if self.animate {
            if let Some(ball) = self.objects.first_mut() {
                let mut t = *ball.transform();
                t.position.y = 0.75 + 0.25 * (self.time * 2.0).sin();
                ball.set_transform(t);
            }
        }

        for object in &mut self.objects {
            object.sync(&mut self.scene);
        }
        for light in &mut self.lights {
            light.sync(&mut self.scene);
        }
    }

    fn spawn_sphere(&mut self) {
        let (name, material) = &self.palette[self.spawned % self.palette.len()];
        let position = objects::spawn_point(self.camera.eye(), self.camera.target);
        let mut object = SdfObject::new(
            format!("{name} Ball {}", self.spawned),
            Shape::Sphere { radius: 0.5 },
            Transform::from_position(position),
            Some(material.clone()),
        );
        object.enable(&mut self.scene);
        self.spawned += 1;
        self.objects.push(object);
        self.selected = Some(self.objects.len() - 1);
        tracing::info!("spawned sphere at ({:.1}, {:.1}, {:.1})", position.x, position.y, position.z);
    }

    fn delete_selected(&mut self) {
        if let Some(index) = self.selected.take() {
            if index < self.objects.len() {
                let mut object = self.objects.remove(index);
                object.disable(&mut self.scene);
                tracing::info!(name = %object.name, "deleted object");
            }
        }
    }

    fn handle_key(&mut self, key: KeyCode, pressed: bool) {
        if !pressed {
            return;
        }

        match key {
            KeyCode::KeyN => self.spawn_sphere(),
            KeyCode::Delete | KeyCode::Backspace => self.delete_selected(),
            KeyCode::KeyP => self.preview = !self.preview,
            KeyCode::Space => self.animate = !self.animate,
            KeyCode::F1 => self.show_inspector = !self.show_inspector,
            KeyCode::Escape => self.selected = None,
            _ => {}
        }
    }

    fn draw_ui(&mut self, ctx: &EguiContext, kernel_label: &str) {
        if !self.show_inspector {
            return;
        }

        egui::SidePanel::left("inspector")
            .default_width(280.0)
            .show(ctx, |ui| {
                ui.heading("SDF Ray March");
                ui.separator();
                ui.label(kernel_label);
                ui.label(self.scene.summary().to_string());
                let eye = self.camera.eye();
                ui.label(format!("Camera: ({:.1}, {:.1}, {:.1})", eye.x, eye.y, eye.z));
                ui.add(egui::Slider::new(&mut self.msaa, 1..=16).text("MSAA"));
                ui.checkbox(&mut self.preview, "Preview camera (P)");
                ui.checkbox(&mut self.animate, "Animate (Space)");
                ui.separator();

                ui.heading("Tools");
                ui.horizontal(|ui| {
                    if ui.button("Spawn Sphere (N)").clicked() {
                        self.spawn_sphere();
                    }
                    if ui.button("Delete (Del)").clicked() {
                        self.delete_selected();
                    }
                });

                ui.separator();
                ui.heading("Objects");
                for index in 0..self.objects.len() {
                    ui.horizontal(|ui| {
                        let mut enabled = self.objects[index].is_enabled();
                        if ui.checkbox(&mut enabled, "").changed() {
                            if enabled {
                                self.objects[index].enable(&mut self.scene);
                            } else {
                                self.objects[index].disable(&mut self.scene);
                            }
                        }
                        let is_selected = self.selected == Some(index);
                        if ui
                            .selectable_label(is_selected, self.objects[index].name.as_str())
                            .clicked()
                        {
                            self.selected = Some(index);
                        }
                    });
                }

                ui.heading("Lights");
                for light in &mut self.lights {
                    ui.horizontal(|ui| {
                        let mut enabled = light.is_enabled();
                        if ui.checkbox(&mut enabled, light.name.as_str()).changed() {
                            if enabled {
                                light.enable(&mut self.scene);
                            } else {
                                light.disable(&mut self.scene);
                            }
                        }
                        if ui
                            .add(egui::DragValue::new(&mut light.intensity).speed(0.05).range(0.0..=20.0))
                            .changed()
                        {
                            light.mark_dirty();
                        }
                    });
                }

                if let Some(index) = self.selected.filter(|i| *i < self.objects.len()) {
                    ui.separator();
                    ui.heading("Inspector");
                    self.draw_object_inspector(ui, index);
                }

                ui.separator();
                ui.heading("Materials");
                for (name, material) in &self.palette {
                    let mut m = material.get();
                    let mut albedo = m.albedo.to_array();
                    let mut changed = false;
                    ui.horizontal(|ui| {
                        ui.label(*name);
                        changed |= ui.color_edit_button_rgba_unmultiplied(&mut albedo).changed();
                        changed |= ui.checkbox(&mut m.lit, "lit").changed();
                        changed |= ui
                            .add(egui::Slider::new(&mut m.opacity, 0.0..=1.0).text("opacity"))
                            .changed();
                    });
                    if changed {
                        m.albedo = Color::rgba(albedo[0], albedo[1], albedo[2], albedo[3]);
                        material.edit(|target| *target = m);
                    }
                }

                ui.separator();
                ui.small("F1: Toggle Inspector | RMB: Orbit | Wheel: Zoom");
            });
    }

    fn draw_object_inspector(&mut self, ui: &mut egui::Ui, index: usize) {
        if let Some(handle) = self.objects[index].handle() {
            let slot = self.scene.position(handle).map_or("-".to_string(), |p| p.to_string());
            ui.label(format!("{} slot: {slot}", handle.kind()));
        }
        let object = &mut self.objects[index];
        let transform = *object.transform();

        let mut pos = transform.position.to_array();
        let old_pos = pos;
        ui.label("Position:");
        ui.horizontal(|ui| {
            ui.add(egui::DragValue::new(&mut pos[0]).prefix("X: ").speed(0.05));
            ui.add(egui::DragValue::new(&mut pos[1]).prefix("Y: ").speed(0.05));
            ui.add(egui::DragValue::new(&mut pos[2]).prefix("Z: ").speed(0.05));
        });
        if pos != old_pos {
            object.set_transform(Transform {
                position: Vec3::from_array(pos),
                ..transform
            });
        }

        match object.shape {
            Shape::Sphere { mut radius } => {
                if ui
                    .add(egui::DragValue::new(&mut radius).prefix("Radius: ").speed(0.02).range(0.01..=10.0))
                    .changed()
                {
                    object.set_shape(Shape::Sphere { radius });
                }
            }
            Shape::Box => {
                let mut scale = transform.scale.to_array();
                let old_scale = scale;
                ui.label("Size:");
                ui.horizontal(|ui| {
                    ui.add(egui::DragValue::new(&mut scale[0]).prefix("X: ").speed(0.05));
                    ui.add(egui::DragValue::new(&mut scale[1]).prefix("Y: ").speed(0.05));
                    ui.add(egui::DragValue::new(&mut scale[2]).prefix("Z: ").speed(0.05));
                });
                if scale != old_scale {
                    object.set_transform(Transform {
                        scale: Vec3::from_array(scale),
                        ..transform
                    });
                }
            }
            Shape::Segment {
                length,
                mut thickness,
                mut perspective,
            } => {
                let mut changed = ui
                    .add(egui::DragValue::new(&mut thickness).prefix("Thickness: ").speed(0.001))
                    .changed();
                changed |= ui.checkbox(&mut perspective, "Perspective").changed();
                if changed {
                    object.set_shape(Shape::Segment {
                        length,
                        thickness,
                        perspective,
                    });
                }
            }
        }

        let current = object
            .material()
            .and_then(|m| self.palette.iter().position(|(_, p)| MaterialRef::ptr_eq(p, m)));
        let mut choice = current;
        egui::ComboBox::from_label("Material")
            .selected_text(choice.map_or("Default", |i| self.palette[i].0))
            .show_ui(ui, |ui| {
                ui.selectable_value(&mut choice, None, "Default");
                for (i, (name, _)) in self.palette.iter().enumerate() {
                    ui.selectable_value(&mut choice, Some(i), *name);
                }
            });
        if choice != current {
            let material = choice.map(|i| self.palette[i].1.clone());
            object.set_material(&mut self.scene, material);
        }
    }
}

struct GpuApp {
    state: AppState,
    settings: RayMarchSettings,
    program: Option<String>,
    window: Option<Arc<Window>>,
    surface: Option<wgpu::Surface<'static>>,
    device: Option<wgpu::Device>,
    queue: Option<wgpu::Queue>,
    config: Option<wgpu::SurfaceConfiguration>,
    backdrop: Option<Backdrop>,
    raymarch: Option<RayMarchFeature>,
    egui_ctx: EguiContext,
    egui_winit: Option<egui_winit::State>,
    egui_renderer: Option<egui_wgpu::Renderer>,
}

impl GpuApp {
    fn new(settings: RayMarchSettings, program: Option<String>) -> Self {
        Self {
            state: AppState::new(settings.msaa),
            settings,
            program,
            window: None,
            surface: None,
            device: None,
            queue: None,
            config: None,
            backdrop: None,
            raymarch: None,
            egui_ctx: EguiContext::default(),
            egui_winit: None,
            egui_renderer: None,
        }
    }

    fn kernel_label(&self) -> String {
        match self.raymarch.as_ref().and_then(RayMarchFeature::kernel) {
            Some(k) => format!(
                "Kernel: {} @({}, {}, {})",
                k.name, k.workgroup_size.x, k.workgroup_size.y, k.workgroup_size.z
            ),
            None => "Kernel: disabled".to_string(),
        }
    }
}

impl ApplicationHandler for GpuApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attrs = Window::default_attributes()
            .with_title("sdfray")
            .with_inner_size(PhysicalSize::new(1280u32, 720));
        let window = Arc::new(event_loop.create_window(attrs).expect("create window"));

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .expect("create surface");

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .expect("find adapter");

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("sdfray_device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
            },
            None,
        ))
        .expect("create device");

        let size = window.inner_size();
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .unwrap_or(surface_caps.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let backdrop = Backdrop::new(&device, surface_format, config.width, config.height);
        let program = self.program.as_deref().unwrap_or(RAYMARCH_SHADER);
        let raymarch = RayMarchFeature::new(&device, surface_format, self.settings.clone(), Some(program));

        let egui_winit = egui_winit::State::new(
            self.egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(&device, surface_format, None, 1, false);

        self.window = Some(window);
        self.surface = Some(surface);
        self.device = Some(device);
        self.queue = Some(queue);
        self.config = Some(config);
        self.backdrop = Some(backdrop);
        self.raymarch = Some(raymarch);
        self.egui_winit = Some(egui_winit);
        self.egui_renderer = Some(egui_renderer);

        tracing::info!(
            "GPU initialized with {} backend",
            adapter.get_info().backend.to_str()
        );
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if let Some(egui_winit) = &mut self.egui_winit {
            let response = egui_winit.on_window_event(self.window.as_ref().unwrap(), &event);
            if response.consumed {
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                if let (Some(surface), Some(device), Some(config)) =
                    (&self.surface, &self.device, &mut self.config)
                {
                    config.width = new_size.width.max(1);
                    config.height = new_size.height.max(1);
                    surface.configure(device, config);
                    if let Some(backdrop) = &mut self.backdrop {
                        backdrop.resize(device, config.width, config.height);
                    }
                    if let Some(raymarch) = &mut self.raymarch {
                        raymarch.release_targets();
                    }
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state: key_state,
                        ..
                    },
                ..
            } => {
                self.state
                    .handle_key(key, key_state == ElementState::Pressed);
            }
            WindowEvent::MouseInput {
                button: MouseButton::Right,
                state: btn_state,
                ..
            } => {
                self.state.mouse_captured = btn_state == ElementState::Pressed;
                if let Some(window) = &self.window {
                    window.set_cursor_visible(!self.state.mouse_captured);
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let scroll = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(p) => p.y as f32 / 50.0,
                };
                self.state.camera.zoom(scroll);
            }
            WindowEvent::RedrawRequested => {
                let now = Instant::now();
                let dt = (now - self.state.last_frame).as_secs_f32().min(0.1);
                self.state.last_frame = now;
                self.state.update(dt);

                let (Some(surface), Some(device), Some(queue), Some(config)) =
                    (&self.surface, &self.device, &self.queue, &self.config)
                else {
                    return;
                };

                let output = match surface.get_current_texture() {
                    Ok(t) => t,
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        surface.configure(device, config);
                        return;
                    }
                    Err(e) => {
                        tracing::error!("surface error: {e}");
                        return;
                    }
                };

                let view = output
                    .texture
                    .create_view(&wgpu::TextureViewDescriptor::default());

                let mut camera = self.state.camera.params(config.width, config.height);
                if self.state.preview {
                    camera = camera.preview();
                }

                let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("frame_encoder"),
                });
                if let Some(backdrop) = &self.backdrop {
                    backdrop.draw(queue, &mut encoder, &view, &camera);
                    if let Some(raymarch) = &mut self.raymarch {
                        raymarch.set_msaa(self.state.msaa);
                        raymarch.prepare(device, queue, &self.state.scene);
                        raymarch.render_camera(
                            device,
                            &mut encoder,
                            &self.state.scene,
                            &camera,
                            &view,
                            Some(backdrop.linear_depth()),
                        );
                    }
                }
                queue.submit(std::iter::once(encoder.finish()));

                let kernel_label = self.kernel_label();
                let raw_input = self
                    .egui_winit
                    .as_mut()
                    .unwrap()
                    .take_egui_input(self.window.as_ref().unwrap());
                let full_output = self.egui_ctx.run(raw_input, |ctx| {
                    self.state.draw_ui(ctx, &kernel_label);
                });

                self.egui_winit.as_mut().unwrap().handle_platform_output(
                    self.window.as_ref().unwrap(),
                    full_output.platform_output,
                );

                let paint_jobs = self
                    .egui_ctx
                    .tessellate(full_output.shapes, full_output.pixels_per_point);

                let screen_descriptor = egui_wgpu::ScreenDescriptor {
                    size_in_pixels: [config.width, config.height],
                    pixels_per_point: full_output.pixels_per_point,
                };

                {
                    let egui_renderer = self.egui_renderer.as_mut().unwrap();
                    for (id, image_delta) in &full_output.textures_delta.set {
                        egui_renderer.update_texture(device, queue, *id, image_delta);
                    }
                    let mut encoder =
                        device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                            label: Some("egui_encoder"),
                        });
                    egui_renderer.update_buffers(
                        device,
                        queue,
                        &mut encoder,
                        &paint_jobs,
                        &screen_descriptor,
                    );
                    {
                        let mut pass = encoder
                            .begin_render_pass(&wgpu::RenderPassDescriptor {
                                label: Some("egui_pass"),
                                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                                    view: &view,
                                    resolve_target: None,
                                    ops: wgpu::Operations {
                                        load: wgpu::LoadOp::Load,
                                        store: wgpu::StoreOp::Store,
                                    },
                                })],
                                depth_stencil_attachment: None,
                                ..Default::default()
                            })
                            .forget_lifetime();
                        egui_renderer.render(&mut pass, &paint_jobs, &screen_descriptor);
                    }
                    queue.submit(std::iter::once(encoder.finish()));
                    for id in &full_output.textures_delta.free {
                        egui_renderer.free_texture(id);
                    }
                }

                output.present();
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: winit::event::DeviceId,
        event: DeviceEvent,
    ) {
        if let DeviceEvent::MouseMotion { delta } = event {
            if self.state.mouse_captured {
                self.state.camera.rotate(delta.0 as f32, delta.1 as f32);
            }
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    tracing::info!("sdfray-desktop starting");

    let mut settings = match &cli.settings {
        Some(path) => RayMarchSettings::load(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => RayMarchSettings::default(),
    };
    if let Some(kernel) = cli.kernel {
        settings.kernel_name = kernel;
    }
    if let Some(msaa) = cli.msaa {
        settings.msaa = msaa;
    }
    settings.validate()?;

    let program = match &cli.program {
        Some(path) => Some(
            std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?,
        ),
        None => None,
    };

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = GpuApp::new(settings, program);
    event_loop.run_app(&mut app)?;

    Ok(())
}
