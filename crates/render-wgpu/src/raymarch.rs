use crate::buffers::{GpuMirror, UploadAction};
use crate::composite::CompositePass;
use crate::shaders;
use crate::targets::{self, GpuTargetPool, TargetDesc, TargetRole};
use sdfray_render::{
    BindingKind, CameraParams, ExpectedBinding, FramePlan, KernelInfo, RayMarchSettings,
};
use sdfray_scene::{
    BoxRecord, LightRecord, MaterialRecord, SceneContext, SegmentRecord, SphereRecord,
};
use wgpu::util::DeviceExt;

/// Group-0 bindings the driver supplies, in binding order.
const KERNEL_LAYOUT: [ExpectedBinding; 8] = [
    ExpectedBinding::new(0, "uniforms", BindingKind::Uniform),
    ExpectedBinding::new(1, "_Spheres", BindingKind::ReadOnlyStorage),
    ExpectedBinding::new(2, "_Boxes", BindingKind::ReadOnlyStorage),
    ExpectedBinding::new(3, "_LineSegments", BindingKind::ReadOnlyStorage),
    ExpectedBinding::new(4, "_Lights", BindingKind::ReadOnlyStorage),
    ExpectedBinding::new(5, "_Materials", BindingKind::ReadOnlyStorage),
    ExpectedBinding::new(
        6,
        "_Result",
        BindingKind::WriteStorageTexture(naga::StorageFormat::Rgba8Unorm),
    ),
    ExpectedBinding::new(7, "_Depth", BindingKind::SampledTexture),
];

struct Kernel {
    info: KernelInfo,
    pipeline: wgpu::ComputePipeline,
    layout: wgpu::BindGroupLayout,
}

impl Kernel {
    fn new(device: &wgpu::Device, program: &str, info: KernelInfo) -> Self {
        let entries: Vec<_> = KERNEL_LAYOUT.iter().map(layout_entry).collect();
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("raymarch_bind_group_layout"),
            entries: &entries,
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("raymarch_pipeline_layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("raymarch_shader"),
            source: wgpu::ShaderSource::Wgsl(program.into()),
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("raymarch_pipeline"),
            layout: Some(&pipeline_layout),
            module: &module,
            entry_point: Some(info.name.as_str()),
            compilation_options: Default::default(),
            cache: None,
        });

        Self {
            info,
            pipeline,
            layout,
        }
    }
}

fn layout_entry(expected: &ExpectedBinding) -> wgpu::BindGroupLayoutEntry {
    let ty = match expected.kind {
        BindingKind::Uniform => wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        BindingKind::ReadOnlyStorage => wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only: true },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        // The only storage texture is `_Result`.
        BindingKind::WriteStorageTexture(_) => wgpu::BindingType::StorageTexture {
            access: wgpu::StorageTextureAccess::WriteOnly,
            format: TargetRole::Color.format(),
            view_dimension: wgpu::TextureViewDimension::D2,
        },
        BindingKind::SampledTexture => wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: false },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
    };
    wgpu::BindGroupLayoutEntry {
        binding: expected.binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty,
        count: None,
    }
}

/// Kernel the feature can be built around, or `None` when `program` is
/// missing, lacks the configured kernel, or declares bindings the driver
/// does not supply.
fn resolve_kernel(settings: &RayMarchSettings, program: Option<&str>) -> Option<KernelInfo> {
    let Some(program) = program else {
        tracing::warn!("no ray-march program loaded; feature disabled");
        return None;
    };
    match KernelInfo::reflect_with_layout(program, &settings.kernel_name, &KERNEL_LAYOUT) {
        Ok(info) => Some(info),
        Err(err) => {
            tracing::warn!(kernel = %settings.kernel_name, %err, "ray-march kernel unavailable; feature disabled");
            None
        }
    }
}

struct SceneBuffers {
    spheres: GpuMirror<SphereRecord>,
    boxes: GpuMirror<BoxRecord>,
    segments: GpuMirror<SegmentRecord>,
    lights: GpuMirror<LightRecord>,
    materials: GpuMirror<MaterialRecord>,
}

impl SceneBuffers {
    fn new(device: &wgpu::Device) -> Self {
        Self {
            spheres: GpuMirror::new(device),
            boxes: GpuMirror::new(device),
            segments: GpuMirror::new(device),
            lights: GpuMirror::new(device),
            materials: GpuMirror::new(device),
        }
    }

    fn sync(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, scene: &SceneContext) {
        let actions = [
            self.spheres.sync(device, queue, scene.spheres()),
            self.boxes.sync(device, queue, scene.boxes()),
            self.segments.sync(device, queue, scene.segments()),
            self.lights.sync(device, queue, scene.lights()),
        ];
        // Material fields can change behind any shared handle, so always re-send.
        self.materials.write_all(device, queue, &scene.material_buffer());

        let uploaded = actions.iter().filter(|a| **a != UploadAction::Skip).count();
        if uploaded > 0 {
            tracing::trace!(uploaded, "synced scene buffers");
        }
    }
}

struct ActivePass {
    kernel: Kernel,
    buffers: SceneBuffers,
    targets: GpuTargetPool,
    composite: CompositePass,
}

/// Ray-march dispatch driver.
///
/// Holds the compute pipeline, the device-side mirrors of the scene pools,
/// and the pooled per-camera targets. When the program is missing or does
/// not contain the configured kernel the feature stays disabled and every
/// call is a no-op.
pub struct RayMarchFeature {
    settings: RayMarchSettings,
    active: Option<ActivePass>,
}

impl RayMarchFeature {
    /// Build the feature from a WGSL `program`. `target_format` is the format
    /// of the color targets results are composited onto.
    pub fn new(
        device: &wgpu::Device,
        target_format: wgpu::TextureFormat,
        settings: RayMarchSettings,
        program: Option<&str>,
    ) -> Self {
        let (Some(program), Some(info)) = (program, resolve_kernel(&settings, program)) else {
            return Self {
                settings,
                active: None,
            };
        };

        tracing::info!(
            kernel = %info.name,
            workgroup = ?[info.workgroup_size.x, info.workgroup_size.y, info.workgroup_size.z],
            "ray-march kernel ready"
        );

        let active = ActivePass {
            kernel: Kernel::new(device, program, info),
            buffers: SceneBuffers::new(device),
            targets: GpuTargetPool::new(),
            composite: CompositePass::new(device, target_format),
        };
        Self {
            settings,
            active: Some(active),
        }
    }

    /// Build the feature around the bundled kernel.
    pub fn with_builtin_program(
        device: &wgpu::Device,
        target_format: wgpu::TextureFormat,
        settings: RayMarchSettings,
    ) -> Self {
        Self::new(device, target_format, settings, Some(shaders::RAYMARCH_SHADER))
    }

    pub fn is_enabled(&self) -> bool {
        self.active.is_some()
    }

    pub fn settings(&self) -> &RayMarchSettings {
        &self.settings
    }

    /// Change supersampling for subsequent frames. Clamped to 1..=16.
    pub fn set_msaa(&mut self, msaa: u32) {
        self.settings.msaa = msaa.clamp(1, sdfray_render::MAX_MSAA);
    }

    pub fn kernel(&self) -> Option<&KernelInfo> {
        self.active.as_ref().map(|a| &a.kernel.info)
    }

    /// Bring device buffers up to date with `scene`. Call once per frame,
    /// before any [`render_camera`](Self::render_camera).
    pub fn prepare(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, scene: &SceneContext) {
        if let Some(active) = &mut self.active {
            active.buffers.sync(device, queue, scene);
        }
    }

    /// Record one camera's dispatch and composite into `encoder`.
    ///
    /// `depth_input`, when given, must be an `R32Float` texture at least the
    /// camera's size with `COPY_SRC` usage holding linear depth over far clip.
    /// Otherwise the depth target starts cleared to far.
    pub fn render_camera(
        &self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        scene: &SceneContext,
        camera: &CameraParams,
        color_target: &wgpu::TextureView,
        depth_input: Option<&wgpu::Texture>,
    ) -> Option<FramePlan> {
        let active = self.active.as_ref()?;
        let _span = tracing::info_span!("raymarch_dispatch", width = camera.width, height = camera.height).entered();
        let plan = FramePlan::build(scene, camera, &self.settings, active.kernel.info.workgroup_size);
        if plan.is_empty() {
            return None;
        }

        let color = targets::acquire(
            &active.targets,
            device,
            TargetDesc {
                role: TargetRole::Color,
                width: camera.width,
                height: camera.height,
            },
        );
        let depth_desc = TargetDesc {
            role: TargetRole::Depth,
            width: camera.width,
            height: camera.height,
        };
        let depth = targets::acquire(&active.targets, device, depth_desc);

        let usable = depth_input
            .filter(|src| depth_desc.accepts_copy_from(src.format(), src.size(), src.usage()));
        match usable {
            Some(src) => encoder.copy_texture_to_texture(
                src.as_image_copy(),
                depth.texture.as_image_copy(),
                depth_desc.extent(),
            ),
            None => {
                if depth_input.is_some() {
                    tracing::warn!("depth input does not match the camera target; ignoring");
                }
                clear_depth(encoder, &depth.view);
            }
        }

        let uniforms = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("raymarch_uniforms"),
            contents: bytemuck::bytes_of(&plan.uniforms),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let b = &active.buffers;
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("raymarch_bind_group"),
            layout: &active.kernel.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniforms.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: b.spheres.buffer().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: b.boxes.buffer().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: b.segments.buffer().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: b.lights.buffer().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: b.materials.buffer().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 6,
                    resource: wgpu::BindingResource::TextureView(&color.view),
                },
                wgpu::BindGroupEntry {
                    binding: 7,
                    resource: wgpu::BindingResource::TextureView(&depth.view),
                },
            ],
        });

        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("raymarch_pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&active.kernel.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(plan.dispatch.x, plan.dispatch.y, plan.dispatch.z);
        }

        active.composite.draw(device, encoder, &color.view, color_target);
        Some(plan)
    }

    /// Drop idle pooled targets, e.g. after the window was resized.
    pub fn release_targets(&mut self) {
        if let Some(active) = &self.active {
            active.targets.clear();
        }
    }
}

fn clear_depth(encoder: &mut wgpu::CommandEncoder, view: &wgpu::TextureView) {
    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("raymarch_depth_clear"),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(wgpu::Color {
                    r: 1.0,
                    g: 0.0,
                    b: 0.0,
                    a: 0.0,
                }),
                store: wgpu::StoreOp::Store,
            },
        })],
        ..Default::default()
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdfray_render::WorkgroupSize;

    fn settings(kernel: &str) -> RayMarchSettings {
        RayMarchSettings {
            kernel_name: kernel.to_string(),
            ..RayMarchSettings::default()
        }
    }

    #[test]
    fn builtin_program_resolves() {
        let info = resolve_kernel(&settings("main"), Some(shaders::RAYMARCH_SHADER)).unwrap();
        assert_eq!(info.workgroup_size, WorkgroupSize::new(8, 8, 1));
    }

    #[test]
    fn missing_program_disables() {
        assert!(resolve_kernel(&settings("main"), None).is_none());
    }

    #[test]
    fn unknown_kernel_disables() {
        assert!(resolve_kernel(&settings("trace"), Some(shaders::RAYMARCH_SHADER)).is_none());
    }

    #[test]
    fn graphics_entry_point_disables() {
        assert!(resolve_kernel(&settings("vs_fullscreen"), Some(shaders::COMPOSITE_SHADER)).is_none());
    }

    #[test]
    fn foreign_bindings_disable() {
        const OTHER: &str = r#"
@group(0) @binding(0) var<storage, read_write> out: array<u32>;

@compute @workgroup_size(8, 8, 1)
fn main(@builtin(global_invocation_id) id: vec3<u32>) {
    out[id.x] = id.y;
}
"#;
        assert!(resolve_kernel(&settings("main"), Some(OTHER)).is_none());
    }

    #[test]
    fn result_format_mismatch_disables() {
        let program = shaders::RAYMARCH_SHADER.replace("rgba8unorm", "rgba16float");
        assert!(resolve_kernel(&settings("main"), Some(&program)).is_none());
    }

    #[test]
    fn layout_table_covers_every_binding_in_order() {
        let bindings: Vec<u32> = KERNEL_LAYOUT.iter().map(|e| e.binding).collect();
        assert_eq!(bindings, (0..8).collect::<Vec<_>>());
        let entry = layout_entry(&KERNEL_LAYOUT[6]);
        assert!(matches!(
            entry.ty,
            wgpu::BindingType::StorageTexture {
                format: wgpu::TextureFormat::Rgba8Unorm,
                ..
            }
        ));
    }
}
