use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use glam::Vec3;
use sdfray_common::{Color, Transform};
use sdfray_render::{CameraParams, DebugTextRenderer, KernelInfo, RayMarchSettings, Renderer};
use sdfray_scene::{
    BoxRecord, LightRecord, MaterialRef, PrimitiveHandle, SceneContext, SdfMaterial, SegmentRecord,
    SphereRecord,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sdfray-cli", about = "CLI tool for sdfray scenes and dispatch plans")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and crate info
    Info,
    /// Build a demo scene and print the dispatch a GPU backend would issue
    Plan {
        /// Render target width in pixels
        #[arg(long, default_value = "1920")]
        width: u32,
        /// Render target height in pixels
        #[arg(long, default_value = "1080")]
        height: u32,
        /// YAML settings file
        #[arg(short, long)]
        settings: Option<PathBuf>,
        /// Override the samples per pixel
        #[arg(long)]
        msaa: Option<u32>,
        /// Plan for a preview camera (single sample)
        #[arg(long)]
        preview: bool,
        /// Number of demo spheres
        #[arg(long, default_value = "3")]
        spheres: usize,
    },
    /// Reflect a compute kernel's workgroup size
    Kernel {
        /// WGSL program to inspect; the bundled ray-march kernel when omitted
        #[arg(short, long)]
        program: Option<PathBuf>,
        /// Entry point name
        #[arg(short, long, default_value = "main")]
        kernel: String,
    },
    /// Apply random adds, updates and removals and check every handle still
    /// addresses its own record
    Churn {
        /// Number of mutations
        #[arg(short, long, default_value = "1000")]
        ops: usize,
        /// Seed for the mutation sequence
        #[arg(short, long, default_value = "42")]
        seed: u64,
    },
    /// Validate a settings file and print the effective values
    Settings {
        path: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => {
            println!("sdfray-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("scene: {}", sdfray_scene::crate_info());
            println!("render: {}", sdfray_render::crate_info());
            println!("{}", SceneContext::new().summary());
        }
        Commands::Plan {
            width,
            height,
            settings,
            msaa,
            preview,
            spheres,
        } => {
            let mut settings = match settings {
                Some(path) => RayMarchSettings::load(&path)
                    .with_context(|| format!("loading settings from {}", path.display()))?,
                None => RayMarchSettings::default(),
            };
            if let Some(msaa) = msaa {
                settings.msaa = msaa;
            }
            settings.validate()?;

            let kernel = KernelInfo::reflect(sdfray_render_wgpu::RAYMARCH_SHADER, &settings.kernel_name)?;
            let scene = demo_scene(spheres);
            let counts = scene.counts();
            tracing::info!(
                kernel = %kernel.name,
                msaa = settings.msaa,
                records = counts.spheres + counts.boxes + counts.segments,
                "planning dispatch"
            );
            let mut camera = CameraParams::look_at(Vec3::new(0.0, 3.0, 8.0), Vec3::ZERO, 60.0, width, height);
            if preview {
                camera = camera.preview();
            }

            let renderer = DebugTextRenderer::new(settings, kernel.workgroup_size);
            print!("{}", renderer.render(&scene, &camera));
        }
        Commands::Kernel { program, kernel } => {
            let source = match &program {
                Some(path) => std::fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?,
                None => sdfray_render_wgpu::RAYMARCH_SHADER.to_string(),
            };
            let entries = KernelInfo::list(&source)?;
            tracing::debug!(count = entries.len(), "compute entry points");
            for entry in &entries {
                let wg = entry.workgroup_size;
                println!("{} @workgroup_size({}, {}, {})", entry.name, wg.x, wg.y, wg.z);
            }
            match entries.iter().find(|e| e.name == kernel) {
                Some(found) => println!("Kernel `{}`: OK", found.name),
                None => bail!("kernel `{kernel}` not found; the ray-march feature would stay disabled"),
            }
        }
        Commands::Churn { ops, seed } => {
            let (scene, live) = churn(ops, seed)?;
            tracing::info!(ops, seed, live, "churn finished");
            println!("{}", scene.summary());
            println!("Live handles: {live}, all tracking: OK");
        }
        Commands::Settings { path } => {
            let settings = RayMarchSettings::load(&path)
                .with_context(|| format!("loading settings from {}", path.display()))?;
            println!("kernel_name: {}", settings.kernel_name);
            println!("msaa: {} (preview: {})", settings.msaa, settings.effective_msaa(true));
        }
    }

    Ok(())
}

/// A row of spheres over a floor slab, a guide line and two lights.
fn demo_scene(spheres: usize) -> SceneContext {
    let mut scene = SceneContext::new();
    let shiny = MaterialRef::new(SdfMaterial {
        smoothness: 0.9,
        specular_power: 32.0,
        ..SdfMaterial::with_albedo(Color::rgb(0.9, 0.3, 0.2))
    });
    let floor = MaterialRef::new(SdfMaterial::with_albedo(Color::rgb(0.6, 0.6, 0.6)));

    for i in 0..spheres {
        let x = (i as f32 - (spheres as f32 - 1.0) * 0.5) * 1.5;
        scene.add(SphereRecord::new(Vec3::new(x, 0.5, 0.0), 0.5), Some(&shiny));
    }
    let slab = Transform {
        position: Vec3::new(0.0, -0.05, 0.0),
        scale: Vec3::new(10.0, 0.1, 10.0),
        ..Transform::default()
    };
    scene.add(BoxRecord::from_transform(&slab), Some(&floor));
    scene.add(
        SegmentRecord::new(Vec3::new(-3.0, 0.0, 2.0), Vec3::new(3.0, 0.0, 2.0), 0.002, false),
        None,
    );

    let sun = Transform::default().looking_along(Vec3::new(-0.4, -1.0, -0.3));
    scene.add_light(LightRecord::directional(&sun, Color::WHITE, 1.0));
    scene.add_light(LightRecord::point(Vec3::new(0.0, 3.0, 2.0), Color::rgb(1.0, 0.9, 0.7), 4.0));
    scene
}

/// Mixed mutation run. Fails if any live handle stops addressing its record.
fn churn(ops: usize, seed: u64) -> anyhow::Result<(SceneContext, usize)> {
    let mut scene = SceneContext::new();
    let mut live: Vec<(PrimitiveHandle, f32)> = Vec::new();
    let mut state = seed.max(1);
    let mut next = move || {
        // xorshift64
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        state
    };

    for step in 0..ops {
        let roll = next() % 10;
        if roll < 5 || live.is_empty() {
            let x = step as f32;
            live.push((scene.add(SphereRecord::new(Vec3::new(x, 0.0, 0.0), 1.0), None), x));
        } else if roll < 8 {
            let victim = live.swap_remove((next() % live.len() as u64) as usize);
            scene.remove(victim.0)?;
        } else {
            let slot = (next() % live.len() as u64) as usize;
            let x = -(step as f32);
            scene.update(live[slot].0, SphereRecord::new(Vec3::new(x, 0.0, 0.0), 1.0))?;
            live[slot].1 = x;
        }

        for (handle, x) in &live {
            let Some(pos) = scene.position(*handle) else {
                bail!("step {step}: live handle reported stale");
            };
            if scene.spheres().records()[pos].position[0] != *x {
                bail!("step {step}: handle at position {pos} addresses the wrong record");
            }
        }
    }
    Ok((scene, live.len()))
}
