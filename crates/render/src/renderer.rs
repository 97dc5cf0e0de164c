use crate::camera::CameraParams;
use crate::dispatch::WorkgroupSize;
use crate::frame::FramePlan;
use crate::settings::RayMarchSettings;
use sdfray_scene::SceneContext;
use std::fmt::Write;

/// Renderer-agnostic interface.
///
/// A renderer reads scene state and a camera, then produces output. It never
/// mutates the scene.
pub trait Renderer {
    /// The output type produced by this renderer.
    type Output;

    /// Render one frame of `scene` as seen from `camera`.
    fn render(&self, scene: &SceneContext, camera: &CameraParams) -> Self::Output;
}

/// Describes the dispatch a GPU backend would issue, as text.
///
/// Useful for CLI output, logging, and testing the render interface without
/// a device.
#[derive(Debug, Default)]
pub struct DebugTextRenderer {
    pub settings: RayMarchSettings,
    pub workgroup: WorkgroupSize,
}

impl DebugTextRenderer {
    pub fn new(settings: RayMarchSettings, workgroup: WorkgroupSize) -> Self {
        Self {
            settings,
            workgroup,
        }
    }
}

impl Renderer for DebugTextRenderer {
    type Output = String;

    fn render(&self, scene: &SceneContext, camera: &CameraParams) -> String {
        let plan = FramePlan::build(scene, camera, &self.settings, self.workgroup);
        let u = &plan.uniforms;
        let eye = camera.eye();

        let mut out = String::new();
        let _ = writeln!(out, "=== Ray March Frame (kernel={}) ===", plan.kernel);
        let _ = writeln!(out, "{}", scene.summary());
        let _ = writeln!(
            out,
            "Target: {}x{} msaa={}{}",
            u.width,
            u.height,
            u.msaa,
            if camera.is_preview { " (preview)" } else { "" }
        );
        let _ = writeln!(
            out,
            "Dispatch: groups=({}, {}, {}) workgroup=({}, {}, {}) invocations={}",
            plan.dispatch.x,
            plan.dispatch.y,
            plan.dispatch.z,
            plan.workgroup.x,
            plan.workgroup.y,
            plan.workgroup.z,
            plan.dispatch.invocations(plan.workgroup)
        );
        let _ = writeln!(
            out,
            "Camera: eye=({:.1}, {:.1}, {:.1}) clip=[{:.2}, {:.1}]",
            eye.x, eye.y, eye.z, u.near_clip, u.far_clip
        );

        for (i, s) in scene.spheres().records().iter().enumerate() {
            let p = s.position;
            let _ = writeln!(
                out,
                "  sphere[{i}] pos=({:.2}, {:.2}, {:.2}) r={:.2} mat={}",
                p[0], p[1], p[2], s.radius, s.material_index
            );
        }
        for (i, b) in scene.boxes().records().iter().enumerate() {
            let h = b.half_extents;
            let _ = writeln!(
                out,
                "  box[{i}] half=({:.2}, {:.2}, {:.2}) mat={}",
                h[0], h[1], h[2], b.material_index
            );
        }
        for (i, s) in scene.segments().records().iter().enumerate() {
            let _ = writeln!(
                out,
                "  segment[{i}] thickness={:.3} perspective={} mat={}",
                s.thickness,
                s.perspective != 0,
                s.material_index
            );
        }
        for (i, l) in scene.lights().records().iter().enumerate() {
            let kind = l
                .light_kind()
                .map_or("unknown", |k| match k {
                    sdfray_scene::LightKind::Directional => "directional",
                    sdfray_scene::LightKind::Point => "point",
                });
            let _ = writeln!(out, "  light[{i}] {kind} intensity={:.2}", l.intensity);
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use sdfray_common::{Color, Transform};
    use sdfray_scene::{BoxRecord, LightRecord, MaterialRef, SdfMaterial, SphereRecord};

    #[test]
    fn debug_renderer_empty_scene() {
        let scene = SceneContext::new();
        let renderer = DebugTextRenderer::default();
        let output = renderer.render(&scene, &CameraParams::default());

        assert!(output.contains("kernel=main"));
        assert!(output.contains("spheres=0"));
        assert!(output.contains("materials=1"));
        assert!(output.contains("groups=(160, 90, 1)"));
    }

    #[test]
    fn debug_renderer_lists_primitives() {
        let mut scene = SceneContext::new();
        let mat = MaterialRef::new(SdfMaterial::default());
        scene.add(SphereRecord::new(Vec3::new(1.0, 2.0, 3.0), 0.5), Some(&mat));
        scene.add(BoxRecord::from_transform(&Transform::default()), None);
        scene.add_light(LightRecord::directional(&Transform::default(), Color::WHITE, 1.0));

        let renderer = DebugTextRenderer::default();
        let output = renderer.render(&scene, &CameraParams::default().preview());

        assert!(output.contains("sphere[0] pos=(1.00, 2.00, 3.00) r=0.50 mat=1"));
        assert!(output.contains("box[0] half=(0.50, 0.50, 0.50) mat=0"));
        assert!(output.contains("light[0] directional"));
        assert!(output.contains("(preview)"));
    }
}
