use crate::camera::CameraParams;
use crate::dispatch::{DispatchSize, WorkgroupSize, dispatch_size};
use crate::settings::RayMarchSettings;
use bytemuck::{Pod, Zeroable};
use sdfray_scene::{SceneContext, SceneCounts};

/// Uniform block bound to the kernel, one per camera per frame.
///
/// Field order follows the kernel's parameter block: `_CameraToWorld`,
/// `_WorldToCamera`, `_CameraInverseProjection`, `_CameraProjection`,
/// `_Width`, `_Height`, `_MSAA`, `_NumSpheres`, `_NumBoxes`,
/// `_NumLineSegments`, `_NumLights`, `_NearClip`, `_FarClip`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct FrameUniforms {
    pub camera_to_world: [[f32; 4]; 4],
    pub world_to_camera: [[f32; 4]; 4],
    pub camera_inverse_projection: [[f32; 4]; 4],
    pub camera_projection: [[f32; 4]; 4],
    pub width: u32,
    pub height: u32,
    pub msaa: u32,
    pub num_spheres: u32,
    pub num_boxes: u32,
    pub num_line_segments: u32,
    pub num_lights: u32,
    pub near_clip: f32,
    pub far_clip: f32,
    pub _pad: [u32; 3],
}

impl FrameUniforms {
    pub fn new(camera: &CameraParams, counts: SceneCounts, msaa: u32) -> Self {
        Self {
            camera_to_world: camera.camera_to_world.to_cols_array_2d(),
            world_to_camera: camera.world_to_camera().to_cols_array_2d(),
            camera_inverse_projection: camera.inverse_projection().to_cols_array_2d(),
            camera_projection: camera.projection.to_cols_array_2d(),
            width: camera.width,
            height: camera.height,
            msaa,
            num_spheres: counts.spheres,
            num_boxes: counts.boxes,
            num_line_segments: counts.segments,
            num_lights: counts.lights,
            near_clip: camera.near,
            far_clip: camera.far,
            _pad: [0; 3],
        }
    }
}

/// Everything needed to issue one dispatch for one camera.
#[derive(Debug, Clone, PartialEq)]
pub struct FramePlan {
    pub kernel: String,
    pub workgroup: WorkgroupSize,
    pub dispatch: DispatchSize,
    pub uniforms: FrameUniforms,
}

impl FramePlan {
    /// Plan a dispatch for `camera`. Reads the scene, never mutates it.
    pub fn build(
        scene: &SceneContext,
        camera: &CameraParams,
        settings: &RayMarchSettings,
        workgroup: WorkgroupSize,
    ) -> Self {
        let msaa = settings.effective_msaa(camera.is_preview);
        let uniforms = FrameUniforms::new(camera, scene.counts(), msaa);
        let dispatch = dispatch_size(camera.width, camera.height, workgroup);
        tracing::trace!(
            width = camera.width,
            height = camera.height,
            msaa,
            groups = ?dispatch.to_array(),
            "planned ray-march dispatch"
        );
        Self {
            kernel: settings.kernel_name.clone(),
            workgroup,
            dispatch,
            uniforms,
        }
    }

    /// A zero-area target has nothing to march.
    pub fn is_empty(&self) -> bool {
        self.dispatch.x == 0 || self.dispatch.y == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use sdfray_scene::{LightRecord, SphereRecord};
    use sdfray_common::Color;
    use std::mem::{offset_of, size_of};

    #[test]
    fn uniform_layout() {
        assert_eq!(size_of::<FrameUniforms>(), 304);
        assert_eq!(offset_of!(FrameUniforms, world_to_camera), 64);
        assert_eq!(offset_of!(FrameUniforms, camera_inverse_projection), 128);
        assert_eq!(offset_of!(FrameUniforms, camera_projection), 192);
        assert_eq!(offset_of!(FrameUniforms, width), 256);
        assert_eq!(offset_of!(FrameUniforms, num_lights), 280);
        assert_eq!(offset_of!(FrameUniforms, near_clip), 284);
        assert_eq!(offset_of!(FrameUniforms, far_clip), 288);
    }

    #[test]
    fn plan_carries_counts_and_grid() {
        let mut scene = SceneContext::new();
        scene.add(SphereRecord::new(Vec3::ZERO, 1.0), None);
        scene.add(SphereRecord::new(Vec3::X, 0.5), None);
        scene.add_light(LightRecord::point(Vec3::Y, Color::WHITE, 1.0));

        let camera = CameraParams::look_at(Vec3::Z * 5.0, Vec3::ZERO, 60.0, 1921, 1080);
        let plan = FramePlan::build(&scene, &camera, &RayMarchSettings::default(), WorkgroupSize::default());

        assert_eq!(plan.kernel, "main");
        assert_eq!(plan.dispatch.to_array(), [241, 135, 1]);
        assert_eq!(plan.uniforms.num_spheres, 2);
        assert_eq!(plan.uniforms.num_boxes, 0);
        assert_eq!(plan.uniforms.num_lights, 1);
        assert_eq!(plan.uniforms.width, 1921);
        assert_eq!(plan.uniforms.near_clip, camera.near);
    }

    #[test]
    fn preview_camera_plans_single_sample() {
        let scene = SceneContext::new();
        let settings = RayMarchSettings {
            msaa: 4,
            ..Default::default()
        };
        let game = CameraParams::default();
        let preview = game.preview();
        let wg = WorkgroupSize::default();

        assert_eq!(FramePlan::build(&scene, &game, &settings, wg).uniforms.msaa, 4);
        assert_eq!(FramePlan::build(&scene, &preview, &settings, wg).uniforms.msaa, 1);
    }

    #[test]
    fn planning_leaves_scene_untouched() {
        let mut scene = SceneContext::new();
        scene.add(SphereRecord::new(Vec3::ZERO, 1.0), None);
        let before = scene.summary();
        let _ = FramePlan::build(&scene, &CameraParams::default(), &RayMarchSettings::default(), WorkgroupSize::default());
        assert_eq!(scene.summary(), before);
    }
}
