use glam::{Mat4, Vec2, Vec3, Vec4};

/// Lower bound on the cosine between a ray and the view axis when turning
/// linear depth into a distance along that ray. Mirrored by the kernel.
pub const MIN_FORWARD_COS: f32 = 1e-4;

/// Camera state captured for one dispatch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraParams {
    /// Render target width in pixels.
    pub width: u32,
    /// Render target height in pixels.
    pub height: u32,
    pub near: f32,
    pub far: f32,
    pub camera_to_world: Mat4,
    pub projection: Mat4,
    /// Scene-view style preview cameras never supersample.
    pub is_preview: bool,
}

impl Default for CameraParams {
    fn default() -> Self {
        Self::look_at(Vec3::new(0.0, 2.0, 6.0), Vec3::ZERO, 60.0, 1280, 720)
    }
}

impl CameraParams {
    /// Right-handed perspective camera at `eye` looking toward `target`.
    pub fn look_at(eye: Vec3, target: Vec3, fov_degrees: f32, width: u32, height: u32) -> Self {
        let near = 0.1;
        let far = 1000.0;
        let view = Mat4::look_at_rh(eye, target, Vec3::Y);
        let aspect = width.max(1) as f32 / height.max(1) as f32;
        Self {
            width,
            height,
            near,
            far,
            camera_to_world: view.inverse(),
            projection: Mat4::perspective_rh(fov_degrees.to_radians(), aspect, near, far),
            is_preview: false,
        }
    }

    pub fn with_clip(mut self, near: f32, far: f32) -> Self {
        let aspect = self.aspect();
        let fov = 2.0 * (1.0 / self.projection.y_axis.y).atan();
        self.near = near;
        self.far = far;
        self.projection = Mat4::perspective_rh(fov, aspect, near, far);
        self
    }

    pub fn preview(mut self) -> Self {
        self.is_preview = true;
        self
    }

    pub fn world_to_camera(&self) -> Mat4 {
        self.camera_to_world.inverse()
    }

    pub fn inverse_projection(&self) -> Mat4 {
        self.projection.inverse()
    }

    pub fn eye(&self) -> Vec3 {
        self.camera_to_world.w_axis.truncate()
    }

    pub fn aspect(&self) -> f32 {
        self.width.max(1) as f32 / self.height.max(1) as f32
    }

    /// Unit view axis in world space.
    pub fn forward(&self) -> Vec3 {
        -self.camera_to_world.z_axis.truncate().normalize_or_zero()
    }

    /// World-space direction of the primary ray through `ndc` (y up),
    /// built the same way the kernel builds it.
    pub fn ray_direction(&self, ndc: Vec2) -> Vec3 {
        let view = self.inverse_projection() * Vec4::new(ndc.x, ndc.y, 0.0, 1.0);
        self.camera_to_world
            .transform_vector3(view.truncate())
            .normalize_or_zero()
    }

    /// Distance along `dir` at which marching must stop for a pixel whose
    /// depth target holds `depth` (view-space depth over far clip).
    ///
    /// Depth is measured along the view axis; off-axis rays travel further
    /// to reach the same depth.
    pub fn ray_limit(&self, depth: f32, dir: Vec3) -> f32 {
        depth.min(1.0) * self.far / dir.dot(self.forward()).max(MIN_FORWARD_COS)
    }
}
