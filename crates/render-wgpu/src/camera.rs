use glam::{Mat4, Vec3};
use sdfray_render::CameraParams;

/// Camera orbiting a target point, driven by mouse drag and scroll.
#[derive(Debug, Clone)]
pub struct OrbitCamera {
    pub target: Vec3,
    pub distance: f32,
    pub yaw: f32,
    pub pitch: f32,
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub sensitivity: f32,
    pub zoom_speed: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self {
            target: Vec3::ZERO,
            distance: 8.0,
            yaw: 35.0_f32.to_radians(),
            pitch: 20.0_f32.to_radians(),
            fov_degrees: 60.0,
            near: 0.1,
            far: 200.0,
            sensitivity: 0.005,
            zoom_speed: 0.1,
        }
    }
}

impl OrbitCamera {
    pub fn eye(&self) -> Vec3 {
        let dir = Vec3::new(
            self.yaw.sin() * self.pitch.cos(),
            self.pitch.sin(),
            self.yaw.cos() * self.pitch.cos(),
        );
        self.target + dir * self.distance
    }

    pub fn rotate(&mut self, dx: f32, dy: f32) {
        self.yaw -= dx * self.sensitivity;
        self.pitch = (self.pitch + dy * self.sensitivity)
            .clamp(-89.0_f32.to_radians(), 89.0_f32.to_radians());
    }

    /// Positive `scroll` moves toward the target.
    pub fn zoom(&mut self, scroll: f32) {
        let factor = (1.0 - scroll * self.zoom_speed).clamp(0.5, 1.5);
        self.distance = (self.distance * factor).clamp(self.near * 5.0, self.far * 0.5);
    }

    pub fn params(&self, width: u32, height: u32) -> CameraParams {
        CameraParams::look_at(self.eye(), self.target, self.fov_degrees, width, height)
            .with_clip(self.near, self.far)
    }

    pub fn view_projection(&self, width: u32, height: u32) -> Mat4 {
        let params = self.params(width, height);
        params.projection * params.world_to_camera()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_camera() {
        let cam = OrbitCamera::default();
        assert!(cam.eye().y > 0.0);
        assert!((cam.eye().distance(cam.target) - cam.distance).abs() < 1e-4);
        assert!(!cam.view_projection(1280, 720).col(0).x.is_nan());
    }

    #[test]
    fn pitch_is_clamped() {
        let mut cam = OrbitCamera::default();
        cam.rotate(0.0, 1.0e6);
        assert!(cam.pitch <= 89.0_f32.to_radians());
        cam.rotate(0.0, -1.0e6);
        assert!(cam.pitch >= -89.0_f32.to_radians());
    }

    #[test]
    fn zoom_moves_toward_target() {
        let mut cam = OrbitCamera::default();
        let before = cam.distance;
        cam.zoom(1.0);
        assert!(cam.distance < before);
    }

    #[test]
    fn params_use_camera_clip() {
        let cam = OrbitCamera {
            near: 0.25,
            far: 80.0,
            ..Default::default()
        };
        let p = cam.params(640, 480);
        assert_eq!((p.near, p.far), (0.25, 80.0));
        assert!((p.eye() - cam.eye()).length() < 1e-4);
    }
}
