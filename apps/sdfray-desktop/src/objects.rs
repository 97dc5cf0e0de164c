//! Scene owners: objects that register a primitive while enabled, push
//! edits when dirty, and unregister when disabled.

use glam::Vec3;
use sdfray_common::{Color, Transform};
use sdfray_scene::{
    BoxRecord, LightHandle, LightRecord, MaterialRef, PrimitiveHandle, SceneContext, SdfPrimitive,
    SegmentRecord, SphereRecord,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Sphere { radius: f32 },
    /// Unit cube scaled by the transform.
    Box,
    /// Runs from the transform position along its forward axis.
    Segment { length: f32, thickness: f32, perspective: bool },
}

#[derive(Debug)]
pub struct SdfObject {
    pub name: String,
    pub shape: Shape,
    transform: Transform,
    material: Option<MaterialRef>,
    handle: Option<PrimitiveHandle>,
    dirty: bool,
}

impl SdfObject {
    pub fn new(name: impl Into<String>, shape: Shape, transform: Transform, material: Option<MaterialRef>) -> Self {
        Self {
            name: name.into(),
            shape,
            transform,
            material,
            handle: None,
            dirty: false,
        }
    }

    pub fn record(&self) -> SdfPrimitive {
        let t = &self.transform;
        match self.shape {
            Shape::Sphere { radius } => SphereRecord::new(t.position, radius * t.scale.max_element()).into(),
            Shape::Box => BoxRecord::from_transform(t).into(),
            Shape::Segment {
                length,
                thickness,
                perspective,
            } => SegmentRecord::new(t.position, t.position + t.forward() * length, thickness, perspective).into(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.handle.is_some()
    }

    pub fn handle(&self) -> Option<PrimitiveHandle> {
        self.handle
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn material(&self) -> Option<&MaterialRef> {
        self.material.as_ref()
    }

    pub fn enable(&mut self, scene: &mut SceneContext) {
        if self.handle.is_none() {
            self.handle = Some(scene.add(self.record(), self.material.as_ref()));
            self.dirty = false;
            tracing::debug!(name = %self.name, "registered primitive");
        }
    }

    pub fn disable(&mut self, scene: &mut SceneContext) {
        if let Some(handle) = self.handle.take() {
            if let Err(err) = scene.remove(handle) {
                tracing::warn!(name = %self.name, %err, "failed to unregister primitive");
            }
        }
    }

    pub fn set_transform(&mut self, transform: Transform) {
        if transform != self.transform {
            self.transform = transform;
            self.dirty = true;
        }
    }

    pub fn set_shape(&mut self, shape: Shape) {
        if shape != self.shape {
            self.shape = shape;
            self.dirty = true;
        }
    }

    pub fn set_material(&mut self, scene: &mut SceneContext, material: Option<MaterialRef>) {
        self.material = material;
        if let Some(handle) = self.handle {
            if let Err(err) = scene.set_material(handle, self.material.as_ref()) {
                tracing::warn!(name = %self.name, %err, "failed to reassign material");
            }
        }
    }

    /// Push pending edits to the scene.
    pub fn sync(&mut self, scene: &mut SceneContext) {
        if !self.dirty {
            return;
        }
        self.dirty = false;
        if let Some(handle) = self.handle {
            if let Err(err) = scene.update(handle, self.record()) {
                tracing::warn!(name = %self.name, %err, "failed to update primitive");
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightShape {
    Directional,
    Point,
}

#[derive(Debug)]
pub struct LightObject {
    pub name: String,
    pub shape: LightShape,
    pub color: Color,
    pub intensity: f32,
    transform: Transform,
    handle: Option<LightHandle>,
    dirty: bool,
}

impl LightObject {
    pub fn new(name: impl Into<String>, shape: LightShape, transform: Transform, color: Color, intensity: f32) -> Self {
        Self {
            name: name.into(),
            shape,
            color,
            intensity,
            transform,
            handle: None,
            dirty: false,
        }
    }

    pub fn record(&self) -> LightRecord {
        match self.shape {
            LightShape::Directional => LightRecord::directional(&self.transform, self.color, self.intensity),
            LightShape::Point => LightRecord::point(self.transform.position, self.color, self.intensity),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.handle.is_some()
    }

    pub fn enable(&mut self, scene: &mut SceneContext) {
        if self.handle.is_none() {
            self.handle = Some(scene.add_light(self.record()));
            self.dirty = false;
        }
    }

    pub fn disable(&mut self, scene: &mut SceneContext) {
        if let Some(handle) = self.handle.take() {
            if let Err(err) = scene.remove_light(handle) {
                tracing::warn!(name = %self.name, %err, "failed to unregister light");
            }
        }
    }

    /// Flag a change made through the public fields.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn sync(&mut self, scene: &mut SceneContext) {
        if !self.dirty {
            return;
        }
        self.dirty = false;
        if let Some(handle) = self.handle {
            if let Err(err) = scene.update_light(handle, self.record()) {
                tracing::warn!(name = %self.name, %err, "failed to update light");
            }
        }
    }
}

/// Spawn point in front of the camera, on the floor.
pub fn spawn_point(eye: Vec3, target: Vec3) -> Vec3 {
    let toward = (target - eye).with_y(0.0).normalize_or_zero();
    let p = target - toward * 1.5;
    Vec3::new(p.x, 0.5, p.z)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdfray_scene::SdfMaterial;

    fn sphere_at(x: f32) -> SdfObject {
        SdfObject::new(
            "ball",
            Shape::Sphere { radius: 0.5 },
            Transform::from_position(Vec3::new(x, 0.0, 0.0)),
            None,
        )
    }

    #[test]
    fn enable_disable_registers_once() {
        let mut scene = SceneContext::new();
        let mut ball = sphere_at(0.0);
        ball.enable(&mut scene);
        ball.enable(&mut scene);
        assert_eq!(scene.counts().spheres, 1);

        ball.disable(&mut scene);
        ball.disable(&mut scene);
        assert_eq!(scene.counts().spheres, 0);
        assert!(!ball.is_enabled());
    }

    #[test]
    fn dirty_transform_is_pushed_on_sync() {
        let mut scene = SceneContext::new();
        let mut ball = sphere_at(0.0);
        ball.enable(&mut scene);
        let before = scene.spheres().revision();

        ball.sync(&mut scene);
        assert_eq!(scene.spheres().revision(), before);

        ball.set_transform(Transform::from_position(Vec3::new(2.0, 0.0, 0.0)));
        ball.sync(&mut scene);
        let handle = ball.handle().unwrap();
        assert!(matches!(scene.get(handle), Some(SdfPrimitive::Sphere(s)) if s.position == [2.0, 0.0, 0.0]));
    }

    #[test]
    fn siblings_survive_removal() {
        let mut scene = SceneContext::new();
        let mut a = sphere_at(1.0);
        let mut b = sphere_at(2.0);
        a.enable(&mut scene);
        b.enable(&mut scene);
        a.disable(&mut scene);

        b.set_transform(Transform::from_position(Vec3::new(5.0, 0.0, 0.0)));
        b.sync(&mut scene);
        assert_eq!(scene.spheres().records()[0].position, [5.0, 0.0, 0.0]);
    }

    #[test]
    fn material_swap_reaches_scene() {
        let mut scene = SceneContext::new();
        let mut ball = sphere_at(0.0);
        ball.enable(&mut scene);
        let red = MaterialRef::new(SdfMaterial::with_albedo(Color::rgb(1.0, 0.0, 0.0)));
        ball.set_material(&mut scene, Some(red));
        let handle = ball.handle().unwrap();
        assert_eq!(scene.get(handle).map(|p| p.material_index()), Some(1));
    }

    #[test]
    fn segment_runs_along_forward() {
        let seg = SdfObject::new(
            "line",
            Shape::Segment {
                length: 2.0,
                thickness: 0.1,
                perspective: true,
            },
            Transform::default(),
            None,
        );
        match seg.record() {
            SdfPrimitive::Segment(s) => assert_eq!(s.end, [0.0, 0.0, -2.0]),
            other => panic!("expected segment, got {other:?}"),
        }
    }

    #[test]
    fn light_edits_sync() {
        let mut scene = SceneContext::new();
        let mut lamp = LightObject::new("lamp", LightShape::Point, Transform::default(), Color::WHITE, 1.0);
        lamp.enable(&mut scene);
        lamp.intensity = 3.0;
        lamp.mark_dirty();
        lamp.sync(&mut scene);
        assert_eq!(scene.lights().records()[0].intensity, 3.0);
        lamp.disable(&mut scene);
        assert_eq!(scene.counts().lights, 0);
    }
}
