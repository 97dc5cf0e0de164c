use crate::error::SceneError;
use crate::material::{MaterialRecord, MaterialRef, MaterialRegistry};
use crate::pool::{Pool, SlotKey};
use crate::records::{
    BoxRecord, LightRecord, PrimitiveKind, SdfPrimitive, SegmentRecord, SphereRecord,
};
use std::fmt;

/// Reference to a primitive registered with a [`SceneContext`].
///
/// Valid until the primitive is removed. Only meaningful for the context
/// that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PrimitiveHandle {
    kind: PrimitiveKind,
    key: SlotKey,
}

impl PrimitiveHandle {
    pub fn kind(&self) -> PrimitiveKind {
        self.kind
    }
}

/// Reference to a light registered with a [`SceneContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LightHandle(SlotKey);

/// Live record counts, as bound to the kernel's loop bounds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SceneCounts {
    pub spheres: u32,
    pub boxes: u32,
    pub segments: u32,
    pub lights: u32,
    pub materials: u32,
}

/// The scene's primitive pools and material registry behind one façade.
///
/// Constructed explicitly and passed to whoever owns scene objects and to the
/// dispatch driver. Not synchronized: mutate it from one thread only.
#[derive(Debug, Default)]
pub struct SceneContext {
    spheres: Pool<SphereRecord>,
    boxes: Pool<BoxRecord>,
    segments: Pool<SegmentRecord>,
    lights: Pool<LightRecord>,
    materials: MaterialRegistry,
}

impl SceneContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a primitive. Its material index is resolved from `material`
    /// (`None` selects the default material); any index already set on the
    /// record is overwritten.
    pub fn add(
        &mut self,
        primitive: impl Into<SdfPrimitive>,
        material: Option<&MaterialRef>,
    ) -> PrimitiveHandle {
        let index = self.materials.resolve_index(material);
        let primitive = primitive.into();
        let kind = primitive.kind();
        let key = match primitive {
            SdfPrimitive::Sphere(mut r) => {
                r.material_index = index;
                self.spheres.insert(r)
            }
            SdfPrimitive::Box(mut r) => {
                r.material_index = index;
                self.boxes.insert(r)
            }
            SdfPrimitive::Segment(mut r) => {
                r.material_index = index;
                self.segments.insert(r)
            }
        };
        tracing::debug!(%kind, material = index, "primitive added");
        PrimitiveHandle { kind, key }
    }

    /// Overwrite a primitive, keeping its current material.
    pub fn update(
        &mut self,
        handle: PrimitiveHandle,
        primitive: impl Into<SdfPrimitive>,
    ) -> Result<(), SceneError> {
        self.write(handle, primitive.into(), None)
    }

    /// Overwrite a primitive and reassign its material.
    pub fn update_with_material(
        &mut self,
        handle: PrimitiveHandle,
        primitive: impl Into<SdfPrimitive>,
        material: Option<&MaterialRef>,
    ) -> Result<(), SceneError> {
        let primitive = primitive.into();
        self.check(handle, primitive.kind())?;
        let index = self.materials.resolve_index(material);
        self.write(handle, primitive, Some(index))
    }

    /// Reassign the material of a live primitive, leaving its shape alone.
    pub fn set_material(
        &mut self,
        handle: PrimitiveHandle,
        material: Option<&MaterialRef>,
    ) -> Result<(), SceneError> {
        self.check(handle, handle.kind)?;
        let index = self.materials.resolve_index(material);
        let updated = match handle.kind {
            PrimitiveKind::Sphere => self.spheres.set_material_index(handle.key, index),
            PrimitiveKind::Box => self.boxes.set_material_index(handle.key, index),
            PrimitiveKind::Segment => self.segments.set_material_index(handle.key, index),
        };
        stale_unless(updated, handle.kind)
    }

    /// Remove a primitive and compact its pool. The handle is dead afterwards.
    pub fn remove(&mut self, handle: PrimitiveHandle) -> Result<SdfPrimitive, SceneError> {
        let removed = match handle.kind {
            PrimitiveKind::Sphere => self.spheres.remove(handle.key).map(SdfPrimitive::Sphere),
            PrimitiveKind::Box => self.boxes.remove(handle.key).map(SdfPrimitive::Box),
            PrimitiveKind::Segment => self.segments.remove(handle.key).map(SdfPrimitive::Segment),
        };
        let removed = removed.ok_or(SceneError::StaleHandle { kind: handle.kind })?;
        tracing::debug!(kind = %handle.kind, "primitive removed");
        Ok(removed)
    }

    pub fn get(&self, handle: PrimitiveHandle) -> Option<SdfPrimitive> {
        match handle.kind {
            PrimitiveKind::Sphere => self.spheres.get(handle.key).copied().map(SdfPrimitive::Sphere),
            PrimitiveKind::Box => self.boxes.get(handle.key).copied().map(SdfPrimitive::Box),
            PrimitiveKind::Segment => self
                .segments
                .get(handle.key)
                .copied()
                .map(SdfPrimitive::Segment),
        }
    }

    /// Current index of the primitive in its kind's buffer.
    pub fn position(&self, handle: PrimitiveHandle) -> Option<usize> {
        match handle.kind {
            PrimitiveKind::Sphere => self.spheres.position(handle.key),
            PrimitiveKind::Box => self.boxes.position(handle.key),
            PrimitiveKind::Segment => self.segments.position(handle.key),
        }
    }

    pub fn contains(&self, handle: PrimitiveHandle) -> bool {
        self.position(handle).is_some()
    }

    pub fn add_light(&mut self, light: LightRecord) -> LightHandle {
        let key = self.lights.insert(light);
        tracing::debug!(kind = ?light.light_kind(), "light added");
        LightHandle(key)
    }

    pub fn update_light(&mut self, handle: LightHandle, light: LightRecord) -> Result<(), SceneError> {
        self.lights
            .replace(handle.0, light)
            .map(|_| ())
            .ok_or(SceneError::StaleLight)
    }

    pub fn remove_light(&mut self, handle: LightHandle) -> Result<LightRecord, SceneError> {
        let removed = self.lights.remove(handle.0).ok_or(SceneError::StaleLight)?;
        tracing::debug!("light removed");
        Ok(removed)
    }

    pub fn light(&self, handle: LightHandle) -> Option<&LightRecord> {
        self.lights.get(handle.0)
    }

    pub fn light_position(&self, handle: LightHandle) -> Option<usize> {
        self.lights.position(handle.0)
    }

    pub fn spheres(&self) -> &Pool<SphereRecord> {
        &self.spheres
    }

    pub fn boxes(&self) -> &Pool<BoxRecord> {
        &self.boxes
    }

    pub fn segments(&self) -> &Pool<SegmentRecord> {
        &self.segments
    }

    pub fn lights(&self) -> &Pool<LightRecord> {
        &self.lights
    }

    pub fn materials(&self) -> &MaterialRegistry {
        &self.materials
    }

    /// Resolve a material without attaching it to anything, e.g. to warm the
    /// registry before the first frame.
    pub fn resolve_material(&mut self, material: Option<&MaterialRef>) -> u32 {
        self.materials.resolve_index(material)
    }

    /// Full material buffer, recomputed from current material values.
    pub fn material_buffer(&self) -> Vec<MaterialRecord> {
        self.materials.snapshot()
    }

    pub fn counts(&self) -> SceneCounts {
        SceneCounts {
            spheres: self.spheres.len() as u32,
            boxes: self.boxes.len() as u32,
            segments: self.segments.len() as u32,
            lights: self.lights.len() as u32,
            materials: self.materials.len() as u32,
        }
    }

    pub fn summary(&self) -> SceneSummary {
        SceneSummary {
            counts: self.counts(),
            revisions: [
                self.spheres.revision(),
                self.boxes.revision(),
                self.segments.revision(),
                self.lights.revision(),
            ],
        }
    }

    fn check(&self, handle: PrimitiveHandle, found: PrimitiveKind) -> Result<(), SceneError> {
        if handle.kind != found {
            return Err(SceneError::KindMismatch {
                expected: handle.kind,
                found,
            });
        }
        if !self.contains(handle) {
            return Err(SceneError::StaleHandle { kind: handle.kind });
        }
        Ok(())
    }

    fn write(
        &mut self,
        handle: PrimitiveHandle,
        primitive: SdfPrimitive,
        material_index: Option<u32>,
    ) -> Result<(), SceneError> {
        let updated = match (handle.kind, primitive) {
            (PrimitiveKind::Sphere, SdfPrimitive::Sphere(r)) => {
                self.spheres.update(handle.key, r, material_index)
            }
            (PrimitiveKind::Box, SdfPrimitive::Box(r)) => {
                self.boxes.update(handle.key, r, material_index)
            }
            (PrimitiveKind::Segment, SdfPrimitive::Segment(r)) => {
                self.segments.update(handle.key, r, material_index)
            }
            (expected, other) => {
                return Err(SceneError::KindMismatch {
                    expected,
                    found: other.kind(),
                });
            }
        };
        stale_unless(updated, handle.kind)
    }
}

fn stale_unless(updated: bool, kind: PrimitiveKind) -> Result<(), SceneError> {
    if updated {
        Ok(())
    } else {
        Err(SceneError::StaleHandle { kind })
    }
}

/// Scene state for inspectors and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneSummary {
    pub counts: SceneCounts,
    /// Pool revisions: spheres, boxes, segments, lights.
    pub revisions: [u64; 4],
}

impl fmt::Display for SceneSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = &self.counts;
        write!(
            f,
            "Scene: spheres={} boxes={} segments={} lights={} materials={}",
            c.spheres, c.boxes, c.segments, c.lights, c.materials
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::SdfMaterial;
    use crate::records::LightKind;
    use glam::Vec3;
    use sdfray_common::{Color, Transform};

    fn sphere(x: f32) -> SphereRecord {
        SphereRecord::new(Vec3::new(x, 0.0, 0.0), 0.5)
    }

    #[test]
    fn add_routes_by_kind() {
        let mut scene = SceneContext::new();
        let s = scene.add(sphere(0.0), None);
        let b = scene.add(BoxRecord::from_transform(&Transform::default()), None);
        let l = scene.add(SegmentRecord::new(Vec3::ZERO, Vec3::Y, 0.1, true), None);

        assert_eq!(s.kind(), PrimitiveKind::Sphere);
        assert_eq!(b.kind(), PrimitiveKind::Box);
        assert_eq!(l.kind(), PrimitiveKind::Segment);
        let counts = scene.counts();
        assert_eq!((counts.spheres, counts.boxes, counts.segments), (1, 1, 1));
        assert_eq!(counts.materials, 1);
    }

    #[test]
    fn add_injects_material_index() {
        let mut scene = SceneContext::new();
        let mat = MaterialRef::new(SdfMaterial::with_albedo(Color::rgb(0.0, 1.0, 0.0)));
        let mut rec = sphere(0.0);
        rec.material_index = 99;
        let h = scene.add(rec, Some(&mat));
        assert_eq!(scene.get(h).map(|p| p.material_index()), Some(1));

        let plain = scene.add(sphere(1.0), None);
        assert_eq!(scene.get(plain).map(|p| p.material_index()), Some(0));
    }

    #[test]
    fn update_with_wrong_kind_is_rejected() {
        let mut scene = SceneContext::new();
        let h = scene.add(sphere(0.0), None);
        let err = scene
            .update(h, BoxRecord::from_transform(&Transform::default()))
            .unwrap_err();
        assert_eq!(
            err,
            SceneError::KindMismatch {
                expected: PrimitiveKind::Sphere,
                found: PrimitiveKind::Box,
            }
        );
    }

    #[test]
    fn stale_handle_is_reported() {
        let mut scene = SceneContext::new();
        let h = scene.add(sphere(0.0), None);
        scene.remove(h).unwrap();
        assert_eq!(
            scene.update(h, sphere(1.0)),
            Err(SceneError::StaleHandle {
                kind: PrimitiveKind::Sphere
            })
        );
        assert!(scene.remove(h).is_err());
        assert!(scene.set_material(h, None).is_err());
    }

    #[test]
    fn set_material_reassigns_index_only() {
        let mut scene = SceneContext::new();
        let h = scene.add(sphere(3.0), None);
        let mat = MaterialRef::new(SdfMaterial::default());
        scene.set_material(h, Some(&mat)).unwrap();

        let Some(SdfPrimitive::Sphere(rec)) = scene.get(h) else {
            panic!("expected a sphere");
        };
        assert_eq!(rec.material_index, 1);
        assert_eq!(rec.position, [3.0, 0.0, 0.0]);

        scene.set_material(h, None).unwrap();
        assert_eq!(scene.get(h).map(|p| p.material_index()), Some(0));
    }

    #[test]
    fn update_with_material_overrides() {
        let mut scene = SceneContext::new();
        let mat = MaterialRef::new(SdfMaterial::default());
        let h = scene.add(sphere(0.0), Some(&mat));
        scene.update_with_material(h, sphere(1.0), None).unwrap();
        assert_eq!(scene.get(h).map(|p| p.material_index()), Some(0));
    }

    #[test]
    fn light_lifecycle() {
        let mut scene = SceneContext::new();
        let a = scene.add_light(LightRecord::point(Vec3::Y, Color::WHITE, 1.0));
        let b = scene.add_light(LightRecord::directional(
            &Transform::default(),
            Color::WHITE,
            0.5,
        ));
        scene.remove_light(a).unwrap();
        assert_eq!(scene.light_position(b), Some(0));
        assert_eq!(
            scene.light(b).and_then(LightRecord::light_kind),
            Some(LightKind::Directional)
        );
        let moved = LightRecord::point(Vec3::ZERO, Color::WHITE, 1.0);
        assert_eq!(scene.update_light(a, moved), Err(SceneError::StaleLight));
        assert_eq!(scene.lights().gpu_slice().len(), 1);
    }

    #[test]
    fn summary_display() {
        let mut scene = SceneContext::new();
        scene.add(sphere(0.0), None);
        let text = scene.summary().to_string();
        assert!(text.contains("spheres=1"));
        assert!(text.contains("materials=1"));
    }
}
