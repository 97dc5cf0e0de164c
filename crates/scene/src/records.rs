//! GPU-layout records for every primitive kind.
//!
//! Each struct mirrors a WGSL storage-buffer struct field for field. Explicit
//! padding keeps them `Pod` and matches WGSL alignment (vec3 aligns to 16).

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use sdfray_common::{Color, Transform};
use std::fmt;

/// A record that can live in a [`Pool`](crate::Pool) and be uploaded as-is.
pub trait GpuRecord: Pod + fmt::Debug {
    /// Buffer label used for logging and GPU debug names.
    const LABEL: &'static str;

    /// Inert record bound in place of an empty pool.
    fn blank() -> Self {
        Self::zeroed()
    }
}

/// Records that reference an entry in the material buffer.
pub trait MaterialSlot {
    fn material_index(&self) -> u32;
    fn set_material_index(&mut self, index: u32);
}

macro_rules! material_slot {
    ($($record:ty),+) => {
        $(
            impl MaterialSlot for $record {
                fn material_index(&self) -> u32 {
                    self.material_index
                }

                fn set_material_index(&mut self, index: u32) {
                    self.material_index = index;
                }
            }
        )+
    };
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct SphereRecord {
    pub position: [f32; 3],
    pub radius: f32,
    pub material_index: u32,
    pub _pad: [u32; 3],
}

impl SphereRecord {
    pub fn new(position: Vec3, radius: f32) -> Self {
        Self {
            position: position.into(),
            radius,
            material_index: 0,
            _pad: [0; 3],
        }
    }
}

impl GpuRecord for SphereRecord {
    const LABEL: &'static str = "spheres";
}

/// Oriented box. The kernel moves sample points into box space with
/// `transform_inverse` and evaluates an axis-aligned box of `half_extents`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct BoxRecord {
    pub transform_inverse: [[f32; 4]; 4],
    pub half_extents: [f32; 3],
    pub material_index: u32,
}

impl BoxRecord {
    pub fn new(transform_inverse: Mat4, half_extents: Vec3) -> Self {
        Self {
            transform_inverse: transform_inverse.to_cols_array_2d(),
            half_extents: half_extents.into(),
            material_index: 0,
        }
    }

    /// Unit cube placed by `transform`; scale becomes the box size.
    pub fn from_transform(transform: &Transform) -> Self {
        Self::new(
            transform.rigid_matrix().inverse(),
            transform.scale.abs() * 0.5,
        )
    }
}

impl GpuRecord for BoxRecord {
    const LABEL: &'static str = "boxes";
}

/// Capsule between two points. With `perspective == 0` the thickness is
/// scaled by distance to the eye so the line keeps a steady on-screen width.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct SegmentRecord {
    pub start: [f32; 3],
    pub thickness: f32,
    pub end: [f32; 3],
    pub perspective: u32,
    pub material_index: u32,
    pub _pad: [u32; 3],
}

impl SegmentRecord {
    pub fn new(start: Vec3, end: Vec3, thickness: f32, perspective: bool) -> Self {
        Self {
            start: start.into(),
            thickness: thickness.abs(),
            end: end.into(),
            perspective: u32::from(perspective),
            material_index: 0,
            _pad: [0; 3],
        }
    }
}

impl GpuRecord for SegmentRecord {
    const LABEL: &'static str = "segments";
}

material_slot!(SphereRecord, BoxRecord, SegmentRecord);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum LightKind {
    Directional = 0,
    Point = 1,
}

impl LightKind {
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Self::Directional),
            1 => Some(Self::Point),
            _ => None,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LightRecord {
    pub position: [f32; 3],
    pub intensity: f32,
    /// Points toward the light for directional lights.
    pub direction: [f32; 3],
    pub kind: u32,
    pub color: [f32; 4],
}

impl LightRecord {
    pub fn new(kind: LightKind, position: Vec3, direction: Vec3, color: Color, intensity: f32) -> Self {
        Self {
            position: position.into(),
            intensity,
            direction: direction.normalize_or_zero().into(),
            kind: kind as u32,
            color: color.to_array(),
        }
    }

    /// Light shining along the transform's forward axis.
    pub fn directional(transform: &Transform, color: Color, intensity: f32) -> Self {
        Self::new(
            LightKind::Directional,
            transform.position,
            -transform.forward(),
            color,
            intensity,
        )
    }

    pub fn point(position: Vec3, color: Color, intensity: f32) -> Self {
        Self::new(LightKind::Point, position, Vec3::ZERO, color, intensity)
    }

    pub fn light_kind(&self) -> Option<LightKind> {
        LightKind::from_raw(self.kind)
    }
}

impl GpuRecord for LightRecord {
    const LABEL: &'static str = "lights";
}

/// Primitive kinds that carry a material and live in their own pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrimitiveKind {
    Sphere,
    Box,
    Segment,
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Sphere => "sphere",
            Self::Box => "box",
            Self::Segment => "segment",
        })
    }
}

/// A primitive description routed to the pool of its kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SdfPrimitive {
    Sphere(SphereRecord),
    Box(BoxRecord),
    Segment(SegmentRecord),
}

impl SdfPrimitive {
    pub fn kind(&self) -> PrimitiveKind {
        match self {
            Self::Sphere(_) => PrimitiveKind::Sphere,
            Self::Box(_) => PrimitiveKind::Box,
            Self::Segment(_) => PrimitiveKind::Segment,
        }
    }

    pub fn material_index(&self) -> u32 {
        match self {
            Self::Sphere(r) => r.material_index(),
            Self::Box(r) => r.material_index(),
            Self::Segment(r) => r.material_index(),
        }
    }
}

impl From<SphereRecord> for SdfPrimitive {
    fn from(r: SphereRecord) -> Self {
        Self::Sphere(r)
    }
}

impl From<BoxRecord> for SdfPrimitive {
    fn from(r: BoxRecord) -> Self {
        Self::Box(r)
    }
}

impl From<SegmentRecord> for SdfPrimitive {
    fn from(r: SegmentRecord) -> Self {
        Self::Segment(r)
    }
}
