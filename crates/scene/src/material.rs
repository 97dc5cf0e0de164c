use crate::records::GpuRecord;
use bytemuck::{Pod, Zeroable};
use parking_lot::RwLock;
use sdfray_common::Color;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct MaterialRecord {
    pub albedo: [f32; 4],
    pub ambient: [f32; 4],
    pub smoothness: f32,
    pub specular_power: f32,
    pub ambient_strength: f32,
    pub opacity: f32,
    pub lit: u32,
    pub _pad: [u32; 3],
}

impl MaterialRecord {
    /// Entry 0 of every material buffer: flat magenta, unlit.
    pub const DEFAULT: Self = Self {
        albedo: [1.0, 0.0, 1.0, 1.0],
        ambient: [0.0, 0.0, 0.0, 1.0],
        smoothness: 0.5,
        specular_power: 3.0,
        ambient_strength: 0.2,
        opacity: 1.0,
        lit: 0,
        _pad: [0; 3],
    };
}

impl GpuRecord for MaterialRecord {
    const LABEL: &'static str = "materials";

    fn blank() -> Self {
        Self::DEFAULT
    }
}

/// Authoring-side material description.
#[derive(Debug, Clone, PartialEq)]
pub struct SdfMaterial {
    pub albedo: Color,
    /// 0..=1, scales the specular highlight.
    pub smoothness: f32,
    pub specular_power: f32,
    pub ambient: Color,
    /// 0..=1
    pub ambient_strength: f32,
    /// 0..=1
    pub opacity: f32,
    pub lit: bool,
}

impl Default for SdfMaterial {
    fn default() -> Self {
        Self {
            albedo: Color::WHITE,
            smoothness: 0.5,
            specular_power: 3.0,
            ambient: Color::BLACK,
            ambient_strength: 0.2,
            opacity: 1.0,
            lit: true,
        }
    }
}

impl SdfMaterial {
    pub fn with_albedo(albedo: Color) -> Self {
        Self {
            albedo,
            ..Self::default()
        }
    }

    pub fn to_record(&self) -> MaterialRecord {
        MaterialRecord {
            albedo: self.albedo.to_array(),
            ambient: self.ambient.to_array(),
            smoothness: self.smoothness,
            specular_power: self.specular_power,
            ambient_strength: self.ambient_strength,
            opacity: self.opacity,
            lit: u32::from(self.lit),
            _pad: [0; 3],
        }
    }
}

/// Shared, editable material. Clones refer to the same material; the registry
/// tells materials apart by this identity, not by field values.
#[derive(Clone)]
pub struct MaterialRef(Arc<RwLock<SdfMaterial>>);

impl MaterialRef {
    pub fn new(material: SdfMaterial) -> Self {
        Self(Arc::new(RwLock::new(material)))
    }

    pub fn get(&self) -> SdfMaterial {
        self.0.read().clone()
    }

    /// Edit in place. Seen by the next material snapshot.
    pub fn edit(&self, f: impl FnOnce(&mut SdfMaterial)) {
        f(&mut self.0.write());
    }

    pub fn to_record(&self) -> MaterialRecord {
        self.0.read().to_record()
    }

    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }

    fn identity(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }
}

impl fmt::Debug for MaterialRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MaterialRef").field(&*self.0.read()).finish()
    }
}

/// Grow-only registry assigning buffer indices to materials by identity.
///
/// Index 0 is [`MaterialRecord::DEFAULT`] and is never stored. The registry
/// keeps a clone of every material it has seen, so an identity cannot be
/// freed and reused by a different material while the registry lives.
#[derive(Debug, Default)]
pub struct MaterialRegistry {
    materials: Vec<MaterialRef>,
    indices: HashMap<usize, u32>,
}

impl MaterialRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer index for `material`, registering it on first sight.
    /// `None` resolves to the default material.
    pub fn resolve_index(&mut self, material: Option<&MaterialRef>) -> u32 {
        let Some(material) = material else {
            return 0;
        };
        if let Some(&index) = self.indices.get(&material.identity()) {
            return index;
        }
        self.materials.push(material.clone());
        let index = self.materials.len() as u32;
        self.indices.insert(material.identity(), index);
        tracing::debug!(index, "registered material");
        index
    }

    /// Index previously assigned to `material`, without registering it.
    pub fn index_of(&self, material: &MaterialRef) -> Option<u32> {
        self.indices.get(&material.identity()).copied()
    }

    pub fn get(&self, index: u32) -> Option<&MaterialRef> {
        let slot = (index as usize).checked_sub(1)?;
        self.materials.get(slot)
    }

    /// Number of entries in the material buffer, default included.
    pub fn len(&self) -> usize {
        self.materials.len() + 1
    }

    /// Always false: the default entry is always present.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Rebuild the full material buffer from current field values.
    ///
    /// Recomputed on every call so that edits made through any
    /// [`MaterialRef`] clone are picked up without a dirty flag.
    pub fn snapshot(&self) -> Vec<MaterialRecord> {
        std::iter::once(MaterialRecord::DEFAULT)
            .chain(self.materials.iter().map(MaterialRef::to_record))
            .collect()
    }
}
