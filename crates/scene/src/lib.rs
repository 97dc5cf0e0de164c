//! SDF scene context: the CPU side of the ray-marching renderer.
//!
//! Owning objects describe primitives as plain GPU-layout records and hand
//! them to a [`SceneContext`]. The context routes each record to the pool for
//! its kind, resolves its material through the [`MaterialRegistry`], and
//! exposes every pool as a contiguous, never-empty slice ready for upload.
//!
//! # Invariants
//! - Buffer order is insertion order; removal compacts without reordering.
//! - A handle stays valid until its own primitive is removed, regardless of
//!   sibling mutation. Removed handles are detected, never dereferenced.
//! - Material index 0 is the immutable default material.
//! - Single-threaded: the context performs no internal synchronization and
//!   is mutated from the update/render thread only.

mod error;
mod material;
mod pool;
mod records;
mod scene;

pub use error::SceneError;
pub use material::{MaterialRecord, MaterialRef, MaterialRegistry, SdfMaterial};
pub use pool::{Pool, SlotKey};
pub use records::{
    BoxRecord, GpuRecord, LightKind, LightRecord, MaterialSlot, PrimitiveKind, SdfPrimitive,
    SegmentRecord, SphereRecord,
};
pub use scene::{LightHandle, PrimitiveHandle, SceneContext, SceneCounts, SceneSummary};

pub fn crate_info() -> &'static str {
    "sdfray-scene v0.1.0"
}
