//! wgpu backend for the SDF ray marcher.
//!
//! Mirrors scene pools into storage buffers, dispatches the ray-march
//! compute kernel once per camera, and composites the result over the
//! frame. A grid backdrop and an orbit camera are provided for viewers.
//!
//! # Invariants
//! - The backend never mutates scene state.
//! - Each pool buffer is re-sent at most once per frame, and only when its
//!   revision changed.
//! - A missing program or kernel disables the feature instead of failing.

mod backdrop;
mod buffers;
mod camera;
mod composite;
mod raymarch;
mod shaders;
mod targets;

pub use backdrop::Backdrop;
pub use buffers::{GpuMirror, UploadAction, plan_upload};
pub use camera::OrbitCamera;
pub use composite::CompositePass;
pub use raymarch::RayMarchFeature;
pub use shaders::{BACKDROP_SHADER, COMPOSITE_SHADER, RAYMARCH_SHADER};
pub use targets::{TargetDesc, TargetRole};
