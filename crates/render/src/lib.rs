//! Renderer-agnostic half of the ray-march dispatch.
//!
//! Everything a backend needs to issue one compute dispatch per frame, minus
//! the GPU: camera parameters, the uniform block, the dispatch grid, kernel
//! reflection, settings, and a scoped pool for temporary render targets.
//!
//! # Invariants
//! - Planning never mutates the scene.
//! - The dispatch grid always covers every pixel of the target.
//! - Preview cameras always render with one sample per pixel.

mod camera;
mod dispatch;
mod error;
mod frame;
mod kernel;
mod renderer;
mod settings;
mod targets;

pub use camera::{CameraParams, MIN_FORWARD_COS};
pub use dispatch::{DispatchSize, WorkgroupSize, dispatch_size};
pub use error::RenderError;
pub use frame::{FramePlan, FrameUniforms};
pub use kernel::{BindingKind, ExpectedBinding, KernelInfo};
pub use renderer::{DebugTextRenderer, Renderer};
pub use settings::{MAX_MSAA, RayMarchSettings};
pub use targets::{TargetPool, TemporaryTarget};

pub fn crate_info() -> &'static str {
    "sdfray-render v0.1.0"
}
