//! Shared types used by the scene and render crates.

mod types;

pub use types::{Color, Transform};
