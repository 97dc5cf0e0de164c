use crate::records::PrimitiveKind;

/// Errors from scene mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SceneError {
    #[error("stale {kind} handle")]
    StaleHandle { kind: PrimitiveKind },
    #[error("stale light handle")]
    StaleLight,
    #[error("handle refers to a {expected}, record is a {found}")]
    KindMismatch {
        expected: PrimitiveKind,
        found: PrimitiveKind,
    },
}
