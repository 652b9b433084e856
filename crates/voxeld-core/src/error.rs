// crates/voxeld-core/src/error.rs
// ============================================================================
// Module: Domain Error
// Description: SceneEngine failure taxonomy, stable-coded in -32010..-32099.
// Purpose: Let voxeld-server pass SceneEngine failures straight through as
//          JSON-RPC errors without reinterpreting them.
// Dependencies: thiserror
// ============================================================================

use thiserror::Error;

/// A failure raised by the `SceneEngine` or its collaborators.
///
/// Every variant owns a fixed JSON-RPC code in the `-32010..-32099` domain
/// range (see [`DomainError::code`]); the set is stable so clients can
/// switch on it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A position or region fell outside the scene's addressable space.
    #[error("invalid coordinates")]
    InvalidCoordinates,
    /// A referenced layer id does not exist.
    #[error("unknown layer")]
    UnknownLayer,
    /// A layer name collided with an existing layer.
    #[error("duplicate layer name")]
    DuplicateLayerName,
    /// No project is currently open.
    #[error("no project open")]
    NoProjectOpen,
    /// Export to the requested format/path failed.
    #[error("export failed: {0}")]
    ExportFailed(String),
    /// Import from the requested path failed.
    #[error("import failed: {0}")]
    ImportFailed(String),
    /// Rendering the scene failed.
    #[error("render failed: {0}")]
    RenderFailed(String),
    /// The render artifact store rejected an insertion because even after
    /// evicting every eligible artifact, the new one still does not fit.
    #[error("render cache full")]
    CacheFull,
    /// The referenced render artifact has expired and was reaped.
    #[error("render artifact expired")]
    ArtifactExpired,
    /// The referenced render artifact token is not known to the store.
    #[error("unknown render artifact")]
    UnknownArtifact,
}

impl DomainError {
    /// Returns this error's stable JSON-RPC code in `-32010..-32099`.
    #[must_use]
    pub const fn code(&self) -> i32 {
        match self {
            Self::InvalidCoordinates => -32010,
            Self::UnknownLayer => -32011,
            Self::DuplicateLayerName => -32012,
            Self::NoProjectOpen => -32013,
            Self::ExportFailed(_) => -32014,
            Self::ImportFailed(_) => -32015,
            Self::RenderFailed(_) => -32016,
            Self::CacheFull => -32017,
            Self::ArtifactExpired => -32018,
            Self::UnknownArtifact => -32019,
        }
    }
}
