// crates/voxeld-core/src/engine.rs
// ============================================================================
// Module: Scene Engine Contract
// Description: The capability set the daemon core consumes from the voxel
//              data engine, and the concurrency class each operation needs.
// Purpose: Narrow, testable seam between the daemon core and the engine.
// Dependencies: crate::model, crate::error
// ============================================================================

use crate::error::DomainError;
use crate::model::Color;
use crate::model::Layer;
use crate::model::LayerId;
use crate::model::Position;
use crate::model::Region;
use crate::model::SceneInfo;
use crate::model::Voxel;

/// The access a method needs against the shared scene.
///
/// `Exclusive` methods take the Scene Guard's write side; `Shared` methods
/// take its read side; `Free` methods need no scene access at all (and so
/// never contend with either).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Concurrency {
    /// Requires exclusive (write) access to the scene.
    Exclusive,
    /// Requires shared (read) access to the scene.
    Shared,
    /// Requires no scene access.
    Free,
}

/// Options accepted by `render`. Left intentionally opaque to the engine's
/// own interpretation; the daemon core only transports it.
pub type RenderOptions = serde_json::Value;

/// Options accepted by `export`/`import`. Same opacity as [`RenderOptions`].
pub type TransferOptions = serde_json::Value;

/// An in-memory rendered image: raw bytes plus their MIME type.
#[derive(Debug, Clone)]
pub struct RenderedImage {
    /// The encoded image bytes.
    pub bytes: Vec<u8>,
    /// The image's MIME type, e.g. `image/png`.
    pub mime_type: String,
}

/// The narrow capability set the daemon core requires from the voxel data
/// engine (see workspace root spec §6). Volumes, brushes, and the actual
/// rendering pipeline live entirely on the other side of this trait.
///
/// Implementations must be safe to call from the worker that holds the
/// corresponding Scene Guard side; this trait makes no concurrency
/// guarantees of its own, those are the Scene Guard's job.
pub trait SceneEngine {
    /// Creates a brand-new, empty project with the given name. Exclusive.
    ///
    /// # Errors
    /// Returns a [`DomainError`] if the engine cannot create the project.
    fn create_project(&mut self, name: &str) -> Result<(), DomainError>;

    /// Opens a project from `path`, replacing any currently open project.
    /// Exclusive.
    ///
    /// # Errors
    /// Returns [`DomainError::ImportFailed`] if the file cannot be read.
    fn open(&mut self, path: &str) -> Result<(), DomainError>;

    /// Saves the current project to `path`. Exclusive.
    ///
    /// # Errors
    /// Returns [`DomainError::NoProjectOpen`] or
    /// [`DomainError::ExportFailed`].
    fn save(&mut self, path: &str) -> Result<(), DomainError>;

    /// Closes the current project, discarding in-memory state. Exclusive.
    ///
    /// # Errors
    /// Returns [`DomainError::NoProjectOpen`] if nothing is open.
    fn close(&mut self) -> Result<(), DomainError>;

    /// Adds a single voxel. Exclusive.
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidCoordinates`] or
    /// [`DomainError::NoProjectOpen`].
    fn add_voxel(&mut self, position: Position, color: Color) -> Result<(), DomainError>;

    /// Removes the voxel at `position`, if any. Exclusive.
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidCoordinates`] or
    /// [`DomainError::NoProjectOpen`].
    fn remove_voxel(&mut self, position: Position) -> Result<(), DomainError>;

    /// Overwrites the color of an existing voxel. Exclusive.
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidCoordinates`] or
    /// [`DomainError::NoProjectOpen`].
    fn paint_voxel(&mut self, position: Position, color: Color) -> Result<(), DomainError>;

    /// Reads the voxel at `position`, if present. Shared.
    ///
    /// # Errors
    /// Returns [`DomainError::NoProjectOpen`].
    fn get_voxel(&self, position: Position) -> Result<Option<Voxel>, DomainError>;

    /// Adds many voxels in one exclusive acquisition. Exclusive.
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidCoordinates`] or
    /// [`DomainError::NoProjectOpen`].
    fn add_voxels_batch(&mut self, voxels: &[Voxel]) -> Result<(), DomainError>;

    /// Removes every voxel in the active layer. Exclusive.
    ///
    /// # Errors
    /// Returns [`DomainError::NoProjectOpen`].
    fn clear(&mut self) -> Result<(), DomainError>;

    /// Fills every position in `region` with `color`. Exclusive.
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidCoordinates`] or
    /// [`DomainError::NoProjectOpen`].
    fn fill(&mut self, region: Region, color: Color) -> Result<(), DomainError>;

    /// Creates a new, empty, visible layer. Exclusive.
    ///
    /// # Errors
    /// Returns [`DomainError::DuplicateLayerName`].
    fn create_layer(&mut self, name: &str) -> Result<LayerId, DomainError>;

    /// Deletes a layer and its voxels. Exclusive.
    ///
    /// # Errors
    /// Returns [`DomainError::UnknownLayer`].
    fn delete_layer(&mut self, id: LayerId) -> Result<(), DomainError>;

    /// Renames a layer. Exclusive.
    ///
    /// # Errors
    /// Returns [`DomainError::UnknownLayer`] or
    /// [`DomainError::DuplicateLayerName`].
    fn rename_layer(&mut self, id: LayerId, name: &str) -> Result<(), DomainError>;

    /// Toggles a layer's visibility. Exclusive.
    ///
    /// # Errors
    /// Returns [`DomainError::UnknownLayer`].
    fn set_layer_visibility(&mut self, id: LayerId, visible: bool) -> Result<(), DomainError>;

    /// Merges `src`'s voxels into `dst` and deletes `src`. Exclusive.
    ///
    /// # Errors
    /// Returns [`DomainError::UnknownLayer`].
    fn merge_layers(&mut self, src: LayerId, dst: LayerId) -> Result<(), DomainError>;

    /// Lists every layer in creation order. Shared.
    ///
    /// # Errors
    /// Returns [`DomainError::NoProjectOpen`].
    fn list_layers(&self) -> Result<Vec<Layer>, DomainError>;

    /// Sets the active layer that unqualified voxel operations target.
    /// Exclusive.
    ///
    /// # Errors
    /// Returns [`DomainError::UnknownLayer`].
    fn set_active_layer(&mut self, id: LayerId) -> Result<(), DomainError>;

    /// Writes the current project out in `format` to `path`. Exclusive
    /// (per workspace root spec §4.5, file I/O is permitted while holding
    /// the guard for this operation).
    ///
    /// # Errors
    /// Returns [`DomainError::ExportFailed`].
    fn export(
        &mut self,
        format: &str,
        path: &str,
        options: &TransferOptions,
    ) -> Result<(), DomainError>;

    /// Reads a project in from `path`, replacing the current one.
    /// Exclusive.
    ///
    /// # Errors
    /// Returns [`DomainError::ImportFailed`].
    fn import(&mut self, path: &str, options: &TransferOptions) -> Result<(), DomainError>;

    /// Renders the current scene to an in-memory image. Shared (rendering
    /// does not mutate scene state).
    ///
    /// # Errors
    /// Returns [`DomainError::RenderFailed`] or
    /// [`DomainError::NoProjectOpen`].
    fn render(
        &self,
        width: u32,
        height: u32,
        options: &RenderOptions,
    ) -> Result<RenderedImage, DomainError>;

    /// Returns summary information about the current scene. Shared.
    ///
    /// # Errors
    /// Returns [`DomainError::NoProjectOpen`].
    fn get_info(&self) -> Result<SceneInfo, DomainError>;
}
