// crates/voxeld-core/src/model.rs
// ============================================================================
// Module: Scene Data Model
// Description: Value types shared by every SceneEngine operation.
// Purpose: Give handlers and the engine one vocabulary for voxels/layers.
// Dependencies: serde
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

/// An integer voxel coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    /// X coordinate.
    pub x: i32,
    /// Y coordinate.
    pub y: i32,
    /// Z coordinate.
    pub z: i32,
}

impl Position {
    /// Builds a new position.
    #[must_use]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

/// An RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel.
    pub a: u8,
}

impl Color {
    /// Builds a new, fully opaque color from RGB components.
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }
}

/// A single voxel: its position and color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Voxel {
    /// The voxel's location.
    pub position: Position,
    /// The voxel's color.
    pub color: Color,
}

/// An axis-aligned inclusive region used by `fill`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    /// One corner of the region.
    pub min: Position,
    /// The opposite corner of the region.
    pub max: Position,
}

impl Region {
    /// Returns `true` when `position` lies within this region, inclusive
    /// of both corners.
    #[must_use]
    pub fn contains(&self, position: Position) -> bool {
        (self.min.x.min(self.max.x)..=self.min.x.max(self.max.x)).contains(&position.x)
            && (self.min.y.min(self.max.y)..=self.min.y.max(self.max.y)).contains(&position.y)
            && (self.min.z.min(self.max.z)..=self.min.z.max(self.max.z)).contains(&position.z)
    }
}

/// Opaque identifier for a layer, stable for the lifetime of the scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LayerId(
    /// The underlying integer id.
    pub u64,
);

/// A named, independently toggleable collection of voxels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layer {
    /// The layer's stable identifier.
    pub id: LayerId,
    /// The layer's display name.
    pub name: String,
    /// Whether the layer is currently visible.
    pub visible: bool,
}

/// Summary information about the current scene, returned by `get_info`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneInfo {
    /// The bounding dimensions of populated voxels, if any.
    pub dimensions: Option<Region>,
    /// Total number of voxels across all layers.
    pub voxel_count: u64,
    /// Number of layers currently defined.
    pub layer_count: u64,
    /// Whether the scene has unsaved modifications.
    pub modified: bool,
}
