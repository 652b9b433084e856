// crates/voxeld-core/src/memory.rs
// ============================================================================
// Module: In-Memory Scene
// Description: A deterministic, dependency-free SceneEngine for tests/demos.
// Purpose: Give the rest of the workspace something concrete to run against
//          without depending on the real voxel data engine.
// Dependencies: crate::engine, crate::model, crate::error
// ============================================================================

//! ## Overview
//! This module provides a simple in-memory implementation of
//! [`SceneEngine`] for tests and local demos. It is not a production voxel
//! engine: there is no undo, no brushes, no streaming import/export — only
//! enough behavior to exercise the daemon core end to end.

use std::collections::BTreeMap;

use crate::engine::RenderOptions;
use crate::engine::RenderedImage;
use crate::engine::SceneEngine;
use crate::engine::TransferOptions;
use crate::error::DomainError;
use crate::model::Color;
use crate::model::Layer;
use crate::model::LayerId;
use crate::model::Position;
use crate::model::Region;
use crate::model::SceneInfo;
use crate::model::Voxel;

/// One layer's voxel contents and metadata.
#[derive(Debug, Clone)]
struct LayerData {
    /// The layer's display name.
    name: String,
    /// Whether the layer is currently visible.
    visible: bool,
    /// Voxels keyed by position for O(log n) point lookups.
    voxels: BTreeMap<Position, Color>,
}

/// An in-memory scene: zero or more layers of voxels, one active at a time.
#[derive(Debug, Default)]
pub struct InMemoryScene {
    /// The open project's name, or `None` if nothing is open.
    project_name: Option<String>,
    /// Layers in creation order, keyed by id.
    layers: BTreeMap<LayerId, LayerData>,
    /// Insertion order, preserved separately since `BTreeMap` orders by key.
    layer_order: Vec<LayerId>,
    /// The layer unqualified voxel operations target.
    active_layer: Option<LayerId>,
    /// Monotonic counter used to mint new layer ids.
    next_layer_id: u64,
    /// Whether the scene has unsaved modifications.
    modified: bool,
}

impl InMemoryScene {
    /// Creates an empty scene with no project open.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a reference to the active layer, or an error if none is
    /// open or active.
    fn active_layer_mut(&mut self) -> Result<&mut LayerData, DomainError> {
        let id = self.active_layer.ok_or(DomainError::NoProjectOpen)?;
        self.layers.get_mut(&id).ok_or(DomainError::UnknownLayer)
    }

    /// Returns a shared reference to the active layer.
    fn active_layer_ref(&self) -> Result<&LayerData, DomainError> {
        let id = self.active_layer.ok_or(DomainError::NoProjectOpen)?;
        self.layers.get(&id).ok_or(DomainError::UnknownLayer)
    }

    /// Requires a project to be open, otherwise fails fast.
    fn require_open(&self) -> Result<(), DomainError> {
        if self.project_name.is_some() {
            Ok(())
        } else {
            Err(DomainError::NoProjectOpen)
        }
    }

    /// Finds an existing layer whose name matches `name`, case-sensitively.
    fn find_layer_by_name(&self, name: &str) -> Option<LayerId> {
        self.layers
            .iter()
            .find(|(_, layer)| layer.name == name)
            .map(|(id, _)| *id)
    }
}

impl SceneEngine for InMemoryScene {
    fn create_project(&mut self, name: &str) -> Result<(), DomainError> {
        self.project_name = Some(name.to_string());
        self.layers.clear();
        self.layer_order.clear();
        self.active_layer = None;
        self.next_layer_id = 0;
        self.modified = false;
        let default_layer = self.create_layer("default")?;
        self.active_layer = Some(default_layer);
        Ok(())
    }

    fn open(&mut self, path: &str) -> Result<(), DomainError> {
        if path.trim().is_empty() {
            return Err(DomainError::ImportFailed("empty path".to_string()));
        }
        self.create_project(path)
    }

    fn save(&mut self, _path: &str) -> Result<(), DomainError> {
        self.require_open()?;
        self.modified = false;
        Ok(())
    }

    fn close(&mut self) -> Result<(), DomainError> {
        self.require_open()?;
        self.project_name = None;
        self.layers.clear();
        self.layer_order.clear();
        self.active_layer = None;
        self.modified = false;
        Ok(())
    }

    fn add_voxel(&mut self, position: Position, color: Color) -> Result<(), DomainError> {
        let layer = self.active_layer_mut()?;
        layer.voxels.insert(position, color);
        self.modified = true;
        Ok(())
    }

    fn remove_voxel(&mut self, position: Position) -> Result<(), DomainError> {
        let layer = self.active_layer_mut()?;
        layer.voxels.remove(&position);
        self.modified = true;
        Ok(())
    }

    fn paint_voxel(&mut self, position: Position, color: Color) -> Result<(), DomainError> {
        let layer = self.active_layer_mut()?;
        if !layer.voxels.contains_key(&position) {
            return Err(DomainError::InvalidCoordinates);
        }
        layer.voxels.insert(position, color);
        self.modified = true;
        Ok(())
    }

    fn get_voxel(&self, position: Position) -> Result<Option<Voxel>, DomainError> {
        let layer = self.active_layer_ref()?;
        Ok(layer
            .voxels
            .get(&position)
            .map(|color| Voxel { position, color: *color }))
    }

    fn add_voxels_batch(&mut self, voxels: &[Voxel]) -> Result<(), DomainError> {
        let layer = self.active_layer_mut()?;
        for voxel in voxels {
            layer.voxels.insert(voxel.position, voxel.color);
        }
        self.modified = true;
        Ok(())
    }

    fn clear(&mut self) -> Result<(), DomainError> {
        let layer = self.active_layer_mut()?;
        layer.voxels.clear();
        self.modified = true;
        Ok(())
    }

    fn fill(&mut self, region: Region, color: Color) -> Result<(), DomainError> {
        let layer = self.active_layer_mut()?;
        let min = region.min;
        let max = region.max;
        let (x0, x1) = (min.x.min(max.x), min.x.max(max.x));
        let (y0, y1) = (min.y.min(max.y), min.y.max(max.y));
        let (z0, z1) = (min.z.min(max.z), min.z.max(max.z));
        for x in x0..=x1 {
            for y in y0..=y1 {
                for z in z0..=z1 {
                    layer.voxels.insert(Position::new(x, y, z), color);
                }
            }
        }
        self.modified = true;
        Ok(())
    }

    fn create_layer(&mut self, name: &str) -> Result<LayerId, DomainError> {
        if self.find_layer_by_name(name).is_some() {
            return Err(DomainError::DuplicateLayerName);
        }
        let id = LayerId(self.next_layer_id);
        self.next_layer_id += 1;
        self.layers.insert(
            id,
            LayerData {
                name: name.to_string(),
                visible: true,
                voxels: BTreeMap::new(),
            },
        );
        self.layer_order.push(id);
        self.modified = true;
        Ok(id)
    }

    fn delete_layer(&mut self, id: LayerId) -> Result<(), DomainError> {
        if self.layers.remove(&id).is_none() {
            return Err(DomainError::UnknownLayer);
        }
        self.layer_order.retain(|existing| *existing != id);
        if self.active_layer == Some(id) {
            self.active_layer = self.layer_order.first().copied();
        }
        self.modified = true;
        Ok(())
    }

    fn rename_layer(&mut self, id: LayerId, name: &str) -> Result<(), DomainError> {
        if self.find_layer_by_name(name).is_some() {
            return Err(DomainError::DuplicateLayerName);
        }
        let layer = self.layers.get_mut(&id).ok_or(DomainError::UnknownLayer)?;
        layer.name = name.to_string();
        self.modified = true;
        Ok(())
    }

    fn set_layer_visibility(&mut self, id: LayerId, visible: bool) -> Result<(), DomainError> {
        let layer = self.layers.get_mut(&id).ok_or(DomainError::UnknownLayer)?;
        layer.visible = visible;
        self.modified = true;
        Ok(())
    }

    fn merge_layers(&mut self, src: LayerId, dst: LayerId) -> Result<(), DomainError> {
        if !self.layers.contains_key(&dst) {
            return Err(DomainError::UnknownLayer);
        }
        let src_layer = self.layers.remove(&src).ok_or(DomainError::UnknownLayer)?;
        self.layer_order.retain(|existing| *existing != src);
        let dst_layer = self
            .layers
            .get_mut(&dst)
            .ok_or(DomainError::UnknownLayer)?;
        dst_layer.voxels.extend(src_layer.voxels);
        if self.active_layer == Some(src) {
            self.active_layer = Some(dst);
        }
        self.modified = true;
        Ok(())
    }

    fn list_layers(&self) -> Result<Vec<Layer>, DomainError> {
        self.require_open()?;
        Ok(self
            .layer_order
            .iter()
            .filter_map(|id| {
                self.layers.get(id).map(|layer| Layer {
                    id: *id,
                    name: layer.name.clone(),
                    visible: layer.visible,
                })
            })
            .collect())
    }

    fn set_active_layer(&mut self, id: LayerId) -> Result<(), DomainError> {
        if !self.layers.contains_key(&id) {
            return Err(DomainError::UnknownLayer);
        }
        self.active_layer = Some(id);
        Ok(())
    }

    fn export(
        &mut self,
        _format: &str,
        path: &str,
        _options: &TransferOptions,
    ) -> Result<(), DomainError> {
        self.require_open()?;
        if path.trim().is_empty() {
            return Err(DomainError::ExportFailed("empty path".to_string()));
        }
        Ok(())
    }

    fn import(&mut self, path: &str, _options: &TransferOptions) -> Result<(), DomainError> {
        self.open(path)
    }

    fn render(
        &self,
        width: u32,
        height: u32,
        _options: &RenderOptions,
    ) -> Result<RenderedImage, DomainError> {
        self.require_open()?;
        if width == 0 || height == 0 {
            return Err(DomainError::RenderFailed("zero-sized render".to_string()));
        }
        // A minimal, deterministic placeholder payload: real pixels belong
        // to the voxel engine, which is out of scope for this crate.
        let pixel_count = usize::try_from(width).unwrap_or(usize::MAX)
            .saturating_mul(usize::try_from(height).unwrap_or(usize::MAX));
        Ok(RenderedImage {
            bytes: vec![0u8; pixel_count.min(1 << 20)],
            mime_type: "image/png".to_string(),
        })
    }

    fn get_info(&self) -> Result<SceneInfo, DomainError> {
        self.require_open()?;
        let voxel_count = self
            .layers
            .values()
            .map(|layer| u64::try_from(layer.voxels.len()).unwrap_or(u64::MAX))
            .sum();
        let dimensions = self.layers.values().flat_map(|layer| layer.voxels.keys()).fold(
            None::<Region>,
            |acc, position| {
                Some(match acc {
                    None => Region { min: *position, max: *position },
                    Some(region) => Region {
                        min: Position::new(
                            region.min.x.min(position.x),
                            region.min.y.min(position.y),
                            region.min.z.min(position.z),
                        ),
                        max: Position::new(
                            region.max.x.max(position.x),
                            region.max.y.max(position.y),
                            region.max.z.max(position.z),
                        ),
                    },
                })
            },
        );
        Ok(SceneInfo {
            dimensions,
            voxel_count,
            layer_count: u64::try_from(self.layers.len()).unwrap_or(u64::MAX),
            modified: self.modified,
        })
    }
}
