// crates/voxeld-core/src/lib.rs
// ============================================================================
// Module: Voxeld Core
// Description: Scene data model, SceneEngine contract, and the Scene Guard.
// Purpose: Define the narrow collaborator interface the daemon core calls
//          into, plus a reference in-memory implementation for tests.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//!
//! This crate defines the voxel scene data model and the `SceneEngine`
//! capability set the daemon core consumes. The actual voxel data engine
//! (volumes, brushes, rendering) is explicitly out of scope; `InMemoryScene`
//! exists only so the rest of the workspace has something concrete to test
//! against.

#![forbid(unsafe_code)]

pub mod engine;
pub mod error;
pub mod guard;
pub mod memory;
pub mod model;

pub use engine::Concurrency;
pub use engine::SceneEngine;
pub use error::DomainError;
pub use guard::SharedScene;
pub use memory::InMemoryScene;
pub use model::Color;
pub use model::Layer;
pub use model::LayerId;
pub use model::Position;
pub use model::Region;
pub use model::SceneInfo;
pub use model::Voxel;

#[cfg(test)]
mod tests;
