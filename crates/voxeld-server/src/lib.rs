// crates/voxeld-server/src/lib.rs
// ============================================================================
// Module: Voxeld Server
// Description: The daemon core: socket lifecycle, framing, the bounded
//              worker pool, method dispatch, the render store, and process
//              supervision.
// Purpose: Everything needed to run the headless voxel-editing daemon
//          against a `voxeld_core::SceneEngine`, independent of any
//          particular CLI entry point.
// Dependencies: tokio, voxeld-core, voxeld-config, voxeld-protocol, thiserror
// ============================================================================

//! ## Overview
//!
//! This crate is the daemon itself. [`supervisor::run`] is the single entry
//! point: it validates a [`voxeld_config::DaemonConfig`], binds the Unix
//! socket via [`acceptor`], spawns the [`worker_pool`], and accepts
//! connections as [`session`]s until a shutdown signal or the `shutdown`
//! RPC method fires, then tears everything down in reverse order.
//!
//! [`handlers`] and [`registry`] together define the method surface;
//! [`render_store`] owns render artifact lifetime; [`telemetry`] and
//! [`stats`] are the ambient observability layer.

#![forbid(unsafe_code)]

pub mod acceptor;
pub mod client_id;
pub mod error;
pub mod framing;
pub mod handlers;
pub mod registry;
pub mod render_store;
pub mod session;
pub mod stats;
pub mod supervisor;
pub mod telemetry;
pub mod worker_pool;

pub use error::DaemonError;
pub use registry::MethodRegistry;
pub use supervisor::EXIT_DRAIN_FORCED;
pub use supervisor::EXIT_OK;
