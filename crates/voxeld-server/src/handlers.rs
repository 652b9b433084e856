// crates/voxeld-server/src/handlers.rs
// ============================================================================
// Module: Method Handlers
// Description: Thin adapters translating RPC params into SceneEngine calls
//              and RenderStore operations (§4.3, §6).
// Purpose: Keep wire<->domain translation in one place, independent of the
//          worker pool's dispatch loop and the session's framing.
// Dependencies: serde_json, voxeld-core, voxeld-protocol, crate::render_store
// ============================================================================

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::de::DeserializeOwned;
use serde_json::json;
use serde_json::Value;
use voxeld_core::Color;
use voxeld_core::Concurrency;
use voxeld_core::LayerId;
use voxeld_core::Position;
use voxeld_core::Region;
use voxeld_core::SceneEngine;
use voxeld_core::Voxel;

use crate::error::DaemonError;
use crate::registry::MethodDescriptor;
use crate::registry::MethodRegistry;
use crate::render_store::RenderStore;
use crate::stats::now_ms;
use crate::stats::DaemonStats;

/// Scene access a dispatched handler was actually granted by the worker
/// that looked up its [`Concurrency`] class. The worker is responsible for
/// constructing the variant matching the method's registered class; a
/// mismatch is an internal logic error, not a client-visible one.
pub enum SceneAccess<'a> {
    /// The method needs no scene access.
    None,
    /// Read-only access, held for the duration of the call.
    Shared(&'a dyn SceneEngine),
    /// Exclusive (write) access, held for the duration of the call.
    Exclusive(&'a mut dyn SceneEngine),
}

/// Everything a `Free` handler needs beyond its own params: the render
/// store, the registry (for `list_methods`), live stats (for `status`),
/// and a way to request shutdown.
pub struct HandlerContext {
    /// The render artifact store.
    pub render_store: Arc<RenderStore>,
    /// The method registry, for introspection.
    pub registry: Arc<MethodRegistry>,
    /// Live daemon counters.
    pub stats: Arc<DaemonStats>,
    /// Sends `true` to begin a graceful shutdown; observed by the Supervisor.
    pub shutdown: tokio::sync::watch::Sender<bool>,
    /// Protocol version string reported by `version`.
    pub protocol_version: &'static str,
    /// Daemon crate version string reported by `version`.
    pub daemon_version: &'static str,
    /// TTL applied to a render artifact registered in `"file_path"` mode.
    pub render_ttl_ms: u64,
}

/// The static table of every method this daemon supports, independent of
/// whether `shutdown` is currently enabled (the registry filters that at
/// build time).
#[must_use]
pub fn descriptors() -> Vec<MethodDescriptor> {
    vec![
        MethodDescriptor { name: "ping", concurrency: Concurrency::Free },
        MethodDescriptor { name: "version", concurrency: Concurrency::Free },
        MethodDescriptor { name: "list_methods", concurrency: Concurrency::Free },
        MethodDescriptor { name: "status", concurrency: Concurrency::Free },
        MethodDescriptor { name: "shutdown", concurrency: Concurrency::Free },
        MethodDescriptor { name: "echo", concurrency: Concurrency::Free },
        MethodDescriptor { name: "get_render_info", concurrency: Concurrency::Free },
        MethodDescriptor { name: "list_renders", concurrency: Concurrency::Free },
        MethodDescriptor { name: "cleanup_render", concurrency: Concurrency::Free },
        MethodDescriptor { name: "get_render_stats", concurrency: Concurrency::Free },
        MethodDescriptor { name: "goxel.create_project", concurrency: Concurrency::Exclusive },
        MethodDescriptor { name: "goxel.open", concurrency: Concurrency::Exclusive },
        MethodDescriptor { name: "goxel.save", concurrency: Concurrency::Exclusive },
        MethodDescriptor { name: "goxel.close", concurrency: Concurrency::Exclusive },
        MethodDescriptor { name: "goxel.add_voxel", concurrency: Concurrency::Exclusive },
        MethodDescriptor { name: "goxel.remove_voxel", concurrency: Concurrency::Exclusive },
        MethodDescriptor { name: "goxel.paint_voxel", concurrency: Concurrency::Exclusive },
        MethodDescriptor { name: "goxel.get_voxel", concurrency: Concurrency::Shared },
        MethodDescriptor { name: "goxel.add_voxels_batch", concurrency: Concurrency::Exclusive },
        MethodDescriptor { name: "goxel.clear", concurrency: Concurrency::Exclusive },
        MethodDescriptor { name: "goxel.fill", concurrency: Concurrency::Exclusive },
        MethodDescriptor { name: "goxel.create_layer", concurrency: Concurrency::Exclusive },
        MethodDescriptor { name: "goxel.delete_layer", concurrency: Concurrency::Exclusive },
        MethodDescriptor { name: "goxel.rename_layer", concurrency: Concurrency::Exclusive },
        MethodDescriptor { name: "goxel.set_layer_visibility", concurrency: Concurrency::Exclusive },
        MethodDescriptor { name: "goxel.merge_layers", concurrency: Concurrency::Exclusive },
        MethodDescriptor { name: "goxel.list_layers", concurrency: Concurrency::Shared },
        MethodDescriptor { name: "goxel.set_active_layer", concurrency: Concurrency::Exclusive },
        MethodDescriptor { name: "goxel.export", concurrency: Concurrency::Exclusive },
        MethodDescriptor { name: "goxel.import", concurrency: Concurrency::Exclusive },
        MethodDescriptor { name: "goxel.render_scene", concurrency: Concurrency::Shared },
        MethodDescriptor { name: "goxel.get_info", concurrency: Concurrency::Shared },
    ]
}

/// Parses `params` as `T`, mapping a failure onto [`DaemonError::InvalidParams`].
fn parse_params<T: DeserializeOwned>(params: &Value) -> Result<T, DaemonError> {
    serde_json::from_value(params.clone()).map_err(|err| DaemonError::InvalidParams(err.to_string()))
}

/// Dispatches one already-routed method call. `scene` must match the
/// [`Concurrency`] class the registry recorded for `name`; the worker pool
/// guarantees this by construction.
///
/// # Errors
/// Returns [`DaemonError::MethodNotFound`] if `name` is not one of the
/// methods in [`descriptors`] (this should not happen if the caller looked
/// `name` up in the [`MethodRegistry`] first), [`DaemonError::InvalidParams`]
/// if `params` does not match the method's expected shape, or
/// [`DaemonError::Domain`] if the `SceneEngine`/`RenderStore` rejects the
/// operation.
pub async fn dispatch(
    name: &str,
    params: Value,
    scene: SceneAccess<'_>,
    ctx: &HandlerContext,
) -> Result<Value, DaemonError> {
    match name {
        "ping" => Ok(json!({ "timestamp": now_ms() })),
        "version" => Ok(json!({
            "daemon_version": ctx.daemon_version,
            "protocol_version": ctx.protocol_version,
        })),
        "list_methods" => Ok(json!({ "methods": ctx.registry.list() })),
        "status" => {
            let snapshot = ctx.stats.snapshot();
            let render_stats = ctx.render_store.stats().await;
            Ok(json!({
                "uptime_ms": snapshot.uptime_ms,
                "active_connections": snapshot.active_connections,
                "queue_depth": snapshot.queue_depth,
                "workers_busy": snapshot.workers_busy,
                "render_store": {
                    "artifact_count": render_stats.artifact_count,
                    "total_bytes": render_stats.total_bytes,
                    "max_total_bytes": render_stats.max_total_bytes,
                },
            }))
        }
        "shutdown" => {
            let _ = ctx.shutdown.send(true);
            Ok(json!({ "accepted": true }))
        }
        "echo" => Ok(params),
        "get_render_info" => handle_get_render_info(params, ctx).await,
        "list_renders" => handle_list_renders(ctx).await,
        "cleanup_render" => handle_cleanup_render(params, ctx).await,
        "get_render_stats" => handle_get_render_stats(ctx).await,
        _ => dispatch_scene(name, params, scene, ctx).await,
    }
}

/// Dispatches the `goxel.*` methods, which all require scene access.
async fn dispatch_scene(
    name: &str,
    params: Value,
    scene: SceneAccess<'_>,
    ctx: &HandlerContext,
) -> Result<Value, DaemonError> {
    match scene {
        SceneAccess::None => Err(DaemonError::MethodNotFound(name.to_string())),
        SceneAccess::Shared(engine) => dispatch_shared(name, params, engine, ctx).await,
        SceneAccess::Exclusive(engine) => dispatch_exclusive(name, params, engine),
    }
}

/// Dispatches `Shared`-class scene methods.
async fn dispatch_shared(
    name: &str,
    params: Value,
    engine: &dyn SceneEngine,
    ctx: &HandlerContext,
) -> Result<Value, DaemonError> {
    match name {
        "goxel.get_voxel" => {
            #[derive(serde::Deserialize)]
            struct Params {
                position: Position,
            }
            let params: Params = parse_params(&params)?;
            let voxel = engine.get_voxel(params.position)?;
            Ok(json!({ "voxel": voxel }))
        }
        "goxel.list_layers" => {
            let layers = engine.list_layers()?;
            Ok(json!({ "layers": layers }))
        }
        "goxel.render_scene" => handle_render_scene(params, engine, ctx).await,
        "goxel.get_info" => {
            let info = engine.get_info()?;
            serde_json::to_value(info).map_err(|err| DaemonError::Execution(err.to_string()))
        }
        other => Err(DaemonError::MethodNotFound(other.to_string())),
    }
}

/// Implements `goxel.render_scene` (§4.4): renders to in-memory bytes,
/// writes them under `render_dir`, and registers the file with the
/// [`RenderStore`] either under the configured TTL (`"file_path"` mode,
/// the default) or a zero TTL held open only across base64 encoding
/// (`"inline"` mode, per the resolved open question in §9).
async fn handle_render_scene(
    params: Value,
    engine: &dyn SceneEngine,
    ctx: &HandlerContext,
) -> Result<Value, DaemonError> {
    #[derive(serde::Deserialize)]
    struct Params {
        width: u32,
        height: u32,
        #[serde(default)]
        options: Value,
    }
    let parsed: Params = parse_params(&params)?;
    let image = engine.render(parsed.width, parsed.height, &parsed.options)?;
    let return_mode = parsed
        .options
        .get("return_mode")
        .and_then(Value::as_str)
        .unwrap_or("file_path");
    let ext = extension_for_mime(&image.mime_type);
    let size_bytes = u64::try_from(image.bytes.len()).unwrap_or(u64::MAX);

    if return_mode == "inline" {
        let artifact = ctx
            .render_store
            .insert(ext, size_bytes, 0, image.mime_type.clone())
            .await?;
        tokio::fs::write(&artifact.path, &image.bytes)
            .await
            .map_err(|err| DaemonError::Execution(err.to_string()))?;
        ctx.render_store.acquire_ref(&artifact.token).await;
        let encoded = BASE64.encode(&image.bytes);
        ctx.render_store.release_ref(&artifact.token).await;
        Ok(json!({ "inline": { "data": encoded, "mime_type": image.mime_type } }))
    } else {
        let artifact = ctx
            .render_store
            .insert(ext, size_bytes, ctx.render_ttl_ms, image.mime_type.clone())
            .await?;
        tokio::fs::write(&artifact.path, &image.bytes)
            .await
            .map_err(|err| DaemonError::Execution(err.to_string()))?;
        Ok(json!({ "file": render_artifact_to_json(&artifact) }))
    }
}

/// Maps a MIME type to the file extension the Render Store names its
/// artifacts with; defaults to `"bin"` for anything unrecognized.
fn extension_for_mime(mime_type: &str) -> &'static str {
    match mime_type {
        "image/png" => "png",
        "image/jpeg" => "jpg",
        "image/bmp" => "bmp",
        _ => "bin",
    }
}

/// Dispatches `Exclusive`-class scene methods.
fn dispatch_exclusive(name: &str, params: Value, engine: &mut dyn SceneEngine) -> Result<Value, DaemonError> {
    match name {
        "goxel.create_project" => {
            #[derive(serde::Deserialize)]
            struct Params {
                name: String,
            }
            let parsed: Params = parse_params(&params)?;
            engine.create_project(&parsed.name)?;
            Ok(json!({ "success": true }))
        }
        "goxel.open" => {
            #[derive(serde::Deserialize)]
            struct Params {
                path: String,
            }
            let parsed: Params = parse_params(&params)?;
            engine.open(&parsed.path)?;
            Ok(json!({ "success": true }))
        }
        "goxel.save" => {
            #[derive(serde::Deserialize)]
            struct Params {
                path: String,
            }
            let parsed: Params = parse_params(&params)?;
            engine.save(&parsed.path)?;
            Ok(json!({ "success": true }))
        }
        "goxel.close" => {
            engine.close()?;
            Ok(json!({ "success": true }))
        }
        "goxel.add_voxel" => {
            #[derive(serde::Deserialize)]
            struct Params {
                position: Position,
                color: Color,
            }
            let parsed: Params = parse_params(&params)?;
            engine.add_voxel(parsed.position, parsed.color)?;
            Ok(json!({ "success": true }))
        }
        "goxel.remove_voxel" => {
            #[derive(serde::Deserialize)]
            struct Params {
                position: Position,
            }
            let parsed: Params = parse_params(&params)?;
            engine.remove_voxel(parsed.position)?;
            Ok(json!({ "success": true }))
        }
        "goxel.paint_voxel" => {
            #[derive(serde::Deserialize)]
            struct Params {
                position: Position,
                color: Color,
            }
            let parsed: Params = parse_params(&params)?;
            engine.paint_voxel(parsed.position, parsed.color)?;
            Ok(json!({ "success": true }))
        }
        "goxel.add_voxels_batch" => {
            #[derive(serde::Deserialize)]
            struct Params {
                voxels: Vec<Voxel>,
            }
            let parsed: Params = parse_params(&params)?;
            engine.add_voxels_batch(&parsed.voxels)?;
            Ok(json!({ "success": true, "count": parsed.voxels.len() }))
        }
        "goxel.clear" => {
            engine.clear()?;
            Ok(json!({ "success": true }))
        }
        "goxel.fill" => {
            #[derive(serde::Deserialize)]
            struct Params {
                region: Region,
                color: Color,
            }
            let parsed: Params = parse_params(&params)?;
            engine.fill(parsed.region, parsed.color)?;
            Ok(json!({ "success": true }))
        }
        "goxel.create_layer" => {
            #[derive(serde::Deserialize)]
            struct Params {
                name: String,
            }
            let parsed: Params = parse_params(&params)?;
            let id = engine.create_layer(&parsed.name)?;
            Ok(json!({ "layer_id": id.0 }))
        }
        "goxel.delete_layer" => {
            let id = parse_layer_id(&params)?;
            engine.delete_layer(id)?;
            Ok(json!({ "success": true }))
        }
        "goxel.rename_layer" => {
            #[derive(serde::Deserialize)]
            struct Params {
                id: u64,
                name: String,
            }
            let parsed: Params = parse_params(&params)?;
            engine.rename_layer(LayerId(parsed.id), &parsed.name)?;
            Ok(json!({ "success": true }))
        }
        "goxel.set_layer_visibility" => {
            #[derive(serde::Deserialize)]
            struct Params {
                id: u64,
                visible: bool,
            }
            let parsed: Params = parse_params(&params)?;
            engine.set_layer_visibility(LayerId(parsed.id), parsed.visible)?;
            Ok(json!({ "success": true }))
        }
        "goxel.merge_layers" => {
            #[derive(serde::Deserialize)]
            struct Params {
                src: u64,
                dst: u64,
            }
            let parsed: Params = parse_params(&params)?;
            engine.merge_layers(LayerId(parsed.src), LayerId(parsed.dst))?;
            Ok(json!({ "success": true }))
        }
        "goxel.set_active_layer" => {
            let id = parse_layer_id(&params)?;
            engine.set_active_layer(id)?;
            Ok(json!({ "success": true }))
        }
        "goxel.export" => {
            #[derive(serde::Deserialize)]
            struct Params {
                format: String,
                path: String,
                #[serde(default)]
                options: Value,
            }
            let parsed: Params = parse_params(&params)?;
            engine.export(&parsed.format, &parsed.path, &parsed.options)?;
            Ok(json!({ "success": true }))
        }
        "goxel.import" => {
            #[derive(serde::Deserialize)]
            struct Params {
                path: String,
                #[serde(default)]
                options: Value,
            }
            let parsed: Params = parse_params(&params)?;
            engine.import(&parsed.path, &parsed.options)?;
            Ok(json!({ "success": true }))
        }
        other => Err(DaemonError::MethodNotFound(other.to_string())),
    }
}

/// Parses a bare `{ "id": <u64> }` params object, used by the layer methods
/// that take only an id.
fn parse_layer_id(params: &Value) -> Result<LayerId, DaemonError> {
    #[derive(serde::Deserialize)]
    struct Params {
        id: u64,
    }
    let parsed: Params = parse_params(params)?;
    Ok(LayerId(parsed.id))
}

async fn handle_get_render_info(params: Value, ctx: &HandlerContext) -> Result<Value, DaemonError> {
    #[derive(serde::Deserialize)]
    struct Params {
        token: String,
    }
    let parsed: Params = parse_params(&params)?;
    let artifact = ctx.render_store.get_info(&parsed.token).await?;
    Ok(render_artifact_to_json(&artifact))
}

async fn handle_list_renders(ctx: &HandlerContext) -> Result<Value, DaemonError> {
    let artifacts = ctx.render_store.list().await;
    let rendered: Vec<Value> = artifacts.iter().map(render_artifact_to_json).collect();
    Ok(json!({ "renders": rendered }))
}

async fn handle_cleanup_render(params: Value, ctx: &HandlerContext) -> Result<Value, DaemonError> {
    #[derive(serde::Deserialize)]
    struct Params {
        token: String,
    }
    let parsed: Params = parse_params(&params)?;
    ctx.render_store.cleanup(&parsed.token).await?;
    Ok(json!({ "success": true }))
}

async fn handle_get_render_stats(ctx: &HandlerContext) -> Result<Value, DaemonError> {
    let stats = ctx.render_store.stats().await;
    Ok(json!({
        "artifact_count": stats.artifact_count,
        "total_bytes": stats.total_bytes,
        "max_total_bytes": stats.max_total_bytes,
    }))
}

/// Serializes a [`crate::render_store::RenderArtifact`] into its wire shape.
fn render_artifact_to_json(artifact: &crate::render_store::RenderArtifact) -> Value {
    json!({
        "token": artifact.token.as_str(),
        "path": artifact.path,
        "size": artifact.size_bytes,
        "created_at": artifact.created_at,
        "expires_at": artifact.expires_at,
        "mime_type": artifact.mime_type,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "test assertions read better unwrapped")]

    use std::sync::Arc;

    use serde_json::json;
    use voxeld_core::InMemoryScene;

    use super::dispatch;
    use super::HandlerContext;
    use super::SceneAccess;
    use crate::registry::MethodRegistry;
    use crate::render_store::RenderStore;
    use crate::stats::DaemonStats;

    fn context() -> HandlerContext {
        let dir = tempfile::tempdir().unwrap();
        let (shutdown_tx, _rx) = tokio::sync::watch::channel(false);
        HandlerContext {
            render_store: Arc::new(RenderStore::new(dir.into_path(), 1024 * 1024)),
            registry: Arc::new(MethodRegistry::build(true)),
            stats: Arc::new(DaemonStats::new()),
            shutdown: shutdown_tx,
            protocol_version: "2.0",
            daemon_version: "0.1.0",
            render_ttl_ms: 60_000,
        }
    }

    #[tokio::test]
    async fn echo_returns_params_verbatim() {
        let ctx = context();
        let value = json!({"a": 1, "b": [1,2,3]});
        let result = dispatch("echo", value.clone(), SceneAccess::None, &ctx).await.unwrap();
        assert_eq!(result, value);
    }

    #[tokio::test]
    async fn ping_returns_a_positive_timestamp() {
        let ctx = context();
        let result = dispatch("ping", json!(null), SceneAccess::None, &ctx).await.unwrap();
        assert!(result["timestamp"].as_u64().unwrap() > 0);
    }

    #[tokio::test]
    async fn unknown_method_is_method_not_found() {
        let ctx = context();
        let result = dispatch("not_a_method", json!(null), SceneAccess::None, &ctx).await;
        assert!(matches!(result, Err(crate::error::DaemonError::MethodNotFound(_))));
    }

    #[tokio::test]
    async fn shutdown_triggers_the_watch_channel() {
        let ctx = context();
        let mut rx = ctx.shutdown.subscribe();
        dispatch("shutdown", json!(null), SceneAccess::None, &ctx).await.unwrap();
        assert!(*rx.borrow_and_update());
    }

    #[tokio::test]
    async fn add_voxel_then_get_voxel_round_trips_through_dispatch() {
        let ctx = context();
        let mut engine = InMemoryScene::default();
        dispatch_exclusive_helper(&mut engine, "goxel.create_project", json!({"name": "demo"})).await;
        dispatch_exclusive_helper(
            &mut engine,
            "goxel.add_voxel",
            json!({"position": {"x": 1, "y": 2, "z": 3}, "color": {"r": 1, "g": 2, "b": 3, "a": 255}}),
        )
        .await;
        let ctx2 = context();
        let result = dispatch(
            "goxel.get_voxel",
            json!({"position": {"x": 1, "y": 2, "z": 3}}),
            SceneAccess::Shared(&engine),
            &ctx2,
        )
        .await
        .unwrap();
        assert!(result["voxel"].is_object());
        let _ = ctx;
    }

    async fn dispatch_exclusive_helper(engine: &mut InMemoryScene, name: &str, params: serde_json::Value) {
        let ctx = context();
        dispatch(name, params, SceneAccess::Exclusive(engine), &ctx).await.unwrap();
    }

    #[tokio::test]
    async fn render_scene_file_path_mode_registers_a_readable_file() {
        let mut engine = InMemoryScene::default();
        dispatch_exclusive_helper(&mut engine, "goxel.create_project", json!({"name": "demo"})).await;
        let ctx = context();
        let result = dispatch(
            "goxel.render_scene",
            json!({"width": 4, "height": 4, "options": {"return_mode": "file_path"}}),
            SceneAccess::Shared(&engine),
            &ctx,
        )
        .await
        .unwrap();
        let path = result["file"]["path"].as_str().unwrap();
        assert!(tokio::fs::metadata(path).await.is_ok());
    }

    #[tokio::test]
    async fn render_scene_inline_mode_returns_base64_and_does_not_leak_the_artifact() {
        let mut engine = InMemoryScene::default();
        dispatch_exclusive_helper(&mut engine, "goxel.create_project", json!({"name": "demo"})).await;
        let ctx = context();
        let result = dispatch(
            "goxel.render_scene",
            json!({"width": 2, "height": 2, "options": {"return_mode": "inline"}}),
            SceneAccess::Shared(&engine),
            &ctx,
        )
        .await
        .unwrap();
        assert!(result["inline"]["data"].is_string());
        ctx.render_store.sweep().await;
        assert!(ctx.render_store.list().await.is_empty());
    }
}
