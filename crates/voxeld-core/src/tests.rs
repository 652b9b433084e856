// crates/voxeld-core/src/tests.rs
// ============================================================================
// Module: Core Unit Tests
// Description: InMemoryScene behavior and the Scene Guard's locking contract.
// ============================================================================

#![allow(clippy::unwrap_used, reason = "test assertions read better unwrapped")]

use crate::engine::SceneEngine;
use crate::error::DomainError;
use crate::guard::SharedScene;
use crate::memory::InMemoryScene;
use crate::model::Color;
use crate::model::Position;
use crate::model::Region;

#[test]
fn operations_fail_with_no_project_open() {
    let scene = InMemoryScene::new();
    assert_eq!(scene.get_voxel(Position::new(0, 0, 0)), Err(DomainError::NoProjectOpen));
    assert_eq!(scene.get_info().unwrap_err(), DomainError::NoProjectOpen);
}

#[test]
fn create_project_starts_with_one_default_layer() {
    let mut scene = InMemoryScene::new();
    scene.create_project("demo").unwrap();
    let layers = scene.list_layers().unwrap();
    assert_eq!(layers.len(), 1);
    assert_eq!(layers[0].name, "default");
}

#[test]
fn add_and_get_voxel_round_trips() {
    let mut scene = InMemoryScene::new();
    scene.create_project("demo").unwrap();
    let position = Position::new(1, 2, 3);
    let color = Color::rgb(255, 0, 0);
    scene.add_voxel(position, color).unwrap();
    let voxel = scene.get_voxel(position).unwrap().unwrap();
    assert_eq!(voxel.color, color);
}

#[test]
fn paint_voxel_requires_existing_voxel() {
    let mut scene = InMemoryScene::new();
    scene.create_project("demo").unwrap();
    let err = scene
        .paint_voxel(Position::new(0, 0, 0), Color::rgb(1, 2, 3))
        .unwrap_err();
    assert_eq!(err, DomainError::InvalidCoordinates);
}

#[test]
fn fill_covers_the_whole_inclusive_region() {
    let mut scene = InMemoryScene::new();
    scene.create_project("demo").unwrap();
    let region = Region {
        min: Position::new(0, 0, 0),
        max: Position::new(1, 1, 1),
    };
    scene.fill(region, Color::rgb(10, 20, 30)).unwrap();
    let info = scene.get_info().unwrap();
    assert_eq!(info.voxel_count, 8);
}

#[test]
fn duplicate_layer_name_is_rejected() {
    let mut scene = InMemoryScene::new();
    scene.create_project("demo").unwrap();
    let err = scene.create_layer("default").unwrap_err();
    assert_eq!(err, DomainError::DuplicateLayerName);
}

#[test]
fn deleting_the_active_layer_falls_back_to_another() {
    let mut scene = InMemoryScene::new();
    scene.create_project("demo").unwrap();
    let second = scene.create_layer("second").unwrap();
    let layers = scene.list_layers().unwrap();
    let default_id = layers[0].id;
    scene.set_active_layer(default_id).unwrap();
    scene.delete_layer(default_id).unwrap();
    let remaining = scene.list_layers().unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, second);
}

#[test]
fn merge_layers_combines_voxels_into_destination() {
    let mut scene = InMemoryScene::new();
    scene.create_project("demo").unwrap();
    let layers = scene.list_layers().unwrap();
    let default_id = layers[0].id;
    let second = scene.create_layer("second").unwrap();
    scene.set_active_layer(second).unwrap();
    scene.add_voxel(Position::new(5, 5, 5), Color::rgb(1, 1, 1)).unwrap();
    scene.merge_layers(second, default_id).unwrap();
    scene.set_active_layer(default_id).unwrap();
    assert!(scene.get_voxel(Position::new(5, 5, 5)).unwrap().is_some());
    assert_eq!(scene.list_layers().unwrap().len(), 1);
}

#[tokio::test]
async fn shared_scene_serializes_exclusive_writers() {
    let shared = SharedScene::new(InMemoryScene::new());
    {
        let mut guard = shared.write().await;
        guard.create_project("demo").unwrap();
    }
    {
        let mut guard = shared.write().await;
        guard.add_voxel(Position::new(0, 0, 0), Color::rgb(9, 9, 9)).unwrap();
    }
    let guard = shared.read().await;
    assert!(guard.get_voxel(Position::new(0, 0, 0)).unwrap().is_some());
}
