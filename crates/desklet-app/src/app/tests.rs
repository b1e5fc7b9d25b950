use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use desklet_config::DeskletConfig;
use desklet_layout::{ContainerHandle, SurfaceSpec};
use desklet_manager::{CreateOptions, FixedPrompter, StateStore};
use serde_json::json;

use super::DeskletApp;
use crate::registry::{ManifestRegistry, MANIFEST_FILE};
use crate::state_file::FileStateStore;

fn app(root: &Path) -> DeskletApp {
    let widgets = root.join("widgets");
    std::fs::create_dir_all(widgets.join("clock")).unwrap();
    std::fs::write(widgets.join("clock").join(MANIFEST_FILE), "name = \"Clock\"\n").unwrap();

    let mut config = DeskletConfig::default();
    config.state.watch = false;
    DeskletApp::from_parts(
        config,
        vec![SurfaceSpec {
            monitor_index: 0,
            container: ContainerHandle(0),
            normalized_width: 1920.0,
            normalized_height: 1080.0,
        }],
        ManifestRegistry::new(vec![widgets]),
        FileStateStore::new(root.join("state.json"), Duration::from_millis(10)),
        Arc::new(FixedPrompter { grant: true }),
    )
}

fn read_state(root: &Path) -> serde_json::Value {
    serde_json::from_str(&std::fs::read_to_string(root.join("state.json")).unwrap()).unwrap()
}

#[tokio::test]
async fn add_list_remove_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(dir.path());

    let id = app.add("clock", CreateOptions::default()).await.unwrap();
    let state = read_state(dir.path());
    assert_eq!(state["version"], json!(2));
    assert_eq!(state["instances"][0]["instanceId"], json!(id.to_string()));
    assert_eq!(state["instances"][0]["webConsent"], json!(true));

    let mut out = Vec::new();
    app.list(&mut out).await.unwrap();
    let listing = String::from_utf8(out).unwrap();
    assert!(listing.contains(id.as_str()));
    assert!(listing.contains("clock"));

    app.remove(id.as_str()).await.unwrap();
    assert_eq!(read_state(dir.path())["instances"], json!([]));
    assert!(app.remove(id.as_str()).await.is_err());
}

#[tokio::test]
async fn list_widgets_shows_manifests() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(dir.path());

    let mut out = Vec::new();
    app.list_widgets(&mut out).await.unwrap();
    let listing = String::from_utf8(out).unwrap();
    assert!(listing.contains("clock"));
    assert!(listing.contains("Clock"));
    assert!(listing.contains("html"));
}

#[tokio::test]
async fn add_on_missing_monitor_fails() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(dir.path());
    let options = CreateOptions {
        monitor: Some(4),
        ..Default::default()
    };
    assert!(app.add("clock", options).await.is_err());
}

#[tokio::test]
async fn v1_state_file_is_upgraded_on_open() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(dir.path());
    std::fs::write(
        dir.path().join("state.json"),
        r#"{"instances":[{"instanceId":"old","widgetId":"clock"}]}"#,
    )
    .unwrap();

    let mut out = Vec::new();
    app.list(&mut out).await.unwrap();
    let state = read_state(dir.path());
    assert_eq!(state["version"], json!(2));
    assert_eq!(state["instances"][0]["hasBackend"], json!(false));
}

#[tokio::test]
async fn reload_skips_own_writes_and_applies_foreign_ones() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(dir.path());
    let (manager, _host_rx) = app.open(true, false).await.unwrap();

    app.store
        .save_now(json!({"version": 2, "instances": []}))
        .unwrap();
    assert!(!app.reload(&manager).await);

    std::fs::write(
        dir.path().join("state.json"),
        r#"{"version":2,"instances":[{"instanceId":"ext","widgetId":"clock","webConsent":true}]}"#,
    )
    .unwrap();
    assert!(app.reload(&manager).await);
    assert_eq!(manager.instances().len(), 1);
    assert!(manager.actor(&"ext".into()).is_some());

    std::fs::write(dir.path().join("state.json"), "{ broken").unwrap();
    assert!(!app.reload(&manager).await);
    assert_eq!(manager.instances().len(), 1);
}

#[tokio::test]
async fn run_stops_on_shutdown_and_flushes_state() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(dir.path());
    std::fs::write(
        dir.path().join("state.json"),
        r#"{"version":2,"instances":[{"instanceId":"kept","widgetId":"clock","webConsent":true}]}"#,
    )
    .unwrap();

    app.run(tokio::time::sleep(Duration::from_millis(50)))
        .await
        .unwrap();
    let state = read_state(dir.path());
    assert_eq!(state["instances"][0]["instanceId"], json!("kept"));
}

#[tokio::test]
async fn shutdown_writes_stacking_before_teardown() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(dir.path());
    std::fs::write(
        dir.path().join("state.json"),
        r#"{"version":2,"instances":[
            {"instanceId":"low","widgetId":"clock","webConsent":true},
            {"instanceId":"high","widgetId":"clock","webConsent":true}
        ]}"#,
    )
    .unwrap();
    let (manager, _host_rx) = app.open(true, false).await.unwrap();

    let low = manager.actor(&"low".into()).unwrap();
    app.renderer.raise(low);
    app.shutdown(&manager);

    let state = read_state(dir.path());
    assert_eq!(state["instances"][0]["instanceId"], json!("high"));
    assert_eq!(state["instances"][1]["instanceId"], json!("low"));
    assert!(manager.actor(&"low".into()).is_none());
}
