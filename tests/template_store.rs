use std::sync::Arc;

use meccabbs::mecca::{FieldMap, Hangup, Interpreter, RunOutcome, TemplateStore};

async fn write(root: &std::path::Path, name: &str, source: &str) {
    let path = root.join(name);
    tokio::fs::create_dir_all(path.parent().unwrap()).await.unwrap();
    tokio::fs::write(path, source).await.unwrap();
}

#[tokio::test]
async fn load_all_compiles_tree_and_skips_broken_files() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "misc/logo.mec", "[cls]Welcome").await;
    write(dir.path(), "misc/broken.mec", "[white").await;
    write(dir.path(), "notes.txt", "not a template").await;

    let store = TemplateStore::with_root(dir.path());
    let (compiled, failed) = store.load_all().await.unwrap();
    assert_eq!((compiled, failed), (1, 1));
    assert_eq!(store.names(), vec!["misc/logo".to_string()]);
}

#[tokio::test]
async fn templates_load_on_first_run() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "misc/main_menu.mec", "Main menu").await;

    let store = Arc::new(TemplateStore::with_root(dir.path()));
    assert!(!store.contains("misc/main_menu"));
    let interp = Interpreter::new(Arc::clone(&store));
    let mut out = Vec::new();
    let ctx = Arc::new(FieldMap::new());
    let report =
        interp.run("misc/main_menu.mec", ctx, tokio::io::empty(), &mut out, Hangup::never()).await;
    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(out, b"Main menu");
    assert!(store.contains("misc/main_menu"));
}

#[tokio::test]
async fn includes_load_on_first_reference() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "misc/header.mec", "HDR").await;
    write(dir.path(), "misc/menu.mec", "[include misc/header] body").await;

    let store = Arc::new(TemplateStore::with_root(dir.path()));
    let interp = Interpreter::new(Arc::clone(&store));
    let mut out = Vec::new();
    let report = interp
        .run("misc/menu", Arc::new(FieldMap::new()), tokio::io::empty(), &mut out, Hangup::never())
        .await;
    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(out, b"HDR body");
    assert!(store.contains("misc/header"));
}

#[tokio::test]
async fn load_reports_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let store = TemplateStore::with_root(dir.path());
    let err = store.load("missing").await.unwrap_err();
    assert!(err.to_string().contains("missing"));
}

#[tokio::test]
async fn store_without_root_loads_nothing() {
    let store = TemplateStore::new();
    assert_eq!(store.load_all().await.unwrap(), (0, 0));
    assert!(store.get_or_load("anything").await.is_err());
}
