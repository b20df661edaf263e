#![forbid(unsafe_code)]

use std::fs;

use bolt_storage::{ArtifactStore, DirArtifactStore, MemArtifactStore, StorageError};

fn scratch_dir(tag: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("bolt_storage_{tag}_{}", std::process::id()));
    if dir.exists() {
        fs::remove_dir_all(&dir).unwrap();
    }
    fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn at_store_01_dir_store_round_trips_written_artifacts() {
    let dir = scratch_dir("roundtrip");
    fs::write(dir.join("bolt_1.brep"), b"brep-bytes").unwrap();
    let store = DirArtifactStore::new(&dir);

    assert!(store.exists("bolt_1.brep"));
    assert_eq!(store.read("bolt_1.brep").unwrap(), b"brep-bytes");

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn at_store_02_missing_artifact_is_not_found() {
    let dir = scratch_dir("missing");
    let store = DirArtifactStore::new(&dir);

    assert!(!store.exists("bolt_2.stl"));
    assert!(matches!(
        store.read("bolt_2.stl"),
        Err(StorageError::NotFound { .. })
    ));

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn at_store_03_traversal_names_never_reach_the_filesystem() {
    let dir = scratch_dir("traversal");
    // Plant a file outside the root that a naive join would reach.
    fs::write(dir.join("secret.stl"), b"outside").unwrap();
    let nested = dir.join("artifacts");
    fs::create_dir_all(&nested).unwrap();
    let store = DirArtifactStore::new(&nested);

    assert!(!store.exists("../secret.stl"));
    assert!(matches!(
        store.read("../secret.stl"),
        Err(StorageError::UnsafeName { .. })
    ));
    assert!(matches!(
        store.read("/etc/hostname.stl"),
        Err(StorageError::UnsafeName { .. })
    ));

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn at_store_04_mem_store_mirrors_dir_store_semantics() {
    let store = MemArtifactStore::new();
    assert!(store.is_empty());

    store.insert("bolt_9.brep", b"x".to_vec());
    assert!(store.exists("bolt_9.brep"));
    assert_eq!(store.read("bolt_9.brep").unwrap(), b"x");
    assert!(matches!(
        store.read("bolt_9.stl"),
        Err(StorageError::NotFound { .. })
    ));
    assert!(matches!(
        store.read("../bolt_9.brep"),
        Err(StorageError::UnsafeName { .. })
    ));
    assert_eq!(store.len(), 1);
}
