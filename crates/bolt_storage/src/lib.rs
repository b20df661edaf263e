#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use bolt_kernel_contracts::artifact::is_safe_retrieval_name;
use bolt_kernel_contracts::ContractViolation;

#[derive(Debug, Clone, PartialEq)]
pub enum StorageError {
    NotFound { name: String },
    UnsafeName { name: String },
    Io { name: String, detail: String },
    ContractViolation(ContractViolation),
}

impl From<ContractViolation> for StorageError {
    fn from(v: ContractViolation) -> Self {
        StorageError::ContractViolation(v)
    }
}

/// Read-side view of the generator's artifact directory. The generator
/// writes; the service only ever checks presence and reads bytes back.
pub trait ArtifactStore {
    fn exists(&self, name: &str) -> bool;
    fn read(&self, name: &str) -> Result<Vec<u8>, StorageError>;
}

impl<S: ArtifactStore + ?Sized> ArtifactStore for &S {
    fn exists(&self, name: &str) -> bool {
        (**self).exists(name)
    }
    fn read(&self, name: &str) -> Result<Vec<u8>, StorageError> {
        (**self).read(name)
    }
}

impl<S: ArtifactStore + ?Sized> ArtifactStore for std::sync::Arc<S> {
    fn exists(&self, name: &str) -> bool {
        (**self).exists(name)
    }
    fn read(&self, name: &str) -> Result<Vec<u8>, StorageError> {
        (**self).read(name)
    }
}

/// Filesystem store rooted at the generator's well-known artifact directory.
/// Every lookup goes through the retrieval-name filter, so a crafted name
/// can never resolve outside the root.
#[derive(Debug, Clone)]
pub struct DirArtifactStore {
    root: PathBuf,
}

impl DirArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, name: &str) -> Result<PathBuf, StorageError> {
        if !is_safe_retrieval_name(name) {
            return Err(StorageError::UnsafeName {
                name: name.to_string(),
            });
        }
        Ok(self.root.join(name))
    }
}

impl ArtifactStore for DirArtifactStore {
    fn exists(&self, name: &str) -> bool {
        match self.resolve(name) {
            Ok(path) => path.is_file(),
            Err(_) => false,
        }
    }

    fn read(&self, name: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.resolve(name)?;
        if !path.is_file() {
            return Err(StorageError::NotFound {
                name: name.to_string(),
            });
        }
        fs::read(&path).map_err(|e| StorageError::Io {
            name: name.to_string(),
            detail: e.to_string(),
        })
    }
}

/// In-memory store for tests and the offline tooling path. Interior mutability
/// lets a fake generator insert artifacts mid-pipeline through a shared
/// reference.
#[derive(Debug, Default)]
pub struct MemArtifactStore {
    files: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, name: &str, bytes: Vec<u8>) {
        self.files
            .lock()
            .expect("artifact map lock poisoned")
            .insert(name.to_string(), bytes);
    }

    pub fn len(&self) -> usize {
        self.files.lock().expect("artifact map lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ArtifactStore for MemArtifactStore {
    fn exists(&self, name: &str) -> bool {
        if !is_safe_retrieval_name(name) {
            return false;
        }
        self.files
            .lock()
            .expect("artifact map lock poisoned")
            .contains_key(name)
    }

    fn read(&self, name: &str) -> Result<Vec<u8>, StorageError> {
        if !is_safe_retrieval_name(name) {
            return Err(StorageError::UnsafeName {
                name: name.to_string(),
            });
        }
        self.files
            .lock()
            .expect("artifact map lock poisoned")
            .get(name)
            .cloned()
            .ok_or(StorageError::NotFound {
                name: name.to_string(),
            })
    }
}
