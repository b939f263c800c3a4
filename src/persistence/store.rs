//! File-backed store for the persisted artifacts.

use crate::persistence::codec::{Artifact, ArtifactKind};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Errors from reading or writing an artifact.
#[derive(Debug)]
pub enum PersistenceError {
    Read { kind: ArtifactKind, source: std::io::Error },
    Write { kind: ArtifactKind, source: std::io::Error },
    Encode { kind: ArtifactKind, source: bincode::Error },
}

impl std::fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PersistenceError::Read { kind, source } => {
                write!(f, "Failed to read {kind} snapshot: {source}")
            }
            PersistenceError::Write { kind, source } => {
                write!(f, "Failed to write {kind} snapshot: {source}")
            }
            PersistenceError::Encode { kind, source } => {
                write!(f, "Failed to encode {kind} snapshot: {source}")
            }
        }
    }
}

impl std::error::Error for PersistenceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PersistenceError::Read { source, .. } | PersistenceError::Write { source, .. } => {
                Some(source)
            }
            PersistenceError::Encode { source, .. } => Some(source),
        }
    }
}

/// Loads and saves fixed-size snapshots in one directory.
///
/// Saves overwrite the file in place; a crash mid-write can leave a damaged
/// file, which a later load reports as absent.
#[derive(Debug)]
pub struct PersistenceStore {
    dir: PathBuf,
    // Serializes writers so a power-down save and a periodic save never
    // interleave on the same file.
    write_lock: Mutex<()>,
}

impl PersistenceStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `kind`.
    pub fn path_for(&self, kind: ArtifactKind) -> PathBuf {
        self.dir.join(kind.file_name())
    }

    /// Load an artifact.
    ///
    /// A missing, empty, or wrongly sized file yields `Ok(None)` so the caller
    /// keeps its current state.
    pub fn load<A: Artifact>(&self) -> Result<Option<A>, PersistenceError> {
        let path = self.path_for(A::KIND);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No {} snapshot at {:?}", A::KIND, path);
                return Ok(None);
            }
            Err(source) => {
                return Err(PersistenceError::Read {
                    kind: A::KIND,
                    source,
                })
            }
        };

        if bytes.is_empty() {
            return Ok(None);
        }

        let decoded = A::decode(&bytes);
        if decoded.is_none() {
            tracing::warn!(
                "Ignoring {} snapshot at {:?}: {} bytes, expected {}",
                A::KIND,
                path,
                bytes.len(),
                A::SIZE
            );
        }
        Ok(decoded)
    }

    /// Overwrite an artifact with `value`.
    pub fn save<A: Artifact>(&self, value: &A) -> Result<(), PersistenceError> {
        let bytes = value.encode().map_err(|source| PersistenceError::Encode {
            kind: A::KIND,
            source,
        })?;

        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        std::fs::create_dir_all(&self.dir).map_err(|source| PersistenceError::Write {
            kind: A::KIND,
            source,
        })?;

        std::fs::write(self.path_for(A::KIND), bytes).map_err(|source| {
            PersistenceError::Write {
                kind: A::KIND,
                source,
            }
        })?;

        tracing::debug!("Saved {} snapshot", A::KIND);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::settings::Settings;
    use crate::core::window::{Record, SlidingWindowStats};

    fn temp_store() -> PersistenceStore {
        PersistenceStore::new(
            std::env::temp_dir().join(format!("press-cycle-store-{}", uuid::Uuid::new_v4())),
        )
    }

    #[test]
    fn test_missing_artifact_loads_as_none() {
        let store = temp_store();
        assert!(store.load::<Settings>().unwrap().is_none());
        assert!(store.load::<SlidingWindowStats>().unwrap().is_none());
    }

    #[test]
    fn test_empty_artifact_loads_as_none() {
        let store = temp_store();
        std::fs::create_dir_all(store.dir()).unwrap();
        std::fs::write(store.path_for(ArtifactKind::LastRecord), b"").unwrap();
        assert!(store.load::<Record>().unwrap().is_none());
        let _ = std::fs::remove_dir_all(store.dir());
    }

    #[test]
    fn test_truncated_artifact_loads_as_none() {
        let store = temp_store();
        std::fs::create_dir_all(store.dir()).unwrap();
        std::fs::write(store.path_for(ArtifactKind::Settings), [1, 0, 0]).unwrap();
        assert!(store.load::<Settings>().unwrap().is_none());
        let _ = std::fs::remove_dir_all(store.dir());
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let store = temp_store();

        let settings = Settings {
            window_sz: 12,
            queue_depth: 5,
            tx_period_s: 30,
            save_period_s: 120,
            log_level: 2,
        };
        let mut window = SlidingWindowStats::new(12);
        for value in 1..=20 {
            window.update(value);
        }
        let record = window.snapshot();

        store.save(&settings).unwrap();
        store.save(&window).unwrap();
        store.save(&record).unwrap();

        assert_eq!(store.load::<Settings>().unwrap(), Some(settings));
        assert_eq!(store.load::<SlidingWindowStats>().unwrap(), Some(window));
        assert_eq!(store.load::<Record>().unwrap(), Some(record));

        let _ = std::fs::remove_dir_all(store.dir());
    }

    #[test]
    fn test_save_into_unwritable_location_fails() {
        let blocker = std::env::temp_dir().join(format!("press-cycle-file-{}", uuid::Uuid::new_v4()));
        std::fs::write(&blocker, b"not a directory").unwrap();

        let store = PersistenceStore::new(blocker.join("nested"));
        let err = store.save(&Record::default()).unwrap_err();
        assert!(matches!(err, PersistenceError::Write { kind: ArtifactKind::LastRecord, .. }));

        let _ = std::fs::remove_file(&blocker);
    }
}
