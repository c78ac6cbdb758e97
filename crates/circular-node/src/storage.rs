//! JSON file persistence for the channel graph.

use std::path::{Path, PathBuf};

use circular_routing::GraphSnapshot;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Stores the graph snapshot in a single JSON file. Only channel records and
/// aliases are written; the indices are rebuilt on load.
pub struct GraphStore {
    path: PathBuf,
}

impl GraphStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the last saved snapshot. A missing or unreadable file yields
    /// `None` so the node starts from an empty graph.
    pub fn load(&self) -> Option<GraphSnapshot> {
        let contents = match std::fs::read(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "no saved graph, starting empty");
                return None;
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "could not read saved graph");
                return None;
            }
        };
        match serde_json::from_slice::<GraphSnapshot>(&contents) {
            Ok(snapshot) => {
                tracing::info!(
                    path = %self.path.display(),
                    channels = snapshot.channels.len(),
                    "loaded saved graph"
                );
                Some(snapshot)
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "saved graph is corrupt, ignoring it");
                None
            }
        }
    }

    /// Write the snapshot next to the target and rename it into place, so a
    /// crash mid-write never leaves a truncated file behind.
    pub fn save(&self, snapshot: &GraphSnapshot) -> Result<(), StorageError> {
        let io = |source| StorageError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io)?;
        }
        let bytes = serde_json::to_vec(snapshot)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, bytes).map_err(io)?;
        std::fs::rename(&tmp, &self.path).map_err(io)?;
        tracing::debug!(
            path = %self.path.display(),
            channels = snapshot.channels.len(),
            "graph saved"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use circular_core::{Channel, NodeId, ShortChannelId};

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("circular-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn snapshot() -> GraphSnapshot {
        let mut snapshot = GraphSnapshot::default();
        snapshot.channels.push(Channel {
            short_channel_id: ShortChannelId::from_parts(1, 0, 0),
            source: NodeId::from("A"),
            destination: NodeId::from("B"),
            capacity: 1_000,
            liquidity: 500,
            base_fee: 1,
            fee_per_millionth: 1,
            min_htlc: 0,
            max_htlc: 1_000,
            delay: 6,
            active: true,
            last_update: 0,
        });
        snapshot.aliases.insert(NodeId::from("A"), "alice".into());
        snapshot
    }

    #[test]
    fn test_save_and_load() {
        let dir = temp_dir();
        let store = GraphStore::new(dir.join("graph.json"));
        store.save(&snapshot()).unwrap();
        assert_eq!(store.load(), Some(snapshot()));
        assert!(!dir.join("graph.json.tmp").exists());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_save_creates_data_dir() {
        let dir = temp_dir();
        let store = GraphStore::new(dir.join("nested").join("graph.json"));
        store.save(&snapshot()).unwrap();
        assert!(store.path().exists());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missing_file_loads_nothing() {
        let dir = temp_dir();
        let store = GraphStore::new(dir.join("graph.json"));
        assert!(store.load().is_none());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_corrupt_file_loads_nothing() {
        let dir = temp_dir();
        let path = dir.join("graph.json");
        std::fs::write(&path, b"{\"channels\": [").unwrap();
        assert!(GraphStore::new(&path).load().is_none());
        std::fs::remove_dir_all(&dir).ok();
    }
}
