//! Persisted engine state.
//!
//! A snapshot holds everything [`ConsensusEngine`] needs to resume: config,
//! owner, worker set, the latest round per input, finalized matches and the
//! reward pool. The authorization source and clock are not persisted; they
//! are supplied again on restore.
//!
//! Files are written to a sibling `.tmp` path and renamed into place, so a
//! crash mid-write leaves the previous snapshot intact.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use greenproof_core::registry::StaticCapabilities;
//! use greenproof_core::snapshot::EngineSnapshot;
//! use greenproof_core::voting::{ConsensusEngine, SystemClock};
//!
//! let snapshot = EngineSnapshot::load(Path::new("/var/lib/greenproof/engine.json"))?;
//! let engine = ConsensusEngine::from_snapshot(
//!     snapshot,
//!     Arc::new(StaticCapabilities::new()),
//!     Arc::new(SystemClock),
//! )?;
//! # let _ = engine;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! [`ConsensusEngine`]: crate::voting::ConsensusEngine

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::EngineConfig;
use crate::economics::IncentiveDistributor;
use crate::registry::Identity;
use crate::voting::{InputKey, MatchOutcome, VotingRound};

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Errors from reading or writing snapshots.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SnapshotError {
    /// Filesystem error.
    #[error("snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not a valid snapshot.
    #[error("snapshot encoding error: {0}")]
    Serde(#[from] serde_json::Error),

    /// The file was written by an incompatible format version.
    #[error("unsupported snapshot version {found}, expected {expected}")]
    UnsupportedVersion {
        /// Version found in the file.
        found: u32,
        /// Version this build reads.
        expected: u32,
    },
}

/// Serializable engine state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    /// Format version, always [`SNAPSHOT_VERSION`] when written.
    pub version: u32,
    /// Engine configuration.
    pub config: EngineConfig,
    /// Identity allowed to cancel expired rounds.
    pub owner: Identity,
    /// Current worker set.
    pub workers: Vec<Identity>,
    /// Latest round per input key.
    pub rounds: Vec<VotingRound>,
    /// Finalized outcomes.
    pub matches: BTreeMap<InputKey, MatchOutcome>,
    /// Reward pool state.
    pub rewards: IncentiveDistributor,
}

impl EngineSnapshot {
    /// Reads a snapshot from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError`] if the file cannot be read, is not valid
    /// JSON, or carries a different format version.
    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        let data = fs::read(path)?;
        let snapshot: Self = serde_json::from_slice(&data)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion {
                found: snapshot.version,
                expected: SNAPSHOT_VERSION,
            });
        }
        debug!(
            path = %path.display(),
            rounds = snapshot.rounds.len(),
            matches = snapshot.matches.len(),
            "snapshot loaded"
        );
        Ok(snapshot)
    }

    /// Reads a snapshot from `path`, or `None` if the file does not exist.
    ///
    /// # Errors
    ///
    /// Same as [`EngineSnapshot::load`] for an existing file.
    pub fn load_if_exists(path: &Path) -> Result<Option<Self>, SnapshotError> {
        if !path.exists() {
            return Ok(None);
        }
        Self::load(path).map(Some)
    }

    /// Writes the snapshot to `path` atomically.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError`] if encoding or any filesystem step fails.
    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(self)?;
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, data)?;
        fs::rename(&tmp_path, path)?;
        debug!(path = %path.display(), "snapshot saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tempfile::TempDir;

    use super::*;
    use crate::crypto::hash_content;
    use crate::registry::StaticCapabilities;
    use crate::voting::{ConsensusEngine, ManualClock, RoundStatus};

    fn engine_with_history() -> (ConsensusEngine, Arc<StaticCapabilities>) {
        let config = EngineConfig {
            reward_amount: 5,
            ..EngineConfig::default()
        };
        let authority = Arc::new(StaticCapabilities::new());
        let mut engine = ConsensusEngine::new(
            config.clone(),
            Identity::new("owner"),
            authority.clone(),
            Arc::new(ManualClock::new(100)),
        )
        .unwrap();
        for w in ["w1", "w2", "w3"] {
            let id = Identity::new(w);
            authority.grant(&id, &config.worker_role, config.role_version);
            engine.add_worker(id).unwrap();
        }
        engine.deposit(5).unwrap();

        let done = InputKey::new("2023-01-01T00:00Z");
        let open = InputKey::new("2023-01-01T01:00Z");
        engine.vote(&Identity::new("w1"), &done, hash_content(b"a")).unwrap();
        engine.vote(&Identity::new("w2"), &done, hash_content(b"a")).unwrap();
        engine.vote(&Identity::new("w3"), &open, hash_content(b"b")).unwrap();
        (engine, authority)
    }

    #[test]
    fn save_and_restore_engine() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state").join("engine.json");
        let (engine, authority) = engine_with_history();

        engine.snapshot().save(&path).unwrap();
        assert!(!path.with_extension("json.tmp").exists());

        let loaded = EngineSnapshot::load(&path).unwrap();
        assert_eq!(loaded, engine.snapshot());

        let restored =
            ConsensusEngine::from_snapshot(loaded, authority, Arc::new(ManualClock::new(200)))
                .unwrap();
        let done = InputKey::new("2023-01-01T00:00Z");
        let open = InputKey::new("2023-01-01T01:00Z");
        assert_eq!(restored.get_match(&done), Some(hash_content(b"a")));
        assert_eq!(restored.round_status(&open), Some(RoundStatus::Open));
        assert_eq!(
            restored.get_worker_vote(&open, &Identity::new("w3")),
            Some(hash_content(b"b"))
        );
        assert_eq!(restored.registry().worker_count(), 3);
        assert_eq!(restored.rewards(), engine.rewards());
    }

    #[test]
    fn missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        let result = EngineSnapshot::load_if_exists(&dir.path().join("absent.json")).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn rejects_other_versions() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("engine.json");
        let (engine, _) = engine_with_history();
        let mut snapshot = engine.snapshot();
        snapshot.version = SNAPSHOT_VERSION + 1;
        snapshot.save(&path).unwrap();

        assert!(matches!(
            EngineSnapshot::load(&path),
            Err(SnapshotError::UnsupportedVersion { found: 2, expected: 1 })
        ));
    }

    #[test]
    fn rejects_garbage() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("engine.json");
        fs::write(&path, b"not json").unwrap();
        assert!(matches!(
            EngineSnapshot::load(&path),
            Err(SnapshotError::Serde(_))
        ));
    }
}
