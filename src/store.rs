//! The persistent metadata store for `stk`: one record per tracked branch, plus a single slot for
//! the checkpoint of an interrupted operation.

use crate::{
    constants::STK_STORE_FILE_NAME,
    errors::{StError, StResult},
};
use git2::Repository;
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, BTreeSet},
    path::{Path, PathBuf},
};

/// The record `stk` keeps for a tracked branch.
#[derive(Default, Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BranchRecord {
    /// The name of the declared parent branch.
    pub parent: String,
    /// The [git2::Oid] of the parent's tip as of the last successful sync, in [String] form.
    ///
    /// Doubles as the lower bound of the branch's own commits when rebasing.
    pub parent_oid: String,
    /// Insertion sequence number. Siblings are ordered oldest-first by this value.
    pub seq: u64,
    /// The pull request associated with the branch, if it has been published.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review: Option<ReviewMetadata>,
}

impl BranchRecord {
    /// Creates a new [BranchRecord] with no associated pull request.
    pub fn new(parent: impl Into<String>, parent_oid: impl Into<String>, seq: u64) -> Self {
        Self {
            parent: parent.into(),
            parent_oid: parent_oid.into(),
            seq,
            review: None,
        }
    }
}

/// Remote metadata for a branch that has been published.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ReviewMetadata {
    /// The number of the pull request.
    pub number: u64,
    /// The base branch the pull request was last pointed at.
    pub base: String,
}

/// The operation that started an interrupted cascade.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Operation {
    /// A plain `sync` of a selection of the stack.
    Sync,
    /// The sync that follows moving `branch` onto `target`.
    Reparent { branch: String, target: String },
    /// The sync of the children of a landed branch.
    Land { landed: String },
    /// The sync that follows collapsing deleted branches during `update`.
    Update,
}

/// The resumable state of a cascade that halted on a conflict.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Checkpoint {
    /// The branch that was checked out when the operation started.
    pub original_branch: String,
    /// The branches still to process, in order. The first entry is the one that conflicted.
    pub remaining: Vec<String>,
    /// Branches in `remaining` that must be rebased on their first attempt regardless of drift.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub forced: Vec<String>,
    /// The operation that started the cascade.
    pub operation: Operation,
}

/// Narrow key/value interface over the persisted stack metadata.
///
/// Every mutating call is durable by the time it returns.
pub trait MetadataStore {
    /// Returns the record for `branch`, if it is tracked.
    fn get(&self, branch: &str) -> Option<BranchRecord>;

    /// Returns all tracked branches and their records.
    fn list(&self) -> BTreeMap<String, BranchRecord>;

    /// Inserts or replaces the record for `branch`.
    fn set(&mut self, branch: &str, record: BranchRecord) -> StResult<()>;

    /// Removes the record for `branch`, returning it if it existed.
    fn remove(&mut self, branch: &str) -> StResult<Option<BranchRecord>>;

    /// Returns the branches that were promoted to stack bottoms.
    fn bottoms(&self) -> BTreeSet<String>;

    /// Promotes `branch` to a stack bottom.
    fn add_bottom(&mut self, branch: &str) -> StResult<()>;

    /// Returns the checkpoint of the interrupted operation, if any.
    fn checkpoint(&self) -> Option<Checkpoint>;

    /// Replaces the checkpoint slot. [None] clears it.
    fn set_checkpoint(&mut self, checkpoint: Option<Checkpoint>) -> StResult<()>;

    /// Returns the sequence number for the next tracked branch.
    fn next_seq(&self) -> u64 {
        self.list()
            .values()
            .map(|record| record.seq + 1)
            .max()
            .unwrap_or_default()
    }
}

/// The serialized form of the store. On its own it is an in-memory [MetadataStore].
#[derive(Default, Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct StoreState {
    /// Branches promoted to stack bottoms, in addition to the configured trunks.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub bottoms: BTreeSet<String>,
    /// The tracked branches.
    #[serde(default)]
    pub branches: BTreeMap<String, BranchRecord>,
    /// The checkpoint of the interrupted operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkpoint: Option<Checkpoint>,
}

impl MetadataStore for StoreState {
    fn get(&self, branch: &str) -> Option<BranchRecord> {
        self.branches.get(branch).cloned()
    }

    fn list(&self) -> BTreeMap<String, BranchRecord> {
        self.branches.clone()
    }

    fn set(&mut self, branch: &str, record: BranchRecord) -> StResult<()> {
        self.branches.insert(branch.to_string(), record);
        Ok(())
    }

    fn remove(&mut self, branch: &str) -> StResult<Option<BranchRecord>> {
        Ok(self.branches.remove(branch))
    }

    fn bottoms(&self) -> BTreeSet<String> {
        self.bottoms.clone()
    }

    fn add_bottom(&mut self, branch: &str) -> StResult<()> {
        self.bottoms.insert(branch.to_string());
        Ok(())
    }

    fn checkpoint(&self) -> Option<Checkpoint> {
        self.checkpoint.clone()
    }

    fn set_checkpoint(&mut self, checkpoint: Option<Checkpoint>) -> StResult<()> {
        self.checkpoint = checkpoint;
        Ok(())
    }
}

/// A [MetadataStore] persisted as TOML, rewritten after every mutation.
#[derive(Debug)]
pub struct TomlStore {
    /// Location of the store on disk.
    path: PathBuf,
    /// The current contents of the store.
    state: StoreState,
}

impl TomlStore {
    /// Opens the store for the given [Repository], starting empty if none has been written yet.
    pub fn open(repository: &Repository) -> StResult<Self> {
        Self::open_at(store_path(repository))
    }

    /// Opens the store at `path`, starting empty if the file does not exist.
    pub fn open_at(path: impl Into<PathBuf>) -> StResult<Self> {
        let path = path.into();
        let state = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            toml::from_str(&raw).map_err(|e| {
                StError::Store(format!("Failed to parse {}: {}", path.display(), e))
            })?
        } else {
            StoreState::default()
        };

        tracing::debug!(path = %path.display(), branches = state.branches.len(), "Loaded store");
        Ok(Self { path, state })
    }

    /// Returns the path of the store on disk.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the store to a sibling temporary file and moves it into place.
    fn persist(&self) -> StResult<()> {
        let serialized = toml::to_string_pretty(&self.state)
            .map_err(|e| StError::Store(format!("Failed to serialize store: {}", e)))?;
        let tmp_path = self.path.with_extension("toml.tmp");
        std::fs::write(&tmp_path, serialized)?;
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

impl MetadataStore for TomlStore {
    fn get(&self, branch: &str) -> Option<BranchRecord> {
        self.state.get(branch)
    }

    fn list(&self) -> BTreeMap<String, BranchRecord> {
        self.state.list()
    }

    fn set(&mut self, branch: &str, record: BranchRecord) -> StResult<()> {
        self.state.set(branch, record)?;
        self.persist()
    }

    fn remove(&mut self, branch: &str) -> StResult<Option<BranchRecord>> {
        let removed = self.state.remove(branch)?;
        if removed.is_some() {
            self.persist()?;
        }
        Ok(removed)
    }

    fn bottoms(&self) -> BTreeSet<String> {
        self.state.bottoms()
    }

    fn add_bottom(&mut self, branch: &str) -> StResult<()> {
        self.state.add_bottom(branch)?;
        self.persist()
    }

    fn checkpoint(&self) -> Option<Checkpoint> {
        self.state.checkpoint()
    }

    fn set_checkpoint(&mut self, checkpoint: Option<Checkpoint>) -> StResult<()> {
        if self.state.checkpoint.is_none() && checkpoint.is_none() {
            return Ok(());
        }
        self.state.set_checkpoint(checkpoint)?;
        self.persist()
    }
}

/// Returns the path to the metadata store for the given [Repository].
///
/// The store lives inside the git directory so that it is never committed.
pub fn store_path(repository: &Repository) -> PathBuf {
    repository.path().join(STK_STORE_FILE_NAME)
}
