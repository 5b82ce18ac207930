//! Checkpoint and output files.
//!
//! Accumulated features are written to the checkpoint after every chunk and to
//! the output file at the end. Both writes go to a `.part` sibling first and are
//! renamed into place, so a crash mid-write never leaves a truncated file.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::feature::FeatureCollection;
use crate::trip::TripId;

/// Temporary file suffix used before atomic rename.
pub const TEMP_SUFFIX: &str = ".part";

#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("{} is not a valid feature collection (delete it to start over): {source}", path.display())]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("{} contains an invalid feature: {reason}", path.display())]
    Invalid { path: PathBuf, reason: String },
    #[error("write {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },
    #[error("checkpoint and output must be different files: {}", path.display())]
    SamePath { path: PathBuf },
}

/// Path for the temp file: appends `.part` (e.g. `routes.json` → `routes.json.part`).
pub fn temp_path(final_path: &Path) -> PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    PathBuf::from(o)
}

/// Where progress lives on disk.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    checkpoint_path: PathBuf,
    output_path: PathBuf,
    reuse_checkpoint: bool,
    reuse_output: bool,
}

impl CheckpointStore {
    pub fn new(checkpoint_path: impl Into<PathBuf>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            checkpoint_path: checkpoint_path.into(),
            output_path: output_path.into(),
            reuse_checkpoint: true,
            reuse_output: true,
        }
    }

    /// When no checkpoint exists, seed progress from a previous output file.
    pub fn reuse_output(mut self, reuse: bool) -> Self {
        self.reuse_output = reuse;
        self
    }

    /// Start from nothing: neither the checkpoint nor a previous output is
    /// read. Both are overwritten as the run progresses.
    pub fn ignore_existing(mut self) -> Self {
        self.reuse_checkpoint = false;
        self.reuse_output = false;
        self
    }

    pub fn checkpoint_path(&self) -> &Path {
        &self.checkpoint_path
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Fail when the checkpoint and output paths name the same file, however
    /// they are spelled. `finalize` would otherwise delete the output it just wrote.
    pub fn ensure_distinct(&self) -> Result<(), CheckpointError> {
        if resolve(&self.checkpoint_path) == resolve(&self.output_path) {
            return Err(CheckpointError::SamePath {
                path: self.output_path.clone(),
            });
        }
        Ok(())
    }

    /// Restore prior progress: the collection plus the set of completed trip ids.
    ///
    /// The checkpoint wins over the output file; with neither present the job
    /// starts empty. An unreadable or invalid file is an error, never silently
    /// discarded.
    pub fn load(&self) -> Result<(FeatureCollection, HashSet<TripId>), CheckpointError> {
        self.ensure_distinct()?;
        let mut sources = Vec::with_capacity(2);
        if self.reuse_checkpoint {
            sources.push(&self.checkpoint_path);
        }
        if self.reuse_output {
            sources.push(&self.output_path);
        }
        for path in sources {
            if let Some(collection) = read_collection(path)? {
                let ids = collection.trip_ids();
                tracing::info!(
                    "loaded {} existing features from {}",
                    collection.len(),
                    path.display()
                );
                return Ok((collection, ids));
            }
        }
        Ok((FeatureCollection::new(), HashSet::new()))
    }

    /// Overwrite the checkpoint with the accumulated collection.
    pub fn save(&self, collection: &FeatureCollection) -> Result<(), CheckpointError> {
        write_atomic(&self.checkpoint_path, collection)
    }

    /// Write the final output and remove the checkpoint. Safe to repeat.
    pub fn finalize(&self, collection: &FeatureCollection) -> Result<(), CheckpointError> {
        self.ensure_distinct()?;
        write_atomic(&self.output_path, collection)?;
        match fs::remove_file(&self.checkpoint_path) {
            Ok(()) => {
                tracing::debug!("removed checkpoint {}", self.checkpoint_path.display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(CheckpointError::Write {
                path: self.checkpoint_path.clone(),
                source,
            }),
        }
    }
}

/// Absolute form of `path` for identity checks. The file itself may not exist
/// yet, so only the parent directory is canonicalized in that case.
fn resolve(path: &Path) -> PathBuf {
    if let Ok(p) = fs::canonicalize(path) {
        return p;
    }
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    match (fs::canonicalize(parent), path.file_name()) {
        (Ok(dir), Some(name)) => dir.join(name),
        _ => path.components().collect(),
    }
}

/// Read and validate a collection. `Ok(None)` when the file does not exist.
pub fn read_collection(path: &Path) -> Result<Option<FeatureCollection>, CheckpointError> {
    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(CheckpointError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    let mut collection: FeatureCollection =
        serde_json::from_slice(&bytes).map_err(|source| CheckpointError::Corrupt {
            path: path.to_path_buf(),
            source,
        })?;
    for feature in &collection.features {
        feature.validate().map_err(|reason| CheckpointError::Invalid {
            path: path.to_path_buf(),
            reason,
        })?;
    }
    let dupes = collection.dedup_by_trip_id();
    if dupes > 0 {
        tracing::warn!("{}: dropped {} duplicate trip id(s)", path.display(), dupes);
    }
    Ok(Some(collection))
}

fn write_atomic(path: &Path, collection: &FeatureCollection) -> Result<(), CheckpointError> {
    let err = |source: io::Error| CheckpointError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(err)?;
    }
    let tmp = temp_path(path);
    let json = serde_json::to_vec(collection).map_err(|e| err(io::Error::other(e)))?;
    fs::write(&tmp, json).map_err(err)?;
    fs::rename(&tmp, path).map_err(err)?;
    Ok(())
}
