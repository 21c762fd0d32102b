//! Startup snapshot of the slider state from sysfs
//!
//! The extcon node index differs between boards, so the base directory is
//! scanned for the first `extcon<N>` child and its `state` file is read.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::normalize::normalize_composite;
use crate::policy::Position;

const NODE_PREFIX: &str = "extcon";
const STATE_FILE: &str = "state";

/// Errors reading the startup snapshot
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("cannot scan {}: {source}", path.display())]
    Scan { path: PathBuf, source: io::Error },

    #[error("no extcon node under {}", .0.display())]
    NoNode(PathBuf),

    #[error("cannot read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
}

/// Locate the slider's state file under `base_dir`
pub fn find_state_file(base_dir: &Path) -> Result<PathBuf, SnapshotError> {
    let entries = fs::read_dir(base_dir).map_err(|source| SnapshotError::Scan {
        path: base_dir.to_owned(),
        source,
    })?;

    let mut nodes: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| is_node_name(&entry.file_name().to_string_lossy()))
        .map(|entry| entry.path())
        .collect();
    nodes.sort();

    nodes
        .into_iter()
        .next()
        .map(|node| node.join(STATE_FILE))
        .ok_or_else(|| SnapshotError::NoNode(base_dir.to_owned()))
}

/// Read the current slider position, `Ok(None)` if the content is not decodable
pub fn read_position(base_dir: &Path) -> Result<Option<Position>, SnapshotError> {
    let path = find_state_file(base_dir)?;
    let content = fs::read_to_string(&path).map_err(|source| SnapshotError::Read {
        path: path.clone(),
        source,
    })?;

    let position = normalize_composite(&content);
    debug!(?path, ?position, "read slider snapshot");
    Ok(position)
}

fn is_node_name(name: &str) -> bool {
    name.strip_prefix(NODE_PREFIX)
        .is_some_and(|index| !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()))
}
