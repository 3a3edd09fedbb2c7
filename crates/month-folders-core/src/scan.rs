use std::fs;
use std::path::Path;

use log::{debug, warn};

use crate::error::{Error, Result};
use crate::resolve::CandidateFile;

/// Non-directory entries of `dir`, in the order the OS lists them.
///
/// Subdirectories are not descended into. Entries that cannot be inspected
/// are logged and left out; only failing to open `dir` is an error.
pub fn list_candidates(dir: &Path) -> Result<Vec<CandidateFile>> {
    let entries = fs::read_dir(dir).map_err(|source| Error::UnreadablePath {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Cannot read directory entry in [{}]: {}", dir.display(), e);
                continue;
            }
        };
        let path = entry.path();

        // is_dir follows symlinks, so linked folders are skipped too
        if path.is_dir() {
            debug!("Skipping directory [{}]", path.display());
            continue;
        }

        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            warn!("Skipping non UTF-8 filename [{}]", path.display());
            continue;
        };
        files.push(CandidateFile { name, path });
    }

    Ok(files)
}
