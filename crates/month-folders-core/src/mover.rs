use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::pattern::CaptureDate;

/// Result of handling one candidate file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Moved,
    /// Same bytes already at the destination; the source stays where it is.
    SkippedIdenticalExists,
    SkippedDifferentExists,
    SkippedCannotCreateDestination,
    Unresolved,
    /// Dry run: every check passed, nothing was renamed.
    WouldMove,
}

impl MoveOutcome {
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            MoveOutcome::Moved | MoveOutcome::SkippedIdenticalExists | MoveOutcome::WouldMove
        )
    }
}

/// Streaming SHA-256 of a file, hex encoded.
pub fn file_digest(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Moves files into `<target_root>/<YYYY>/<YYYY-MM>/<name>` without ever
/// overwriting or deleting anything.
#[derive(Debug, Clone)]
pub struct SafeMover {
    target_root: PathBuf,
    dry_run: bool,
}

impl SafeMover {
    pub fn new(target_root: impl Into<PathBuf>, dry_run: bool) -> Self {
        Self {
            target_root: target_root.into(),
            dry_run,
        }
    }

    pub fn destination_dir(&self, date: &CaptureDate) -> PathBuf {
        self.target_root.join(date.year_dir()).join(date.month_dir())
    }

    pub fn destination(&self, date: &CaptureDate, filename: &str) -> PathBuf {
        self.destination_dir(date).join(filename)
    }

    pub fn move_file(&self, from: &Path, date: &CaptureDate, filename: &str) -> Result<MoveOutcome> {
        let to_dir = self.destination_dir(date);

        if let Err(e) = ensure_dir(&to_dir) {
            warn!("{}", e);
            warn!("Cannot move [{}]", filename);
            return Ok(MoveOutcome::SkippedCannotCreateDestination);
        }

        let to = to_dir.join(filename);
        if let Some(outcome) = compare_existing(from, &to)? {
            return Ok(outcome);
        }

        if self.dry_run {
            info!("(dry run) {} => {}", filename, to_dir.display());
            return Ok(MoveOutcome::WouldMove);
        }

        match rename_no_replace(from, &to) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                warn!("[{}] appeared at the destination while moving", filename);
                let outcome = compare_existing(from, &to)?;
                return Ok(outcome.unwrap_or(MoveOutcome::SkippedDifferentExists));
            }
            Err(source) => {
                return Err(Error::MoveIo {
                    from: from.to_path_buf(),
                    to,
                    source,
                })
            }
        }
        info!("{} => {}", filename, to_dir.display());
        Ok(MoveOutcome::Moved)
    }
}

/// Rename that fails with `AlreadyExists` instead of replacing `to`.
///
/// The hard link claims `to` atomically; the source name is dropped only
/// once the link exists.
fn rename_no_replace(from: &Path, to: &Path) -> io::Result<()> {
    match fs::hard_link(from, to) {
        Ok(()) => fs::remove_file(from).map_err(|e| {
            let _ = fs::remove_file(to);
            e
        }),
        Err(e) if matches!(e.kind(), io::ErrorKind::AlreadyExists | io::ErrorKind::NotFound) => {
            Err(e)
        }
        Err(e) => {
            // No hard links here (FAT, some network shares): plain rename
            debug!("hard link failed ({}), renaming instead", e);
            if fs::symlink_metadata(to).is_ok() {
                return Err(io::Error::from(io::ErrorKind::AlreadyExists));
            }
            fs::rename(from, to)
        }
    }
}

/// Create `dir` and its parents, regardless of which month it belongs to.
fn ensure_dir(dir: &Path) -> Result<()> {
    if dir.is_dir() {
        return Ok(());
    }

    info!("Creating folder [{}]...", dir.display());
    fs::create_dir_all(dir).map_err(|source| Error::DestinationCreate {
        path: dir.to_path_buf(),
        source: Some(source),
    })?;

    if !dir.is_dir() {
        return Err(Error::DestinationCreate {
            path: dir.to_path_buf(),
            source: None,
        });
    }
    Ok(())
}

/// `None` when nothing occupies `to`; otherwise the skip outcome.
fn compare_existing(from: &Path, to: &Path) -> Result<Option<MoveOutcome>> {
    let to_meta = match fs::symlink_metadata(to) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(Error::FileAccess {
                path: to.to_path_buf(),
                source,
            })
        }
    };

    info!("File exists! [{}]", to.display());

    let from_bytes = fs::metadata(from)
        .map_err(|source| Error::FileAccess {
            path: from.to_path_buf(),
            source,
        })?
        .len();
    let to_bytes = to_meta.len();

    if !to_meta.is_file() || from_bytes != to_bytes {
        info!("Files differ: ({} bytes) vs. ({} bytes)", from_bytes, to_bytes);
        return Ok(Some(MoveOutcome::SkippedDifferentExists));
    }

    compare_contents(from, to, file_digest).map(Some)
}

fn compare_contents<F>(from: &Path, to: &Path, digest: F) -> Result<MoveOutcome>
where
    F: Fn(&Path) -> io::Result<String>,
{
    let digest_of = |path: &Path| {
        digest(path).map_err(|source| Error::ContentComparison {
            path: path.to_path_buf(),
            source,
        })
    };
    let from_sha = digest_of(from)?;
    let to_sha = digest_of(to)?;

    if from_sha != to_sha {
        info!("Files differ: ({} SHA256) vs. ({} SHA256)", from_sha, to_sha);
        return Ok(MoveOutcome::SkippedDifferentExists);
    }

    debug!("Files are identical: {}", from_sha);
    info!("Files are identical.");
    Ok(MoveOutcome::SkippedIdenticalExists)
}
