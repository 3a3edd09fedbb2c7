use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures raised while organizing a camera roll.
///
/// Everything except `UnreadablePath` and `Pattern` is scoped to a single
/// file and is recovered by the cycle runner.
#[derive(Error, Debug)]
pub enum Error {
    /// The scan directory could not be listed.
    #[error("cannot read directory {}: {source}", .path.display())]
    UnreadablePath {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A file could not be stat'd or read.
    #[error("cannot access {}: {source}", .path.display())]
    FileAccess {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The destination folder could not be created.
    #[error("cannot create directory {}{}", .path.display(), describe(.source))]
    DestinationCreate {
        path: PathBuf,
        #[source]
        source: Option<io::Error>,
    },

    /// Hashing failed while comparing against an existing destination file.
    #[error("cannot compare contents of {}: {source}", .path.display())]
    ContentComparison {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The final rename failed.
    #[error("cannot move {} to {}: {source}", .from.display(), .to.display())]
    MoveIo {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A filename rule failed to compile.
    #[error("invalid filename pattern: {0}")]
    Pattern(#[from] regex::Error),
}

fn describe(source: &Option<io::Error>) -> String {
    match source {
        Some(e) => format!(": {e}"),
        None => " (still missing after create)".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, Error>;
