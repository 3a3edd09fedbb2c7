pub mod config;
pub mod error;
pub mod metadata;
pub mod mover;
pub mod pattern;
pub mod resolve;
pub mod scan;
pub mod watch;

use log::{debug, info, warn};

pub use config::{photos_root_from_env, OrganizerConfig, Schedule};
pub use error::{Error, Result};
pub use metadata::{EmbeddedDateSource, MediaInfo, NoEmbeddedMetadata, TimestampPolicy};
pub use mover::{MoveOutcome, SafeMover};
pub use pattern::{CaptureDate, PatternMatcher};
pub use resolve::{CandidateFile, DateResolver, DateSource, Resolution};
pub use watch::{CancellationToken, CancelledError};

/// Tally of one pass over the scan directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub scanned: u64,
    pub moved: u64,
    pub identical: u64,
    pub different: u64,
    pub cannot_create: u64,
    pub unresolved: u64,
    pub would_move: u64,
    /// Files whose processing failed with an error.
    pub errors: u64,
}

impl CycleReport {
    pub fn record(&mut self, outcome: MoveOutcome) {
        let slot = match outcome {
            MoveOutcome::Moved => &mut self.moved,
            MoveOutcome::SkippedIdenticalExists => &mut self.identical,
            MoveOutcome::SkippedDifferentExists => &mut self.different,
            MoveOutcome::SkippedCannotCreateDestination => &mut self.cannot_create,
            MoveOutcome::Unresolved => &mut self.unresolved,
            MoveOutcome::WouldMove => &mut self.would_move,
        };
        *slot += 1;
    }

    pub fn summary(&self) -> String {
        let mut s = format!(
            "Scanned {} file(s): {} moved, {} identical, {} different, {} unresolved",
            self.scanned, self.moved, self.identical, self.different, self.unresolved
        );
        if self.cannot_create > 0 {
            s.push_str(&format!(", {} without destination", self.cannot_create));
        }
        if self.would_move > 0 {
            s.push_str(&format!(", {} would move", self.would_move));
        }
        if self.errors > 0 {
            s.push_str(&format!(", {} error(s)", self.errors));
        }
        s
    }
}

/// Resolves and moves every file of the scan directory, one at a time.
pub struct Organizer {
    config: OrganizerConfig,
    resolver: DateResolver,
    mover: SafeMover,
}

impl Organizer {
    pub fn new(config: OrganizerConfig) -> Result<Self> {
        let resolver = DateResolver::new(&config)?;
        Ok(Self::with_resolver(config, resolver))
    }

    /// Use a custom resolver, e.g. one with another embedded metadata source.
    pub fn with_resolver(config: OrganizerConfig, resolver: DateResolver) -> Self {
        let mover = SafeMover::new(config.target_root.clone(), config.dry_run);
        Self {
            config,
            resolver,
            mover,
        }
    }

    pub fn process_file(&self, file: &CandidateFile) -> Result<MoveOutcome> {
        match self.resolver.resolve(file)? {
            Resolution::Resolved { date, source } => {
                debug!("{} dated {} from {:?}", file.name, date, source);
                self.mover.move_file(&file.path, &date, &file.name)
            }
            Resolution::Unresolved => {
                info!("Could not calculate target date for: {}", file.name);
                Ok(MoveOutcome::Unresolved)
            }
        }
    }

    /// One full pass. Only an unreadable scan directory is an error; every
    /// per-file failure is logged and counted.
    pub fn run_cycle(&self) -> Result<CycleReport> {
        self.run_cycle_until(None)
    }

    /// Like [`Organizer::run_cycle`], stopping between files once `token` is cancelled.
    pub fn run_cycle_until(&self, token: Option<&CancellationToken>) -> Result<CycleReport> {
        info!("Scanning [{}]...", self.config.scan_dir.display());
        let files = scan::list_candidates(&self.config.scan_dir)?;

        let mut report = CycleReport::default();
        for file in &files {
            if let Some(token) = token {
                if token.check().is_err() {
                    break;
                }
            }

            report.scanned += 1;
            match self.process_file(file) {
                Ok(outcome) => {
                    if !outcome.is_success() {
                        info!("Left {} in place ({:?})", file.name, outcome);
                    }
                    report.record(outcome)
                }
                Err(e) => {
                    warn!("Skipping {}: {}", file.name, e);
                    report.errors += 1;
                }
            }
        }
        Ok(report)
    }
}
