use std::path::PathBuf;

use log::debug;

use crate::config::OrganizerConfig;
use crate::error::Result;
use crate::metadata::{EmbeddedDateSource, MediaInfo, MetadataResolver, MetadataSource};
use crate::pattern::{CaptureDate, PatternMatcher, Verdict};

/// One directory entry being processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFile {
    pub name: String,
    pub path: PathBuf,
}

/// Where a resolved date came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateSource {
    /// Name of the filename rule that matched.
    Filename(&'static str),
    Metadata(MetadataSource),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Resolved { date: CaptureDate, source: DateSource },
    Unresolved,
}

/// Filename rules first, then file metadata (unless running strict).
pub struct DateResolver {
    matcher: PatternMatcher,
    metadata: MetadataResolver,
    metadata_fallback: bool,
}

impl DateResolver {
    pub fn new(config: &OrganizerConfig) -> Result<Self> {
        let matcher = PatternMatcher::new(&config.extensions, &config.vendor_prefixes)?;
        let mut metadata = MetadataResolver::new(config.timestamp_policy);
        if config.mediainfo {
            metadata = metadata.with_embedded_source(Box::new(MediaInfo::default()));
        }
        Ok(Self {
            matcher,
            metadata,
            metadata_fallback: config.metadata_fallback,
        })
    }

    pub fn with_embedded_source(mut self, source: Box<dyn EmbeddedDateSource>) -> Self {
        self.metadata = self.metadata.with_embedded_source(source);
        self
    }

    pub fn resolve(&self, file: &CandidateFile) -> Result<Resolution> {
        match self.matcher.classify(&file.name) {
            Some(m) => match m.verdict {
                Verdict::Date(date) => {
                    debug!("Matched {} expression: {} -> {}", m.rule, file.name, date);
                    Ok(Resolution::Resolved {
                        date,
                        source: DateSource::Filename(m.rule),
                    })
                }
                Verdict::UseMetadata => {
                    debug!("Processing {} file by metadata date: {}", m.rule, file.name);
                    self.from_metadata(file)
                }
            },
            None if self.metadata_fallback => self.from_metadata(file),
            None => {
                debug!("No filename rule matched {}", file.name);
                Ok(Resolution::Unresolved)
            }
        }
    }

    fn from_metadata(&self, file: &CandidateFile) -> Result<Resolution> {
        let found = self.metadata.resolve(&file.path)?;
        Ok(Resolution::Resolved {
            date: CaptureDate::year_month(found.date.year, found.date.month),
            source: DateSource::Metadata(found.source),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::pattern::{COMPACT_DEVICE_RULE, FULL_TIMESTAMP_RULE};
    use std::fs::File;
    use std::path::Path;
    use tempfile::tempdir;

    fn candidate(dir: &Path, name: &str) -> CandidateFile {
        let path = dir.join(name);
        File::create(&path).unwrap();
        CandidateFile {
            name: name.to_string(),
            path,
        }
    }

    fn resolver(metadata_fallback: bool) -> DateResolver {
        let mut config = OrganizerConfig::for_photos_root("/photos");
        config.metadata_fallback = metadata_fallback;
        DateResolver::new(&config).unwrap()
    }

    #[test]
    fn test_filename_rules() {
        let dir = tempdir().unwrap();
        let r = resolver(true);

        match r.resolve(&candidate(dir.path(), "20230615142230_image.jpg")).unwrap() {
            Resolution::Resolved { date, source } => {
                assert_eq!(date.month_dir(), "2023-06");
                assert_eq!(source, DateSource::Filename(FULL_TIMESTAMP_RULE));
            }
            Resolution::Unresolved => panic!("expected a date"),
        }

        match r.resolve(&candidate(dir.path(), "0626171644.jpg")).unwrap() {
            Resolution::Resolved { date, source } => {
                assert_eq!(date.month_dir(), "2017-06");
                assert_eq!(date.second, Some(0));
                assert_eq!(source, DateSource::Filename(COMPACT_DEVICE_RULE));
            }
            Resolution::Unresolved => panic!("expected a date"),
        }
    }

    #[test]
    fn test_vendor_prefix_uses_metadata() {
        let dir = tempdir().unwrap();
        let file = candidate(dir.path(), "Snapchat-20000101000000.jpg");
        match resolver(false).resolve(&file).unwrap() {
            Resolution::Resolved { source, .. } => {
                assert!(matches!(source, DateSource::Metadata(_)));
            }
            Resolution::Unresolved => panic!("vendor files always resolve from metadata"),
        }
    }

    #[test]
    fn test_unmatched_strict_is_unresolved() {
        let dir = tempdir().unwrap();
        let file = candidate(dir.path(), "random_export.png");
        assert_eq!(resolver(false).resolve(&file).unwrap(), Resolution::Unresolved);
    }

    #[test]
    fn test_unmatched_falls_back_to_metadata() {
        let dir = tempdir().unwrap();
        let file = candidate(dir.path(), "random_export.png");
        match resolver(true).resolve(&file).unwrap() {
            Resolution::Resolved { date, source } => {
                assert!(matches!(source, DateSource::Metadata(_)));
                assert!(date.day.is_none());
            }
            Resolution::Unresolved => panic!("fallback should resolve"),
        }
    }

    #[test]
    fn test_unreadable_file_fails() {
        let dir = tempdir().unwrap();
        let file = CandidateFile {
            name: "random_export.png".to_string(),
            path: dir.path().join("random_export.png"),
        };
        assert!(matches!(
            resolver(true).resolve(&file),
            Err(Error::FileAccess { .. })
        ));
    }
}
