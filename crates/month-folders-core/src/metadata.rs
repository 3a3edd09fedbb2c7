use std::fs;
use std::path::Path;
use std::process::Command;
use std::time::SystemTime;

use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveDateTime, Timelike};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::pattern::CaptureDate;

/// Which filesystem timestamp wins when creation and modification time disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimestampPolicy {
    /// Modification time only.
    Modified,
    /// Whichever of creation and modification time is earlier.
    #[default]
    Earliest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataSource {
    Embedded,
    Modified,
    Created,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetadataDate {
    pub date: CaptureDate,
    pub source: MetadataSource,
}

/// Source of a capture date stored inside the file itself (EXIF, container tags).
///
/// Returns an ISO-8601 style string, or `None` when nothing is available.
pub trait EmbeddedDateSource: Send + Sync {
    fn capture_date(&self, path: &Path) -> Option<String>;
}

/// Embedded metadata is not read.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEmbeddedMetadata;

impl EmbeddedDateSource for NoEmbeddedMetadata {
    fn capture_date(&self, _path: &Path) -> Option<String> {
        None
    }
}

/// Asks the `mediainfo` command line tool for the encoded/tagged date.
#[derive(Debug, Clone)]
pub struct MediaInfo {
    program: String,
}

impl Default for MediaInfo {
    fn default() -> Self {
        Self {
            program: "mediainfo".to_string(),
        }
    }
}

#[derive(Deserialize)]
struct MediaInfoOutput {
    media: Option<MediaInfoMedia>,
}

#[derive(Deserialize)]
struct MediaInfoMedia {
    #[serde(default)]
    track: Vec<MediaInfoTrack>,
}

#[derive(Deserialize)]
struct MediaInfoTrack {
    #[serde(rename = "Encoded_Date")]
    encoded_date: Option<String>,
    #[serde(rename = "Tagged_Date")]
    tagged_date: Option<String>,
}

impl MediaInfo {
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl EmbeddedDateSource for MediaInfo {
    fn capture_date(&self, path: &Path) -> Option<String> {
        let output = match Command::new(&self.program)
            .arg(path)
            .arg("--output=JSON")
            .output()
        {
            Ok(o) if o.status.success() => o,
            Ok(o) => {
                debug!("{} exited with {} for {}", self.program, o.status, path.display());
                return None;
            }
            Err(e) => {
                debug!("'{}' command not available: {}", self.program, e);
                return None;
            }
        };
        date_from_mediainfo_json(&output.stdout)
    }
}

fn date_from_mediainfo_json(json: &[u8]) -> Option<String> {
    let parsed: MediaInfoOutput = match serde_json::from_slice(json) {
        Ok(p) => p,
        Err(e) => {
            debug!("Unreadable mediainfo output: {}", e);
            return None;
        }
    };
    parsed
        .media?
        .track
        .into_iter()
        .find_map(|t| t.encoded_date.or(t.tagged_date))
}

/// Parse the date strings produced by embedded metadata sources.
pub fn parse_embedded_date(s: &str) -> Option<NaiveDateTime> {
    let cleaned = s.trim().trim_start_matches("UTC").trim_end_matches("UTC").trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(cleaned) {
        return Some(dt.naive_local());
    }

    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y:%m:%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(cleaned, format) {
            return Some(dt);
        }
    }

    NaiveDate::parse_from_str(cleaned.split([' ', 'T']).next()?, "%Y-%m-%d")
        .ok()?
        .and_hms_opt(0, 0, 0)
}

/// Derives a year/month from file metadata when the filename gives nothing.
pub struct MetadataResolver {
    policy: TimestampPolicy,
    embedded: Box<dyn EmbeddedDateSource>,
}

impl MetadataResolver {
    pub fn new(policy: TimestampPolicy) -> Self {
        Self {
            policy,
            embedded: Box::new(NoEmbeddedMetadata),
        }
    }

    pub fn with_embedded_source(mut self, source: Box<dyn EmbeddedDateSource>) -> Self {
        self.embedded = source;
        self
    }

    pub fn resolve(&self, path: &Path) -> Result<MetadataDate> {
        if let Some(raw) = self.embedded.capture_date(path) {
            match parse_embedded_date(&raw) {
                Some(dt) => {
                    debug!("Embedded metadata; using date: {}", raw);
                    return Ok(MetadataDate {
                        date: capture_date_of(&dt),
                        source: MetadataSource::Embedded,
                    });
                }
                None => debug!("Ignoring unparseable embedded date {:?}", raw),
            }
        }

        let access = |source| Error::FileAccess {
            path: path.to_path_buf(),
            source,
        };
        let meta = fs::metadata(path).map_err(access)?;
        let modified = meta.modified().map_err(access)?;

        let (time, source) = pick_timestamp(self.policy, modified, meta.created().ok());

        let local = local_time(time);
        debug!("Using {:?} time {} for {}", source, local.format("%Y-%m-%d %H:%M:%S"), path.display());

        Ok(MetadataDate {
            date: capture_date_of(&local.naive_local()),
            source,
        })
    }
}

/// Creation time only wins under `Earliest` and only when strictly older.
fn pick_timestamp(
    policy: TimestampPolicy,
    modified: SystemTime,
    created: Option<SystemTime>,
) -> (SystemTime, MetadataSource) {
    match (policy, created) {
        (TimestampPolicy::Earliest, Some(created)) if created < modified => {
            (created, MetadataSource::Created)
        }
        _ => (modified, MetadataSource::Modified),
    }
}

fn local_time(time: SystemTime) -> DateTime<Local> {
    DateTime::<Local>::from(time)
}

fn capture_date_of(dt: &NaiveDateTime) -> CaptureDate {
    CaptureDate {
        year: dt.year() as u16,
        month: dt.month() as u8,
        day: Some(dt.day() as u8),
        hour: Some(dt.hour() as u8),
        minute: Some(dt.minute() as u8),
        second: Some(dt.second() as u8),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use filetime::FileTime;
    use std::fs::File;
    use tempfile::tempdir;

    struct Fixed(&'static str);

    impl EmbeddedDateSource for Fixed {
        fn capture_date(&self, _path: &Path) -> Option<String> {
            Some(self.0.to_string())
        }
    }

    fn set_mtime(path: &Path, year: i32, month: u32, day: u32) {
        let local = Local.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap();
        filetime::set_file_mtime(path, FileTime::from_unix_time(local.timestamp(), 0)).unwrap();
    }

    #[test]
    fn test_parse_embedded_date() {
        let expected = NaiveDate::from_ymd_opt(2017, 6, 26).unwrap().and_hms_opt(16, 44, 0).unwrap();
        assert_eq!(parse_embedded_date("UTC 2017-06-26 16:44:00"), Some(expected));
        assert_eq!(parse_embedded_date("2017-06-26 16:44:00 UTC"), Some(expected));
        assert_eq!(parse_embedded_date("2017-06-26T16:44:00"), Some(expected));
        assert_eq!(parse_embedded_date("2017-06-26T16:44:00+02:00"), Some(expected));
        assert_eq!(parse_embedded_date("2017:06:26 16:44:00"), Some(expected));
        assert_eq!(
            parse_embedded_date("2017-06-26"),
            NaiveDate::from_ymd_opt(2017, 6, 26).unwrap().and_hms_opt(0, 0, 0)
        );
        assert!(parse_embedded_date("not a date").is_none());
    }

    #[test]
    fn test_mediainfo_json() {
        let json = br#"{"media":{"track":[{"@type":"General","Tagged_Date":"UTC 2019-01-02 03:04:05"},{"@type":"Video","Encoded_Date":"UTC 2019-01-02 03:04:06"}]}}"#;
        assert_eq!(date_from_mediainfo_json(json).as_deref(), Some("UTC 2019-01-02 03:04:05"));
        assert!(date_from_mediainfo_json(br#"{"media":{"track":[{"@type":"General"}]}}"#).is_none());
        assert!(date_from_mediainfo_json(b"garbage").is_none());
    }

    #[test]
    fn test_missing_mediainfo_binary() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        File::create(&path).unwrap();
        let source = MediaInfo::with_program("definitely-not-a-real-mediainfo-binary");
        assert!(source.capture_date(&path).is_none());
    }

    #[test]
    fn test_resolve_modified_time() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("random_export.png");
        File::create(&path).unwrap();
        set_mtime(&path, 2015, 3, 9);

        let resolved = MetadataResolver::new(TimestampPolicy::Modified).resolve(&path).unwrap();
        assert_eq!(resolved.source, MetadataSource::Modified);
        assert_eq!(resolved.date.month_dir(), "2015-03");
    }

    #[test]
    fn test_earliest_never_later_than_modified() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("random_export.png");
        File::create(&path).unwrap();
        set_mtime(&path, 2015, 3, 9);

        // Creation time is "now" on platforms that report it, so modified wins.
        let resolved = MetadataResolver::new(TimestampPolicy::Earliest).resolve(&path).unwrap();
        assert_eq!(resolved.date.month_dir(), "2015-03");
    }

    #[test]
    fn test_pick_timestamp() {
        use std::time::Duration;

        let modified = SystemTime::UNIX_EPOCH + Duration::from_secs(1_500_000_000);
        let older = modified - Duration::from_secs(86_400);
        let newer = modified + Duration::from_secs(86_400);

        assert_eq!(
            pick_timestamp(TimestampPolicy::Earliest, modified, Some(older)),
            (older, MetadataSource::Created)
        );
        assert_eq!(
            pick_timestamp(TimestampPolicy::Earliest, modified, Some(newer)),
            (modified, MetadataSource::Modified)
        );
        assert_eq!(
            pick_timestamp(TimestampPolicy::Earliest, modified, None),
            (modified, MetadataSource::Modified)
        );
        assert_eq!(
            pick_timestamp(TimestampPolicy::Modified, modified, Some(older)),
            (modified, MetadataSource::Modified)
        );
    }

    #[test]
    fn test_embedded_source_overrides_timestamps() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        File::create(&path).unwrap();
        set_mtime(&path, 2015, 3, 9);

        let resolver = MetadataResolver::new(TimestampPolicy::Modified)
            .with_embedded_source(Box::new(Fixed("UTC 2011-11-11 11:11:11")));
        let resolved = resolver.resolve(&path).unwrap();
        assert_eq!(resolved.source, MetadataSource::Embedded);
        assert_eq!(resolved.date.month_dir(), "2011-11");

        let resolver = MetadataResolver::new(TimestampPolicy::Modified)
            .with_embedded_source(Box::new(Fixed("unknown")));
        assert_eq!(resolver.resolve(&path).unwrap().source, MetadataSource::Modified);
    }

    #[test]
    fn test_missing_file_is_access_error() {
        let dir = tempdir().unwrap();
        let err = MetadataResolver::new(TimestampPolicy::Earliest)
            .resolve(&dir.path().join("gone.jpg"))
            .unwrap_err();
        assert!(matches!(err, Error::FileAccess { .. }));
    }
}
