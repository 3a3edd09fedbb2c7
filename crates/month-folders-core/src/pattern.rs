use std::fmt;

use regex::{Captures, Regex};

use crate::error::Result;

/// Capture date pulled from a filename or from file metadata.
///
/// Only year and month decide placement; the finer fields are kept for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureDate {
    pub year: u16,
    pub month: u8,
    pub day: Option<u8>,
    pub hour: Option<u8>,
    pub minute: Option<u8>,
    pub second: Option<u8>,
}

impl CaptureDate {
    pub fn year_month(year: u16, month: u8) -> Self {
        Self {
            year,
            month,
            day: None,
            hour: None,
            minute: None,
            second: None,
        }
    }

    /// `YYYY`
    pub fn year_dir(&self) -> String {
        format!("{:04}", self.year)
    }

    /// `YYYY-MM`
    pub fn month_dir(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }
}

impl fmt::Display for CaptureDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.month_dir())?;
        if let Some(day) = self.day {
            write!(f, "-{:02}", day)?;
        }
        if let (Some(h), Some(m)) = (self.hour, self.minute) {
            write!(f, " {:02}:{:02}:{:02}", h, m, self.second.unwrap_or(0))?;
        }
        Ok(())
    }
}

/// Capture-group index for each date field of an extracting rule.
#[derive(Debug, Clone)]
struct FieldMap {
    year: usize,
    month: usize,
    day: usize,
    hour: usize,
    minute: usize,
    /// `None` when the naming convention has no seconds; they default to 0.
    second: Option<usize>,
    /// Prepended to the captured year digits (two-digit years).
    year_prefix: &'static str,
}

#[derive(Debug, Clone)]
enum RuleKind {
    /// Names starting with `prefix` carry no usable date; resolve from metadata.
    DeferToMetadata { prefix: String },
    Extract { regex: Regex, fields: FieldMap },
}

#[derive(Debug, Clone)]
struct MatchRule {
    name: &'static str,
    kind: RuleKind,
}

/// What the winning rule decided about a filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Date(CaptureDate),
    UseMetadata,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleMatch {
    pub rule: &'static str,
    pub verdict: Verdict,
}

pub const VENDOR_PREFIX_RULE: &str = "vendor-prefix";
pub const FULL_TIMESTAMP_RULE: &str = "full-timestamp";
pub const COMPACT_DEVICE_RULE: &str = "compact-device";

/// Ordered filename rules. The first rule that matches decides.
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    rules: Vec<MatchRule>,
}

impl PatternMatcher {
    pub fn new<E, P>(extensions: &[E], vendor_prefixes: &[P]) -> Result<Self>
    where
        E: AsRef<str>,
        P: AsRef<str>,
    {
        let ext = extension_alternation(extensions);

        let mut rules: Vec<MatchRule> = vendor_prefixes
            .iter()
            .map(|p| p.as_ref())
            .filter(|p| !p.is_empty())
            .map(|prefix| MatchRule {
                name: VENDOR_PREFIX_RULE,
                kind: RuleKind::DeferToMetadata {
                    prefix: prefix.to_string(),
                },
            })
            .collect();

        // YYYY MM DD hh mm ss, each separator optional and independent
        let full = format!(
            r"(20[012][0-9])[. _\-]?(0[1-9]|1[0-2])[. _\-]?([0-2][0-9]|3[01])[. _\-]?([01][0-9]|2[0-3])[. _\-]?([0-5][0-9])[. _\-]?([0-5][0-9]).*?\.({ext})$"
        );
        rules.push(MatchRule {
            name: FULL_TIMESTAMP_RULE,
            kind: RuleKind::Extract {
                regex: Regex::new(&full)?,
                fields: FieldMap {
                    year: 1,
                    month: 2,
                    day: 3,
                    hour: 4,
                    minute: 5,
                    second: Some(6),
                    year_prefix: "",
                },
            },
        });

        // MM DD YY hh mm, e.g. 0626171644.jpg
        let compact = format!(
            r"(0[1-9]|1[0-2])([0-2][0-9]|3[01])([12][0-9])([01][0-9]|2[0-3])([0-5][0-9]).*?\.({ext})$"
        );
        rules.push(MatchRule {
            name: COMPACT_DEVICE_RULE,
            kind: RuleKind::Extract {
                regex: Regex::new(&compact)?,
                fields: FieldMap {
                    year: 3,
                    month: 1,
                    day: 2,
                    hour: 4,
                    minute: 5,
                    second: None,
                    year_prefix: "20",
                },
            },
        });

        Ok(Self { rules })
    }

    /// Rule names in priority order.
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name).collect()
    }

    pub fn classify(&self, filename: &str) -> Option<RuleMatch> {
        for rule in &self.rules {
            match &rule.kind {
                RuleKind::DeferToMetadata { prefix } => {
                    if filename.starts_with(prefix.as_str()) {
                        return Some(RuleMatch {
                            rule: rule.name,
                            verdict: Verdict::UseMetadata,
                        });
                    }
                }
                RuleKind::Extract { regex, fields } => {
                    if let Some(caps) = regex.captures(filename) {
                        if let Some(date) = extract(&caps, fields) {
                            return Some(RuleMatch {
                                rule: rule.name,
                                verdict: Verdict::Date(date),
                            });
                        }
                    }
                }
            }
        }
        None
    }

    /// Filename-derived date only; vendor-prefixed names yield `None`.
    pub fn match_date(&self, filename: &str) -> Option<CaptureDate> {
        match self.classify(filename)?.verdict {
            Verdict::Date(date) => Some(date),
            Verdict::UseMetadata => None,
        }
    }
}

fn extension_alternation<E: AsRef<str>>(extensions: &[E]) -> String {
    let alternatives: Vec<String> = extensions
        .iter()
        .map(|e| e.as_ref().trim().trim_start_matches('.'))
        .filter(|e| !e.is_empty())
        .map(regex::escape)
        .collect();
    format!("(?i:{})", alternatives.join("|"))
}

fn extract(caps: &Captures<'_>, fields: &FieldMap) -> Option<CaptureDate> {
    let group = |i: usize| caps.get(i).map(|m| m.as_str());
    let number = |i: usize| group(i).and_then(|s| s.parse::<u8>().ok());

    let year = format!("{}{}", fields.year_prefix, group(fields.year)?)
        .parse::<u16>()
        .ok()?;

    Some(CaptureDate {
        year,
        month: number(fields.month)?,
        day: Some(number(fields.day)?),
        hour: Some(number(fields.hour)?),
        minute: Some(number(fields.minute)?),
        second: Some(match fields.second {
            Some(i) => number(i)?,
            None => 0,
        }),
    })
}
