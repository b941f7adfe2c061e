use anyhow::{Result, anyhow};
use chrono::{Datelike, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const MARKER_PREFIX: &str = "source-";
/// Marker prefix of summary pages written by the earlier scripts.
pub const LEGACY_MARKER_PREFIX: &str = "flickr-";
const PHOTO_URL_BASE: &str = "https://flickr.com/photos";

/// A `YYYY-MM-DD HH:MM:SS` wall-clock timestamp. No timezone is attached;
/// both the remote side and file mtimes are read in the local clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TakenAt(NaiveDateTime);

impl TakenAt {
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        // chrono accepts unpadded fields, the cache format does not.
        let shape_ok = trimmed.len() == 19
            && trimmed.bytes().enumerate().all(|(i, b)| match i {
                4 | 7 => b == b'-',
                10 => b == b' ',
                13 | 16 => b == b':',
                _ => b.is_ascii_digit(),
            });
        if !shape_ok {
            return Err(anyhow!(
                "invalid timestamp `{raw}`: expected YYYY-MM-DD HH:MM:SS"
            ));
        }
        let parsed = NaiveDateTime::parse_from_str(trimmed, TIMESTAMP_FORMAT)
            .map_err(|err| anyhow!("invalid timestamp `{raw}`: {err}"))?;
        Ok(Self(parsed))
    }

    pub fn from_naive(value: NaiveDateTime) -> Self {
        Self(value)
    }

    pub fn year_month(&self) -> YearMonth {
        YearMonth {
            year: self.0.year(),
            month: self.0.month(),
        }
    }

    pub fn day(&self) -> u32 {
        self.0.day()
    }

    pub fn abs_delta_secs(&self, other: &TakenAt) -> i64 {
        (self.0 - other.0).num_seconds().abs()
    }
}

impl fmt::Display for TakenAt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(TIMESTAMP_FORMAT))
    }
}

impl FromStr for TakenAt {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for TakenAt {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TakenAt {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        TakenAt::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(anyhow!("invalid month {month}: expected 1..=12"));
        }
        if !(0..=9999).contains(&year) {
            return Err(anyhow!("invalid year {year}: expected four digits"));
        }
        Ok(Self { year, month })
    }

    pub fn succ(self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// Every month from `start` to `end`, both inclusive. Empty when `start > end`.
    pub fn range_inclusive(start: YearMonth, end: YearMonth) -> Vec<YearMonth> {
        let mut out = Vec::new();
        let mut cursor = start;
        while cursor <= end {
            out.push(cursor);
            cursor = cursor.succ();
        }
        out
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let Some((year, month)) = trimmed.split_once('-') else {
            return Err(anyhow!("invalid year-month `{s}`: expected YYYY-MM"));
        };
        if year.len() != 4 || month.len() != 2 {
            return Err(anyhow!("invalid year-month `{s}`: expected YYYY-MM"));
        }
        let year = year
            .parse::<i32>()
            .map_err(|_| anyhow!("invalid year in `{s}`"))?;
        let month = month
            .parse::<u32>()
            .map_err(|_| anyhow!("invalid month in `{s}`"))?;
        YearMonth::new(year, month)
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for YearMonth {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// One harvested photo as stored in a `tags` cache page.
///
/// Aliases accept summary pages written by the earlier scripts
/// (`user_id`, `taken`, `photo_url`, no `id`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    #[serde(default)]
    pub id: String,
    #[serde(alias = "user_id")]
    pub owner: String,
    pub title: String,
    #[serde(alias = "taken")]
    pub taken_at: TakenAt,
    pub keywords: Vec<String>,
    #[serde(alias = "photo_url")]
    pub url: String,
}

impl Record {
    /// Keywords the owner actually tagged, marker excluded.
    pub fn user_keywords(&self) -> impl Iterator<Item = &str> {
        self.keywords
            .iter()
            .map(String::as_str)
            .filter(|k| !is_owner_marker(k, &self.owner))
    }

    /// `<url> - <taken_at> - <title> - <sorted,keywords>`
    pub fn display_line(&self) -> String {
        let mut sorted = self.keywords.clone();
        sorted.sort();
        format!(
            "{} - {} - {} - {}",
            self.url,
            self.taken_at,
            self.title,
            sorted.join(",")
        )
    }
}

pub fn photo_url(owner: &str, id: &str) -> String {
    format!("{PHOTO_URL_BASE}/{owner}/{id}")
}

pub fn normalize_text(raw: &str) -> String {
    raw.trim().to_lowercase()
}

pub fn owner_marker(owner: &str) -> String {
    format!("{MARKER_PREFIX}{}", normalize_text(owner))
}

/// `source-<owner>` or the legacy `flickr-<owner>`, compared case-insensitively.
/// Other keywords that merely share a prefix are ordinary tags.
pub fn is_owner_marker(keyword: &str, owner: &str) -> bool {
    let keyword = normalize_text(keyword);
    let owner = normalize_text(owner);
    [MARKER_PREFIX, LEGACY_MARKER_PREFIX]
        .iter()
        .any(|prefix| keyword.strip_prefix(prefix) == Some(owner.as_str()))
}

/// Lowercase, trim, drop empties and repeats (first occurrence wins), then
/// append the owner marker when requested.
pub fn normalize_keywords<I, S>(raw: I, owner: &str, append_marker: bool) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for item in raw {
        let keyword = normalize_text(item.as_ref());
        if keyword.is_empty() || out.contains(&keyword) {
            continue;
        }
        out.push(keyword);
    }
    if append_marker {
        let marker = owner_marker(owner);
        out.retain(|k| *k != marker);
        out.push(marker);
    }
    out
}
