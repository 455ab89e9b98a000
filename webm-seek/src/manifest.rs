use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Inclusive byte interval. `end == u64::MAX` reads to the end of the resource.
///
/// Ranges built with [`ByteRange::new`] are never inverted. Cue ranges derived
/// from a container may be (two cues pointing at the same cluster), so range
/// sources call [`ByteRange::validate`] before reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ByteRange {
    start: u64,
    end: u64,
}

impl ByteRange {
    pub fn new(start: u64, end: u64) -> Result<Self> {
        if start > end {
            return Err(Error::RangeError { start, end });
        }

        Ok(ByteRange { start, end })
    }

    pub fn open_ended(start: u64) -> Self {
        ByteRange {
            start,
            end: u64::MAX,
        }
    }

    /// Range taken as-is from container offsets. It may be inverted, which
    /// [`RangeSource`](crate::RangeSource) implementations reject through
    /// [`validate`](Self::validate).
    pub fn inclusive_unchecked(start: u64, end: u64) -> Self {
        ByteRange { start, end }
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn end(&self) -> u64 {
        self.end
    }

    pub fn is_open_ended(&self) -> bool {
        self.end == u64::MAX
    }

    pub fn validate(&self) -> Result<()> {
        if self.start > self.end {
            return Err(Error::RangeError {
                start: self.start,
                end: self.end,
            });
        }

        Ok(())
    }

    /// Number of bytes covered, `None` when open ended or inverted.
    pub fn len(&self) -> Option<u64> {
        if self.is_open_ended() || self.start > self.end {
            return None;
        }

        Some(self.end - self.start + 1)
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_open_ended() {
            write!(f, "{}-", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

/// Parses `"start-end"` or `"start-"`.
impl FromStr for ByteRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (start, end) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| Error::parse(format!("invalid range '{}'", s)))?;
        let start = start
            .parse::<u64>()
            .map_err(|e| Error::parse(format!("invalid range start '{}': {}", s, e)))?;
        if end.is_empty() {
            return Ok(ByteRange::open_ended(start));
        }

        let end = end
            .parse::<u64>()
            .map_err(|e| Error::parse(format!("invalid range end '{}': {}", s, e)))?;
        ByteRange::new(start, end)
    }
}

/// Byte span of the EBML header plus segment metadata, up to the first cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InitSegment {
    pub offset: u64,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cluster {
    pub range: ByteRange,
    /// Seconds.
    pub timecode: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cue {
    /// Seconds.
    pub timecode: f64,
    pub track: u64,
    pub range: ByteRange,
}

/// Seekable summary of a WebM container.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Manifest {
    /// MIME type with codecs, e.g. `video/webm;codecs="vp8,vorbis"`.
    pub content_type: String,
    /// Seconds, absent for live recordings.
    pub duration: Option<f64>,
    /// Nanoseconds per raw timecode unit.
    pub timecode_scale: u64,
    pub start_date: Option<DateTime<Utc>>,
    pub init: Option<InitSegment>,
    pub clusters: Vec<Cluster>,
    pub cues: Vec<Cue>,
}

impl Manifest {
    pub fn cue(&self, idx: usize) -> Option<&Cue> {
        self.cues.get(idx)
    }

    pub fn is_seekable(&self) -> bool {
        !self.cues.is_empty()
    }
}
