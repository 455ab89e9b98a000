//! Incremental manifest construction from a [`TagEvent`] stream.
//!
//! All derived values live in an explicit [`ParseState`] threaded through
//! [`dispatch`]; the manifest only ever grows by appends. The builder finishes
//! on the first `Cues` or `Segment` end and ignores everything after it.

use crate::ebml::{Element, ElementKind, TagEvent};
use crate::error::{Error, Result};
use crate::manifest::{ByteRange, Cluster, Cue, InitSegment, Manifest};
use crate::scalar::{
    date_from_nanos, decode_date, decode_float, decode_signed, decode_text, decode_unsigned,
};
use tracing::debug;

/// Nanoseconds per timecode unit when the container does not say otherwise.
pub const DEFAULT_TIMECODE_SCALE: u64 = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Building,
    Finished,
    Failed,
}

enum Step {
    Continue,
    Finish,
}

#[derive(Debug, Default)]
struct ParseState {
    header_offset: Option<u64>,
    header_closed: bool,
    scale: Option<u64>,
    duration: Option<f64>,
    video_codec: Option<&'static str>,
    audio_codec: Option<&'static str>,
    seek_head_start: Option<u64>,
    segment_data_start: Option<u64>,
    segment_end: Option<u64>,
    cluster_start: Option<u64>,
    cluster_timecode: u64,
    cue: PendingCue,
    // Last cue seen; its end is only known once the next one arrives.
    prev_cue: Option<Cue>,
}

#[derive(Debug)]
struct PendingCue {
    track: u64,
    position: u64,
    time: u64,
}

impl Default for PendingCue {
    fn default() -> Self {
        PendingCue {
            track: 1,
            position: 0,
            time: 0,
        }
    }
}

impl ParseState {
    fn scale(&self) -> u64 {
        self.scale.unwrap_or(DEFAULT_TIMECODE_SCALE)
    }

    fn seconds(&self, raw: u64) -> f64 {
        raw as f64 * self.scale() as f64 / 1e9
    }

    /// Origin of cue cluster positions.
    fn segment_origin(&self) -> u64 {
        self.seek_head_start
            .or(self.segment_data_start)
            .unwrap_or(0)
    }

    fn segment_end(&self) -> u64 {
        self.segment_end.unwrap_or(u64::MAX)
    }
}

/// Consumes tag events one at a time and yields the [`Manifest`] exactly once.
#[derive(Debug)]
pub struct ManifestBuilder {
    state: ParseState,
    manifest: Manifest,
    phase: Phase,
}

impl Default for ManifestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ManifestBuilder {
    pub fn new() -> Self {
        ManifestBuilder {
            state: ParseState::default(),
            manifest: empty_manifest(),
            phase: Phase::Building,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    /// Applies one event. Returns the manifest on the event that completes
    /// the build, `None` before and after. A failed builder keeps failing.
    pub fn push(&mut self, event: &TagEvent) -> Result<Option<Manifest>> {
        match self.phase {
            Phase::Finished => return Ok(None),
            Phase::Failed => return Err(Error::parse("manifest build already failed")),
            Phase::Building => {}
        }

        match dispatch(&mut self.state, &mut self.manifest, event) {
            Ok(Step::Continue) => Ok(None),
            Ok(Step::Finish) => {
                self.phase = Phase::Finished;
                let state = std::mem::take(&mut self.state);
                let manifest = std::mem::replace(&mut self.manifest, empty_manifest());
                Ok(Some(finish(state, manifest)))
            }
            Err(e) => {
                self.phase = Phase::Failed;
                Err(e)
            }
        }
    }

    /// Pushes events until the build completes or the events run out.
    pub fn feed<I>(&mut self, events: I) -> Result<Option<Manifest>>
    where
        I: IntoIterator<Item = Result<TagEvent>>,
    {
        for event in events {
            let event = event.inspect_err(|_| self.phase = Phase::Failed)?;
            if let Some(manifest) = self.push(&event)? {
                return Ok(Some(manifest));
            }
        }

        Ok(None)
    }
}

fn empty_manifest() -> Manifest {
    Manifest {
        content_type: String::new(),
        duration: None,
        timecode_scale: DEFAULT_TIMECODE_SCALE,
        start_date: None,
        init: None,
        clusters: Vec::new(),
        cues: Vec::new(),
    }
}

fn finish(mut state: ParseState, mut manifest: Manifest) -> Manifest {
    if let Some(mut cue) = state.prev_cue.take() {
        cue.range = ByteRange::inclusive_unchecked(cue.range.start(), state.segment_end());
        manifest.cues.push(cue);
    }
    manifest.timecode_scale = state.scale();

    debug!(
        "manifest: {} clusters, {} cues, duration {:?}",
        manifest.clusters.len(),
        manifest.cues.len(),
        manifest.duration
    );
    manifest
}

fn dispatch(state: &mut ParseState, manifest: &mut Manifest, event: &TagEvent) -> Result<Step> {
    match event {
        TagEvent::Value(element, data) => {
            on_value(state, manifest, element, data)?;
            Ok(Step::Continue)
        }
        TagEvent::Start(element) => {
            expect_master(element)?;
            on_start(state, manifest, element)?;
            Ok(Step::Continue)
        }
        TagEvent::End(element) => {
            expect_master(element)?;
            Ok(on_end(state, manifest, element))
        }
    }
}

fn expect_master(element: &Element) -> Result<()> {
    if !element.kind.is_master() {
        return Err(Error::parse(format!(
            "unexpected element type {:?} for container boundary {}",
            element.kind, element.name
        )));
    }

    Ok(())
}

fn on_value(
    state: &mut ParseState,
    manifest: &mut Manifest,
    element: &Element,
    data: &[u8],
) -> Result<()> {
    match element.kind {
        ElementKind::Binary => {}
        ElementKind::Unsigned => on_unsigned(state, manifest, element.name, decode_unsigned(data)?)?,
        ElementKind::Signed => {
            let value = decode_signed(data)?;
            if element.name == "DateUTC" {
                manifest.start_date = Some(date_from_nanos(value)?);
            }
        }
        ElementKind::Date => {
            let date = decode_date(data)?;
            if element.name == "DateUTC" {
                manifest.start_date = Some(date);
            }
        }
        ElementKind::Float => {
            let value = decode_float(data)?;
            if element.name == "Duration" {
                state.duration = Some(value);
            }
        }
        ElementKind::String | ElementKind::Utf8 => {
            if element.name == "CodecID" {
                on_codec(state, &decode_text(data));
            }
        }
        ElementKind::Master => {
            return Err(Error::parse(format!(
                "unexpected element type {:?} for value {}",
                element.kind, element.name
            )));
        }
    }

    Ok(())
}

fn on_unsigned(
    state: &mut ParseState,
    manifest: &mut Manifest,
    name: &str,
    value: u64,
) -> Result<()> {
    match name {
        "TimecodeScale" => state.scale = Some(value),
        "Timecode" => state.cluster_timecode = value,
        "DateUTC" => {
            let nanos = i64::try_from(value)
                .map_err(|_| Error::parse(format!("DateUTC out of range ({})", value)))?;
            manifest.start_date = Some(date_from_nanos(nanos)?);
        }
        "CueTrack" => state.cue.track = value,
        "CueClusterPosition" => state.cue.position = value + state.segment_origin(),
        "CueTime" => state.cue.time = value,
        _ => {}
    }

    Ok(())
}

fn on_codec(state: &mut ParseState, codec_id: &str) {
    match codec_id.trim_end_matches('\0') {
        "V_VP8" => state.video_codec = Some("vp8"),
        "V_VP9" => state.video_codec = Some("vp9"),
        "A_VORBIS" => state.audio_codec = Some("vorbis"),
        "A_OPUS" => state.audio_codec = Some("opus"),
        _ => {}
    }
}

fn on_start(state: &mut ParseState, manifest: &mut Manifest, element: &Element) -> Result<()> {
    match element.name {
        "EBML" => {
            if state.header_closed {
                return Err(Error::parse(format!(
                    "invalid second header at {}",
                    element.start
                )));
            }
            state.header_offset = Some(element.start);
            state.video_codec = None;
            state.audio_codec = None;
        }
        "Cluster" => {
            if manifest.init.is_none() {
                if let Some(offset) = state.header_offset {
                    manifest.init = Some(InitSegment {
                        offset,
                        size: element.start.saturating_sub(offset),
                    });
                }
            }
            state.cluster_start = Some(element.start);
            state.cluster_timecode = 0;
        }
        "SeekHead" => state.seek_head_start = Some(element.start),
        "Segment" => {
            state.segment_data_start = Some(element.data_start);
            state.segment_end = element.end;
        }
        "CuePoint" => state.cue = PendingCue::default(),
        _ => {}
    }

    Ok(())
}

fn on_end(state: &mut ParseState, manifest: &mut Manifest, element: &Element) -> Step {
    match element.name {
        "EBML" => state.header_closed = true,
        "Info" => {
            let scale = *state.scale.get_or_insert(DEFAULT_TIMECODE_SCALE);
            manifest.timecode_scale = scale;
            if let Some(duration) = state.duration {
                manifest.duration = Some(duration * scale as f64 / 1e9);
            }
        }
        "Tracks" => {
            manifest.content_type = content_type(state.video_codec, state.audio_codec);
        }
        "Cluster" => {
            if let Some(start) = state.cluster_start.take() {
                manifest.clusters.push(Cluster {
                    range: ByteRange::inclusive_unchecked(
                        start,
                        element.end.unwrap_or(u64::MAX),
                    ),
                    timecode: state.seconds(state.cluster_timecode),
                });
            }
        }
        "CuePoint" => {
            let position = state.cue.position;
            let cue = Cue {
                timecode: state.seconds(state.cue.time),
                track: state.cue.track,
                range: ByteRange::inclusive_unchecked(position, state.segment_end()),
            };
            // Cues sharing a cluster, or listed out of order, leave an
            // inverted range that range sources reject.
            if let Some(mut prev) = state.prev_cue.replace(cue) {
                prev.range =
                    ByteRange::inclusive_unchecked(prev.range.start(), position.saturating_sub(1));
                manifest.cues.push(prev);
            }
        }
        "Cues" | "Segment" => return Step::Finish,
        _ => {}
    }

    Step::Continue
}

fn content_type(video: Option<&str>, audio: Option<&str>) -> String {
    match (video, audio) {
        (Some(v), Some(a)) => format!("video/webm;codecs=\"{},{}\"", v, a),
        (Some(v), None) => format!("video/webm;codecs={}", v),
        (None, Some(a)) => format!("audio/webm;codecs={}", a),
        (None, None) => String::new(),
    }
}
