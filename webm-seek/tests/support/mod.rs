#![allow(dead_code)]

//! Synthetic WebM files for tests and benches.
//!
//! Every element size is written as an 8-byte vint and every unsigned value
//! as 8 bytes, so the layout does not depend on the values and offsets can be
//! computed before the cues are written.

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::atomic::{AtomicUsize, Ordering};
use webm_seek::{ByteRange, MemorySource, RangeSource, Result};

pub const EBML: u32 = 0x1A45DFA3;
pub const DOC_TYPE: u32 = 0x4282;
pub const SEGMENT: u32 = 0x18538067;
pub const SEEK_HEAD: u32 = 0x114D9B74;
pub const SEEK: u32 = 0x4DBB;
pub const SEEK_ID: u32 = 0x53AB;
pub const SEEK_POSITION: u32 = 0x53AC;
pub const INFO: u32 = 0x1549A966;
pub const TIMECODE_SCALE: u32 = 0x2AD7B1;
pub const DURATION: u32 = 0x4489;
pub const TRACKS: u32 = 0x1654AE6B;
pub const TRACK_ENTRY: u32 = 0xAE;
pub const TRACK_NUMBER: u32 = 0xD7;
pub const CODEC_ID: u32 = 0x86;
pub const CLUSTER: u32 = 0x1F43B675;
pub const TIMECODE: u32 = 0xE7;
pub const SIMPLE_BLOCK: u32 = 0xA3;
pub const CUES: u32 = 0x1C53BB6B;
pub const CUE_POINT: u32 = 0xBB;
pub const CUE_TIME: u32 = 0xB3;
pub const CUE_TRACK_POSITIONS: u32 = 0xB7;
pub const CUE_TRACK: u32 = 0xF7;
pub const CUE_CLUSTER_POSITION: u32 = 0xF1;

const UNKNOWN_SIZE: [u8; 8] = [0x01, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff];

pub fn id_bytes(id: u32) -> Vec<u8> {
    let bytes = id.to_be_bytes();
    let skip = bytes.iter().take_while(|b| **b == 0).count();
    bytes[skip..].to_vec()
}

pub fn element(id: u32, payload: &[u8]) -> Vec<u8> {
    let mut size = (payload.len() as u64).to_be_bytes();
    size[0] = 0x01;

    let mut out = id_bytes(id);
    out.extend_from_slice(&size);
    out.extend_from_slice(payload);
    out
}

pub fn master(id: u32, children: &[Vec<u8>]) -> Vec<u8> {
    element(id, &children.concat())
}

pub fn master_unknown(id: u32, children: &[Vec<u8>]) -> Vec<u8> {
    let mut out = id_bytes(id);
    out.extend_from_slice(&UNKNOWN_SIZE);
    out.extend_from_slice(&children.concat());
    out
}

pub fn uint(id: u32, value: u64) -> Vec<u8> {
    element(id, &value.to_be_bytes())
}

pub fn float(id: u32, value: f64) -> Vec<u8> {
    element(id, &value.to_be_bytes())
}

pub fn string(id: u32, value: &str) -> Vec<u8> {
    element(id, value.as_bytes())
}

/// A generated file plus the byte layout the manifest should report.
#[derive(Debug, Clone)]
pub struct Webm {
    pub bytes: Bytes,
    /// EBML header through `Tracks`, up to the first cluster.
    pub init: ByteRange,
    /// The `Cues` element.
    pub index: ByteRange,
    pub clusters: Vec<ByteRange>,
    pub seek_head: u64,
}

impl Webm {
    pub fn slice(&self, range: ByteRange) -> &[u8] {
        let end = range.end().min(self.bytes.len() as u64 - 1);
        &self.bytes[range.start() as usize..=end as usize]
    }
}

#[derive(Debug, Clone)]
pub struct WebmWriter {
    codecs: Vec<&'static str>,
    cluster_times: Vec<u64>,
    duration: f64,
    timecode_scale: u64,
    block_size: usize,
    unknown_sizes: bool,
}

impl Default for WebmWriter {
    fn default() -> Self {
        WebmWriter {
            codecs: vec!["V_VP8", "A_VORBIS"],
            cluster_times: vec![0, 2000, 4000, 6000],
            duration: 8000.0,
            timecode_scale: 1_000_000,
            block_size: 64,
            unknown_sizes: false,
        }
    }
}

impl WebmWriter {
    pub fn codecs(mut self, codecs: &[&'static str]) -> Self {
        self.codecs = codecs.to_vec();
        self
    }

    /// Raw cluster timecodes, one cluster and one cue point each.
    pub fn clusters(mut self, times: &[u64]) -> Self {
        self.cluster_times = times.to_vec();
        self
    }

    /// Raw duration in timecode units.
    pub fn duration(mut self, duration: f64) -> Self {
        self.duration = duration;
        self
    }

    pub fn timecode_scale(mut self, scale: u64) -> Self {
        self.timecode_scale = scale;
        self
    }

    pub fn block_size(mut self, size: usize) -> Self {
        self.block_size = size;
        self
    }

    /// Segment and clusters written with unknown sizes, as live muxers do.
    pub fn unknown_sizes(mut self) -> Self {
        self.unknown_sizes = true;
        self
    }

    pub fn build(&self) -> Webm {
        let header = master(EBML, &[string(DOC_TYPE, "webm")]);
        let info = master(
            INFO,
            &[
                uint(TIMECODE_SCALE, self.timecode_scale),
                float(DURATION, self.duration),
            ],
        );
        let entries: Vec<Vec<u8>> = self
            .codecs
            .iter()
            .enumerate()
            .map(|(i, codec)| {
                master(
                    TRACK_ENTRY,
                    &[uint(TRACK_NUMBER, i as u64 + 1), string(CODEC_ID, codec)],
                )
            })
            .collect();
        let tracks = master(TRACKS, &entries);

        let clusters: Vec<Vec<u8>> = self
            .cluster_times
            .iter()
            .enumerate()
            .map(|(i, time)| {
                let children = [
                    uint(TIMECODE, *time),
                    element(SIMPLE_BLOCK, &vec![i as u8; self.block_size]),
                ];
                if self.unknown_sizes {
                    master_unknown(CLUSTER, &children)
                } else {
                    master(CLUSTER, &children)
                }
            })
            .collect();

        // Segment id plus an 8-byte size.
        let segment_data = (header.len() + 12) as u64;
        let seek_head_start = segment_data;
        let seek_head_len = seek_head(0).len() as u64;
        let first_cluster = seek_head_start + seek_head_len + (info.len() + tracks.len()) as u64;

        let mut cluster_ranges = Vec::with_capacity(clusters.len());
        let mut offset = first_cluster;
        for cluster in &clusters {
            let len = cluster.len() as u64;
            cluster_ranges.push(ByteRange::new(offset, offset + len - 1).unwrap());
            offset += len;
        }

        let cues_start = offset;
        let points: Vec<Vec<u8>> = self
            .cluster_times
            .iter()
            .zip(&cluster_ranges)
            .map(|(time, range)| {
                master(
                    CUE_POINT,
                    &[
                        uint(CUE_TIME, *time),
                        master(
                            CUE_TRACK_POSITIONS,
                            &[
                                uint(CUE_TRACK, 1),
                                uint(CUE_CLUSTER_POSITION, range.start() - seek_head_start),
                            ],
                        ),
                    ],
                )
            })
            .collect();
        let cues = master(CUES, &points);

        let mut children = vec![seek_head(cues_start - seek_head_start), info, tracks];
        children.extend(clusters);
        children.push(cues);
        let segment = if self.unknown_sizes {
            master_unknown(SEGMENT, &children)
        } else {
            master(SEGMENT, &children)
        };

        let mut bytes = header;
        bytes.extend_from_slice(&segment);
        let len = bytes.len() as u64;

        Webm {
            bytes: Bytes::from(bytes),
            init: ByteRange::new(0, first_cluster - 1).unwrap(),
            index: ByteRange::new(cues_start, len - 1).unwrap(),
            clusters: cluster_ranges,
            seek_head: seek_head_start,
        }
    }
}

fn seek_head(cues_position: u64) -> Vec<u8> {
    master(
        SEEK_HEAD,
        &[master(
            SEEK,
            &[
                element(SEEK_ID, &id_bytes(CUES)),
                uint(SEEK_POSITION, cues_position),
            ],
        )],
    )
}

/// Memory source that counts fetches.
pub struct CountingSource {
    inner: MemorySource,
    calls: AtomicUsize,
}

impl CountingSource {
    pub fn new(data: Bytes) -> Self {
        CountingSource {
            inner: MemorySource::new(data),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RangeSource for CountingSource {
    async fn fetch(&self, range: ByteRange) -> Result<Bytes> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        // Give concurrent callers a chance to pile up on the same fetch.
        tokio::task::yield_now().await;
        self.inner.fetch(range).await
    }
}
