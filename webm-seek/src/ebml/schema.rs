use super::ElementKind::{self, *};

/// Schema entry for one element ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementInfo {
    pub id: u32,
    pub name: &'static str,
    pub kind: ElementKind,
    /// Nesting depth below the top level; `GLOBAL` elements may appear anywhere.
    pub level: u8,
}

pub const GLOBAL: u8 = u8::MAX;

/// Stand-in for IDs missing from the table. Skipped as opaque binary data.
pub const UNKNOWN: ElementInfo = ElementInfo {
    id: 0,
    name: "Unknown",
    kind: Binary,
    level: GLOBAL,
};

const fn el(id: u32, name: &'static str, kind: ElementKind, level: u8) -> ElementInfo {
    ElementInfo {
        id,
        name,
        kind,
        level,
    }
}

// WebM subset of the Matroska element table.
static ELEMENTS: &[ElementInfo] = &[
    // EBML header
    el(0x1A45DFA3, "EBML", Master, 0),
    el(0x4286, "EBMLVersion", Unsigned, 1),
    el(0x42F7, "EBMLReadVersion", Unsigned, 1),
    el(0x42F2, "EBMLMaxIDLength", Unsigned, 1),
    el(0x42F3, "EBMLMaxSizeLength", Unsigned, 1),
    el(0x4282, "DocType", String, 1),
    el(0x4287, "DocTypeVersion", Unsigned, 1),
    el(0x4285, "DocTypeReadVersion", Unsigned, 1),
    el(0xEC, "Void", Binary, GLOBAL),
    el(0xBF, "CRC-32", Binary, GLOBAL),
    // Segment
    el(0x18538067, "Segment", Master, 0),
    el(0x114D9B74, "SeekHead", Master, 1),
    el(0x4DBB, "Seek", Master, 2),
    el(0x53AB, "SeekID", Binary, 3),
    el(0x53AC, "SeekPosition", Unsigned, 3),
    // Info
    el(0x1549A966, "Info", Master, 1),
    el(0x73A4, "SegmentUID", Binary, 2),
    el(0x2AD7B1, "TimecodeScale", Unsigned, 2),
    el(0x4489, "Duration", Float, 2),
    el(0x4461, "DateUTC", Date, 2),
    el(0x7BA9, "Title", Utf8, 2),
    el(0x4D80, "MuxingApp", Utf8, 2),
    el(0x5741, "WritingApp", Utf8, 2),
    // Cluster
    el(0x1F43B675, "Cluster", Master, 1),
    el(0xE7, "Timecode", Unsigned, 2),
    el(0xA7, "Position", Unsigned, 2),
    el(0xAB, "PrevSize", Unsigned, 2),
    el(0xA3, "SimpleBlock", Binary, 2),
    el(0xA0, "BlockGroup", Master, 2),
    el(0xA1, "Block", Binary, 3),
    el(0x75A1, "BlockAdditions", Master, 3),
    el(0x9B, "BlockDuration", Unsigned, 3),
    el(0xFB, "ReferenceBlock", Signed, 3),
    el(0x75A2, "DiscardPadding", Signed, 3),
    // Tracks
    el(0x1654AE6B, "Tracks", Master, 1),
    el(0xAE, "TrackEntry", Master, 2),
    el(0xD7, "TrackNumber", Unsigned, 3),
    el(0x73C5, "TrackUID", Unsigned, 3),
    el(0x83, "TrackType", Unsigned, 3),
    el(0xB9, "FlagEnabled", Unsigned, 3),
    el(0x88, "FlagDefault", Unsigned, 3),
    el(0x55AA, "FlagForced", Unsigned, 3),
    el(0x9C, "FlagLacing", Unsigned, 3),
    el(0x23E383, "DefaultDuration", Unsigned, 3),
    el(0x536E, "Name", Utf8, 3),
    el(0x22B59C, "Language", String, 3),
    el(0x86, "CodecID", String, 3),
    el(0x63A2, "CodecPrivate", Binary, 3),
    el(0x258688, "CodecName", Utf8, 3),
    el(0x56AA, "CodecDelay", Unsigned, 3),
    el(0x56BB, "SeekPreRoll", Unsigned, 3),
    el(0xE0, "Video", Master, 3),
    el(0x9A, "FlagInterlaced", Unsigned, 4),
    el(0xB0, "PixelWidth", Unsigned, 4),
    el(0xBA, "PixelHeight", Unsigned, 4),
    el(0x54B0, "DisplayWidth", Unsigned, 4),
    el(0x54BA, "DisplayHeight", Unsigned, 4),
    el(0xE1, "Audio", Master, 3),
    el(0xB5, "SamplingFrequency", Float, 4),
    el(0x9F, "Channels", Unsigned, 4),
    el(0x6264, "BitDepth", Unsigned, 4),
    el(0x6D80, "ContentEncodings", Master, 3),
    // Cues
    el(0x1C53BB6B, "Cues", Master, 1),
    el(0xBB, "CuePoint", Master, 2),
    el(0xB3, "CueTime", Unsigned, 3),
    el(0xB7, "CueTrackPositions", Master, 3),
    el(0xF7, "CueTrack", Unsigned, 4),
    el(0xF1, "CueClusterPosition", Unsigned, 4),
    el(0xF0, "CueRelativePosition", Unsigned, 4),
    el(0xB2, "CueDuration", Unsigned, 4),
    el(0x5378, "CueBlockNumber", Unsigned, 4),
    // Everything else a WebM segment may carry, kept opaque
    el(0x1043A770, "Chapters", Master, 1),
    el(0x1941A469, "Attachments", Master, 1),
    el(0x1254C367, "Tags", Master, 1),
    el(0x7373, "Tag", Master, 2),
    el(0x63C0, "Targets", Master, 3),
    el(0x67C8, "SimpleTag", Master, 3),
    el(0x45A3, "TagName", Utf8, 4),
    el(0x4487, "TagString", Utf8, 4),
    el(0x447A, "TagLanguage", String, 4),
];

pub fn lookup(id: u32) -> ElementInfo {
    ELEMENTS
        .iter()
        .find(|info| info.id == id)
        .copied()
        .unwrap_or(ElementInfo { id, ..UNKNOWN })
}
