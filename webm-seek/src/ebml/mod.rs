//! EBML element stream: typed, named elements with absolute file offsets.

mod reader;
mod schema;

pub use reader::TagReader;
pub use schema::{lookup, ElementInfo};

use bytes::Bytes;

/// Payload type of an element as declared by the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Master,
    Unsigned,
    Signed,
    Float,
    String,
    Utf8,
    Date,
    Binary,
}

impl ElementKind {
    pub fn is_master(&self) -> bool {
        matches!(self, ElementKind::Master)
    }
}

/// Header of one element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub id: u32,
    pub name: &'static str,
    pub kind: ElementKind,
    /// Offset of the first byte of the element ID.
    pub start: u64,
    /// Offset of the first payload byte.
    pub data_start: u64,
    /// Offset of the last byte, `None` while the size is unknown.
    pub end: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TagEvent {
    Start(Element),
    End(Element),
    Value(Element, Bytes),
}

impl TagEvent {
    pub fn element(&self) -> &Element {
        match self {
            TagEvent::Start(element) | TagEvent::End(element) | TagEvent::Value(element, _) => {
                element
            }
        }
    }
}
