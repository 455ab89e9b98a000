//! Seekable WebM: builds a cue index from a container's metadata and serves
//! byte streams that start at any timecode, fetching only the ranges needed.

pub mod builder;
pub mod ebml;
pub mod error;
pub mod file;
pub mod http;
pub mod manifest;
pub mod scalar;
pub mod seek;
pub mod source;
pub mod stream;

pub use builder::ManifestBuilder;
pub use error::{Error, Result};
pub use file::{WebmFile, WebmOptions};
pub use http::HttpRangeSource;
pub use manifest::{ByteRange, Cluster, Cue, InitSegment, Manifest};
pub use seek::{locate_cue, DEFAULT_EPSILON};
pub use source::{MemorySource, RangeSource};
pub use stream::ClusterStream;
