use crate::error::{Error, Result};
use crate::manifest::ByteRange;
use async_trait::async_trait;
use bytes::Bytes;

/// Fetches byte ranges of one container.
///
/// Implementations return exactly the requested span (or up to the end of the
/// resource for open-ended ranges) and own any transport retries.
#[async_trait]
pub trait RangeSource: Send + Sync {
    async fn fetch(&self, range: ByteRange) -> Result<Bytes>;
}

/// Serves ranges from a buffer held in memory.
#[derive(Debug, Clone)]
pub struct MemorySource {
    data: Bytes,
}

impl MemorySource {
    pub fn new(data: Bytes) -> Self {
        MemorySource { data }
    }

    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[async_trait]
impl RangeSource for MemorySource {
    async fn fetch(&self, range: ByteRange) -> Result<Bytes> {
        range.validate()?;
        if range.start() >= self.len() {
            return Err(Error::RangeError {
                start: range.start(),
                end: range.end(),
            });
        }

        let end = range.end().min(self.len() - 1);
        Ok(self.data.slice(range.start() as usize..=end as usize))
    }
}
