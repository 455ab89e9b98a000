use crate::builder::ManifestBuilder;
use crate::ebml::TagReader;
use crate::error::{Error, Result};
use crate::manifest::{ByteRange, Manifest};
use crate::seek::{locate_cue, DEFAULT_EPSILON};
use crate::source::RangeSource;
use crate::stream::ClusterStream;
use bytes::Bytes;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WebmOptions {
    /// Bytes sent ahead of every stream: the EBML header and segment metadata.
    pub init: ByteRange,
    /// Bytes holding the `Cues` element. Without it the init range alone must
    /// reach the end of `Cues` or `Segment`.
    pub index: Option<ByteRange>,
    pub epsilon: f64,
}

impl WebmOptions {
    pub fn new(init: ByteRange) -> Self {
        WebmOptions {
            init,
            index: None,
            epsilon: DEFAULT_EPSILON,
        }
    }

    pub fn with_index(mut self, index: ByteRange) -> Self {
        self.index = Some(index);
        self
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }
}

/// One WebM container behind a [`RangeSource`].
///
/// The init and index bytes are fetched at most once and the manifest is built
/// at most once. Concurrent callers wait for the same fetch or build. A failed
/// fetch is retried by the next caller, a malformed container stays broken.
pub struct WebmFile {
    source: Arc<dyn RangeSource>,
    options: WebmOptions,
    init: OnceCell<Bytes>,
    index: OnceCell<Bytes>,
    manifest: OnceCell<std::result::Result<Arc<Manifest>, Error>>,
}

impl WebmFile {
    pub fn new(source: Arc<dyn RangeSource>, options: WebmOptions) -> Self {
        WebmFile {
            source,
            options,
            init: OnceCell::new(),
            index: OnceCell::new(),
            manifest: OnceCell::new(),
        }
    }

    pub fn options(&self) -> &WebmOptions {
        &self.options
    }

    pub async fn init(&self) -> Result<Bytes> {
        let range = self.options.init;
        self.init
            .get_or_try_init(|| self.fetch("init", range))
            .await
            .cloned()
    }

    /// Index bytes, `None` when no index range is configured.
    pub async fn index(&self) -> Result<Option<Bytes>> {
        let range = match self.options.index {
            Some(range) => range,
            None => return Ok(None),
        };

        self.index
            .get_or_try_init(|| self.fetch("index", range))
            .await
            .cloned()
            .map(Some)
    }

    pub async fn manifest(&self) -> Result<Arc<Manifest>> {
        let built = self
            .manifest
            .get_or_try_init(|| async {
                match self.build().await {
                    Ok(manifest) => Ok(Ok(manifest)),
                    Err(e) if e.is_permanent() => {
                        warn!("manifest build failed: {}", e);
                        Ok(Err(e))
                    }
                    Err(e) => Err(e),
                }
            })
            .await?;

        built.clone()
    }

    /// Cue index for `time` seconds, `None` when the container has no cues.
    pub async fn locate(&self, time: f64) -> Result<Option<usize>> {
        let manifest = self.manifest().await?;
        Ok(locate_cue(&manifest, time, self.options.epsilon))
    }

    /// Stream starting at the cue that contains `time` seconds.
    pub async fn stream(&self, time: f64) -> Result<ClusterStream> {
        let manifest = self.manifest().await?;
        let cue = locate_cue(&manifest, time, self.options.epsilon).ok_or(Error::NoCuesError)?;
        let init = self.init().await?;
        debug!("seek to {}s starts at cue {}", time, cue);

        ClusterStream::new(manifest, Arc::clone(&self.source), init, cue)
    }

    async fn fetch(&self, what: &str, range: ByteRange) -> Result<Bytes> {
        debug!("fetching {} bytes={}", what, range);
        self.source.fetch(range).await
    }

    async fn build(&self) -> Result<Arc<Manifest>> {
        let mut builder = ManifestBuilder::new();
        let init = self.init().await?;
        let mut manifest = builder.feed(TagReader::new(init, self.options.init.start()))?;

        if manifest.is_none() {
            if let (Some(range), Some(index)) = (self.options.index, self.index().await?) {
                manifest = builder.feed(TagReader::new(index, range.start()))?;
            }
        }

        let manifest = manifest.ok_or_else(|| {
            Error::IncompleteError(format!(
                "no end of Cues or Segment in init {} or index {:?}",
                self.options.init,
                self.options.index.map(|range| range.to_string())
            ))
        })?;

        info!(
            "manifest ready: {}, {} cues, duration {:?}",
            manifest.content_type,
            manifest.cues.len(),
            manifest.duration
        );
        Ok(Arc::new(manifest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // EBML header, then a segment holding an empty Cues element.
    const EMPTY_CUES: &[u8] = &[
        0x1a, 0x45, 0xdf, 0xa3, 0x80, 0x18, 0x53, 0x80, 0x67, 0x85, 0x1c, 0x53, 0xbb, 0x6b, 0x80,
    ];

    struct FlakySource {
        inner: MemorySource,
        calls: AtomicUsize,
        failures: usize,
    }

    impl FlakySource {
        fn new(data: &'static [u8], failures: usize) -> Arc<Self> {
            Arc::new(FlakySource {
                inner: MemorySource::new(Bytes::from_static(data)),
                calls: AtomicUsize::new(0),
                failures,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RangeSource for FlakySource {
        async fn fetch(&self, range: ByteRange) -> Result<Bytes> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err(Error::NetworkError("connection reset".to_string()));
            }
            self.inner.fetch(range).await
        }
    }

    fn options(end: u64) -> WebmOptions {
        WebmOptions::new(ByteRange::new(0, end).unwrap())
    }

    #[tokio::test]
    async fn fetch_failures_are_retried() {
        let source = FlakySource::new(EMPTY_CUES, 1);
        let file = WebmFile::new(source.clone(), options(14));

        let err = file.manifest().await.unwrap_err();
        assert!(matches!(err, Error::NetworkError(_)));

        let manifest = file.manifest().await.unwrap();
        assert!(!manifest.is_seekable());
        assert_eq!(source.calls(), 2);

        file.manifest().await.unwrap();
        file.init().await.unwrap();
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn parse_failures_are_permanent() {
        let source = FlakySource::new(&[0x00, 0x01, 0x02, 0x03], 0);
        let file = WebmFile::new(source.clone(), options(3));

        let first = file.manifest().await.unwrap_err();
        assert!(matches!(first, Error::ParseError(_)));
        assert_eq!(file.manifest().await.unwrap_err(), first);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn truncated_init_is_incomplete() {
        let source = FlakySource::new(EMPTY_CUES, 0);
        let file = WebmFile::new(source, options(9));

        let err = file.manifest().await.unwrap_err();
        assert!(matches!(err, Error::IncompleteError(_)));
        assert!(err.is_permanent());
    }

    #[tokio::test]
    async fn streams_need_cues() {
        let source = FlakySource::new(EMPTY_CUES, 0);
        let file = WebmFile::new(source, options(14));

        assert_eq!(file.locate(3.0).await.unwrap(), None);
        assert_eq!(file.stream(3.0).await.err(), Some(Error::NoCuesError));
        assert_eq!(file.index().await.unwrap(), None);
    }
}
