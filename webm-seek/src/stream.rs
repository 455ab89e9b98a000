use crate::error::{Error, Result};
use crate::manifest::Manifest;
use crate::source::RangeSource;
use bytes::Bytes;
use futures_util::Stream;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tracing::warn;

type Fetch = Pin<Box<dyn Future<Output = Result<Bytes>> + Send>>;

/// Byte stream that starts playback at a cue: the init segment first, then
/// every cue range from the start cue to the end of the container.
///
/// Fetches are issued on demand. Nothing is requested until the consumer
/// polls for the next chunk, so at most one fetch is ever in flight.
pub struct ClusterStream {
    manifest: Arc<Manifest>,
    source: Arc<dyn RangeSource>,
    init: Option<Bytes>,
    next_cue: usize,
    start_time: f64,
    pending: Option<Fetch>,
    done: bool,
}

impl ClusterStream {
    pub fn new(
        manifest: Arc<Manifest>,
        source: Arc<dyn RangeSource>,
        init: Bytes,
        start_cue: usize,
    ) -> Result<Self> {
        let start_time = manifest
            .cue(start_cue)
            .map(|cue| cue.timecode)
            .ok_or(Error::NoCuesError)?;

        Ok(ClusterStream {
            manifest,
            source,
            init: Some(init),
            next_cue: start_cue,
            start_time,
            pending: None,
            done: false,
        })
    }

    /// Timecode in seconds of the cue the stream starts at.
    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    pub fn manifest(&self) -> &Arc<Manifest> {
        &self.manifest
    }
}

impl Stream for ClusterStream {
    type Item = Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.done {
            return Poll::Ready(None);
        }

        if let Some(init) = self.init.take() {
            return Poll::Ready(Some(Ok(init)));
        }

        let this = &mut *self;
        if this.pending.is_none() {
            let range = match this.manifest.cue(this.next_cue) {
                Some(cue) => cue.range,
                None => {
                    this.done = true;
                    return Poll::Ready(None);
                }
            };
            let source = Arc::clone(&this.source);
            this.pending = Some(Box::pin(async move { source.fetch(range).await }));
        }

        let fetch = match this.pending.as_mut() {
            Some(fetch) => fetch,
            None => return Poll::Ready(None),
        };
        let result = match fetch.as_mut().poll(cx) {
            Poll::Ready(result) => result,
            Poll::Pending => return Poll::Pending,
        };

        this.pending = None;
        this.next_cue += 1;
        if let Err(e) = &result {
            warn!("cue {} fetch failed: {}", this.next_cue - 1, e);
            this.done = true;
        }

        Poll::Ready(Some(result))
    }
}
