use crate::config::{Location, Media, Settings};
use crate::error::SeekerError;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::io::SeekFrom;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::info;
use webm_seek::{ByteRange, Error, HttpRangeSource, RangeSource, WebmFile};

/// Reads ranges from a local file, reopening it for every fetch.
#[derive(Debug)]
pub struct FileSource {
    path: PathBuf,
    len: u64,
}

impl FileSource {
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, SeekerError> {
        let path = path.into();
        let meta = tokio::fs::metadata(&path)
            .await
            .map_err(|e| SeekerError::IoError(format!("{}: {}", path.display(), e)))?;

        Ok(FileSource {
            path,
            len: meta.len(),
        })
    }
}

#[async_trait]
impl RangeSource for FileSource {
    async fn fetch(&self, range: ByteRange) -> webm_seek::Result<Bytes> {
        range.validate()?;
        if range.start() >= self.len {
            return Err(Error::RangeError {
                start: range.start(),
                end: range.end(),
            });
        }

        let end = range.end().min(self.len - 1);
        let read_err = |e: std::io::Error| {
            Error::NetworkError(format!("read {} from {}: {}", range, self.path.display(), e))
        };

        let mut file = tokio::fs::File::open(&self.path).await.map_err(read_err)?;
        file.seek(SeekFrom::Start(range.start()))
            .await
            .map_err(read_err)?;
        let mut buf = vec![0u8; (end - range.start() + 1) as usize];
        file.read_exact(&mut buf).await.map_err(read_err)?;

        Ok(Bytes::from(buf))
    }
}

/// Configured containers by name. Each keeps its manifest for the life of
/// the process.
pub struct Library {
    files: HashMap<String, Arc<WebmFile>>,
}

impl Library {
    pub async fn open(settings: &Settings) -> Result<Self, SeekerError> {
        let mut files = HashMap::with_capacity(settings.media.len());
        for media in &settings.media {
            let file = open_media(media, settings.seek.epsilon).await?;
            files.insert(media.name.clone(), Arc::new(file));
        }

        info!("library: {} media", files.len());
        Ok(Library { files })
    }

    pub fn get(&self, name: &str) -> Option<Arc<WebmFile>> {
        self.files.get(name).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }
}

pub async fn open_media(media: &Media, epsilon: f64) -> Result<WebmFile, SeekerError> {
    let options = media.options(epsilon)?;
    let source: Arc<dyn RangeSource> = match media.location()? {
        Location::Url(url) => Arc::new(HttpRangeSource::new(url)?),
        Location::Path(path) => Arc::new(FileSource::open(path).await?),
    };

    Ok(WebmFile::new(source, options))
}
