use crate::error::{Error, Result};
use crate::manifest::ByteRange;
use crate::source::RangeSource;
use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Empty};
use hyper::client::conn::http1;
use hyper::{header, Method, Request, StatusCode, Uri};
use hyper_util::rt::TokioIo;
use tokio::net::TcpStream;
use tracing::{debug, error};

const USER_AGENT: &str = "webm-seek/0.1";

/// Fetches byte ranges of a remote file with HTTP `Range` requests.
///
/// Every fetch opens its own HTTP/1.1 connection, so concurrent streams never
/// queue behind each other. Only `http://` URLs are supported.
#[derive(Debug, Clone)]
pub struct HttpRangeSource {
    uri: Uri,
}

impl HttpRangeSource {
    pub fn new(url: &str) -> Result<Self> {
        let uri = Uri::try_from(url)
            .map_err(|e| Error::RequestError(format!("invalid url '{}': {}", url, e)))?;
        if uri.scheme_str() != Some("http") {
            return Err(Error::RequestError(format!(
                "unsupported url scheme in '{}'",
                url
            )));
        }

        if uri.host().is_none() {
            return Err(Error::RequestError(format!("missing host in '{}'", url)));
        }

        Ok(HttpRangeSource { uri })
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    async fn connect(&self) -> Result<http1::SendRequest<Empty<Bytes>>> {
        let io = self.get_io().await?;
        let (sender, conn) = http1::handshake(io)
            .await
            .map_err(|e| Error::RequestError(format!("http1 handshake: {}", e)))?;

        tokio::task::spawn(async move {
            if let Err(err) = conn.await {
                error!("connection: {:?}", err);
            }
        });

        Ok(sender)
    }

    async fn get_io(&self) -> Result<TokioIo<TcpStream>> {
        let host = self.uri.host().unwrap_or_default();
        let port = self.uri.port_u16().unwrap_or(80);
        let addr = format!("{}:{}", host, port);
        let tcp_stream = TcpStream::connect(addr.as_str())
            .await
            .map_err(|e| Error::NetworkError(format!("connect to {}: {}", addr, e)))?;

        Ok(TokioIo::new(tcp_stream))
    }

    fn build_request(&self, range: ByteRange) -> Result<Request<Empty<Bytes>>> {
        let path = self
            .uri
            .path_and_query()
            .map(|pnq| pnq.as_str())
            .unwrap_or("/");
        let host = self
            .uri
            .authority()
            .map(|authority| authority.as_str())
            .unwrap_or_default();

        Request::builder()
            .method(Method::GET)
            .uri(path)
            .header(header::HOST, host)
            .header(header::USER_AGENT, USER_AGENT)
            .header(header::RANGE, format!("bytes={}", range))
            .body(Empty::new())
            .map_err(|e| Error::RequestError(format!("build request: {}", e)))
    }
}

#[async_trait]
impl RangeSource for HttpRangeSource {
    async fn fetch(&self, range: ByteRange) -> Result<Bytes> {
        range.validate()?;
        let req = self.build_request(range)?;
        let mut sender = self.connect().await?;
        let res = sender
            .send_request(req)
            .await
            .map_err(|e| Error::NetworkError(format!("send request: {}", e)))?;

        let status = res.status();
        let whole_file = status == StatusCode::OK && range.start() == 0;
        if status != StatusCode::PARTIAL_CONTENT && !whole_file {
            return Err(Error::RequestError(format!(
                "{}: unexpected status {} for bytes={}",
                self.uri, status, range
            )));
        }

        let mut body = res
            .into_body()
            .collect()
            .await
            .map_err(|e| Error::NetworkError(format!("read body: {}", e)))?
            .to_bytes();

        // A server ignoring the Range header sends the whole file.
        if let Some(len) = range.len() {
            if body.len() as u64 > len {
                body.truncate(len as usize);
            }
        }

        debug!("{}: fetched {} bytes for {}", self.uri, body.len(), range);
        Ok(body)
    }
}
