use crate::config::Http;
use crate::error::SeekerError;
use crate::library::Library;
use bytes::Bytes;
use futures_util::TryStreamExt;
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Empty, StreamBody};
use hyper::body::{Frame, Incoming};
use hyper::server::conn::http1;
use hyper::service::Service;
use hyper::{header, Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::future::Future;
use std::pin::{self, Pin};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};
use webm_seek::Error;

const COMMON_HEADERS: [(&str, &str); 1] = [("Access-Control-Allow-Origin", "*")];
const START_TIME_HEADER: &str = "X-Start-Time";
const FALLBACK_CONTENT_TYPE: &str = "video/webm";

type Body = UnsyncBoxBody<Bytes, Error>;

pub async fn start(
    shutdown: Arc<Notify>,
    settings: &Http,
    library: Arc<Library>,
) -> Result<(), SeekerError> {
    let addr = common::socket::parse_address(&settings.addr)
        .map_err(|e| SeekerError::NetworkError(format!("{}: {}", settings.addr, e)))?;
    let listener = common::socket::listen(&addr)
        .map_err(|e| SeekerError::NetworkError(format!("listen on {}: {}", addr, e)))?;

    info!("seek server: listening on http://{}", addr);
    common::systemd::ready();

    let http = http1::Builder::new();
    let graceful = hyper_util::server::graceful::GracefulShutdown::new();
    let mut signal = pin::pin!(shutdown.notified());
    let service = SeekService::new(library);

    loop {
        tokio::select! {
            Ok((stream, _addr)) = listener.accept() => {
                let io = TokioIo::new(stream);
                let conn = http.serve_connection(io, service.clone());
                let fut = graceful.watch(conn);
                tokio::spawn(async move {
                    if let Err(e) = fut.await {
                        error!("seek server: serve: {:?}", e);
                    }
                });
            },
            _ = &mut signal => {
                info!("seek server: graceful shutdown");
                break;
            }
        }
    }

    tokio::select! {
        _ = graceful.shutdown() => {
            info!("seek server: all connections gracefully closed");
        },
        _ = tokio::time::sleep(settings.shutdown_timeout) => {
            info!("seek server: timed out wait for all connections to close");
        }
    }
    Ok(())
}

/// Answers `GET /<media>?t=<seconds>` with the stream starting at that time.
#[derive(Clone)]
pub struct SeekService {
    library: Arc<Library>,
}

impl SeekService {
    pub fn new(library: Arc<Library>) -> Self {
        SeekService { library }
    }

    async fn handle(&self, req: Request<Incoming>) -> Result<Response<Body>, Infallible> {
        if req.method() != Method::GET {
            return Ok(empty_response(StatusCode::METHOD_NOT_ALLOWED));
        }

        let params = match SeekParams::from_request(req.uri().path(), req.uri().query()) {
            Ok(params) => params,
            Err(e) => {
                debug!("bad request {}: {}", req.uri(), e);
                return Ok(empty_response(StatusCode::BAD_REQUEST));
            }
        };

        let file = match self.library.get(&params.media) {
            Some(file) => file,
            None => return Ok(empty_response(StatusCode::NOT_FOUND)),
        };

        let stream = match file.stream(params.time).await {
            Ok(stream) => stream,
            Err(e) => {
                warn!("{}: seek to {}s: {}", params.media, params.time, e);
                return Ok(empty_response(error_status(&e)));
            }
        };

        let content_type = match stream.manifest().content_type.as_str() {
            "" => FALLBACK_CONTENT_TYPE.to_string(),
            content_type => content_type.to_string(),
        };
        let start_time = stream.start_time();
        info!("{}: seek to {}s starts at {}s", params.media, params.time, start_time);

        let mut response = Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, content_type)
            .header(START_TIME_HEADER, start_time.to_string());
        for (name, value) in COMMON_HEADERS {
            response = response.header(name, value);
        }

        let body = StreamBody::new(stream.map_ok(Frame::data));
        match response.body(BodyExt::boxed_unsync(body)) {
            Ok(response) => Ok(response),
            Err(e) => {
                error!("{}: build response: {}", params.media, e);
                Ok(empty_response(StatusCode::INTERNAL_SERVER_ERROR))
            }
        }
    }
}

impl Service<Request<Incoming>> for SeekService {
    type Response = Response<Body>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let this = self.clone();
        Box::pin(async move { this.handle(req).await })
    }
}

fn error_status(e: &Error) -> StatusCode {
    match e {
        Error::NetworkError(_) | Error::RequestError(_) => StatusCode::BAD_GATEWAY,
        Error::RangeError { .. } => StatusCode::BAD_GATEWAY,
        Error::NoCuesError
        | Error::SizeError(_)
        | Error::ParseError(_)
        | Error::IncompleteError(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

fn empty_response(status: StatusCode) -> Response<Body> {
    let mut response = Response::new(Empty::new().map_err(|never| match never {}).boxed_unsync());
    *response.status_mut() = status;
    for (name, value) in COMMON_HEADERS {
        response
            .headers_mut()
            .insert(name, header::HeaderValue::from_static(value));
    }
    response
}

/// Parameters of a seek request: `/<media>?t=<seconds>`.
#[derive(Debug, Clone, PartialEq)]
struct SeekParams {
    media: String,
    time: f64,
}

impl SeekParams {
    fn from_request(path: &str, query: Option<&str>) -> Result<Self, String> {
        let media = path.trim_start_matches('/');
        if media.is_empty() || media.contains('/') {
            return Err(format!("invalid media path '{}'", path));
        }

        let mut time = 0.0;
        let pairs = query
            .unwrap_or_default()
            .split('&')
            .filter_map(|pair| pair.split_once('='));
        for (key, value) in pairs {
            if key == "t" {
                time = value
                    .parse::<f64>()
                    .map_err(|e| format!("invalid time '{}': {}", value, e))?;
            }
        }

        if !time.is_finite() {
            return Err(format!("invalid time {}", time));
        }

        Ok(SeekParams {
            media: media.to_string(),
            time,
        })
    }
}
