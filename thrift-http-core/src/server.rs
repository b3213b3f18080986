//! # HTTP Server
//!
//! Exposes a [`Processor`] over HTTP/1.1: every `POST` body on the configured path is one
//! request frame, and the response body is the reply frame.
//!
//! | Situation                        | Status                       |
//! |----------------------------------|------------------------------|
//! | Reply produced (or oneway call)  | `200 OK`, `application/x-thrift` |
//! | Path doesn't match               | `404 Not Found`              |
//! | Method isn't `POST`              | `405 Method Not Allowed`     |
//! | Body larger than the limit       | `413 Payload Too Large`      |
//! | Frame can't be read at all       | `400 Bad Request`            |
//!
//! Every accepted connection is served on its own tokio task.
use crate::{processor::Processor, transport::http::THRIFT_CONTENT_TYPE};
use bytes::Bytes;
use http::{
    HeaderValue, Method, Request, Response, StatusCode,
    header::{ALLOW, CONTENT_TYPE},
};
use http_body::Body as _;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::{body::Incoming, server::conn::http1, service::service_fn};
use hyper_util::rt::TokioIo;
use std::{convert::Infallible, future::Future, net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::{TcpListener, TcpStream};

/// Path served when none is configured.
pub const DEFAULT_PATH: &str = "/api";
pub const DEFAULT_MAX_BODY: usize = 16 * 1024 * 1024;

const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error("Failed to bind '{0}': {1}")]
    Bind(String, #[source] std::io::Error),
    #[error("Listener error: {0}")]
    Io(#[from] std::io::Error),
}

/// Binds a TCP listener for [`HttpServer::serve`].
pub async fn bind(addr: &str) -> Result<TcpListener, ServeError> {
    TcpListener::bind(addr)
        .await
        .map_err(|e| ServeError::Bind(addr.to_string(), e))
}

/// Serves a processor over HTTP.
#[derive(Debug)]
pub struct HttpServer<P> {
    processor: Arc<P>,
    path: Option<String>,
    max_body: usize,
}

impl<P: Processor> HttpServer<P> {
    pub fn new(processor: P) -> Self {
        Self::from_arc(Arc::new(processor))
    }

    pub fn from_arc(processor: Arc<P>) -> Self {
        Self {
            processor,
            path: Some(DEFAULT_PATH.to_string()),
            max_body: DEFAULT_MAX_BODY,
        }
    }

    /// Only accept requests on `path`.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Accept requests on every path.
    pub fn any_path(mut self) -> Self {
        self.path = None;
        self
    }

    pub fn with_max_body(mut self, max_body: usize) -> Self {
        self.max_body = max_body;
        self
    }

    /// Serves until the process ends.
    pub async fn serve(self, listener: TcpListener) -> Result<(), ServeError> {
        self.serve_with_shutdown(listener, std::future::pending())
            .await
    }

    /// Serves until `signal` completes. Connections already accepted keep running on their
    /// own tasks.
    pub async fn serve_with_shutdown(
        self,
        listener: TcpListener,
        signal: impl Future<Output = ()>,
    ) -> Result<(), ServeError> {
        let local_addr = listener.local_addr()?;
        tracing::info!(%local_addr, path = self.path.as_deref().unwrap_or("*"), "serving");

        let server = Arc::new(self);
        tokio::pin!(signal);

        loop {
            let accepted = tokio::select! {
                accepted = listener.accept() => accepted,
                () = &mut signal => {
                    tracing::info!(%local_addr, "shutting down");
                    return Ok(());
                }
            };

            match accepted {
                Ok((stream, peer)) => {
                    tokio::spawn(Arc::clone(&server).serve_connection(stream, peer));
                }
                Err(err) => {
                    tracing::warn!(error = %err, "failed to accept connection");
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                }
            }
        }
    }

    async fn serve_connection(self: Arc<Self>, stream: TcpStream, peer: SocketAddr) {
        tracing::debug!(%peer, "connection accepted");
        let service = service_fn(move |request| {
            let server = Arc::clone(&self);
            async move { Ok::<_, Infallible>(server.handle(request).await) }
        });

        if let Err(err) = http1::Builder::new()
            .serve_connection(TokioIo::new(stream), service)
            .await
        {
            tracing::debug!(%peer, error = %err, "connection terminated");
        }
    }

    async fn handle(&self, request: Request<Incoming>) -> Response<Full<Bytes>> {
        if let Some(path) = &self.path {
            if request.uri().path() != path {
                return status_only(StatusCode::NOT_FOUND);
            }
        }

        if request.method() != Method::POST {
            let mut response = status_only(StatusCode::METHOD_NOT_ALLOWED);
            response
                .headers_mut()
                .insert(ALLOW, HeaderValue::from_static("POST"));
            return response;
        }

        if request.body().size_hint().lower() > self.max_body as u64 {
            return status_only(StatusCode::PAYLOAD_TOO_LARGE);
        }

        let frame = match Limited::new(request.into_body(), self.max_body)
            .collect()
            .await
        {
            Ok(collected) => collected.to_bytes(),
            Err(err) if err.downcast_ref::<LengthLimitError>().is_some() => {
                return status_only(StatusCode::PAYLOAD_TOO_LARGE);
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to read request body");
                return status_only(StatusCode::BAD_REQUEST);
            }
        };

        match self.processor.process(frame).await {
            Ok(reply) => {
                let mut response = Response::new(Full::new(reply.unwrap_or_default()));
                response
                    .headers_mut()
                    .insert(CONTENT_TYPE, HeaderValue::from_static(THRIFT_CONTENT_TYPE));
                response
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to process request");
                status_only(StatusCode::BAD_REQUEST)
            }
        }
    }
}

fn status_only(status: StatusCode) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = status;
    response
}
