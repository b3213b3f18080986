//! # HTTP POST Transport
//!
//! Every frame is sent as the body of a `POST` request to a fixed URL and the response body is
//! the reply frame.
//!
//! ## Connection handling
//!
//! [`HttpTransport::open`] establishes a single TCP connection and performs the HTTP/1.1
//! handshake. All exchanges reuse that connection (keep-alive), so calling a client twice
//! after one `open` sends both requests over the same socket. If the server closed the idle
//! connection in between, the transport reconnects once before sending. After
//! [`HttpTransport::close`] every exchange fails with [`TransportError::NotOpen`].
//!
//! No timeout is applied unless one is configured with [`HttpTransportBuilder::timeout`].
use super::{Transport, TransportError};
use ::http::{
    HeaderMap, HeaderName, HeaderValue, Method, Request, Uri,
    header::{ACCEPT, CONTENT_TYPE, HOST, USER_AGENT},
    uri::Authority,
};
use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::client::conn::http1::{self, SendRequest};
use hyper_util::rt::TokioIo;
use std::{future::Future, str::FromStr, time::Duration};
use tokio::{net::TcpStream, task::JoinHandle};

/// Media type of Thrift frames carried over HTTP.
pub const THRIFT_CONTENT_TYPE: &str = "application/x-thrift";

const DEFAULT_PORT: u16 = 80;

/// Configures an [`HttpTransport`] before it is created.
#[derive(Debug, Clone)]
pub struct HttpTransportBuilder {
    url: String,
    headers: Vec<(String, String)>,
    timeout: Option<Duration>,
}

impl HttpTransportBuilder {
    /// Adds a custom header sent with every request.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    pub fn headers(mut self, headers: impl IntoIterator<Item = (String, String)>) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Bounds connecting and every single exchange.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Validates the URL and headers. Nothing touches the network until `open`.
    pub fn build(self) -> Result<HttpTransport, TransportError> {
        let uri = Uri::from_str(&self.url)
            .map_err(|e| TransportError::InvalidUrl(self.url.clone(), e.to_string()))?;

        match uri.scheme_str() {
            Some("http") => {}
            Some(other) => {
                return Err(TransportError::InvalidUrl(
                    self.url,
                    format!("unsupported scheme '{other}', only 'http' is supported"),
                ));
            }
            None => {
                return Err(TransportError::InvalidUrl(
                    self.url,
                    "missing scheme, expected 'http://host:port/path'".to_string(),
                ));
            }
        }

        let authority = uri
            .authority()
            .cloned()
            .ok_or_else(|| TransportError::InvalidUrl(self.url.clone(), "missing host".into()))?;

        let path = uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .filter(|pq| !pq.is_empty())
            .unwrap_or("/");
        let path = Uri::from_str(path)
            .map_err(|e| TransportError::InvalidUrl(self.url.clone(), e.to_string()))?;

        let headers = build_headers(self.headers)?;

        Ok(HttpTransport {
            url: self.url,
            authority,
            path,
            headers,
            timeout: self.timeout,
            connection: None,
        })
    }
}

struct Connection {
    sender: SendRequest<Full<Bytes>>,
    driver: JoinHandle<()>,
}

/// A client transport posting frames to a single HTTP endpoint.
pub struct HttpTransport {
    url: String,
    authority: Authority,
    /// Origin-form target of every request (e.g. `/api`).
    path: Uri,
    headers: HeaderMap,
    timeout: Option<Duration>,
    connection: Option<Connection>,
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("url", &self.url)
            .field("timeout", &self.timeout)
            .field("open", &self.is_open())
            .finish()
    }
}

impl HttpTransport {
    /// Creates a transport for `url` (e.g. `http://127.0.0.1:19090/api`) with default settings.
    pub fn new(url: &str) -> Result<Self, TransportError> {
        Self::builder(url).build()
    }

    pub fn builder(url: impl Into<String>) -> HttpTransportBuilder {
        HttpTransportBuilder {
            url: url.into(),
            headers: Vec::new(),
            timeout: None,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns a sender that is ready to take a request, reconnecting once if the server
    /// dropped the kept-alive connection.
    async fn ready_sender(&mut self) -> Result<&mut SendRequest<Full<Bytes>>, TransportError> {
        let stale = match self.connection.as_mut() {
            None => return Err(TransportError::NotOpen),
            Some(connection) => connection.sender.ready().await.is_err(),
        };

        if stale {
            tracing::debug!(url = %self.url, "connection was closed by the peer, reconnecting");
            let fresh = connect(self.url.clone(), self.authority.clone()).await?;
            if let Some(old) = self.connection.replace(fresh) {
                old.driver.abort();
            }
        }

        self.connection
            .as_mut()
            .map(|c| &mut c.sender)
            .ok_or(TransportError::NotOpen)
    }

    async fn post(&mut self, frame: Bytes) -> Result<Bytes, TransportError> {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(self.path.clone())
            .header(HOST, self.authority.as_str())
            .header(CONTENT_TYPE, THRIFT_CONTENT_TYPE)
            .header(ACCEPT, THRIFT_CONTENT_TYPE)
            .header(
                USER_AGENT,
                concat!("thrift-http/", env!("CARGO_PKG_VERSION")),
            );
        for (key, value) in &self.headers {
            builder = builder.header(key, value);
        }
        let request = builder.body(Full::new(frame))?;

        let sender = self.ready_sender().await?;
        let response = sender.send_request(request).await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::HttpStatus(status));
        }

        let body = response.into_body().collect().await?.to_bytes();
        Ok(body)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn open(&mut self) -> Result<(), TransportError> {
        if self.is_open() {
            return Ok(());
        }
        let connecting = connect(self.url.clone(), self.authority.clone());
        let connection = with_timeout(self.timeout, connecting).await?;
        self.connection = Some(connection);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.connection.is_some()
    }

    async fn exchange(&mut self, request: Bytes) -> Result<Bytes, TransportError> {
        if !self.is_open() {
            return Err(TransportError::NotOpen);
        }

        tracing::debug!(url = %self.url, bytes = request.len(), "posting frame");
        let timeout = self.timeout;
        let response = with_timeout(timeout, self.post(request)).await?;
        tracing::debug!(url = %self.url, bytes = response.len(), "received frame");

        Ok(response)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if let Some(connection) = self.connection.take() {
            // Dropping the sender lets the connection task finish on its own.
            drop(connection.sender);
            connection.driver.abort();
            tracing::debug!(url = %self.url, "connection closed");
        }
        Ok(())
    }
}

async fn connect(url: String, authority: Authority) -> Result<Connection, TransportError> {
    // IPv6 literals keep their brackets in the authority.
    let host = authority.host().trim_start_matches('[').trim_end_matches(']');
    let port = authority.port_u16().unwrap_or(DEFAULT_PORT);

    let stream = TcpStream::connect((host, port))
        .await
        .map_err(|e| TransportError::ConnectionFailed(url.clone(), e))?;
    stream
        .set_nodelay(true)
        .map_err(|e| TransportError::ConnectionFailed(url.clone(), e))?;

    let (sender, conn) = http1::handshake(TokioIo::new(stream)).await?;
    tracing::debug!(%url, "connection established");

    let driver = tokio::spawn(async move {
        if let Err(err) = conn.await {
            tracing::debug!(%url, error = %err, "HTTP connection terminated");
        }
    });

    Ok(Connection { sender, driver })
}

async fn with_timeout<T>(
    timeout: Option<Duration>,
    fut: impl Future<Output = Result<T, TransportError>>,
) -> Result<T, TransportError> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| TransportError::Timeout(limit))?,
        None => fut.await,
    }
}

fn build_headers(headers: Vec<(String, String)>) -> Result<HeaderMap, TransportError> {
    let mut map = HeaderMap::new();
    for (k, v) in headers {
        let key = HeaderName::from_str(&k).map_err(|source| TransportError::InvalidHeaderName {
            key: k.clone(),
            source,
        })?;
        let val = HeaderValue::from_str(&v)
            .map_err(|source| TransportError::InvalidHeaderValue { key: k, source })?;
        map.append(key, val);
    }
    Ok(map)
}
