//! # Transports
//!
//! A transport moves finished frames between a client and a server. It knows nothing about
//! the protocol: it takes the bytes of a request frame and hands back the bytes of the
//! response frame.
//!
//! * **[`HttpTransport`]**: Sends each frame as the body of an HTTP/1.1 `POST` over a single
//!   kept-alive connection.
//! * **[`ProcessorTransport`]**: Hands frames straight to an in-process [`Processor`](crate::processor::Processor),
//!   useful to exercise clients without a network.
//!
//! ## Lifecycle
//!
//! `open` -> any number of `exchange` calls -> `close`. Exchanging on a transport that is not
//! open fails with [`TransportError::NotOpen`].
pub mod http;
pub mod processor;

pub use self::http::{HttpTransport, HttpTransportBuilder};
pub use processor::ProcessorTransport;

use crate::protocol::ProtocolError;
use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Invalid URL '{0}': {1}")]
    InvalidUrl(String, String),
    #[error("Invalid header name '{key}': '{source}'")]
    InvalidHeaderName {
        key: String,
        source: ::http::header::InvalidHeaderName,
    },
    #[error("Invalid header value for '{key}': '{source}'")]
    InvalidHeaderValue {
        key: String,
        source: ::http::header::InvalidHeaderValue,
    },
    #[error("Transport is not open")]
    NotOpen,
    #[error("Failed to connect to '{0}': {1}")]
    ConnectionFailed(String, #[source] std::io::Error),
    #[error("HTTP error: {0}")]
    Http(#[from] hyper::Error),
    #[error("Failed to build the HTTP request: {0}")]
    Request(#[from] ::http::Error),
    #[error("Server answered with HTTP status {0}")]
    HttpStatus(::http::StatusCode),
    #[error("No response within {0:?}")]
    Timeout(Duration),
    #[error("In-process processor rejected the frame: {0}")]
    Processor(#[from] ProtocolError),
}

/// Moves request frames to a server and returns its response frames.
#[async_trait]
pub trait Transport: Send {
    /// Acquires the underlying resources (e.g. a TCP connection).
    async fn open(&mut self) -> Result<(), TransportError>;

    fn is_open(&self) -> bool;

    /// Sends one request frame and waits for the matching response frame.
    ///
    /// The response may be empty, e.g. for oneway calls.
    async fn exchange(&mut self, request: Bytes) -> Result<Bytes, TransportError>;

    /// Releases the underlying resources. Closing twice is not an error.
    async fn close(&mut self) -> Result<(), TransportError>;
}
