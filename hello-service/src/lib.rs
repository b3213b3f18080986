//! # Hello Service
//!
//! Client stub, processor and example handler for the `Test` service:
//!
//! ```thrift
//! service Test {
//!   string hello(1: string name)
//! }
//! ```
//!
//! The code follows the shape of generated Thrift bindings: one args struct and one result
//! struct per method, a [`TestHandler`] trait to implement on the server, a [`TestProcessor`]
//! dispatching calls to it, and a typed [`TestClient`].
//!
//! It is shared by the `thrift-http` CLI (the `hello` and `serve` commands) and the
//! integration tests of `thrift-http-core`.
pub mod pb;

pub use pb::{HelloArgs, HelloResult};

use thrift_http_core::{
    async_trait,
    bytes::Bytes,
    client::{CallError, RpcClient},
    exception::{ApplicationException, ApplicationExceptionKind},
    processor::{self, Processor, ReadCall},
    protocol::{DecoderConfig, ProtocolError},
    transport::{Transport, TransportError},
};

pub const SERVICE_NAME: &str = "Test";
pub const HELLO: &str = "hello";

/// Error type handlers may fail with. It reaches the caller as an `INTERNAL_ERROR`
/// application exception.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Server-side implementation of the `Test` service.
#[async_trait]
pub trait TestHandler: Send + Sync + 'static {
    async fn hello(&self, name: String) -> Result<String, HandlerError>;
}

/// The example handler: greets whoever calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct GreetingHandler;

#[async_trait]
impl TestHandler for GreetingHandler {
    async fn hello(&self, name: String) -> Result<String, HandlerError> {
        tracing::info!("-->Hello: {name}");
        Ok(format!("hello {name}"))
    }
}

/// Dispatches decoded calls to a [`TestHandler`].
#[derive(Debug)]
pub struct TestProcessor<H> {
    handler: H,
    decoder_config: DecoderConfig,
}

impl<H: TestHandler> TestProcessor<H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            decoder_config: DecoderConfig::default(),
        }
    }

    pub fn with_decoder_config(mut self, config: DecoderConfig) -> Self {
        self.decoder_config = config;
        self
    }
}

#[async_trait]
impl<H: TestHandler> Processor for TestProcessor<H> {
    async fn process(&self, request: Bytes) -> Result<Option<Bytes>, ProtocolError> {
        let mut call = match processor::read_call(request, self.decoder_config)? {
            ReadCall::Call(call) => call,
            ReadCall::Rejected(reply) => return Ok(Some(reply)),
        };

        match call.identifier.name.as_str() {
            HELLO => {
                let args = match HelloArgs::decode(&mut call.args) {
                    Ok(args) => args,
                    Err(err) => {
                        tracing::warn!(method = HELLO, error = %err, "failed to read arguments");
                        return Ok(call.exception(&ApplicationException::new(
                            ApplicationExceptionKind::ProtocolError,
                            err.to_string(),
                        )));
                    }
                };

                let name = args.name.unwrap_or_default();
                match self.handler.hello(name).await {
                    Ok(greeting) => {
                        let result = HelloResult {
                            success: Some(greeting),
                        };
                        Ok(call.reply(|enc| result.encode(enc)))
                    }
                    Err(err) => {
                        tracing::warn!(method = HELLO, error = %err, "handler failed");
                        Ok(call.exception(&ApplicationException::new(
                            ApplicationExceptionKind::InternalError,
                            format!("Internal error processing {HELLO}: {err}"),
                        )))
                    }
                }
            }
            _ => {
                tracing::warn!(method = call.method(), "unknown method");
                Ok(processor::unknown_method(&call))
            }
        }
    }
}

/// Typed client for the `Test` service.
#[derive(Debug)]
pub struct TestClient<T> {
    client: RpcClient<T>,
}

impl<T: Transport> TestClient<T> {
    pub fn new(transport: T) -> Self {
        Self::from_client(RpcClient::new(transport))
    }

    pub fn from_client(client: RpcClient<T>) -> Self {
        Self { client }
    }

    pub async fn open(&mut self) -> Result<(), TransportError> {
        self.client.open().await
    }

    pub async fn close(&mut self) -> Result<(), TransportError> {
        self.client.close().await
    }

    pub fn inner(&self) -> &RpcClient<T> {
        &self.client
    }

    pub fn inner_mut(&mut self) -> &mut RpcClient<T> {
        &mut self.client
    }

    pub async fn hello(&mut self, name: &str) -> Result<String, CallError> {
        let args = HelloArgs {
            name: Some(name.to_string()),
        };
        let mut dec = self.client.call_with(HELLO, |enc| args.encode(enc)).await?;
        let result = HelloResult::decode(&mut dec)?;

        result
            .success
            .ok_or_else(|| CallError::MissingResult(HELLO.to_string()))
    }
}
