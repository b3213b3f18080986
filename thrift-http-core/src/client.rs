//! # RPC Client
//!
//! [`RpcClient`] implements the client half of the call/reply exchange on top of any
//! [`Transport`]:
//!
//! 1. Writes the `CALL` envelope (method name, next sequence id) and the argument struct.
//! 2. Exchanges the frame through the transport.
//! 3. Validates the reply envelope: method name, sequence id and message type must match the
//!    call, and an `EXCEPTION` message is decoded into an [`ApplicationException`].
//!
//! Typed service stubs (see `hello-service`) build on [`RpcClient::call_with`], which leaves
//! result decoding to the stub. [`RpcClient::dynamic`] works without any stub by
//! transcoding JSON arguments and results.
//!
//! ## Example
//!
//! ```rust,no_run
//! use thrift_http_core::client::{DynamicRequest, RpcClient};
//! use thrift_http_core::transport::HttpTransport;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = HttpTransport::new("http://127.0.0.1:19090/api")?;
//! let mut client = RpcClient::new(transport);
//!
//! client.open().await?;
//! let response = client
//!     .dynamic(DynamicRequest::new("hello", serde_json::json!(["world"])))
//!     .await?;
//! println!("{response:?}");
//! client.close().await?;
//! # Ok(())
//! # }
//! ```
mod types;

pub use types::*;

use crate::{
    exception::ApplicationException,
    protocol::{
        BinaryDecoder, BinaryEncoder, DecoderConfig, MessageIdentifier, MessageType,
        ProtocolError,
    },
    transport::{Transport, TransportError},
    value::{self, JsonValueError, Value},
};

/// Errors that can occur while performing a call.
#[derive(Debug, thiserror::Error)]
pub enum CallError {
    #[error("Transport error: '{0}'")]
    Transport(#[from] TransportError),
    #[error("Malformed reply: '{0}'")]
    Protocol(#[from] ProtocolError),
    #[error("Server raised an application exception: '{0}'")]
    Application(#[from] ApplicationException),
    #[error("Reply is for method '{received}', expected '{expected}'")]
    WrongMethodName { expected: String, received: String },
    #[error("Reply has sequence id {received}, expected {expected}")]
    BadSequenceId { expected: i32, received: i32 },
    #[error("Unexpected message type {0:?} in reply")]
    InvalidMessageType(MessageType),
    #[error("Reply for '{0}' carries no result")]
    MissingResult(String),
}

/// Errors that can occur during a dynamic call.
#[derive(Debug, thiserror::Error)]
pub enum DynamicCallError {
    #[error("Invalid arguments: '{0}'")]
    InvalidArgs(String),
    #[error("Arguments can't be sent: '{0}'")]
    JsonValue(#[from] JsonValueError),
    #[error(transparent)]
    Call(#[from] CallError),
}

/// A client performing calls over a transport `T`.
#[derive(Debug)]
pub struct RpcClient<T> {
    transport: T,
    sequence_number: i32,
    decoder_config: DecoderConfig,
}

impl<T> RpcClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            sequence_number: 0,
            decoder_config: DecoderConfig::default(),
        }
    }

    /// Replaces the limits applied when decoding replies.
    pub fn with_decoder_config(mut self, config: DecoderConfig) -> Self {
        self.decoder_config = config;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    fn next_sequence_number(&mut self) -> i32 {
        self.sequence_number = self.sequence_number.wrapping_add(1);
        self.sequence_number
    }
}

impl<T: Transport> RpcClient<T> {
    pub async fn open(&mut self) -> Result<(), TransportError> {
        self.transport.open().await
    }

    pub fn is_open(&self) -> bool {
        self.transport.is_open()
    }

    pub async fn close(&mut self) -> Result<(), TransportError> {
        self.transport.close().await
    }

    /// Performs a call and returns a decoder positioned at the start of the result struct.
    ///
    /// `write_args` must write the complete argument struct, STOP marker included.
    pub async fn call_with(
        &mut self,
        method: &str,
        write_args: impl FnOnce(&mut BinaryEncoder),
    ) -> Result<BinaryDecoder, CallError> {
        let sequence_number = self.next_sequence_number();
        let frame = encode_message(method, MessageType::Call, sequence_number, write_args);

        tracing::debug!(method, sequence_number, "sending call");
        let response = self.transport.exchange(frame).await?;

        let mut dec = BinaryDecoder::with_config(response, self.decoder_config);
        let header = dec.read_message_begin()?;

        if header.name != method {
            return Err(CallError::WrongMethodName {
                expected: method.to_string(),
                received: header.name,
            });
        }
        if header.sequence_number != sequence_number {
            return Err(CallError::BadSequenceId {
                expected: sequence_number,
                received: header.sequence_number,
            });
        }
        match header.message_type {
            MessageType::Reply => Ok(dec),
            MessageType::Exception => Err(ApplicationException::decode(&mut dec)?.into()),
            other => Err(CallError::InvalidMessageType(other)),
        }
    }

    /// Performs a call with dynamic arguments and returns every field of the result struct.
    pub async fn call(
        &mut self,
        method: &str,
        args: &[(i16, Value)],
    ) -> Result<Vec<(i16, Value)>, CallError> {
        let mut dec = self
            .call_with(method, |enc| value::encode_struct(args, enc))
            .await?;
        Ok(value::decode_struct(&mut dec)?)
    }

    /// Sends a oneway call. The response body, if any, is discarded.
    pub async fn call_oneway(
        &mut self,
        method: &str,
        args: &[(i16, Value)],
    ) -> Result<(), CallError> {
        let sequence_number = self.next_sequence_number();
        let frame = encode_message(method, MessageType::Oneway, sequence_number, |enc| {
            value::encode_struct(args, enc)
        });

        tracing::debug!(method, sequence_number, "sending oneway call");
        self.transport.exchange(frame).await?;
        Ok(())
    }

    /// Executes a call described by JSON and renders its result as JSON.
    pub async fn dynamic(
        &mut self,
        request: DynamicRequest,
    ) -> Result<DynamicResponse, DynamicCallError> {
        let args = json_args(&request.args)?;

        if request.oneway {
            self.call_oneway(&request.method, &args).await?;
            return Ok(DynamicResponse::Oneway);
        }

        let fields = match self.call(&request.method, &args).await {
            Ok(fields) => fields,
            Err(CallError::Application(exception)) => {
                return Ok(DynamicResponse::ApplicationException(exception));
            }
            Err(err) => return Err(err.into()),
        };

        let response = match fields.into_iter().next() {
            None => DynamicResponse::Void,
            Some((0, value)) => DynamicResponse::Success(value.to_json()),
            Some((id, value)) => DynamicResponse::UserException {
                id,
                value: value.to_json(),
            },
        };
        Ok(response)
    }
}

fn encode_message(
    method: &str,
    message_type: MessageType,
    sequence_number: i32,
    write_args: impl FnOnce(&mut BinaryEncoder),
) -> bytes::Bytes {
    let mut enc = BinaryEncoder::new();
    enc.write_message_begin(&MessageIdentifier::new(
        method,
        message_type,
        sequence_number,
    ));
    write_args(&mut enc);
    enc.finish()
}

fn json_args(json: &serde_json::Value) -> Result<Vec<(i16, Value)>, DynamicCallError> {
    match json {
        serde_json::Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let id = i16::try_from(i + 1).map_err(|_| {
                    DynamicCallError::InvalidArgs("too many arguments".to_string())
                })?;
                Ok((id, Value::from_json(item)?))
            })
            .collect(),
        serde_json::Value::Object(_) => match Value::from_json(json)? {
            Value::Struct(fields) => Ok(fields),
            other => Err(DynamicCallError::InvalidArgs(format!(
                "arguments must form a struct, got a {}",
                other.ttype()
            ))),
        },
        _ => Err(DynamicCallError::InvalidArgs(
            "arguments must be a JSON Array or an Object keyed by field id".to_string(),
        )),
    }
}
