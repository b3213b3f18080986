//! # Server-side Processing
//!
//! A [`Processor`] turns one request frame into one response frame: it reads the call
//! envelope, dispatches on the method name, runs the handler and encodes the reply.
//!
//! Service crates implement [`Processor`] for their generated dispatcher (see `hello-service`);
//! the helpers in this module cover the envelope handling every dispatcher shares.
use crate::{
    exception::{ApplicationException, ApplicationExceptionKind},
    protocol::{
        BinaryDecoder, BinaryEncoder, DecoderConfig, MessageIdentifier, MessageType,
        ProtocolError,
    },
};
use async_trait::async_trait;
use bytes::Bytes;

/// Handles request frames on the server side.
#[async_trait]
pub trait Processor: Send + Sync + 'static {
    /// Processes one request frame.
    ///
    /// Returns `Ok(None)` for oneway calls, which get no reply. An `Err` means the frame was
    /// unreadable to the point that no reply could be addressed to the caller.
    async fn process(&self, request: Bytes) -> Result<Option<Bytes>, ProtocolError>;
}

/// A call whose envelope has been read.
#[derive(Debug)]
pub struct IncomingCall {
    pub identifier: MessageIdentifier,
    /// Positioned at the start of the argument struct.
    pub args: BinaryDecoder,
}

impl IncomingCall {
    pub fn method(&self) -> &str {
        &self.identifier.name
    }

    pub fn is_oneway(&self) -> bool {
        self.identifier.message_type == MessageType::Oneway
    }

    /// Builds the reply for this call, or `None` if the call was oneway.
    pub fn reply(&self, write_result: impl FnOnce(&mut BinaryEncoder)) -> Option<Bytes> {
        if self.is_oneway() {
            return None;
        }
        Some(write_reply(
            &self.identifier.name,
            self.identifier.sequence_number,
            write_result,
        ))
    }

    /// Builds an exception reply for this call, or `None` if the call was oneway.
    pub fn exception(&self, exception: &ApplicationException) -> Option<Bytes> {
        if self.is_oneway() {
            return None;
        }
        Some(write_exception(
            &self.identifier.name,
            self.identifier.sequence_number,
            exception,
        ))
    }
}

/// The outcome of reading a request envelope.
#[derive(Debug)]
pub enum ReadCall {
    /// A `CALL` or `ONEWAY` message ready for dispatch.
    Call(IncomingCall),
    /// Any other message type; the frame holds the exception reply to send back.
    Rejected(Bytes),
}

/// Reads the envelope of a request frame.
pub fn read_call(request: Bytes, config: DecoderConfig) -> Result<ReadCall, ProtocolError> {
    let mut args = BinaryDecoder::with_config(request, config);
    let identifier = args.read_message_begin()?;

    match identifier.message_type {
        MessageType::Call | MessageType::Oneway => {
            Ok(ReadCall::Call(IncomingCall { identifier, args }))
        }
        other => {
            tracing::warn!(
                method = %identifier.name,
                message_type = ?other,
                "rejecting non-call message"
            );
            let exception = ApplicationException::new(
                ApplicationExceptionKind::InvalidMessageType,
                format!("Unexpected message type {other:?}, expected a call"),
            );
            Ok(ReadCall::Rejected(write_exception(
                &identifier.name,
                identifier.sequence_number,
                &exception,
            )))
        }
    }
}

/// Encodes a `REPLY` message. `write_result` must write the complete result struct.
pub fn write_reply(
    method: &str,
    sequence_number: i32,
    write_result: impl FnOnce(&mut BinaryEncoder),
) -> Bytes {
    let mut enc = BinaryEncoder::new();
    enc.write_message_begin(&MessageIdentifier::new(
        method,
        MessageType::Reply,
        sequence_number,
    ));
    write_result(&mut enc);
    enc.finish()
}

/// Encodes an `EXCEPTION` message carrying an application exception.
pub fn write_exception(
    method: &str,
    sequence_number: i32,
    exception: &ApplicationException,
) -> Bytes {
    let mut enc = BinaryEncoder::new();
    enc.write_message_begin(&MessageIdentifier::new(
        method,
        MessageType::Exception,
        sequence_number,
    ));
    exception.encode(&mut enc);
    enc.finish()
}

/// The reply to a method the dispatcher doesn't know.
pub fn unknown_method(call: &IncomingCall) -> Option<Bytes> {
    call.exception(&ApplicationException::new(
        ApplicationExceptionKind::UnknownMethod,
        format!("Unknown method '{}'", call.method()),
    ))
}
