//! # Output Formatting
//!
//! Turns call results and errors into the text printed by the CLI.
//! Results are pretty-printed JSON (two-space indentation), failures are colored.
use colored::*;
use std::fmt::Display;
use thrift_http_core::client::{CallError, DynamicCallError, DynamicResponse};
use thrift_http_core::exception::ApplicationException;
use thrift_http_core::transport::TransportError;

/// A wrapper struct for a formatted, colored string.
///
/// Implements `Display` so it can be printed directly.
pub struct FormattedString(pub String);

pub struct GenericError<T: Display>(pub &'static str, pub T);

impl std::fmt::Display for FormattedString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<serde_json::Value> for FormattedString {
    fn from(value: serde_json::Value) -> Self {
        FormattedString(serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string()))
    }
}

impl From<ApplicationException> for FormattedString {
    fn from(exception: ApplicationException) -> Self {
        FormattedString(format!(
            "{} kind={:?} message={:?}",
            "Application Exception:".red().bold(),
            exception.kind,
            exception.message
        ))
    }
}

impl From<CallError> for FormattedString {
    fn from(err: CallError) -> Self {
        match err {
            CallError::Application(exception) => exception.into(),
            err => FormattedString(format!("{}\n\n'{}'", "Call Failed:".red().bold(), err)),
        }
    }
}

impl From<DynamicCallError> for FormattedString {
    fn from(err: DynamicCallError) -> Self {
        match err {
            DynamicCallError::Call(err) => err.into(),
            err => FormattedString(format!("{}\n\n'{}'", "Invalid Request:".red().bold(), err)),
        }
    }
}

impl From<TransportError> for FormattedString {
    fn from(err: TransportError) -> Self {
        let heading = match err {
            TransportError::InvalidUrl(..)
            | TransportError::InvalidHeaderName { .. }
            | TransportError::InvalidHeaderValue { .. } => "Invalid Endpoint:",
            TransportError::ConnectionFailed(..) | TransportError::NotOpen => "Failed to connect:",
            _ => "Transport Failed:",
        };
        GenericError(heading, err).into()
    }
}

impl<T: Display> From<GenericError<T>> for FormattedString {
    fn from(GenericError(msg, err): GenericError<T>) -> Self {
        FormattedString(format!("{}\n\n'{}'", msg.red().bold(), err))
    }
}

/// Formats the successful outcomes of a dynamic call.
///
/// Remote exceptions are not successes, see [`response_failure`].
pub fn response_output(response: &DynamicResponse) -> Option<FormattedString> {
    match response {
        DynamicResponse::Success(value) => Some(value.clone().into()),
        DynamicResponse::Void => Some(FormattedString("(void)".dimmed().to_string())),
        DynamicResponse::Oneway => Some(FormattedString("(oneway call sent)".dimmed().to_string())),
        DynamicResponse::UserException { .. } | DynamicResponse::ApplicationException(_) => None,
    }
}

/// Formats a remote exception carried by a dynamic call response.
pub fn response_failure(response: DynamicResponse) -> Option<FormattedString> {
    match response {
        DynamicResponse::UserException { id, value } => Some(FormattedString(format!(
            "{} field={}\n\n{}",
            "Declared Exception:".red().bold(),
            id,
            FormattedString::from(value)
        ))),
        DynamicResponse::ApplicationException(exception) => Some(exception.into()),
        _ => None,
    }
}
