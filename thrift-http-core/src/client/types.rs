use crate::exception::ApplicationException;

/// A request object encapsulating everything needed for a schema-less call.
#[derive(Debug, Clone)]
pub struct DynamicRequest {
    /// The name of the remote method (e.g. `hello`).
    pub method: String,
    /// The arguments.
    /// - A JSON Array: element `n` becomes field `n + 1` of the argument struct.
    /// - A JSON Object keyed by field id (`{"1": "world"}`): used as the argument struct as is.
    pub args: serde_json::Value,
    /// Send the call as `ONEWAY` and don't wait for a result.
    pub oneway: bool,
}

impl DynamicRequest {
    pub fn new(method: impl Into<String>, args: serde_json::Value) -> Self {
        Self {
            method: method.into(),
            args,
            oneway: false,
        }
    }
}

/// The result of a dynamic call.
#[derive(Debug, Clone, PartialEq)]
pub enum DynamicResponse {
    /// The method returned a value (field 0 of the result struct).
    Success(serde_json::Value),
    /// The method returned nothing.
    Void,
    /// The method raised one of its declared exceptions.
    UserException { id: i16, value: serde_json::Value },
    /// The call was executed, but the server answered with an application exception
    /// (unknown method, internal error...).
    ApplicationException(ApplicationException),
    /// The call was sent as oneway, no result exists.
    Oneway,
}
