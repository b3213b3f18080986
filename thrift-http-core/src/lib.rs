//! # Thrift HTTP Core
//!
//! `thrift-http-core` is the library powering the `thrift-http` CLI. It implements the
//! Apache Thrift binary protocol and carries its frames over plain HTTP `POST` requests, on
//! both the client and the server side.
//!
//! ## Key Components
//!
//! * **[`protocol`]:** The binary protocol codec ([`BinaryEncoder`](protocol::BinaryEncoder) /
//!   [`BinaryDecoder`](protocol::BinaryDecoder)).
//! * **[`transport`]:** The [`Transport`](transport::Transport) trait and its HTTP and in-process
//!   implementations.
//! * **[`RpcClient`](client::RpcClient):** Performs calls over any transport and validates
//!   replies. Typed stubs are thin wrappers around it.
//! * **[`DynamicRequest`](client::DynamicRequest) & [`DynamicResponse`](client::DynamicResponse):**
//!   Schema-less calls, JSON in and JSON out.
//! * **[`processor`] & [`server`]:** The server side: a [`Processor`](processor::Processor)
//!   dispatches decoded calls, and [`HttpServer`](server::HttpServer) exposes it over HTTP.
//!
//! ## Value Transcoding
//!
//! The binary protocol is self-describing, so any reply can be decoded into a
//! [`Value`](value::Value) and rendered as `serde_json::Value` without knowing the IDL.
//!
//! See the README.md for more details about usage.
pub mod client;
pub mod exception;
pub mod processor;
pub mod protocol;
pub mod server;
pub mod transport;
pub mod value;

// Re-exports
pub use async_trait::async_trait;
pub use bytes;
