//! # CLI
//!
//! This module defines the command-line interface of `thrift-http` using `clap`.
//!
//! It is responsible for parsing user input and performing validation (e.g., ensuring headers are `key:value`
//! and arguments are valid JSON).
use clap::{Args, Parser, Subcommand};
use std::time::Duration;
use thrift_http_core::server::DEFAULT_PATH;

/// Endpoint of the example `Test` server.
pub const DEFAULT_URL: &str = "http://127.0.0.1:19090/api";
pub const DEFAULT_ADDR: &str = "127.0.0.1:19090";

#[derive(Parser)]
#[command(name = "thrift-http", version, about = "Thrift over HTTP CLI")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Call `hello` on the example `Test` service and print the greeting
    ///
    /// ## Examples:
    ///
    /// ```bash
    /// thrift-http hello
    /// thrift-http hello thrift --url http://127.0.0.1:19090/
    /// ```
    Hello {
        /// Who to greet
        #[arg(default_value = "world")]
        name: String,

        /// The endpoint to post frames to
        #[arg(long, default_value = DEFAULT_URL)]
        url: String,

        #[command(flatten)]
        connection: ConnectionArgs,
    },

    /// Perform a call without a client stub
    ///
    /// Every `--arg` is a JSON value and becomes the next argument field (1, 2, ...).
    ///
    /// ## Examples:
    ///
    /// ```bash
    /// thrift-http call http://127.0.0.1:19090/api hello --arg '"world"'
    /// thrift-http call http://127.0.0.1:19090/api add --arg '{"i32": 1}' --arg '{"i32": 2}'
    /// ```
    Call {
        /// The endpoint to post frames to (e.g. http://127.0.0.1:19090/api)
        url: String,

        /// Name of the remote method
        method: String,

        /// Argument as JSON (repeatable, in field id order)
        #[arg(short, long = "arg", value_parser = parse_json)]
        args: Vec<serde_json::Value>,

        /// Send the call as oneway and don't wait for a result
        #[arg(long)]
        oneway: bool,

        #[command(flatten)]
        connection: ConnectionArgs,
    },

    /// Run the example `Test` server
    Serve {
        /// Address to listen on
        #[arg(long, default_value = DEFAULT_ADDR)]
        addr: String,

        /// Path frames are accepted on
        #[arg(long, default_value = DEFAULT_PATH, conflicts_with = "any_path")]
        path: String,

        /// Accept frames on every path
        #[arg(long)]
        any_path: bool,
    },
}

#[derive(Args)]
pub struct ConnectionArgs {
    /// Extra HTTP header sent with every request (key:value)
    #[arg(short = 'H', long = "header", value_parser = parse_header)]
    pub headers: Vec<(String, String)>,

    /// Give up on connecting or waiting for a reply after this many seconds
    #[arg(long, value_parser = parse_timeout)]
    pub timeout: Option<Duration>,
}

fn parse_header(s: &str) -> Result<(String, String), String> {
    s.split_once(':')
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .ok_or_else(|| "Format must be 'key:value'".to_string())
}

fn parse_json(value: &str) -> Result<serde_json::Value, String> {
    serde_json::from_str(value)
        .map_err(|e| format!("Invalid JSON: {e} (strings must be quoted, e.g. '\"world\"')"))
}

fn parse_timeout(value: &str) -> Result<Duration, String> {
    let secs: f64 = value
        .parse()
        .map_err(|_| format!("Invalid timeout '{value}', expected a number of seconds"))?;
    Duration::try_from_secs_f64(secs).map_err(|e| format!("Invalid timeout '{value}': {e}"))
}
