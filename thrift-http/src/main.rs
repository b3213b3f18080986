//! # thrift-http CLI Entry Point
//!
//! The main executable. This file drives the application lifecycle:
//!
//! 1. **Initialization**: Parses command-line arguments using [`cli::Cli`] and installs the log subscriber.
//! 2. **Connection**: Builds and opens an HTTP transport to the target endpoint.
//! 3. **Execution**: Runs the call through the `hello` stub or the dynamic `RpcClient`, or serves the example service.
//! 4. **Presentation**: Prints the result as pretty JSON to standard output, errors to standard error.

mod cli;
mod formatter;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Commands, ConnectionArgs};
use formatter::{FormattedString, GenericError};
use hello_service::{GreetingHandler, SERVICE_NAME, TestClient, TestProcessor};
use std::process;
use thrift_http_core::client::{DynamicRequest, RpcClient};
use thrift_http_core::server::{self, HttpServer};
use thrift_http_core::transport::HttpTransport;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let args = Cli::parse();

    // Clients stay quiet unless RUST_LOG says otherwise, the server reports what it serves.
    let default_level = match args.command {
        Commands::Serve { .. } => "info",
        _ => "warn",
    };
    init_tracing(default_level);

    match args.command {
        Commands::Hello {
            name,
            url,
            connection,
        } => run_hello(&url, &name, connection).await,
        Commands::Call {
            url,
            method,
            args,
            oneway,
            connection,
        } => {
            let request = DynamicRequest {
                method,
                args: serde_json::Value::Array(args),
                oneway,
            };
            run_call(&url, request, connection).await
        }
        Commands::Serve {
            addr,
            path,
            any_path,
        } => {
            let path = (!any_path).then_some(path);
            if let Err(err) = run_serve(&addr, path).await {
                eprintln!(
                    "{}",
                    FormattedString::from(GenericError("Server Failed:", format!("{err:#}")))
                );
                process::exit(1);
            }
        }
    }
}

fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn transport_or_exit(url: &str, connection: ConnectionArgs) -> HttpTransport {
    let mut builder = HttpTransport::builder(url).headers(connection.headers);
    if let Some(timeout) = connection.timeout {
        builder = builder.timeout(timeout);
    }

    match builder.build() {
        Ok(transport) => transport,
        Err(err) => {
            eprintln!("{}", FormattedString::from(err));
            process::exit(1);
        }
    }
}

async fn run_hello(url: &str, name: &str, connection: ConnectionArgs) {
    let mut client = TestClient::new(transport_or_exit(url, connection));

    if let Err(err) = client.open().await {
        eprintln!("{}", FormattedString::from(err));
        process::exit(1);
    }

    match client.hello(name).await {
        Ok(greeting) => {
            println!("{}", FormattedString::from(serde_json::Value::String(greeting)))
        }
        Err(err) => {
            eprintln!("{}", FormattedString::from(err));
            process::exit(1);
        }
    }

    if let Err(err) = client.close().await {
        tracing::warn!(error = %err, "failed to close the transport");
    }
}

async fn run_call(url: &str, request: DynamicRequest, connection: ConnectionArgs) {
    let mut client = RpcClient::new(transport_or_exit(url, connection));

    if let Err(err) = client.open().await {
        eprintln!("{}", FormattedString::from(err));
        process::exit(1);
    }

    let response = match client.dynamic(request).await {
        Ok(response) => response,
        Err(err) => {
            eprintln!("{}", FormattedString::from(err));
            process::exit(1);
        }
    };

    if let Err(err) = client.close().await {
        tracing::warn!(error = %err, "failed to close the transport");
    }

    if let Some(output) = formatter::response_output(&response) {
        println!("{output}");
    } else if let Some(failure) = formatter::response_failure(response) {
        eprintln!("{failure}");
        process::exit(1);
    }
}

async fn run_serve(addr: &str, path: Option<String>) -> anyhow::Result<()> {
    let listener = server::bind(addr).await?;

    let server = HttpServer::new(TestProcessor::new(GreetingHandler));
    let server = match path {
        Some(path) => server.with_path(path),
        None => server.any_path(),
    };

    tracing::info!(service = SERVICE_NAME, "starting the example server");

    server
        .serve_with_shutdown(listener, async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %err, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
        })
        .await
        .with_context(|| format!("serving the {SERVICE_NAME} service on {addr}"))
}
