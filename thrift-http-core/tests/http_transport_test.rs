use hello_service::{GreetingHandler, TestClient, TestProcessor};
use http::{Method, Request, StatusCode, header::ALLOW};
use http_body_util::{BodyExt, Full};
use hyper::{body::Incoming, service::service_fn};
use hyper_util::rt::TokioIo;
use scripted_processor::ScriptedProcessor;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use thrift_http_core::bytes::Bytes;
use thrift_http_core::client::{CallError, DynamicRequest, DynamicResponse, RpcClient};
use thrift_http_core::processor::Processor;
use thrift_http_core::protocol::{BinaryEncoder, MessageIdentifier, MessageType};
use thrift_http_core::server::HttpServer;
use thrift_http_core::transport::{HttpTransport, Transport, TransportError};
use thrift_http_core::value::{self, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;


struct RunningServer {
    addr: SocketAddr,
    base_url: String,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl RunningServer {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        self.handle.await.unwrap();
    }
}

async fn spawn_server<P: Processor>(server: HttpServer<P>) -> RunningServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();

    let handle = tokio::spawn(async move {
        server
            .serve_with_shutdown(listener, async {
                let _ = rx.await;
            })
            .await
            .unwrap();
    });

    RunningServer {
        addr,
        base_url: format!("http://{addr}"),
        shutdown: Some(tx),
        handle,
    }
}

async fn spawn_greeting_server() -> RunningServer {
    spawn_server(HttpServer::new(TestProcessor::new(GreetingHandler))).await
}

#[tokio::test]
async fn test_hello_over_http() {
    let server = spawn_greeting_server().await;

    let transport = HttpTransport::new(&server.url("/api")).unwrap();
    let mut client = TestClient::new(transport);
    client.open().await.unwrap();

    assert_eq!(client.hello("world").await.unwrap(), "hello world");

    client.close().await.unwrap();
    server.stop().await;
}

#[tokio::test]
async fn test_two_calls_after_one_open_reuse_the_connection() {
    let server = spawn_greeting_server().await;

    let mut client = TestClient::new(HttpTransport::new(&server.url("/api")).unwrap());
    client.open().await.unwrap();

    assert_eq!(client.hello("one").await.unwrap(), "hello one");
    assert_eq!(client.hello("two").await.unwrap(), "hello two");

    server.stop().await;
}

#[tokio::test]
async fn test_call_after_close_fails_deterministically() {
    let server = spawn_greeting_server().await;

    let mut client = TestClient::new(HttpTransport::new(&server.url("/api")).unwrap());
    client.open().await.unwrap();
    client.hello("world").await.unwrap();
    client.close().await.unwrap();

    assert!(!client.inner().is_open());
    assert!(matches!(
        client.hello("world").await.unwrap_err(),
        CallError::Transport(TransportError::NotOpen)
    ));

    server.stop().await;
}

#[tokio::test]
async fn test_no_server_listening() {
    // Grab a free port and release it so nothing listens there.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut transport = HttpTransport::new(&format!("http://{addr}/api")).unwrap();

    assert!(matches!(
        transport.open().await,
        Err(TransportError::ConnectionFailed(..))
    ));
    assert!(!transport.is_open());
}

#[tokio::test]
async fn test_wrong_path_is_not_found() {
    let server = spawn_greeting_server().await;

    let mut client = TestClient::new(HttpTransport::new(&server.url("/")).unwrap());
    client.open().await.unwrap();

    match client.hello("world").await.unwrap_err() {
        CallError::Transport(TransportError::HttpStatus(status)) => {
            assert_eq!(status.as_u16(), 404)
        }
        other => panic!("Expected an HTTP status error, got {other:?}"),
    }

    server.stop().await;
}

#[tokio::test]
async fn test_any_path_server_accepts_root() {
    let server =
        spawn_server(HttpServer::new(TestProcessor::new(GreetingHandler)).any_path()).await;

    let mut client = TestClient::new(HttpTransport::new(&server.base_url).unwrap());
    client.open().await.unwrap();

    assert_eq!(client.hello("root").await.unwrap(), "hello root");

    server.stop().await;
}

#[tokio::test]
async fn test_reply_for_another_method_is_rejected() {
    let processor = ScriptedProcessor {
        method_override: Some("goodbye"),
        ..ScriptedProcessor::replying("hello world")
    };
    let server = spawn_server(HttpServer::new(processor)).await;

    let mut client = TestClient::new(HttpTransport::new(&server.url("/api")).unwrap());
    client.open().await.unwrap();

    assert!(matches!(
        client.hello("world").await.unwrap_err(),
        CallError::WrongMethodName { .. }
    ));

    server.stop().await;
}

#[tokio::test]
async fn test_garbage_frame_is_a_bad_request() {
    let server = spawn_greeting_server().await;

    let mut transport = HttpTransport::new(&server.url("/api")).unwrap();
    transport.open().await.unwrap();

    match transport
        .exchange(thrift_http_core::bytes::Bytes::from_static(b"not thrift"))
        .await
    {
        Err(TransportError::HttpStatus(status)) => assert_eq!(status.as_u16(), 400),
        other => panic!("Expected a 400 response, got {other:?}"),
    }

    server.stop().await;
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let server = spawn_server(
        HttpServer::new(TestProcessor::new(GreetingHandler)).with_max_body(16),
    )
    .await;

    let mut client = TestClient::new(HttpTransport::new(&server.url("/api")).unwrap());
    client.open().await.unwrap();

    match client.hello("a name long enough to exceed the limit").await.unwrap_err() {
        CallError::Transport(TransportError::HttpStatus(status)) => {
            assert_eq!(status.as_u16(), 413)
        }
        other => panic!("Expected an HTTP status error, got {other:?}"),
    }

    server.stop().await;
}

#[tokio::test]
async fn test_timeout_bounds_slow_servers() {
    let processor = ScriptedProcessor {
        delay: Some(Duration::from_secs(5)),
        ..ScriptedProcessor::replying("late")
    };
    let server = spawn_server(HttpServer::new(processor)).await;

    let transport = HttpTransport::builder(server.url("/api"))
        .timeout(Duration::from_millis(100))
        .build()
        .unwrap();
    let mut client = TestClient::new(transport);
    client.open().await.unwrap();

    assert!(matches!(
        client.hello("world").await.unwrap_err(),
        CallError::Transport(TransportError::Timeout(_))
    ));

    server.stop().await;
}

#[tokio::test]
async fn test_dynamic_call_over_http() {
    let server = spawn_greeting_server().await;

    let transport = HttpTransport::builder(server.url("/api"))
        .header("x-request-id", "42")
        .build()
        .unwrap();
    let mut client = RpcClient::new(transport);
    client.open().await.unwrap();

    let response = client
        .dynamic(DynamicRequest::new("hello", json!(["world"])))
        .await
        .unwrap();
    assert_eq!(response, DynamicResponse::Success(json!("hello world")));

    client.close().await.unwrap();
    server.stop().await;
}

// Serves the greeting processor but drops every connection once its response is written.
async fn spawn_closing_server(accepted: Arc<AtomicUsize>) -> (String, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let processor = Arc::new(TestProcessor::new(GreetingHandler));

    let handle = tokio::spawn(async move {
        loop {
            let (stream, _) = listener.accept().await.unwrap();
            accepted.fetch_add(1, Ordering::SeqCst);

            let processor = Arc::clone(&processor);
            tokio::spawn(async move {
                let service = service_fn(move |request: Request<Incoming>| {
                    let processor = Arc::clone(&processor);
                    async move {
                        let frame = request.into_body().collect().await?.to_bytes();
                        let reply = processor.process(frame).await.unwrap();
                        Ok::<_, hyper::Error>(hyper::Response::new(Full::new(
                            reply.unwrap_or_default(),
                        )))
                    }
                });

                let _ = hyper::server::conn::http1::Builder::new()
                    .keep_alive(false)
                    .serve_connection(TokioIo::new(stream), service)
                    .await;
            });
        }
    });

    (format!("http://{addr}/api"), handle)
}

#[tokio::test]
async fn test_reconnects_after_the_server_closed_the_connection() {
    let accepted = Arc::new(AtomicUsize::new(0));
    let (url, handle) = spawn_closing_server(Arc::clone(&accepted)).await;

    let mut client = TestClient::new(HttpTransport::new(&url).unwrap());
    client.open().await.unwrap();

    assert_eq!(client.hello("one").await.unwrap(), "hello one");
    // Let the client notice the peer hung up while idle.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(client.hello("two").await.unwrap(), "hello two");

    assert!(client.inner().is_open());
    assert_eq!(accepted.load(Ordering::SeqCst), 2);

    client.close().await.unwrap();
    handle.abort();
}

#[tokio::test]
async fn test_oneway_call_gets_an_empty_ok() {
    let server = spawn_greeting_server().await;

    let mut transport = HttpTransport::new(&server.url("/api")).unwrap();
    transport.open().await.unwrap();

    let mut enc = BinaryEncoder::new();
    enc.write_message_begin(&MessageIdentifier::new("hello", MessageType::Oneway, 1));
    value::encode_struct(&[(1, Value::string("nobody"))], &mut enc);

    let reply = transport.exchange(enc.finish()).await.unwrap();
    assert!(reply.is_empty());

    // The connection stays usable for regular calls.
    let mut client = RpcClient::new(transport);
    client
        .call_oneway("hello", &[(1, Value::string("again"))])
        .await
        .unwrap();
    assert_eq!(
        client.call("hello", &[(1, Value::string("you"))]).await.unwrap(),
        vec![(0, Value::string("hello you"))]
    );

    server.stop().await;
}

#[tokio::test]
async fn test_non_post_request_is_not_allowed() {
    let server = spawn_greeting_server().await;

    let stream = TcpStream::connect(server.addr).await.unwrap();
    let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(stream))
        .await
        .unwrap();
    let driver = tokio::spawn(conn);

    let request = Request::builder()
        .method(Method::GET)
        .uri("/api")
        .header("host", server.addr.to_string())
        .body(Full::new(Bytes::new()))
        .unwrap();
    let response = sender.send_request(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.headers()[ALLOW], "POST");

    drop(sender);
    driver.abort();
    server.stop().await;
}
