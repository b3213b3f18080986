use hello_service::{GreetingHandler, HandlerError, TestClient, TestHandler, TestProcessor};
use scripted_processor::ScriptedProcessor;
use serde_json::json;
use thrift_http_core::async_trait;
use thrift_http_core::client::{CallError, DynamicRequest, DynamicResponse, RpcClient};
use thrift_http_core::exception::ApplicationExceptionKind;
use thrift_http_core::transport::{ProcessorTransport, TransportError};
use thrift_http_core::value::Value;


struct FailingHandler;

#[async_trait]
impl TestHandler for FailingHandler {
    async fn hello(&self, _name: String) -> Result<String, HandlerError> {
        Err("database is down".into())
    }
}

fn greeting_transport() -> ProcessorTransport<TestProcessor<GreetingHandler>> {
    ProcessorTransport::new(TestProcessor::new(GreetingHandler))
}

#[tokio::test]
async fn test_typed_hello() {
    let mut client = TestClient::new(greeting_transport());
    client.open().await.unwrap();

    assert_eq!(client.hello("world").await.unwrap(), "hello world");

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_call_before_open_fails() {
    let mut client = TestClient::new(greeting_transport());

    let err = client.hello("world").await.unwrap_err();
    assert!(matches!(
        err,
        CallError::Transport(TransportError::NotOpen)
    ));
}

#[tokio::test]
async fn test_call_after_close_fails() {
    let mut client = TestClient::new(greeting_transport());
    client.open().await.unwrap();
    client.hello("first").await.unwrap();
    client.close().await.unwrap();

    let err = client.hello("second").await.unwrap_err();
    assert!(matches!(
        err,
        CallError::Transport(TransportError::NotOpen)
    ));
}

#[tokio::test]
async fn test_sequence_ids_advance_per_call() {
    let mut client = TestClient::new(greeting_transport());
    client.open().await.unwrap();

    for name in ["a", "b", "c"] {
        assert_eq!(client.hello(name).await.unwrap(), format!("hello {name}"));
    }
}

#[tokio::test]
async fn test_handler_failure_is_an_internal_error() {
    let mut client = TestClient::new(ProcessorTransport::new(TestProcessor::new(FailingHandler)));
    client.open().await.unwrap();

    match client.hello("world").await.unwrap_err() {
        CallError::Application(exception) => {
            assert_eq!(exception.kind, ApplicationExceptionKind::InternalError);
            assert!(exception.message.contains("database is down"));
        }
        other => panic!("Expected an application exception, got {other:?}"),
    }
}

#[tokio::test]
async fn test_dynamic_hello() {
    let mut client = RpcClient::new(greeting_transport());
    client.open().await.unwrap();

    let response = client
        .dynamic(DynamicRequest::new("hello", json!(["world"])))
        .await
        .unwrap();

    assert_eq!(response, DynamicResponse::Success(json!("hello world")));
}

#[tokio::test]
async fn test_dynamic_hello_with_explicit_field_ids() {
    let mut client = RpcClient::new(greeting_transport());
    client.open().await.unwrap();

    let response = client
        .dynamic(DynamicRequest::new("hello", json!({ "1": "thrift" })))
        .await
        .unwrap();

    assert_eq!(response, DynamicResponse::Success(json!("hello thrift")));
}

#[tokio::test]
async fn test_dynamic_unknown_method() {
    let mut client = RpcClient::new(greeting_transport());
    client.open().await.unwrap();

    let response = client
        .dynamic(DynamicRequest::new("goodbye", json!([])))
        .await
        .unwrap();

    match response {
        DynamicResponse::ApplicationException(exception) => {
            assert_eq!(exception.kind, ApplicationExceptionKind::UnknownMethod);
        }
        other => panic!("Expected an application exception, got {other:?}"),
    }
}

#[tokio::test]
async fn test_dynamic_oneway_gets_no_result() {
    let mut client = RpcClient::new(greeting_transport());
    client.open().await.unwrap();

    let request = DynamicRequest {
        oneway: true,
        ..DynamicRequest::new("hello", json!(["world"]))
    };

    assert_eq!(client.dynamic(request).await.unwrap(), DynamicResponse::Oneway);
    // The connection stays usable for regular calls.
    assert_eq!(
        client.call("hello", &[(1, Value::string("again"))]).await.unwrap(),
        vec![(0, Value::string("hello again"))]
    );
}

#[tokio::test]
async fn test_mistyped_argument_is_ignored_by_the_stub() {
    let mut client = RpcClient::new(greeting_transport());
    client.open().await.unwrap();

    let fields = client.call("hello", &[(1, Value::I32(5))]).await.unwrap();
    assert_eq!(fields, vec![(0, Value::string("hello "))]);
}

#[tokio::test]
async fn test_reply_for_another_method_is_rejected() {
    let processor = ScriptedProcessor {
        method_override: Some("goodbye"),
        ..ScriptedProcessor::replying("hello world")
    };
    let mut client = TestClient::new(ProcessorTransport::new(processor));
    client.open().await.unwrap();

    match client.hello("world").await.unwrap_err() {
        CallError::WrongMethodName { expected, received } => {
            assert_eq!(expected, "hello");
            assert_eq!(received, "goodbye");
        }
        other => panic!("Expected WrongMethodName, got {other:?}"),
    }
}

#[tokio::test]
async fn test_reply_with_another_sequence_id_is_rejected() {
    let processor = ScriptedProcessor {
        sequence_offset: 1,
        ..ScriptedProcessor::replying("hello world")
    };
    let mut client = TestClient::new(ProcessorTransport::new(processor));
    client.open().await.unwrap();

    assert!(matches!(
        client.hello("world").await.unwrap_err(),
        CallError::BadSequenceId {
            expected: 1,
            received: 2
        }
    ));
}
