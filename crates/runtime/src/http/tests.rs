use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::*;

async fn transport_for(server: &MockServer) -> HttpTransport {
	HttpTransport::new(&format!("{}/rpc", server.uri())).unwrap()
}

#[tokio::test]
async fn test_send_posts_jsonrpc_and_returns_result() {
	let server = MockServer::start().await;
	Mock::given(method("POST"))
		.and(path("/rpc"))
		.respond_with(ResponseTemplate::new(200).set_body_json(json!({
			"jsonrpc": "2.0",
			"id": 1,
			"result": {"provider": {"id": "gw", "providerType": "remote"}, "connection": {"isConnected": false}}
		})))
		.expect(1)
		.mount(&server)
		.await;

	let transport = transport_for(&server).await;
	let result = transport.send("status", Value::Null).await.unwrap();
	assert_eq!(result["connection"]["isConnected"], false);

	let requests = server.received_requests().await.unwrap();
	let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
	assert_eq!(body["jsonrpc"], "2.0");
	assert_eq!(body["method"], "status");
	assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_send_attaches_bearer_token() {
	let server = MockServer::start().await;
	Mock::given(method("POST"))
		.and(path("/rpc"))
		.and(header("authorization", "Bearer secret"))
		.respond_with(ResponseTemplate::new(200).set_body_json(json!({"jsonrpc": "2.0", "id": 1, "result": []})))
		.expect(1)
		.mount(&server)
		.await;
	Mock::given(method("GET"))
		.and(path("/rpc/events"))
		.respond_with(ResponseTemplate::new(200).set_body_raw("", "text/event-stream"))
		.mount(&server)
		.await;

	let transport = transport_for(&server).await;
	transport.set_token(Some("secret".into()));
	let result = transport.send("listAccounts", Value::Null).await.unwrap();
	assert_eq!(result, json!([]));
}

#[tokio::test]
async fn test_rpc_error_body_is_forwarded() {
	let server = MockServer::start().await;
	Mock::given(method("POST"))
		.respond_with(ResponseTemplate::new(401).set_body_json(json!({
			"error": {"code": 401, "message": "Unauthorized", "data": {"reason": "expired"}}
		})))
		.mount(&server)
		.await;

	let transport = transport_for(&server).await;
	let err = transport.send("status", Value::Null).await.unwrap_err();
	match err {
		Error::Rpc { code, message, data } => {
			assert_eq!(code, 401);
			assert_eq!(message, "Unauthorized");
			assert_eq!(data.unwrap()["reason"], "expired");
		}
		other => panic!("Expected Rpc error, got {other:?}"),
	}
}

#[tokio::test]
async fn test_http_failure_without_rpc_body() {
	let server = MockServer::start().await;
	Mock::given(method("POST"))
		.respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
		.mount(&server)
		.await;

	let transport = transport_for(&server).await;
	let err = transport.send("status", Value::Null).await.unwrap_err();
	assert_eq!(err.kind(), crate::ErrorKind::TransportError);
	assert!(err.to_string().contains("502"), "{err}");
}

#[tokio::test]
async fn test_event_stream_dispatches_named_events() {
	let server = MockServer::start().await;
	let body = concat!(
		"event: statusChanged\n",
		"data: [{\"connection\":{\"isConnected\":true}}]\n\n",
		"event: txChanged\n",
		"data: {\"status\":\"pending\",\"commandId\":\"cmd-1\"}\n\n",
	);
	Mock::given(method("GET"))
		.and(path("/rpc/events"))
		.and(query_param("token", "tok"))
		.respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
		.mount(&server)
		.await;

	let transport = transport_for(&server).await;
	let seen: Arc<Mutex<Vec<(String, Value)>>> = Arc::new(Mutex::new(Vec::new()));
	let status_seen = Arc::clone(&seen);
	let _status = transport.events().on("statusChanged", move |payload| {
		status_seen.lock().push(("statusChanged".into(), payload.clone()));
	});
	let tx_seen = Arc::clone(&seen);
	let _tx = transport.events().on("txChanged", move |payload| {
		tx_seen.lock().push(("txChanged".into(), payload.clone()));
	});

	transport.set_token(Some("tok".into()));

	tokio::time::timeout(Duration::from_secs(5), async {
		while seen.lock().len() < 2 {
			tokio::time::sleep(Duration::from_millis(10)).await;
		}
	})
	.await
	.unwrap();

	let seen = seen.lock();
	assert_eq!(seen[0].0, "statusChanged");
	assert_eq!(seen[0].1["connection"]["isConnected"], true);
	assert_eq!(seen[1].0, "txChanged");
	assert_eq!(seen[1].1["commandId"], "cmd-1");
}

#[tokio::test]
async fn test_set_token_same_value_keeps_stream() {
	let server = MockServer::start().await;
	Mock::given(method("GET"))
		.and(path("/rpc/events"))
		.respond_with(
			ResponseTemplate::new(200)
				.set_body_raw("", "text/event-stream")
				.set_delay(Duration::from_secs(30)),
		)
		.mount(&server)
		.await;

	let transport = transport_for(&server).await;
	transport.set_token(Some("a".into()));
	assert!(transport.events_open());
	transport.set_token(Some("a".into()));
	assert!(transport.events_open());

	transport.set_token(None);
	assert!(!transport.events_open());
	assert!(transport.token().is_none());
}

#[tokio::test]
async fn test_set_token_same_value_revives_dead_stream() {
	let server = MockServer::start().await;
	let transport = transport_for(&server).await;

	// No events route yet: the stream is rejected with a 404 and dies.
	transport.set_token(Some("t".into()));
	tokio::time::timeout(Duration::from_secs(5), async {
		while transport.events_open() {
			tokio::time::sleep(Duration::from_millis(10)).await;
		}
	})
	.await
	.expect("rejected stream should stop");

	Mock::given(method("GET"))
		.and(path("/rpc/events"))
		.and(query_param("token", "t"))
		.respond_with(
			ResponseTemplate::new(200)
				.set_body_raw("", "text/event-stream")
				.set_delay(Duration::from_secs(30)),
		)
		.mount(&server)
		.await;

	transport.set_token(Some("t".into()));
	assert!(transport.events_open());
	assert_eq!(transport.token().as_deref(), Some("t"));

	tokio::time::timeout(Duration::from_secs(5), async {
		loop {
			let gets = server
				.received_requests()
				.await
				.unwrap()
				.iter()
				.filter(|r| r.method.as_str() == "GET")
				.count();
			if gets == 2 {
				break;
			}
			tokio::time::sleep(Duration::from_millis(10)).await;
		}
	})
	.await
	.expect("stream reopened");
	transport.close_events();
}

#[test]
fn test_events_url() {
	let transport = HttpTransport::new("https://gw.example/rpc/").unwrap();
	let url = transport.events_url("a b").unwrap();
	assert_eq!(url.as_str(), "https://gw.example/rpc/events?token=a+b");
}

#[test]
fn test_parse_event_data() {
	assert_eq!(parse_event_data("[{\"a\":1}]"), json!({"a": 1}));
	assert_eq!(parse_event_data("[1,2]"), json!([1, 2]));
	assert_eq!(parse_event_data("not json"), json!("not json"));
}

#[test]
fn test_invalid_url_is_rejected() {
	let err = HttpTransport::new("not a url").err().unwrap();
	assert!(matches!(err, Error::Url(_)));
}
