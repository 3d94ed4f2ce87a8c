use std::sync::atomic::{AtomicU64, Ordering};

use deta_client::{ClientConfig, ClientError, Clock, Dispatcher, Request};
use deta_credentials::{
    CONTENT_TYPE_HEADER, Credential, RESOURCE_ADDRESS_HEADER, SIGNATURE_HEADER, TIMESTAMP_HEADER,
};
use serde_json::json;
use testresult::TestResult;

use crate::server::{GATEWAY, TOKEN, TestServer};

/// A clock that advances one second per reading.
#[derive(Debug)]
struct SteppingClock(AtomicU64);

impl SteppingClock {
    fn starting_at(seconds: u64) -> Self {
        Self(AtomicU64::new(seconds))
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst)
    }
}

fn dispatcher(server: &TestServer) -> Dispatcher {
    let credential: Credential = TOKEN.parse().unwrap();
    Dispatcher::new(&server.config(), credential).unwrap()
}

#[tokio::test]
async fn it_sends_requests_the_server_can_verify() -> TestResult {
    let server = TestServer::start().await;
    let response = dispatcher(&server).send(&Request::get("/echo")).await?;

    assert!(response.status().is_success());
    let seen = server.last();
    assert_eq!(seen.method, "GET");
    assert_eq!(seen.header(CONTENT_TYPE_HEADER), Some("application/json"));
    assert!(seen.header(SIGNATURE_HEADER).unwrap().starts_with("v0=abc123:"));
    Ok(())
}

#[tokio::test]
async fn it_signs_each_send_with_its_own_timestamp() -> TestResult {
    let server = TestServer::start().await;
    let dispatcher = dispatcher(&server).with_clock(SteppingClock::starting_at(1700000000));
    let request = Request::post("/echo").with_json(json!({"name": "hello"}));

    dispatcher.send(&request).await?;
    dispatcher.send(&request).await?;

    let requests = server.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].header(TIMESTAMP_HEADER), Some("1700000000"));
    assert_eq!(requests[1].header(TIMESTAMP_HEADER), Some("1700000001"));
    assert_ne!(
        requests[0].header(SIGNATURE_HEADER),
        requests[1].header(SIGNATURE_HEADER)
    );
    assert_eq!(requests[0].body, requests[1].body);
    Ok(())
}

#[tokio::test]
async fn it_transmits_the_bytes_it_signed() -> TestResult {
    let server = TestServer::start().await;
    let body = json!({"spaceID": 42, "project": "default", "name": "hello"});

    let response = dispatcher(&server)
        .send(&Request::post("/echo").with_json(body.clone()))
        .await?;

    let seen = server.last();
    assert_eq!(seen.body, serde_json::to_vec(&body)?);
    assert_eq!(response.json::<serde_json::Value>()?, body);
    Ok(())
}

#[tokio::test]
async fn it_sends_falsy_bodies_as_empty_payloads() -> TestResult {
    let server = TestServer::start().await;
    let dispatcher = dispatcher(&server);

    for body in [json!({}), json!([]), json!(null), json!(false), json!(0), json!("")] {
        dispatcher
            .send(&Request::post("/echo").with_json(body))
            .await?;
    }

    let requests = server.requests();
    assert_eq!(requests.len(), 6);
    // Each was accepted, so the server verified an empty body as well.
    assert!(requests.iter().all(|request| request.body.is_empty()));
    Ok(())
}

#[tokio::test]
async fn it_sends_raw_bodies_with_their_content_type() -> TestResult {
    let server = TestServer::start().await;

    dispatcher(&server)
        .send(&Request::post("/echo").with_raw_body(vec![0u8, 1, 2], "application/octet-stream"))
        .await?;

    let seen = server.last();
    assert_eq!(seen.body, vec![0u8, 1, 2]);
    assert_eq!(seen.header(CONTENT_TYPE_HEADER), Some("application/octet-stream"));
    Ok(())
}

#[tokio::test]
async fn it_forwards_query_and_caller_headers() -> TestResult {
    let server = TestServer::start().await;

    dispatcher(&server)
        .send(
            &Request::get("/echo")
                .with_query("last", "abc")
                .with_header(RESOURCE_ADDRESS_HEADER, "YXdzOjE6cg==")
                .with_header("X-Trace", "t-1"),
        )
        .await?;

    let seen = server.last();
    assert_eq!(seen.path, "/echo");
    assert_eq!(seen.query.as_deref(), Some("last=abc"));
    assert_eq!(seen.header(RESOURCE_ADDRESS_HEADER), Some("YXdzOjE6cg=="));
    assert_eq!(seen.header("x-trace"), Some("t-1"));
    Ok(())
}

#[tokio::test]
async fn it_sends_config_headers_on_every_request() -> TestResult {
    let server = TestServer::start().await;
    let config = server.config().with_header("User-Agent", "deta-client-tests");
    let dispatcher = Dispatcher::new(&config, TOKEN.parse()?)?;

    dispatcher.send(&Request::get("/echo")).await?;

    assert_eq!(server.last().header("user-agent"), Some("deta-client-tests"));
    Ok(())
}

#[tokio::test]
async fn it_sends_under_the_host_path_prefix() -> TestResult {
    let server = TestServer::start().await;
    let config = ClientConfig::new(format!("{}{GATEWAY}/", server.url));
    let dispatcher = Dispatcher::new(&config, TOKEN.parse()?)?;

    let response = dispatcher.send(&Request::post("/echo").with_json(json!({"a": 1}))).await?;

    assert!(response.status().is_success());
    assert_eq!(server.last().path, format!("{GATEWAY}/echo"));
    Ok(())
}

#[tokio::test]
async fn it_refuses_paths_the_url_would_rewrite_before_sending() {
    let server = TestServer::start().await;
    let dispatcher = dispatcher(&server);

    for path in ["/programs/../spaces/", "/programs/caf\u{e9}", "/echo/./"] {
        assert!(
            matches!(
                dispatcher.send(&Request::get(path)).await,
                Err(ClientError::InvalidRequest(_))
            ),
            "{path:?} should be refused"
        );
    }
    assert!(server.requests().is_empty());
}

#[tokio::test]
async fn it_rejects_reserved_headers_before_sending() {
    let server = TestServer::start().await;

    let result = dispatcher(&server)
        .send(&Request::get("/echo").with_header("content-type", "text/plain"))
        .await;

    assert!(matches!(result, Err(ClientError::ReservedHeader(name)) if name == "content-type"));
    assert!(server.requests().is_empty());
}

#[tokio::test]
async fn it_surfaces_rejected_signatures() {
    let server = TestServer::start().await;
    let credential: Credential = "abc123_wrong".parse().unwrap();
    let dispatcher = Dispatcher::new(&server.config(), credential).unwrap();

    let result = dispatcher.send(&Request::get("/echo")).await;

    assert!(matches!(
        result,
        Err(ClientError::AuthRejected { status: 401, ref body }) if body == "signature mismatch"
    ));
    assert_eq!(server.requests().len(), 1);
}

#[tokio::test]
async fn it_maps_error_statuses() {
    let server = TestServer::start().await;
    let dispatcher = dispatcher(&server);

    let result = dispatcher.send(&Request::get("/status/403")).await;
    assert!(matches!(result, Err(ClientError::AuthRejected { status: 403, .. })));

    let result = dispatcher.send(&Request::get("/status/404")).await;
    assert!(matches!(result, Err(ClientError::NotFound { ref body }) if body == "status 404"));

    let result = dispatcher.send(&Request::get("/status/409")).await;
    assert!(matches!(result, Err(ClientError::Conflict { .. })));

    let error = dispatcher
        .send(&Request::get("/status/503"))
        .await
        .unwrap_err();
    assert!(matches!(error, ClientError::Status { status: 503, .. }));
    assert_eq!(error.status(), Some(503));
}

#[tokio::test]
async fn it_reports_transport_failures() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = ClientConfig::new(format!("http://{addr}"));
    let dispatcher = Dispatcher::new(&config, TOKEN.parse().unwrap()).unwrap();

    let result = dispatcher.send(&Request::get("/spaces/")).await;
    assert!(matches!(result, Err(ClientError::Transport(_))));
}
