//! In-process stand-in for the API and drive hosts.
//!
//! Every request to the API side must carry a valid signature for
//! [`TOKEN`]; anything else gets a 401, like the real front door. Requests
//! are recorded so tests can inspect exactly what went over the wire.

use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use deta_client::ClientConfig;
use deta_credentials::{
    CONTENT_TYPE_HEADER, RESOURCE_ADDRESS_HEADER, ResourceAddress, SIGNATURE_HEADER,
    TIMESTAMP_HEADER, sign,
};
use serde_json::{Value, json};
use tokio::net::TcpListener;

pub const TOKEN: &str = "abc123_s3cr3t";
pub const SPACE: u64 = 42;
pub const ACCOUNT: &str = "123456789012";
pub const REGION: &str = "us-east-1";
pub const PROGRAM_ID: &str = "a1b2c3";
pub const DRIVE_KEY: &str = "proj1_k3y";

/// Path prefix of a reverse proxy in front of the server. Requests under it
/// are served as if it were absent.
pub const GATEWAY: &str = "/gateway";

/// A request as the server saw it.
#[derive(Clone, Debug)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl Recorded {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// Path with the [`GATEWAY`] prefix stripped.
    pub fn local_path(&self) -> &str {
        self.path.strip_prefix(GATEWAY).unwrap_or(&self.path)
    }

    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap_or(Value::Null)
    }
}

#[derive(Clone)]
struct ServerState {
    token: String,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

pub struct TestServer {
    pub url: String,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl TestServer {
    pub async fn start() -> Self {
        init_tracing();

        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = ServerState {
            token: TOKEN.to_string(),
            requests: requests.clone(),
        };

        let app = Router::new().fallback(handle).with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{}", addr),
            requests,
        }
    }

    /// A configuration pointing both hosts at this server.
    pub fn config(&self) -> ClientConfig {
        ClientConfig::new(&self.url).with_drive_host(&self.url)
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last(&self) -> Recorded {
        self.requests()
            .pop()
            .expect("server has not received any request")
    }
}

pub fn program_json() -> Value {
    json!({
        "id": PROGRAM_ID,
        "space": SPACE,
        "name": "hello",
        "runtime": "python3.9",
        "account": ACCOUNT,
        "region": REGION,
        "project": "default",
        "memory": 128,
        "timeout": 10
    })
}

pub fn resource_address() -> String {
    ResourceAddress::new(ACCOUNT, REGION).encode()
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

async fn handle(
    State(state): State<ServerState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request = Recorded {
        method: method.to_string(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        headers,
        body: body.to_vec(),
    };
    state.requests.lock().unwrap().push(request.clone());

    if request.local_path().starts_with("/v1/") {
        return drive(&request);
    }

    if let Err(reason) = verify(&state.token, &request) {
        return (StatusCode::UNAUTHORIZED, reason).into_response();
    }

    route(&request)
}

fn verify(token: &str, request: &Recorded) -> Result<(), String> {
    let timestamp = request
        .header(TIMESTAMP_HEADER)
        .ok_or("missing timestamp")?
        .parse::<u64>()
        .map_err(|e| e.to_string())?;
    let content_type = request
        .header(CONTENT_TYPE_HEADER)
        .ok_or("missing content type")?;
    let signature = request
        .header(SIGNATURE_HEADER)
        .ok_or("missing signature")?;

    let expected = sign(
        token,
        &request.method,
        request.local_path(),
        timestamp,
        content_type,
        &request.body,
    )
    .map_err(|e| e.to_string())?;

    if signature != expected {
        return Err("signature mismatch".into());
    }
    Ok(())
}

fn requires_shard(request: &Recorded) -> Option<Response> {
    if request.header(RESOURCE_ADDRESS_HEADER) == Some(resource_address().as_str()) {
        None
    } else {
        Some((StatusCode::BAD_REQUEST, "unknown resource address").into_response())
    }
}

fn route(request: &Recorded) -> Response {
    let program = format!("/programs/{PROGRAM_ID}");
    let program_envs = format!("/programs/{PROGRAM_ID}/envs");
    let program_alias = format!("/programs/{PROGRAM_ID}/alias");
    let archive = format!("/viewer/archives/{PROGRAM_ID}");

    match (request.method.as_str(), request.local_path()) {
        (_, "/echo") => (StatusCode::OK, request.body.clone()).into_response(),
        (_, path) if path.starts_with("/status/") => {
            let code = path["/status/".len()..].parse::<u16>().unwrap_or(500);
            let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, format!("status {code}")).into_response()
        }

        ("GET", "/spaces/") => Json(json!([
            {"spaceID": SPACE, "name": "alice", "role": "admin"},
            {"spaceID": "team-7", "name": "team", "role": "member"}
        ]))
        .into_response(),
        ("GET", "/spaces/42/projects") => Json(json!({
            "projects": [
                {"id": "p1", "name": "default", "space": SPACE, "region": "eu-central-1"},
                {"id": "p2", "name": "other"}
            ]
        }))
        .into_response(),
        ("GET", "/spaces/42/projects/p1/bases") => Json(json!({"bases": ["users"]})).into_response(),
        ("GET", "/projects/p1/keys") => {
            Json(json!({"keys": [{"name": "default", "prefix": "p1"}]})).into_response()
        }
        ("DELETE", "/spaces/42/projects/default/bases/users") => {
            Json(json!({"name": "users"})).into_response()
        }
        ("GET", "/spaces/42/projects/default/programs/hello") => {
            Json(program_json()).into_response()
        }
        ("POST", "/programs/") => {
            let body = request.json();
            if body["name"] == "taken" {
                return Json(json!({"errors": ["a program with this name already exists"]}))
                    .into_response();
            }
            let mut created = program_json();
            created["name"] = body["name"].clone();
            created["runtime"] = body["runtime"].clone();
            created["project"] = body["project"].clone();
            Json(created).into_response()
        }
        ("PATCH", path) if path == program => Json(json!({})).into_response(),
        ("PATCH", path) if path == program_envs => {
            requires_shard(request).unwrap_or_else(|| Json(json!({"updated": true})).into_response())
        }
        ("PATCH", path) if path == program_alias => Json(request.json()).into_response(),
        ("GET", path) if path == archive => requires_shard(request).unwrap_or_else(|| {
            (
                StatusCode::OK,
                [("content-type", "application/zip")],
                b"PK\x03\x04archive".to_vec(),
            )
                .into_response()
        }),
        ("POST", "/patcher/") => requires_shard(request)
            .unwrap_or_else(|| Json(json!({"pid": request.json()["pid"]})).into_response()),
        ("POST", "/pigeon/commands") => Json(json!({"queued": request.json()})).into_response(),
        ("DELETE", path) if path == program => StatusCode::OK.into_response(),
        _ => (StatusCode::NOT_FOUND, r#"{"errors":["not found"]}"#).into_response(),
    }
}

fn drive(request: &Recorded) -> Response {
    if request.header("x-api-key") != Some(DRIVE_KEY) {
        return (StatusCode::UNAUTHORIZED, "bad project key").into_response();
    }

    match request.local_path() {
        "/v1/proj1/" => Json(json!({
            "names": ["a.txt", "logo.png"],
            "paging": {"size": 2}
        }))
        .into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}
