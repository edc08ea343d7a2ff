//! In-process stand-in for the projector's web server, used by tests.

use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{Arc, Mutex},
};

use axum::{
    extract::{Query, RawQuery, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tokio::net::TcpListener;

use crate::config::{Config, DigestCredentials};

use super::{
    digest::{authorization_inner, parse_params, Algorithm, DigestChallenge, DigestContext},
    CONTROL_PATH,
};

#[derive(Debug, Clone)]
pub(crate) struct RecordedRequest {
    /// Query string exactly as it arrived on the wire.
    pub raw_query: String,
    /// Decoded `jsoncallback` value.
    pub command: String,
    pub referer: Option<String>,
    pub authorization: Option<String>,
}

#[derive(Debug)]
struct FakeState {
    power: String,
    status: StatusCode,
    body: Option<String>,
    digest: Option<DigestCredentials>,
    requests: Vec<RecordedRequest>,
}

#[derive(Debug, Clone)]
pub(crate) struct FakeProjector {
    state: Arc<Mutex<FakeState>>,
}

impl FakeProjector {
    pub const SET_REPLY: &'static str = "SUCCESS";

    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeState {
                power: "00".to_owned(),
                status: StatusCode::OK,
                body: None,
                digest: None,
                requests: Vec::new(),
            })),
        }
    }

    pub fn with_digest(username: &str, password: &str) -> Self {
        let fake = Self::new();
        fake.state.lock().unwrap().digest = Some(DigestCredentials {
            username: username.to_owned(),
            password: password.to_owned(),
        });
        fake
    }

    /// Two-digit reply to `PWR?`.
    pub fn set_power(&self, code: &str) {
        self.state.lock().unwrap().power = code.to_owned();
    }

    pub fn power(&self) -> String {
        self.state.lock().unwrap().power.clone()
    }

    /// Forces every response to `status`.
    pub fn set_status(&self, status: StatusCode) {
        self.state.lock().unwrap().status = status;
    }

    /// Forces every 200 response body to `body`.
    pub fn set_body(&self, body: &str) {
        self.state.lock().unwrap().body = Some(body.to_owned());
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    pub async fn spawn(&self) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new()
            .route(CONTROL_PATH, get(handle))
            .with_state(self.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }
}

fn challenge() -> DigestChallenge {
    DigestChallenge {
        realm: "EPSON_PROJECTOR".to_owned(),
        nonce: "4f1a7c0b9e".to_owned(),
        opaque: Some("c0ffee".to_owned()),
        qop_auth: true,
        algorithm: Algorithm::Md5,
    }
}

fn digest_is_valid(credentials: &DigestCredentials, authorization: &str) -> bool {
    let Some(params) = authorization.strip_prefix("Digest ") else {
        return false;
    };
    let params: HashMap<String, String> = parse_params(params).into_iter().collect();
    let (Some(uri), Some(cnonce), Some(nc), Some(response)) = (
        params.get("uri"),
        params.get("cnonce"),
        params.get("nc").and_then(|nc| u32::from_str_radix(nc, 16).ok()),
        params.get("response"),
    ) else {
        return false;
    };

    let challenge = challenge();
    let expected = authorization_inner(&DigestContext {
        credentials,
        challenge: &challenge,
        method: "GET",
        uri: uri.as_str(),
        cnonce: cnonce.as_str(),
        nc,
    });
    expected.contains(&format!(r#"response="{response}""#))
}

async fn handle(
    State(fake): State<FakeProjector>,
    headers: HeaderMap,
    RawQuery(raw_query): RawQuery,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let header_str = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
    };
    let command = params.get("jsoncallback").cloned().unwrap_or_default();
    let authorization = header_str(header::AUTHORIZATION);

    let mut state = fake.state.lock().unwrap();
    state.requests.push(RecordedRequest {
        raw_query: raw_query.unwrap_or_default(),
        command: command.clone(),
        referer: header_str(header::REFERER),
        authorization: authorization.clone(),
    });

    if let Some(credentials) = &state.digest {
        let authorized = authorization
            .as_deref()
            .is_some_and(|a| digest_is_valid(credentials, a));
        if !authorized {
            let c = challenge();
            let www_authenticate = format!(
                r#"Digest realm="{}", qop="auth", nonce="{}", opaque="{}", algorithm=MD5"#,
                c.realm,
                c.nonce,
                c.opaque.unwrap_or_default()
            );
            return (
                StatusCode::UNAUTHORIZED,
                [(header::WWW_AUTHENTICATE, www_authenticate)],
            )
                .into_response();
        }
    }

    if state.status != StatusCode::OK {
        return state.status.into_response();
    }
    if let Some(body) = &state.body {
        return body.clone().into_response();
    }

    let reply = match command.as_str() {
        "PWR?" => state.power.clone(),
        "PWR ON" => {
            state.power = "02".to_owned();
            FakeProjector::SET_REPLY.to_owned()
        }
        "PWR OFF" => {
            state.power = "03".to_owned();
            FakeProjector::SET_REPLY.to_owned()
        }
        _ => "ERR".to_owned(),
    };

    Json(serde_json::json!({
        "projector": { "feature": { "error": false, "reply": reply } }
    }))
    .into_response()
}

/// Config pointing at a projector listening on `addr`.
pub(crate) fn test_config(addr: SocketAddr) -> Config {
    let env = HashMap::from([
        ("PROJECTOR_NAME", "Test Projector".to_owned()),
        ("PROJECTOR_MODEL", "EH-TW9400".to_owned()),
        ("PROJECTOR_SERIAL", "X4XK7300456".to_owned()),
        ("PROJECTOR_IP_ADDRESS", addr.to_string()),
        ("PROJECTOR_REFERER", "/cgi-bin/webconf".to_owned()),
        ("PROJECTOR_REQUEST_TIMEOUT_MS", "2000".to_owned()),
    ]);
    Config::from_lookup(|key| env.get(key).cloned()).unwrap()
}
