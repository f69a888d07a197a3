//! In-process stand-in for the Bullhorn OAuth and REST endpoints, used by tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

use crate::bullhorn::BullhornClient;
use crate::config::{BullhornConfig, HttpConfig};

const CLIENT_ID: &str = "client-id";
const CLIENT_SECRET: &str = "client-secret";
const AUTH_CODE: &str = "22.auth=code";
const ACCESS_TOKEN: &str = "access-1";
const REST_TOKEN: &str = "rest-token-1";

#[derive(Debug, Clone, Default)]
pub struct MockState {
    pub candidates: HashMap<String, Value>,
    pub attempts: HashMap<String, u32>,
    pub logins: u32,
    not_found: HashSet<String>,
    transient: HashMap<String, u32>,
    throttled: HashMap<String, u32>,
}

#[derive(Clone)]
struct Shared {
    base_url: String,
    state: Arc<Mutex<MockState>>,
}

pub struct MockBullhorn {
    pub base_url: String,
    state: Arc<Mutex<MockState>>,
}

impl MockBullhorn {
    pub async fn start() -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let state = Arc::new(Mutex::new(MockState::default()));

        let app = Router::new()
            .route("/oauth/authorize", get(authorize))
            .route("/oauth/token", post(token))
            .route("/rest-services/login", post(login))
            .route("/rest-services/corp1/entity/Candidate/:id", post(update))
            .with_state(Shared {
                base_url: base_url.clone(),
                state: state.clone(),
            });
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, state }
    }

    pub fn state(&self) -> MockState {
        self.state.lock().unwrap().clone()
    }

    pub fn not_found(&self, id: &str) {
        self.state.lock().unwrap().not_found.insert(id.to_string());
    }

    /// The next `times` updates of `id` answer 503.
    pub fn fail_transiently(&self, id: &str, times: u32) {
        self.state
            .lock()
            .unwrap()
            .transient
            .insert(id.to_string(), times);
    }

    /// The next `times` updates of `id` answer 429.
    pub fn throttle(&self, id: &str, times: u32) {
        self.state
            .lock()
            .unwrap()
            .throttled
            .insert(id.to_string(), times);
    }

    pub fn bullhorn_config(&self, username: &str, password: &str) -> BullhornConfig {
        BullhornConfig {
            auth_url: format!("{}/oauth", self.base_url),
            rest_url: format!("{}/rest-services", self.base_url),
            client_id: CLIENT_ID.into(),
            client_secret: CLIENT_SECRET.into(),
            username: username.into(),
            password: password.into(),
        }
    }
}

pub fn test_http_config() -> HttpConfig {
    HttpConfig {
        timeout: Duration::from_secs(5),
        max_retries: 3,
        retry_base_delay: Duration::ZERO,
    }
}

pub fn client_for(mock: &MockBullhorn, username: &str, password: &str) -> BullhornClient {
    BullhornClient::new(mock.bullhorn_config(username, password), &test_http_config()).unwrap()
}

fn param<'a>(params: &'a HashMap<String, String>, key: &str) -> &'a str {
    params.get(key).map(String::as_str).unwrap_or_default()
}

async fn authorize(Query(params): Query<HashMap<String, String>>) -> Response {
    let accepted = param(&params, "client_id") == CLIENT_ID
        && param(&params, "response_type") == "code"
        && param(&params, "username") == "api.user"
        && param(&params, "password") == "correct-horse";
    if !accepted {
        return Html("<html><body>Login</body></html>").into_response();
    }
    (
        StatusCode::FOUND,
        [(
            header::LOCATION,
            "https://callback.example.com/?code=22.auth%3Dcode&client_id=client-id",
        )],
    )
        .into_response()
}

async fn token(Query(params): Query<HashMap<String, String>>) -> Response {
    let accepted = param(&params, "grant_type") == "authorization_code"
        && param(&params, "code") == AUTH_CODE
        && param(&params, "client_id") == CLIENT_ID
        && param(&params, "client_secret") == CLIENT_SECRET;
    if !accepted {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "invalid_client"})),
        )
            .into_response();
    }
    Json(json!({
        "access_token": ACCESS_TOKEN,
        "token_type": "Bearer",
        "expires_in": 600,
        "refresh_token": "refresh-1"
    }))
    .into_response()
}

async fn login(
    State(shared): State<Shared>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if param(&params, "access_token") != ACCESS_TOKEN || param(&params, "version") != "*" {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    shared.state.lock().unwrap().logins += 1;
    Json(json!({
        "BhRestToken": REST_TOKEN,
        "restUrl": format!("{}/rest-services/corp1/", shared.base_url)
    }))
    .into_response()
}

async fn update(
    State(shared): State<Shared>,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Response {
    if param(&params, "BhRestToken") != REST_TOKEN {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let mut state = shared.state.lock().unwrap();
    *state.attempts.entry(id.clone()).or_default() += 1;

    if state.not_found.contains(&id) {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({
                "errorMessage": format!("Cannot find entity Candidate with id {id}"),
                "errorCode": 404
            })),
        )
            .into_response();
    }
    if let Some(remaining) = state.throttled.get_mut(&id) {
        if *remaining > 0 {
            *remaining -= 1;
            return StatusCode::TOO_MANY_REQUESTS.into_response();
        }
    }
    if let Some(remaining) = state.transient.get_mut(&id) {
        if *remaining > 0 {
            *remaining -= 1;
            return StatusCode::SERVICE_UNAVAILABLE.into_response();
        }
    }

    state.candidates.insert(id.clone(), body);
    Json(json!({
        "changedEntityType": "Candidate",
        "changedEntityId": id,
        "changeType": "UPDATE"
    }))
    .into_response()
}
