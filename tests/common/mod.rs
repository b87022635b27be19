//! Shared fixtures for router tests

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, Response},
    Router,
};
use incident_series_search::api::{build_router, AppState};
use incident_series_search::auth::{AuthService, InMemoryUserStore};
use incident_series_search::search::{
    CompiledQuery, SearchBackend, SearchConfig, SearchHit, SearchResponse, SearchResult,
    SearchService,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

/// Backend that records every query body and answers with one canned hit
#[derive(Default)]
pub struct RecordingBackend {
    pub unreachable: bool,
    pub bodies: Mutex<Vec<Value>>,
}

impl RecordingBackend {
    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Default::default()
        }
    }

    pub fn last_body(&self) -> Option<Value> {
        self.bodies.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl SearchBackend for RecordingBackend {
    async fn search(&self, query: &CompiledQuery) -> SearchResult<SearchResponse> {
        self.bodies.lock().unwrap().push(query.to_body());

        Ok(SearchResponse {
            hits: vec![SearchHit {
                index: "incidents".to_string(),
                id: "incident-1".to_string(),
                score: Some(query.min_score),
                source: json!({ "title": "Two-vehicle collision" }),
                sort: vec![],
            }],
            total_hits: 1,
            took_ms: 1,
        })
    }

    async fn ping(&self) -> bool {
        !self.unreachable
    }
}

pub fn test_app(backend: Arc<RecordingBackend>) -> Router {
    let search = SearchService::with_backend(&SearchConfig::default(), backend);
    let auth = AuthService::new(Arc::new(InMemoryUserStore::new()), 300).with_hash_cost(4);
    build_router(AppState::new(Arc::new(search), auth))
}

pub async fn send(app: &Router, request: Request<Body>) -> (u16, Value) {
    let response: Response<Body> = app.clone().oneshot(request).await.unwrap();
    let status = response.status().as_u16();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

pub async fn register_and_login(app: &Router, username: &str, password: &str) -> String {
    let (status, _) = send(
        app,
        Request::post("/register")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({ "username": username, "password": password }).to_string(),
            ))
            .unwrap(),
    )
    .await;
    assert_eq!(status, 201);

    let (status, body) = send(
        app,
        Request::post("/auth/token")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(format!("username={}&password={}", username, password)))
            .unwrap(),
    )
    .await;
    assert_eq!(status, 200);

    body["access_token"].as_str().unwrap().to_string()
}
