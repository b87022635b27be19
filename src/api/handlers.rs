use crate::api::{AppState, AuthenticatedUser};
use crate::auth::{AccessToken, RegisteredUser};
use crate::error::{AppError, Result};
use crate::search::{ExtraFields, FieldValue, FilterRequest, SearchResponse};
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Form, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use validator::Validate;

/// Health check endpoint
pub async fn health_check() -> Result<Json<HealthResponse>> {
    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Prometheus scrape endpoint
pub async fn metrics() -> String {
    crate::metrics::gather_metrics()
}

/// Authenticated greeting; reports whether the engine answers
pub async fn root(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Value>> {
    if state.search.ping().await {
        tracing::debug!(username = %user.username, "Engine ping succeeded");
        Ok(Json(json!({ "Hello": "World" })))
    } else {
        Err(AppError::EngineUnavailable(
            "search engine did not answer ping".to_string(),
        ))
    }
}

/// OAuth2 password-grant style form
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// Exchange credentials for a bearer token
pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Json<AccessToken>> {
    let token = state.auth.login(&form.username, &form.password).await?;
    Ok(Json(token))
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 150))]
    pub username: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Create a user
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisteredUser>)> {
    request.validate()?;

    let user = state
        .auth
        .register(&request.username, &request.password)
        .await?;

    Ok((StatusCode::CREATED, Json(user)))
}

/// Query-string filters of a series search
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesSearchQuery {
    #[serde(default)]
    pub start: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
    pub location: Option<String>,
    pub date_start: Option<String>,
    pub date_end: Option<String>,
    pub age_start: Option<u32>,
    pub age_end: Option<u32>,
    pub gender: Option<String>,
    pub min_involved: Option<u32>,
    #[serde(default)]
    pub driver_fled: bool,
    #[serde(default)]
    pub caused_death: bool,
    #[serde(default = "default_descending", alias = "desc")]
    pub descending: bool,
}

fn default_limit() -> usize {
    FilterRequest::DEFAULT_LIMIT
}

fn default_descending() -> bool {
    true
}

impl SeriesSearchQuery {
    pub fn into_filter_request(self, series_id: String, extra_fields: ExtraFields) -> FilterRequest {
        FilterRequest::new(series_id)
            .with_start(self.start)
            .with_limit(self.limit)
            .with_location(self.location.unwrap_or_default())
            .with_date_range(self.date_start, self.date_end)
            .with_age_range(self.age_start, self.age_end)
            .with_gender(self.gender.unwrap_or_default())
            .with_driver_fled(self.driver_fled)
            .with_caused_death(self.caused_death)
            .with_min_involved(self.min_involved)
            .with_extra_fields(extra_fields)
            .with_descending(self.descending)
    }
}

/// Search a series using query-string filters
pub async fn search_series(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(series_id): Path<String>,
    Query(params): Query<SeriesSearchQuery>,
) -> Result<Json<SearchResponse>> {
    tracing::debug!(username = %user.username, series_id = %series_id, "Series search");

    let request = params.into_filter_request(series_id, ExtraFields::default());
    let response = state.search.search(&request).await?;
    Ok(Json(response))
}

/// Search a series with extra nested-field constraints in the body
pub async fn search_series_with_fields(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(series_id): Path<String>,
    Query(params): Query<SeriesSearchQuery>,
    payload: std::result::Result<Json<BTreeMap<String, FieldValue>>, JsonRejection>,
) -> Result<Json<SearchResponse>> {
    // Floats, nulls and nested values are not searchable scalars
    let Json(fields) = payload?;

    tracing::debug!(
        username = %user.username,
        series_id = %series_id,
        extra_fields = fields.len(),
        "Series search with payload"
    );

    let extra_fields = ExtraFields::from_pairs(fields, state.search.allow_list())?;
    let request = params.into_filter_request(series_id, extra_fields);
    let response = state.search.search(&request).await?;
    Ok(Json(response))
}
