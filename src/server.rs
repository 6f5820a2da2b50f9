//! Engagement counter API.
//!
//! | Route | Behavior |
//! |---|---|
//! | `POST /api/track` | validate `{ id, area, event }`, upsert the counter, `200 ok` |
//! | `OPTIONS /api/track` | CORS preflight |
//! | `GET /api/top?limit=N` | top rows by `shares + downloads`, N clamped to 1..=100 |
//!
//! Every response is CORS-open. A malformed track request is rejected with
//! `400` before anything is written; a storage failure is `500`.

use crate::area::Area;
use crate::config::ServerConfig;
use crate::ident::ID_LEN;
use crate::report::EngagementEvent;
use crate::store::{CounterStore, StoreError, TopEntry};
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub const DEFAULT_TOP_LIMIT: u32 = 20;
pub const MAX_TOP_LIMIT: u32 = 100;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(&'static str),
    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(reason) => {
                tracing::debug!(reason, "track request rejected");
                (StatusCode::BAD_REQUEST, "Bad request").into_response()
            }
            ApiError::Storage(e) => {
                tracing::error!(error = %e, "counter store failure");
                (StatusCode::INTERNAL_SERVER_ERROR, "error").into_response()
            }
        }
    }
}

#[derive(Error, Debug)]
pub enum ServeError {
    #[error("invalid bind address '{0}'")]
    Bind(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Router over `store`, with CORS and request tracing.
pub fn router(store: Arc<CounterStore>) -> Router {
    Router::new()
        .route("/api/track", post(track).options(track_preflight))
        .route("/api/top", get(top))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(store)
}

/// Open the database and serve until Ctrl-C.
pub async fn serve(config: &ServerConfig) -> Result<(), ServeError> {
    let addr: SocketAddr = config
        .bind
        .parse()
        .map_err(|_| ServeError::Bind(config.bind.clone()))?;
    let store = Arc::new(CounterStore::open(&config.database)?);
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, database = %config.database.display(), "counter API listening");
    axum::serve(listener, router(store))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("counter API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "cannot listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

// =============================================================================
// POST /api/track
// =============================================================================

#[derive(Deserialize)]
struct TrackBody {
    id: Option<String>,
    area: Option<String>,
    event: Option<String>,
}

/// A track request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidTrack {
    pub id: String,
    pub area: Area,
    pub event: EngagementEvent,
}

/// Check a raw track body. Ids are eight ASCII alphanumerics, matched
/// case-insensitively and stored lowercase.
pub fn validate_track(body: &[u8]) -> Result<ValidTrack, ApiError> {
    let body: TrackBody =
        serde_json::from_slice(body).map_err(|_| ApiError::BadRequest("malformed JSON body"))?;

    let id = body
        .id
        .filter(|id| id.len() == ID_LEN && id.bytes().all(|b| b.is_ascii_alphanumeric()))
        .ok_or(ApiError::BadRequest("id must be 8 alphanumeric characters"))?;
    let area = body
        .area
        .as_deref()
        .and_then(Area::from_key)
        .ok_or(ApiError::BadRequest("unknown area"))?;
    let event = body
        .event
        .as_deref()
        .and_then(|e| e.parse::<EngagementEvent>().ok())
        .ok_or(ApiError::BadRequest("event must be share, download, or copy"))?;

    Ok(ValidTrack {
        id: id.to_ascii_lowercase(),
        area,
        event,
    })
}

async fn track(State(store): State<Arc<CounterStore>>, body: Bytes) -> Result<&'static str, ApiError> {
    let valid = validate_track(&body)?;
    store.increment(&valid.id, valid.area.key(), valid.event)?;
    tracing::debug!(id = %valid.id, area = %valid.area, event = %valid.event, "counted");
    Ok("ok")
}

/// Answers a bare `OPTIONS`; browser preflights are handled by the CORS
/// layer before they reach the router.
async fn track_preflight() -> impl IntoResponse {
    (
        StatusCode::NO_CONTENT,
        [
            (
                header::ACCESS_CONTROL_ALLOW_METHODS,
                HeaderValue::from_static("POST, OPTIONS"),
            ),
            (
                header::ACCESS_CONTROL_ALLOW_HEADERS,
                HeaderValue::from_static("content-type"),
            ),
        ],
    )
}

// =============================================================================
// GET /api/top
// =============================================================================

#[derive(Deserialize)]
struct TopQuery {
    limit: Option<String>,
}

/// Clamp `?limit=` to `1..=100`. Missing, empty, or unparseable values use
/// the default; fractions are truncated.
pub fn parse_limit(raw: Option<&str>) -> u32 {
    let Some(value) = raw.map(str::trim).filter(|v| !v.is_empty()) else {
        return DEFAULT_TOP_LIMIT;
    };
    match value.parse::<f64>() {
        Ok(n) if n.is_finite() => n.trunc().clamp(1.0, MAX_TOP_LIMIT as f64) as u32,
        _ => DEFAULT_TOP_LIMIT,
    }
}

async fn top(
    State(store): State<Arc<CounterStore>>,
    Query(query): Query<TopQuery>,
) -> Result<Json<Vec<TopEntry>>, ApiError> {
    let limit = parse_limit(query.limit.as_deref());
    Ok(Json(store.top(limit)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_track_body() {
        let valid =
            validate_track(br#"{"id":"ABCD1234","area":"seo","event":"download"}"#).unwrap();
        assert_eq!(
            valid,
            ValidTrack {
                id: "abcd1234".into(),
                area: Area::Seo,
                event: EngagementEvent::Download,
            }
        );
    }

    #[test]
    fn rejects_bad_fields() {
        for body in [
            &br#"{"id":"abcd123","area":"seo","event":"copy"}"#[..],
            br#"{"id":"abcd12345","area":"seo","event":"copy"}"#,
            br#"{"id":"abcd-234","area":"seo","event":"copy"}"#,
            br#"{"area":"seo","event":"copy"}"#,
            br#"{"id":"abcd1234","area":"","event":"copy"}"#,
            br#"{"id":"abcd1234","area":"astrology","event":"copy"}"#,
            br#"{"id":"abcd1234","area":"seo","event":"bogus"}"#,
            br#"{"id":"abcd1234","area":"seo"}"#,
            br#"{"id":12345678,"area":"seo","event":"copy"}"#,
            b"not json",
            b"",
        ] {
            assert!(
                matches!(validate_track(body), Err(ApiError::BadRequest(_))),
                "{}",
                String::from_utf8_lossy(body)
            );
        }
    }

    #[test]
    fn limit_is_clamped_and_defaulted() {
        assert_eq!(parse_limit(None), 20);
        assert_eq!(parse_limit(Some("")), 20);
        assert_eq!(parse_limit(Some("abc")), 20);
        assert_eq!(parse_limit(Some("NaN")), 20);
        assert_eq!(parse_limit(Some("0")), 1);
        assert_eq!(parse_limit(Some("-4")), 1);
        assert_eq!(parse_limit(Some("7")), 7);
        assert_eq!(parse_limit(Some("7.9")), 7);
        assert_eq!(parse_limit(Some("1000")), 100);
    }
}
