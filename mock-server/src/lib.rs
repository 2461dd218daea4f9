//! In-memory implementation of the fitness API contract, used by the
//! integration test suite as the live server.
//!
//! Every route sits under `/api/fitness/v1` and expects a bearer token.
//! Data source creation deduplicates by stream id (assigned from the
//! source's identity, `{type}:{dataType}:{package}`, when the caller omits
//! it) and answers 409 on a collision, which is the behavior the client's
//! create-or-reuse composites lean on. DTOs here are defined independently
//! from the core crate; the integration tests catch schema drift between
//! the two.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSource {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_stream_id: Option<String>,
    #[serde(default)]
    pub data_stream_name: String,
    #[serde(rename = "type", default)]
    pub source_type: String,
    #[serde(default)]
    pub data_type: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<Value>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataPoint {
    #[serde(default)]
    pub start_time_nanos: i64,
    #[serde(default)]
    pub end_time_nanos: i64,
    #[serde(default)]
    pub data_type_name: String,
    #[serde(default)]
    pub value: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_data_source_id: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub start_time_millis: i64,
    #[serde(default)]
    pub end_time_millis: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_time_millis: Option<i64>,
    #[serde(default)]
    pub activity_type: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_time_millis: Option<i64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DataPointsRequest {
    #[serde(default)]
    data_points: Vec<DataPoint>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionQuery {
    start_time: Option<i64>,
    end_time: Option<i64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DataSourcesEnvelope {
    data_sources: Vec<DataSource>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DataPointsEnvelope {
    data_points: Vec<DataPoint>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionsEnvelope {
    sessions: Vec<Session>,
}

#[derive(Default)]
pub struct Store {
    /// Data sources per user, in insertion order.
    data_sources: HashMap<String, Vec<DataSource>>,
    /// All points per (user, data source); datasets are views into this by
    /// time range.
    points: HashMap<(String, String), Vec<DataPoint>>,
    /// Sessions per user.
    sessions: HashMap<String, Vec<Session>>,
}

pub type Db = Arc<RwLock<Store>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::default()));
    Router::new()
        .route(
            "/api/fitness/v1/users/{user_id}/dataSources",
            get(list_data_sources).post(create_data_source),
        )
        .route(
            "/api/fitness/v1/users/{user_id}/dataSources/{data_source_id}/datasets/{dataset_id}",
            get(get_dataset).patch(patch_dataset),
        )
        .route(
            "/api/fitness/v1/users/{user_id}/sessions",
            get(list_sessions).post(create_session),
        )
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// All routes require a non-empty bearer token.
fn require_auth(headers: &HeaderMap) -> Option<Response> {
    let ok = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|token| !token.is_empty());
    if ok {
        None
    } else {
        Some(error(StatusCode::UNAUTHORIZED, "Unauthorized"))
    }
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

fn millis_to_nanos(millis: i64) -> i64 {
    millis * 1_000_000
}

/// Identity-derived stream id: `{type}:{dataType name}:{app package}`.
fn derived_stream_id(source: &DataSource) -> String {
    let data_type = source
        .data_type
        .first()
        .and_then(|dt| dt.get("name"))
        .and_then(Value::as_str)
        .unwrap_or("unknown");
    let package = source
        .application
        .as_ref()
        .and_then(|app| app.get("packageName"))
        .and_then(Value::as_str)
        .unwrap_or("unknown");
    format!("{}:{data_type}:{package}", source.source_type)
}

/// Dataset ids are `{startNanos}-{endNanos}`.
fn parse_dataset_id(id: &str) -> Option<(i64, i64)> {
    let (start, end) = id.split_once('-')?;
    Some((start.parse().ok()?, end.parse().ok()?))
}

async fn create_data_source(
    State(db): State<Db>,
    Path(user_id): Path<String>,
    headers: HeaderMap,
    Json(mut source): Json<DataSource>,
) -> Response {
    if let Some(denied) = require_auth(&headers) {
        return denied;
    }
    if source.data_stream_name.trim().is_empty() {
        return error(StatusCode::BAD_REQUEST, "Missing required fields");
    }
    if source.source_type != "raw" && source.source_type != "derived" {
        return error(StatusCode::BAD_REQUEST, "type must be raw or derived");
    }

    let stream_id = source
        .data_stream_id
        .clone()
        .unwrap_or_else(|| derived_stream_id(&source));

    let mut store = db.write().await;
    let sources = store.data_sources.entry(user_id).or_default();
    if sources
        .iter()
        .any(|s| s.data_stream_id.as_deref() == Some(stream_id.as_str()))
    {
        return error(StatusCode::CONFLICT, "Data source already exists");
    }

    source.data_stream_id = Some(stream_id);
    sources.push(source.clone());
    (StatusCode::CREATED, Json(source)).into_response()
}

async fn list_data_sources(
    State(db): State<Db>,
    Path(user_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    if let Some(denied) = require_auth(&headers) {
        return denied;
    }
    let store = db.read().await;
    let data_sources = store.data_sources.get(&user_id).cloned().unwrap_or_default();
    Json(DataSourcesEnvelope { data_sources }).into_response()
}

async fn patch_dataset(
    State(db): State<Db>,
    Path((user_id, data_source_id, dataset_id)): Path<(String, String, String)>,
    headers: HeaderMap,
    Json(request): Json<DataPointsRequest>,
) -> Response {
    if let Some(denied) = require_auth(&headers) {
        return denied;
    }
    if parse_dataset_id(&dataset_id).is_none() {
        return error(StatusCode::BAD_REQUEST, "Invalid dataset ID format");
    }
    if request
        .data_points
        .iter()
        .any(|p| p.start_time_nanos > p.end_time_nanos)
    {
        return error(StatusCode::BAD_REQUEST, "Data point time range is inverted");
    }

    let mut store = db.write().await;
    let known = store
        .data_sources
        .get(&user_id)
        .is_some_and(|sources| {
            sources
                .iter()
                .any(|s| s.data_stream_id.as_deref() == Some(data_source_id.as_str()))
        });
    if !known {
        return error(StatusCode::NOT_FOUND, "Data source not found");
    }

    store
        .points
        .entry((user_id, data_source_id))
        .or_default()
        .extend(request.data_points);
    Json(json!({})).into_response()
}

async fn get_dataset(
    State(db): State<Db>,
    Path((user_id, data_source_id, dataset_id)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> Response {
    if let Some(denied) = require_auth(&headers) {
        return denied;
    }
    let Some((start, end)) = parse_dataset_id(&dataset_id) else {
        return error(StatusCode::BAD_REQUEST, "Invalid dataset ID format");
    };

    let store = db.read().await;
    let known = store
        .data_sources
        .get(&user_id)
        .is_some_and(|sources| {
            sources
                .iter()
                .any(|s| s.data_stream_id.as_deref() == Some(data_source_id.as_str()))
        });
    if !known {
        return error(StatusCode::NOT_FOUND, "Data source not found");
    }

    let mut data_points: Vec<DataPoint> = store
        .points
        .get(&(user_id, data_source_id))
        .map(|points| {
            points
                .iter()
                .filter(|p| p.start_time_nanos >= start && p.end_time_nanos <= end)
                .cloned()
                .collect()
        })
        .unwrap_or_default();
    data_points.sort_by_key(|p| p.start_time_nanos);
    Json(DataPointsEnvelope { data_points }).into_response()
}

async fn create_session(
    State(db): State<Db>,
    Path(user_id): Path<String>,
    headers: HeaderMap,
    Json(mut session): Json<Session>,
) -> Response {
    if let Some(denied) = require_auth(&headers) {
        return denied;
    }
    if session.name.trim().is_empty() {
        return error(StatusCode::BAD_REQUEST, "Missing required fields");
    }
    if session.start_time_millis > session.end_time_millis {
        return error(StatusCode::BAD_REQUEST, "Session time range is inverted");
    }

    let mut store = db.write().await;
    let sessions = store.sessions.entry(user_id).or_default();
    if let Some(id) = &session.id {
        if sessions.iter().any(|s| s.id.as_deref() == Some(id.as_str())) {
            return error(StatusCode::CONFLICT, "Session already exists");
        }
    }

    session.id.get_or_insert_with(|| Uuid::new_v4().to_string());
    session.modified_time_millis = Some(now_millis());
    sessions.push(session.clone());
    (StatusCode::CREATED, Json(session)).into_response()
}

async fn list_sessions(
    State(db): State<Db>,
    Path(user_id): Path<String>,
    headers: HeaderMap,
    Query(query): Query<SessionQuery>,
) -> Response {
    if let Some(denied) = require_auth(&headers) {
        return denied;
    }
    let store = db.read().await;
    // Query bounds arrive in nanoseconds; session times are milliseconds.
    let sessions = store
        .sessions
        .get(&user_id)
        .map(|sessions| {
            sessions
                .iter()
                .filter(|s| {
                    query
                        .start_time
                        .map_or(true, |t| millis_to_nanos(s.start_time_millis) >= t)
                        && query
                            .end_time
                            .map_or(true, |t| millis_to_nanos(s.end_time_millis) <= t)
                })
                .cloned()
                .collect()
        })
        .unwrap_or_default();
    Json(SessionsEnvelope { sessions }).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_stream_id_uses_identity_parts() {
        let source: DataSource = serde_json::from_str(
            r#"{
                "dataStreamName": "Steps Data Source",
                "type": "derived",
                "dataType": [{"name": "com.ultimatequack.step_count.delta", "field": []}],
                "application": {"packageName": "com.acme.app"}
            }"#,
        )
        .unwrap();
        assert_eq!(
            derived_stream_id(&source),
            "derived:com.ultimatequack.step_count.delta:com.acme.app"
        );
    }

    #[test]
    fn derived_stream_id_tolerates_missing_parts() {
        let source: DataSource =
            serde_json::from_str(r#"{"dataStreamName": "S", "type": "derived"}"#).unwrap();
        assert_eq!(derived_stream_id(&source), "derived:unknown:unknown");
    }

    #[test]
    fn dataset_ids_parse_as_nanos_pairs() {
        assert_eq!(parse_dataset_id("100-200"), Some((100, 200)));
        assert_eq!(
            parse_dataset_id("1700000000000000000-1700000360000000000"),
            Some((1_700_000_000_000_000_000, 1_700_000_360_000_000_000))
        );
        assert_eq!(parse_dataset_id("nope"), None);
        assert_eq!(parse_dataset_id("12"), None);
        assert_eq!(parse_dataset_id("a-b"), None);
    }

    #[test]
    fn session_serializes_with_wire_keys() {
        let session = Session {
            id: Some("s1".to_string()),
            name: "Run".to_string(),
            description: None,
            start_time_millis: 1000,
            end_time_millis: 2000,
            modified_time_millis: Some(3000),
            activity_type: 8,
            application: None,
            active_time_millis: None,
        };
        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(json["startTimeMillis"], 1000);
        assert_eq!(json["activityType"], 8);
        assert!(json.get("description").is_none());
    }
}
