//! HTTP/JSON API under `/api/v1`
//!
//! Every handler dispatches on the request method itself so that a method
//! mismatch produces a 405 with an `Allow` header and the standard
//! `{code, message}` error body. Game state is guarded by one mutex; each
//! request takes it once, which serializes all mutations with the ticker.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::Router;
use serde_json::{json, Value};
use tokio::sync::Mutex;

use shared::map::Map;

use crate::app::{AppError, Application, Token};
use crate::db::{Database, RetirementSink};
use crate::serialization::StateSaver;

/// Shared state behind every API handler
pub struct AppState {
    pub app: Mutex<Application>,
    pub db: Database,
    pub saver: Mutex<Option<StateSaver>>,
}

/// API failure carrying its HTTP status and wire code
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
    allow: Option<&'static str>,
}

impl ApiError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        ApiError {
            status,
            code,
            message: message.into(),
            allow: None,
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "badRequest", message)
    }

    fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "invalidArgument", message)
    }

    fn map_not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "mapNotFound", "Map not found")
    }

    fn invalid_token() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            "invalidToken",
            "Authorization header is missing or malformed",
        )
    }

    fn unknown_token() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "unknownToken", "Player token has not been found")
    }

    fn method_not_allowed(allow: &'static str) -> Self {
        let mut error = Self::new(
            StatusCode::METHOD_NOT_ALLOWED,
            "invalidMethod",
            "Invalid method",
        );
        error.allow = Some(allow);
        error
    }

    fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internalError", message)
    }
}

impl From<AppError> for ApiError {
    fn from(error: AppError) -> Self {
        match error {
            AppError::MapNotFound => ApiError::map_not_found(),
            AppError::UnknownToken => ApiError::unknown_token(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({ "code": self.code, "message": self.message });
        let mut response = json_response(self.status, &body);
        if let Some(allow) = self.allow {
            response
                .headers_mut()
                .insert(header::ALLOW, header::HeaderValue::from_static(allow));
        }
        response
    }
}

type ApiResult = Result<Response, ApiError>;

fn json_response(status: StatusCode, value: &Value) -> Response {
    (
        status,
        [
            (header::CONTENT_TYPE, "application/json"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        value.to_string(),
    )
        .into_response()
}

fn ok_json(value: Value) -> Response {
    json_response(StatusCode::OK, &value)
}

/// Builds the `/api/v1` router over the shared state
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/maps", any(list_maps))
        .route("/api/v1/maps/{id}", any(map_by_id))
        .route("/api/v1/game/join", any(join_game))
        .route("/api/v1/game/players", any(list_players))
        .route("/api/v1/game/state", any(game_state))
        .route("/api/v1/game/player/action", any(player_action))
        .route("/api/v1/game/tick", any(game_tick))
        .route("/api/v1/game/records", any(records))
        .route("/api/{*rest}", any(unknown_api_path))
        .with_state(state)
}

/// Runs one tick and lets the periodic saver observe it
///
/// Shared between the tick endpoint and the auto-ticker so both go through
/// the same lock-tick-save sequence.
pub async fn run_tick(state: &AppState, delta_ms: u64) {
    let mut app = state.app.lock().await;
    app.tick(delta_ms, &state.db).await;

    if let Some(saver) = state.saver.lock().await.as_mut() {
        if let Err(e) = saver.on_tick(delta_ms, &app) {
            log::error!("periodic state save failed: {}", e);
        }
    }
}

/// Extracts and validates the bearer token from the request headers
fn bearer_token(headers: &HeaderMap) -> Result<Token, ApiError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(ApiError::invalid_token)?;
    let raw = value
        .strip_prefix("Bearer ")
        .ok_or_else(ApiError::invalid_token)?;
    Token::parse(raw).ok_or_else(ApiError::invalid_token)
}

fn parse_json_body(body: &Bytes, context: &str) -> Result<Value, ApiError> {
    if body.is_empty() {
        return Err(ApiError::invalid_argument(format!(
            "{context} request body is empty"
        )));
    }
    serde_json::from_slice(body)
        .map_err(|_| ApiError::invalid_argument(format!("{context} request parse error")))
}

fn map_json(map: &Map) -> Value {
    let roads: Vec<Value> = map
        .roads()
        .iter()
        .map(|road| {
            let start = road.start();
            let end = road.end();
            if road.is_horizontal() {
                json!({ "x0": start.x, "y0": start.y, "x1": end.x })
            } else {
                json!({ "x0": start.x, "y0": start.y, "y1": end.y })
            }
        })
        .collect();

    let buildings: Vec<Value> = map
        .buildings()
        .iter()
        .map(|building| {
            json!({
                "x": building.position.x,
                "y": building.position.y,
                "w": building.width,
                "h": building.height,
            })
        })
        .collect();

    let offices: Vec<Value> = map
        .offices()
        .iter()
        .map(|office| {
            json!({
                "id": office.id.as_str(),
                "x": office.position.x,
                "y": office.position.y,
                "offsetX": office.offset.dx,
                "offsetY": office.offset.dy,
            })
        })
        .collect();

    json!({
        "id": map.id().as_str(),
        "name": map.name(),
        "roads": roads,
        "buildings": buildings,
        "offices": offices,
        "lootTypes": map.loot_types(),
        "dogSpeed": map.dog_speed(),
        "bagCapacity": map.bag_capacity(),
    })
}

async fn list_maps(method: Method, State(state): State<Arc<AppState>>) -> ApiResult {
    if method != Method::GET {
        return Err(ApiError::method_not_allowed("GET"));
    }

    let app = state.app.lock().await;
    let maps: Vec<Value> = app
        .maps()
        .iter()
        .map(|map| json!({ "id": map.id().as_str(), "name": map.name() }))
        .collect();
    Ok(ok_json(Value::Array(maps)))
}

async fn map_by_id(
    method: Method,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult {
    if method != Method::GET && method != Method::HEAD {
        return Err(ApiError::method_not_allowed("GET, HEAD"));
    }

    let app = state.app.lock().await;
    let map = app.find_map(&id).ok_or_else(ApiError::map_not_found)?;
    Ok(ok_json(map_json(map)))
}

async fn join_game(
    method: Method,
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> ApiResult {
    if method != Method::POST {
        return Err(ApiError::method_not_allowed("POST"));
    }

    let body = parse_json_body(&body, "Join game")?;
    let user_name = body
        .get("userName")
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ApiError::invalid_argument("Invalid userName"))?;
    let map_id = body
        .get("mapId")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::invalid_argument("Invalid mapId"))?;

    let mut app = state.app.lock().await;
    let (token, dog_id) = app.join(map_id, user_name)?;
    Ok(ok_json(json!({
        "authToken": token.as_str(),
        "playerId": dog_id.0,
    })))
}

async fn list_players(
    method: Method,
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult {
    if method != Method::GET && method != Method::HEAD {
        return Err(ApiError::method_not_allowed("GET, HEAD"));
    }
    let token = bearer_token(&headers)?;

    let app = state.app.lock().await;
    let mut players = serde_json::Map::new();
    for (id, name) in app.list_players(&token)? {
        players.insert(id.to_string(), json!({ "name": name }));
    }
    Ok(ok_json(json!({ "players": players })))
}

async fn game_state(
    method: Method,
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult {
    if method != Method::GET && method != Method::HEAD {
        return Err(ApiError::method_not_allowed("GET, HEAD"));
    }
    let token = bearer_token(&headers)?;

    let app = state.app.lock().await;
    let view = app.state(&token)?;

    let mut players = serde_json::Map::new();
    for dog in &view.dogs {
        let bag: Vec<Value> = dog
            .bag
            .iter()
            .map(|(id, type_index)| json!({ "id": id, "type": type_index }))
            .collect();
        players.insert(
            dog.id.to_string(),
            json!({
                "pos": dog.position,
                "speed": dog.speed,
                "dir": dog.direction,
                "bag": bag,
                "score": dog.score,
            }),
        );
    }

    let mut lost_objects = serde_json::Map::new();
    for loot in &view.loots {
        lost_objects.insert(
            loot.id.to_string(),
            json!({ "type": loot.type_index, "pos": loot.position }),
        );
    }

    Ok(ok_json(json!({
        "players": players,
        "lostObjects": lost_objects,
    })))
}

async fn player_action(
    method: Method,
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult {
    if method != Method::POST {
        return Err(ApiError::method_not_allowed("POST"));
    }
    let token = bearer_token(&headers)?;

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");
    if content_type != "application/json" {
        return Err(ApiError::invalid_argument("Invalid content type"));
    }

    let body = parse_json_body(&body, "Player action")?;
    let command = body
        .get("move")
        .and_then(Value::as_str)
        .ok_or_else(|| ApiError::invalid_argument("Failed to parse action"))?;
    if !matches!(command, "U" | "D" | "L" | "R" | "") {
        return Err(ApiError::invalid_argument("Failed to parse action"));
    }

    let mut app = state.app.lock().await;
    app.set_player_action(&token, command)?;
    Ok(ok_json(json!({})))
}

async fn game_tick(
    method: Method,
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> ApiResult {
    if method != Method::POST {
        return Err(ApiError::method_not_allowed("POST"));
    }

    {
        let app = state.app.lock().await;
        if app.is_auto_tick_enabled() {
            return Err(ApiError::bad_request("Invalid endpoint"));
        }
    }

    let body = parse_json_body(&body, "Tick")?;
    let delta_ms = body
        .get("timeDelta")
        .and_then(Value::as_i64)
        .ok_or_else(|| ApiError::invalid_argument("Failed to parse tick"))?;
    if delta_ms <= 0 {
        return Err(ApiError::invalid_argument("timeDelta must be positive"));
    }

    run_tick(&state, delta_ms as u64).await;
    Ok(ok_json(json!({})))
}

async fn records(
    method: Method,
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult {
    if method != Method::GET && method != Method::HEAD {
        return Err(ApiError::method_not_allowed("GET, HEAD"));
    }

    let start = parse_query_int(&params, "start")?.unwrap_or(0);
    let max_items = parse_query_int(&params, "maxItems")?.unwrap_or(100);
    if start < 0 || max_items < 0 || max_items > 100 {
        return Err(ApiError::invalid_argument(
            "start and maxItems must be in range",
        ));
    }

    let records = state
        .db
        .top(start, max_items)
        .await
        .map_err(|e| ApiError::internal(format!("records query failed: {e}")))?;

    let body: Vec<Value> = records
        .into_iter()
        .map(|record| {
            json!({
                "name": record.name,
                "score": record.score,
                "playTime": f64::from(record.play_time_ms) / 1000.0,
            })
        })
        .collect();
    Ok(ok_json(Value::Array(body)))
}

fn parse_query_int(params: &HashMap<String, String>, key: &str) -> Result<Option<i64>, ApiError> {
    match params.get(key) {
        None => Ok(None),
        Some(raw) => raw.parse::<i64>().map(Some).map_err(|_| {
            ApiError::invalid_argument(format!("{key} must be a valid integer"))
        }),
    }
}

async fn unknown_api_path() -> ApiResult {
    Err(ApiError::bad_request("Bad request"))
}
