//! Route handlers and the authentication middleware.

use std::sync::Arc;

use axum::extract::{Query, Request, State};
use axum::http::header;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde_json::{json, Value};
use tracing::info;

use crate::auth::{Claims, JwtAuth, TOKEN_TYPE_ACCESS, TOKEN_TYPE_REFRESH};
use crate::config::GlobalConfig;
use crate::gateway::schemas::{
    ApiResponse, PlayControlRequest, PlayUrlRequest, RefreshRequest, RemoteLoginRequest,
    SelectorQuery, SystemLoginRequest, TokenPairResponse, TtsRequest, VolumeRequest,
};
use crate::session::{SessionCacheManager, ServiceHandle};
use crate::{AppError, Result};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// Loaded configuration.
    pub config: Arc<GlobalConfig>,
    /// Session core.
    pub manager: Arc<SessionCacheManager>,
    /// Token issuer/verifier.
    pub jwt: Arc<JwtAuth>,
}

/// Build the full gateway router.
///
/// `/`, `/health`, `/auth/login`, and `/auth/refresh` are open; everything
/// else requires a valid access token.
pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/auth/status", get(auth_status))
        .route("/mi/account/login", post(remote_login))
        .route("/mi/account/logout", post(remote_logout))
        .route("/mi/account/status", get(remote_status))
        .route("/devices", get(list_devices))
        .route("/mi/device/playback/play-url", post(play_url))
        .route("/mi/device/playback/play", post(playback_play))
        .route("/mi/device/playback/pause", post(playback_pause))
        .route("/mi/device/playback/stop", post(playback_stop))
        .route("/mi/device/playback/status", get(playback_status))
        .route("/mi/device/tts", post(text_to_speech))
        .route("/mi/device/volume", post(set_volume).get(get_volume))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/auth/login", post(system_login))
        .route("/auth/refresh", post(refresh_tokens))
        .merge(protected)
        .with_state(state)
}

/// Bearer-token middleware for the protected routes.
///
/// Verifies the access token and stashes its claims as a request extension.
async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::Token("missing bearer token".into()))?;
    let claims = state.jwt.verify(token, TOKEN_TYPE_ACCESS)?;
    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

async fn root() -> Json<Value> {
    Json(json!({ "service": "mina-bridge" }))
}

async fn health() -> &'static str {
    "ok"
}

async fn system_login(
    State(state): State<AppState>,
    Json(body): Json<SystemLoginRequest>,
) -> Result<Json<TokenPairResponse>> {
    if !state
        .config
        .authenticate_system_user(&body.username, &body.password)
    {
        return Err(AppError::Auth("invalid system credentials".into()));
    }
    info!(username = %body.username, "system user logged in");
    Ok(Json(token_pair(&state.jwt, &body.username)?))
}

async fn refresh_tokens(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> Result<Json<TokenPairResponse>> {
    let claims = state.jwt.verify(&body.refresh_token, TOKEN_TYPE_REFRESH)?;
    Ok(Json(token_pair(&state.jwt, &claims.sub)?))
}

fn token_pair(jwt: &JwtAuth, username: &str) -> Result<TokenPairResponse> {
    Ok(TokenPairResponse {
        access_token: jwt.create_access_token(username)?,
        refresh_token: jwt.create_refresh_token(username)?,
        token_type: "bearer",
    })
}

async fn auth_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Json<Value> {
    Json(json!({
        "username": claims.sub,
        "should_refresh": state.jwt.should_refresh(&claims),
    }))
}

async fn remote_login(
    State(state): State<AppState>,
    Json(body): Json<RemoteLoginRequest>,
) -> Result<Json<ApiResponse>> {
    state.manager.login(&body.username, &body.password).await?;
    Ok(Json(ApiResponse::ok("remote account session installed")))
}

async fn remote_logout(State(state): State<AppState>) -> Json<ApiResponse> {
    state.manager.logout().await;
    Json(ApiResponse::ok("remote account session cleared"))
}

/// Session status report. Never rejects for a missing session; the
/// logged-out state is data here, not an authorization failure.
async fn remote_status(State(state): State<AppState>) -> Json<Value> {
    match state.manager.list_devices().await {
        Ok(devices) => Json(json!({ "logged_in": true, "device_count": devices.len() })),
        Err(AppError::SessionMissing) => Json(json!({ "logged_in": false })),
        Err(err) => Json(json!({ "logged_in": true, "error": err.to_string() })),
    }
}

async fn list_devices(State(state): State<AppState>) -> Result<Json<Value>> {
    let devices = state.manager.list_devices().await?;
    Ok(Json(json!({ "devices": devices })))
}

/// Resolve a selector and hand back the device id plus a service capability.
async fn resolve(state: &AppState, selector: &str) -> Result<(String, ServiceHandle)> {
    let device_id = state.manager.resolve_device_selector(selector).await?;
    let service = state.manager.ensure_session().await?;
    Ok((device_id, service))
}

async fn play_url(
    State(state): State<AppState>,
    Json(body): Json<PlayUrlRequest>,
) -> Result<Json<ApiResponse>> {
    let (device_id, service) = resolve(&state, &body.device).await?;
    let result = service.play_url(&device_id, &body.url).await?;
    Ok(Json(ApiResponse::with_data("playback started", result)))
}

async fn playback_play(
    State(state): State<AppState>,
    Json(body): Json<PlayControlRequest>,
) -> Result<Json<ApiResponse>> {
    playback_operation(&state, &body.device, "play").await
}

async fn playback_pause(
    State(state): State<AppState>,
    Json(body): Json<PlayControlRequest>,
) -> Result<Json<ApiResponse>> {
    playback_operation(&state, &body.device, "pause").await
}

async fn playback_stop(
    State(state): State<AppState>,
    Json(body): Json<PlayControlRequest>,
) -> Result<Json<ApiResponse>> {
    playback_operation(&state, &body.device, "stop").await
}

async fn playback_operation(
    state: &AppState,
    selector: &str,
    action: &str,
) -> Result<Json<ApiResponse>> {
    let (device_id, service) = resolve(state, selector).await?;
    let result = service.playback_operation(&device_id, action).await?;
    Ok(Json(ApiResponse::with_data(
        format!("playback {action} sent"),
        result,
    )))
}

async fn playback_status(
    State(state): State<AppState>,
    Query(query): Query<SelectorQuery>,
) -> Result<Json<ApiResponse>> {
    let (device_id, service) = resolve(&state, &query.device).await?;
    let raw = service.play_status(&device_id).await?;
    let info = parse_play_info(&raw)?;
    Ok(Json(ApiResponse::with_data("playback status", info)))
}

async fn text_to_speech(
    State(state): State<AppState>,
    Json(body): Json<TtsRequest>,
) -> Result<Json<ApiResponse>> {
    let (device_id, service) = resolve(&state, &body.device).await?;
    let result = service.text_to_speech(&device_id, &body.text).await?;
    Ok(Json(ApiResponse::with_data("tts sent", result)))
}

async fn set_volume(
    State(state): State<AppState>,
    Json(body): Json<VolumeRequest>,
) -> Result<Json<ApiResponse>> {
    if body.volume > 100 {
        return Err(AppError::Resolution(format!(
            "volume {} out of range 0-100",
            body.volume
        )));
    }
    let (device_id, service) = resolve(&state, &body.device).await?;
    let result = service.set_volume(&device_id, body.volume).await?;
    Ok(Json(ApiResponse::with_data(
        format!("volume set to {}", body.volume),
        result,
    )))
}

async fn get_volume(
    State(state): State<AppState>,
    Query(query): Query<SelectorQuery>,
) -> Result<Json<ApiResponse>> {
    let (device_id, service) = resolve(&state, &query.device).await?;
    let raw = service.play_status(&device_id).await?;
    let info = parse_play_info(&raw)?;
    let volume = info
        .get("volume")
        .cloned()
        .ok_or_else(|| AppError::Remote("play status lacks a volume field".into()))?;
    Ok(Json(ApiResponse::with_data(
        "volume",
        json!({ "volume": volume }),
    )))
}

/// The play-status payload arrives with its `info` field doubly encoded as a
/// JSON string inside the outer JSON document.
fn parse_play_info(raw: &Value) -> Result<Value> {
    let info = raw
        .get("data")
        .and_then(|d| d.get("info"))
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::Remote(format!("unexpected play status shape: {raw}")))?;
    serde_json::from_str(info)
        .map_err(|err| AppError::Remote(format!("play status info decode: {err}")))
}
