//! REST API for the touch remote client
//!
//! Provides HTTP endpoints for the device registry and key commands, the
//! WebSocket endpoint that hosts joystick sessions, and (optionally) the
//! touch client's static files on every other path.
//! Default port: 8000

pub mod session;

use anyhow::{Context, Result};
use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, WebSocketUpgrade},
        Path, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::{info, warn};

use crate::devices::{DeviceError, DeviceInfo, DeviceRegistry};
use crate::mapping::RemoteKey;
pub use session::{JoystickSession, SessionSettings};

/// Shared state for API handlers
pub struct ApiState {
    pub devices: Arc<DeviceRegistry>,
    /// Joystick settings handed to new sessions (updated on config reload)
    pub settings: RwLock<SessionSettings>,
    /// Built touch client, served for every non-API path
    pub static_dir: Option<PathBuf>,
}

impl ApiState {
    pub fn new(devices: Arc<DeviceRegistry>, settings: SessionSettings) -> Self {
        Self {
            devices,
            settings: RwLock::new(settings),
            static_dir: None,
        }
    }

    /// Serve the touch client from `dir` (`index.html` for directory paths)
    pub fn with_static_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.static_dir = Some(dir.into());
        self
    }
}

/// Request body for registering a device
#[derive(Debug, Deserialize)]
pub struct AddDeviceRequest {
    pub ip: String,
    pub port: u16,
}

/// Request body for text input
#[derive(Debug, Deserialize)]
pub struct TextInputRequest {
    pub text: String,
}

/// Response for GET /api/devices
#[derive(Debug, Serialize, Deserialize)]
pub struct DeviceListResponse {
    pub devices: Vec<String>,
}

/// Outcome of a device command
#[derive(Debug, Serialize, Deserialize)]
pub struct CommandResponse {
    pub success: bool,
    pub message: String,
}

impl CommandResponse {
    fn ok(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.into(),
        })
    }
}

/// API error response
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<DeviceError> for ApiError {
    fn from(err: DeviceError) -> Self {
        let status = match err {
            DeviceError::InvalidAddress(_) | DeviceError::InvalidPort(_) => StatusCode::BAD_REQUEST,
            DeviceError::NotFound(_) => StatusCode::NOT_FOUND,
            DeviceError::Driver { .. } => StatusCode::BAD_GATEWAY,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = CommandResponse {
            success: false,
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

/// Build the API router
pub fn build_router(state: Arc<ApiState>) -> Router {
    let mut router = Router::new()
        .route("/api/devices", get(list_devices).post(add_device))
        .route("/api/devices/:ip", get(get_device).delete(remove_device))
        .route("/api/devices/:ip/key/:key_name", post(send_key))
        .route("/api/devices/:ip/input/text", post(send_text))
        .route("/api/devices/:ip/joystick", get(joystick_ws))
        .route("/api/keys", get(list_keys))
        .route("/api/health", get(health_check));

    if let Some(dir) = &state.static_dir {
        router = router.fallback_service(ServeDir::new(dir));
    }

    router.layer(CorsLayer::permissive()).with_state(state)
}

/// GET /api/devices - List registered device addresses
async fn list_devices(State(state): State<Arc<ApiState>>) -> Json<DeviceListResponse> {
    Json(DeviceListResponse {
        devices: state.devices.list(),
    })
}

/// POST /api/devices - Register (or replace) a device
async fn add_device(
    State(state): State<Arc<ApiState>>,
    Json(req): Json<AddDeviceRequest>,
) -> Result<Json<CommandResponse>, ApiError> {
    let device = state.devices.add(&req.ip, req.port).await?;
    Ok(CommandResponse::ok(format!(
        "Device {}:{} added",
        device.ip, device.port
    )))
}

/// GET /api/devices/:ip - Registered device details
async fn get_device(
    Path(ip): Path<String>,
    State(state): State<Arc<ApiState>>,
) -> Result<Json<DeviceInfo>, ApiError> {
    Ok(Json(state.devices.get(&ip)?))
}

/// DELETE /api/devices/:ip - Unregister a device
async fn remove_device(
    Path(ip): Path<String>,
    State(state): State<Arc<ApiState>>,
) -> Result<Json<CommandResponse>, ApiError> {
    state.devices.remove(&ip).await?;
    Ok(CommandResponse::ok(format!("Device {} removed", ip)))
}

/// POST /api/devices/:ip/key/:key_name - Send a named key
async fn send_key(
    Path((ip, key_name)): Path<(String, String)>,
    State(state): State<Arc<ApiState>>,
) -> Result<Json<CommandResponse>, ApiError> {
    let key: RemoteKey = key_name
        .parse()
        .map_err(|e: crate::mapping::KeyParseError| ApiError::bad_request(e.to_string()))?;

    state.devices.send_key(&ip, key).await.map_err(|e| {
        warn!("Key {} for {} failed: {}", key, ip, e);
        ApiError::from(e)
    })?;

    Ok(CommandResponse::ok(format!("Key {} sent to {}", key, ip)))
}

/// POST /api/devices/:ip/input/text - Send text input
async fn send_text(
    Path(ip): Path<String>,
    State(state): State<Arc<ApiState>>,
    Json(req): Json<TextInputRequest>,
) -> Result<Json<CommandResponse>, ApiError> {
    state.devices.send_text(&ip, &req.text).await?;
    Ok(CommandResponse::ok(format!("Text sent to {}", ip)))
}

/// GET /api/devices/:ip/joystick - WebSocket joystick session
///
/// The device is checked before the upgrade, so an unknown ip answers 404
/// even to a well-formed upgrade request.
async fn joystick_ws(
    Path(ip): Path<String>,
    State(state): State<Arc<ApiState>>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    if let Err(e) = state.devices.get(&ip) {
        return ApiError::from(e).into_response();
    }

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return rejection.into_response(),
    };

    let settings = *state.settings.read();
    let devices = state.devices.clone();
    ws.on_upgrade(move |socket| session::run(socket, devices, ip, settings))
}

/// GET /api/keys - Accepted key names
async fn list_keys() -> Json<Vec<&'static str>> {
    Json(RemoteKey::ALL.iter().map(RemoteKey::as_str).collect())
}

/// GET /api/health - Health check endpoint
async fn health_check() -> &'static str {
    "ok"
}

/// Start the API server
pub async fn start_server(state: Arc<ApiState>, host: &str, port: u16) -> Result<()> {
    let router = build_router(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind API server on {}", addr))?;

    info!("🌐 Remote API listening on http://{}", addr);

    axum::serve(listener, router)
        .await
        .context("API server error")?;

    Ok(())
}
