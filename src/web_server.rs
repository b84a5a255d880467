use crate::cache::resolve_view;
use crate::config::{self, LocationConfig};
use crate::monitor::force_refresh;
use crate::mood::fingerprint_at;
use crate::sources::WeatherSnapshot;
use crate::state::AppState;
use crate::subscribers::RefreshEvent;
use axum::{
    body::Bytes,
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use serde::Deserialize;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::path::Component;
use std::sync::Arc;
use tokio::select;
use tokio::sync::broadcast::error::RecvError;

const READY_FOR_PUSH: &str = "ready_for_push";

type ApiResponse = (StatusCode, Json<Value>);

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/version", get(handle_version))
        .route("/api/weather", get(handle_weather))
        .route("/api/generate-image", post(handle_generate_image))
        .route("/api/auto-wallpaper", get(handle_auto_wallpaper))
        .route("/api/refresh-wallpaper", post(handle_refresh_wallpaper))
        .route(
            "/api/location-config",
            get(handle_get_location_config).post(handle_set_location_config),
        )
        .route("/static/wallpapers/:file", get(handle_wallpaper_file))
        .route("/ws", get(handle_ws))
        .with_state(state)
}

pub async fn start_server(state: Arc<AppState>, port: u16) -> Result<(), std::io::Error> {
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("[server] listening on http://{}", addr);
    axum::serve(listener, router(state).into_make_service()).await
}

fn error_body(status: StatusCode, message: impl Into<String>) -> ApiResponse {
    (status, Json(json!({ "error": message.into() })))
}

async fn handle_version() -> ApiResponse {
    (
        StatusCode::OK,
        Json(json!({ "version": env!("CARGO_PKG_VERSION") })),
    )
}

/// Live lookup for the cached location. Failures are reported in the body.
async fn handle_weather(State(state): State<Arc<AppState>>) -> ApiResponse {
    let location = state.cache.location().await.unwrap_or_default();
    let mut body = match state.weather.lookup(&location).await {
        Ok(snapshot) => json!({
            "weather": snapshot.weather,
            "temperature": snapshot.temperature,
            "humidity": snapshot.humidity,
            "wind_direction": snapshot.wind_direction,
            "wind_power": snapshot.wind_power,
            "update_time": snapshot.update_time,
        }),
        Err(e) => {
            warn!("[server] weather lookup failed: {}", e);
            json!({ "error": e.to_string() })
        }
    };
    body["province"] = json!(location.province);
    body["city"] = json!(location.city);
    body["county"] = json!(location.county);
    (StatusCode::OK, Json(body))
}

#[derive(Deserialize)]
struct GenerateImagePayload {
    prompt: Option<String>,
}

async fn handle_generate_image(State(state): State<Arc<AppState>>, body: Bytes) -> ApiResponse {
    let prompt = serde_json::from_slice::<GenerateImagePayload>(&body)
        .ok()
        .and_then(|payload| payload.prompt)
        .filter(|prompt| !prompt.trim().is_empty());
    match prompt {
        Some(prompt) => (
            StatusCode::OK,
            Json(json!({ "image_url": state.images.request_url(&prompt) })),
        ),
        None => error_body(StatusCode::BAD_REQUEST, "Prompt is required"),
    }
}

/// Cache-only view of the current wallpaper and conditions.
async fn handle_auto_wallpaper(State(state): State<Arc<AppState>>) -> ApiResponse {
    let snapshot = state.cache.snapshot().await;
    let view = resolve_view(&snapshot, &state.wallpaper_dir);
    let weather = snapshot
        .weather
        .clone()
        .unwrap_or_else(WeatherSnapshot::placeholder);
    let location = snapshot.location.clone().unwrap_or_default();
    let fingerprint = snapshot
        .fingerprint
        .unwrap_or_else(|| fingerprint_at(state.clock.now(), &weather.weather, state.solar));

    (
        StatusCode::OK,
        Json(json!({
            "prompt": view.prompt,
            "image_url": view.image_url,
            "weather": weather.weather,
            "temperature": weather.temperature,
            "humidity": weather.humidity,
            "wind_power": weather.wind_power,
            "province": location.province,
            "city": location.city,
            "county": location.county,
            "time_mood": fingerprint.time_mood,
            "weather_key": fingerprint.weather_key,
        })),
    )
}

async fn handle_refresh_wallpaper(State(state): State<Arc<AppState>>) -> ApiResponse {
    match force_refresh(&state).await {
        Ok(outcome) => {
            let message = if outcome.downloaded {
                "新壁纸生成成功"
            } else {
                "壁纸已存在"
            };
            (
                StatusCode::OK,
                Json(json!({
                    "success": true,
                    "message": message,
                    "filename": outcome.filename,
                    "prompt": outcome.prompt,
                })),
            )
        }
        Err(e) => {
            error!("[server] manual refresh failed: {}", e);
            error_body(StatusCode::INTERNAL_SERVER_ERROR, "壁纸生成失败，请稍后重试")
        }
    }
}

async fn handle_get_location_config(State(state): State<Arc<AppState>>) -> ApiResponse {
    let location = state.config.lock().await.location.clone();
    (StatusCode::OK, Json(json!(location)))
}

async fn handle_set_location_config(State(state): State<Arc<AppState>>, body: Bytes) -> ApiResponse {
    let location = match LocationConfig::from_json(&body) {
        Ok(location) => location,
        Err(e) => {
            warn!("[server] rejected location config: {}", e);
            return error_body(StatusCode::BAD_REQUEST, e.to_string());
        }
    };

    let mut config = state.config.lock().await;
    let mut updated = config.clone();
    updated.location = location.clone();
    if let Err(e) = config::save(&state.app_data_dir, &updated) {
        error!("[server] failed to persist location config: {}", e);
        return error_body(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
    }
    *config = updated;
    drop(config);

    info!(
        "[server] location config updated (auto: {})",
        location.auto_location
    );
    state.monitor_notify.notify_one();
    (StatusCode::OK, Json(json!(location)))
}

/// A bare file name: one normal path component, nothing else.
fn is_plain_file_name(name: &str) -> bool {
    let mut components = std::path::Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !name.contains(['/', '\\'])
}

async fn handle_wallpaper_file(
    State(state): State<Arc<AppState>>,
    Path(file): Path<String>,
) -> Response {
    if !is_plain_file_name(&file) {
        warn!("[server] refused wallpaper path {:?}", file);
        return StatusCode::NOT_FOUND.into_response();
    }
    let path = state.wallpaper_dir.join(&file);
    match tokio::fs::read(&path).await {
        Ok(content) => {
            let mime = mime_guess::from_path(&path)
                .first_or_octet_stream()
                .to_string();
            ([(header::CONTENT_TYPE, mime)], content).into_response()
        }
        Err(e) => {
            debug!("[server] wallpaper {} unavailable: {}", file, e);
            StatusCode::NOT_FOUND.into_response()
        }
    }
}

async fn handle_ws(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| push_session(socket, state))
}

fn is_ready_for_push(text: &str) -> bool {
    let text = text.trim();
    if text == READY_FOR_PUSH {
        return true;
    }
    serde_json::from_str::<Value>(text)
        .map(|v| v.get("event").and_then(Value::as_str) == Some(READY_FOR_PUSH))
        .unwrap_or(false)
}

fn push_message(event: &RefreshEvent) -> String {
    json!({ "event": "refresh_wallpaper", "data": event }).to_string()
}

/// One connection counts as at most one subscriber, released when it closes.
async fn push_session(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let mut events = state.subscribers.events();
    let mut subscribed = false;

    loop {
        select! {
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    if !subscribed && is_ready_for_push(&text) {
                        // Drop anything queued before the client asked for it.
                        events = events.resubscribe();
                        state.subscribers.subscribe();
                        subscribed = true;
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    debug!("[server] push socket error: {}", e);
                    break;
                }
                Some(Ok(_)) => {}
            },
            event = events.recv(), if subscribed => match event {
                Ok(event) => {
                    if sender.send(Message::Text(push_message(&event))).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("[server] push client lagged, skipped {} event(s)", skipped);
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    if subscribed {
        state.subscribers.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::testing::sample_image;
    use crate::mood::{TimeMood, WeatherKey};
    use crate::state::testing::HarnessBuilder;
    use tempfile::TempDir;

    #[test]
    fn ready_for_push_accepts_both_forms() {
        assert!(is_ready_for_push("ready_for_push"));
        assert!(is_ready_for_push(r#"{"event": "ready_for_push"}"#));
        assert!(!is_ready_for_push(r#"{"event": "ping"}"#));
        assert!(!is_ready_for_push("hello"));
    }

    #[test]
    fn push_message_shape() {
        let text = push_message(&RefreshEvent {
            time_mood: TimeMood::SunsetPeak,
            weather: WeatherKey::Rain,
        });
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(
            value,
            json!({"event": "refresh_wallpaper", "data": {"time_mood": "sunset_peak", "weather": "rain"}})
        );
    }

    #[test]
    fn traversal_is_refused() {
        assert!(is_plain_file_name("rainy night city.jpg"));
        assert!(!is_plain_file_name("../config.json"));
        assert!(!is_plain_file_name(".."));
        assert!(!is_plain_file_name("a/b.jpg"));
        assert!(!is_plain_file_name("..\\config.json"));
        assert!(!is_plain_file_name("/etc/passwd"));
    }

    #[tokio::test]
    async fn generate_image_requires_prompt() {
        let tmp = TempDir::new().unwrap();
        let h = HarnessBuilder::new().build(tmp.path());

        let (status, _) = handle_generate_image(State(h.state.clone()), Bytes::from_static(b"{}")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) =
            handle_generate_image(State(h.state.clone()), Bytes::from_static(br#"{"prompt": "  "}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, Json(body)) =
            handle_generate_image(State(h.state.clone()), Bytes::from_static(br#"{"prompt": "misty lake"}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["image_url"]
            .as_str()
            .unwrap()
            .starts_with("https://image.pollinations.ai/prompt/misty%20lake?"));
    }

    #[tokio::test]
    async fn auto_wallpaper_before_first_regeneration() {
        let tmp = TempDir::new().unwrap();
        let h = HarnessBuilder::new().build(tmp.path());

        let (status, Json(body)) = handle_auto_wallpaper(State(h.state.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["prompt"], "None");
        assert_eq!(body["image_url"], "");
        assert_eq!(body["weather"], "未知");
        assert_eq!(body["time_mood"], "night");
        assert_eq!(body["weather_key"], "clear");
    }

    #[tokio::test]
    async fn auto_wallpaper_after_refresh() {
        let tmp = TempDir::new().unwrap();
        let h = HarnessBuilder::new().build(tmp.path());
        std::fs::write(h.state.wallpaper_dir.join("rainy night city.jpg"), sample_image()).unwrap();

        let (status, Json(body)) = handle_refresh_wallpaper(State(h.state.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "壁纸已存在");
        assert_eq!(body["filename"], "rainy night city.jpg");

        let (_, Json(body)) = handle_auto_wallpaper(State(h.state.clone())).await;
        assert_eq!(body["prompt"], "rainy night city");
        assert_eq!(body["image_url"], "/static/wallpapers/rainy%20night%20city.jpg");
        assert_eq!(body["city"], "成都");
        assert_eq!(body["weather_key"], "rain");
    }

    #[tokio::test]
    async fn failed_refresh_is_a_server_error() {
        let tmp = TempDir::new().unwrap();
        let h = HarnessBuilder::new().build(tmp.path());

        let (status, Json(body)) = handle_refresh_wallpaper(State(h.state.clone())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn location_config_is_validated_and_persisted() {
        let tmp = TempDir::new().unwrap();
        let h = HarnessBuilder::new().build(tmp.path());

        let (status, _) = handle_set_location_config(
            State(h.state.clone()),
            Bytes::from_static(br#"{"auto_location": "no"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(h.state.config.lock().await.location.auto_location);

        let payload = r#"{"auto_location": false, "manual_location": {"province": "四川", "city": "成都", "county": "成华区"}}"#;
        let (status, Json(body)) =
            handle_set_location_config(State(h.state.clone()), Bytes::from(payload)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["auto_location"], false);

        let (_, Json(body)) = handle_get_location_config(State(h.state.clone())).await;
        assert_eq!(body["manual_location"]["county"], "成华区");
        let reloaded = config::load_or_init(&h.state.app_data_dir).unwrap();
        assert!(!reloaded.location.auto_location);
    }

    #[tokio::test]
    async fn weather_reports_lookup_errors_with_location() {
        let tmp = TempDir::new().unwrap();
        let h = HarnessBuilder::new().build(tmp.path());

        let (_, Json(body)) = handle_weather(State(h.state.clone())).await;
        assert!(body["error"].is_string());
        assert_eq!(body["province"], "");

        crate::monitor::refresh_conditions(&h.state).await;
        let (_, Json(body)) = handle_weather(State(h.state.clone())).await;
        assert_eq!(body["weather"], "小雨");
        assert_eq!(body["city"], "成都");
    }

    #[tokio::test]
    async fn wallpaper_files_are_served_with_content_type() {
        let tmp = TempDir::new().unwrap();
        let h = HarnessBuilder::new().build(tmp.path());
        std::fs::write(h.state.wallpaper_dir.join("default.jpg"), b"jpeg").unwrap();

        let resp = handle_wallpaper_file(State(h.state.clone()), Path("default.jpg".to_string())).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "image/jpeg");

        let resp = handle_wallpaper_file(State(h.state.clone()), Path("../config.json".to_string())).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let resp = handle_wallpaper_file(State(h.state.clone()), Path("missing.jpg".to_string())).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
