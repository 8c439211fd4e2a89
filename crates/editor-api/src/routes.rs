use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use parking_lot::RwLock;
use serde_json::json;

use editor_html::sanitize::shared_sanitizer;
use editor_html::{
    sanitize_paste, validate_media_url, validate_url, Clipboard, EditorError, Locale, Modal, PasteOptions,
    SanitizedHtml, Sanitizer,
};
use runtime_axum::ServerState;

use crate::config::Config;

/// Settings that can change on reload
#[derive(Debug, Clone)]
struct Settings {
    locale: Locale,
    paste: PasteOptions,
}

pub struct App {
    sanitizer: Arc<Sanitizer>,
    settings: RwLock<Settings>,
}

pub type AppState = ServerState<App>;

impl App {
    pub fn new(config: &Config) -> Self {
        App {
            sanitizer: shared_sanitizer(),
            settings: RwLock::new(Settings {
                locale: config.locale,
                paste: config.paste.clone(),
            }),
        }
    }

    /// Swap in reloaded settings. The bind address only changes on restart.
    pub fn apply(&self, config: &Config) {
        let mut settings = self.settings.write();
        settings.locale = config.locale;
        settings.paste = config.paste.clone();
        info!(locale = %settings.locale, heading_max_chars = settings.paste.heading_max_chars, "settings reloaded");
    }
}

pub fn router(app: Arc<App>) -> Router {
    let router = Router::new()
        .route("/api/sanitize", post(sanitize))
        .route("/api/paste", post(paste))
        .route("/api/url/check", post(check_url))
        .route("/health", get(health))
        .with_state(ServerState::new(app));
    runtime_axum::with_standard_layers(router)
}

#[derive(Debug, serde::Deserialize)]
pub struct SanitizeRequest {
    html: String,
}

#[derive(Debug, serde::Serialize)]
pub struct HtmlResponse {
    html: SanitizedHtml,
}

async fn sanitize(State(state): State<AppState>, Json(request): Json<SanitizeRequest>) -> Json<HtmlResponse> {
    let html = state.sanitizer.clean(&request.html);
    debug!(input = request.html.len(), output = html.len(), "sanitized");
    Json(HtmlResponse { html })
}

async fn paste(State(state): State<AppState>, Json(clipboard): Json<Clipboard>) -> Json<HtmlResponse> {
    let options = state.settings.read().paste.clone();
    let html = sanitize_paste(&state.sanitizer, &clipboard, &options);
    debug!(from_html = clipboard.html.is_some(), output = html.len(), "paste converted");
    Json(HtmlResponse { html })
}

/// Which dialog the URL was typed into
#[derive(Debug, Clone, Copy, Default, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrlKind {
    #[default]
    Link,
    Image,
    Video,
}

impl UrlKind {
    fn modal(self) -> Modal {
        match self {
            UrlKind::Link => Modal::Link,
            UrlKind::Image => Modal::Image,
            UrlKind::Video => Modal::Video,
        }
    }
}

#[derive(Debug, serde::Deserialize)]
pub struct UrlCheckRequest {
    url: String,
    #[serde(default)]
    kind: UrlKind,
    locale: Option<Locale>,
}

async fn check_url(State(state): State<AppState>, Json(request): Json<UrlCheckRequest>) -> Response {
    let target = request.kind.modal();
    let checked = match target {
        Modal::Link => validate_url(&request.url),
        Modal::Image | Modal::Video => validate_media_url(&request.url),
    };

    match checked {
        Ok(url) => Json(json!({ "valid": true, "url": url.as_str() })).into_response(),
        Err(source) => {
            let locale = request.locale.unwrap_or_else(|| state.settings.read().locale);
            let error = EditorError::RejectedUrl { target, source };
            debug!("{}", runtime::utils::format_error_disp(&error));
            let body = json!({ "valid": false, "error": error.alert(locale) });
            (StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response()
        },
    }
}

async fn health() -> &'static str {
    "ok"
}
