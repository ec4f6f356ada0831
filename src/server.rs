//! HTTP surface of the service.
//!
//! | Route | Handler |
//! |-------|---------|
//! | `GET /` | service metadata |
//! | `GET /status` | fixed liveness body |
//! | `GET /docs` | route listing |
//! | `POST /extract` | data-URI JSON body → card JSON |
//! | `POST /direct-markdown` | multipart `file` upload → `{"markdown": …}` |
//!
//! Handlers hold no state of their own; [`AppState`] only carries the shared
//! [`ModelGateway`] (and through it the read-only [`ServiceConfig`]).

use crate::config::ServiceConfig;
use crate::error::CardReaderError;
use crate::output::{MarkdownResponse, ServiceInfo, StatusResponse};
use crate::pipeline::llm::ModelGateway;
use crate::pipeline::normalize::{normalize_from_bytes, normalize_from_data_uri};
use axum::{
    body::Bytes,
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

/// Multipart field carrying the image for `POST /direct-markdown`.
pub const UPLOAD_FIELD: &str = "file";

/// Path of the route listing advertised by `GET /`.
pub const DOCS_PATH: &str = "/docs";

/// `(method, path, description)` for every route, as served at [`DOCS_PATH`].
const ROUTES: [(&str, &str, &str); 5] = [
    ("GET", "/", "service metadata"),
    ("GET", "/status", "liveness check"),
    ("GET", DOCS_PATH, "this route listing"),
    (
        "POST",
        "/extract",
        "JSON {\"image_base64\": \"data:image/<type>;base64,...\"} -> business-card JSON",
    ),
    (
        "POST",
        "/direct-markdown",
        "multipart upload, field \"file\" -> {\"markdown\": ...}",
    ),
];

/// State shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    gateway: Arc<ModelGateway>,
}

impl AppState {
    pub fn new(config: Arc<ServiceConfig>) -> Result<Self, CardReaderError> {
        Ok(Self {
            gateway: Arc::new(ModelGateway::new(config)?),
        })
    }

    fn config(&self) -> &ServiceConfig {
        self.gateway.config()
    }
}

/// Body of `POST /extract`.
#[derive(Debug, Deserialize)]
pub struct ExtractRequest {
    /// `data:image/<type>;base64,<payload>`
    pub image_base64: String,
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let body_limit = state.config().max_upload_bytes;
    Router::new()
        .route("/", get(root))
        .route("/status", get(status))
        .route(DOCS_PATH, get(docs))
        .route("/extract", post(extract))
        .route("/direct-markdown", post(direct_markdown))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `addr` and serve until Ctrl-C.
pub async fn serve(addr: &str, config: ServiceConfig) -> Result<(), CardReaderError> {
    let state = AppState::new(Arc::new(config))?;
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| CardReaderError::Bind {
            addr: addr.to_string(),
            source,
        })?;
    info!("Card reader listening on http://{}", addr);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| CardReaderError::Internal(format!("server error: {e}")))
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────────

async fn root(State(state): State<AppState>) -> Json<ServiceInfo> {
    let config = state.config();
    Json(ServiceInfo {
        service: config.service_name.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: "operational".to_string(),
        environment: config.environment.clone(),
        docs_url: DOCS_PATH.to_string(),
    })
}

async fn status() -> Json<StatusResponse> {
    Json(StatusResponse::default())
}

async fn docs() -> Json<Value> {
    let routes: Vec<Value> = ROUTES
        .iter()
        .map(|(method, path, description)| {
            json!({ "method": method, "path": path, "description": description })
        })
        .collect();
    Json(json!({ "routes": routes }))
}

async fn extract(
    State(state): State<AppState>,
    Json(req): Json<ExtractRequest>,
) -> Result<Json<Value>, CardReaderError> {
    let image = normalize_from_data_uri(&req.image_base64)?;
    let card = state.gateway.extract(&image).await?;
    info!("Extraction served");
    Ok(Json(card))
}

async fn direct_markdown(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<MarkdownResponse>, CardReaderError> {
    let (bytes, content_type) = read_upload(&mut multipart, UPLOAD_FIELD).await?;
    let image = normalize_from_bytes(&bytes, content_type.as_deref());
    let markdown = state.gateway.transcribe_markdown(&image).await?;
    info!("Transcription served: {} chars", markdown.len());
    Ok(Json(MarkdownResponse { markdown }))
}

/// Find `field` in the multipart body and read it fully.
async fn read_upload(
    multipart: &mut Multipart,
    field: &str,
) -> Result<(Bytes, Option<String>), CardReaderError> {
    while let Some(part) = multipart.next_field().await.map_err(invalid_upload)? {
        if part.name() == Some(field) {
            let content_type = part.content_type().map(str::to_string);
            let bytes = part.bytes().await.map_err(invalid_upload)?;
            debug!(
                "Received upload: {} bytes ({})",
                bytes.len(),
                content_type.as_deref().unwrap_or("no content type")
            );
            return Ok((bytes, content_type));
        }
    }
    Err(CardReaderError::MissingUpload {
        field: field.to_string(),
    })
}

fn invalid_upload(e: MultipartError) -> CardReaderError {
    let reason = e.body_text();
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        CardReaderError::UploadTooLarge { reason }
    } else {
        CardReaderError::InvalidUpload { reason }
    }
}

// ── Error mapping ────────────────────────────────────────────────────────────

/// HTTP status for each error kind.
pub fn status_code(err: &CardReaderError) -> StatusCode {
    match err {
        CardReaderError::InvalidEncoding { .. }
        | CardReaderError::MissingUpload { .. }
        | CardReaderError::InvalidUpload { .. } => StatusCode::BAD_REQUEST,
        CardReaderError::UploadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        CardReaderError::GatewayTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        CardReaderError::ModelUnreachable { .. } => StatusCode::BAD_GATEWAY,
        CardReaderError::Gateway { .. }
        | CardReaderError::InvalidModelResponse { .. }
        | CardReaderError::ResponseParse { .. }
        | CardReaderError::InvalidConfig(_)
        | CardReaderError::Bind { .. }
        | CardReaderError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for CardReaderError {
    fn into_response(self) -> Response {
        let status = status_code(&self);
        if self.is_client_error() {
            debug!("Rejected request ({}): {}", status.as_u16(), self);
        } else {
            warn!("Request failed ({}): {}", status.as_u16(), self);
        }

        let detail = match &self {
            CardReaderError::ResponseParse { raw } => json!({
                "error": "Failed to parse JSON",
                "raw_output": raw,
            }),
            other => Value::String(other.to_string()),
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(resp: Response) -> Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn state() -> AppState {
        let config = ServiceConfig::builder()
            .endpoint("http://127.0.0.1:9/v1/chat/completions")
            .api_key("k")
            .model("m")
            .environment("staging")
            .build()
            .unwrap();
        AppState::new(Arc::new(config)).unwrap()
    }

    #[test]
    fn status_mapping() {
        let cases = [
            (
                CardReaderError::InvalidEncoding { reason: "x".into() },
                StatusCode::BAD_REQUEST,
            ),
            (
                CardReaderError::MissingUpload { field: "file".into() },
                StatusCode::BAD_REQUEST,
            ),
            (
                CardReaderError::UploadTooLarge {
                    reason: "length limit exceeded".into(),
                },
                StatusCode::PAYLOAD_TOO_LARGE,
            ),
            (
                CardReaderError::Gateway { status: 503, body: "x".into() },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                CardReaderError::InvalidModelResponse { body: "x".into() },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                CardReaderError::ResponseParse { raw: "x".into() },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                CardReaderError::GatewayTimeout { secs: 1 },
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (
                CardReaderError::ModelUnreachable {
                    endpoint: "http://x".into(),
                    reason: "refused".into(),
                },
                StatusCode::BAD_GATEWAY,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(status_code(&err), expected, "for {err:?}");
        }
    }

    #[tokio::test]
    async fn parse_error_body_carries_raw_output() {
        let resp = CardReaderError::ResponseParse {
            raw: "not json".into(),
        }
        .into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(resp).await;
        assert_eq!(body["detail"]["error"], "Failed to parse JSON");
        assert_eq!(body["detail"]["raw_output"], "not json");
    }

    #[tokio::test]
    async fn gateway_error_body_embeds_upstream_text() {
        let resp = CardReaderError::Gateway {
            status: 500,
            body: "upstream exploded".into(),
        }
        .into_response();
        let body = body_json(resp).await;
        assert!(body["detail"]
            .as_str()
            .unwrap()
            .contains("upstream exploded"));
    }

    #[tokio::test]
    async fn root_reports_metadata() {
        let Json(info) = root(State(state())).await;
        assert_eq!(info.service, "Card Reader Service");
        assert_eq!(info.status, "operational");
        assert_eq!(info.environment, "staging");
        assert_eq!(info.docs_url, "/docs");
        assert_eq!(info.version, env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn docs_lists_every_route() {
        let Json(body) = docs().await;
        let paths: Vec<&str> = body["routes"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["path"].as_str().unwrap())
            .collect();
        assert_eq!(paths, ["/", "/status", "/docs", "/extract", "/direct-markdown"]);
    }

    #[tokio::test]
    async fn status_is_fixed() {
        let Json(body) = status().await;
        assert_eq!(body, StatusResponse::default());
    }
}
