//! REST API for the packing engine.
//!
//! Provides HTTP endpoints to run the block-to-box assignment on posted data.
//! Uses Axum as the web framework and supports CORS.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{
    Router,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use std::sync::OnceLock;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::{Any, CorsLayer};
use utoipa::{OpenApi, ToSchema};

use crate::config::{ApiConfig, OptimizerConfig};
use crate::model::{BlockRecord, BoxRecord, ValidationError, validate_records};
use crate::optimizer::{
    PackingConfig, PackingResult, pack_blocks_with_config, pack_blocks_with_progress,
};
use crate::report::{Mappings, RunSummary};
use crate::types::Dims;

#[derive(Clone)]
struct ApiState {
    optimizer_config: OptimizerConfig,
}

static OPENAPI_DOC: OnceLock<utoipa::openapi::OpenApi> = OnceLock::new();

// SRI hashes verified against https://unpkg.com/swagger-ui-dist@5.17.14/ on 2025-10-29.
const SWAGGER_UI_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
    <head>
        <meta charset="utf-8" />
        <title>ffd-packer API Docs</title>
        <link
            rel="stylesheet"
            href="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui.css"
            integrity="sha384-wxLW6kwyHktdDGr6Pv1zgm/VGJh99lfUbzSn6HNHBENZlCN7W602k9VkGdxuFvPn"
            crossorigin="anonymous"
        />
    </head>
    <body>
        <div id="swagger-ui"></div>
        <script
            src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-bundle.js"
            integrity="sha384-wmyclcVGX/WhUkdkATwhaK1X1JtiNrr2EoYJ+diV3vj4v6OC5yCeSu+yW13SYJep"
            crossorigin="anonymous"
        ></script>
        <script>
            window.onload = function () {
                window.ui = SwaggerUIBundle({
                    url: "/docs/openapi.json",
                    dom_id: "#swagger-ui",
                });
            };
        </script>
    </body>
    </html>"##;

fn openapi_doc() -> &'static utoipa::openapi::OpenApi {
    OPENAPI_DOC.get_or_init(ApiDoc::openapi)
}

/// Request structure for the packing endpoints.
#[derive(Deserialize, Serialize, ToSchema)]
#[schema(
    example = json!({
        "boxes": [
            { "boxid": "B1", "length": 10.0, "width": 10.0, "height": 10.0 }
        ],
        "blocks": [
            { "blockid": "b1", "length": 5.0, "width": 5.0, "height": 5.0 }
        ],
        "prune_degenerate_leftovers": false
    })
)]
pub struct PackRequest {
    pub boxes: Vec<BoxRecord>,
    pub blocks: Vec<BlockRecord>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub prune_degenerate_leftovers: Option<bool>,
}

#[derive(Debug)]
struct ValidatedPackRequest {
    boxes: Vec<BoxRecord>,
    blocks: Vec<BlockRecord>,
    prune_degenerate_leftovers: Option<bool>,
}

impl ValidatedPackRequest {
    fn box_count(&self) -> usize {
        self.boxes.len()
    }

    fn block_count(&self) -> usize {
        self.blocks.len()
    }

    fn packing_config(&self, base: PackingConfig) -> PackingConfig {
        let mut config = base;
        if let Some(prune) = self.prune_degenerate_leftovers {
            config.prune_degenerate_leftovers = prune;
        }
        config
    }
}

#[derive(Debug)]
enum PackRequestValidationError {
    MissingBoxes,
    InvalidBox(ValidationError),
    InvalidBlock(ValidationError),
}

impl PackRequest {
    fn into_validated(self) -> Result<ValidatedPackRequest, PackRequestValidationError> {
        if self.boxes.is_empty() {
            return Err(PackRequestValidationError::MissingBoxes);
        }
        validate_records(&self.boxes).map_err(PackRequestValidationError::InvalidBox)?;
        validate_records(&self.blocks).map_err(PackRequestValidationError::InvalidBlock)?;

        Ok(ValidatedPackRequest {
            boxes: self.boxes,
            blocks: self.blocks,
            prune_degenerate_leftovers: self.prune_degenerate_leftovers,
        })
    }
}

/// Response structure with the assignments of a run.
#[derive(Serialize, ToSchema)]
pub struct PackResponse {
    #[serde(flatten)]
    pub mappings: Mappings,
    pub missed: Vec<BlockRecord>,
    pub is_complete: bool,
    pub summary: RunSummary,
}

impl PackResponse {
    /// Creates a PackResponse from a PackingResult.
    pub fn from_packing_result(result: &PackingResult) -> Self {
        Self {
            mappings: Mappings::from_result(result),
            missed: result.missed().map(|block| block.record.clone()).collect(),
            is_complete: result.is_complete(),
            summary: RunSummary::from_result(result),
        }
    }
}

#[derive(Serialize, ToSchema)]
struct ErrorResponse {
    error: String,
    details: String,
}

impl ErrorResponse {
    fn new(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: details.into(),
        }
    }
}

fn error_response(
    status: StatusCode,
    error: impl Into<String>,
    details: impl Into<String>,
) -> Response {
    (status, Json(ErrorResponse::new(error, details))).into_response()
}

fn json_deserialize_error(err: JsonRejection) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid JSON data",
        err.to_string(),
    )
}

fn validation_error(error: &str, details: impl Into<String>) -> Response {
    error_response(StatusCode::UNPROCESSABLE_ENTITY, error, details)
}

fn parse_pack_request(
    payload: Result<Json<PackRequest>, JsonRejection>,
) -> Result<ValidatedPackRequest, Response> {
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(err) => return Err(json_deserialize_error(err)),
    };

    match payload.into_validated() {
        Ok(validated) => Ok(validated),
        Err(PackRequestValidationError::MissingBoxes) => Err(validation_error(
            "Invalid input data",
            "At least one box must be specified",
        )),
        Err(PackRequestValidationError::InvalidBox(err)) => {
            Err(validation_error("Invalid box data", err.to_string()))
        }
        Err(PackRequestValidationError::InvalidBlock(err)) => {
            Err(validation_error("Invalid block data", err.to_string()))
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(handle_pack, handle_pack_stream),
    components(
        schemas(
            PackRequest,
            PackResponse,
            Mappings,
            RunSummary,
            ErrorResponse,
            BoxRecord,
            BlockRecord,
            Dims
        )
    ),
    tags((name = "packing", description = "Endpoints for block-to-box assignment"))
)]
struct ApiDoc;

fn router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    Router::new()
        .route("/pack", post(handle_pack))
        .route("/pack_stream", post(handle_pack_stream))
        .route("/docs/openapi.json", get(serve_openapi_json))
        .route("/docs", get(serve_openapi_ui))
        .layer(cors)
        .with_state(state)
}

/// Starts the API server.
///
/// Blocks until the server is terminated.
pub async fn start_api_server(config: ApiConfig, optimizer_config: OptimizerConfig) {
    let app = router(ApiState { optimizer_config });

    let addr = config.socket_addr();
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            eprintln!("❌ Could not bind API server to {}: {}", addr, err);
            return;
        }
    };

    let display_host = config.display_host().to_string();
    println!(
        "🚀 Server running on http://{}:{}",
        display_host,
        config.port()
    );
    if config.binds_to_all_interfaces() && config.uses_default_host() {
        println!("💡 Local access: http://localhost:{}", config.port());
    }
    println!("📦 API Endpoints:");
    println!("   - POST /pack");
    println!("   - POST /pack_stream");
    println!("📑 Documentation:");
    println!("   - GET /docs");
    println!("   - GET /docs/openapi.json");

    if let Err(err) = axum::serve(listener, app).await {
        eprintln!("❌ API server terminated with an error: {err}");
    }
}

/// Handler for POST /pack endpoint.
///
/// Assigns the posted blocks to the posted boxes and returns both mappings.
#[utoipa::path(
    post,
    path = "/pack",
    request_body = PackRequest,
    responses(
        (status = 200, description = "Assignment computed", body = PackResponse),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid request data",
            body = ErrorResponse
        )
    ),
    tag = "packing"
)]
async fn handle_pack(
    State(state): State<ApiState>,
    payload: Result<Json<PackRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match parse_pack_request(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };

    println!(
        "📥 New pack request: {} boxes, {} blocks",
        request.box_count(),
        request.block_count()
    );
    let packing_config = request.packing_config(state.optimizer_config.packing_config());
    let ValidatedPackRequest { boxes, blocks, .. } = request;

    let result = pack_blocks_with_config(boxes, blocks, packing_config);
    println!(
        "📦 Result: {} placed, {} missed, {} regions in pool",
        result.placed_count(),
        result.missed_count(),
        result.pool.len()
    );

    let response = PackResponse::from_packing_result(&result);
    (StatusCode::OK, Json(response)).into_response()
}

/// Handler for POST /pack_stream endpoint (SSE).
///
/// Streams placement events as Server-Sent Events (text/event-stream).
#[utoipa::path(
    post,
    path = "/pack_stream",
    request_body = PackRequest,
    responses(
        (
            status = 200,
            description = "Streams placement events in real-time",
            content_type = "text/event-stream",
            body = String
        ),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid request data",
            body = ErrorResponse
        )
    ),
    tag = "packing"
)]
async fn handle_pack_stream(
    State(state): State<ApiState>,
    payload: Result<Json<PackRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match parse_pack_request(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let packing_config = request.packing_config(state.optimizer_config.packing_config());
    let ValidatedPackRequest { boxes, blocks, .. } = request;

    let (tx, rx) = mpsc::channel::<String>(32);

    tokio::task::spawn_blocking(move || {
        let _ = pack_blocks_with_progress(boxes, blocks, packing_config, |evt| {
            if let Ok(json) = serde_json::to_string(evt) {
                // A closed receiver means the client went away; later events are dropped.
                let _ = tx.blocking_send(json);
            }
        });
    });

    let stream = ReceiverStream::new(rx)
        .map(|msg| Ok::<_, std::convert::Infallible>(Event::default().data(msg)));
    Sse::new(stream)
        .keep_alive(
            KeepAlive::new()
                .interval(std::time::Duration::from_secs(10))
                .text("keep-alive"),
        )
        .into_response()
}

async fn serve_openapi_json(State(_state): State<ApiState>) -> impl IntoResponse {
    Json(openapi_doc())
}

async fn serve_openapi_ui(State(_state): State<ApiState>) -> impl IntoResponse {
    Html(SWAGGER_UI_HTML)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_state() -> ApiState {
        ApiState {
            optimizer_config: crate::config::AppConfig::from_env().optimizer,
        }
    }

    fn sample_request() -> PackRequest {
        PackRequest {
            boxes: vec![BoxRecord {
                id: "B1".to_string(),
                dims: Dims::new(10.0, 10.0, 10.0),
            }],
            blocks: vec![
                BlockRecord {
                    id: "b1".to_string(),
                    dims: Dims::new(5.0, 5.0, 5.0),
                },
                BlockRecord {
                    id: "b2".to_string(),
                    dims: Dims::new(10.0, 10.0, 10.0),
                },
            ],
            prune_degenerate_leftovers: None,
        }
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Response body should be readable");
        serde_json::from_slice(&bytes).expect("Response body should be JSON")
    }

    #[test]
    fn openapi_doc_lists_expected_paths() {
        let doc = openapi_doc();
        let paths = &doc.paths.paths;
        assert!(
            paths.contains_key("/pack"),
            "OpenAPI documentation is missing the /pack path"
        );
        assert!(
            paths.contains_key("/pack_stream"),
            "OpenAPI documentation is missing the /pack_stream path"
        );
    }

    #[test]
    fn openapi_doc_contains_key_schemas() {
        let doc = openapi_doc();
        let components = doc
            .components
            .as_ref()
            .expect("OpenAPI documentation contains no components");
        let schemas = &components.schemas;
        for name in ["PackRequest", "PackResponse", "ErrorResponse", "BoxRecord"] {
            assert!(
                schemas.contains_key(name),
                "Expected schema '{}' is missing from the OpenAPI document",
                name
            );
        }
    }

    #[test]
    fn pack_request_parses_wire_format() {
        let json = r#"{
            "boxes": [{"boxid": "B1", "length": 10.0, "width": 10.0, "height": 10.0}],
            "blocks": [{"blockid": "b1", "length": 5.0, "width": 5.0, "height": 5.0}]
        }"#;
        let request: PackRequest = serde_json::from_str(json).expect("Should parse valid JSON");
        assert_eq!(request.boxes[0].id, "B1");
        assert_eq!(request.blocks[0].dims, Dims::new(5.0, 5.0, 5.0));
        assert_eq!(
            request.prune_degenerate_leftovers, None,
            "prune_degenerate_leftovers should be None when field is omitted"
        );
    }

    #[test]
    fn request_override_replaces_configured_pruning() {
        let mut request = sample_request();
        request.prune_degenerate_leftovers = Some(true);
        let validated = request
            .into_validated()
            .expect("Should validate successfully");
        let base = PackingConfig::builder()
            .prune_degenerate_leftovers(false)
            .build();
        assert!(validated.packing_config(base).prune_degenerate_leftovers);

        let validated = sample_request()
            .into_validated()
            .expect("Should validate successfully");
        let base = PackingConfig::builder()
            .prune_degenerate_leftovers(true)
            .build();
        assert!(
            validated.packing_config(base).prune_degenerate_leftovers,
            "Without an override the configured value should be preserved"
        );
    }

    #[test]
    fn validation_rejects_missing_boxes_and_duplicate_blocks() {
        let mut request = sample_request();
        request.boxes.clear();
        assert!(matches!(
            request.into_validated(),
            Err(PackRequestValidationError::MissingBoxes)
        ));

        let mut request = sample_request();
        request.blocks[1].id = "b1".to_string();
        assert!(matches!(
            request.into_validated(),
            Err(PackRequestValidationError::InvalidBlock(
                ValidationError::DuplicateIdentifier(_)
            ))
        ));
    }

    #[tokio::test]
    async fn handle_pack_returns_mappings_and_missed_blocks() {
        let response = handle_pack(State(test_state()), Ok(Json(sample_request())))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["Blockmapping"]["b1"], "B1");
        assert_eq!(body["Boxmapping"]["B1"], json!(["b1"]));
        assert_eq!(body["missed"][0]["blockid"], "b2");
        assert_eq!(body["is_complete"], false);
        assert_eq!(body["summary"]["placed"], 1);
    }

    #[tokio::test]
    async fn handle_pack_rejects_invalid_dimensions() {
        let mut request = sample_request();
        request.boxes[0].dims.height = f64::INFINITY;
        let response = handle_pack(State(test_state()), Ok(Json(request)))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = body_json(response).await;
        assert_eq!(body["error"], "Invalid box data");
    }
}
