//! REST API for the layout service.
//!
//! Exposes the layout engine to the dashboard over HTTP. Uses Axum as the
//! web framework and supports CORS.

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

use crate::config::{ApiConfig, LayoutEngineConfig};
use crate::diagnostics::LayoutDiagnostics;
use crate::layout::{
    LayoutConfig, UsableInterior, compute_placements_with_config, compute_placements_with_progress,
};
use crate::model::{
    CategoryMass, CategoryVolume, PlacementView, ValidationError, WarehouseBounds,
    validate_categories,
};

#[derive(Clone)]
struct ApiState {
    engine: LayoutEngineConfig,
}

static OPENAPI_DOC: OnceLock<utoipa::openapi::OpenApi> = OnceLock::new();

// SRI hashes verified against https://unpkg.com/swagger-ui-dist@5.17.14/ on 2025-10-29.
const SWAGGER_UI_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
    <head>
        <meta charset="utf-8" />
        <title>warehouse-layout API Docs</title>
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

/// One material category in a layout request.
///
/// Exactly one of `volume` (m³) and `mass_kg` must be given. Masses are
/// converted with the configured bulk density.
#[derive(Deserialize, Clone, ToSchema)]
pub struct CategoryRequest {
    pub name: String,
    #[serde(default)]
    #[schema(nullable = true)]
    pub volume: Option<f64>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub mass_kg: Option<f64>,
}

impl CategoryRequest {
    fn into_category(self, density_kg_per_m3: f64) -> Result<CategoryVolume, ValidationError> {
        match (self.volume, self.mass_kg) {
            (Some(volume), None) => Ok(CategoryVolume::new(self.name, volume)),
            (None, Some(mass_kg)) => Ok(CategoryMass {
                name: self.name,
                mass_kg,
            }
            .into_volume(density_kg_per_m3)),
            (Some(_), Some(_)) => Err(ValidationError::AmbiguousQuantity(self.name)),
            (None, None) => Err(ValidationError::MissingQuantity(self.name)),
        }
    }
}

#[derive(Deserialize, ToSchema)]
#[schema(
    example = json!({
        "bounds": { "length": 40.0, "width": 25.0, "height": 8.0 },
        "categories": [
            { "name": "timber", "volume": 18.5 },
            { "name": "steel", "mass_kg": 7850.0 }
        ]
    })
)]
pub struct LayoutRequest {
    pub bounds: WarehouseBounds,
    #[serde(default)]
    pub categories: Vec<CategoryRequest>,
}

#[derive(Debug)]
struct ValidatedLayoutRequest {
    bounds: WarehouseBounds,
    categories: Vec<CategoryVolume>,
}

#[derive(Debug)]
enum LayoutRequestValidationError {
    InvalidBounds(ValidationError),
    InvalidCategory(ValidationError),
}

impl LayoutRequest {
    fn into_validated(
        self,
        density_kg_per_m3: f64,
    ) -> Result<ValidatedLayoutRequest, LayoutRequestValidationError> {
        self.bounds
            .validate()
            .map_err(LayoutRequestValidationError::InvalidBounds)?;

        let categories = self
            .categories
            .into_iter()
            .map(|category| category.into_category(density_kg_per_m3))
            .collect::<Result<Vec<_>, ValidationError>>()
            .map_err(LayoutRequestValidationError::InvalidCategory)?;
        validate_categories(&categories).map_err(LayoutRequestValidationError::InvalidCategory)?;

        Ok(ValidatedLayoutRequest {
            bounds: self.bounds,
            categories,
        })
    }
}

/// Response with all placements, largest category first.
#[derive(Serialize, ToSchema)]
pub struct LayoutResponse {
    pub placements: Vec<PlacementView>,
    pub diagnostics: LayoutDiagnostics,
}

impl LayoutResponse {
    fn compute(request: &ValidatedLayoutRequest, config: LayoutConfig) -> Self {
        let interior = UsableInterior::from_bounds(&request.bounds, &config);
        let placements =
            compute_placements_with_config(&request.categories, &request.bounds, config);
        let diagnostics = LayoutDiagnostics::evaluate(&placements, &interior, &config);

        Self {
            placements: placements.iter().map(|p| p.to_owned_view()).collect(),
            diagnostics,
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

fn parse_layout_request(
    payload: Result<Json<LayoutRequest>, JsonRejection>,
    density_kg_per_m3: f64,
) -> Result<ValidatedLayoutRequest, Response> {
    let Json(payload) = payload.map_err(json_deserialize_error)?;

    payload
        .into_validated(density_kg_per_m3)
        .map_err(|err| match err {
            LayoutRequestValidationError::InvalidBounds(err) => error_response(
                StatusCode::UNPROCESSABLE_ENTITY,
                "Invalid warehouse bounds",
                err.to_string(),
            ),
            LayoutRequestValidationError::InvalidCategory(err) => error_response(
                StatusCode::UNPROCESSABLE_ENTITY,
                "Invalid input data",
                err.to_string(),
            ),
        })
}

#[derive(OpenApi)]
#[openapi(
    paths(handle_layout, handle_layout_stream, handle_health),
    components(
        schemas(
            LayoutRequest,
            CategoryRequest,
            WarehouseBounds,
            LayoutResponse,
            PlacementView,
            LayoutDiagnostics,
            ErrorResponse
        )
    ),
    tags((name = "layout", description = "Occupancy layout for the warehouse view"))
)]
struct ApiDoc;

fn router(engine: LayoutEngineConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    Router::new()
        .route("/layout", post(handle_layout))
        .route("/layout_stream", post(handle_layout_stream))
        .route("/health", get(handle_health))
        .route("/docs/openapi.json", get(serve_openapi_json))
        .route("/docs", get(serve_openapi_ui))
        .layer(cors)
        .with_state(ApiState { engine })
}

/// Starts the API server and serves until it is terminated.
pub async fn start_api_server(
    config: ApiConfig,
    engine: LayoutEngineConfig,
) -> std::io::Result<()> {
    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(
        "Server running on http://{}:{}",
        config.display_host(),
        config.port()
    );
    if config.binds_to_all_interfaces() && config.uses_default_host() {
        tracing::info!("Local access: http://localhost:{}", config.port());
    }
    tracing::info!("Endpoints: POST /layout, POST /layout_stream, GET /health, GET /docs");

    axum::serve(listener, router(engine)).await
}

/// Handler for POST /layout.
///
/// Computes the occupancy layout for one warehouse snapshot.
#[utoipa::path(
    post,
    path = "/layout",
    request_body = LayoutRequest,
    responses(
        (status = 200, description = "Layout computed", body = LayoutResponse),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid bounds or categories",
            body = ErrorResponse
        )
    ),
    tag = "layout"
)]
async fn handle_layout(
    State(state): State<ApiState>,
    payload: Result<Json<LayoutRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match parse_layout_request(payload, state.engine.density_kg_per_m3()) {
        Ok(request) => request,
        Err(response) => return response,
    };

    tracing::info!(
        categories = request.categories.len(),
        "New layout request for {}x{}x{} warehouse",
        request.bounds.length,
        request.bounds.width,
        request.bounds.height
    );
    let response = LayoutResponse::compute(&request, state.engine.layout_config());
    tracing::info!(
        placements = response.placements.len(),
        layers = response.diagnostics.layers,
        "Layout computed"
    );

    (StatusCode::OK, Json(response)).into_response()
}

/// Handler for POST /layout_stream (SSE).
///
/// Streams layout events as they happen, followed by the diagnostics
/// report, so the frontend can animate the boxes while they are placed.
#[utoipa::path(
    post,
    path = "/layout_stream",
    request_body = LayoutRequest,
    responses(
        (
            status = 200,
            description = "Streams layout events in real-time",
            content_type = "text/event-stream",
            body = String
        ),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid bounds or categories",
            body = ErrorResponse
        )
    ),
    tag = "layout"
)]
async fn handle_layout_stream(
    State(state): State<ApiState>,
    payload: Result<Json<LayoutRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match parse_layout_request(payload, state.engine.density_kg_per_m3()) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let (tx, rx) = mpsc::channel::<String>(32);
    let config = state.engine.layout_config();

    tokio::task::spawn_blocking(move || {
        let interior = UsableInterior::from_bounds(&request.bounds, &config);
        let placements =
            compute_placements_with_progress(&request.categories, &request.bounds, config, |evt| {
                match serde_json::to_string(evt) {
                    // A closed receiver drops the remaining events.
                    Ok(json) => {
                        let _ = tx.blocking_send(json);
                    }
                    Err(err) => tracing::error!("Could not serialize layout event: {err}"),
                }
            });

        let diagnostics = LayoutDiagnostics::evaluate(&placements, &interior, &config);
        let summary = json!({ "type": "Diagnostics", "diagnostics": diagnostics });
        let _ = tx.blocking_send(summary.to_string());
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

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is running", body = String)),
    tag = "layout"
)]
async fn handle_health() -> &'static str {
    "ok"
}

async fn serve_openapi_json(State(_state): State<ApiState>) -> impl IntoResponse {
    Json(openapi_doc())
}

async fn serve_openapi_ui(State(_state): State<ApiState>) -> impl IntoResponse {
    Html(SWAGGER_UI_HTML)
}
