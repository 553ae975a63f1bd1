//! REST API for the loading planner.
//!
//! Provides HTTP endpoints for communication with the frontend.
//! Uses Axum as the web framework and supports CORS.
//!
//! All endpoints operate on one shared loading plan; requests are
//! serialized through its lock, so the plan always reflects the
//! operations in arrival order.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{
    Router,
    http::{StatusCode, Uri, header},
    response::{Html, IntoResponse, Response},
    routing::{delete, get, post},
};
use rust_embed::RustEmbed;
use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::{Any, CorsLayer};
use utoipa::{OpenApi, ToSchema};

use crate::config::{ApiConfig, PlannerConfig};
use crate::drag::Point;
use crate::model::{BatchSpec, TruckDims, ValidationError};
use crate::placement::UnplacedPallet;
use crate::plan::{LoadPlan, PalletView, PlanError, PlanSnapshot};
use crate::report::{self, GroupLdm, LdmSummary};

#[derive(Clone)]
struct ApiState {
    plan: Arc<Mutex<LoadPlan>>,
}

static OPENAPI_DOC: OnceLock<utoipa::openapi::OpenApi> = OnceLock::new();

// SRI hashes verified against https://unpkg.com/swagger-ui-dist@5.17.14/ on 2025-10-29.
const SWAGGER_UI_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
    <head>
        <meta charset="utf-8" />
        <title>lademeter API Docs</title>
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
        <script
            src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-standalone-preset.js"
            integrity="sha384-2YH8WDRaj7V2OqU/trsmzSagmk/E2SutiCsGkdgoQwC9pNUJV1u/141DHB6jgs8t"
            crossorigin="anonymous"
        ></script>
        <script>
            window.onload = function () {
                const ui = SwaggerUIBundle({
                    url: "/docs/openapi.json",
                    dom_id: "#swagger-ui",
                    presets: [SwaggerUIBundle.presets.apis, SwaggerUIStandalonePreset],
                    layout: "StandaloneLayout",
                });
                window.ui = ui;
            };
        </script>
    </body>
    </html>"##;

fn openapi_doc() -> &'static utoipa::openapi::OpenApi {
    OPENAPI_DOC.get_or_init(ApiDoc::openapi)
}

/// Embedded Web Assets (HTML, CSS, JS)
#[derive(RustEmbed)]
#[folder = "web/"]
struct WebAssets;

/// Locks the plan, recovering the data if a previous holder panicked.
fn lock_plan(plan: &Mutex<LoadPlan>) -> MutexGuard<'_, LoadPlan> {
    match plan.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Request structure for creating one load group.
///
/// All pallets of the group share these dimensions; ids, the group id and
/// the display color are assigned by the plan. `allow_rotation` overrides
/// the configured rotation allowance for this placement pass only.
#[derive(Deserialize, Clone, Copy, ToSchema)]
#[schema(example = json!({"width": 80, "length": 120, "quantity": 3, "allow_rotation": true}))]
pub struct AddGroupRequest {
    pub width: i32,
    pub length: i32,
    pub quantity: i32,
    #[serde(default)]
    #[schema(nullable = true)]
    pub allow_rotation: Option<bool>,
}

impl AddGroupRequest {
    fn to_spec(self, truck: &TruckDims) -> Result<BatchSpec, ValidationError> {
        BatchSpec::new(self.width, self.length, self.quantity, truck)
    }
}

/// Response after creating a load group.
///
/// # Fields
/// * `group_id` - Id of the new group
/// * `placed` - Pallets placed during this pass (including retries)
/// * `unplaced` - Pallets that found no free position
/// * `is_complete` - Whether every pallet of the pass was placed
/// * `plan` - The full plan after the pass
#[derive(Serialize, ToSchema)]
pub struct AddGroupResponse {
    pub group_id: u32,
    pub placed: usize,
    pub unplaced: Vec<UnplacedPallet>,
    pub is_complete: bool,
    pub plan: PlanSnapshot,
}

/// Response after removing a load group.
#[derive(Serialize, ToSchema)]
pub struct RemoveGroupResponse {
    pub placed: usize,
    pub unplaced: Vec<UnplacedPallet>,
    pub is_complete: bool,
    pub plan: PlanSnapshot,
}

/// Request structure for starting a drag gesture.
#[derive(Deserialize, Clone, Copy, ToSchema)]
#[schema(example = json!({"pallet_id": 0, "pointer": {"x": 40, "y": 20}}))]
pub struct DragStartRequest {
    pub pallet_id: u32,
    pub pointer: Point,
}

/// Request structure for one pointer movement of the active gesture.
#[derive(Deserialize, Clone, Copy, ToSchema)]
#[schema(example = json!({"pointer": {"x": 160, "y": 35}}))]
pub struct DragMoveRequest {
    pub pointer: Point,
}

#[derive(Serialize, ToSchema)]
pub struct DragStartResponse {
    pub position: Point,
}

/// Live position plus the LDM figures, refreshed on every movement.
#[derive(Serialize, ToSchema)]
pub struct DragMoveResponse {
    pub position: Point,
    pub ldm: LdmSummary,
}

#[derive(Serialize, ToSchema)]
pub struct DragEndResponse {
    pub position: Point,
    pub plan: PlanSnapshot,
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

fn validation_error(details: impl Into<String>) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid input data",
        details,
    )
}

fn parse_json<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, Response> {
    match payload {
        Ok(Json(value)) => Ok(value),
        Err(err) => Err(json_deserialize_error(err)),
    }
}

/// Maps a plan error to the matching HTTP response.
///
/// Unknown ids are 404; everything else is a state conflict (409) that
/// leaves the plan untouched.
fn plan_error_response(err: PlanError) -> Response {
    let (status, error) = match err {
        PlanError::UnknownGroup(_) => (StatusCode::NOT_FOUND, "Unknown group"),
        PlanError::UnknownPallet(_) => (StatusCode::NOT_FOUND, "Unknown pallet"),
        PlanError::NotPlaced(_) => (StatusCode::CONFLICT, "Pallet has no position"),
        PlanError::RotationInfeasible(_) => (StatusCode::CONFLICT, "Rotation not possible"),
        PlanError::DragInProgress => (StatusCode::CONFLICT, "Drag gesture already active"),
        PlanError::NoActiveDrag => (StatusCode::CONFLICT, "No active drag gesture"),
    };
    error_response(status, error, err.to_string())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handle_plan,
        handle_add_group,
        handle_add_group_stream,
        handle_remove_group,
        handle_clear,
        handle_rotate,
        handle_drag_start,
        handle_drag_move,
        handle_drag_end
    ),
    components(
        schemas(
            AddGroupRequest,
            AddGroupResponse,
            RemoveGroupResponse,
            DragStartRequest,
            DragMoveRequest,
            DragStartResponse,
            DragMoveResponse,
            DragEndResponse,
            ErrorResponse,
            PlanSnapshot,
            PalletView,
            UnplacedPallet,
            TruckDims,
            Point,
            LdmSummary,
            GroupLdm
        )
    ),
    tags((name = "plan", description = "Endpoints for pallet placement and LDM reporting"))
)]
struct ApiDoc;

/// Starts the API server.
///
/// Configures CORS for cross-origin requests from the frontend.
/// Blocks until the server is terminated.
pub async fn start_api_server(config: ApiConfig, planner_config: PlannerConfig) {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let state = ApiState {
        plan: Arc::new(Mutex::new(LoadPlan::new(planner_config.placement_config()))),
    };

    let app = Router::new()
        // API endpoints
        .route("/plan", get(handle_plan))
        .route("/groups", post(handle_add_group))
        .route("/groups_stream", post(handle_add_group_stream))
        .route("/groups/{id}", delete(handle_remove_group))
        .route("/clear", post(handle_clear))
        .route("/pallets/{id}/rotate", post(handle_rotate))
        .route("/drag/start", post(handle_drag_start))
        .route("/drag/move", post(handle_drag_move))
        .route("/drag/end", post(handle_drag_end))
        // API documentation
        .route("/docs/openapi.json", get(serve_openapi_json))
        .route("/docs", get(serve_openapi_ui))
        // Web-UI (embedded)
        .route("/", get(serve_index))
        .route("/{*path}", get(serve_static))
        .layer(cors)
        .with_state(state);

    let addr = config.socket_addr();
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            panic!("❌ Could not bind API server to {}: {}", addr, err);
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
    println!("🚛 API Endpoints:");
    println!("   - GET /plan");
    println!("   - POST /groups");
    println!("   - POST /groups_stream");
    println!("   - DELETE /groups/{{id}}");
    println!("   - POST /clear");
    println!("   - POST /pallets/{{id}}/rotate");
    println!("   - POST /drag/start | /drag/move | /drag/end");
    println!("📑 Documentation:");
    println!("   - GET /docs");
    println!("   - GET /docs/openapi.json");
    println!("🌐 Web-UI: http://{}:{}", display_host, config.port());

    if let Err(err) = axum::serve(listener, app).await {
        eprintln!("❌ API server terminated with an error: {err}");
    }
}

/// Handler for GET /plan endpoint.
///
/// Returns the current loading plan including the LDM summary.
#[utoipa::path(
    get,
    path = "/plan",
    responses(
        (status = 200, description = "Current loading plan with LDM summary", body = PlanSnapshot)
    ),
    tag = "plan"
)]
async fn handle_plan(State(state): State<ApiState>) -> impl IntoResponse {
    let plan = lock_plan(&state.plan);
    (StatusCode::OK, Json(plan.snapshot())).into_response()
}

/// Handler for POST /groups endpoint.
///
/// Creates a load group of identical pallets and runs the placement pass.
/// Pallets that find no free position stay in the plan and are retried
/// when space is freed.
///
/// # Parameters
/// * `payload` - JSON payload with pallet dimensions and quantity
///
/// # Returns
/// JSON response with the placement report and the full plan
#[utoipa::path(
    post,
    path = "/groups",
    request_body = AddGroupRequest,
    responses(
        (status = 200, description = "Group created and placed", body = AddGroupResponse),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid batch data",
            body = ErrorResponse
        )
    ),
    tag = "plan"
)]
async fn handle_add_group(
    State(state): State<ApiState>,
    payload: Result<Json<AddGroupRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match parse_json(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let mut plan = lock_plan(&state.plan);
    let spec = match request.to_spec(&plan.config().truck) {
        Ok(spec) => spec,
        Err(err) => return validation_error(err.to_string()),
    };

    println!(
        "📥 New load group: {}x{} cm, {} pallets",
        request.length, request.width, request.quantity
    );
    let (group_id, report) = plan.add_group_with_progress(spec, request.allow_rotation, |_| {});
    println!(
        "🚛 Group {}: {} placed, {} waiting",
        group_id,
        report.placed,
        report.unplaced.len()
    );

    let response = AddGroupResponse {
        group_id,
        placed: report.placed,
        is_complete: report.is_complete(),
        unplaced: report.unplaced,
        plan: plan.snapshot(),
    };
    (StatusCode::OK, Json(response)).into_response()
}

/// Handler for POST /groups_stream endpoint (SSE).
///
/// Streams placement events in real-time as Server-Sent Events
/// (text/event-stream). The frontend can visualize every single pallet
/// placement live without waiting for the complete result.
#[utoipa::path(
    post,
    path = "/groups_stream",
    request_body = AddGroupRequest,
    responses(
        (
            status = 200,
            description = "Streams placement events in real-time",
            content_type = "text/event-stream",
            body = String
        ),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid batch data",
            body = ErrorResponse
        )
    ),
    tag = "plan"
)]
async fn handle_add_group_stream(
    State(state): State<ApiState>,
    payload: Result<Json<AddGroupRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match parse_json(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };

    // Validate against the configured bed before the stream starts, so
    // bad input still gets a regular 422 instead of an empty stream.
    let spec = {
        let plan = lock_plan(&state.plan);
        match request.to_spec(&plan.config().truck) {
            Ok(spec) => spec,
            Err(err) => return validation_error(err.to_string()),
        }
    };

    let (tx, rx) = mpsc::channel::<String>(32);
    let shared = Arc::clone(&state.plan);
    let allow_rotation = request.allow_rotation;

    tokio::task::spawn_blocking(move || {
        let mut plan = lock_plan(&shared);
        plan.add_group_with_progress(spec, allow_rotation, |evt| {
            if let Ok(json) = serde_json::to_string(evt) {
                if tx.blocking_send(json).is_err() {
                    // Receiver has closed the stream; remaining events are discarded.
                    return;
                }
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

/// Handler for DELETE /groups/{id} endpoint.
///
/// Removes a whole load group. Pallets of other groups that were still
/// waiting are retried immediately, since the removal may have freed the
/// space they need.
#[utoipa::path(
    delete,
    path = "/groups/{id}",
    params(("id" = u32, Path, description = "Group id to remove")),
    responses(
        (status = 200, description = "Group removed", body = RemoveGroupResponse),
        (status = NOT_FOUND, description = "Unknown group", body = ErrorResponse)
    ),
    tag = "plan"
)]
async fn handle_remove_group(
    State(state): State<ApiState>,
    Path(group_id): Path<u32>,
) -> impl IntoResponse {
    let mut plan = lock_plan(&state.plan);
    match plan.remove_group(group_id) {
        Ok(report) => {
            println!(
                "🗑️ Group {} removed, {} waiting pallets re-placed",
                group_id, report.placed
            );
            let response = RemoveGroupResponse {
                placed: report.placed,
                is_complete: report.is_complete(),
                unplaced: report.unplaced,
                plan: plan.snapshot(),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(err) => plan_error_response(err),
    }
}

/// Handler for POST /clear endpoint.
///
/// Empties the plan and resets all counters.
#[utoipa::path(
    post,
    path = "/clear",
    responses((status = 200, description = "Plan emptied", body = PlanSnapshot)),
    tag = "plan"
)]
async fn handle_clear(State(state): State<ApiState>) -> impl IntoResponse {
    let mut plan = lock_plan(&state.plan);
    plan.clear();
    println!("🧹 Plan cleared");
    (StatusCode::OK, Json(plan.snapshot())).into_response()
}

/// Handler for POST /pallets/{id}/rotate endpoint.
///
/// Toggles the rotation of a placed pallet. The pallet keeps its origin
/// if the swapped footprint fits in place, otherwise it moves to the
/// first free position; if none exists the pallet stays unchanged.
#[utoipa::path(
    post,
    path = "/pallets/{id}/rotate",
    params(("id" = u32, Path, description = "Pallet id to rotate")),
    responses(
        (status = 200, description = "Pallet rotated", body = PlanSnapshot),
        (status = NOT_FOUND, description = "Unknown pallet", body = ErrorResponse),
        (
            status = CONFLICT,
            description = "Rotation has no valid position",
            body = ErrorResponse
        )
    ),
    tag = "plan"
)]
async fn handle_rotate(
    State(state): State<ApiState>,
    Path(pallet_id): Path<u32>,
) -> impl IntoResponse {
    let mut plan = lock_plan(&state.plan);
    match plan.rotate_pallet(pallet_id) {
        Ok(()) => (StatusCode::OK, Json(plan.snapshot())).into_response(),
        Err(err) => plan_error_response(err),
    }
}

/// Handler for POST /drag/start endpoint.
///
/// Starts a drag gesture on a placed pallet. The pointer position fixes
/// the grab offset for all following movements.
#[utoipa::path(
    post,
    path = "/drag/start",
    request_body = DragStartRequest,
    responses(
        (status = 200, description = "Gesture started", body = DragStartResponse),
        (status = NOT_FOUND, description = "Unknown pallet", body = ErrorResponse),
        (status = CONFLICT, description = "Another gesture is active", body = ErrorResponse)
    ),
    tag = "plan"
)]
async fn handle_drag_start(
    State(state): State<ApiState>,
    payload: Result<Json<DragStartRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match parse_json(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let mut plan = lock_plan(&state.plan);
    match plan.drag_start(request.pallet_id, request.pointer) {
        Ok(position) => (StatusCode::OK, Json(DragStartResponse { position })).into_response(),
        Err(err) => plan_error_response(err),
    }
}

/// Handler for POST /drag/move endpoint.
///
/// Resolves one pointer movement into the next valid live position
/// (clamped to the bed, stopped at obstructions) and commits it.
#[utoipa::path(
    post,
    path = "/drag/move",
    request_body = DragMoveRequest,
    responses(
        (status = 200, description = "Live position after the movement", body = DragMoveResponse),
        (status = CONFLICT, description = "No active gesture", body = ErrorResponse)
    ),
    tag = "plan"
)]
async fn handle_drag_move(
    State(state): State<ApiState>,
    payload: Result<Json<DragMoveRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match parse_json(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let mut plan = lock_plan(&state.plan);
    match plan.drag_move(request.pointer) {
        Ok(position) => {
            let ldm = report::summarize(plan.pallets());
            (StatusCode::OK, Json(DragMoveResponse { position, ldm })).into_response()
        }
        Err(err) => plan_error_response(err),
    }
}

/// Handler for POST /drag/end endpoint.
///
/// Ends the active gesture; the last committed live position becomes
/// final.
#[utoipa::path(
    post,
    path = "/drag/end",
    responses(
        (status = 200, description = "Gesture finished", body = DragEndResponse),
        (status = CONFLICT, description = "No active gesture", body = ErrorResponse)
    ),
    tag = "plan"
)]
async fn handle_drag_end(State(state): State<ApiState>) -> impl IntoResponse {
    let mut plan = lock_plan(&state.plan);
    match plan.drag_end() {
        Ok(position) => {
            let response = DragEndResponse {
                position,
                plan: plan.snapshot(),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(err) => plan_error_response(err),
    }
}

/// Serves the index.html main page
async fn serve_index() -> Response {
    match WebAssets::get("index.html") {
        Some(content) => Html(content.data).into_response(),
        None => (StatusCode::NOT_FOUND, "404 Not Found").into_response(),
    }
}

/// Serves static assets (JS, CSS, etc.)
async fn serve_static(uri: Uri) -> Response {
    let path = uri.path().trim_start_matches('/');

    match WebAssets::get(path) {
        Some(content) => {
            let mime = mime_guess::from_path(path).first_or_octet_stream();
            ([(header::CONTENT_TYPE, mime.as_ref())], content.data).into_response()
        }
        None => (StatusCode::NOT_FOUND, "404 Not Found").into_response(),
    }
}

async fn serve_openapi_json(State(_state): State<ApiState>) -> impl IntoResponse {
    Json(openapi_doc())
}

async fn serve_openapi_ui(State(_state): State<ApiState>) -> impl IntoResponse {
    Html(SWAGGER_UI_HTML)
}
