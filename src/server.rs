//! Web API for the placement front-end

use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::error::CoreError;
use crate::fitting::{self, CabinetModel};
use crate::quad::{Corner, Point};
use crate::render::{self, CredentialStore, RenderError, RenderGateway, RenderResponse};
use crate::session::{PhotoLayout, Session};

/// Shared application state
pub struct AppState {
    /// The single session; every write goes through this lock
    pub session: RwLock<Session>,
    /// Credential for the render service
    credentials: Arc<dyn CredentialStore>,
    /// Render backend, if one is configured
    render: Option<RenderGateway>,
}

impl AppState {
    pub fn new(
        session: Session,
        credentials: Arc<dyn CredentialStore>,
        render: Option<RenderGateway>,
    ) -> Self {
        Self {
            session: RwLock::new(session),
            credentials,
            render,
        }
    }
}

/// Map core errors onto HTTP statuses
fn core_error(e: CoreError) -> Response {
    let status = match e {
        CoreError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        CoreError::DegenerateConfiguration { .. } => StatusCode::UNPROCESSABLE_ENTITY,
    };
    (status, e.to_string()).into_response()
}

fn render_error(e: RenderError) -> Response {
    let status = match e {
        RenderError::MissingCredential => StatusCode::UNAUTHORIZED,
        RenderError::InvalidImage(_) => StatusCode::BAD_REQUEST,
        RenderError::Service(_) => StatusCode::BAD_GATEWAY,
    };
    (status, e.to_string()).into_response()
}

fn json_or_error<T: Serialize>(result: Result<T, CoreError>) -> Response {
    match result {
        Ok(value) => Json(value).into_response(),
        Err(e) => core_error(e),
    }
}

/// Build the API router
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Sizing
        .route("/api/catalog", get(get_catalog))
        .route("/api/session", get(get_session))
        .route("/api/targets", post(set_targets))
        .route("/api/selection", post(set_selection))
        .route("/api/fit", post(post_fit))
        .route("/api/recommend", get(get_recommend))
        .route("/api/pitch/suggest", get(get_pitch_suggestion))
        // Placement
        .route("/api/layout", post(set_layout))
        .route("/api/quad", post(set_quad))
        .route("/api/quad/reset", post(reset_quad))
        .route("/api/quad/drag/move", post(drag_move))
        .route("/api/quad/drag/end", post(drag_end))
        .route("/api/quad/drag/:corner", post(drag_begin))
        .route("/api/quad/transform", get(get_transform))
        .route("/api/quad/simulation", get(get_simulation).post(set_simulation_width))
        .route("/api/magnifier", get(get_magnifier))
        // External render
        .route("/api/render", post(post_render))
        .route("/api/render/key", post(set_render_key))
        .route("/api/render/mode", post(set_render_mode))
        // System info
        .route("/api/info", get(get_info))
        .layer(cors)
        .with_state(state)
}

/// Run the web server
pub async fn run_server(addr: &str, state: Arc<AppState>) -> Result<()> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Web server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

#[derive(Serialize)]
struct CatalogResponse {
    cabinets: Vec<CabinetModel>,
    pitches: Vec<f64>,
}

async fn get_catalog(State(state): State<Arc<AppState>>) -> Json<CatalogResponse> {
    let session = state.session.read();
    Json(CatalogResponse {
        cabinets: session.cabinets().to_vec(),
        pitches: session.pitches().to_vec(),
    })
}

async fn get_session(State(state): State<Arc<AppState>>) -> Response {
    json_or_error(state.session.read().view())
}

#[derive(Deserialize)]
struct TargetsRequest {
    width_m: f64,
    height_m: f64,
}

async fn set_targets(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TargetsRequest>,
) -> Response {
    json_or_error(state.session.write().set_targets(req.width_m, req.height_m))
}

#[derive(Deserialize)]
struct SelectionRequest {
    cabinet_id: Option<String>,
    pitch_mm: Option<f64>,
}

async fn set_selection(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SelectionRequest>,
) -> Response {
    json_or_error(
        state
            .session
            .write()
            .select(req.cabinet_id.as_deref(), req.pitch_mm),
    )
}

#[derive(Deserialize)]
struct FitRequest {
    width_m: f64,
    height_m: f64,
    cabinet_id: String,
    pitch_mm: f64,
}

/// Stateless fit against the session's catalog
async fn post_fit(State(state): State<Arc<AppState>>, Json(req): Json<FitRequest>) -> Response {
    let session = state.session.read();
    json_or_error(fitting::fit_by_id(
        req.width_m,
        req.height_m,
        &req.cabinet_id,
        req.pitch_mm,
        session.cabinets(),
    ))
}

#[derive(Deserialize)]
struct SizeQuery {
    width: f64,
    height: f64,
}

async fn get_recommend(
    State(state): State<Arc<AppState>>,
    Query(q): Query<SizeQuery>,
) -> Response {
    let session = state.session.read();
    json_or_error(fitting::recommend(q.width, q.height, session.cabinets()))
}

#[derive(Deserialize)]
struct DistanceQuery {
    distance: f64,
}

async fn get_pitch_suggestion(
    State(state): State<Arc<AppState>>,
    Query(q): Query<DistanceQuery>,
) -> Response {
    let session = state.session.read();
    json_or_error(fitting::suggest_pitch(q.distance, session.pitches()))
}

async fn set_layout(
    State(state): State<Arc<AppState>>,
    Json(layout): Json<PhotoLayout>,
) -> Response {
    let mut session = state.session.write();
    match session.set_layout(layout) {
        Ok(()) => json_or_error(session.view()),
        Err(e) => core_error(e),
    }
}

#[derive(Deserialize)]
struct QuadRequest {
    points: Vec<Point>,
}

async fn set_quad(State(state): State<Arc<AppState>>, Json(req): Json<QuadRequest>) -> Response {
    json_or_error(state.session.write().set_quad(&req.points))
}

async fn reset_quad(State(state): State<Arc<AppState>>) -> Response {
    let mut session = state.session.write();
    match session.reset_quad() {
        Ok(true) => json_or_error(session.view()),
        Ok(false) => (StatusCode::CONFLICT, "No layout yet").into_response(),
        Err(e) => core_error(e),
    }
}

async fn drag_begin(State(state): State<Arc<AppState>>, Path(corner): Path<usize>) -> Response {
    let Some(corner) = Corner::from_index(corner) else {
        return (StatusCode::NOT_FOUND, "Unknown corner").into_response();
    };
    match state.session.write().begin_drag(corner) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => core_error(e),
    }
}

/// Pointer-move; a degenerate position answers 422 with the retained transform
async fn drag_move(State(state): State<Arc<AppState>>, Json(point): Json<Point>) -> Response {
    let update = state.session.write().drag_to(point);
    let status = if update.corner.is_some() && !update.solved {
        StatusCode::UNPROCESSABLE_ENTITY
    } else {
        StatusCode::OK
    };
    (status, Json(update)).into_response()
}

#[derive(Serialize)]
struct DragEndResponse {
    corner: Option<Corner>,
}

async fn drag_end(State(state): State<Arc<AppState>>) -> Json<DragEndResponse> {
    Json(DragEndResponse {
        corner: state.session.write().end_drag(),
    })
}

async fn get_transform(State(state): State<Arc<AppState>>) -> Response {
    match state.session.read().overlay() {
        Some(overlay) => Json(overlay.clone()).into_response(),
        None => (StatusCode::NOT_FOUND, "No quad placed").into_response(),
    }
}

async fn get_simulation(State(state): State<Arc<AppState>>) -> Response {
    match state.session.read().simulation() {
        Ok(Some(fit)) => Json(fit).into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, "No quad placed").into_response(),
        Err(e) => core_error(e),
    }
}

#[derive(Deserialize)]
struct SimulationWidthRequest {
    width_m: f64,
}

async fn set_simulation_width(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SimulationWidthRequest>,
) -> Response {
    let mut session = state.session.write();
    if let Err(e) = session.set_sim_width(req.width_m) {
        return core_error(e);
    }
    match session.simulation() {
        Ok(Some(fit)) => Json(fit).into_response(),
        Ok(None) => StatusCode::OK.into_response(),
        Err(e) => core_error(e),
    }
}

async fn get_magnifier(State(state): State<Arc<AppState>>) -> Response {
    match state.session.read().magnifier() {
        Some(view) => Json(view).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

#[derive(Deserialize)]
struct RenderRequestBody {
    /// Base64 PNG, optionally as a data URL
    image: String,
    /// Defaults to the session's render mode
    screen_on: Option<bool>,
}

async fn post_render(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RenderRequestBody>,
) -> Response {
    let Some(gateway) = state.render.clone() else {
        return (StatusCode::SERVICE_UNAVAILABLE, "No render backend configured").into_response();
    };
    let image = match render::decode_image(&req.image) {
        Ok(image) => image,
        Err(e) => return render_error(e),
    };
    // Read what we need and release the lock before awaiting
    let (pitch, render_mode) = {
        let session = state.session.read();
        (session.pitch_mm(), session.render_mode())
    };
    let screen_on = req.screen_on.unwrap_or(render_mode);

    match gateway.render(image, screen_on, pitch).await {
        Ok(outcome) => Json(RenderResponse::from(outcome)).into_response(),
        Err(e) => render_error(e),
    }
}

#[derive(Deserialize)]
struct RenderKeyRequest {
    api_key: String,
}

async fn set_render_key(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RenderKeyRequest>,
) -> StatusCode {
    state.credentials.set_api_key(req.api_key);
    StatusCode::OK
}

#[derive(Deserialize)]
struct RenderModeRequest {
    enabled: bool,
}

async fn set_render_mode(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RenderModeRequest>,
) -> Response {
    let mut session = state.session.write();
    session.set_render_mode(req.enabled);
    json_or_error(session.view())
}

/// System information response
#[derive(Serialize)]
struct InfoResponse {
    version: String,
    render_available: bool,
    render_key_set: bool,
}

async fn get_info(State(state): State<Arc<AppState>>) -> Json<InfoResponse> {
    Json(InfoResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        render_available: state.render.is_some(),
        render_key_set: state.credentials.api_key().is_some(),
    })
}
