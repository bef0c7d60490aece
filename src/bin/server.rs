//! privmap REST API Server
//!
//! Run with: cargo run --features server --bin privmap-server
//!
//! Endpoints:
//!   GET  /mappings           - Registered mapping entries
//!   GET  /roles/:id          - Role with its visible role selections
//!   POST /roles/:id          - Save role selections (needs access token)
//!   POST /verify             - Password check, returns access token
//!   POST /check              - Does a role hold a privilege

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use privmap::{
    Acl, Config, Lmdb, LmdbRoleStore, PrivilegeMappingEntry, PrivilegeResolver, PrivmapError, Role, RoleEditor,
    RoleStore, SaveContext, Verifier,
};

// ============================================================================
// State
// ============================================================================

struct AppState {
    resolver: PrivilegeResolver,
    store: LmdbRoleStore,
    verifier: Verifier,
}

type Shared = Arc<AppState>;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
struct SaveRoleReq {
    name: Option<String>,
    description: Option<String>,
    selected: Vec<String>,
    access: String,
}

#[derive(Deserialize)]
struct VerifyReq {
    user: String,
    password: String,
}

#[derive(Deserialize)]
struct CheckReq {
    role: String,
    privilege: String,
}

#[derive(Serialize)]
struct RoleView {
    role: Role,
    selected: Vec<String>,
}

#[derive(Serialize)]
struct CheckResult {
    allowed: bool,
    admin: bool,
}

#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self { success: true, data: Some(data), error: None }
    }

    fn err(msg: impl Into<String>) -> Self {
        Self { success: false, data: None, error: Some(msg.into()) }
    }
}

type Reply<T> = (StatusCode, Json<ApiResponse<T>>);

fn status_for(e: &PrivmapError) -> StatusCode {
    match e {
        PrivmapError::RoleNotFound(_) => StatusCode::NOT_FOUND,
        PrivmapError::InvalidToken | PrivmapError::TokenExpired | PrivmapError::InvalidCredentials => {
            StatusCode::UNAUTHORIZED
        }
        PrivmapError::AccessDenied(_) => StatusCode::FORBIDDEN,
        PrivmapError::VerificationRequired => StatusCode::PRECONDITION_REQUIRED,
        PrivmapError::Storage(_) | PrivmapError::Io(_) | PrivmapError::Entropy(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        _ => StatusCode::BAD_REQUEST,
    }
}

fn fail<T>(e: PrivmapError) -> Reply<T> {
    let status = status_for(&e);
    if status.is_server_error() {
        error!(error = %e, "request failed");
    }
    (status, Json(ApiResponse::err(e.to_string())))
}

// ============================================================================
// Handlers
// ============================================================================

async fn get_mappings(State(s): State<Shared>) -> Json<ApiResponse<Vec<PrivilegeMappingEntry>>> {
    Json(ApiResponse::ok(s.resolver.table().entries().to_vec()))
}

async fn get_role(State(s): State<Shared>, Path(id): Path<String>) -> Reply<RoleView> {
    match RoleEditor::load(&s.store, s.resolver.clone(), &id) {
        Ok(ed) => {
            let view = RoleView { selected: ed.selected().to_vec(), role: ed.role().clone() };
            (StatusCode::OK, Json(ApiResponse::ok(view)))
        }
        Err(e) => fail(e),
    }
}

async fn post_role(
    State(s): State<Shared>,
    Path(id): Path<String>,
    Json(req): Json<SaveRoleReq>,
) -> Reply<Vec<String>> {
    let mut role = match s.store.get(&id) {
        Ok(Some(r)) => r,
        Ok(None) => Role::new(id.clone(), id.clone()),
        Err(e) => return fail(e),
    };
    if let Some(name) = req.name {
        role.name = name;
    }
    if req.description.is_some() {
        role.description = req.description;
    }

    let mut ed = RoleEditor::from_role(s.resolver.clone(), role);
    ed.set_selection(&req.selected);
    ed.request_save();

    match ed.save(&s.store, &s.verifier, &SaveContext::new(req.access)) {
        Ok(()) => (StatusCode::OK, Json(ApiResponse::ok(ed.role().privileges.clone()))),
        Err(e) => fail(e),
    }
}

async fn post_verify(State(s): State<Shared>, Json(req): Json<VerifyReq>) -> Reply<SaveContext> {
    match s.verifier.issue(&req.user, &req.password) {
        Ok(ctx) => (StatusCode::OK, Json(ApiResponse::ok(ctx))),
        Err(e) => fail(e),
    }
}

async fn post_check(State(s): State<Shared>, Json(req): Json<CheckReq>) -> Reply<CheckResult> {
    let role = match s.store.get(&req.role) {
        Ok(Some(r)) => r,
        Ok(None) => return fail(PrivmapError::RoleNotFound(req.role)),
        Err(e) => return fail(e),
    };
    let acl = Acl::for_role(&s.resolver, &role);
    let res = CheckResult { allowed: acl.can(&req.privilege), admin: acl.is_admin() };
    (StatusCode::OK, Json(ApiResponse::ok(res)))
}

// ============================================================================
// Main
// ============================================================================

fn build_state(config: &Config) -> privmap::Result<AppState> {
    let table = config.build_mapping_table()?;
    let resolver = PrivilegeResolver::with_required(table, &config.required_privileges);
    let db = Lmdb::open(&config.db_path)?;
    Ok(AppState {
        resolver,
        store: LmdbRoleStore::new(db.clone()),
        verifier: Verifier::with_ttl(db, config.verification_ttl_secs),
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let state = Arc::new(build_state(&config)?);
    info!(
        mappings = state.resolver.table().len(),
        db = %config.db_path.display(),
        "privmap initialised"
    );

    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    let app = Router::new()
        .route("/mappings", get(get_mappings))
        .route("/roles/:id", get(get_role).post(post_role))
        .route("/verify", post(post_verify))
        .route("/check", post(post_check))
        .layer(cors)
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.bind).await?;
    info!(addr = %config.bind, "privmap server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
