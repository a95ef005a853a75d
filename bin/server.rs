// Dialysis Reports - Web Server
// REST API over the table store: dataset status, imports, report previews

use anyhow::{Context, Result};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use dialysis_reports::reports::{rescheduled_table, rescheduled_total};
use dialysis_reports::{
    build_report, AppConfig, Dataset, ImportInfo, ImportJob, PresentationTable, ReportError,
    ReportGroup, ReportParams, TableStore, REPORT_GROUPS,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::cors::CorsLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Shared application state
#[derive(Clone)]
struct AppState {
    store: Arc<Mutex<TableStore>>,
}

impl AppState {
    fn lock(&self) -> Result<MutexGuard<'_, TableStore>, Response> {
        self.store.lock().map_err(|_| {
            error!("table store lock poisoned");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "database unavailable")
        })
    }
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

fn api_error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ApiResponse::<()>::err(message))).into_response()
}

fn report_error(e: ReportError) -> Response {
    let status = match &e {
        ReportError::UnknownReport(_) => StatusCode::NOT_FOUND,
        ReportError::InvalidPeriod { .. } => StatusCode::BAD_REQUEST,
        ReportError::MissingUpstreamData { .. } => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        error!(error = %e, "report failed");
    }
    api_error(status, e.to_string())
}

/// Dataset status row
#[derive(Serialize)]
struct DatasetResponse {
    table_name: &'static str,
    title: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_import: Option<ImportInfo>,
}

#[derive(Serialize)]
struct CorrectionsResponse {
    total: i64,
    table: PresentationTable,
}

#[derive(Deserialize)]
struct ReportQuery {
    clinic: Option<String>,
    month: u32,
    year: i32,
}

#[derive(Deserialize)]
struct ImportRequest {
    path: PathBuf,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/datasets - Last import of every dataset
async fn get_datasets(State(state): State<AppState>) -> Response {
    let store = match state.lock() {
        Ok(store) => store,
        Err(response) => return response,
    };

    let datasets: Vec<DatasetResponse> = Dataset::ALL
        .iter()
        .map(|&dataset| DatasetResponse {
            table_name: dataset.table_name(),
            title: dataset.title(),
            last_import: store.last_import_info(dataset),
        })
        .collect();

    Json(ApiResponse::ok(datasets)).into_response()
}

/// GET /api/groups - Report groups (imports, corrections, exports)
async fn get_groups() -> impl IntoResponse {
    Json(ApiResponse::<&[ReportGroup]>::ok(REPORT_GROUPS))
}

/// POST /api/import/:dataset - Import a file already on the server's disk
async fn import_dataset(
    State(state): State<AppState>,
    Path(dataset): Path<String>,
    Json(request): Json<ImportRequest>,
) -> Response {
    let job = match ImportJob::for_dataset_name(&dataset, request.path) {
        Ok(job) => job,
        Err(e) => return api_error(StatusCode::NOT_FOUND, e.to_string()),
    };

    let mut store = match state.lock() {
        Ok(store) => store,
        Err(response) => return response,
    };

    let status = job.execute(&mut store, |progress| {
        info!(dataset = %job.dataset, percent = progress.percent(), "import progress");
    });

    let code = if status.success {
        StatusCode::OK
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    };
    (code, Json(ApiResponse::ok(status))).into_response()
}

/// GET /api/reports/:name?month=&year=&clinic= - Render a report preview
async fn get_report(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<ReportQuery>,
) -> Response {
    // Report names carry spaces and accents ("Geral Convênio")
    let name = urlencoding::decode(&name)
        .map(|n| n.into_owned())
        .unwrap_or(name);

    let report = match ReportParams::new(query.clinic.as_deref(), query.month, query.year)
        .and_then(|params| build_report(&name, params))
    {
        Ok(report) => report,
        Err(e) => return report_error(e),
    };

    let store = match state.lock() {
        Ok(store) => store,
        Err(response) => return response,
    };

    match report.render(&store) {
        Ok(rendered) => Json(ApiResponse::ok(rendered)).into_response(),
        Err(e) => report_error(e),
    }
}

/// GET /api/corrections/remarcacoes - Rescheduled sessions
async fn get_rescheduled(State(state): State<AppState>) -> Response {
    let store = match state.lock() {
        Ok(store) => store,
        Err(response) => return response,
    };

    Json(ApiResponse::ok(CorrectionsResponse {
        total: rescheduled_total(&store),
        table: rescheduled_table(&store),
    }))
    .into_response()
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("🌐 Dialysis Reports - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let config_path = std::env::var_os("DIALISE_CONFIG").map(PathBuf::from);
    let config = AppConfig::load(config_path.as_deref())?;

    let store = TableStore::open(&config.database_path).with_context(|| {
        format!("Failed to open database {}", config.database_path.display())
    })?;
    println!("✓ Database opened: {}", config.database_path.display());

    let state = AppState {
        store: Arc::new(Mutex::new(store)),
    };

    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/datasets", get(get_datasets))
        .route("/groups", get(get_groups))
        .route("/import/:dataset", post(import_dataset))
        .route("/reports/:name", get(get_report))
        .route("/corrections/remarcacoes", get(get_rescheduled))
        .with_state(state);

    let app = Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&config.server_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.server_addr))?;

    println!("\n🚀 Server running on http://{}", config.server_addr);
    println!("   API: http://{}/api/datasets", config.server_addr);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app)
        .await
        .context("Server stopped unexpectedly")
}
