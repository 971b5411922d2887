use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use aether_core::config::header_from_overrides;
use aether_core::{
    CoreConfig, IngestError, IngestionOrchestrator, LogSource, RecordStore, SubjectMatch,
};
use aether_ids::IdGenerator;
use api_shared::{
    ErrorRes, HealthRes, HealthService, IngestRes, ListLogsRes, ListPatientsRes, LogEntryRes,
    PatientSummary, ResetRes, TriageSummaryRes,
};
use fhir::{Bundle, EncounterRecord, ObservationRecord, PatientRecord};

type ApiError = (StatusCode, Json<ErrorRes>);

/// The store and the orchestrator that writes to it.
///
/// A batch holds the mutex from its first row to its last.
struct Pipeline {
    store: RecordStore,
    orchestrator: IngestionOrchestrator,
}

/// Application state shared across REST API handlers
#[derive(Clone)]
struct AppState {
    pipeline: Arc<Mutex<Pipeline>>,
}

impl AppState {
    fn new(store: RecordStore, orchestrator: IngestionOrchestrator) -> Self {
        Self {
            pipeline: Arc::new(Mutex::new(Pipeline {
                store,
                orchestrator,
            })),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Pipeline>, ApiError> {
        self.pipeline.lock().map_err(|_| {
            tracing::error!("pipeline lock poisoned");
            error(StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
        })
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        list_patients,
        get_patient,
        get_patient_bundle,
        list_encounters,
        list_observations,
        list_logs,
        triage_summary,
        ingest,
        reset
    ),
    components(schemas(
        HealthRes,
        ErrorRes,
        PatientSummary,
        ListPatientsRes,
        LogEntryRes,
        ListLogsRes,
        TriageSummaryRes,
        IngestRes,
        ResetRes
    ))
)]
struct ApiDoc;

/// Main entry point for the Aether intake REST server
///
/// # Environment Variables
/// - `AETHER_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `AETHER_DATA_DIR`: Directory for persisted collections (default: in memory)
/// - `AETHER_SENDING_APP`: Sending application written into message headers
/// - `AETHER_SENDING_FACILITY`: Sending facility written into message headers
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("aether_run=info".parse()?)
                .add_directive("aether_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("AETHER_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let data_dir = std::env::var("AETHER_DATA_DIR")
        .ok()
        .filter(|d| !d.trim().is_empty())
        .map(std::path::PathBuf::from);
    let header = header_from_overrides(
        std::env::var("AETHER_SENDING_APP").ok(),
        std::env::var("AETHER_SENDING_FACILITY").ok(),
    );
    let config = CoreConfig::new(data_dir, header, LogSource::GoogleForms)?;

    match config.data_dir() {
        Some(dir) => tracing::info!("++ Persisting collections under {}", dir.display()),
        None => tracing::info!("++ AETHER_DATA_DIR not set, keeping collections in memory"),
    }

    let store = config.open_store(chrono::Utc::now())?;
    let orchestrator = IngestionOrchestrator::new(&config, IdGenerator::default());
    let app = router(AppState::new(store, orchestrator));

    tracing::info!("++ Starting Aether REST on {}", rest_addr);
    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/patients", get(list_patients))
        .route("/patients/:id", get(get_patient))
        .route("/patients/:id/bundle", get(get_patient_bundle))
        .route("/patients/:id/encounters", get(list_encounters))
        .route("/patients/:id/observations", get(list_observations))
        .route("/logs", get(list_logs))
        .route("/summary", get(triage_summary))
        .route("/ingest", post(ingest))
        .route("/reset", post(reset))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorRes {
            error: message.into(),
        }),
    )
}

/// Storage failures are 500s; everything else is a 400.
fn ingest_error(err: IngestError) -> ApiError {
    match err {
        IngestError::Storage { .. } | IngestError::Serialization(_) => {
            tracing::error!("Ingest error: {:?}", err);
            error(StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
        }
        other => error(StatusCode::BAD_REQUEST, other.to_string()),
    }
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
async fn health() -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    get,
    path = "/patients",
    responses(
        (status = 200, description = "List of patients", body = ListPatientsRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// List all patients in insertion order
async fn list_patients(State(state): State<AppState>) -> Result<Json<ListPatientsRes>, ApiError> {
    let pipeline = state.lock()?;
    let patients = pipeline.store.patients().iter().map(PatientSummary::from).collect();
    Ok(Json(ListPatientsRes { patients }))
}

#[utoipa::path(
    get,
    path = "/patients/{id}",
    params(("id" = String, Path, description = "Patient id, e.g. p-1234")),
    responses(
        (status = 200, description = "FHIR-aligned Patient resource"),
        (status = 404, description = "No such patient", body = ErrorRes)
    )
)]
/// Fetch one Patient resource
async fn get_patient(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PatientRecord>, ApiError> {
    let pipeline = state.lock()?;
    pipeline
        .store
        .patient(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, format!("No patient with id {id}")))
}

#[utoipa::path(
    get,
    path = "/patients/{id}/bundle",
    params(("id" = String, Path, description = "Patient id, e.g. p-1234")),
    responses(
        (status = 200, description = "FHIR collection Bundle: the patient, then its encounters and observations"),
        (status = 404, description = "No such patient", body = ErrorRes)
    )
)]
/// Export a patient with its encounters and observations as one Bundle
async fn get_patient_bundle(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Bundle>, ApiError> {
    let pipeline = state.lock()?;
    pipeline
        .store
        .patient_bundle(&id)
        .map(Json)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, format!("No patient with id {id}")))
}

#[utoipa::path(
    get,
    path = "/patients/{id}/encounters",
    params(("id" = String, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Encounter resources whose subject is the patient")
    )
)]
/// List encounters for a patient (exact subject match)
async fn list_encounters(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<EncounterRecord>>, ApiError> {
    let pipeline = state.lock()?;
    let encounters = pipeline
        .store
        .encounters_for(&id, SubjectMatch::Exact)
        .into_iter()
        .cloned()
        .collect();
    Ok(Json(encounters))
}

#[utoipa::path(
    get,
    path = "/patients/{id}/observations",
    params(("id" = String, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Observation resources whose subject is the patient")
    )
)]
/// List observations for a patient (exact subject match)
async fn list_observations(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<ObservationRecord>>, ApiError> {
    let pipeline = state.lock()?;
    let observations = pipeline
        .store
        .observations_for(&id, SubjectMatch::Exact)
        .into_iter()
        .cloned()
        .collect();
    Ok(Json(observations))
}

#[utoipa::path(
    get,
    path = "/logs",
    responses(
        (status = 200, description = "Ingestion log, newest first", body = ListLogsRes)
    )
)]
/// List ingestion log entries, newest first
async fn list_logs(State(state): State<AppState>) -> Result<Json<ListLogsRes>, ApiError> {
    let pipeline = state.lock()?;
    let logs = pipeline.store.logs().into_iter().map(LogEntryRes::from).collect();
    Ok(Json(ListLogsRes { logs }))
}

#[utoipa::path(
    get,
    path = "/summary",
    responses(
        (status = 200, description = "Patient counts per triage level", body = TriageSummaryRes)
    )
)]
/// Count patients per triage level
async fn triage_summary(State(state): State<AppState>) -> Result<Json<TriageSummaryRes>, ApiError> {
    let pipeline = state.lock()?;
    Ok(Json(pipeline.store.triage_summary().into()))
}

#[utoipa::path(
    post,
    path = "/ingest",
    request_body(content = String, content_type = "text/csv", description = "Header line followed by data lines"),
    responses(
        (status = 200, description = "Batch ingested", body = IngestRes),
        (status = 400, description = "Batch rejected", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Ingest a CSV batch
///
/// Rejected rows do not fail the request; they appear as `Failed` entries in `/logs`.
async fn ingest(State(state): State<AppState>, body: String) -> Result<Json<IngestRes>, ApiError> {
    let mut pipeline = state.lock()?;
    let Pipeline {
        store,
        orchestrator,
    } = &mut *pipeline;
    let ingested = orchestrator.ingest_text(store, &body).map_err(ingest_error)?;
    Ok(Json(IngestRes { ingested }))
}

#[utoipa::path(
    post,
    path = "/reset",
    responses(
        (status = 200, description = "Store reset to the demo patient", body = ResetRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Clear every collection and reseed the demo patient
async fn reset(State(state): State<AppState>) -> Result<Json<ResetRes>, ApiError> {
    let mut pipeline = state.lock()?;
    let now = pipeline.orchestrator.ids().now();
    pipeline.store.reset(now).map_err(ingest_error)?;
    Ok(Json(ResetRes {
        patients: pipeline.store.patients().len(),
    }))
}
