//! Read-only JSON views over the central store.
//!
//! Each list endpoint exposes a fixed allow-list of fields from one table and
//! wraps the rows in a versioned envelope. Handlers open the store per request.

use std::net::SocketAddr;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::central::CentralStore;
use crate::columns::Aggregate;
use crate::error::SyncError;

pub const API_VERSION: &str = "v1";

/// One list endpoint: route, backing table and exposed fields.
#[derive(Debug, Clone, Copy)]
pub struct Resource {
    pub path: &'static str,
    pub table: &'static str,
    pub fields: &'static [&'static str],
    /// Whether `?crystal_name=` narrows this listing.
    pub by_crystal: bool,
}

pub const RESOURCES: &[Resource] = &[
    Resource {
        path: "/v1/proposals",
        table: "proposals",
        fields: &["proposal", "fedids"],
        by_crystal: false,
    },
    Resource {
        path: "/v1/soakdb_files",
        table: "soakdb_files",
        fields: &["filename", "modification_date", "proposal"],
        by_crystal: false,
    },
    Resource {
        path: "/v1/lab",
        table: "lab",
        fields: LAB_FIELDS,
        by_crystal: true,
    },
    Resource {
        path: "/v1/crystal",
        table: "crystal",
        fields: CRYSTAL_FIELDS,
        by_crystal: true,
    },
    Resource {
        path: "/v1/data_collection",
        table: "data_collection",
        fields: &["crystal_name", "date", "outcome", "wavelength"],
        by_crystal: true,
    },
    Resource {
        path: "/v1/data_processing",
        table: "data_processing",
        fields: DATA_PROCESSING_FIELDS,
        by_crystal: true,
    },
    Resource {
        path: "/v1/dimple",
        table: "dimple",
        fields: &["crystal_name", "r_free", "res_high", "reference_pdb"],
        by_crystal: true,
    },
    Resource {
        path: "/v1/refinement",
        table: "refinement",
        fields: REFINEMENT_FIELDS,
        by_crystal: true,
    },
];

const LAB_FIELDS: &[&str] = &[
    "cryo_frac",
    "cryo_status",
    "cryo_stock_frac",
    "cryo_transfer_vol",
    "crystal_name",
    "data_collection_visit",
    "expr_conc",
    "harvest_status",
    "library_name",
    "library_plate",
    "mounting_result",
    "mounting_time",
    "soak_status",
    "soak_time",
    "soak_vol",
    "solv_frac",
    "stock_conc",
    "visit",
];

const CRYSTAL_FIELDS: &[&str] = &[
    "crystal_name",
    "crystal_id",
    "tag",
    "name",
    "spacegroup",
    "point_group",
    "a",
    "b",
    "c",
    "alpha",
    "beta",
    "gamma",
    "volume",
];

const DATA_PROCESSING_FIELDS: &[&str] = &[
    "cchalf_high",
    "cchalf_low",
    "cchalf_overall",
    "completeness_high",
    "completeness_low",
    "completeness_overall",
    "crystal_name",
    "isig_high",
    "isig_low",
    "isig_overall",
    "lattice",
    "multiplicity_high",
    "multiplicity_low",
    "multiplicity_overall",
    "point_group",
    "program",
    "r_cryst",
    "r_free",
    "r_merge_high",
    "r_merge_low",
    "r_merge_overall",
    "res_high",
    "res_high_15_sigma",
    "res_high_outer_shell",
    "res_low",
    "res_low_inner_shell",
    "res_overall",
    "score",
    "spacegroup",
    "unique_ref_overall",
    "unit_cell",
    "unit_cell_vol",
];

const REFINEMENT_FIELDS: &[&str] = &[
    "bound_conf",
    "cif",
    "cif_prog",
    "cif_status",
    "crystal_name",
    "lig_bound_conf",
    "lig_cc",
    "lig_confidence",
    "matrix_weight",
    "molprobity_score",
    "mtz_free",
    "mtz_latest",
    "outcome",
    "pdb_latest",
    "r_free",
    "ramachandran_favoured",
    "ramachandran_outliers",
    "rcryst",
    "refinement_path",
    "res",
    "rmsd_angles",
    "rmsd_bonds",
    "spacegroup",
];

#[derive(Debug, Clone)]
pub struct ApiState {
    db_path: Utf8PathBuf,
}

impl ApiState {
    pub fn new(db_path: Utf8PathBuf) -> Self {
        Self { db_path }
    }

    fn open(&self) -> Result<CentralStore, ApiError> {
        CentralStore::open_read_only(&self.db_path).map_err(ApiError::from)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Envelope<T: Serialize> {
    api_version: &'static str,
    data: T,
}

fn envelope<T: Serialize>(data: T) -> Json<Envelope<T>> {
    Json(Envelope {
        api_version: API_VERSION,
        data,
    })
}

#[derive(Debug, Clone, Serialize)]
struct ErrorBody {
    api_version: &'static str,
    error: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }
}

impl From<SyncError> for ApiError {
    fn from(err: SyncError) -> Self {
        tracing::warn!(error = %err, "request failed");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            api_version: API_VERSION,
            error: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CrystalFilter {
    pub crystal_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
struct HealthResponse {
    status: &'static str,
}

type Rows = Vec<Map<String, JsonValue>>;

pub fn router(state: ApiState) -> Router {
    let mut router = Router::new()
        .route("/v1/health", get(health))
        .route("/v1/crystals/:crystal_name", get(crystal_detail));
    for resource in RESOURCES {
        router = router.route(
            resource.path,
            get(
                move |state: State<ApiState>, filter: Query<CrystalFilter>| async move {
                    list_resource(state, filter, resource)
                },
            ),
        );
    }
    router.with_state(state)
}

pub async fn serve(bind: SocketAddr, db_path: Utf8PathBuf) -> Result<(), SyncError> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|err| SyncError::Server(format!("bind {bind}: {err}")))?;
    tracing::info!(%bind, db = %db_path, "serving central store");
    axum::serve(listener, router(ApiState::new(db_path)))
        .await
        .map_err(|err| SyncError::Server(err.to_string()))
}

async fn health() -> Json<Envelope<HealthResponse>> {
    envelope(HealthResponse { status: "ok" })
}

fn list_resource(
    State(state): State<ApiState>,
    Query(filter): Query<CrystalFilter>,
    resource: &Resource,
) -> Result<Json<Envelope<Rows>>, ApiError> {
    let store = state.open()?;
    let crystal_name = filter
        .crystal_name
        .as_deref()
        .filter(|_| resource.by_crystal);
    let rows = store.select_projection(resource.table, resource.fields, crystal_name)?;
    Ok(envelope(rows))
}

/// The crystal record with its refinement and data processing rows nested.
async fn crystal_detail(
    State(state): State<ApiState>,
    Path(crystal_name): Path<String>,
) -> Result<Json<Envelope<Map<String, JsonValue>>>, ApiError> {
    let store = state.open()?;
    let mut record = store
        .select_projection(Aggregate::Crystal.table(), CRYSTAL_FIELDS, Some(crystal_name.as_str()))?
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::not_found(format!("unknown crystal: {crystal_name}")))?;

    let refinement = nested(&store, Aggregate::Refinement, &crystal_name)?;
    let data_proc = nested(&store, Aggregate::DataProcessing, &crystal_name)?;
    record.insert("refinement".to_string(), JsonValue::Array(refinement));
    record.insert("data_proc".to_string(), JsonValue::Array(data_proc));
    Ok(envelope(record))
}

fn nested(
    store: &CentralStore,
    aggregate: Aggregate,
    crystal_name: &str,
) -> Result<Vec<JsonValue>, ApiError> {
    let fields = aggregate.field_names();
    Ok(store
        .select_projection(aggregate.table(), &fields, Some(crystal_name))?
        .into_iter()
        .map(JsonValue::Object)
        .collect())
}
