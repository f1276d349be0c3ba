//! API request handlers
//!
//! Handlers for all REST API endpoints. Formula diagnostics are data: a
//! formula with errors still gets `success: true`, with the errors in `data`.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::server::AppState;
use crate::functions::{Category, FunctionSpec};
use crate::session::CheckReport;
use crate::types::FormulaError;

/// Standard API response wrapper
#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            request_id: Uuid::new_v4().to_string(),
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self
    where
        T: Default,
    {
        Self {
            success: false,
            request_id: Uuid::new_v4().to_string(),
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Root endpoint response
#[derive(Serialize)]
pub struct RootResponse {
    pub name: String,
    pub version: String,
    pub description: String,
    pub endpoints: Vec<EndpointInfo>,
}

#[derive(Serialize)]
pub struct EndpointInfo {
    pub path: String,
    pub method: String,
    pub description: String,
}

impl EndpointInfo {
    fn new(method: &str, path: &str, description: &str) -> Self {
        Self {
            path: path.to_string(),
            method: method.to_string(),
            description: description.to_string(),
        }
    }
}

/// GET / - Root info
pub async fn root(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let response = RootResponse {
        name: "Formula Bridge API Server".to_string(),
        version: state.version.clone(),
        description: "Rewrite, validate and store display-syntax formulas".to_string(),
        endpoints: vec![
            EndpointInfo::new("GET", "/health", "Health check endpoint"),
            EndpointInfo::new("GET", "/version", "Get server version"),
            EndpointInfo::new("GET", "/api/v1/functions", "List known functions"),
            EndpointInfo::new("POST", "/api/v1/normalize", "Rewrite to canonical ranges"),
            EndpointInfo::new("POST", "/api/v1/validate", "Check call signatures"),
            EndpointInfo::new("POST", "/api/v1/keys", "Stored code-key form"),
            EndpointInfo::new("POST", "/api/v1/check", "Validate and preview"),
            EndpointInfo::new("POST", "/api/v1/lookup", "Build an INDEX/MATCH formula"),
        ],
    };
    Json(ApiResponse::ok(response))
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub tables: usize,
    pub functions: usize,
}

/// GET /health - Health check
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ApiResponse::ok(HealthResponse {
        status: "healthy".to_string(),
        tables: state.session.index().len(),
        functions: state.session.registry().len(),
    }))
}

/// Version response
#[derive(Serialize)]
pub struct VersionResponse {
    pub version: String,
    pub features: Vec<String>,
}

/// GET /version - Server version
pub async fn version(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ApiResponse::ok(VersionResponse {
        version: state.version.clone(),
        features: ["normalize", "validate", "keys", "check", "lookup", "functions"]
            .iter()
            .map(|f| f.to_string())
            .collect(),
    }))
}

/// A formula with optional table context
#[derive(Debug, Deserialize)]
pub struct FormulaRequest {
    pub formula: String,
    #[serde(default)]
    pub table: Option<String>,
}

/// Normalize response
#[derive(Serialize, Default)]
pub struct NormalizeResponse {
    pub input: String,
    pub canonical: String,
}

/// POST /api/v1/normalize - Rewrite to canonical ranges
pub async fn normalize(
    State(state): State<Arc<AppState>>,
    Json(req): Json<FormulaRequest>,
) -> impl IntoResponse {
    let canonical = state.session.canonical(&req.formula, req.table.as_deref());
    Json(ApiResponse::ok(NormalizeResponse {
        input: req.formula,
        canonical,
    }))
}

/// Validate request
#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    pub formula: String,
    #[serde(default)]
    pub table: Option<String>,
    /// Report every error instead of the first
    #[serde(default)]
    pub all: bool,
}

/// Validate response
#[derive(Serialize, Default)]
pub struct ValidateResponse {
    pub valid: bool,
    /// First error message, empty when valid
    pub message: String,
    pub errors: Vec<FormulaError>,
}

/// POST /api/v1/validate - Check call signatures
pub async fn validate(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ValidateRequest>,
) -> impl IntoResponse {
    let table = req.table.as_deref();
    let errors = if req.all {
        state.session.validate_all(&req.formula, table)
    } else {
        state
            .session
            .validate(&req.formula, table)
            .into_iter()
            .collect()
    };
    debug!(formula = %req.formula, errors = errors.len(), "validated formula");

    Json(ApiResponse::ok(ValidateResponse {
        valid: errors.is_empty(),
        message: errors.first().map(|e| e.message.clone()).unwrap_or_default(),
        errors,
    }))
}

/// Keys response
#[derive(Serialize, Default)]
pub struct KeysResponse {
    pub input: String,
    pub stored: String,
}

/// POST /api/v1/keys - Stored code-key form
pub async fn keys(
    State(state): State<Arc<AppState>>,
    Json(req): Json<FormulaRequest>,
) -> impl IntoResponse {
    let stored = state.session.commit(&req.formula, req.table.as_deref());
    Json(ApiResponse::ok(KeysResponse {
        input: req.formula,
        stored,
    }))
}

/// POST /api/v1/check - Validate and preview
pub async fn check(
    State(state): State<Arc<AppState>>,
    Json(req): Json<FormulaRequest>,
) -> impl IntoResponse {
    let report: CheckReport = state.session.check(&req.formula, req.table.as_deref());
    Json(ApiResponse::ok(report))
}

/// Lookup request
#[derive(Debug, Deserialize)]
pub struct LookupRequest {
    pub table: String,
    pub key_field: String,
    pub key_expr: String,
    pub value_field: String,
}

/// Lookup response
#[derive(Serialize, Default)]
pub struct LookupResponse {
    pub formula: String,
}

/// POST /api/v1/lookup - Build an INDEX/MATCH formula
pub async fn lookup(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LookupRequest>,
) -> impl IntoResponse {
    match state
        .session
        .lookup(&req.table, &req.key_field, &req.key_expr, &req.value_field)
    {
        Some(formula) => Json(ApiResponse::ok(LookupResponse { formula })),
        None => Json(ApiResponse::err(format!(
            "unknown table or field: {}.{} / {}.{}",
            req.table, req.key_field, req.table, req.value_field
        ))),
    }
}

/// Functions query
#[derive(Debug, Deserialize)]
pub struct FunctionsQuery {
    #[serde(default)]
    pub category: Option<String>,
}

/// Functions response
#[derive(Serialize, Default)]
pub struct FunctionsResponse {
    pub count: usize,
    pub functions: Vec<FunctionSpec>,
}

/// GET /api/v1/functions - List known functions
pub async fn functions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FunctionsQuery>,
) -> impl IntoResponse {
    let filter = match query.category.as_deref() {
        Some(name) => match Category::parse(name) {
            Some(category) => Some(category),
            None => {
                return Json(ApiResponse::<FunctionsResponse>::err(format!(
                    "unknown function category: {}",
                    name
                )))
            }
        },
        None => None,
    };

    let functions: Vec<FunctionSpec> = state
        .session
        .registry()
        .iter()
        .filter(|spec| filter.map_or(true, |c| spec.category == c))
        .cloned()
        .collect();

    Json(ApiResponse::ok(FunctionsResponse {
        count: functions.len(),
        functions,
    }))
}
