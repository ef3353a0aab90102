//! [src/error.rs]
//! APARATO: TAXONOMIA DE ERRORES
//! RESPONSABILIDAD: Catalogacion de fallos y su traduccion a respuestas HTTP.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Failures that can abort a scan (chunking I/O, a fatal worker failure).
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO_FAULT: {0}")]
    Io(#[from] std::io::Error),

    #[error("WORKER_PANIC: analysis worker {index} failed: {message}")]
    WorkerPanic { index: usize, message: String },
}

/// Failures surfaced by the record store. The in-memory implementation backs
/// onto `parking_lot::RwLock`, which never poisons, so this exists mainly to
/// keep the store's interface honest about what could go wrong.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("STORE_LOCK_FAULT: {0}")]
    LockFault(String),
}

/// Input errors on the query surface: malformed parameters, out-of-range
/// paging, malformed search hex.
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("MISSING_PARAMETER: {0}")]
    MissingParameter(&'static str),

    #[error("INVALID_PARAMETER: {0}")]
    InvalidParameter(String),

    #[error("NOT_FOUND: {0}")]
    NotFound(String),

    #[error("SCAN_FAILED: {0}")]
    ScanFailed(#[from] ScanError),

    #[error("IO_FAULT: {0}")]
    Io(#[from] std::io::Error),
}

impl IntoResponse for QueryError {
    fn into_response(self) -> Response {
        let status = match &self {
            QueryError::MissingParameter(_) | QueryError::InvalidParameter(_) => StatusCode::BAD_REQUEST,
            QueryError::NotFound(_) => StatusCode::BAD_REQUEST,
            QueryError::ScanFailed(_) | QueryError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
