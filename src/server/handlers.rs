//! [src/server/handlers.rs]
//! APARATO: MANEJADORES DE LA SUPERFICIE DE CONSULTA
//! RESPONSABILIDAD: Implementa cada endpoint de la superficie de consulta sobre AppState.

use crate::bmp;
use crate::error::QueryError;
use crate::fingerprint;
use crate::session::AppState;
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::{Form, Json};
use serde::Deserialize;
use serde_json::json;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const READ_LENGTH_CAP: usize = 8192;
const TXT_DOWNLOAD_CAP: usize = 16384;
const SEARCH_WINDOW: usize = 1024 * 1024;

const REPORT_TEMPLATE: &str = include_str!("../../templates/report.html");

/// GET `/`. Renders the HTML report shell, pre-seeded with page 0 (size 50000).
pub async fn index(State(state): State<AppState>) -> Html<String> {
    let store = state.store();
    let (chunk_rows, anom_rows) = store.get_page(0, 50_000);
    let payload = json!({
        "chunks": chunk_rows,
        "anom": anom_rows,
        "total": store.total(),
        "filename": state.file_path().display().to_string(),
        "config": state.config().name,
    });
    let page = REPORT_TEMPLATE.replacen("__INITIAL_DATA__", &payload.to_string(), 1);
    Html(page)
}

#[derive(Deserialize)]
pub struct DataParams {
    #[serde(default)]
    page: u64,
    #[serde(default = "default_page_size")]
    size: u64,
}

fn default_page_size() -> u64 {
    5000
}

/// GET `/data?page&size`. One page of chunk/anomaly rows plus the running total.
pub async fn data(State(state): State<AppState>, Query(params): Query<DataParams>) -> Json<serde_json::Value> {
    let (chunk_rows, anom_rows) = state.store().get_page(params.page, params.size);
    Json(json!({
        "chunks": chunk_rows,
        "anom": anom_rows,
        "total": state.store().total(),
    }))
}

#[derive(Deserialize)]
pub struct ReadParams {
    offset: u64,
    length: u64,
}

/// GET `/read?offset&length`. Raw hex dump of a byte range plus its architecture guess.
pub async fn read(State(state): State<AppState>, Query(params): Query<ReadParams>) -> Result<Json<serde_json::Value>, QueryError> {
    let length = (params.length as usize).min(READ_LENGTH_CAP);
    let path = state.file_path();
    let data = tokio::task::spawn_blocking(move || read_range(&path, params.offset, length))
        .await
        .map_err(|join_err| QueryError::InvalidParameter(join_err.to_string()))??;

    let arch = fingerprint::identify(&data);
    Ok(Json(json!({ "hex": hex::encode(&data), "arch": arch })))
}

#[derive(Deserialize)]
pub struct SearchParams {
    hex: String,
}

/// GET `/search?hex`. First occurrence of a hex-encoded needle in the target file.
pub async fn search(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Json<serde_json::Value> {
    let cleaned = params.hex.replace(' ', "").replace("0x", "").replace("0X", "");
    let needle = match hex::decode(&cleaned) {
        Ok(bytes) if !bytes.is_empty() => bytes,
        Ok(_) => return Json(json!({ "found": false, "error": "empty search pattern" })),
        Err(err) => return Json(json!({ "found": false, "error": err.to_string() })),
    };

    let path = state.file_path();
    let found = tokio::task::spawn_blocking(move || search_file(&path, &needle)).await;
    match found {
        Ok(Ok(Some(offset))) => Json(json!({ "found": true, "offset": offset })),
        Ok(Ok(None)) => Json(json!({ "found": false })),
        Ok(Err(err)) => Json(json!({ "found": false, "error": err.to_string() })),
        Err(join_err) => Json(json!({ "found": false, "error": join_err.to_string() })),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadMode {
    Bin,
    Txt,
    Bmp,
}

#[derive(Deserialize)]
pub struct DownloadParams {
    mode: DownloadMode,
    offset: Option<u64>,
    length: Option<u64>,
}

/// GET `/download?mode=bin|txt|bmp`. Exports a byte range or the scan's spectral visualization.
pub async fn download(State(state): State<AppState>, Query(params): Query<DownloadParams>) -> Result<Response, QueryError> {
    match params.mode {
        DownloadMode::Bin => {
            let offset = params.offset.ok_or(QueryError::MissingParameter("offset"))?;
            let length = params.length.ok_or(QueryError::MissingParameter("length"))? as usize;
            let path = state.file_path();
            let data = tokio::task::spawn_blocking(move || read_range(&path, offset, length)).await.map_err(join_to_io)??;
            let filename = format!("extract_{offset:X}.bin");
            Ok(binary_attachment(data, "application/octet-stream", &filename))
        }
        DownloadMode::Txt => {
            let offset = params.offset.ok_or(QueryError::MissingParameter("offset"))?;
            let length = params.length.ok_or(QueryError::MissingParameter("length"))? as usize;
            let path = state.file_path();
            let capped = length.min(TXT_DOWNLOAD_CAP);
            let data = tokio::task::spawn_blocking(move || read_range(&path, offset, capped)).await.map_err(join_to_io)??;
            let report = render_txt_report(offset, length as u64, &data);
            let filename = format!("extract_{offset:X}.txt");
            Ok(binary_attachment(report.into_bytes(), "text/plain", &filename))
        }
        DownloadMode::Bmp => {
            let spectral = state.store().get_all_spectral();
            let bytes = bmp::encode(&spectral);
            Ok(binary_attachment(bytes, "image/bmp", "scan_visualization.bmp"))
        }
    }
}

#[derive(Deserialize)]
pub struct LoadParams {
    filepath: String,
}

/// POST `/load` (form `filepath=<path>`). Replaces the session's target file and rescans.
pub async fn load(State(state): State<AppState>, Form(params): Form<LoadParams>) -> Result<Response, QueryError> {
    let new_path = PathBuf::from(&params.filepath);
    let metadata = tokio::fs::metadata(&new_path).await.ok();
    let is_regular_file = metadata.map(|m| m.is_file()).unwrap_or(false);
    if !is_regular_file {
        warn!(path = %params.filepath, "load rejected: path missing or not a regular file");
        return Err(QueryError::InvalidParameter(format!("not a regular file: {}", params.filepath)));
    }

    let total = tokio::task::spawn_blocking(move || state.reload(new_path))
        .await
        .map_err(|join_err| QueryError::ScanFailed(crate::error::ScanError::WorkerPanic { index: 0, message: join_err.to_string() }))??;
    info!(total, "session reloaded via /load");
    Ok(Redirect::to("/").into_response())
}

fn join_to_io(join_err: tokio::task::JoinError) -> QueryError {
    QueryError::InvalidParameter(join_err.to_string())
}

fn read_range(path: &Path, offset: u64, length: usize) -> Result<Vec<u8>, QueryError> {
    let mut file = File::open(path)?;
    file.seek(SeekFrom::Start(offset))?;
    let mut buffer = vec![0u8; length];
    let mut filled = 0usize;
    while filled < length {
        match file.read(&mut buffer[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        }
    }
    buffer.truncate(filled);
    Ok(buffer)
}

/// Scans `path` for `needle` using a sliding 1 MiB window with `len(needle)-1`
/// overlap, so a match straddling two windows is never missed.
fn search_file(path: &Path, needle: &[u8]) -> std::io::Result<Option<u64>> {
    let mut file = File::open(path)?;
    let overlap = needle.len().saturating_sub(1);
    let mut window = vec![0u8; SEARCH_WINDOW];
    let mut base_offset: u64 = 0;
    let mut carry: Vec<u8> = Vec::new();

    loop {
        let (read_len, eof) = fill_window(&mut file, &mut window)?;
        if read_len == 0 {
            return Ok(None);
        }
        let mut buffer = std::mem::take(&mut carry);
        buffer.extend_from_slice(&window[..read_len]);

        if let Some(pos) = find_subslice(&buffer, needle) {
            return Ok(Some(base_offset + pos as u64));
        }

        if eof {
            return Ok(None);
        }

        let keep_from = buffer.len().saturating_sub(overlap);
        base_offset += keep_from as u64;
        carry = buffer[keep_from..].to_vec();
    }
}

/// Fills `window` from `file`, looping past short reads until either the
/// window is full or the file is exhausted. Returns `(bytes_read, eof)`.
fn fill_window(file: &mut File, window: &mut [u8]) -> std::io::Result<(usize, bool)> {
    let mut total_read = 0usize;
    while total_read < window.len() {
        match file.read(&mut window[total_read..]) {
            Ok(0) => return Ok((total_read, true)),
            Ok(n) => total_read += n,
            Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
    Ok((total_read, false))
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|window| window == needle)
}

fn render_txt_report(offset: u64, requested_length: u64, data: &[u8]) -> String {
    let mut out = String::new();
    out.push_str(&format!("Offset: 0x{offset:X} | Length: {requested_length} bytes\n"));
    out.push_str(&"-".repeat(40));
    out.push('\n');
    let hex_str = hex::encode(data);
    for line in hex_str.as_bytes().chunks(32) {
        out.push_str(std::str::from_utf8(line).unwrap_or(""));
        out.push('\n');
    }
    out
}

fn binary_attachment(body: Vec<u8>, content_type: &'static str, filename: &str) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{filename}\"")),
        ],
        body,
    )
        .into_response()
}
