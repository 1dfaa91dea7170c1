use super::ApiState;
use crate::excel_files::{ExcelFileError, ExcelFileStore, XLSX_CONTENT_TYPE, check_file_name};
use axum::{
    Router,
    extract::{Multipart, Path, State, multipart::MultipartRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Json, Response},
    routing::get,
};
use serde_json::json;
use tracing::{error, warn};

/// Field of the upload form that carries the spreadsheet
const UPLOAD_FIELD: &str = "file";

pub fn routes() -> Router<ApiState> {
    Router::new()
        .route("/excel-files", get(list_files))
        .route("/excel-file/:filename", get(download_file).post(upload_file))
}

fn failure(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "result": false, "message": message }))).into_response()
}

fn store(state: &ApiState) -> Result<&ExcelFileStore, Response> {
    state.excel_files.as_ref().ok_or_else(|| {
        failure(StatusCode::INTERNAL_SERVER_ERROR, "Backup directory not configured.")
    })
}

async fn list_files(State(state): State<ApiState>) -> Response {
    let store = match store(&state) {
        Ok(store) => store,
        Err(response) => return response,
    };

    match store.list().await {
        Ok(names) => Json(json!({ "result": true, "excelFileNamesArray": names })).into_response(),
        Err(e) => {
            error!("Listing {} failed: {}", store.dir().display(), e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        },
    }
}

async fn download_file(State(state): State<ApiState>, Path(filename): Path<String>) -> Response {
    let store = match store(&state) {
        Ok(store) => store,
        Err(response) => return response,
    };

    match store.read(&filename).await {
        Ok(bytes) => (
            [
                (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
                (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", filename)),
            ],
            bytes,
        )
            .into_response(),
        Err(ExcelFileError::InvalidName(_)) => failure(StatusCode::BAD_REQUEST, "Invalid filename."),
        Err(ExcelFileError::NotFound(_)) => failure(StatusCode::NOT_FOUND, "File not found."),
        Err(e) => {
            error!("Reading spreadsheet {} failed: {}", filename, e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        },
    }
}

async fn upload_file(
    State(state): State<ApiState>,
    Path(filename): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let store = match store(&state) {
        Ok(store) => store,
        Err(response) => return response,
    };
    if check_file_name(&filename).is_err() {
        return failure(StatusCode::BAD_REQUEST, "Invalid filename.");
    }
    let Ok(mut multipart) = multipart else {
        return failure(StatusCode::BAD_REQUEST, "No file uploaded.");
    };

    let mut upload = None;
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) if field.name() == Some(UPLOAD_FIELD) => match field.bytes().await {
                Ok(bytes) => {
                    upload = Some(bytes);
                    break;
                },
                Err(e) => {
                    warn!("Unreadable upload for {}: {}", filename, e);
                    return failure(StatusCode::BAD_REQUEST, "Invalid upload.");
                },
            },
            Ok(Some(_)) => continue,
            Ok(None) => break,
            Err(e) => {
                warn!("Malformed multipart body for {}: {}", filename, e);
                return failure(StatusCode::BAD_REQUEST, "Invalid upload.");
            },
        }
    }

    let Some(bytes) = upload else {
        return failure(StatusCode::BAD_REQUEST, "No file uploaded.");
    };

    match store.write(&filename, &bytes).await {
        Ok(()) => Json(json!({ "result": true, "message": "File uploaded successfully." })).into_response(),
        Err(e) => {
            error!("Saving spreadsheet {} failed: {}", filename, e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        },
    }
}
