use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, Result},
    models::{ApiResponse, WalletFile, WalletFileSummary, WalletFileType},
    services::wallet_files::{
        compare_wallet_files, load_wallet_files, split_for_download, CompareResult, DownloadPart,
        NamedWalletList,
    },
};

use super::{AppState, StoredFile};

#[derive(Debug, Deserialize)]
pub struct ListFilesQuery {
    pub search: Option<String>,
    #[serde(rename = "type")]
    pub file_type: Option<WalletFileType>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadedFile {
    pub name: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct UploadFilesRequest {
    pub files: Vec<UploadedFile>,
}

#[derive(Debug, Serialize)]
pub struct FileError {
    pub file: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct UploadFilesResponse {
    pub files: Vec<StoredFile>,
    pub errors: Vec<FileError>,
}

#[derive(Debug, Deserialize)]
pub struct CompareRequest {
    #[serde(default)]
    pub file_ids: Vec<String>,
    #[serde(default)]
    pub uploads: Vec<UploadedFile>,
}

#[derive(Debug, Serialize)]
pub struct CompareResponse {
    #[serde(flatten)]
    pub result: CompareResult,
    pub errors: Vec<FileError>,
}

// Internal helper that supports `upload_files` operations.
fn file_errors(errors: Vec<AppError>) -> Vec<FileError> {
    errors
        .into_iter()
        .map(|e| match e {
            AppError::FileParse { file, message } => FileError { file, message },
            other => FileError {
                file: String::new(),
                message: other.to_string(),
            },
        })
        .collect()
}

/// GET /api/v1/files
pub async fn list_files(
    State(state): State<AppState>,
    Query(query): Query<ListFilesQuery>,
) -> Result<Json<ApiResponse<Vec<WalletFileSummary>>>> {
    let search = query
        .search
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty());

    let files = state
        .storage
        .list_files()
        .await?
        .iter()
        .filter(|f| query.file_type.map_or(true, |t| f.file_type == t))
        .filter(|f| {
            search
                .as_deref()
                .map_or(true, |s| f.name.to_lowercase().contains(s))
        })
        .map(WalletFileSummary::from)
        .collect();

    Ok(Json(ApiResponse::success(files)))
}

/// POST /api/v1/files
///
/// Parses each uploaded `privateKey - address` list. A file that fails to
/// parse is reported and the rest are still stored.
pub async fn upload_files(
    State(state): State<AppState>,
    Json(req): Json<UploadFilesRequest>,
) -> Result<Json<ApiResponse<UploadFilesResponse>>> {
    if req.files.is_empty() {
        return Err(AppError::BadRequest("No files uploaded".to_string()));
    }

    let loaded = load_wallet_files(
        req.files
            .iter()
            .map(|f| (f.name.as_str(), f.content.as_bytes())),
    );

    tracing::info!(
        "Parsed {} wallet(s) from {} file(s), {} failed",
        loaded.total_wallets(),
        loaded.files.len(),
        loaded.errors.len()
    );

    let mut stored = Vec::with_capacity(loaded.files.len());
    for list in loaded.files {
        let file = WalletFile {
            id: crate::utils::new_id(),
            name: list.name,
            wallets: list.wallets,
            created_at: chrono::Utc::now(),
            file_type: WalletFileType::Uploaded,
        };
        let summary = WalletFileSummary::from(&file);
        let ok = state.storage.add_file(file).await?;
        stored.push(StoredFile {
            file: summary,
            stored: ok,
        });
    }

    Ok(Json(ApiResponse::success(UploadFilesResponse {
        files: stored,
        errors: file_errors(loaded.errors),
    })))
}

/// GET /api/v1/files/{id}
pub async fn get_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<WalletFile>>> {
    let file = state.storage.get_file(&id).await?;
    Ok(Json(ApiResponse::success(file)))
}

/// DELETE /api/v1/files/{id}
pub async fn delete_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<String>>> {
    state.storage.remove_file(&id).await?;
    Ok(Json(ApiResponse::success(id)))
}

/// GET /api/v1/files/{id}/download
pub async fn download_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Vec<DownloadPart>>>> {
    let file = state.storage.get_file(&id).await?;
    Ok(Json(ApiResponse::success(split_for_download(
        &file.wallets,
        &file.name,
    ))))
}

/// POST /api/v1/files/{id}/select
///
/// Hands the file over to the next check started without explicit wallets.
pub async fn select_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<WalletFileSummary>>> {
    let file = state.storage.get_file(&id).await?;
    state.storage.select_file(&file).await?;
    Ok(Json(ApiResponse::success(WalletFileSummary::from(&file))))
}

/// POST /api/v1/files/compare
pub async fn compare_files(
    State(state): State<AppState>,
    Json(req): Json<CompareRequest>,
) -> Result<Json<ApiResponse<CompareResponse>>> {
    let mut lists = Vec::new();
    for id in &req.file_ids {
        let file = state.storage.get_file(id).await?;
        lists.push(NamedWalletList {
            name: file.name,
            wallets: file.wallets,
        });
    }

    let loaded = load_wallet_files(
        req.uploads
            .iter()
            .map(|f| (f.name.as_str(), f.content.as_bytes())),
    );
    lists.extend(loaded.files);

    let result = compare_wallet_files(&lists)?;
    tracing::info!(
        "Compared {} file(s): {} wallet(s) in all",
        result.found_in.len(),
        result.wallets.len()
    );

    Ok(Json(ApiResponse::success(CompareResponse {
        result,
        errors: file_errors(loaded.errors),
    })))
}
