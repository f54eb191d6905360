use std::path::Path;

use serde::Deserialize;
use solardoc_lib::models::{Document, DocumentType, StoreSnapshot, Upload};
use solardoc_lib::services::intake::{upload_with_progress, ACCEPTED_EXTENSIONS};
use solardoc_lib::AppState;
use tauri::{AppHandle, Emitter, State};

const UPLOAD_ERROR: &str = "An error occurred while uploading your document. Please try again.";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadPayload {
    pub file_name: String,
    #[serde(rename = "type")]
    pub doc_type: DocumentType,
    pub content: Vec<u8>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadFilePayload {
    pub path: String,
    #[serde(rename = "type")]
    pub doc_type: DocumentType,
}

#[tauri::command]
pub async fn fetch_user_documents(token: String, state: State<'_, AppState>) -> Result<Vec<Document>, String> {
    let user = state.session_user(&token).map_err(|e| e.to_string())?;
    state
        .store
        .fetch_user_documents(&user.id)
        .await
        .map_err(|_| solardoc_lib::services::store::FETCH_FAILED.to_string())
}

#[tauri::command]
pub async fn get_store_snapshot(state: State<'_, AppState>) -> Result<StoreSnapshot, String> {
    state.store.snapshot().map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn get_document(
    token: String,
    document_id: String,
    state: State<'_, AppState>,
) -> Result<Document, String> {
    state
        .owned_document(&token, &document_id)
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn upload_document(
    token: String,
    payload: UploadPayload,
    state: State<'_, AppState>,
    app: AppHandle,
) -> Result<Document, String> {
    let upload = Upload {
        file_name: payload.file_name,
        doc_type: payload.doc_type,
        content: payload.content,
    };
    upload_as_user(&token, vec![upload], &state, &app).await
}

#[tauri::command]
pub async fn upload_file(
    token: String,
    payload: UploadFilePayload,
    state: State<'_, AppState>,
    app: AppHandle,
) -> Result<Document, String> {
    let path = Path::new(&payload.path);
    let content = tokio::fs::read(path).await.map_err(|e| e.to_string())?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .ok_or_else(|| "Missing file name".to_string())?;
    let upload = Upload {
        file_name,
        doc_type: payload.doc_type,
        content,
    };
    upload_as_user(&token, vec![upload], &state, &app).await
}

#[tauri::command]
pub async fn pick_upload_file() -> Result<Option<String>, String> {
    let extensions: Vec<&str> = ACCEPTED_EXTENSIONS
        .iter()
        .map(|ext| ext.trim_start_matches('.'))
        .collect();
    let selection = rfd::FileDialog::new()
        .add_filter("Documents", &extensions)
        .pick_file()
        .map(|path| path.to_string_lossy().to_string());
    Ok(selection)
}

async fn upload_as_user(
    token: &str,
    files: Vec<Upload>,
    state: &AppState,
    app: &AppHandle,
) -> Result<Document, String> {
    let user = state
        .session_user(token)
        .map_err(|_| "You must be logged in to upload documents".to_string())?;
    let settings = state.current_settings().map_err(|e| e.to_string())?;

    let result = upload_with_progress(&state.store, &user.id, &files, &settings, |progress| {
        let _ = app.emit("upload-progress", progress);
    })
    .await;

    match result {
        Ok(document) => {
            let _ = app.emit("document-updated", document.clone());
            Ok(document)
        }
        Err(err) if err.field_errors().is_some() => Err(err.to_string()),
        Err(err) => {
            tracing::error!("Upload error: {}", err);
            Err(UPLOAD_ERROR.to_string())
        }
    }
}
