use solardoc_lib::models::{AnalysisProgress, AnalysisView, ResultsView};
use solardoc_lib::services::results::{export_report as render_report, results_view};
use solardoc_lib::AppState;
use tauri::State;

#[tauri::command]
pub async fn begin_analysis(
    token: String,
    document_id: String,
    state: State<'_, AppState>,
) -> Result<AnalysisView, String> {
    state
        .owned_document(&token, &document_id)
        .map_err(|e| e.to_string())?;
    state
        .analysis
        .begin_analysis(&document_id)
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn get_analysis_progress(
    token: String,
    document_id: String,
    state: State<'_, AppState>,
) -> Result<Option<AnalysisProgress>, String> {
    state
        .owned_document(&token, &document_id)
        .map_err(|e| e.to_string())?;
    state
        .analysis
        .progress_of(&document_id)
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn cancel_analysis(
    token: String,
    document_id: String,
    state: State<'_, AppState>,
) -> Result<bool, String> {
    state
        .owned_document(&token, &document_id)
        .map_err(|e| e.to_string())?;
    state
        .analysis
        .cancel_analysis(&document_id)
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn get_results(
    token: String,
    document_id: String,
    state: State<'_, AppState>,
) -> Result<ResultsView, String> {
    let document = state
        .owned_document(&token, &document_id)
        .map_err(|e| e.to_string())?;
    results_view(document).map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn export_report(
    token: String,
    document_id: String,
    state: State<'_, AppState>,
) -> Result<String, String> {
    let document = state
        .owned_document(&token, &document_id)
        .map_err(|e| e.to_string())?;
    let history = {
        let db = state.db.lock().map_err(|_| "DB lock".to_string())?;
        db.get_status_logs(&document.id).map_err(|e| e.to_string())?
    };
    render_report(&document, &history).map_err(|e| e.to_string())
}
