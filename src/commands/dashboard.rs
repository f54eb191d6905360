use solardoc_lib::models::{DashboardData, DocumentQuery};
use solardoc_lib::services::dashboard::build_dashboard;
use solardoc_lib::AppState;
use tauri::State;

#[tauri::command]
pub async fn get_dashboard(
    token: String,
    query: Option<DocumentQuery>,
    state: State<'_, AppState>,
) -> Result<DashboardData, String> {
    let user = state.session_user(&token).map_err(|e| e.to_string())?;
    let documents = state
        .store
        .fetch_user_documents(&user.id)
        .await
        .map_err(|_| solardoc_lib::services::store::FETCH_FAILED.to_string())?;
    Ok(build_dashboard(&documents, &query.unwrap_or_default()))
}
