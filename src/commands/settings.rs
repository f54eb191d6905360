use solardoc_lib::models::Settings;
use solardoc_lib::AppState;
use tauri::State;

#[tauri::command]
pub async fn get_settings(state: State<'_, AppState>) -> Result<Settings, String> {
    state.current_settings().map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn save_settings(settings: Settings, state: State<'_, AppState>) -> Result<(), String> {
    state.update_settings(settings).map_err(|e| e.to_string())
}
