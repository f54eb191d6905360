use serde::Deserialize;
use solardoc_lib::models::{Session, User};
use solardoc_lib::services::accounts::{PasswordChange, ProfileUpdate, Registration};
use solardoc_lib::AppState;
use tauri::State;

#[derive(Deserialize)]
pub struct LoginPayload {
    pub email: String,
    pub password: String,
}

#[tauri::command]
pub async fn register(payload: Registration, state: State<'_, AppState>) -> Result<Session, String> {
    state.accounts.register(&payload).map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn login(payload: LoginPayload, state: State<'_, AppState>) -> Result<Session, String> {
    state
        .accounts
        .login(&payload.email, &payload.password)
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn logout(token: String, state: State<'_, AppState>) -> Result<(), String> {
    state.accounts.logout(&token).map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn get_current_user(token: String, state: State<'_, AppState>) -> Result<User, String> {
    state.session_user(&token).map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn update_profile(
    token: String,
    payload: ProfileUpdate,
    state: State<'_, AppState>,
) -> Result<User, String> {
    let user = state.session_user(&token).map_err(|e| e.to_string())?;
    state
        .accounts
        .update_profile(&user.id, &payload)
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn change_password(
    token: String,
    payload: PasswordChange,
    state: State<'_, AppState>,
) -> Result<(), String> {
    let user = state.session_user(&token).map_err(|e| e.to_string())?;
    state
        .accounts
        .change_password(&user.id, &payload)
        .map_err(|e| e.to_string())
}
