#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod commands;

use anyhow::anyhow;
use tauri::{AppHandle, Emitter, Manager};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing_subscriber::EnvFilter;

use solardoc_lib::config;
use solardoc_lib::services::analysis::AnalysisEvent;
use solardoc_lib::AppState;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tauri::Builder::default()
        .setup(|app| {
            let (state, events) =
                AppState::bootstrap().map_err(|e| anyhow!("App state: {}", e))?;
            forward_analysis_events(app.handle().clone(), events);
            app.manage(state);
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            commands::auth::register,
            commands::auth::login,
            commands::auth::logout,
            commands::auth::get_current_user,
            commands::auth::update_profile,
            commands::auth::change_password,
            commands::documents::fetch_user_documents,
            commands::documents::get_store_snapshot,
            commands::documents::get_document,
            commands::documents::upload_document,
            commands::documents::upload_file,
            commands::documents::pick_upload_file,
            commands::dashboard::get_dashboard,
            commands::analysis::begin_analysis,
            commands::analysis::get_analysis_progress,
            commands::analysis::cancel_analysis,
            commands::analysis::get_results,
            commands::analysis::export_report,
            commands::settings::get_settings,
            commands::settings::save_settings,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}

fn forward_analysis_events(app: AppHandle, mut events: UnboundedReceiver<AnalysisEvent>) {
    tauri::async_runtime::spawn(async move {
        while let Some(event) = events.recv().await {
            let sent = match event {
                AnalysisEvent::Progress(progress) => app.emit("analysis-progress", progress),
                AnalysisEvent::Complete(progress) => app.emit("analysis-complete", progress),
                AnalysisEvent::Resolved(document) => app.emit("document-updated", document),
                AnalysisEvent::Failed { document_id, message } => {
                    tracing::warn!("Analysis failed for {}: {}", document_id, message);
                    app.emit("processing-error", message)
                }
            };
            if let Err(err) = sent {
                tracing::warn!("Failed to emit analysis event: {}", err);
            }
        }
    });
}
