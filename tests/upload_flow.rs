use solardoc_lib::db::Database;
use solardoc_lib::models::{
    DocumentQuery, DocumentStatus, DocumentType, Settings, SortDirection, SortKey, Upload,
};
use solardoc_lib::services::dashboard::build_dashboard;
use solardoc_lib::services::intake::upload_with_progress;
use solardoc_lib::services::seed::{seed_demo_data, DEMO_USER_ID};
use solardoc_lib::services::store::UPLOAD_FAILED;
use solardoc_lib::AppState;

fn state() -> AppState {
    let db = Database::in_memory().unwrap();
    seed_demo_data(&db).unwrap();
    let (state, _events) = AppState::seeded(db, Settings::default(), 99);
    state
}

fn upload(name: &str, doc_type: DocumentType) -> Upload {
    Upload {
        file_name: name.to_string(),
        doc_type,
        content: vec![1u8; 4096],
    }
}

#[tokio::test(start_paused = true)]
async fn progress_ramps_then_completes() {
    let state = state();
    let settings = state.current_settings().unwrap();
    let mut seen = Vec::new();

    let doc = upload_with_progress(
        &state.store,
        DEMO_USER_ID,
        &[upload("statement.pdf", DocumentType::BankStatement)],
        &settings,
        |progress| seen.push(progress),
    )
    .await
    .unwrap();

    assert_eq!(doc.status, DocumentStatus::Pending);
    assert_eq!(seen.first(), Some(&0));
    assert_eq!(seen.last(), Some(&100));
    let ramp = &seen[..seen.len() - 1];
    assert!(ramp.windows(2).all(|w| w[1] == w[0] + 5));
    // 1500ms upload delay at 200ms per step
    assert_eq!(ramp.last(), Some(&35));
}

#[tokio::test(start_paused = true)]
async fn failed_upload_resets_progress_and_records_error() {
    let state = state();
    let settings = state.current_settings().unwrap();
    let mut seen = Vec::new();

    let result = upload_with_progress(
        &state.store,
        "no-such-user",
        &[upload("statement.pdf", DocumentType::BankStatement)],
        &settings,
        |progress| seen.push(progress),
    )
    .await;

    assert!(result.is_err());
    assert_eq!(seen.last(), Some(&0));
    let snapshot = state.store.snapshot().unwrap();
    assert_eq!(snapshot.error.as_deref(), Some(UPLOAD_FAILED));
    assert!(!snapshot.is_loading);
}

#[tokio::test(start_paused = true)]
async fn invalid_selection_never_reaches_the_store() {
    let state = state();
    let settings = state.current_settings().unwrap();
    let mut calls = 0;

    let err = upload_with_progress(
        &state.store,
        DEMO_USER_ID,
        &[upload("virus.exe", DocumentType::Other)],
        &settings,
        |_| calls += 1,
    )
    .await
    .unwrap_err();

    assert!(err.field_errors().is_some());
    assert_eq!(calls, 0);
    assert_eq!(state.store.fetch_user_documents(DEMO_USER_ID).await.unwrap().len(), 4);
}

#[tokio::test(start_paused = true)]
async fn dashboard_reflects_new_uploads() {
    let state = state();
    state
        .store
        .upload_document(DEMO_USER_ID, &upload("Roof Survey.png", DocumentType::PropertyDocument))
        .await
        .unwrap();

    let documents = state.store.fetch_user_documents(DEMO_USER_ID).await.unwrap();
    let query = DocumentQuery {
        doc_type: Some(DocumentType::PropertyDocument),
        sort_by: SortKey::Name,
        direction: SortDirection::Asc,
        ..DocumentQuery::default()
    };
    let dashboard = build_dashboard(&documents, &query);

    let names: Vec<&str> = dashboard.documents.iter().map(|card| card.document.name.as_str()).collect();
    assert_eq!(names, ["Property Deed.pdf", "Roof Survey.png"]);
    assert_eq!(dashboard.counts.pending, 2);
    assert_eq!(dashboard.counts.total, 5);
    assert!(dashboard.filtered);
}
