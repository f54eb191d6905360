use solardoc_lib::db::Database;
use solardoc_lib::models::{AnalysisView, DocumentStatus, DocumentType, Settings, Upload};
use solardoc_lib::services::analysis::{AnalysisEvent, INITIAL_STAGE};
use solardoc_lib::services::seed::{seed_demo_data, DEMO_EMAIL, DEMO_PASSWORD, DEMO_USER_ID};
use solardoc_lib::{AppError, AppState};
use tokio::sync::mpsc::UnboundedReceiver;

fn settings(approval_rate: f64) -> Settings {
    Settings {
        approval_rate,
        ..Settings::default()
    }
}

fn state(approval_rate: f64) -> (AppState, UnboundedReceiver<AnalysisEvent>) {
    let db = Database::in_memory().unwrap();
    seed_demo_data(&db).unwrap();
    AppState::seeded(db, settings(approval_rate), 7)
}

fn bill() -> Upload {
    Upload {
        file_name: "Electricity Bill July 2024.pdf".to_string(),
        doc_type: DocumentType::UtilityBill,
        content: b"%PDF-1.4 mock".to_vec(),
    }
}

/// Drains events for one document until it resolves; asserts progress never
/// goes backwards and the store never shows analysis on a live document.
async fn run_to_resolution(
    state: &AppState,
    events: &mut UnboundedReceiver<AnalysisEvent>,
    document_id: &str,
) -> solardoc_lib::models::Document {
    let mut last = 0;
    let mut saw_complete = false;
    loop {
        let event = events.recv().await.expect("event channel open");
        match event {
            AnalysisEvent::Progress(progress) => {
                assert_eq!(progress.document_id, document_id);
                assert!(progress.progress >= last);
                assert!(progress.progress < 100);
                assert!(!progress.complete);
                last = progress.progress;
                let doc = state.store.get_document(document_id).unwrap().unwrap();
                assert_eq!(doc.status, DocumentStatus::Processing);
                assert!(!doc.has_analysis());
            }
            AnalysisEvent::Complete(progress) => {
                assert_eq!(progress.progress, 100);
                assert!(progress.complete);
                assert_eq!(progress.stage, "Generating final recommendation");
                saw_complete = true;
            }
            AnalysisEvent::Resolved(doc) => {
                assert!(saw_complete);
                assert_eq!(doc.id, document_id);
                return doc;
            }
            AnalysisEvent::Failed { message, .. } => panic!("analysis failed: {}", message),
        }
    }
}

#[tokio::test(start_paused = true)]
async fn uploaded_document_is_analysed_and_approved() {
    let (state, mut events) = state(1.0);
    let session = state.accounts.login(DEMO_EMAIL, DEMO_PASSWORD).unwrap();
    let doc = state
        .store
        .upload_document(&session.user.id, &bill())
        .await
        .unwrap();

    let view = state.analysis.begin_analysis(&doc.id).unwrap();
    match view {
        AnalysisView::Running { document, progress } => {
            assert_eq!(document.status, DocumentStatus::Processing);
            assert!(document.processing_date.is_some());
            assert_eq!(progress.progress, 0);
            assert_eq!(progress.stage, INITIAL_STAGE);
        }
        other => panic!("expected a running analysis, got {:?}", other),
    }

    let resolved = run_to_resolution(&state, &mut events, &doc.id).await;
    assert_eq!(resolved.status, DocumentStatus::Approved);
    assert_eq!(resolved.eligible, Some(true));
    assert!(resolved.completion_date.is_some());
    let analysis = resolved.analysis_results.as_ref().unwrap();
    assert!(analysis.overall_score >= 60);
    assert!(analysis.eligibility.credit);

    assert!(!state.analysis.is_running(&doc.id).unwrap());
    match state.analysis.begin_analysis(&doc.id).unwrap() {
        AnalysisView::Completed { document } => assert_eq!(document, resolved),
        other => panic!("expected completed, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn zero_approval_rate_rejects() {
    let (state, mut events) = state(0.0);
    state.analysis.begin_analysis("doc789").unwrap();
    let resolved = run_to_resolution(&state, &mut events, "doc789").await;
    assert_eq!(resolved.status, DocumentStatus::Rejected);
    assert_eq!(resolved.eligible, Some(false));
    assert!(resolved.credit_amount.is_none());
    let analysis = resolved.analysis_results.unwrap();
    assert!(analysis.overall_score < 60);
    assert!(!analysis.eligibility.credit && !analysis.eligibility.sponsorship);
}

#[tokio::test(start_paused = true)]
async fn second_view_joins_the_live_run() {
    let (state, mut events) = state(1.0);
    state.analysis.begin_analysis("doc789").unwrap();

    match events.recv().await.unwrap() {
        AnalysisEvent::Progress(progress) => assert!(progress.progress > 0),
        other => panic!("expected progress, got {:?}", other),
    }

    match state.analysis.begin_analysis("doc789").unwrap() {
        AnalysisView::Running { progress, .. } => assert!(progress.progress > 0),
        other => panic!("expected running, got {:?}", other),
    }
    let resolved = run_to_resolution(&state, &mut events, "doc789").await;
    assert_eq!(resolved.status, DocumentStatus::Approved);

    let history = state.db.lock().unwrap().get_status_logs("doc789").unwrap();
    let statuses: Vec<&str> = history.iter().map(|log| log.to_status.as_str()).collect();
    assert_eq!(statuses, ["pending", "processing", "approved"]);
}

#[tokio::test(start_paused = true)]
async fn cancelled_run_leaves_processing_and_can_resume() {
    let (state, mut events) = state(1.0);
    state.analysis.begin_analysis("doc789").unwrap();
    events.recv().await.unwrap();

    assert!(state.analysis.cancel_analysis("doc789").unwrap());
    assert!(!state.analysis.cancel_analysis("doc789").unwrap());
    tokio::time::sleep(std::time::Duration::from_secs(120)).await;

    let doc = state.store.get_document("doc789").unwrap().unwrap();
    assert_eq!(doc.status, DocumentStatus::Processing);
    assert!(!doc.has_analysis());
    while let Ok(event) = events.try_recv() {
        assert!(!matches!(event, AnalysisEvent::Resolved(_)));
    }

    match state.analysis.begin_analysis("doc789").unwrap() {
        AnalysisView::Running { document, progress } => {
            assert_eq!(document.status, DocumentStatus::Processing);
            assert_eq!(progress.progress, 0);
        }
        other => panic!("expected running, got {:?}", other),
    }
    let resolved = run_to_resolution(&state, &mut events, "doc789").await;
    assert_eq!(resolved.status, DocumentStatus::Approved);
}

#[tokio::test(start_paused = true)]
async fn seeded_processing_document_resumes() {
    let (state, mut events) = state(1.0);
    state.analysis.begin_analysis("doc456").unwrap();
    let resolved = run_to_resolution(&state, &mut events, "doc456").await;
    assert_eq!(resolved.status, DocumentStatus::Approved);
    assert_eq!(resolved.processing_date.as_deref(), Some("2024-06-15T14:25:00Z"));
}

#[tokio::test(start_paused = true)]
async fn terminal_and_unknown_documents_do_not_start_runs() {
    let (state, _events) = state(1.0);
    assert!(matches!(
        state.analysis.begin_analysis("doc123").unwrap(),
        AnalysisView::Completed { .. }
    ));
    assert!(!state.analysis.is_running("doc123").unwrap());
    assert!(matches!(
        state.analysis.begin_analysis("nope"),
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn analysis_fields_present_iff_terminal() {
    let (state, mut events) = state(0.7);
    for id in ["doc789", "doc456"] {
        state.analysis.begin_analysis(id).unwrap();
    }
    let mut resolved = 0;
    while resolved < 2 {
        if let AnalysisEvent::Resolved(_) = events.recv().await.unwrap() {
            resolved += 1;
        }
        for doc in state.store.fetch_user_documents(DEMO_USER_ID).await.unwrap() {
            assert_eq!(doc.has_analysis(), doc.status.is_terminal(), "{}", doc.id);
            assert_eq!(doc.analysis_results.is_some(), doc.status.is_terminal(), "{}", doc.id);
        }
    }
}
