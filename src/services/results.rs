use serde::Serialize;

use crate::db::StatusLog;
use crate::error::{AppError, Result};
use crate::models::{Document, DocumentStatus, ResultsView};
use crate::utils::{format_display_date, format_kilobytes, now_rfc3339};

pub fn headline(status: DocumentStatus) -> &'static str {
    match status {
        DocumentStatus::Approved => "Approved",
        _ => "Not Eligible",
    }
}

pub fn results_view(document: Document) -> Result<ResultsView> {
    if !document.status.is_terminal() {
        return Err(AppError::NotTerminal(document.id));
    }
    Ok(ResultsView {
        headline: headline(document.status).to_string(),
        upload_date: format_display_date(Some(&document.upload_date)),
        processing_date: format_display_date(document.processing_date.as_deref()),
        completion_date: format_display_date(document.completion_date.as_deref()),
        analysis: document.analysis_results.clone(),
        document,
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Report<'a> {
    generated_at: String,
    document: &'a str,
    document_type: &'a str,
    pages: u32,
    size: String,
    status: &'a str,
    result: &'a str,
    credit_amount: Option<f64>,
    sponsorship_amount: Option<f64>,
    overall_score: Option<u8>,
    recommendation: Option<&'a str>,
    categories: Vec<ReportCategory<'a>>,
    history: Vec<ReportEntry<'a>>,
}

#[derive(Serialize)]
struct ReportCategory<'a> {
    category: &'a str,
    score: u8,
    assessment: &'a str,
}

#[derive(Serialize)]
struct ReportEntry<'a> {
    status: &'a str,
    at: &'a str,
}

/// Pretty JSON report for a finished document, including its status history.
pub fn export_report(document: &Document, history: &[StatusLog]) -> Result<String> {
    if !document.status.is_terminal() {
        return Err(AppError::NotTerminal(document.id.clone()));
    }
    let analysis = document.analysis_results.as_ref();
    let report = Report {
        generated_at: now_rfc3339(),
        document: &document.name,
        document_type: document.doc_type.as_str(),
        pages: document.pages,
        size: format_kilobytes(document.file_size),
        status: document.status.as_str(),
        result: headline(document.status),
        credit_amount: document.credit_amount,
        sponsorship_amount: document.sponsorship_amount,
        overall_score: analysis.map(|a| a.overall_score),
        recommendation: analysis.map(|a| a.recommendation.as_str()),
        categories: analysis
            .map(|a| {
                a.details
                    .iter()
                    .map(|d| ReportCategory {
                        category: &d.category,
                        score: d.score,
                        assessment: &d.assessment,
                    })
                    .collect()
            })
            .unwrap_or_default(),
        history: history
            .iter()
            .map(|entry| ReportEntry {
                status: &entry.to_status,
                at: &entry.created_at,
            })
            .collect(),
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::seed::demo_documents;

    fn doc(id: &str) -> Document {
        demo_documents().into_iter().find(|d| d.id == id).unwrap()
    }

    #[test]
    fn results_require_a_terminal_document() {
        assert!(matches!(results_view(doc("doc789")), Err(AppError::NotTerminal(_))));
        let view = results_view(doc("doc012")).unwrap();
        assert_eq!(view.headline, "Not Eligible");
        assert_eq!(view.completion_date, "June 5, 2024 13:30");
        assert_eq!(view.analysis.unwrap().overall_score, 35);
    }

    #[test]
    fn report_requires_a_terminal_document() {
        for id in ["doc789", "doc456"] {
            assert!(matches!(
                export_report(&doc(id), &[]),
                Err(AppError::NotTerminal(found)) if found == id
            ));
        }
    }

    #[test]
    fn report_includes_categories_and_history() {
        let history = vec![StatusLog {
            document_id: "doc123".to_string(),
            from_status: None,
            to_status: "approved".to_string(),
            message: Some("seeded".to_string()),
            created_at: "2024-06-10T11:00:00Z".to_string(),
        }];
        let raw = export_report(&doc("doc123"), &history).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["result"], "Approved");
        assert_eq!(value["creditAmount"], 12500.0);
        assert_eq!(value["categories"].as_array().unwrap().len(), 3);
        assert_eq!(value["history"][0]["status"], "approved");
    }
}
