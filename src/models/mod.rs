use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Pending,
    Processing,
    Approved,
    Rejected,
}

impl DocumentStatus {
    pub const ALL: [DocumentStatus; 4] = [
        DocumentStatus::Pending,
        DocumentStatus::Processing,
        DocumentStatus::Approved,
        DocumentStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Pending => "pending",
            DocumentStatus::Processing => "processing",
            DocumentStatus::Approved => "approved",
            DocumentStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, DocumentStatus::Approved | DocumentStatus::Rejected)
    }

    /// pending -> processing -> {approved | rejected}; terminal states are final.
    pub fn can_transition_to(&self, next: DocumentStatus) -> bool {
        matches!(
            (self, next),
            (DocumentStatus::Pending, DocumentStatus::Processing)
                | (DocumentStatus::Processing, DocumentStatus::Approved)
                | (DocumentStatus::Processing, DocumentStatus::Rejected)
        )
    }

    /// Label shown on dashboard cards.
    pub fn label(&self) -> &'static str {
        match self {
            DocumentStatus::Approved => "Approved for Financing",
            DocumentStatus::Rejected => "Not Eligible",
            DocumentStatus::Processing => "Analysis in Progress",
            DocumentStatus::Pending => "Pending Review",
        }
    }

    pub fn sort_rank(&self) -> u8 {
        match self {
            DocumentStatus::Approved => 0,
            DocumentStatus::Processing => 1,
            DocumentStatus::Pending => 2,
            DocumentStatus::Rejected => 3,
        }
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DocumentStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| AppError::validation("status", format!("Unknown status '{}'", s)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DocumentType {
    Invoice,
    #[serde(rename = "Bank Statement")]
    BankStatement,
    #[default]
    #[serde(rename = "Utility Bill")]
    UtilityBill,
    #[serde(rename = "ID Document")]
    IdDocument,
    #[serde(rename = "Property Document")]
    PropertyDocument,
    Other,
}

impl DocumentType {
    pub const ALL: [DocumentType; 6] = [
        DocumentType::Invoice,
        DocumentType::BankStatement,
        DocumentType::UtilityBill,
        DocumentType::IdDocument,
        DocumentType::PropertyDocument,
        DocumentType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Invoice => "Invoice",
            DocumentType::BankStatement => "Bank Statement",
            DocumentType::UtilityBill => "Utility Bill",
            DocumentType::IdDocument => "ID Document",
            DocumentType::PropertyDocument => "Property Document",
            DocumentType::Other => "Other",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DocumentType::ALL
            .into_iter()
            .find(|doc_type| doc_type.as_str() == s)
            .ok_or_else(|| AppError::validation("type", format!("Unknown document type '{}'", s)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub user_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub doc_type: DocumentType,
    pub status: DocumentStatus,
    pub upload_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_date: Option<String>,
    pub pages: u32,
    pub file_size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eligible: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credit_amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sponsorship_amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis_results: Option<AnalysisResult>,
}

impl Document {
    pub fn has_analysis(&self) -> bool {
        self.eligible.is_some() || self.analysis_results.is_some()
    }

    pub fn clear_analysis(&mut self) {
        self.eligible = None;
        self.credit_amount = None;
        self.sponsorship_amount = None;
        self.analysis_results = None;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub overall_score: u8,
    pub eligibility: Eligibility,
    pub recommendation: String,
    pub details: Vec<CategoryAssessment>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Eligibility {
    pub credit: bool,
    pub sponsorship: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryAssessment {
    pub category: String,
    pub score: u8,
    pub assessment: String,
}

/// The eligibility payload attached to a document when it reaches a terminal status.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOutcome {
    pub eligible: bool,
    pub credit_amount: Option<f64>,
    pub sponsorship_amount: Option<f64>,
    pub result: AnalysisResult,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Upload {
    pub file_name: String,
    pub doc_type: DocumentType,
    pub content: Vec<u8>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSnapshot {
    pub documents: Vec<Document>,
    pub is_loading: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Date,
    Name,
    Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DocumentQuery {
    pub search: String,
    pub status: Option<DocumentStatus>,
    #[serde(rename = "type")]
    pub doc_type: Option<DocumentType>,
    pub sort_by: SortKey,
    pub direction: SortDirection,
}

impl DocumentQuery {
    pub fn is_filtered(&self) -> bool {
        !self.search.is_empty() || self.status.is_some() || self.doc_type.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounts {
    pub pending: usize,
    pub processing: usize,
    pub approved: usize,
    pub rejected: usize,
    pub total: usize,
}

/// A dashboard row: the document plus the labels its card shows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentCard {
    #[serde(flatten)]
    pub document: Document,
    pub status_label: String,
    pub uploaded_on: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardData {
    pub documents: Vec<DocumentCard>,
    pub counts: StatusCounts,
    pub filtered: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisProgress {
    pub document_id: String,
    pub progress: u8,
    pub stage: String,
    pub complete: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "state")]
pub enum AnalysisView {
    /// A run is live; progress arrives as events.
    Running { document: Document, progress: AnalysisProgress },
    /// The document already has a result; show the results page.
    Completed { document: Document },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsView {
    pub document: Document,
    pub headline: String,
    pub upload_date: String,
    pub processing_date: String,
    pub completion_date: String,
    pub analysis: Option<AnalysisResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub fetch_delay_ms: u64,
    pub upload_delay_ms: u64,
    pub tick_interval_ms: u64,
    pub min_step: u8,
    pub max_step: u8,
    pub completion_delay_ms: u64,
    pub approval_rate: f64,
    pub max_upload_bytes: u64,
    pub max_upload_files: usize,
    pub upload_progress_interval_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            fetch_delay_ms: 1000,
            upload_delay_ms: 1500,
            tick_interval_ms: 500,
            min_step: 1,
            max_step: 5,
            completion_delay_ms: 2000,
            approval_rate: 0.7,
            max_upload_bytes: 5 * 1024 * 1024,
            max_upload_files: 1,
            upload_progress_interval_ms: 200,
        }
    }
}
