use crate::db::Database;
use crate::error::Result;
use crate::models::{
    AnalysisResult, CategoryAssessment, Document, DocumentStatus, DocumentType, Eligibility, User,
};
use crate::services::crypto::PasswordHasher;

pub const DEMO_USER_ID: &str = "12345";
pub const DEMO_EMAIL: &str = "demo@solardoc.app";
pub const DEMO_PASSWORD: &str = "solar123";

/// Demo account with one document in each lifecycle state.
pub fn seed_demo_data(db: &Database) -> Result<()> {
    if db.get_user_by_id(DEMO_USER_ID)?.is_some() {
        return Ok(());
    }

    let user = User {
        id: DEMO_USER_ID.to_string(),
        name: "Demo User".to_string(),
        email: DEMO_EMAIL.to_string(),
        phone: None,
        address: None,
        created_at: "2024-06-01T08:00:00Z".to_string(),
    };
    db.insert_user(&user, &PasswordHasher::hash(DEMO_PASSWORD)?)?;

    for document in demo_documents() {
        db.insert_document(&document)?;
        db.log_status_change(&document.id, None, document.status.as_str(), Some("seeded"))?;
    }

    tracing::info!("Seeded demo account {}", DEMO_EMAIL);
    Ok(())
}

fn assessment(category: &str, score: u8, text: &str) -> CategoryAssessment {
    CategoryAssessment {
        category: category.to_string(),
        score,
        assessment: text.to_string(),
    }
}

fn base(id: &str, name: &str, doc_type: DocumentType, status: DocumentStatus, upload_date: &str) -> Document {
    Document {
        id: id.to_string(),
        user_id: DEMO_USER_ID.to_string(),
        name: name.to_string(),
        doc_type,
        status,
        upload_date: upload_date.to_string(),
        processing_date: None,
        completion_date: None,
        pages: 1,
        file_size: 0,
        checksum: None,
        eligible: None,
        credit_amount: None,
        sponsorship_amount: None,
        analysis_results: None,
    }
}

pub fn demo_documents() -> Vec<Document> {
    let mut bill = base(
        "doc123",
        "Electricity Bill June 2024.pdf",
        DocumentType::UtilityBill,
        DocumentStatus::Approved,
        "2024-06-10T10:30:00Z",
    );
    bill.processing_date = Some("2024-06-10T10:35:00Z".to_string());
    bill.completion_date = Some("2024-06-10T11:00:00Z".to_string());
    bill.pages = 2;
    bill.file_size = 1_245_000;
    bill.eligible = Some(true);
    bill.credit_amount = Some(12_500.0);
    bill.sponsorship_amount = Some(5_000.0);
    bill.analysis_results = Some(AnalysisResult {
        overall_score: 85,
        eligibility: Eligibility { credit: true, sponsorship: true },
        recommendation: "Recommended for both credit and sponsorship programs based on consistent energy usage pattern and property suitability.".to_string(),
        details: vec![
            assessment("Energy Usage", 78, "Regular high consumption indicates good solar potential."),
            assessment("Payment History", 92, "Excellent payment history with no late payments."),
            assessment(
                "Property Suitability",
                85,
                "Location and roof orientation favorable for solar installation.",
            ),
        ],
    });

    let mut statement = base(
        "doc456",
        "Bank Statement Q1 2024.pdf",
        DocumentType::BankStatement,
        DocumentStatus::Processing,
        "2024-06-15T14:20:00Z",
    );
    statement.processing_date = Some("2024-06-15T14:25:00Z".to_string());
    statement.pages = 5;
    statement.file_size = 3_245_000;

    let mut deed = base(
        "doc789",
        "Property Deed.pdf",
        DocumentType::PropertyDocument,
        DocumentStatus::Pending,
        "2024-06-16T09:15:00Z",
    );
    deed.pages = 8;
    deed.file_size = 5_642_000;

    let mut quote = base(
        "doc012",
        "Solar Installation Quote.pdf",
        DocumentType::Other,
        DocumentStatus::Rejected,
        "2024-06-05T11:45:00Z",
    );
    quote.processing_date = Some("2024-06-05T11:50:00Z".to_string());
    quote.completion_date = Some("2024-06-05T13:30:00Z".to_string());
    quote.pages = 3;
    quote.file_size = 2_156_000;
    quote.eligible = Some(false);
    quote.analysis_results = Some(AnalysisResult {
        overall_score: 35,
        eligibility: Eligibility { credit: false, sponsorship: false },
        recommendation: "Not eligible for financing programs due to incomplete documentation and inconsistencies in property information.".to_string(),
        details: vec![
            assessment("Documentation", 30, "Missing critical property ownership details."),
            assessment("Quote Validity", 40, "Quote exceeds reasonable market rates for specified system."),
            assessment(
                "Technical Feasibility",
                35,
                "Proposed system specifications don't match property requirements.",
            ),
        ],
    });

    vec![bill, statement, deed, quote]
}
