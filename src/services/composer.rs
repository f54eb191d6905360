//! Builds the eligibility payload attached to a document when its analysis resolves.
//!
//! Scores are drawn inside the band of the already-decided outcome so the
//! displayed breakdown never contradicts the status.

use rand::Rng;

use crate::models::{
    AnalysisOutcome, AnalysisResult, CategoryAssessment, DocumentStatus, DocumentType, Eligibility,
};

pub const APPROVAL_THRESHOLD: u8 = 60;
const SPONSORSHIP_THRESHOLD: u8 = 80;
const APPROVED_BAND: (u8, u8) = (60, 95);
const REJECTED_BAND: (u8, u8) = (20, 55);
const CREDIT_PER_POINT: f64 = 150.0;
const CREDIT_ROUNDING: f64 = 500.0;
const SPONSORSHIP_AMOUNT: f64 = 5000.0;

pub fn categories_for(doc_type: DocumentType) -> [&'static str; 3] {
    match doc_type {
        DocumentType::UtilityBill => ["Energy Usage", "Payment History", "Property Suitability"],
        DocumentType::BankStatement => ["Income Stability", "Debt Ratio", "Savings Pattern"],
        DocumentType::Invoice => ["Vendor Verification", "Amount Consistency", "Payment Terms"],
        DocumentType::IdDocument => ["Identity Verification", "Document Validity", "Address Match"],
        DocumentType::PropertyDocument => {
            ["Ownership Verification", "Property Suitability", "Title Clarity"]
        }
        DocumentType::Other => ["Documentation", "Quote Validity", "Technical Feasibility"],
    }
}

/// `status` must be terminal; anything else is treated as a rejection.
pub fn compose_outcome<R: Rng>(
    doc_type: DocumentType,
    status: DocumentStatus,
    rng: &mut R,
) -> AnalysisOutcome {
    let approved = status == DocumentStatus::Approved;
    let (low, high) = if approved { APPROVED_BAND } else { REJECTED_BAND };

    let details: Vec<CategoryAssessment> = categories_for(doc_type)
        .iter()
        .map(|category| {
            let score = rng.gen_range(low..=high);
            CategoryAssessment {
                category: category.to_string(),
                score,
                assessment: assess(category, score),
            }
        })
        .collect();

    let overall_score = overall(&details);
    let eligibility = Eligibility {
        credit: approved,
        sponsorship: approved && overall_score >= SPONSORSHIP_THRESHOLD,
    };

    let credit_amount = approved.then(|| credit_for(overall_score));
    let sponsorship_amount = eligibility.sponsorship.then_some(SPONSORSHIP_AMOUNT);

    AnalysisOutcome {
        eligible: approved,
        credit_amount,
        sponsorship_amount,
        result: AnalysisResult {
            overall_score,
            eligibility,
            recommendation: recommend(doc_type, eligibility),
            details,
        },
    }
}

fn overall(details: &[CategoryAssessment]) -> u8 {
    if details.is_empty() {
        return 0;
    }
    let sum: u32 = details.iter().map(|d| d.score as u32).sum();
    (sum as f64 / details.len() as f64).round() as u8
}

fn credit_for(overall_score: u8) -> f64 {
    (overall_score as f64 * CREDIT_PER_POINT / CREDIT_ROUNDING).round() * CREDIT_ROUNDING
}

fn assess(category: &str, score: u8) -> String {
    let tier = match score {
        85..=100 => "Excellent",
        70..=84 => "Good",
        60..=69 => "Acceptable",
        40..=59 => "Weak",
        _ => "Insufficient",
    };
    format!("{} result for {}.", tier, category.to_lowercase())
}

fn recommend(doc_type: DocumentType, eligibility: Eligibility) -> String {
    match (eligibility.credit, eligibility.sponsorship) {
        (true, true) => format!(
            "Recommended for both credit and sponsorship programs based on the submitted {}.",
            doc_type.as_str().to_lowercase()
        ),
        (true, false) => format!(
            "Recommended for the credit program. The submitted {} does not meet the sponsorship threshold.",
            doc_type.as_str().to_lowercase()
        ),
        _ => format!(
            "Not eligible for financing programs based on the submitted {}. Additional documentation may improve the assessment.",
            doc_type.as_str().to_lowercase()
        ),
    }
}
