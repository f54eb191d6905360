use std::cmp::Ordering;

use crate::models::{
    DashboardData, Document, DocumentCard, DocumentQuery, DocumentStatus, SortDirection, SortKey,
    StatusCounts,
};
use crate::utils::{format_display_date, sort_timestamp};

/// Case-insensitive substring match on the raw search term.
pub fn matches(document: &Document, query: &DocumentQuery) -> bool {
    let search = query.search.to_lowercase();
    let matches_search = search.is_empty() || document.name.to_lowercase().contains(&search);
    let matches_status = query.status.map_or(true, |status| document.status == status);
    let matches_type = query.doc_type.map_or(true, |doc_type| document.doc_type == doc_type);
    matches_search && matches_status && matches_type
}

fn compare(a: &Document, b: &Document, key: SortKey) -> Ordering {
    match key {
        SortKey::Date => sort_timestamp(&a.upload_date).cmp(&sort_timestamp(&b.upload_date)),
        SortKey::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        SortKey::Status => a.status.sort_rank().cmp(&b.status.sort_rank()),
    }
}

/// Filters then sorts; the sort is stable so ties keep store order.
pub fn apply_query(documents: &[Document], query: &DocumentQuery) -> Vec<Document> {
    let mut visible: Vec<Document> = documents
        .iter()
        .filter(|doc| matches(doc, query))
        .cloned()
        .collect();
    visible.sort_by(|a, b| {
        let ordering = compare(a, b, query.sort_by);
        match query.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });
    visible
}

pub fn status_counts(documents: &[Document]) -> StatusCounts {
    let mut counts = StatusCounts {
        total: documents.len(),
        ..StatusCounts::default()
    };
    for doc in documents {
        match doc.status {
            DocumentStatus::Pending => counts.pending += 1,
            DocumentStatus::Processing => counts.processing += 1,
            DocumentStatus::Approved => counts.approved += 1,
            DocumentStatus::Rejected => counts.rejected += 1,
        }
    }
    counts
}

pub fn card(document: Document) -> DocumentCard {
    DocumentCard {
        status_label: document.status.label().to_string(),
        uploaded_on: format_display_date(Some(&document.upload_date)),
        document,
    }
}

/// Counts always cover the whole collection, not just the filtered view.
pub fn build_dashboard(documents: &[Document], query: &DocumentQuery) -> DashboardData {
    DashboardData {
        documents: apply_query(documents, query).into_iter().map(card).collect(),
        counts: status_counts(documents),
        filtered: query.is_filtered(),
    }
}
