use chrono::{DateTime, SecondsFormat, Utc};
use sha2::{Digest, Sha256};

pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn sha256_hex(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    for chunk in content.chunks(8192) {
        hasher.update(chunk);
    }
    hex::encode(hasher.finalize())
}

/// Lowercased extension including the dot, e.g. `.pdf`.
pub fn file_extension(file_name: &str) -> Option<String> {
    let (stem, ext) = file_name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(format!(".{}", ext.to_ascii_lowercase()))
}

pub fn format_kilobytes(bytes: u64) -> String {
    format!("{:.1} KB", bytes as f64 / 1024.0)
}

/// Long date used on the results page; missing dates render as `N/A`.
pub fn format_display_date(value: Option<&str>) -> String {
    value
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|date| date.with_timezone(&Utc).format("%B %-d, %Y %H:%M").to_string())
        .unwrap_or_else(|| "N/A".to_string())
}

pub fn sort_timestamp(value: &str) -> i64 {
    DateTime::parse_from_rfc3339(value)
        .map(|date| date.timestamp_millis())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_of_empty_input() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn extension_is_lowercased() {
        assert_eq!(file_extension("Scan.PDF").as_deref(), Some(".pdf"));
        assert_eq!(file_extension("archive.tar.gz").as_deref(), Some(".gz"));
        assert_eq!(file_extension("README"), None);
        assert_eq!(file_extension(".hidden"), None);
    }

    #[test]
    fn display_date_falls_back_to_na() {
        assert_eq!(format_display_date(None), "N/A");
        assert_eq!(format_display_date(Some("not a date")), "N/A");
        assert_eq!(
            format_display_date(Some("2024-06-10T10:30:00Z")),
            "June 10, 2024 10:30"
        );
    }

    #[test]
    fn kilobytes_have_one_decimal() {
        assert_eq!(format_kilobytes(1536), "1.5 KB");
    }
}
