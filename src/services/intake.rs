use std::time::Duration;

use crate::error::{AppError, Result};
use crate::models::{Document, Settings, Upload};
use crate::services::store::DocumentStore;
use crate::utils::file_extension;

pub const ACCEPTED_EXTENSIONS: [&str; 8] =
    [".pdf", ".doc", ".docx", ".xls", ".xlsx", ".jpg", ".jpeg", ".png"];

const RAMP_STEP: u8 = 5;
const RAMP_CEILING: u8 = 95;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntakeRules {
    pub max_files: usize,
    pub max_bytes: u64,
}

impl IntakeRules {
    pub fn from_settings(settings: &Settings) -> Self {
        IntakeRules {
            max_files: settings.max_upload_files.max(1),
            max_bytes: settings.max_upload_bytes,
        }
    }

    pub fn validate(&self, files: &[Upload]) -> Result<()> {
        if files.is_empty() {
            return Err(AppError::validation("files", "Please select at least one file to upload"));
        }
        if files.len() > self.max_files {
            return Err(AppError::validation(
                "files",
                format!("You can only upload up to {} files.", self.max_files),
            ));
        }
        for file in files {
            self.validate_file(file)?;
        }
        Ok(())
    }

    fn validate_file(&self, file: &Upload) -> Result<()> {
        let accepted = file_extension(&file.file_name)
            .map(|ext| ACCEPTED_EXTENSIONS.contains(&ext.as_str()))
            .unwrap_or(false);
        if !accepted {
            return Err(AppError::validation(
                "files",
                format!(
                    "{} is not a supported format. Supported formats: {}",
                    file.file_name,
                    ACCEPTED_EXTENSIONS.join(", ")
                ),
            ));
        }
        if file.content.len() as u64 > self.max_bytes {
            return Err(AppError::validation(
                "files",
                format!(
                    "{} exceeds the {}MB limit",
                    file.file_name,
                    self.max_bytes / (1024 * 1024)
                ),
            ));
        }
        Ok(())
    }
}

pub fn ramp(progress: u8) -> u8 {
    if progress >= RAMP_CEILING {
        progress
    } else {
        progress + RAMP_STEP
    }
}

/// Uploads the first file of a validated selection while reporting the
/// simulated progress ramp: +5 per interval up to 95, then 100 on success or
/// back to 0 on failure.
pub async fn upload_with_progress<F>(
    store: &DocumentStore,
    user_id: &str,
    files: &[Upload],
    settings: &Settings,
    mut on_progress: F,
) -> Result<Document>
where
    F: FnMut(u8),
{
    IntakeRules::from_settings(settings).validate(files)?;
    let upload = &files[0];

    let pending = store.upload_document(user_id, upload);
    tokio::pin!(pending);

    let mut ticker =
        tokio::time::interval(Duration::from_millis(settings.upload_progress_interval_ms.max(1)));
    ticker.tick().await;
    let mut progress = 0;
    on_progress(progress);

    loop {
        tokio::select! {
            result = &mut pending => {
                return match result {
                    Ok(document) => {
                        on_progress(100);
                        Ok(document)
                    }
                    Err(err) => {
                        on_progress(0);
                        Err(err)
                    }
                };
            }
            _ = ticker.tick() => {
                progress = ramp(progress);
                on_progress(progress);
            }
        }
    }
}
