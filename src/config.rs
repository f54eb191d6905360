use serde_json::Value;

use crate::db::Database;
use crate::error::{AppError, FieldErrors, Result};
use crate::models::Settings;

pub const APP_NAME: &str = "SolarDoc";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const ENV_PREFIX: &str = "SOLARDOC_";

pub fn default_log_filter() -> &'static str {
    "solardoc=info,solardoc_lib=info"
}

/// `fetchDelayMs` -> `SOLARDOC_FETCH_DELAY_MS`
pub fn env_key(setting: &str) -> String {
    let mut key = String::from(ENV_PREFIX);
    for ch in setting.chars() {
        if ch.is_ascii_uppercase() {
            key.push('_');
        }
        key.push(ch.to_ascii_uppercase());
    }
    key
}

fn settings_map(settings: &Settings) -> Result<serde_json::Map<String, Value>> {
    match serde_json::to_value(settings)? {
        Value::Object(map) => Ok(map),
        _ => Ok(serde_json::Map::new()),
    }
}

/// Defaults overlaid with whatever the settings table holds. Unparseable rows
/// are ignored.
pub fn load_settings(db: &Database) -> Result<Settings> {
    let mut map = settings_map(&Settings::default())?;
    for (key, slot) in map.iter_mut() {
        if let Some(raw) = db.get_setting(key)? {
            match serde_json::from_str::<Value>(&raw) {
                Ok(parsed) => *slot = parsed,
                Err(err) => tracing::warn!("Ignoring stored setting {}: {}", key, err),
            }
        }
    }
    Ok(serde_json::from_value(Value::Object(map))?)
}

/// Numeric `SOLARDOC_*` overrides applied one key at a time. An override the
/// field cannot hold is ignored with a warning.
pub fn apply_env_overrides<F>(settings: Settings, lookup: F) -> Result<Settings>
where
    F: Fn(&str) -> Option<String>,
{
    let mut merged = settings;
    let keys: Vec<String> = settings_map(&merged)?.keys().cloned().collect();
    for key in keys {
        let env = env_key(&key);
        let Some(raw) = lookup(&env) else { continue };
        let parsed = match serde_json::from_str::<Value>(raw.trim()) {
            Ok(parsed) if parsed.is_number() => parsed,
            _ => {
                tracing::warn!("Ignoring {}: expected a number, got {:?}", env, raw);
                continue;
            }
        };
        let mut candidate = settings_map(&merged)?;
        candidate.insert(key.clone(), parsed);
        let next = serde_json::from_value::<Settings>(Value::Object(candidate))
            .map_err(AppError::from)
            .and_then(|next| validate_settings(&next).map(|_| next));
        match next {
            Ok(next) => {
                tracing::info!("{} overrides {}", env, key);
                merged = next;
            }
            Err(err) => tracing::warn!("Ignoring {}={}: {}", env, raw, err),
        }
    }
    validate_settings(&merged)?;
    Ok(merged)
}

pub fn validate_settings(settings: &Settings) -> Result<()> {
    let mut errors = FieldErrors::new();
    if !(0.0..=1.0).contains(&settings.approval_rate) {
        errors.insert("approvalRate", "Approval rate must be between 0 and 1".to_string());
    }
    if settings.min_step == 0 || settings.min_step > settings.max_step {
        errors.insert("minStep", "Step range must satisfy 1 <= min <= max".to_string());
    }
    if settings.max_step > 100 {
        errors.insert("maxStep", "Step cannot exceed 100".to_string());
    }
    if settings.tick_interval_ms == 0 {
        errors.insert("tickIntervalMs", "Tick interval must be positive".to_string());
    }
    if settings.max_upload_files == 0 {
        errors.insert("maxUploadFiles", "At least one file must be allowed".to_string());
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(errors))
    }
}

pub fn save_settings(db: &Database, settings: &Settings) -> Result<()> {
    validate_settings(settings)?;
    for (key, value) in settings_map(settings)? {
        db.set_setting(&key, &value.to_string())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_are_screaming_snake_case() {
        assert_eq!(env_key("fetchDelayMs"), "SOLARDOC_FETCH_DELAY_MS");
        assert_eq!(env_key("approvalRate"), "SOLARDOC_APPROVAL_RATE");
    }

    #[test]
    fn empty_table_yields_defaults() {
        let db = Database::in_memory().unwrap();
        assert_eq!(load_settings(&db).unwrap(), Settings::default());
    }

    #[test]
    fn saved_settings_load_back() {
        let db = Database::in_memory().unwrap();
        let settings = Settings {
            approval_rate: 0.25,
            tick_interval_ms: 50,
            ..Settings::default()
        };
        save_settings(&db, &settings).unwrap();
        assert_eq!(load_settings(&db).unwrap(), settings);
    }

    #[test]
    fn corrupt_rows_are_ignored() {
        let db = Database::in_memory().unwrap();
        db.set_setting("fetchDelayMs", "{not json").unwrap();
        assert_eq!(load_settings(&db).unwrap().fetch_delay_ms, 1000);
    }

    #[test]
    fn env_overrides_numbers_only() {
        let settings = apply_env_overrides(Settings::default(), |key| match key {
            "SOLARDOC_FETCH_DELAY_MS" => Some("0".to_string()),
            "SOLARDOC_APPROVAL_RATE" => Some("0.5".to_string()),
            "SOLARDOC_TICK_INTERVAL_MS" => Some("fast".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(settings.fetch_delay_ms, 0);
        assert_eq!(settings.approval_rate, 0.5);
        assert_eq!(settings.tick_interval_ms, 500);
    }

    #[test]
    fn overrides_the_field_cannot_hold_are_skipped() {
        let settings = apply_env_overrides(Settings::default(), |key| match key {
            "SOLARDOC_FETCH_DELAY_MS" => Some("-5".to_string()),
            "SOLARDOC_MIN_STEP" => Some("1.5".to_string()),
            "SOLARDOC_APPROVAL_RATE" => Some("3".to_string()),
            "SOLARDOC_UPLOAD_DELAY_MS" => Some("10".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(settings.fetch_delay_ms, 1000);
        assert_eq!(settings.min_step, 1);
        assert_eq!(settings.approval_rate, 0.7);
        assert_eq!(settings.upload_delay_ms, 10);
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let db = Database::in_memory().unwrap();
        let settings = Settings {
            approval_rate: 1.5,
            min_step: 6,
            ..Settings::default()
        };
        let err = save_settings(&db, &settings).unwrap_err();
        let fields = err.field_errors().unwrap();
        assert!(fields.contains_key("approvalRate"));
        assert!(fields.contains_key("minStep"));
    }
}
