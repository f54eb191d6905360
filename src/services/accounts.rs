use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use regex::Regex;
use serde::Deserialize;

use crate::db::Database;
use crate::error::{AppError, FieldErrors, Result};
use crate::models::{Session, User};
use crate::services::crypto::PasswordHasher;
use crate::utils::now_rfc3339;

pub const MIN_PASSWORD_LEN: usize = 6;
const INVALID_CREDENTIALS: &str = "Invalid email or password";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\S+@\S+\.\S+").expect("email pattern is valid"))
}

fn check_email(email: &str, errors: &mut FieldErrors) {
    if email.is_empty() {
        errors.insert("email", "Email is required".to_string());
    } else if !email_pattern().is_match(email) {
        errors.insert("email", "Email is invalid".to_string());
    }
}

fn check_password(field: &'static str, password: &str, errors: &mut FieldErrors) {
    if password.is_empty() {
        errors.insert(field, "Password is required".to_string());
    } else if password.encode_utf16().count() < MIN_PASSWORD_LEN {
        errors.insert(
            field,
            format!("Password must be at least {} characters", MIN_PASSWORD_LEN),
        );
    }
}

fn finish(errors: FieldErrors) -> Result<()> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(errors))
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Mock account backend: users live in the in-memory database, sessions in a
/// token map that disappears with the process.
pub struct Accounts {
    db: Arc<Mutex<Database>>,
    sessions: Mutex<HashMap<String, String>>,
}

impl Accounts {
    pub fn new(db: Arc<Mutex<Database>>) -> Self {
        Accounts {
            db,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn register(&self, registration: &Registration) -> Result<Session> {
        let email = normalize_email(&registration.email);
        let mut errors = FieldErrors::new();
        if registration.name.trim().is_empty() {
            errors.insert("name", "Name is required".to_string());
        }
        check_email(&email, &mut errors);
        check_password("password", &registration.password, &mut errors);
        if registration.password != registration.confirm_password {
            errors.insert("confirmPassword", "Passwords do not match".to_string());
        }
        finish(errors)?;

        let password_hash = PasswordHasher::hash(&registration.password)?;
        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            name: registration.name.trim().to_string(),
            email,
            phone: None,
            address: None,
            created_at: now_rfc3339(),
        };

        {
            let db = self.db.lock().map_err(|_| AppError::Lock("DB"))?;
            if db.email_taken(&user.email, None)? {
                return Err(AppError::Conflict(
                    "An account with this email already exists".to_string(),
                ));
            }
            db.insert_user(&user, &password_hash)?;
        }

        tracing::info!("Registered user {}", user.id);
        self.open_session(user)
    }

    pub fn login(&self, email: &str, password: &str) -> Result<Session> {
        let email = normalize_email(email);
        let mut errors = FieldErrors::new();
        check_email(&email, &mut errors);
        check_password("password", password, &mut errors);
        finish(errors)?;

        let credentials = {
            let db = self.db.lock().map_err(|_| AppError::Lock("DB"))?;
            db.get_credentials(&email)?
        };
        let (user, stored) = credentials
            .ok_or_else(|| AppError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

        if !PasswordHasher::verify(password, &stored)? {
            tracing::warn!("Failed login for user {}", user.id);
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        tracing::info!("User {} logged in", user.id);
        self.open_session(user)
    }

    pub fn logout(&self, token: &str) -> Result<()> {
        self.sessions
            .lock()
            .map_err(|_| AppError::Lock("Sessions"))?
            .remove(token);
        Ok(())
    }

    pub fn current_user(&self, token: &str) -> Result<User> {
        let user_id = self
            .sessions
            .lock()
            .map_err(|_| AppError::Lock("Sessions"))?
            .get(token)
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("You must be logged in".to_string()))?;

        let db = self.db.lock().map_err(|_| AppError::Lock("DB"))?;
        db.get_user_by_id(&user_id)?
            .ok_or_else(|| AppError::Unauthorized("You must be logged in".to_string()))
    }

    pub fn update_profile(&self, user_id: &str, update: &ProfileUpdate) -> Result<User> {
        let email = normalize_email(&update.email);
        let mut errors = FieldErrors::new();
        if update.name.trim().is_empty() {
            errors.insert("name", "Name is required".to_string());
        }
        check_email(&email, &mut errors);
        finish(errors)?;

        let db = self.db.lock().map_err(|_| AppError::Lock("DB"))?;
        let mut user = db
            .get_user_by_id(user_id)?
            .ok_or_else(|| AppError::NotFound(format!("User {}", user_id)))?;
        if db.email_taken(&email, Some(user_id))? {
            return Err(AppError::Conflict(
                "An account with this email already exists".to_string(),
            ));
        }

        user.name = update.name.trim().to_string();
        user.email = email;
        user.phone = non_blank(update.phone.clone());
        user.address = non_blank(update.address.clone());
        db.update_user(&user)?;
        Ok(user)
    }

    pub fn change_password(&self, user_id: &str, change: &PasswordChange) -> Result<()> {
        let mut errors = FieldErrors::new();
        if change.current_password.is_empty() {
            errors.insert("currentPassword", "Current password is required".to_string());
        }
        check_password("newPassword", &change.new_password, &mut errors);
        if change.new_password != change.confirm_password {
            errors.insert("confirmPassword", "Passwords do not match".to_string());
        }
        finish(errors)?;

        let stored = {
            let db = self.db.lock().map_err(|_| AppError::Lock("DB"))?;
            db.get_password_hash(user_id)?
        }
        .ok_or_else(|| AppError::NotFound(format!("User {}", user_id)))?;

        if !PasswordHasher::verify(&change.current_password, &stored)? {
            return Err(AppError::validation(
                "currentPassword",
                "Current password is incorrect",
            ));
        }

        let password_hash = PasswordHasher::hash(&change.new_password)?;
        let db = self.db.lock().map_err(|_| AppError::Lock("DB"))?;
        db.set_password_hash(user_id, &password_hash)?;
        tracing::info!("Password changed for user {}", user_id);
        Ok(())
    }

    fn open_session(&self, user: User) -> Result<Session> {
        let token = uuid::Uuid::new_v4().to_string();
        self.sessions
            .lock()
            .map_err(|_| AppError::Lock("Sessions"))?
            .insert(token.clone(), user.id.clone());
        Ok(Session { token, user })
    }
}
