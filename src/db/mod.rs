use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Result as SqlResult, Row};
use serde::{Deserialize, Serialize};

use crate::models::{AnalysisResult, Document, User};

const DOCUMENT_COLUMNS: &str = "id, user_id, name, doc_type, status, upload_date, processing_date,
    completion_date, pages, file_size, checksum, eligible, credit_amount, sponsorship_amount,
    analysis_json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusLog {
    pub document_id: String,
    pub from_status: Option<String>,
    pub to_status: String,
    pub message: Option<String>,
    pub created_at: String,
}

/// SQLite-backed collection of users and documents. Always opened in memory:
/// nothing outlives the process.
pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn in_memory() -> SqlResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let mut db = Database { conn };
        db.run_migrations()?;
        Ok(db)
    }

    fn run_migrations(&mut self) -> SqlResult<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                name TEXT PRIMARY KEY,
                applied_at TEXT NOT NULL
            );",
        )?;

        let migrations = [
            (
                "001_create_users.sql",
                include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/migrations/001_create_users.sql")),
            ),
            (
                "002_create_documents.sql",
                include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/migrations/002_create_documents.sql")),
            ),
            (
                "003_create_settings_and_status_logs.sql",
                include_str!(concat!(
                    env!("CARGO_MANIFEST_DIR"),
                    "/migrations/003_create_settings_and_status_logs.sql"
                )),
            ),
        ];

        for (name, sql) in migrations {
            let applied: Option<String> = self
                .conn
                .query_row(
                    "SELECT name FROM schema_migrations WHERE name = ?1",
                    params![name],
                    |row| row.get(0),
                )
                .optional()?;

            if applied.is_none() {
                let tx = self.conn.transaction()?;
                tx.execute_batch(sql)?;
                tx.execute(
                    "INSERT INTO schema_migrations (name, applied_at) VALUES (?1, datetime('now'))",
                    params![name],
                )?;
                tx.commit()?;
            }
        }

        Ok(())
    }

    pub fn insert_user(&self, user: &User, password_hash: &str) -> SqlResult<()> {
        self.conn.execute(
            "INSERT INTO users (id, name, email, password_hash, phone, address, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![
                user.id,
                user.name,
                user.email,
                password_hash,
                user.phone,
                user.address,
                user.created_at
            ],
        )?;
        Ok(())
    }

    pub fn update_user(&self, user: &User) -> SqlResult<()> {
        self.conn.execute(
            "UPDATE users SET name = ?2, email = ?3, phone = ?4, address = ?5, updated_at = datetime('now')
             WHERE id = ?1",
            params![user.id, user.name, user.email, user.phone, user.address],
        )?;
        Ok(())
    }

    pub fn set_password_hash(&self, user_id: &str, password_hash: &str) -> SqlResult<()> {
        self.conn.execute(
            "UPDATE users SET password_hash = ?2, updated_at = datetime('now') WHERE id = ?1",
            params![user_id, password_hash],
        )?;
        Ok(())
    }

    pub fn get_user_by_id(&self, id: &str) -> SqlResult<Option<User>> {
        self.conn
            .query_row(
                "SELECT id, name, email, phone, address, created_at FROM users WHERE id = ?1",
                params![id],
                map_user,
            )
            .optional()
    }

    /// Returns the user together with the stored password hash.
    pub fn get_credentials(&self, email: &str) -> SqlResult<Option<(User, String)>> {
        self.conn
            .query_row(
                "SELECT id, name, email, phone, address, created_at, password_hash
                 FROM users WHERE email = ?1",
                params![email],
                |row| Ok((map_user(row)?, row.get(6)?)),
            )
            .optional()
    }

    pub fn get_password_hash(&self, user_id: &str) -> SqlResult<Option<String>> {
        self.conn
            .query_row(
                "SELECT password_hash FROM users WHERE id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()
    }

    pub fn email_taken(&self, email: &str, except_user: Option<&str>) -> SqlResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM users WHERE email = ?1 AND id IS NOT ?2",
            params![email, except_user],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn insert_document(&self, document: &Document) -> SqlResult<()> {
        let analysis_json = encode_analysis(document.analysis_results.as_ref())?;
        self.conn.execute(
            "INSERT INTO documents (
                id, user_id, name, doc_type, status, upload_date, processing_date, completion_date,
                pages, file_size, checksum, eligible, credit_amount, sponsorship_amount,
                analysis_json, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, datetime('now'))",
            params![
                document.id,
                document.user_id,
                document.name,
                document.doc_type.as_str(),
                document.status.as_str(),
                document.upload_date,
                document.processing_date,
                document.completion_date,
                document.pages,
                document.file_size as i64,
                document.checksum,
                document.eligible,
                document.credit_amount,
                document.sponsorship_amount,
                analysis_json
            ],
        )?;
        Ok(())
    }

    /// Writes the lifecycle and analysis columns of an existing document.
    pub fn update_document(&self, document: &Document) -> SqlResult<usize> {
        let analysis_json = encode_analysis(document.analysis_results.as_ref())?;
        self.conn.execute(
            "UPDATE documents SET
                status = ?2, processing_date = ?3, completion_date = ?4, eligible = ?5,
                credit_amount = ?6, sponsorship_amount = ?7, analysis_json = ?8,
                updated_at = datetime('now')
             WHERE id = ?1",
            params![
                document.id,
                document.status.as_str(),
                document.processing_date,
                document.completion_date,
                document.eligible,
                document.credit_amount,
                document.sponsorship_amount,
                analysis_json
            ],
        )
    }

    pub fn get_document_by_id(&self, id: &str) -> SqlResult<Option<Document>> {
        let sql = format!("SELECT {} FROM documents WHERE id = ?1", DOCUMENT_COLUMNS);
        self.conn.query_row(&sql, params![id], map_document).optional()
    }

    pub fn get_documents_for_user(&self, user_id: &str) -> SqlResult<Vec<Document>> {
        let sql = format!(
            "SELECT {} FROM documents WHERE user_id = ?1 ORDER BY upload_date ASC, rowid ASC",
            DOCUMENT_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![user_id], map_document)?;
        rows.collect()
    }

    pub fn log_status_change(
        &self,
        document_id: &str,
        from_status: Option<&str>,
        to_status: &str,
        message: Option<&str>,
    ) -> SqlResult<()> {
        self.conn.execute(
            "INSERT INTO status_logs (id, document_id, from_status, to_status, message, created_at)
             VALUES (hex(randomblob(16)), ?1, ?2, ?3, ?4, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))",
            params![document_id, from_status, to_status, message],
        )?;
        Ok(())
    }

    pub fn get_status_logs(&self, document_id: &str) -> SqlResult<Vec<StatusLog>> {
        let mut stmt = self.conn.prepare(
            "SELECT document_id, from_status, to_status, message, created_at
             FROM status_logs WHERE document_id = ?1 ORDER BY rowid",
        )?;
        let rows = stmt.query_map(params![document_id], |row| {
            Ok(StatusLog {
                document_id: row.get(0)?,
                from_status: row.get(1)?,
                to_status: row.get(2)?,
                message: row.get(3)?,
                created_at: row.get(4)?,
            })
        })?;
        rows.collect()
    }

    pub fn set_setting(&self, key: &str, value: &str) -> SqlResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO settings (key, value, updated_at) VALUES (?1, ?2, datetime('now'))",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn get_setting(&self, key: &str) -> SqlResult<Option<String>> {
        let mut stmt = self.conn.prepare("SELECT value FROM settings WHERE key = ?1")?;
        stmt.query_row(params![key], |row| row.get(0)).optional()
    }
}

fn map_user(row: &Row<'_>) -> SqlResult<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        address: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn map_document(row: &Row<'_>) -> SqlResult<Document> {
    let doc_type: String = row.get(3)?;
    let status: String = row.get(4)?;
    let file_size: i64 = row.get(9)?;
    let analysis_json: Option<String> = row.get(14)?;

    let analysis_results = match analysis_json {
        Some(raw) => Some(
            serde_json::from_str::<AnalysisResult>(&raw)
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(14, Type::Text, Box::new(e)))?,
        ),
        None => None,
    };

    Ok(Document {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        doc_type: doc_type
            .parse()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?,
        status: status
            .parse()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?,
        upload_date: row.get(5)?,
        processing_date: row.get(6)?,
        completion_date: row.get(7)?,
        pages: row.get(8)?,
        file_size: file_size.max(0) as u64,
        checksum: row.get(10)?,
        eligible: row.get(11)?,
        credit_amount: row.get(12)?,
        sponsorship_amount: row.get(13)?,
        analysis_results,
    })
}

fn encode_analysis(result: Option<&AnalysisResult>) -> SqlResult<Option<String>> {
    result
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}
