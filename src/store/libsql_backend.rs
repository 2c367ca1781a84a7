//! libSQL backend — async `Database` trait implementation.
//!
//! Supports local file and in-memory databases.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};
use uuid::Uuid;

use crate::coach::progress::{ClientSignals, ProgressSnapshot};
use crate::coach::state::CoachState;
use crate::error::DatabaseError;
use crate::onboarding::model::{DocumentUpload, Founder, TeamMember, VaultFolder, Venture};
use crate::onboarding::session::OnboardingSession;
use crate::store::migrations;
use crate::store::traits::Database;

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        backend.run_migrations().await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        backend.run_migrations().await?;
        Ok(backend)
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return ndt.and_utc();
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

/// Convert `Option<&str>` to libsql Value.
fn opt_text(s: Option<&str>) -> libsql::Value {
    match s {
        Some(s) => libsql::Value::Text(s.to_string()),
        None => libsql::Value::Null,
    }
}

fn parse_uuid(s: &str, what: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(s).map_err(|e| DatabaseError::Serialization(format!("{what}: {e}")))
}

fn to_json<T: serde::Serialize>(value: &T, what: &str) -> Result<String, DatabaseError> {
    serde_json::to_string(value).map_err(|e| DatabaseError::Serialization(format!("{what}: {e}")))
}

fn from_json<T: serde::de::DeserializeOwned>(raw: &str, what: &str) -> Result<T, DatabaseError> {
    serde_json::from_str(raw).map_err(|e| DatabaseError::Serialization(format!("{what}: {e}")))
}

/// Map a libsql Row to an OnboardingSession.
///
/// Column order matches SESSION_COLUMNS:
/// 0:id, 1:founder_id, 2:venture_id, 3:folder_structure, 4:current_step,
/// 5:step_data, 6:completed_steps, 7:is_complete, 8:created_at, 9:updated_at
fn row_to_session(row: &libsql::Row) -> Result<OnboardingSession, DatabaseError> {
    let id: String = row
        .get(0)
        .map_err(|e| DatabaseError::Query(format!("session id: {e}")))?;
    let founder_id: Option<String> = row.get(1).ok();
    let venture_id: Option<String> = row.get(2).ok();
    let folder_structure: Option<String> = row.get(3).ok();
    let current_step: String = row
        .get(4)
        .map_err(|e| DatabaseError::Query(format!("current_step: {e}")))?;
    let step_data: String = row
        .get(5)
        .map_err(|e| DatabaseError::Query(format!("step_data: {e}")))?;
    let completed_steps: String = row
        .get(6)
        .map_err(|e| DatabaseError::Query(format!("completed_steps: {e}")))?;
    let is_complete: i64 = row
        .get(7)
        .map_err(|e| DatabaseError::Query(format!("is_complete: {e}")))?;
    let created_at: String = row
        .get(8)
        .map_err(|e| DatabaseError::Query(format!("created_at: {e}")))?;
    let updated_at: String = row
        .get(9)
        .map_err(|e| DatabaseError::Query(format!("updated_at: {e}")))?;

    Ok(OnboardingSession {
        session_id: parse_uuid(&id, "session id")?,
        founder_id: founder_id
            .as_deref()
            .map(|s| parse_uuid(s, "session founder_id"))
            .transpose()?,
        venture_id: venture_id
            .as_deref()
            .map(|s| parse_uuid(s, "session venture_id"))
            .transpose()?,
        folder_structure: folder_structure
            .as_deref()
            .map(|s| from_json(s, "folder_structure"))
            .transpose()?,
        current_step: current_step
            .parse()
            .map_err(|e: String| DatabaseError::Serialization(e))?,
        step_data: from_json(&step_data, "step_data")?,
        completed_steps: from_json(&completed_steps, "completed_steps")?,
        is_complete: is_complete != 0,
        created_at: parse_datetime(&created_at),
        updated_at: parse_datetime(&updated_at),
    })
}

fn row_to_founder(row: &libsql::Row) -> Result<Founder, DatabaseError> {
    let id: String = row
        .get(0)
        .map_err(|e| DatabaseError::Query(format!("founder id: {e}")))?;
    let created_at: String = row
        .get(5)
        .map_err(|e| DatabaseError::Query(format!("created_at: {e}")))?;
    let updated_at: String = row
        .get(6)
        .map_err(|e| DatabaseError::Query(format!("updated_at: {e}")))?;
    Ok(Founder {
        id: parse_uuid(&id, "founder id")?,
        email: row
            .get(1)
            .map_err(|e| DatabaseError::Query(format!("email: {e}")))?,
        full_name: row
            .get(2)
            .map_err(|e| DatabaseError::Query(format!("full_name: {e}")))?,
        role: row.get(3).ok(),
        linkedin_url: row.get(4).ok(),
        created_at: parse_datetime(&created_at),
        updated_at: parse_datetime(&updated_at),
    })
}

fn row_to_venture(row: &libsql::Row) -> Result<Venture, DatabaseError> {
    let id: String = row
        .get(0)
        .map_err(|e| DatabaseError::Query(format!("venture id: {e}")))?;
    let founder_id: String = row
        .get(1)
        .map_err(|e| DatabaseError::Query(format!("founder_id: {e}")))?;
    let created_at: String = row
        .get(8)
        .map_err(|e| DatabaseError::Query(format!("created_at: {e}")))?;
    let updated_at: String = row
        .get(9)
        .map_err(|e| DatabaseError::Query(format!("updated_at: {e}")))?;
    Ok(Venture {
        id: parse_uuid(&id, "venture id")?,
        founder_id: parse_uuid(&founder_id, "venture founder_id")?,
        name: row
            .get(2)
            .map_err(|e| DatabaseError::Query(format!("name: {e}")))?,
        industry: row
            .get(3)
            .map_err(|e| DatabaseError::Query(format!("industry: {e}")))?,
        geography: row
            .get(4)
            .map_err(|e| DatabaseError::Query(format!("geography: {e}")))?,
        description: row.get(5).ok(),
        website: row.get(6).ok(),
        proof_score: row.get(7).ok(),
        created_at: parse_datetime(&created_at),
        updated_at: parse_datetime(&updated_at),
    })
}

fn row_to_team_member(row: &libsql::Row) -> Result<TeamMember, DatabaseError> {
    let id: String = row
        .get(0)
        .map_err(|e| DatabaseError::Query(format!("member id: {e}")))?;
    let venture_id: String = row
        .get(1)
        .map_err(|e| DatabaseError::Query(format!("venture_id: {e}")))?;
    let created_at: String = row
        .get(6)
        .map_err(|e| DatabaseError::Query(format!("created_at: {e}")))?;
    Ok(TeamMember {
        id: parse_uuid(&id, "member id")?,
        venture_id: parse_uuid(&venture_id, "member venture_id")?,
        name: row
            .get(2)
            .map_err(|e| DatabaseError::Query(format!("name: {e}")))?,
        role: row
            .get(3)
            .map_err(|e| DatabaseError::Query(format!("role: {e}")))?,
        email: row.get(4).ok(),
        linkedin_url: row.get(5).ok(),
        created_at: parse_datetime(&created_at),
    })
}

fn row_to_upload(row: &libsql::Row) -> Result<DocumentUpload, DatabaseError> {
    let id: String = row
        .get(0)
        .map_err(|e| DatabaseError::Query(format!("upload id: {e}")))?;
    let venture_id: String = row
        .get(1)
        .map_err(|e| DatabaseError::Query(format!("venture_id: {e}")))?;
    let session_id: String = row
        .get(2)
        .map_err(|e| DatabaseError::Query(format!("session_id: {e}")))?;
    let size_bytes: i64 = row
        .get(5)
        .map_err(|e| DatabaseError::Query(format!("size_bytes: {e}")))?;
    let created_at: String = row
        .get(9)
        .map_err(|e| DatabaseError::Query(format!("created_at: {e}")))?;
    Ok(DocumentUpload {
        id: parse_uuid(&id, "upload id")?,
        venture_id: parse_uuid(&venture_id, "upload venture_id")?,
        session_id: parse_uuid(&session_id, "upload session_id")?,
        file_name: row
            .get(3)
            .map_err(|e| DatabaseError::Query(format!("file_name: {e}")))?,
        mime_type: row
            .get(4)
            .map_err(|e| DatabaseError::Query(format!("mime_type: {e}")))?,
        size_bytes: size_bytes.max(0) as u64,
        local_path: row
            .get(6)
            .map_err(|e| DatabaseError::Query(format!("local_path: {e}")))?,
        external_file_id: row.get(7).ok(),
        shared_url: row.get(8).ok(),
        created_at: parse_datetime(&created_at),
    })
}

// ── Trait implementation ────────────────────────────────────────────

const SESSION_COLUMNS: &str = "id, founder_id, venture_id, folder_structure, current_step, step_data, completed_steps, is_complete, created_at, updated_at";

const FOUNDER_COLUMNS: &str = "id, email, full_name, role, linkedin_url, created_at, updated_at";

const VENTURE_COLUMNS: &str =
    "id, founder_id, name, industry, geography, description, website, proof_score, created_at, updated_at";

const MEMBER_COLUMNS: &str = "id, venture_id, name, role, email, linkedin_url, created_at";

const UPLOAD_COLUMNS: &str = "id, venture_id, session_id, file_name, mime_type, size_bytes, local_path, external_file_id, shared_url, created_at";

#[async_trait]
impl Database for LibSqlBackend {
    async fn run_migrations(&self) -> Result<(), DatabaseError> {
        migrations::run_migrations(self.conn()).await
    }

    // ── Sessions ────────────────────────────────────────────────────

    async fn insert_session(&self, session: &OnboardingSession) -> Result<(), DatabaseError> {
        let (folder_structure, step_data, completed_steps) = session_json_columns(session)?;
        self.conn()
            .execute(
                "INSERT INTO sessions (id, founder_id, venture_id, folder_structure, current_step, step_data, completed_steps, is_complete, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    session.session_id.to_string(),
                    opt_uuid(session.founder_id),
                    opt_uuid(session.venture_id),
                    folder_structure,
                    session.current_step.to_string(),
                    step_data,
                    completed_steps,
                    session.is_complete as i64,
                    session.created_at.to_rfc3339(),
                    session.updated_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("insert_session: {e}")))?;
        debug!(session_id = %session.session_id, "Session created");
        Ok(())
    }

    async fn get_session(&self, id: Uuid) -> Result<Option<OnboardingSession>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1"),
                params![id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_session: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_session(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_session: {e}"))),
        }
    }

    async fn save_session(&self, session: &OnboardingSession) -> Result<(), DatabaseError> {
        let (folder_structure, step_data, completed_steps) = session_json_columns(session)?;
        self.conn()
            .execute(
                "INSERT OR REPLACE INTO sessions (id, founder_id, venture_id, folder_structure, current_step, step_data, completed_steps, is_complete, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    session.session_id.to_string(),
                    opt_uuid(session.founder_id),
                    opt_uuid(session.venture_id),
                    folder_structure,
                    session.current_step.to_string(),
                    step_data,
                    completed_steps,
                    session.is_complete as i64,
                    session.created_at.to_rfc3339(),
                    session.updated_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("save_session: {e}")))?;
        Ok(())
    }

    // ── Founders ────────────────────────────────────────────────────

    async fn insert_founder(&self, founder: &Founder) -> Result<(), DatabaseError> {
        self.conn()
            .execute(
                "INSERT INTO founders (id, email, full_name, role, linkedin_url, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    founder.id.to_string(),
                    founder.email.clone(),
                    founder.full_name.clone(),
                    opt_text(founder.role.as_deref()),
                    opt_text(founder.linkedin_url.as_deref()),
                    founder.created_at.to_rfc3339(),
                    founder.updated_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("insert_founder: {e}")))?;
        Ok(())
    }

    async fn update_founder(&self, founder: &Founder) -> Result<(), DatabaseError> {
        self.conn()
            .execute(
                "UPDATE founders SET email = ?2, full_name = ?3, role = ?4, linkedin_url = ?5, updated_at = ?6 WHERE id = ?1",
                params![
                    founder.id.to_string(),
                    founder.email.clone(),
                    founder.full_name.clone(),
                    opt_text(founder.role.as_deref()),
                    opt_text(founder.linkedin_url.as_deref()),
                    Utc::now().to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("update_founder: {e}")))?;
        Ok(())
    }

    async fn get_founder(&self, id: Uuid) -> Result<Option<Founder>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {FOUNDER_COLUMNS} FROM founders WHERE id = ?1"),
                params![id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_founder: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_founder(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_founder: {e}"))),
        }
    }

    async fn get_founder_by_email(&self, email: &str) -> Result<Option<Founder>, DatabaseError> {
        // Case-sensitive exact match — email is stored as submitted.
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {FOUNDER_COLUMNS} FROM founders WHERE email = ?1"),
                params![email],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_founder_by_email: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_founder(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_founder_by_email: {e}"))),
        }
    }

    // ── Ventures ────────────────────────────────────────────────────

    async fn insert_venture(&self, venture: &Venture) -> Result<(), DatabaseError> {
        self.conn()
            .execute(
                "INSERT INTO ventures (id, founder_id, name, industry, geography, description, website, proof_score, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    venture.id.to_string(),
                    venture.founder_id.to_string(),
                    venture.name.clone(),
                    venture.industry.clone(),
                    venture.geography.clone(),
                    opt_text(venture.description.as_deref()),
                    opt_text(venture.website.as_deref()),
                    venture
                        .proof_score
                        .map(libsql::Value::Real)
                        .unwrap_or(libsql::Value::Null),
                    venture.created_at.to_rfc3339(),
                    venture.updated_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("insert_venture: {e}")))?;
        Ok(())
    }

    async fn get_venture(&self, id: Uuid) -> Result<Option<Venture>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {VENTURE_COLUMNS} FROM ventures WHERE id = ?1"),
                params![id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_venture: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_venture(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_venture: {e}"))),
        }
    }

    async fn latest_venture_for_founder(
        &self,
        founder_id: Uuid,
    ) -> Result<Option<Venture>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {VENTURE_COLUMNS} FROM ventures WHERE founder_id = ?1 ORDER BY created_at DESC LIMIT 1"
                ),
                params![founder_id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("latest_venture_for_founder: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_venture(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!(
                "latest_venture_for_founder: {e}"
            ))),
        }
    }

    async fn set_venture_score(&self, venture_id: Uuid, score: f64) -> Result<(), DatabaseError> {
        self.conn()
            .execute(
                "UPDATE ventures SET proof_score = ?2, updated_at = ?3 WHERE id = ?1",
                params![venture_id.to_string(), score, Utc::now().to_rfc3339()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("set_venture_score: {e}")))?;
        Ok(())
    }

    // ── Team members ────────────────────────────────────────────────

    async fn insert_team_member(&self, member: &TeamMember) -> Result<(), DatabaseError> {
        self.conn()
            .execute(
                "INSERT INTO team_members (id, venture_id, name, role, email, linkedin_url, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    member.id.to_string(),
                    member.venture_id.to_string(),
                    member.name.clone(),
                    member.role.clone(),
                    opt_text(member.email.as_deref()),
                    opt_text(member.linkedin_url.as_deref()),
                    member.created_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("insert_team_member: {e}")))?;
        Ok(())
    }

    async fn get_team_member(&self, id: Uuid) -> Result<Option<TeamMember>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {MEMBER_COLUMNS} FROM team_members WHERE id = ?1"),
                params![id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_team_member: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_team_member(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_team_member: {e}"))),
        }
    }

    async fn list_team_members(&self, venture_id: Uuid) -> Result<Vec<TeamMember>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {MEMBER_COLUMNS} FROM team_members WHERE venture_id = ?1 ORDER BY created_at"
                ),
                params![venture_id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_team_members: {e}")))?;

        let mut members = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("list_team_members: {e}")))?
        {
            members.push(row_to_team_member(&row)?);
        }
        Ok(members)
    }

    async fn update_team_member(&self, member: &TeamMember) -> Result<(), DatabaseError> {
        self.conn()
            .execute(
                "UPDATE team_members SET name = ?2, role = ?3, email = ?4, linkedin_url = ?5 WHERE id = ?1",
                params![
                    member.id.to_string(),
                    member.name.clone(),
                    member.role.clone(),
                    opt_text(member.email.as_deref()),
                    opt_text(member.linkedin_url.as_deref()),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("update_team_member: {e}")))?;
        Ok(())
    }

    async fn delete_team_member(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let affected = self
            .conn()
            .execute(
                "DELETE FROM team_members WHERE id = ?1",
                params![id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("delete_team_member: {e}")))?;
        Ok(affected > 0)
    }

    // ── Document uploads ────────────────────────────────────────────

    async fn insert_upload(&self, upload: &DocumentUpload) -> Result<(), DatabaseError> {
        self.conn()
            .execute(
                "INSERT INTO document_uploads (id, venture_id, session_id, file_name, mime_type, size_bytes, local_path, external_file_id, shared_url, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    upload.id.to_string(),
                    upload.venture_id.to_string(),
                    upload.session_id.to_string(),
                    upload.file_name.clone(),
                    upload.mime_type.clone(),
                    upload.size_bytes as i64,
                    upload.local_path.clone(),
                    opt_text(upload.external_file_id.as_deref()),
                    opt_text(upload.shared_url.as_deref()),
                    upload.created_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("insert_upload: {e}")))?;
        Ok(())
    }

    async fn get_upload(&self, id: Uuid) -> Result<Option<DocumentUpload>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {UPLOAD_COLUMNS} FROM document_uploads WHERE id = ?1"),
                params![id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_upload: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_upload(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_upload: {e}"))),
        }
    }

    async fn update_upload_mirror(
        &self,
        id: Uuid,
        external_file_id: &str,
        shared_url: Option<&str>,
    ) -> Result<(), DatabaseError> {
        self.conn()
            .execute(
                "UPDATE document_uploads SET external_file_id = ?2, shared_url = ?3 WHERE id = ?1",
                params![id.to_string(), external_file_id, opt_text(shared_url)],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("update_upload_mirror: {e}")))?;
        Ok(())
    }

    async fn count_uploads_for_venture(&self, venture_id: Uuid) -> Result<u32, DatabaseError> {
        count_query(
            self.conn(),
            "SELECT COUNT(*) FROM document_uploads WHERE venture_id = ?1",
            venture_id,
            "count_uploads_for_venture",
        )
        .await
    }

    // ── Vault folders ───────────────────────────────────────────────

    async fn insert_vault_folder(&self, folder: &VaultFolder) -> Result<(), DatabaseError> {
        self.conn()
            .execute(
                "INSERT OR REPLACE INTO vault_folders (venture_id, category, folder_id, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![
                    folder.venture_id.to_string(),
                    folder.category.to_string(),
                    folder.folder_id.clone(),
                    folder.created_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("insert_vault_folder: {e}")))?;
        Ok(())
    }

    async fn list_vault_folders(
        &self,
        venture_id: Uuid,
    ) -> Result<Vec<VaultFolder>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT venture_id, category, folder_id, created_at FROM vault_folders WHERE venture_id = ?1 ORDER BY category",
                params![venture_id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_vault_folders: {e}")))?;

        let mut folders = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("list_vault_folders: {e}")))?
        {
            let venture: String = row
                .get(0)
                .map_err(|e| DatabaseError::Query(format!("venture_id: {e}")))?;
            let category: String = row
                .get(1)
                .map_err(|e| DatabaseError::Query(format!("category: {e}")))?;
            let created_at: String = row
                .get(3)
                .map_err(|e| DatabaseError::Query(format!("created_at: {e}")))?;
            folders.push(VaultFolder {
                venture_id: parse_uuid(&venture, "vault venture_id")?,
                category: category
                    .parse()
                    .map_err(|e: String| DatabaseError::Serialization(e))?,
                folder_id: row
                    .get(2)
                    .map_err(|e| DatabaseError::Query(format!("folder_id: {e}")))?,
                created_at: parse_datetime(&created_at),
            });
        }
        Ok(folders)
    }

    // ── Coach state ─────────────────────────────────────────────────

    async fn get_coach_state(
        &self,
        founder_id: Uuid,
    ) -> Result<Option<CoachState>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT state FROM coach_state WHERE founder_id = ?1",
                params![founder_id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_coach_state: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let raw: String = row
                    .get(0)
                    .map_err(|e| DatabaseError::Query(format!("state: {e}")))?;
                Ok(Some(from_json(&raw, "coach_state")?))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_coach_state: {e}"))),
        }
    }

    async fn save_coach_state(
        &self,
        founder_id: Uuid,
        state: &CoachState,
    ) -> Result<(), DatabaseError> {
        self.conn()
            .execute(
                "INSERT OR REPLACE INTO coach_state (founder_id, state, updated_at) VALUES (?1, ?2, ?3)",
                params![
                    founder_id.to_string(),
                    to_json(state, "coach_state")?,
                    Utc::now().to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("save_coach_state: {e}")))?;
        Ok(())
    }

    // ── Progress snapshots ──────────────────────────────────────────

    async fn get_progress_snapshot(
        &self,
        founder_id: Uuid,
        venture_id: Uuid,
    ) -> Result<Option<ProgressSnapshot>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT snapshot FROM progress_snapshots WHERE founder_id = ?1 AND venture_id = ?2",
                params![founder_id.to_string(), venture_id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_progress_snapshot: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let raw: String = row
                    .get(0)
                    .map_err(|e| DatabaseError::Query(format!("snapshot: {e}")))?;
                Ok(Some(from_json(&raw, "progress_snapshot")?))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_progress_snapshot: {e}"))),
        }
    }

    async fn save_progress_snapshot(
        &self,
        founder_id: Uuid,
        venture_id: Uuid,
        snapshot: &ProgressSnapshot,
    ) -> Result<(), DatabaseError> {
        self.conn()
            .execute(
                "INSERT OR REPLACE INTO progress_snapshots (founder_id, venture_id, snapshot, computed_at) VALUES (?1, ?2, ?3, ?4)",
                params![
                    founder_id.to_string(),
                    venture_id.to_string(),
                    to_json(snapshot, "progress_snapshot")?,
                    snapshot.computed_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("save_progress_snapshot: {e}")))?;
        Ok(())
    }

    async fn delete_progress_snapshots_for_founder(
        &self,
        founder_id: Uuid,
    ) -> Result<(), DatabaseError> {
        self.conn()
            .execute(
                "DELETE FROM progress_snapshots WHERE founder_id = ?1",
                params![founder_id.to_string()],
            )
            .await
            .map_err(|e| {
                DatabaseError::Query(format!("delete_progress_snapshots_for_founder: {e}"))
            })?;
        Ok(())
    }

    // ── Activity signals ────────────────────────────────────────────

    async fn count_experiments(&self, venture_id: Uuid) -> Result<u32, DatabaseError> {
        count_query(
            self.conn(),
            "SELECT COUNT(*) FROM experiments WHERE venture_id = ?1",
            venture_id,
            "count_experiments",
        )
        .await
    }

    async fn get_deal_room_access(&self, founder_id: Uuid) -> Result<bool, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT unlocked FROM deal_room_access WHERE founder_id = ?1",
                params![founder_id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_deal_room_access: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let unlocked: i64 = row.get(0).unwrap_or(0);
                Ok(unlocked != 0)
            }
            Ok(None) => Ok(false),
            Err(e) => Err(DatabaseError::Query(format!("get_deal_room_access: {e}"))),
        }
    }

    // ── Client-reported flags ───────────────────────────────────────

    async fn get_client_signals(&self, founder_id: Uuid) -> Result<ClientSignals, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT dashboard_tutorial_viewed, validation_map_exported FROM client_signals WHERE founder_id = ?1",
                params![founder_id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_client_signals: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let tutorial: i64 = row.get(0).unwrap_or(0);
                let exported: i64 = row.get(1).unwrap_or(0);
                Ok(ClientSignals {
                    dashboard_tutorial_viewed: tutorial != 0,
                    validation_map_exported: exported != 0,
                })
            }
            Ok(None) => Ok(ClientSignals::default()),
            Err(e) => Err(DatabaseError::Query(format!("get_client_signals: {e}"))),
        }
    }

    async fn save_client_signals(
        &self,
        founder_id: Uuid,
        signals: &ClientSignals,
    ) -> Result<(), DatabaseError> {
        self.conn()
            .execute(
                "INSERT OR REPLACE INTO client_signals (founder_id, dashboard_tutorial_viewed, validation_map_exported, updated_at) VALUES (?1, ?2, ?3, ?4)",
                params![
                    founder_id.to_string(),
                    signals.dashboard_tutorial_viewed as i64,
                    signals.validation_map_exported as i64,
                    Utc::now().to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("save_client_signals: {e}")))?;
        Ok(())
    }
}

/// Serialize the session's variable columns (folder structure, step data,
/// completed steps) for the sessions table.
fn session_json_columns(
    session: &OnboardingSession,
) -> Result<(libsql::Value, String, String), DatabaseError> {
    let folder_structure = session
        .folder_structure
        .as_ref()
        .map(|f| to_json(f, "folder_structure").map(libsql::Value::Text))
        .transpose()?
        .unwrap_or(libsql::Value::Null);
    let step_data = to_json(&session.step_data, "step_data")?;
    let completed_steps = to_json(&session.completed_steps, "completed_steps")?;
    Ok((folder_structure, step_data, completed_steps))
}

fn opt_uuid(id: Option<Uuid>) -> libsql::Value {
    match id {
        Some(id) => libsql::Value::Text(id.to_string()),
        None => libsql::Value::Null,
    }
}

async fn count_query(
    conn: &Connection,
    sql: &str,
    id: Uuid,
    what: &str,
) -> Result<u32, DatabaseError> {
    let mut rows = conn
        .query(sql, params![id.to_string()])
        .await
        .map_err(|e| DatabaseError::Query(format!("{what}: {e}")))?;

    match rows.next().await {
        Ok(Some(row)) => {
            let count: i64 = row.get(0).unwrap_or(0);
            Ok(count.max(0) as u32)
        }
        Ok(None) => Ok(0),
        Err(e) => Err(DatabaseError::Query(format!("{what}: {e}"))),
    }
}
