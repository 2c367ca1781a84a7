//! Unified `Database` trait — single async interface for all persistence.

use async_trait::async_trait;
use uuid::Uuid;

use crate::coach::progress::{ClientSignals, ProgressSnapshot};
use crate::coach::state::CoachState;
use crate::error::DatabaseError;
use crate::onboarding::model::{DocumentUpload, Founder, TeamMember, VaultFolder, Venture};
use crate::onboarding::session::OnboardingSession;

/// Backend-agnostic database trait covering sessions, entities, vault
/// folders, coach state, and progress snapshots.
#[async_trait]
pub trait Database: Send + Sync {
    /// Run all pending schema migrations.
    async fn run_migrations(&self) -> Result<(), DatabaseError>;

    // ── Sessions ────────────────────────────────────────────────────

    async fn insert_session(&self, session: &OnboardingSession) -> Result<(), DatabaseError>;

    async fn get_session(&self, id: Uuid) -> Result<Option<OnboardingSession>, DatabaseError>;

    /// Persist the full session record (single writer per session assumed).
    async fn save_session(&self, session: &OnboardingSession) -> Result<(), DatabaseError>;

    // ── Founders ────────────────────────────────────────────────────

    async fn insert_founder(&self, founder: &Founder) -> Result<(), DatabaseError>;

    async fn update_founder(&self, founder: &Founder) -> Result<(), DatabaseError>;

    async fn get_founder(&self, id: Uuid) -> Result<Option<Founder>, DatabaseError>;

    /// Case-sensitive exact-match lookup used for idempotent founder creation.
    async fn get_founder_by_email(&self, email: &str) -> Result<Option<Founder>, DatabaseError>;

    // ── Ventures ────────────────────────────────────────────────────

    async fn insert_venture(&self, venture: &Venture) -> Result<(), DatabaseError>;

    async fn get_venture(&self, id: Uuid) -> Result<Option<Venture>, DatabaseError>;

    /// Most recently created venture owned by a founder — the fallback
    /// used when a session's own venture reference is missing.
    async fn latest_venture_for_founder(
        &self,
        founder_id: Uuid,
    ) -> Result<Option<Venture>, DatabaseError>;

    /// Write the ProofScore total onto the venture after scoring.
    async fn set_venture_score(&self, venture_id: Uuid, score: f64) -> Result<(), DatabaseError>;

    // ── Team members ────────────────────────────────────────────────

    async fn insert_team_member(&self, member: &TeamMember) -> Result<(), DatabaseError>;

    async fn get_team_member(&self, id: Uuid) -> Result<Option<TeamMember>, DatabaseError>;

    async fn list_team_members(&self, venture_id: Uuid) -> Result<Vec<TeamMember>, DatabaseError>;

    async fn update_team_member(&self, member: &TeamMember) -> Result<(), DatabaseError>;

    /// Returns true if a row was deleted.
    async fn delete_team_member(&self, id: Uuid) -> Result<bool, DatabaseError>;

    // ── Document uploads ────────────────────────────────────────────

    async fn insert_upload(&self, upload: &DocumentUpload) -> Result<(), DatabaseError>;

    async fn get_upload(&self, id: Uuid) -> Result<Option<DocumentUpload>, DatabaseError>;

    /// Record the external mirror (file id + shared URL) for an upload.
    async fn update_upload_mirror(
        &self,
        id: Uuid,
        external_file_id: &str,
        shared_url: Option<&str>,
    ) -> Result<(), DatabaseError>;

    async fn count_uploads_for_venture(&self, venture_id: Uuid) -> Result<u32, DatabaseError>;

    // ── Vault folders ───────────────────────────────────────────────

    async fn insert_vault_folder(&self, folder: &VaultFolder) -> Result<(), DatabaseError>;

    async fn list_vault_folders(&self, venture_id: Uuid)
    -> Result<Vec<VaultFolder>, DatabaseError>;

    // ── Coach state ─────────────────────────────────────────────────

    async fn get_coach_state(&self, founder_id: Uuid)
    -> Result<Option<CoachState>, DatabaseError>;

    async fn save_coach_state(
        &self,
        founder_id: Uuid,
        state: &CoachState,
    ) -> Result<(), DatabaseError>;

    // ── Progress snapshots ──────────────────────────────────────────

    async fn get_progress_snapshot(
        &self,
        founder_id: Uuid,
        venture_id: Uuid,
    ) -> Result<Option<ProgressSnapshot>, DatabaseError>;

    async fn save_progress_snapshot(
        &self,
        founder_id: Uuid,
        venture_id: Uuid,
        snapshot: &ProgressSnapshot,
    ) -> Result<(), DatabaseError>;

    async fn delete_progress_snapshots_for_founder(
        &self,
        founder_id: Uuid,
    ) -> Result<(), DatabaseError>;

    // ── Activity signals (written by other subsystems) ─────────────

    async fn count_experiments(&self, venture_id: Uuid) -> Result<u32, DatabaseError>;

    async fn get_deal_room_access(&self, founder_id: Uuid) -> Result<bool, DatabaseError>;

    // ── Client-reported flags ───────────────────────────────────────

    async fn get_client_signals(&self, founder_id: Uuid)
    -> Result<ClientSignals, DatabaseError>;

    async fn save_client_signals(
        &self,
        founder_id: Uuid,
        signals: &ClientSignals,
    ) -> Result<(), DatabaseError>;
}
