//! OnboardingManager — drives a founder through the fixed step sequence and
//! performs the side effects each step requires.
//!
//! Failure semantics: structural preconditions (missing founder/venture)
//! surface as client-correctable errors; external collaborator failures
//! degrade gracefully wherever the side effect is non-essential
//! (notifications, mirroring, certificates) and are hard failures only for
//! the essential scoring call.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{DatabaseError, Error, PreconditionFailed, Result};
use crate::external::scoring::ScoringClient;
use crate::external::storage::VaultStorage;
use crate::external::{NotificationEvent, Notifier};
use crate::store::Database;

use super::model::{
    DocumentUpload, FolderStructure, Founder, ScoringResult, TeamMember, VaultCategory,
    VaultFolder, Venture,
};
use super::session::{
    FounderStepData, OnboardingSession, OnboardingStep, ProcessingStepData, TeamStepData,
    UploadStepData, VentureStepData,
};
use super::validate::{
    self, FounderInput, TeamMemberInput, VentureInput,
};

/// Result of the founder step.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FounderStepOutcome {
    pub session_id: Uuid,
    pub founder_id: Uuid,
    pub next_step: OnboardingStep,
}

/// Result of the venture step.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VentureStepOutcome {
    pub venture: Venture,
    pub folder_structure: FolderStructure,
    pub next_step: OnboardingStep,
}

/// Result of a document upload.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadOutcome {
    pub upload: DocumentUpload,
    pub next_step: OnboardingStep,
}

/// Result of the terminal scoring step.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringOutcome {
    pub scoring_result: ScoringResult,
    pub is_complete: bool,
}

/// An uploaded file as received from the HTTP layer.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Coordinates the onboarding flow: session state, entity creation, vault
/// provisioning, and the external scoring call.
pub struct OnboardingManager {
    db: Arc<dyn Database>,
    vault: Arc<dyn VaultStorage>,
    scoring: Arc<dyn ScoringClient>,
    notifier: Arc<Notifier>,
    upload_dir: PathBuf,
}

impl OnboardingManager {
    pub fn new(
        db: Arc<dyn Database>,
        vault: Arc<dyn VaultStorage>,
        scoring: Arc<dyn ScoringClient>,
        notifier: Arc<Notifier>,
        upload_dir: PathBuf,
    ) -> Self {
        Self {
            db,
            vault,
            scoring,
            notifier,
            upload_dir,
        }
    }

    /// Create a fresh anonymous session and return it.
    pub async fn initialize_session(&self) -> Result<OnboardingSession> {
        let session = OnboardingSession::new();
        self.db.insert_session(&session).await?;
        info!(session_id = %session.session_id, "Onboarding session created");
        Ok(session)
    }

    pub async fn get_session(&self, session_id: Uuid) -> Result<OnboardingSession> {
        self.db
            .get_session(session_id)
            .await?
            .ok_or_else(|| Error::NotFound {
                entity: "session",
                id: session_id.to_string(),
            })
    }

    /// Complete the founder step: validate, then look up an existing founder
    /// by exact email and update it in place, or create a new one.
    ///
    /// The session's founder association is one-time: a resubmission that
    /// resolves to a *different* founder fails rather than silently
    /// re-associating the session.
    pub async fn complete_founder_step(
        &self,
        session_id: Uuid,
        input: FounderInput,
    ) -> Result<FounderStepOutcome> {
        validate::validate_founder(&input)?;
        let mut session = self.get_session(session_id).await?;

        let resolved = self.db.get_founder_by_email(&input.email).await?;

        // Association check comes before any write: a resubmission that
        // resolves to a different founder (or would create one) must not
        // touch that founder's row.
        if let Some(associated) = session.founder_id {
            let same_founder = resolved.as_ref().is_some_and(|f| f.id == associated);
            if !same_founder {
                return Err(PreconditionFailed::FounderAlreadyAssociated.into());
            }
        }

        let founder = match resolved {
            Some(mut existing) => {
                existing.full_name = input.full_name.clone();
                existing.role = input.role.clone();
                existing.linkedin_url = input.linkedin_url.clone();
                existing.updated_at = Utc::now();
                self.db.update_founder(&existing).await?;
                info!(founder_id = %existing.id, "Existing founder updated");
                existing
            }
            None => {
                let now = Utc::now();
                let founder = Founder {
                    id: Uuid::new_v4(),
                    email: input.email.clone(),
                    full_name: input.full_name.clone(),
                    role: input.role.clone(),
                    linkedin_url: input.linkedin_url.clone(),
                    created_at: now,
                    updated_at: now,
                };
                self.db.insert_founder(&founder).await?;
                info!(founder_id = %founder.id, "Founder created");
                founder
            }
        };

        if session.founder_id.is_none() {
            session.founder_id = Some(founder.id);
        }

        session.step_data.founder = Some(FounderStepData {
            founder_id: founder.id,
            email: founder.email.clone(),
            full_name: founder.full_name.clone(),
        });
        session.mark_completed(OnboardingStep::Founder);
        session.advance_from(OnboardingStep::Founder);
        self.db.save_session(&session).await?;

        // Best-effort — never fails the step.
        self.notifier.dispatch(NotificationEvent::FounderOnboarded {
            session_id,
            founder_id: founder.id,
            email: founder.email,
        });

        Ok(FounderStepOutcome {
            session_id,
            founder_id: founder.id,
            next_step: session.current_step,
        })
    }

    /// Complete the venture step: create the venture and provision the 7
    /// fixed vault category folders. A category whose provisioning fails is
    /// skipped with a warning rather than aborting the whole step.
    pub async fn complete_venture_step(
        &self,
        session_id: Uuid,
        input: VentureInput,
    ) -> Result<VentureStepOutcome> {
        validate::validate_venture(&input)?;
        let mut session = self.get_session(session_id).await?;
        let founder_id = session
            .founder_id
            .ok_or(PreconditionFailed::FounderMissing)?;

        let now = Utc::now();
        let venture = Venture {
            id: Uuid::new_v4(),
            founder_id,
            name: input.name.clone(),
            industry: input.industry.clone(),
            geography: input.geography.clone(),
            description: input.description.clone(),
            website: input.website.clone(),
            proof_score: None,
            created_at: now,
            updated_at: now,
        };
        self.db.insert_venture(&venture).await?;
        info!(venture_id = %venture.id, name = %venture.name, "Venture created");

        let folder_structure = self.provision_vault(&venture).await?;

        session.venture_id = Some(venture.id);
        session.folder_structure = Some(folder_structure.clone());
        session.step_data.venture = Some(VentureStepData {
            venture_id: venture.id,
            name: venture.name.clone(),
            folder_structure: folder_structure.clone(),
        });
        session.mark_completed(OnboardingStep::Venture);
        session.advance_from(OnboardingStep::Venture);
        self.db.save_session(&session).await?;

        Ok(VentureStepOutcome {
            venture,
            folder_structure,
            next_step: session.current_step,
        })
    }

    /// Provision one storage folder per vault category (partial-success).
    async fn provision_vault(&self, venture: &Venture) -> Result<FolderStructure> {
        let mut folders = FolderStructure::new();
        for category in VaultCategory::ALL {
            match self.vault.create_folder(&venture.name, category).await {
                Ok(provisioned) => {
                    self.db
                        .insert_vault_folder(&VaultFolder {
                            venture_id: venture.id,
                            category,
                            folder_id: provisioned.folder_id.clone(),
                            created_at: Utc::now(),
                        })
                        .await?;
                    folders.insert(category, provisioned.folder_id);
                }
                Err(e) => {
                    warn!(
                        venture_id = %venture.id,
                        category = %category,
                        error = %e,
                        "Vault folder provisioning failed — category skipped"
                    );
                }
            }
        }
        Ok(folders)
    }

    /// Resolve the venture a session's team/upload operations act on,
    /// falling back to the founder's most recent venture when the session's
    /// own reference is missing (resilience against partial sessions).
    async fn resolve_venture(&self, session: &OnboardingSession) -> Result<Venture> {
        if let Some(venture_id) = session.venture_id {
            if let Some(venture) = self.db.get_venture(venture_id).await? {
                return Ok(venture);
            }
        }
        if let Some(founder_id) = session.founder_id {
            if let Some(venture) = self.db.latest_venture_for_founder(founder_id).await? {
                warn!(
                    session_id = %session.session_id,
                    venture_id = %venture.id,
                    "Session venture reference missing — fell back to latest venture"
                );
                return Ok(venture);
            }
        }
        Err(PreconditionFailed::VentureMissing.into())
    }

    pub async fn add_team_member(
        &self,
        session_id: Uuid,
        input: TeamMemberInput,
    ) -> Result<TeamMember> {
        validate::validate_team_member(&input)?;
        let session = self.get_session(session_id).await?;
        let venture = self.resolve_venture(&session).await?;

        let member = TeamMember {
            id: Uuid::new_v4(),
            venture_id: venture.id,
            name: input.name,
            role: input.role,
            email: input.email,
            linkedin_url: input.linkedin_url,
            created_at: Utc::now(),
        };
        self.db.insert_team_member(&member).await?;
        Ok(member)
    }

    pub async fn get_team_members(&self, session_id: Uuid) -> Result<Vec<TeamMember>> {
        let session = self.get_session(session_id).await?;
        let venture = self.resolve_venture(&session).await?;
        Ok(self.db.list_team_members(venture.id).await?)
    }

    pub async fn update_team_member(
        &self,
        session_id: Uuid,
        member_id: Uuid,
        input: TeamMemberInput,
    ) -> Result<TeamMember> {
        validate::validate_team_member(&input)?;
        let session = self.get_session(session_id).await?;
        let venture = self.resolve_venture(&session).await?;

        let mut member = self
            .db
            .get_team_member(member_id)
            .await?
            .filter(|m| m.venture_id == venture.id)
            .ok_or_else(|| Error::NotFound {
                entity: "team member",
                id: member_id.to_string(),
            })?;

        member.name = input.name;
        member.role = input.role;
        member.email = input.email;
        member.linkedin_url = input.linkedin_url;
        self.db.update_team_member(&member).await?;
        Ok(member)
    }

    pub async fn delete_team_member(&self, session_id: Uuid, member_id: Uuid) -> Result<()> {
        let session = self.get_session(session_id).await?;
        let venture = self.resolve_venture(&session).await?;

        let owned = self
            .db
            .get_team_member(member_id)
            .await?
            .is_some_and(|m| m.venture_id == venture.id);
        if !owned || !self.db.delete_team_member(member_id).await? {
            return Err(Error::NotFound {
                entity: "team member",
                id: member_id.to_string(),
            });
        }
        Ok(())
    }

    /// Complete the team step. Zero team members are allowed — downstream
    /// scoring does not hard-require a team.
    pub async fn complete_team_step(&self, session_id: Uuid) -> Result<OnboardingStep> {
        let mut session = self.get_session(session_id).await?;
        let venture = self.resolve_venture(&session).await?;
        let member_count = self.db.list_team_members(venture.id).await?.len();

        session.step_data.team = Some(TeamStepData { member_count });
        session.mark_completed(OnboardingStep::Team);
        session.advance_from(OnboardingStep::Team);
        self.db.save_session(&session).await?;
        Ok(session.current_step)
    }

    /// Persist an uploaded document and mirror it into the venture's
    /// Overview folder when one is known. Mirroring failure degrades to
    /// "uploaded locally, not mirrored".
    pub async fn handle_document_upload(
        &self,
        session_id: Uuid,
        file: UploadedFile,
    ) -> Result<UploadOutcome> {
        validate::validate_upload(&file.file_name, file.bytes.len() as u64)?;
        let mut session = self.get_session(session_id).await?;
        let venture = self.resolve_venture(&session).await?;

        let upload_id = Uuid::new_v4();
        let local_path = self
            .upload_dir
            .join(format!("{upload_id}_{}", sanitize_file_name(&file.file_name)));
        tokio::fs::create_dir_all(&self.upload_dir)
            .await
            .map_err(|e| DatabaseError::Io(format!("create upload dir: {e}")))?;
        tokio::fs::write(&local_path, &file.bytes)
            .await
            .map_err(|e| DatabaseError::Io(format!("write upload: {e}")))?;

        let mut upload = DocumentUpload {
            id: upload_id,
            venture_id: venture.id,
            session_id,
            file_name: file.file_name.clone(),
            mime_type: file.mime_type.clone(),
            size_bytes: file.bytes.len() as u64,
            local_path: local_path.to_string_lossy().into_owned(),
            external_file_id: None,
            shared_url: None,
            created_at: Utc::now(),
        };
        self.db.insert_upload(&upload).await?;

        if let Some(folder_id) = self.overview_folder(&session) {
            match self
                .vault
                .upload_file(&folder_id, &file.file_name, file.bytes)
                .await
            {
                Ok(mirrored) => {
                    self.db
                        .update_upload_mirror(
                            upload.id,
                            &mirrored.file_id,
                            mirrored.shared_url.as_deref(),
                        )
                        .await?;
                    upload.external_file_id = Some(mirrored.file_id);
                    upload.shared_url = mirrored.shared_url;
                }
                Err(e) => {
                    warn!(
                        upload_id = %upload.id,
                        error = %e,
                        "Vault mirroring failed — upload kept local-only"
                    );
                }
            }
        }

        session.step_data.upload = Some(UploadStepData {
            upload_id: upload.id,
            file_name: upload.file_name.clone(),
            external_file_id: upload.external_file_id.clone(),
            shared_url: upload.shared_url.clone(),
        });
        session.mark_completed(OnboardingStep::Upload);
        session.advance_from(OnboardingStep::Upload);
        self.db.save_session(&session).await?;

        Ok(UploadOutcome {
            upload,
            next_step: session.current_step,
        })
    }

    /// The terminal step: send the uploaded deck to the scoring API, persist
    /// the raw result, and mark the session complete.
    ///
    /// Only the scoring call can fail this operation. The completion
    /// notification and certificate generation run on detached tasks.
    pub async fn submit_for_scoring(&self, session_id: Uuid) -> Result<ScoringOutcome> {
        let mut session = self.get_session(session_id).await?;
        let upload_ref = session
            .step_data
            .upload
            .clone()
            .ok_or(PreconditionFailed::UploadMissing)?;
        let venture = self.resolve_venture(&session).await?;

        let upload = self
            .db
            .get_upload(upload_ref.upload_id)
            .await?
            .ok_or_else(|| Error::NotFound {
                entity: "upload",
                id: upload_ref.upload_id.to_string(),
            })?;
        let bytes = tokio::fs::read(&upload.local_path)
            .await
            .map_err(|e| DatabaseError::Io(format!("read upload: {e}")))?;

        // Re-mirror into the Overview folder if the original mirror failed.
        if upload.external_file_id.is_none() {
            if let Some(folder_id) = self.overview_folder(&session) {
                match self
                    .vault
                    .upload_file(&folder_id, &upload.file_name, bytes.clone())
                    .await
                {
                    Ok(mirrored) => {
                        self.db
                            .update_upload_mirror(
                                upload.id,
                                &mirrored.file_id,
                                mirrored.shared_url.as_deref(),
                            )
                            .await?;
                    }
                    Err(e) => {
                        warn!(upload_id = %upload.id, error = %e, "Re-mirror before scoring failed");
                    }
                }
            }
        }

        // The essential call — any failure (including timeout) surfaces to
        // the caller and nothing is marked complete.
        let result = self.scoring.score_deck(&upload.file_name, bytes).await?;
        info!(
            session_id = %session_id,
            venture_id = %venture.id,
            total_score = result.total_score,
            "Scoring completed"
        );

        self.db.set_venture_score(venture.id, result.total_score).await?;
        session.step_data.processing = Some(ProcessingStepData {
            scoring_result: result.clone(),
            scored_at: Utc::now(),
        });
        session.is_complete = true;
        self.db.save_session(&session).await?;

        self.notifier.dispatch(NotificationEvent::ScoringCompleted {
            session_id,
            venture_id: venture.id,
            total_score: result.total_score,
        });

        // Fire-and-forget certificate generation.
        let scoring = Arc::clone(&self.scoring);
        let venture_name = venture.name.clone();
        let certificate_input = result.clone();
        tokio::spawn(async move {
            if let Err(e) = scoring
                .generate_certificate(&venture_name, &certificate_input)
                .await
            {
                warn!(error = %e, venture = %venture_name, "Certificate generation failed");
            }
        });

        Ok(ScoringOutcome {
            scoring_result: result,
            is_complete: true,
        })
    }

    fn overview_folder(&self, session: &OnboardingSession) -> Option<String> {
        session
            .folder_structure
            .as_ref()
            .and_then(|folders| folders.get(&VaultCategory::Overview).cloned())
    }
}

/// Strip path separators from a client-supplied filename.
fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect()
}
