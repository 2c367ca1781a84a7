//! End-to-end onboarding flow against an in-memory store with stub
//! external collaborators.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use uuid::Uuid;

use proofhub::error::{Error, ExternalServiceError, PreconditionFailed};
use proofhub::external::{
    MirroredFile, Notifier, ProvisionedFolder, ScoringClient, VaultStorage,
};
use proofhub::onboarding::manager::{OnboardingManager, UploadedFile};
use proofhub::onboarding::model::{ScoreDimensions, ScoringResult, VaultCategory};
use proofhub::onboarding::session::OnboardingStep;
use proofhub::onboarding::validate::{FounderInput, TeamMemberInput, VentureInput};
use proofhub::store::{Database, LibSqlBackend};

/// Vault stub that succeeds for every category and counts uploads.
struct StubVault {
    folders_created: AtomicU32,
    files_uploaded: AtomicU32,
}

impl StubVault {
    fn new() -> Self {
        Self {
            folders_created: AtomicU32::new(0),
            files_uploaded: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl VaultStorage for StubVault {
    async fn create_folder(
        &self,
        _venture_name: &str,
        category: VaultCategory,
    ) -> Result<ProvisionedFolder, ExternalServiceError> {
        self.folders_created.fetch_add(1, Ordering::SeqCst);
        Ok(ProvisionedFolder {
            folder_id: format!("folder-{category}"),
        })
    }

    async fn upload_file(
        &self,
        folder_id: &str,
        file_name: &str,
        _bytes: Vec<u8>,
    ) -> Result<MirroredFile, ExternalServiceError> {
        self.files_uploaded.fetch_add(1, Ordering::SeqCst);
        Ok(MirroredFile {
            file_id: format!("{folder_id}/{file_name}"),
            shared_url: None,
        })
    }
}

/// Vault stub that only manages to create the first few folders.
struct FlakyVault {
    successes_left: AtomicU32,
}

#[async_trait]
impl VaultStorage for FlakyVault {
    async fn create_folder(
        &self,
        _venture_name: &str,
        _category: VaultCategory,
    ) -> Result<ProvisionedFolder, ExternalServiceError> {
        let left = self.successes_left.load(Ordering::SeqCst);
        if left == 0 {
            return Err(ExternalServiceError::StorageFailed {
                reason: "provider unavailable".to_string(),
            });
        }
        self.successes_left.fetch_sub(1, Ordering::SeqCst);
        Ok(ProvisionedFolder {
            folder_id: Uuid::new_v4().to_string(),
        })
    }

    async fn upload_file(
        &self,
        _folder_id: &str,
        _file_name: &str,
        _bytes: Vec<u8>,
    ) -> Result<MirroredFile, ExternalServiceError> {
        Err(ExternalServiceError::StorageFailed {
            reason: "provider unavailable".to_string(),
        })
    }
}

/// Scoring stub returning a fixed result.
struct StubScoring {
    total_score: f64,
}

#[async_trait]
impl ScoringClient for StubScoring {
    async fn score_deck(
        &self,
        _file_name: &str,
        _bytes: Vec<u8>,
    ) -> Result<ScoringResult, ExternalServiceError> {
        Ok(ScoringResult {
            total_score: self.total_score,
            dimensions: ScoreDimensions {
                desirability: 80.0,
                feasibility: 75.0,
                viability: 70.0,
                traction: 65.0,
                readiness: 72.0,
            },
            insights: serde_json::json!({"summary": "solid traction"}),
        })
    }

    async fn generate_certificate(
        &self,
        _venture_name: &str,
        _result: &ScoringResult,
    ) -> Result<(), ExternalServiceError> {
        Ok(())
    }
}

/// Scoring stub that always fails.
struct FailingScoring;

#[async_trait]
impl ScoringClient for FailingScoring {
    async fn score_deck(
        &self,
        _file_name: &str,
        _bytes: Vec<u8>,
    ) -> Result<ScoringResult, ExternalServiceError> {
        Err(ExternalServiceError::ScoringFailed {
            reason: "model offline".to_string(),
        })
    }

    async fn generate_certificate(
        &self,
        _venture_name: &str,
        _result: &ScoringResult,
    ) -> Result<(), ExternalServiceError> {
        Ok(())
    }
}

struct Harness {
    db: Arc<dyn Database>,
    manager: OnboardingManager,
    _upload_dir: tempfile::TempDir,
}

async fn harness_with(
    vault: Arc<dyn VaultStorage>,
    scoring: Arc<dyn ScoringClient>,
) -> Harness {
    let db: Arc<dyn Database> = Arc::new(LibSqlBackend::new_memory().await.unwrap());
    let upload_dir = tempfile::tempdir().unwrap();
    let manager = OnboardingManager::new(
        Arc::clone(&db),
        vault,
        scoring,
        Arc::new(Notifier::disabled()),
        PathBuf::from(upload_dir.path()),
    );
    Harness {
        db,
        manager,
        _upload_dir: upload_dir,
    }
}

async fn harness() -> Harness {
    harness_with(
        Arc::new(StubVault::new()),
        Arc::new(StubScoring { total_score: 82.5 }),
    )
    .await
}

fn founder_input(email: &str) -> FounderInput {
    FounderInput {
        email: email.to_string(),
        full_name: "Dana Reyes".to_string(),
        role: Some("CEO".to_string()),
        linkedin_url: None,
    }
}

fn venture_input() -> VentureInput {
    VentureInput {
        name: "Acme Robotics".to_string(),
        industry: "robotics".to_string(),
        geography: "EU".to_string(),
        description: None,
        website: Some("https://acme.example".to_string()),
    }
}

fn deck() -> UploadedFile {
    UploadedFile {
        file_name: "deck.pdf".to_string(),
        mime_type: "application/pdf".to_string(),
        bytes: b"%PDF-1.4 stub deck".to_vec(),
    }
}

#[tokio::test]
async fn full_flow_founder_to_scored() {
    let h = harness().await;

    let session = h.manager.initialize_session().await.unwrap();
    assert_eq!(session.current_step, OnboardingStep::Founder);
    assert!(!session.is_complete);

    let founder = h
        .manager
        .complete_founder_step(session.session_id, founder_input("dana@acme.example"))
        .await
        .unwrap();
    assert_eq!(founder.next_step, OnboardingStep::Venture);

    let venture = h
        .manager
        .complete_venture_step(session.session_id, venture_input())
        .await
        .unwrap();
    assert_eq!(venture.next_step, OnboardingStep::Team);
    // All seven canonical categories provisioned.
    assert_eq!(venture.folder_structure.len(), VaultCategory::ALL.len());

    // Team step completes with zero members.
    let next = h
        .manager
        .complete_team_step(session.session_id)
        .await
        .unwrap();
    assert_eq!(next, OnboardingStep::Upload);

    let upload = h
        .manager
        .handle_document_upload(session.session_id, deck())
        .await
        .unwrap();
    assert_eq!(upload.next_step, OnboardingStep::Processing);

    let outcome = h
        .manager
        .submit_for_scoring(session.session_id)
        .await
        .unwrap();
    assert!(outcome.is_complete);
    assert!((0.0..=100.0).contains(&outcome.scoring_result.total_score));
    assert_eq!(outcome.scoring_result.total_score, 82.5);

    // Score round-trips onto the persisted venture and session.
    let session = h.manager.get_session(session.session_id).await.unwrap();
    assert!(session.is_complete);
    assert_eq!(session.current_step, OnboardingStep::Processing);

    // Exactly the four explicit steps are recorded as completed.
    let expected: std::collections::BTreeSet<_> = [
        OnboardingStep::Founder,
        OnboardingStep::Venture,
        OnboardingStep::Team,
        OnboardingStep::Upload,
    ]
    .into_iter()
    .collect();
    assert_eq!(session.completed_steps, expected);

    // The stored scoring result survives the round trip intact.
    let processing = session.step_data.processing.as_ref().unwrap();
    assert_eq!(processing.scoring_result.total_score, 82.5);
    assert_eq!(processing.scoring_result.dimensions.desirability, 80.0);
    assert_eq!(
        processing.scoring_result.insights,
        serde_json::json!({"summary": "solid traction"})
    );

    let venture_id = session.venture_id.unwrap();
    let stored = h.db.get_venture(venture_id).await.unwrap().unwrap();
    assert_eq!(stored.proof_score, Some(82.5));
}

#[tokio::test]
async fn completed_steps_stay_unique_on_resubmit() {
    let h = harness().await;
    let session = h.manager.initialize_session().await.unwrap();

    h.manager
        .complete_founder_step(session.session_id, founder_input("dana@acme.example"))
        .await
        .unwrap();
    // Editing the founder step again must not duplicate the entry.
    h.manager
        .complete_founder_step(session.session_id, founder_input("dana@acme.example"))
        .await
        .unwrap();

    let session = h.manager.get_session(session.session_id).await.unwrap();
    assert_eq!(session.completed_steps.len(), 1);
    assert!(session.completed_steps.contains(&OnboardingStep::Founder));
}

#[tokio::test]
async fn venture_before_founder_is_a_precondition_failure() {
    let h = harness().await;
    let session = h.manager.initialize_session().await.unwrap();

    let err = h
        .manager
        .complete_venture_step(session.session_id, venture_input())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Precondition(PreconditionFailed::FounderMissing)
    ));

    // No venture was created.
    let session = h.manager.get_session(session.session_id).await.unwrap();
    assert!(session.venture_id.is_none());
    assert_eq!(session.current_step, OnboardingStep::Founder);
}

#[tokio::test]
async fn same_email_reuses_the_founder() {
    let h = harness().await;

    let s1 = h.manager.initialize_session().await.unwrap();
    let f1 = h
        .manager
        .complete_founder_step(s1.session_id, founder_input("dana@acme.example"))
        .await
        .unwrap();

    let s2 = h.manager.initialize_session().await.unwrap();
    let mut input = founder_input("dana@acme.example");
    input.full_name = "Dana R. Reyes".to_string();
    let f2 = h
        .manager
        .complete_founder_step(s2.session_id, input)
        .await
        .unwrap();

    assert_eq!(f1.founder_id, f2.founder_id);
    let stored = h.db.get_founder(f1.founder_id).await.unwrap().unwrap();
    assert_eq!(stored.full_name, "Dana R. Reyes");
}

#[tokio::test]
async fn reassociation_attempt_fails_without_touching_founders() {
    let h = harness().await;

    // Founder B exists via their own session.
    let b_session = h.manager.initialize_session().await.unwrap();
    let b = h
        .manager
        .complete_founder_step(b_session.session_id, {
            let mut input = founder_input("blake@other.example");
            input.full_name = "Blake Original".to_string();
            input
        })
        .await
        .unwrap();

    // A different session is already associated with founder A.
    let a_session = h.manager.initialize_session().await.unwrap();
    h.manager
        .complete_founder_step(a_session.session_id, founder_input("dana@acme.example"))
        .await
        .unwrap();

    // Resubmitting A's session with B's email must fail...
    let mut hijack = founder_input("blake@other.example");
    hijack.full_name = "Someone Else".to_string();
    let err = h
        .manager
        .complete_founder_step(a_session.session_id, hijack)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Precondition(PreconditionFailed::FounderAlreadyAssociated)
    ));

    // ...and B's profile must be untouched by the rejected call.
    let stored = h.db.get_founder(b.founder_id).await.unwrap().unwrap();
    assert_eq!(stored.full_name, "Blake Original");

    // A brand-new email in an associated session fails too, and leaves no
    // orphan founder row behind.
    let err = h
        .manager
        .complete_founder_step(a_session.session_id, founder_input("fresh@new.example"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Precondition(PreconditionFailed::FounderAlreadyAssociated)
    ));
    assert!(
        h.db.get_founder_by_email("fresh@new.example")
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn scoring_failure_leaves_session_incomplete() {
    let h = harness_with(Arc::new(StubVault::new()), Arc::new(FailingScoring)).await;
    let session = h.manager.initialize_session().await.unwrap();

    h.manager
        .complete_founder_step(session.session_id, founder_input("dana@acme.example"))
        .await
        .unwrap();
    h.manager
        .complete_venture_step(session.session_id, venture_input())
        .await
        .unwrap();
    h.manager.complete_team_step(session.session_id).await.unwrap();
    h.manager
        .handle_document_upload(session.session_id, deck())
        .await
        .unwrap();

    let err = h
        .manager
        .submit_for_scoring(session.session_id)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::External(_)));

    let session = h.manager.get_session(session.session_id).await.unwrap();
    assert!(!session.is_complete);
    assert!(session.step_data.processing.is_none());
}

#[tokio::test]
async fn vault_partial_failure_does_not_block_the_venture_step() {
    let h = harness_with(
        Arc::new(FlakyVault {
            successes_left: AtomicU32::new(3),
        }),
        Arc::new(StubScoring { total_score: 50.0 }),
    )
    .await;
    let session = h.manager.initialize_session().await.unwrap();

    h.manager
        .complete_founder_step(session.session_id, founder_input("dana@acme.example"))
        .await
        .unwrap();
    let outcome = h
        .manager
        .complete_venture_step(session.session_id, venture_input())
        .await
        .unwrap();

    assert_eq!(outcome.next_step, OnboardingStep::Team);
    assert_eq!(outcome.folder_structure.len(), 3);
}

#[tokio::test]
async fn team_members_are_scoped_to_their_session() {
    let h = harness().await;
    let session = h.manager.initialize_session().await.unwrap();
    h.manager
        .complete_founder_step(session.session_id, founder_input("dana@acme.example"))
        .await
        .unwrap();
    h.manager
        .complete_venture_step(session.session_id, venture_input())
        .await
        .unwrap();

    let member = h
        .manager
        .add_team_member(
            session.session_id,
            TeamMemberInput {
                name: "Sam Osei".to_string(),
                role: "CTO".to_string(),
                email: None,
                linkedin_url: None,
            },
        )
        .await
        .unwrap();

    let members = h.manager.get_team_members(session.session_id).await.unwrap();
    assert_eq!(members.len(), 1);

    // A different session cannot touch the member.
    let other = h.manager.initialize_session().await.unwrap();
    h.manager
        .complete_founder_step(other.session_id, founder_input("sam@other.example"))
        .await
        .unwrap();
    h.manager
        .complete_venture_step(other.session_id, venture_input())
        .await
        .unwrap();
    let err = h
        .manager
        .delete_team_member(other.session_id, member.id)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound { .. }));
}

#[tokio::test]
async fn upload_requires_the_upload_step() {
    let h = harness().await;
    let session = h.manager.initialize_session().await.unwrap();
    h.manager
        .complete_founder_step(session.session_id, founder_input("dana@acme.example"))
        .await
        .unwrap();
    h.manager
        .complete_venture_step(session.session_id, venture_input())
        .await
        .unwrap();
    h.manager.complete_team_step(session.session_id).await.unwrap();

    // Scoring without an upload is a precondition failure.
    let err = h
        .manager
        .submit_for_scoring(session.session_id)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Precondition(PreconditionFailed::UploadMissing)
    ));
}
