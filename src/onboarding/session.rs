//! Onboarding session record and step-progression state machine.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::model::{FolderStructure, ScoringResult};

/// The steps of the onboarding wizard.
///
/// Progresses linearly: Founder → Venture → Team → Upload → Processing.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingStep {
    Founder,
    Venture,
    Team,
    Upload,
    Processing,
}

impl OnboardingStep {
    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: OnboardingStep) -> bool {
        use OnboardingStep::*;
        matches!(
            (self, target),
            (Founder, Venture) | (Venture, Team) | (Team, Upload) | (Upload, Processing)
        )
    }

    /// Whether this step is the terminal scoring step.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Processing)
    }

    /// Get the next step in the linear progression, if any.
    pub fn next(&self) -> Option<OnboardingStep> {
        use OnboardingStep::*;
        match self {
            Founder => Some(Venture),
            Venture => Some(Team),
            Team => Some(Upload),
            Upload => Some(Processing),
            Processing => None,
        }
    }
}

impl Default for OnboardingStep {
    fn default() -> Self {
        Self::Founder
    }
}

impl std::str::FromStr for OnboardingStep {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "founder" => Ok(Self::Founder),
            "venture" => Ok(Self::Venture),
            "team" => Ok(Self::Team),
            "upload" => Ok(Self::Upload),
            "processing" => Ok(Self::Processing),
            other => Err(format!("unknown onboarding step: {other}")),
        }
    }
}

impl std::fmt::Display for OnboardingStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Founder => "founder",
            Self::Venture => "venture",
            Self::Team => "team",
            Self::Upload => "upload",
            Self::Processing => "processing",
        };
        write!(f, "{s}")
    }
}

/// Payload persisted for the founder step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FounderStepData {
    pub founder_id: Uuid,
    pub email: String,
    pub full_name: String,
}

/// Payload persisted for the venture step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VentureStepData {
    pub venture_id: Uuid,
    pub name: String,
    pub folder_structure: FolderStructure,
}

/// Payload persisted for the team step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamStepData {
    pub member_count: usize,
}

/// Payload persisted for the upload step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadStepData {
    pub upload_id: Uuid,
    pub file_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_file_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_url: Option<String>,
}

/// Payload persisted for the terminal scoring step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingStepData {
    pub scoring_result: ScoringResult,
    pub scored_at: DateTime<Utc>,
}

/// Per-step data container — one strongly typed slot per step, serialized
/// as a JSON object keyed by step name. Each slot is replaced wholesale on
/// resubmission, never deleted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub founder: Option<FounderStepData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venture: Option<VentureStepData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<TeamStepData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload: Option<UploadStepData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing: Option<ProcessingStepData>,
}

/// Persisted onboarding session.
///
/// Created anonymously on first onboarding touch; mutated by each step
/// handler; finalized (`is_complete = true`) once scoring succeeds. Never
/// physically deleted by the core.
///
/// Single writer per session is assumed: two concurrent step submissions
/// for the same id interleave per-step-slot last-write-wins. Legitimate
/// clients submit steps serially, so this is documented rather than locked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnboardingSession {
    pub session_id: Uuid,
    /// Set once the founder step completes; never unset afterwards.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub founder_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venture_id: Option<Uuid>,
    /// Denormalized from `step_data.venture` for cheaper access.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_structure: Option<FolderStructure>,
    pub current_step: OnboardingStep,
    pub step_data: StepData,
    pub completed_steps: BTreeSet<OnboardingStep>,
    pub is_complete: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OnboardingSession {
    /// Create a fresh anonymous session at the founder step.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            session_id: Uuid::new_v4(),
            founder_id: None,
            venture_id: None,
            folder_structure: None,
            current_step: OnboardingStep::Founder,
            step_data: StepData::default(),
            completed_steps: BTreeSet::new(),
            is_complete: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Mark a step completed. Idempotent — resubmitting a step must not
    /// duplicate it. Returns true if the step was newly added.
    pub fn mark_completed(&mut self, step: OnboardingStep) -> bool {
        self.touch();
        self.completed_steps.insert(step)
    }

    pub fn is_step_completed(&self, step: OnboardingStep) -> bool {
        self.completed_steps.contains(&step)
    }

    /// Advance `current_step` past `step` if the session is currently on it.
    /// Resubmissions of an earlier step leave the pointer alone.
    pub fn advance_from(&mut self, step: OnboardingStep) {
        if self.current_step == step {
            if let Some(next) = step.next() {
                debug_assert!(step.can_transition_to(next));
                self.current_step = next;
                self.touch();
            }
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl Default for OnboardingSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_transitions() {
        use OnboardingStep::*;
        let transitions = [
            (Founder, Venture),
            (Venture, Team),
            (Team, Upload),
            (Upload, Processing),
        ];
        for (from, to) in transitions {
            assert!(from.can_transition_to(to), "{from} should transition to {to}");
        }
    }

    #[test]
    fn invalid_transitions() {
        use OnboardingStep::*;
        // Skip steps
        assert!(!Founder.can_transition_to(Team));
        assert!(!Venture.can_transition_to(Processing));
        // Go backward
        assert!(!Team.can_transition_to(Venture));
        // Terminal
        assert!(!Processing.can_transition_to(Founder));
        // Self-transition
        assert!(!Founder.can_transition_to(Founder));
    }

    #[test]
    fn next_walks_all_steps() {
        use OnboardingStep::*;
        let expected = [Venture, Team, Upload, Processing];
        let mut current = Founder;
        for expected_next in expected {
            let next = current.next().unwrap();
            assert_eq!(next, expected_next);
            current = next;
        }
        assert!(current.next().is_none());
        assert!(current.is_terminal());
    }

    #[test]
    fn display_matches_serde() {
        use OnboardingStep::*;
        for step in [Founder, Venture, Team, Upload, Processing] {
            let display = format!("{step}");
            let json = serde_json::to_string(&step).unwrap();
            assert_eq!(format!("\"{display}\""), json);
        }
    }

    #[test]
    fn new_session_defaults() {
        let session = OnboardingSession::new();
        assert_eq!(session.current_step, OnboardingStep::Founder);
        assert!(session.completed_steps.is_empty());
        assert!(session.founder_id.is_none());
        assert!(!session.is_complete);
    }

    #[test]
    fn mark_completed_is_idempotent() {
        let mut session = OnboardingSession::new();
        assert!(session.mark_completed(OnboardingStep::Founder));
        assert!(!session.mark_completed(OnboardingStep::Founder));
        assert!(!session.mark_completed(OnboardingStep::Founder));
        assert_eq!(session.completed_steps.len(), 1);
    }

    #[test]
    fn advance_only_moves_the_current_step() {
        let mut session = OnboardingSession::new();
        session.advance_from(OnboardingStep::Founder);
        assert_eq!(session.current_step, OnboardingStep::Venture);

        // Resubmitting founder does not move the pointer again
        session.advance_from(OnboardingStep::Founder);
        assert_eq!(session.current_step, OnboardingStep::Venture);

        session.advance_from(OnboardingStep::Venture);
        session.advance_from(OnboardingStep::Team);
        session.advance_from(OnboardingStep::Upload);
        assert_eq!(session.current_step, OnboardingStep::Processing);

        // Terminal step stays put
        session.advance_from(OnboardingStep::Processing);
        assert_eq!(session.current_step, OnboardingStep::Processing);
    }

    #[test]
    fn step_data_serializes_keyed_by_step_name() {
        let mut session = OnboardingSession::new();
        session.step_data.founder = Some(FounderStepData {
            founder_id: Uuid::new_v4(),
            email: "a@x.com".into(),
            full_name: "Ada".into(),
        });
        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(json["step_data"]["founder"]["email"], "a@x.com");
        assert!(json["step_data"].get("venture").is_none());
    }

    #[test]
    fn session_serde_roundtrip() {
        let mut session = OnboardingSession::new();
        session.mark_completed(OnboardingStep::Founder);
        session.advance_from(OnboardingStep::Founder);
        session.founder_id = Some(Uuid::new_v4());

        let json = serde_json::to_string(&session).unwrap();
        let parsed: OnboardingSession = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.session_id, session.session_id);
        assert_eq!(parsed.current_step, OnboardingStep::Venture);
        assert!(parsed.is_step_completed(OnboardingStep::Founder));
    }
}
