//! Static journey configuration and the step-selection engine.
//!
//! Step ids are stable and never reordered once shipped — persisted
//! `completed_journey_steps` references them by id.

use super::progress::{ProgressSnapshot, ProgressValue};

/// Backend-verifiable completion criterion, evaluated against the live
/// progress snapshot. Numeric fields use `value >= min_value`; boolean
/// fields use truthiness (`min_value` is ignored for them).
#[derive(Debug, Clone, Copy)]
pub struct CompletionCriteria {
    pub check_field: &'static str,
    pub min_value: f64,
}

/// One entry in the ordered coaching journey.
#[derive(Debug, Clone, Copy)]
pub struct JourneyStep {
    pub id: u32,
    pub page: &'static str,
    pub title: &'static str,
    pub guidance: &'static str,
    pub criteria: Option<CompletionCriteria>,
}

/// The shipped journey, in presentation order.
pub static DEFAULT_JOURNEY: &[JourneyStep] = &[
    JourneyStep {
        id: 1,
        page: "dashboard",
        title: "Meet your ProofScore",
        guidance: "Your ProofScore summarizes how validated your venture is today. Start here.",
        criteria: None,
    },
    JourneyStep {
        id: 2,
        page: "dashboard",
        title: "Review your score breakdown",
        guidance: "Open the five dimensions to see where the evidence is thin.",
        criteria: None,
    },
    JourneyStep {
        id: 3,
        page: "dashboard",
        title: "Run your first experiment",
        guidance: "Pick the weakest dimension and run a validation experiment against it.",
        criteria: Some(CompletionCriteria {
            check_field: "experiments_completed",
            min_value: 1.0,
        }),
    },
    JourneyStep {
        id: 4,
        page: "vault",
        title: "Upload your first proof",
        guidance: "Drop a supporting document into the matching ProofVault folder.",
        criteria: Some(CompletionCriteria {
            check_field: "vault_uploads",
            min_value: 1.0,
        }),
    },
    JourneyStep {
        id: 5,
        page: "vault",
        title: "Build out your vault",
        guidance: "Five documents across categories gives investors a real picture.",
        criteria: Some(CompletionCriteria {
            check_field: "vault_uploads",
            min_value: 5.0,
        }),
    },
    JourneyStep {
        id: 6,
        page: "validation-map",
        title: "Export your validation map",
        guidance: "Export the map to share your validation journey outside the platform.",
        criteria: Some(CompletionCriteria {
            check_field: "validation_map_exported",
            min_value: 1.0,
        }),
    },
    JourneyStep {
        id: 7,
        page: "deal-room",
        title: "Reach investor readiness",
        guidance: "A ProofScore of 70 signals investor readiness.",
        criteria: Some(CompletionCriteria {
            check_field: "proof_score",
            min_value: 70.0,
        }),
    },
    JourneyStep {
        id: 8,
        page: "deal-room",
        title: "Unlock the Deal Room",
        guidance: "Unlock the Deal Room to get in front of investors.",
        criteria: Some(CompletionCriteria {
            check_field: "deal_room_unlocked",
            min_value: 1.0,
        }),
    },
];

/// Pages that carry an ordered first-visit tutorial overlay.
pub static TUTORIAL_PAGES: &[&str] = &["dashboard", "vault", "deal-room"];

pub fn page_has_tutorial(page: &str) -> bool {
    TUTORIAL_PAGES.contains(&page)
}

pub fn step_by_id(steps: &[JourneyStep], id: u32) -> Option<&JourneyStep> {
    steps.iter().find(|s| s.id == id)
}

/// Select the step to present on `page`: the first page step (in declared
/// order) whose id is not in `completed`. When every page step is completed
/// the last one is returned for terminal "done" display. Returns None when
/// the page declares no steps — callers fall back to the global
/// `current_journey_step` counter.
pub fn current_step_for_page<'a>(
    steps: &'a [JourneyStep],
    page: &str,
    completed: &std::collections::BTreeSet<u32>,
) -> Option<&'a JourneyStep> {
    let mut last = None;
    for step in steps.iter().filter(|s| s.page == page) {
        if !completed.contains(&step.id) {
            return Some(step);
        }
        last = Some(step);
    }
    last
}

/// Whether the backend criterion for `step` is satisfied by `snapshot`.
///
/// This is deliberately independent of user-declared completion
/// ([`CoachState::is_step_completed`](super::state::CoachState::is_step_completed)):
/// checklists consult one, unlock gating the other, and neither overwrites
/// the other. A step without a criterion is never criteria-met.
pub fn is_step_criteria_met(step: &JourneyStep, snapshot: &ProgressSnapshot) -> bool {
    let Some(criteria) = step.criteria else {
        return false;
    };
    match snapshot.field(criteria.check_field) {
        Some(ProgressValue::Number(value)) => value >= criteria.min_value,
        Some(ProgressValue::Flag(flag)) => flag,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    fn fixture() -> Vec<JourneyStep> {
        vec![
            JourneyStep {
                id: 1,
                page: "dashboard",
                title: "one",
                guidance: "",
                criteria: None,
            },
            JourneyStep {
                id: 2,
                page: "dashboard",
                title: "two",
                guidance: "",
                criteria: None,
            },
            JourneyStep {
                id: 3,
                page: "other",
                title: "three",
                guidance: "",
                criteria: None,
            },
        ]
    }

    fn snapshot() -> ProgressSnapshot {
        ProgressSnapshot {
            experiments_completed: 0,
            vault_uploads: 0,
            proof_score: 0.0,
            deal_room_unlocked: false,
            dashboard_tutorial_viewed: false,
            validation_map_exported: false,
            computed_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn first_uncompleted_page_step_is_current() {
        let steps = fixture();
        let completed: BTreeSet<u32> = [1].into();
        let current = current_step_for_page(&steps, "dashboard", &completed).unwrap();
        assert_eq!(current.id, 2);
    }

    #[test]
    fn all_completed_returns_last_step_for_terminal_display() {
        let steps = fixture();
        let completed: BTreeSet<u32> = [1, 2].into();
        let current = current_step_for_page(&steps, "dashboard", &completed).unwrap();
        assert_eq!(current.id, 2);
    }

    #[test]
    fn page_without_steps_returns_none() {
        let steps = fixture();
        assert!(current_step_for_page(&steps, "deal-room", &BTreeSet::new()).is_none());
    }

    #[test]
    fn numeric_criteria_use_at_least_semantics() {
        let step = JourneyStep {
            id: 9,
            page: "dashboard",
            title: "",
            guidance: "",
            criteria: Some(CompletionCriteria {
                check_field: "proof_score",
                min_value: 30.0,
            }),
        };
        let mut snap = snapshot();
        snap.proof_score = 29.0;
        assert!(!is_step_criteria_met(&step, &snap));
        snap.proof_score = 30.0;
        assert!(is_step_criteria_met(&step, &snap));
        snap.proof_score = 31.0;
        assert!(is_step_criteria_met(&step, &snap));
    }

    #[test]
    fn boolean_criteria_use_truthiness() {
        let step = JourneyStep {
            id: 9,
            page: "deal-room",
            title: "",
            guidance: "",
            criteria: Some(CompletionCriteria {
                check_field: "deal_room_unlocked",
                min_value: 1.0,
            }),
        };
        let mut snap = snapshot();
        assert!(!is_step_criteria_met(&step, &snap));
        snap.deal_room_unlocked = true;
        assert!(is_step_criteria_met(&step, &snap));
    }

    #[test]
    fn step_without_criteria_is_never_backend_met() {
        let steps = fixture();
        assert!(!is_step_criteria_met(&steps[0], &snapshot()));
    }

    #[test]
    fn unknown_field_is_never_met() {
        let step = JourneyStep {
            id: 9,
            page: "x",
            title: "",
            guidance: "",
            criteria: Some(CompletionCriteria {
                check_field: "does_not_exist",
                min_value: 0.0,
            }),
        };
        assert!(!is_step_criteria_met(&step, &snapshot()));
    }

    #[test]
    fn default_journey_ids_are_unique_and_ordered() {
        let mut seen = BTreeSet::new();
        for step in DEFAULT_JOURNEY {
            assert!(seen.insert(step.id), "duplicate journey id {}", step.id);
        }
    }
}
