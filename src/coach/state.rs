//! Persisted coach state and the overlay state machine.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::journey::{self, JourneyStep};

/// What the coach overlay is currently showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayState {
    /// Dismissed entirely; only `reopen` brings it back.
    Hidden,
    Minimized,
    TutorialActive,
    JourneyActive,
}

/// Per-founder coach state, persisted as a JSON blob.
///
/// Mutated by explicit user actions (minimize/expand/dismiss/complete-step/
/// complete-tutorial) — system-detected criteria completion is tracked
/// separately and never written into `completed_journey_steps`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoachState {
    pub current_journey_step: u32,
    pub completed_journey_steps: BTreeSet<u32>,
    pub is_minimized: bool,
    pub is_dismissed: bool,
    pub tutorial_completed_pages: BTreeSet<String>,
}

impl Default for CoachState {
    fn default() -> Self {
        Self {
            current_journey_step: 1,
            completed_journey_steps: BTreeSet::new(),
            is_minimized: false,
            is_dismissed: false,
            tutorial_completed_pages: BTreeSet::new(),
        }
    }
}

impl CoachState {
    /// Derive the overlay state for a page.
    pub fn overlay_for_page(&self, page: &str) -> OverlayState {
        if self.is_dismissed {
            OverlayState::Hidden
        } else if self.is_minimized {
            OverlayState::Minimized
        } else if journey::page_has_tutorial(page) && !self.tutorial_completed_pages.contains(page)
        {
            OverlayState::TutorialActive
        } else {
            OverlayState::JourneyActive
        }
    }

    /// Expand from minimized into an active view. No-op while dismissed.
    pub fn expand(&mut self) {
        if !self.is_dismissed {
            self.is_minimized = false;
        }
    }

    pub fn minimize(&mut self) {
        self.is_minimized = true;
    }

    pub fn dismiss(&mut self) {
        self.is_dismissed = true;
    }

    /// Reopen after a dismissal. Always lands on Minimized, never directly
    /// on an active guidance view.
    pub fn reopen(&mut self) {
        self.is_dismissed = false;
        self.is_minimized = true;
    }

    /// User-declared completion of a journey step. Advances the global
    /// counter to the first step not yet completed (or the last step).
    pub fn complete_step(&mut self, step_id: u32, steps: &[JourneyStep]) {
        self.completed_journey_steps.insert(step_id);
        self.current_journey_step = steps
            .iter()
            .find(|s| !self.completed_journey_steps.contains(&s.id))
            .or_else(|| steps.last())
            .map(|s| s.id)
            .unwrap_or(self.current_journey_step);
    }

    /// User-declared completion query. Independent of backend criteria —
    /// see [`journey::is_step_criteria_met`].
    pub fn is_step_completed(&self, step_id: u32) -> bool {
        self.completed_journey_steps.contains(&step_id)
    }

    /// Finishing (or skipping) a page tutorial always lands on Minimized to
    /// avoid an abrupt jump into the journey view.
    pub fn complete_tutorial(&mut self, page: &str) {
        self.tutorial_completed_pages.insert(page.to_string());
        self.is_minimized = true;
    }

    /// Restore all fields to initial defaults.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coach::journey::DEFAULT_JOURNEY;

    #[test]
    fn fresh_state_shows_tutorial_on_tutorial_pages() {
        let state = CoachState::default();
        assert_eq!(state.overlay_for_page("dashboard"), OverlayState::TutorialActive);
        // validation-map has no tutorial
        assert_eq!(
            state.overlay_for_page("validation-map"),
            OverlayState::JourneyActive
        );
    }

    #[test]
    fn dismiss_then_reopen_lands_on_minimized() {
        let mut state = CoachState::default();
        state.dismiss();
        assert_eq!(state.overlay_for_page("dashboard"), OverlayState::Hidden);
        state.reopen();
        assert_eq!(state.overlay_for_page("dashboard"), OverlayState::Minimized);
        // Never directly an active view
        assert_ne!(state.overlay_for_page("dashboard"), OverlayState::JourneyActive);
    }

    #[test]
    fn expand_is_a_noop_while_dismissed() {
        let mut state = CoachState::default();
        state.dismiss();
        state.expand();
        assert_eq!(state.overlay_for_page("dashboard"), OverlayState::Hidden);
    }

    #[test]
    fn expand_into_tutorial_or_journey() {
        let mut state = CoachState::default();
        state.minimize();
        state.expand();
        // Unseen tutorial exists for dashboard
        assert_eq!(state.overlay_for_page("dashboard"), OverlayState::TutorialActive);

        state.complete_tutorial("dashboard");
        // Tutorial completion lands on minimized first
        assert_eq!(state.overlay_for_page("dashboard"), OverlayState::Minimized);
        state.expand();
        assert_eq!(state.overlay_for_page("dashboard"), OverlayState::JourneyActive);
    }

    #[test]
    fn complete_step_advances_global_counter() {
        let mut state = CoachState::default();
        state.complete_step(1, DEFAULT_JOURNEY);
        assert_eq!(state.current_journey_step, 2);
        state.complete_step(2, DEFAULT_JOURNEY);
        assert_eq!(state.current_journey_step, 3);
        // Completing out of order skips past already-completed ids
        state.complete_step(4, DEFAULT_JOURNEY);
        assert_eq!(state.current_journey_step, 3);
    }

    #[test]
    fn complete_step_saturates_at_last_step() {
        let mut state = CoachState::default();
        for step in DEFAULT_JOURNEY {
            state.complete_step(step.id, DEFAULT_JOURNEY);
        }
        assert_eq!(
            state.current_journey_step,
            DEFAULT_JOURNEY.last().unwrap().id
        );
    }

    #[test]
    fn reset_restores_defaults() {
        let mut state = CoachState::default();
        state.complete_step(1, DEFAULT_JOURNEY);
        state.complete_tutorial("dashboard");
        state.dismiss();
        state.reset();
        assert!(state.completed_journey_steps.is_empty());
        assert!(state.tutorial_completed_pages.is_empty());
        assert!(!state.is_dismissed);
        assert!(!state.is_minimized);
        assert_eq!(state.current_journey_step, 1);
    }

    #[test]
    fn serde_roundtrip() {
        let mut state = CoachState::default();
        state.complete_step(3, DEFAULT_JOURNEY);
        state.complete_tutorial("vault");
        let json = serde_json::to_string(&state).unwrap();
        let parsed: CoachState = serde_json::from_str(&json).unwrap();
        assert!(parsed.is_step_completed(3));
        assert!(parsed.tutorial_completed_pages.contains("vault"));
    }
}
