//! Coach orchestration: loads per-founder state, applies overlay actions,
//! and assembles the journey view served to the client.
//!
//! State is cached in memory per founder and written through to the store
//! on every mutation. A write-through failure keeps the in-memory copy
//! authoritative for this process and is logged rather than surfaced — the
//! coach is guidance UI, not a system of record.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::warn;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::store::Database;

use super::journey::{self, DEFAULT_JOURNEY, JourneyStep};
use super::progress::{ClientSignals, CoachProgressService, ProgressSnapshot};
use super::state::{CoachState, OverlayState};

/// Overlay actions a founder can take from the client.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoachAction {
    Expand,
    Minimize,
    Dismiss,
    Reopen,
}

/// One journey step as rendered to the client.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneyStepView {
    pub id: u32,
    pub page: &'static str,
    pub title: &'static str,
    pub guidance: &'static str,
    /// User-declared completion (explicit "mark done").
    pub completed: bool,
}

/// The full coach view for one page visit.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoachView {
    pub overlay: OverlayState,
    pub current_journey_step: u32,
    /// The step highlighted for this page, if any belongs to it.
    pub page_step: Option<JourneyStepView>,
    pub steps: Vec<JourneyStepView>,
}

/// Journey progress: the live snapshot plus backend-verified completion
/// per step. Kept separate from user-declared completion in [`CoachView`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneyProgress {
    pub snapshot: ProgressSnapshot,
    /// Step id → criteria met. Steps without criteria are reported `false`.
    pub criteria_met: HashMap<u32, bool>,
}

pub struct CoachManager {
    db: Arc<dyn Database>,
    progress: CoachProgressService,
    states: RwLock<HashMap<Uuid, CoachState>>,
}

impl CoachManager {
    pub fn new(db: Arc<dyn Database>, progress_cache_ttl: Duration) -> Self {
        let progress = CoachProgressService::new(Arc::clone(&db), progress_cache_ttl);
        Self {
            db,
            progress,
            states: RwLock::new(HashMap::new()),
        }
    }

    /// Load (and cache) the coach state for a founder, defaulting for
    /// first-time visitors.
    async fn load_state(&self, founder_id: Uuid) -> Result<CoachState> {
        if let Some(state) = self.states.read().await.get(&founder_id) {
            return Ok(state.clone());
        }
        let state = self
            .db
            .get_coach_state(founder_id)
            .await?
            .unwrap_or_default();
        self.states.write().await.insert(founder_id, state.clone());
        Ok(state)
    }

    /// Update the cache and write through to the store.
    async fn persist(&self, founder_id: Uuid, state: CoachState) {
        self.states.write().await.insert(founder_id, state.clone());
        if let Err(e) = self.db.save_coach_state(founder_id, &state).await {
            warn!(%founder_id, error = %e, "failed to persist coach state");
        }
    }

    /// Assemble the coach view for a page visit.
    pub async fn view(&self, founder_id: Uuid, page: &str) -> Result<CoachView> {
        let state = self.load_state(founder_id).await?;
        let steps: Vec<JourneyStepView> = DEFAULT_JOURNEY
            .iter()
            .map(|s| step_view(s, &state))
            .collect();
        let page_step = journey::current_step_for_page(
            DEFAULT_JOURNEY,
            page,
            &state.completed_journey_steps,
        )
        .map(|s| step_view(s, &state));

        Ok(CoachView {
            overlay: state.overlay_for_page(page),
            current_journey_step: state.current_journey_step,
            page_step,
            steps,
        })
    }

    /// Apply an overlay action (expand/minimize/dismiss/reopen).
    pub async fn apply_action(
        &self,
        founder_id: Uuid,
        action: CoachAction,
        page: &str,
    ) -> Result<CoachView> {
        let mut state = self.load_state(founder_id).await?;
        match action {
            CoachAction::Expand => state.expand(),
            CoachAction::Minimize => state.minimize(),
            CoachAction::Dismiss => state.dismiss(),
            CoachAction::Reopen => state.reopen(),
        }
        self.persist(founder_id, state).await;
        self.view(founder_id, page).await
    }

    /// User-declared completion of a journey step.
    pub async fn complete_step(&self, founder_id: Uuid, step_id: u32) -> Result<CoachView> {
        let step = journey::step_by_id(DEFAULT_JOURNEY, step_id).ok_or(Error::NotFound {
            entity: "journey step",
            id: step_id.to_string(),
        })?;
        let mut state = self.load_state(founder_id).await?;
        state.complete_step(step.id, DEFAULT_JOURNEY);
        self.persist(founder_id, state).await;
        self.view(founder_id, step.page).await
    }

    /// Mark a page tutorial as finished (or skipped).
    pub async fn complete_tutorial(&self, founder_id: Uuid, page: &str) -> Result<CoachView> {
        let mut state = self.load_state(founder_id).await?;
        state.complete_tutorial(page);
        self.persist(founder_id, state).await;
        self.view(founder_id, page).await
    }

    /// Restore the founder's coach state to first-visit defaults.
    pub async fn reset(&self, founder_id: Uuid) -> Result<CoachView> {
        let mut state = self.load_state(founder_id).await?;
        state.reset();
        self.persist(founder_id, state).await;
        self.view(founder_id, "dashboard").await
    }

    /// Live journey progress for a founder: the snapshot plus backend
    /// criteria evaluation per step. With no explicit venture the founder's
    /// most recent one is used.
    pub async fn journey_progress(
        &self,
        founder_id: Uuid,
        venture_id: Option<Uuid>,
    ) -> Result<JourneyProgress> {
        let venture_id = match venture_id {
            Some(id) => id,
            None => self
                .db
                .latest_venture_for_founder(founder_id)
                .await?
                .map(|v| v.id)
                .ok_or(Error::NotFound {
                    entity: "venture",
                    id: founder_id.to_string(),
                })?,
        };

        let snapshot = self.progress.get_progress(founder_id, venture_id).await?;
        let criteria_met = DEFAULT_JOURNEY
            .iter()
            .map(|s| (s.id, journey::is_step_criteria_met(s, &snapshot)))
            .collect();

        Ok(JourneyProgress {
            snapshot,
            criteria_met,
        })
    }

    /// Record trusted client-side flags and invalidate cached snapshots.
    pub async fn report_signals(&self, founder_id: Uuid, signals: ClientSignals) -> Result<()> {
        self.progress.report_client_flags(founder_id, signals).await
    }
}

fn step_view(step: &JourneyStep, state: &CoachState) -> JourneyStepView {
    JourneyStepView {
        id: step.id,
        page: step.page,
        title: step.title,
        guidance: step.guidance,
        completed: state.is_step_completed(step.id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LibSqlBackend;

    async fn manager() -> CoachManager {
        let db = LibSqlBackend::new_memory().await.unwrap();
        CoachManager::new(Arc::new(db), Duration::from_secs(120))
    }

    #[tokio::test]
    async fn first_visit_shows_tutorial_then_journey() {
        let m = manager().await;
        let founder = Uuid::new_v4();

        let view = m.view(founder, "dashboard").await.unwrap();
        assert_eq!(view.overlay, OverlayState::TutorialActive);

        let view = m.complete_tutorial(founder, "dashboard").await.unwrap();
        assert_eq!(view.overlay, OverlayState::Minimized);

        let view = m
            .apply_action(founder, CoachAction::Expand, "dashboard")
            .await
            .unwrap();
        assert_eq!(view.overlay, OverlayState::JourneyActive);
    }

    #[tokio::test]
    async fn dismiss_then_reopen_lands_on_minimized() {
        let m = manager().await;
        let founder = Uuid::new_v4();

        let view = m
            .apply_action(founder, CoachAction::Dismiss, "vault")
            .await
            .unwrap();
        assert_eq!(view.overlay, OverlayState::Hidden);

        // Expand is a no-op while dismissed.
        let view = m
            .apply_action(founder, CoachAction::Expand, "vault")
            .await
            .unwrap();
        assert_eq!(view.overlay, OverlayState::Hidden);

        let view = m
            .apply_action(founder, CoachAction::Reopen, "vault")
            .await
            .unwrap();
        assert_eq!(view.overlay, OverlayState::Minimized);
    }

    #[tokio::test]
    async fn complete_step_advances_and_persists() {
        let m = manager().await;
        let founder = Uuid::new_v4();

        let view = m.complete_step(founder, 1).await.unwrap();
        assert_eq!(view.current_journey_step, 2);
        assert!(view.steps[0].completed);

        // Survives the in-memory cache being dropped.
        m.states.write().await.clear();
        let view = m.view(founder, "dashboard").await.unwrap();
        assert_eq!(view.current_journey_step, 2);
        assert!(view.steps[0].completed);
    }

    #[tokio::test]
    async fn unknown_step_is_not_found() {
        let m = manager().await;
        let err = m.complete_step(Uuid::new_v4(), 999).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[tokio::test]
    async fn reset_restores_defaults() {
        let m = manager().await;
        let founder = Uuid::new_v4();
        m.complete_step(founder, 1).await.unwrap();
        m.apply_action(founder, CoachAction::Dismiss, "dashboard")
            .await
            .unwrap();

        let view = m.reset(founder).await.unwrap();
        assert_eq!(view.current_journey_step, 1);
        assert!(view.steps.iter().all(|s| !s.completed));
        assert_eq!(view.overlay, OverlayState::TutorialActive);
    }
}
