//! Progress aggregation — computes a read-only snapshot of a founder's
//! real-world progress from authoritative store counts plus trusted
//! client-reported flags.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::store::Database;

/// Derived progress snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub experiments_completed: u32,
    pub vault_uploads: u32,
    pub proof_score: f64,
    pub deal_room_unlocked: bool,
    /// Client-reported; not server-verifiable, trusted as reported.
    pub dashboard_tutorial_viewed: bool,
    /// Client-reported; not server-verifiable, trusted as reported.
    pub validation_map_exported: bool,
    pub computed_at: DateTime<Utc>,
}

/// A snapshot field addressed by name for criteria evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProgressValue {
    Number(f64),
    Flag(bool),
}

impl ProgressSnapshot {
    pub fn field(&self, name: &str) -> Option<ProgressValue> {
        match name {
            "experiments_completed" => {
                Some(ProgressValue::Number(self.experiments_completed as f64))
            }
            "vault_uploads" => Some(ProgressValue::Number(self.vault_uploads as f64)),
            "proof_score" => Some(ProgressValue::Number(self.proof_score)),
            "deal_room_unlocked" => Some(ProgressValue::Flag(self.deal_room_unlocked)),
            "dashboard_tutorial_viewed" => {
                Some(ProgressValue::Flag(self.dashboard_tutorial_viewed))
            }
            "validation_map_exported" => Some(ProgressValue::Flag(self.validation_map_exported)),
            _ => None,
        }
    }
}

/// Client-only flags, trusted as reported.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSignals {
    pub dashboard_tutorial_viewed: bool,
    pub validation_map_exported: bool,
}

/// Computes progress snapshots, caching them with a short freshness window.
/// Staleness beyond the window triggers recomputation, never silent reuse.
pub struct CoachProgressService {
    db: Arc<dyn Database>,
    freshness: Duration,
}

impl CoachProgressService {
    pub fn new(db: Arc<dyn Database>, freshness: Duration) -> Self {
        Self { db, freshness }
    }

    /// Get the snapshot for a founder/venture, reusing the cached copy while
    /// fresh. `NotFound` when the venture does not exist.
    pub async fn get_progress(
        &self,
        founder_id: Uuid,
        venture_id: Uuid,
    ) -> Result<ProgressSnapshot> {
        if let Some(cached) = self.db.get_progress_snapshot(founder_id, venture_id).await? {
            let age = Utc::now().signed_duration_since(cached.computed_at);
            if age.num_seconds() >= 0 && age.num_seconds() as u64 <= self.freshness.as_secs() {
                return Ok(cached);
            }
        }
        self.recalculate_and_save(founder_id, venture_id).await
    }

    /// Force a fresh computation and persist it (also used for
    /// reconciliation/debugging).
    pub async fn recalculate_and_save(
        &self,
        founder_id: Uuid,
        venture_id: Uuid,
    ) -> Result<ProgressSnapshot> {
        let venture = self
            .db
            .get_venture(venture_id)
            .await?
            .ok_or_else(|| Error::NotFound {
                entity: "venture",
                id: venture_id.to_string(),
            })?;

        let signals = self.db.get_client_signals(founder_id).await?;
        let snapshot = ProgressSnapshot {
            experiments_completed: self.db.count_experiments(venture_id).await?,
            vault_uploads: self.db.count_uploads_for_venture(venture_id).await?,
            proof_score: venture.proof_score.unwrap_or(0.0),
            deal_room_unlocked: self.db.get_deal_room_access(founder_id).await?,
            dashboard_tutorial_viewed: signals.dashboard_tutorial_viewed,
            validation_map_exported: signals.validation_map_exported,
            computed_at: Utc::now(),
        };

        self.db
            .save_progress_snapshot(founder_id, venture_id, &snapshot)
            .await?;
        Ok(snapshot)
    }

    /// Record trusted client-side flags and invalidate cached snapshots so
    /// the next read recomputes.
    pub async fn report_client_flags(
        &self,
        founder_id: Uuid,
        signals: ClientSignals,
    ) -> Result<()> {
        self.db.save_client_signals(founder_id, &signals).await?;
        self.db
            .delete_progress_snapshots_for_founder(founder_id)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> ProgressSnapshot {
        ProgressSnapshot {
            experiments_completed: 2,
            vault_uploads: 7,
            proof_score: 64.5,
            deal_room_unlocked: true,
            dashboard_tutorial_viewed: false,
            validation_map_exported: true,
            computed_at: Utc::now(),
        }
    }

    #[test]
    fn fields_are_addressable_by_name() {
        let snap = snapshot();
        assert_eq!(snap.field("vault_uploads"), Some(ProgressValue::Number(7.0)));
        assert_eq!(snap.field("proof_score"), Some(ProgressValue::Number(64.5)));
        assert_eq!(
            snap.field("deal_room_unlocked"),
            Some(ProgressValue::Flag(true))
        );
        assert_eq!(snap.field("nope"), None);
    }
}
