//! Onboarding entities and the external scoring wire shape.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The individual onboarding; owns one or more ventures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Founder {
    pub id: Uuid,
    /// Looked up with a case-sensitive exact match on resubmission.
    pub email: String,
    pub full_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkedin_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The startup being validated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Venture {
    pub id: Uuid,
    pub founder_id: Uuid,
    pub name: String,
    pub industry: String,
    pub geography: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    /// Latest ProofScore total, written once scoring completes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof_score: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamMember {
    pub id: Uuid,
    pub venture_id: Uuid,
    pub name: String,
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkedin_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Metadata for a pitch-deck (or supporting document) upload.
///
/// `external_file_id`/`shared_url` stay None when mirroring to vault
/// storage failed or is disabled — "uploaded locally, not mirrored".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentUpload {
    pub id: Uuid,
    pub venture_id: Uuid,
    pub session_id: Uuid,
    pub file_name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    /// Where the raw bytes live on local disk (reused at scoring time).
    pub local_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_file_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// The 7 fixed ProofVault categories. One storage folder per category is
/// provisioned at venture-creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VaultCategory {
    Overview,
    ProblemProof,
    SolutionProof,
    DemandProof,
    CredibilityProof,
    CommercialProof,
    InvestorPack,
}

impl VaultCategory {
    pub const ALL: [VaultCategory; 7] = [
        Self::Overview,
        Self::ProblemProof,
        Self::SolutionProof,
        Self::DemandProof,
        Self::CredibilityProof,
        Self::CommercialProof,
        Self::InvestorPack,
    ];

    /// Human-facing folder name used when provisioning storage.
    pub fn folder_name(&self) -> &'static str {
        match self {
            Self::Overview => "0. Overview",
            Self::ProblemProof => "1. Problem Proof",
            Self::SolutionProof => "2. Solution Proof",
            Self::DemandProof => "3. Demand Proof",
            Self::CredibilityProof => "4. Credibility Proof",
            Self::CommercialProof => "5. Commercial Proof",
            Self::InvestorPack => "6. Investor Pack",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Overview => "overview",
            Self::ProblemProof => "problem_proof",
            Self::SolutionProof => "solution_proof",
            Self::DemandProof => "demand_proof",
            Self::CredibilityProof => "credibility_proof",
            Self::CommercialProof => "commercial_proof",
            Self::InvestorPack => "investor_pack",
        }
    }
}

impl std::fmt::Display for VaultCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for VaultCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown vault category: {s}"))
    }
}

/// One provisioned vault folder for a venture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultFolder {
    pub venture_id: Uuid,
    pub category: VaultCategory,
    /// External storage folder identifier.
    pub folder_id: String,
    pub created_at: DateTime<Utc>,
}

/// Category → external folder id, denormalized onto the session for cheap
/// access. Categories whose provisioning failed are simply absent.
pub type FolderStructure = BTreeMap<VaultCategory, String>;

/// The five named ProofScore sub-dimensions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoreDimensions {
    pub desirability: f64,
    pub feasibility: f64,
    pub viability: f64,
    pub traction: f64,
    pub readiness: f64,
}

/// Structured result from the external scoring API.
///
/// This exact shape is consumed by downstream UI and must round-trip
/// unchanged through storage: unknown `insights` content is kept as raw JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringResult {
    pub total_score: f64,
    pub dimensions: ScoreDimensions,
    #[serde(default)]
    pub insights: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vault_categories_are_exactly_seven() {
        assert_eq!(VaultCategory::ALL.len(), 7);
        for cat in VaultCategory::ALL {
            assert_eq!(cat.as_str().parse::<VaultCategory>().unwrap(), cat);
        }
    }

    #[test]
    fn scoring_result_roundtrips_unchanged() {
        let raw = serde_json::json!({
            "total_score": 72.5,
            "dimensions": {
                "desirability": 80.0,
                "feasibility": 70.0,
                "viability": 65.0,
                "traction": 75.0,
                "readiness": 72.0
            },
            "insights": {
                "summary": "Strong demand signal",
                "flags": ["team", "pricing"]
            }
        });
        let parsed: ScoringResult = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(parsed.total_score, 72.5);
        assert_eq!(parsed.insights["flags"][1], "pricing");
        let back = serde_json::to_value(&parsed).unwrap();
        assert_eq!(back, raw);
    }

    #[test]
    fn folder_structure_serializes_by_category_key() {
        let mut folders = FolderStructure::new();
        folders.insert(VaultCategory::Overview, "f-123".into());
        let json = serde_json::to_value(&folders).unwrap();
        assert_eq!(json["overview"], "f-123");
    }
}
