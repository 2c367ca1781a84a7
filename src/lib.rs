//! ProofHub — founder onboarding and venture-validation platform core.

pub mod coach;
pub mod config;
pub mod error;
pub mod external;
pub mod onboarding;
pub mod store;
