//! Founder onboarding: the linear wizard that takes a founder from first
//! contact through venture setup, team entry, deck upload and scoring.

pub mod manager;
pub mod model;
pub mod routes;
pub mod session;
pub mod validate;

pub use manager::OnboardingManager;
pub use routes::{OnboardingRouteState, onboarding_routes};
pub use session::{OnboardingSession, OnboardingStep};
