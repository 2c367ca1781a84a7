//! Venture coach: per-founder overlay state, the guided journey, and
//! progress aggregation.

pub mod journey;
pub mod manager;
pub mod progress;
pub mod routes;
pub mod state;

pub use manager::CoachManager;
pub use routes::{CoachRouteState, coach_routes};
pub use state::{CoachState, OverlayState};
