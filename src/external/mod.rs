//! External collaborators: vault storage, pitch-deck scoring, notifications.

pub mod notify;
pub mod scoring;
pub mod storage;

pub use notify::{NotificationEvent, Notifier};
pub use scoring::{HttpScoringClient, ScoringClient};
pub use storage::{DisabledVaultStorage, HttpVaultStorage, MirroredFile, ProvisionedFolder, VaultStorage};
