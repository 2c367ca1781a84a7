use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::cors::CorsLayer;

use proofhub::coach::{CoachManager, CoachRouteState, coach_routes};
use proofhub::config::PlatformConfig;
use proofhub::external::{
    DisabledVaultStorage, HttpScoringClient, HttpVaultStorage, Notifier, ScoringClient,
    VaultStorage,
};
use proofhub::onboarding::{OnboardingManager, OnboardingRouteState, onboarding_routes};
use proofhub::store::{Database, LibSqlBackend};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = PlatformConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        eprintln!("  export PROOFHUB_SCORING_URL=https://scoring.example.com");
        eprintln!("  export PROOFHUB_SCORING_API_KEY=...");
        std::process::exit(1);
    });

    eprintln!("ProofHub v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   API: http://0.0.0.0:{}/api", config.listen_port);
    eprintln!("   Database: {}", config.db_path);
    eprintln!("   Uploads: {}", config.upload_dir.display());

    // ── Database ─────────────────────────────────────────────────────────
    let db_path = std::path::Path::new(&config.db_path);
    let db: Arc<dyn Database> = Arc::new(LibSqlBackend::new_local(db_path).await.unwrap_or_else(
        |e| {
            eprintln!("Error: Failed to open database at {}: {}", config.db_path, e);
            std::process::exit(1);
        },
    ));

    // ── External collaborators ──────────────────────────────────────────
    let vault: Arc<dyn VaultStorage> = match config.vault.clone() {
        Some(vault_config) => Arc::new(HttpVaultStorage::new(vault_config)),
        None => {
            eprintln!("   Vault storage: disabled (PROOFHUB_VAULT_URL not set)");
            Arc::new(DisabledVaultStorage)
        }
    };
    let scoring: Arc<dyn ScoringClient> = Arc::new(HttpScoringClient::new(config.scoring.clone()));
    let notifier = Arc::new(Notifier::new(config.notify_webhook.clone()));

    // ── Managers ────────────────────────────────────────────────────────
    let onboarding = Arc::new(OnboardingManager::new(
        Arc::clone(&db),
        vault,
        scoring,
        notifier,
        config.upload_dir.clone(),
    ));
    let coach = Arc::new(CoachManager::new(
        Arc::clone(&db),
        config.progress_cache_ttl,
    ));

    // ── HTTP server ─────────────────────────────────────────────────────
    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .merge(onboarding_routes(OnboardingRouteState {
            manager: onboarding,
        }))
        .merge(coach_routes(CoachRouteState { manager: coach }))
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.listen_port))
        .await
        .unwrap_or_else(|e| {
            eprintln!("Error: Failed to bind port {}: {}", config.listen_port, e);
            std::process::exit(1);
        });
    tracing::info!(port = config.listen_port, "ProofHub API server started");
    axum::serve(listener, app).await?;

    Ok(())
}
