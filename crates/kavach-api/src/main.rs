//! # kavach-api — Binary Entry Point
//!
//! Starts the Axum HTTP server. Startup fails fast on a missing or
//! malformed encryption key; the database and verification provider are
//! optional and degrade to in-memory mode and an always-rejecting
//! verifier respectively.

use std::sync::Arc;

use kavach_api::config::AppConfig;
use kavach_api::state::AppState;
use kavach_api::storage::InMemoryObjectStore;
use kavach_api::verifier::{DocumentVerifier, HttpVerifier, StaticVerifier};
use kavach_crypto::{EnvKeyProvider, FieldCipher};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env().map_err(|e| {
        tracing::error!("configuration error: {e}");
        e
    })?;

    // The config load already verified the key is present and well-formed.
    let key_provider = EnvKeyProvider::from_env("KAVACH_ENCRYPTION_KEY")?;
    let cipher = FieldCipher::new(Arc::new(key_provider));

    // Database pool (optional — absent means in-memory only).
    let db_pool = kavach_api::db::init_pool().await.map_err(|e| {
        tracing::error!("database initialization failed: {e}");
        e
    })?;

    // Verification provider. Without one configured, every pending
    // document stays PENDING until an admin records a manual verdict.
    let verifier: Arc<dyn DocumentVerifier> =
        match (&config.provider_url, &config.provider_api_key) {
            (Some(url), Some(key)) => {
                tracing::info!(provider = %url, "verification provider configured");
                Arc::new(HttpVerifier::new(url.clone(), key.clone()))
            }
            _ => {
                tracing::warn!(
                    "no verification provider configured; provider verdicts will be REJECTED \
                     and documents require manual admin review"
                );
                Arc::new(StaticVerifier::rejected())
            }
        };

    let object_store = Arc::new(InMemoryObjectStore::new(&config.bucket));
    let listen_addr = config.listen_addr.clone();

    let state = AppState::new(config, cipher, object_store, verifier, db_pool);

    // Rehydrate in-memory stores from the database.
    if let Some(pool) = state.db_pool.clone() {
        let documents = kavach_api::db::documents::load_all(&pool).await?;
        let professions = kavach_api::db::professions::load_all(&pool).await?;
        tracing::info!(
            documents = documents.len(),
            professions = professions.len(),
            "rehydrated stores from database"
        );
        for doc in documents {
            state.documents.insert(doc.id, doc);
        }
        for profile in professions {
            state.professions.insert(profile.user_id.clone(), profile);
        }
    }

    let app = kavach_api::app(state);

    tracing::info!("kavach API listening on {listen_addr}");
    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
