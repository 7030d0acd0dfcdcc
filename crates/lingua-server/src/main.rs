mod config;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use lingua_api::state::{AppState, AppStateInner};
use lingua_api::store::SqliteStore;
use lingua_messaging::{
    AutoTranslator, MessageComposer, RoomLanguageLimiter, SealedEnvelopeEncryptor, WordListModerator,
};
use lingua_translate::TranslationEngine;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lingua=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;
    info!("Translation providers: {:?}", config.providers);

    // Init database
    let db = Arc::new(lingua_db::Database::open(&PathBuf::from(&config.db_path))?);
    let store = Arc::new(SqliteStore::new(db));

    let engine = TranslationEngine::new(&config.providers, config.engine.clone())?;
    if !engine.is_configured() {
        warn!("No translation credentials set; messages will be stored untranslated");
    }

    let composer = MessageComposer::new(
        store.clone(),
        store.clone(),
        Arc::new(WordListModerator::default()),
        Arc::new(SealedEnvelopeEncryptor),
        engine.clone(),
    );
    let limiter = RoomLanguageLimiter::per_minute(config.room_limit_per_minute, config.lang_limit_per_minute);
    let auto_translator = AutoTranslator::new(engine, store.clone(), store, Arc::new(limiter));

    let state: AppState = Arc::new(AppStateInner {
        composer,
        auto_translator,
        jwt_secret: config.jwt_secret.clone(),
    });

    let app = lingua_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Lingua server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
