//! Documentation chatbot server entry point

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use docbot_agent::ChatbotAgent;
use docbot_config::{load_settings, Settings};
use docbot_llm::{LlmConfig, OpenAiBackend};
use docbot_rag::{EmbeddingConfig, OpenAiEmbedder, WeaviateConfig, WeaviateStore};
use docbot_server::{create_router, AppState};

/// Upper bound between idle-session sweeps
const SESSION_SWEEP_MAX: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Priority: env vars > config/{env} > config/default > defaults
    let env = std::env::var("DOCBOT_ENV").ok();
    let config = match load_settings(env.as_deref()) {
        Ok(settings) => {
            // Tracing not yet initialized
            eprintln!(
                "Loaded configuration from files (env: {})",
                env.as_deref().unwrap_or("default")
            );
            settings
        }
        Err(e) => {
            eprintln!("Warning: Failed to load config: {}. Using defaults.", e);
            Settings::default()
        }
    };

    init_tracing(&config);

    tracing::info!("Starting documentation chatbot v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        environment = ?config.environment,
        config_path = env.as_deref().unwrap_or("default"),
        "Configuration loaded"
    );

    let store = init_vector_store(&config).await?;
    let embedder = OpenAiEmbedder::new(EmbeddingConfig::from(&config.embedding))?;
    let llm = OpenAiBackend::new(LlmConfig::from(&config.llm))?;
    tracing::info!(
        embedding_model = %config.embedding.model,
        llm_model = %config.llm.model,
        "Model clients initialized"
    );

    let agent = Arc::new(ChatbotAgent::new(
        &config,
        Arc::new(store),
        Arc::new(embedder),
        Arc::new(llm),
    ));
    let eviction = start_session_eviction(agent.clone());
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let state = AppState::new(config, agent);

    let app = create_router(state);

    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(stop) = eviction {
        let _ = stop.send(true);
    }
    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Connect to the vector store, waiting for it to report ready
///
/// A store that never becomes ready is logged and kept; `/health` reports it.
async fn init_vector_store(config: &Settings) -> Result<WeaviateStore, docbot_rag::RagError> {
    let settings = &config.vector_store;
    let store = WeaviateStore::new(WeaviateConfig::from(settings))?;
    if let Err(e) = store
        .wait_until_ready(
            settings.connect_retries,
            Duration::from_secs(settings.connect_retry_delay_secs),
        )
        .await
    {
        tracing::error!(error = %e, "Vector store unavailable, starting degraded");
    }
    Ok(store)
}

/// Start a background task that periodically drops idle sessions
///
/// Returns a shutdown sender that stops the task, or `None` when eviction is
/// disabled by `memory.session_idle_secs = 0`.
fn start_session_eviction(agent: Arc<ChatbotAgent>) -> Option<watch::Sender<bool>> {
    let Some(max_idle) = agent.memory_config().session_idle() else {
        tracing::info!("Session eviction disabled");
        return None;
    };
    let period = (max_idle / 4).clamp(Duration::from_secs(1), SESSION_SWEEP_MAX);
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        let mut interval_timer = tokio::time::interval(period);
        interval_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval_timer.tick() => {
                    let evicted = agent.evict_idle_sessions();
                    if evicted > 0 {
                        tracing::info!(evicted, remaining = agent.active_sessions(), "Idle sessions evicted");
                    }
                }
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!("Session eviction task shutting down");
                        break;
                    }
                }
            }
        }
    });

    Some(shutdown_tx)
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}

fn init_tracing(config: &Settings) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &config.observability.log_level;
        format!("docbot={level},docbot_agent={level},docbot_rag={level},docbot_llm={level},docbot_server={level},tower_http=debug").into()
    });

    let subscriber = tracing_subscriber::registry().with(env_filter);
    let fmt_layer = if config.observability.log_json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };
    subscriber.with(fmt_layer).init();
}
