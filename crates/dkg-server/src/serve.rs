use super::{config::Config, routes, ServerResult};
use dkg_core::{Engine, Orchestrator};
use std::{future::Future, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. `RUST_LOG` wins over `verbose`.
pub fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // a subscriber may already be installed, e.g. by tests
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Binds the configured address and serves until SIGINT or SIGTERM
pub async fn run(config: Config, engine: Arc<dyn Engine>) -> ServerResult<()> {
    let listener = TcpListener::bind(config.server.addr()).await?;
    serve(listener, config, engine, shutdown_signal()).await
}

/// Serves on `listener` until `shutdown` resolves. In-flight requests are
/// completed before returning.
pub async fn serve<F>(
    listener: TcpListener,
    config: Config,
    engine: Arc<dyn Engine>,
    shutdown: F,
) -> ServerResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let orchestrator = Arc::new(Orchestrator::new(engine, config.protocol.clone()));
    let app = routes::app(orchestrator, &config.server);

    tracing::info!(
        addr = %listener.local_addr()?,
        public_key_len = config.protocol.public_key_len,
        engine_timeout_secs = config.protocol.engine_timeout_secs,
        "listening"
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    tracing::info!("server stopped");

    Ok(())
}

async fn shutdown_signal() {
    let interrupt = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(%err, "cannot listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(%err, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = interrupt => tracing::info!("got SIGINT, exiting"),
        _ = terminate => tracing::info!("got SIGTERM, exiting"),
    }
}
