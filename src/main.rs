use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use todo_assist::config::AppConfig;
use todo_assist::digest::{MailRelay, SmtpRelay};
use todo_assist::llm::create_provider;
use todo_assist::prioritize::Prioritizer;
use todo_assist::store::{Database, LibSqlBackend};
use todo_assist::todos::{AppState, todo_routes};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    let config = AppConfig::from_env().context("Invalid configuration")?;

    // Keep the guard alive so buffered log lines are flushed on exit.
    let _log_guard = init_tracing(&config);

    eprintln!("📝 Todo Assist v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {}", config.llm.model);
    eprintln!("   API: http://0.0.0.0:{}/todos", config.port);
    eprintln!("   Database: {}", config.db_path.display());

    // ── LLM ─────────────────────────────────────────────────────────────
    let llm = create_provider(&config.llm)?;

    // ── Database ────────────────────────────────────────────────────────
    let db: Arc<dyn Database> = Arc::new(
        LibSqlBackend::new_local(&config.db_path)
            .await
            .with_context(|| format!("Failed to open database at {}", config.db_path.display()))?,
    );

    // ── Mail ────────────────────────────────────────────────────────────
    let mailer: Option<Arc<dyn MailRelay>> = match &config.mail {
        Some(mail) => {
            let relay: Arc<dyn MailRelay> =
                Arc::new(SmtpRelay::new(mail).context("Invalid SMTP configuration")?);
            eprintln!("   Mail relay: {}:{}", mail.smtp_host, mail.smtp_port);
            Some(relay)
        }
        None => {
            tracing::warn!("SMTP_HOST not set, digest emails are disabled");
            None
        }
    };

    // ── HTTP ────────────────────────────────────────────────────────────
    let prioritizer = Arc::new(Prioritizer::new(
        Arc::clone(&db),
        llm,
        config.classifier.clone(),
    ));
    let app = todo_routes(AppState {
        db,
        prioritizer,
        mailer,
    });

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Stderr logging filtered by `RUST_LOG`, plus a daily file when a log dir is configured.
fn init_tracing(config: &AppConfig) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "todo-assist.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(file_layer)
        .init();

    guard
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for shutdown signal"),
    }
}
