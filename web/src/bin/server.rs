//! SoulPass HTTP server.
//!
//! Booking ledger and admission engine for limited-inventory event passes.

use anyhow::Context;
use soulpass_core::environment::LedgerEnvironment;
use soulpass_core::payload::PayloadSealer;
use soulpass_runtime::{AdmissionController, MetricsExporter};
use soulpass_web::config::DEV_TICKET_SECRET;
use soulpass_web::{AppState, ChatIdentityClient, Config, build_router};
use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::Notify;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("invalid configuration")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    format!("{},soulpass=debug,tower_http=info", config.server.log_level).into()
                }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting SoulPass server");
    info!(
        bind = %config.bind_address(),
        box_unit = config.ledger.box_unit,
        hold_minutes = config.ledger.hold_minutes,
        identity_enabled = config.identity.api_key.is_some(),
        "Configuration loaded"
    );
    if config.ledger.ticket_secret == DEV_TICKET_SECRET {
        warn!("SOULPASS_TICKET_SECRET not set, ticket payloads are sealed with the development secret");
    }
    if config.ledger.admin_token.is_none() {
        warn!("SOULPASS_ADMIN_TOKEN not set, admin routes will refuse every call");
    }

    let exporter = MetricsExporter::install().context("failed to install metrics recorder")?;

    let env = LedgerEnvironment::production(
        config.admission_policy(),
        PayloadSealer::new(&config.ledger.ticket_secret),
    );
    let mut controller = AdmissionController::new(config.pass_classes(), env);
    if let Some(client) = ChatIdentityClient::from_config(&config.identity) {
        info!(model = %config.identity.model, "Identity generation enabled");
        controller = controller.with_identity_provider(Arc::new(client));
    }

    let state = AppState::new(controller, config.ledger.admin_token.clone()).with_metrics(exporter);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_address())
        .await
        .with_context(|| format!("failed to bind {}", config.bind_address()))?;
    info!("Server listening on {}", config.bind_address());

    let shutdown = Arc::new(Notify::new());
    let mut server = tokio::spawn({
        let shutdown = Arc::clone(&shutdown);
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.notified().await })
            .into_future()
    });

    tokio::select! {
        joined = &mut server => {
            joined.context("server task panicked")?.context("server failed")?;
            return Ok(());
        }
        () = shutdown_signal() => {}
    }

    shutdown.notify_one();
    let grace = Duration::from_secs(config.server.shutdown_timeout);
    match tokio::time::timeout(grace, server).await {
        Ok(joined) => joined.context("server task panicked")?.context("server failed")?,
        Err(_) => warn!(timeout_secs = grace.as_secs(), "Graceful shutdown timed out"),
    }

    info!("Server stopped");
    Ok(())
}

/// Graceful shutdown signal handler.
///
/// Waits for:
/// - Ctrl+C (SIGINT)
/// - SIGTERM (in production environments)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C signal, shutting down gracefully...");
        },
        () = terminate => {
            info!("Received SIGTERM signal, shutting down gracefully...");
        },
    }
}
