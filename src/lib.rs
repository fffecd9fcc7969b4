pub mod app;
pub mod auth;
pub mod compose;
pub mod config;
pub mod errors;
pub mod format;
pub mod graphql;
pub mod state;
pub mod tags;
pub mod timeline;

#[cfg(test)]
mod testing;

use crate::app::App;
use crate::timeline::engine::TimelineRow;

/// Headless entry point: restores the session, keeps the timeline polling and logs
/// every published snapshot until Ctrl-C.
pub fn run() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Load .env file if present (ignore error if not found)
    let _ = dotenvy::dotenv();

    let cfg = match config::load_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load config; using defaults");
            let mut cfg = config::AppConfig::default();
            cfg.apply_env_overrides();
            cfg
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!(error = %e, "Failed to start tokio runtime");
            return;
        }
    };

    runtime.block_on(async move {
        let app = match App::start(cfg) {
            Ok(app) => app,
            Err(e) => {
                tracing::error!(error = %e, "Failed to start moods client");
                return;
            }
        };
        if let Err(e) = app.bootstrap().await {
            tracing::warn!(error = %e, kind = ?e.kind(), "bootstrap incomplete");
        }

        let mut snapshots = app.timeline().subscribe();
        loop {
            tokio::select! {
                changed = snapshots.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let snap = snapshots.borrow_and_update().clone();
                    let entries = snap.rows.iter().filter(|r| matches!(r, TimelineRow::Entry { .. })).count();
                    tracing::info!(
                        status = ?snap.status,
                        entries,
                        has_next_page = snap.has_next_page,
                        polling = snap.polling,
                        error = snap.error.as_deref().unwrap_or(""),
                        "timeline updated"
                    );
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("shutting down");
                    break;
                }
            }
        }
        if let Err(e) = app.shutdown().await {
            tracing::debug!(error = %e, "timeline already stopped");
        }
    });
}
