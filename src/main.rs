//! Frame Hub - Main Entry Point
//!
//! Starts the HTTP server hosting peer channels and federation ingress.

use actix_web::{web, App, HttpServer};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use frame_hub::api::{configure_routes, ApiState, AppState};
use frame_hub::config::Settings;
use frame_hub::federation::{BroadcastMedium, HttpBroadcast, NullBroadcast};
use frame_hub::metrics::{init_metrics, metrics_endpoint};
use frame_hub::{Hub, RosterNotifier};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging with RUST_LOG environment variable support
    // Default: info level for frame_hub, warn for everything else
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,frame_hub=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true))
        .init();

    // Load configuration
    let settings = Settings::load().unwrap_or_else(|e| {
        warn!("Failed to load config: {}, using defaults", e);
        Settings::default()
    });

    if settings.metrics.enabled {
        init_metrics();
    }

    // Pick the broadcast medium
    let medium: Arc<dyn BroadcastMedium> =
        if settings.federation.enabled && !settings.federation.peers.is_empty() {
            let broadcast = HttpBroadcast::new(
                settings.federation.peers.clone(),
                settings.federation.scope.clone(),
                settings.federation.request_timeout(),
            )?;
            info!(
                "Federation: scope '{}' with {} peer hub(s)",
                settings.federation.scope,
                broadcast.peers().len()
            );
            Arc::new(broadcast)
        } else {
            info!("Federation: disabled, running standalone");
            Arc::new(NullBroadcast)
        };

    let roster = RosterNotifier::new();
    let hub = Hub::new(medium, Arc::new(roster.clone()));

    info!(
        "Starting Frame Hub v{} ({}, id {})",
        env!("CARGO_PKG_VERSION"),
        settings.hub.name,
        hub.id()
    );

    hub.start();

    // Create application state for HTTP server
    let app_state = AppState::new(settings.hub.name.clone(), Arc::clone(&hub));
    let api_state = ApiState::new(
        Arc::clone(&hub),
        roster,
        settings.federation.scope.clone(),
        Duration::from_secs(settings.channels.keep_alive_sec.max(1)),
    );
    let metrics_enabled = settings.metrics.enabled;
    let metrics_path = settings.metrics.path.clone();

    // Start HTTP server
    let http_addr = format!("{}:{}", settings.server.host, settings.server.http_port);
    info!("Starting HTTP server on {}", http_addr);

    HttpServer::new(move || {
        let app = App::new()
            // Add shared state
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::Data::new(api_state.clone()))
            // Add middleware
            .wrap(TracingLogger::default())
            // Add routes
            .configure(configure_routes);

        if metrics_enabled {
            app.route(&metrics_path, web::get().to(metrics_endpoint))
        } else {
            app
        }
    })
    .workers(settings.server.workers)
    .bind(&http_addr)?
    .run()
    .await?;

    Ok(())
}
