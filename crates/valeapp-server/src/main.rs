#![forbid(unsafe_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use valeapp_auth::AuthConfig;
use valeapp_geo::{DisabledGeoLookup, GeoEndpoints, GeoLookup, HttpGeoLookup};
use valeapp_server::{build_router, AppState, ServerConfig};
use valeapp_store::{open_store, StoreConfig};

fn env_bool(name: &str, default: bool) -> bool {
    valeapp_core::env_non_empty(name)
        .and_then(|v| match v.as_str() {
            "1" | "true" | "TRUE" | "yes" | "YES" => Some(true),
            "0" | "false" | "FALSE" | "no" | "NO" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if env_bool(valeapp_core::ENV_VALEAPP_LOG_JSON, false) {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => {}
                    _ = sigint.recv() => {}
                }
            }
            _ => {
                warn!("signal handlers unavailable; falling back to ctrl-c");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

#[tokio::main]
async fn main() -> Result<(), String> {
    init_tracing();

    let config = ServerConfig::from_env()?;
    // Missing hosted-store credentials stop startup here.
    let store_config = StoreConfig::from_env().map_err(|e| e.message)?;
    let store = open_store(&store_config).map_err(|e| format!("open store failed: {e}"))?;
    if let Err(e) = store.ping().await {
        error!(error = %e, "store unreachable at startup; readiness will report it");
    }

    let geo: Arc<dyn GeoLookup> = if config.geo_enabled {
        Arc::new(HttpGeoLookup::new(GeoEndpoints::from_env()).map_err(|e| e.to_string())?)
    } else {
        info!("outbound geolocation disabled");
        Arc::new(DisabledGeoLookup)
    };

    let bind = config.bind.clone();
    let state = AppState::new(store, geo, AuthConfig::from_env(), config);
    let app = build_router(state);

    let listener = TcpListener::bind(&bind)
        .await
        .map_err(|e| format!("bind {bind} failed: {e}"))?;
    info!(bind = %bind, backend = store_config.backend_tag(), "valeapp-server listening");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(wait_for_shutdown_signal())
    .await
    .map_err(|e| format!("server failed: {e}"))
}
