use anyhow::Result;
use axum::Router;
use reva_connector::{
    AppConfig, ConnectorService, CredentialMode, routes, sdk::DavSdkFactory,
    services::registry, telemetry,
};
use std::{future::IntoFuture, io::ErrorKind, net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    print_welcome();

    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // --- Parse config ---
    let cfg = AppConfig::from_env_and_args()?;

    tracing::info!("Starting reva-connector with config: {:?}", cfg);
    if let Ok(host) = std::env::var("HOSTNAME") {
        tracing::info!("hostname: {}", host);
    }
    if cfg.credential_mode == CredentialMode::Configured && cfg.backend_user.is_empty() {
        tracing::warn!("No backend user configured; backend logins will most likely fail");
    }

    // --- Metrics recorder ---
    let metrics_handle = if cfg.metrics_enabled {
        match telemetry::install_recorder() {
            Ok(handle) => {
                tracing::info!("Prometheus metrics enabled (available at /metrics)");
                telemetry::spawn_upkeep(handle.clone(), telemetry::UPKEEP_INTERVAL);
                Some(handle)
            }
            Err(err) => {
                tracing::warn!("Failed to install Prometheus recorder: {}. Metrics disabled.", err);
                None
            }
        }
    } else {
        tracing::info!("Prometheus metrics disabled");
        None
    };

    // --- Announce to the service registry ---
    if let Some(endpoint) = cfg.registry_endpoint.as_deref() {
        let client = reqwest::Client::builder()
            .timeout(cfg.backend_timeout)
            .build()?;
        match registry::register_service(&client, endpoint, &cfg.service_name).await {
            Ok(()) => tracing::info!("Registered service at {}", endpoint),
            Err(err) => tracing::warn!("Service registration at {} failed: {:#}", endpoint, err),
        }
    }

    // --- Initialize core service ---
    let sdk = Arc::new(DavSdkFactory::new(cfg.backend_timeout));
    let mut service = ConnectorService::new(cfg.clone(), sdk);
    if let Some(handle) = metrics_handle {
        service = service.with_metrics(handle);
    }

    // --- Build router ---
    let app: Router = routes().with_state(service);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);

    // Requests still in flight are dropped on shutdown.
    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .into_future();
    tokio::select! {
        result = server => result?,
        _ = shutdown_signal() => tracing::info!("shutting down"),
    }

    Ok(())
}

fn print_welcome() {
    println!(
        "Sciebo RDS <-> Reva connector -- V{}",
        env!("CARGO_PKG_VERSION")
    );
    println!("------------------------------------------------------------");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::warn!("Failed to listen for SIGTERM: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
