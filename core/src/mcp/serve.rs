use crate::mcp::server::{FailureMode, WeatherServer};
use anyhow::{Context, Result};
use rmcp::ServiceExt;
use rmcp::transport::sse_server::{SseServer, SseServerConfig};
use rmcp::transport::streamable_http_server::session::local::LocalSessionManager;
use rmcp::transport::streamable_http_server::{StreamableHttpServerConfig, StreamableHttpService};
use std::net::SocketAddr;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub const DEFAULT_SSE_PORT: u16 = 8000;
pub const DEFAULT_HTTP_PORT: u16 = 3000;

/// Serves MCP over this process's stdin/stdout until the client hangs up.
pub async fn serve_stdio(server: WeatherServer) -> Result<()> {
    info!("starting weather server on stdio");
    let service = server
        .with_failure_mode(FailureMode::Inline)
        .serve(rmcp::transport::stdio())
        .await
        .map_err(|e| anyhow::anyhow!("failed to start stdio server: {e}"))?;
    let reason = service.waiting().await?;
    info!(?reason, "stdio server stopped");
    Ok(())
}

/// `GET /sse` for the event stream, `POST /message` for client requests.
pub async fn serve_sse(server: WeatherServer, addr: SocketAddr) -> Result<()> {
    let ct = CancellationToken::new();
    let config = SseServerConfig {
        bind: addr,
        sse_path: "/sse".to_string(),
        post_path: "/message".to_string(),
        ct: ct.clone(),
        sse_keep_alive: None,
    };
    let sse = SseServer::serve_with_config(config)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    let server = server.with_failure_mode(FailureMode::Inline);
    let service_ct = sse.with_service(move || server.clone());
    info!("weather server ready: GET http://{addr}/sse, POST http://{addr}/message");

    shutdown_signal().await;
    service_ct.cancel();
    ct.cancel();
    info!("Shutdown complete");
    Ok(())
}

/// Stateless streamable HTTP mounted at `/mcp`.
pub async fn serve_streamable_http(server: WeatherServer, addr: SocketAddr) -> Result<()> {
    let server = server.with_failure_mode(FailureMode::Raise);
    let service = StreamableHttpService::new(
        move || Ok(server.clone()),
        LocalSessionManager::default().into(),
        StreamableHttpServerConfig {
            stateful_mode: false,
            ..Default::default()
        },
    );
    let app = axum::Router::new().nest_service("/mcp", service);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;
    info!("weather server ready: POST http://{addr}/mcp");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutdown complete");
    Ok(())
}

pub async fn shutdown_signal() {
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received SIGINT, shutting down...");
        }
        _ = terminate() => {
            info!("Received SIGTERM, shutting down...");
        }
    }
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{SignalKind, signal};
    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            warn!("failed to install SIGTERM handler: {e}");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}
