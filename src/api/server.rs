use std::net::SocketAddr;

use axum::Router;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::errors::PingDbError;

/// Serve `router` on `bind_address` until CTRL+C.
pub async fn start_api_server(bind_address: &str, router: Router) -> crate::Result<()> {
    let addr: SocketAddr = bind_address
        .parse()
        .map_err(|e| PingDbError::config(format!("Invalid bind address '{}': {}", bind_address, e)))?;

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| PingDbError::transport(format!("Failed to bind HTTP trigger: {}", e)))?;

    info!(address = %addr, "Starting HTTP trigger");
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "HTTP trigger shutdown listener failed");
            }
        })
        .await
        .map_err(|e| PingDbError::transport(format!("HTTP trigger error: {}", e)))?;

    info!("HTTP trigger shutdown completed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rejects_invalid_bind_address() {
        let err = start_api_server("not an address", Router::new()).await.unwrap_err();
        assert!(matches!(err, PingDbError::Config { .. }));
    }
}
