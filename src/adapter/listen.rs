//! Long-lived adapter: bind a socket and serve the app until shutdown.

use crate::app::App;
use crate::error::AppError;
use axum::ServiceExt;
use std::future::Future;
use tokio::net::TcpListener;

/// Bind `addr` and serve until Ctrl-C.
pub async fn serve(app: App, addr: &str) -> Result<(), AppError> {
    let listener = TcpListener::bind(addr).await?;
    serve_on(listener, app, shutdown_signal()).await
}

/// Serve on an already bound listener until `shutdown` resolves.
pub async fn serve_on<F>(listener: TcpListener, app: App, shutdown: F) -> Result<(), AppError>
where
    F: Future<Output = ()> + Send + 'static,
{
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown)
        .await?;
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("ctrl-c handler unavailable: {}", e);
        std::future::pending::<()>().await;
    }
}
