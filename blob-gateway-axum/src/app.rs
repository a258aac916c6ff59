use axum::routing::get;
use axum::Router;
use tokio::net::{TcpListener, ToSocketAddrs};
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::routes;
use crate::GatewayState;

#[derive(Clone)]
pub struct GatewayApp {
    pub state: GatewayState,
    pub router: Router<()>,
}

impl GatewayApp {
    pub fn new(state: GatewayState) -> Self {
        let router = Router::new()
            .nest("/blob", routes::blob_router(state.clone()))
            .route("/health", get(|| async { "ok" }))
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id()),
            );

        Self { state, router }
    }

    /// Serve until ctrl-c. Batches still running at shutdown report their
    /// undispatched keys as CANCELLED before the server exits.
    pub async fn listen<A>(self, addr: A) -> anyhow::Result<()>
    where
        A: ToSocketAddrs,
    {
        let listener = TcpListener::bind(addr).await?;
        let shutdown = self.state.shutdown.clone();
        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::warn!(error = %e, "failed to listen for ctrl-c");
                    std::future::pending::<()>().await;
                }
                tracing::info!("shutting down");
                shutdown.cancel();
            })
            .await?;
        Ok(())
    }
}
