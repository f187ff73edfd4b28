//! Runs both gateways against one shared state

use anyhow::{Context, Result};
use axum::Router;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::ServerConfig;
use crate::icap::IcapGateway;
use crate::routes::create_router;
use crate::state::AppState;

/// Load the policy, bind both listeners and serve until `shutdown` is
/// cancelled. If either gateway fails, the other is stopped as well.
pub async fn run(config: ServerConfig, shutdown: CancellationToken) -> Result<()> {
    let state = AppState::from_config(&config).await?;
    info!(
        policy = %state.engine.policy_path().display(),
        "Policy loaded"
    );
    Gateways::bind(state, &config).await?.serve(shutdown).await
}

/// HTTP and ICAP listeners bound over one [`AppState`]
pub struct Gateways {
    http_listener: TcpListener,
    app: Router,
    icap: IcapGateway,
}

impl Gateways {
    pub async fn bind(state: AppState, config: &ServerConfig) -> Result<Self> {
        let http_listener = TcpListener::bind(&config.http.listen)
            .await
            .with_context(|| format!("Failed to bind HTTP listener on {}", config.http.listen))?;
        let icap = IcapGateway::bind(config.icap.clone(), state.clone()).await?;
        let app = create_router(state, &config.http);

        Ok(Self {
            http_listener,
            app,
            icap,
        })
    }

    pub fn http_addr(&self) -> Result<SocketAddr> {
        Ok(self.http_listener.local_addr()?)
    }

    pub fn icap_addr(&self) -> Result<SocketAddr> {
        self.icap.local_addr()
    }

    /// Serve until `shutdown` is cancelled or either gateway stops
    pub async fn serve(self, shutdown: CancellationToken) -> Result<()> {
        info!(addr = %self.http_addr()?, "HTTP gateway listening");

        let Self {
            http_listener,
            app,
            icap,
        } = self;

        let http_token = shutdown.clone();
        let http = async move {
            let result = axum::serve(http_listener, app)
                .with_graceful_shutdown(http_token.clone().cancelled_owned())
                .await
                .context("HTTP gateway failed");
            http_token.cancel();
            result
        };

        let icap_token = shutdown.clone();
        let icap = async move {
            let result = icap.serve(icap_token.clone()).await;
            icap_token.cancel();
            result
        };

        let (http_result, icap_result) = tokio::join!(http, icap);
        http_result?;
        icap_result?;

        info!("Gateways stopped");
        Ok(())
    }
}
