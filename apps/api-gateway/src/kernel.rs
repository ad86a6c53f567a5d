//! Composition root: opens the database, builds shared state, spawns the
//! reaper daemon, and serves the router.

use crate::config::Settings;
use crate::routes::build_router;
use crate::services::spawn_reaper;
use crate::state::AppState;
use catalog_infra_db::DatabaseClient;
use std::net::{IpAddr, SocketAddr};
use tracing::{error, info, instrument};

pub struct ApiGatewayKernel {
    pub listening_port: u16,
    pub application_state: AppState,
}

impl ApiGatewayKernel {
    #[instrument(skip(settings))]
    pub async fn ignite(settings: Settings) -> Self {
        let database_client = DatabaseClient::connect(&settings.database_url, settings.database_auth_token.clone())
            .await
            .expect("FATAL: database link collapse, ignition aborted");

        let listening_port = settings.listening_port;
        Self { listening_port, application_state: AppState::new(database_client, settings) }
    }

    pub async fn launch(self) {
        spawn_reaper(self.application_state.clone()).await;

        let router = build_router(self.application_state);
        let bind_address = SocketAddr::new("0.0.0.0".parse::<IpAddr>().unwrap(), self.listening_port);

        info!(address = %bind_address, "gateway listening");

        let listener = tokio::net::TcpListener::bind(bind_address)
            .await
            .expect("CRITICAL_FAULT: failed to bind network port");

        if let Err(error) = axum::serve(listener, router).await {
            error!(error = %error, "server runtime failure");
            std::process::exit(1);
        }
    }
}
