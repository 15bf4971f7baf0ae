use std::sync::Arc;

use domain::contact::ContactStore;
use domain::gateway::hubspot::HubSpotClient;
use log::*;
use service::config::Config;
use tokio::net::TcpListener;
use webhook_auth::webhook::{HmacSha1WebhookValidator, WebhookValidator};

pub use error::{Error, Result};

mod controller;
mod error;
pub mod router;

/// Provider id used for the Intercom signature validator in log lines.
const INTERCOM_PROVIDER_ID: &str = "intercom";

/// Per-process state handed to every handler. Built once at startup and never mutated,
/// so cloning it per request only bumps reference counts.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub contact_store: Arc<dyn ContactStore>,
    pub validator: Arc<dyn WebhookValidator>,
}

impl AppState {
    pub fn new(
        config: Config,
        contact_store: Arc<dyn ContactStore>,
        validator: Arc<dyn WebhookValidator>,
    ) -> Self {
        Self {
            config,
            contact_store,
            validator,
        }
    }

    /// Wire the HubSpot client and the Intercom HMAC-SHA1 validator from `config`.
    pub fn from_config(config: Config) -> Result<Self> {
        let contact_store = Arc::new(HubSpotClient::new(&config)?);
        let validator = Arc::new(HmacSha1WebhookValidator::new(
            INTERCOM_PROVIDER_ID.to_string(),
            config.intercom_client_secret().to_string(),
            config.signature_header().to_string(),
        ));

        Ok(Self::new(config, contact_store, validator))
    }
}

pub async fn init_server(app_state: AppState) -> std::io::Result<()> {
    let interface = app_state
        .config
        .interface
        .clone()
        .unwrap_or_else(|| "0.0.0.0".to_string());
    let host = format!("{}:{}", interface, app_state.config.port);

    if app_state.config.skip_signature_verification {
        warn!(
            "Webhook signature verification is DISABLED ({} environment). \
             Every delivery will be accepted unverified.",
            app_state.config.runtime_env()
        );
    }

    let listener = TcpListener::bind(&host).await?;
    info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, router::define_routes(app_state)).await
}
