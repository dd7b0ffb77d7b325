use crate::config::Config;
use crate::flow::VoiceFlow;
use crate::i18n::MessageCatalog;
use crate::mail::{Mailer, MailTransport, SendGridTransport};
use crate::twilio::{CallEventsClient, MetadataResolver, RestClient};
use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub struct AppStateInner {
    pub config: Arc<Config>,
    pub catalog: Arc<MessageCatalog>,
    pub flow: VoiceFlow,
    pub metadata: MetadataResolver,
    pub mailer: Mailer,
    pub token: CancellationToken,
}

pub type AppState = Arc<AppStateInner>;

pub struct AppStateBuilder {
    config: Option<Config>,
    events_client: Option<Box<dyn CallEventsClient>>,
    mail_transport: Option<Box<dyn MailTransport>>,
}

impl AppStateBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            events_client: None,
            mail_transport: None,
        }
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    pub fn events_client(mut self, client: Box<dyn CallEventsClient>) -> Self {
        self.events_client = Some(client);
        self
    }

    pub fn mail_transport(mut self, transport: Box<dyn MailTransport>) -> Self {
        self.mail_transport = Some(transport);
        self
    }

    pub fn build(self) -> Result<AppState> {
        let config = Arc::new(self.config.unwrap_or_default());

        // The one fatal startup step: without messages no webhook can
        // produce valid speech.
        let catalog = Arc::new(MessageCatalog::load(&config.default_lang)?);

        let events_client = match self.events_client {
            Some(client) => client,
            None => Box::new(RestClient::new(&config.twilio)?),
        };
        let mail_transport = match self.mail_transport {
            Some(transport) => transport,
            None => Box::new(SendGridTransport::new(
                &config.mail.api_base,
                &config.mail.sendgrid_api_key,
                config.mail.http_timeout,
            )?),
        };

        let flow = VoiceFlow::new(
            config.clone(),
            catalog.clone(),
            crate::handler::flow_routes(),
        );
        let metadata = MetadataResolver::new(events_client);
        let mailer = Mailer::new(config.clone(), catalog.clone(), mail_transport);

        Ok(Arc::new(AppStateInner {
            config,
            catalog,
            flow,
            metadata,
            mailer,
            token: CancellationToken::new(),
        }))
    }
}

pub async fn run(state: AppState) -> Result<()> {
    let token = state.token.clone();
    let app = crate::handler::router(state.clone());

    let addr: SocketAddr = state.config.http_addr.parse()?;
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind to {}: {}", addr, e);
            return Err(anyhow::anyhow!("Failed to bind to {}: {}", addr, e));
        }
    };

    select! {
        http_result = axum::serve(listener, app) => {
            match http_result {
                Ok(_) => info!("Server shut down gracefully"),
                Err(e) => {
                    tracing::error!("Server error: {}", e);
                    return Err(anyhow::anyhow!("Server error: {}", e));
                }
            }
        }
        _ = token.cancelled() => {
            info!("Application shutting down due to cancellation");
        }
    }
    Ok(())
}
