use std::sync::Arc;

use courier::api::{AppState, build_router};
use courier::config::AppConfig;
use courier::dispatch::Dispatcher;
use courier::senders::{EmailSender, Fast2SmsSender, SenderRegistry, WhatsAppSender};
use courier::store::{LibSqlBackend, Store};
use courier::templates::{GraphCatalogClient, TemplateSyncEngine};
use courier::webhooks::InboundRouter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AppConfig::from_env();

    eprintln!("📮 Courier v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   API: http://0.0.0.0:{}/messages", config.port);
    eprintln!("   Webhooks: /webhooks/sms, /webhooks/whatsapp");
    eprintln!("   Database: {}", config.db_path);
    eprintln!(
        "   WhatsApp verify token: {}\n",
        if config.whatsapp_verify_token.is_some() {
            "set"
        } else {
            "not set (GET /webhooks/whatsapp will reject)"
        }
    );

    let db_path = std::path::Path::new(&config.db_path);
    let store: Arc<dyn Store> = Arc::new(LibSqlBackend::new_local(db_path).await?);

    let mut senders = SenderRegistry::new();
    senders.register(Arc::new(EmailSender::new(
        Arc::clone(&store),
        config.send_timeout,
    )));
    senders.register(Arc::new(Fast2SmsSender::new(
        Arc::clone(&store),
        config.send_timeout,
    )));
    senders.register(Arc::new(WhatsAppSender::new(
        Arc::clone(&store),
        config.graph_api_base.clone(),
        config.graph_api_version.clone(),
        config.send_timeout,
    )));

    let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&store), senders));
    let inbound = Arc::new(InboundRouter::new(Arc::clone(&store)));
    let catalog = Arc::new(GraphCatalogClient::new(
        config.graph_api_base.clone(),
        config.graph_api_version.clone(),
        config.send_timeout,
    ));
    let sync = Arc::new(TemplateSyncEngine::new(Arc::clone(&store), catalog));

    let app = build_router(AppState {
        store,
        dispatcher,
        inbound,
        sync,
        config: config.clone(),
    });

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    tracing::info!(port = config.port, "Courier HTTP server started");
    axum::serve(listener, app).await?;

    Ok(())
}
