use anyhow::Context;
use clap::Parser;
use linkshelf::{
    api,
    auth::AuthSettings,
    config::Config,
    llm::OpenRouterClient,
    logging,
    processing::{DiscoveryLimits, LibraryService},
    scraper::FirecrawlClient,
    store::Store,
};
use std::{path::PathBuf, sync::Arc};
use tokio::net::TcpListener;

#[derive(Parser)]
#[command(name = "linkshelf", about = "Save and organize web content")]
struct Cli {
    /// Port to listen on; overrides `SERVER_PORT`.
    #[arg(long)]
    port: Option<u16>,
    /// Log file path; overrides `LINKSHELF_LOG_FILE`.
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_tracing(cli.log_file.as_deref());

    let config = Config::load().context("Failed to load configuration")?;
    let store = Store::connect(&config.database_url)
        .await
        .context("Failed to open the item store")?;
    let extractor = FirecrawlClient::new(&config.scraper_url, &config.scraper_api_key)
        .context("Failed to build the extraction client")?;
    let model = OpenRouterClient::new(&config.llm_url, &config.llm_api_key, &config.llm_model)
        .context("Failed to build the language-model client")?;

    let service = LibraryService::new(
        store.clone(),
        Arc::new(extractor),
        Arc::new(model),
        DiscoveryLimits {
            search: config.search_result_limit,
            map: config.map_result_limit,
        },
    );
    let auth = AuthSettings {
        cookie_name: config.session_cookie_name.clone(),
        login_path: config.login_path.clone(),
    };
    let app = api::create_router(Arc::new(service), auth);

    let (listener, port) = bind_listener(cli.port.or(config.server_port))
        .await
        .context("Failed to bind listener")?;
    tracing::info!("Listening on http://0.0.0.0:{}", port);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    store.close().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

async fn bind_listener(port: Option<u16>) -> Result<(TcpListener, u16), std::io::Error> {
    use std::net::Ipv4Addr;

    if let Some(port) = port {
        return TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))
            .await
            .map(|listener| (listener, port));
    }

    const PORT_RANGE: std::ops::RangeInclusive<u16> = 4100..=4199;
    for port in PORT_RANGE {
        match TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).await {
            Ok(listener) => {
                tracing::debug!(port, "Bound server port");
                return Ok((listener, port));
            }
            Err(err) if err.kind() == std::io::ErrorKind::AddrInUse => {
                tracing::debug!(port, "Port already in use; trying next");
                continue;
            }
            Err(err) => return Err(err),
        }
    }

    Err(std::io::Error::new(
        std::io::ErrorKind::AddrNotAvailable,
        "No available port found in range 4100-4199",
    ))
}
