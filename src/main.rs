use engagement_tracker::{
    router, AppState, Backend, Config, DataService, LocalService, MetricsFetchers,
    SupabaseService, Tracker,
};
use reqwest::Client;
use std::{net::SocketAddr, sync::Arc};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = Config::from_env()?;
    let client = Client::builder().timeout(config.http_timeout).build()?;

    let service: Arc<dyn DataService> = match config.backend {
        Backend::Local => {
            info!("using local data store at {}", config.data_path.display());
            Arc::new(LocalService::open(config.data_path.clone()).await)
        }
        Backend::Supabase => {
            let url = config.supabase_url.as_deref().unwrap_or_default();
            let key = config.supabase_anon_key.as_deref().unwrap_or_default();
            info!("using supabase project at {url}");
            Arc::new(SupabaseService::new(client.clone(), url, key))
        }
    };
    let fetchers = MetricsFetchers::http(
        client,
        &config.youtube_api_base,
        &config.linkedin_api_base,
    );

    let mut tracker = Tracker::new(service, fetchers);
    if tracker.bootstrap().await {
        info!("signed in from stored session");
    } else {
        info!("no session, showing login");
    }

    let app = router(AppState::new(tracker));
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("could not listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
