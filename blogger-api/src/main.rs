use crate::server::{
    ServerState,
    blobs::{BlobError, FsBlobStore},
    settings::Settings,
};
use blogger_common::{
    listing::PageBound,
    snowflake::{ProcessId, WorkerId},
    util::PositiveDuration,
};
use blogger_db::{DbClient, DbError, MemoryStore, Store};
use serde::Deserialize;
use std::{
    net::{IpAddr, SocketAddr},
    path::PathBuf,
    sync::Arc,
};
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

mod server;

#[derive(Debug, Error)]
enum InitError {
    #[error("Error parsing .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),
    #[error("Error parsing environment: {0}")]
    Envy(#[from] envy::Error),
    #[error("Error setting up the database: {0}")]
    Database(#[from] DbError),
    #[error("PUBLIC_URL is not an absolute url: {0}")]
    PublicUrl(#[from] url::ParseError),
    #[error("Error setting up blob storage: {0}")]
    Blob(#[from] BlobError),
    #[error("Error binding tcp listener: {0}")]
    TcpBind(std::io::Error),
    #[error("Error serving server: {0}")]
    TcpServe(std::io::Error),
}

#[derive(Clone, Eq, PartialEq, Debug, Deserialize)]
struct Env {
    server_address: IpAddr,
    server_port: u16,
    database_url: Option<String>,
    #[serde(default = "default_public_url")]
    public_url: String,
    #[serde(default = "default_blob_dir")]
    blob_dir: PathBuf,
    #[serde(default)]
    page_bound: PageBound,
    session_ttl_seconds: Option<u64>,
    #[serde(default)]
    worker_id: WorkerId,
    #[serde(default)]
    process_id: ProcessId,
}

fn default_public_url() -> String {
    "http://localhost:8080/".to_owned()
}

fn default_blob_dir() -> PathBuf {
    PathBuf::from("blobs")
}

fn install_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "blogger_api=debug,\
                blogger_common=debug,\
                blogger_db=debug,\
                tower_http=debug,axum::rejection=trace,sqlx=warn"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn get_env() -> Result<Env, InitError> {
    if let Err(e) = dotenvy::dotenv() {
        if e.not_found() {
            debug!("No .dotenv file found");
        } else {
            return Err(e.into());
        }
    }

    envy::from_env().map_err(InitError::from)
}

async fn connect_store(env: &Env) -> Result<Arc<dyn Store>, InitError> {
    match &env.database_url {
        Some(database_url) => {
            let client = DbClient::connect(database_url, env.worker_id, env.process_id).await?;
            info!("Connected to database");
            Ok(Arc::new(client))
        }
        None => {
            warn!("DATABASE_URL is not set, keeping all data in memory");
            Ok(Arc::new(MemoryStore::new(env.worker_id, env.process_id)))
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(%err, "Could not listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(%err, "Could not listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutting down");
}

#[tokio::main]
async fn main() -> Result<(), InitError> {
    install_tracing();
    let env = get_env()?;

    let settings = Settings::new(
        Url::parse(&env.public_url)?,
        env.page_bound,
        env.session_ttl_seconds.and_then(PositiveDuration::from_seconds),
    );
    let store = connect_store(&env).await?;
    let blobs = FsBlobStore::new(env.blob_dir.clone(), &settings.public_url).await?;

    let state = ServerState {
        store,
        blobs: Arc::new(blobs),
        settings: Arc::new(settings),
    };

    let tracing_layer = TraceLayer::new_for_http();
    let app = server::app(state, &env.blob_dir).layer(tracing_layer);

    let server_address = SocketAddr::new(env.server_address, env.server_port);
    let listener = tokio::net::TcpListener::bind(server_address)
        .await
        .map_err(InitError::TcpBind)?;
    info!(%server_address, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(InitError::TcpServe)?;

    Ok(())
}
