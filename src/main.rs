use clap::{Parser, Subcommand};
use clinic_payments::application::committer::AppointmentCommitter;
use clinic_payments::application::payment_service::{self, PaymentService};
use clinic_payments::config::{BookingSettings, GatewayConfig, GatewaySettings};
use clinic_payments::crypto::envelope;
use clinic_payments::domain::ports::IdempotencyStoreBox;
use clinic_payments::infrastructure::booking_client::HttpAppointmentBooker;
use clinic_payments::infrastructure::in_memory::InMemoryIdempotencyStore;
#[cfg(feature = "storage-rocksdb")]
use clinic_payments::infrastructure::rocksdb::RocksDBStore;
use clinic_payments::interfaces::http::{self, handlers::InitiateRequest, handlers::InitiateResponse};
use miette::{IntoDiagnostic, Result};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server
    Serve {
        #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:3000")]
        bind: SocketAddr,

        /// Path to persistent database (optional). If provided, uses RocksDB.
        #[arg(long, env = "DB_PATH")]
        db_path: Option<PathBuf>,

        #[command(flatten)]
        gateway: GatewaySettings,

        #[command(flatten)]
        booking: BookingSettings,
    },
    /// Build and seal an order from a JSON file, print the envelope as JSON
    SealOrder {
        /// Order JSON, same shape as the initiate endpoint body
        order: PathBuf,

        #[command(flatten)]
        gateway: GatewaySettings,
    },
    /// Decrypt an envelope and print the XML document inside
    OpenEnvelope {
        #[arg(long)]
        env_key: String,

        #[arg(long)]
        data: String,

        #[command(flatten)]
        gateway: GatewaySettings,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            bind,
            db_path,
            gateway,
            booking,
        } => {
            let store = idempotency_store(db_path)?;
            let config = GatewayConfig::load(&gateway).into_diagnostic()?;

            let booker = HttpAppointmentBooker::new(
                booking.booking_api_url.as_str(),
                booking.booking_api_key.as_str(),
                booking.commit_timeout(),
            );
            let committer =
                AppointmentCommitter::new(store, Box::new(booker), booking.commit_timeout());
            let service = Arc::new(PaymentService::new(Arc::new(config), committer));

            let listener = tokio::net::TcpListener::bind(bind).await.into_diagnostic()?;
            info!(%bind, sandbox = gateway.sandbox, "listening");
            axum::serve(listener, http::router(service))
                .await
                .into_diagnostic()?;
        }
        Command::SealOrder { order, gateway } => {
            let config = GatewayConfig::load(&gateway).into_diagnostic()?;
            let body = std::fs::read_to_string(&order).into_diagnostic()?;
            let request: InitiateRequest = serde_json::from_str(&body).into_diagnostic()?;

            let params = request.into_params(&config).into_diagnostic()?;
            let sealed = payment_service::seal_order(&config, &params).into_diagnostic()?;

            let response = InitiateResponse::sealed(&params.order_id, sealed);
            println!("{}", serde_json::to_string_pretty(&response).into_diagnostic()?);
        }
        Command::OpenEnvelope {
            env_key,
            data,
            gateway,
        } => {
            let config = GatewayConfig::load(&gateway).into_diagnostic()?;
            let xml = envelope::open(&env_key, &data, &config.merchant_key).into_diagnostic()?;
            println!("{xml}");
        }
    }

    Ok(())
}

#[cfg(feature = "storage-rocksdb")]
fn idempotency_store(db_path: Option<PathBuf>) -> Result<IdempotencyStoreBox> {
    match db_path {
        Some(db_path) => {
            let store = RocksDBStore::open(&db_path).into_diagnostic()?;
            info!(path = %db_path.display(), "using RocksDB idempotency store");
            Ok(Box::new(store))
        }
        None => Ok(Box::new(InMemoryIdempotencyStore::new())),
    }
}

#[cfg(not(feature = "storage-rocksdb"))]
fn idempotency_store(db_path: Option<PathBuf>) -> Result<IdempotencyStoreBox> {
    if db_path.is_some() {
        tracing::warn!(
            "Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
        );
    }
    Ok(Box::new(InMemoryIdempotencyStore::new()))
}
