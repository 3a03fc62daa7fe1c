use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use blockbuilder::db::{self, queries};
use blockbuilder::handlers;
use blockbuilder::models::{CreateLicenseBody, LicenseSource, LicenseType};
use blockbuilder::{AppState, Config};

#[derive(Parser)]
#[command(name = "blockbuilder", about = "Block Builder license server")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API server (default)
    Serve,
    /// Create or update the database schema and exit
    Migrate,
    /// Issue a license from the command line (source = manual)
    CreateLicense {
        #[arg(long)]
        email: String,
        #[arg(long)]
        domain: String,
        /// FREE or PRO
        #[arg(long, default_value = "PRO")]
        r#type: String,
        /// Expiry as a unix timestamp (omit for perpetual)
        #[arg(long)]
        expires_at: Option<i64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Migrate => migrate(&config),
        Command::CreateLicense {
            email,
            domain,
            r#type,
            expires_at,
        } => create_license(&config, email, domain, &r#type, expires_at),
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let pool = db::init_pool(&config.database_path)?;
    let conn = pool.get()?;
    db::run_migrations(&conn)?;
    drop(conn);

    let addr = config.addr();
    let state = AppState {
        db: pool,
        config: Arc::new(config),
    };

    let app = handlers::router_with_rate_limits(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("listening on {addr}");

    // The rate limiter keys on the peer address, so connect info is required.
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

fn migrate(config: &Config) -> anyhow::Result<()> {
    let pool = db::init_pool(&config.database_path)?;
    let conn = pool.get()?;
    db::run_migrations(&conn)?;
    tracing::info!("migrations applied to {}", config.database_path);
    Ok(())
}

fn create_license(
    config: &Config,
    email: String,
    domain: String,
    type_str: &str,
    expires_at: Option<i64>,
) -> anyhow::Result<()> {
    let license_type: LicenseType = type_str
        .parse()
        .map_err(|_| anyhow::anyhow!("license type must be FREE or PRO, got {type_str:?}"))?;

    let pool = db::init_pool(&config.database_path)?;
    let conn = pool.get()?;
    db::run_migrations(&conn)?;

    let input = handlers::build_new_license(
        CreateLicenseBody {
            email,
            license_type,
            domain,
            custom_key: None,
            expires_at,
            metadata: None,
        },
        &config.license_key_prefix,
        LicenseSource::Manual,
        queries::now(),
    )?;

    let license = queries::create_license(&conn, &input)?;
    println!("{}", license.key);
    Ok(())
}
