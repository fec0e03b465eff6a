use anyhow::{Context, Result};
use clap::Parser;
use std::env;

/// Fallback token secret for local development only.
pub const DEV_TOKEN_SECRET: &str = "change-me-dev-secret";

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub storage_dir: String,
    pub public_base_url: String,
    pub token_secret: String,
    pub require_owner: bool,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Image catalog API with object-store offload")]
pub struct Args {
    /// Host to bind to (overrides IMAGE_CATALOG_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides IMAGE_CATALOG_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Database URL (overrides IMAGE_CATALOG_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Directory where blobs are stored (overrides IMAGE_CATALOG_STORAGE_DIR)
    #[arg(long)]
    pub storage_dir: Option<String>,

    /// Public base URL blobs are served under (overrides IMAGE_CATALOG_PUBLIC_BASE_URL)
    #[arg(long)]
    pub public_base_url: Option<String>,

    /// Secret used to sign bearer tokens (overrides IMAGE_CATALOG_TOKEN_SECRET)
    #[arg(long)]
    pub token_secret: Option<String>,

    /// Reject uploads without an authenticated owner (overrides IMAGE_CATALOG_REQUIRE_OWNER)
    #[arg(long)]
    pub require_owner: bool,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        // Parse CLI once
        let args = Args::parse();

        // --- Environment fallback ---
        let env_host = env::var("IMAGE_CATALOG_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = match env::var("IMAGE_CATALOG_PORT") {
            Ok(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing IMAGE_CATALOG_PORT value `{}`", value))?,
            Err(env::VarError::NotPresent) => 3000,
            Err(err) => return Err(err).context("reading IMAGE_CATALOG_PORT"),
        };
        let env_db = env::var("IMAGE_CATALOG_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/meta/catalog.db".into());
        let env_storage =
            env::var("IMAGE_CATALOG_STORAGE_DIR").unwrap_or_else(|_| "./data/blobs".into());
        let env_secret =
            env::var("IMAGE_CATALOG_TOKEN_SECRET").unwrap_or_else(|_| DEV_TOKEN_SECRET.into());
        let env_require_owner = env::var("IMAGE_CATALOG_REQUIRE_OWNER")
            .map(|value| matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        // --- Merge ---
        let port = args.port.unwrap_or(env_port);
        let public_base_url = args
            .public_base_url
            .or_else(|| env::var("IMAGE_CATALOG_PUBLIC_BASE_URL").ok())
            .unwrap_or_else(|| format!("http://localhost:{}/files", port));

        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port,
            database_url: args.database_url.unwrap_or(env_db),
            storage_dir: args.storage_dir.unwrap_or(env_storage),
            public_base_url,
            token_secret: args.token_secret.unwrap_or(env_secret),
            require_owner: args.require_owner || env_require_owner,
            admin_email: env::var("IMAGE_CATALOG_ADMIN_EMAIL").ok(),
            admin_password: env::var("IMAGE_CATALOG_ADMIN_PASSWORD").ok(),
        };

        Ok((cfg, args.migrate))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
