//! Go Marketplace CLI - cart client and storage management.
//!
//! # Usage
//!
//! ```bash
//! # Show the cart
//! gm-cart show
//!
//! # Add a product (quantity goes up by one if it is already in the cart)
//! gm-cart add --id 1 --title "Backpack" --image-url https://cdn.example.com/1.png --price 149.90
//!
//! # Change quantities
//! gm-cart increment 1
//! gm-cart decrement 1
//!
//! # Empty the cart
//! gm-cart clear
//!
//! # Create the Postgres storage table
//! CART_STORAGE=postgres CART_DATABASE_URL=postgres://... gm-cart migrate
//! ```
//!
//! Storage is configured through `CART_*` environment variables (see
//! `go_marketplace_cart::config`); `--storage`, `--dir` and `--key` override them.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use go_marketplace_cart::{CartConfig, StorageBackend};
use go_marketplace_core::{NewCartItem, Price, ProductId};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::cart::CartAction;

#[derive(Parser)]
#[command(name = "gm-cart")]
#[command(author, version, about = "Go Marketplace cart client")]
struct Cli {
    /// Storage backend (`memory`, `file`, `postgres`)
    #[arg(long, global = true)]
    storage: Option<StorageBackend>,

    /// Directory for the file backend
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    /// Storage key the cart is persisted under
    #[arg(long, global = true)]
    key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show cart lines and the total item count
    Show,
    /// Add a product to the cart
    Add {
        /// Product ID
        #[arg(long, value_parser = ProductId::parse)]
        id: ProductId,

        /// Product title
        #[arg(long)]
        title: String,

        /// Product image URL
        #[arg(long)]
        image_url: String,

        /// Unit price (e.g. 19.99)
        #[arg(long)]
        price: Price,
    },
    /// Raise a line's quantity by one
    Increment {
        /// Product ID
        #[arg(value_parser = ProductId::parse)]
        id: ProductId,
    },
    /// Lower a line's quantity by one (stops at zero)
    Decrement {
        /// Product ID
        #[arg(value_parser = ProductId::parse)]
        id: ProductId,
    },
    /// Remove every line and delete the persisted cart
    Clear,
    /// Run storage migrations (Postgres backend)
    Migrate,
}

impl Cli {
    fn apply_overrides(&self, mut config: CartConfig) -> CartConfig {
        if let Some(backend) = self.storage {
            config.backend = backend;
        }
        if let Some(dir) = &self.dir {
            config.storage_dir.clone_from(dir);
        }
        if let Some(key) = &self.key {
            config.storage_key.clone_from(key);
        }
        config
    }
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &CartConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load configuration first so Sentry is up before the tracing subscriber
    let config = CartConfig::from_env().map(|config| cli.apply_overrides(config));
    let _sentry_guard = config.as_ref().ok().and_then(init_sentry);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "go_marketplace_cart=info,go_marketplace_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = run(cli.command, &config).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(command: Commands, config: &CartConfig) -> Result<(), Box<dyn std::error::Error>> {
    let action = match command {
        Commands::Migrate => {
            commands::migrate::run(config).await?;
            return Ok(());
        }
        Commands::Show => CartAction::Show,
        Commands::Add {
            id,
            title,
            image_url,
            price,
        } => CartAction::Add(NewCartItem {
            id,
            title,
            image_url,
            price,
        }),
        Commands::Increment { id } => CartAction::Increment(id),
        Commands::Decrement { id } => CartAction::Decrement(id),
        Commands::Clear => CartAction::Clear,
    };

    commands::cart::execute(config, action).await?;
    Ok(())
}
