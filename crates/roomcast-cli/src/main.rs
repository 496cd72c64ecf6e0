//! roomcast command-line subscriber
//!
//! Joins product or essential rooms on the realtime server and prints every
//! routed event as one JSON line on stdout until interrupted.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use roomcast_core::{
    ClientConfig, Directories, EssentialItem, EssentialRoomCallbacks, FileTokenStore,
    MemoryTokenStore, ProductRoomCallbacks, RoomClient, TokenStore,
};
use roomcast_rpc::{Endpoint, EventKind};
use serde_json::{Value, json};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Time given to queued `leave_room` frames before the connection closes
const LEAVE_GRACE: Duration = Duration::from_millis(200);

#[derive(Parser, Debug)]
#[command(name = "roomcast")]
#[command(about = "Subscribe to roomcast rooms and print their events")]
#[command(version)]
#[command(after_help = "\
Examples:
  roomcast login <TOKEN>              Store a credential
  roomcast product 012345678905       Follow lookups for one product
  roomcast essential Zinc Magnesium   Follow top products for essentials
  roomcast --endpoint unix:/run/roomcast.sock product abc123")]
struct Args {
    /// Config file (defaults to `~/.config/roomcast/config.json`)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Server endpoint (`tcp:<host>:<port>` or `unix:<path>`), overrides the config
    #[arg(long, global = true, value_name = "ENDPOINT")]
    endpoint: Option<Endpoint>,

    /// Credential to use instead of the stored token
    #[arg(long, global = true, value_name = "TOKEN")]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Join product rooms by product id or UPC
    Product {
        #[arg(required = true, value_name = "ID")]
        ids: Vec<String>,
    },

    /// Join essential (ingredient) rooms by name
    Essential {
        #[arg(required = true, value_name = "NAME")]
        names: Vec<String>,
    },

    /// Store a credential for later runs
    Login {
        token: String,
    },

    /// Remove the stored credential
    Logout,

    /// Write the effective settings to the config file
    Init {
        /// Replace an existing config file
        #[arg(long)]
        force: bool,
    },
}

/// Set up logging on stderr so stdout carries only events.
/// In debug builds, defaults to debug level and also logs to a timestamped file.
fn setup_logging() {
    let default_level = if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("roomcast={default_level}")));

    if cfg!(debug_assertions) {
        let temp_dir = std::env::temp_dir();
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let log_filename = format!("roomcast-{timestamp}.log");
        let log_path = temp_dir.join(&log_filename);

        #[cfg(unix)]
        {
            let symlink_path = temp_dir.join("roomcast.log");
            let _ = std::fs::remove_file(&symlink_path);
            let _ = std::os::unix::fs::symlink(&log_path, &symlink_path);
        }

        let file_appender = tracing_appender::rolling::never(&temp_dir, &log_filename);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        std::mem::forget(guard);

        let file_layer = fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .with_line_number(true);

        let stderr_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .with_target(true)
            .with_line_number(true);

        tracing_subscriber::registry()
            .with(file_layer)
            .with(stderr_layer)
            .with(filter)
            .init();

        eprintln!("Logging to: {} (and stderr)", log_path.display());
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .init();
    }
}

enum Rooms {
    Product(Vec<String>),
    Essential(Vec<String>),
}

fn event_line(room: &str, kind: EventKind, data: &Value) -> Value {
    json!({
        "room": room,
        "event": kind.wire_name(),
        "error": kind.is_error(),
        "data": data,
    })
}

fn print_event(room: &str, kind: EventKind, data: &Value) {
    println!("{}", event_line(room, kind, data));
}

fn printer(room: &str, kind: EventKind) -> impl Fn(Value) + Send + Sync + 'static {
    let room = room.to_string();
    move |data| print_event(&room, kind, &data)
}

fn product_callbacks(id: &str) -> ProductRoomCallbacks {
    let essentials_room = id.to_string();
    let ready_room = id.to_string();
    ProductRoomCallbacks::new()
        .on_update(printer(id, EventKind::DataUpdate))
        .on_error(printer(id, EventKind::DataUpdateError))
        .on_similar(printer(id, EventKind::SimilarItems))
        .on_similar_error(printer(id, EventKind::SimilarItemsError))
        .on_essentials(move |items: Vec<EssentialItem>| {
            let data = serde_json::to_value(items).unwrap_or_default();
            print_event(&essentials_room, EventKind::EssentialsList, &data);
        })
        .on_essentials_error(printer(id, EventKind::EssentialsListError))
        .on_ready(move |()| print_event(&ready_room, EventKind::RoomReady, &Value::Null))
}

fn essential_callbacks(name: &str) -> EssentialRoomCallbacks {
    let ready_room = name.to_string();
    EssentialRoomCallbacks::new()
        .on_products(printer(name, EventKind::EssentialProducts))
        .on_products_error(printer(name, EventKind::EssentialProductsError))
        .on_ready(move |()| print_event(&ready_room, EventKind::RoomReady, &Value::Null))
}

async fn subscribe(config: &ClientConfig, tokens: Arc<dyn TokenStore>, rooms: Rooms) -> Result<()> {
    if tokens.get_token().is_none() {
        bail!("No credential available. Pass --token or run `roomcast login <TOKEN>`");
    }

    let client = RoomClient::new(config, tokens);
    client
        .connection()
        .on_status_change(|status| info!("Connection status: {:?}", status));

    match rooms {
        Rooms::Product(ids) => {
            let products = client.products();
            for id in &ids {
                products.join(id, product_callbacks(id));
            }
        }
        Rooms::Essential(names) => {
            let essentials = client.essentials();
            for name in &names {
                essentials.join(name, essential_callbacks(name));
            }
        }
    }

    info!(
        "Listening on {} room(s) via {}, Ctrl-C to stop",
        client.registry().len(),
        config.endpoint
    );
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    info!("Leaving rooms");
    client.leave_all();
    tokio::time::sleep(LEAVE_GRACE).await;
    client.disconnect();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    setup_logging();

    let dirs = Directories::new()?;
    let config_path = args.config.unwrap_or_else(|| dirs.config_file.clone());
    let mut config = ClientConfig::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    if let Some(endpoint) = args.endpoint {
        config = config.with_endpoint(endpoint);
    }

    let token_file = config
        .token_file
        .clone()
        .unwrap_or_else(|| dirs.token_file.clone());
    let file_store = FileTokenStore::new(token_file);

    let tokens: Arc<dyn TokenStore> = match args.token {
        Some(token) => Arc::new(MemoryTokenStore::with_token(token)),
        None => Arc::new(file_store.clone()),
    };

    match args.command {
        Commands::Product { ids } => subscribe(&config, tokens, Rooms::Product(ids)).await,
        Commands::Essential { names } => {
            subscribe(&config, tokens, Rooms::Essential(names)).await
        }
        Commands::Login { token } => {
            dirs.ensure_exists()
                .context("Failed to create roomcast directories")?;
            file_store.save_token(token.trim())?;
            println!("Token saved to {}", file_store.path().display());
            Ok(())
        }
        Commands::Logout => {
            file_store.clear()?;
            println!("Token removed");
            Ok(())
        }
        Commands::Init { force } => {
            if config_path.exists() && !force {
                bail!(
                    "{} already exists, pass --force to replace it",
                    config_path.display()
                );
            }
            dirs.ensure_exists()
                .context("Failed to create roomcast directories")?;
            config.save(&config_path)?;
            println!("Config written to {}", config_path.display());
            Ok(())
        }
    }
}
