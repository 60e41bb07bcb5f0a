//! Sync Supabase table schemas with local struct definitions.
//!
//! Reads a table's columns through a `<table>_schema` shadow view (created on
//! demand through the `exec_sql` RPC function) and writes local struct
//! definitions back as column schemas.
//!
//! # Usage
//! ```bash
//! schemasync pull blogs                     # Print the blogs schema as JSON
//! schemasync pull blogs --format struct     # ...or as a tagged struct
//! schemasync push examples --path src/domain
//! schemasync tables                         # Every public table
//! schemasync server --port 8080             # Serve the HTTP API
//! ```

mod api;
mod config;
mod error;
mod introspect;
mod models;
mod schema;
mod server;
mod service;
mod types;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::service::SchemaService;

const DEFAULT_DOMAIN_PATH: &str = "internal/domain";

#[derive(Parser)]
#[command(name = "schemasync")]
#[command(about = "Sync Supabase table schemas with local struct definitions")]
#[command(version)]
struct Cli {
    /// Config file (default: ~/.config/schemasync/config.json)
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pull a table's column schema from Supabase
    Pull {
        /// Table name
        table_name: String,

        /// Where to read the schema from
        #[arg(long, value_enum, default_value_t = Strategy::View)]
        strategy: Strategy,

        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Json)]
        format: Format,
    },

    /// Push a local struct definition as the table's schema
    Push {
        /// Table name
        table_name: String,

        /// Directory containing `<table_name>.rs`
        #[arg(long, default_value = DEFAULT_DOMAIN_PATH)]
        path: String,

        /// JSON field descriptor file to use instead of parsing a struct
        #[arg(long)]
        descriptor: Option<String>,
    },

    /// Pull the schema of every public table
    Tables {
        /// Use the `get_all_table_schemas` RPC function
        #[arg(long)]
        via_rpc: bool,
    },

    /// Drop a table's schema view
    DropView {
        /// Table name
        table_name: String,
    },

    /// Drop and recreate a table's schema view
    RefreshView {
        /// Table name
        table_name: String,
    },

    /// Start the HTTP server
    Server {
        /// Port (default: SCHEMASYNC_PORT or 8080)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Strategy {
    /// Shadow view, created if missing
    View,
    /// information_schema.columns, no view
    Direct,
    /// `get_table_schema` RPC function
    Rpc,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Struct,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("schemasync=info,tower_http=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Configuration errors abort before any network call.
    let config = Config::load(cli.config.as_deref()).context("Failed to load config")?;

    match cli.command {
        Commands::Pull {
            table_name,
            strategy,
            format,
        } => cmd_pull(&config, &table_name, strategy, format),
        Commands::Push {
            table_name,
            path,
            descriptor,
        } => cmd_push(&config, &table_name, &path, descriptor.as_deref()),
        Commands::Tables { via_rpc } => cmd_tables(&config, via_rpc),
        Commands::DropView { table_name } => cmd_drop_view(&config, &table_name),
        Commands::RefreshView { table_name } => cmd_refresh_view(&config, &table_name),
        Commands::Server { port } => cmd_server(&config, port),
    }
}

fn cmd_pull(config: &Config, table: &str, strategy: Strategy, format: Format) -> Result<()> {
    let service = SchemaService::new(config).context("Failed to create SchemaService")?;

    let schema = match strategy {
        Strategy::View => service.pull(table),
        Strategy::Direct => service.table_info(table),
        Strategy::Rpc => service.pull_via_rpc(table),
    }
    .with_context(|| format!("Failed to pull schema for table {}", table))?;

    match format {
        Format::Json => print_json(&schema)?,
        Format::Struct => print!("{}", types::render_struct(&schema)),
    }

    Ok(())
}

fn cmd_push(config: &Config, table: &str, path: &str, descriptor: Option<&str>) -> Result<()> {
    let fields = match descriptor {
        Some(descriptor) => {
            let descriptor = shellexpand::tilde(descriptor).to_string();
            introspect::load_descriptor_file(Path::new(&descriptor))?
        }
        None => {
            let dir = PathBuf::from(shellexpand::tilde(path).to_string());
            let file = dir.join(format!("{}.rs", table));
            introspect::parse_struct_file(&file, &introspect::struct_name_for(table))?
        }
    };
    let columns = introspect::columns_from_fields(&fields);
    tracing::debug!(table, columns = columns.len(), "parsed local struct");

    let service = SchemaService::new(config).context("Failed to create SchemaService")?;
    service
        .push(table, columns)
        .with_context(|| format!("Failed to push schema for table {}", table))?;

    println!("table '{}' pushed successfully", table);
    Ok(())
}

fn cmd_tables(config: &Config, via_rpc: bool) -> Result<()> {
    let service = SchemaService::new(config).context("Failed to create SchemaService")?;
    let schemas = service.all_table_schemas(via_rpc)?;
    print_json(&schemas)
}

fn cmd_drop_view(config: &Config, table: &str) -> Result<()> {
    let service = SchemaService::new(config).context("Failed to create SchemaService")?;
    service.drop_view(table)?;
    println!("schema view for '{}' dropped", table);
    Ok(())
}

fn cmd_refresh_view(config: &Config, table: &str) -> Result<()> {
    let service = SchemaService::new(config).context("Failed to create SchemaService")?;
    service.refresh_view(table)?;
    println!("schema view for '{}' refreshed", table);
    Ok(())
}

fn cmd_server(config: &Config, port: Option<u16>) -> Result<()> {
    let port = port.unwrap_or(config.server_port);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let service = SchemaService::new(config).context("Failed to create SchemaService")?;
    service.serve(addr)
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}
