//! Command-line interface for the Mizan memory engine.

use anyhow::{Context, bail};
use clap::{Parser, Subcommand, ValueEnum};
use log::{debug, info, warn};
use mizan_rs::config::{LayeredConfigOptions, MizanConfig};
use mizan_rs::duration::parse_duration_millis;
use mizan_rs::memory::model::now_millis;
use mizan_rs::memory::{ListOptions, MemoryCategory, MemoryEngine, MemoryInput, SearchOptions};
use mizan_rs::server::AppState;
use serde::Serialize;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

/// Command-line options for the memory CLI.
#[derive(Parser)]
#[command(name = "mizan", version, about = "Durable memory for autonomous agents")]
struct Cli {
    /// Extra mizan.json5 config layers, applied last
    #[arg(long, global = true)]
    config: Vec<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Store a new memory
    Add {
        content: String,
        #[arg(long)]
        category: MemoryCategory,
        /// Comma-separated tags
        #[arg(long)]
        tags: Option<String>,
        #[arg(long)]
        importance: Option<f64>,
    },
    /// Hybrid keyword and semantic search
    Search {
        query: String,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        category: Option<MemoryCategory>,
        #[arg(long)]
        tags: Option<String>,
    },
    /// List memories, newest first
    List {
        #[arg(long)]
        category: Option<MemoryCategory>,
        #[arg(long)]
        tags: Option<String>,
        /// Only memories newer than this, e.g. 7d, 12h, 30m, 10s
        #[arg(long)]
        since: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        offset: Option<usize>,
    },
    /// Fetch one memory by id
    Get { id: String },
    /// Delete one memory by id
    Delete { id: String },
    /// Fold low-importance memories into summaries
    Summarize,
    /// Decay importance and prune stale memories
    Decay,
    /// Clear the durability log
    FlushWal,
    /// Print an operational snapshot
    Health,
    /// Dump every memory
    Export {
        #[arg(long, value_enum, default_value_t = ExportFormat::Json)]
        format: ExportFormat,
    },
    /// Run the HTTP server
    Serve {
        #[arg(long)]
        port: Option<u16>,
        #[arg(long)]
        host: Option<IpAddr>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportFormat {
    Json,
}

/// Entry point for the memory CLI.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    mizan_rs::init_logging();
    let cli = Cli::parse();

    let cwd = std::env::current_dir().context("failed to resolve current working directory")?;
    let options = cli
        .config
        .iter()
        .fold(LayeredConfigOptions::new(&cwd), |options, path| {
            options.with_runtime_path(path)
        });
    let layered = MizanConfig::load_layered_with_options(options)
        .context("failed to load layered config")?;
    debug!("layered config loaded (layers={})", layered.layers.len());
    let mut config = layered.config;
    config
        .apply_process_env()
        .context("invalid environment override")?;

    let mut engine =
        mizan_rs::open_engine(&config, &cwd).context("failed to open memory engine")?;

    match cli.command {
        Command::Serve { port, host } => {
            let host = match host {
                Some(host) => host,
                None => config
                    .server
                    .host
                    .parse()
                    .with_context(|| format!("invalid server.host '{}'", config.server.host))?,
            };
            let addr = SocketAddr::new(host, port.unwrap_or(config.server.port));
            info!("starting memory server (addr={addr})");
            let state = AppState::new(engine);
            mizan_rs::server::serve(state.clone(), addr, config.server.body_limit_bytes)
                .await
                .context("memory server failed")?;
            match Arc::try_unwrap(state.engine) {
                Ok(engine) => engine
                    .into_inner()
                    .close()
                    .context("failed to close memory engine")?,
                Err(_) => warn!("memory engine still shared at shutdown; skipping close"),
            }
            Ok(())
        }
        command => {
            let result = run(&mut engine, command).await;
            engine.close().context("failed to close memory engine")?;
            result
        }
    }
}

async fn run(engine: &mut MemoryEngine, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Add {
            content,
            category,
            tags,
            importance,
        } => {
            let mut input = MemoryInput::new(content, category).with_tags(split_tags(tags));
            input.importance = importance;
            print_json(&engine.add_memory(input).await?)
        }
        Command::Search {
            query,
            limit,
            category,
            tags,
        } => {
            let options = SearchOptions {
                limit,
                category,
                tags: split_tags(tags),
                keyword: None,
            };
            print_json(&engine.search(&query, &options).await?)
        }
        Command::List {
            category,
            tags,
            since,
            limit,
            offset,
        } => {
            let since = since
                .as_deref()
                .map(parse_duration_millis)
                .transpose()?
                .map(|window| now_millis().saturating_sub(window));
            let options = ListOptions {
                category,
                tags: split_tags(tags),
                since,
                until: None,
                limit,
                offset,
            };
            print_json(&engine.list(&options)?)
        }
        Command::Get { id } => match engine.get(&id)? {
            Some(record) => print_json(&record),
            None => bail!("memory not found: {id}"),
        },
        Command::Delete { id } => {
            if !engine.delete(&id)? {
                bail!("memory not found: {id}");
            }
            print_json(&serde_json::json!({ "deleted": id }))
        }
        Command::Summarize => print_json(&engine.summarize().await?),
        Command::Decay => print_json(&engine.decay()?),
        Command::FlushWal => {
            engine.flush_wal()?;
            print_json(&serde_json::json!({ "flushed": true }))
        }
        Command::Health => print_json(&engine.health()?),
        Command::Export { format } => match format {
            ExportFormat::Json => print_json(&engine.export()?),
        },
        Command::Serve { .. } => bail!("serve is handled before dispatch"),
    }
}

fn split_tags(tags: Option<String>) -> Vec<String> {
    tags.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
