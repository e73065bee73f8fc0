//! `vgdb` command-line entry point: `server`, `migrate`, `backup`,
//! `restore` (§6 "CLI surface (minimal)").

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::{Parser, Subcommand};
use tracing::error;
use vgdb_core::{NodeId, ShardId};
use vgdb_storage::FileAdapter;

use vgdb_cli::env::EnvSettings;
use vgdb_cli::{backup, exit, migrate, server};

#[derive(Debug, Parser)]
#[command(name = "vgdb", version, about = "Vector + graph database node")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a node, serving its assigned shard over the HTTP control plane.
    Server {
        #[arg(long)]
        node_id: String,
        #[arg(long)]
        role: Option<String>,
        #[arg(long, default_value_t = 8080)]
        http_port: u16,
        #[arg(long, value_delimiter = ',')]
        seeds: Vec<String>,
        #[arg(long, default_value = ".vgdb")]
        storage: String,
        #[arg(long)]
        read_only: bool,
        #[arg(long)]
        write_only: bool,
    },
    /// Migrate one shard to another node.
    Migrate {
        #[arg(long)]
        shard: u32,
        #[arg(long = "to")]
        to: String,
        #[arg(long)]
        node_id: String,
        #[arg(long, default_value = ".vgdb")]
        storage: String,
    },
    /// Snapshot every blob this node holds into a single archive.
    Backup {
        #[arg(long)]
        out: PathBuf,
        #[arg(long, default_value = ".vgdb")]
        storage: String,
    },
    /// Restore a snapshot produced by `backup` into this node's storage.
    Restore {
        #[arg(long = "in")]
        input: PathBuf,
        #[arg(long, default_value = ".vgdb")]
        storage: String,
    },
}

fn now_us() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).expect("system clock before epoch").as_micros() as u64
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let code = match run(cli.command).await {
        Ok(()) => exit::OK,
        Err(err) => {
            error!(error = %err, "command failed");
            eprintln!("error: {err}");
            exit::code_for(&err)
        }
    };
    ExitCode::from(code as u8)
}

async fn run(command: Command) -> vgdb_core::Result<()> {
    match command {
        Command::Server { node_id, role, http_port, seeds, storage, read_only, write_only } => {
            let env = EnvSettings::from_env();
            let settings = server::ServerSettings {
                node_id: NodeId(node_id),
                role,
                http_port: env.http_port.unwrap_or(http_port),
                seeds,
                storage,
                read_only,
                write_only,
            };
            server::run_server(settings, env).await
        }
        Command::Migrate { shard, to, node_id, storage } => {
            let adapter = FileAdapter::open(storage)?;
            let outcome = migrate::run_migrate(
                &adapter,
                NodeId(node_id),
                ShardId(shard),
                NodeId(to),
                1000,
                3,
                now_us(),
            )
            .await?;
            println!("migrated {} nouns, {} verbs", outcome.nouns_sent, outcome.verbs_sent);
            Ok(())
        }
        Command::Backup { out, storage } => {
            let adapter = FileAdapter::open(storage)?;
            let info = backup::run_backup(&adapter, &out, now_us())?;
            println!("backed up {} blobs ({} bytes) to {}", info.blob_count, info.bundle_size_bytes, out.display());
            Ok(())
        }
        Command::Restore { input, storage } => {
            let adapter = FileAdapter::open(storage)?;
            let info = backup::run_restore(&adapter, &input)?;
            println!("restored {} blobs from {}", info.blobs_restored, input.display());
            Ok(())
        }
    }
}

