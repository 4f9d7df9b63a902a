//! Digest importer CLI - main entry point
//!
//! Usage:
//!   digest_importer <backup-dir> <chat-id>   - import one chat's digests into MySQL
//!   digest_importer <backup-dir> 0           - show chat ids
//!   digest_importer <backup-dir> users       - show users

use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use digest_importer::config::DEFAULT_CONFIG_FILE;
use digest_importer::pipeline;

#[derive(Parser)]
#[command(name = "digest_importer")]
#[command(about = "Import chat digest backups into MySQL", long_about = None)]
#[command(version)]
struct Cli {
    /// Directory containing .tar.gz backup archives
    backup_dir: PathBuf,

    /// Chat id to import, `0` to list chat ids, or `users` to list users
    selector: String,

    /// Path to the database credentials JSON file
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env for local development
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("digest_importer=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    // The subscriber stamps each event, so the banners carry the run times.
    info!("++++= Started");
    pipeline::run(&cli.backup_dir, &cli.selector, &cli.config).await?;
    info!("++++= Ended");

    Ok(())
}
