//! Pipeline driver
//!
//! Sequences the whole run: list archives, fold each one into the
//! accumulation map, then either print the keys (enumeration modes) or
//! enrich the senders and push everything into MySQL. Exactly one
//! archive, one fetch and one SQL statement are ever in flight; the
//! overwrite order of the dedup fold and the load on the remote host both
//! depend on it.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::archive::extract_member;
use crate::avatar::AvatarClient;
use crate::config::{DbConfig, DIGEST_FILE};
use crate::digest::{accumulate, parse_records, unique_usernames, AccumulationMap, Mode};
use crate::error::{Error, Result};
use crate::sink;

/// List the backup archives in a directory, sorted by file name so the
/// last-write-wins fold is deterministic across platforms.
pub fn list_archives(backup_dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(backup_dir)
        .map_err(|_| Error::BackupDirUnreadable(backup_dir.display().to_string()))?;

    let mut archives: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.ends_with(".tar.gz"))
        })
        .collect();
    archives.sort();
    Ok(archives)
}

/// Extraction phase: fold every archive's digest into one map.
pub fn collect(backup_dir: &Path, mode: &Mode) -> Result<AccumulationMap> {
    let mut map = AccumulationMap::new();
    for path in list_archives(backup_dir)? {
        info!("Processing file {}...", path.display());
        let content = extract_member(&path, DIGEST_FILE)?;
        accumulate(&mut map, parse_records(&content), mode);
    }
    Ok(map)
}

fn print_keys(map: &AccumulationMap, heading: &str) {
    println!("\n===== {}:", heading);
    for key in map.keys() {
        println!("{}", key);
    }
}

/// Run the full pipeline for one selector.
///
/// Enumeration selectors print the accumulated keys and stop; a chat id
/// continues through avatar enrichment into the database phase. The
/// credentials file is only read when the database phase is reached.
pub async fn run(backup_dir: &Path, selector: &str, config_path: &Path) -> Result<()> {
    let mode = Mode::parse(selector)?;
    let map = collect(backup_dir, &mode)?;

    match mode {
        Mode::AllChats => {
            print_keys(&map, "All ChatId's");
            return Ok(());
        }
        Mode::AllUsers => {
            print_keys(&map, "All Users");
            return Ok(());
        }
        Mode::SpecificChat(id) => {
            info!("Collected {} unique messages for chat {}", map.len(), id);
        }
    }

    let users = unique_usernames(&map);
    let avatars = AvatarClient::new().resolve_all(&users).await;

    let config = DbConfig::load(config_path)?;
    let statements = sink::build_statements(&map, &avatars);
    sink::import(&config, statements).await
}
