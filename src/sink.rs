//! MySQL sink
//!
//! The destination table is recreated on every run and filled with one row
//! per accumulated entry, in map iteration order. Statements are built as
//! plain SQL text with every string value escaped, then executed one at a
//! time over a single connection.

use mysql_async::prelude::*;
use mysql_async::Pool;
use tracing::{error, info};

use crate::avatar::{AvatarLookup, NO_AVATAR};
use crate::config::DbConfig;
use crate::digest::AccumulationMap;
use crate::error::Result;

/// Destination table name.
pub const TABLE_NAME: &str = "digests";

/// Escape a string value for inclusion in a single-quoted SQL literal.
///
/// Backslash-escapes NUL, backspace, tab, Ctrl-Z, newline, carriage
/// return, both quote characters, backslash itself and percent, following
/// the canonical MySQL escaping convention. Values containing none of
/// these pass through unchanged.
pub fn esc_sql_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\0' => out.push_str("\\0"),
            '\u{0008}' => out.push_str("\\b"),
            '\t' => out.push_str("\\t"),
            '\u{001a}' => out.push_str("\\z"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '"' | '\'' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            '%' => out.push_str("\\%"),
            _ => out.push(c),
        }
    }
    out
}

/// Classification hook for the `grp` column.
///
/// Currently a placeholder: every named sender lands in group "1" and
/// anonymous entries in "0". A real classification would slot in here.
pub fn group_for(username: Option<&str>) -> &'static str {
    match username {
        Some(name) if !name.is_empty() => "1",
        _ => "0",
    }
}

fn username_or_zero(username: Option<&str>) -> &str {
    match username {
        Some(name) if !name.is_empty() => name,
        _ => "0",
    }
}

fn avatar_or_zero<'a>(avatars: &'a AvatarLookup, username: Option<&str>) -> &'a str {
    username
        .filter(|name| !name.is_empty())
        .and_then(|name| avatars.get(name))
        .map(String::as_str)
        .unwrap_or(NO_AVATAR)
}

/// Build the full statement sequence: drop, create, then one insert per
/// map entry carrying a 1-based sequence number.
pub fn build_statements(map: &AccumulationMap, avatars: &AvatarLookup) -> Vec<String> {
    let mut statements = Vec::with_capacity(map.len() + 2);
    statements.push(format!("DROP TABLE IF EXISTS {};", TABLE_NAME));
    statements.push(format!(
        "CREATE TABLE {} (num TEXT, date TEXT, username TEXT, grp TEXT, avatar TEXT, msg TEXT) \
         CHARACTER SET utf8mb4 COLLATE utf8mb4_unicode_ci;",
        TABLE_NAME
    ));

    for (num, (date, value)) in map.iter().enumerate() {
        let username = value
            .as_ref()
            .and_then(|entry| entry.username.as_deref());
        let message = value
            .as_ref()
            .and_then(|entry| entry.message.as_deref())
            .unwrap_or_default();

        statements.push(format!(
            "INSERT INTO {} (num, date, username, grp, avatar, msg) \
             VALUES ('{}', '{}', '{}', '{}', '{}', '{}');",
            TABLE_NAME,
            esc_sql_string(&(num + 1).to_string()),
            esc_sql_string(date),
            esc_sql_string(username_or_zero(username)),
            esc_sql_string(group_for(username)),
            esc_sql_string(avatar_or_zero(avatars, username)),
            esc_sql_string(message),
        ));
    }

    statements
}

/// Execute the statements sequentially over one connection.
///
/// Any failure is fatal, but the pool is still torn down before the error
/// propagates so the connection never leaks past the run.
pub async fn import(config: &DbConfig, statements: Vec<String>) -> Result<()> {
    let pool = Pool::new(config.opts());
    let result = run_statements(&pool, config, &statements).await;

    if let Err(e) = pool.disconnect().await {
        if result.is_ok() {
            return Err(e.into());
        }
        error!("Failed to close MySQL connection: {}", e);
    }
    result
}

async fn run_statements(pool: &Pool, config: &DbConfig, statements: &[String]) -> Result<()> {
    let mut conn = pool.get_conn().await?;
    info!("SQL: Connected to {}!", config.host);

    for statement in statements {
        conn.query_drop(statement.as_str()).await?;
    }

    let rows = statements.len().saturating_sub(2);
    info!("SQL: {} digests are stored to the DB.", rows);
    drop(conn);
    Ok(())
}
