//! Digest records and the deduplicating accumulation fold
//!
//! A digest file is a JSON array of message records. Records are folded
//! into one ordered map across every archive; inserting an existing key
//! overwrites the previous value, which is the deduplication mechanism
//! (the source data has per-second timestamp granularity, so near-duplicate
//! exports collapse onto the same key).

use std::collections::BTreeMap;

use serde::Deserialize;
use tracing::warn;

use crate::error::{Error, Result};

/// One entry of a chat export digest.
///
/// The export mixes string and numeric representations for ids and dates,
/// so both deserialize through the string-or-number helper. Every field
/// may be absent; absent fields propagate downstream as empty values and
/// are never filtered out.
#[derive(Debug, Clone, Deserialize)]
pub struct DigestRecord {
    #[serde(rename = "s_chatID", default, deserialize_with = "string_or_number")]
    pub chat_id: Option<String>,
    #[serde(rename = "s_date", default, deserialize_with = "string_or_number")]
    pub date: Option<String>,
    #[serde(rename = "s_username", default)]
    pub username: Option<String>,
    #[serde(rename = "s_message", default)]
    pub message: Option<String>,
}

/// Deserialize a value that can be either a string or a number.
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    let value: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s)),
        Some(serde_json::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(D::Error::custom(format!(
            "expected string or number, got {:?}",
            other
        ))),
    }
}

/// The username/message pair kept for message-collection mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageEntry {
    pub username: Option<String>,
    pub message: Option<String>,
}

/// The deduplicating ordered map shared by all three modes.
///
/// Key semantics depend on the mode: chat id, username, or message
/// timestamp. Values are `None` for the enumeration modes.
pub type AccumulationMap = BTreeMap<String, Option<MessageEntry>>;

/// The selected operating mode, derived from the CLI selector argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Selector `0`: list every chat id seen across the backups.
    AllChats,
    /// Selector `users`: list every username seen across the backups.
    AllUsers,
    /// Any numeric selector: collect messages for that chat and import.
    SpecificChat(i64),
}

impl Mode {
    /// Parse the selector argument.
    ///
    /// `0` (loosely numeric) selects chat enumeration, the literal `users`
    /// selects user enumeration, and anything else must parse as a chat
    /// id. A selector that is neither is a usage error.
    pub fn parse(selector: &str) -> Result<Self> {
        if selector == "users" {
            return Ok(Mode::AllUsers);
        }
        match parse_loose_i64(selector) {
            Some(0) => Ok(Mode::AllChats),
            Some(id) => Ok(Mode::SpecificChat(id)),
            None => Err(Error::InvalidArgument(format!(
                "selector must be a chat id, `0` or `users`, got `{}`",
                selector
            ))),
        }
    }

    /// Enumeration modes terminate after printing the map keys and never
    /// reach the enrichment or database phases.
    pub fn is_enumeration(&self) -> bool {
        matches!(self, Mode::AllChats | Mode::AllUsers)
    }
}

/// Loose integer parse: optional sign followed by leading digits, trailing
/// garbage ignored. Chat ids appear both as numbers and as decorated
/// strings in the wild, so strict parsing would drop valid records.
pub fn parse_loose_i64(s: &str) -> Option<i64> {
    let s = s.trim();
    let (sign, rest) = match s.strip_prefix('-') {
        Some(rest) => (-1i64, rest),
        None => (1i64, s.strip_prefix('+').unwrap_or(s)),
    };
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse::<i64>().ok().map(|n| sign * n)
}

/// Parse digest content as a sequence of records.
///
/// Element-level failures are skipped with a warning rather than aborting:
/// per-record integrity of the exports is not guaranteed. Empty content
/// (archive without the digest member) yields no records.
pub fn parse_records(content: &str) -> Vec<DigestRecord> {
    if content.trim().is_empty() {
        return Vec::new();
    }
    let values: Vec<serde_json::Value> = match serde_json::from_str(content) {
        Ok(values) => values,
        Err(e) => {
            warn!("Skipping unparseable digest content: {}", e);
            return Vec::new();
        }
    };
    values
        .into_iter()
        .filter_map(|value| match serde_json::from_value(value) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Skipping malformed digest record: {}", e);
                None
            }
        })
        .collect()
}

/// Fold records into the accumulation map according to the mode.
pub fn accumulate(map: &mut AccumulationMap, records: Vec<DigestRecord>, mode: &Mode) {
    for record in records {
        match mode {
            Mode::AllChats => {
                map.insert(record.chat_id.unwrap_or_default(), None);
            }
            Mode::AllUsers => {
                map.insert(record.username.unwrap_or_default(), None);
            }
            Mode::SpecificChat(id) => {
                let record_id = record.chat_id.as_deref().and_then(parse_loose_i64);
                if record_id == Some(*id) {
                    map.insert(
                        record.date.unwrap_or_default(),
                        Some(MessageEntry {
                            username: record.username,
                            message: record.message,
                        }),
                    );
                }
            }
        }
    }
}

/// Distinct non-empty usernames among the map's values, in map iteration
/// order of first appearance. This is exactly the set the avatar lookup
/// will be keyed by.
pub fn unique_usernames(map: &AccumulationMap) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut users = Vec::new();
    for entry in map.values().flatten() {
        if let Some(username) = entry.username.as_deref() {
            if !username.is_empty() && seen.insert(username.to_string()) {
                users.push(username.to_string());
            }
        }
    }
    users
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(content: &str, mode: &Mode) -> AccumulationMap {
        let mut map = AccumulationMap::new();
        accumulate(&mut map, parse_records(content), mode);
        map
    }

    #[test]
    fn test_mode_parse_zero_lists_chats() {
        assert_eq!(Mode::parse("0").unwrap(), Mode::AllChats);
    }

    #[test]
    fn test_mode_parse_users() {
        assert_eq!(Mode::parse("users").unwrap(), Mode::AllUsers);
    }

    #[test]
    fn test_mode_parse_chat_id() {
        assert_eq!(Mode::parse("42").unwrap(), Mode::SpecificChat(42));
        assert_eq!(Mode::parse("-7").unwrap(), Mode::SpecificChat(-7));
    }

    #[test]
    fn test_mode_parse_invalid_selector() {
        let err = Mode::parse("friends").unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_mode_enumeration_flags() {
        assert!(Mode::AllChats.is_enumeration());
        assert!(Mode::AllUsers.is_enumeration());
        assert!(!Mode::SpecificChat(5).is_enumeration());
    }

    #[test]
    fn test_parse_loose_i64() {
        assert_eq!(parse_loose_i64("5"), Some(5));
        assert_eq!(parse_loose_i64(" 12 "), Some(12));
        assert_eq!(parse_loose_i64("12abc"), Some(12));
        assert_eq!(parse_loose_i64("-3"), Some(-3));
        assert_eq!(parse_loose_i64("+8"), Some(8));
        assert_eq!(parse_loose_i64("abc"), None);
        assert_eq!(parse_loose_i64(""), None);
    }

    #[test]
    fn test_record_mixed_representations() {
        let records = parse_records(
            r#"[{"s_chatID": 5, "s_date": 20171123, "s_username": "bob", "s_message": "hi"},
                {"s_chatID": "5", "s_date": "20171124", "s_username": "bob", "s_message": "yo"}]"#,
        );
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].chat_id.as_deref(), Some("5"));
        assert_eq!(records[0].date.as_deref(), Some("20171123"));
        assert_eq!(records[1].chat_id.as_deref(), Some("5"));
    }

    #[test]
    fn test_malformed_record_skipped() {
        let records = parse_records(
            r#"[{"s_chatID": "1", "s_date": "t1"},
                {"s_chatID": [1, 2]},
                {"s_chatID": "2", "s_date": "t2"}]"#,
        );
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_unparseable_content_yields_nothing() {
        assert!(parse_records("not json at all").is_empty());
        assert!(parse_records("").is_empty());
        assert!(parse_records("   ").is_empty());
    }

    #[test]
    fn test_all_chats_dedupes_ids() {
        let map = collect(
            r#"[{"s_chatID": "1"}, {"s_chatID": "2"}, {"s_chatID": "1"}]"#,
            &Mode::AllChats,
        );
        let keys: Vec<_> = map.keys().cloned().collect();
        assert_eq!(keys, vec!["1".to_string(), "2".to_string()]);
        assert!(map.values().all(|v| v.is_none()));
    }

    #[test]
    fn test_all_users_dedupes_names() {
        let map = collect(
            r#"[{"s_username": "alice"}, {"s_username": "bob"}, {"s_username": "alice"}]"#,
            &Mode::AllUsers,
        );
        assert_eq!(map.len(), 2);
        assert!(map.contains_key("alice"));
        assert!(map.contains_key("bob"));
    }

    #[test]
    fn test_specific_chat_last_write_wins() {
        let map = collect(
            r#"[{"s_chatID": "5", "s_date": "t1", "s_username": "bob", "s_message": "hi"},
                {"s_chatID": 5, "s_date": "t1", "s_username": "bob", "s_message": "hi2"}]"#,
            &Mode::SpecificChat(5),
        );
        assert_eq!(map.len(), 1);
        let entry = map.get("t1").unwrap().as_ref().unwrap();
        assert_eq!(entry.message.as_deref(), Some("hi2"));
    }

    #[test]
    fn test_specific_chat_filters_other_chats() {
        let map = collect(
            r#"[{"s_chatID": "5", "s_date": "t1", "s_username": "bob", "s_message": "hi"},
                {"s_chatID": "6", "s_date": "t2", "s_username": "eve", "s_message": "no"}]"#,
            &Mode::SpecificChat(5),
        );
        assert_eq!(map.len(), 1);
        assert!(map.contains_key("t1"));
    }

    #[test]
    fn test_specific_chat_keeps_absent_fields() {
        let map = collect(r#"[{"s_chatID": "5", "s_date": "t1"}]"#, &Mode::SpecificChat(5));
        let entry = map.get("t1").unwrap().as_ref().unwrap();
        assert_eq!(entry.username, None);
        assert_eq!(entry.message, None);
    }

    #[test]
    fn test_accumulate_spans_multiple_batches() {
        let mut map = AccumulationMap::new();
        accumulate(
            &mut map,
            parse_records(r#"[{"s_chatID": "5", "s_date": "t1", "s_message": "old"}]"#),
            &Mode::SpecificChat(5),
        );
        accumulate(
            &mut map,
            parse_records(r#"[{"s_chatID": "5", "s_date": "t1", "s_message": "new"}]"#),
            &Mode::SpecificChat(5),
        );
        assert_eq!(map.len(), 1);
        let entry = map.get("t1").unwrap().as_ref().unwrap();
        assert_eq!(entry.message.as_deref(), Some("new"));
    }

    #[test]
    fn test_unique_usernames_skips_empty_and_dedupes() {
        let map = collect(
            r#"[{"s_chatID": "5", "s_date": "t1", "s_username": "bob", "s_message": "a"},
                {"s_chatID": "5", "s_date": "t2", "s_message": "b"},
                {"s_chatID": "5", "s_date": "t3", "s_username": "alice", "s_message": "c"},
                {"s_chatID": "5", "s_date": "t4", "s_username": "bob", "s_message": "d"}]"#,
            &Mode::SpecificChat(5),
        );
        let users = unique_usernames(&map);
        assert_eq!(users, vec!["bob".to_string(), "alice".to_string()]);
    }
}
