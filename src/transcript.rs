//! Transcript snapshot persistence (§3/§6): saving the in-memory message
//! list to a timestamped JSON file under `.egg/localChats/`, and loading
//! one back.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use crate::constants::{LOCAL_CHATS_DIR, STATE_DIR};
use crate::message::{Message, Role};

fn sanitize_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\w-]").unwrap())
}

/// Builds `<YYYYMMDD_HHMMSS>_<prefix>[_<sanitized-identifier>].json`.
///
/// `now` is injected by the caller (no wall-clock access here), and
/// `identifier` is truncated to its first 30 characters before sanitizing.
pub fn snapshot_filename(now: chrono::DateTime<chrono::Utc>, prefix: &str, identifier: Option<&str>) -> String {
    let ts = now.format("%Y%m%d_%H%M%S");
    match identifier {
        Some(id) => {
            let truncated: String = id.chars().take(30).collect();
            let sanitized = sanitize_re().replace_all(&truncated, "_");
            format!("{ts}_{prefix}_{sanitized}.json")
        }
        None => format!("{ts}_{prefix}.json"),
    }
}

/// Saves `messages` to `.egg/localChats/<name>` under `project_root`,
/// creating the directory if needed. Returns the full path written.
pub fn save_snapshot(
    project_root: &Path,
    messages: &[Message],
    prefix: &str,
    identifier: Option<&str>,
) -> Result<PathBuf> {
    let dir = project_root.join(STATE_DIR).join(LOCAL_CHATS_DIR);
    std::fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;

    let name = snapshot_filename(chrono::Utc::now(), prefix, identifier);
    let path = dir.join(name);
    let json = serde_json::to_string_pretty(messages)?;
    std::fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}

/// Loads a transcript, rejecting one whose first message is not `system`
/// (Open Question, §9).
pub fn load_snapshot(path: &Path) -> Result<Vec<Message>> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let messages: Vec<Message> = serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    match messages.first() {
        Some(m) if m.role == Role::System => Ok(messages),
        _ => bail!("{}: first message is not role=system, refusing to load", path.display()),
    }
}

/// Finds a saved transcript under `.egg/localChats/` by exact or unique
/// partial filename match (`o <name>`, §4.12).
pub fn find_snapshot(project_root: &Path, name: &str) -> Result<PathBuf> {
    let dir = project_root.join(STATE_DIR).join(LOCAL_CHATS_DIR);
    let exact = dir.join(name);
    if exact.is_file() {
        return Ok(exact);
    }
    let exact_json = dir.join(format!("{name}.json"));
    if exact_json.is_file() {
        return Ok(exact_json);
    }

    let mut matches = Vec::new();
    if dir.is_dir() {
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let file_name = entry.file_name();
            let file_name = file_name.to_string_lossy();
            if file_name.contains(name) {
                matches.push(entry.path());
            }
        }
    }

    match matches.len() {
        1 => Ok(matches.remove(0)),
        0 => bail!("no saved transcript matching {name:?}"),
        n => bail!("{n} saved transcripts match {name:?}; be more specific"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn tempdir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("transcript-test-{}-{}", std::process::id(), line!()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn filename_includes_timestamp_and_sanitized_identifier() {
        let now = chrono::Utc.with_ymd_and_hms(2026, 7, 27, 10, 30, 0).unwrap();
        let name = snapshot_filename(now, "push", Some("hello world! this summary is long enough to truncate safely"));
        assert!(name.starts_with("20260727_103000_push_"));
        assert!(name.ends_with(".json"));
        assert!(!name.contains('!'));
        assert!(!name.contains(' '));
    }

    #[test]
    fn filename_without_identifier_omits_trailing_segment() {
        let now = chrono::Utc.with_ymd_and_hms(2026, 7, 27, 10, 30, 0).unwrap();
        assert_eq!(snapshot_filename(now, "exit", None), "20260727_103000_exit.json");
    }

    #[test]
    fn round_trips_save_and_load() {
        let root = tempdir();
        let messages = vec![Message::system("S"), Message::user("hi")];
        let path = save_snapshot(&root, &messages, "test", None).unwrap();
        let loaded = load_snapshot(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].role, Role::System);
    }

    #[test]
    fn rejects_transcript_not_starting_with_system() {
        let root = tempdir();
        let messages = vec![Message::user("hi")];
        let path = save_snapshot(&root, &messages, "test", None).unwrap();
        assert!(load_snapshot(&path).is_err());
    }

    #[test]
    fn finds_saved_snapshot_by_partial_name() {
        let root = tempdir();
        let messages = vec![Message::system("S")];
        let path = save_snapshot(&root, &messages, "hello_world", None).unwrap();
        let file_stub = path.file_stem().unwrap().to_string_lossy().to_string();
        let found = find_snapshot(&root, &file_stub[9..]).unwrap();
        assert_eq!(found, path);
    }
}
