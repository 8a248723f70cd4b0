use anyhow::{Context, Result};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use trailwise_game::{SessionSummary, read_session_file};

const SESSION_FILE_PATTERN: &str = r"^game_.*\.jsonl$";

/// Sessions recovered from a log directory.
#[derive(Debug, Clone, Default)]
pub struct SessionSet {
    pub sessions: Vec<SessionSummary>,
    /// Files that matched the naming scheme but could not be decoded.
    pub skipped: Vec<PathBuf>,
}

impl SessionSet {
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Matcher for the `game_*.jsonl` session naming scheme.
///
/// # Errors
///
/// Returns an error if the pattern fails to compile.
pub fn session_file_regex() -> Result<Regex> {
    Regex::new(SESSION_FILE_PATTERN).context("invalid session file pattern")
}

/// Read every session log in `dir`, in file-name order.
///
/// A missing directory yields an empty set. Unreadable or malformed files are
/// skipped with a warning.
///
/// # Errors
///
/// Returns an error if `dir` exists but cannot be listed.
pub fn load_sessions(dir: &Path) -> Result<SessionSet> {
    let pattern = session_file_regex()?;
    let mut set = SessionSet::default();
    if !dir.exists() {
        log::info!("log directory {} does not exist yet", dir.display());
        return Ok(set);
    }
    let entries =
        fs::read_dir(dir).with_context(|| format!("failed to list {}", dir.display()))?;
    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| pattern.is_match(name))
        })
        .collect();
    paths.sort();

    for path in paths {
        match read_session_file(&path) {
            Ok(records) => {
                if let Some(summary) = SessionSummary::from_records(&records) {
                    set.sessions.push(summary);
                }
            }
            Err(err) => {
                log::warn!("skipping {}: {err}", path.display());
                set.skipped.push(path);
            }
        }
    }
    log::debug!(
        "loaded {} session(s) from {}, skipped {}",
        set.sessions.len(),
        dir.display(),
        set.skipped.len()
    );
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(label: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "trailwise-sessions-{label}-{}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        ));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    const VICTORY_LOG: &str = concat!(
        r#"{"timestamp":"2025-01-01T00:00:00+00:00","elapsed":0.0,"type":"session_start","test_mode":true}"#,
        "\n",
        r#"{"timestamp":"2025-01-01T00:00:00+00:00","elapsed":0.0,"type":"game_start","theme":"desert","difficulty":"easy","seed":7}"#,
        "\n",
    );

    #[test]
    fn only_game_jsonl_files_match() {
        let pattern = session_file_regex().unwrap();
        assert!(pattern.is_match("game_20250101_120000.jsonl"));
        assert!(pattern.is_match("game_20250101_120000_3.jsonl"));
        assert!(!pattern.is_match("game_20250101_120000.json"));
        assert!(!pattern.is_match("notes_game_1.jsonl"));
        assert!(!pattern.is_match("game_tuning.json"));
    }

    #[test]
    fn missing_directory_is_empty() {
        let dir = std::env::temp_dir().join("trailwise-sessions-never-created-0");
        let set = load_sessions(&dir).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn malformed_files_are_skipped_and_others_ignored() {
        let dir = scratch_dir("mixed");
        fs::write(dir.join("game_a.jsonl"), VICTORY_LOG).unwrap();
        fs::write(dir.join("game_b.jsonl"), "not json\n").unwrap();
        fs::write(dir.join("readme.txt"), "ignored").unwrap();
        fs::write(dir.join("game_c.jsonl"), "").unwrap();

        let set = load_sessions(&dir).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.skipped.len(), 1);
        assert_eq!(set.sessions[0].seed, Some(7));
        assert!(set.sessions[0].test_mode);
        let _ = fs::remove_dir_all(&dir);
    }
}
