//! CLI command implementations.
//!
//! Each submodule corresponds to a top-level `agentflow` command. Commands
//! return `Err(String)` with a printable message; `main` turns that into a
//! non-zero exit.

pub mod run;
pub mod tools;
pub mod validate;

use std::path::Path;

/// Load `.env.local` then `.env` from the working directory.
///
/// Variables already present in the environment are never overridden, so
/// `.env.local` wins over `.env` and both lose to the real environment.
pub fn load_dotenv() {
    for filename in &[".env.local", ".env"] {
        load_env_file(Path::new(filename));
    }
}

pub(crate) fn load_env_file(path: &Path) {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(_) => return,
    };

    for (key, value) in parse_env_lines(&content) {
        if std::env::var(&key).is_err() {
            std::env::set_var(&key, &value);
        }
    }
    tracing::info!("[Env] Loaded environment from '{}'", path.display());
}

/// Parse `KEY=VALUE` lines, skipping comments and blanks and stripping one
/// pair of matching quotes around the value.
pub fn parse_env_lines(content: &str) -> Vec<(String, String)> {
    let mut vars = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim().trim_start_matches("export ").trim();
        if key.is_empty() {
            continue;
        }
        let mut value = value.trim();
        if value.len() >= 2
            && ((value.starts_with('"') && value.ends_with('"'))
                || (value.starts_with('\'') && value.ends_with('\'')))
        {
            value = &value[1..value.len() - 1];
        }
        vars.push((key.to_string(), value.to_string()));
    }
    vars
}

/// Pretty-print a JSON value to stdout.
pub fn print_json(value: &serde_json::Value) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
    );
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_lines() {
        let vars = parse_env_lines(
            "# comment\n\nGEMINI_API_KEY=abc\nexport MODEL = \"gemini-pro\"\nQUOTED='x y'\nnot a pair\n",
        );
        assert_eq!(
            vars,
            vec![
                ("GEMINI_API_KEY".to_string(), "abc".to_string()),
                ("MODEL".to_string(), "gemini-pro".to_string()),
                ("QUOTED".to_string(), "x y".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_env_keeps_lone_quote() {
        let vars = parse_env_lines("A=\"");
        assert_eq!(vars, vec![("A".to_string(), "\"".to_string())]);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghijkl", 6), "abcde…");
    }
}
