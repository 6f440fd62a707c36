//! Upstream credential resolution
//!
//! The key is looked up in order: `NVIDIA_API_KEY`, `VITE_NVIDIA_API_KEY`
//! (the name the browser build used), then a `VITE_NVIDIA_API_KEY=` line in
//! a local `.env`-style file. The full value never leaves this module except
//! wrapped in a `SecretString`.

use std::path::Path;

use secrecy::{ExposeSecret, SecretString};

const PRIMARY_ENV: &str = "NVIDIA_API_KEY";
const FALLBACK_ENV: &str = "VITE_NVIDIA_API_KEY";
const ENV_FILE_KEY: &str = "VITE_NVIDIA_API_KEY=";

/// Resolve the upstream API key from the environment, falling back to the
/// given `.env`-style file.
pub fn resolve_api_key(env_file: &Path) -> Option<SecretString> {
    non_empty_env(PRIMARY_ENV)
        .or_else(|| non_empty_env(FALLBACK_ENV))
        .or_else(|| key_from_env_file(env_file))
        .map(SecretString::from)
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Parse the key out of a `.env`-style file: first non-comment line that
/// starts with the expected name, with surrounding quotes stripped.
fn key_from_env_file(path: &Path) -> Option<String> {
    let text = std::fs::read_to_string(path).ok()?;
    let line = text
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty() && !l.starts_with('#') && l.starts_with(ENV_FILE_KEY))?;

    let mut value = line[ENV_FILE_KEY.len()..].trim();
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        value = &value[1..value.len() - 1];
    }
    (!value.is_empty()).then(|| value.to_string())
}

/// Masked hint for health reporting: `first6...last4`, never the full value.
pub fn key_hint(key: &SecretString) -> String {
    let exposed = key.expose_secret();
    if exposed.len() <= 10 {
        return "***".to_string();
    }
    format!("{}...{}", &exposed[..6], &exposed[exposed.len() - 4..])
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn env_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn env_file_key_is_parsed() {
        let file = env_file("# comment\nVITE_NVIDIA_API_KEY=nvapi-abc123\n");
        assert_eq!(key_from_env_file(file.path()).unwrap(), "nvapi-abc123");
    }

    #[test]
    fn env_file_quotes_are_stripped() {
        let file = env_file("VITE_NVIDIA_API_KEY=\"nvapi-quoted\"\n");
        assert_eq!(key_from_env_file(file.path()).unwrap(), "nvapi-quoted");
    }

    #[test]
    fn env_file_comments_and_other_keys_are_skipped() {
        let file = env_file("# VITE_NVIDIA_API_KEY=commented\nOTHER=1\n");
        assert!(key_from_env_file(file.path()).is_none());
    }

    #[test]
    fn missing_env_file_yields_none() {
        assert!(key_from_env_file(Path::new("/nonexistent/.env")).is_none());
    }

    #[test]
    fn hint_masks_the_middle() {
        let key = SecretString::from("nvapi-0123456789abcdef");
        assert_eq!(key_hint(&key), "nvapi-...cdef");
    }

    #[test]
    fn hint_never_echoes_short_keys() {
        let key = SecretString::from("short");
        assert_eq!(key_hint(&key), "***");
    }
}
