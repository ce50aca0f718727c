//! JSON test fixtures.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::de::DeserializeOwned;

/// Directory holding the fixtures of the crate being tested.
pub fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../testdata")
}

/// Reads a JSON document.
pub fn load_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> anyhow::Result<T> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading fixture {}", path.display()))?;
    parse_json(&text).with_context(|| format!("parsing fixture {}", path.display()))
}

/// Reads a newline-delimited JSON document, one value per line.
pub fn load_json_lines<T: DeserializeOwned>(path: impl AsRef<Path>) -> anyhow::Result<Vec<T>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading fixture {}", path.display()))?;
    parse_json_lines(&text).with_context(|| format!("parsing fixture {}", path.display()))
}

pub fn parse_json<T: DeserializeOwned>(text: &str) -> anyhow::Result<T> {
    Ok(serde_json::from_str(text)?)
}

/// Parses newline-delimited JSON, skipping blank lines.
pub fn parse_json_lines<T: DeserializeOwned>(text: &str) -> anyhow::Result<Vec<T>> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line).with_context(|| format!("line {}", i + 1))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_lines() {
        let rows: Vec<Vec<u32>> = parse_json_lines("[1, 2]\n\n[3]\n").unwrap();
        assert_eq!(rows, vec![vec![1, 2], vec![3]]);

        let err = parse_json_lines::<Vec<u32>>("[1]\n{").unwrap_err();
        assert!(format!("{err:#}").contains("line 2"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_json::<Vec<u32>>(fixtures_dir().join("does-not-exist.json")).unwrap_err();
        assert!(format!("{err:#}").contains("does-not-exist.json"));
    }
}
