// src/core/targets.rs

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum TargetsError {
    #[error("domains list file path '{}' could not be found", .0.display())]
    NotFound(PathBuf),
    #[error("failed to read domains list '{}'", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Splits a domain list into one entry per line.
///
/// No deduplication or validation happens here: blank lines are kept and
/// simply fail resolution later.
pub fn parse_domains(content: &str) -> Vec<String> {
    content.lines().map(str::to_string).collect()
}

/// Reads the domain list at `path`.
pub fn load_domains(path: &Path) -> Result<Vec<String>, TargetsError> {
    if !path.exists() {
        return Err(TargetsError::NotFound(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path).map_err(|source| TargetsError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let domains = parse_domains(&content);
    info!(path = %path.display(), count = domains.len(), "Loaded domain list.");
    Ok(domains)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_order_duplicates_and_blank_lines() {
        let domains = parse_domains("b.example.com\r\na.example.com\n\nb.example.com\n");
        assert_eq!(
            domains,
            vec!["b.example.com", "a.example.com", "", "b.example.com"]
        );
    }

    #[test]
    fn missing_file_is_reported() {
        let path = std::env::temp_dir().join("subtocheck-rs-missing-domains.txt");
        let err = load_domains(&path).unwrap_err();
        assert!(matches!(err, TargetsError::NotFound(_)));
        assert!(err.to_string().contains("could not be found"));
    }

    #[test]
    fn loads_file_from_disk() {
        let path = std::env::temp_dir().join(format!("subtocheck-rs-domains-{}.txt", std::process::id()));
        std::fs::write(&path, "one.example.com\ntwo.example.com\n").unwrap();
        let domains = load_domains(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(domains, vec!["one.example.com", "two.example.com"]);
    }
}
