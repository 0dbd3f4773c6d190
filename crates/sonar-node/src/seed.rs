//! Neighbour and key/value seed files

use sonar_wire::PeerAddr;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Seed file errors
#[derive(Debug, Error)]
pub enum SeedError {
    /// File could not be read
    #[error("cannot read {}: {}", .path.display(), .source)]
    Read {
        /// File path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// A line could not be parsed
    #[error("{}:{}: {}", .path.display(), .line, .reason)]
    Malformed {
        /// File path
        path: PathBuf,
        /// 1-based line number
        line: usize,
        /// What is wrong
        reason: String,
    },
}

/// Lines that carry data, with their 1-based line numbers
fn entries(content: &str) -> impl Iterator<Item = (usize, &str)> {
    content
        .lines()
        .enumerate()
        .map(|(index, line)| (index + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
}

fn read(path: &Path) -> Result<String, SeedError> {
    std::fs::read_to_string(path).map_err(|source| SeedError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse a neighbour list: one `host:port` per line
pub fn parse_neighbours(path: &Path, content: &str) -> Result<Vec<PeerAddr>, SeedError> {
    entries(content)
        .map(|(line, text)| {
            text.parse::<PeerAddr>().map_err(|e| SeedError::Malformed {
                path: path.to_path_buf(),
                line,
                reason: e.to_string(),
            })
        })
        .collect()
}

/// Parse a key/value table: one `key value` per line
pub fn parse_keys(path: &Path, content: &str) -> Result<HashMap<String, String>, SeedError> {
    let mut table = HashMap::new();
    for (line, text) in entries(content) {
        let fields: Vec<&str> = text.split_whitespace().collect();
        match fields.as_slice() {
            [key, value] => {
                table.insert(key.to_string(), value.to_string());
            }
            _ => {
                return Err(SeedError::Malformed {
                    path: path.to_path_buf(),
                    line,
                    reason: format!("expected \"key value\", got {:?}", text),
                })
            }
        }
    }
    Ok(table)
}

/// Load a neighbour file
pub fn load_neighbours(path: &Path) -> Result<Vec<PeerAddr>, SeedError> {
    tracing::info!("Loading neighbours from {:?}", path);
    parse_neighbours(path, &read(path)?)
}

/// Load a key/value file
pub fn load_keys(path: &Path) -> Result<HashMap<String, String>, SeedError> {
    tracing::info!("Loading keys from {:?}", path);
    parse_keys(path, &read(path)?)
}
