//! Server list input.
//!
//! One host identifier per line: `host`, `host\instance` or `host,port`.
//! Blank lines and `#` comments are ignored.

use crate::error::AdvisorError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use tracing::{debug, warn};

static SERVER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    let pattern =
        r"^(?P<host>[A-Za-z0-9_.\-]+)(\\(?P<instance>[A-Za-z0-9_$\-]+))?(,(?P<port>\d{1,5}))?$";
    Regex::new(pattern)
        .unwrap_or_else(|e| panic!("Internal error: invalid regex pattern '{}': {}", pattern, e))
});

/// A parsed server list entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerTarget {
    /// The entry as written in the list; used as the report's server name.
    pub name: String,
    pub host: String,
    pub instance: Option<String>,
    pub port: Option<u16>,
}

impl ServerTarget {
    /// Parse a single entry, returning `None` when it is not a host identifier.
    pub fn parse(entry: &str) -> Option<Self> {
        let caps = SERVER_PATTERN.captures(entry)?;
        let port = match caps.name("port") {
            Some(p) => Some(p.as_str().parse::<u16>().ok()?),
            None => None,
        };

        Some(Self {
            name: entry.to_string(),
            host: caps["host"].to_string(),
            instance: caps.name("instance").map(|m| m.as_str().to_string()),
            port,
        })
    }
}

/// Read the server list, failing if the file cannot be read.
pub async fn read_server_list(path: &Path) -> Result<Vec<ServerTarget>, AdvisorError> {
    let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
        AdvisorError::precondition(format!(
            "cannot read server list {}: {}",
            path.display(),
            e
        ))
    })?;

    let servers = parse_server_list(&contents);
    debug!("Read {} server(s) from {}", servers.len(), path.display());
    Ok(servers)
}

/// Parse server list contents, skipping blanks, comments and invalid entries.
pub fn parse_server_list(contents: &str) -> Vec<ServerTarget> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let target = ServerTarget::parse(line);
            if target.is_none() {
                warn!("Skipping invalid server list entry: {:?}", line);
            }
            target
        })
        .collect()
}
