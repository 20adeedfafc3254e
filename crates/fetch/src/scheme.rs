//! Source classification and host policy
//!
//! Pure functions: nothing here touches the network or the filesystem.

use std::fmt;
use std::net::IpAddr;

use sleuth_config::FetchConfig;
use url::Url;

use crate::error::{FetchError, Result};

/// Scheme names handled without registration
pub const BUILTIN_SCHEMES: &[&str] = &["http", "https", "ftp", "file", "db"];

/// URL prefixes recognized as database DSNs
pub const DSN_ENGINES: &[&str] = &[
    "mysql",
    "mariadb",
    "postgres",
    "postgresql",
    "sqlite",
    "mssql",
    "sqlserver",
    "oracle",
    "mongodb",
    "redis",
];

/// Transport/access method of a source
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scheme {
    Http,
    Https,
    Ftp,
    File,
    Database { engine: String },
    Custom(String),
}

impl Scheme {
    /// Name looked up in the allow-list
    pub fn allow_key(&self) -> &str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
            Scheme::Ftp => "ftp",
            Scheme::File => "file",
            Scheme::Database { .. } => "db",
            Scheme::Custom(name) => name,
        }
    }

    /// URL prefix as written in the source
    pub fn prefix(&self) -> &str {
        match self {
            Scheme::Database { engine } => engine,
            other => other.allow_key(),
        }
    }

    pub fn is_builtin_name(name: &str) -> bool {
        BUILTIN_SCHEMES.contains(&name)
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scheme::Database { engine } => write!(f, "db:{}", engine),
            other => f.write_str(other.allow_key()),
        }
    }
}

/// Lowercased text before `://`, if it is a syntactically valid scheme
fn prefix_of(source: &str) -> Option<String> {
    let (prefix, _) = source.trim().split_once("://")?;
    let valid = !prefix.is_empty()
        && prefix.starts_with(|c: char| c.is_ascii_alphabetic())
        && prefix
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then(|| prefix.to_ascii_lowercase())
}

/// Determine the scheme of `source` and check it against the allow-list
///
/// `is_registered` tells whether a custom handler exists for a prefix.
pub fn classify<F>(source: &str, config: &FetchConfig, is_registered: F) -> Result<Scheme>
where
    F: Fn(&str) -> bool,
{
    let Some(prefix) = prefix_of(source) else {
        return Err(FetchError::UnsupportedScheme(format!(
            "no scheme prefix in '{}'",
            source
        )));
    };

    let scheme = match prefix.as_str() {
        "http" => Scheme::Http,
        "https" => Scheme::Https,
        "ftp" => Scheme::Ftp,
        "file" => Scheme::File,
        engine if DSN_ENGINES.contains(&engine) => Scheme::Database {
            engine: engine.to_string(),
        },
        name if is_registered(name) => Scheme::Custom(name.to_string()),
        other => {
            return Err(FetchError::UnsupportedScheme(format!(
                "unknown scheme '{}'",
                other
            )))
        }
    };

    if !config.is_scheme_allowed(scheme.allow_key()) {
        return Err(FetchError::UnsupportedScheme(format!(
            "scheme '{}' is not allowed",
            scheme.allow_key()
        )));
    }

    Ok(scheme)
}

/// Host named by `source`, if any
pub fn host_of(source: &str) -> Result<Option<String>> {
    let url = Url::parse(source.trim())
        .map_err(|e| FetchError::invalid_source(source, e.to_string()))?;
    Ok(url
        .host_str()
        .map(normalize_host)
        .filter(|h| !h.is_empty()))
}

fn normalize_host(host: &str) -> String {
    host.trim_start_matches('[')
        .trim_end_matches(']')
        .trim_end_matches('.')
        .to_ascii_lowercase()
}

/// Whether `host` matches the deny-list
///
/// Entries match exactly (IP literals by value); an entry starting with
/// `.` also matches every subdomain.
pub fn is_blocked(host: &str, config: &FetchConfig) -> bool {
    let host = normalize_host(host);
    let host_ip = host.parse::<IpAddr>().ok().map(canonical_ip);

    config.blocked_hosts.iter().any(|entry| {
        let entry = normalize_host(entry);
        if let Some(domain) = entry.strip_prefix('.') {
            return host == domain || host.ends_with(&entry);
        }
        match (host_ip, entry.parse::<IpAddr>().ok().map(canonical_ip)) {
            (Some(a), Some(b)) => a == b,
            _ => host == entry,
        }
    })
}

/// IPv4-mapped IPv6 addresses compare as their IPv4 form
fn canonical_ip(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V6(v6) => v6.to_ipv4_mapped().map(IpAddr::V4).unwrap_or(ip),
        v4 => v4,
    }
}

/// Fail with `BlockedHost` when the source targets a denied host
pub fn check_host(source: &str, config: &FetchConfig) -> Result<()> {
    if let Some(host) = host_of(source)? {
        if is_blocked(&host, config) {
            return Err(FetchError::BlockedHost(host));
        }
    }
    Ok(())
}
