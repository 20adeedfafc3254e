//! Link extraction from free-form problem descriptions

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

static HTTP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\bhttps?://[^\s<>"'{}|\\^`\[\]]+"#).unwrap());

static FTP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(?i)\bftp://[^\s<>"']+"#).unwrap());

static FILE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(?i)\bfile://[^\s<>"']+"#).unwrap());

static DSN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)\b(?:mysql|mariadb|postgres|postgresql|sqlite|mssql|sqlserver|oracle|mongodb|redis)://[^\s<>"']+"#,
    )
    .unwrap()
});

// Bare paths need a separator before them; the path itself is group 1.
static LOG_PATH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:^|[\s(\["'=])(/(?:var/log|logs?)/[^\s<>"')\]]+|/[^\s<>"')\]]+\.log\b)"#)
        .unwrap()
});

const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', ')', ']', '}', '\'', '"'];

/// Kind of link found in text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    Http,
    Ftp,
    File,
    Database,
    LogPath,
}

impl fmt::Display for LinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LinkKind::Http => "http",
            LinkKind::Ftp => "ftp",
            LinkKind::File => "file",
            LinkKind::Database => "database",
            LinkKind::LogPath => "log_path",
        };
        f.write_str(name)
    }
}

/// A fetchable source mentioned in text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedLink {
    /// Source string ready for the fetcher (bare paths become `file://`)
    pub url: String,
    /// Text exactly as it appeared
    pub raw: String,
    pub kind: LinkKind,
    pub start: usize,
    pub end: usize,
}

/// Find every fetchable source in `text`, ordered by position, without duplicates
pub fn extract_links(text: &str) -> Vec<ExtractedLink> {
    let mut found = Vec::new();

    let patterns: [(&Regex, LinkKind); 4] = [
        (&*HTTP_RE, LinkKind::Http),
        (&*FTP_RE, LinkKind::Ftp),
        (&*FILE_RE, LinkKind::File),
        (&*DSN_RE, LinkKind::Database),
    ];
    for (re, kind) in patterns {
        for m in re.find_iter(text) {
            if let Some(link) = make_link(m.as_str(), m.start(), kind) {
                found.push(link);
            }
        }
    }

    for caps in LOG_PATH_RE.captures_iter(text) {
        if let Some(m) = caps.get(1) {
            if let Some(link) = make_link(m.as_str(), m.start(), LinkKind::LogPath) {
                found.push(link);
            }
        }
    }

    found.sort_by_key(|l| (l.start, std::cmp::Reverse(l.end)));

    let mut seen = HashSet::new();
    let mut accepted: Vec<ExtractedLink> = Vec::new();
    for link in found {
        let nested = accepted
            .iter()
            .any(|a| link.start >= a.start && link.end <= a.end);
        if nested || !seen.insert(link.url.clone()) {
            continue;
        }
        accepted.push(link);
    }
    accepted
}

fn make_link(matched: &str, start: usize, kind: LinkKind) -> Option<ExtractedLink> {
    let raw = matched.trim_end_matches(TRAILING_PUNCTUATION);
    if raw.is_empty() || raw.ends_with("://") {
        return None;
    }

    let url = match kind {
        LinkKind::LogPath => format!("file://{}", raw),
        _ => raw.to_string(),
    };

    Some(ExtractedLink {
        url,
        raw: raw.to_string(),
        kind,
        start,
        end: start + raw.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_punctuation_trimmed() {
        let link = make_link("https://example.com/a.log).", 0, LinkKind::Http).unwrap();
        assert_eq!(link.url, "https://example.com/a.log");
        assert_eq!(link.end, link.raw.len());
    }

    #[test]
    fn test_bare_scheme_rejected() {
        assert!(make_link("http://", 0, LinkKind::Http).is_none());
    }
}
