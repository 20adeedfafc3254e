//! Log line heuristics
//!
//! Recognizes timestamps, severity tokens, stack-trace lines and IPv4
//! addresses. Annotations only describe lines; the text is never changed.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

static TIMESTAMP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d{4}-\d{2}-\d{2}[ T]\d{2}:\d{2}:\d{2}").unwrap());

static IPV4_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:\d{1,3}\.){3}\d{1,3}\b").unwrap());

static FATAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:fatal|critical|panic)\b").unwrap());

static ERROR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:\w*error|\w*exception|failed|failure)\b").unwrap());

static WARN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b(?:warn|warning)\b").unwrap());

static INFO_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\binfo\b").unwrap());

static DEBUG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b(?:debug|trace)\b").unwrap());

static STACK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^\s+at\s+\S+\(.*\)|^\s+at\s+\S+:\d+|Traceback \(most recent call last\)|^\s*Caused by:|panicked at|^\s*File ".+", line \d+"#,
    )
    .unwrap()
});

/// Severity token found on a line
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
            Severity::Fatal => "FATAL",
        };
        f.write_str(name)
    }
}

/// Markers found on a single line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineAnnotation {
    /// 1-based line number
    pub line: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub stack_trace: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ip_addresses: Vec<String>,
    /// Likely diagnostic signal rather than noise
    pub signal: bool,
}

impl LineAnnotation {
    pub fn is_error(&self) -> bool {
        matches!(self.severity, Some(s) if s >= Severity::Error)
    }

    pub fn is_warning(&self) -> bool {
        self.severity == Some(Severity::Warn)
    }
}

/// Line-by-line marker scanner
#[derive(Debug, Clone, Default)]
pub struct LogAnnotator;

impl LogAnnotator {
    pub fn new() -> Self {
        Self
    }

    /// Annotate one line; `None` when the line carries no marker at all
    pub fn annotate_line(&self, number: usize, line: &str) -> Option<LineAnnotation> {
        if line.trim().is_empty() {
            return None;
        }

        let severity = severity_of(line);
        let timestamp = TIMESTAMP_RE.find(line).map(|m| m.as_str().to_string());
        let stack_trace = STACK_RE.is_match(line);
        let ip_addresses: Vec<String> = IPV4_RE
            .find_iter(line)
            .map(|m| m.as_str().to_string())
            .collect();

        if severity.is_none() && timestamp.is_none() && !stack_trace && ip_addresses.is_empty() {
            return None;
        }

        let signal = stack_trace || matches!(severity, Some(s) if s >= Severity::Warn);

        Some(LineAnnotation {
            line: number,
            severity,
            timestamp,
            stack_trace,
            ip_addresses,
            signal,
        })
    }

    /// Annotate every line that carries a marker
    pub fn annotate(&self, text: &str) -> Vec<LineAnnotation> {
        text.lines()
            .enumerate()
            .filter_map(|(i, line)| self.annotate_line(i + 1, line))
            .collect()
    }

    /// Whether the text reads like a log: any timestamp or severity token
    pub fn looks_like_log(&self, text: &str) -> bool {
        TIMESTAMP_RE.is_match(text) || text.lines().any(|l| severity_of(l).is_some())
    }

    /// Distinct IPv4 addresses in order of first appearance
    pub fn ip_addresses(&self, text: &str) -> Vec<String> {
        let mut seen = BTreeSet::new();
        IPV4_RE
            .find_iter(text)
            .map(|m| m.as_str())
            .filter(|ip| seen.insert(*ip))
            .map(String::from)
            .collect()
    }
}

fn severity_of(line: &str) -> Option<Severity> {
    if FATAL_RE.is_match(line) {
        Some(Severity::Fatal)
    } else if ERROR_RE.is_match(line) {
        Some(Severity::Error)
    } else if WARN_RE.is_match(line) {
        Some(Severity::Warn)
    } else if INFO_RE.is_match(line) {
        Some(Severity::Info)
    } else if DEBUG_RE.is_match(line) {
        Some(Severity::Debug)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_priority() {
        assert_eq!(severity_of("FATAL error in worker"), Some(Severity::Fatal));
        assert_eq!(severity_of("ERROR: disk full"), Some(Severity::Error));
        assert_eq!(
            severity_of("java.lang.IllegalStateException: boom"),
            Some(Severity::Error)
        );
        assert_eq!(severity_of("warning: low memory"), Some(Severity::Warn));
        assert_eq!(severity_of("[info] started"), Some(Severity::Info));
        assert_eq!(severity_of("trace id=1"), Some(Severity::Debug));
        assert_eq!(severity_of("nothing to see"), None);
    }

    #[test]
    fn test_severity_is_word_bounded() {
        assert_eq!(severity_of("information about errorless runs"), None);
    }

    #[test]
    fn test_stack_trace_lines() {
        let annotator = LogAnnotator::new();
        let java = annotator
            .annotate_line(1, "    at com.example.Foo.bar(Foo.java:42)")
            .unwrap();
        assert!(java.stack_trace);
        assert!(java.signal);

        let python = annotator
            .annotate_line(2, "Traceback (most recent call last):")
            .unwrap();
        assert!(python.stack_trace);

        let rust = annotator
            .annotate_line(3, "thread 'main' panicked at src/main.rs:4:5")
            .unwrap();
        assert!(rust.stack_trace);
    }

    #[test]
    fn test_info_line_is_not_signal() {
        let annotator = LogAnnotator::new();
        let ann = annotator
            .annotate_line(1, "2024-01-01 10:00:00 INFO service started")
            .unwrap();
        assert_eq!(ann.severity, Some(Severity::Info));
        assert_eq!(ann.timestamp.as_deref(), Some("2024-01-01 10:00:00"));
        assert!(!ann.signal);
    }

    #[test]
    fn test_plain_line_has_no_annotation() {
        let annotator = LogAnnotator::new();
        assert!(annotator.annotate_line(1, "hello world").is_none());
        assert!(annotator.annotate_line(2, "   ").is_none());
    }

    #[test]
    fn test_ip_addresses_distinct() {
        let annotator = LogAnnotator::new();
        let ips = annotator.ip_addresses("from 10.0.0.1 to 10.0.0.2 and back to 10.0.0.1");
        assert_eq!(ips, vec!["10.0.0.1", "10.0.0.2"]);
    }
}
