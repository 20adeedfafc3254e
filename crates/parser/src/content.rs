//! Content parser: JSON, XML, HTML and plain-text normalization

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::heuristics::{LineAnnotation, LogAnnotator};
use crate::{ContentKind, ParseError};

const MAX_KEY_ERROR_LINES: usize = 5;
const MAX_KEY_IPS: usize = 10;
const HTML_WIDTH: usize = 100;

/// Aggregate view over the normalized text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentSummary {
    pub line_count: usize,
    pub error_count: usize,
    pub warning_count: usize,
    pub ip_addresses: Vec<String>,
    pub looks_like_log: bool,
    pub key_points: Vec<String>,
}

impl ContentSummary {
    /// One-line human description
    pub fn headline(&self) -> String {
        let mut out = format!("{} lines", self.line_count);
        if self.error_count > 0 {
            out.push_str(&format!(", {} errors", self.error_count));
        }
        if self.warning_count > 0 {
            out.push_str(&format!(", {} warnings", self.warning_count));
        }
        out
    }
}

/// Normalized payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedContent {
    pub kind: ContentKind,
    pub text: String,
    #[serde(default)]
    pub annotations: Vec<LineAnnotation>,
    #[serde(default)]
    pub summary: ContentSummary,
    /// Non-fatal decode problems encountered on the way
    #[serde(default)]
    pub notes: Vec<String>,
}

impl ParsedContent {
    /// Lines flagged as likely diagnostic signal, with their 1-based numbers
    pub fn signal_lines(&self) -> Vec<(usize, &str)> {
        let lines: Vec<&str> = self.text.lines().collect();
        self.annotations
            .iter()
            .filter(|a| a.signal)
            .filter_map(|a| lines.get(a.line - 1).map(|l| (a.line, *l)))
            .collect()
    }

    /// Lines at error severity or worse
    pub fn error_lines(&self) -> Vec<&str> {
        let lines: Vec<&str> = self.text.lines().collect();
        self.annotations
            .iter()
            .filter(|a| a.is_error())
            .filter_map(|a| lines.get(a.line - 1).copied())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Hint {
    Json,
    Xml,
    Html,
    None,
}

impl Hint {
    fn from_declared(declared: Option<&str>) -> Self {
        let Some(declared) = declared else {
            return Hint::None;
        };
        let mime = declared
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .trim_start_matches('.')
            .to_ascii_lowercase();

        if mime == "json" || mime.ends_with("/json") || mime.ends_with("+json") {
            Hint::Json
        } else if mime == "html" || mime == "htm" || mime == "text/html" {
            Hint::Html
        } else if mime == "xml" || mime.ends_with("/xml") || mime.ends_with("+xml") {
            Hint::Xml
        } else {
            Hint::None
        }
    }
}

/// Dispatches raw content to a format decoder
#[derive(Debug, Clone, Default)]
pub struct ContentParser {
    annotator: LogAnnotator,
}

impl ContentParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize raw bytes; never fails, worst case yields `unknown`
    pub fn parse(&self, raw: &[u8], declared: Option<&str>) -> ParsedContent {
        let mut notes = Vec::new();

        let (decoded, valid_utf8) = match std::str::from_utf8(raw) {
            Ok(s) => (s.to_string(), true),
            Err(_) => {
                notes.push(ParseError::Encoding.to_string());
                (String::from_utf8_lossy(raw).into_owned(), false)
            }
        };

        if decoded.trim().is_empty() {
            return ParsedContent {
                kind: ContentKind::Unknown,
                text: decoded,
                annotations: Vec::new(),
                summary: ContentSummary::default(),
                notes,
            };
        }

        if valid_utf8 {
            let hint = Hint::from_declared(declared);
            if let Some(parsed) = self.parse_structured(&decoded, hint, &mut notes) {
                return parsed;
            }
        }

        let kind = if valid_utf8 {
            ContentKind::Text
        } else {
            ContentKind::Unknown
        };
        self.plain(kind, decoded, notes)
    }

    fn parse_structured(
        &self,
        text: &str,
        hint: Hint,
        notes: &mut Vec<String>,
    ) -> Option<ParsedContent> {
        let first = text.trim_start().chars().next();
        let looks_html = looks_like_html(text);

        match hint {
            Hint::Json => self
                .try_json(text, notes, true)
                .or_else(|| self.try_xml(text, notes, false)),
            Hint::Xml => self
                .try_xml(text, notes, true)
                .or_else(|| self.try_json(text, notes, false)),
            Hint::Html => Some(self.render_html(text, notes.clone())),
            Hint::None => match first {
                Some('{') | Some('[') => self.try_json(text, notes, false),
                Some('<') if looks_html => Some(self.render_html(text, notes.clone())),
                Some('<') => self.try_xml(text, notes, false),
                _ => None,
            },
        }
    }

    fn try_json(
        &self,
        text: &str,
        notes: &mut Vec<String>,
        declared: bool,
    ) -> Option<ParsedContent> {
        match serde_json::from_str::<serde_json::Value>(text) {
            Ok(value) => {
                let normalized =
                    serde_json::to_string_pretty(&value).unwrap_or_else(|_| text.to_string());
                Some(self.structured(ContentKind::Json, normalized, notes.clone()))
            }
            Err(e) => {
                debug!("JSON decode failed: {}", e);
                if declared {
                    notes.push(ParseError::Json(e.to_string()).to_string());
                }
                None
            }
        }
    }

    fn try_xml(
        &self,
        text: &str,
        notes: &mut Vec<String>,
        declared: bool,
    ) -> Option<ParsedContent> {
        match roxmltree::Document::parse(text) {
            Ok(doc) => {
                let normalized = xml_outline(&doc);
                Some(self.structured(ContentKind::Xml, normalized, notes.clone()))
            }
            Err(e) => {
                debug!("XML decode failed: {}", e);
                if declared {
                    notes.push(ParseError::Xml(e.to_string()).to_string());
                }
                None
            }
        }
    }

    fn render_html(&self, text: &str, mut notes: Vec<String>) -> ParsedContent {
        let rendered = html2text::from_read(text.as_bytes(), HTML_WIDTH);
        notes.push("rendered from HTML".to_string());
        self.plain(ContentKind::Text, rendered, notes)
    }

    fn structured(&self, kind: ContentKind, text: String, notes: Vec<String>) -> ParsedContent {
        let summary = ContentSummary {
            line_count: text.lines().count(),
            ..ContentSummary::default()
        };
        ParsedContent {
            kind,
            text,
            annotations: Vec::new(),
            summary,
            notes,
        }
    }

    fn plain(&self, kind: ContentKind, text: String, notes: Vec<String>) -> ParsedContent {
        let annotations = self.annotator.annotate(&text);
        let summary = self.summarize(&text, &annotations);
        ParsedContent {
            kind,
            text,
            annotations,
            summary,
            notes,
        }
    }

    fn summarize(&self, text: &str, annotations: &[LineAnnotation]) -> ContentSummary {
        let lines: Vec<&str> = text.lines().collect();
        let error_lines: Vec<&str> = annotations
            .iter()
            .filter(|a| a.is_error())
            .filter_map(|a| lines.get(a.line - 1).map(|l| l.trim()))
            .collect();
        let warning_count = annotations.iter().filter(|a| a.is_warning()).count();
        let ip_addresses = self.annotator.ip_addresses(text);

        let mut key_points = Vec::new();
        if !error_lines.is_empty() {
            key_points.push(format!("Found {} error lines:", error_lines.len()));
            key_points.extend(
                error_lines
                    .iter()
                    .take(MAX_KEY_ERROR_LINES)
                    .map(|l| l.to_string()),
            );
        }
        if !ip_addresses.is_empty() {
            let shown: Vec<&str> = ip_addresses
                .iter()
                .take(MAX_KEY_IPS)
                .map(String::as_str)
                .collect();
            key_points.push(format!("IP addresses involved: {}", shown.join(", ")));
        }

        ContentSummary {
            line_count: lines.len(),
            error_count: error_lines.len(),
            warning_count,
            ip_addresses,
            looks_like_log: self.annotator.looks_like_log(text),
            key_points,
        }
    }
}

fn looks_like_html(text: &str) -> bool {
    let head: String = text
        .trim_start()
        .chars()
        .take(64)
        .collect::<String>()
        .to_ascii_lowercase();
    head.starts_with("<!doctype html") || head.starts_with("<html")
}

/// One line per element carrying text or attributes: `a/b/c [@k=v]: text`
fn xml_outline(doc: &roxmltree::Document) -> String {
    let mut lines = Vec::new();

    for node in doc.descendants().filter(|n| n.is_element()) {
        let mut path: Vec<&str> = node
            .ancestors()
            .filter(|a| a.is_element())
            .map(|a| a.tag_name().name())
            .collect();
        path.reverse();

        let own_text: Vec<&str> = node
            .children()
            .filter(|c| c.is_text())
            .filter_map(|c| c.text())
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect();
        let attrs: Vec<String> = node
            .attributes()
            .map(|a| format!("@{}={}", a.name(), a.value()))
            .collect();

        if own_text.is_empty() && attrs.is_empty() {
            continue;
        }

        let mut line = path.join("/");
        if !attrs.is_empty() {
            line.push_str(&format!(" [{}]", attrs.join(" ")));
        }
        if !own_text.is_empty() {
            line.push_str(": ");
            line.push_str(&own_text.join(" "));
        }
        lines.push(line);
    }

    if lines.is_empty() {
        doc.root_element().tag_name().name().to_string()
    } else {
        lines.join("\n")
    }
}
