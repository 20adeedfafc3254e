//! Aggregate view over a batch of fetched sources

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use sleuth_fetch::SourceReport;

const MAX_PATTERNS: usize = 10;
const MIN_PATTERN_LEN: usize = 4;

/// One fetched source, successful or not
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRow {
    pub url: String,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A word recurring across error lines
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPattern {
    pub pattern: String,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FetchDigest {
    pub total_sources: usize,
    pub successful: usize,
    pub failed: usize,
    pub total_size: usize,
    pub error_count: usize,
    pub warning_count: usize,
    pub sources: Vec<SourceRow>,
    pub key_findings: Vec<String>,
    pub error_patterns: Vec<ErrorPattern>,
    pub recommendations: Vec<String>,
}

impl FetchDigest {
    pub fn from_reports(reports: &[SourceReport]) -> Self {
        let mut digest = FetchDigest {
            total_sources: reports.len(),
            ..Default::default()
        };
        let mut errors: Vec<&str> = Vec::new();
        let mut warnings = 0usize;

        for report in reports {
            let url = report.link.url.clone();
            let kind = report.link.kind.to_string();

            match &report.result {
                Ok(result) => {
                    let parsed = &result.parsed;
                    digest.successful += 1;
                    digest.total_size += result.size;
                    digest.error_count += parsed.summary.error_count;
                    digest.warning_count += parsed.summary.warning_count;
                    digest
                        .key_findings
                        .extend(parsed.summary.key_points.iter().cloned());

                    errors.extend(parsed.error_lines());
                    warnings += parsed
                        .annotations
                        .iter()
                        .filter(|a| a.is_warning())
                        .count();

                    digest.sources.push(SourceRow {
                        url,
                        kind,
                        size: Some(result.size),
                        content_type: Some(result.content_type.to_string()),
                        summary: Some(parsed.summary.headline()),
                        error: None,
                    });
                }
                Err(e) => {
                    digest.failed += 1;
                    digest.sources.push(SourceRow {
                        url,
                        kind,
                        size: None,
                        content_type: None,
                        summary: None,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        digest.error_patterns = error_patterns(&errors);
        digest.recommendations = recommendations(errors.len(), warnings);
        digest
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

/// Most frequent words across error lines
///
/// Words are lowercased and split on whitespace; short and purely numeric
/// words are skipped. Ties keep first-seen order.
pub fn error_patterns<S: AsRef<str>>(lines: &[S]) -> Vec<ErrorPattern> {
    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, usize> = HashMap::new();

    for line in lines {
        for word in line.as_ref().to_lowercase().split_whitespace() {
            if word.chars().count() < MIN_PATTERN_LEN || word.chars().all(|c| c.is_ascii_digit()) {
                continue;
            }
            let count = counts.entry(word.to_string()).or_insert(0);
            if *count == 0 {
                order.push(word.to_string());
            }
            *count += 1;
        }
    }

    let mut patterns: Vec<ErrorPattern> = order
        .into_iter()
        .map(|pattern| {
            let count = counts[&pattern];
            ErrorPattern { pattern, count }
        })
        .collect();
    patterns.sort_by(|a, b| b.count.cmp(&a.count));
    patterns.truncate(MAX_PATTERNS);
    patterns
}

fn recommendations(errors: usize, warnings: usize) -> Vec<String> {
    let mut out = Vec::new();
    if errors > 0 {
        out.push(format!("Found {} errors, address these first", errors));
    }
    if warnings > 0 {
        out.push(format!("Found {} warnings, worth reviewing", warnings));
    }
    out
}
