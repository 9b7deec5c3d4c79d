//! Structural file summaries
//!
//! A [`FileSummary`] is the compact digest of one source file: public
//! surface, imports, top-level declarations, a bounded complexity score,
//! and a one-line description. Summaries are derived from
//! [`RawSymbols`](crate::parser::RawSymbols) here; parsing lives behind
//! the [`SymbolParser`](crate::parser::SymbolParser) seam.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::parser::RawSymbols;

/// Name prefix marking a symbol private when no explicit export list exists
pub const DEFAULT_PRIVATE_PREFIX: &str = "_";

/// Denominator of the complexity heuristic: a file with a weighted
/// structural count of 50 or more saturates at 1.0.
const COMPLEXITY_SCALE: f64 = 50.0;

/// Hard cap on `short_summary` length, in characters
const SHORT_SUMMARY_MAX: usize = 300;

/// How many class/function names the short summary lists before "+N more"
const SUMMARY_NAME_LIMIT: usize = 3;

/// Compact structural digest of one source file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileSummary {
    /// Project-relative path, `/`-separated
    pub path: String,
    /// Public surface: declared export list if present, else public
    /// top-level declarations
    pub exports: Vec<String>,
    /// Raw module identifiers, deduplicated and sorted
    pub imports: Vec<String>,
    /// Top-level class names
    pub classes: Vec<String>,
    /// Top-level function names
    pub functions: Vec<String>,
    /// One-line description, capped at 300 characters
    pub short_summary: String,
    pub loc_count: usize,
    /// Bounded ranking heuristic in `[0, 1]`, monotonic in structural
    /// counts. Not cyclomatic complexity.
    pub complexity_score: f64,
    pub last_updated_at: DateTime<Utc>,
}

impl FileSummary {
    /// Derive a summary from raw parsed symbols.
    pub fn from_raw(path: &str, raw: RawSymbols, private_prefix: &str) -> Self {
        let exports = match &raw.declared_exports {
            Some(declared) => declared.clone(),
            None => raw
                .classes
                .iter()
                .chain(raw.functions.iter())
                .filter(|name| !name.starts_with(private_prefix))
                .cloned()
                .collect(),
        };

        let mut imports = raw.imports.clone();
        imports.sort();
        imports.dedup();

        let complexity_score = complexity_score(
            raw.classes.len(),
            raw.functions.len(),
            raw.loop_count,
            raw.conditional_count,
        );
        let short_summary = short_summary(path, raw.doc_line.as_deref(), &raw.classes, &raw.functions);

        Self {
            path: path.to_string(),
            exports,
            imports,
            classes: raw.classes,
            functions: raw.functions,
            short_summary,
            loc_count: raw.loc_count,
            complexity_score,
            last_updated_at: Utc::now(),
        }
    }

    /// Minimal summary for a file that could not be read or parsed.
    /// Keeps the pipeline moving; the reason lands in the description.
    pub fn unparsed(path: &str, reason: &str) -> Self {
        Self {
            path: path.to_string(),
            exports: Vec::new(),
            imports: Vec::new(),
            classes: Vec::new(),
            functions: Vec::new(),
            short_summary: truncate(&format!("Unparsed: {reason}"), SHORT_SUMMARY_MAX),
            loc_count: 0,
            complexity_score: 0.0,
            last_updated_at: Utc::now(),
        }
    }
}

/// `min(1.0, (2·classes + functions + loops + conditionals) / 50)`
pub fn complexity_score(
    classes: usize,
    functions: usize,
    loops: usize,
    conditionals: usize,
) -> f64 {
    let weighted = (2 * classes + functions + loops + conditionals) as f64;
    (weighted / COMPLEXITY_SCALE).min(1.0)
}

/// One-line description: module doc first line (or a title-cased filename
/// when absent), then up to three class and three function names.
fn short_summary(
    path: &str,
    doc_line: Option<&str>,
    classes: &[String],
    functions: &[String],
) -> String {
    let mut out = match doc_line {
        Some(line) if !line.trim().is_empty() => line.trim().to_string(),
        _ => title_from_path(path),
    };

    if let Some(part) = name_list("Classes", classes) {
        out.push_str(". ");
        out.push_str(&part);
    }
    if let Some(part) = name_list("Functions", functions) {
        out.push_str(". ");
        out.push_str(&part);
    }

    truncate(&out, SHORT_SUMMARY_MAX)
}

fn name_list(label: &str, names: &[String]) -> Option<String> {
    if names.is_empty() {
        return None;
    }
    let shown: Vec<&str> = names
        .iter()
        .take(SUMMARY_NAME_LIMIT)
        .map(String::as_str)
        .collect();
    let mut part = format!("{}: {}", label, shown.join(", "));
    if names.len() > SUMMARY_NAME_LIMIT {
        part.push_str(&format!(" (+{} more)", names.len() - SUMMARY_NAME_LIMIT));
    }
    Some(part)
}

/// "src/dep_graph.py" -> "Dep Graph"
fn title_from_path(path: &str) -> String {
    let stem = path
        .rsplit('/')
        .next()
        .unwrap_or(path)
        .split('.')
        .next()
        .unwrap_or(path);

    let words: Vec<String> = stem
        .split(['_', '-'])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect();

    if words.is_empty() {
        stem.to_string()
    } else {
        words.join(" ")
    }
}

/// Character-boundary-safe truncation
fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    s.chars().take(max_chars).collect()
}
