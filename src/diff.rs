//! Unified diff parser
//!
//! Parses `git diff` output into structured per-file changes. Pure text
//! processing: no VCS invocation, no filesystem access.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// Compiled once, reused across all calls to `parse_diff`
static HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^diff --git "?a/(.+?)"? "?b/(.+?)"?$"#).expect("hardcoded diff header regex")
});

/// How a file changed between the two sides of a diff
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
    Renamed,
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Added => write!(f, "added"),
            Self::Modified => write!(f, "modified"),
            Self::Deleted => write!(f, "deleted"),
            Self::Renamed => write!(f, "renamed"),
        }
    }
}

/// A single file's change, with its content lines
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileChange {
    /// Path on the new side (old side for deletions)
    pub path: String,
    pub kind: ChangeKind,
    /// Previous path, present for renames
    pub old_path: Option<String>,
    pub lines_added: usize,
    pub lines_removed: usize,
    /// Content of `+` lines, header excluded, leading marker stripped
    pub added_lines: Vec<String>,
    /// Content of `-` lines, header excluded, leading marker stripped
    pub removed_lines: Vec<String>,
}

/// Aggregate view over one diff text
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DiffReport {
    pub changes: Vec<FileChange>,
    pub files_added: Vec<String>,
    pub files_modified: Vec<String>,
    pub files_deleted: Vec<String>,
    pub files_renamed: Vec<String>,
    /// old path -> new path for every rename
    pub renames: HashMap<String, String>,
    pub total_files_changed: usize,
    pub total_lines_added: usize,
    pub total_lines_removed: usize,
}

impl DiffReport {
    /// Paths whose content exists on the new side: added + modified.
    /// These are the recompute targets for summary extraction.
    pub fn recompute_targets(&self) -> Vec<String> {
        let mut paths = self.files_added.clone();
        paths.extend(self.files_modified.iter().cloned());
        paths
    }
}

/// In-flight state for the file section currently being scanned
struct PendingChange {
    path: String,
    old_path: String,
    kind: Option<ChangeKind>,
    added_lines: Vec<String>,
    removed_lines: Vec<String>,
}

impl PendingChange {
    fn finish(self) -> FileChange {
        let kind = self.kind.unwrap_or(ChangeKind::Modified);
        let (path, old_path) = match kind {
            // Deletions only have an old side
            ChangeKind::Deleted => (self.old_path, None),
            ChangeKind::Renamed => (self.path, Some(self.old_path)),
            _ => (self.path, None),
        };
        FileChange {
            path,
            kind,
            old_path,
            lines_added: self.added_lines.len(),
            lines_removed: self.removed_lines.len(),
            added_lines: self.added_lines,
            removed_lines: self.removed_lines,
        }
    }
}

/// Parse unified diff output into a [`DiffReport`].
///
/// Handles standard `git diff` output:
/// - One [`FileChange`] per `diff --git a/... b/...` header
/// - `new file mode` marks added, `deleted file mode` deleted,
///   `rename from`/`rename to` renamed, otherwise modified
/// - Content lines are `+`/`-` lines excluding the `+++`/`---` headers
/// - Binary diffs produce a zero-line-count change
/// - Empty input produces an all-zero report
/// - Malformed segments are skipped, never fatal
pub fn parse_diff(input: &str) -> DiffReport {
    if input.is_empty() {
        return DiffReport::default();
    }

    // Normalize CRLF for Windows git output (bare \r from classic Mac too)
    let input = if input.contains('\r') {
        std::borrow::Cow::Owned(input.replace("\r\n", "\n").replace('\r', "\n"))
    } else {
        std::borrow::Cow::Borrowed(input)
    };

    let mut changes: Vec<FileChange> = Vec::new();
    let mut current: Option<PendingChange> = None;

    for line in input.lines() {
        if let Some(caps) = HEADER_RE.captures(line) {
            if let Some(pending) = current.take() {
                changes.push(pending.finish());
            }
            current = Some(PendingChange {
                old_path: caps[1].to_string(),
                path: caps[2].to_string(),
                kind: None,
                added_lines: Vec::new(),
                removed_lines: Vec::new(),
            });
            continue;
        }

        // Lines before the first header (or in a segment whose header did
        // not parse) have nowhere to attribute, so skip the segment.
        let Some(pending) = current.as_mut() else {
            continue;
        };

        // Explicit markers win over later, weaker ones: an added or deleted
        // marker is never downgraded to renamed.
        if line.starts_with("new file mode") {
            pending.kind = Some(ChangeKind::Added);
        } else if line.starts_with("deleted file mode") {
            if pending.kind.is_none() {
                pending.kind = Some(ChangeKind::Deleted);
            }
        } else if let Some(from) = line.strip_prefix("rename from ") {
            if pending.kind.is_none() {
                pending.kind = Some(ChangeKind::Renamed);
            }
            pending.old_path = from.to_string();
        } else if let Some(to) = line.strip_prefix("rename to ") {
            if pending.kind.is_none() {
                pending.kind = Some(ChangeKind::Renamed);
            }
            // Subsequent content attributes to the new path
            pending.path = to.to_string();
        } else if line.starts_with("+++") || line.starts_with("---") {
            // Hunk file headers, not content
        } else if let Some(content) = line.strip_prefix('+') {
            pending.added_lines.push(content.to_string());
        } else if let Some(content) = line.strip_prefix('-') {
            pending.removed_lines.push(content.to_string());
        }
        // Everything else (index lines, hunk headers, context lines,
        // "Binary files ... differ") carries no per-line content.
    }

    if let Some(pending) = current.take() {
        changes.push(pending.finish());
    }

    summarize(changes)
}

fn summarize(changes: Vec<FileChange>) -> DiffReport {
    let mut report = DiffReport {
        total_files_changed: changes.len(),
        ..DiffReport::default()
    };

    for change in &changes {
        report.total_lines_added += change.lines_added;
        report.total_lines_removed += change.lines_removed;
        match change.kind {
            ChangeKind::Added => report.files_added.push(change.path.clone()),
            ChangeKind::Modified => report.files_modified.push(change.path.clone()),
            ChangeKind::Deleted => report.files_deleted.push(change.path.clone()),
            ChangeKind::Renamed => {
                report.files_renamed.push(change.path.clone());
                if let Some(old) = &change.old_path {
                    report.renames.insert(old.clone(), change.path.clone());
                }
            }
        }
    }

    report.changes = changes;
    report
}
