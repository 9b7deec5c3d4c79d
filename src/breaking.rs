//! Breaking-change detection
//!
//! Pure comparison of two summaries for the same path: any previously
//! public symbol missing from the new side is a breaking change. Never
//! reads files, never fails.

use serde::Serialize;

use crate::summary::FileSummary;

/// What kind of public symbol went away
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakingKind {
    RemovedExport,
    RemovedClass,
    RemovedFunction,
}

impl std::fmt::Display for BreakingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RemovedExport => write!(f, "removed_export"),
            Self::RemovedClass => write!(f, "removed_class"),
            Self::RemovedFunction => write!(f, "removed_function"),
        }
    }
}

/// One removed public symbol
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakingChange {
    pub file_path: String,
    pub kind: BreakingKind,
    pub symbol_name: String,
}

/// Compare two summaries of the same path.
///
/// - exports present in old but absent in new: [`BreakingKind::RemovedExport`]
/// - classes present in old but absent in new: [`BreakingKind::RemovedClass`]
/// - functions that were public (listed in old exports) and are gone:
///   [`BreakingKind::RemovedFunction`]
///
/// A new file (`old` is None) cannot break anything.
pub fn detect(old: Option<&FileSummary>, new: &FileSummary) -> Vec<BreakingChange> {
    let Some(old) = old else {
        return Vec::new();
    };

    let mut changes = Vec::new();

    for export in &old.exports {
        if !new.exports.contains(export) {
            changes.push(BreakingChange {
                file_path: new.path.clone(),
                kind: BreakingKind::RemovedExport,
                symbol_name: export.clone(),
            });
        }
    }

    for class in &old.classes {
        if !new.classes.contains(class) {
            changes.push(BreakingChange {
                file_path: new.path.clone(),
                kind: BreakingKind::RemovedClass,
                symbol_name: class.clone(),
            });
        }
    }

    for function in &old.functions {
        if old.exports.contains(function) && !new.functions.contains(function) {
            changes.push(BreakingChange {
                file_path: new.path.clone(),
                kind: BreakingKind::RemovedFunction,
                symbol_name: function.clone(),
            });
        }
    }

    changes
}
