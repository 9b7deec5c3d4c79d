//! Import-to-path resolution
//!
//! Maps a raw module identifier (`a.b.c`) to at most one enumerated file
//! key. Best-effort by design: no build manifest is consulted, and an
//! identifier that maps to nothing is an external dependency, not an
//! error. Namespace packages and re-exports are out of scope.

use std::collections::HashSet;

/// Resolver over the set of enumerated file keys.
///
/// Candidates are tried per root prefix in root order, `a.b.c` ->
/// `<root>/a/b/c.<ext>` for each configured extension, then the package
/// init fallback `<root>/a/b/c/<init>`. The first known key wins, so
/// resolution is deterministic for a fixed root order.
pub struct ImportResolver<'a> {
    known: &'a HashSet<String>,
    root_prefixes: &'a [String],
    extensions: &'a [String],
    package_init: &'a str,
}

impl<'a> ImportResolver<'a> {
    pub fn new(
        known: &'a HashSet<String>,
        root_prefixes: &'a [String],
        extensions: &'a [String],
        package_init: &'a str,
    ) -> Self {
        Self {
            known,
            root_prefixes,
            extensions,
            package_init,
        }
    }

    /// Resolve one module identifier to a known file key, or None for
    /// external dependencies.
    pub fn resolve(&self, identifier: &str) -> Option<String> {
        // Relative imports keep their trailing path, lose the dots
        let trimmed = identifier.trim_start_matches('.').trim();
        if trimmed.is_empty() {
            return None;
        }
        let rel = trimmed.replace('.', "/");

        for prefix in self.root_prefixes {
            for ext in self.extensions {
                let candidate = join_key(prefix, &format!("{rel}.{ext}"));
                if self.known.contains(&candidate) {
                    return Some(candidate);
                }
            }
            let init = join_key(prefix, &format!("{rel}/{}", self.package_init));
            if self.known.contains(&init) {
                return Some(init);
            }
        }

        None
    }
}

fn join_key(prefix: &str, rest: &str) -> String {
    if prefix.is_empty() {
        rest.to_string()
    } else {
        format!("{prefix}/{rest}")
    }
}
