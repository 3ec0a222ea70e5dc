use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use log::warn;

/// `.gitignore` 比對器，附帶「已證實被忽略」的單調快取。 /
/// Gitignore matcher with a monotonic proven-ignored cache.
///
/// The cache only ever grows for the lifetime of the session; pattern results
/// are stable for an unchanged ignore file, so caching is purely an
/// optimization and never changes an answer.
#[derive(Debug)]
pub struct IgnoreRules {
    matcher: Gitignore,
    proven_ignored: Mutex<HashSet<String>>,
}

impl IgnoreRules {
    /// 讀取 `<root>/.gitignore` 建立規則；檔案不存在視為沒有規則。 /
    /// Loads `<root>/.gitignore`; a missing file simply means no rules.
    pub fn load(workspace_root: impl AsRef<Path>) -> Self {
        let root = workspace_root.as_ref();
        let spec_path = root.join(".gitignore");
        let mut builder = GitignoreBuilder::new(root);
        if spec_path.exists() {
            if let Some(err) = builder.add(&spec_path) {
                warn!("partially invalid {}: {err}", spec_path.display());
            }
        }
        let matcher = builder.build().unwrap_or_else(|err| {
            warn!("could not build ignore rules: {err}");
            Gitignore::empty()
        });
        Self::with_matcher(matcher)
    }

    /// 建立沒有任何規則的比對器。 / A matcher with no rules at all.
    pub fn empty() -> Self {
        Self::with_matcher(Gitignore::empty())
    }

    fn with_matcher(matcher: Gitignore) -> Self {
        Self {
            matcher,
            proven_ignored: Mutex::new(HashSet::new()),
        }
    }

    /// 判斷相對路徑（或其任一祖先）是否被忽略。 /
    /// True when the relative path, or any ancestor of it, is ignored.
    pub fn is_ignored(&self, relative_path: &str) -> bool {
        if relative_path.is_empty() {
            return false;
        }
        if let Ok(proven) = self.proven_ignored.lock() {
            if proven.contains(relative_path) {
                return true;
            }
        }

        let ignored = self.matches(relative_path);
        if ignored {
            if let Ok(mut proven) = self.proven_ignored.lock() {
                proven.insert(relative_path.to_string());
            }
        }
        ignored
    }

    fn matches(&self, relative_path: &str) -> bool {
        // 呼叫端不知道路徑是檔案還是資料夾，兩種解讀都要比對。 /
        // The caller does not know whether the path names a file or a
        // directory, so both interpretations are tried.
        let path = Path::new(relative_path.trim_end_matches(['/', '\\']));
        self.matcher
            .matched_path_or_any_parents(path, false)
            .is_ignore()
            || self
                .matcher
                .matched_path_or_any_parents(path, true)
                .is_ignore()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn rules_for(patterns: &str) -> (tempfile::TempDir, IgnoreRules) {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(".gitignore"), patterns).unwrap();
        let rules = IgnoreRules::load(dir.path());
        (dir, rules)
    }

    #[test]
    fn missing_gitignore_ignores_nothing() {
        let dir = tempdir().unwrap();
        let rules = IgnoreRules::load(dir.path());
        assert!(!rules.is_ignored("src/app.ts"));
        assert!(!rules.is_ignored("target"));
    }

    #[test]
    fn directory_pattern_covers_descendants() {
        let (_dir, rules) = rules_for("build/\n");
        assert!(rules.is_ignored("build"));
        assert!(rules.is_ignored("build/out.js"));
        assert!(rules.is_ignored("build/nested/deep.js"));
        assert!(!rules.is_ignored("src/build.rs"));
    }

    #[test]
    fn glob_patterns_match_files() {
        let (_dir, rules) = rules_for("*.log\n!keep.log\n");
        assert!(rules.is_ignored("debug.log"));
        assert!(rules.is_ignored("logs/debug.log"));
        assert!(!rules.is_ignored("keep.log"));
    }

    #[test]
    fn cache_repeats_positive_answers() {
        let (_dir, rules) = rules_for("build/\n");
        assert!(rules.is_ignored("build/out.js"));
        // 第二次查詢走快取，結果必須一致。 / Second lookup hits the cache.
        assert!(rules.is_ignored("build/out.js"));
        assert_eq!(rules.proven_ignored.lock().unwrap().len(), 1);
    }

    #[test]
    fn empty_rules_and_empty_path() {
        let rules = IgnoreRules::empty();
        assert!(!rules.is_ignored("anything"));
        assert!(!rules.is_ignored(""));
    }
}
