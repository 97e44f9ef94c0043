//! GlobExpander — option-aware pathname (glob) expansion against a [`FileSystem`]
//!
//! Walks the virtual filesystem component-by-component rather than testing a
//! compiled pattern against a flat list of paths, so that a bare `*` never
//! crosses a `/` unless `globstar` is on and the `**` segment is the kind bash
//! treats specially, and so dotfiles are skipped unless `dotglob` (or a
//! leading-dot pattern segment) says otherwise.

use std::collections::HashMap;
use std::sync::Arc;

use crate::fs::FileSystem;

use super::glob_helpers::{glob_to_regex, globignore_pattern_to_regex, split_globignore_patterns};

/// Options controlling glob expansion behavior, mirrored from `shopt`.
#[derive(Debug, Clone)]
pub struct GlobOptions {
    pub globstar: bool,
    pub nullglob: bool,
    pub failglob: bool,
    pub dotglob: bool,
    pub extglob: bool,
    pub nocaseglob: bool,
    /// Default true in bash >=5.2
    pub globskipdots: bool,
}

impl Default for GlobOptions {
    fn default() -> Self {
        Self {
            globstar: false,
            nullglob: false,
            failglob: false,
            dotglob: false,
            extglob: false,
            nocaseglob: false,
            globskipdots: true,
        }
    }
}

/// Core glob expander with configuration and pattern matching.
///
/// Holds a reference to the virtual file system, the current working
/// directory, GLOBIGNORE patterns, and all relevant shell options.
pub struct GlobExpander {
    fs: Arc<dyn FileSystem>,
    cwd: String,
    globignore_patterns: Vec<String>,
    has_globignore: bool,
    globstar: bool,
    nullglob: bool,
    failglob: bool,
    dotglob: bool,
    extglob: bool,
    nocaseglob: bool,
    globskipdots: bool,
}

impl GlobExpander {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        cwd: String,
        env: Option<&HashMap<String, String>>,
        options: GlobOptions,
    ) -> Self {
        let mut globignore_patterns = Vec::new();
        let mut has_globignore = false;
        if let Some(env_map) = env {
            if let Some(globignore) = env_map.get("GLOBIGNORE") {
                if !globignore.is_empty() {
                    has_globignore = true;
                    globignore_patterns = split_globignore_patterns(globignore);
                }
            }
        }
        Self {
            fs,
            cwd,
            globignore_patterns,
            has_globignore,
            globstar: options.globstar,
            nullglob: options.nullglob,
            failglob: options.failglob,
            dotglob: options.dotglob,
            extglob: options.extglob,
            nocaseglob: options.nocaseglob,
            globskipdots: options.globskipdots,
        }
    }

    pub fn has_nullglob(&self) -> bool {
        self.nullglob
    }

    pub fn has_failglob(&self) -> bool {
        self.failglob
    }

    /// Check if a string contains glob characters.
    pub fn is_glob_pattern(&self, s: &str) -> bool {
        if s.contains('*') || s.contains('?') || s.contains('[') {
            return true;
        }
        if self.extglob {
            for i in 0..s.len().saturating_sub(1) {
                let c = s.as_bytes()[i];
                if (c == b'@' || c == b'*' || c == b'+' || c == b'?' || c == b'!')
                    && s.as_bytes()[i + 1] == b'('
                {
                    return true;
                }
            }
        }
        false
    }

    /// Match a filename against a glob pattern (single path segment).
    pub fn match_pattern(&self, name: &str, pattern: &str) -> bool {
        let regex_str = glob_to_regex(pattern, self.extglob, self.nocaseglob);
        if let Ok(re) = regex_lite::Regex::new(&regex_str) {
            re.is_match(name)
        } else {
            false
        }
    }

    /// Filter results based on GLOBIGNORE and globskipdots.
    pub(crate) fn filter_globignore(&self, results: Vec<String>) -> Vec<String> {
        if !self.has_globignore && !self.globskipdots {
            return results;
        }
        results
            .into_iter()
            .filter(|path| {
                let basename = path.rsplit('/').next().unwrap_or(path);
                if (self.has_globignore || self.globskipdots)
                    && (basename == "." || basename == "..")
                {
                    return false;
                }
                if self.has_globignore {
                    for ignore_pattern in &self.globignore_patterns {
                        let regex_str = globignore_pattern_to_regex(ignore_pattern);
                        if let Ok(re) = regex_lite::Regex::new(&regex_str) {
                            if re.is_match(path) {
                                return false;
                            }
                        }
                    }
                }
                true
            })
            .collect()
    }

    /// Check if `**` is used as a complete path segment.
    pub(crate) fn is_globstar_valid(&self, pattern: &str) -> bool {
        let segments: Vec<&str> = pattern.split('/').collect();
        for segment in segments {
            if segment.contains("**") && segment != "**" {
                return false;
            }
        }
        true
    }

    /// Get effective dotglob (true if dotglob is set OR GLOBIGNORE is set).
    pub(crate) fn effective_dotglob(&self) -> bool {
        self.dotglob || self.has_globignore
    }

    pub(crate) fn fs(&self) -> &Arc<dyn FileSystem> {
        &self.fs
    }

    pub(crate) fn cwd(&self) -> &str {
        &self.cwd
    }

    pub(crate) fn globstar(&self) -> bool {
        self.globstar
    }

    pub(crate) fn dotglob(&self) -> bool {
        self.dotglob
    }

    /// Expand a single glob pattern to matching paths, relative to `cwd`
    /// unless `pattern` is absolute.
    pub async fn expand(&self, pattern: &str) -> Vec<String> {
        let results = if pattern.contains("**") && self.globstar && self.is_globstar_valid(pattern)
        {
            self.expand_recursive(pattern).await
        } else {
            // When globstar disabled or ** not a valid segment, treat ** as *
            let normalized = pattern.replace("**", "*");
            self.expand_simple(&normalized).await
        };
        let mut filtered = self.filter_globignore(results);
        filtered.sort();
        filtered
    }

    /// Expand an array of arguments, replacing glob patterns with matched files.
    pub async fn expand_args(&self, args: &[String], quoted_flags: Option<&[bool]>) -> Vec<String> {
        let mut result = Vec::new();
        for (i, arg) in args.iter().enumerate() {
            let is_quoted = quoted_flags.map_or(false, |flags| flags.get(i).copied().unwrap_or(false));
            if is_quoted || !self.is_glob_pattern(arg) {
                result.push(arg.clone());
            } else {
                let expanded = self.expand(arg).await;
                if expanded.is_empty() {
                    result.push(arg.clone());
                } else {
                    result.extend(expanded);
                }
            }
        }
        result
    }

    /// Expand a simple glob pattern (no `**`).
    async fn expand_simple(&self, pattern: &str) -> Vec<String> {
        let is_absolute = pattern.starts_with('/');
        let segments: Vec<String> = pattern
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .collect();

        let first_glob_idx = segments.iter().position(|s| self.has_glob_chars(s));
        let first_glob_idx = match first_glob_idx {
            Some(idx) => idx,
            None => return vec![pattern.to_string()],
        };

        let (fs_base_path, result_prefix) = if first_glob_idx == 0 {
            if is_absolute {
                ("/".to_string(), "/".to_string())
            } else {
                (self.cwd.clone(), String::new())
            }
        } else {
            let base_segments: Vec<&str> = segments[..first_glob_idx].iter().map(|s| s.as_str()).collect();
            let base = base_segments.join("/");
            if is_absolute {
                (format!("/{}", base), format!("/{}", base))
            } else {
                (self.fs.resolve_path(&self.cwd, &base), base)
            }
        };

        let remaining: Vec<String> = segments[first_glob_idx..].to_vec();
        self.expand_segments(&fs_base_path, &result_prefix, &remaining).await
    }

    /// Recursively expand path segments with glob patterns, one directory level at a time.
    async fn expand_segments(&self, fs_path: &str, result_prefix: &str, segments: &[String]) -> Vec<String> {
        if segments.is_empty() {
            return vec![result_prefix.to_string()];
        }

        let current_segment = &segments[0];
        let remaining = &segments[1..];
        let mut results = Vec::new();

        let entries = match self.fs.readdir_with_file_types(fs_path).await {
            Ok(entries) => entries,
            Err(_) => return results,
        };

        let effective_dotglob = self.effective_dotglob();

        for entry in &entries {
            if entry.name.starts_with('.') && !current_segment.starts_with('.') && !effective_dotglob {
                continue;
            }

            if self.match_pattern(&entry.name, current_segment) {
                let new_fs_path = if fs_path == "/" {
                    format!("/{}", entry.name)
                } else {
                    format!("{}/{}", fs_path, entry.name)
                };

                let new_result_prefix = if result_prefix.is_empty() {
                    entry.name.clone()
                } else if result_prefix == "/" {
                    format!("/{}", entry.name)
                } else {
                    format!("{}/{}", result_prefix, entry.name)
                };

                if remaining.is_empty() {
                    results.push(new_result_prefix);
                } else if entry.is_directory {
                    let sub_results =
                        Box::pin(self.expand_segments(&new_fs_path, &new_result_prefix, remaining)).await;
                    results.extend(sub_results);
                }
            }
        }

        results
    }

    /// Expand a recursive glob pattern (contains `**`), only reachable when
    /// `globstar` is enabled and the `**` is a standalone path segment.
    async fn expand_recursive(&self, pattern: &str) -> Vec<String> {
        let double_star_idx = pattern.find("**").unwrap();
        let before = pattern[..double_star_idx].trim_end_matches('/');
        let before = if before.is_empty() { "." } else { before };
        let after = &pattern[double_star_idx + 2..];
        let file_pattern = after.trim_start_matches('/');

        if file_pattern.contains("**") && self.is_globstar_valid(file_pattern) {
            let mut results = Vec::new();
            Box::pin(self.walk_directory_multi_globstar(before, file_pattern, &mut results)).await;
            results.sort();
            results.dedup();
            return results;
        }

        let mut results = Vec::new();
        self.walk_directory(before, file_pattern, &mut results).await;
        results
    }

    /// Walk directory recursively, matching `file_pattern` at each level.
    async fn walk_directory(&self, dir: &str, file_pattern: &str, results: &mut Vec<String>) {
        let full_path = self.fs.resolve_path(&self.cwd, dir);

        let entries = match self.fs.readdir_with_file_types(&full_path).await {
            Ok(entries) => entries,
            Err(_) => return,
        };

        let effective_dotglob = self.effective_dotglob();
        let mut dirs = Vec::new();
        for entry in &entries {
            if entry.name.starts_with('.') && !file_pattern.starts_with('.') && !effective_dotglob {
                continue;
            }

            let entry_path = if dir == "." {
                entry.name.clone()
            } else {
                format!("{}/{}", dir, entry.name)
            };

            if entry.is_directory {
                dirs.push(entry_path.clone());
            }

            if !file_pattern.is_empty() && self.match_pattern(&entry.name, file_pattern) {
                results.push(entry_path);
            }
        }

        for dir_path in dirs {
            Box::pin(self.walk_directory(&dir_path, file_pattern, results)).await;
        }
    }

    /// Walk for multi-globstar patterns (`**` appearing more than once).
    async fn walk_directory_multi_globstar(&self, dir: &str, sub_pattern: &str, results: &mut Vec<String>) {
        let full_path = self.fs.resolve_path(&self.cwd, dir);

        let entries = match self.fs.readdir_with_file_types(&full_path).await {
            Ok(entries) => entries,
            Err(_) => return,
        };

        let effective_dotglob = self.effective_dotglob();
        let mut dirs = Vec::new();
        for entry in &entries {
            if entry.name.starts_with('.') && !effective_dotglob {
                continue;
            }
            let entry_path = if dir == "." {
                entry.name.clone()
            } else {
                format!("{}/{}", dir, entry.name)
            };
            if entry.is_directory {
                dirs.push(entry_path);
            }
        }

        let pattern_from_here = if dir == "." {
            sub_pattern.to_string()
        } else {
            format!("{}/{}", dir, sub_pattern)
        };
        let sub_results = Box::pin(self.expand_recursive(&pattern_from_here)).await;
        results.extend(sub_results);

        for dir_path in dirs {
            Box::pin(self.walk_directory_multi_globstar(&dir_path, sub_pattern, results)).await;
        }
    }

    fn has_glob_chars(&self, s: &str) -> bool {
        self.is_glob_pattern(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::{InMemoryFs, MkdirOptions};

    fn make_expander(options: GlobOptions) -> GlobExpander {
        let fs = Arc::new(InMemoryFs::new());
        GlobExpander::new(fs, "/home/user".to_string(), None, options)
    }

    #[test]
    fn test_glob_options_default() {
        let opts = GlobOptions::default();
        assert!(!opts.globstar && !opts.nullglob && !opts.failglob && !opts.dotglob && !opts.extglob);
        assert!(opts.globskipdots);
        assert!(!opts.nocaseglob);
    }

    #[test]
    fn test_new_with_globignore_env() {
        let mut env = HashMap::new();
        env.insert("GLOBIGNORE".to_string(), "*.log:*.tmp".to_string());
        let fs = Arc::new(InMemoryFs::new());
        let expander = GlobExpander::new(fs, "/home/user".to_string(), Some(&env), GlobOptions::default());
        assert!(expander.has_globignore);
        assert_eq!(expander.globignore_patterns, vec!["*.log", "*.tmp"]);
    }

    #[test]
    fn test_is_globstar_valid() {
        let expander = make_expander(GlobOptions::default());
        assert!(expander.is_globstar_valid("**"));
        assert!(expander.is_globstar_valid("src/**/test"));
        assert!(!expander.is_globstar_valid("d**"));
        assert!(!expander.is_globstar_valid("**x"));
    }

    #[test]
    fn test_effective_dotglob() {
        let mut opts = GlobOptions::default();
        opts.dotglob = true;
        assert!(make_expander(opts).effective_dotglob());
        assert!(!make_expander(GlobOptions::default()).effective_dotglob());
    }

    #[test]
    fn test_match_pattern_nocaseglob() {
        let mut opts = GlobOptions::default();
        opts.nocaseglob = true;
        let expander = make_expander(opts);
        assert!(expander.match_pattern("FILE.TXT", "*.txt"));
        assert!(!make_expander(GlobOptions::default()).match_pattern("FILE.TXT", "*.txt"));
    }

    async fn setup_test_fs() -> Arc<InMemoryFs> {
        let fs = Arc::new(InMemoryFs::new());
        fs.mkdir("/home", &MkdirOptions { recursive: true }).await.unwrap();
        fs.mkdir("/home/user", &MkdirOptions { recursive: false }).await.unwrap();
        fs.mkdir("/home/user/sub", &MkdirOptions { recursive: false }).await.unwrap();
        fs.mkdir("/home/user/sub/deep", &MkdirOptions { recursive: false }).await.unwrap();
        fs.write_file("/home/user/file.txt", b"hello").await.unwrap();
        fs.write_file("/home/user/file.rs", b"fn main(){}").await.unwrap();
        fs.write_file("/home/user/data.json", b"{}").await.unwrap();
        fs.write_file("/home/user/.hidden", b"secret").await.unwrap();
        fs.write_file("/home/user/sub/nested.txt", b"nested").await.unwrap();
        fs.write_file("/home/user/sub/deep/file.txt", b"deep").await.unwrap();
        fs
    }

    fn make_expander_with_fs(
        fs: Arc<InMemoryFs>,
        cwd: &str,
        env: Option<&HashMap<String, String>>,
        options: GlobOptions,
    ) -> GlobExpander {
        GlobExpander::new(fs as Arc<dyn FileSystem>, cwd.to_string(), env, options)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_expand_star_excludes_hidden_by_default() {
        let fs = setup_test_fs().await;
        let expander = make_expander_with_fs(fs, "/home/user", None, GlobOptions::default());
        let result = expander.expand("*").await;
        assert_eq!(result, vec!["data.json", "file.rs", "file.txt", "sub"]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_expand_star_with_dotglob_includes_hidden() {
        let fs = setup_test_fs().await;
        let mut opts = GlobOptions::default();
        opts.dotglob = true;
        let expander = make_expander_with_fs(fs, "/home/user", None, opts);
        let result = expander.expand("*").await;
        assert!(result.contains(&".hidden".to_string()));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_star_does_not_cross_slash_without_globstar() {
        let fs = setup_test_fs().await;
        let expander = make_expander_with_fs(fs, "/home/user", None, GlobOptions::default());
        // Without globstar, ** degrades to * which still only spans one segment.
        let result = expander.expand("**/*.txt").await;
        assert_eq!(result, vec!["sub/nested.txt"]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_expand_recursive_globstar_spans_all_levels() {
        let fs = setup_test_fs().await;
        let mut opts = GlobOptions::default();
        opts.globstar = true;
        let expander = make_expander_with_fs(fs, "/home/user", None, opts);
        let result = expander.expand("**/*.txt").await;
        assert_eq!(result, vec!["file.txt", "sub/deep/file.txt", "sub/nested.txt"]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_expand_with_globignore_implies_dotglob() {
        let fs = setup_test_fs().await;
        let mut env = HashMap::new();
        env.insert("GLOBIGNORE".to_string(), "*.txt".to_string());
        let expander = make_expander_with_fs(fs, "/home/user", Some(&env), GlobOptions::default());
        let result = expander.expand("*").await;
        assert!(result.contains(&"data.json".to_string()));
        assert!(result.contains(&".hidden".to_string()));
        assert!(!result.contains(&"file.txt".to_string()));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_expand_no_matches_returns_empty() {
        let fs = setup_test_fs().await;
        let expander = make_expander_with_fs(fs, "/home/user", None, GlobOptions::default());
        let result = expander.expand("nonexistent*").await;
        assert!(result.is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_expand_absolute_path() {
        let fs = setup_test_fs().await;
        let expander = make_expander_with_fs(fs, "/home/user", None, GlobOptions::default());
        let result = expander.expand("/home/user/*.txt").await;
        assert_eq!(result, vec!["/home/user/file.txt"]);
    }
}
