//! Sync FileSystem Adapter
//!
//! Bridges the async `fs::FileSystem` trait to the sync `interpreter::FileSystem` trait.
//! Uses `tokio::task::block_in_place` + `block_on` to execute async operations synchronously.

use std::collections::HashMap;
use std::sync::Arc;
use crate::commands::CommandRegistry;
use crate::fs::FileSystem as AsyncFileSystem;
use crate::interpreter::interpreter::{FileSystem as SyncFileSystem, FileStat, GlobMatchOptions};
use crate::shell::glob_expander::{GlobExpander, GlobOptions};
use crate::interpreter::types::ExecResult;

/// Adapter that wraps an async FileSystem and provides a sync interface.
///
/// This is used by the execution engine to bridge the async filesystem
/// with the sync interpreter helper functions. It also hosts the
/// external-command registry (coreutils-style commands that the executor
/// dispatches without forking a real process), since reaching those
/// commands' async `execute` requires the same block-on bridge.
pub struct SyncFsAdapter {
    inner: Arc<dyn AsyncFileSystem>,
    handle: tokio::runtime::Handle,
    registry: Arc<CommandRegistry>,
}

impl SyncFsAdapter {
    /// Create a new adapter wrapping the given async filesystem, with the
    /// default external-command registry.
    ///
    /// # Arguments
    /// * `fs` - The async filesystem to wrap
    /// * `handle` - The tokio runtime handle for executing async operations
    pub fn new(fs: Arc<dyn AsyncFileSystem>, handle: tokio::runtime::Handle) -> Self {
        Self::with_registry(fs, handle, Arc::new(crate::commands::default_registry()))
    }

    /// Create a new adapter with a caller-supplied command registry, e.g.
    /// to extend or restrict which external commands are reachable.
    pub fn with_registry(
        fs: Arc<dyn AsyncFileSystem>,
        handle: tokio::runtime::Handle,
        registry: Arc<CommandRegistry>,
    ) -> Self {
        Self { inner: fs, handle, registry }
    }

    /// Execute an async operation synchronously using block_in_place.
    fn block_on<F, T>(&self, f: F) -> T
    where
        F: std::future::Future<Output = T>,
    {
        tokio::task::block_in_place(|| self.handle.block_on(f))
    }
}

impl SyncFileSystem for SyncFsAdapter {
    fn read_file(&self, path: &str) -> Result<String, std::io::Error> {
        self.block_on(self.inner.read_file(path))
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))
    }

    fn write_file(&self, path: &str, contents: &str) -> Result<(), std::io::Error> {
        self.block_on(self.inner.write_file(path, contents.as_bytes()))
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))
    }

    fn append_file(&self, path: &str, contents: &str) -> Result<(), std::io::Error> {
        self.block_on(self.inner.append_file(path, contents.as_bytes()))
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))
    }

    fn exists(&self, path: &str) -> bool {
        self.block_on(self.inner.exists(path))
    }

    fn is_dir(&self, path: &str) -> bool {
        self.block_on(self.inner.stat(path))
            .map(|s| s.is_directory)
            .unwrap_or(false)
    }

    fn is_file(&self, path: &str) -> bool {
        self.block_on(self.inner.stat(path))
            .map(|s| s.is_file)
            .unwrap_or(false)
    }

    fn resolve_path(&self, base: &str, path: &str) -> String {
        self.inner.resolve_path(base, path)
    }

    fn stat(&self, path: &str) -> Result<FileStat, std::io::Error> {
        let s = self.block_on(self.inner.stat(path))
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
        Ok(FileStat {
            is_file: s.is_file,
            is_dir: s.is_directory,
            is_symlink: s.is_symlink,
            size: s.size,
            mode: s.mode,
            uid: 0,  // Not tracked in our virtual FS
            gid: 0,  // Not tracked in our virtual FS
            mtime: s.mtime.duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default().as_secs(),
        })
    }

    fn read_dir(&self, path: &str) -> Result<Vec<String>, std::io::Error> {
        self.block_on(self.inner.readdir(path))
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))
    }

    fn glob(
        &self,
        pattern: &str,
        cwd: &str,
        env: &HashMap<String, String>,
        options: GlobMatchOptions,
    ) -> Result<Vec<String>, std::io::Error> {
        let glob_options = GlobOptions {
            globstar: options.globstar,
            nullglob: false,
            failglob: false,
            dotglob: options.dotglob,
            extglob: options.extglob,
            nocaseglob: options.nocaseglob,
            globskipdots: true,
        };
        let expander = GlobExpander::new(self.inner.clone(), cwd.to_string(), Some(env), glob_options);
        Ok(self.block_on(expander.expand(pattern)))
    }

    fn run_external_command(
        &self,
        name: &str,
        args: &[String],
        stdin: &str,
        cwd: &str,
        env: &HashMap<String, String>,
    ) -> Option<ExecResult> {
        let command = self.registry.get(name)?;
        let ctx = crate::commands::CommandContext {
            args: args.to_vec(),
            stdin: stdin.to_string(),
            cwd: cwd.to_string(),
            env: env.clone(),
            fs: self.inner.clone(),
            exec_fn: None,
            fetch_fn: None,
        };
        let result = self.block_on(command.execute(ctx));
        Some(ExecResult::new(result.stdout, result.stderr, result.exit_code))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::InMemoryFs;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_sync_fs_adapter_read_write() {
        let fs = Arc::new(InMemoryFs::new());
        let handle = tokio::runtime::Handle::current();

        // Write using async API
        fs.write_file("/test.txt", b"hello").await.unwrap();

        // Read using sync adapter
        let adapter = SyncFsAdapter::new(fs.clone(), handle);
        let content = adapter.read_file("/test.txt").unwrap();
        assert_eq!(content, "hello");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_sync_fs_adapter_exists() {
        let fs = Arc::new(InMemoryFs::new());
        let handle = tokio::runtime::Handle::current();

        fs.write_file("/exists.txt", b"data").await.unwrap();

        let adapter = SyncFsAdapter::new(fs, handle);
        assert!(adapter.exists("/exists.txt"));
        assert!(!adapter.exists("/not_exists.txt"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_sync_fs_adapter_is_dir_is_file() {
        let fs = Arc::new(InMemoryFs::new());
        let handle = tokio::runtime::Handle::current();

        fs.mkdir("/mydir", &crate::fs::MkdirOptions { recursive: false }).await.unwrap();
        fs.write_file("/myfile.txt", b"data").await.unwrap();

        let adapter = SyncFsAdapter::new(fs, handle);
        assert!(adapter.is_dir("/mydir"));
        assert!(!adapter.is_file("/mydir"));
        assert!(adapter.is_file("/myfile.txt"));
        assert!(!adapter.is_dir("/myfile.txt"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_sync_fs_adapter_stat() {
        let fs = Arc::new(InMemoryFs::new());
        let handle = tokio::runtime::Handle::current();

        fs.write_file("/stat_test.txt", b"hello world").await.unwrap();

        let adapter = SyncFsAdapter::new(fs, handle);
        let stat = adapter.stat("/stat_test.txt").unwrap();
        assert!(stat.is_file);
        assert!(!stat.is_dir);
        assert_eq!(stat.size, 11);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_sync_fs_adapter_read_dir() {
        let fs = Arc::new(InMemoryFs::new());
        let handle = tokio::runtime::Handle::current();

        fs.mkdir("/testdir", &crate::fs::MkdirOptions { recursive: false }).await.unwrap();
        fs.write_file("/testdir/a.txt", b"a").await.unwrap();
        fs.write_file("/testdir/b.txt", b"b").await.unwrap();

        let adapter = SyncFsAdapter::new(fs, handle);
        let entries = adapter.read_dir("/testdir").unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.contains(&"a.txt".to_string()));
        assert!(entries.contains(&"b.txt".to_string()));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_sync_fs_adapter_resolve_path() {
        let fs = Arc::new(InMemoryFs::new());
        let handle = tokio::runtime::Handle::current();

        let adapter = SyncFsAdapter::new(fs, handle);
        assert_eq!(adapter.resolve_path("/home/user", "file.txt"), "/home/user/file.txt");
        assert_eq!(adapter.resolve_path("/home/user", "/absolute/path"), "/absolute/path");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_sync_fs_adapter_glob() {
        let fs = Arc::new(InMemoryFs::new());
        let handle = tokio::runtime::Handle::current();

        fs.mkdir("/glob_test", &crate::fs::MkdirOptions { recursive: false }).await.unwrap();
        fs.write_file("/glob_test/a.txt", b"a").await.unwrap();
        fs.write_file("/glob_test/b.txt", b"b").await.unwrap();
        fs.write_file("/glob_test/c.md", b"c").await.unwrap();

        let adapter = SyncFsAdapter::new(fs, handle);
        let env = HashMap::new();
        let matches = adapter
            .glob("/glob_test/*.txt", "/", &env, GlobMatchOptions::default())
            .unwrap();
        assert_eq!(matches.len(), 2);
        assert!(matches.contains(&"/glob_test/a.txt".to_string()));
        assert!(matches.contains(&"/glob_test/b.txt".to_string()));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_sync_fs_adapter_glob_star_does_not_cross_slash() {
        let fs = Arc::new(InMemoryFs::new());
        let handle = tokio::runtime::Handle::current();

        fs.mkdir("/glob_test", &crate::fs::MkdirOptions { recursive: false }).await.unwrap();
        fs.mkdir("/glob_test/sub", &crate::fs::MkdirOptions { recursive: false }).await.unwrap();
        fs.write_file("/glob_test/a.txt", b"a").await.unwrap();
        fs.write_file("/glob_test/sub/b.txt", b"b").await.unwrap();
        fs.write_file("/glob_test/.hidden", b"h").await.unwrap();

        let adapter = SyncFsAdapter::new(fs, handle);
        let env = HashMap::new();

        // Bare `*` must not reach into `sub/` nor match `.hidden` by default.
        let matches = adapter
            .glob("*", "/glob_test", &env, GlobMatchOptions::default())
            .unwrap();
        assert_eq!(matches, vec!["a.txt".to_string(), "sub".to_string()]);

        // With dotglob, the hidden file is included too.
        let matches = adapter
            .glob(
                "*",
                "/glob_test",
                &env,
                GlobMatchOptions { dotglob: true, ..Default::default() },
            )
            .unwrap();
        assert!(matches.contains(&".hidden".to_string()));

        // With globstar, `**` descends into subdirectories.
        let matches = adapter
            .glob(
                "**/*.txt",
                "/glob_test",
                &env,
                GlobMatchOptions { globstar: true, ..Default::default() },
            )
            .unwrap();
        assert_eq!(matches, vec!["a.txt".to_string(), "sub/b.txt".to_string()]);
    }
}
