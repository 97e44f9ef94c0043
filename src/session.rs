//! Embeddable API surface: `run`, `run_file`, `parse`, `validate`,
//! `with_session`, and the `Session` handle itself.
//!
//! `Session` is a thin wrapper over [`crate::bash::Bash`] that adds the
//! outcome accessors and lifecycle operations callers expect from an
//! embedded shell: `new`, `set_env`, `get_output`, `execute`,
//! `execute_async`, and `stop` (which fires the `EXIT` trap exactly once).

use std::collections::HashMap;
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::ast::types::ScriptNode;
use crate::bash::{Bash, BashOptions, ExecOptions};
use crate::fs::FileSystem;
use crate::interpreter::types::ExecutionLimits;
use crate::parser::ParseException;

/// The result of running a script: accumulated output plus the final exit
/// code of the last statement executed.
#[derive(Debug, Clone, Default)]
pub struct Outcome {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl Outcome {
    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    pub fn stderr(&self) -> &str {
        &self.stderr
    }

    /// Combined stdout and stderr, in that order.
    pub fn output(&self) -> String {
        format!("{}{}", self.stdout, self.stderr)
    }

    pub fn exit_code(&self) -> i32 {
        self.exit_code
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

impl From<crate::interpreter::types::ExecResult> for Outcome {
    fn from(result: crate::interpreter::types::ExecResult) -> Self {
        Self {
            stdout: result.stdout,
            stderr: result.stderr,
            exit_code: result.exit_code,
        }
    }
}

/// Options accepted by [`run`], [`run_file`], and [`Session::new`].
#[derive(Default)]
pub struct Opts {
    /// Initial environment variables.
    pub env: Option<HashMap<String, String>>,
    /// Initial working directory.
    pub cwd: Option<String>,
    /// Filesystem backend; defaults to an in-memory one.
    pub fs: Option<Arc<dyn FileSystem>>,
    /// Execution limits (recursion depth, command count, iterations).
    pub limits: Option<ExecutionLimits>,
}

impl From<Opts> for BashOptions {
    fn from(opts: Opts) -> Self {
        BashOptions {
            env: opts.env,
            cwd: opts.cwd,
            fs: opts.fs,
            limits: opts.limits,
        }
    }
}

/// A running shell session: owns interpreter state across multiple
/// `execute` calls, serializing them the way §4.5 of the design requires
/// (all mutation happens on the caller's task, one statement at a time).
pub struct Session {
    bash: Bash,
    accumulated_stdout: String,
    accumulated_stderr: String,
    stopped: bool,
}

impl Session {
    /// Create a new session with the given options.
    pub async fn new(opts: Opts) -> Self {
        let bash = Bash::new(opts.into()).await;
        Self {
            bash,
            accumulated_stdout: String::new(),
            accumulated_stderr: String::new(),
            stopped: false,
        }
    }

    /// Run a script to completion within this session.
    pub async fn execute(&mut self, script: &str) -> Outcome {
        let result = self.bash.exec(script, None).await;
        self.accumulated_stdout.push_str(&result.stdout);
        self.accumulated_stderr.push_str(&result.stderr);
        result.into()
    }

    /// Run a script with per-execution overrides (temporary env/cwd).
    pub async fn execute_with(&mut self, script: &str, options: ExecOptions) -> Outcome {
        let result = self.bash.exec(script, Some(options)).await;
        self.accumulated_stdout.push_str(&result.stdout);
        self.accumulated_stderr.push_str(&result.stderr);
        result.into()
    }

    /// Run a script on a background task against a shared session handle,
    /// returning a handle the caller can await independently. Note: per
    /// §5, statement execution within a session is serialized, so a second
    /// `execute_async` call queued against the same session will run after
    /// the first completes once both are awaited in order; true concurrent
    /// mutation is not offered.
    pub fn execute_async(
        session: Arc<tokio::sync::Mutex<Session>>,
        script: String,
    ) -> JoinHandle<Outcome> {
        tokio::spawn(async move {
            let mut session = session.lock().await;
            session.execute(&script).await
        })
    }

    /// Set an environment variable directly, without going through `export`.
    pub fn set_env(&mut self, key: &str, value: &str) {
        self.bash.set_env(key, value);
    }

    /// Combined stdout+stderr accumulated across every `execute` call made
    /// on this session so far.
    pub fn get_output(&self) -> String {
        format!("{}{}", self.accumulated_stdout, self.accumulated_stderr)
    }

    pub fn cwd(&self) -> &str {
        self.bash.get_cwd()
    }

    pub fn env(&self) -> &HashMap<String, String> {
        self.bash.get_env()
    }

    /// Stop the session: fires the `EXIT` trap exactly once, then marks the
    /// session terminated. Safe to call more than once; only the first call
    /// has effect.
    pub async fn stop(&mut self) -> Outcome {
        if self.stopped {
            return Outcome::default();
        }
        self.stopped = true;
        let outcome = self.bash.fire_exit_trap().await;
        self.accumulated_stdout.push_str(&outcome.stdout);
        self.accumulated_stderr.push_str(&outcome.stderr);
        outcome.into()
    }
}

/// Parse + execute `script` in a fresh ephemeral session (or a supplied one)
/// and return its outcome. Mirrors §6's `run(script, session?, opts?)`.
pub async fn run(script: &str, session: Option<&mut Session>, opts: Option<Opts>) -> Outcome {
    match session {
        Some(session) => session.execute(script).await,
        None => {
            let mut session = Session::new(opts.unwrap_or_default()).await;
            let outcome = session.execute(script).await;
            session.stop().await;
            outcome
        }
    }
}

/// Read `path` from the host filesystem, then `run` its contents.
pub async fn run_file(
    path: &str,
    session: Option<&mut Session>,
    opts: Option<Opts>,
) -> Result<Outcome, std::io::Error> {
    let script = tokio::fs::read_to_string(path).await?;
    Ok(run(&script, session, opts).await)
}

/// Parse `script` into an AST without executing it.
pub fn parse(script: &str) -> Result<ScriptNode, ParseException> {
    crate::parser::parse(script)
}

/// Check `script` for syntax errors without executing it.
pub fn validate(script: &str) -> Result<(), ParseException> {
    crate::parser::parse(script).map(|_| ())
}

/// Acquire a session, run `f` against a shared handle to it, and guarantee
/// `stop()` runs afterward (firing the `EXIT` trap) even though `f` is
/// free to return early. Callers of `with_session` care about `f`'s
/// result, not the teardown outcome, so the `EXIT` trap's output is
/// folded into the session's own output buffer rather than returned here.
pub async fn with_session<F, Fut, T>(opts: Opts, f: F) -> T
where
    F: FnOnce(Arc<tokio::sync::Mutex<Session>>) -> Fut,
    Fut: std::future::Future<Output = T>,
{
    let session = Arc::new(tokio::sync::Mutex::new(Session::new(opts).await));
    let result = f(session.clone()).await;
    session.lock().await.stop().await;
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn run_executes_and_stops() {
        let outcome = run("echo hi", None, None).await;
        assert_eq!(outcome.stdout(), "hi\n");
        assert!(outcome.success());
    }

    #[tokio::test]
    async fn session_accumulates_output_across_executes() {
        let mut session = Session::new(Opts::default()).await;
        session.execute("x=1").await;
        let outcome = session.execute("echo $x").await;
        assert_eq!(outcome.stdout(), "1\n");
        assert!(session.get_output().contains("1\n"));
        session.stop().await;
    }

    #[tokio::test]
    async fn exit_trap_fires_on_stop() {
        let mut session = Session::new(Opts::default()).await;
        session.execute("trap 'echo bye' EXIT").await;
        let outcome = session.stop().await;
        assert_eq!(outcome.stdout(), "bye\n");
    }

    #[test]
    fn parse_reports_syntax_errors() {
        assert!(parse("if true; then").is_err());
        assert!(parse("echo hi").is_ok());
    }

    #[test]
    fn validate_matches_parse() {
        assert!(validate("for i in 1 2 3; do echo $i; done").is_ok());
        assert!(validate("do done").is_err());
    }

    #[tokio::test]
    async fn with_session_runs_and_stops() {
        let result = with_session(Opts::default(), |session| async move {
            session.lock().await.execute("echo scoped").await
        })
        .await;
        assert_eq!(result.stdout(), "scoped\n");
    }
}
