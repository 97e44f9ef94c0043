//! Execution Engine
//!
//! The core execution engine that ties all interpreter components together.
//! Implements the full AST execution chain:
//!
//! execute_script -> execute_statement -> execute_pipeline -> execute_command

use std::collections::{HashMap, HashSet};
use crate::ast::types::{
    CommandNode, CompoundCommandNode, PipelineNode, ScriptNode, SimpleCommandNode, StatementNode,
    StatementOperator,
};
use crate::interpreter::alias_expansion::{expand_alias, AliasExpansionContext, AliasExpansionResult};
use crate::interpreter::control_flow::{execute_for, execute_if, execute_while, execute_until, ForResult};
use crate::interpreter::errors::{InterpreterError, ErrexitError, ExitError, ControlFlowError};
use crate::interpreter::functions::execute_function_def;
use crate::interpreter::helpers::condition::ConditionResult;
use crate::interpreter::interpreter::{
    build_exported_env, check_command_limit, should_trigger_errexit, update_exit_code,
    FileSystem as SyncFileSystem,
};
use crate::interpreter::pipeline_execution::{execute_pipeline, PipelineOptions, PipelineState, set_pipestatus};
use crate::interpreter::redirections::{apply_redirections, process_fd_variable_redirections};
use crate::interpreter::subshell_group::{execute_group, execute_subshell};
use crate::interpreter::types::{ExecResult, ExecutionLimits, InterpreterState};
use crate::interpreter::word_expansion::{
    expand_word, expand_word_no_glob, expand_word_with_glob, CommandSubstFn,
};

/// The execution engine that ties all interpreter components together.
pub struct ExecutionEngine<'a> {
    /// Execution limits (max commands, recursion depth, iterations)
    pub limits: &'a ExecutionLimits,
    /// Sync filesystem interface
    pub fs: &'a dyn SyncFileSystem,
}

impl<'a> ExecutionEngine<'a> {
    /// Create a new execution engine.
    pub fn new(limits: &'a ExecutionLimits, fs: &'a dyn SyncFileSystem) -> Self {
        Self { limits, fs }
    }

    /// Execute a complete script (list of statements).
    pub fn execute_script(
        &self,
        state: &mut InterpreterState,
        ast: &ScriptNode,
    ) -> Result<ExecResult, InterpreterError> {
        let mut stdout = String::new();
        let mut stderr = String::new();
        let mut exit_code = 0;

        for statement in &ast.statements {
            match self.execute_statement(state, statement) {
                Ok(result) => {
                    stdout.push_str(&result.stdout);
                    stderr.push_str(&result.stderr);
                    exit_code = result.exit_code;
                    update_exit_code(state, exit_code);
                }
                Err(InterpreterError::Exit(e)) => {
                    // ExitError propagates up to terminate the script
                    let mut err = e;
                    err.prepend_output(&stdout, &stderr);
                    return Err(InterpreterError::Exit(err));
                }
                Err(InterpreterError::ExecutionLimit(e)) => {
                    // ExecutionLimitError must always propagate
                    return Err(InterpreterError::ExecutionLimit(e));
                }
                Err(InterpreterError::Errexit(e)) => {
                    // Errexit terminates the script
                    stdout.push_str(&e.stdout);
                    stderr.push_str(&e.stderr);
                    exit_code = e.exit_code;
                    return Ok(ExecResult::new(stdout, stderr, exit_code));
                }
                Err(InterpreterError::Break(mut e)) => {
                    // Break/continue outside loops - silently continue
                    e.prepend_output(&stdout, &stderr);
                    stdout = e.stdout.clone();
                    stderr = e.stderr.clone();
                    continue;
                }
                Err(InterpreterError::Continue(mut e)) => {
                    e.prepend_output(&stdout, &stderr);
                    stdout = e.stdout.clone();
                    stderr = e.stderr.clone();
                    continue;
                }
                Err(InterpreterError::Return(mut e)) => {
                    // Return outside function - propagate
                    e.prepend_output(&stdout, &stderr);
                    return Err(InterpreterError::Return(e));
                }
                Err(e) => {
                    // Other errors - convert to result
                    stderr.push_str(&format!("{}\n", e));
                    exit_code = 1;
                }
            }
        }

        Ok(ExecResult::new(stdout, stderr, exit_code))
    }

    /// Execute a single statement (list of pipelines with && || operators).
    ///
    /// A trailing `&` is handled here: the body still runs synchronously
    /// (there is no real concurrent scheduler), but its outcome is recorded
    /// as a completed `Job` and the statement itself reports success
    /// immediately, matching what a script observes from bash's `$!`/`wait`
    /// contract even though nothing actually runs in parallel.
    pub fn execute_statement(
        &self,
        state: &mut InterpreterState,
        stmt: &StatementNode,
    ) -> Result<ExecResult, InterpreterError> {
        if stmt.background {
            let command_line = stmt
                .source_text
                .clone()
                .unwrap_or_else(|| "(background command)".to_string());

            let result = self.execute_statement_foreground(state, stmt)?;

            let job_num = crate::interpreter::builtins::register_job(
                state,
                command_line,
                crate::interpreter::types::JobStatus::Done,
                Some(result.exit_code),
                true,
            );
            let pid = state
                .jobs
                .as_ref()
                .and_then(|jobs| jobs.get(&job_num))
                .map(|j| j.pgid)
                .unwrap_or(state.last_background_pid);
            state.env.insert("!".to_string(), pid.to_string());

            return Ok(ExecResult::new(result.stdout, result.stderr, 0));
        }

        self.execute_statement_foreground(state, stmt)
    }

    fn execute_statement_foreground(
        &self,
        state: &mut InterpreterState,
        stmt: &StatementNode,
    ) -> Result<ExecResult, InterpreterError> {
        // Handle deferred syntax errors
        if let Some(ref err) = stmt.deferred_error {
            return Ok(ExecResult::new(
                String::new(),
                format!("bash: syntax error near unexpected token `{}'\n", err.token),
                2,
            ));
        }

        // noexec mode (set -n): parse but don't execute
        if state.options.noexec {
            return Ok(ExecResult::ok());
        }

        // Reset errexit_safe at start of each statement
        state.errexit_safe = Some(false);

        let mut stdout = String::new();
        let mut stderr = String::new();

        // verbose mode (set -v): print source before execution
        if state.options.verbose {
            if let Some(ref source) = stmt.source_text {
                stderr.push_str(source);
                stderr.push('\n');
            }
        }

        let mut exit_code = 0;
        let mut last_executed_index: i32 = -1;
        let mut last_pipeline_negated = false;

        for (i, pipeline) in stmt.pipelines.iter().enumerate() {
            // Check && / || short-circuit
            if i > 0 {
                let op = &stmt.operators[i - 1];
                match op {
                    StatementOperator::And => {
                        if exit_code != 0 {
                            continue;
                        }
                    }
                    StatementOperator::Or => {
                        if exit_code == 0 {
                            continue;
                        }
                    }
                    StatementOperator::Semi => {
                        // Always execute
                    }
                }
            }

            let result = self.execute_pipeline_node(state, pipeline)?;
            stdout.push_str(&result.stdout);
            stderr.push_str(&result.stderr);
            exit_code = result.exit_code;
            last_executed_index = i as i32;
            last_pipeline_negated = pipeline.negated;

            update_exit_code(state, exit_code);
        }

        // Check errexit
        let was_short_circuited = last_executed_index < (stmt.pipelines.len() as i32 - 1);
        let inner_was_safe = state.errexit_safe.unwrap_or(false);

        if exit_code != 0
            && !was_short_circuited
            && !last_pipeline_negated
            && !state.in_condition
            && !inner_was_safe
        {
            if let Some((out, err)) = self.fire_trap(state, "ERR") {
                stdout.push_str(&out);
                stderr.push_str(&err);
            }
        }

        if should_trigger_errexit(state, exit_code, was_short_circuited, last_pipeline_negated)
            && !inner_was_safe
        {
            return Err(InterpreterError::Errexit(ErrexitError::new(
                exit_code, stdout, stderr,
            )));
        }

        Ok(ExecResult::new(stdout, stderr, exit_code))
    }

    /// Run the `EXIT` trap, if one is registered, and return its output.
    /// Intended to be called exactly once, when a session is torn down.
    pub fn fire_exit_trap(&self, state: &mut InterpreterState) -> ExecResult {
        match self.fire_trap(state, "EXIT") {
            Some((stdout, stderr)) => ExecResult::new(stdout, stderr, 0),
            None => ExecResult::ok(),
        }
    }

    /// Run the action registered for `signal` via `trap`, if any, guarding
    /// against re-entrancy (a trap action that itself fails must not refire
    /// the same trap). Returns the action's combined stdout/stderr.
    fn fire_trap(&self, state: &mut InterpreterState, signal: &str) -> Option<(String, String)> {
        if state.trap_depth > 0 {
            return None;
        }
        let action = crate::interpreter::builtins::trap_action(state, signal)?.to_string();
        if action.is_empty() {
            return None;
        }

        let script = crate::parser::parse(&action).ok()?;
        state.trap_depth += 1;
        let result = self.execute_script(state, &script);
        state.trap_depth -= 1;

        match result {
            Ok(res) => Some((res.stdout, res.stderr)),
            Err(e) => Some((String::new(), format!("{}\n", e))),
        }
    }

    /// Execute a pipeline (list of commands connected by |).
    pub fn execute_pipeline_node(
        &self,
        state: &mut InterpreterState,
        pipeline: &PipelineNode,
    ) -> Result<ExecResult, InterpreterError> {
        let mut pipe_state = PipelineState::new();
        let pipe_stderr = pipeline.pipe_stderr.clone().unwrap_or_default();

        let options = PipelineOptions {
            pipefail: state.options.pipefail,
            lastpipe: state.shopt_options.lastpipe,
            runs_in_subshell: false,
            time_pipeline: pipeline.timed,
            time_posix_format: pipeline.time_posix,
        };

        // We need to pass state through the closure, but execute_pipeline
        // takes ownership of the closure. Use a RefCell pattern.
        use std::cell::RefCell;
        let state_cell = RefCell::new(state);

        let result = execute_pipeline(
            &mut pipe_state,
            &pipeline.commands,
            &pipe_stderr,
            &options,
            |cmd, stdin| {
                let state = &mut *state_cell.borrow_mut();
                self.execute_command(state, cmd, stdin)
            },
        )?;

        // Get state back
        let state = state_cell.into_inner();

        // Set PIPESTATUS
        set_pipestatus(&mut state.env, &result.exit_codes);

        let mut exec_result = result.to_exec_result();

        // Handle negation
        if pipeline.negated {
            exec_result.exit_code = if exec_result.exit_code == 0 { 1 } else { 0 };
        }

        Ok(exec_result)
    }

    /// Execute a single command.
    pub fn execute_command(
        &self,
        state: &mut InterpreterState,
        cmd: &CommandNode,
        stdin: &str,
    ) -> Result<ExecResult, InterpreterError> {
        // Check command limit
        if let Some(msg) = check_command_limit(state, self.limits) {
            return Err(InterpreterError::ExecutionLimit(
                crate::interpreter::errors::ExecutionLimitError::simple(
                    msg,
                    crate::interpreter::errors::LimitType::Commands,
                ),
            ));
        }

        match cmd {
            CommandNode::Simple(simple) => self.execute_simple_command(state, simple, stdin),
            CommandNode::Compound(compound) => {
                self.execute_compound_command(state, compound, stdin)
            }
            CommandNode::FunctionDef(func_def) => {
                let current_source = state.current_source.clone();
                execute_function_def(state, func_def, current_source.as_deref())
                    .map_err(InterpreterError::Exit)
            }
        }
    }

    /// Execute a simple command (name + args + redirections).
    pub fn execute_simple_command(
        &self,
        state: &mut InterpreterState,
        cmd: &SimpleCommandNode,
        stdin: &str,
    ) -> Result<ExecResult, InterpreterError> {
        // Set line number for $LINENO
        if let Some(line) = cmd.line {
            state.current_line = line as u32;
        }

        let assignment_result = crate::interpreter::simple_command_assignments::process_assignments(
            state,
            cmd,
            |state, word| expand_word(self.fs, state, word, None).value,
        );

        if let Some(error) = assignment_result.error {
            return Ok(error);
        }

        // Assignment-only command: `FOO=bar` with no command name. Bare
        // redirections with no command (e.g. `> file`) still take effect.
        if cmd.name.is_none() {
            let result = ExecResult::new(String::new(), assignment_result.xtrace_output, 0);
            return Ok(self.apply_command_redirections(state, result, &cmd.redirections));
        };

        // Alias expansion: a literal, unquoted command name may stand for a
        // previously `alias`-defined replacement. Re-expand the resulting
        // command name too, so `alias ll='ls -la'` and `alias ls='ls --color'`
        // chain, guarding against `alias a=a`-style self-reference cycles.
        let mut owned_cmd_storage: Option<SimpleCommandNode> = None;
        let mut effective_cmd: &SimpleCommandNode = cmd;
        if state.shopt_options.expand_aliases {
            let mut alias_stack: HashSet<String> = HashSet::new();
            loop {
                let ctx = AliasExpansionContext { env: &state.env };
                match expand_alias(&ctx, effective_cmd, &mut alias_stack) {
                    AliasExpansionResult::Expanded(new_node) => {
                        owned_cmd_storage = Some(new_node);
                        effective_cmd = owned_cmd_storage.as_ref().unwrap();
                        continue;
                    }
                    AliasExpansionResult::ComplexAlias(script_text) => {
                        return self.execute_alias_script(state, &script_text, stdin);
                    }
                    AliasExpansionResult::ParseError(e) => {
                        return Ok(ExecResult::failure(format!("bash: alias: {}\n", e)));
                    }
                    AliasExpansionResult::NoExpansion => break,
                }
            }
        }

        let name_word = match &effective_cmd.name {
            Some(word) => word,
            None => {
                let result = ExecResult::new(String::new(), assignment_result.xtrace_output, 0);
                return Ok(self.apply_command_redirections(state, result, &effective_cmd.redirections));
            }
        };

        let cmd_name = expand_word(self.fs, state, name_word, None).value;
        let cmd = effective_cmd;

        // Expand arguments
        let mut args: Vec<String> = Vec::new();
        for arg in &cmd.args {
            let result = expand_word_with_glob(self.fs, state, arg, None);
            if let Some(words) = result.split_words {
                args.extend(words);
            } else {
                args.push(result.value);
            }
        }

        // `{fd}>file` / `{fd}<&N` style redirections allocate an FD and bind
        // it to a shell variable before the command runs, so the command can
        // see e.g. `$fd`.
        if let Some(err_result) = process_fd_variable_redirections(state, &cmd.redirections, |state, word| {
            expand_word(self.fs, state, word, None).value
        }) {
            return Ok(err_result);
        }

        let result = match self.resolve_command_stdin(state, &cmd.redirections, stdin) {
            Ok(effective_stdin) => self.dispatch_command(state, &cmd_name, &args, &effective_stdin),
            Err(msg) => Ok(ExecResult::new(String::new(), msg, 1)),
        };

        let result = result.map(|r| self.apply_command_redirections(state, r, &cmd.redirections));

        // Restore prefix assignments (`FOO=bar cmd`) once the command completes.
        for (name, previous) in assignment_result.temp_assignments {
            match previous {
                Some(value) => {
                    state.env.insert(name, value);
                }
                None => {
                    state.env.remove(&name);
                }
            }
        }

        result
    }

    /// Apply `>`, `>>`, `2>&1`, `&>`, and FD-redirect output handling to a
    /// command's result, writing to the backing filesystem as needed.
    fn apply_command_redirections(
        &self,
        state: &mut InterpreterState,
        result: ExecResult,
        redirections: &[crate::ast::types::RedirectionNode],
    ) -> ExecResult {
        if redirections.is_empty() {
            return result;
        }
        let cwd = state.cwd.clone();
        apply_redirections(
            state,
            result,
            redirections,
            None,
            |state, word| expand_word(self.fs, state, word, None).value,
            |target, content, append| {
                let path = self.fs.resolve_path(&cwd, target);
                if append {
                    self.fs.append_file(&path, content)
                } else {
                    self.fs.write_file(&path, content)
                }
                .map_err(|e| e.to_string())
            },
        )
    }

    /// Resolve the effective stdin for a command after applying `<`, `<<`,
    /// `<<-`, and `<<<` redirections targeting fd 0. Returns `Err` with a
    /// bash-style diagnostic if an input file can't be read.
    fn resolve_command_stdin(
        &self,
        state: &mut InterpreterState,
        redirections: &[crate::ast::types::RedirectionNode],
        default_stdin: &str,
    ) -> Result<String, String> {
        use crate::ast::types::{RedirectionOperator, RedirectionTarget};

        let mut stdin = default_stdin.to_string();
        for redir in redirections {
            if redir.fd_variable.is_some() || redir.fd.unwrap_or(0) != 0 {
                continue;
            }
            match (redir.operator, &redir.target) {
                (RedirectionOperator::Less, RedirectionTarget::Word(w))
                | (RedirectionOperator::LessGreat, RedirectionTarget::Word(w)) => {
                    let path_word = expand_word(self.fs, state, w, None).value;
                    let path = self.fs.resolve_path(&state.cwd, &path_word);
                    match self.fs.read_file(&path) {
                        Ok(contents) => stdin = contents,
                        Err(_) => {
                            return Err(format!("bash: {}: No such file or directory\n", path_word));
                        }
                    }
                }
                (RedirectionOperator::TLess, RedirectionTarget::Word(w)) => {
                    stdin = format!("{}\n", expand_word(self.fs, state, w, None).value);
                }
                (RedirectionOperator::DLess, RedirectionTarget::HereDoc(h))
                | (RedirectionOperator::DLessDash, RedirectionTarget::HereDoc(h)) => {
                    let mut content = expand_word(self.fs, state, &h.content, None).value;
                    if redir.operator == RedirectionOperator::DLessDash {
                        let had_trailing_newline = content.ends_with('\n');
                        let mut stripped = content
                            .lines()
                            .map(|line| line.trim_start_matches('\t'))
                            .collect::<Vec<_>>()
                            .join("\n");
                        if had_trailing_newline {
                            stripped.push('\n');
                        }
                        content = stripped;
                    }
                    stdin = content;
                }
                _ => {}
            }
        }
        Ok(stdin)
    }

    /// Dispatch an already-expanded command name/args to a function, a
    /// builtin, or the external command path.
    fn dispatch_command(
        &self,
        state: &mut InterpreterState,
        cmd_name: &str,
        args: &[String],
        stdin: &str,
    ) -> Result<ExecResult, InterpreterError> {
        use crate::interpreter::functions::{call_function, get_function};

        // `command`/`builtin` push a nested invocation context that skips
        // function lookup (and, for `builtin`, the external-command path
        // too) per the builtin contract's nested-invocation rule.
        match cmd_name {
            "command" => return self.execute_command_builtin(state, args, stdin),
            "builtin" => return self.execute_builtin_builtin(state, args, stdin),
            _ => {}
        }

        if let Some(func) = get_function(state, cmd_name).cloned() {
            let max_depth = self.limits.max_recursion_depth;
            return call_function(state, &func, args, stdin, Some(state.current_line), max_depth, |state, stdin| {
                self.execute_compound_command(state, &func.body, stdin)
            });
        }

        self.dispatch_builtin_or_external(state, cmd_name, args, stdin)
    }

    /// `command [-p|-v|-V] name [args...]` — run `name` as a builtin or
    /// external command, bypassing shell function lookup. `-v`/`-V` report
    /// how `name` would resolve instead of running it; `-p` uses a default
    /// `PATH` (approximated here as the session's own `PATH`, since this
    /// engine has no separate default-path table).
    fn execute_command_builtin(
        &self,
        state: &mut InterpreterState,
        args: &[String],
        stdin: &str,
    ) -> Result<ExecResult, InterpreterError> {
        let mut rest = args;
        let mut report_mode: Option<bool> = None; // Some(verbose_describe)
        let mut show_path = false;
        loop {
            match rest.first().map(|s| s.as_str()) {
                Some("-p") => { show_path = true; rest = &rest[1..]; }
                Some("-v") => { report_mode = Some(false); rest = &rest[1..]; }
                Some("-V") => { report_mode = Some(true); rest = &rest[1..]; }
                _ => break,
            }
        }
        let name = match rest.first() {
            Some(name) => name.clone(),
            None => return Ok(ExecResult::ok()),
        };
        if let Some(verbose_describe) = report_mode {
            let ctx = crate::interpreter::type_command::TypeCommandContext { state: &*state };
            return Ok(crate::interpreter::type_command::handle_command_v(
                &ctx,
                &[name],
                show_path,
                verbose_describe,
            ));
        }
        self.dispatch_builtin_or_external(state, &name, &rest[1..], stdin)
    }

    /// `builtin name [args...]` — run `name` only if it names a shell
    /// builtin, bypassing both function lookup and the external-command
    /// fallback. Exit 1 with a diagnostic if `name` is not a builtin.
    fn execute_builtin_builtin(
        &self,
        state: &mut InterpreterState,
        args: &[String],
        stdin: &str,
    ) -> Result<ExecResult, InterpreterError> {
        use crate::interpreter::builtins::SHELL_BUILTINS;

        let name = match args.first() {
            Some(name) => name.clone(),
            None => return Ok(ExecResult::ok()),
        };
        if !SHELL_BUILTINS.contains(&name.as_str()) {
            return Ok(ExecResult::new(
                String::new(),
                format!("bash: builtin: {}: not a shell builtin\n", name),
                1,
            ));
        }
        self.dispatch_builtin_or_external(state, &name, &args[1..], stdin)
    }

    /// The builtin-name match table plus the external-command fallback,
    /// shared by ordinary dispatch and by `command`/`builtin`'s bypass of
    /// function lookup.
    fn dispatch_builtin_or_external(
        &self,
        state: &mut InterpreterState,
        cmd_name: &str,
        args: &[String],
        stdin: &str,
    ) -> Result<ExecResult, InterpreterError> {
        use crate::interpreter::builtins;

        // `enable -n name` disables a builtin so name resolution falls
        // through to the external command library / PATH search instead,
        // per the `disabled_builtins` set named in the builtin contract.
        if cmd_name != "enable"
            && state.disabled_builtins.as_ref().map_or(false, |d| d.contains(cmd_name))
        {
            return self.run_external_or_not_found(state, cmd_name, args, stdin);
        }

        match cmd_name {
            "enable" => Ok(from_tuple(builtins::handle_enable(state, args))),
            "echo" => {
                let output = if args.is_empty() {
                    "\n".to_string()
                } else {
                    format!("{}\n", args.join(" "))
                };
                Ok(ExecResult::new(output, String::new(), 0))
            }
            "true" | ":" => Ok(ExecResult::ok()),
            "false" => Ok(ExecResult::new(String::new(), String::new(), 1)),
            "exit" => match builtins::handle_exit(state, args) {
                Ok(never) => match never {},
                Err(e) => Err(InterpreterError::Exit(e)),
            },
            "break" => Ok(from_builtin_result(builtins::handle_break(state, args)?)),
            "continue" => Ok(from_builtin_result(builtins::handle_continue(state, args)?)),
            "return" => Ok(from_builtin_result(builtins::handle_return(state, args)?)),
            "shift" => Ok(from_builtin_result(builtins::handle_shift(state, args)?)),
            "set" => Ok(from_builtin_result(builtins::handle_set(state, args)?)),
            "unset" => Ok(builtins::handle_unset(state, args)),
            "declare" | "typeset" => Ok(from_builtin_result(builtins::handle_declare(state, args))),
            "readonly" => Ok(from_builtin_result(builtins::handle_readonly(state, args))),
            "local" => Ok(builtins::handle_local(state, args)),
            "let" => Ok(from_tuple(builtins::handle_let(state, args))),
            "getopts" => Ok(from_tuple(builtins::handle_getopts(state, args))),
            "read" => Ok(from_builtin_result(builtins::handle_read(state, args, stdin, -1))),
            "hash" => Ok(from_tuple(builtins::handle_hash(state, args))),
            "help" => Ok(from_builtin_result(builtins::handle_help(args))),
            "shopt" => Ok(from_builtin_result(builtins::handle_shopt(state, args))),
            "mapfile" | "readarray" => Ok(from_builtin_result(builtins::handle_mapfile(state, args, stdin))),
            "pushd" => Ok(from_tuple(builtins::handle_pushd(state, args))),
            "popd" => Ok(from_tuple(builtins::handle_popd(state, args))),
            "dirs" => Ok(from_tuple(builtins::handle_dirs(state, args))),
            "compgen" => Ok(from_builtin_result(builtins::handle_compgen(state, args))),
            "complete" => Ok(from_builtin_result(builtins::handle_complete(state, args))),
            "compopt" => Ok(from_builtin_result(builtins::handle_compopt(state, args))),
            "export" => Ok(from_builtin_result(builtins::handle_export(state, args))),
            "test" | "[" => Ok(from_builtin_result(builtins::handle_test(state, self.fs, cmd_name, args))),
            "type" => {
                let path_env = state.env.get("PATH").cloned().unwrap_or_default();
                let ctx = crate::interpreter::type_command::TypeCommandContext { state: &*state };
                Ok(crate::interpreter::type_command::handle_type(
                    &ctx,
                    args,
                    |name| self.resolve_in_path(&path_env, name),
                    |name| self.resolve_all_in_path(&path_env, name),
                ))
            }
            "eval" => self.execute_eval(state, args, stdin),
            "source" | "." => self.execute_source(state, args),
            "trap" => Ok(from_tuple(builtins::handle_trap(state, args))),
            "jobs" => Ok(from_tuple(builtins::handle_jobs(state, args))),
            "fg" => Ok(from_tuple(builtins::handle_fg(state, args))),
            "bg" => Ok(from_tuple(builtins::handle_bg(state, args))),
            "wait" => Ok(from_tuple(builtins::handle_wait(state, args))),
            "kill" => Ok(from_tuple(builtins::handle_kill(state, args))),
            "disown" => Ok(from_tuple(builtins::handle_disown(state, args))),
            "alias" => Ok(from_tuple(builtins::handle_alias(state, args))),
            "unalias" => Ok(from_tuple(builtins::handle_unalias(state, args))),
            "umask" => Ok(from_tuple(builtins::handle_umask(state, args))),
            "ulimit" => Ok(from_tuple(builtins::handle_ulimit(state, args))),
            "times" => Ok(from_tuple(builtins::handle_times(state, args))),
            "history" => Ok(from_tuple(builtins::handle_history(state, args))),
            "exec" => {
                if args.is_empty() {
                    // No command: `exec` with only redirections would persist
                    // the fd-table, but this engine has no persistent
                    // per-session fd table beyond the default streams, so a
                    // bare `exec` is a no-op.
                    return Ok(ExecResult::ok());
                }
                let result = self.dispatch_command(state, &args[0], &args[1..], stdin)?;
                Err(InterpreterError::Exit(ExitError::new(
                    result.exit_code,
                    result.stdout,
                    result.stderr,
                )))
            }
            "cd" => {
                let target = args.first()
                    .map(|s| s.as_str())
                    .or_else(|| state.env.get("HOME").map(|s| s.as_str()))
                    .unwrap_or("/");

                let new_cwd = if target.starts_with('/') {
                    target.to_string()
                } else {
                    self.fs.resolve_path(&state.cwd, target)
                };

                if self.fs.is_dir(&new_cwd) {
                    state.env.insert("OLDPWD".to_string(), state.cwd.clone());
                    state.cwd = new_cwd.clone();
                    state.env.insert("PWD".to_string(), new_cwd);
                    Ok(ExecResult::ok())
                } else {
                    Ok(ExecResult::new(
                        String::new(),
                        format!("bash: cd: {}: No such file or directory\n", target),
                        1,
                    ))
                }
            }
            "pwd" => {
                Ok(ExecResult::new(
                    format!("{}\n", state.cwd),
                    String::new(),
                    0,
                ))
            }
            _ => self.run_external_or_not_found(state, cmd_name, args, stdin),
        }
    }

    /// Resolve `cmd_name` against the external command library / PATH,
    /// falling back to a `command not found` (exit 127) result.
    fn run_external_or_not_found(
        &self,
        state: &InterpreterState,
        cmd_name: &str,
        args: &[String],
        stdin: &str,
    ) -> Result<ExecResult, InterpreterError> {
        if let Some(result) =
            self.fs.run_external_command(cmd_name, args, stdin, &state.cwd, &state.env)
        {
            return Ok(result);
        }
        Ok(ExecResult::new(
            String::new(),
            format!("bash: {}: command not found\n", cmd_name),
            127,
        ))
    }

    /// Find the first executable named `name` on `path_env`.
    fn resolve_in_path(&self, path_env: &str, name: &str) -> Option<String> {
        use crate::interpreter::command_resolution::{build_command_path, split_path};
        split_path(path_env)
            .into_iter()
            .map(|dir| build_command_path(dir, name))
            .find(|candidate| self.fs.is_file(candidate))
    }

    /// Find every executable named `name` across `path_env`.
    fn resolve_all_in_path(&self, path_env: &str, name: &str) -> Vec<String> {
        use crate::interpreter::command_resolution::{build_command_path, split_path};
        split_path(path_env)
            .into_iter()
            .map(|dir| build_command_path(dir, name))
            .filter(|candidate| self.fs.is_file(candidate))
            .collect()
    }

    /// Run the re-parsed text of an alias that expanded to more than a
    /// single simple command (a pipeline, a compound command, multiple
    /// statements) in the current environment, the same way `eval` does.
    fn execute_alias_script(
        &self,
        state: &mut InterpreterState,
        script_text: &str,
        stdin: &str,
    ) -> Result<ExecResult, InterpreterError> {
        use crate::interpreter::builtins::{prepare_eval_stdin, restore_eval_stdin};

        let saved_stdin = prepare_eval_stdin(state, Some(stdin));
        let script = match crate::parser::parse(script_text) {
            Ok(script) => script,
            Err(e) => {
                restore_eval_stdin(state, saved_stdin);
                return Ok(ExecResult::failure(format!("bash: alias: {}\n", e)));
            }
        };

        let result = self.execute_script(state, &script);
        restore_eval_stdin(state, saved_stdin);
        result
    }

    /// `eval arg...` - concatenate arguments, re-parse, and execute in the
    /// current environment.
    fn execute_eval(
        &self,
        state: &mut InterpreterState,
        args: &[String],
        stdin: &str,
    ) -> Result<ExecResult, InterpreterError> {
        use crate::interpreter::builtins::{handle_eval_parse, prepare_eval_stdin, restore_eval_stdin};

        let eval_cmd = match handle_eval_parse(args) {
            Ok(Some(cmd)) => cmd,
            Ok(None) => return Ok(ExecResult::ok()),
            Err((stdout, stderr, exit_code)) => return Ok(ExecResult::new(stdout, stderr, exit_code)),
        };

        let saved_stdin = prepare_eval_stdin(state, Some(stdin));
        let script = match crate::parser::parse(&eval_cmd.command) {
            Ok(script) => script,
            Err(e) => {
                restore_eval_stdin(state, saved_stdin);
                return Ok(ExecResult::failure(format!("bash: eval: {}\n", e)));
            }
        };

        let result = self.execute_script(state, &script);
        restore_eval_stdin(state, saved_stdin);
        result
    }

    /// `source`/`.` FILE [args...] - read, parse, and execute a file in the
    /// current environment.
    fn execute_source(
        &self,
        state: &mut InterpreterState,
        args: &[String],
    ) -> Result<ExecResult, InterpreterError> {
        use crate::interpreter::builtins::{
            handle_source_parse, prepare_source_state, resolve_source_paths, restore_source_state,
            source_file_not_found,
        };

        let source_cmd = match handle_source_parse(args) {
            Ok(cmd) => cmd,
            Err((stdout, stderr, exit_code)) => return Ok(ExecResult::new(stdout, stderr, exit_code)),
        };

        let path_env = state.env.get("PATH").map(|s| s.as_str());
        let candidates = resolve_source_paths(&state.cwd, &source_cmd.filename, path_env);
        let found = candidates.iter().find(|p| self.fs.is_file(p)).cloned();

        let path = match found {
            Some(path) => path,
            None => return Ok(source_file_not_found(&source_cmd.filename)),
        };

        let contents = match self.fs.read_file(&path) {
            Ok(contents) => contents,
            Err(_) => return Ok(source_file_not_found(&source_cmd.filename)),
        };

        let saved = prepare_source_state(state, &source_cmd);
        let script = match crate::parser::parse(&contents) {
            Ok(script) => script,
            Err(e) => {
                restore_source_state(state, saved);
                return Ok(ExecResult::failure(format!("bash: {}: {}\n", source_cmd.filename, e)));
            }
        };

        let result = self.execute_script(state, &script);
        restore_source_state(state, saved);
        result
    }

    /// Execute a compound command (if, for, while, etc.).
    pub fn execute_compound_command(
        &self,
        state: &mut InterpreterState,
        compound: &CompoundCommandNode,
        stdin: &str,
    ) -> Result<ExecResult, InterpreterError> {
        match compound {
            CompoundCommandNode::If(if_node) => {
                // Build clauses for execute_if
                let clauses: Vec<(Vec<&StatementNode>, Vec<&StatementNode>)> = if_node
                    .clauses
                    .iter()
                    .map(|c| {
                        (
                            c.condition.iter().collect(),
                            c.body.iter().collect(),
                        )
                    })
                    .collect();

                let else_body: Option<Vec<&StatementNode>> =
                    if_node.else_body.as_ref().map(|b| b.iter().collect());

                let result = execute_if(
                    state,
                    &clauses,
                    else_body.as_deref(),
                    |state, stmt| {
                        let res = self.execute_statement(state, stmt)?;
                        Ok(ConditionResult {
                            stdout: res.stdout,
                            stderr: res.stderr,
                            exit_code: res.exit_code,
                        })
                    },
                    |state, stmt| self.execute_statement(state, stmt),
                )?;

                Ok(ExecResult::new(result.stdout, result.stderr, result.exit_code))
            }

            CompoundCommandNode::For(for_node) => {
                // Expand words
                let mut words: Vec<String> = Vec::new();
                if let Some(ref word_list) = for_node.words {
                    for word in word_list {
                        let result = expand_word_with_glob(self.fs, state, word, None);
                        if let Some(split) = result.split_words {
                            words.extend(split);
                        } else {
                            words.push(result.value);
                        }
                    }
                } else {
                    // Default to positional parameters
                    let argc: usize = state.env.get("#")
                        .and_then(|s| s.parse().ok())
                        .unwrap_or(0);
                    for i in 1..=argc {
                        if let Some(val) = state.env.get(&i.to_string()) {
                            words.push(val.clone());
                        }
                    }
                }

                let body: Vec<&StatementNode> = for_node.body.iter().collect();

                let result = execute_for(
                    state,
                    &for_node.variable,
                    &words,
                    &body,
                    self.limits.max_iterations,
                    |state, stmt| self.execute_statement(state, stmt),
                )?;

                Ok(ExecResult::new(result.stdout, result.stderr, result.exit_code))
            }

            CompoundCommandNode::While(while_node) => {
                let condition: Vec<&StatementNode> = while_node.condition.iter().collect();
                let body: Vec<&StatementNode> = while_node.body.iter().collect();

                let result = execute_while(
                    state,
                    &condition,
                    &body,
                    self.limits.max_iterations,
                    |state, stmt| {
                        let res = self.execute_statement(state, stmt)?;
                        Ok(ConditionResult {
                            stdout: res.stdout,
                            stderr: res.stderr,
                            exit_code: res.exit_code,
                        })
                    },
                    |state, stmt| self.execute_statement(state, stmt),
                )?;

                Ok(ExecResult::new(result.stdout, result.stderr, result.exit_code))
            }

            CompoundCommandNode::Until(until_node) => {
                let condition: Vec<&StatementNode> = until_node.condition.iter().collect();
                let body: Vec<&StatementNode> = until_node.body.iter().collect();

                let result = execute_until(
                    state,
                    &condition,
                    &body,
                    self.limits.max_iterations,
                    |state, stmt| {
                        let res = self.execute_statement(state, stmt)?;
                        Ok(ConditionResult {
                            stdout: res.stdout,
                            stderr: res.stderr,
                            exit_code: res.exit_code,
                        })
                    },
                    |state, stmt| self.execute_statement(state, stmt),
                )?;

                Ok(ExecResult::new(result.stdout, result.stderr, result.exit_code))
            }

            CompoundCommandNode::Case(case_node) => {
                use crate::ast::types::CaseTerminator as AstCaseTerminator;
                use crate::interpreter::conditionals::match_pattern;

                let word = expand_word_with_glob(self.fs, state, &case_node.word, None).value;
                let nocasematch = state.shopt_options.nocasematch;
                let extglob = state.shopt_options.extglob;

                let mut stdout = String::new();
                let mut stderr = String::new();
                let mut exit_code = 0;
                let mut matched = false;

                for (idx, item) in case_node.items.iter().enumerate() {
                    let mut item_matches = matched; // carried over via ;;&
                    if !item_matches {
                        for pattern in &item.patterns {
                            let pattern_str = expand_word_no_glob(
                                state,
                                pattern,
                                &crate::interpreter::word_expansion::WordExpansionOptions::default(),
                            )
                            .value;
                            if match_pattern(&word, &pattern_str, nocasematch, extglob) {
                                item_matches = true;
                                break;
                            }
                        }
                    }

                    if item_matches {
                        for stmt in &item.body {
                            let res = self.execute_statement(state, stmt)?;
                            stdout.push_str(&res.stdout);
                            stderr.push_str(&res.stderr);
                            exit_code = res.exit_code;
                        }

                        match item.terminator {
                            AstCaseTerminator::DoubleSemi => {
                                matched = false;
                                break;
                            }
                            AstCaseTerminator::SemiAnd => {
                                // Unconditionally fall through to the next item's body.
                                if idx + 1 < case_node.items.len() {
                                    matched = true;
                                    continue;
                                }
                                break;
                            }
                            AstCaseTerminator::SemiSemiAnd => {
                                // Continue checking patterns starting at the next item.
                                matched = false;
                                continue;
                            }
                        }
                    } else {
                        matched = false;
                    }
                }

                Ok(ExecResult::new(stdout, stderr, exit_code))
            }

            CompoundCommandNode::Subshell(subshell_node) => {
                execute_subshell(
                    state,
                    &subshell_node.body,
                    Some(stdin),
                    |state, stmt| self.execute_statement(state, stmt),
                )
            }

            CompoundCommandNode::Group(group_node) => {
                execute_group(
                    state,
                    &group_node.body,
                    Some(stdin),
                    |state, stmt| self.execute_statement(state, stmt),
                )
            }

            CompoundCommandNode::ArithmeticCommand(arith) => {
                use crate::interpreter::arithmetic::evaluate_arithmetic;
                use crate::interpreter::types::InterpreterContext;

                let mut ctx = InterpreterContext::new(state, self.limits);
                match evaluate_arithmetic(&mut ctx, &arith.expression.expression, false, None) {
                    Ok(value) => {
                        // Arithmetic command: exit 0 if non-zero, exit 1 if zero
                        let exit_code = if value != 0 { 0 } else { 1 };
                        Ok(ExecResult::new(String::new(), String::new(), exit_code))
                    }
                    Err(e) => {
                        Ok(ExecResult::new(
                            String::new(),
                            format!("bash: {}\n", e),
                            1,
                        ))
                    }
                }
            }

            CompoundCommandNode::ConditionalCommand(cond) => {
                use crate::interpreter::conditionals::evaluate_conditional_expression;

                let result = evaluate_conditional_expression(state, self.fs, &cond.expression);
                let exit_code = if result.value { 0 } else { 1 };
                Ok(ExecResult::new(String::new(), result.stderr, exit_code))
            }

            CompoundCommandNode::Coproc(coproc_node) => {
                self.execute_coproc(state, coproc_node)
            }

            CompoundCommandNode::CStyleFor(cfor) => {
                use crate::interpreter::arithmetic::evaluate_arithmetic;
                use crate::interpreter::helpers::loop_helpers::{handle_loop_error, LoopAction};
                use crate::interpreter::types::InterpreterContext;

                if let Some(ref init) = cfor.init {
                    let mut ctx = InterpreterContext::new(state, self.limits);
                    let _ = evaluate_arithmetic(&mut ctx, &init.expression, false, None);
                }

                let body: Vec<&StatementNode> = cfor.body.iter().collect();

                let mut stdout = String::new();
                let mut stderr = String::new();
                let mut exit_code = 0;
                let mut iterations: u64 = 0;

                state.loop_depth += 1;
                let prev_parent_has_loop_context = state.parent_has_loop_context;
                state.parent_has_loop_context = Some(true);

                let outcome: Result<(), InterpreterError> = 'outer: loop {
                    iterations += 1;
                    if iterations > self.limits.max_iterations {
                        break Err(InterpreterError::from(
                            crate::interpreter::errors::ExecutionLimitError::simple(
                                format!(
                                    "too many loop iterations (>{}), possible infinite loop",
                                    self.limits.max_iterations
                                ),
                                crate::interpreter::errors::LimitType::Iterations,
                            ),
                        ));
                    }

                    let cond_true = match &cfor.condition {
                        Some(cond) => {
                            let mut ctx = InterpreterContext::new(state, self.limits);
                            match evaluate_arithmetic(&mut ctx, &cond.expression, false, None) {
                                Ok(v) => v != 0,
                                Err(e) => break Err(InterpreterError::from(e)),
                            }
                        }
                        None => true,
                    };

                    if !cond_true {
                        break Ok(());
                    }

                    for stmt in &body {
                        match self.execute_statement(state, stmt) {
                            Ok(res) => {
                                stdout.push_str(&res.stdout);
                                stderr.push_str(&res.stderr);
                                exit_code = res.exit_code;
                            }
                            Err(e) => {
                                let handled = handle_loop_error(e, stdout.clone(), stderr.clone(), state.loop_depth);
                                stdout = handled.stdout;
                                stderr = handled.stderr;
                                match handled.action {
                                    LoopAction::Break => break 'outer Ok(()),
                                    LoopAction::Continue => break,
                                    LoopAction::Rethrow => break 'outer Err(handled.error.unwrap()),
                                    LoopAction::Error => {
                                        exit_code = handled.exit_code.unwrap_or(1);
                                        break 'outer Ok(());
                                    }
                                }
                            }
                        }
                    }

                    if let Some(ref update) = cfor.update {
                        let mut ctx = InterpreterContext::new(state, self.limits);
                        let _ = evaluate_arithmetic(&mut ctx, &update.expression, false, None);
                    }
                };

                state.loop_depth -= 1;
                state.parent_has_loop_context = prev_parent_has_loop_context;

                outcome?;
                Ok(ExecResult::new(stdout, stderr, exit_code))
            }
        }
    }

    /// Run a `coproc [NAME] command` compound command.
    ///
    /// A real coprocess runs its body as a separate OS process connected to
    /// the shell by two pipes, with `NAME[0]`/`NAME[1]`/`NAME_PID` bound
    /// immediately while the body keeps running in the background. This
    /// interpreter has no concurrent OS process behind any command (see the
    /// job-control note in `builtins::job_cmd`), so the body runs to
    /// completion here and now; its stdout is staged as the content of the
    /// virtual read fd so that a later `read -u "${NAME[0]}"` in the calling
    /// script observes what a real coprocess would have written by then.
    /// The coprocess is recorded `Stopped` from the moment it's bound, since
    /// there is no "running" interval to observe.
    fn execute_coproc(
        &self,
        state: &mut InterpreterState,
        coproc_node: &crate::ast::types::CoprocNode,
    ) -> Result<ExecResult, InterpreterError> {
        use crate::interpreter::types::{Coproc, CoprocState};

        let name = coproc_node.name.clone();
        let result = self.execute_statement(state, &coproc_node.body)?;

        let pgid = state.next_virtual_pid;
        state.next_virtual_pid += 1;

        let read_fd = state.next_fd.unwrap_or(10);
        state.next_fd = Some(read_fd + 1);
        let write_fd = state.next_fd.unwrap_or(read_fd + 1);
        state.next_fd = Some(write_fd + 1);

        let fds = state.file_descriptors.get_or_insert_with(HashMap::new);
        fds.insert(read_fd, result.stdout.clone());
        fds.insert(write_fd, String::new());

        crate::interpreter::helpers::array::set_array_element(&mut state.env, &name, 0, read_fd.to_string());
        crate::interpreter::helpers::array::set_array_element(&mut state.env, &name, 1, write_fd.to_string());
        state.env.insert(format!("{}_PID", name), pgid.to_string());

        let coprocs = state.coprocs.get_or_insert_with(HashMap::new);
        coprocs.insert(name.clone(), Coproc {
            name,
            pgid,
            read_fd,
            write_fd,
            state: CoprocState::Stopped,
            exit_code: Some(result.exit_code),
        });

        Ok(ExecResult::new(String::new(), result.stderr, 0))
    }
}

/// Convert a builtin's `{stdout, stderr, exit_code}` result into an `ExecResult`.
fn from_builtin_result(result: crate::interpreter::builtins::BuiltinResult) -> ExecResult {
    ExecResult::new(result.stdout, result.stderr, result.exit_code)
}

/// Convert a builtin's `(stdout, stderr, exit_code)` tuple result into an `ExecResult`.
fn from_tuple(result: (String, String, i32)) -> ExecResult {
    ExecResult::new(result.0, result.1, result.2)
}

// ============================================================================
// Tests
// ============================================================================
