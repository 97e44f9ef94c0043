//! Control Flow Execution
//!
//! Handles control flow constructs:
//! - if/elif/else
//! - for loops
//! - C-style for loops
//! - while loops
//! - until loops
//! - case statements
//! - break/continue

use regex_lite::Regex;

/// Validate that a variable name is a valid identifier.
/// Returns true if valid, false otherwise.
pub fn is_valid_identifier(name: &str) -> bool {
    let re = Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*$").unwrap();
    re.is_match(name)
}

/// Case statement terminator types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseTerminator {
    /// ;; - stop, no fall-through
    Break,
    /// ;& - unconditional fall-through (execute next body without pattern check)
    FallThrough,
    /// ;;& - continue pattern matching (check next case patterns)
    ContinueMatching,
}

impl CaseTerminator {
    /// Parse a terminator string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            ";;" => Some(CaseTerminator::Break),
            ";&" => Some(CaseTerminator::FallThrough),
            ";;&" => Some(CaseTerminator::ContinueMatching),
            _ => None,
        }
    }

    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            CaseTerminator::Break => ";;",
            CaseTerminator::FallThrough => ";&",
            CaseTerminator::ContinueMatching => ";;&",
        }
    }
}

// =============================================================================
// Loop / conditional execution drivers
// =============================================================================
//
// These tie the AST shapes in `ast::types` to the generic error-propagation
// rules in `helpers::loop_helpers`. They are generic over the statement
// executor so the engine can thread its own recursive `execute_statement`
// through without this module depending on `execution_engine`.

use crate::ast::types::StatementNode;
use crate::interpreter::errors::InterpreterError;
use crate::interpreter::helpers::condition::ConditionResult;
use crate::interpreter::helpers::loop_helpers::{handle_loop_error, LoopAction};
use crate::interpreter::types::{ExecResult, InterpreterState};

/// Result of a `for`/`while`/`until` loop. Shape-compatible with `ExecResult`.
pub type ForResult = ExecResult;

/// Execute an `if`/`elif`/`else` chain.
///
/// `clauses` is `(condition_statements, body_statements)` pairs in source
/// order; the first clause whose condition exits 0 has its body executed.
/// Falls back to `else_body` if no clause matches.
pub fn execute_if<FC, FB>(
    state: &mut InterpreterState,
    clauses: &[(Vec<&StatementNode>, Vec<&StatementNode>)],
    else_body: Option<&[&StatementNode]>,
    mut execute_condition: FC,
    mut execute_body: FB,
) -> Result<ExecResult, InterpreterError>
where
    FC: FnMut(&mut InterpreterState, &StatementNode) -> Result<ConditionResult, InterpreterError>,
    FB: FnMut(&mut InterpreterState, &StatementNode) -> Result<ExecResult, InterpreterError>,
{
    let mut stdout = String::new();
    let mut stderr = String::new();

    for (condition, body) in clauses {
        let prev_in_condition = state.in_condition;
        state.in_condition = true;
        let mut cond_exit = 0;
        let mut cond_err = None;
        for stmt in condition {
            match execute_condition(state, stmt) {
                Ok(res) => {
                    stdout.push_str(&res.stdout);
                    stderr.push_str(&res.stderr);
                    cond_exit = res.exit_code;
                }
                Err(e) => {
                    cond_err = Some(e);
                    break;
                }
            }
        }
        state.in_condition = prev_in_condition;
        if let Some(e) = cond_err {
            return Err(e);
        }

        if cond_exit == 0 {
            let mut exit_code = 0;
            for stmt in body {
                let res = execute_body(state, stmt)?;
                stdout.push_str(&res.stdout);
                stderr.push_str(&res.stderr);
                exit_code = res.exit_code;
            }
            return Ok(ExecResult::new(stdout, stderr, exit_code));
        }
    }

    if let Some(body) = else_body {
        let mut exit_code = 0;
        for stmt in body {
            let res = execute_body(state, stmt)?;
            stdout.push_str(&res.stdout);
            stderr.push_str(&res.stderr);
            exit_code = res.exit_code;
        }
        return Ok(ExecResult::new(stdout, stderr, exit_code));
    }

    Ok(ExecResult::new(stdout, stderr, 0))
}

/// Execute a `for NAME in WORDS; do ...; done` loop body over pre-expanded words.
pub fn execute_for<FB>(
    state: &mut InterpreterState,
    variable: &str,
    words: &[String],
    body: &[&StatementNode],
    max_iterations: u64,
    mut execute_body: FB,
) -> Result<ForResult, InterpreterError>
where
    FB: FnMut(&mut InterpreterState, &StatementNode) -> Result<ExecResult, InterpreterError>,
{
    let mut stdout = String::new();
    let mut stderr = String::new();
    let mut exit_code = 0;
    let mut iterations: u64 = 0;

    state.loop_depth += 1;
    let prev_parent_has_loop_context = state.parent_has_loop_context;
    state.parent_has_loop_context = Some(true);

    let outcome = 'outer: loop {
        for word in words {
            iterations += 1;
            if iterations > max_iterations {
                break 'outer Err(InterpreterError::from(
                    crate::interpreter::errors::ExecutionLimitError::simple(
                        format!("too many loop iterations (>{}), possible infinite loop", max_iterations),
                        crate::interpreter::errors::LimitType::Iterations,
                    ),
                ));
            }

            state.env.insert(variable.to_string(), word.clone());

            let mut broke = false;
            for stmt in body {
                match execute_body(state, stmt) {
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
                            LoopAction::Break => {
                                broke = true;
                                break;
                            }
                            LoopAction::Continue => break,
                            LoopAction::Rethrow => break 'outer Err(handled.error.unwrap()),
                            LoopAction::Error => {
                                exit_code = handled.exit_code.unwrap_or(1);
                                broke = true;
                                break;
                            }
                        }
                    }
                }
            }
            if broke {
                break 'outer Ok(());
            }
        }
        break 'outer Ok(());
    };

    state.loop_depth -= 1;
    state.parent_has_loop_context = prev_parent_has_loop_context;

    outcome?;
    Ok(ExecResult::new(stdout, stderr, exit_code))
}

/// Execute a `while`/`until` style loop, sharing the condition-polarity via `until`.
fn execute_conditional_loop<FC, FB>(
    state: &mut InterpreterState,
    condition: &[&StatementNode],
    body: &[&StatementNode],
    max_iterations: u64,
    until: bool,
    mut execute_condition: FC,
    mut execute_body: FB,
) -> Result<ExecResult, InterpreterError>
where
    FC: FnMut(&mut InterpreterState, &StatementNode) -> Result<ConditionResult, InterpreterError>,
    FB: FnMut(&mut InterpreterState, &StatementNode) -> Result<ExecResult, InterpreterError>,
{
    let mut stdout = String::new();
    let mut stderr = String::new();
    let mut exit_code = 0;
    let mut iterations: u64 = 0;

    state.loop_depth += 1;
    let prev_parent_has_loop_context = state.parent_has_loop_context;
    state.parent_has_loop_context = Some(true);

    let outcome: Result<(), InterpreterError> = 'outer: loop {
        iterations += 1;
        if iterations > max_iterations {
            break Err(InterpreterError::from(
                crate::interpreter::errors::ExecutionLimitError::simple(
                    format!("too many loop iterations (>{}), possible infinite loop", max_iterations),
                    crate::interpreter::errors::LimitType::Iterations,
                ),
            ));
        }

        let prev_in_condition = state.in_condition;
        state.in_condition = true;
        let mut cond_exit = 0;
        let mut cond_err = None;
        for stmt in condition {
            match execute_condition(state, stmt) {
                Ok(res) => {
                    stdout.push_str(&res.stdout);
                    stderr.push_str(&res.stderr);
                    cond_exit = res.exit_code;
                }
                Err(e) => {
                    cond_err = Some(e);
                    break;
                }
            }
        }
        state.in_condition = prev_in_condition;
        if let Some(e) = cond_err {
            break Err(e);
        }

        let should_continue = if until { cond_exit != 0 } else { cond_exit == 0 };
        if !should_continue {
            break Ok(());
        }

        for stmt in body {
            match execute_body(state, stmt) {
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
    };

    state.loop_depth -= 1;
    state.parent_has_loop_context = prev_parent_has_loop_context;

    outcome?;
    Ok(ExecResult::new(stdout, stderr, exit_code))
}

/// Execute a `while COND; do ...; done` loop.
pub fn execute_while<FC, FB>(
    state: &mut InterpreterState,
    condition: &[&StatementNode],
    body: &[&StatementNode],
    max_iterations: u64,
    execute_condition: FC,
    execute_body: FB,
) -> Result<ExecResult, InterpreterError>
where
    FC: FnMut(&mut InterpreterState, &StatementNode) -> Result<ConditionResult, InterpreterError>,
    FB: FnMut(&mut InterpreterState, &StatementNode) -> Result<ExecResult, InterpreterError>,
{
    execute_conditional_loop(state, condition, body, max_iterations, false, execute_condition, execute_body)
}

/// Execute an `until COND; do ...; done` loop.
pub fn execute_until<FC, FB>(
    state: &mut InterpreterState,
    condition: &[&StatementNode],
    body: &[&StatementNode],
    max_iterations: u64,
    execute_condition: FC,
    execute_body: FB,
) -> Result<ExecResult, InterpreterError>
where
    FC: FnMut(&mut InterpreterState, &StatementNode) -> Result<ConditionResult, InterpreterError>,
    FB: FnMut(&mut InterpreterState, &StatementNode) -> Result<ExecResult, InterpreterError>,
{
    execute_conditional_loop(state, condition, body, max_iterations, true, execute_condition, execute_body)
}
