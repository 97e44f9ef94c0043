//! history - Display or clear the session's recorded command history.
//!
//! Each top-level script fragment passed to `Bash::exec` is appended to
//! `state.command_history` (see `crate::bash::Bash::exec`) before it is
//! parsed. There is no readline-style interactive history editing here —
//! out of scope per the top-level spec — just the list itself and the
//! builtin that inspects it.

use crate::interpreter::types::InterpreterState;

/// Result type for builtin commands
pub type BuiltinResult = (String, String, i32);

/// `history [-c] [n]`
pub fn handle_history(state: &mut InterpreterState, args: &[String]) -> BuiltinResult {
    if args.first().map(|s| s.as_str()) == Some("-c") {
        if let Some(history) = state.command_history.as_mut() {
            history.clear();
        }
        return (String::new(), String::new(), 0);
    }

    let history = state.command_history.get_or_insert_with(Vec::new);
    let count = match args.first() {
        Some(arg) => match arg.parse::<usize>() {
            Ok(n) => n.min(history.len()),
            Err(_) => {
                return (
                    String::new(),
                    format!("bash: history: {}: numeric argument required\n", arg),
                    1,
                )
            }
        },
        None => history.len(),
    };

    let start = history.len().saturating_sub(count);
    let mut stdout = String::new();
    for (i, cmd) in history.iter().enumerate().skip(start) {
        stdout.push_str(&format!("{:5}  {}\n", i + 1, cmd));
    }
    (stdout, String::new(), 0)
}

/// Append an executed top-level script fragment to the history list.
pub fn record_history(state: &mut InterpreterState, script: &str) {
    if script.trim().is_empty() {
        return;
    }
    state.command_history.get_or_insert_with(Vec::new).push(script.trim().to_string());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_list() {
        let mut state = InterpreterState::default();
        record_history(&mut state, "echo hi");
        record_history(&mut state, "ls -la");
        let (stdout, _, code) = handle_history(&mut state, &[]);
        assert_eq!(code, 0);
        assert!(stdout.contains("1  echo hi"));
        assert!(stdout.contains("2  ls -la"));
    }

    #[test]
    fn test_history_limit_n() {
        let mut state = InterpreterState::default();
        record_history(&mut state, "a");
        record_history(&mut state, "b");
        record_history(&mut state, "c");
        let (stdout, _, _) = handle_history(&mut state, &["1".to_string()]);
        assert!(stdout.contains("3  c"));
        assert!(!stdout.contains("a"));
    }

    #[test]
    fn test_history_clear() {
        let mut state = InterpreterState::default();
        record_history(&mut state, "echo hi");
        let (_, _, code) = handle_history(&mut state, &["-c".to_string()]);
        assert_eq!(code, 0);
        assert!(state.command_history.unwrap().is_empty());
    }

    #[test]
    fn test_record_ignores_blank() {
        let mut state = InterpreterState::default();
        record_history(&mut state, "   ");
        assert!(state.command_history.is_none());
    }
}
