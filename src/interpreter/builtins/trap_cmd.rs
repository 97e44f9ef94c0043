//! trap - Manage signal and pseudo-signal actions
//!
//! trap [-lp] [[arg] sigspec ...]
//!
//! With no arguments, `trap -p` (or a bare `trap`) lists the actions currently
//! registered. `trap -l` lists known signal names. `trap arg sigspec...`
//! registers `arg` as the action for each of `sigspec...`; an empty `arg`
//! means "ignore the signal", and `-` resets it to the default action.
//!
//! Pseudo-signals `EXIT`, `DEBUG`, `ERR`, and `RETURN` are consulted directly
//! by the executor (see `ExecutionEngine::fire_trap`) rather than by the OS.

use std::collections::HashMap;
use crate::interpreter::types::InterpreterState;

/// Result type for builtin commands
pub type BuiltinResult = (String, String, i32);

const PSEUDO_SIGNALS: &[&str] = &["EXIT", "DEBUG", "ERR", "RETURN"];

const SIGNAL_NAMES: &[&str] = &[
    "HUP", "INT", "QUIT", "ILL", "TRAP", "ABRT", "BUS", "FPE", "KILL", "USR1",
    "SEGV", "USR2", "PIPE", "ALRM", "TERM", "STKFLT", "CHLD", "CONT", "STOP",
    "TSTP", "TTIN", "TTOU", "URG", "XCPU", "XFSZ", "VTALRM", "PROF", "WINCH",
    "IO", "PWR", "SYS",
];

/// Normalize a sigspec: accept bare names (`INT`), `SIG`-prefixed names
/// (`SIGINT`), and numeric codes (`2`) where recognized; uppercase the rest.
fn normalize_signal(name: &str) -> Option<String> {
    let upper = name.to_uppercase();
    let trimmed = upper.strip_prefix("SIG").unwrap_or(&upper);
    if PSEUDO_SIGNALS.contains(&trimmed) {
        return Some(trimmed.to_string());
    }
    if SIGNAL_NAMES.contains(&trimmed) {
        return Some(trimmed.to_string());
    }
    if trimmed == "0" {
        return Some("EXIT".to_string());
    }
    if trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Some(trimmed.to_string());
    }
    None
}

fn get_traps(state: &mut InterpreterState) -> &mut HashMap<String, String> {
    if state.traps.is_none() {
        state.traps = Some(HashMap::new());
    }
    state.traps.as_mut().unwrap()
}

/// Handle the `trap` builtin.
pub fn handle_trap(state: &mut InterpreterState, args: &[String]) -> BuiltinResult {
    if args.is_empty() {
        return list_traps(state, false, &[]);
    }

    let mut i = 0;
    let mut list_mode = false;
    let mut print_mode = false;

    while i < args.len() && args[i].starts_with('-') && args[i] != "-" {
        match args[i].as_str() {
            "-l" => list_mode = true,
            "-p" => print_mode = true,
            "--" => {
                i += 1;
                break;
            }
            other => {
                return (String::new(), format!("bash: trap: {}: invalid option\n", other), 2);
            }
        }
        i += 1;
    }

    if list_mode {
        let mut out = String::new();
        for (n, name) in SIGNAL_NAMES.iter().enumerate() {
            out.push_str(&format!("{:2}) SIG{}\t", n + 1, name));
            if (n + 1) % 5 == 0 {
                out.push('\n');
            }
        }
        if !out.ends_with('\n') {
            out.push('\n');
        }
        return (out, String::new(), 0);
    }

    if print_mode {
        return list_traps(state, args.len() > i, &args[i..]);
    }

    if i >= args.len() {
        return list_traps(state, false, &[]);
    }

    // `trap sigspec...` with no action arg and no leading `-`/`--`: only valid
    // when every remaining token is a recognized signal name, in which case
    // bash still expects an action. We require the first token to be the
    // action (possibly "-" or "").
    let action = &args[i];
    i += 1;

    if i >= args.len() {
        return (
            String::new(),
            "bash: trap: usage: trap [-lp] [[arg] signal_spec ...]\n".to_string(),
            2,
        );
    }

    let mut stderr = String::new();
    let mut exit_code = 0;
    for sigspec in &args[i..] {
        match normalize_signal(sigspec) {
            Some(sig) => {
                let traps = get_traps(state);
                if action == "-" {
                    traps.remove(&sig);
                } else {
                    traps.insert(sig, action.clone());
                }
            }
            None => {
                stderr.push_str(&format!("bash: trap: {}: invalid signal specification\n", sigspec));
                exit_code = 1;
            }
        }
    }

    (String::new(), stderr, exit_code)
}

fn list_traps(state: &mut InterpreterState, filtered: bool, names: &[String]) -> BuiltinResult {
    let traps = get_traps(state);
    let mut stdout = String::new();
    let mut stderr = String::new();
    let mut exit_code = 0;

    if filtered {
        for name in names {
            match normalize_signal(name) {
                Some(sig) => {
                    if let Some(action) = traps.get(&sig) {
                        stdout.push_str(&format!("trap -- '{}' {}\n", action, sig));
                    }
                }
                None => {
                    stderr.push_str(&format!("bash: trap: {}: invalid signal specification\n", name));
                    exit_code = 1;
                }
            }
        }
    } else {
        let mut entries: Vec<(&String, &String)> = traps.iter().collect();
        entries.sort_by_key(|(k, _)| k.clone());
        for (sig, action) in entries {
            stdout.push_str(&format!("trap -- '{}' {}\n", action, sig));
        }
    }

    (stdout, stderr, exit_code)
}

/// Look up the action registered for `signal`, if any (used by the executor
/// to decide whether a trap needs firing without taking `&mut`).
pub fn trap_action<'a>(state: &'a InterpreterState, signal: &str) -> Option<&'a str> {
    state.traps.as_ref().and_then(|t| t.get(signal)).map(|s| s.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_list_trap() {
        let mut state = InterpreterState::default();
        let (_, stderr, code) = handle_trap(&mut state, &["echo bye".to_string(), "EXIT".to_string()]);
        assert!(stderr.is_empty());
        assert_eq!(code, 0);
        assert_eq!(trap_action(&state, "EXIT"), Some("echo bye"));
    }

    #[test]
    fn test_reset_trap() {
        let mut state = InterpreterState::default();
        handle_trap(&mut state, &["echo bye".to_string(), "EXIT".to_string()]);
        handle_trap(&mut state, &["-".to_string(), "EXIT".to_string()]);
        assert_eq!(trap_action(&state, "EXIT"), None);
    }

    #[test]
    fn test_invalid_signal() {
        let mut state = InterpreterState::default();
        let (_, stderr, code) = handle_trap(&mut state, &["echo hi".to_string(), "BOGUS".to_string()]);
        assert!(stderr.contains("invalid signal"));
        assert_eq!(code, 1);
    }

    #[test]
    fn test_sigint_normalizes() {
        let mut state = InterpreterState::default();
        handle_trap(&mut state, &["echo hi".to_string(), "SIGINT".to_string()]);
        assert_eq!(trap_action(&state, "INT"), Some("echo hi"));
    }
}
