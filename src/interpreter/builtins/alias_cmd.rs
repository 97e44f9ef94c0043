//! alias, unalias - Define, display, and remove command aliases.
//!
//! Aliases are stored as ordinary entries in `state.env` under the
//! `BASH_ALIAS_<name>` key, the same convention
//! `crate::interpreter::alias_expansion` uses to look them up during command
//! resolution. Keeping them in `env` (rather than a separate map) means the
//! existing state-delta / snapshot machinery for subshell isolation already
//! covers aliases for free.

use crate::interpreter::alias_expansion::{get_all_aliases, set_alias, unset_alias};
use crate::interpreter::types::InterpreterState;

/// Result type for builtin commands
pub type BuiltinResult = (String, String, i32);

/// `alias [-p] [name[=value] ...]`
///
/// No arguments: print every alias as `alias name='value'`. A bare `name`:
/// print that one alias, or fail with `not found`. `name=value`: define it.
pub fn handle_alias(state: &mut InterpreterState, args: &[String]) -> BuiltinResult {
    let args: &[String] = match args.first().map(|s| s.as_str()) {
        Some("-p") => &args[1..],
        _ => args,
    };

    if args.is_empty() {
        let mut aliases = get_all_aliases(&state.env);
        aliases.sort_by(|a, b| a.0.cmp(&b.0));
        let mut stdout = String::new();
        for (name, value) in aliases {
            stdout.push_str(&format!("alias {}='{}'\n", name, value));
        }
        return (stdout, String::new(), 0);
    }

    let mut stdout = String::new();
    let mut stderr = String::new();
    let mut exit_code = 0;

    for arg in args {
        if let Some(eq_idx) = arg.find('=') {
            let name = &arg[..eq_idx];
            let value = &arg[eq_idx + 1..];
            set_alias(&mut state.env, name, value);
        } else {
            match get_all_aliases(&state.env).into_iter().find(|(n, _)| n == arg) {
                Some((name, value)) => stdout.push_str(&format!("alias {}='{}'\n", name, value)),
                None => {
                    stderr.push_str(&format!("bash: alias: {}: not found\n", arg));
                    exit_code = 1;
                }
            }
        }
    }

    (stdout, stderr, exit_code)
}

/// `unalias [-a] name ...`
pub fn handle_unalias(state: &mut InterpreterState, args: &[String]) -> BuiltinResult {
    if args.first().map(|s| s.as_str()) == Some("-a") {
        for (name, _) in get_all_aliases(&state.env) {
            unset_alias(&mut state.env, &name);
        }
        return (String::new(), String::new(), 0);
    }

    if args.is_empty() {
        return (String::new(), "bash: unalias: usage: unalias [-a] name [name ...]\n".to_string(), 2);
    }

    let mut stderr = String::new();
    let mut exit_code = 0;
    for name in args {
        if !unset_alias(&mut state.env, name) {
            stderr.push_str(&format!("bash: unalias: {}: not found\n", name));
            exit_code = 1;
        }
    }
    (String::new(), stderr, exit_code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_define_and_list() {
        let mut state = InterpreterState::default();
        let (_, _, code) = handle_alias(&mut state, &["ll=ls -la".to_string()]);
        assert_eq!(code, 0);

        let (stdout, _, code) = handle_alias(&mut state, &[]);
        assert_eq!(code, 0);
        assert!(stdout.contains("alias ll='ls -la'"));
    }

    #[test]
    fn test_alias_show_one() {
        let mut state = InterpreterState::default();
        handle_alias(&mut state, &["ll=ls -la".to_string()]);
        let (stdout, stderr, code) = handle_alias(&mut state, &["ll".to_string()]);
        assert_eq!(code, 0);
        assert!(stderr.is_empty());
        assert_eq!(stdout, "alias ll='ls -la'\n");
    }

    #[test]
    fn test_alias_show_missing() {
        let mut state = InterpreterState::default();
        let (_, stderr, code) = handle_alias(&mut state, &["nope".to_string()]);
        assert_eq!(code, 1);
        assert!(stderr.contains("not found"));
    }

    #[test]
    fn test_unalias_removes() {
        let mut state = InterpreterState::default();
        handle_alias(&mut state, &["ll=ls -la".to_string()]);
        let (_, _, code) = handle_unalias(&mut state, &["ll".to_string()]);
        assert_eq!(code, 0);
        let (stdout, _, _) = handle_alias(&mut state, &[]);
        assert!(!stdout.contains("ll"));
    }

    #[test]
    fn test_unalias_all() {
        let mut state = InterpreterState::default();
        handle_alias(&mut state, &["ll=ls -la".to_string(), "la=ls -a".to_string()]);
        let (_, _, code) = handle_unalias(&mut state, &["-a".to_string()]);
        assert_eq!(code, 0);
        let (stdout, _, _) = handle_alias(&mut state, &[]);
        assert!(stdout.is_empty());
    }

    #[test]
    fn test_unalias_unknown() {
        let mut state = InterpreterState::default();
        let (_, stderr, code) = handle_unalias(&mut state, &["nope".to_string()]);
        assert_eq!(code, 1);
        assert!(stderr.contains("not found"));
    }
}
