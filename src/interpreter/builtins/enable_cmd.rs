//! enable - Enable or disable shell builtins.
//!
//! `enable -n name` marks a builtin disabled: name resolution then skips
//! straight to the external command library / PATH search for that name
//! (see `disabled_builtins` in the builtin contract). `enable name` or
//! `enable` with no flags re-enables / lists builtins.

use crate::interpreter::builtins::compgen_cmd::SHELL_BUILTINS;
use crate::interpreter::types::InterpreterState;

/// Result type for builtin commands
pub type BuiltinResult = (String, String, i32);

pub fn handle_enable(state: &mut InterpreterState, args: &[String]) -> BuiltinResult {
    let mut disable = false;
    let mut show_disabled_only = false;
    let mut names: Vec<String> = Vec::new();

    for arg in args {
        match arg.as_str() {
            "-n" => disable = true,
            "-a" | "-p" => {}
            "-a " => {}
            "-s" => show_disabled_only = true,
            other if other.starts_with('-') && other.len() > 1 => {}
            other => names.push(other.to_string()),
        }
    }

    if names.is_empty() {
        let disabled = state.disabled_builtins.clone().unwrap_or_default();
        let mut stdout = String::new();
        for name in SHELL_BUILTINS {
            let is_disabled = disabled.contains(*name);
            if show_disabled_only && !is_disabled {
                continue;
            }
            if is_disabled {
                stdout.push_str(&format!("enable -n {}\n", name));
            } else if !show_disabled_only {
                stdout.push_str(&format!("enable {}\n", name));
            }
        }
        return (stdout, String::new(), 0);
    }

    let mut stderr = String::new();
    let mut exit_code = 0;
    for name in &names {
        if !SHELL_BUILTINS.contains(&name.as_str()) {
            stderr.push_str(&format!("bash: enable: {}: not a shell builtin\n", name));
            exit_code = 1;
            continue;
        }
        let set = state.disabled_builtins.get_or_insert_with(Default::default);
        if disable {
            set.insert(name.clone());
        } else {
            set.remove(name);
        }
    }
    (String::new(), stderr, exit_code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disable_then_reenable() {
        let mut state = InterpreterState::default();
        let (_, _, code) = handle_enable(&mut state, &["-n".to_string(), "echo".to_string()]);
        assert_eq!(code, 0);
        assert!(state.disabled_builtins.as_ref().unwrap().contains("echo"));

        let (_, _, code) = handle_enable(&mut state, &["echo".to_string()]);
        assert_eq!(code, 0);
        assert!(!state.disabled_builtins.as_ref().unwrap().contains("echo"));
    }

    #[test]
    fn test_enable_unknown_builtin() {
        let mut state = InterpreterState::default();
        let (_, stderr, code) = handle_enable(&mut state, &["-n".to_string(), "not-a-builtin".to_string()]);
        assert_eq!(code, 1);
        assert!(stderr.contains("not a shell builtin"));
    }

    #[test]
    fn test_enable_list_disabled_only() {
        let mut state = InterpreterState::default();
        handle_enable(&mut state, &["-n".to_string(), "echo".to_string()]);
        let (stdout, _, code) = handle_enable(&mut state, &["-s".to_string()]);
        assert_eq!(code, 0);
        assert!(stdout.contains("enable -n echo"));
    }
}
