//! umask, ulimit, times - Process/session resource-limit and accounting
//! builtins that don't fit any other module.
//!
//! The interpreter has no real process behind a session, so `ulimit` and
//! `times` report recorded/virtual values rather than kernel-sourced ones;
//! `umask` is the one of the three that actually affects behaviour (new
//! files created by the external command library honour it).

use crate::interpreter::types::InterpreterState;

/// Result type for builtin commands
pub type BuiltinResult = (String, String, i32);

/// `umask [-S] [mode]`
pub fn handle_umask(state: &mut InterpreterState, args: &[String]) -> BuiltinResult {
    let symbolic = args.first().map(|s| s.as_str()) == Some("-S");
    let rest: &[String] = if symbolic { &args[1..] } else { args };

    if let Some(mode) = rest.first() {
        match u32::from_str_radix(mode, 8) {
            Ok(value) if value <= 0o777 => {
                state.umask = value;
                (String::new(), String::new(), 0)
            }
            _ => (String::new(), format!("bash: umask: {}: invalid octal number\n", mode), 1),
        }
    } else if symbolic {
        let perm = |bit: u32| -> String {
            let mut s = String::new();
            if bit & 0o4 == 0 { s.push('r'); }
            if bit & 0o2 == 0 { s.push('w'); }
            if bit & 0o1 == 0 { s.push('x'); }
            s
        };
        (
            format!(
                "u={},g={},o={}\n",
                perm((state.umask >> 6) & 0o7),
                perm((state.umask >> 3) & 0o7),
                perm(state.umask & 0o7),
            ),
            String::new(),
            0,
        )
    } else {
        (format!("{:04o}\n", state.umask), String::new(), 0)
    }
}

/// `ulimit [-a] [-SH] [-c|-d|-f|-n|-s|-t|-u|-v [limit]]`
///
/// Supports the subset of resources commonly queried/set from scripts;
/// limits are tracked per-session in `state.ulimits` rather than applied to
/// any real OS resource.
pub fn handle_ulimit(state: &mut InterpreterState, args: &[String]) -> BuiltinResult {
    const RESOURCES: &[(&str, &str, &str)] = &[
        ("-c", "core", "core file size (blocks)"),
        ("-d", "data", "data seg size (kbytes)"),
        ("-f", "file", "file size (blocks)"),
        ("-n", "nofile", "open files"),
        ("-s", "stack", "stack size (kbytes)"),
        ("-t", "cpu", "cpu time (seconds)"),
        ("-u", "nproc", "max user processes"),
        ("-v", "as", "virtual memory (kbytes)"),
    ];

    let mut show_all = false;
    let mut resource = "file";
    let mut new_value: Option<String> = None;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "-a" => show_all = true,
            "-H" | "-S" => {}
            flag if RESOURCES.iter().any(|(f, _, _)| *f == flag) => {
                resource = RESOURCES.iter().find(|(f, _, _)| *f == flag).unwrap().1;
            }
            value => new_value = Some(value.to_string()),
        }
        i += 1;
    }

    let limits = state.ulimits.get_or_insert_with(Default::default);

    if show_all {
        let mut stdout = String::new();
        for (_, key, label) in RESOURCES {
            let value = limits.get(*key).cloned().unwrap_or_else(|| "unlimited".to_string());
            stdout.push_str(&format!("{}\t\t{}\n", label, value));
        }
        return (stdout, String::new(), 0);
    }

    match new_value {
        Some(value) => {
            limits.insert(resource.to_string(), value);
            (String::new(), String::new(), 0)
        }
        None => {
            let value = limits.get(resource).cloned().unwrap_or_else(|| "unlimited".to_string());
            (format!("{}\n", value), String::new(), 0)
        }
    }
}

/// `times` - report accumulated user/system CPU time.
///
/// No real process accounting is available, so this reports zeroed
/// times in bash's `times` output shape rather than omitting the builtin.
pub fn handle_times(_state: &InterpreterState, _args: &[String]) -> BuiltinResult {
    ("0m0.000s 0m0.000s\n0m0.000s 0m0.000s\n".to_string(), String::new(), 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_umask_display_default() {
        let mut state = InterpreterState::default();
        state.umask = 0o022;
        let (stdout, _, code) = handle_umask(&mut state, &[]);
        assert_eq!(code, 0);
        assert_eq!(stdout, "0022\n");
    }

    #[test]
    fn test_umask_set() {
        let mut state = InterpreterState::default();
        let (_, _, code) = handle_umask(&mut state, &["027".to_string()]);
        assert_eq!(code, 0);
        assert_eq!(state.umask, 0o027);
    }

    #[test]
    fn test_umask_invalid() {
        let mut state = InterpreterState::default();
        let (_, stderr, code) = handle_umask(&mut state, &["999".to_string()]);
        assert_eq!(code, 1);
        assert!(stderr.contains("invalid octal"));
    }

    #[test]
    fn test_umask_symbolic() {
        let mut state = InterpreterState::default();
        state.umask = 0o022;
        let (stdout, _, code) = handle_umask(&mut state, &["-S".to_string()]);
        assert_eq!(code, 0);
        assert_eq!(stdout, "u=rwx,g=rx,o=rx\n");
    }

    #[test]
    fn test_ulimit_set_and_get() {
        let mut state = InterpreterState::default();
        let (_, _, code) = handle_ulimit(&mut state, &["-n".to_string(), "1024".to_string()]);
        assert_eq!(code, 0);
        let (stdout, _, _) = handle_ulimit(&mut state, &["-n".to_string()]);
        assert_eq!(stdout, "1024\n");
    }

    #[test]
    fn test_ulimit_default_unlimited() {
        let mut state = InterpreterState::default();
        let (stdout, _, code) = handle_ulimit(&mut state, &["-c".to_string()]);
        assert_eq!(code, 0);
        assert_eq!(stdout, "unlimited\n");
    }

    #[test]
    fn test_times_reports_zeroed_output() {
        let state = InterpreterState::default();
        let (stdout, _, code) = handle_times(&state, &[]);
        assert_eq!(code, 0);
        assert!(stdout.contains("0m0.000s"));
    }
}
