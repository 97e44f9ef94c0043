//! Directory Stack Builtins: pushd, popd, dirs
//!
//! pushd [dir] - Push directory onto stack and cd to it
//! popd - Pop directory from stack and cd to previous
//! dirs [-clpv] - Display directory stack

use crate::interpreter::types::InterpreterState;

/// Result type for builtin commands
pub type BuiltinResult = (String, String, i32);

/// Get the directory stack, initializing if needed
fn get_stack(state: &mut InterpreterState) -> &mut Vec<String> {
    if state.directory_stack.is_none() {
        state.directory_stack = Some(Vec::new());
    }
    state.directory_stack.as_mut().unwrap()
}

/// Format a path, replacing HOME prefix with ~
fn format_path(path: &str, home: &str) -> String {
    if !home.is_empty() && path == home {
        return "~".to_string();
    }
    if !home.is_empty() && path.starts_with(&format!("{}/", home)) {
        return format!("~{}", &path[home.len()..]);
    }
    path.to_string()
}

/// Normalize a path by resolving . and ..
fn normalize_path(path: &str) -> String {
    let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty() && *p != ".").collect();
    let mut result: Vec<&str> = Vec::new();

    for part in parts {
        if part == ".." {
            result.pop();
        } else {
            result.push(part);
        }
    }

    format!("/{}", result.join("/"))
}

/// A `+N`/`-N` stack-rotation argument, as accepted by `pushd`/`popd`.
///
/// `+N` counts from the left of `dirs` output (0 = current directory);
/// `-N` counts from the right (0 = the stack's last entry).
#[derive(Clone, Copy)]
enum RotationArg {
    FromLeft(usize),
    FromRight(usize),
}

fn parse_rotation_arg(arg: &str) -> Option<RotationArg> {
    if let Some(rest) = arg.strip_prefix('+') {
        rest.parse::<usize>().ok().map(RotationArg::FromLeft)
    } else if let Some(rest) = arg.strip_prefix('-') {
        rest.parse::<usize>().ok().map(RotationArg::FromRight)
    } else {
        None
    }
}

/// Rotate `full_stack` (cwd followed by the directory stack, left-to-right
/// as `dirs` prints it) so that the entry named by `rotation` becomes the
/// new front. Returns `None` if the index is out of range.
fn rotate_full_stack(full_stack: &[String], rotation: RotationArg) -> Option<Vec<String>> {
    let len = full_stack.len();
    let index = match rotation {
        RotationArg::FromLeft(n) => n,
        RotationArg::FromRight(n) => len.checked_sub(1)?.checked_sub(n)?,
    };
    if index >= len {
        return None;
    }
    let mut rotated = full_stack[index..].to_vec();
    rotated.extend_from_slice(&full_stack[..index]);
    Some(rotated)
}

/// Handle the `pushd` builtin command.
///
/// `pushd [-n] [dir]` pushes the current directory and cds to `dir`.
/// `pushd [-n] +N|-N` rotates the stack so the Nth entry (see
/// `RotationArg`) becomes current.
///
/// `-n`: suppresses the directory change. For a `dir`/rotation argument
/// this means the stack is reshaped exactly as it would be otherwise, but
/// `cwd`/`PWD`/`OLDPWD` are left untouched and the old `cwd` is never
/// pushed onto the stack (there is nothing to return to, since the shell
/// never left it). This is the documented resolution of the "weird case"
/// bash's own source leaves underspecified for the `-n`/`+N`/`-N`
/// interaction.
///
/// Note: This implementation does not verify directory existence (requires fs access).
/// The runtime should verify the directory exists before calling this.
pub fn handle_pushd(state: &mut InterpreterState, args: &[String]) -> BuiltinResult {
    let mut target_dir: Option<String> = None;
    let mut rotation: Option<RotationArg> = None;
    let mut no_cd = false;

    // Parse arguments
    let mut i = 0;
    while i < args.len() {
        let arg = &args[i];
        if arg == "--" {
            if i + 1 < args.len() {
                if target_dir.is_some() || rotation.is_some() {
                    return (String::new(), "bash: pushd: too many arguments\n".to_string(), 2);
                }
                target_dir = Some(args[i + 1].clone());
                i += 1;
            }
        } else if arg == "-n" {
            no_cd = true;
        } else if let Some(r) = parse_rotation_arg(arg) {
            if target_dir.is_some() || rotation.is_some() {
                return (String::new(), "bash: pushd: too many arguments\n".to_string(), 2);
            }
            rotation = Some(r);
        } else if arg.starts_with('-') && arg != "-" {
            return (String::new(), format!("bash: pushd: {}: invalid option\n", arg), 2);
        } else {
            if target_dir.is_some() || rotation.is_some() {
                return (String::new(), "bash: pushd: too many arguments\n".to_string(), 2);
            }
            target_dir = Some(arg.clone());
        }
        i += 1;
    }

    if let Some(rotation) = rotation {
        let cwd_clone = state.cwd.clone();
        let stack = get_stack(state);
        let mut full_stack = vec![cwd_clone];
        full_stack.extend(stack.iter().cloned());

        let rotated = match rotate_full_stack(&full_stack, rotation) {
            Some(r) => r,
            None => return (String::new(), "bash: pushd: directory stack index out of range\n".to_string(), 1),
        };

        let new_cwd = rotated[0].clone();
        let new_stack = rotated[1..].to_vec();

        if !no_cd {
            state.previous_dir = state.cwd.clone();
            state.cwd = new_cwd.clone();
            state.env.insert("PWD".to_string(), new_cwd.clone());
            state.env.insert("OLDPWD".to_string(), state.previous_dir.clone());
        }
        state.directory_stack = Some(new_stack);

        let home = state.env.get("HOME").cloned().unwrap_or_default();
        let display_front = if no_cd { &full_stack[0] } else { &new_cwd };
        let mut output_parts = vec![format_path(display_front, &home)];
        for dir in state.directory_stack.as_ref().unwrap().iter() {
            output_parts.push(format_path(dir, &home));
        }
        return (format!("{}\n", output_parts.join(" ")), String::new(), 0);
    }

    let stack = get_stack(state);

    if target_dir.is_none() {
        // No dir specified - swap top two entries if possible
        if stack.len() < 2 {
            return (String::new(), "bash: pushd: no other directory\n".to_string(), 1);
        }
        stack.swap(0, 1);
        target_dir = Some(stack[0].clone());
    }

    let target = target_dir.unwrap();

    // Resolve the target directory
    let resolved_dir = if target.starts_with('/') {
        target.clone()
    } else if target == ".." {
        let parts: Vec<&str> = state.cwd.split('/').filter(|p| !p.is_empty()).collect();
        if parts.is_empty() {
            "/".to_string()
        } else {
            format!("/{}", parts[..parts.len().saturating_sub(1)].join("/"))
        }
    } else if target == "." {
        state.cwd.clone()
    } else if target.starts_with('~') {
        let home = state.env.get("HOME").cloned().unwrap_or_else(|| "/".to_string());
        format!("{}{}", home, &target[1..])
    } else {
        format!("{}/{}", state.cwd, target)
    };

    // Normalize the path
    let resolved_dir = normalize_path(&resolved_dir);

    // Note: Directory existence check should be done by the runtime
    // For now, we assume the directory exists

    if no_cd {
        // -n: stash the target on the stack without leaving the current directory.
        let stack = get_stack(state);
        stack.insert(0, resolved_dir.clone());

        let home = state.env.get("HOME").cloned().unwrap_or_default();
        let mut output_parts = vec![format_path(&state.cwd.clone(), &home)];
        for dir in get_stack(state).iter() {
            output_parts.push(format_path(dir, &home));
        }
        return (format!("{}\n", output_parts.join(" ")), String::new(), 0);
    }

    // Push current directory onto stack
    let cwd_clone = state.cwd.clone();
    let stack = get_stack(state);
    stack.insert(0, cwd_clone);

    // Change to new directory
    state.previous_dir = state.cwd.clone();
    state.cwd = resolved_dir.clone();
    state.env.insert("PWD".to_string(), resolved_dir.clone());
    state.env.insert("OLDPWD".to_string(), state.previous_dir.clone());

    // Output the stack (pushd DOES do tilde substitution)
    let home = state.env.get("HOME").cloned().unwrap_or_default();
    let stack = get_stack(state);
    let mut output_parts = vec![format_path(&resolved_dir, &home)];
    for dir in stack.iter() {
        output_parts.push(format_path(dir, &home));
    }
    let output = format!("{}\n", output_parts.join(" "));

    (output, String::new(), 0)
}

/// Handle the `popd` builtin command.
///
/// `popd [-n] [+N|-N]` removes an entry from the stack and, unless `-n`
/// is given, cds to the new top of stack. With no `+N`/`-N` the removed
/// entry is the top of the stack (position 0); with a rotation argument
/// it's the Nth entry (see `RotationArg`), and the rest of the stack is
/// otherwise left in order. `-n` suppresses the directory change: only
/// the stack entry is removed, `cwd`/`PWD`/`OLDPWD` are untouched.
pub fn handle_popd(state: &mut InterpreterState, args: &[String]) -> BuiltinResult {
    let mut rotation: Option<RotationArg> = None;
    let mut no_cd = false;

    // Parse arguments
    for arg in args {
        if arg == "--" {
            continue;
        }
        if arg == "-n" {
            no_cd = true;
            continue;
        }
        if let Some(r) = parse_rotation_arg(arg) {
            if rotation.is_some() {
                return (String::new(), "bash: popd: too many arguments\n".to_string(), 2);
            }
            rotation = Some(r);
            continue;
        }
        if arg.starts_with('-') && arg != "-" {
            return (String::new(), format!("bash: popd: {}: invalid option\n", arg), 2);
        }
        // popd doesn't take positional (non-rotation) arguments
        return (String::new(), "bash: popd: too many arguments\n".to_string(), 2);
    }

    let cwd_clone = state.cwd.clone();

    if get_stack(state).is_empty() {
        return (String::new(), "bash: popd: directory stack empty\n".to_string(), 1);
    }

    // new_cwd: what becomes current (and cd'd to, unless -n).
    // remaining_stack: the directory stack after removal, cwd excluded.
    let (new_cwd, remaining_stack) = if let Some(rotation) = rotation {
        let mut full_stack = vec![cwd_clone.clone()];
        full_stack.extend(get_stack(state).iter().cloned());

        let index = match rotation {
            RotationArg::FromLeft(n) => Some(n),
            RotationArg::FromRight(n) => full_stack.len().checked_sub(1).and_then(|m| m.checked_sub(n)),
        };
        let index = match index {
            Some(i) if i < full_stack.len() => i,
            _ => return (String::new(), "bash: popd: directory stack index out of range\n".to_string(), 1),
        };

        full_stack.remove(index);
        (full_stack[0].clone(), full_stack[1..].to_vec())
    } else {
        let stack = get_stack(state);
        let new_dir = stack.remove(0);
        (new_dir, get_stack(state).clone())
    };

    state.directory_stack = Some(remaining_stack);

    if !no_cd {
        state.previous_dir = state.cwd.clone();
        state.cwd = new_cwd.clone();
        state.env.insert("PWD".to_string(), new_cwd.clone());
        state.env.insert("OLDPWD".to_string(), state.previous_dir.clone());
    }

    // Output the stack (popd DOES do tilde substitution). When -n suppressed
    // the cd, the display front is still the shell's actual (unchanged) cwd.
    let home = state.env.get("HOME").cloned().unwrap_or_default();
    let display_front = if no_cd { &cwd_clone } else { &new_cwd };
    let mut output_parts = vec![format_path(display_front, &home)];
    for dir in get_stack(state).iter() {
        output_parts.push(format_path(dir, &home));
    }
    let output = format!("{}\n", output_parts.join(" "));

    (output, String::new(), 0)
}

/// Handle the `dirs` builtin command.
///
/// dirs [-clpv]
///   -c: Clear the stack
///   -l: Long format (no tilde substitution)
///   -p: One entry per line
///   -v: One entry per line with index numbers
pub fn handle_dirs(state: &mut InterpreterState, args: &[String]) -> BuiltinResult {
    let mut clear_stack = false;
    let mut long_format = false;
    let mut per_line = false;
    let mut with_numbers = false;

    // Parse arguments
    for arg in args {
        if arg == "--" {
            continue;
        }
        if arg.starts_with('-') {
            for flag in arg[1..].chars() {
                match flag {
                    'c' => clear_stack = true,
                    'l' => long_format = true,
                    'p' => per_line = true,
                    'v' => {
                        per_line = true;
                        with_numbers = true;
                    }
                    _ => {
                        return (String::new(), format!("bash: dirs: -{}: invalid option\n", flag), 2);
                    }
                }
            }
        } else {
            // dirs doesn't take positional arguments
            return (String::new(), "bash: dirs: too many arguments\n".to_string(), 1);
        }
    }

    if clear_stack {
        state.directory_stack = Some(Vec::new());
        return (String::new(), String::new(), 0);
    }

    // Build the stack display (current dir + stack)
    let cwd_clone = state.cwd.clone();
    let stack = get_stack(state);
    let mut full_stack = vec![cwd_clone];
    full_stack.extend(stack.iter().cloned());

    let home = state.env.get("HOME").cloned().unwrap_or_default();

    let output = if with_numbers {
        let lines: Vec<String> = full_stack
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let path = if long_format { p.clone() } else { format_path(p, &home) };
                format!(" {}  {}", i, path)
            })
            .collect();
        format!("{}\n", lines.join("\n"))
    } else if per_line {
        let lines: Vec<String> = full_stack
            .iter()
            .map(|p| if long_format { p.clone() } else { format_path(p, &home) })
            .collect();
        format!("{}\n", lines.join("\n"))
    } else {
        let parts: Vec<String> = full_stack
            .iter()
            .map(|p| if long_format { p.clone() } else { format_path(p, &home) })
            .collect();
        format!("{}\n", parts.join(" "))
    };

    (output, String::new(), 0)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_path_home() {
        assert_eq!(format_path("/home/user", "/home/user"), "~");
        assert_eq!(format_path("/home/user/docs", "/home/user"), "~/docs");
        assert_eq!(format_path("/other/path", "/home/user"), "/other/path");
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/foo/bar"), "/foo/bar");
        assert_eq!(normalize_path("/foo/../bar"), "/bar");
        assert_eq!(normalize_path("/foo/./bar"), "/foo/bar");
        assert_eq!(normalize_path("/foo/bar/.."), "/foo");
    }

    #[test]
    fn test_handle_dirs_empty() {
        let mut state = InterpreterState::default();
        state.cwd = "/home/user".to_string();
        let (stdout, stderr, code) = handle_dirs(&mut state, &[]);
        assert_eq!(code, 0);
        assert!(stderr.is_empty());
        assert_eq!(stdout, "/home/user\n");
    }

    #[test]
    fn test_handle_dirs_with_tilde() {
        let mut state = InterpreterState::default();
        state.cwd = "/home/user".to_string();
        state.env.insert("HOME".to_string(), "/home/user".to_string());
        let (stdout, _, code) = handle_dirs(&mut state, &[]);
        assert_eq!(code, 0);
        assert_eq!(stdout, "~\n");
    }

    #[test]
    fn test_handle_dirs_long_format() {
        let mut state = InterpreterState::default();
        state.cwd = "/home/user".to_string();
        state.env.insert("HOME".to_string(), "/home/user".to_string());
        let (stdout, _, code) = handle_dirs(&mut state, &["-l".to_string()]);
        assert_eq!(code, 0);
        assert_eq!(stdout, "/home/user\n");
    }

    #[test]
    fn test_handle_dirs_per_line() {
        let mut state = InterpreterState::default();
        state.cwd = "/home/user".to_string();
        state.directory_stack = Some(vec!["/tmp".to_string()]);
        let (stdout, _, code) = handle_dirs(&mut state, &["-p".to_string()]);
        assert_eq!(code, 0);
        assert_eq!(stdout, "/home/user\n/tmp\n");
    }

    #[test]
    fn test_handle_dirs_with_numbers() {
        let mut state = InterpreterState::default();
        state.cwd = "/home/user".to_string();
        state.directory_stack = Some(vec!["/tmp".to_string()]);
        let (stdout, _, code) = handle_dirs(&mut state, &["-v".to_string()]);
        assert_eq!(code, 0);
        assert!(stdout.contains(" 0  /home/user"));
        assert!(stdout.contains(" 1  /tmp"));
    }

    #[test]
    fn test_handle_dirs_clear() {
        let mut state = InterpreterState::default();
        state.directory_stack = Some(vec!["/tmp".to_string(), "/var".to_string()]);
        let (stdout, stderr, code) = handle_dirs(&mut state, &["-c".to_string()]);
        assert_eq!(code, 0);
        assert!(stdout.is_empty());
        assert!(stderr.is_empty());
        assert_eq!(state.directory_stack, Some(Vec::new()));
    }

    #[test]
    fn test_handle_popd_empty_stack() {
        let mut state = InterpreterState::default();
        state.cwd = "/home/user".to_string();
        let (_, stderr, code) = handle_popd(&mut state, &[]);
        assert_eq!(code, 1);
        assert!(stderr.contains("directory stack empty"));
    }

    #[test]
    fn test_handle_popd_success() {
        let mut state = InterpreterState::default();
        state.cwd = "/home/user".to_string();
        state.directory_stack = Some(vec!["/tmp".to_string()]);
        let (stdout, stderr, code) = handle_popd(&mut state, &[]);
        assert_eq!(code, 0);
        assert!(stderr.is_empty());
        assert_eq!(state.cwd, "/tmp");
        assert_eq!(state.directory_stack, Some(Vec::new()));
        assert!(stdout.contains("/tmp"));
    }

    #[test]
    fn test_handle_pushd_absolute_path() {
        let mut state = InterpreterState::default();
        state.cwd = "/home/user".to_string();
        let (stdout, stderr, code) = handle_pushd(&mut state, &["/tmp".to_string()]);
        assert_eq!(code, 0);
        assert!(stderr.is_empty());
        assert_eq!(state.cwd, "/tmp");
        assert_eq!(state.directory_stack, Some(vec!["/home/user".to_string()]));
        assert!(stdout.contains("/tmp"));
    }

    #[test]
    fn test_handle_pushd_no_args_swap() {
        let mut state = InterpreterState::default();
        state.cwd = "/home/user".to_string();
        state.directory_stack = Some(vec!["/tmp".to_string(), "/var".to_string()]);
        let (_, _, code) = handle_pushd(&mut state, &[]);
        assert_eq!(code, 0);
        // After swap and push: stack[0] and stack[1] are swapped, then cwd is pushed
        // Original stack: ["/tmp", "/var"], after swap: ["/var", "/tmp"]
        // Then cwd "/home/user" is pushed, and we cd to "/var"
        assert_eq!(state.cwd, "/var");
        let stack = state.directory_stack.unwrap();
        assert_eq!(stack[0], "/home/user");
        assert_eq!(stack[1], "/var");
        assert_eq!(stack[2], "/tmp");
    }

    #[test]
    fn test_handle_pushd_no_other_directory() {
        let mut state = InterpreterState::default();
        state.cwd = "/home/user".to_string();
        state.directory_stack = Some(vec!["/tmp".to_string()]);
        let (_, stderr, code) = handle_pushd(&mut state, &[]);
        assert_eq!(code, 1);
        assert!(stderr.contains("no other directory"));
    }

    #[test]
    fn test_handle_pushd_rotation_plus_n() {
        let mut state = InterpreterState::default();
        state.cwd = "/a".to_string();
        state.directory_stack = Some(vec!["/b".to_string(), "/c".to_string()]);
        // dirs: /a /b /c ; +2 brings /c to the front.
        let (_, stderr, code) = handle_pushd(&mut state, &["+2".to_string()]);
        assert_eq!(code, 0);
        assert!(stderr.is_empty());
        assert_eq!(state.cwd, "/c");
        assert_eq!(state.directory_stack, Some(vec!["/a".to_string(), "/b".to_string()]));
    }

    #[test]
    fn test_handle_pushd_rotation_out_of_range() {
        let mut state = InterpreterState::default();
        state.cwd = "/a".to_string();
        state.directory_stack = Some(vec!["/b".to_string()]);
        let (_, stderr, code) = handle_pushd(&mut state, &["+5".to_string()]);
        assert_eq!(code, 1);
        assert!(stderr.contains("out of range"));
    }

    #[test]
    fn test_handle_pushd_no_cd_leaves_cwd_untouched() {
        let mut state = InterpreterState::default();
        state.cwd = "/a".to_string();
        let (stdout, stderr, code) = handle_pushd(&mut state, &["-n".to_string(), "/b".to_string()]);
        assert_eq!(code, 0);
        assert!(stderr.is_empty());
        assert_eq!(state.cwd, "/a");
        assert_eq!(state.directory_stack, Some(vec!["/b".to_string()]));
        assert!(stdout.contains("/a"));
    }

    #[test]
    fn test_handle_popd_rotation_minus_n() {
        let mut state = InterpreterState::default();
        state.cwd = "/a".to_string();
        state.directory_stack = Some(vec!["/b".to_string(), "/c".to_string()]);
        // dirs: /a /b /c ; -0 removes the rightmost entry, /c.
        let (_, stderr, code) = handle_popd(&mut state, &["-0".to_string()]);
        assert_eq!(code, 0);
        assert!(stderr.is_empty());
        assert_eq!(state.cwd, "/a");
        assert_eq!(state.directory_stack, Some(vec!["/b".to_string()]));
    }

    #[test]
    fn test_handle_popd_no_cd_keeps_cwd() {
        let mut state = InterpreterState::default();
        state.cwd = "/a".to_string();
        state.directory_stack = Some(vec!["/b".to_string(), "/c".to_string()]);
        let (_, stderr, code) = handle_popd(&mut state, &["-n".to_string()]);
        assert_eq!(code, 0);
        assert!(stderr.is_empty());
        assert_eq!(state.cwd, "/a");
        assert_eq!(state.directory_stack, Some(vec!["/c".to_string()]));
    }
}
