//! test / [ - Evaluate a conditional expression builtin
//!
//! Implements the POSIX `test` argument grammar, which is a flat
//! `&[String]` form distinct from `[[ ]]`'s AST grammar: precedence is
//! driven by argument count (0/1/2/3/4 args) rather than full recursive
//! descent, and `-a`/`-o` are real (left-associative, low precedence)
//! operators here instead of shell `&&`/`||`.

use crate::interpreter::conditionals::{evaluate_file_test, evaluate_shell_option, parse_numeric};
use crate::interpreter::helpers::file_tests::{BinaryFileTestOperator, FileTestOperator};
use crate::interpreter::helpers::numeric_compare::compare_numeric_str;
use crate::interpreter::helpers::string_compare::compare_strings_str;
use crate::interpreter::helpers::string_tests::evaluate_string_test_str;
use crate::interpreter::interpreter::FileSystem as SyncFileSystem;
use crate::interpreter::types::InterpreterState;

use super::BuiltinResult;

/// Handle `test`/`[` as invoked via a simple command.
///
/// `name` is `"test"` or `"["`; for `[`, the final argument must be `]`
/// and is stripped before evaluation.
pub fn handle_test(
    state: &InterpreterState,
    fs: &dyn SyncFileSystem,
    name: &str,
    args: &[String],
) -> BuiltinResult {
    let args: Vec<String> = if name == "[" {
        match args.last() {
            Some(last) if last == "]" => args[..args.len() - 1].to_vec(),
            _ => return BuiltinResult::failure("bash: [: missing `]'\n", 2),
        }
    } else {
        args.to_vec()
    };

    match evaluate(state, fs, &args) {
        Ok(value) => BuiltinResult { stdout: String::new(), stderr: String::new(), exit_code: if value { 0 } else { 1 } },
        Err(msg) => BuiltinResult::failure(&msg, 2),
    }
}

fn evaluate(state: &InterpreterState, fs: &dyn SyncFileSystem, args: &[String]) -> Result<bool, String> {
    match args.len() {
        0 => Ok(false),
        1 => Ok(!args[0].is_empty()),
        2 => eval_unary(state, fs, &args[0], &args[1]),
        3 => eval_three(state, fs, args),
        4 => eval_four(state, fs, args),
        _ => eval_combine(state, fs, args),
    }
}

fn eval_unary(state: &InterpreterState, fs: &dyn SyncFileSystem, op: &str, operand: &str) -> Result<bool, String> {
    if op == "!" {
        return Ok(operand.is_empty());
    }
    if let Some(value) = evaluate_string_test_str(op, operand) {
        return Ok(value);
    }
    if op == "-o" {
        return Ok(evaluate_shell_option(state, operand));
    }
    if op == "-v" {
        return Ok(state.env.contains_key(operand));
    }
    if let Some(test_op) = FileTestOperator::from_str(op) {
        let path = resolve(state, fs, operand);
        return Ok(evaluate_file_test(fs, test_op, &path));
    }
    Err(format!("bash: test: {}: unary operator expected\n", op))
}

fn eval_three(state: &InterpreterState, fs: &dyn SyncFileSystem, args: &[String]) -> Result<bool, String> {
    let (left, op, right) = (&args[0], args[1].as_str(), &args[2]);

    if left == "!" {
        let inner = eval_unary(state, fs, op, right)?;
        return Ok(!inner);
    }

    if let Some(value) = compare_strings_str(op, left, right) {
        return Ok(value);
    }
    if let Some(value) = compare_numeric_str(op, parse_numeric(left), parse_numeric(right)) {
        return Ok(value);
    }
    if let Some(bin_op) = BinaryFileTestOperator::from_str(op) {
        return Ok(eval_binary_file_test(state, fs, bin_op, left, right));
    }
    if op == "-a" {
        let l = !left.is_empty();
        let r = !right.is_empty();
        return Ok(l && r);
    }
    if op == "-o" {
        let l = !left.is_empty();
        let r = !right.is_empty();
        return Ok(l || r);
    }

    Err(format!("bash: test: {}: binary operator expected\n", op))
}

fn eval_four(state: &InterpreterState, fs: &dyn SyncFileSystem, args: &[String]) -> Result<bool, String> {
    if args[0] == "!" {
        let inner = eval_three(state, fs, &args[1..])?;
        return Ok(!inner);
    }
    if args[0] == "(" && args[3] == ")" {
        return eval_unary(state, fs, &args[1], &args[2]);
    }
    eval_combine(state, fs, args)
}

/// Left-to-right evaluation splitting on the lowest-precedence `-o`, then
/// `-a`, matching bash's test(1) combinator precedence for longer
/// expressions. Parenthesized sub-expressions `( ... )` are stripped one
/// layer at a time.
fn eval_combine(state: &InterpreterState, fs: &dyn SyncFileSystem, args: &[String]) -> Result<bool, String> {
    if args.first().map(|s| s.as_str()) == Some("(") && args.last().map(|s| s.as_str()) == Some(")") {
        return evaluate(state, fs, &args[1..args.len() - 1]);
    }
    if args.first().map(|s| s.as_str()) == Some("!") {
        let inner = evaluate(state, fs, &args[1..])?;
        return Ok(!inner);
    }

    if let Some(idx) = find_top_level(args, "-o") {
        let left = eval_combine(state, fs, &args[..idx])?;
        let right = eval_combine(state, fs, &args[idx + 1..])?;
        return Ok(left || right);
    }
    if let Some(idx) = find_top_level(args, "-a") {
        let left = eval_combine(state, fs, &args[..idx])?;
        let right = eval_combine(state, fs, &args[idx + 1..])?;
        return Ok(left && right);
    }

    evaluate(state, fs, args)
}

fn find_top_level(args: &[String], op: &str) -> Option<usize> {
    let mut depth = 0i32;
    for (i, arg) in args.iter().enumerate() {
        match arg.as_str() {
            "(" => depth += 1,
            ")" => depth -= 1,
            s if depth == 0 && s == op => return Some(i),
            _ => {}
        }
    }
    None
}

fn eval_binary_file_test(
    state: &InterpreterState,
    fs: &dyn SyncFileSystem,
    op: BinaryFileTestOperator,
    left: &str,
    right: &str,
) -> bool {
    let left_path = resolve(state, fs, left);
    let right_path = resolve(state, fs, right);
    let left_stat = fs.stat(&left_path).ok();
    let right_stat = fs.stat(&right_path).ok();
    match op {
        BinaryFileTestOperator::NewerThan => match (&left_stat, &right_stat) {
            (Some(l), Some(r)) => l.mtime > r.mtime,
            (Some(_), None) => true,
            _ => false,
        },
        BinaryFileTestOperator::OlderThan => match (&left_stat, &right_stat) {
            (Some(l), Some(r)) => l.mtime < r.mtime,
            (None, Some(_)) => true,
            _ => false,
        },
        BinaryFileTestOperator::SameFile => left_path == right_path && fs.exists(&left_path),
    }
}

fn resolve(state: &InterpreterState, fs: &dyn SyncFileSystem, operand: &str) -> String {
    if operand.starts_with('/') {
        operand.to_string()
    } else {
        fs.resolve_path(&state.cwd, operand)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::interpreter::FileStat;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// Minimal in-memory sync filesystem for exercising file-test operators.
    struct MockFs {
        files: RefCell<HashMap<String, String>>,
    }

    impl MockFs {
        fn new() -> Self {
            Self { files: RefCell::new(HashMap::new()) }
        }

        fn with_file(path: &str, contents: &str) -> Self {
            let fs = Self::new();
            fs.files.borrow_mut().insert(path.to_string(), contents.to_string());
            fs
        }
    }

    impl SyncFileSystem for MockFs {
        fn read_file(&self, path: &str) -> Result<String, std::io::Error> {
            self.files.borrow().get(path).cloned().ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, "not found"))
        }
        fn write_file(&self, path: &str, contents: &str) -> Result<(), std::io::Error> {
            self.files.borrow_mut().insert(path.to_string(), contents.to_string());
            Ok(())
        }
        fn append_file(&self, path: &str, contents: &str) -> Result<(), std::io::Error> {
            self.files.borrow_mut().entry(path.to_string()).or_default().push_str(contents);
            Ok(())
        }
        fn exists(&self, path: &str) -> bool {
            self.files.borrow().contains_key(path)
        }
        fn is_dir(&self, _path: &str) -> bool {
            false
        }
        fn is_file(&self, path: &str) -> bool {
            self.exists(path)
        }
        fn resolve_path(&self, base: &str, path: &str) -> String {
            if path.starts_with('/') {
                path.to_string()
            } else {
                format!("{}/{}", base.trim_end_matches('/'), path)
            }
        }
        fn stat(&self, path: &str) -> Result<FileStat, std::io::Error> {
            self.files.borrow().get(path).map(|content| FileStat {
                is_file: true,
                is_dir: false,
                is_symlink: false,
                size: content.len() as u64,
                mode: 0o644,
                uid: 0,
                gid: 0,
                mtime: 0,
            }).ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, "not found"))
        }
        fn read_dir(&self, _path: &str) -> Result<Vec<String>, std::io::Error> {
            Ok(Vec::new())
        }
        fn glob(
            &self,
            _pattern: &str,
            _cwd: &str,
            _env: &HashMap<String, String>,
            _options: crate::interpreter::interpreter::GlobMatchOptions,
        ) -> Result<Vec<String>, std::io::Error> {
            Ok(Vec::new())
        }
    }

    fn make_state() -> InterpreterState {
        InterpreterState::default()
    }

    #[test]
    fn test_empty() {
        let state = make_state();
        let fs = MockFs::new();
        let r = handle_test(&state, &fs, "test", &[]);
        assert_eq!(r.exit_code, 1);
    }

    #[test]
    fn test_single_nonempty() {
        let state = make_state();
        let fs = MockFs::new();
        let r = handle_test(&state, &fs, "test", &["hello".to_string()]);
        assert_eq!(r.exit_code, 0);
    }

    #[test]
    fn test_string_eq() {
        let state = make_state();
        let fs = MockFs::new();
        let r = handle_test(&state, &fs, "test", &["a".to_string(), "=".to_string(), "a".to_string()]);
        assert_eq!(r.exit_code, 0);
    }

    #[test]
    fn test_string_ne() {
        let state = make_state();
        let fs = MockFs::new();
        let r = handle_test(&state, &fs, "test", &["a".to_string(), "!=".to_string(), "b".to_string()]);
        assert_eq!(r.exit_code, 0);
    }

    #[test]
    fn test_numeric_eq() {
        let state = make_state();
        let fs = MockFs::new();
        let r = handle_test(&state, &fs, "test", &["5".to_string(), "-eq".to_string(), "5".to_string()]);
        assert_eq!(r.exit_code, 0);
    }

    #[test]
    fn test_negation_unary() {
        let state = make_state();
        let fs = MockFs::new();
        let r = handle_test(
            &state,
            &fs,
            "test",
            &["!".to_string(), "-z".to_string(), "hello".to_string()],
        );
        assert_eq!(r.exit_code, 0);
    }

    #[test]
    fn test_and_or() {
        let state = make_state();
        let fs = MockFs::new();
        let r = handle_test(
            &state,
            &fs,
            "test",
            &["-n".to_string(), "a".to_string(), "-a".to_string(), "-n".to_string(), "b".to_string()],
        );
        assert_eq!(r.exit_code, 0);

        let r = handle_test(
            &state,
            &fs,
            "test",
            &["-z".to_string(), "a".to_string(), "-o".to_string(), "-n".to_string(), "b".to_string()],
        );
        assert_eq!(r.exit_code, 0);
    }

    #[test]
    fn test_bracket_missing_close() {
        let state = make_state();
        let fs = MockFs::new();
        let r = handle_test(&state, &fs, "[", &["a".to_string()]);
        assert_eq!(r.exit_code, 2);
    }

    #[test]
    fn test_bracket_ok() {
        let state = make_state();
        let fs = MockFs::new();
        let r = handle_test(&state, &fs, "[", &["a".to_string(), "=".to_string(), "a".to_string(), "]".to_string()]);
        assert_eq!(r.exit_code, 0);
    }

    #[test]
    fn test_file_exists() {
        let state = make_state();
        let fs = MockFs::with_file("/file.txt", "hi");
        let r = handle_test(&state, &fs, "test", &["-e".to_string(), "/file.txt".to_string()]);
        assert_eq!(r.exit_code, 0);
    }
}
