// src/commands/test_cmd/mod.rs
use async_trait::async_trait;
use crate::commands::{Command, CommandContext, CommandResult};

pub struct TestCommand;

#[async_trait]
impl Command for TestCommand {
    fn name(&self) -> &'static str {
        "test"
    }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        let args = &ctx.args;

        // No arguments is false.
        if args.is_empty() {
            return CommandResult::with_exit_code(String::new(), String::new(), 1);
        }

        // Handle the `[ ... ]` form.
        let args: Vec<&str> = if !args.is_empty() && args[0] == "[" {
            if args.last().map(|s| s.as_str()) != Some("]") {
                return CommandResult::error("test: missing ']'\n".to_string());
            }
            args[1..args.len()-1].iter().map(|s| s.as_str()).collect()
        } else {
            args.iter().map(|s| s.as_str()).collect()
        };

        if args.is_empty() {
            return CommandResult::with_exit_code(String::new(), String::new(), 1);
        }

        let result = evaluate_expression(&args, &ctx).await;
        let exit_code = if result { 0 } else { 1 };
        CommandResult::with_exit_code(String::new(), String::new(), exit_code)
    }
}

async fn evaluate_expression(args: &[&str], ctx: &CommandContext) -> bool {
    // A single argument is true iff it is a non-empty string.
    if args.len() == 1 {
        return !args[0].is_empty();
    }

    // `!` negation.
    if args[0] == "!" {
        return !Box::pin(evaluate_expression(&args[1..], ctx)).await;
    }

    // `-a`/`-o` combine two sub-expressions.
    if args.len() >= 3 {
        // Find the combining operator.
        for i in 1..args.len() {
            let op = args[i];
            match op {
                "-a" => {
                    let left = Box::pin(evaluate_expression(&args[..i], ctx)).await;
                    let right = Box::pin(evaluate_expression(&args[i+1..], ctx)).await;
                    return left && right;
                }
                "-o" => {
                    let left = Box::pin(evaluate_expression(&args[..i], ctx)).await;
                    let right = Box::pin(evaluate_expression(&args[i+1..], ctx)).await;
                    return left || right;
                }
                _ => {}
            }
        }
    }

    // Binary expressions.
    if args.len() == 3 {
        let left = args[0];
        let op = args[1];
        let right = args[2];

        match op {
            // String comparison.
            "=" | "==" => return left == right,
            "!=" => return left != right,

            // Numeric comparison.
            "-eq" => {
                let l: i64 = left.parse().unwrap_or(0);
                let r: i64 = right.parse().unwrap_or(0);
                return l == r;
            }
            "-ne" => {
                let l: i64 = left.parse().unwrap_or(0);
                let r: i64 = right.parse().unwrap_or(0);
                return l != r;
            }
            "-lt" => {
                let l: i64 = left.parse().unwrap_or(0);
                let r: i64 = right.parse().unwrap_or(0);
                return l < r;
            }
            "-le" => {
                let l: i64 = left.parse().unwrap_or(0);
                let r: i64 = right.parse().unwrap_or(0);
                return l <= r;
            }
            "-gt" => {
                let l: i64 = left.parse().unwrap_or(0);
                let r: i64 = right.parse().unwrap_or(0);
                return l > r;
            }
            "-ge" => {
                let l: i64 = left.parse().unwrap_or(0);
                let r: i64 = right.parse().unwrap_or(0);
                return l >= r;
            }
            _ => {}
        }
    }

    // Unary expressions.
    if args.len() == 2 {
        let op = args[0];
        let operand = args[1];

        match op {
            // String tests.
            "-z" => return operand.is_empty(),
            "-n" => return !operand.is_empty(),

            // File tests.
            "-e" => {
                let path = ctx.fs.resolve_path(&ctx.cwd, operand);
                return ctx.fs.exists(&path).await;
            }
            "-f" => {
                let path = ctx.fs.resolve_path(&ctx.cwd, operand);
                if let Ok(stat) = ctx.fs.stat(&path).await {
                    return stat.is_file;
                }
                return false;
            }
            "-d" => {
                let path = ctx.fs.resolve_path(&ctx.cwd, operand);
                if let Ok(stat) = ctx.fs.stat(&path).await {
                    return stat.is_directory;
                }
                return false;
            }
            "-s" => {
                let path = ctx.fs.resolve_path(&ctx.cwd, operand);
                if let Ok(stat) = ctx.fs.stat(&path).await {
                    return stat.size > 0;
                }
                return false;
            }
            "-r" | "-w" | "-x" => {
                // Simplified: only checks existence, not actual permission bits.
                let path = ctx.fs.resolve_path(&ctx.cwd, operand);
                return ctx.fs.exists(&path).await;
            }
            "-L" | "-h" => {
                let path = ctx.fs.resolve_path(&ctx.cwd, operand);
                if let Ok(stat) = ctx.fs.lstat(&path).await {
                    return stat.is_symlink;
                }
                return false;
            }
            _ => {}
        }
    }

    false
}

// Also provide the `[` command.
pub struct BracketCommand;

#[async_trait]
impl Command for BracketCommand {
    fn name(&self) -> &'static str {
        "["
    }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        // The trailing `]` is required.
        if ctx.args.last().map(|s| s.as_str()) != Some("]") {
            return CommandResult::error("[: missing ']'\n".to_string());
        }

        // Strip it and evaluate the same way `test` does.
        let args: Vec<&str> = ctx.args[..ctx.args.len()-1].iter().map(|s| s.as_str()).collect();

        if args.is_empty() {
            return CommandResult::with_exit_code(String::new(), String::new(), 1);
        }

        let result = evaluate_expression(&args, &ctx).await;
        let exit_code = if result { 0 } else { 1 };
        CommandResult::with_exit_code(String::new(), String::new(), exit_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::{FileSystem, InMemoryFs};
    use std::sync::Arc;
    use std::collections::HashMap;

    fn make_ctx(args: Vec<&str>) -> CommandContext {
        CommandContext {
            args: args.into_iter().map(String::from).collect(),
            stdin: String::new(),
            cwd: "/".to_string(),
            env: HashMap::new(),
            fs: Arc::new(InMemoryFs::new()),
            exec_fn: None,
            fetch_fn: None,
        }
    }

    async fn make_ctx_with_files(args: Vec<&str>, files: Vec<(&str, &str)>) -> CommandContext {
        let fs = Arc::new(InMemoryFs::new());
        for (path, content) in files {
            fs.write_file(path, content.as_bytes()).await.unwrap();
        }
        CommandContext {
            args: args.into_iter().map(String::from).collect(),
            stdin: String::new(),
            cwd: "/".to_string(),
            env: HashMap::new(),
            fs,
            exec_fn: None,
            fetch_fn: None,
        }
    }

    #[tokio::test]
    async fn test_empty_args() {
        let ctx = make_ctx(vec![]);
        let cmd = TestCommand;
        let result = cmd.execute(ctx).await;
        assert_eq!(result.exit_code, 1);
    }

    #[tokio::test]
    async fn test_single_arg_nonempty() {
        let ctx = make_ctx(vec!["hello"]);
        let cmd = TestCommand;
        let result = cmd.execute(ctx).await;
        assert_eq!(result.exit_code, 0);
    }

    #[tokio::test]
    async fn test_string_equal() {
        let ctx = make_ctx(vec!["hello", "=", "hello"]);
        let cmd = TestCommand;
        let result = cmd.execute(ctx).await;
        assert_eq!(result.exit_code, 0);
    }

    #[tokio::test]
    async fn test_string_not_equal() {
        let ctx = make_ctx(vec!["hello", "!=", "world"]);
        let cmd = TestCommand;
        let result = cmd.execute(ctx).await;
        assert_eq!(result.exit_code, 0);
    }

    #[tokio::test]
    async fn test_numeric_eq() {
        let ctx = make_ctx(vec!["5", "-eq", "5"]);
        let cmd = TestCommand;
        let result = cmd.execute(ctx).await;
        assert_eq!(result.exit_code, 0);
    }

    #[tokio::test]
    async fn test_numeric_lt() {
        let ctx = make_ctx(vec!["3", "-lt", "5"]);
        let cmd = TestCommand;
        let result = cmd.execute(ctx).await;
        assert_eq!(result.exit_code, 0);
    }

    #[tokio::test]
    async fn test_z_empty() {
        let ctx = make_ctx(vec!["-z", ""]);
        let cmd = TestCommand;
        let result = cmd.execute(ctx).await;
        assert_eq!(result.exit_code, 0);
    }

    #[tokio::test]
    async fn test_n_nonempty() {
        let ctx = make_ctx(vec!["-n", "hello"]);
        let cmd = TestCommand;
        let result = cmd.execute(ctx).await;
        assert_eq!(result.exit_code, 0);
    }

    #[tokio::test]
    async fn test_file_exists() {
        let ctx = make_ctx_with_files(vec!["-e", "/test.txt"], vec![("/test.txt", "content")]).await;
        let cmd = TestCommand;
        let result = cmd.execute(ctx).await;
        assert_eq!(result.exit_code, 0);
    }

    #[tokio::test]
    async fn test_file_not_exists() {
        let ctx = make_ctx(vec!["-e", "/nonexistent"]);
        let cmd = TestCommand;
        let result = cmd.execute(ctx).await;
        assert_eq!(result.exit_code, 1);
    }

    #[tokio::test]
    async fn test_is_file() {
        let ctx = make_ctx_with_files(vec!["-f", "/test.txt"], vec![("/test.txt", "content")]).await;
        let cmd = TestCommand;
        let result = cmd.execute(ctx).await;
        assert_eq!(result.exit_code, 0);
    }

    #[tokio::test]
    async fn test_negation() {
        let ctx = make_ctx(vec!["!", "-z", "hello"]);
        let cmd = TestCommand;
        let result = cmd.execute(ctx).await;
        assert_eq!(result.exit_code, 0);
    }

    #[tokio::test]
    async fn test_and() {
        let ctx = make_ctx(vec!["-n", "a", "-a", "-n", "b"]);
        let cmd = TestCommand;
        let result = cmd.execute(ctx).await;
        assert_eq!(result.exit_code, 0);
    }

    #[tokio::test]
    async fn test_or() {
        let ctx = make_ctx(vec!["-z", "a", "-o", "-n", "b"]);
        let cmd = TestCommand;
        let result = cmd.execute(ctx).await;
        assert_eq!(result.exit_code, 0);
    }

    #[tokio::test]
    async fn test_single_arg_empty() {
        let ctx = make_ctx(vec![""]);
        let cmd = TestCommand;
        let result = cmd.execute(ctx).await;
        assert_eq!(result.exit_code, 1);
    }

    #[tokio::test]
    async fn test_z_nonempty() {
        let ctx = make_ctx(vec!["-z", "hello"]);
        let cmd = TestCommand;
        let result = cmd.execute(ctx).await;
        assert_eq!(result.exit_code, 1);
    }

    #[tokio::test]
    async fn test_n_empty() {
        let ctx = make_ctx(vec!["-n", ""]);
        let cmd = TestCommand;
        let result = cmd.execute(ctx).await;
        assert_eq!(result.exit_code, 1);
    }

    #[tokio::test]
    async fn test_is_directory() {
        let ctx = make_ctx_with_files(vec!["-d", "/dir"], vec![("/dir/file.txt", "content")]).await;
        let cmd = TestCommand;
        let result = cmd.execute(ctx).await;
        assert_eq!(result.exit_code, 0);
    }

    #[tokio::test]
    async fn test_is_not_directory() {
        let ctx = make_ctx_with_files(vec!["-d", "/file.txt"], vec![("/file.txt", "content")]).await;
        let cmd = TestCommand;
        let result = cmd.execute(ctx).await;
        assert_eq!(result.exit_code, 1);
    }

    #[tokio::test]
    async fn test_file_size_nonempty() {
        let ctx = make_ctx_with_files(vec!["-s", "/file.txt"], vec![("/file.txt", "content")]).await;
        let cmd = TestCommand;
        let result = cmd.execute(ctx).await;
        assert_eq!(result.exit_code, 0);
    }

    #[tokio::test]
    async fn test_file_size_empty() {
        let ctx = make_ctx_with_files(vec!["-s", "/empty.txt"], vec![("/empty.txt", "")]).await;
        let cmd = TestCommand;
        let result = cmd.execute(ctx).await;
        assert_eq!(result.exit_code, 1);
    }

    #[tokio::test]
    async fn test_numeric_ne() {
        let ctx = make_ctx(vec!["5", "-ne", "6"]);
        let cmd = TestCommand;
        let result = cmd.execute(ctx).await;
        assert_eq!(result.exit_code, 0);
    }

    #[tokio::test]
    async fn test_numeric_le() {
        let ctx = make_ctx(vec!["5", "-le", "5"]);
        let cmd = TestCommand;
        let result = cmd.execute(ctx).await;
        assert_eq!(result.exit_code, 0);
    }

    #[tokio::test]
    async fn test_numeric_gt() {
        let ctx = make_ctx(vec!["5", "-gt", "3"]);
        let cmd = TestCommand;
        let result = cmd.execute(ctx).await;
        assert_eq!(result.exit_code, 0);
    }

    #[tokio::test]
    async fn test_numeric_ge() {
        let ctx = make_ctx(vec!["5", "-ge", "5"]);
        let cmd = TestCommand;
        let result = cmd.execute(ctx).await;
        assert_eq!(result.exit_code, 0);
    }

    #[tokio::test]
    async fn test_and_both_false() {
        let ctx = make_ctx(vec!["-z", "a", "-a", "-z", "b"]);
        let cmd = TestCommand;
        let result = cmd.execute(ctx).await;
        assert_eq!(result.exit_code, 1);
    }

    #[tokio::test]
    async fn test_or_both_false() {
        let ctx = make_ctx(vec!["-f", "/nonexistent1", "-o", "-f", "/nonexistent2"]);
        let cmd = TestCommand;
        let result = cmd.execute(ctx).await;
        assert_eq!(result.exit_code, 1);
    }

    #[tokio::test]
    async fn test_bracket_with_closing() {
        let ctx = make_ctx(vec!["[", "-n", "hello", "]"]);
        let cmd = TestCommand;
        let result = cmd.execute(ctx).await;
        assert_eq!(result.exit_code, 0);
    }

    #[tokio::test]
    async fn test_bracket_missing_closing() {
        let ctx = make_ctx(vec!["[", "-n", "hello"]);
        let cmd = TestCommand;
        let result = cmd.execute(ctx).await;
        assert_eq!(result.exit_code, 1);
        assert!(result.stderr.contains("missing ']'"));
    }

    #[tokio::test]
    async fn test_bracket_command_with_closing() {
        let ctx = make_ctx(vec!["-f", "/file.txt", "]"]);
        let cmd = BracketCommand;
        let result = cmd.execute(ctx).await;
        assert_eq!(result.exit_code, 1);
    }

    #[tokio::test]
    async fn test_bracket_command_missing_closing() {
        let ctx = make_ctx(vec!["-f", "/file.txt"]);
        let cmd = BracketCommand;
        let result = cmd.execute(ctx).await;
        assert!(result.stderr.contains("missing ']'"));
    }

    #[tokio::test]
    async fn test_bracket_empty() {
        let ctx = make_ctx(vec!["]"]);
        let cmd = BracketCommand;
        let result = cmd.execute(ctx).await;
        assert_eq!(result.exit_code, 1);
    }
}
