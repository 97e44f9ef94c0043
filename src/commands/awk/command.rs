//! `awk [-F fs] [-v var=val]... 'program' [file...]`
//!
//! Thin `Command` entry point over the AWK lexer/parser/interpreter
//! submodules: parses the program text, seeds the runtime context from
//! `-v` assignments and environment, then feeds input line by line.

use async_trait::async_trait;
use crate::commands::{Command, CommandContext, CommandResult};
use crate::commands::awk::context::AwkContext;
use crate::commands::awk::interpreter::AwkInterpreter;
use crate::commands::awk::parser::parse as parse_program;

pub struct AwkCommand;

#[async_trait]
impl Command for AwkCommand {
    fn name(&self) -> &'static str {
        "awk"
    }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        let mut field_sep: Option<String> = None;
        let mut assignments: Vec<(String, String)> = Vec::new();
        let mut program_text: Option<String> = None;
        let mut files: Vec<String> = Vec::new();

        let mut i = 0;
        let args = &ctx.args;
        while i < args.len() {
            let arg = &args[i];
            if program_text.is_some() {
                files.push(arg.clone());
                i += 1;
                continue;
            }
            match arg.as_str() {
                "-F" => {
                    i += 1;
                    if i >= args.len() {
                        return CommandResult::error("awk: option requires an argument -- 'F'\n".to_string());
                    }
                    field_sep = Some(args[i].clone());
                    i += 1;
                }
                "-v" => {
                    i += 1;
                    if i >= args.len() {
                        return CommandResult::error("awk: option requires an argument -- 'v'\n".to_string());
                    }
                    match args[i].split_once('=') {
                        Some((k, v)) => assignments.push((k.to_string(), v.to_string())),
                        None => return CommandResult::error(format!("awk: invalid -v assignment: {}\n", args[i])),
                    }
                    i += 1;
                }
                _ if arg.starts_with("-F") && arg.len() > 2 => {
                    field_sep = Some(arg[2..].to_string());
                    i += 1;
                }
                _ if arg.starts_with("-v") && arg.len() > 2 => {
                    match arg[2..].split_once('=') {
                        Some((k, v)) => assignments.push((k.to_string(), v.to_string())),
                        None => return CommandResult::error(format!("awk: invalid -v assignment: {}\n", &arg[2..])),
                    }
                    i += 1;
                }
                _ => {
                    program_text = Some(arg.clone());
                    i += 1;
                }
            }
        }

        let program_text = match program_text {
            Some(p) => p,
            None => return CommandResult::error("usage: awk [-F fs][-v var=val] 'prog' [file ...]\n".to_string()),
        };

        let program = match parse_program(&program_text) {
            Ok(p) => p,
            Err(e) => return CommandResult::error(format!("awk: syntax error: {}\n", e)),
        };

        let mut awk_ctx = AwkContext::with_fs(field_sep.as_deref().unwrap_or(" "));
        awk_ctx.environ = ctx.env.clone();
        for (k, v) in assignments {
            awk_ctx.vars.insert(k, v);
        }

        let mut interpreter = AwkInterpreter::new(awk_ctx, program);
        interpreter.execute_begin();

        if files.is_empty() {
            for line in ctx.stdin.lines() {
                interpreter.execute_line(line);
            }
        } else {
            for file in &files {
                let resolved = ctx.fs.resolve_path(&ctx.cwd, file);
                match ctx.fs.read_file(&resolved).await {
                    Ok(contents) => {
                        for line in contents.lines() {
                            interpreter.execute_line(line);
                        }
                    }
                    Err(_) => {
                        return CommandResult::with_exit_code(
                            interpreter.get_output().to_string(),
                            format!("awk: can't open file {}\n", file),
                            2,
                        );
                    }
                }
            }
        }

        interpreter.execute_end();

        CommandResult::with_exit_code(
            interpreter.get_output().to_string(),
            String::new(),
            interpreter.get_exit_code(),
        )
    }
}
