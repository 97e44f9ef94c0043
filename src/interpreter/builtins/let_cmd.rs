//! let - Evaluate arithmetic expressions
//!
//! Usage:
//!   let expr [expr ...]
//!   let "x=1" "y=x+2"
//!
//! Each argument is evaluated as an arithmetic expression.
//! Returns 0 if the last expression evaluates to non-zero,
//! returns 1 if it evaluates to zero.
//!
//! Note: In bash, `let x=( 1 )` passes separate args ["x=(", "1", ")"]
//! when not quoted. The let builtin needs to handle this by joining
//! arguments that are part of the same expression.

use crate::interpreter::types::InterpreterState;
use crate::interpreter::arithmetic::evaluate_arithmetic;
use crate::parser::parse_arith_expr;

/// Result type for builtin commands
pub type BuiltinResult = (String, String, i32);

/// Parse arguments into expressions.
/// Handles cases like `let x=( 1 )` where parentheses cause splitting.
fn parse_let_args(args: &[String]) -> Vec<String> {
    let mut expressions = Vec::new();
    let mut current = String::new();
    let mut paren_depth = 0i32;

    for arg in args {
        // Count open and close parens in this arg
        for ch in arg.chars() {
            if ch == '(' {
                paren_depth += 1;
            } else if ch == ')' {
                paren_depth -= 1;
            }
        }

        if !current.is_empty() {
            current.push(' ');
            current.push_str(arg);
        } else {
            current = arg.clone();
        }

        // If parens are balanced, this is a complete expression
        if paren_depth == 0 {
            expressions.push(current);
            current = String::new();
        }
    }

    // Handle any remaining (unbalanced parens treated as single expression)
    if !current.is_empty() {
        expressions.push(current);
    }

    expressions
}

/// Handle the `let` builtin command.
///
/// Evaluates each argument as an arithmetic expression.
/// Returns 0 if the last expression evaluates to non-zero, 1 if zero.
pub fn handle_let(state: &mut InterpreterState, args: &[String]) -> BuiltinResult {
    use crate::interpreter::types::{InterpreterContext, ExecutionLimits};

    if args.is_empty() {
        return (String::new(), "bash: let: expression expected\n".to_string(), 1);
    }

    // Parse args into expressions (handling split parentheses)
    let expressions = parse_let_args(args);
    let mut last_result: i64 = 0;

    let limits = ExecutionLimits::default();
    let mut ctx = InterpreterContext::new(state, &limits);

    for expr in &expressions {
        // Parse the expression using the arithmetic parser
        let (arith_expr, pos) = parse_arith_expr(expr, 0);

        // Check for unparsed content (syntax error)
        if pos < expr.len() {
            let unparsed = &expr[pos..];
            let error_token = unparsed.split_whitespace().next().unwrap_or(unparsed);
            return (
                String::new(),
                format!("bash: let: {}: syntax error in expression (error token is \"{}\")\n", expr, error_token),
                1,
            );
        }

        // Evaluate the expression
        match evaluate_arithmetic(&mut ctx, &arith_expr, false, None) {
            Ok(result) => {
                last_result = result;
            }
            Err(err) => {
                return (
                    String::new(),
                    format!("bash: let: {}: {}\n", expr, err.message),
                    1,
                );
            }
        }
    }

    // Return 0 if last expression is non-zero, 1 if zero
    let exit_code = if last_result == 0 { 1 } else { 0 };
    (String::new(), String::new(), exit_code)
}

// ============================================================================
// Tests
// ============================================================================
