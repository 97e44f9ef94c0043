//! Conditional Expression Evaluation
//!
//! Handles:
//! - [[ ... ]] conditional commands
//! - [ ... ] and test commands
//! - File tests (-f, -d, -e, etc.)
//! - String tests (-z, -n, =, !=)
//! - Numeric comparisons (-eq, -ne, -lt, etc.)
//! - Pattern matching (==, =~)

use crate::ast::types::{
    CondBinaryOperator, CondUnaryOperator, ConditionalExpressionNode,
};
use crate::interpreter::expansion::pattern::pattern_to_regex;
use crate::interpreter::helpers::file_tests::{is_char_device, FileTestOperator};
use crate::interpreter::helpers::numeric_compare::compare_numeric;
use crate::interpreter::helpers::string_compare::{compare_strings_nocase, StringCompareOp};
use crate::interpreter::helpers::string_tests::{evaluate_string_test, StringTestOp};
use crate::interpreter::helpers::variable_tests::{evaluate_nameref_test, evaluate_variable_test};
use crate::interpreter::interpreter::FileSystem as SyncFileSystem;
use crate::interpreter::types::InterpreterState;
use crate::interpreter::word_expansion::expand_word_no_glob;
use crate::interpreter::word_expansion::WordExpansionOptions;
use regex_lite::Regex;

/// Match a value against a glob pattern.
///
/// # Arguments
/// * `value` - The string to match
/// * `pattern` - The glob pattern
/// * `nocasematch` - If true, use case-insensitive matching
/// * `extglob` - If true, enable extended glob patterns
pub fn match_pattern(value: &str, pattern: &str, nocasematch: bool, extglob: bool) -> bool {
    let regex_str = format!("^{}$", pattern_to_regex(pattern, true, extglob));
    match Regex::new(&regex_str) {
        Ok(re) => {
            if nocasematch {
                // For case-insensitive, convert both to lowercase
                let lower_value = value.to_lowercase();
                let lower_pattern = format!("^{}$", pattern_to_regex(&pattern.to_lowercase(), true, extglob));
                match Regex::new(&lower_pattern) {
                    Ok(lower_re) => lower_re.is_match(&lower_value),
                    Err(_) => false,
                }
            } else {
                re.is_match(value)
            }
        }
        Err(_) => false,
    }
}

/// Evaluate -o option test (check if shell option is enabled).
/// Maps option names to interpreter state flags.
pub fn evaluate_shell_option(state: &InterpreterState, option: &str) -> bool {
    match option {
        // Implemented options (set -o)
        "errexit" | "e" => state.options.errexit,
        "nounset" | "u" => state.options.nounset,
        "pipefail" => state.options.pipefail,
        "xtrace" | "x" => state.options.xtrace,
        "noglob" | "f" => state.options.noglob,
        "noclobber" | "C" => state.options.noclobber,
        "allexport" | "a" => state.options.allexport,
        // Unknown or unimplemented option - return false
        _ => false,
    }
}

/// Parse a number in base N (2-64).
/// Digit values: 0-9=0-9, a-z=10-35, A-Z=36-61, @=62, _=63
fn parse_base_n(digits: &str, base: u32) -> Option<i64> {
    let mut result: i64 = 0;
    for c in digits.chars() {
        let digit_value = if c >= '0' && c <= '9' {
            (c as u32) - ('0' as u32)
        } else if c >= 'a' && c <= 'z' {
            (c as u32) - ('a' as u32) + 10
        } else if c >= 'A' && c <= 'Z' {
            (c as u32) - ('A' as u32) + 36
        } else if c == '@' {
            62
        } else if c == '_' {
            63
        } else {
            return None;
        };
        if digit_value >= base {
            return None;
        }
        result = result * (base as i64) + (digit_value as i64);
    }
    Some(result)
}

/// Parse a bash numeric value, supporting:
/// - Decimal: 42, -42
/// - Octal: 0777, -0123
/// - Hex: 0xff, 0xFF, -0xff
/// - Base-N: 64#a, 2#1010
/// - Strings are coerced to 0
pub fn parse_numeric(value: &str) -> i64 {
    let value = value.trim();
    if value.is_empty() {
        return 0;
    }

    // Handle negative numbers
    let (negative, value) = if value.starts_with('-') {
        (true, &value[1..])
    } else if value.starts_with('+') {
        (false, &value[1..])
    } else {
        (false, value)
    };

    let result = if let Some(caps) = Regex::new(r"^(\d+)#([a-zA-Z0-9@_]+)$").ok().and_then(|re| re.captures(value)) {
        // Base-N syntax: base#value
        let base: u32 = caps.get(1).unwrap().as_str().parse().unwrap_or(0);
        let digits = caps.get(2).unwrap().as_str();
        if base >= 2 && base <= 64 {
            parse_base_n(digits, base).unwrap_or(0)
        } else {
            0
        }
    } else if value.starts_with("0x") || value.starts_with("0X") {
        // Hex: 0x or 0X
        i64::from_str_radix(&value[2..], 16).unwrap_or(0)
    } else if value.starts_with('0') && value.len() > 1 && value.chars().skip(1).all(|c| c >= '0' && c <= '7') {
        // Octal: starts with 0 followed by digits (0-7)
        i64::from_str_radix(&value[1..], 8).unwrap_or(0)
    } else {
        // Decimal
        value.parse::<i64>().unwrap_or(0)
    };

    if negative { -result } else { result }
}

/// Result of parsing a decimal number.
#[derive(Debug, Clone)]
pub struct ParseNumericResult {
    pub value: i64,
    pub valid: bool,
}

/// Parse a number as plain decimal (for test/[ command).
/// Unlike parse_numeric, this does NOT interpret octal/hex/base-N.
/// Leading zeros are treated as decimal.
/// Returns { value, valid } - valid is false if input is invalid.
pub fn parse_numeric_decimal(value: &str) -> ParseNumericResult {
    let value = value.trim();
    if value.is_empty() {
        return ParseNumericResult { value: 0, valid: true };
    }

    // Handle negative numbers
    let (negative, value) = if value.starts_with('-') {
        (true, &value[1..])
    } else if value.starts_with('+') {
        (false, &value[1..])
    } else {
        (false, value)
    };

    // Check if it's a valid decimal number (only digits)
    if !value.chars().all(|c| c.is_ascii_digit()) {
        return ParseNumericResult { value: 0, valid: false };
    }

    // Always parse as decimal (base 10)
    match value.parse::<i64>() {
        Ok(n) => ParseNumericResult {
            value: if negative { -n } else { n },
            valid: true,
        },
        Err(_) => ParseNumericResult { value: 0, valid: false },
    }
}

/// Convert a POSIX Extended Regular Expression to Rust regex syntax.
///
/// Key differences handled:
/// 1. `[]...]` - In POSIX, `]` is literal when first in class. In Rust regex, need `\]`
/// 2. `[^]...]` - Same with negated class
/// 3. `[[:class:]]` - POSIX character classes need conversion
pub fn posix_ere_to_regex(pattern: &str) -> String {
    let mut result = String::new();
    let chars: Vec<char> = pattern.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        // Handle backslash escapes - skip the escaped character
        if chars[i] == '\\' && i + 1 < chars.len() {
            result.push(chars[i]);
            result.push(chars[i + 1]);
            i += 2;
        } else if chars[i] == '[' {
            // Found start of character class
            let (converted, end_index) = convert_posix_char_class(&chars, i);
            result.push_str(&converted);
            i = end_index;
        } else {
            result.push(chars[i]);
            i += 1;
        }
    }

    result
}

/// Convert a POSIX character class starting at `start_index` (where chars[start_index] === '[')
/// to Rust regex character class syntax.
///
/// Returns the converted class and the index after the closing `]`.
fn convert_posix_char_class(chars: &[char], start_index: usize) -> (String, usize) {
    let mut i = start_index + 1;
    let mut result = String::from("[");

    // Handle negation: [^ or [!
    if i < chars.len() && (chars[i] == '^' || chars[i] == '!') {
        result.push('^');
        i += 1;
    }

    // In POSIX, ] is literal when it's the first char (after optional ^)
    let mut has_literal_close_bracket = false;
    if i < chars.len() && chars[i] == ']' {
        has_literal_close_bracket = true;
        i += 1;
    }

    // In POSIX, [ can also be literal when first (after optional ^ and ])
    let mut has_literal_open_bracket = false;
    if i < chars.len() && chars[i] == '[' && i + 1 < chars.len() && chars[i + 1] != ':' {
        has_literal_open_bracket = true;
        i += 1;
    }

    // Collect the rest of the character class content
    let mut class_content = String::new();
    let mut found_close = false;

    while i < chars.len() {
        let ch = chars[i];

        if ch == ']' {
            // End of character class
            found_close = true;
            i += 1;
            break;
        }

        // Handle POSIX character classes like [:alpha:]
        if ch == '[' && i + 1 < chars.len() && chars[i + 1] == ':' {
            let rest: String = chars[i + 2..].iter().collect();
            if let Some(end_pos) = rest.find(":]") {
                let class_name: String = chars[i + 2..i + 2 + end_pos].iter().collect();
                class_content.push_str(&posix_class_to_regex(&class_name));
                i = i + 2 + end_pos + 2;
                continue;
            }
        }

        // Handle collating elements [.ch.] and equivalence classes [=ch=]
        if ch == '[' && i + 1 < chars.len() {
            let next = chars[i + 1];
            if next == '.' || next == '=' {
                let end_marker = format!("{}]", next);
                let rest: String = chars[i + 2..].iter().collect();
                if let Some(end_pos) = rest.find(&end_marker) {
                    let content: String = chars[i + 2..i + 2 + end_pos].iter().collect();
                    class_content.push_str(&content);
                    i = i + 2 + end_pos + 2;
                    continue;
                }
            }
        }

        // Handle escape sequences
        if ch == '\\' && i + 1 < chars.len() {
            class_content.push(ch);
            class_content.push(chars[i + 1]);
            i += 2;
            continue;
        }

        class_content.push(ch);
        i += 1;
    }

    if !found_close {
        // No closing bracket found - return as literal [
        return ("\\[".to_string(), start_index + 1);
    }

    // Build the regex-compatible character class
    // If we had literal ] at the start, escape it
    if has_literal_close_bracket {
        result.push_str("\\]");
    }

    // If we had literal [ at the start, escape it
    if has_literal_open_bracket {
        result.push_str("\\[");
    }

    // Add the rest of the content
    result.push_str(&class_content);
    result.push(']');

    (result, i)
}

/// Convert POSIX character class name to regex equivalent.
fn posix_class_to_regex(class_name: &str) -> String {
    match class_name {
        "alnum" => "a-zA-Z0-9".to_string(),
        "alpha" => "a-zA-Z".to_string(),
        "ascii" => "\\x00-\\x7F".to_string(),
        "blank" => " \\t".to_string(),
        "cntrl" => "\\x00-\\x1F\\x7F".to_string(),
        "digit" => "0-9".to_string(),
        "graph" => "!-~".to_string(),
        "lower" => "a-z".to_string(),
        "print" => " -~".to_string(),
        "punct" => "!-/:-@\\[-`{-~".to_string(),
        "space" => " \\t\\n\\r\\f\\v".to_string(),
        "upper" => "A-Z".to_string(),
        "word" => "a-zA-Z0-9_".to_string(),
        "xdigit" => "0-9A-Fa-f".to_string(),
        _ => String::new(),
    }
}

/// Compute the fixed length of a pattern, if it has one.
/// Returns None if the pattern has variable length (contains *, +, etc.).
/// Used to optimize !() extglob patterns.
pub fn compute_pattern_length(pattern: &str, extglob: bool) -> Option<usize> {
    let mut length = 0;
    let chars: Vec<char> = pattern.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        // Check for extglob patterns
        if extglob
            && (c == '@' || c == '*' || c == '+' || c == '?' || c == '!')
            && i + 1 < chars.len()
            && chars[i + 1] == '('
        {
            let close_idx = find_matching_paren(&chars, i + 1);
            if close_idx.is_some() {
                let close = close_idx.unwrap();
                if c == '@' {
                    // @() matches exactly one occurrence - get length of alternatives
                    let content: String = chars[i + 2..close].iter().collect();
                    let alts = split_extglob_alternatives(&content);
                    let alt_lengths: Vec<Option<usize>> = alts
                        .iter()
                        .map(|a| compute_pattern_length(a, extglob))
                        .collect();
                    // All alternatives must have same length for fixed length
                    if alt_lengths.iter().all(|l| l.is_some())
                        && alt_lengths.iter().all(|l| l == &alt_lengths[0])
                    {
                        length += alt_lengths[0].unwrap();
                        i = close + 1;
                        continue;
                    }
                    return None; // Variable length
                }
                // *, +, ?, ! all have variable length
                return None;
            }
        }

        if c == '*' {
            return None; // Variable length
        }
        if c == '?' {
            length += 1;
            i += 1;
            continue;
        }
        if c == '[' {
            // Character class matches exactly 1 char
            let close_idx = find_char_class_end(&chars, i);
            if close_idx.is_some() {
                length += 1;
                i = close_idx.unwrap() + 1;
                continue;
            }
            // No closing bracket - treat as literal
            length += 1;
            i += 1;
            continue;
        }
        if c == '\\' {
            // Escaped char
            length += 1;
            i += 2;
            continue;
        }
        // Regular character
        length += 1;
        i += 1;
    }

    Some(length)
}

/// Find the matching closing parenthesis, handling nesting.
fn find_matching_paren(chars: &[char], open_idx: usize) -> Option<usize> {
    let mut depth = 1;
    let mut i = open_idx + 1;
    while i < chars.len() && depth > 0 {
        let c = chars[i];
        if c == '\\' {
            i += 2; // Skip escaped char
            continue;
        }
        if c == '(' {
            depth += 1;
        } else if c == ')' {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        }
        i += 1;
    }
    None
}

/// Split extglob pattern content on | handling nested patterns.
fn split_extglob_alternatives(content: &str) -> Vec<String> {
    let mut alternatives: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut depth = 0;
    let chars: Vec<char> = content.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c == '\\' {
            // Escaped character
            current.push(c);
            if i + 1 < chars.len() {
                current.push(chars[i + 1]);
                i += 2;
            } else {
                i += 1;
            }
            continue;
        }
        if c == '(' {
            depth += 1;
            current.push(c);
        } else if c == ')' {
            depth -= 1;
            current.push(c);
        } else if c == '|' && depth == 0 {
            alternatives.push(current);
            current = String::new();
        } else {
            current.push(c);
        }
        i += 1;
    }
    alternatives.push(current);
    alternatives
}

/// Find the end of a character class starting at position i (where chars[i] is '[').
fn find_char_class_end(chars: &[char], start: usize) -> Option<usize> {
    let mut i = start + 1;

    // Handle negation
    if i < chars.len() && chars[i] == '^' {
        i += 1;
    }

    // A ] immediately after [ or [^ is literal, not closing
    if i < chars.len() && chars[i] == ']' {
        i += 1;
    }

    while i < chars.len() {
        // Handle escape sequences - \] should not end the class
        if chars[i] == '\\' && i + 1 < chars.len() {
            i += 2;
            continue;
        }

        if chars[i] == ']' {
            return Some(i);
        }

        // Handle POSIX classes [:name:]
        if chars[i] == '[' && i + 1 < chars.len() && chars[i + 1] == ':' {
            let rest: String = chars[i + 2..].iter().collect();
            if let Some(close_pos) = rest.find(":]") {
                i = i + 2 + close_pos + 2;
                continue;
            }
        }
        i += 1;
    }
    None
}

/// Escape regex metacharacters in a string.
pub fn escape_regex_chars(s: &str) -> String {
    let mut result = String::new();
    for c in s.chars() {
        if "\\^$.|+*?()[]{}".contains(c) {
            result.push('\\');
        }
        result.push(c);
    }
    result
}

// ============================================================================
// [[ ]] conditional expression evaluation
// ============================================================================

/// Outcome of evaluating a `[[ ]]` conditional expression.
pub struct CondEvalResult {
    pub value: bool,
    pub stderr: String,
}

impl CondEvalResult {
    fn ok(value: bool) -> Self {
        Self { value, stderr: String::new() }
    }

    fn with_stderr(value: bool, stderr: String) -> Self {
        Self { value, stderr }
    }
}

fn expand_cond_word(state: &mut InterpreterState, word: &crate::ast::types::WordNode) -> String {
    expand_word_no_glob(state, word, &WordExpansionOptions::default()).value
}

fn file_test_operator_for(op: CondUnaryOperator) -> Option<FileTestOperator> {
    match op {
        CondUnaryOperator::A => Some(FileTestOperator::ExistsDeprecated),
        CondUnaryOperator::B => Some(FileTestOperator::BlockSpecial),
        CondUnaryOperator::C => Some(FileTestOperator::CharSpecial),
        CondUnaryOperator::D => Some(FileTestOperator::Directory),
        CondUnaryOperator::E => Some(FileTestOperator::Exists),
        CondUnaryOperator::F => Some(FileTestOperator::RegularFile),
        CondUnaryOperator::G => Some(FileTestOperator::SetGid),
        CondUnaryOperator::H => Some(FileTestOperator::SymbolicLinkH),
        CondUnaryOperator::K => Some(FileTestOperator::StickyBit),
        CondUnaryOperator::P => Some(FileTestOperator::NamedPipe),
        CondUnaryOperator::R => Some(FileTestOperator::Readable),
        CondUnaryOperator::S => Some(FileTestOperator::NonEmpty),
        CondUnaryOperator::T => Some(FileTestOperator::Terminal),
        CondUnaryOperator::U => Some(FileTestOperator::SetUid),
        CondUnaryOperator::W => Some(FileTestOperator::Writable),
        CondUnaryOperator::X => Some(FileTestOperator::Executable),
        CondUnaryOperator::UpperG => Some(FileTestOperator::OwnedByGroup),
        CondUnaryOperator::L => Some(FileTestOperator::SymbolicLink),
        CondUnaryOperator::N => Some(FileTestOperator::ModifiedSinceRead),
        CondUnaryOperator::UpperO => Some(FileTestOperator::OwnedByUser),
        CondUnaryOperator::UpperS => Some(FileTestOperator::Socket),
        _ => None,
    }
}

/// Evaluate a single file-test operator against a (possibly virtual) path.
pub fn evaluate_file_test(fs: &dyn SyncFileSystem, op: FileTestOperator, path: &str) -> bool {
    if is_char_device(path) {
        // /dev/null and friends always "exist" and behave as readable/writable
        // character devices even though the in-memory filesystem has no node
        // for them.
        return !matches!(
            op,
            FileTestOperator::Directory
                | FileTestOperator::BlockSpecial
                | FileTestOperator::NamedPipe
                | FileTestOperator::Socket
                | FileTestOperator::SymbolicLink
                | FileTestOperator::SymbolicLinkH
        );
    }

    match op {
        FileTestOperator::Exists | FileTestOperator::ExistsDeprecated => fs.exists(path),
        FileTestOperator::RegularFile => fs.is_file(path),
        FileTestOperator::Directory => fs.is_dir(path),
        FileTestOperator::Readable | FileTestOperator::Writable | FileTestOperator::Executable => {
            fs.exists(path)
        }
        FileTestOperator::NonEmpty => fs.stat(path).map(|s| s.size > 0).unwrap_or(false),
        FileTestOperator::SymbolicLink | FileTestOperator::SymbolicLinkH => {
            fs.stat(path).map(|s| s.is_symlink).unwrap_or(false)
        }
        FileTestOperator::StickyBit => fs.stat(path).map(|s| s.mode & 0o1000 != 0).unwrap_or(false),
        FileTestOperator::SetGid => fs.stat(path).map(|s| s.mode & 0o2000 != 0).unwrap_or(false),
        FileTestOperator::SetUid => fs.stat(path).map(|s| s.mode & 0o4000 != 0).unwrap_or(false),
        FileTestOperator::OwnedByGroup | FileTestOperator::OwnedByUser => fs.exists(path),
        FileTestOperator::BlockSpecial | FileTestOperator::CharSpecial | FileTestOperator::NamedPipe
        | FileTestOperator::Socket => false,
        FileTestOperator::Terminal => false,
        FileTestOperator::ModifiedSinceRead => false,
    }
}

/// Evaluate a `[[ ]]` conditional expression tree.
///
/// Word operands go through parameter/command/arithmetic expansion but not
/// word splitting or pathname expansion, matching `[[ ]]` semantics.
pub fn evaluate_conditional_expression(
    state: &mut InterpreterState,
    fs: &dyn SyncFileSystem,
    expr: &ConditionalExpressionNode,
) -> CondEvalResult {
    match expr {
        ConditionalExpressionNode::Word(word_node) => {
            let value = expand_cond_word(state, &word_node.word);
            CondEvalResult::ok(!value.is_empty())
        }

        ConditionalExpressionNode::Not(inner) => {
            let result = evaluate_conditional_expression(state, fs, &inner.operand);
            CondEvalResult::with_stderr(!result.value, result.stderr)
        }

        ConditionalExpressionNode::And(inner) => {
            let left = evaluate_conditional_expression(state, fs, &inner.left);
            if !left.value {
                return left;
            }
            let right = evaluate_conditional_expression(state, fs, &inner.right);
            let mut stderr = left.stderr;
            stderr.push_str(&right.stderr);
            CondEvalResult::with_stderr(right.value, stderr)
        }

        ConditionalExpressionNode::Or(inner) => {
            let left = evaluate_conditional_expression(state, fs, &inner.left);
            if left.value {
                return left;
            }
            let right = evaluate_conditional_expression(state, fs, &inner.right);
            let mut stderr = left.stderr;
            stderr.push_str(&right.stderr);
            CondEvalResult::with_stderr(right.value, stderr)
        }

        ConditionalExpressionNode::Group(inner) => {
            evaluate_conditional_expression(state, fs, &inner.expression)
        }

        ConditionalExpressionNode::Unary(unary) => {
            let operand = expand_cond_word(state, &unary.operand);
            match unary.operator {
                CondUnaryOperator::Z => CondEvalResult::ok(evaluate_string_test(StringTestOp::Empty, &operand)),
                CondUnaryOperator::LowerN => {
                    CondEvalResult::ok(evaluate_string_test(StringTestOp::NonEmpty, &operand))
                }
                CondUnaryOperator::V => {
                    let (is_set, stderr) =
                        evaluate_variable_test(state, &state.env.clone(), &operand, Some(state.current_line as i32));
                    CondEvalResult::with_stderr(is_set, stderr.unwrap_or_default())
                }
                CondUnaryOperator::UpperR => CondEvalResult::ok(evaluate_nameref_test(state, &operand)),
                CondUnaryOperator::LowerO => {
                    CondEvalResult::ok(evaluate_shell_option(state, &operand))
                }
                other => {
                    let path = if operand.starts_with('/') {
                        operand.clone()
                    } else {
                        fs.resolve_path(&state.cwd, &operand)
                    };
                    match file_test_operator_for(other) {
                        Some(test_op) => CondEvalResult::ok(evaluate_file_test(fs, test_op, &path)),
                        None => CondEvalResult::ok(false),
                    }
                }
            }
        }

        ConditionalExpressionNode::Binary(binary) => {
            let left = expand_cond_word(state, &binary.left);
            let nocasematch = state.shopt_options.nocasematch;
            let extglob = state.shopt_options.extglob;

            match binary.operator {
                CondBinaryOperator::Eq | CondBinaryOperator::EqEq => {
                    let pattern = expand_cond_word(state, &binary.right);
                    CondEvalResult::ok(match_pattern(&left, &pattern, nocasematch, extglob))
                }
                CondBinaryOperator::Ne => {
                    let pattern = expand_cond_word(state, &binary.right);
                    CondEvalResult::ok(!match_pattern(&left, &pattern, nocasematch, extglob))
                }
                CondBinaryOperator::Lt | CondBinaryOperator::Gt => {
                    let right = expand_cond_word(state, &binary.right);
                    let cmp = left.cmp(&right);
                    let value = if binary.operator == CondBinaryOperator::Lt {
                        cmp == std::cmp::Ordering::Less
                    } else {
                        cmp == std::cmp::Ordering::Greater
                    };
                    CondEvalResult::ok(value)
                }
                CondBinaryOperator::Match => {
                    let pattern = expand_cond_word(state, &binary.right);
                    let regex_str = posix_ere_to_regex(&pattern);
                    match Regex::new(&regex_str) {
                        Ok(re) => {
                            if let Some(caps) = re.captures(&left) {
                                let mut i = 0usize;
                                let mut groups: Vec<String> = Vec::new();
                                loop {
                                    match caps.get(i) {
                                        Some(m) => groups.push(m.as_str().to_string()),
                                        None => {
                                            if i == 0 {
                                                groups.push(String::new());
                                            } else {
                                                break;
                                            }
                                        }
                                    }
                                    i += 1;
                                    if i > 64 {
                                        break;
                                    }
                                }
                                for (idx, g) in groups.iter().enumerate() {
                                    crate::interpreter::helpers::array::set_array_element(
                                        &mut state.env,
                                        "BASH_REMATCH",
                                        idx as i64,
                                        g.clone(),
                                    );
                                }
                                CondEvalResult::ok(true)
                            } else {
                                CondEvalResult::ok(false)
                            }
                        }
                        Err(_) => CondEvalResult::ok(false),
                    }
                }
                CondBinaryOperator::NumEq
                | CondBinaryOperator::NumNe
                | CondBinaryOperator::NumLt
                | CondBinaryOperator::NumLe
                | CondBinaryOperator::NumGt
                | CondBinaryOperator::NumGe => {
                    let right = expand_cond_word(state, &binary.right);
                    let left_val = parse_numeric(&left);
                    let right_val = parse_numeric(&right);
                    let op = match binary.operator {
                        CondBinaryOperator::NumEq => crate::interpreter::helpers::numeric_compare::NumericOp::Eq,
                        CondBinaryOperator::NumNe => crate::interpreter::helpers::numeric_compare::NumericOp::Ne,
                        CondBinaryOperator::NumLt => crate::interpreter::helpers::numeric_compare::NumericOp::Lt,
                        CondBinaryOperator::NumLe => crate::interpreter::helpers::numeric_compare::NumericOp::Le,
                        CondBinaryOperator::NumGt => crate::interpreter::helpers::numeric_compare::NumericOp::Gt,
                        _ => crate::interpreter::helpers::numeric_compare::NumericOp::Ge,
                    };
                    CondEvalResult::ok(compare_numeric(op, left_val, right_val))
                }
                CondBinaryOperator::Nt | CondBinaryOperator::Ot | CondBinaryOperator::Ef => {
                    let right = expand_cond_word(state, &binary.right);
                    let left_path = if left.starts_with('/') { left.clone() } else { fs.resolve_path(&state.cwd, &left) };
                    let right_path = if right.starts_with('/') { right.clone() } else { fs.resolve_path(&state.cwd, &right) };
                    let left_stat = fs.stat(&left_path).ok();
                    let right_stat = fs.stat(&right_path).ok();
                    let value = match binary.operator {
                        CondBinaryOperator::Nt => match (&left_stat, &right_stat) {
                            (Some(l), Some(r)) => l.mtime > r.mtime,
                            (Some(_), None) => true,
                            _ => false,
                        },
                        CondBinaryOperator::Ot => match (&left_stat, &right_stat) {
                            (Some(l), Some(r)) => l.mtime < r.mtime,
                            (None, Some(_)) => true,
                            _ => false,
                        },
                        _ => left_path == right_path && fs.exists(&left_path),
                    };
                    CondEvalResult::ok(value)
                }
            }
        }
    }
}

/// Evaluate a `[[ ]]`/`test` string comparison without pattern matching
/// (used by the `test`/`[` builtin, which never treats `==` as a glob).
pub fn evaluate_literal_string_compare(op: &str, left: &str, right: &str, nocasematch: bool) -> Option<bool> {
    StringCompareOp::from_str(op).map(|op| compare_strings_nocase(op, left, right, nocasematch))
}
