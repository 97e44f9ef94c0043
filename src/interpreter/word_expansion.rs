//! Word Expansion
//!
//! Main entry point for shell word expansion.
//!
//! Handles shell word expansion including:
//! - Brace expansion {a,b,c}
//! - Tilde expansion (~)
//! - Parameter/variable expansion ($VAR, ${VAR}, and the full `${...}` operator grammar)
//! - Command substitution $(...) and `...`
//! - Arithmetic expansion $((...))
//! - Word splitting (IFS)
//! - Pathname (glob) expansion
//! - Quote removal
//!
//! This module composes the leaf-level building blocks implemented in the
//! `expansion/` submodules into the pipeline bash specifies for word expansion.
//! Command substitution needs to run a script and capture its output, which
//! requires calling back into the executor; callers provide a [`CommandSubstFn`]
//! for that purpose.

use crate::ast::types::{
    ArithmeticExpansionPart, BraceExpansionPart, BraceItem, BraceRangeValue,
    CommandSubstitutionPart, GlobPart, InnerParameterOperation, ParameterExpansionPart,
    ParameterOperation, ScriptNode, TildeExpansionPart, WordNode, WordPart,
};
use crate::interpreter::expansion::array_pattern_ops::{
    apply_array_pattern_removal, apply_array_pattern_replacement,
};
use crate::interpreter::expansion::array_prefix_suffix::{
    apply_prefix_suffix_to_array, apply_pattern_removal_with_prefix_suffix,
    apply_pattern_replacement_with_prefix_suffix,
};
use crate::interpreter::expansion::array_slice_transform::{
    apply_array_slicing, apply_array_transform,
};
use crate::interpreter::expansion::array_word_expansion::{
    handle_nameref_array_expansion, handle_simple_array_expansion,
};
use crate::interpreter::expansion::indirect_expansion::{
    check_indirect_array_alternative, check_indirect_array_default, expand_indirect_array,
    expand_indirect_array_attributes, expand_indirect_array_slicing, expand_indirect_positional,
};
use crate::interpreter::expansion::parameter_ops::{
    apply_case_modification, apply_pattern_removal_op, apply_pattern_replacement_op,
    apply_substring_op, apply_transform_op, get_array_keys, get_parameter_length,
    get_var_names_with_prefix_op, should_use_alternative, should_use_default, ParameterOpContext,
};
use crate::interpreter::expansion::variable::get_array_elements;
use crate::interpreter::expansion::word_glob_expansion::expand_glob_pattern;
use crate::interpreter::helpers::get_ifs_separator;
use crate::interpreter::interpreter::FileSystem as SyncFileSystem;
use crate::interpreter::types::{ExecResult, InterpreterState};
use regex_lite::Regex;

// Re-export commonly used expansion functions
pub use crate::interpreter::expansion::analysis::*;
pub use crate::interpreter::expansion::brace_range::*;
pub use crate::interpreter::expansion::glob_escape::*;
pub use crate::interpreter::expansion::pattern::*;
pub use crate::interpreter::expansion::pattern_removal::*;
pub use crate::interpreter::expansion::quoting::*;
pub use crate::interpreter::expansion::tilde::*;
pub use crate::interpreter::expansion::variable::*;
pub use crate::interpreter::expansion::word_split::*;

/// Result of word expansion.
#[derive(Debug, Clone)]
pub struct WordExpansionResult {
    /// The expanded string value
    pub value: String,
    /// Whether the expansion produced multiple words (from word splitting)
    pub split_words: Option<Vec<String>>,
    /// Any stderr output from command substitutions or `${var:?msg}`
    pub stderr: String,
    /// Exit code set by a fatal expansion error (e.g. `${var:?msg}`)
    pub exit_code: Option<i32>,
}

impl WordExpansionResult {
    /// Create a simple result with just a value.
    pub fn simple(value: String) -> Self {
        Self {
            value,
            split_words: None,
            stderr: String::new(),
            exit_code: None,
        }
    }

    /// Create a result with split words.
    pub fn with_split(value: String, words: Vec<String>) -> Self {
        Self {
            value,
            split_words: Some(words),
            stderr: String::new(),
            exit_code: None,
        }
    }

    fn from_fields(fields: Vec<String>) -> Self {
        if fields.len() == 1 {
            WordExpansionResult::simple(fields.into_iter().next().unwrap())
        } else {
            let value = fields.first().cloned().unwrap_or_default();
            WordExpansionResult {
                value,
                split_words: Some(fields),
                stderr: String::new(),
                exit_code: None,
            }
        }
    }
}

/// Options for word expansion.
#[derive(Debug, Clone, Default)]
pub struct WordExpansionOptions {
    /// Whether we're inside double quotes
    pub in_double_quotes: bool,
    /// Whether to perform word splitting
    pub do_word_split: bool,
    /// Whether to perform glob expansion
    pub do_glob: bool,
    /// Whether to preserve empty fields
    pub preserve_empty: bool,
    /// Whether extglob is enabled
    pub extglob: bool,
}

/// Callback type for command substitution execution.
///
/// The runtime must provide this callback to execute command substitutions.
/// It is handed the substitution's parsed body and must run it as a subshell
/// (a clone of the live state, discarding mutations) and return
/// `(stdout, stderr, exit_code)`. Trailing newlines are stripped by the caller
/// of this module, not by the callback.
pub type CommandSubstFn<'a> = dyn FnMut(&ScriptNode) -> (String, String, i32) + 'a;

/// Legacy alias kept for callers that bridge through `InterpreterState` directly.
pub type CommandSubstitutionFn =
    Box<dyn Fn(&str, &mut InterpreterState) -> ExecResult + Send + Sync>;

// ============================================================================
// Public entry points
// ============================================================================

/// Expand a word for use as a command name.
///
/// Runs the full expansion pipeline (including word splitting and glob
/// expansion) because bash does apply both to the command-name word; if the
/// expansion yields more than one field, the first field is the command name
/// and the remaining fields are returned via `split_words` so the caller can
/// prepend them to the argument list.
pub fn expand_word(
    fs: &dyn SyncFileSystem,
    state: &mut InterpreterState,
    word: &WordNode,
    cmd_subst: Option<&mut CommandSubstFn>,
) -> WordExpansionResult {
    expand_word_with_glob(fs, state, word, cmd_subst)
}

/// Expand a word with full word splitting and glob (pathname) expansion.
pub fn expand_word_with_glob(
    fs: &dyn SyncFileSystem,
    state: &mut InterpreterState,
    word: &WordNode,
    mut cmd_subst: Option<&mut CommandSubstFn>,
) -> WordExpansionResult {
    let variants = expand_braces_in_word(word);
    let mut fields: Vec<String> = Vec::new();
    let mut stderr = String::new();
    let mut exit_code: Option<i32> = None;

    for variant in &variants {
        let mut variant_fields =
            expand_word_variant(fs, state, variant, true, true, cmd_subst.as_deref_mut());
        if let Some(code) = state.expansion_exit_code.take() {
            exit_code = Some(code);
        }
        if let Some(err) = state.expansion_stderr.take() {
            stderr.push_str(&err);
        }
        fields.append(&mut variant_fields);
    }

    let mut result = WordExpansionResult::from_fields(fields);
    result.stderr = stderr;
    result.exit_code = exit_code;
    result
}

/// Expand a word without glob expansion or word splitting (used for
/// assignment right-hand-sides and other contexts where the result must stay
/// a single field).
pub fn expand_word_no_glob(
    state: &mut InterpreterState,
    word: &WordNode,
    options: &WordExpansionOptions,
) -> WordExpansionResult {
    let mut cmd_subst: Option<&mut CommandSubstFn> = None;
    let value = expand_word_concat(state, word, options.in_double_quotes, cmd_subst.as_deref_mut());
    let mut result = WordExpansionResult::simple(value);
    result.exit_code = state.expansion_exit_code.take();
    result.stderr = state.expansion_stderr.take().unwrap_or_default();
    result
}

// ============================================================================
// Brace expansion (word-level, cartesian product)
// ============================================================================

/// Expand all brace-expansion parts of a word into the cartesian product of
/// concrete `WordNode`s. Most words have no brace parts and this returns a
/// single-element vector containing a clone of `word`.
pub fn expand_braces_in_word(word: &WordNode) -> Vec<WordNode> {
    if let Some(idx) = word
        .parts
        .iter()
        .position(|p| matches!(p, WordPart::BraceExpansion(_)))
    {
        let before = &word.parts[..idx];
        let after = &word.parts[idx + 1..];
        let brace = match &word.parts[idx] {
            WordPart::BraceExpansion(b) => b,
            _ => unreachable!(),
        };

        let mut results = Vec::new();
        for alt in brace_alternatives(brace) {
            let mut parts = Vec::with_capacity(before.len() + alt.len() + after.len());
            parts.extend_from_slice(before);
            parts.extend(alt);
            parts.extend_from_slice(after);
            let candidate = WordNode { parts };
            results.extend(expand_braces_in_word(&candidate));
        }
        if results.is_empty() {
            // Invalid brace expansion - fall back to treating the word literally.
            vec![WordNode {
                parts: {
                    let mut parts = Vec::with_capacity(before.len() + after.len());
                    parts.extend_from_slice(before);
                    parts.extend_from_slice(after);
                    parts
                },
            }]
        } else {
            results
        }
    } else {
        vec![word.clone()]
    }
}

fn brace_alternatives(brace: &BraceExpansionPart) -> Vec<Vec<WordPart>> {
    let mut out = Vec::new();
    for item in &brace.items {
        match item {
            BraceItem::Word { word } => out.push(word.parts.clone()),
            BraceItem::Range {
                start,
                end,
                step,
                start_str,
                end_str,
            } => {
                let start_val = match start {
                    BraceRangeValue::Number(n) => RangeValue::Numeric(*n),
                    BraceRangeValue::Char(c) => RangeValue::Char(*c),
                };
                let end_val = match end {
                    BraceRangeValue::Number(n) => RangeValue::Numeric(*n),
                    BraceRangeValue::Char(c) => RangeValue::Char(*c),
                };
                match expand_brace_range(
                    start_val,
                    end_val,
                    *step,
                    start_str.as_deref(),
                    end_str.as_deref(),
                ) {
                    Ok(result) => {
                        if let Some(values) = result.expanded {
                            for v in values {
                                out.push(vec![WordPart::Literal(
                                    crate::ast::types::LiteralPart { value: v },
                                )]);
                            }
                        } else {
                            out.push(vec![WordPart::Literal(crate::ast::types::LiteralPart {
                                value: result.literal,
                            })]);
                        }
                    }
                    Err(_) => {
                        // Mixed-case char range etc: leave literal (no expansion).
                        out.push(vec![WordPart::Literal(crate::ast::types::LiteralPart {
                            value: String::new(),
                        })]);
                    }
                }
            }
        }
    }
    out
}

// ============================================================================
// Per-variant expansion (splitting + glob)
// ============================================================================

fn expand_word_variant(
    fs: &dyn SyncFileSystem,
    state: &mut InterpreterState,
    word: &WordNode,
    do_split: bool,
    do_glob: bool,
    mut cmd_subst: Option<&mut CommandSubstFn>,
) -> Vec<String> {
    // Whole-word array shortcuts: "${arr[@]}" / "${arr[@]:op}" etc, both bare
    // and double-quoted, where the entire word is exactly one parameter
    // expansion referencing `name[@]`/`name[*]`.
    if let Some(fields) = expand_whole_word_array(state, word, cmd_subst.as_deref_mut()) {
        return fields;
    }

    let extglob = state.shopt_options.extglob;
    let noglob = state.options.noglob;
    let failglob = state.shopt_options.failglob;
    let nullglob = state.shopt_options.nullglob;
    let dotglob = state.shopt_options.dotglob;
    let globstar = state.shopt_options.globstar;
    let nocaseglob = state.shopt_options.nocaseglob;

    let segments = build_segments(state, &word.parts, false, cmd_subst.as_deref_mut());

    let ifs = get_ifs_separator(&state.env).to_string();
    let words: Vec<String> = if do_split {
        let split_segments: Vec<WordSplitSegment> = segments
            .iter()
            .map(|s| WordSplitSegment {
                value: s.value.clone(),
                is_splittable: s.splittable,
                is_quoted: s.quoted,
            })
            .collect();
        smart_word_split(&split_segments, &ifs).words
    } else {
        let joined: String = segments.iter().map(|s| s.value.as_str()).collect();
        if joined.is_empty() {
            vec![]
        } else {
            vec![joined]
        }
    };

    let has_glob_part = word_has_glob_pattern(word, extglob);
    if !do_glob || noglob || !has_glob_part {
        return words;
    }

    let cwd = state.cwd.clone();
    let mut out = Vec::new();
    for w in words {
        match expand_glob_pattern(
            fs, &w, &cwd, &state.env, failglob, nullglob, extglob, dotglob, globstar, nocaseglob,
        ) {
            Ok(r) => out.extend(r.values),
            Err(_) => out.push(w),
        }
    }
    out
}

struct Segment {
    value: String,
    splittable: bool,
    quoted: bool,
}

/// Single-field concatenation used for `expand_word_no_glob`/command-name
/// contexts where splitting doesn't apply.
fn expand_word_concat(
    state: &mut InterpreterState,
    word: &WordNode,
    in_double_quotes: bool,
    cmd_subst: Option<&mut CommandSubstFn>,
) -> String {
    let segments = build_segments(state, &word.parts, in_double_quotes, cmd_subst);
    segments.into_iter().map(|s| s.value).collect()
}

fn build_segments(
    state: &mut InterpreterState,
    parts: &[WordPart],
    in_double_quotes: bool,
    mut cmd_subst: Option<&mut CommandSubstFn>,
) -> Vec<Segment> {
    let mut segments = Vec::with_capacity(parts.len());
    for part in parts {
        segments.push(expand_part(state, part, in_double_quotes, cmd_subst.as_deref_mut()));
    }
    segments
}

fn expand_part(
    state: &mut InterpreterState,
    part: &WordPart,
    in_double_quotes: bool,
    mut cmd_subst: Option<&mut CommandSubstFn>,
) -> Segment {
    use crate::interpreter::helpers::word_parts::get_literal_value;

    if let Some(literal) = get_literal_value(part) {
        return Segment {
            value: literal.to_string(),
            splittable: false,
            quoted: in_double_quotes,
        };
    }

    match part {
        WordPart::TildeExpansion(tilde) => Segment {
            value: expand_tilde_part(state, tilde, in_double_quotes),
            splittable: false,
            quoted: false,
        },
        WordPart::ParameterExpansion(param) => {
            let value =
                expand_parameter_scalar(state, param, in_double_quotes, cmd_subst.as_deref_mut());
            Segment {
                value,
                splittable: !in_double_quotes,
                quoted: in_double_quotes,
            }
        }
        WordPart::DoubleQuoted(dq) => {
            let mut value = String::new();
            for inner in &dq.parts {
                value.push_str(&expand_part(state, inner, true, cmd_subst.as_deref_mut()).value);
            }
            Segment {
                value,
                splittable: false,
                quoted: true,
            }
        }
        WordPart::CommandSubstitution(sub) => {
            let value = expand_command_substitution(state, sub, cmd_subst.as_deref_mut());
            Segment {
                value,
                splittable: !in_double_quotes,
                quoted: in_double_quotes,
            }
        }
        WordPart::ArithmeticExpansion(arith) => {
            let value = expand_arithmetic_part(state, arith, cmd_subst.as_deref_mut());
            Segment {
                value,
                splittable: !in_double_quotes,
                quoted: in_double_quotes,
            }
        }
        WordPart::Glob(glob) => Segment {
            value: glob.pattern.clone(),
            splittable: false,
            quoted: false,
        },
        WordPart::BraceExpansion(_) => {
            // Should already have been expanded away by `expand_braces_in_word`.
            Segment {
                value: String::new(),
                splittable: false,
                quoted: in_double_quotes,
            }
        }
        _ => Segment {
            value: String::new(),
            splittable: false,
            quoted: in_double_quotes,
        },
    }
}

fn expand_tilde_part(
    state: &InterpreterState,
    tilde: &TildeExpansionPart,
    in_double_quotes: bool,
) -> String {
    if in_double_quotes {
        return match &tilde.user {
            Some(u) => format!("~{}", u),
            None => "~".to_string(),
        };
    }
    let tilde_str = match &tilde.user {
        Some(u) => format!("~{}", u),
        None => "~".to_string(),
    };
    apply_tilde_expansion(state, &tilde_str)
}

fn expand_arithmetic_part(
    state: &mut InterpreterState,
    arith: &ArithmeticExpansionPart,
    cmd_subst: Option<&mut CommandSubstFn>,
) -> String {
    use crate::interpreter::arithmetic::{evaluate_arithmetic, ArithExecFn};
    use crate::interpreter::types::{ExecutionLimits, InterpreterContext};

    let limits = ExecutionLimits::default();
    // `evaluate_arithmetic` can invoke command substitutions embedded inside
    // the expression text (e.g. `$(($(echo 1) + 1))`); bridge those through
    // the same callback, running them as subshells.
    let exec_fn: Option<ArithExecFn> = cmd_subst.map(|cs| {
        let cs_ptr: *mut CommandSubstFn = cs;
        let f: ArithExecFn = Box::new(move |cmd: &str| {
            let script = crate::parser::parse(cmd).unwrap_or(ScriptNode { statements: vec![] });
            // Safety: exec_fn is only invoked synchronously within this call.
            let cs_ref: &mut CommandSubstFn = unsafe { &mut *cs_ptr };
            cs_ref(&script)
        });
        f
    });

    let mut ctx = InterpreterContext::new(state, &limits);
    match evaluate_arithmetic(&mut ctx, &arith.expression.expression, true, exec_fn.as_ref()) {
        Ok(value) => value.to_string(),
        Err(_) => "0".to_string(),
    }
}

fn expand_command_substitution(
    state: &mut InterpreterState,
    sub: &CommandSubstitutionPart,
    cmd_subst: Option<&mut CommandSubstFn>,
) -> String {
    let Some(cs) = cmd_subst else {
        return String::new();
    };
    let (stdout, stderr, _exit_code) = cs(&sub.body);
    if !stderr.is_empty() {
        match &mut state.expansion_stderr {
            Some(existing) => existing.push_str(&stderr),
            None => state.expansion_stderr = Some(stderr),
        }
    }
    let mut out = stdout;
    while out.ends_with('\n') {
        out.pop();
    }
    out
}

// ============================================================================
// Whole-word array shortcuts: "${arr[@]}" and friends
// ============================================================================

fn expand_whole_word_array(
    state: &mut InterpreterState,
    word: &WordNode,
    cmd_subst: Option<&mut CommandSubstFn>,
) -> Option<Vec<String>> {
    // `"prefix${arr[@]}suffix"` and friends: literal text adjacent to an
    // `[@]`/`[*]` array expansion inside the same double-quoted part.
    // Bash attaches the prefix to the first field and the suffix to the
    // last, rather than collapsing the whole thing into one IFS-joined word.
    if let [WordPart::DoubleQuoted(dq)] = word.parts.as_slice() {
        if dq.parts.len() > 1 {
            if let Some(values) = expand_array_with_adjacent_text(state, &dq.parts) {
                return Some(values);
            }
        }
    }

    // Bare (unquoted) single parameter-expansion part.
    let param = match word.parts.as_slice() {
        [WordPart::ParameterExpansion(p)] => Some((p, false)),
        [WordPart::DoubleQuoted(dq)] => match dq.parts.as_slice() {
            [WordPart::ParameterExpansion(p)] => Some((p, true)),
            _ => None,
        },
        _ => None,
    };
    let (param, quoted) = param?;

    if param.operation.is_none() {
        if let Some(r) = handle_simple_array_expansion(state, &word.parts) {
            return Some(r.values);
        }
        if let Some(r) = handle_nameref_array_expansion(state, &word.parts) {
            return Some(r.values);
        }
        return None;
    }

    if let Some(ParameterOperation::Indirection(ind)) = param.operation.as_ref() {
        return expand_indirect_word_array(state, &param.parameter, ind, cmd_subst);
    }

    let (array_name, is_star) = parse_array_at_star(&param.parameter)?;
    let _ = quoted;

    let op = match param.operation.as_ref()? {
        ParameterOperation::Inner(op) => op,
        _ => return None,
    };

    match op {
        InnerParameterOperation::Substring(s) => {
            let offset = eval_arith_simple(state, &s.offset);
            let length = s.length.as_ref().map(|l| eval_arith_simple(state, l));
            apply_array_slicing(state, &array_name, is_star, offset, length).ok()
        }
        InnerParameterOperation::Transform(t) => {
            let op_str = transform_operator_str(&t.operator);
            Some(apply_array_transform(state, &array_name, is_star, op_str))
        }
        InnerParameterOperation::PatternRemoval(p) => {
            let pattern = expand_word_concat(state, &p.pattern, false, None);
            let regex = pattern_to_regex(&pattern, p.greedy, state.shopt_options.extglob);
            let side = match p.side {
                crate::ast::types::PatternRemovalSide::Prefix => {
                    crate::interpreter::expansion::PatternRemovalSide::Prefix
                }
                crate::ast::types::PatternRemovalSide::Suffix => {
                    crate::interpreter::expansion::PatternRemovalSide::Suffix
                }
            };
            Some(apply_array_pattern_removal(
                state,
                &array_name,
                is_star,
                &regex,
                side,
                p.greedy,
            ))
        }
        InnerParameterOperation::PatternReplacement(p) => {
            let pattern = expand_word_concat(state, &p.pattern, false, None);
            let regex_pattern = pattern_to_regex(&pattern, true, state.shopt_options.extglob);
            let final_pattern = match p.anchor {
                Some(crate::ast::types::PatternAnchor::Start) => format!("^{}", regex_pattern),
                Some(crate::ast::types::PatternAnchor::End) => format!("{}$", regex_pattern),
                None => regex_pattern,
            };
            let replacement = p
                .replacement
                .as_ref()
                .map(|w| expand_word_concat(state, w, false, None))
                .unwrap_or_default();
            Some(apply_array_pattern_replacement(
                state,
                &array_name,
                is_star,
                &final_pattern,
                &replacement,
                p.all,
            ))
        }
        InnerParameterOperation::DefaultValue(d) => {
            let elements = get_array_elements(state, &array_name);
            let use_default = elements.is_empty()
                || (d.check_empty && elements.iter().all(|(_, v)| v.is_empty()));
            if use_default {
                Some(vec![expand_word_concat(state, &d.word, false, cmd_subst)])
            } else {
                Some(elements.into_iter().map(|(_, v)| v).collect())
            }
        }
        InnerParameterOperation::UseAlternative(u) => {
            let elements = get_array_elements(state, &array_name);
            let is_set = !elements.is_empty();
            if is_set && (!u.check_empty || !elements.iter().all(|(_, v)| v.is_empty())) {
                Some(vec![expand_word_concat(state, &u.word, false, cmd_subst)])
            } else {
                Some(vec![])
            }
        }
        InnerParameterOperation::Length(_) => {
            Some(vec![get_array_elements(state, &array_name).len().to_string()])
        }
        _ => None,
    }
}

/// Handle `"literal-prefix${arr[@]<op>}literal-suffix"`: a double-quoted
/// word whose only non-literal part is a single `[@]`/`[*]` array
/// expansion, with plain literal text (no nested expansions) on either
/// side. Returns `None` for any shape this doesn't cover, so the caller
/// falls back to the ordinary per-part expansion path.
fn expand_array_with_adjacent_text(
    state: &InterpreterState,
    parts: &[WordPart],
) -> Option<Vec<String>> {
    use crate::interpreter::helpers::word_parts::get_literal_value;
    use crate::interpreter::expansion::{pattern_to_regex, PatternRemovalSide};
    use crate::ast::types::PatternAnchor;

    let idx = parts.iter().position(|p| matches!(p, WordPart::ParameterExpansion(_)))?;
    // Every other part must be a plain literal (no tilde/command-subst/etc.
    // adjacent to the array expansion); otherwise bail to the general path.
    for (i, p) in parts.iter().enumerate() {
        if i != idx && get_literal_value(p).is_none() {
            return None;
        }
    }
    let prefix: String = parts[..idx].iter().map(|p| get_literal_value(p).unwrap_or("")).collect();
    let suffix: String = parts[idx + 1..].iter().map(|p| get_literal_value(p).unwrap_or("")).collect();

    let WordPart::ParameterExpansion(param) = &parts[idx] else { return None };
    let (array_name, is_star) = parse_array_at_star(&param.parameter)?;

    match param.operation.as_ref() {
        None => Some(
            apply_prefix_suffix_to_array(state, &array_name, is_star, &prefix, &suffix).values,
        ),
        Some(ParameterOperation::Inner(InnerParameterOperation::PatternRemoval(p))) => {
            let pattern = expand_word_concat_immut(&p.pattern);
            let regex = pattern_to_regex(&pattern, p.greedy, state.shopt_options.extglob);
            let side = match p.side {
                crate::ast::types::PatternRemovalSide::Prefix => PatternRemovalSide::Prefix,
                crate::ast::types::PatternRemovalSide::Suffix => PatternRemovalSide::Suffix,
            };
            Some(
                apply_pattern_removal_with_prefix_suffix(
                    state, &array_name, is_star, &prefix, &suffix, &regex, side, p.greedy,
                )
                .values,
            )
        }
        Some(ParameterOperation::Inner(InnerParameterOperation::PatternReplacement(p))) => {
            let pattern = expand_word_concat_immut(&p.pattern);
            let regex_pattern = pattern_to_regex(&pattern, true, state.shopt_options.extglob);
            let final_pattern = match p.anchor {
                Some(PatternAnchor::Start) => format!("^{}", regex_pattern),
                Some(PatternAnchor::End) => format!("{}$", regex_pattern),
                None => regex_pattern,
            };
            let replacement = p
                .replacement
                .as_ref()
                .map(expand_word_concat_immut)
                .unwrap_or_default();
            Some(
                apply_pattern_replacement_with_prefix_suffix(
                    state, &array_name, is_star, &prefix, &suffix, &final_pattern, &replacement, p.all,
                )
                .values,
            )
        }
        _ => None,
    }
}

/// Expand a pattern/replacement word's literal text without touching
/// session state — these operands only need plain text in practice
/// (mirroring the `None` cmd-subst handling the non-adjacent-text array
/// pattern ops already use above).
fn expand_word_concat_immut(word: &WordNode) -> String {
    use crate::interpreter::helpers::word_parts::get_literal_value;
    word.parts.iter().map(|p| get_literal_value(p).unwrap_or("")).collect()
}

/// Handle `"${!ref}"` and friends where `ref`'s value is itself an array
/// reference (`"arr[@]"`/`"arr[*]"`) or the positional-parameter markers
/// `@`/`*`: bash expands these to the referenced array/positional fields
/// rather than to the single string `ref` holds.
fn expand_indirect_word_array(
    state: &mut InterpreterState,
    ref_name: &str,
    ind: &crate::ast::types::IndirectionOp,
    cmd_subst: Option<&mut CommandSubstFn>,
) -> Option<Vec<String>> {
    match ind.inner_op.as_deref() {
        None => {
            if let Some(r) = expand_indirect_positional(state, ref_name) {
                return Some(r.values);
            }
            expand_indirect_array(state, ref_name).map(|r| r.values)
        }
        Some(InnerParameterOperation::Substring(s)) => {
            let offset = eval_arith_simple(state, &s.offset);
            let length = s.length.as_ref().map(|l| eval_arith_simple(state, l));
            match expand_indirect_array_slicing(state, ref_name, offset, length)? {
                Ok(r) => Some(r.values),
                Err(_) => Some(vec![]),
            }
        }
        Some(InnerParameterOperation::DefaultValue(d)) => {
            let (use_default, result) = check_indirect_array_default(state, ref_name, d.check_empty)?;
            if use_default {
                Some(vec![expand_word_concat(state, &d.word, false, cmd_subst)])
            } else {
                Some(result.values)
            }
        }
        Some(InnerParameterOperation::UseAlternative(u)) => {
            let (use_alt, _) = check_indirect_array_alternative(state, ref_name, u.check_empty)?;
            if use_alt {
                Some(vec![expand_word_concat(state, &u.word, false, cmd_subst)])
            } else {
                Some(vec![])
            }
        }
        Some(InnerParameterOperation::Transform(t))
            if matches!(t.operator, crate::ast::types::TransformOperator::A | crate::ast::types::TransformOperator::LowerA) =>
        {
            expand_indirect_array_attributes(state, ref_name).map(|r| r.values)
        }
        _ => None,
    }
}

fn parse_array_at_star(parameter: &str) -> Option<(String, bool)> {
    let re = Regex::new(r"^([a-zA-Z_][a-zA-Z0-9_]*)\[(@|\*)\]$").ok()?;
    let caps = re.captures(parameter)?;
    let name = caps.get(1)?.as_str().to_string();
    let is_star = caps.get(2)?.as_str() == "*";
    Some((name, is_star))
}

fn transform_operator_str(op: &crate::ast::types::TransformOperator) -> &'static str {
    use crate::ast::types::TransformOperator::*;
    match op {
        Q => "Q",
        P => "P",
        A => "a",
        LowerA => "a",
        E => "E",
        K => "K",
        LowerK => "k",
        LowerU => "u",
        U => "U",
        L => "L",
    }
}

fn eval_arith_simple(state: &mut InterpreterState, expr: &crate::ast::types::ArithmeticExpressionNode) -> i64 {
    use crate::interpreter::arithmetic::evaluate_arithmetic;
    use crate::interpreter::types::{ExecutionLimits, InterpreterContext};
    let limits = ExecutionLimits::default();
    let mut ctx = InterpreterContext::new(state, &limits);
    evaluate_arithmetic(&mut ctx, &expr.expression, true, None).unwrap_or(0)
}

// ============================================================================
// Scalar parameter expansion (the `${...}` operator grammar)
// ============================================================================

fn expand_parameter_scalar(
    state: &mut InterpreterState,
    param: &ParameterExpansionPart,
    in_double_quotes: bool,
    cmd_subst: Option<&mut CommandSubstFn>,
) -> String {
    let Some(operation) = &param.operation else {
        return get_variable(state, &param.parameter);
    };

    match operation {
        ParameterOperation::Inner(op) => {
            expand_inner_op(state, &param.parameter, op, in_double_quotes, cmd_subst)
        }
        ParameterOperation::Indirection(ind) => {
            let target = get_variable(state, &param.parameter);
            if target.is_empty() {
                return String::new();
            }
            match &ind.inner_op {
                None => get_variable(state, &target),
                Some(inner) => expand_inner_op(state, &target, inner, in_double_quotes, cmd_subst),
            }
        }
        ParameterOperation::ArrayKeys(a) => {
            let keys = get_array_keys(state, &a.array, a.star);
            keys.into_iter().next().unwrap_or_default()
        }
        ParameterOperation::VarNamePrefix(v) => {
            let names = get_var_names_with_prefix_op(state, &v.prefix, v.star);
            names.into_iter().next().unwrap_or_default()
        }
    }
}

fn expand_inner_op(
    state: &mut InterpreterState,
    parameter: &str,
    op: &InnerParameterOperation,
    in_double_quotes: bool,
    cmd_subst: Option<&mut CommandSubstFn>,
) -> String {
    match op {
        InnerParameterOperation::DefaultValue(d) => {
            let ctx = ParameterOpContext::new(state, parameter, in_double_quotes);
            if should_use_default(&ctx, d.check_empty) {
                expand_word_concat(state, &d.word, in_double_quotes, cmd_subst)
            } else {
                ctx.value
            }
        }
        InnerParameterOperation::AssignDefault(d) => {
            let ctx = ParameterOpContext::new(state, parameter, in_double_quotes);
            if should_use_default(&ctx, d.check_empty) {
                let value = expand_word_concat(state, &d.word, in_double_quotes, cmd_subst);
                state.env.insert(parameter.to_string(), value.clone());
                value
            } else {
                ctx.value
            }
        }
        InnerParameterOperation::ErrorIfUnset(e) => {
            let ctx = ParameterOpContext::new(state, parameter, in_double_quotes);
            if should_use_default(&ctx, e.check_empty) {
                let msg = match &e.word {
                    Some(w) => expand_word_concat(state, w, in_double_quotes, cmd_subst),
                    None => format!("{}: parameter null or not set", parameter),
                };
                state.expansion_stderr = Some(format!("bash: {}: {}\n", parameter, msg));
                state.expansion_exit_code = Some(1);
                String::new()
            } else {
                ctx.value
            }
        }
        InnerParameterOperation::UseAlternative(u) => {
            let ctx = ParameterOpContext::new(state, parameter, in_double_quotes);
            if should_use_alternative(&ctx, u.check_empty) {
                expand_word_concat(state, &u.word, in_double_quotes, cmd_subst)
            } else {
                String::new()
            }
        }
        InnerParameterOperation::Length(_) => get_parameter_length(state, parameter).to_string(),
        InnerParameterOperation::LengthSliceError(_) | InnerParameterOperation::BadSubstitution(_) => {
            state.expansion_stderr = Some(format!("bash: {}: bad substitution\n", parameter));
            state.expansion_exit_code = Some(1);
            String::new()
        }
        InnerParameterOperation::Substring(s) => {
            let value = get_variable(state, parameter);
            let offset = eval_arith_simple(state, &s.offset);
            let length = s.length.as_ref().map(|l| eval_arith_simple(state, l));
            apply_substring_op(&value, offset, length).unwrap_or_default()
        }
        InnerParameterOperation::PatternRemoval(p) => {
            let value = get_variable(state, parameter);
            let pattern = expand_word_concat(state, &p.pattern, false, None);
            let regex = pattern_to_regex(&pattern, p.greedy, state.shopt_options.extglob);
            let side = match p.side {
                crate::ast::types::PatternRemovalSide::Prefix => {
                    crate::interpreter::expansion::PatternRemovalSide::Prefix
                }
                crate::ast::types::PatternRemovalSide::Suffix => {
                    crate::interpreter::expansion::PatternRemovalSide::Suffix
                }
            };
            apply_pattern_removal_op(&value, &regex, side, p.greedy)
        }
        InnerParameterOperation::PatternReplacement(p) => {
            let value = get_variable(state, parameter);
            let pattern = expand_word_concat(state, &p.pattern, false, None);
            let regex_pattern = pattern_to_regex(&pattern, true, state.shopt_options.extglob);
            let replacement = p
                .replacement
                .as_ref()
                .map(|w| expand_word_concat(state, w, false, None))
                .unwrap_or_default();
            let anchor_start = matches!(p.anchor, Some(crate::ast::types::PatternAnchor::Start));
            let anchor_end = matches!(p.anchor, Some(crate::ast::types::PatternAnchor::End));
            apply_pattern_replacement_op(&value, &regex_pattern, &replacement, p.all, anchor_start, anchor_end)
        }
        InnerParameterOperation::CaseModification(c) => {
            let value = get_variable(state, parameter);
            let op_char = match (c.direction, c.all) {
                (crate::ast::types::CaseDirection::Upper, true) => "U",
                (crate::ast::types::CaseDirection::Upper, false) => "u",
                (crate::ast::types::CaseDirection::Lower, true) => "L",
                (crate::ast::types::CaseDirection::Lower, false) => "l",
            };
            // Pattern-restricted case modification isn't supported; apply to
            // the whole value, matching plain `^`/`^^`/`,`/`,,` semantics.
            let _ = &c.pattern;
            apply_case_modification(&value, op_char)
        }
        InnerParameterOperation::Transform(t) => {
            let value = get_variable(state, parameter);
            apply_transform_op(state, parameter, &value, transform_operator_str(&t.operator))
        }
    }
}

// ============================================================================
// Compatibility helpers
// ============================================================================

/// Check if a word is "fully quoted" - meaning glob characters should be treated literally.
pub fn is_word_fully_quoted(word: &WordNode) -> bool {
    use crate::interpreter::helpers::word_parts::is_quoted_part;

    if word.parts.is_empty() {
        return true;
    }
    for part in &word.parts {
        if !is_quoted_part(part) {
            return false;
        }
    }
    true
}

/// Check if a word contains any glob patterns.
pub fn word_has_glob_pattern(word: &WordNode, extglob: bool) -> bool {
    use crate::interpreter::expansion::glob_escape::has_glob_pattern;

    for part in &word.parts {
        match part {
            WordPart::Glob(_) => return true,
            WordPart::Literal(lit) => {
                if has_glob_pattern(&lit.value, extglob) {
                    return true;
                }
            }
            _ => {}
        }
    }
    false
}

/// Check if a word contains command substitution.
pub fn word_has_command_substitution(word: &WordNode) -> bool {
    for part in &word.parts {
        if matches!(part, WordPart::CommandSubstitution(_)) {
            return true;
        }
        if let WordPart::DoubleQuoted(dq) = part {
            for inner in &dq.parts {
                if matches!(inner, WordPart::CommandSubstitution(_)) {
                    return true;
                }
            }
        }
    }
    false
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::types::{
        DoubleQuotedPart, LiteralPart, SingleQuotedPart,
    };

    fn make_literal_word(s: &str) -> WordNode {
        WordNode {
            parts: vec![WordPart::Literal(LiteralPart {
                value: s.to_string(),
            })],
        }
    }

    fn make_var_word(name: &str) -> WordNode {
        WordNode {
            parts: vec![WordPart::ParameterExpansion(ParameterExpansionPart {
                parameter: name.to_string(),
                operation: None,
            })],
        }
    }

    /// A throwaway in-memory filesystem for tests that need glob expansion
    /// but exercise no actual pathname pattern.
    fn test_fs() -> (crate::interpreter::sync_fs_adapter::SyncFsAdapter, tokio::runtime::Runtime) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let fs = std::sync::Arc::new(crate::fs::InMemoryFs::new());
        let adapter = crate::interpreter::sync_fs_adapter::SyncFsAdapter::new(fs, rt.handle().clone());
        (adapter, rt)
    }

    #[test]
    fn test_expand_word_literal() {
        let mut state = InterpreterState::default();
        let word = make_literal_word("hello");
        let options = WordExpansionOptions::default();
        let result = expand_word_no_glob(&mut state, &word, &options);
        assert_eq!(result.value, "hello");
    }

    #[test]
    fn test_expand_word_variable() {
        let mut state = InterpreterState::default();
        state.env.insert("FOO".to_string(), "bar".to_string());
        let word = make_var_word("FOO");
        let options = WordExpansionOptions::default();
        let result = expand_word_no_glob(&mut state, &word, &options);
        assert_eq!(result.value, "bar");
    }

    #[test]
    fn test_expand_word_unset_variable() {
        let mut state = InterpreterState::default();
        let word = make_var_word("UNSET");
        let options = WordExpansionOptions::default();
        let result = expand_word_no_glob(&mut state, &word, &options);
        assert_eq!(result.value, "");
    }

    #[test]
    fn test_default_value_operation() {
        let mut state = InterpreterState::default();
        let word = WordNode {
            parts: vec![WordPart::ParameterExpansion(ParameterExpansionPart {
                parameter: "UNSET".to_string(),
                operation: Some(ParameterOperation::Inner(InnerParameterOperation::DefaultValue(
                    crate::ast::types::DefaultValueOp {
                        word: make_literal_word("fallback"),
                        check_empty: true,
                    },
                ))),
            })],
        };
        let (fs, _rt) = test_fs();
        let result = expand_word_with_glob(&fs, &mut state, &word, None);
        assert_eq!(result.value, "fallback");
    }

    #[test]
    fn test_assign_default_persists() {
        let mut state = InterpreterState::default();
        let word = WordNode {
            parts: vec![WordPart::ParameterExpansion(ParameterExpansionPart {
                parameter: "X".to_string(),
                operation: Some(ParameterOperation::Inner(InnerParameterOperation::AssignDefault(
                    crate::ast::types::AssignDefaultOp {
                        word: make_literal_word("5"),
                        check_empty: true,
                    },
                ))),
            })],
        };
        let (fs, _rt) = test_fs();
        let result = expand_word_with_glob(&fs, &mut state, &word, None);
        assert_eq!(result.value, "5");
        assert_eq!(state.env.get("X").map(|s| s.as_str()), Some("5"));
    }

    #[test]
    fn test_brace_expansion_word() {
        let word = WordNode {
            parts: vec![WordPart::BraceExpansion(BraceExpansionPart {
                items: vec![
                    BraceItem::Word {
                        word: make_literal_word("a"),
                    },
                    BraceItem::Word {
                        word: make_literal_word("b"),
                    },
                ],
            })],
        };
        let variants = expand_braces_in_word(&word);
        assert_eq!(variants.len(), 2);
        let mut state = InterpreterState::default();
        let (fs, _rt) = test_fs();
        let result = expand_word_with_glob(&fs, &mut state, &word, None);
        assert_eq!(result.split_words, Some(vec!["a".to_string(), "b".to_string()]));
    }

    #[test]
    fn test_array_at_expansion_fields() {
        let mut state = InterpreterState::default();
        state.env.insert("arr_0".to_string(), "one".to_string());
        state.env.insert("arr_1".to_string(), "two".to_string());
        let word = WordNode {
            parts: vec![WordPart::DoubleQuoted(DoubleQuotedPart {
                parts: vec![WordPart::ParameterExpansion(ParameterExpansionPart {
                    parameter: "arr[@]".to_string(),
                    operation: None,
                })],
            })],
        };
        let (fs, _rt) = test_fs();
        let result = expand_word_with_glob(&fs, &mut state, &word, None);
        assert_eq!(result.split_words, Some(vec!["one".to_string(), "two".to_string()]));
    }

    #[test]
    fn test_array_at_expansion_with_adjacent_literal_text() {
        // "x-${arr[@]}-y": the prefix attaches to the first field, the
        // suffix to the last, rather than collapsing to one joined word.
        let mut state = InterpreterState::default();
        state.env.insert("arr_0".to_string(), "one".to_string());
        state.env.insert("arr_1".to_string(), "two".to_string());
        let word = WordNode {
            parts: vec![WordPart::DoubleQuoted(DoubleQuotedPart {
                parts: vec![
                    WordPart::Literal(LiteralPart { value: "x-".to_string() }),
                    WordPart::ParameterExpansion(ParameterExpansionPart {
                        parameter: "arr[@]".to_string(),
                        operation: None,
                    }),
                    WordPart::Literal(LiteralPart { value: "-y".to_string() }),
                ],
            })],
        };
        let (fs, _rt) = test_fs();
        let result = expand_word_with_glob(&fs, &mut state, &word, None);
        assert_eq!(
            result.split_words,
            Some(vec!["x-one".to_string(), "two-y".to_string()])
        );
    }

    #[test]
    fn test_indirect_array_expansion_at() {
        // ref='arr[@]'; "${!ref}" expands to arr's elements as separate fields.
        let mut state = InterpreterState::default();
        state.env.insert("arr_0".to_string(), "one".to_string());
        state.env.insert("arr_1".to_string(), "two".to_string());
        state.env.insert("ref".to_string(), "arr[@]".to_string());
        let word = WordNode {
            parts: vec![WordPart::DoubleQuoted(DoubleQuotedPart {
                parts: vec![WordPart::ParameterExpansion(ParameterExpansionPart {
                    parameter: "ref".to_string(),
                    operation: Some(ParameterOperation::Indirection(
                        crate::ast::types::IndirectionOp { inner_op: None },
                    )),
                })],
            })],
        };
        let (fs, _rt) = test_fs();
        let result = expand_word_with_glob(&fs, &mut state, &word, None);
        assert_eq!(result.split_words, Some(vec!["one".to_string(), "two".to_string()]));
    }

    #[test]
    fn test_is_word_fully_quoted_empty() {
        let word = WordNode { parts: vec![] };
        assert!(is_word_fully_quoted(&word));
    }

    #[test]
    fn test_is_word_fully_quoted_single_quoted() {
        let word = WordNode {
            parts: vec![WordPart::SingleQuoted(SingleQuotedPart {
                value: "hello".to_string(),
            })],
        };
        assert!(is_word_fully_quoted(&word));
    }

    #[test]
    fn test_is_word_fully_quoted_literal() {
        let word = make_literal_word("hello");
        assert!(!is_word_fully_quoted(&word));
    }

    #[test]
    fn test_word_has_glob_pattern() {
        let word = WordNode {
            parts: vec![WordPart::Glob(GlobPart {
                pattern: "*.txt".to_string(),
            })],
        };
        assert!(word_has_glob_pattern(&word, false));

        let word = make_literal_word("hello");
        assert!(!word_has_glob_pattern(&word, false));
    }

    #[test]
    fn test_word_has_command_substitution() {
        let word = WordNode {
            parts: vec![WordPart::CommandSubstitution(CommandSubstitutionPart {
                body: ScriptNode { statements: vec![] },
                legacy: false,
            })],
        };
        assert!(word_has_command_substitution(&word));

        let word = make_literal_word("hello");
        assert!(!word_has_command_substitution(&word));
    }
}
