//! Call extraction: `NAME(arg, arg, ...)` records from a formula body.
//!
//! Only the outermost call at each position is recorded; a nested call stays
//! inside its parent's argument text. Re-run [`extract_calls`] on an argument
//! to reach inner calls.

use crate::types::ExtractedCall;

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// A call together with where it sits in the scanned text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedCall {
    pub call: ExtractedCall,
    /// Character offset of the function name
    pub start: usize,
    /// Character offset just past the closing `)`
    pub end: usize,
    /// Character offset of each trimmed argument
    pub arg_offsets: Vec<usize>,
}

/// Extract calls from a formula body (no leading `=`).
///
/// Commas split arguments only at depth 0 and outside quoted text. Double
/// quotes delimit strings and single quotes delimit sheet names, neither with
/// escape handling beyond `''` inside a sheet name. A call whose closing
/// parenthesis is never found is not emitted.
pub fn extract_calls(body: &str) -> Vec<ExtractedCall> {
    locate_calls(body).into_iter().map(|c| c.call).collect()
}

/// [`extract_calls`] with character offsets into `body`
pub fn locate_calls(body: &str) -> Vec<LocatedCall> {
    let chars: Vec<char> = body.chars().collect();
    let mut calls = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        // String literals outside any call are skipped whole
        if c == '"' {
            i += 1;
            while i < chars.len() && chars[i] != '"' {
                i += 1;
            }
            i += 1;
            continue;
        }

        // So are quoted sheet names, whose text may look like a call
        if c == '\'' {
            i = skip_sheet_name(&chars, i + 1);
            continue;
        }

        if !is_name_start(c) {
            i += 1;
            continue;
        }

        let start = i;
        while i < chars.len() && is_name_char(chars[i]) {
            i += 1;
        }
        if chars.get(i) != Some(&'(') {
            continue;
        }

        let name: String = chars[start..i].iter().collect();
        match scan_arguments(&chars, i + 1) {
            Some((args, arg_offsets, next)) => {
                calls.push(LocatedCall {
                    call: ExtractedCall::new(name, args),
                    start,
                    end: next,
                    arg_offsets,
                });
                i = next;
            }
            None => break,
        }
    }

    calls
}

/// Index just past the `'` closing a sheet name that opened before `k`
fn skip_sheet_name(chars: &[char], mut k: usize) -> usize {
    while k < chars.len() {
        if chars[k] == '\'' {
            if chars.get(k + 1) == Some(&'\'') {
                k += 2;
                continue;
            }
            return k + 1;
        }
        k += 1;
    }
    k
}

/// Record the trimmed argument in `chars[from..to]` and its offset
fn push_arg(
    chars: &[char],
    from: usize,
    to: usize,
    args: &mut Vec<String>,
    offsets: &mut Vec<usize>,
) {
    let segment = &chars[from..to];
    let lead = segment.iter().take_while(|c| c.is_whitespace()).count();
    let text: String = segment.iter().collect();
    args.push(text.trim().to_string());
    offsets.push(from + lead);
}

/// Scan arguments starting just after `(`. Returns the trimmed arguments,
/// their offsets and the index after the closing `)`, or `None` when the
/// input ends first.
fn scan_arguments(chars: &[char], mut k: usize) -> Option<(Vec<String>, Vec<usize>, usize)> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut in_sheet = false;
    let mut seg_start = k;
    let mut args = Vec::new();
    let mut offsets = Vec::new();

    while k < chars.len() {
        let ch = chars[k];
        if ch == '"' && !in_sheet {
            in_string = !in_string;
        } else if ch == '\'' && !in_string {
            // `''` toggles twice and stays inside the name
            in_sheet = !in_sheet;
        } else if !in_string && !in_sheet {
            match ch {
                '(' => depth += 1,
                ')' if depth == 0 => {
                    push_arg(chars, seg_start, k, &mut args, &mut offsets);
                    // FN() has no arguments, not one empty one
                    if args.len() == 1 && args[0].is_empty() {
                        args.clear();
                        offsets.clear();
                    }
                    return Some((args, offsets, k + 1));
                }
                ')' => depth -= 1,
                ',' if depth == 0 => {
                    push_arg(chars, seg_start, k, &mut args, &mut offsets);
                    seg_start = k + 1;
                }
                _ => {}
            }
        }
        k += 1;
    }

    None
}
