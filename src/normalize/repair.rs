//! Best-effort textual repair of almost-JSON model output.
//!
//! Everything here is string surgery; nothing is parsed. The only entry
//! point the rest of the normalizer uses is [`repair`], so the heuristics
//! can be replaced by a tolerant parser without touching the callers.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static ADJACENT_OBJECTS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\}(\s*)\{").unwrap());
static TRAILING_COMMA: Lazy<Regex> = Lazy::new(|| Regex::new(r",(\s*[\]}])").unwrap());

/// Apply every repair step, in order, and return the candidate text.
///
/// 1. slice from the first `{` to the last `}`
/// 2. insert the missing comma in `}{` / `} {`
/// 3. strip trailing commas before `]` or `}`
/// 4. drop repeated keys within each object, keeping the first
/// 5. strip trailing commas left behind by dropped members
pub fn repair(text: &str) -> String {
    let sliced = slice_outer_object(text);
    let separated = insert_missing_commas(sliced);
    let stripped = strip_trailing_commas(&separated);
    let deduped = dedupe_keys(&stripped);
    strip_trailing_commas(&deduped)
}

/// The span from the first `{` to the last `}`, or the whole text if there
/// is no such span.
pub fn slice_outer_object(text: &str) -> &str {
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if end > start => &text[start..=end],
        _ => text,
    }
}

/// Insert the comma missing between two adjacent objects (`}{`, `} {`).
///
/// String literals are copied through untouched.
pub fn insert_missing_commas(text: &str) -> String {
    map_outside_strings(text, |segment| {
        ADJACENT_OBJECTS.replace_all(segment, "},${1}{").into_owned()
    })
}

/// Drop a comma that directly precedes `]` or `}`.
///
/// String literals are copied through untouched.
pub fn strip_trailing_commas(text: &str) -> String {
    map_outside_strings(text, |segment| {
        TRAILING_COMMA.replace_all(segment, "${1}").into_owned()
    })
}

/// Apply `f` to every stretch of `text` that lies outside a string literal.
///
/// Structural tokens never straddle a literal, so each regex match falls
/// entirely within one stretch.
fn map_outside_strings(text: &str, f: impl Fn(&str) -> String) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('"') {
        out.push_str(&f(&rest[..start]));
        let end = literal_end(rest, start);
        out.push_str(&rest[start..end]);
        rest = &rest[end..];
    }
    out.push_str(&f(rest));
    out
}

/// Byte index just past the string literal opening at `start`, or the end
/// of `text` if it never closes.
fn literal_end(text: &str, start: usize) -> usize {
    let bytes = text.as_bytes();
    let mut j = start + 1;
    while j < bytes.len() {
        match bytes[j] {
            b'\\' => j += 2,
            b'"' => return j + 1,
            _ => j += 1,
        }
    }
    text.len()
}

enum Frame {
    Object {
        keys: HashSet<String>,
        expecting_key: bool,
    },
    Array,
}

/// Remove repeated keys, keeping the first occurrence within each object.
///
/// Keys are scoped to their enclosing object, so the same key in two
/// sibling or nested objects is left alone. Malformed input is passed
/// through unchanged as far as the scanner can make sense of it.
pub fn dedupe_keys(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut stack: Vec<Frame> = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '"' => {
                let end = string_end(&chars, i);
                let literal: String = chars[i..end].iter().collect();
                if let Some(Frame::Object {
                    keys,
                    expecting_key,
                }) = stack.last_mut()
                {
                    if *expecting_key {
                        *expecting_key = false;
                        if !keys.insert(literal.clone()) {
                            let stop = member_end(&chars, end);
                            if chars.get(stop) == Some(&',') {
                                *expecting_key = true;
                                i = stop + 1;
                            } else {
                                drop_trailing_comma(&mut out);
                                i = stop;
                            }
                            continue;
                        }
                    }
                }
                out.push_str(&literal);
                i = end;
                continue;
            }
            '{' => stack.push(Frame::Object {
                keys: HashSet::new(),
                expecting_key: true,
            }),
            '[' => stack.push(Frame::Array),
            '}' | ']' => {
                stack.pop();
            }
            ',' => {
                if let Some(Frame::Object { expecting_key, .. }) = stack.last_mut() {
                    *expecting_key = true;
                }
            }
            _ => {}
        }
        out.push(c);
        i += 1;
    }
    out
}

/// Index just past the string literal opening at `start`.
fn string_end(chars: &[char], start: usize) -> usize {
    let mut j = start + 1;
    while j < chars.len() {
        match chars[j] {
            '\\' => j += 2,
            '"' => return j + 1,
            _ => j += 1,
        }
    }
    chars.len()
}

/// Index of the `,` or closing bracket that ends the member value starting
/// at `from`, or the end of input.
fn member_end(chars: &[char], from: usize) -> usize {
    let mut depth = 0usize;
    let mut j = from;
    while j < chars.len() {
        match chars[j] {
            '"' => {
                j = string_end(chars, j);
                continue;
            }
            '{' | '[' => depth += 1,
            '}' | ']' => {
                if depth == 0 {
                    return j;
                }
                depth -= 1;
            }
            ',' if depth == 0 => return j,
            _ => {}
        }
        j += 1;
    }
    chars.len()
}

fn drop_trailing_comma(out: &mut String) {
    let kept = out.trim_end().len();
    if out[..kept].ends_with(',') {
        out.truncate(kept - 1);
    }
}
