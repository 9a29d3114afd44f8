//! Coerces near-JSON model output into a strict key/value object.
//!
//! The first parse happens right after trimming to the outer braces, so
//! output that is already valid JSON comes back untouched. If that fails the
//! remaining repair steps run in order and the result gets exactly one more
//! parse.

use serde_json::{Map, Value};
use tracing::debug;

use crate::errors::TranslationFormatError;

const EXCERPT_CHARS: usize = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairStep {
    TrimToOuterBraces,
    RebalanceBraces,
    NormalizeQuotes,
    StripTrailingCommas,
}

impl RepairStep {
    pub const CHAIN: [RepairStep; 4] = [
        RepairStep::TrimToOuterBraces,
        RepairStep::RebalanceBraces,
        RepairStep::NormalizeQuotes,
        RepairStep::StripTrailingCommas,
    ];

    pub fn apply(&self, input: &str) -> String {
        match self {
            RepairStep::TrimToOuterBraces => trim_to_outer_braces(input)
                .unwrap_or(input)
                .to_string(),
            RepairStep::RebalanceBraces => rebalance_braces(input),
            RepairStep::NormalizeQuotes => normalize_quotes(input),
            RepairStep::StripTrailingCommas => strip_trailing_commas(input),
        }
    }
}

pub fn parse_strict(raw: &str) -> Result<Map<String, Value>, TranslationFormatError> {
    let trimmed = trim_to_outer_braces(raw).ok_or_else(|| TranslationFormatError {
        reason: "no JSON object found".to_string(),
        excerpt: excerpt(raw),
    })?;

    let first_error = match parse_object(trimmed) {
        Ok(map) => return Ok(map),
        Err(e) => e,
    };
    debug!("Strict parse failed ({}), applying repairs", first_error);

    let repaired = RepairStep::CHAIN[1..]
        .iter()
        .fold(trimmed.to_string(), |acc, step| step.apply(&acc));

    parse_object(&repaired).map_err(|reason| TranslationFormatError {
        reason: format!("still invalid after repair: {}", reason),
        excerpt: excerpt(raw),
    })
}

fn parse_object(input: &str) -> Result<Map<String, Value>, String> {
    match serde_json::from_str::<Value>(input) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(format!("top level is {}, expected an object", kind_of(&other))),
        Err(e) => Err(e.to_string()),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn excerpt(raw: &str) -> String {
    raw.chars().take(EXCERPT_CHARS).collect()
}

fn trim_to_outer_braces(input: &str) -> Option<&str> {
    let start = input.find('{')?;
    let end = input.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&input[start..=end])
}

fn rebalance_braces(input: &str) -> String {
    let opening = input.matches('{').count();
    let closing = input.matches('}').count();
    if opening == closing {
        return input.to_string();
    }

    let inner: String = input.chars().filter(|c| *c != '{' && *c != '}').collect();
    format!("{{{}}}", inner.trim())
}

fn normalize_quotes(input: &str) -> String {
    let chars: Vec<char> = input
        .chars()
        .map(|c| match c {
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{201F}' => '"',
            _ => c,
        })
        .collect();

    let mut out = String::with_capacity(input.len());
    let mut in_string = false;
    let mut escaped = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            i += 1;
            continue;
        }

        if c == '"' {
            in_string = true;
        } else if c == '\'' && at_token_start(&out) {
            if let Some(end) = single_quote_end(&chars, i + 1) {
                out.push('"');
                for &inner in &chars[i + 1..end] {
                    if inner == '"' {
                        out.push_str("\\\"");
                    } else {
                        out.push(inner);
                    }
                }
                out.push('"');
                i = end + 1;
                continue;
            }
        }

        out.push(c);
        i += 1;
    }

    out
}

fn at_token_start(preceding: &str) -> bool {
    matches!(
        preceding.trim_end().chars().last(),
        Some('{') | Some(',') | Some(':') | Some('[')
    )
}

/// Closing quote is the first `'` followed by a structural character.
fn single_quote_end(chars: &[char], from: usize) -> Option<usize> {
    (from..chars.len()).find(|&j| {
        chars[j] == '\''
            && chars[j - 1] != '\\'
            && matches!(
                chars[j + 1..].iter().find(|c| !c.is_whitespace()),
                None | Some(':') | Some(',') | Some('}') | Some(']')
            )
    })
}

fn strip_trailing_commas(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut in_string = false;
    let mut escaped = false;

    for (i, &c) in chars.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            out.push(c);
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            ',' => {
                let next = chars[i + 1..].iter().find(|c| !c.is_whitespace());
                if !matches!(next, Some('}') | Some(']')) {
                    out.push(c);
                }
            }
            _ => out.push(c),
        }
    }

    out
}
