//! Argument repair (§4.5): a provider's tool-call `arguments` string may be
//! a valid JSON object, several concatenated with no separator, or a
//! language-literal dict. Also handles the parallel problem of a tool
//! *name* that concatenates several known names.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

use crate::constants::TOOL_NAMES;

fn brace_gap_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\}\s*\{").unwrap())
}

fn unquoted_key_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"([{,]\s*)([A-Za-z_][A-Za-z0-9_]*)\s*:"#).unwrap())
}

/// Runs the repair cascade, always returning a list of argument objects
/// (possibly length 1, possibly empty if every fragment was unparseable).
pub fn repair_arguments(raw: &str) -> Vec<Value> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return vec![Value::Object(Default::default())];
    }

    // 1. direct JSON parse.
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return vec![value];
    }

    // 2. regex-repair `}{` -> `},{` and wrap in `[..]`.
    let joined = brace_gap_re().replace_all(trimmed, "},{");
    let wrapped = format!("[{joined}]");
    if let Ok(Value::Array(array)) = serde_json::from_str::<Value>(&wrapped) {
        if !array.is_empty() {
            return array;
        }
    }

    // 3. language-literal eval (Python-dict-like source).
    if let Some(value) = parse_literal_dict(trimmed) {
        return vec![value];
    }

    // 4. brace-matched manual split into individual objects.
    let fragments = split_balanced_braces(trimmed);
    if !fragments.is_empty() {
        return fragments
            .iter()
            .filter_map(|fragment| serde_json::from_str::<Value>(fragment).ok().or_else(|| parse_literal_dict(fragment)))
            .collect();
    }

    Vec::new()
}

/// Best-effort conversion of a Python-style dict literal (single-quoted
/// strings, unquoted keys, `True`/`False`/`None`) into parseable JSON.
fn parse_literal_dict(s: &str) -> Option<Value> {
    let quoted_keys = unquoted_key_re().replace_all(s, "$1\"$2\":");
    let normalized = quoted_keys.replace('\'', "\"").replace("True", "true").replace("False", "false").replace("None", "null");
    serde_json::from_str(&normalized).ok()
}

/// Splits `s` into top-level `{...}` fragments, respecting string literals
/// so braces inside strings don't throw off depth tracking.
fn split_balanced_braces(s: &str) -> Vec<String> {
    let mut out = Vec::new();
    let chars: Vec<char> = s.chars().collect();
    let mut depth = 0i32;
    let mut start = None;
    let mut in_string = false;
    let mut escape = false;

    for (i, &c) in chars.iter().enumerate() {
        if in_string {
            if escape {
                escape = false;
            } else if c == '\\' {
                escape = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' => {
                depth -= 1;
                if depth == 0 {
                    if let Some(s0) = start.take() {
                        out.push(chars[s0..=i].iter().collect());
                    }
                }
            }
            _ => {}
        }
    }

    out
}

/// Greedy longest-match split of a concatenated tool name into `count`
/// known tool names. Falls back to repeating the original name `count`
/// times if the split doesn't cleanly consume the whole string into
/// exactly `count` known names.
pub fn split_tool_names(raw_name: &str, count: usize) -> Vec<String> {
    if count <= 1 || TOOL_NAMES.contains(&raw_name) {
        return vec![raw_name.to_string(); count.max(1)];
    }

    let mut known: Vec<&str> = TOOL_NAMES.to_vec();
    known.sort_by_key(|n| std::cmp::Reverse(n.len()));

    let mut names = Vec::new();
    let mut remaining = raw_name;
    while !remaining.is_empty() {
        match known.iter().find(|n| remaining.starts_with(**n)) {
            Some(matched) => {
                names.push((*matched).to_string());
                remaining = &remaining[matched.len()..];
            }
            None => break,
        }
    }

    if remaining.is_empty() && names.len() == count {
        names
    } else {
        vec![raw_name.to_string(); count]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn direct_parse() {
        let result = repair_arguments(r#"{"script":"ls"}"#);
        assert_eq!(result, vec![json!({"script":"ls"})]);
    }

    #[test]
    fn concatenated_objects_no_separator() {
        let result = repair_arguments(r#"{"a":1}{"b":2}"#);
        assert_eq!(result, vec![json!({"a":1}), json!({"b":2})]);
    }

    #[test]
    fn python_literal_dict() {
        let result = repair_arguments("{'script': 'ls'}");
        assert_eq!(result, vec![json!({"script":"ls"})]);
    }

    #[test]
    fn unquoted_keys() {
        let result = repair_arguments("{script: 'ls'}");
        assert_eq!(result, vec![json!({"script":"ls"})]);
    }

    #[test]
    fn bash_bash_name_splits_to_two_bash() {
        let names = split_tool_names("bashbash", 2);
        assert_eq!(names, vec!["bash", "bash"]);
    }

    #[test]
    fn unsplittable_name_repeats_original() {
        let names = split_tool_names("totally_unknown_name", 2);
        assert_eq!(names, vec!["totally_unknown_name", "totally_unknown_name"]);
    }

    #[test]
    fn single_known_name_passes_through() {
        assert_eq!(split_tool_names("bash", 1), vec!["bash"]);
    }

    #[test]
    fn echo_one_echo_two_repair_scenario() {
        let result = repair_arguments(r#"{"script":"echo 1"}{"script":"echo 2"}"#);
        assert_eq!(result.len(), 2);
        assert_eq!(result[0]["script"], "echo 1");
        assert_eq!(result[1]["script"], "echo 2");
    }
}
