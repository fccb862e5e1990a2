//! Deterministic cleanup of free-form model replies.
//!
//! Models are asked for bare JSON or bare text, and mostly comply. The
//! exceptions are predictable: a sentence of prose around the JSON object,
//! a ` ```json ` fence, CRLF line endings, a stray zero-width space. Each
//! helper here fixes one such quirk and is a pure `&str → String` function.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_JSON_OBJECT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\{.*\}").unwrap());

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[A-Za-z]*\n(.*)\n```\s*$").unwrap());

/// The span from the first `{` to the last `}` in `reply`, if any.
///
/// Greedy on purpose: nested objects and trailing prose both work, and a
/// reply holding two objects yields invalid JSON rather than half an answer.
pub fn extract_json_object(reply: &str) -> Option<&str> {
    RE_JSON_OBJECT.find(reply).map(|m| m.as_str())
}

/// Remove markdown code fences from a text reply.
///
/// An outer fence (with or without a language tag) is unwrapped first; any
/// remaining triple backticks are then deleted outright.
pub fn strip_code_fences(input: &str) -> String {
    let trimmed = input.trim();
    let unwrapped = match RE_OUTER_FENCES.captures(trimmed) {
        Some(caps) => caps[1].to_string(),
        None => trimmed.to_string(),
    };
    unwrapped.replace("```", "")
}

pub fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

/// Strip zero-width and formatting characters that render as nothing on a
/// slide but break string equality.
pub fn remove_invisible_chars(input: &str) -> String {
    input
        .chars()
        .filter(|c| {
            !matches!(
                c,
                '\u{200B}' | '\u{FEFF}' | '\u{00AD}' | '\u{200C}' | '\u{200D}' | '\u{2060}'
            )
        })
        .collect()
}

/// Full cleanup for a plain-text reply: fences, line endings, invisibles,
/// and trailing whitespace on every line.
pub fn clean_text_reply(reply: &str) -> String {
    let s = normalise_line_endings(reply);
    let s = strip_code_fences(&s);
    let s = remove_invisible_chars(&s);
    s.lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_inside_prose() {
        let reply = "Sure! Here it is:\n{\"lyrics\": [{\"text\": \"a\"}]}\nHope that helps.";
        assert_eq!(
            extract_json_object(reply),
            Some("{\"lyrics\": [{\"text\": \"a\"}]}")
        );
    }

    #[test]
    fn json_inside_fence() {
        let reply = "```json\n{\"song_type\": \"strophic\"}\n```";
        assert_eq!(extract_json_object(reply), Some("{\"song_type\": \"strophic\"}"));
    }

    #[test]
    fn no_json() {
        assert_eq!(extract_json_object("I cannot read this page."), None);
        assert_eq!(extract_json_object(""), None);
    }

    #[test]
    fn strip_outer_fence_with_tag() {
        assert_eq!(strip_code_fences("```text\nline one\nline two\n```"), "line one\nline two");
    }

    #[test]
    fn strip_stray_backticks() {
        assert_eq!(strip_code_fences("line one```\nline two"), "line one\nline two");
    }

    #[test]
    fn no_fence_passthrough() {
        assert_eq!(strip_code_fences("  plain  "), "plain");
    }

    #[test]
    fn line_endings() {
        assert_eq!(normalise_line_endings("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn invisible_chars() {
        assert_eq!(remove_invisible_chars("Ich\u{200B} grol\u{00AD}le\u{FEFF}"), "Ich grolle");
    }

    #[test]
    fn text_reply_cleanup() {
        let reply = "```\r\nIch grolle nicht,   \r\nund wenn das Herz auch bricht\r\n```\r\n";
        assert_eq!(
            clean_text_reply(reply),
            "Ich grolle nicht,\nund wenn das Herz auch bricht"
        );
    }
}
