//! Post-processing: deterministic cleanup of model answers.
//!
//! Even when told to output only the text, chat models sometimes wrap it in
//! a ` ``` ` fence, answer with `\r\n` line endings, or leave zero-width
//! spaces in the answer. Off by default: an image may genuinely show a fenced
//! block, and the answer is the result. Joiners (U+200C, U+200D) are never
//! removed since emoji sequences and several scripts depend on them.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules to a raw model answer.
///
/// Rules (applied in order):
/// 1. Strip an outer code fence (with or without a language tag)
/// 2. Normalise line endings (CRLF / CR → LF)
/// 3. Strip invisible Unicode (zero-width space, BOM, soft hyphen, word joiner)
pub fn clean_response(input: &str) -> String {
    let s = strip_outer_fence(input);
    let s = normalise_line_endings(&s);
    remove_invisible_chars(&s)
}

// ── Rule 1: Strip outer fence ────────────────────────────────────────────────

static RE_OUTER_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^```[A-Za-z0-9_-]*\r?\n(.*?)\r?\n```$").expect("valid fence regex")
});

fn strip_outer_fence(input: &str) -> String {
    match RE_OUTER_FENCE.captures(input.trim()) {
        Some(caps) => caps[1].to_string(),
        None => input.to_string(),
    }
}

// ── Rule 2: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 3: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{2060}',
        ],
        "",
    )
}
