//! Prompt-grammar matching, kept free of process I/O so it stays unit
//! testable. A candidate turn ends with one or more repetitions of the
//! fixed prompt `[<time>] (<status>) >`; only the first repetition is
//! authoritative.

use lazy_regex::regex;

use super::{Error, Result};

/// Byte range of the first complete prompt in `buf`, if any. A prompt that
/// has not fully arrived yet (for example missing the trailing `>`) does
/// not match, so callers can keep accumulating bytes.
pub fn find_prompt(buf: &str) -> Option<(usize, usize)> {
    regex!(r"\[[^\]\n]*\][ \t]*\([^)\n]*\)[ \t]*>")
        .find(buf)
        .map(|m| (m.start(), m.end()))
}

/// Extracts the parenthesized status token from a matched prompt line.
/// The token `ok` (case-insensitively) means the candidate reported
/// success; any other token means failure.
pub fn status_is_ok(prompt_line: &str) -> Result<bool> {
    let caps = regex!(r"\(([^)]+)\)")
        .captures(prompt_line)
        .ok_or_else(|| Error::MalformedPrompt {
            line: prompt_line.to_owned(),
        })?;
    let token = caps.get(1).map(|m| m.as_str().trim()).unwrap_or("");
    Ok(token.eq_ignore_ascii_case("ok"))
}
