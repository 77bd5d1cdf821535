//! Post-processing: deterministic cleanup of the model's analysis text.
//!
//! Vision models wrap answers in ```` ```markdown ```` fences, emit CRLF,
//! leave trailing blanks and the occasional zero-width character. The rules
//! below remove those artefacts without touching content; the result is what
//! the UI displays and what the report writer parses.
//!
//! [`strip_inline_markdown`] is the separate, lossy pass used by the report
//! writer, which has no way to render emphasis markers.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules to the raw model output.
///
/// Rules (applied in order):
/// 1. Strip outer markdown fences
/// 2. Normalise line endings (CRLF → LF)
/// 3. Trim trailing whitespace per line
/// 4. Collapse 3+ consecutive blank lines down to 2
/// 5. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens, etc.)
/// 6. Ensure the text ends with exactly one newline
pub fn clean_analysis(input: &str) -> String {
    let s = strip_markdown_fences(input);
    let s = normalise_line_endings(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    let s = remove_invisible_chars(&s);
    ensure_final_newline(&s)
}

// ── Rule 1: Strip outer markdown fences ──────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:markdown|md)?\r?\n(.*)\r?\n```\s*$").unwrap());

fn strip_markdown_fences(input: &str) -> String {
    if let Some(caps) = RE_OUTER_FENCES.captures(input.trim()) {
        caps[1].to_string()
    } else {
        input.to_string()
    }
}

// ── Rule 2: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 3: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 4: Collapse excessive blank lines ───────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{4,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n\n").to_string()
}

// ── Rule 5: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 6: Ensure text ends with single newline ─────────────────────────────

fn ensure_final_newline(input: &str) -> String {
    let trimmed = input.trim_end();
    if trimmed.is_empty() {
        String::from("\n")
    } else {
        format!("{}\n", trimmed)
    }
}

// ── Inline markdown removal (report only) ────────────────────────────────────

static RE_BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.*?)\*\*").unwrap());
static RE_BOLD_UNDERSCORE: Lazy<Regex> = Lazy::new(|| Regex::new(r"__(.+?)__").unwrap());
static RE_ITALIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*(.*?)\*").unwrap());
static RE_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`([^`]*)`").unwrap());
static RE_HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^#+\s*").unwrap());

/// Drop emphasis markers, inline code ticks and leading `#` heading markers.
pub fn strip_inline_markdown(text: &str) -> String {
    let s = RE_BOLD.replace_all(text, "$1");
    let s = RE_BOLD_UNDERSCORE.replace_all(&s, "$1");
    let s = RE_ITALIC.replace_all(&s, "$1");
    let s = RE_CODE.replace_all(&s, "$1");
    let s = RE_HEADING.replace_all(&s, "");
    s.trim().to_string()
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_fences() {
        let input = "```markdown\n1. Overall Summary\nFine\n```";
        assert_eq!(strip_markdown_fences(input), "1. Overall Summary\nFine");
    }

    #[test]
    fn test_no_fences_passthrough() {
        let input = "1. Overall Summary";
        assert_eq!(strip_markdown_fences(input), input);
    }

    #[test]
    fn test_normalise_line_endings() {
        assert_eq!(normalise_line_endings("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn test_collapse_blank_lines() {
        assert_eq!(collapse_blank_lines("a\n\n\n\n\n\nb"), "a\n\n\nb");
    }

    #[test]
    fn test_remove_invisible() {
        let input = "head\u{200B}count\u{FEFF}";
        assert_eq!(remove_invisible_chars(input), "headcount");
    }

    #[test]
    fn test_ensure_final_newline() {
        assert_eq!(ensure_final_newline("x"), "x\n");
        assert_eq!(ensure_final_newline("x\n\n\n"), "x\n");
        assert_eq!(ensure_final_newline(""), "\n");
    }

    #[test]
    fn test_clean_analysis_full_pipeline() {
        let input = "```\r\n1. **Overall Summary:** ok   \r\n\r\n\r\n\r\n\r\n2. Next\r\n```";
        let out = clean_analysis(input);
        assert!(out.starts_with("1. **Overall Summary:** ok\n"));
        assert!(!out.contains("\n\n\n\n"));
        assert!(out.ends_with("2. Next\n"));
    }

    #[test]
    fn test_strip_inline_markdown() {
        assert_eq!(
            strip_inline_markdown("1. **Overall Summary:** the *headcount* is `1,204`"),
            "1. Overall Summary: the headcount is 1,204"
        );
        assert_eq!(strip_inline_markdown("### Key KPI Analysis"), "Key KPI Analysis");
        assert_eq!(strip_inline_markdown("__Gender ratio__"), "Gender ratio");
    }
}
