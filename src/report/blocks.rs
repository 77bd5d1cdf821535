//! Classify analysis lines into report blocks.
//!
//! The model answers with loosely formatted Markdown that follows the
//! numbered outline of the prompt. Each line is classified on its own:
//!
//! | Line shape | Block |
//! |------------|-------|
//! | blank | [`Block::Spacer`] |
//! | `a. ` … `z. ` | [`Block::SubHeading`] |
//! | `# …` heading | [`Block::SubHeading`] |
//! | `1. Label: body` … `9. Label: body` | [`Block::LabeledItem`] |
//! | `1. text` (no colon), `10. …`, `0. …` | [`Block::Paragraph`] |
//! | `* `, `- `, `• ` | [`Block::Bullet`] |
//! | `---`, `***` rules | skipped |
//! | anything else | [`Block::Paragraph`] |
//!
//! Classification looks at the line with emphasis markers removed, so
//! `**1. Overall Summary:**` is a labelled item rather than a bullet.

use crate::pipeline::postprocess::strip_inline_markdown;
use once_cell::sync::Lazy;
use regex::Regex;

/// One renderable unit of the analysis section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// Vertical gap standing in for a blank line.
    Spacer,
    SubHeading(String),
    /// Numbered item split on its first colon: bold label, then body.
    LabeledItem { label: String, body: String },
    Bullet(String),
    Paragraph(String),
}

static RE_LETTERED: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z]\.\s").unwrap());
static RE_NUMBERED: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[1-9]\.\s").unwrap());
static RE_BULLET: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[*\-\u{2022}]\s+").unwrap());
static RE_RULE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([-*_]\s*){3,}$").unwrap());

/// Split the analysis into blocks, in order.
pub fn parse_blocks(analysis: &str) -> Vec<Block> {
    analysis.lines().filter_map(classify_line).collect()
}

fn classify_line(raw: &str) -> Option<Block> {
    let line = raw.trim();
    if line.is_empty() {
        return Some(Block::Spacer);
    }
    if RE_RULE.is_match(line) || matches!(line, "*" | "-" | "\u{2022}") {
        return None;
    }

    if let Some(m) = RE_BULLET.find(line) {
        let text = strip_inline_markdown(&line[m.end()..]);
        return (!text.is_empty()).then_some(Block::Bullet(text));
    }

    if line.starts_with('#') {
        let text = strip_inline_markdown(line);
        return (!text.is_empty()).then_some(Block::SubHeading(text));
    }

    let clean = strip_inline_markdown(line);
    if clean.is_empty() {
        return None;
    }

    if RE_LETTERED.is_match(&clean) {
        return Some(Block::SubHeading(clean));
    }

    if RE_NUMBERED.is_match(&clean) {
        if let Some((label, body)) = clean.split_once(':') {
            return Some(Block::LabeledItem {
                label: label.trim().to_string(),
                body: body.trim().to_string(),
            });
        }
        return Some(Block::Paragraph(clean));
    }

    Some(Block::Paragraph(clean))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_typical_answer() {
        let text = "\
1. **Overall Summary:** Headcount is stable at 1,204.

2. **Key KPI Analysis:**
    *   **Total Employees:** 1,204
    -   Gender ratio 52/48
a. Department split
### Notes
Engineering is the largest team.
---
";
        let blocks = parse_blocks(text);
        assert_eq!(
            blocks,
            vec![
                Block::LabeledItem {
                    label: "1. Overall Summary".into(),
                    body: "Headcount is stable at 1,204.".into(),
                },
                Block::Spacer,
                Block::LabeledItem {
                    label: "2. Key KPI Analysis".into(),
                    body: String::new(),
                },
                Block::Bullet("Total Employees: 1,204".into()),
                Block::Bullet("Gender ratio 52/48".into()),
                Block::SubHeading("a. Department split".into()),
                Block::SubHeading("Notes".into()),
                Block::Paragraph("Engineering is the largest team.".into()),
            ]
        );
    }

    #[test]
    fn bold_numbered_line_is_not_a_bullet() {
        let blocks = parse_blocks("**3. Core Insights and Trends:**");
        assert_eq!(
            blocks,
            vec![Block::LabeledItem {
                label: "3. Core Insights and Trends".into(),
                body: String::new(),
            }]
        );
    }

    #[test]
    fn numbered_without_colon_is_paragraph() {
        assert_eq!(
            parse_blocks("4. Hire two analysts"),
            vec![Block::Paragraph("4. Hire two analysts".into())]
        );
    }

    #[test]
    fn unicode_bullet_and_bare_marker() {
        assert_eq!(
            parse_blocks("\u{2022} Churn down 3%\n* "),
            vec![Block::Bullet("Churn down 3%".into())]
        );
    }

    #[test]
    fn splits_on_first_colon_only() {
        assert_eq!(
            parse_blocks("5. Meeting: starts at 10:30"),
            vec![Block::LabeledItem {
                label: "5. Meeting".into(),
                body: "starts at 10:30".into(),
            }]
        );
    }

    #[test]
    fn only_single_digit_items_get_labels() {
        assert_eq!(
            parse_blocks("10. Target: 95%\n0. Note: draft\n9. Last: done"),
            vec![
                Block::Paragraph("10. Target: 95%".into()),
                Block::Paragraph("0. Note: draft".into()),
                Block::LabeledItem {
                    label: "9. Last".into(),
                    body: "done".into(),
                },
            ]
        );
    }
}
