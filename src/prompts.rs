//! Prompts for VLM-based dashboard analysis.
//!
//! The default template asks for four fixed sections. The report writer in
//! [`crate::report::blocks`] relies on the model echoing that numbered
//! structure, so edits here should keep the `1.`–`4.` outline.
//!
//! Callers can override the template via
//! [`crate::config::AnalysisConfig::prompt_template`].

/// Placeholder replaced with the user's objective.
pub const OBJECTIVE_PLACEHOLDER: &str = "{objective}";

/// Default analysis instruction sent alongside the dashboard image.
pub const DEFAULT_ANALYSIS_PROMPT: &str = r#"As an expert data analyst, your task is to generate a concise summary of the provided KPI dashboard. The primary business objective for this dashboard is:
"{objective}"

Based on the dashboard image and the stated objective, provide a summary that includes the following sections:

1.  **Overall Summary:** A brief, high-level overview of the dashboard's current status in relation to the business objective.
2.  **Key KPI Analysis:**
    *   Identify the main KPIs presented (e.g., total employees, distribution by department, gender ratio).
    *   For each KPI, describe its current value and explain its significance in the context of the objective.
    *   Highlight any notable trends or comparisons shown in the visualizations.
3.  **Core Insights and Trends:**
    *   What are the most critical insights that can be drawn from the data?
    *   Are there any significant patterns, anomalies, or correlations that stand out? (e.g., one department being significantly larger than others).
4.  **Strategic Recommendations:**
    *   Based on your analysis, provide 1-2 actionable recommendations that would help the business achieve the goals stated in the objective.

Please ensure your summary is clear, data-driven, and directly tied to the provided objective to facilitate informed decision-making."#;

/// Placeholder text for the objective box in the web UI.
pub const OBJECTIVE_HINT: &str = "e.g., To monitor and analyze the company's employee distribution and headcount across different departments and locations to support strategic workforce planning and talent management.";

/// A sample objective offered in the UI.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct ExampleObjective {
    pub label: &'static str,
    pub text: &'static str,
}

/// Example objectives shown next to the objective box.
pub const EXAMPLE_OBJECTIVES: &[ExampleObjective] = &[
    ExampleObjective {
        label: "HR Dashboard",
        text: "To monitor employee distribution and performance metrics to support workforce planning and talent management.",
    },
    ExampleObjective {
        label: "Sales Dashboard",
        text: "To track revenue performance, customer acquisition, and sales team productivity to drive business growth.",
    },
    ExampleObjective {
        label: "Financial Dashboard",
        text: "To monitor key financial metrics including revenue, expenses, and profitability to ensure fiscal health.",
    },
];

/// Fill the template with the objective.
///
/// The objective is inserted verbatim: no trimming, no escaping.
pub fn build_instruction(template: &str, objective: &str) -> String {
    template.replace(OBJECTIVE_PLACEHOLDER, objective)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_prompt_has_placeholder_once() {
        assert_eq!(DEFAULT_ANALYSIS_PROMPT.matches(OBJECTIVE_PLACEHOLDER).count(), 1);
    }

    #[test]
    fn objective_inserted_verbatim() {
        let objective = "  Grow ARR by 20% \"this year\"  ";
        let out = build_instruction(DEFAULT_ANALYSIS_PROMPT, objective);
        assert!(out.contains(&format!("\"{}\"", objective)));
        assert!(!out.contains(OBJECTIVE_PLACEHOLDER));
    }

    #[test]
    fn default_prompt_lists_four_sections() {
        for section in [
            "Overall Summary",
            "Key KPI Analysis",
            "Core Insights and Trends",
            "Strategic Recommendations",
        ] {
            assert!(DEFAULT_ANALYSIS_PROMPT.contains(section), "missing {section}");
        }
    }

    #[test]
    fn recommendations_are_not_tied_to_hr() {
        assert!(DEFAULT_ANALYSIS_PROMPT.contains("achieve the goals stated in the objective"));
        assert!(!DEFAULT_ANALYSIS_PROMPT.contains("talent management goals"));
    }
}
