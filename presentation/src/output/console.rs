//! Console output formatter for workflow results

use colored::{ColoredString, Colorize};
use serde_json::Value;
use webpilot_application::{RunStatus, WorkflowResult};

/// Formats workflow results for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Format the complete workflow result
    pub fn format(result: &WorkflowResult) -> String {
        let mut output = String::new();

        // Header
        output.push_str(&Self::header("Workflow Result"));
        output.push('\n');

        // Goal and grade
        output.push_str(&format!("{} {}\n", "Goal:".cyan().bold(), result.goal));
        output.push_str(&format!(
            "{} {} ({}% complete)\n",
            "Status:".cyan().bold(),
            Self::colored_status(result.status),
            result.completion_percentage
        ));

        // Per-step outcomes
        output.push_str(&Self::section_header("Steps"));
        for step in &result.steps {
            let mark = if step.succeeded {
                "✓".green()
            } else {
                "✗".red()
            };
            output.push_str(&format!(
                "  {} {}. {}\n",
                mark, step.order, step.description
            ));
            if let Some(error) = &step.error {
                output.push_str(&format!("       {}\n", error.red()));
            }
        }

        // Extracted data (if any)
        if Self::has_data(&result.extracted_data) {
            output.push_str(&Self::section_header("Extracted Data"));
            let pretty = serde_json::to_string_pretty(&result.extracted_data)
                .unwrap_or_else(|_| result.extracted_data.to_string());
            output.push_str(&Self::indent(&pretty, "  "));
            output.push('\n');
        }

        // Terminal errors (if any)
        if !result.errors.is_empty() {
            output.push_str(&Self::section_header("Errors"));
            for error in &result.errors {
                output.push_str(&format!("  * {}\n", error.yellow()));
            }
        }

        // Run statistics
        output.push_str(&Self::section_header("Run"));
        output.push_str(&format!("  Replans: {}\n", result.replans));
        output.push_str(&format!("  Duration: {}ms\n", result.duration_ms));
        if result.early_exit {
            output.push_str("  Stopped early at the completion floor\n");
        }

        // Narrative (if a summarizer was configured)
        if let Some(summary) = &result.summary {
            output.push_str(&Self::section_header("Summary"));
            output.push_str(&Self::indent(summary, "  "));
            output.push('\n');
        }

        output.push_str(&Self::footer());

        output
    }

    /// Format as JSON
    pub fn format_json(result: &WorkflowResult) -> String {
        serde_json::to_string_pretty(result).unwrap_or_else(|_| "{}".to_string())
    }

    /// Format status and summary only (concise output)
    pub fn format_brief(result: &WorkflowResult) -> String {
        let mut output = String::new();

        output.push_str(&format!("{} {}\n", "Goal:".bold(), result.goal));

        let done = result.steps.iter().filter(|step| step.succeeded).count();
        output.push_str(&format!(
            "{} {} ({}% complete, {}/{} steps, {} replans, {}ms)\n",
            "Status:".bold(),
            Self::colored_status(result.status),
            result.completion_percentage,
            done,
            result.steps.len(),
            result.replans,
            result.duration_ms
        ));

        if let Some(summary) = &result.summary {
            output.push('\n');
            output.push_str(summary);
            output.push('\n');
        }

        output
    }

    fn colored_status(status: RunStatus) -> ColoredString {
        match status {
            RunStatus::Success => "success".green().bold(),
            RunStatus::Partial => "partial".yellow().bold(),
            RunStatus::Degraded => "degraded".yellow(),
            RunStatus::Failure => "failure".red().bold(),
        }
    }

    fn has_data(data: &Value) -> bool {
        match data {
            Value::Null => false,
            Value::Object(map) => !map.is_empty(),
            _ => true,
        }
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    fn footer() -> String {
        format!("\n{}\n", "=".repeat(60).cyan())
    }

    /// Indent a multi-line string
    pub fn indent(text: &str, prefix: &str) -> String {
        text.lines()
            .map(|line| format!("{}{}", prefix, line))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use webpilot_application::StepSummary;
    use webpilot_domain::WorkflowId;

    fn sample_result() -> WorkflowResult {
        WorkflowResult {
            workflow_id: WorkflowId::generate(),
            goal: "Find the pricing page".to_string(),
            status: RunStatus::Partial,
            completion_percentage: 50,
            extracted_data: json!({"price": "$12/mo"}),
            errors: vec!["step 2 exhausted its retries".to_string()],
            steps: vec![
                StepSummary {
                    order: 1,
                    description: "Open the landing page".to_string(),
                    succeeded: true,
                    error: None,
                },
                StepSummary {
                    order: 2,
                    description: "Click the pricing link".to_string(),
                    succeeded: false,
                    error: Some("element not found: a.pricing".to_string()),
                },
            ],
            replans: 1,
            duration_ms: 4821,
            early_exit: false,
            summary: Some("Got halfway there.".to_string()),
        }
    }

    #[test]
    fn test_format_lists_each_step() {
        let output = ConsoleFormatter::format(&sample_result());

        assert!(output.contains("Workflow Result"));
        assert!(output.contains("Find the pricing page"));
        assert!(output.contains("Open the landing page"));
        assert!(output.contains("Click the pricing link"));
        assert!(output.contains("element not found: a.pricing"));
        assert!(output.contains("$12/mo"));
        assert!(output.contains("Replans: 1"));
        assert!(output.contains("Got halfway there."));
    }

    #[test]
    fn test_format_json_is_parseable() {
        let output = ConsoleFormatter::format_json(&sample_result());

        let value: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["status"], "partial");
        assert_eq!(value["completion_percentage"], 50);
        assert_eq!(value["steps"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_brief_counts_steps() {
        let output = ConsoleFormatter::format_brief(&sample_result());

        assert!(output.contains("1/2 steps"));
        assert!(output.contains("50% complete"));
        assert!(output.contains("Got halfway there."));
        assert!(!output.contains("element not found"));
    }

    #[test]
    fn test_empty_object_hides_data_section() {
        let mut result = sample_result();
        result.extracted_data = json!({});

        let output = ConsoleFormatter::format(&result);
        assert!(!output.contains("Extracted Data"));
    }
}
