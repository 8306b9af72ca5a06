//! Scenario files for scripted runs.
//!
//! A scenario is a TOML description of what the scripted planner should
//! propose and how the scripted executor should behave, so a whole run can
//! play out deterministically without a model or a real browser.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use webpilot_application::{PlannedTask, Strategy, StrategicStep};
use webpilot_domain::{Confidence, PageUrl, StrategicIntent, TaskIntent};

#[derive(Error, Debug)]
pub enum ScenarioError {
    #[error("could not read scenario file: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not parse scenario: {0}")]
    Parse(#[from] toml::de::Error),
}

/// A full scripted run: the initial strategy plus the strategies handed
/// out on successive replan requests.
///
/// # Example
///
/// ```toml
/// objective = "Find cheap wireless headphones"
///
/// [[steps]]
/// description = "Open the search page"
/// intent = "navigate"
///
/// [[steps.tasks]]
/// description = "Go to the search page"
/// intent = "navigate"
/// url = "https://shop.example.com/search"
///
/// [[steps]]
/// description = "Search for wireless headphones"
/// intent = "search"
///
/// [[steps.tasks]]
/// description = "Type the query"
/// intent = "type"
/// target = "css:#search"
/// input_value = "wireless headphones"
/// fail_times = 1
/// error = "search box not ready"
///
/// [[revisions]]
/// [[revisions.steps]]
/// description = "Search from the category page instead"
/// intent = "search"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    pub objective: String,
    pub steps: Vec<ScenarioStep>,
    /// One entry per expected replan, in order
    pub revisions: Vec<ScenarioRevision>,
}

/// A replacement strategy for one replan request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioRevision {
    /// Falls back to the scenario objective when absent
    pub objective: Option<String>,
    pub steps: Vec<ScenarioStep>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioStep {
    pub description: String,
    /// Strategic intent name; unknown names are kept as-is and resolved
    /// through the configured fallback at plan-building time
    #[serde(default)]
    pub intent: Option<String>,
    /// 0–100, clamped
    #[serde(default)]
    pub confidence: Option<u32>,
    #[serde(default)]
    pub tasks: Vec<ScenarioTask>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioTask {
    pub description: String,
    #[serde(default)]
    pub intent: Option<TaskIntent>,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub input_value: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    /// Canned extraction payload for this task
    #[serde(default)]
    pub extracted_data: Option<serde_json::Value>,
    /// How many times the scripted executor fails this task before it
    /// succeeds; drives retry and replan paths in dry runs
    #[serde(default)]
    pub fail_times: u32,
    #[serde(default)]
    pub error: Option<String>,
}

impl Scenario {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ScenarioError> {
        Ok(toml::from_str(content)?)
    }

    /// Built-in scenario used when no file is given: land, look around,
    /// extract. Works against the generic static pages.
    pub fn template(goal: &str, start_url: &PageUrl) -> Self {
        Self {
            objective: goal.to_string(),
            steps: vec![
                ScenarioStep {
                    description: format!("Open {}", start_url.hostname()),
                    intent: Some("navigate".to_string()),
                    confidence: Some(90),
                    tasks: vec![ScenarioTask {
                        description: format!("Go to {}", start_url.as_str()),
                        intent: Some(TaskIntent::Navigate),
                        target: None,
                        input_value: None,
                        url: Some(start_url.as_str().to_string()),
                        extracted_data: None,
                        fail_times: 0,
                        error: None,
                    }],
                },
                ScenarioStep {
                    description: "Survey the landing page".to_string(),
                    intent: Some("verify".to_string()),
                    confidence: Some(70),
                    tasks: vec![ScenarioTask {
                        description: "Check the visible sections".to_string(),
                        intent: Some(TaskIntent::Verify),
                        target: None,
                        input_value: None,
                        url: None,
                        extracted_data: None,
                        fail_times: 0,
                        error: None,
                    }],
                },
                ScenarioStep {
                    description: "Extract what the page offers".to_string(),
                    intent: Some("extract".to_string()),
                    confidence: Some(70),
                    tasks: vec![ScenarioTask {
                        description: "Collect the page summary".to_string(),
                        intent: Some(TaskIntent::Extract),
                        target: None,
                        input_value: None,
                        url: None,
                        extracted_data: Some(serde_json::json!({
                            "source": start_url.as_str(),
                            "goal": goal,
                        })),
                        fail_times: 0,
                        error: None,
                    }],
                },
            ],
            revisions: Vec::new(),
        }
    }

    /// The strategy handed out on the initial planning call.
    pub fn initial_strategy(&self) -> Strategy {
        let mut strategy = Strategy::new(&self.objective);
        for step in &self.steps {
            strategy = strategy.with_step(step.to_strategic_step());
        }
        strategy
    }

    /// Replacement strategies for replan calls, in scenario order.
    pub fn revision_strategies(&self) -> Vec<Strategy> {
        self.revisions
            .iter()
            .map(|revision| {
                let objective = revision.objective.as_deref().unwrap_or(&self.objective);
                let mut strategy = Strategy::new(objective);
                for step in &revision.steps {
                    strategy = strategy.with_step(step.to_strategic_step());
                }
                strategy
            })
            .collect()
    }
}

impl ScenarioStep {
    fn to_strategic_step(&self) -> StrategicStep {
        let intent = StrategicIntent::parse(self.intent.as_deref().unwrap_or("interact"));
        let mut step = StrategicStep::new(&self.description, intent);
        if let Some(confidence) = self.confidence {
            step = step.with_confidence(Confidence::clamped(confidence));
        }
        for task in &self.tasks {
            step = step.with_task(task.to_planned_task());
        }
        step
    }
}

impl ScenarioTask {
    fn to_planned_task(&self) -> PlannedTask {
        let mut task = PlannedTask::new(&self.description);
        if let Some(intent) = self.intent {
            task = task.with_intent(intent);
        }
        if let Some(target) = &self.target {
            task = task.with_target(target);
        }
        if let Some(input) = &self.input_value {
            task = task.with_input(input);
        }
        if let Some(url) = &self.url {
            task = task.with_url(url);
        }
        task
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO: &str = r#"
        objective = "Find cheap wireless headphones"

        [[steps]]
        description = "Open the search page"
        intent = "navigate"

        [[steps.tasks]]
        description = "Go to the search page"
        intent = "navigate"
        url = "https://shop.example.com/search"

        [[steps]]
        description = "Search for wireless headphones"
        intent = "search"

        [[steps.tasks]]
        description = "Type the query"
        intent = "type"
        target = "css:#search"
        input_value = "wireless headphones"
        fail_times = 1
        error = "search box not ready"

        [[revisions]]
        [[revisions.steps]]
        description = "Search from the category page instead"
        intent = "search"
    "#;

    #[test]
    fn test_scenario_parses_steps_and_revisions() {
        let scenario = Scenario::from_toml_str(SCENARIO).unwrap();
        assert_eq!(scenario.objective, "Find cheap wireless headphones");
        assert_eq!(scenario.steps.len(), 2);
        assert_eq!(scenario.steps[1].tasks[0].fail_times, 1);
        assert_eq!(scenario.revisions.len(), 1);
    }

    #[test]
    fn test_initial_strategy_keeps_order_and_intents() {
        let scenario = Scenario::from_toml_str(SCENARIO).unwrap();
        let strategy = scenario.initial_strategy();
        assert_eq!(strategy.objective, "Find cheap wireless headphones");
        assert_eq!(strategy.steps.len(), 2);
        assert_eq!(strategy.steps[0].intent, StrategicIntent::Navigate);
        assert_eq!(
            strategy.steps[1].tasks[0].intent,
            Some(TaskIntent::Type)
        );
        assert_eq!(
            strategy.steps[1].tasks[0].input_value.as_deref(),
            Some("wireless headphones")
        );
    }

    #[test]
    fn test_revision_inherits_objective() {
        let scenario = Scenario::from_toml_str(SCENARIO).unwrap();
        let revisions = scenario.revision_strategies();
        assert_eq!(revisions.len(), 1);
        assert_eq!(revisions[0].objective, "Find cheap wireless headphones");
        assert_eq!(revisions[0].steps.len(), 1);
    }

    #[test]
    fn test_unknown_intent_survives_parsing() {
        let scenario = Scenario::from_toml_str(
            r#"
            objective = "x"

            [[steps]]
            description = "Do the unusual thing"
            intent = "juggle"
        "#,
        )
        .unwrap();
        let strategy = scenario.initial_strategy();
        assert_eq!(
            strategy.steps[0].intent,
            StrategicIntent::Unknown("juggle".to_string())
        );
    }

    #[test]
    fn test_template_targets_the_start_url() {
        let url = PageUrl::parse("https://news.example.org/front").unwrap();
        let scenario = Scenario::template("Read the front page", &url);
        assert_eq!(scenario.steps.len(), 3);
        assert!(scenario.steps[0].description.contains("news.example.org"));
        assert_eq!(
            scenario.steps[0].tasks[0].url.as_deref(),
            Some("https://news.example.org/front")
        );
        assert!(scenario.revisions.is_empty());
    }

    #[test]
    fn test_extracted_data_round_trips_from_toml() {
        let scenario = Scenario::from_toml_str(
            r#"
            objective = "x"

            [[steps]]
            description = "Extract the price"
            intent = "extract"

            [[steps.tasks]]
            description = "Read the price tag"
            intent = "extract"

            [steps.tasks.extracted_data]
            price = "$29.99"
        "#,
        )
        .unwrap();
        let data = scenario.steps[0].tasks[0].extracted_data.as_ref().unwrap();
        assert_eq!(data["price"], "$29.99");
    }
}
