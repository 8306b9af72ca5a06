//! Scripted executor — task outcomes come from the scenario.

use super::scenario::Scenario;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use webpilot_application::ports::executor::{
    ExecutorError, ExecutorOutcome, TaskExecutionRequest, TaskExecutor,
};

struct ScriptedFailure {
    remaining: u32,
    error: String,
}

/// Deterministic [`TaskExecutor`].
///
/// Tasks succeed unless the scenario scripted failures for them, in which
/// case they fail `fail_times` times before succeeding. Extraction payloads
/// come straight from the scenario. Tasks the scenario does not mention
/// (synthesized ones, revision steps without task lists) succeed plainly.
///
/// Scripted behavior is keyed by task description, so descriptions within
/// one scenario should be distinct.
pub struct ScriptedExecutor {
    extracted: HashMap<String, serde_json::Value>,
    failures: Mutex<HashMap<String, ScriptedFailure>>,
}

impl ScriptedExecutor {
    pub fn new(scenario: &Scenario) -> Self {
        let mut extracted = HashMap::new();
        let mut failures = HashMap::new();

        let steps = scenario
            .steps
            .iter()
            .chain(scenario.revisions.iter().flat_map(|r| r.steps.iter()));
        for step in steps {
            for task in &step.tasks {
                if let Some(data) = &task.extracted_data {
                    extracted.insert(task.description.clone(), data.clone());
                }
                if task.fail_times > 0 {
                    failures.insert(
                        task.description.clone(),
                        ScriptedFailure {
                            remaining: task.fail_times,
                            error: task
                                .error
                                .clone()
                                .unwrap_or_else(|| "scripted failure".to_string()),
                        },
                    );
                }
            }
        }

        Self {
            extracted,
            failures: Mutex::new(failures),
        }
    }
}

#[async_trait]
impl TaskExecutor for ScriptedExecutor {
    async fn execute(
        &self,
        request: TaskExecutionRequest,
    ) -> Result<ExecutorOutcome, ExecutorError> {
        let description = &request.task.description;

        {
            let mut failures = self
                .failures
                .lock()
                .map_err(|_| ExecutorError::Other("failure lock poisoned".to_string()))?;
            if let Some(failure) = failures.get_mut(description)
                && failure.remaining > 0
            {
                failure.remaining -= 1;
                return Ok(ExecutorOutcome::failure(failure.error.clone()).with_duration(5));
            }
        }

        let outcome = match self.extracted.get(description) {
            Some(data) => ExecutorOutcome::success_with_data(data.clone()),
            None => ExecutorOutcome::success(),
        };
        Ok(outcome.with_duration(5))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use webpilot_domain::{StepId, Task, TaskIntent};

    fn request(description: &str, intent: TaskIntent) -> TaskExecutionRequest {
        TaskExecutionRequest {
            task: Task::new(StepId::generate(), intent, description),
            pristine_screenshot: None,
            highlighted_screenshot: None,
            dom_summary: String::new(),
            memory_prompt: String::new(),
            variables: HashMap::new(),
        }
    }

    fn scenario() -> Scenario {
        Scenario::from_toml_str(
            r#"
            objective = "Find cheap wireless headphones"

            [[steps]]
            description = "Search for wireless headphones"
            intent = "search"

            [[steps.tasks]]
            description = "Type the query"
            intent = "type"
            fail_times = 2
            error = "search box not ready"

            [[steps]]
            description = "Extract the first result"
            intent = "extract"

            [[steps.tasks]]
            description = "Read the price tag"
            intent = "extract"

            [steps.tasks.extracted_data]
            price = "$29.99"
        "#,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_scripted_failures_run_out_then_succeed() {
        let executor = ScriptedExecutor::new(&scenario());

        for _ in 0..2 {
            let outcome = executor
                .execute(request("Type the query", TaskIntent::Type))
                .await
                .unwrap();
            assert!(!outcome.success);
            assert_eq!(outcome.error.as_deref(), Some("search box not ready"));
        }

        let outcome = executor
            .execute(request("Type the query", TaskIntent::Type))
            .await
            .unwrap();
        assert!(outcome.success);
    }

    #[tokio::test]
    async fn test_extraction_payload_comes_from_the_scenario() {
        let executor = ScriptedExecutor::new(&scenario());
        let outcome = executor
            .execute(request("Read the price tag", TaskIntent::Extract))
            .await
            .unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.extracted_data.unwrap()["price"], "$29.99");
    }

    #[tokio::test]
    async fn test_unscripted_tasks_succeed_plainly() {
        let executor = ScriptedExecutor::new(&scenario());
        let outcome = executor
            .execute(request("Click the banner away", TaskIntent::Click))
            .await
            .unwrap();
        assert!(outcome.success);
        assert!(outcome.extracted_data.is_none());
    }
}
