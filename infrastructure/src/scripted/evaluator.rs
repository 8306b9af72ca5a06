//! Scripted evaluator — mirrors what the executor reported.

use async_trait::async_trait;
use webpilot_application::ports::evaluator::{
    Evaluation, EvaluationRequest, EvaluatorError, StepEvaluator,
};
use webpilot_domain::Confidence;

/// Deterministic [`StepEvaluator`]: a step passes when none of its tasks
/// errored, and fails with the last task error otherwise. A model-backed
/// evaluator would instead compare the before/after page states.
#[derive(Default)]
pub struct ScriptedEvaluator;

impl ScriptedEvaluator {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl StepEvaluator for ScriptedEvaluator {
    async fn evaluate(&self, request: EvaluationRequest) -> Result<Evaluation, EvaluatorError> {
        match request.task_errors.last() {
            None => Ok(Evaluation::passed(format!(
                "'{}' reflected on the page",
                request.step_description
            ))
            .with_confidence(Confidence::clamped(90))),
            Some(error) => Ok(Evaluation::failed(error.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(errors: &[&str]) -> EvaluationRequest {
        EvaluationRequest {
            goal: "Find cheap wireless headphones".to_string(),
            step_description: "Search for wireless headphones".to_string(),
            before: None,
            after: None,
            extracted_data: None,
            task_errors: errors.iter().map(|e| e.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_clean_step_passes() {
        let verdict = ScriptedEvaluator::new().evaluate(request(&[])).await.unwrap();
        assert!(verdict.passed);
        assert!(verdict.reason.contains("Search for wireless headphones"));
    }

    #[tokio::test]
    async fn test_task_errors_fail_the_step_with_the_last_error() {
        let verdict = ScriptedEvaluator::new()
            .evaluate(request(&["first miss", "element vanished"]))
            .await
            .unwrap();
        assert!(!verdict.passed);
        assert_eq!(verdict.reason, "element vanished");
    }
}
