//! Scripted planner — strategies come from a scenario, not a model.

use super::scenario::{Scenario, ScenarioError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;
use webpilot_application::ports::planner::{
    Planner, PlannerError, PlanningRequest, ReplanRequest, Strategy,
};
use webpilot_domain::PageUrl;

/// Deterministic [`Planner`] backed by a [`Scenario`].
///
/// The initial strategy is the scenario's step list. Replan requests are
/// answered from the scripted revisions, one per call; once those run out
/// the planner proposes whatever initial steps have not been completed yet,
/// minus the step that just failed.
pub struct ScriptedPlanner {
    scenario: Scenario,
    revisions: Mutex<VecDeque<Strategy>>,
}

impl ScriptedPlanner {
    pub fn new(scenario: Scenario) -> Self {
        let revisions = VecDeque::from(scenario.revision_strategies());
        Self {
            scenario,
            revisions: Mutex::new(revisions),
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        Ok(Self::new(Scenario::load(path)?))
    }

    /// Planner for the built-in template scenario.
    pub fn for_goal(goal: &str, start_url: &PageUrl) -> Self {
        Self::new(Scenario::template(goal, start_url))
    }

    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }
}

#[async_trait]
impl Planner for ScriptedPlanner {
    async fn create_strategy(&self, _request: PlanningRequest) -> Result<Strategy, PlannerError> {
        Ok(self.scenario.initial_strategy())
    }

    async fn revise_strategy(&self, request: ReplanRequest) -> Result<Strategy, PlannerError> {
        let mut revisions = self
            .revisions
            .lock()
            .map_err(|_| PlannerError::Other("revision lock poisoned".to_string()))?;
        if let Some(strategy) = revisions.pop_front() {
            return Ok(strategy);
        }

        // Out of scripted revisions: offer the untried remainder of the
        // initial plan. An empty result tells the engine to keep its plan.
        let initial = self.scenario.initial_strategy();
        let mut remainder = Strategy::new(initial.objective);
        for step in initial.steps {
            let completed = request.completed_steps.contains(&step.description);
            let failed = request.failed_step.as_deref() == Some(step.description.as_str());
            if !completed && !failed {
                remainder = remainder.with_step(step);
            }
        }
        Ok(remainder)
    }
}
