//! Workflow aggregate: consistency boundary around a workflow, its current
//! plan, and the bookkeeping that survives replans.

use super::entities::{Plan, Step, StepStatus, Workflow};
use super::value_objects::StepId;
use crate::core::error::DomainError;
use crate::event::{DomainEvent, DomainEventKind};
use serde_json::json;

/// Owns the workflow entity and its evolving plan.
///
/// Replanning replaces the plan wholesale; completed steps from replaced
/// plans are carried forward so completion percentages and continuation
/// prompts account for work already done. Events from replaced plans are
/// stashed so the final drain still yields every event exactly once.
#[derive(Debug)]
pub struct WorkflowAggregate {
    workflow: Workflow,
    plan: Option<Plan>,
    /// Descriptions of steps completed in plans that were since replaced
    carried_completed: Vec<String>,
    /// Events drained out of replaced plans, waiting for the final drain
    stashed_events: Vec<DomainEvent>,
    replan_count: u32,
}

impl WorkflowAggregate {
    pub fn new(workflow: Workflow) -> Self {
        Self {
            workflow,
            plan: None,
            carried_completed: Vec::new(),
            stashed_events: Vec::new(),
            replan_count: 0,
        }
    }

    pub fn workflow(&self) -> &Workflow {
        &self.workflow
    }

    pub fn workflow_mut(&mut self) -> &mut Workflow {
        &mut self.workflow
    }

    pub fn plan(&self) -> Option<&Plan> {
        self.plan.as_ref()
    }

    pub fn plan_mut(&mut self) -> Option<&mut Plan> {
        self.plan.as_mut()
    }

    pub fn replan_count(&self) -> u32 {
        self.replan_count
    }

    /// Completed-step descriptions carried over from replaced plans, in
    /// completion order.
    pub fn carried_completed(&self) -> &[String] {
        &self.carried_completed
    }

    /// Installs the initial plan. Rejects invalid plans.
    pub fn set_plan(&mut self, plan: Plan) -> Result<(), DomainError> {
        plan.validate()?;
        self.workflow.record_plan_event(
            DomainEventKind::PlanCreated,
            json!({
                "plan_id": plan.id.as_str(),
                "revision": plan.revision,
                "steps": plan.steps.len(),
            }),
        );
        self.plan = Some(plan);
        Ok(())
    }

    /// Swaps in a revised plan, carrying forward completed work.
    pub fn replace_plan(&mut self, mut new_plan: Plan) -> Result<(), DomainError> {
        new_plan.validate()?;
        if let Some(mut old) = self.plan.take() {
            for step in &mut old.steps {
                if step.status == StepStatus::Completed {
                    self.carried_completed.push(step.description.clone());
                }
                self.stashed_events.extend(step.take_events());
                for task in &mut step.tasks {
                    self.stashed_events.extend(task.take_events());
                }
            }
            new_plan.revision = old.revision + 1;
        }
        self.replan_count += 1;
        self.workflow.record_plan_event(
            DomainEventKind::PlanReplaced,
            json!({
                "plan_id": new_plan.id.as_str(),
                "revision": new_plan.revision,
                "carried_completed": self.carried_completed.len(),
            }),
        );
        self.plan = Some(new_plan);
        Ok(())
    }

    /// Starts the next pending step and returns its id.
    ///
    /// Enforces the aggregate invariants: the workflow must be running and a
    /// valid plan must be installed. Returns `Ok(None)` when every step has
    /// reached a terminal status.
    pub fn begin_next_step(&mut self) -> Result<Option<StepId>, DomainError> {
        if !self.workflow.is_running() {
            return Err(DomainError::WorkflowNotRunning);
        }
        let plan = self.plan.as_mut().ok_or(DomainError::EmptyPlan)?;
        let next_id = match plan.next_pending_step() {
            Some(step) => step.id.clone(),
            None => return Ok(None),
        };
        let step = plan
            .step_mut(&next_id)
            .ok_or_else(|| DomainError::StepNotFound(next_id.to_string()))?;
        step.start()?;
        Ok(Some(next_id))
    }

    pub fn step_mut(&mut self, id: &StepId) -> Result<&mut Step, DomainError> {
        self.plan
            .as_mut()
            .ok_or(DomainError::EmptyPlan)?
            .step_mut(id)
            .ok_or_else(|| DomainError::StepNotFound(id.to_string()))
    }

    /// Descriptions of every successfully completed step, including those
    /// from replaced plans. Feeds the do-not-repeat section of replan prompts.
    pub fn completed_step_descriptions(&self) -> Vec<String> {
        let mut out = self.carried_completed.clone();
        if let Some(plan) = &self.plan {
            out.extend(
                plan.steps
                    .iter()
                    .filter(|s| s.status == StepStatus::Completed)
                    .map(|s| s.description.clone()),
            );
        }
        out
    }

    /// Successful steps across all plan revisions.
    pub fn successful_steps(&self) -> usize {
        self.completed_step_descriptions().len()
    }

    /// Total steps: carried completed plus everything in the current plan.
    pub fn total_steps(&self) -> usize {
        let current = self.plan.as_ref().map(|p| p.steps.len()).unwrap_or(0);
        self.carried_completed.len() + current
    }

    /// Rounded percentage of successful steps over total steps.
    pub fn completion_percentage(&self) -> u8 {
        let total = self.total_steps();
        if total == 0 {
            return 0;
        }
        ((self.successful_steps() * 100 + total / 2) / total).min(100) as u8
    }

    /// Drains every buffered event: workflow, stashed replaced-plan events,
    /// and the current plan's steps and tasks. Safe to call once.
    ///
    /// Step and task events get the owning workflow stamped into their
    /// payload so downstream handlers can group them without a lookup.
    pub fn drain_all_events(&mut self) -> Vec<DomainEvent> {
        let mut events = std::mem::take(&mut self.stashed_events);
        events.extend(self.workflow.take_events());
        if let Some(plan) = &mut self.plan {
            for step in &mut plan.steps {
                events.extend(step.take_events());
                for task in &mut step.tasks {
                    events.extend(task.take_events());
                }
            }
        }
        let workflow_id = self.workflow.id.as_str();
        for event in &mut events {
            if event.aggregate_id != workflow_id
                && let Some(payload) = event.payload.as_object_mut()
            {
                payload
                    .entry("workflow_id")
                    .or_insert_with(|| workflow_id.into());
            }
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::entities::{Task, TaskStatus};
    use crate::workflow::value_objects::{PageUrl, StrategicIntent, TaskIntent, WorkflowId};

    fn workflow() -> Workflow {
        Workflow::new("extract prices", PageUrl::parse("https://example.com").unwrap())
    }

    fn two_step_plan(workflow_id: WorkflowId) -> Plan {
        Plan::new(workflow_id)
            .with_step(Step::new(1, "open search", StrategicIntent::Navigate))
            .with_step(Step::new(2, "read results", StrategicIntent::Extract))
    }

    #[test]
    fn test_begin_next_step_requires_running_workflow() {
        let wf = workflow();
        let plan = two_step_plan(wf.id.clone());
        let mut agg = WorkflowAggregate::new(wf);
        agg.set_plan(plan).unwrap();

        assert!(matches!(
            agg.begin_next_step(),
            Err(DomainError::WorkflowNotRunning)
        ));

        agg.workflow_mut().start().unwrap();
        let step_id = agg.begin_next_step().unwrap().unwrap();
        assert_eq!(agg.step_mut(&step_id).unwrap().order, 1);
    }

    #[test]
    fn test_begin_next_step_exhausts_plan() {
        let wf = workflow();
        let plan = two_step_plan(wf.id.clone());
        let mut agg = WorkflowAggregate::new(wf);
        agg.workflow_mut().start().unwrap();
        agg.set_plan(plan).unwrap();

        let first = agg.begin_next_step().unwrap().unwrap();
        agg.step_mut(&first).unwrap().complete().unwrap();

        let second = agg.begin_next_step().unwrap().unwrap();
        agg.step_mut(&second).unwrap().fail("timeout").unwrap();

        assert!(agg.begin_next_step().unwrap().is_none());
        assert_eq!(agg.completion_percentage(), 50);
    }

    #[test]
    fn test_replace_plan_carries_completed_work() {
        let wf = workflow();
        let plan = two_step_plan(wf.id.clone());
        let wf_id = wf.id.clone();
        let mut agg = WorkflowAggregate::new(wf);
        agg.workflow_mut().start().unwrap();
        agg.set_plan(plan).unwrap();

        let first = agg.begin_next_step().unwrap().unwrap();
        agg.step_mut(&first).unwrap().complete().unwrap();

        let revised = Plan::new(wf_id)
            .with_step(Step::new(1, "try the sitemap", StrategicIntent::Navigate));
        agg.replace_plan(revised).unwrap();

        assert_eq!(agg.replan_count(), 1);
        assert_eq!(agg.plan().unwrap().revision, 2);
        assert_eq!(agg.completed_step_descriptions(), vec!["open search"]);
        // 1 carried + 1 in the new plan, 1 successful
        assert_eq!(agg.total_steps(), 2);
        assert_eq!(agg.completion_percentage(), 50);
    }

    #[test]
    fn test_drain_includes_replaced_plan_events() {
        let wf = workflow();
        let mut plan = two_step_plan(wf.id.clone());
        let task = Task::new(plan.steps[0].id.clone(), TaskIntent::Click, "click");
        plan.steps[0].add_task(task);
        let wf_id = wf.id.clone();

        let mut agg = WorkflowAggregate::new(wf);
        agg.workflow_mut().start().unwrap();
        agg.set_plan(plan).unwrap();

        let first = agg.begin_next_step().unwrap().unwrap();
        {
            let step = agg.step_mut(&first).unwrap();
            let task = &mut step.tasks[0];
            task.start().unwrap();
            task.complete().unwrap();
            assert_eq!(task.status, TaskStatus::Completed);
            step.complete().unwrap();
        }

        let revised =
            Plan::new(wf_id).with_step(Step::new(1, "extract", StrategicIntent::Extract));
        agg.replace_plan(revised).unwrap();

        let events = agg.drain_all_events();
        // Replaced plan contributed step started/completed and the task's
        // created/started/completed; workflow contributed started + two plan
        // events. Nothing is lost and nothing duplicated.
        let step_events = events
            .iter()
            .filter(|e| e.kind.category() == "step")
            .count();
        let task_events = events
            .iter()
            .filter(|e| e.kind.category() == "task")
            .count();
        assert_eq!(step_events, 2);
        assert_eq!(task_events, 3);
        assert!(agg.drain_all_events().is_empty());
    }

    #[test]
    fn test_drain_stamps_owning_workflow_on_child_events() {
        let wf = workflow();
        let wf_id = wf.id.clone();
        let mut plan = two_step_plan(wf.id.clone());
        let task = Task::new(plan.steps[0].id.clone(), TaskIntent::Click, "click");
        plan.steps[0].add_task(task);

        let mut agg = WorkflowAggregate::new(wf);
        agg.workflow_mut().start().unwrap();
        agg.set_plan(plan).unwrap();
        let first = agg.begin_next_step().unwrap().unwrap();
        agg.step_mut(&first).unwrap().tasks[0].start().unwrap();

        for event in agg.drain_all_events() {
            if event.aggregate_id != wf_id.as_str() {
                assert_eq!(
                    event.payload.get("workflow_id").and_then(|v| v.as_str()),
                    Some(wf_id.as_str()),
                    "{} must carry its workflow",
                    event.kind.name()
                );
            }
        }
    }
}
