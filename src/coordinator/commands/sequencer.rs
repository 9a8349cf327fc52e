use crate::prelude::*;

use super::plan::{CommandStep, Plan};
use crate::config::FailurePolicy;

#[derive(Debug)]
pub enum StepOutcome {
    Validated(Value),
    Mismatch { expected: Value, actual: Value },
    Failed(DeviceError),
    /// not attempted because an earlier step failed under [`FailurePolicy::Abort`]
    Skipped,
}

#[derive(Debug)]
pub struct StepReport {
    pub step: CommandStep,
    pub outcome: StepOutcome,
}

#[derive(Debug, Default)]
pub struct SequenceResult {
    pub steps: Vec<StepReport>,
}

impl SequenceResult {
    pub fn all_validated(&self) -> bool {
        self.steps
            .iter()
            .all(|s| matches!(s.outcome, StepOutcome::Validated(_)))
    }

    pub fn validated(&self) -> usize {
        self.count(|o| matches!(o, StepOutcome::Validated(_)))
    }

    pub fn mismatches(&self) -> usize {
        self.count(|o| matches!(o, StepOutcome::Mismatch { .. }))
    }

    pub fn failures(&self) -> usize {
        self.count(|o| matches!(o, StepOutcome::Failed(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, StepOutcome::Skipped))
    }

    fn count(&self, f: impl Fn(&StepOutcome) -> bool) -> usize {
        self.steps.iter().filter(|s| f(&s.outcome)).count()
    }
}

/// Writes each step of a plan and reads it straight back.
///
/// Steps are independent controls on the device, so a failed or mismatched
/// step does not stop the ones after it unless the policy says so.
pub struct Sequencer {
    device: Arc<dyn Device>,
    policy: FailurePolicy,
}

impl Sequencer {
    pub fn new(device: Arc<dyn Device>, policy: FailurePolicy) -> Self {
        Self { device, policy }
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    pub async fn execute(&self, plan: &Plan) -> SequenceResult {
        info!("[{}] executing {} step(s)", plan.name, plan.len());

        let mut result = SequenceResult::default();
        let mut aborted = false;

        for step in &plan.steps {
            let outcome = if aborted {
                warn!("[SKIPPED] {}", step.label);
                StepOutcome::Skipped
            } else {
                self.run_step(step).await
            };

            if matches!(outcome, StepOutcome::Failed(_)) && self.policy == FailurePolicy::Abort {
                aborted = true;
            }

            result.steps.push(StepReport {
                step: step.clone(),
                outcome,
            });
        }

        info!(
            "[{}] done: {} validated, {} mismatched, {} failed, {} skipped",
            plan.name,
            result.validated(),
            result.mismatches(),
            result.failures(),
            result.skipped()
        );

        result
    }

    async fn run_step(&self, step: &CommandStep) -> StepOutcome {
        let expected = step.expected();

        if let Err(e) = self.device.write(step.register, expected).await {
            error!("Failed to set {}: {}", step.label, e);
            return StepOutcome::Failed(e);
        }
        info!("[SET] {} = {}", step.label, expected);

        match self.device.read(step.register).await {
            Ok(actual) if actual == expected => {
                info!("[VALIDATED] {} = {}", step.label, actual);
                StepOutcome::Validated(actual)
            }
            Ok(actual) => {
                warn!("[MISMATCH] {}: expected {}, got {}", step.label, expected, actual);
                StepOutcome::Mismatch { expected, actual }
            }
            Err(e) => {
                error!("Failed to validate {}: {}", step.label, e);
                StepOutcome::Failed(e)
            }
        }
    }
}
