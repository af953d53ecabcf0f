use std::fmt;

/// Sequence number of one dispatched step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StepId(pub u64);

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "step#{}", self.0)
    }
}

/// Completion capability for the step currently in flight.
///
/// Exactly one token exists per dispatch. It is handed to the mobile actor, may
/// travel through continuations, and is consumed by
/// [`TurnScheduler::notify_step_complete`](super::TurnScheduler::notify_step_complete).
/// Dropping it instead stalls the scheduler until the level is rebuilt.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "the step stays in flight until this token is handed back to the scheduler"]
pub struct StepToken {
    step: StepId,
}

impl StepToken {
    pub(crate) fn issue(step: StepId) -> Self {
        Self { step }
    }

    pub fn step(&self) -> StepId {
        self.step
    }
}
