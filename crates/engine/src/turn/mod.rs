//! Single-actor turn scheduling.
//!
//! One command is in flight at a time. Accepted commands fan out to every
//! registered participant; the mobile actor alone receives the step's
//! completion token and hands it back when its motion ends. See
//! [`TurnScheduler`] for the finish logic.

mod continuation;
mod direction;
mod gate;
mod hazard;
mod registry;
mod scheduler;
mod token;

pub use continuation::{continuation_fn, Continuation, FnContinuation, StepContext};
pub use direction::Direction;
pub use hazard::{ClockPhase, HazardClock, HazardConfig, HazardEvent};
pub use registry::{MobileActor, RegistryError, StepParticipant, StepRegistry};
pub use scheduler::{
    DeathCause, SchedulerConfig, TurnHost, TurnPhase, TurnScheduler, TurnSnapshot,
};
pub use token::{StepId, StepToken};
