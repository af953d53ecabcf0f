use thiserror::Error;

use super::continuation::StepContext;
use super::direction::Direction;
use super::token::StepToken;

/// Fire-and-forget observer of the step event.
pub trait StepParticipant<H> {
    fn name(&self) -> &'static str;

    /// Must return right away; any animation it starts runs on its own timeline.
    fn step(&mut self, direction: Direction, cx: &mut StepContext<'_, H>);
}

/// The single participant that owns the completion signal.
pub trait MobileActor<H> {
    fn name(&self) -> &'static str;

    /// Starts the actor's motion for `direction` and takes ownership of `token`.
    ///
    /// The token must come back through `notify_step_complete` once the motion
    /// ends, including when the move is refused.
    fn step(&mut self, direction: Direction, token: StepToken, cx: &mut StepContext<'_, H>);
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("mobile actor '{existing}' is already registered; refusing '{rejected}'")]
    ActorAlreadyRegistered {
        existing: &'static str,
        rejected: &'static str,
    },
}

enum Registration<H> {
    Observer(Box<dyn StepParticipant<H>>),
    Actor(Box<dyn MobileActor<H>>),
}

impl<H> Registration<H> {
    fn name(&self) -> &'static str {
        match self {
            Registration::Observer(participant) => participant.name(),
            Registration::Actor(actor) => actor.name(),
        }
    }
}

/// Ordered participant list. Fan-out order is registration order.
pub struct StepRegistry<H> {
    entries: Vec<Registration<H>>,
    actor_name: Option<&'static str>,
}

impl<H> Default for StepRegistry<H> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            actor_name: None,
        }
    }
}

impl<H> StepRegistry<H> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<P>(&mut self, participant: P)
    where
        P: StepParticipant<H> + 'static,
    {
        self.entries
            .push(Registration::Observer(Box::new(participant)));
    }

    pub fn register_actor<A>(&mut self, actor: A) -> Result<(), RegistryError>
    where
        A: MobileActor<H> + 'static,
    {
        if let Some(existing) = self.actor_name {
            return Err(RegistryError::ActorAlreadyRegistered {
                existing,
                rejected: actor.name(),
            });
        }
        self.actor_name = Some(actor.name());
        self.entries.push(Registration::Actor(Box::new(actor)));
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn has_actor(&self) -> bool {
        self.actor_name.is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(Registration::name)
    }

    /// Calls every participant once, in order. The token goes to the actor; it
    /// is handed back when no actor is registered.
    pub(crate) fn fan_out(
        &mut self,
        direction: Direction,
        token: StepToken,
        cx: &mut StepContext<'_, H>,
    ) -> Option<StepToken> {
        let mut token = Some(token);
        for entry in &mut self.entries {
            match entry {
                Registration::Observer(participant) => participant.step(direction, cx),
                Registration::Actor(actor) => {
                    if let Some(token) = token.take() {
                        actor.step(direction, token, cx);
                    }
                }
            }
        }
        token
    }
}
