use serde::Serialize;
use tracing::{debug, info, warn};

use super::continuation::{Continuation, ContinuationQueue, StepContext};
use super::direction::Direction;
use super::gate::InputGate;
use super::hazard::{HazardClock, HazardConfig, HazardEvent};
use super::registry::{MobileActor, RegistryError, StepParticipant, StepRegistry};
use super::token::{StepId, StepToken};

/// Collaborators the scheduler consults but does not own.
pub trait TurnHost {
    /// Downward support probe under the mobile actor.
    fn is_actor_supported(&self) -> bool;

    fn update_hazard_display(&mut self, level: i32);

    /// Fire-and-forget visual hook run just before a suffocation death is broadcast.
    fn actor_incapacitated(&mut self);

    fn reload_level(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeathCause {
    Suffocated,
    Fell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnPhase {
    Idle,
    StepInFlight,
    Dead,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SchedulerConfig {
    pub hazard: HazardConfig,
    pub god_mode: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnSnapshot {
    pub phase: TurnPhase,
    pub finished: bool,
    pub alive: bool,
    pub god_mode: bool,
    pub pending_direction: Direction,
    pub in_flight_step: Option<u64>,
    pub steps_dispatched: u64,
    pub hazard_level: i32,
    pub hazard_loss_per_tick: i32,
    pub hazard_clock_running: bool,
    pub pending_continuations: usize,
    pub participants: Vec<&'static str>,
}

type DeathListener<H> = Box<dyn FnMut(DeathCause, &mut H)>;

/// Single-actor turn scheduler.
///
/// Accepts one command at a time, fans each accepted command out to every
/// registered participant, and waits for the mobile actor to hand the step's
/// [`StepToken`] back. Commands arriving meanwhile are buffered in a single
/// overwrite slot and applied the instant the step finishes. A pending
/// continuation pre-empts the finish logic for exactly one completion.
///
/// The hazard clock is advanced from [`TurnScheduler::advance`] by the same
/// fixed tick that drives motion, so depletion is independent of step cadence.
pub struct TurnScheduler<H> {
    registry: StepRegistry<H>,
    gate: InputGate,
    continuations: ContinuationQueue<H>,
    clock: HazardClock,
    death_listeners: Vec<DeathListener<H>>,
    hazard_events: Vec<HazardEvent>,
    finished: bool,
    alive: bool,
    god_mode: bool,
    in_flight: Option<StepId>,
    next_step_id: u64,
}

impl<H: TurnHost> TurnScheduler<H> {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            registry: StepRegistry::new(),
            gate: InputGate::default(),
            continuations: ContinuationQueue::new(),
            clock: HazardClock::new(config.hazard),
            death_listeners: Vec::new(),
            hazard_events: Vec::new(),
            finished: true,
            alive: true,
            god_mode: config.god_mode,
            in_flight: None,
            next_step_id: 0,
        }
    }

    pub fn register<P>(&mut self, participant: P)
    where
        P: StepParticipant<H> + 'static,
    {
        debug!(participant = participant.name(), "participant_registered");
        self.registry.register(participant);
    }

    pub fn register_actor<A>(&mut self, actor: A) -> Result<(), RegistryError>
    where
        A: MobileActor<H> + 'static,
    {
        let name = actor.name();
        self.registry.register_actor(actor)?;
        debug!(actor = name, "mobile_actor_registered");
        Ok(())
    }

    pub fn add_death_listener<F>(&mut self, listener: F)
    where
        F: FnMut(DeathCause, &mut H) + 'static,
    {
        self.death_listeners.push(Box::new(listener));
    }

    /// Queues `continuation` for the next completion signal.
    pub fn enqueue_continuation<C>(&mut self, continuation: C)
    where
        C: Continuation<H> + 'static,
    {
        debug!(
            continuation = continuation.label(),
            queued = self.continuations.len() + 1,
            "continuation_enqueued"
        );
        self.continuations.push(continuation);
    }

    pub fn process_input(&mut self, direction: Direction, host: &mut H) {
        if direction.is_none() {
            return;
        }
        if !self.alive {
            debug!(direction = direction.as_token(), "input_ignored_dead");
            return;
        }
        if !self.finished {
            let replaced = self.gate.buffer(direction);
            debug!(
                direction = direction.as_token(),
                replaced = replaced.as_token(),
                "input_buffered"
            );
            return;
        }

        if !self.clock.is_started() {
            self.clock.start(self.god_mode, &mut self.hazard_events);
            info!(
                level = self.clock.level(),
                loss_per_tick = self.clock.loss_per_tick(),
                "hazard_clock_started"
            );
            self.apply_hazard_events(host);
            if !self.alive {
                return;
            }
        }

        self.dispatch(direction, host);
    }

    /// Completion entry point for the step identified by `token`.
    pub fn notify_step_complete(&mut self, token: StepToken, host: &mut H) {
        let step = token.step();
        if !self.alive {
            debug!(step = %step, "completion_ignored_dead");
            return;
        }
        if self.in_flight != Some(step) {
            warn!(
                step = %step,
                in_flight = ?self.in_flight.map(|id| id.0),
                "stale_step_token_ignored"
            );
            return;
        }

        if let Some(continuation) = self.continuations.pop_front() {
            debug!(
                step = %step,
                continuation = continuation.label(),
                remaining = self.continuations.len(),
                "continuation_resumed"
            );
            let mut cx = StepContext::new(host, &mut self.continuations);
            continuation.resume(token, &mut cx);
            return;
        }

        if !self.god_mode && !host.is_actor_supported() {
            info!(step = %step, "actor_unsupported");
            self.broadcast_death(DeathCause::Fell, host);
            return;
        }

        self.finished = true;
        self.in_flight = None;
        debug!(step = %step, "step_finished");

        if let Some(next) = self.gate.take() {
            self.dispatch(next, host);
        }
    }

    /// Advances the hazard clock by one loop tick.
    pub fn advance(&mut self, dt_seconds: f32, host: &mut H) {
        self.clock
            .advance(dt_seconds, self.god_mode, &mut self.hazard_events);
        self.apply_hazard_events(host);
    }

    pub fn set_god_mode(&mut self, enabled: bool) {
        if self.god_mode != enabled {
            info!(enabled, "god_mode_changed");
        }
        self.god_mode = enabled;
    }

    pub fn toggle_god_mode(&mut self) -> bool {
        self.set_god_mode(!self.god_mode);
        self.god_mode
    }

    pub fn set_hazard_level(&mut self, level: i32, host: &mut H) {
        self.clock.set_level(level);
        host.update_hazard_display(level);
        info!(level, "hazard_level_set");
    }

    pub fn set_hazard_loss_per_tick(&mut self, loss_per_tick: i32) {
        self.clock.set_loss_per_tick(loss_per_tick);
        info!(loss_per_tick, "hazard_loss_set");
    }

    /// Refills the hazard resource. Ignored once the actor is dead.
    pub fn restore_hazard(&mut self, host: &mut H) -> bool {
        if !self.alive {
            return false;
        }
        let level = self.clock.config().refill_level;
        self.clock.set_level(level);
        host.update_hazard_display(level);
        debug!(level, "hazard_restored");
        true
    }

    pub fn phase(&self) -> TurnPhase {
        if !self.alive {
            TurnPhase::Dead
        } else if self.finished {
            TurnPhase::Idle
        } else {
            TurnPhase::StepInFlight
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn god_mode(&self) -> bool {
        self.god_mode
    }

    pub fn pending_direction(&self) -> Direction {
        self.gate.pending()
    }

    pub fn hazard_level(&self) -> i32 {
        self.clock.level()
    }

    pub fn hazard_clock(&self) -> &HazardClock {
        &self.clock
    }

    pub fn pending_continuations(&self) -> usize {
        self.continuations.len()
    }

    pub fn in_flight_step(&self) -> Option<StepId> {
        self.in_flight
    }

    pub fn snapshot(&self) -> TurnSnapshot {
        TurnSnapshot {
            phase: self.phase(),
            finished: self.finished,
            alive: self.alive,
            god_mode: self.god_mode,
            pending_direction: self.gate.pending(),
            in_flight_step: self.in_flight.map(|id| id.0),
            steps_dispatched: self.next_step_id,
            hazard_level: self.clock.level(),
            hazard_loss_per_tick: self.clock.loss_per_tick(),
            hazard_clock_running: self.clock.is_running(),
            pending_continuations: self.continuations.len(),
            participants: self.registry.names().collect(),
        }
    }

    fn dispatch(&mut self, direction: Direction, host: &mut H) {
        let step = StepId(self.next_step_id);
        self.next_step_id = self.next_step_id.saturating_add(1);
        self.finished = false;
        self.in_flight = Some(step);
        debug!(step = %step, direction = direction.as_token(), "step_dispatched");

        let mut cx = StepContext::new(host, &mut self.continuations);
        if let Some(unclaimed) = self
            .registry
            .fan_out(direction, StepToken::issue(step), &mut cx)
        {
            // Nobody can complete this step; it stays in flight until reload.
            warn!(step = %unclaimed.step(), "step_without_mobile_actor");
        }
    }

    fn apply_hazard_events(&mut self, host: &mut H) {
        let mut events = std::mem::take(&mut self.hazard_events);
        for event in events.drain(..) {
            match event {
                HazardEvent::Ticked { level } => {
                    host.update_hazard_display(level);
                    debug!(level, "hazard_ticked");
                }
                HazardEvent::Lethal { level } => {
                    host.update_hazard_display(level);
                    host.actor_incapacitated();
                    self.broadcast_death(DeathCause::Suffocated, host);
                }
                HazardEvent::GraceElapsed => {
                    info!("hazard_reload_requested");
                    host.reload_level();
                }
            }
        }
        self.hazard_events = events;
    }

    fn broadcast_death(&mut self, cause: DeathCause, host: &mut H) {
        if !self.alive {
            return;
        }
        self.alive = false;
        self.gate.clear();
        if cause != DeathCause::Suffocated {
            self.clock.halt();
        }
        let abandoned = self.continuations.abandon_all();
        info!(
            cause = ?cause,
            in_flight = ?self.in_flight.map(|id| id.0),
            abandoned_continuations = abandoned,
            "actor_died"
        );
        for listener in &mut self.death_listeners {
            listener(cause, &mut *host);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;
    use crate::turn::continuation::continuation_fn;
    use crate::turn::hazard::ClockPhase;

    struct TestHost {
        supported: bool,
        tokens: VecDeque<StepToken>,
        actor_steps: Vec<Direction>,
        observed_steps: Vec<Direction>,
        display: Vec<i32>,
        incapacitated: u32,
        reloads: u32,
        deaths: Vec<DeathCause>,
        log: Vec<&'static str>,
    }

    impl TestHost {
        fn new() -> Self {
            Self {
                supported: true,
                tokens: VecDeque::new(),
                actor_steps: Vec::new(),
                observed_steps: Vec::new(),
                display: Vec::new(),
                incapacitated: 0,
                reloads: 0,
                deaths: Vec::new(),
                log: Vec::new(),
            }
        }
    }

    impl TurnHost for TestHost {
        fn is_actor_supported(&self) -> bool {
            self.supported
        }

        fn update_hazard_display(&mut self, level: i32) {
            self.display.push(level);
        }

        fn actor_incapacitated(&mut self) {
            self.incapacitated += 1;
        }

        fn reload_level(&mut self) {
            self.reloads += 1;
        }
    }

    struct Walker;

    impl MobileActor<TestHost> for Walker {
        fn name(&self) -> &'static str {
            "walker"
        }

        fn step(
            &mut self,
            direction: Direction,
            token: StepToken,
            cx: &mut StepContext<'_, TestHost>,
        ) {
            cx.host_mut().actor_steps.push(direction);
            cx.host_mut().tokens.push_back(token);
        }
    }

    struct Watcher;

    impl StepParticipant<TestHost> for Watcher {
        fn name(&self) -> &'static str {
            "watcher"
        }

        fn step(&mut self, direction: Direction, cx: &mut StepContext<'_, TestHost>) {
            cx.host_mut().observed_steps.push(direction);
        }
    }

    fn scheduler_with(hazard: HazardConfig) -> TurnScheduler<TestHost> {
        let mut scheduler = TurnScheduler::new(SchedulerConfig {
            hazard,
            god_mode: false,
        });
        scheduler.register(Watcher);
        scheduler.register_actor(Walker).expect("actor registers");
        scheduler.add_death_listener(|cause, host: &mut TestHost| host.deaths.push(cause));
        scheduler
    }

    fn scheduler() -> TurnScheduler<TestHost> {
        scheduler_with(HazardConfig::default())
    }

    fn complete(scheduler: &mut TurnScheduler<TestHost>, host: &mut TestHost) {
        let token = host.tokens.pop_front().expect("a step token is outstanding");
        scheduler.notify_step_complete(token, host);
    }

    fn logging_continuation(
        label: &'static str,
    ) -> impl Continuation<TestHost> + 'static {
        continuation_fn(label, move |token, cx: &mut StepContext<'_, TestHost>| {
            cx.host_mut().log.push(label);
            cx.host_mut().tokens.push_back(token);
        })
    }

    #[test]
    fn single_step_returns_to_idle() {
        let mut host = TestHost::new();
        let mut scheduler = scheduler();

        scheduler.process_input(Direction::Right, &mut host);
        assert_eq!(host.actor_steps, vec![Direction::Right]);
        assert_eq!(host.observed_steps, vec![Direction::Right]);
        assert_eq!(scheduler.phase(), TurnPhase::StepInFlight);

        complete(&mut scheduler, &mut host);

        assert_eq!(scheduler.phase(), TurnPhase::Idle);
        assert_eq!(scheduler.pending_direction(), Direction::None);
        assert!(host.tokens.is_empty());
    }

    #[test]
    fn buffered_direction_dispatches_on_completion() {
        let mut host = TestHost::new();
        let mut scheduler = scheduler();

        scheduler.process_input(Direction::Right, &mut host);
        scheduler.process_input(Direction::Left, &mut host);
        assert_eq!(scheduler.pending_direction(), Direction::Left);
        assert_eq!(host.actor_steps, vec![Direction::Right]);

        complete(&mut scheduler, &mut host);

        assert_eq!(host.actor_steps, vec![Direction::Right, Direction::Left]);
        assert_eq!(scheduler.pending_direction(), Direction::None);
        assert_eq!(scheduler.phase(), TurnPhase::StepInFlight);

        complete(&mut scheduler, &mut host);
        assert_eq!(scheduler.phase(), TurnPhase::Idle);
    }

    #[test]
    fn only_the_latest_buffered_direction_survives() {
        let mut host = TestHost::new();
        let mut scheduler = scheduler();

        scheduler.process_input(Direction::Up, &mut host);
        for direction in [Direction::Down, Direction::Right, Direction::Left, Direction::Up] {
            scheduler.process_input(direction, &mut host);
            assert_eq!(scheduler.pending_direction(), direction);
        }

        complete(&mut scheduler, &mut host);
        complete(&mut scheduler, &mut host);

        assert_eq!(host.actor_steps, vec![Direction::Up, Direction::Up]);
        assert_eq!(scheduler.phase(), TurnPhase::Idle);
    }

    #[test]
    fn finished_flag_brackets_each_step() {
        let mut host = TestHost::new();
        let mut scheduler = scheduler();
        assert!(scheduler.is_finished());

        for direction in Direction::ALL {
            scheduler.process_input(direction, &mut host);
            assert!(!scheduler.is_finished());
            assert!(scheduler.in_flight_step().is_some());
            complete(&mut scheduler, &mut host);
            assert!(scheduler.is_finished());
            assert!(scheduler.in_flight_step().is_none());
        }
        assert_eq!(scheduler.snapshot().steps_dispatched, 4);
    }

    #[test]
    fn none_direction_never_changes_state() {
        let mut host = TestHost::new();
        let mut scheduler = scheduler();

        let idle_before = scheduler.snapshot();
        scheduler.process_input(Direction::None, &mut host);
        assert_eq!(scheduler.snapshot(), idle_before);
        assert!(!scheduler.hazard_clock().is_started());

        scheduler.process_input(Direction::Up, &mut host);
        scheduler.process_input(Direction::Left, &mut host);
        let busy_before = scheduler.snapshot();
        scheduler.process_input(Direction::None, &mut host);
        assert_eq!(scheduler.snapshot(), busy_before);
        assert_eq!(scheduler.pending_direction(), Direction::Left);
    }

    #[test]
    fn lethal_hazard_tick_kills_and_reloads_after_grace() {
        let mut host = TestHost::new();
        let mut scheduler = scheduler_with(HazardConfig {
            initial_level: 5,
            loss_per_tick: 5,
            grace_seconds: 2.0,
            ..HazardConfig::default()
        });

        scheduler.process_input(Direction::Right, &mut host);

        assert_eq!(scheduler.phase(), TurnPhase::Dead);
        assert_eq!(host.deaths, vec![DeathCause::Suffocated]);
        assert_eq!(host.incapacitated, 1);
        assert_eq!(host.display, vec![0]);
        assert!(host.actor_steps.is_empty(), "dead actors are not dispatched");

        scheduler.advance(1.5, &mut host);
        assert_eq!(host.reloads, 0);
        scheduler.advance(0.5, &mut host);
        assert_eq!(host.reloads, 1);
        assert_eq!(scheduler.hazard_clock().phase(), ClockPhase::Terminated);

        scheduler.advance(10.0, &mut host);
        assert_eq!(host.reloads, 1);
        assert_eq!(host.deaths.len(), 1);
    }

    #[test]
    fn continuation_preempts_ground_check() {
        let mut host = TestHost::new();
        let mut scheduler = scheduler();

        scheduler.process_input(Direction::Right, &mut host);
        scheduler.enqueue_continuation(logging_continuation("teleport"));
        host.supported = false;

        complete(&mut scheduler, &mut host);
        assert_eq!(host.log, vec!["teleport"]);
        assert!(scheduler.is_alive(), "ground check must not run this time");
        assert_eq!(scheduler.phase(), TurnPhase::StepInFlight);

        host.supported = true;
        complete(&mut scheduler, &mut host);
        assert_eq!(scheduler.phase(), TurnPhase::Idle);
        assert!(host.deaths.is_empty());
    }

    #[test]
    fn continuation_resumption_runs_ground_check_afterwards() {
        let mut host = TestHost::new();
        let mut scheduler = scheduler();

        scheduler.process_input(Direction::Up, &mut host);
        scheduler.enqueue_continuation(logging_continuation("teleport"));
        complete(&mut scheduler, &mut host);

        host.supported = false;
        complete(&mut scheduler, &mut host);

        assert_eq!(scheduler.phase(), TurnPhase::Dead);
        assert_eq!(host.deaths, vec![DeathCause::Fell]);
    }

    #[test]
    fn n_continuations_need_n_completions() {
        let mut host = TestHost::new();
        let mut scheduler = scheduler();
        scheduler.process_input(Direction::Down, &mut host);
        for label in ["one", "two", "three"] {
            scheduler.enqueue_continuation(logging_continuation(label));
        }

        for expected_remaining in [2, 1, 0] {
            complete(&mut scheduler, &mut host);
            assert_eq!(scheduler.pending_continuations(), expected_remaining);
            assert_eq!(scheduler.phase(), TurnPhase::StepInFlight);
        }
        assert_eq!(host.log, vec!["one", "two", "three"]);

        complete(&mut scheduler, &mut host);
        assert_eq!(scheduler.phase(), TurnPhase::Idle);
    }

    #[test]
    fn continuation_may_chain_another() {
        let mut host = TestHost::new();
        let mut scheduler = scheduler();
        scheduler.process_input(Direction::Left, &mut host);
        scheduler.enqueue_continuation(continuation_fn(
            "outer",
            |token, cx: &mut StepContext<'_, TestHost>| {
                cx.host_mut().log.push("outer");
                cx.host_mut().tokens.push_back(token);
                cx.defer(logging_continuation("inner"));
            },
        ));

        complete(&mut scheduler, &mut host);
        assert_eq!(scheduler.pending_continuations(), 1);
        complete(&mut scheduler, &mut host);
        complete(&mut scheduler, &mut host);

        assert_eq!(host.log, vec!["outer", "inner"]);
        assert_eq!(scheduler.phase(), TurnPhase::Idle);
    }

    #[test]
    fn unsupported_actor_falls_and_stays_dead() {
        let mut host = TestHost::new();
        let mut scheduler = scheduler();
        scheduler.process_input(Direction::Right, &mut host);
        scheduler.process_input(Direction::Up, &mut host);
        host.supported = false;

        complete(&mut scheduler, &mut host);

        assert_eq!(scheduler.phase(), TurnPhase::Dead);
        assert_eq!(host.deaths, vec![DeathCause::Fell]);
        assert_eq!(host.actor_steps, vec![Direction::Right]);
        assert_eq!(scheduler.pending_direction(), Direction::None);
        assert_eq!(scheduler.hazard_clock().phase(), ClockPhase::Terminated);

        let level = scheduler.hazard_level();
        scheduler.advance(20.0, &mut host);
        assert_eq!(scheduler.hazard_level(), level);

        scheduler.process_input(Direction::Left, &mut host);
        assert_eq!(host.actor_steps, vec![Direction::Right]);
        assert_eq!(host.reloads, 0);
    }

    #[test]
    fn god_mode_suppresses_fall_death() {
        let mut host = TestHost::new();
        let mut scheduler = scheduler();
        scheduler.set_god_mode(true);
        host.supported = false;

        scheduler.process_input(Direction::Right, &mut host);
        complete(&mut scheduler, &mut host);

        assert_eq!(scheduler.phase(), TurnPhase::Idle);
        assert!(host.deaths.is_empty());
    }

    #[test]
    fn god_mode_suppresses_hazard_death() {
        let mut host = TestHost::new();
        let mut scheduler = scheduler();
        scheduler.set_hazard_level(1, &mut host);
        assert!(scheduler.toggle_god_mode());

        scheduler.process_input(Direction::Right, &mut host);
        scheduler.advance(1.0, &mut host);
        assert_eq!(scheduler.hazard_level(), 1);

        scheduler.set_hazard_level(0, &mut host);
        scheduler.advance(1.0, &mut host);

        assert!(scheduler.is_alive());
        assert!(host.deaths.is_empty());
        assert_eq!(host.incapacitated, 0);
        assert!(scheduler.hazard_clock().is_running());
    }

    #[test]
    fn disabling_god_mode_resumes_depletion() {
        let mut host = TestHost::new();
        let mut scheduler = scheduler_with(HazardConfig {
            initial_level: 10,
            loss_per_tick: 5,
            ..HazardConfig::default()
        });
        scheduler.set_god_mode(true);
        scheduler.process_input(Direction::Up, &mut host);
        scheduler.advance(3.0, &mut host);
        assert_eq!(scheduler.hazard_level(), 10);

        scheduler.set_god_mode(false);
        scheduler.advance(2.0, &mut host);

        assert_eq!(host.deaths, vec![DeathCause::Suffocated]);
    }

    #[test]
    fn hazard_death_mid_step_abandons_continuations() {
        let mut host = TestHost::new();
        let mut scheduler = scheduler();
        scheduler.process_input(Direction::Right, &mut host);
        scheduler.enqueue_continuation(logging_continuation("gate"));
        scheduler.set_hazard_level(5, &mut host);

        scheduler.advance(1.0, &mut host);
        assert_eq!(host.deaths, vec![DeathCause::Suffocated]);
        assert_eq!(scheduler.pending_continuations(), 0);

        complete(&mut scheduler, &mut host);
        assert!(host.log.is_empty());
        assert_eq!(scheduler.phase(), TurnPhase::Dead);
    }

    #[test]
    fn hazard_clock_starts_on_first_accepted_command() {
        let mut host = TestHost::new();
        let mut scheduler = scheduler();

        scheduler.advance(5.0, &mut host);
        assert!(host.display.is_empty());
        assert_eq!(scheduler.hazard_level(), 100);

        scheduler.process_input(Direction::Up, &mut host);
        assert_eq!(host.display, vec![95]);
        scheduler.advance(2.0, &mut host);
        assert_eq!(host.display, vec![95, 90, 85]);
    }

    #[test]
    fn token_from_another_scheduler_is_ignored() {
        let mut host = TestHost::new();
        let mut first = scheduler();
        let mut second = scheduler();

        first.process_input(Direction::Up, &mut host);
        let foreign = host.tokens.pop_front().expect("token");
        second.notify_step_complete(foreign, &mut host);

        assert_eq!(second.phase(), TurnPhase::Idle);
        assert_eq!(first.phase(), TurnPhase::StepInFlight);
    }

    #[test]
    fn restore_only_while_alive() {
        let mut host = TestHost::new();
        let mut scheduler = scheduler_with(HazardConfig {
            initial_level: 40,
            refill_level: 100,
            ..HazardConfig::default()
        });

        assert!(scheduler.restore_hazard(&mut host));
        assert_eq!(scheduler.hazard_level(), 100);

        scheduler.process_input(Direction::Up, &mut host);
        host.supported = false;
        complete(&mut scheduler, &mut host);
        scheduler.set_hazard_level(3, &mut host);

        assert!(!scheduler.restore_hazard(&mut host));
        assert_eq!(scheduler.hazard_level(), 3);
    }

    #[test]
    fn registration_without_actor_stalls() {
        let mut host = TestHost::new();
        let mut scheduler = TurnScheduler::<TestHost>::new(SchedulerConfig::default());
        scheduler.register(Watcher);

        scheduler.process_input(Direction::Right, &mut host);
        scheduler.process_input(Direction::Left, &mut host);

        assert_eq!(host.observed_steps, vec![Direction::Right]);
        assert!(host.tokens.is_empty());
        assert_eq!(scheduler.phase(), TurnPhase::StepInFlight);
        assert_eq!(scheduler.pending_direction(), Direction::Left);
    }

    #[test]
    fn snapshot_serializes_for_operator_status() {
        let mut host = TestHost::new();
        let mut scheduler = scheduler();
        scheduler.process_input(Direction::Up, &mut host);
        scheduler.process_input(Direction::Down, &mut host);

        let json = serde_json::to_value(scheduler.snapshot()).expect("snapshot json");
        assert_eq!(json["phase"], "step_in_flight");
        assert_eq!(json["pending_direction"], "down");
        assert_eq!(json["in_flight_step"], 0);
        assert_eq!(json["hazard_level"], 95);
        assert_eq!(json["participants"].as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn hazard_config_fills_missing_fields_from_defaults() {
        let config: HazardConfig =
            serde_json::from_str(r#"{ "loss_per_tick": 2 }"#).expect("hazard json");
        assert_eq!(config.loss_per_tick, 2);
        assert_eq!(config.initial_level, 100);
        assert_eq!(config.grace_seconds, 2.0);

        assert!(serde_json::from_str::<HazardConfig>(r#"{ "god_mode": true }"#).is_err());
    }
}
