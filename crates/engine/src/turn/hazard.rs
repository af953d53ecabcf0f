use serde::{Deserialize, Serialize};

const MIN_PERIOD_SECONDS: f32 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HazardConfig {
    pub initial_level: i32,
    pub loss_per_tick: i32,
    pub period_seconds: f32,
    pub grace_seconds: f32,
    pub lethal_threshold: i32,
    pub refill_level: i32,
}

impl Default for HazardConfig {
    fn default() -> Self {
        Self {
            initial_level: 100,
            loss_per_tick: 5,
            period_seconds: 1.0,
            grace_seconds: 2.0,
            lethal_threshold: 0,
            refill_level: 100,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClockPhase {
    Idle,
    Running { until_next_tick: f32 },
    Grace { remaining: f32 },
    Terminated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HazardEvent {
    Ticked { level: i32 },
    Lethal { level: i32 },
    GraceElapsed,
}

/// Repeating depletion timer, advanced by the game loop's fixed tick.
///
/// The first tick fires the moment the clock starts; later ticks follow every
/// `period_seconds`. A lethal tick moves the clock into a grace countdown, after
/// which it reports [`HazardEvent::GraceElapsed`] once and terminates for good.
#[derive(Debug, Clone)]
pub struct HazardClock {
    config: HazardConfig,
    level: i32,
    loss_per_tick: i32,
    phase: ClockPhase,
}

impl HazardClock {
    pub fn new(config: HazardConfig) -> Self {
        Self {
            config,
            level: config.initial_level,
            loss_per_tick: config.loss_per_tick,
            phase: ClockPhase::Idle,
        }
    }

    pub fn config(&self) -> &HazardConfig {
        &self.config
    }

    pub fn level(&self) -> i32 {
        self.level
    }

    pub fn loss_per_tick(&self) -> i32 {
        self.loss_per_tick
    }

    pub fn phase(&self) -> ClockPhase {
        self.phase
    }

    pub fn is_started(&self) -> bool {
        !matches!(self.phase, ClockPhase::Idle)
    }

    pub fn is_running(&self) -> bool {
        matches!(self.phase, ClockPhase::Running { .. })
    }

    pub fn set_level(&mut self, level: i32) {
        self.level = level;
    }

    pub fn set_loss_per_tick(&mut self, loss_per_tick: i32) {
        self.loss_per_tick = loss_per_tick;
    }

    /// Starts an idle clock and fires its first tick. Returns `false` when the
    /// clock was already started (or has terminated).
    pub fn start(&mut self, paused: bool, out: &mut Vec<HazardEvent>) -> bool {
        if self.phase != ClockPhase::Idle {
            return false;
        }
        self.phase = ClockPhase::Running {
            until_next_tick: self.period(),
        };
        out.push(self.tick(paused));
        true
    }

    /// Stops the clock without a reload countdown.
    pub fn halt(&mut self) {
        self.phase = ClockPhase::Terminated;
    }

    pub fn advance(&mut self, dt_seconds: f32, paused: bool, out: &mut Vec<HazardEvent>) {
        let mut budget = if dt_seconds.is_finite() {
            dt_seconds.max(0.0)
        } else {
            0.0
        };

        loop {
            match self.phase {
                ClockPhase::Running { until_next_tick } => {
                    if budget < until_next_tick {
                        self.phase = ClockPhase::Running {
                            until_next_tick: until_next_tick - budget,
                        };
                        return;
                    }
                    budget -= until_next_tick;
                    self.phase = ClockPhase::Running {
                        until_next_tick: self.period(),
                    };
                    out.push(self.tick(paused));
                }
                ClockPhase::Grace { remaining } => {
                    if budget < remaining {
                        self.phase = ClockPhase::Grace {
                            remaining: remaining - budget,
                        };
                        return;
                    }
                    self.phase = ClockPhase::Terminated;
                    out.push(HazardEvent::GraceElapsed);
                    return;
                }
                ClockPhase::Idle | ClockPhase::Terminated => return,
            }
        }
    }

    fn tick(&mut self, paused: bool) -> HazardEvent {
        if paused {
            return HazardEvent::Ticked { level: self.level };
        }

        self.level = self.level.saturating_sub(self.loss_per_tick);
        if self.level <= self.config.lethal_threshold {
            self.phase = ClockPhase::Grace {
                remaining: self.config.grace_seconds.max(0.0),
            };
            HazardEvent::Lethal { level: self.level }
        } else {
            HazardEvent::Ticked { level: self.level }
        }
    }

    fn period(&self) -> f32 {
        self.config.period_seconds.max(MIN_PERIOD_SECONDS)
    }
}
