use gridfall_engine::{Direction, MobileActor, MotionStage, StepContext, StepToken};
use serde::Serialize;
use tracing::{debug, info};

use super::def::Cell;
use super::world::{LevelWorld, Motion};

const SUFFOCATING_ANIMATION: i32 = -1;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct PlayerState {
    pub(crate) cell: Cell,
    pub(crate) elevation: i32,
    pub(crate) facing: Direction,
    /// Value handed to the animation hook: a facing index, or -1 while suffocating.
    pub(crate) animation: i32,
    pub(crate) refusals: u32,
    pub(crate) dead: bool,
}

impl PlayerState {
    pub(crate) fn spawn(cell: Cell, elevation: i32, facing: Direction) -> Self {
        let facing = if facing.is_none() {
            Direction::Up
        } else {
            facing
        };
        Self {
            cell,
            elevation,
            facing,
            animation: facing.facing_index(),
            refusals: 0,
            dead: false,
        }
    }

    pub(crate) fn suffocate(&mut self) {
        self.animation = SUFFOCATING_ANIMATION;
    }
}

/// The mobile actor: turns the dispatched direction into a timed motion that
/// carries the step token until it finishes.
#[derive(Debug, Default)]
pub(crate) struct PlayerController {
    steps_started: u64,
}

impl MobileActor<LevelWorld> for PlayerController {
    fn name(&self) -> &'static str {
        "player"
    }

    fn step(&mut self, direction: Direction, token: StepToken, cx: &mut StepContext<'_, LevelWorld>) {
        self.steps_started = self.steps_started.saturating_add(1);
        let world = cx.host_mut();
        let motion = world.motion;
        let from = world.player.cell;
        world.player.animation = direction.facing_index();

        if world.is_blocked(from, world.player.elevation, direction) {
            // Blocked moves still hand the token back once the bump plays out.
            world.player.refusals = world.player.refusals.saturating_add(1);
            info!(
                direction = direction.as_token(),
                cell = %from,
                "move_refused"
            );
            world.motions.begin(
                [MotionStage::new("bump", motion.refusal_seconds)],
                Motion::PlayerRefused { token },
            );
            return;
        }

        let to = from.step(direction);
        let mut stages = Vec::with_capacity(2);
        if world.player.facing != direction {
            stages.push(MotionStage::new("rotate", motion.step_seconds));
        }
        stages.push(MotionStage::new("move", motion.step_seconds));
        world.player.facing = direction;
        debug!(
            direction = direction.as_token(),
            from = %from,
            to = %to,
            stages = stages.len(),
            step = self.steps_started,
            "player_move_started"
        );
        world.motions.begin(stages, Motion::PlayerStep { token, to });
    }
}
