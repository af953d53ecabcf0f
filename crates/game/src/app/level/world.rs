use gridfall_engine::{
    DeathCause, Direction, MotionStage, MotionTimeline, SceneCommand, StepToken, TurnHost,
};
use serde::Serialize;
use tracing::{debug, info};

use super::def::{Cell, LevelDef, MotionConfig, Terrain};
use super::platform::Platform;
use super::player::PlayerState;
use super::triggers::{build_triggers, Trigger};

/// Which surfaces a spatial probe may hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LayerMask(u8);

impl LayerMask {
    pub(crate) const GROUND: LayerMask = LayerMask(0b01);
    pub(crate) const PLATFORM: LayerMask = LayerMask(0b10);
    pub(crate) const SOLID: LayerMask = LayerMask(0b11);

    pub(crate) const fn contains(self, other: LayerMask) -> bool {
        self.0 & other.0 == other.0
    }
}

/// Timed sequences owned by the world. Step tokens ride along and are
/// handed back to the scheduler when the motion finishes.
#[derive(Debug)]
pub(crate) enum Motion {
    PlayerStep { token: StepToken, to: Cell },
    PlayerRefused { token: StepToken },
    Teleport {
        token: StepToken,
        gate: String,
        target: Cell,
    },
    Fall,
    Platform { index: usize, to: Cell },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct Hud {
    pub(crate) text: String,
    pub(crate) bar_fraction: f32,
    pub(crate) updates: u32,
}

impl Hud {
    fn show(&mut self, level: i32, full_level: i32) {
        self.text = format!("Oxygen: {level}%");
        self.bar_fraction = if full_level > 0 {
            (level as f32 / full_level as f32).clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.updates = self.updates.saturating_add(1);
    }
}

/// Everything the scheduler's collaborators touch for one level instance.
#[derive(Debug)]
pub(crate) struct LevelWorld {
    pub(crate) name: String,
    pub(crate) terrain: Terrain,
    pub(crate) platforms: Vec<Platform>,
    pub(crate) triggers: Vec<Trigger>,
    pub(crate) player: PlayerState,
    pub(crate) motion: MotionConfig,
    pub(crate) motions: MotionTimeline<Motion>,
    pub(crate) hud: Hud,
    full_hazard_level: i32,
    pending_command: SceneCommand,
}

impl LevelWorld {
    pub(crate) fn new(def: &LevelDef) -> Self {
        let terrain = Terrain::from_rows(&def.rows);
        let platforms: Vec<Platform> = def.platforms.iter().map(Platform::from_def).collect();
        let elevation = terrain.top_at(def.spawn).unwrap_or(0);
        Self {
            name: def.name.clone(),
            terrain,
            platforms,
            triggers: build_triggers(def),
            player: PlayerState::spawn(def.spawn, elevation, def.facing),
            motion: def.motion,
            motions: MotionTimeline::new(),
            hud: Hud {
                text: String::new(),
                bar_fraction: 0.0,
                updates: 0,
            },
            full_hazard_level: def.hazard.refill_level,
            pending_command: SceneCommand::None,
        }
    }

    /// Downward probe: a surface at or below `feet`, no deeper than `distance`.
    pub(crate) fn is_supported(&self, cell: Cell, feet: i32, distance: f32, mask: LayerMask) -> bool {
        self.support_top(cell, feet, distance, mask).is_some()
    }

    /// Highest surface the downward probe would land on.
    pub(crate) fn support_top(
        &self,
        cell: Cell,
        feet: i32,
        distance: f32,
        mask: LayerMask,
    ) -> Option<i32> {
        self.surface_tops(cell, mask)
            .filter(|top| *top <= feet && (feet - top) as f32 <= distance)
            .max()
    }

    /// Puts the player on the surface under their new cell, if there is one.
    pub(crate) fn settle_player(&mut self) {
        if let Some(top) = self.support_top(
            self.player.cell,
            self.player.elevation,
            self.motion.support_distance,
            LayerMask::SOLID,
        ) {
            self.player.elevation = top;
        }
    }

    /// Forward probe half a unit above the feet, reaching into the next cell.
    pub(crate) fn is_blocked(&self, from: Cell, feet: i32, direction: Direction) -> bool {
        let ahead = from.step(direction);
        self.surface_tops(ahead, LayerMask::SOLID)
            .any(|top| top > feet)
    }

    fn surface_tops(&self, cell: Cell, mask: LayerMask) -> impl Iterator<Item = i32> + '_ {
        let ground = mask
            .contains(LayerMask::GROUND)
            .then(|| self.terrain.top_at(cell))
            .flatten();
        let include_platforms = mask.contains(LayerMask::PLATFORM);
        let platforms = self
            .platforms
            .iter()
            .filter(move |platform| include_platforms && platform.cell == cell)
            .map(|platform| platform.top);
        ground.into_iter().chain(platforms)
    }

    pub(crate) fn begin_teleport(&mut self, token: StepToken, gate: String, target: Cell) {
        let stage_seconds = self.motion.teleport_stage_seconds;
        info!(gate = %gate, target = %target, "teleport_started");
        self.motions.begin(
            [
                MotionStage::new("shrink", stage_seconds),
                MotionStage::new("grow", stage_seconds),
            ],
            Motion::Teleport {
                token,
                gate,
                target,
            },
        );
    }

    pub(crate) fn on_player_death(&mut self, cause: DeathCause) {
        self.player.dead = true;
        info!(level = %self.name, cause = ?cause, cell = %self.player.cell, "player_died");
        if cause == DeathCause::Fell {
            let fall_seconds = self.motion.fall_seconds;
            self.motions
                .begin([MotionStage::new("fall", fall_seconds)], Motion::Fall);
        }
    }

    /// First request wins until the loop collects it.
    pub(crate) fn request_scene_command(&mut self, command: SceneCommand) {
        if self.pending_command == SceneCommand::None {
            self.pending_command = command;
            debug!(command = ?command, "scene_command_requested");
        } else if command != self.pending_command {
            debug!(
                command = ?command,
                pending = ?self.pending_command,
                "scene_command_request_ignored"
            );
        }
    }

    pub(crate) fn take_scene_command(&mut self) -> SceneCommand {
        std::mem::replace(&mut self.pending_command, SceneCommand::None)
    }

    #[cfg(test)]
    pub(crate) fn pending_scene_command(&self) -> SceneCommand {
        self.pending_command
    }
}

impl TurnHost for LevelWorld {
    fn is_actor_supported(&self) -> bool {
        self.is_supported(
            self.player.cell,
            self.player.elevation,
            self.motion.support_distance,
            LayerMask::SOLID,
        )
    }

    fn update_hazard_display(&mut self, level: i32) {
        self.hud.show(level, self.full_hazard_level);
        debug!(text = %self.hud.text, "hud_updated");
    }

    fn actor_incapacitated(&mut self) {
        self.player.suffocate();
        info!(level = %self.name, "player_suffocating");
    }

    fn reload_level(&mut self) {
        self.request_scene_command(SceneCommand::Reload);
    }
}
