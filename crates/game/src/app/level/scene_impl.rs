use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use gridfall_engine::{
    InputSnapshot, MotionEvent, Scene, SceneBuildError, SceneCommand, SceneDebugCommand,
    SceneDebugCommandResult, SceneFactory, SchedulerConfig, TurnHost, TurnScheduler, TurnSnapshot,
};
use serde::Serialize;
use tracing::{error, info, warn};

use super::def::LevelDef;
use super::demo::{demo_path, write_demo, DemoFile, DemoInput, DemoRecorder, SharedRecording};
use super::player::{PlayerController, PlayerState};
use super::triggers::enter_cell;
use super::world::{LevelWorld, Motion};

#[derive(Debug, Clone, Default)]
pub(crate) struct SceneOptions {
    pub(crate) demo: bool,
    pub(crate) record_dir: Option<PathBuf>,
    pub(crate) god_mode: bool,
}

#[derive(Serialize)]
struct StatusReport<'a> {
    level: &'a str,
    hud: &'a str,
    player: &'a PlayerState,
    active_motions: usize,
    demo_remaining: Option<usize>,
    scheduler: TurnSnapshot,
}

/// One playable level: a fresh scheduler plus the world it drives.
pub(crate) struct LevelScene {
    scheduler: TurnScheduler<LevelWorld>,
    world: LevelWorld,
    demo: Option<DemoInput>,
    recording: Option<(PathBuf, SharedRecording)>,
    motion_events: Vec<MotionEvent<Motion>>,
}

impl LevelScene {
    pub(crate) fn new(def: &LevelDef, options: &SceneOptions) -> Self {
        let mut world = LevelWorld::new(def);
        let mut scheduler = TurnScheduler::new(SchedulerConfig {
            hazard: def.hazard,
            god_mode: options.god_mode,
        });
        if let Err(error) = scheduler.register_actor(PlayerController::default()) {
            error!(error = %error, level = %def.name, "player_registration_failed");
        }
        scheduler.add_death_listener(|cause, world: &mut LevelWorld| world.on_player_death(cause));

        let recording = options.record_dir.as_ref().map(|dir| {
            let shared: SharedRecording = Rc::new(RefCell::new(Vec::new()));
            scheduler.register(DemoRecorder::new(Rc::clone(&shared)));
            (demo_path(dir, &def.name), shared)
        });
        let demo = (options.demo && !def.demo.is_empty()).then(|| DemoInput::new(&def.demo));

        world.update_hazard_display(scheduler.hazard_level());

        Self {
            scheduler,
            world,
            demo,
            recording,
            motion_events: Vec::new(),
        }
    }

    pub(crate) fn world(&self) -> &LevelWorld {
        &self.world
    }

    pub(crate) fn scheduler(&self) -> &TurnScheduler<LevelWorld> {
        &self.scheduler
    }

    fn advance_motions(&mut self, dt_seconds: f32) {
        let mut events = std::mem::take(&mut self.motion_events);
        self.world.motions.advance(dt_seconds, &mut events);

        for event in events.drain(..) {
            match event {
                MotionEvent::StageEnded { id, stage: 0, .. } => {
                    if let Some(Motion::Teleport { target, .. }) = self.world.motions.payload(id) {
                        self.world.player.cell = *target;
                    }
                }
                MotionEvent::StageEnded { .. } => {}
                MotionEvent::Finished { payload, .. } => self.finish_motion(payload),
            }
        }
        self.motion_events = events;
    }

    fn finish_motion(&mut self, motion: Motion) {
        match motion {
            Motion::PlayerStep { token, to } => {
                self.world.player.cell = to;
                self.world.settle_player();
                if self.scheduler.is_alive() {
                    enter_cell(to, &mut self.scheduler, &mut self.world);
                }
                self.scheduler.notify_step_complete(token, &mut self.world);
            }
            Motion::PlayerRefused { token } => {
                self.scheduler.notify_step_complete(token, &mut self.world);
            }
            Motion::Teleport { token, gate, target } => {
                self.world.player.cell = target;
                info!(gate = %gate, cell = %target, "teleport_finished");
                // Arriving on another gate chains into its teleport.
                if self.scheduler.is_alive() {
                    enter_cell(target, &mut self.scheduler, &mut self.world);
                }
                self.scheduler.notify_step_complete(token, &mut self.world);
            }
            Motion::Fall => {
                self.world.player.elevation -= self.world.motion.fall_distance.round() as i32;
                self.world.reload_level();
            }
            Motion::Platform { index, to } => self.world.finish_platform_move(index, to),
        }
    }

    fn status_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&StatusReport {
            level: &self.world.name,
            hud: &self.world.hud.text,
            player: &self.world.player,
            active_motions: self.world.motions.len(),
            demo_remaining: self.demo.as_ref().map(DemoInput::remaining),
            scheduler: self.scheduler.snapshot(),
        })
    }
}

impl Scene for LevelScene {
    fn name(&self) -> &str {
        &self.world.name
    }

    fn load(&mut self) {
        info!(
            level = %self.world.name,
            spawn = %self.world.player.cell,
            width = self.world.terrain.width(),
            depth = self.world.terrain.depth(),
            triggers = self.world.triggers.len(),
            platforms = self.world.platforms.len(),
            demo = self.demo.as_ref().map_or(0, DemoInput::remaining),
            god_mode = self.scheduler.god_mode(),
            "level_loaded"
        );
    }

    fn update(&mut self, fixed_dt_seconds: f32, input: &InputSnapshot) -> SceneCommand {
        let mut direction = input.pressed_direction();
        if direction.is_none() && self.scheduler.is_finished() && self.scheduler.is_alive() {
            if let Some(demo) = self.demo.as_mut() {
                direction = demo.next_direction();
            }
        }

        self.scheduler.process_input(direction, &mut self.world);
        self.scheduler.advance(fixed_dt_seconds, &mut self.world);
        self.advance_motions(fixed_dt_seconds);

        self.world.take_scene_command()
    }

    fn execute_debug_command(&mut self, command: SceneDebugCommand) -> SceneDebugCommandResult {
        match command {
            SceneDebugCommand::SetHazardLevel { level } => {
                self.scheduler.set_hazard_level(level, &mut self.world);
                SceneDebugCommandResult::Success(format!("oxygen set to {level}"))
            }
            SceneDebugCommand::SetHazardLoss { loss_per_tick } => {
                self.scheduler.set_hazard_loss_per_tick(loss_per_tick);
                SceneDebugCommandResult::Success(format!("oxygen loss set to {loss_per_tick}"))
            }
            SceneDebugCommand::GodMode { enabled } => {
                let enabled = match enabled {
                    Some(enabled) => {
                        self.scheduler.set_god_mode(enabled);
                        enabled
                    }
                    None => self.scheduler.toggle_god_mode(),
                };
                let state = if enabled { "on" } else { "off" };
                SceneDebugCommandResult::Success(format!("god mode {state}"))
            }
            SceneDebugCommand::DumpState => match self.status_json() {
                Ok(json) => SceneDebugCommandResult::Success(json),
                Err(error) => SceneDebugCommandResult::Error(format!("status failed: {error}")),
            },
        }
    }

    fn unload(&mut self) {
        let Some((path, shared)) = self.recording.as_ref() else {
            return;
        };
        let demo = DemoFile {
            level: self.world.name.clone(),
            demo: shared.borrow().clone(),
        };
        match write_demo(path, &demo) {
            Ok(()) => info!(
                path = %path.display(),
                steps = demo.demo.len(),
                "demo_recorded"
            ),
            Err(error) => warn!(path = %path.display(), error = %error, "demo_record_failed"),
        }
    }
}

/// Builds levels of the campaign in order. Every build is a fresh instance.
pub(crate) struct CampaignFactory {
    levels: Vec<LevelDef>,
    options: SceneOptions,
}

impl CampaignFactory {
    pub(crate) fn new(levels: Vec<LevelDef>, options: SceneOptions) -> Self {
        Self { levels, options }
    }
}

impl SceneFactory for CampaignFactory {
    fn scene_count(&self) -> usize {
        self.levels.len()
    }

    fn build(&self, index: usize) -> Result<Box<dyn Scene>, SceneBuildError> {
        let def = self.levels.get(index).ok_or(SceneBuildError::OutOfRange {
            index,
            count: self.levels.len(),
        })?;
        Ok(Box::new(LevelScene::new(def, &self.options)))
    }
}
