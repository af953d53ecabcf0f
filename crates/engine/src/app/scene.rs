use thiserror::Error;
use tracing::info;

use super::input::{ActionStates, InputAction};
use crate::turn::Direction;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneCommand {
    None,
    Reload,
    LoadNext,
    Quit,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SceneDebugCommand {
    SetHazardLevel { level: i32 },
    SetHazardLoss { loss_per_tick: i32 },
    GodMode { enabled: Option<bool> },
    DumpState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneDebugCommandResult {
    Unsupported,
    Success(String),
    Error(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputSnapshot {
    quit_requested: bool,
    actions: ActionStates,
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested || self.actions.is_pressed(InputAction::Quit)
    }

    pub fn is_pressed(&self, action: InputAction) -> bool {
        self.actions.is_pressed(action)
    }

    pub fn with_action_pressed(mut self, action: InputAction, is_pressed: bool) -> Self {
        self.actions.set(action, is_pressed);
        self
    }

    pub fn with_quit_requested(mut self, quit_requested: bool) -> Self {
        self.quit_requested = quit_requested;
        self
    }

    /// First move pressed this tick, in Up, Down, Left, Right order.
    pub fn pressed_direction(&self) -> Direction {
        InputAction::MOVES
            .into_iter()
            .find(|action| self.actions.is_pressed(*action))
            .map(InputAction::direction)
            .unwrap_or_default()
    }
}

/// One playable level instance. A reload always builds a fresh one.
pub trait Scene {
    fn name(&self) -> &str;

    fn load(&mut self) {}

    fn update(&mut self, fixed_dt_seconds: f32, input: &InputSnapshot) -> SceneCommand;

    fn execute_debug_command(&mut self, _command: SceneDebugCommand) -> SceneDebugCommandResult {
        SceneDebugCommandResult::Unsupported
    }

    fn unload(&mut self) {}
}

pub trait SceneFactory {
    fn scene_count(&self) -> usize;

    fn build(&self, index: usize) -> Result<Box<dyn Scene>, SceneBuildError>;
}

#[derive(Debug, Error)]
pub enum SceneBuildError {
    #[error("scene index {index} is out of range ({count} scenes)")]
    OutOfRange { index: usize, count: usize },
    #[error("failed to build scene '{name}': {message}")]
    Failed { name: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneTransition {
    Stay,
    Reloaded,
    Advanced { index: usize },
    CampaignComplete,
    QuitRequested,
}

/// Owns the active scene and rebuilds it from the factory on reload or advance.
pub struct SceneMachine {
    factory: Box<dyn SceneFactory>,
    active_index: usize,
    active: Box<dyn Scene>,
    reload_count: u32,
}

impl SceneMachine {
    pub fn start(factory: Box<dyn SceneFactory>, index: usize) -> Result<Self, SceneBuildError> {
        let mut active = factory.build(index)?;
        active.load();
        info!(scene = active.name(), index, "scene_loaded");
        Ok(Self {
            factory,
            active_index: index,
            active,
            reload_count: 0,
        })
    }

    pub fn active_index(&self) -> usize {
        self.active_index
    }

    pub fn active_scene_name(&self) -> &str {
        self.active.name()
    }

    pub fn reload_count(&self) -> u32 {
        self.reload_count
    }

    pub fn update_active(&mut self, fixed_dt_seconds: f32, input: &InputSnapshot) -> SceneCommand {
        self.active.update(fixed_dt_seconds, input)
    }

    pub fn execute_debug_command_active(
        &mut self,
        command: SceneDebugCommand,
    ) -> SceneDebugCommandResult {
        self.active.execute_debug_command(command)
    }

    pub fn apply(&mut self, command: SceneCommand) -> Result<SceneTransition, SceneBuildError> {
        match command {
            SceneCommand::None => Ok(SceneTransition::Stay),
            SceneCommand::Quit => Ok(SceneTransition::QuitRequested),
            SceneCommand::Reload => {
                self.replace_active(self.active_index)?;
                self.reload_count = self.reload_count.saturating_add(1);
                Ok(SceneTransition::Reloaded)
            }
            SceneCommand::LoadNext => {
                let next = self.active_index.saturating_add(1);
                if next >= self.factory.scene_count() {
                    info!(scene = self.active.name(), "campaign_complete");
                    return Ok(SceneTransition::CampaignComplete);
                }
                self.replace_active(next)?;
                Ok(SceneTransition::Advanced { index: next })
            }
        }
    }

    pub fn shutdown(&mut self) {
        self.active.unload();
        info!(scene = self.active.name(), "scene_unloaded");
    }

    fn replace_active(&mut self, index: usize) -> Result<(), SceneBuildError> {
        let mut next = self.factory.build(index)?;
        self.active.unload();
        next.load();
        info!(
            from = self.active.name(),
            to = next.name(),
            index,
            "scene_switched"
        );
        self.active = next;
        self.active_index = index;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    struct CountingScene {
        name: String,
        events: Rc<RefCell<Vec<String>>>,
        command: SceneCommand,
    }

    impl Scene for CountingScene {
        fn name(&self) -> &str {
            &self.name
        }

        fn load(&mut self) {
            self.events.borrow_mut().push(format!("load {}", self.name));
        }

        fn update(&mut self, _fixed_dt_seconds: f32, _input: &InputSnapshot) -> SceneCommand {
            self.command
        }

        fn unload(&mut self) {
            self.events.borrow_mut().push(format!("unload {}", self.name));
        }
    }

    struct Factory {
        names: Vec<&'static str>,
        events: Rc<RefCell<Vec<String>>>,
    }

    impl SceneFactory for Factory {
        fn scene_count(&self) -> usize {
            self.names.len()
        }

        fn build(&self, index: usize) -> Result<Box<dyn Scene>, SceneBuildError> {
            let name = self.names.get(index).ok_or(SceneBuildError::OutOfRange {
                index,
                count: self.names.len(),
            })?;
            Ok(Box::new(CountingScene {
                name: (*name).to_string(),
                events: Rc::clone(&self.events),
                command: SceneCommand::LoadNext,
            }))
        }
    }

    fn machine(names: Vec<&'static str>) -> (SceneMachine, Rc<RefCell<Vec<String>>>) {
        let events = Rc::new(RefCell::new(Vec::new()));
        let factory = Factory {
            names,
            events: Rc::clone(&events),
        };
        let machine = SceneMachine::start(Box::new(factory), 0).expect("first scene builds");
        (machine, events)
    }

    #[test]
    fn reload_builds_a_fresh_instance_of_the_same_scene() {
        let (mut machine, events) = machine(vec!["level_00", "level_01"]);

        let transition = machine.apply(SceneCommand::Reload).expect("reload");

        assert_eq!(transition, SceneTransition::Reloaded);
        assert_eq!(machine.active_index(), 0);
        assert_eq!(machine.reload_count(), 1);
        assert_eq!(
            *events.borrow(),
            vec!["load level_00", "unload level_00", "load level_00"]
        );
    }

    #[test]
    fn advancing_past_the_last_scene_completes_the_campaign() {
        let (mut machine, _events) = machine(vec!["level_00", "level_01"]);

        let command = machine.update_active(0.016, &InputSnapshot::empty());
        assert_eq!(
            machine.apply(command).expect("advance"),
            SceneTransition::Advanced { index: 1 }
        );
        assert_eq!(machine.active_scene_name(), "level_01");

        assert_eq!(
            machine.apply(SceneCommand::LoadNext).expect("advance"),
            SceneTransition::CampaignComplete
        );
        assert_eq!(machine.active_scene_name(), "level_01");
    }

    #[test]
    fn start_out_of_range_reports_error() {
        let events = Rc::new(RefCell::new(Vec::new()));
        let factory = Factory {
            names: Vec::new(),
            events,
        };

        let error = SceneMachine::start(Box::new(factory), 0)
            .err()
            .expect("empty campaign cannot start");

        assert!(matches!(
            error,
            SceneBuildError::OutOfRange { index: 0, count: 0 }
        ));
    }

    #[test]
    fn pressed_direction_prefers_declaration_order() {
        let input = InputSnapshot::empty()
            .with_action_pressed(InputAction::MoveRight, true)
            .with_action_pressed(InputAction::MoveDown, true);

        assert_eq!(input.pressed_direction(), Direction::Down);
        assert_eq!(InputSnapshot::empty().pressed_direction(), Direction::None);
        assert!(InputSnapshot::empty()
            .with_action_pressed(InputAction::Quit, true)
            .quit_requested());
    }
}
