mod input;
mod loop_runner;
mod metrics;
mod scene;
mod tools;

pub use input::InputAction;
pub use loop_runner::{
    run_app, AppError, LineSource, LoopConfig, LoopOutcome, LoopSummary, NoLines, ScriptedLines,
    StdinLines,
};
pub use metrics::LoopMetricsSnapshot;
pub use scene::{
    InputSnapshot, Scene, SceneBuildError, SceneCommand, SceneDebugCommand,
    SceneDebugCommandResult, SceneFactory, SceneMachine, SceneTransition,
};
pub use tools::{ConsoleCommandProcessor, ConsoleState, DebugCommand};
