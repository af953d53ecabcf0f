use std::collections::VecDeque;
use std::io::{self, BufRead, Write};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info, warn};

use super::metrics::{LoopMetricsSnapshot, MetricsAccumulator};
use super::scene::{SceneBuildError, SceneMachine, SceneTransition};
use super::tools::{ConsoleCommandProcessor, ConsoleState, DebugCommand};
use super::{
    InputAction, InputSnapshot, SceneCommand, SceneDebugCommandResult, SceneFactory,
};

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub target_tps: u32,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
    /// Sleep to the wall clock. When off, every frame is exactly one fixed tick.
    pub realtime: bool,
    pub max_ticks: Option<u64>,
    pub metrics_log_interval: Duration,
    pub start_index: usize,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            target_tps: 60,
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 5,
            realtime: true,
            max_ticks: None,
            metrics_log_interval: Duration::from_secs(5),
            start_index: 0,
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to build scene: {0}")]
    SceneBuild(#[from] SceneBuildError),
    #[error("failed to write console output: {0}")]
    Output(#[source] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopOutcome {
    Quit,
    CampaignComplete,
    TickLimit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoopSummary {
    pub outcome: LoopOutcome,
    pub ticks: u64,
    pub reloads: u32,
    pub scene_index: usize,
    pub scene_name: String,
    pub last_metrics: Option<LoopMetricsSnapshot>,
}

/// Operator lines delivered to the loop. Polled once per tick.
pub trait LineSource {
    fn poll_lines(&mut self, tick: u64, out: &mut Vec<String>);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoLines;

impl LineSource for NoLines {
    fn poll_lines(&mut self, _tick: u64, _out: &mut Vec<String>) {}
}

/// Lines read from stdin by a background thread.
#[derive(Debug)]
pub struct StdinLines {
    receiver: Receiver<String>,
    closed: bool,
}

impl StdinLines {
    pub fn spawn() -> Self {
        let (sender, receiver) = mpsc::channel();
        let spawned = thread::Builder::new()
            .name("console-stdin".to_string())
            .spawn(move || {
                let stdin = io::stdin();
                for line in stdin.lock().lines() {
                    match line {
                        Ok(line) => {
                            if sender.send(line).is_err() {
                                break;
                            }
                        }
                        Err(error) => {
                            warn!(error = %error, "console_stdin_read_failed");
                            break;
                        }
                    }
                }
                debug!("console_stdin_closed");
            });
        if let Err(error) = spawned {
            warn!(error = %error, "console_stdin_thread_failed");
        }
        Self {
            receiver,
            closed: false,
        }
    }
}

impl LineSource for StdinLines {
    fn poll_lines(&mut self, _tick: u64, out: &mut Vec<String>) {
        while !self.closed {
            match self.receiver.try_recv() {
                Ok(line) => out.push(line),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => self.closed = true,
            }
        }
    }
}

/// Lines released at fixed tick numbers. Useful for scripted sessions.
#[derive(Debug, Default, Clone)]
pub struct ScriptedLines {
    lines: VecDeque<(u64, String)>,
}

impl ScriptedLines {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = (u64, S)>,
        S: Into<String>,
    {
        let mut lines: Vec<(u64, String)> = lines
            .into_iter()
            .map(|(tick, line)| (tick, line.into()))
            .collect();
        lines.sort_by_key(|(tick, _)| *tick);
        Self {
            lines: lines.into(),
        }
    }
}

impl LineSource for ScriptedLines {
    fn poll_lines(&mut self, tick: u64, out: &mut Vec<String>) {
        while self
            .lines
            .front()
            .is_some_and(|(due_tick, _)| *due_tick <= tick)
        {
            if let Some((_, line)) = self.lines.pop_front() {
                out.push(line);
            }
        }
    }
}

pub fn run_app<W: Write>(
    config: LoopConfig,
    factory: Box<dyn SceneFactory>,
    lines: &mut dyn LineSource,
    out: &mut W,
) -> Result<LoopSummary, AppError> {
    let target_tps = config.target_tps.max(1);
    let max_frame_delta =
        normalize_non_zero_duration(config.max_frame_delta, Duration::from_millis(250));
    let max_ticks_per_frame = config.max_ticks_per_frame.max(1);
    let metrics_log_interval =
        normalize_non_zero_duration(config.metrics_log_interval, Duration::from_secs(5));
    let fixed_dt = Duration::from_secs_f64(1.0 / target_tps as f64);
    let fixed_dt_seconds = fixed_dt.as_secs_f32();

    info!(
        target_tps,
        max_frame_delta_ms = max_frame_delta.as_millis() as u64,
        max_ticks_per_frame,
        realtime = config.realtime,
        max_ticks = config.max_ticks.unwrap_or(0),
        "loop_config"
    );

    let mut scenes = SceneMachine::start(factory, config.start_index)?;
    let mut driver = TickDriver::default();

    let mut accumulator = Duration::ZERO;
    let mut last_frame_instant = Instant::now();
    let mut metrics = MetricsAccumulator::new(metrics_log_interval, last_frame_instant);
    let mut last_metrics = None;
    let mut ticks: u64 = 0;

    let outcome = 'frames: loop {
        let step_plan = if config.realtime {
            let now = Instant::now();
            let raw_frame_dt = now.saturating_duration_since(last_frame_instant);
            last_frame_instant = now;
            accumulator = accumulator.saturating_add(clamp_frame_delta(raw_frame_dt, max_frame_delta));
            plan_sim_steps(accumulator, fixed_dt, max_ticks_per_frame)
        } else {
            StepPlan {
                ticks_to_run: 1,
                remaining_accumulator: Duration::ZERO,
                dropped_backlog: Duration::ZERO,
            }
        };

        for _ in 0..step_plan.ticks_to_run {
            if config.max_ticks.is_some_and(|limit| ticks >= limit) {
                break 'frames LoopOutcome::TickLimit;
            }
            let outcome = driver.run_tick(ticks, fixed_dt_seconds, &mut scenes, lines)?;
            driver.flush_output(out)?;
            ticks = ticks.saturating_add(1);
            metrics.record_tick();
            if let Some(outcome) = outcome {
                break 'frames outcome;
            }
        }
        accumulator = step_plan.remaining_accumulator;

        if step_plan.dropped_backlog > Duration::ZERO {
            warn!(
                dropped_backlog_ms = step_plan.dropped_backlog.as_millis() as u64,
                max_ticks_per_frame, "sim_clamp_triggered"
            );
        }
        metrics.record_frame(step_plan.dropped_backlog);

        let now = Instant::now();
        if let Some(snapshot) = metrics.maybe_snapshot(now) {
            info!(
                tps = snapshot.tps,
                frames = snapshot.frames,
                dropped_backlog_ms = snapshot.dropped_backlog_ms,
                scene = scenes.active_scene_name(),
                "loop_metrics"
            );
            last_metrics = Some(snapshot);
        }

        if config.realtime {
            let elapsed = Instant::now().saturating_duration_since(last_frame_instant);
            let cap_sleep = compute_cap_sleep(elapsed, Some(fixed_dt));
            if cap_sleep > Duration::ZERO {
                thread::sleep(cap_sleep);
            }
        }
    };

    let summary = LoopSummary {
        outcome,
        ticks,
        reloads: scenes.reload_count(),
        scene_index: scenes.active_index(),
        scene_name: scenes.active_scene_name().to_string(),
        last_metrics,
    };
    scenes.shutdown();
    info!(
        outcome = ?summary.outcome,
        ticks = summary.ticks,
        reloads = summary.reloads,
        scene = %summary.scene_name,
        "shutdown"
    );
    Ok(summary)
}

/// Console plumbing plus the per-tick translation of operator commands into scene input.
#[derive(Default)]
struct TickDriver {
    console: ConsoleState,
    processor: ConsoleCommandProcessor,
    line_buffer: Vec<String>,
    command_buffer: Vec<DebugCommand>,
    queued_moves: VecDeque<InputAction>,
    output_buffer: Vec<String>,
}

impl TickDriver {
    fn run_tick(
        &mut self,
        tick: u64,
        fixed_dt_seconds: f32,
        scenes: &mut SceneMachine,
        lines: &mut dyn LineSource,
    ) -> Result<Option<LoopOutcome>, AppError> {
        self.line_buffer.clear();
        lines.poll_lines(tick, &mut self.line_buffer);
        for line in &self.line_buffer {
            self.console.submit_line(line);
        }
        self.processor.process_pending_lines(&mut self.console);

        self.command_buffer.clear();
        self.processor
            .drain_pending_debug_commands_into(&mut self.command_buffer);

        let mut operator_command = SceneCommand::None;
        let mut quit_requested = false;
        for command in self.command_buffer.drain(..) {
            match command {
                DebugCommand::Move { direction } => {
                    if let Some(action) = InputAction::from_direction(direction) {
                        self.queued_moves.push_back(action);
                    }
                }
                DebugCommand::Reload => operator_command = SceneCommand::Reload,
                DebugCommand::NextLevel => operator_command = SceneCommand::LoadNext,
                DebugCommand::Quit => quit_requested = true,
                DebugCommand::Scene(scene_command) => {
                    let line = match scenes.execute_debug_command_active(scene_command) {
                        SceneDebugCommandResult::Success(message) => message,
                        SceneDebugCommandResult::Error(message) => format!("error: {message}"),
                        SceneDebugCommandResult::Unsupported => {
                            "error: command not supported by the active scene".to_string()
                        }
                    };
                    self.console.append_output_line(line);
                }
            }
        }

        let mut input = InputSnapshot::empty().with_quit_requested(quit_requested);
        if let Some(action) = self.queued_moves.pop_front() {
            input = input.with_action_pressed(action, true);
        }
        if input.quit_requested() {
            info!(reason = "console_quit", "shutdown_requested");
            return Ok(Some(LoopOutcome::Quit));
        }

        let mut command = scenes.update_active(fixed_dt_seconds, &input);
        if command == SceneCommand::None {
            command = operator_command;
        }
        let outcome = match scenes.apply(command)? {
            SceneTransition::Stay => None,
            SceneTransition::Reloaded | SceneTransition::Advanced { .. } => {
                self.queued_moves.clear();
                None
            }
            SceneTransition::CampaignComplete => Some(LoopOutcome::CampaignComplete),
            SceneTransition::QuitRequested => Some(LoopOutcome::Quit),
        };
        Ok(outcome)
    }

    fn flush_output<W: Write>(&mut self, out: &mut W) -> Result<(), AppError> {
        self.output_buffer.clear();
        self.console.drain_output_lines_into(&mut self.output_buffer);
        for line in &self.output_buffer {
            writeln!(out, "{line}").map_err(AppError::Output)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct StepPlan {
    ticks_to_run: u32,
    remaining_accumulator: Duration,
    dropped_backlog: Duration,
}

fn plan_sim_steps(
    mut accumulator: Duration,
    fixed_dt: Duration,
    max_ticks_per_frame: u32,
) -> StepPlan {
    let mut ticks_to_run = 0u32;

    while accumulator >= fixed_dt && ticks_to_run < max_ticks_per_frame {
        accumulator = accumulator.saturating_sub(fixed_dt);
        ticks_to_run = ticks_to_run.saturating_add(1);
    }

    let dropped_backlog = if accumulator >= fixed_dt {
        std::mem::take(&mut accumulator)
    } else {
        Duration::ZERO
    };
    StepPlan {
        ticks_to_run,
        remaining_accumulator: accumulator,
        dropped_backlog,
    }
}

fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

fn compute_cap_sleep(elapsed: Duration, target: Option<Duration>) -> Duration {
    match target {
        Some(frame_target) if elapsed < frame_target => frame_target - elapsed,
        _ => Duration::ZERO,
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::app::{Scene, SceneDebugCommand};
    use crate::turn::Direction;

    #[test]
    fn clamp_frame_delta_caps_large_frame() {
        let max_frame_delta = Duration::from_millis(250);
        let raw_frame_dt = Duration::from_millis(600);

        assert_eq!(
            clamp_frame_delta(raw_frame_dt, max_frame_delta),
            max_frame_delta
        );
    }

    #[test]
    fn plan_sim_steps_runs_expected_ticks_without_drop() {
        let fixed_dt = Duration::from_millis(16);
        let result = plan_sim_steps(Duration::from_millis(48), fixed_dt, 5);

        assert_eq!(result.ticks_to_run, 3);
        assert_eq!(result.remaining_accumulator, Duration::ZERO);
        assert_eq!(result.dropped_backlog, Duration::ZERO);
    }

    #[test]
    fn plan_sim_steps_drops_backlog_when_tick_cap_hit() {
        let fixed_dt = Duration::from_millis(16);
        let result = plan_sim_steps(Duration::from_millis(120), fixed_dt, 3);

        assert_eq!(result.ticks_to_run, 3);
        assert_eq!(result.remaining_accumulator, Duration::ZERO);
        assert_eq!(result.dropped_backlog, Duration::from_millis(72));
    }

    #[test]
    fn compute_cap_sleep_zero_when_over_budget() {
        let target = Some(Duration::from_millis(16));
        assert_eq!(
            compute_cap_sleep(Duration::from_millis(20), target),
            Duration::ZERO
        );
        assert!(compute_cap_sleep(Duration::from_millis(5), target) > Duration::ZERO);
        assert_eq!(compute_cap_sleep(Duration::ZERO, None), Duration::ZERO);
    }

    #[derive(Default)]
    struct Record {
        moves: Vec<Direction>,
        debug: Vec<SceneDebugCommand>,
        builds: Vec<usize>,
    }

    struct RecordingScene {
        name: String,
        record: Rc<RefCell<Record>>,
        finish_after_ticks: Option<u32>,
        ticks: u32,
    }

    impl Scene for RecordingScene {
        fn name(&self) -> &str {
            &self.name
        }

        fn update(&mut self, _fixed_dt_seconds: f32, input: &InputSnapshot) -> SceneCommand {
            self.ticks += 1;
            let direction = input.pressed_direction();
            if !direction.is_none() {
                self.record.borrow_mut().moves.push(direction);
            }
            match self.finish_after_ticks {
                Some(limit) if self.ticks >= limit => SceneCommand::LoadNext,
                _ => SceneCommand::None,
            }
        }

        fn execute_debug_command(&mut self, command: SceneDebugCommand) -> SceneDebugCommandResult {
            self.record.borrow_mut().debug.push(command.clone());
            match command {
                SceneDebugCommand::DumpState => SceneDebugCommandResult::Success("ok".to_string()),
                _ => SceneDebugCommandResult::Unsupported,
            }
        }
    }

    struct RecordingFactory {
        record: Rc<RefCell<Record>>,
        finish_after_ticks: Option<u32>,
        count: usize,
    }

    impl SceneFactory for RecordingFactory {
        fn scene_count(&self) -> usize {
            self.count
        }

        fn build(&self, index: usize) -> Result<Box<dyn crate::app::Scene>, SceneBuildError> {
            if index >= self.count {
                return Err(SceneBuildError::OutOfRange {
                    index,
                    count: self.count,
                });
            }
            self.record.borrow_mut().builds.push(index);
            Ok(Box::new(RecordingScene {
                name: format!("level_{index:02}"),
                record: Rc::clone(&self.record),
                finish_after_ticks: self.finish_after_ticks,
                ticks: 0,
            }))
        }
    }

    fn headless(max_ticks: Option<u64>) -> LoopConfig {
        LoopConfig {
            realtime: false,
            max_ticks,
            ..LoopConfig::default()
        }
    }

    #[test]
    fn console_moves_reach_the_scene_one_per_tick() {
        let record = Rc::new(RefCell::new(Record::default()));
        let factory = RecordingFactory {
            record: Rc::clone(&record),
            finish_after_ticks: None,
            count: 1,
        };
        let mut lines = ScriptedLines::new([(0, "move up"), (0, "move left"), (3, "quit")]);
        let mut out = Vec::new();

        let summary =
            run_app(headless(Some(100)), Box::new(factory), &mut lines, &mut out).expect("run");

        assert_eq!(summary.outcome, LoopOutcome::Quit);
        assert_eq!(summary.ticks, 4);
        assert_eq!(record.borrow().moves, vec![Direction::Up, Direction::Left]);
    }

    #[test]
    fn scene_debug_replies_are_written_to_output() {
        let record = Rc::new(RefCell::new(Record::default()));
        let factory = RecordingFactory {
            record: Rc::clone(&record),
            finish_after_ticks: None,
            count: 1,
        };
        let mut lines = ScriptedLines::new([(0, "status"), (0, "god on"), (1, "bogus")]);
        let mut out = Vec::new();

        let summary =
            run_app(headless(Some(2)), Box::new(factory), &mut lines, &mut out).expect("run");

        assert_eq!(summary.outcome, LoopOutcome::TickLimit);
        let text = String::from_utf8(out).expect("utf8");
        assert_eq!(
            text,
            "ok\n\
error: command not supported by the active scene\n\
error: unknown command 'bogus'. try: help\n"
        );
        assert_eq!(record.borrow().debug.len(), 2);
    }

    #[test]
    fn reload_and_campaign_completion_are_applied() {
        let record = Rc::new(RefCell::new(Record::default()));
        let factory = RecordingFactory {
            record: Rc::clone(&record),
            finish_after_ticks: Some(5),
            count: 2,
        };
        let mut lines = ScriptedLines::new([(1, "reload")]);
        let mut out = Vec::new();

        let summary =
            run_app(headless(Some(1_000)), Box::new(factory), &mut lines, &mut out).expect("run");

        assert_eq!(summary.outcome, LoopOutcome::CampaignComplete);
        assert_eq!(summary.reloads, 1);
        assert_eq!(summary.scene_index, 1);
        assert_eq!(record.borrow().builds, vec![0, 0, 1]);
    }
}
