use std::collections::{HashMap, VecDeque};

use crate::app::SceneDebugCommand;
use crate::turn::Direction;

use super::ConsoleState;

const MAX_PENDING_DEBUG_COMMANDS: usize = 128;

/// Commands the loop applies after the console has parsed them.
#[derive(Debug, Clone, PartialEq)]
pub enum DebugCommand {
    Move { direction: Direction },
    Reload,
    NextLevel,
    Quit,
    Scene(SceneDebugCommand),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum LocalAction {
    Help,
    Clear,
    Echo { text: String },
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ParsedCommand {
    Local(LocalAction),
    Queueable(DebugCommand),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CommandParseError {
    reason: String,
    usage: String,
}

impl CommandParseError {
    fn new(reason: impl Into<String>, usage: &str) -> Self {
        Self {
            reason: reason.into(),
            usage: usage.to_string(),
        }
    }
}

type ParseFn = dyn Fn(&[String]) -> Result<ParsedCommand, CommandParseError> + Send + Sync;

pub(crate) struct CommandSpec {
    name: String,
    help: String,
    arg_schema: String,
    parse: Box<ParseFn>,
}

pub(crate) struct ConsoleCommandRegistry {
    specs: Vec<CommandSpec>,
    lookup_by_lower_name: HashMap<String, usize>,
}

impl ConsoleCommandRegistry {
    pub(crate) fn new() -> Self {
        Self {
            specs: Vec::new(),
            lookup_by_lower_name: HashMap::new(),
        }
    }

    pub(crate) fn with_builtins() -> Self {
        let mut registry = Self::new();
        let builtins: [(&str, &str, &str, fn(&[String]) -> _); 11] = [
            ("help", "List commands", "", parse_help_command),
            ("clear", "Clear console output", "", parse_clear_command),
            ("echo", "Print text to console", "<text...>", parse_echo_command),
            (
                "move",
                "Submit one step",
                "<direction:up|down|left|right>",
                parse_move_command,
            ),
            (
                "oxygen",
                "Set the oxygen level",
                "<level:i32>",
                parse_oxygen_command,
            ),
            (
                "oxygen_loss",
                "Set oxygen lost per clock tick",
                "<amount:i32>",
                parse_oxygen_loss_command,
            ),
            (
                "god",
                "Toggle or set invulnerability",
                "[on|off]",
                parse_god_command,
            ),
            ("status", "Print scheduler state", "", parse_status_command),
            ("reload", "Reload the active level", "", parse_reload_command),
            ("next_level", "Load the next level", "", parse_next_level_command),
            ("quit", "Quit", "", parse_quit_command),
        ];
        for (name, help, arg_schema, parse) in builtins {
            if let Err(error) = registry.register(name, help, arg_schema, parse) {
                tracing::error!(command = name, error = %error, "builtin_command_rejected");
            }
        }
        registry
    }

    pub(crate) fn register<F>(
        &mut self,
        name: impl Into<String>,
        help: impl Into<String>,
        arg_schema: impl Into<String>,
        parse: F,
    ) -> Result<(), String>
    where
        F: Fn(&[String]) -> Result<ParsedCommand, CommandParseError> + Send + Sync + 'static,
    {
        let name = name.into();
        if name.trim().is_empty() {
            return Err("command name cannot be empty".to_string());
        }
        let lower = name.to_ascii_lowercase();
        if self.lookup_by_lower_name.contains_key(&lower) {
            return Err(format!("duplicate command registration: {name}"));
        }

        self.specs.push(CommandSpec {
            name,
            help: help.into(),
            arg_schema: arg_schema.into(),
            parse: Box::new(parse),
        });
        self.lookup_by_lower_name
            .insert(lower, self.specs.len() - 1);
        Ok(())
    }

    pub(crate) fn lookup(&self, input_name: &str) -> Option<&CommandSpec> {
        let index = self
            .lookup_by_lower_name
            .get(&input_name.to_ascii_lowercase())?;
        self.specs.get(*index)
    }

    pub(crate) fn iter_specs_in_order(&self) -> impl Iterator<Item = &CommandSpec> {
        self.specs.iter()
    }
}

/// Parses console lines into local replies or queued [`DebugCommand`]s.
pub struct ConsoleCommandProcessor {
    registry: ConsoleCommandRegistry,
    pending_debug_commands: VecDeque<DebugCommand>,
}

impl Default for ConsoleCommandProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleCommandProcessor {
    pub fn new() -> Self {
        Self {
            registry: ConsoleCommandRegistry::with_builtins(),
            pending_debug_commands: VecDeque::new(),
        }
    }

    pub fn process_pending_lines(&mut self, console: &mut ConsoleState) {
        let mut lines = Vec::new();
        console.drain_pending_lines_into(&mut lines);

        for raw_line in lines {
            self.process_line(console, &raw_line);
        }
    }

    pub fn drain_pending_debug_commands_into(&mut self, out: &mut Vec<DebugCommand>) {
        out.extend(self.pending_debug_commands.drain(..));
    }

    fn process_line(&mut self, console: &mut ConsoleState, raw_line: &str) {
        let tokens = match tokenize_line(raw_line.trim()) {
            Ok(tokens) => tokens,
            Err(reason) => {
                console.append_output_line(format!("error: {reason}. usage: help"));
                return;
            }
        };
        let Some((command_name, args)) = tokens.split_first() else {
            return;
        };

        let Some(spec) = self.registry.lookup(command_name) else {
            console.append_output_line(format!(
                "error: unknown command '{command_name}'. try: help"
            ));
            return;
        };

        match (spec.parse)(args) {
            Ok(ParsedCommand::Local(action)) => self.apply_local_action(console, action),
            Ok(ParsedCommand::Queueable(command)) => self.push_queueable(command),
            Err(error) => {
                console
                    .append_output_line(format!("error: {}. usage: {}", error.reason, error.usage));
            }
        }
    }

    fn apply_local_action(&self, console: &mut ConsoleState, action: LocalAction) {
        match action {
            LocalAction::Help => {
                for spec in self.registry.iter_specs_in_order() {
                    let line = if spec.arg_schema.is_empty() {
                        format!("{} - {}", spec.name, spec.help)
                    } else {
                        format!("{} {} - {}", spec.name, spec.arg_schema, spec.help)
                    };
                    console.append_output_line(line);
                }
            }
            LocalAction::Clear => console.clear_output_lines(),
            LocalAction::Echo { text } => console.append_output_line(text),
        }
    }

    fn push_queueable(&mut self, command: DebugCommand) {
        if self.pending_debug_commands.len() == MAX_PENDING_DEBUG_COMMANDS {
            self.pending_debug_commands.pop_front();
        }
        self.pending_debug_commands.push_back(command);
    }
}

/// Splits on whitespace; double quotes group words and may produce an empty token.
fn tokenize_line(line: &str) -> Result<Vec<String>, String> {
    let mut tokens = Vec::new();
    let mut current: Option<String> = None;
    let mut in_quotes = false;

    for ch in line.chars() {
        if ch == '"' {
            in_quotes = !in_quotes;
            current.get_or_insert_with(String::new);
        } else if ch.is_whitespace() && !in_quotes {
            if let Some(token) = current.take() {
                tokens.push(token);
            }
        } else {
            current.get_or_insert_with(String::new).push(ch);
        }
    }

    if in_quotes {
        return Err("unterminated quoted string".to_string());
    }
    tokens.extend(current);
    Ok(tokens)
}

fn parse_help_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    require_no_args(args, "help")?;
    Ok(ParsedCommand::Local(LocalAction::Help))
}

fn parse_clear_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    require_no_args(args, "clear")?;
    Ok(ParsedCommand::Local(LocalAction::Clear))
}

fn parse_echo_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    if args.is_empty() {
        return Err(CommandParseError::new(
            "missing required argument <text...>",
            "echo <text...>",
        ));
    }
    Ok(ParsedCommand::Local(LocalAction::Echo {
        text: args.join(" "),
    }))
}

fn parse_move_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    const USAGE: &str = "move <direction>";
    let [raw] = args else {
        return Err(CommandParseError::new(
            "expected exactly one argument <direction>",
            USAGE,
        ));
    };
    match Direction::from_token(raw) {
        Some(direction) if !direction.is_none() => {
            Ok(ParsedCommand::Queueable(DebugCommand::Move { direction }))
        }
        _ => Err(CommandParseError::new(
            format!("unknown direction '{raw}' (expected up|down|left|right)"),
            USAGE,
        )),
    }
}

fn parse_oxygen_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    let level = parse_single_i32(args, "level", "oxygen <level>")?;
    Ok(ParsedCommand::Queueable(DebugCommand::Scene(
        SceneDebugCommand::SetHazardLevel { level },
    )))
}

fn parse_oxygen_loss_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    let loss_per_tick = parse_single_i32(args, "amount", "oxygen_loss <amount>")?;
    Ok(ParsedCommand::Queueable(DebugCommand::Scene(
        SceneDebugCommand::SetHazardLoss { loss_per_tick },
    )))
}

fn parse_god_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    const USAGE: &str = "god [on|off]";
    let enabled = match args {
        [] => None,
        [raw] => match raw.to_ascii_lowercase().as_str() {
            "on" | "true" | "1" => Some(true),
            "off" | "false" | "0" => Some(false),
            _ => {
                return Err(CommandParseError::new(
                    format!("invalid switch '{raw}' (expected on|off)"),
                    USAGE,
                ))
            }
        },
        _ => return Err(CommandParseError::new("unexpected extra arguments", USAGE)),
    };
    Ok(ParsedCommand::Queueable(DebugCommand::Scene(
        SceneDebugCommand::GodMode { enabled },
    )))
}

fn parse_status_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    require_no_args(args, "status")?;
    Ok(ParsedCommand::Queueable(DebugCommand::Scene(
        SceneDebugCommand::DumpState,
    )))
}

fn parse_reload_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    require_no_args(args, "reload")?;
    Ok(ParsedCommand::Queueable(DebugCommand::Reload))
}

fn parse_next_level_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    require_no_args(args, "next_level")?;
    Ok(ParsedCommand::Queueable(DebugCommand::NextLevel))
}

fn parse_quit_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    require_no_args(args, "quit")?;
    Ok(ParsedCommand::Queueable(DebugCommand::Quit))
}

fn parse_single_i32(args: &[String], name: &str, usage: &str) -> Result<i32, CommandParseError> {
    let [raw] = args else {
        return Err(CommandParseError::new(
            format!("expected exactly one argument <{name}>"),
            usage,
        ));
    };
    raw.parse::<i32>().map_err(|_| {
        CommandParseError::new(format!("invalid {name} '{raw}' (expected i32)"), usage)
    })
}

fn require_no_args(args: &[String], usage: &str) -> Result<(), CommandParseError> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(CommandParseError::new("unexpected extra arguments", usage))
    }
}
