mod console;
pub(crate) mod console_commands;

pub use console::ConsoleState;
pub use console_commands::{ConsoleCommandProcessor, DebugCommand};
