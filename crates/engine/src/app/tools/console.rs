use std::collections::VecDeque;

pub(crate) const MAX_HISTORY_LINES: usize = 64;
pub(crate) const MAX_OUTPUT_LINES: usize = 256;
pub(crate) const MAX_PENDING_LINES: usize = 64;
pub(crate) const MAX_LINE_CHARS: usize = 256;

/// Line-oriented operator console without a visual surface.
///
/// Submitted lines wait in `pending_lines` until the command processor drains
/// them; replies accumulate in `output_lines` until the loop flushes them.
#[derive(Debug, Default)]
pub struct ConsoleState {
    history: VecDeque<String>,
    output_lines: VecDeque<String>,
    pending_lines: VecDeque<String>,
}

impl ConsoleState {
    pub fn submit_line(&mut self, raw: &str) {
        let line = truncate_chars(raw.trim_end_matches(['\r', '\n']), MAX_LINE_CHARS);
        if line.trim().is_empty() {
            return;
        }

        if self.history.len() == MAX_HISTORY_LINES {
            self.history.pop_front();
        }
        self.history.push_back(line.clone());

        if self.pending_lines.len() == MAX_PENDING_LINES {
            self.pending_lines.pop_front();
        }
        self.pending_lines.push_back(line);
    }

    pub fn output_lines(&self) -> impl Iterator<Item = &str> {
        self.output_lines.iter().map(String::as_str)
    }

    pub fn history(&self) -> impl Iterator<Item = &str> {
        self.history.iter().map(String::as_str)
    }

    pub fn drain_output_lines_into(&mut self, out: &mut Vec<String>) {
        out.extend(self.output_lines.drain(..));
    }

    pub(crate) fn drain_pending_lines_into(&mut self, out: &mut Vec<String>) {
        out.extend(self.pending_lines.drain(..));
    }

    pub(crate) fn append_output_line(&mut self, line: impl Into<String>) {
        if self.output_lines.len() == MAX_OUTPUT_LINES {
            self.output_lines.pop_front();
        }
        self.output_lines.push_back(line.into());
    }

    pub(crate) fn clear_output_lines(&mut self) {
        self.output_lines.clear();
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
