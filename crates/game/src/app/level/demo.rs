use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use gridfall_engine::{Direction, StepContext, StepParticipant};
use serde::{Deserialize, Serialize};

use super::world::LevelWorld;

/// Scripted directions, fed one at a time whenever the scheduler is idle.
#[derive(Debug, Clone, Default)]
pub(crate) struct DemoInput {
    queue: VecDeque<Direction>,
}

impl DemoInput {
    pub(crate) fn new(directions: &[Direction]) -> Self {
        Self {
            queue: directions
                .iter()
                .copied()
                .filter(|direction| !direction.is_none())
                .collect(),
        }
    }

    pub(crate) fn next_direction(&mut self) -> Direction {
        self.queue.pop_front().unwrap_or_default()
    }

    pub(crate) fn remaining(&self) -> usize {
        self.queue.len()
    }
}

pub(crate) type SharedRecording = Rc<RefCell<Vec<Direction>>>;

/// Observer participant that remembers every dispatched direction.
#[derive(Debug)]
pub(crate) struct DemoRecorder {
    recording: SharedRecording,
}

impl DemoRecorder {
    pub(crate) fn new(recording: SharedRecording) -> Self {
        Self { recording }
    }
}

impl StepParticipant<LevelWorld> for DemoRecorder {
    fn name(&self) -> &'static str {
        "demo_recorder"
    }

    fn step(&mut self, direction: Direction, _cx: &mut StepContext<'_, LevelWorld>) {
        self.recording.borrow_mut().push(direction);
    }
}

/// On-disk recording. `demo` has the same shape as a level file's `demo` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct DemoFile {
    pub(crate) level: String,
    pub(crate) demo: Vec<Direction>,
}

pub(crate) fn demo_path(record_dir: &Path, level: &str) -> PathBuf {
    record_dir.join(format!("{level}.demo.json"))
}

pub(crate) fn write_demo(path: &Path, demo: &DemoFile) -> io::Result<()> {
    let mut text = serde_json::to_string_pretty(demo).map_err(io::Error::other)?;
    text.push('\n');
    write_text_atomic(path, &text)
}

/// Writes through a sibling temp file so readers never see a partial recording.
fn write_text_atomic(path: &Path, text: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("demo.json");
    let tmp_path = path.with_file_name(format!("{file_name}.tmp"));
    fs::write(&tmp_path, text)?;
    if let Err(error) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(error);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::level::def::parse_level_json;

    #[test]
    fn demo_input_skips_none_and_drains_in_order() {
        let mut demo = DemoInput::new(&[Direction::Up, Direction::None, Direction::Left]);

        assert_eq!(demo.remaining(), 2);
        assert_eq!(demo.next_direction(), Direction::Up);
        assert_eq!(demo.next_direction(), Direction::Left);
        assert_eq!(demo.next_direction(), Direction::None);
    }

    #[test]
    fn recording_round_trips_into_a_level_demo_list() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = demo_path(&temp.path().join("records"), "level_01");
        let demo = DemoFile {
            level: "level_01".to_string(),
            demo: vec![Direction::Right, Direction::Up],
        };

        write_demo(&path, &demo).expect("write demo");
        write_demo(&path, &demo).expect("overwrite demo");

        let raw = fs::read_to_string(&path).expect("read back");
        let parsed: DemoFile = serde_json::from_str(&raw).expect("demo json");
        assert_eq!(parsed, demo);
        assert!(raw.contains("\"right\""));
        assert!(!path.with_file_name("level_01.demo.json.tmp").exists());

        let level = parse_level_json(&format!(
            r#"{{ "name": "replay", "rows": ["."], "spawn": {{ "x": 0, "z": 0 }}, "demo": {} }}"#,
            serde_json::to_string(&parsed.demo).expect("demo list")
        ))
        .expect("recorded list is a valid level demo");
        assert_eq!(level.demo, demo.demo);
    }
}
