use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};

use gridfall_engine::{Direction, HazardConfig};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub(crate) const CAMPAIGN_FILE_NAME: &str = "campaign.json";
const WALL_TOP: i32 = 2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Cell {
    pub(crate) x: i32,
    pub(crate) z: i32,
}

impl Cell {
    pub(crate) const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    pub(crate) fn step(self, direction: Direction) -> Self {
        let (dx, dz) = direction.grid_offset();
        self.translated(Cell::new(dx, dz))
    }

    pub(crate) fn translated(self, offset: Cell) -> Self {
        Self {
            x: self.x.saturating_add(offset.x),
            z: self.z.saturating_add(offset.z),
        }
    }
}

impl Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

/// Timings for the actor's motions, in seconds unless noted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct MotionConfig {
    pub(crate) step_seconds: f32,
    pub(crate) refusal_seconds: f32,
    pub(crate) teleport_stage_seconds: f32,
    /// World units dropped by the fall motion.
    pub(crate) fall_distance: f32,
    pub(crate) fall_seconds: f32,
    /// How far below the actor's feet the support probe reaches.
    pub(crate) support_distance: f32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            step_seconds: 1.0,
            refusal_seconds: 0.25,
            teleport_stage_seconds: 0.25,
            fall_distance: 30.0,
            fall_seconds: 3.2,
            support_distance: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct GateDef {
    pub(crate) id: String,
    pub(crate) at: Cell,
    pub(crate) target: Cell,
    #[serde(default = "default_true")]
    pub(crate) active: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ButtonDef {
    pub(crate) at: Cell,
    #[serde(default)]
    pub(crate) activates: Vec<String>,
    #[serde(default)]
    pub(crate) moves: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct PlatformDef {
    pub(crate) id: String,
    pub(crate) at: Cell,
    #[serde(default)]
    pub(crate) top: i32,
    pub(crate) offset: Cell,
    #[serde(default = "default_platform_seconds")]
    pub(crate) duration_seconds: f32,
}

/// One level file.
///
/// `rows` are listed far-to-near: the first row has the largest `z`, so
/// `up` moves toward the top of the text block. Legend: `.` or `0`-`9` is
/// floor at that height, `#` is a wall, space or `~` is open air.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct LevelDef {
    pub(crate) name: String,
    pub(crate) rows: Vec<String>,
    pub(crate) spawn: Cell,
    #[serde(default)]
    pub(crate) facing: Direction,
    #[serde(default)]
    pub(crate) oxygen: Vec<Cell>,
    #[serde(default)]
    pub(crate) gates: Vec<GateDef>,
    #[serde(default)]
    pub(crate) buttons: Vec<ButtonDef>,
    #[serde(default)]
    pub(crate) platforms: Vec<PlatformDef>,
    #[serde(default)]
    pub(crate) exits: Vec<Cell>,
    #[serde(default)]
    pub(crate) demo: Vec<Direction>,
    #[serde(default)]
    pub(crate) hazard: HazardConfig,
    #[serde(default)]
    pub(crate) motion: MotionConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
struct CampaignDef {
    levels: Vec<String>,
}

#[derive(Debug, Error)]
pub(crate) enum LevelLoadError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },
    #[error("invalid level {}: {message}", .path.display())]
    Validation { path: PathBuf, message: String },
    #[error("campaign {} lists no levels", .path.display())]
    EmptyCampaign { path: PathBuf },
}

/// Static column heights of a level. Cells outside the grid are open air.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Terrain {
    width: i32,
    depth: i32,
    tops: Vec<Option<i32>>,
}

impl Terrain {
    pub(crate) fn from_rows(rows: &[String]) -> Self {
        let depth = i32::try_from(rows.len()).unwrap_or(i32::MAX);
        let width = rows
            .iter()
            .map(|row| row.chars().count())
            .max()
            .and_then(|width| i32::try_from(width).ok())
            .unwrap_or(0);
        let mut tops = vec![None; (width.max(0) as usize) * (depth.max(0) as usize)];

        for (row_index, row) in rows.iter().enumerate() {
            let z = depth - 1 - row_index as i32;
            for (x, symbol) in row.chars().enumerate() {
                if let Some(slot) = index_of(width, depth, Cell::new(x as i32, z)) {
                    tops[slot] = column_top(symbol).flatten();
                }
            }
        }

        Self { width, depth, tops }
    }

    pub(crate) fn top_at(&self, cell: Cell) -> Option<i32> {
        index_of(self.width, self.depth, cell).and_then(|slot| self.tops[slot])
    }

    pub(crate) fn width(&self) -> i32 {
        self.width
    }

    pub(crate) fn depth(&self) -> i32 {
        self.depth
    }
}

fn index_of(width: i32, depth: i32, cell: Cell) -> Option<usize> {
    if cell.x < 0 || cell.z < 0 || cell.x >= width || cell.z >= depth {
        return None;
    }
    Some((cell.z as usize) * (width as usize) + cell.x as usize)
}

/// `None` for an unknown symbol, `Some(None)` for open air.
fn column_top(symbol: char) -> Option<Option<i32>> {
    match symbol {
        ' ' | '~' => Some(None),
        '.' => Some(Some(0)),
        '#' => Some(Some(WALL_TOP)),
        digit if digit.is_ascii_digit() => Some(digit.to_digit(10).map(|value| value as i32)),
        _ => None,
    }
}

pub(crate) fn load_campaign(levels_dir: &Path) -> Result<Vec<LevelDef>, LevelLoadError> {
    let campaign_path = levels_dir.join(CAMPAIGN_FILE_NAME);
    let raw = read_text(&campaign_path)?;
    let campaign: CampaignDef =
        parse_json(&raw, "campaign").map_err(|message| LevelLoadError::Parse {
            path: campaign_path.clone(),
            message,
        })?;
    if campaign.levels.is_empty() {
        return Err(LevelLoadError::EmptyCampaign {
            path: campaign_path,
        });
    }

    campaign
        .levels
        .iter()
        .map(|file_name| load_level(&levels_dir.join(file_name)))
        .collect()
}

pub(crate) fn load_level(path: &Path) -> Result<LevelDef, LevelLoadError> {
    let raw = read_text(path)?;
    parse_level_json(&raw).map_err(|error| match error {
        LevelJsonError::Parse(message) => LevelLoadError::Parse {
            path: path.to_path_buf(),
            message,
        },
        LevelJsonError::Validation(message) => LevelLoadError::Validation {
            path: path.to_path_buf(),
            message,
        },
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LevelJsonError {
    Parse(String),
    Validation(String),
}

pub(crate) fn parse_level_json(raw: &str) -> Result<LevelDef, LevelJsonError> {
    let level: LevelDef = parse_json(raw, "level").map_err(LevelJsonError::Parse)?;
    validate_level(&level).map_err(LevelJsonError::Validation)?;
    Ok(level)
}

fn read_text(path: &Path) -> Result<String, LevelLoadError> {
    fs::read_to_string(path).map_err(|source| LevelLoadError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_json<T: DeserializeOwned>(raw: &str, what: &str) -> Result<T, String> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    match serde_path_to_error::deserialize::<_, T>(&mut deserializer) {
        Ok(value) => Ok(value),
        Err(error) => {
            let path = error.path().to_string();
            let source = error.into_inner();
            if path.is_empty() || path == "." {
                Err(format!("parse {what} json: {source}"))
            } else {
                Err(format!("parse {what} json at {path}: {source}"))
            }
        }
    }
}

/// Structural checks only. Dangling gate or platform ids in buttons are
/// tolerated and resolve to nothing when the button fires.
fn validate_level(level: &LevelDef) -> Result<(), String> {
    if level.name.trim().is_empty() {
        return Err(validation_err("name", "must not be empty"));
    }
    if level.rows.is_empty() {
        return Err(validation_err("rows", "must contain at least one row"));
    }
    for (row_index, row) in level.rows.iter().enumerate() {
        if let Some((column, symbol)) = row
            .chars()
            .enumerate()
            .find(|(_, symbol)| column_top(*symbol).is_none())
        {
            return Err(validation_err(
                &format!("rows[{row_index}][{column}]"),
                format!("unknown tile symbol '{symbol}'"),
            ));
        }
    }

    let motion = &level.motion;
    for (field, value) in [
        ("motion.step_seconds", motion.step_seconds),
        ("motion.refusal_seconds", motion.refusal_seconds),
        ("motion.teleport_stage_seconds", motion.teleport_stage_seconds),
        ("motion.fall_distance", motion.fall_distance),
        ("motion.fall_seconds", motion.fall_seconds),
        ("motion.support_distance", motion.support_distance),
        ("hazard.period_seconds", level.hazard.period_seconds),
        ("hazard.grace_seconds", level.hazard.grace_seconds),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(expected_actual(field, "a finite value >= 0", value));
        }
    }
    for (index, platform) in level.platforms.iter().enumerate() {
        let value = platform.duration_seconds;
        if !value.is_finite() || value < 0.0 {
            return Err(expected_actual(
                &format!("platforms[{index}].duration_seconds"),
                "a finite value >= 0",
                value,
            ));
        }
    }
    Ok(())
}

fn validation_err(path: &str, message: impl Into<String>) -> String {
    format!("validation failed at {path}: {}", message.into())
}

fn expected_actual(path: &str, expected: impl Display, actual: impl Display) -> String {
    validation_err(path, format!("expected {expected}, got {actual}"))
}

fn default_true() -> bool {
    true
}

fn default_platform_seconds() -> f32 {
    1.0
}
