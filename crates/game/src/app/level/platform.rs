use gridfall_engine::MotionStage;
use serde::Serialize;
use tracing::{debug, info};

use super::def::{Cell, PlatformDef};
use super::world::{LevelWorld, Motion};

/// A support surface that slides by a fixed offset when a button asks it to.
/// It keeps supporting its old cell until the slide finishes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct Platform {
    pub(crate) id: String,
    pub(crate) cell: Cell,
    pub(crate) top: i32,
    offset: Cell,
    duration_seconds: f32,
    pub(crate) moving: bool,
}

impl Platform {
    pub(crate) fn from_def(def: &PlatformDef) -> Self {
        Self {
            id: def.id.clone(),
            cell: def.at,
            top: def.top,
            offset: def.offset,
            duration_seconds: def.duration_seconds,
            moving: false,
        }
    }
}

impl LevelWorld {
    /// Starts the slide of platform `id`. Unknown ids and platforms already
    /// sliding are ignored.
    pub(crate) fn move_platform(&mut self, id: &str) -> bool {
        let Some(index) = self.platforms.iter().position(|platform| platform.id == id) else {
            debug!(platform = id, "platform_link_missing");
            return false;
        };
        let platform = &mut self.platforms[index];
        if platform.moving {
            return false;
        }
        platform.moving = true;
        let to = platform.cell.translated(platform.offset);
        info!(platform = id, from = %platform.cell, to = %to, "platform_move_started");
        let duration_seconds = platform.duration_seconds;
        self.motions.begin(
            [MotionStage::new("slide", duration_seconds)],
            Motion::Platform { index, to },
        );
        true
    }

    pub(crate) fn finish_platform_move(&mut self, index: usize, to: Cell) {
        if let Some(platform) = self.platforms.get_mut(index) {
            platform.cell = to;
            platform.moving = false;
            debug!(platform = %platform.id, cell = %to, "platform_move_finished");
        }
    }
}
