//! Grid levels: file format, spatial world, the player, triggers, platforms,
//! demo playback and the scene that ties them to a turn scheduler.

mod def;
mod demo;
mod platform;
mod player;
mod scene_impl;
mod triggers;
mod world;


pub(crate) use def::{load_campaign, LevelLoadError};
pub(crate) use scene_impl::{CampaignFactory, SceneOptions};
