use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::script::ScriptSet;
use crate::types::{Point, Rect};

/// Number of facing directions around a panorama node.
pub const NUM_DIRECTIONS: u32 = 8;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameVariant {
    #[default]
    Reah,
    Schizm,
}

/// A named range of frames inside a video resource.
///
/// A negative `resource_id` selects the secondary variant of the resource
/// numbered by its absolute value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimationDef {
    pub resource_id: i32,
    pub first_frame: u32,
    pub last_frame: u32,
    #[serde(default)]
    pub constraint_rect: Rect,
    #[serde(default)]
    pub name: String,
}

impl AnimationDef {
    pub fn resource_number(&self) -> u32 {
        self.resource_id.unsigned_abs()
    }

    pub fn is_variant(&self) -> bool {
        self.resource_id < 0
    }

    pub fn frame_count(&self) -> u32 {
        self.last_frame.saturating_sub(self.first_frame) + 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionRegion {
    pub id: u32,
    pub direction: u32,
    pub rect: Rect,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScreenDef {
    #[serde(default)]
    pub interactions: Vec<InteractionRegion>,
}

impl ScreenDef {
    pub fn hit_test(&self, direction: u32, point: Point) -> Option<u32> {
        self.interactions
            .iter()
            .find(|region| region.direction == direction && region.rect.contains(point))
            .map(|region| region.id)
    }
}

/// Static per-room symbol tables consulted by the name-resolution opcodes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoomDef {
    #[serde(default)]
    pub animations: BTreeMap<String, AnimationDef>,
    #[serde(default)]
    pub values: BTreeMap<String, i32>,
    #[serde(default)]
    pub vars: BTreeMap<String, u32>,
    #[serde(default)]
    pub texts: BTreeMap<String, String>,
    #[serde(default)]
    pub screen_names: BTreeMap<String, u32>,
    #[serde(default)]
    pub screens: BTreeMap<u32, ScreenDef>,
}

impl RoomDef {
    fn normalize_names(&mut self) {
        self.animations = lowercase_keys(std::mem::take(&mut self.animations));
        for (name, def) in self.animations.iter_mut() {
            if def.name.is_empty() {
                def.name = name.clone();
            }
        }
        self.values = lowercase_keys(std::mem::take(&mut self.values));
        self.vars = lowercase_keys(std::mem::take(&mut self.vars));
        self.texts = lowercase_keys(std::mem::take(&mut self.texts));
        self.screen_names = lowercase_keys(std::mem::take(&mut self.screen_names));
    }
}

fn lowercase_keys<T>(table: BTreeMap<String, T>) -> BTreeMap<String, T> {
    table
        .into_iter()
        .map(|(name, value)| (name.to_ascii_lowercase(), value))
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenerPose {
    pub x: i32,
    pub y: i32,
    pub angle: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnimationMetadata {
    /// Listener pose per frame offset from the start of the resource.
    #[serde(default)]
    pub frame_positions: BTreeMap<u32, ListenerPose>,
    /// Overrides the game-wide end-of-animation mode for this resource.
    #[serde(default)]
    pub terminate_at_start_of_frame: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtitleDef {
    pub text: String,
    #[serde(default = "default_subtitle_color")]
    pub color: [u8; 3],
    #[serde(default = "default_subtitle_duration")]
    pub duration_ms: u32,
}

fn default_subtitle_color() -> [u8; 3] {
    [255, 255, 255]
}

fn default_subtitle_duration() -> u32 {
    3000
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistEntry {
    /// Frame offset from the first frame of the animation range.
    pub frame: u32,
    pub sound: String,
    #[serde(default = "default_volume")]
    pub volume: i32,
    #[serde(default)]
    pub balance: i32,
    /// Adjust a sound that is already playing instead of restarting it.
    #[serde(default)]
    pub is_update: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreSection {
    pub next: String,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub duration_ms: u32,
    #[serde(default = "default_volume")]
    pub volume: i32,
}

fn default_volume() -> i32 {
    100
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelDef {
    pub font: String,
    pub text: String,
    #[serde(default = "default_subtitle_color")]
    pub color: [u8; 3],
    #[serde(default)]
    pub shadow_color: [u8; 3],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub variant: GameVariant,
    pub default_frame_rate: u32,
    pub terminate_at_start_of_frame: bool,
    pub is_cd_version: bool,
    pub is_dvd_version: bool,
    /// Room numbering stride applied when remapping duplicate-room animations.
    pub room_resource_stride: u32,
    pub start_room: u32,
    pub start_screen: u32,
    pub start_direction: u32,
    pub pan_margin: i32,
    pub screen_width: u32,
    pub screen_height: u32,
    pub default_cursor: Option<u32>,
    pub interactive_cursor: Option<u32>,
    pub mute_music: bool,
    pub random_seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            variant: GameVariant::Reah,
            default_frame_rate: 15,
            terminate_at_start_of_frame: true,
            is_cd_version: true,
            is_dvd_version: false,
            room_resource_stride: 100,
            start_room: 1,
            start_screen: 0xa0,
            start_direction: 0,
            pan_margin: 11,
            screen_width: 640,
            screen_height: 480,
            default_cursor: None,
            interactive_cursor: None,
            mute_music: false,
            random_seed: None,
        }
    }
}

/// Everything the runtime reads but never mutates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GameDefinitions {
    pub config: GameConfig,
    pub rooms: BTreeMap<u32, RoomDef>,
    /// Duplicate room number to the room it was copied from.
    pub room_duplicates: BTreeMap<u32, u32>,
    pub scripts: ScriptSet,
    pub cursors: BTreeMap<String, u32>,
    pub waves: BTreeSet<String>,
    pub animation_metadata: BTreeMap<u32, AnimationMetadata>,
    pub animation_subtitles: BTreeMap<u32, BTreeMap<u32, SubtitleDef>>,
    /// Keyed by the part of a wave name following its numeric id prefix.
    pub wave_subtitles: BTreeMap<String, SubtitleDef>,
    pub playlists: BTreeMap<String, Vec<PlaylistEntry>>,
    pub scores: BTreeMap<String, BTreeMap<String, ScoreSection>>,
    pub labels: BTreeMap<String, LabelDef>,
}

pub fn load_definitions(path: &Path) -> Result<GameDefinitions> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading definition pack {}", path.display()))?;
    GameDefinitions::from_json_str(&data)
        .with_context(|| format!("parsing definition pack {}", path.display()))
}

impl GameDefinitions {
    pub fn from_json_str(data: &str) -> Result<Self> {
        let mut defs: GameDefinitions = serde_json::from_str(data)?;
        if defs.config.room_resource_stride == 0 {
            bail!("room_resource_stride must be positive");
        }
        defs.waves = defs.waves.iter().map(|name| name.to_ascii_lowercase()).collect();
        defs.cursors = lowercase_keys(std::mem::take(&mut defs.cursors));
        defs.wave_subtitles = lowercase_keys(std::mem::take(&mut defs.wave_subtitles));
        defs.playlists = lowercase_keys(std::mem::take(&mut defs.playlists));
        for room in defs.rooms.values_mut() {
            room.normalize_names();
        }
        Ok(defs)
    }

    pub fn room(&self, room: u32) -> Option<&RoomDef> {
        self.rooms.get(&room)
    }

    pub fn screen(&self, room: u32, screen: u32) -> Option<&ScreenDef> {
        self.rooms.get(&room)?.screens.get(&screen)
    }

    /// Looks a symbol up in `room` only. Duplicated rooms borrow animations
    /// from their origin, nothing else.
    fn lookup<'a, T>(
        &'a self,
        room: u32,
        table: impl Fn(&'a RoomDef) -> &'a BTreeMap<String, T>,
        name: &str,
    ) -> Option<&'a T> {
        let key = name.to_ascii_lowercase();
        self.room(room).and_then(|def| table(def).get(&key))
    }

    /// Resolves a named animation, remapping a definition borrowed from the
    /// origin of a duplicated room into the current room's resource numbering.
    pub fn resolve_animation(&self, room: u32, name: &str) -> Option<AnimationDef> {
        let key = name.to_ascii_lowercase();
        if let Some(def) = self.room(room).and_then(|def| def.animations.get(&key)) {
            return Some(def.clone());
        }
        let origin = *self.room_duplicates.get(&room)?;
        let mut def = self.room(origin)?.animations.get(&key)?.clone();
        let stride = self.config.room_resource_stride as i64;
        let number = def.resource_number() as i64;
        if number.checked_div(stride) == Some(origin as i64) {
            let remapped = number - origin as i64 * stride + room as i64 * stride;
            let remapped = i32::try_from(remapped).ok()?;
            def.resource_id = if def.is_variant() { -remapped } else { remapped };
        }
        Some(def)
    }

    pub fn resolve_value(&self, room: u32, name: &str) -> Option<i32> {
        self.lookup(room, |def| &def.values, name).copied()
    }

    pub fn resolve_var(&self, room: u32, name: &str) -> Option<u32> {
        self.lookup(room, |def| &def.vars, name).copied()
    }

    pub fn resolve_text(&self, room: u32, name: &str) -> Option<&str> {
        self.lookup(room, |def| &def.texts, name).map(String::as_str)
    }

    pub fn resolve_screen(&self, room: u32, name: &str) -> Option<u32> {
        self.lookup(room, |def| &def.screen_names, name).copied()
    }

    pub fn resolve_cursor(&self, name: &str) -> Option<u32> {
        self.cursors.get(&name.to_ascii_lowercase()).copied()
    }

    pub fn terminates_at_start_of_frame(&self, resource: u32) -> bool {
        self.animation_metadata
            .get(&resource)
            .and_then(|meta| meta.terminate_at_start_of_frame)
            .unwrap_or(self.config.terminate_at_start_of_frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defs_with_duplicate() -> GameDefinitions {
        let json = r#"{
            "rooms": {
                "3": {
                    "animations": {"Door": {"resource_id": 305, "first_frame": 0, "last_frame": 9}},
                    "values": {"opened": 2}
                },
                "7": {"values": {"opened": 5}}
            },
            "room_duplicates": {"7": 3},
            "waves": ["0001XYZ"]
        }"#;
        GameDefinitions::from_json_str(json).unwrap()
    }

    #[test]
    fn duplicate_rooms_remap_animation_resources() {
        let defs = defs_with_duplicate();
        let def = defs.resolve_animation(7, "DOOR").unwrap();
        assert_eq!(def.resource_id, 705);
        assert_eq!(def.name, "door");
        assert_eq!(defs.resolve_animation(3, "door").unwrap().resource_id, 305);
        assert!(defs.resolve_animation(4, "door").is_none());
    }

    #[test]
    fn local_symbols_shadow_origin_room() {
        let defs = defs_with_duplicate();
        assert_eq!(defs.resolve_value(7, "opened"), Some(5));
        assert_eq!(defs.resolve_value(3, "opened"), Some(2));
        assert!(defs.waves.contains("0001xyz"));
    }

    #[test]
    fn duplicate_rooms_borrow_only_animations() {
        let json = r#"{
            "rooms": {
                "3": {
                    "animations": {"Door": {"resource_id": 305, "first_frame": 0, "last_frame": 9}},
                    "values": {"opened": 2},
                    "vars": {"lever": 12},
                    "screen_names": {"hall": 160}
                },
                "7": {}
            },
            "room_duplicates": {"7": 3}
        }"#;
        let defs = GameDefinitions::from_json_str(json).unwrap();
        assert!(defs.resolve_animation(7, "door").is_some());
        assert_eq!(defs.resolve_value(7, "opened"), None);
        assert_eq!(defs.resolve_var(7, "lever"), None);
        assert_eq!(defs.resolve_screen(7, "hall"), None);
        assert_eq!(defs.resolve_var(3, "lever"), Some(12));
    }

    #[test]
    fn zero_resource_stride_is_rejected() {
        let err = GameDefinitions::from_json_str(r#"{"config": {"room_resource_stride": 0}}"#).unwrap_err();
        assert!(err.to_string().contains("room_resource_stride"));

        let mut defs = defs_with_duplicate();
        defs.config.room_resource_stride = 0;
        assert_eq!(defs.resolve_animation(7, "door").unwrap().resource_id, 305);
    }

    #[test]
    fn config_defaults_fill_missing_fields() {
        let defs = GameDefinitions::from_json_str(r#"{"config": {"variant": "Schizm"}}"#).unwrap();
        assert_eq!(defs.config.variant, GameVariant::Schizm);
        assert_eq!(defs.config.room_resource_stride, 100);
        assert_eq!(defs.config.pan_margin, 11);
        assert!(defs.terminates_at_start_of_frame(42));
    }
}
