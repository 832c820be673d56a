//! Versioned save-game snapshots.
//!
//! A save file is a fixed identifier, a version word and then the snapshot
//! fields, all big-endian. Strings are a `u32` byte length followed by UTF-8
//! bytes and every collection is prefixed by a `u32` element count. Fields
//! introduced after the earliest supported version are gated on the version
//! read from the header and fall back to their defaults when absent.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Leading identifier of every save file ("SVcr").
pub const SAVE_GAME_IDENTIFIER: u32 = 0x5356_6372;

/// Version written by [`SaveGameSnapshot::write_to`].
pub const SAVE_GAME_CURRENT_VERSION: u32 = 10;

/// Oldest version [`SaveGameSnapshot::read_from`] still accepts.
pub const SAVE_GAME_EARLIEST_SUPPORTED_VERSION: u32 = 2;

/// Maximum number of swappable hero states a snapshot can carry.
pub const MAX_STATES: usize = 2;

const VERSION_AMBIENT_SOUNDS: u32 = 3;
const VERSION_ONE_SHOTS_AND_LISTENER: u32 = 4;
const VERSION_PENDING_PARAMS: u32 = 5;
const VERSION_SAY_CYCLES_AND_GLOBALS: u32 = 6;
const VERSION_SCORE_AND_IDLE: u32 = 7;
const VERSION_MULTI_HERO: u32 = 8;
const VERSION_SOUND_LOOP_RESTART: u32 = 9;
const VERSION_SWAP_RESET_AND_MUTE: u32 = 10;

const MAX_STRING_LEN: u32 = 1 << 16;
const MAX_COLLECTION_LEN: u32 = 1 << 20;

/// Outcome of a failed snapshot read.
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("save data is corrupt: {0}")]
    Corrupt(String),
    #[error("save version {version} is newer than the supported version {SAVE_GAME_CURRENT_VERSION}")]
    TooNew { version: u32 },
    #[error(
        "save version {version} is older than the earliest supported version {SAVE_GAME_EARLIEST_SUPPORTED_VERSION}"
    )]
    TooOld { version: u32 },
}

impl SaveError {
    fn corrupt(context: &str, err: io::Error) -> Self {
        SaveError::Corrupt(format!("{context}: {err}"))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoundParams3D {
    pub min_range: u32,
    pub max_range: u32,
    /// Carried through untouched; scripts set it but attenuation ignores it.
    pub unknown_range: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingStaticAnimParams {
    pub initial_delay: u32,
    pub repeat_delay: u32,
    pub lock_interactions: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedInventoryItem {
    pub item_id: u32,
    pub highlighted: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedSound {
    pub name: String,
    pub id: u32,
    pub volume: i32,
    pub balance: i32,
    pub is_3d: bool,
    pub is_looping: bool,
    pub try_to_loop_when_restarted: bool,
    pub is_speech: bool,
    pub x: i32,
    pub y: i32,
    pub params_3d: SoundParams3D,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedAmbientSound {
    pub name: String,
    pub volume: i32,
    pub balance: i32,
    pub frequency: u32,
    pub scene_changes_remaining: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedAnimationRange {
    pub resource_id: i32,
    pub first_frame: u32,
    pub last_frame: u32,
}

/// Per-hero portion of the game state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwappableState {
    pub room_number: u32,
    pub screen_number: u32,
    pub direction: u32,
    pub have_pending_post_swap_screen_reset: bool,
    /// Signed resource id of the displayed animation, zero when none.
    pub loaded_animation: i32,
    pub anim_displaying_frame: u32,
    pub idle_animation: Option<SavedAnimationRange>,
    pub music_track: i32,
    pub music_active: bool,
    pub music_volume: i32,
    pub music_mute_disabled: bool,
    pub score_track: String,
    pub score_section: String,
    pub anim_volume: i32,
    pub inventory: Vec<SavedInventoryItem>,
    pub sounds: Vec<SavedSound>,
    pub ambient_sounds: Vec<SavedAmbientSound>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TriggeredOneShot {
    pub sound_id: u32,
    pub unique_slot: u32,
}

/// Full mutable game state. `states[0]` is the active hero, `states[1]` (when
/// present) the inactive one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveGameSnapshot {
    pub hero: u32,
    pub swap_out_room: u32,
    pub swap_out_screen: u32,
    pub swap_out_direction: u32,
    pub esc_on: bool,
    pub states: Vec<SwappableState>,
    pub variables: BTreeMap<u32, i32>,
    pub global_variables: BTreeMap<u32, i32>,
    /// Remaining milliseconds per timer key.
    pub timers: BTreeMap<u32, u32>,
    pub triggered_one_shots: Vec<TriggeredOneShot>,
    pub say_cycles: BTreeMap<u32, u32>,
    pub listener_x: i32,
    pub listener_y: i32,
    pub listener_angle: i32,
    pub pending_static_anim_params: PendingStaticAnimParams,
    pub pending_sound_params_3d: SoundParams3D,
}

impl Default for SaveGameSnapshot {
    fn default() -> Self {
        SaveGameSnapshot {
            hero: 0,
            swap_out_room: 0,
            swap_out_screen: 0,
            swap_out_direction: 0,
            esc_on: false,
            states: vec![SwappableState::default()],
            variables: BTreeMap::new(),
            global_variables: BTreeMap::new(),
            timers: BTreeMap::new(),
            triggered_one_shots: Vec::new(),
            say_cycles: BTreeMap::new(),
            listener_x: 0,
            listener_y: 0,
            listener_angle: 0,
            pending_static_anim_params: PendingStaticAnimParams::default(),
            pending_sound_params_3d: SoundParams3D::default(),
        }
    }
}

impl SaveGameSnapshot {
    /// State of the hero in control; `None` only for a hand-built
    /// snapshot without states, which the codec refuses to write.
    pub fn active_state(&self) -> Option<&SwappableState> {
        self.states.first()
    }

    /// Encodes in the current format. Fails on snapshots the reader would
    /// reject: a bad state count or an oversized string.
    pub fn to_bytes(&self) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        self.write_to(&mut out)?;
        Ok(out)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SaveError> {
        Self::read_from(bytes)
    }

    /// Serialize using the current format version.
    pub fn write_to<W: Write>(&self, writer: W) -> io::Result<()> {
        self.write_versioned(writer, SAVE_GAME_CURRENT_VERSION)
    }

    /// Serialize in the layout of an older supported version, dropping
    /// whatever that version cannot represent.
    pub fn write_versioned<W: Write>(&self, mut w: W, version: u32) -> io::Result<()> {
        if !(SAVE_GAME_EARLIEST_SUPPORTED_VERSION..=SAVE_GAME_CURRENT_VERSION).contains(&version) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("cannot write save version {version}"),
            ));
        }
        if self.states.is_empty() || self.states.len() > MAX_STATES {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("snapshot has {} states", self.states.len()),
            ));
        }

        w.write_u32::<BigEndian>(SAVE_GAME_IDENTIFIER)?;
        w.write_u32::<BigEndian>(version)?;

        if version >= VERSION_MULTI_HERO {
            w.write_u32::<BigEndian>(self.hero)?;
            w.write_u32::<BigEndian>(self.swap_out_room)?;
            w.write_u32::<BigEndian>(self.swap_out_screen)?;
            w.write_u32::<BigEndian>(self.swap_out_direction)?;
            w.write_u32::<BigEndian>(self.states.len() as u32)?;
            for state in &self.states {
                write_state(&mut w, state, version)?;
            }
        } else {
            write_state(&mut w, &self.states[0], version)?;
        }

        w.write_u8(u8::from(self.esc_on))?;
        write_i32_map(&mut w, &self.variables)?;

        w.write_u32::<BigEndian>(self.timers.len() as u32)?;
        for (key, remaining) in &self.timers {
            w.write_u32::<BigEndian>(*key)?;
            w.write_u32::<BigEndian>(*remaining)?;
        }

        if version >= VERSION_ONE_SHOTS_AND_LISTENER {
            w.write_u32::<BigEndian>(self.triggered_one_shots.len() as u32)?;
            for one_shot in &self.triggered_one_shots {
                w.write_u32::<BigEndian>(one_shot.sound_id)?;
                w.write_u32::<BigEndian>(one_shot.unique_slot)?;
            }
        }

        if version >= VERSION_SAY_CYCLES_AND_GLOBALS {
            w.write_u32::<BigEndian>(self.say_cycles.len() as u32)?;
            for (id, cycle) in &self.say_cycles {
                w.write_u32::<BigEndian>(*id)?;
                w.write_u32::<BigEndian>(*cycle)?;
            }
            write_i32_map(&mut w, &self.global_variables)?;
        }

        if version >= VERSION_ONE_SHOTS_AND_LISTENER {
            w.write_i32::<BigEndian>(self.listener_x)?;
            w.write_i32::<BigEndian>(self.listener_y)?;
            w.write_i32::<BigEndian>(self.listener_angle)?;
        }

        if version >= VERSION_PENDING_PARAMS {
            let params = &self.pending_static_anim_params;
            w.write_u32::<BigEndian>(params.initial_delay)?;
            w.write_u32::<BigEndian>(params.repeat_delay)?;
            w.write_u8(u8::from(params.lock_interactions))?;
            write_params_3d(&mut w, &self.pending_sound_params_3d)?;
        }

        Ok(())
    }

    /// Parse a snapshot, distinguishing version problems from corruption.
    pub fn read_from<R: Read>(mut r: R) -> Result<Self, SaveError> {
        let magic = r
            .read_u32::<BigEndian>()
            .map_err(|err| SaveError::corrupt("reading save identifier", err))?;
        if magic != SAVE_GAME_IDENTIFIER {
            return Err(SaveError::Corrupt(format!(
                "unexpected save identifier {magic:08x}"
            )));
        }
        let version = r
            .read_u32::<BigEndian>()
            .map_err(|err| SaveError::corrupt("reading save version", err))?;
        if version > SAVE_GAME_CURRENT_VERSION {
            return Err(SaveError::TooNew { version });
        }
        if version < SAVE_GAME_EARLIEST_SUPPORTED_VERSION {
            return Err(SaveError::TooOld { version });
        }
        if version < SAVE_GAME_CURRENT_VERSION {
            log::debug!("upgrading version {version} save to {SAVE_GAME_CURRENT_VERSION}");
        }

        let mut reader = SaveReader { inner: r, version };
        reader.read_snapshot()
    }
}

struct SaveReader<R> {
    inner: R,
    version: u32,
}

impl<R: Read> SaveReader<R> {
    fn read_snapshot(&mut self) -> Result<SaveGameSnapshot, SaveError> {
        let mut snapshot = SaveGameSnapshot {
            states: Vec::new(),
            ..SaveGameSnapshot::default()
        };

        if self.version >= VERSION_MULTI_HERO {
            snapshot.hero = self.u32("hero")?;
            snapshot.swap_out_room = self.u32("swap-out room")?;
            snapshot.swap_out_screen = self.u32("swap-out screen")?;
            snapshot.swap_out_direction = self.u32("swap-out direction")?;
            let num_states = self.u32("state count")? as usize;
            if num_states == 0 || num_states > MAX_STATES {
                return Err(SaveError::Corrupt(format!(
                    "invalid hero state count {num_states}"
                )));
            }
            for _ in 0..num_states {
                let state = self.read_state()?;
                snapshot.states.push(state);
            }
        } else {
            let state = self.read_state()?;
            snapshot.states.push(state);
        }

        snapshot.esc_on = self.bool("esc flag")?;
        snapshot.variables = self.i32_map("variables")?;

        let timer_count = self.count("timers")?;
        for _ in 0..timer_count {
            let key = self.u32("timer key")?;
            let remaining = self.u32("timer value")?;
            snapshot.timers.insert(key, remaining);
        }

        if self.version >= VERSION_ONE_SHOTS_AND_LISTENER {
            let count = self.count("one-shots")?;
            for _ in 0..count {
                let sound_id = self.u32("one-shot sound id")?;
                let unique_slot = self.u32("one-shot slot")?;
                snapshot.triggered_one_shots.push(TriggeredOneShot {
                    sound_id,
                    unique_slot,
                });
            }
        }

        if self.version >= VERSION_SAY_CYCLES_AND_GLOBALS {
            let count = self.count("say cycles")?;
            for _ in 0..count {
                let id = self.u32("say cycle id")?;
                let cycle = self.u32("say cycle value")?;
                snapshot.say_cycles.insert(id, cycle);
            }
            snapshot.global_variables = self.i32_map("global variables")?;
        }

        if self.version >= VERSION_ONE_SHOTS_AND_LISTENER {
            snapshot.listener_x = self.i32("listener x")?;
            snapshot.listener_y = self.i32("listener y")?;
            snapshot.listener_angle = self.i32("listener angle")?;
        }

        if self.version >= VERSION_PENDING_PARAMS {
            snapshot.pending_static_anim_params = PendingStaticAnimParams {
                initial_delay: self.u32("static anim initial delay")?,
                repeat_delay: self.u32("static anim repeat delay")?,
                lock_interactions: self.bool("static anim lock")?,
            };
            snapshot.pending_sound_params_3d = self.params_3d()?;
        }

        Ok(snapshot)
    }

    fn read_state(&mut self) -> Result<SwappableState, SaveError> {
        let mut state = SwappableState {
            room_number: self.u32("room")?,
            screen_number: self.u32("screen")?,
            direction: self.u32("direction")?,
            ..SwappableState::default()
        };

        if self.version >= VERSION_SWAP_RESET_AND_MUTE {
            state.have_pending_post_swap_screen_reset = self.bool("post-swap reset")?;
        }

        state.loaded_animation = self.i32("loaded animation")?;
        state.anim_displaying_frame = self.u32("animation frame")?;
        state.music_track = self.i32("music track")?;
        state.music_active = self.bool("music active")?;

        if self.version >= VERSION_SCORE_AND_IDLE {
            state.score_track = self.string("score track")?;
            state.score_section = self.string("score section")?;
            state.music_volume = self.i32("music volume")?;
            if self.version >= VERSION_SWAP_RESET_AND_MUTE {
                state.music_mute_disabled = self.bool("music mute policy")?;
            }
            state.anim_volume = self.i32("animation volume")?;
            if self.bool("idle animation flag")? {
                state.idle_animation = Some(SavedAnimationRange {
                    resource_id: self.i32("idle animation")?,
                    first_frame: self.u32("idle first frame")?,
                    last_frame: self.u32("idle last frame")?,
                });
            }
        } else {
            state.music_volume = 100;
            state.anim_volume = 100;
        }

        let inventory_count = self.count("inventory")?;
        for _ in 0..inventory_count {
            state.inventory.push(SavedInventoryItem {
                item_id: self.u32("inventory item")?,
                highlighted: self.bool("inventory highlight")?,
            });
        }

        let sound_count = self.count("sounds")?;
        for _ in 0..sound_count {
            let sound = self.read_sound()?;
            state.sounds.push(sound);
        }

        if self.version >= VERSION_AMBIENT_SOUNDS {
            let ambient_count = self.count("ambient sounds")?;
            for _ in 0..ambient_count {
                state.ambient_sounds.push(SavedAmbientSound {
                    name: self.string("ambient sound name")?,
                    volume: self.i32("ambient sound volume")?,
                    balance: self.i32("ambient sound balance")?,
                    frequency: self.u32("ambient sound frequency")?,
                    scene_changes_remaining: self.u32("ambient sound countdown")?,
                });
            }
        }

        Ok(state)
    }

    fn read_sound(&mut self) -> Result<SavedSound, SaveError> {
        let mut sound = SavedSound {
            name: self.string("sound name")?,
            id: self.u32("sound id")?,
            volume: self.i32("sound volume")?,
            balance: self.i32("sound balance")?,
            is_3d: self.bool("sound 3d flag")?,
            is_looping: self.bool("sound loop flag")?,
            ..SavedSound::default()
        };
        if self.version >= VERSION_SOUND_LOOP_RESTART {
            sound.try_to_loop_when_restarted = self.bool("sound loop restart flag")?;
        }
        sound.is_speech = self.bool("sound speech flag")?;
        sound.x = self.i32("sound x")?;
        sound.y = self.i32("sound y")?;
        sound.params_3d = self.params_3d()?;
        Ok(sound)
    }

    fn params_3d(&mut self) -> Result<SoundParams3D, SaveError> {
        Ok(SoundParams3D {
            min_range: self.u32("3d min range")?,
            max_range: self.u32("3d max range")?,
            unknown_range: self.u32("3d unknown range")?,
        })
    }

    fn u32(&mut self, what: &str) -> Result<u32, SaveError> {
        self.inner
            .read_u32::<BigEndian>()
            .map_err(|err| SaveError::corrupt(what, err))
    }

    fn i32(&mut self, what: &str) -> Result<i32, SaveError> {
        self.inner
            .read_i32::<BigEndian>()
            .map_err(|err| SaveError::corrupt(what, err))
    }

    fn bool(&mut self, what: &str) -> Result<bool, SaveError> {
        match self
            .inner
            .read_u8()
            .map_err(|err| SaveError::corrupt(what, err))?
        {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(SaveError::Corrupt(format!("{what}: invalid flag {other}"))),
        }
    }

    fn count(&mut self, what: &str) -> Result<u32, SaveError> {
        let count = self.u32(what)?;
        if count > MAX_COLLECTION_LEN {
            return Err(SaveError::Corrupt(format!(
                "{what}: implausible element count {count}"
            )));
        }
        Ok(count)
    }

    fn string(&mut self, what: &str) -> Result<String, SaveError> {
        let len = self.u32(what)?;
        if len > MAX_STRING_LEN {
            return Err(SaveError::Corrupt(format!(
                "{what}: implausible string length {len}"
            )));
        }
        let mut bytes = vec![0u8; len as usize];
        self.inner
            .read_exact(&mut bytes)
            .map_err(|err| SaveError::corrupt(what, err))?;
        String::from_utf8(bytes).map_err(|_| SaveError::Corrupt(format!("{what}: invalid UTF-8")))
    }

    fn i32_map(&mut self, what: &str) -> Result<BTreeMap<u32, i32>, SaveError> {
        let count = self.count(what)?;
        let mut map = BTreeMap::new();
        for _ in 0..count {
            let key = self.u32(what)?;
            let value = self.i32(what)?;
            map.insert(key, value);
        }
        Ok(map)
    }
}

fn write_state<W: Write>(w: &mut W, state: &SwappableState, version: u32) -> io::Result<()> {
    w.write_u32::<BigEndian>(state.room_number)?;
    w.write_u32::<BigEndian>(state.screen_number)?;
    w.write_u32::<BigEndian>(state.direction)?;
    if version >= VERSION_SWAP_RESET_AND_MUTE {
        w.write_u8(u8::from(state.have_pending_post_swap_screen_reset))?;
    }
    w.write_i32::<BigEndian>(state.loaded_animation)?;
    w.write_u32::<BigEndian>(state.anim_displaying_frame)?;
    w.write_i32::<BigEndian>(state.music_track)?;
    w.write_u8(u8::from(state.music_active))?;

    if version >= VERSION_SCORE_AND_IDLE {
        write_string(w, &state.score_track)?;
        write_string(w, &state.score_section)?;
        w.write_i32::<BigEndian>(state.music_volume)?;
        if version >= VERSION_SWAP_RESET_AND_MUTE {
            w.write_u8(u8::from(state.music_mute_disabled))?;
        }
        w.write_i32::<BigEndian>(state.anim_volume)?;
        match state.idle_animation {
            Some(range) => {
                w.write_u8(1)?;
                w.write_i32::<BigEndian>(range.resource_id)?;
                w.write_u32::<BigEndian>(range.first_frame)?;
                w.write_u32::<BigEndian>(range.last_frame)?;
            }
            None => w.write_u8(0)?,
        }
    }

    w.write_u32::<BigEndian>(state.inventory.len() as u32)?;
    for item in &state.inventory {
        w.write_u32::<BigEndian>(item.item_id)?;
        w.write_u8(u8::from(item.highlighted))?;
    }

    w.write_u32::<BigEndian>(state.sounds.len() as u32)?;
    for sound in &state.sounds {
        write_string(w, &sound.name)?;
        w.write_u32::<BigEndian>(sound.id)?;
        w.write_i32::<BigEndian>(sound.volume)?;
        w.write_i32::<BigEndian>(sound.balance)?;
        w.write_u8(u8::from(sound.is_3d))?;
        w.write_u8(u8::from(sound.is_looping))?;
        if version >= VERSION_SOUND_LOOP_RESTART {
            w.write_u8(u8::from(sound.try_to_loop_when_restarted))?;
        }
        w.write_u8(u8::from(sound.is_speech))?;
        w.write_i32::<BigEndian>(sound.x)?;
        w.write_i32::<BigEndian>(sound.y)?;
        write_params_3d(w, &sound.params_3d)?;
    }

    if version >= VERSION_AMBIENT_SOUNDS {
        w.write_u32::<BigEndian>(state.ambient_sounds.len() as u32)?;
        for ambient in &state.ambient_sounds {
            write_string(w, &ambient.name)?;
            w.write_i32::<BigEndian>(ambient.volume)?;
            w.write_i32::<BigEndian>(ambient.balance)?;
            w.write_u32::<BigEndian>(ambient.frequency)?;
            w.write_u32::<BigEndian>(ambient.scene_changes_remaining)?;
        }
    }

    Ok(())
}

fn write_params_3d<W: Write>(w: &mut W, params: &SoundParams3D) -> io::Result<()> {
    w.write_u32::<BigEndian>(params.min_range)?;
    w.write_u32::<BigEndian>(params.max_range)?;
    w.write_u32::<BigEndian>(params.unknown_range)
}

fn write_string<W: Write>(w: &mut W, value: &str) -> io::Result<()> {
    if value.len() > MAX_STRING_LEN as usize {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("string of {} bytes exceeds the save limit", value.len()),
        ));
    }
    w.write_u32::<BigEndian>(value.len() as u32)?;
    w.write_all(value.as_bytes())
}

fn write_i32_map<W: Write>(w: &mut W, map: &BTreeMap<u32, i32>) -> io::Result<()> {
    w.write_u32::<BigEndian>(map.len() as u32)?;
    for (key, value) in map {
        w.write_u32::<BigEndian>(*key)?;
        w.write_i32::<BigEndian>(*value)?;
    }
    Ok(())
}

/// Write a snapshot to disk in the current format.
pub fn write_save_file(path: impl AsRef<Path>, snapshot: &SaveGameSnapshot) -> Result<()> {
    let path = path.as_ref();
    let bytes = snapshot
        .to_bytes()
        .with_context(|| format!("encoding save file {}", path.display()))?;
    fs::write(path, &bytes).with_context(|| format!("writing save file {}", path.display()))
}

/// Read a snapshot from disk. A [`SaveError`] is preserved inside the
/// returned error so callers can downcast and pick their messaging.
pub fn read_save_file(path: impl AsRef<Path>) -> Result<SaveGameSnapshot> {
    let path = path.as_ref();
    let bytes = fs::read(path).with_context(|| format!("reading save file {}", path.display()))?;
    let snapshot = SaveGameSnapshot::from_bytes(&bytes)
        .with_context(|| format!("decoding save file {}", path.display()))?;
    Ok(snapshot)
}
