//! Capturing and restoring [`SaveGameSnapshot`]s, including the hero swap
//! that exchanges the two swappable states.

use std::rc::Rc;

use log::{debug, info, warn};
use vcruise_formats::{
    SaveGameSnapshot, SavedAnimationRange, SavedInventoryItem, SwappableState,
};

use super::{GameState, InventoryItem, Location, Runtime, ScriptEnvironment, INVENTORY_SLOTS};
use crate::definitions::{AnimationDef, ListenerPose, NUM_DIRECTIONS};

impl Runtime {
    fn capture_swappable(&self) -> SwappableState {
        let (score_track, score_section) = self.music.score();
        let idle_animation = self.idle.animations[(self.direction % NUM_DIRECTIONS) as usize]
            .as_ref()
            .map(|def| SavedAnimationRange {
                resource_id: def.resource_id,
                first_frame: def.first_frame,
                last_frame: def.last_frame,
            });
        SwappableState {
            room_number: self.room,
            screen_number: self.screen,
            direction: self.direction,
            have_pending_post_swap_screen_reset: false,
            loaded_animation: self.anim.loaded_resource_id(),
            anim_displaying_frame: self.anim.displaying_frame(),
            idle_animation,
            music_track: self.music.track(),
            music_active: self.music.is_active(),
            music_volume: self.music.volume(),
            music_mute_disabled: self.music.mute_disabled(),
            score_track: score_track.to_string(),
            score_section: score_section.to_string(),
            anim_volume: self.anim_volume,
            inventory: self
                .inventory
                .iter()
                .map(|item| SavedInventoryItem {
                    item_id: item.item_id,
                    highlighted: item.highlighted,
                })
                .collect(),
            sounds: self.sounds.to_saved(),
            ambient_sounds: self.sounds.ambient().to_saved(),
        }
    }

    /// Deep copy of the mutable game state.
    pub fn capture_snapshot(&self) -> SaveGameSnapshot {
        let now = self.now();
        let mut states = vec![self.capture_swappable()];
        if let Some(other) = &self.heroes.other {
            states.push(other.clone());
        }
        let listener = self.sounds.listener();
        SaveGameSnapshot {
            hero: self.heroes.hero,
            swap_out_room: self.heroes.swap_out.room,
            swap_out_screen: self.heroes.swap_out.screen,
            swap_out_direction: self.heroes.swap_out.direction,
            esc_on: self.esc_armed,
            states,
            variables: self.variables.clone(),
            global_variables: self.globals.clone(),
            timers: self
                .timers
                .iter()
                .map(|(key, deadline)| {
                    let remaining = deadline.saturating_sub(now).min(u32::MAX as u64);
                    (*key, remaining as u32)
                })
                .collect(),
            triggered_one_shots: self.triggered_one_shots.iter().copied().collect(),
            say_cycles: self.say_cycles.clone(),
            listener_x: listener.x,
            listener_y: listener.y,
            listener_angle: listener.angle,
            pending_static_anim_params: self.pending_static_params,
            pending_sound_params_3d: self.pending_sound_params,
        }
    }

    /// Most recent checkpoint, the state a save file should hold.
    pub fn save_snapshot(&self) -> Option<SaveGameSnapshot> {
        self.checkpoint.clone()
    }

    /// Discards the running script and every live sound, then rebuilds the
    /// game from `snapshot`. The saved screen is re-entered on the next
    /// quantum. A snapshot without any hero state is ignored.
    pub fn restore_snapshot(&mut self, snapshot: &SaveGameSnapshot) {
        let Some(active) = snapshot.active_state() else {
            warn!("snapshot has no hero state, keeping the running game");
            return;
        };
        info!(
            "restoring snapshot at room {} screen {:#x}",
            active.room_number, active.screen_number
        );
        let now = self.now();

        self.stack.clear();
        self.call_stack.clear();
        self.env = ScriptEnvironment::default();
        self.pending = Default::default();
        self.post_facing_anim = None;

        self.heroes.hero = snapshot.hero;
        self.heroes.swap_out = Location {
            room: snapshot.swap_out_room,
            screen: snapshot.swap_out_screen,
            direction: snapshot.swap_out_direction,
        };
        self.heroes.other = snapshot.states.get(1).cloned();

        self.esc_armed = snapshot.esc_on;
        self.variables = snapshot.variables.clone();
        self.globals = snapshot.global_variables.clone();
        self.timers = snapshot
            .timers
            .iter()
            .map(|(key, remaining)| (*key, now + *remaining as u64))
            .collect();
        self.triggered_one_shots = snapshot.triggered_one_shots.iter().copied().collect();
        self.say_cycles = snapshot.say_cycles.clone();
        self.pending_static_params = snapshot.pending_static_anim_params;
        self.pending_sound_params = snapshot.pending_sound_params_3d;

        let pose = ListenerPose {
            x: snapshot.listener_x,
            y: snapshot.listener_y,
            angle: snapshot.listener_angle,
        };
        self.apply_swappable(active);
        self.sounds.set_listener(pose, self.host.audio.as_mut());

        self.is_in_game = true;
        self.checkpoint = Some(snapshot.clone());
        self.state = GameState::Idle;
    }

    /// Replaces location, inventory, music and sounds with `state`.
    fn apply_swappable(&mut self, state: &SwappableState) {
        let now = self.now();
        let defs = Rc::clone(&self.defs);
        let audio = self.host.audio.as_mut();
        self.sounds.clear(audio);
        self.sounds.ambient_mut().clear();
        self.music.stop(audio);

        self.room = state.room_number;
        self.screen = state.screen_number;
        self.direction = state.direction % NUM_DIRECTIONS;

        for slot in 0..INVENTORY_SLOTS {
            self.inventory[slot] = state
                .inventory
                .get(slot)
                .map(|item| InventoryItem {
                    item_id: item.item_id,
                    highlighted: item.highlighted,
                })
                .unwrap_or_default();
            self.redraw_tray_slot(slot);
        }
        self.anim_volume = state.anim_volume;

        let audio = self.host.audio.as_mut();
        self.music
            .restore_settings(state.music_track, state.music_volume, state.music_mute_disabled);
        if !state.score_track.is_empty() {
            self.music
                .play_score(&state.score_track, &state.score_section, now, &defs.scores, audio);
        } else if state.music_active {
            self.music.play_track(state.music_track, audio);
        }
        self.sounds.restore_saved(&state.sounds, now, &defs.waves, audio);
        self.sounds.ambient_mut().restore(&state.ambient_sounds);

        if state.loaded_animation != 0 {
            let frame = state.anim_displaying_frame;
            let def = AnimationDef {
                resource_id: state.loaded_animation,
                first_frame: frame,
                last_frame: frame,
                ..AnimationDef::default()
            };
            self.change_animation(&def, frame, false);
            self.advance_animation(false, false);
        }

        self.restored_idle = state.idle_animation.map(|range| AnimationDef {
            resource_id: range.resource_id,
            first_frame: range.first_frame,
            last_frame: range.last_frame,
            ..AnimationDef::default()
        });
        self.pending.screen_change = true;
    }

    /// Exchanges the active hero with the stored one. The outgoing hero is
    /// parked at the location given by `HeroOut`.
    pub(crate) fn swap_heroes(&mut self) {
        let mut outgoing = self.capture_swappable();
        let parked = self.heroes.swap_out;
        outgoing.room_number = parked.room;
        outgoing.screen_number = parked.screen;
        outgoing.direction = parked.direction;
        outgoing.have_pending_post_swap_screen_reset = true;

        let incoming = self.heroes.other.replace(outgoing);
        self.heroes.hero ^= 1;
        info!("switched to hero {}", self.heroes.hero);
        match incoming {
            Some(state) => self.apply_swappable(&state),
            None => {
                debug!("hero {} has no stored state, keeping location", self.heroes.hero);
                self.pending.screen_change = true;
            }
        }
    }
}
