//! Sound, music and speech opcodes. The Reah family names waves on the
//! stack; the Schizm family addresses them by numeric id.

use std::rc::Rc;

use log::debug;
use vcruise_formats::TriggeredOneShot;

use crate::runtime::{GameState, Runtime};
use crate::script::{Instruction, ScriptError, ScriptOp};
use crate::sound::{sound_id_from_name, sound_name_suffix, AmbientSound, TriggerRequest, MAX_VOLUME, SILENT_VOLUME};
use crate::value::StackInt;

use super::non_negative;

type OpResult = Result<(), ScriptError>;

impl Runtime {
    fn sound_by_name(&mut self, name: &str, load: bool) -> Option<usize> {
        let defs = Rc::clone(&self.defs);
        self.sounds.resolve_by_name(name, load, &defs.waves)
    }

    fn sound_by_id(&mut self, op: ScriptOp, id: StackInt, load: bool) -> Result<Option<usize>, ScriptError> {
        let id = non_negative(op, id, "negative sound id")?;
        let defs = Rc::clone(&self.defs);
        Ok(self.sounds.resolve_by_id(id, load, &defs.waves))
    }

    fn trigger_sound(&mut self, index: usize, request: TriggerRequest) {
        let now = self.now();
        self.sounds
            .trigger(index, request, now, self.host.audio.as_mut());
        if request.is_speech {
            let name = self.sounds.sound(index).name.clone();
            self.show_wave_subtitle(&name);
        }
    }

    fn trigger_positioned(&mut self, index: usize, x: i32, y: i32, request: TriggerRequest) {
        let params = self.pending_sound_params;
        self.sounds.set_position(index, x, y, params);
        self.trigger_sound(index, request.positioned());
    }

    fn ramp_sound(&mut self, index: usize, duration: u32, target: i32, terminate: bool) {
        let now = self.now();
        self.sounds
            .ramp_volume(index, duration as u64, target, terminate, now);
    }

    pub(crate) fn show_wave_subtitle(&mut self, name: &str) {
        let key = sound_name_suffix(name).to_ascii_lowercase();
        let Some(subtitle) = self.defs.wave_subtitles.get(&key).cloned() else {
            return;
        };
        let now = self.now();
        self.show_subtitle(&subtitle, now);
    }
}

fn play_named(rt: &mut Runtime, name: &str, request: TriggerRequest) {
    if let Some(index) = rt.sound_by_name(name, true) {
        rt.trigger_sound(index, request);
    }
}

fn duration(op: ScriptOp, value: StackInt) -> Result<u32, ScriptError> {
    non_negative(op, value, "negative duration")
}

pub(crate) fn sound_s1(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let name = rt.stack.pop_string(ins.op)?;
    play_named(rt, &name, TriggerRequest::one_shot(MAX_VOLUME, 0));
    Ok(())
}

pub(crate) fn sound_s2(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let [name, volume] = rt.stack.pop_n::<2>(ins.op)?;
    let name = name.into_string(ins.op)?;
    let volume = volume.into_int(ins.op)?;
    play_named(rt, &name, TriggerRequest::one_shot(volume, 0));
    Ok(())
}

pub(crate) fn sound_s3(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let [name, volume, balance] = rt.stack.pop_n::<3>(ins.op)?;
    let name = name.into_string(ins.op)?;
    let request = TriggerRequest::one_shot(volume.into_int(ins.op)?, balance.into_int(ins.op)?);
    play_named(rt, &name, request);
    Ok(())
}

pub(crate) fn sound_l1(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let name = rt.stack.pop_string(ins.op)?;
    play_named(rt, &name, TriggerRequest::looping(MAX_VOLUME, 0));
    Ok(())
}

pub(crate) fn sound_l2(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let [name, volume] = rt.stack.pop_n::<2>(ins.op)?;
    let name = name.into_string(ins.op)?;
    let volume = volume.into_int(ins.op)?;
    play_named(rt, &name, TriggerRequest::looping(volume, 0));
    Ok(())
}

pub(crate) fn sound_l3(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let [name, volume, balance] = rt.stack.pop_n::<3>(ins.op)?;
    let name = name.into_string(ins.op)?;
    let request = TriggerRequest::looping(volume.into_int(ins.op)?, balance.into_int(ins.op)?);
    play_named(rt, &name, request);
    Ok(())
}

fn sound_3d(rt: &mut Runtime, ins: Instruction, request: TriggerRequest) -> OpResult {
    let [name, x, y] = rt.stack.pop_n::<3>(ins.op)?;
    let name = name.into_string(ins.op)?;
    let (x, y) = (x.into_int(ins.op)?, y.into_int(ins.op)?);
    if let Some(index) = rt.sound_by_name(&name, true) {
        rt.trigger_positioned(index, x, y, request);
    }
    Ok(())
}

pub(crate) fn sound_3d_s2(rt: &mut Runtime, ins: Instruction) -> OpResult {
    sound_3d(rt, ins, TriggerRequest::one_shot(MAX_VOLUME, 0))
}

pub(crate) fn sound_3d_l2(rt: &mut Runtime, ins: Instruction) -> OpResult {
    sound_3d(rt, ins, TriggerRequest::looping(MAX_VOLUME, 0))
}

/// Sets the attenuation ranges used by the next positioned sound.
pub(crate) fn range(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let [min, max, unknown] = rt.stack.pop_n_int::<3>(ins.op)?;
    rt.pending_sound_params.min_range = non_negative(ins.op, min, "negative range")?;
    rt.pending_sound_params.max_range = non_negative(ins.op, max, "negative range")?;
    rt.pending_sound_params.unknown_range = non_negative(ins.op, unknown, "negative range")?;
    Ok(())
}

pub(crate) fn stop_al(rt: &mut Runtime, _ins: Instruction) -> OpResult {
    rt.sounds.stop_all(rt.host.audio.as_mut());
    Ok(())
}

/// Lets every looping sound finish its current iteration.
pub(crate) fn stop_snd_la(rt: &mut Runtime, _ins: Instruction) -> OpResult {
    let now = rt.now();
    for index in rt.sounds.looping_indices() {
        rt.sounds
            .convert_looping_to_non_looping(index, now, rt.host.audio.as_mut());
    }
    Ok(())
}

pub(crate) fn stop_snd_lo(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let name = rt.stack.pop_string(ins.op)?;
    if let Some(index) = rt.sound_by_name(&name, false) {
        let now = rt.now();
        rt.sounds
            .convert_looping_to_non_looping(index, now, rt.host.audio.as_mut());
    }
    Ok(())
}

fn ramp_named(rt: &mut Runtime, name: &str, duration: u32, target: i32, terminate: bool) {
    match rt.sound_by_name(name, false) {
        Some(index) => rt.ramp_sound(index, duration, target, terminate),
        None => debug!("ramp on unplayed sound {name} ignored"),
    }
}

pub(crate) fn volume_dn2(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let [name, millis] = rt.stack.pop_n::<2>(ins.op)?;
    let name = name.into_string(ins.op)?;
    let millis = duration(ins.op, millis.into_int(ins.op)?)?;
    ramp_named(rt, &name, millis, SILENT_VOLUME, true);
    Ok(())
}

pub(crate) fn volume_dn3(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let [name, millis, volume] = rt.stack.pop_n::<3>(ins.op)?;
    let name = name.into_string(ins.op)?;
    let millis = duration(ins.op, millis.into_int(ins.op)?)?;
    ramp_named(rt, &name, millis, volume.into_int(ins.op)?, false);
    Ok(())
}

pub(crate) fn volume_dn4(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let [name, millis, volume, terminate] = rt.stack.pop_n::<4>(ins.op)?;
    let name = name.into_string(ins.op)?;
    let millis = duration(ins.op, millis.into_int(ins.op)?)?;
    let terminate = terminate.into_int(ins.op)? != 0;
    ramp_named(rt, &name, millis, volume.into_int(ins.op)?, terminate);
    Ok(())
}

pub(crate) fn volume_up3(rt: &mut Runtime, ins: Instruction) -> OpResult {
    volume_dn3(rt, ins)
}

pub(crate) fn add_x_sound(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let [name, volume, balance, frequency] = rt.stack.pop_n::<4>(ins.op)?;
    let name = name.into_string(ins.op)?.to_ascii_lowercase();
    let frequency = non_negative(ins.op, frequency.into_int(ins.op)?, "negative frequency")?;
    let sound = AmbientSound::new(name, volume.into_int(ins.op)?, balance.into_int(ins.op)?, frequency);
    rt.sounds.ambient_mut().add(sound);
    Ok(())
}

pub(crate) fn clr_x_sound(rt: &mut Runtime, _ins: Instruction) -> OpResult {
    rt.sounds.ambient_mut().clear();
    Ok(())
}

pub(crate) fn snd_add_random(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let [id, volume, frequency] = rt.stack.pop_n_int::<3>(ins.op)?;
    let frequency = non_negative(ins.op, frequency, "negative frequency")?;
    if let Some(index) = rt.sound_by_id(ins.op, id, true)? {
        let name = rt.sounds.sound(index).name.clone();
        rt.sounds
            .ambient_mut()
            .add(AmbientSound::new(name, volume, 0, frequency));
    }
    Ok(())
}

fn looping_request(looping: StackInt, volume: i32, balance: i32) -> TriggerRequest {
    if looping != 0 {
        TriggerRequest::looping(volume, balance)
    } else {
        TriggerRequest::one_shot(volume, balance)
    }
}

pub(crate) fn snd_play(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let [id, volume, looping] = rt.stack.pop_n_int::<3>(ins.op)?;
    if let Some(index) = rt.sound_by_id(ins.op, id, true)? {
        rt.trigger_sound(index, looping_request(looping, volume, 0));
    }
    Ok(())
}

pub(crate) fn snd_play_ex(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let [id, volume, balance, looping] = rt.stack.pop_n_int::<4>(ins.op)?;
    if let Some(index) = rt.sound_by_id(ins.op, id, true)? {
        rt.trigger_sound(index, looping_request(looping, volume, balance));
    }
    Ok(())
}

pub(crate) fn snd_play_3d(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let [id, volume, x, y, looping] = rt.stack.pop_n_int::<5>(ins.op)?;
    if let Some(index) = rt.sound_by_id(ins.op, id, true)? {
        rt.trigger_positioned(index, x, y, looping_request(looping, volume, 0));
    }
    Ok(())
}

fn sound_playing(rt: &mut Runtime, op: ScriptOp, id: StackInt) -> Result<bool, ScriptError> {
    let Some(index) = rt.sound_by_id(op, id, false)? else {
        return Ok(false);
    };
    let now = rt.now();
    Ok(rt.sounds.is_playing(index, now, rt.host.audio.as_ref()))
}

pub(crate) fn snd_playing(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let id = rt.stack.pop_int(ins.op)?;
    let playing = sound_playing(rt, ins.op, id)?;
    rt.stack.push_bool(playing);
    Ok(())
}

/// Holds the script until a one-shot sound has finished.
pub(crate) fn snd_wait(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let id = rt.stack.pop_int(ins.op)?;
    let Some(index) = rt.sound_by_id(ins.op, id, false)? else {
        return Ok(());
    };
    let now = rt.now();
    let end_time = rt.sounds.sound(index).end_time;
    if end_time > now && rt.sounds.is_playing(index, now, rt.host.audio.as_ref()) {
        rt.delay_until = end_time;
        rt.state = GameState::Delay;
    }
    Ok(())
}

pub(crate) fn snd_halt(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let id = rt.stack.pop_int(ins.op)?;
    if let Some(index) = rt.sound_by_id(ins.op, id, false)? {
        let now = rt.now();
        rt.sounds
            .convert_looping_to_non_looping(index, now, rt.host.audio.as_mut());
    }
    Ok(())
}

pub(crate) fn snd_to_back(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let id = rt.stack.pop_int(ins.op)?;
    if let Some(index) = rt.sound_by_id(ins.op, id, false)? {
        rt.sounds.set_speech(index, false);
    }
    Ok(())
}

pub(crate) fn snd_stop(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let id = rt.stack.pop_int(ins.op)?;
    if let Some(index) = rt.sound_by_id(ins.op, id, false)? {
        rt.sounds.stop(index, rt.host.audio.as_mut());
    }
    Ok(())
}

pub(crate) fn volume_add(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let [id, millis, delta] = rt.stack.pop_n_int::<3>(ins.op)?;
    let millis = duration(ins.op, millis)?;
    if let Some(index) = rt.sound_by_id(ins.op, id, false)? {
        let target = rt.sounds.sound(index).volume.saturating_add(delta);
        rt.ramp_sound(index, millis, target, false);
    }
    Ok(())
}

pub(crate) fn volume_change(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let [id, millis, volume] = rt.stack.pop_n_int::<3>(ins.op)?;
    let millis = duration(ins.op, millis)?;
    if let Some(index) = rt.sound_by_id(ins.op, id, false)? {
        rt.ramp_sound(index, millis, volume, false);
    }
    Ok(())
}

pub(crate) fn music(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let track = rt.stack.pop_int(ins.op)?;
    rt.music.play_track(track, rt.host.audio.as_mut());
    Ok(())
}

pub(crate) fn music_vol_ramp(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let [millis, volume] = rt.stack.pop_n_int::<2>(ins.op)?;
    let millis = duration(ins.op, millis)?;
    let now = rt.now();
    rt.music
        .ramp_volume(millis as u64, volume, now, rt.host.audio.as_mut());
    Ok(())
}

pub(crate) fn music_stop(rt: &mut Runtime, _ins: Instruction) -> OpResult {
    rt.music.stop(rt.host.audio.as_mut());
    Ok(())
}

pub(crate) fn music_play_score(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let [track, section] = rt.stack.pop_n_string::<2>(ins.op)?;
    let now = rt.now();
    rt.music
        .play_score(&track, &section, now, &rt.defs.scores, rt.host.audio.as_mut());
    Ok(())
}

pub(crate) fn score_always(rt: &mut Runtime, _ins: Instruction) -> OpResult {
    rt.music.set_mute_disabled(true);
    Ok(())
}

pub(crate) fn score_normal(rt: &mut Runtime, _ins: Instruction) -> OpResult {
    rt.music.set_mute_disabled(false);
    Ok(())
}

pub(crate) fn say1(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let name = rt.stack.pop_string(ins.op)?;
    play_named(rt, &name, TriggerRequest::speech(MAX_VOLUME));
    Ok(())
}

/// Speaks a line at most once per unique slot.
pub(crate) fn say2(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let [name, slot] = rt.stack.pop_n::<2>(ins.op)?;
    let name = name.into_string(ins.op)?;
    let unique_slot = non_negative(ins.op, slot.into_int(ins.op)?, "negative one-shot slot")?;
    let Some(index) = rt.sound_by_name(&name, true) else {
        return Ok(());
    };
    let key = TriggeredOneShot {
        sound_id: rt.sounds.sound(index).id,
        unique_slot,
    };
    if rt.triggered_one_shots.insert(key) {
        rt.trigger_sound(index, TriggerRequest::speech(MAX_VOLUME));
    } else {
        debug!("one-shot {name} slot {unique_slot} already spoken");
    }
    Ok(())
}

fn say_cycle_base(op: ScriptOp, name: &str, count: StackInt) -> Result<(u32, u32), ScriptError> {
    let count = non_negative(op, count, "negative cycle count")?.max(1);
    let base = sound_id_from_name(name).ok_or_else(|| ScriptError::InvalidArgument {
        op: op.name(),
        value: 0,
        detail: "cycled line has no numeric sound id",
    })?;
    Ok((base, count))
}

/// Speaks the next of `count` numbered variants of a line.
pub(crate) fn say3(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let [name, count] = rt.stack.pop_n::<2>(ins.op)?;
    let name = name.into_string(ins.op)?;
    let (base, count) = say_cycle_base(ins.op, &name, count.into_int(ins.op)?)?;
    let cycle = rt.say_cycles.get(&base).copied().unwrap_or(0) % count;
    rt.say_cycles.insert(base, (cycle + 1) % count);
    if let Some(index) = rt.sound_by_id(ins.op, (base + cycle) as StackInt, true)? {
        rt.trigger_sound(index, TriggerRequest::speech(MAX_VOLUME));
    }
    Ok(())
}

/// Pushes the sound id `Say3` would speak next.
pub(crate) fn say3_get(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let [name, count] = rt.stack.pop_n::<2>(ins.op)?;
    let name = name.into_string(ins.op)?;
    let (base, count) = say_cycle_base(ins.op, &name, count.into_int(ins.op)?)?;
    let cycle = rt.say_cycles.get(&base).copied().unwrap_or(0) % count;
    rt.stack.push_int((base + cycle) as StackInt);
    Ok(())
}

pub(crate) fn speech(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let id = rt.stack.pop_int(ins.op)?;
    if let Some(index) = rt.sound_by_id(ins.op, id, true)? {
        rt.trigger_sound(index, TriggerRequest::speech(MAX_VOLUME));
    }
    Ok(())
}

pub(crate) fn speech_ex(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let [id, volume] = rt.stack.pop_n_int::<2>(ins.op)?;
    if let Some(index) = rt.sound_by_id(ins.op, id, true)? {
        rt.trigger_sound(index, TriggerRequest::speech(volume));
    }
    Ok(())
}

pub(crate) fn speech_test(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let id = rt.stack.pop_int(ins.op)?;
    let playing = sound_playing(rt, ins.op, id)?;
    rt.stack.push_bool(playing);
    Ok(())
}

/// Shows the subtitle of a wave without playing it.
pub(crate) fn dubbing(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let name = rt.stack.pop_string(ins.op)?;
    rt.show_wave_subtitle(&name);
    Ok(())
}
