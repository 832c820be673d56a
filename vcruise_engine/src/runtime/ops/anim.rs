//! Animation, panorama, gyro and static-animation opcodes.

use log::debug;

use crate::definitions::{AnimationDef, NUM_DIRECTIONS};
use crate::gyro::NUM_GYROS;
use crate::runtime::{GameState, Runtime, StaticAnimation};
use crate::script::{Instruction, ScriptError, ScriptOp};
use crate::value::StackInt;

use super::{invalid_argument, non_negative, ANIM_DEF_ARGS};

type OpResult = Result<(), ScriptError>;

impl Runtime {
    /// Where the player ends up once the playing animation finishes.
    fn set_destination(&mut self, op: ScriptOp, screen: StackInt, direction: StackInt) -> OpResult {
        let screen = non_negative(op, screen, "negative screen number")?;
        self.direction = direction.rem_euclid(NUM_DIRECTIONS as StackInt) as u32;
        if screen != self.screen {
            self.screen = screen;
            self.pending.screen_change = true;
        } else {
            self.pending.return_to_idle = true;
            self.pending.pre_idle_actions = true;
        }
        Ok(())
    }

    fn play_and_wait(&mut self, def: &AnimationDef, initial_frame: u32) {
        self.change_animation(def, initial_frame, true);
        self.state = GameState::WaitingForAnimation;
    }
}

fn gyro_index(op: ScriptOp, index: StackInt) -> Result<usize, ScriptError> {
    match usize::try_from(index) {
        Ok(index) if index < NUM_GYROS => Ok(index),
        _ => Err(ScriptError::InvalidGyro {
            op: op.name(),
            index,
        }),
    }
}

pub(crate) fn anim(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let args = rt.stack.pop_n_int::<{ ANIM_DEF_ARGS + 2 }>(ins.op)?;
    let def = rt.anim_def_from_args(ins.op, &args[..ANIM_DEF_ARGS])?;
    rt.play_and_wait(&def, def.first_frame);
    rt.set_destination(ins.op, args[ANIM_DEF_ARGS], args[ANIM_DEF_ARGS + 1])
}

/// Like `Anim`, but shows only the final frame.
pub(crate) fn anim_s(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let args = rt.stack.pop_n_int::<{ ANIM_DEF_ARGS + 2 }>(ins.op)?;
    let def = rt.anim_def_from_args(ins.op, &args[..ANIM_DEF_ARGS])?;
    rt.play_and_wait(&def, def.last_frame);
    rt.set_destination(ins.op, args[ANIM_DEF_ARGS], args[ANIM_DEF_ARGS + 1])
}

/// Turns to face a direction before playing the animation.
pub(crate) fn anim_f(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let args = rt.stack.pop_n_int::<{ ANIM_DEF_ARGS + 3 }>(ins.op)?;
    let def = rt.anim_def_from_args(ins.op, &args[..ANIM_DEF_ARGS])?;
    let face = args[ANIM_DEF_ARGS + 2].rem_euclid(NUM_DIRECTIONS as StackInt) as u32;
    match rt.face_direction_animation(face) {
        Some((turn, initial, stop)) => {
            debug!("turning from {} to {face} before animation", rt.direction);
            rt.change_animation(&turn, initial, false);
            rt.anim.set_stop_frame(Some(stop));
            rt.post_facing_anim = Some(def);
            rt.state = GameState::WaitingForFacingToAnim;
        }
        None => rt.play_and_wait(&def, def.first_frame),
    }
    rt.set_destination(ins.op, args[ANIM_DEF_ARGS], args[ANIM_DEF_ARGS + 1])
}

/// Plays an animation without moving the player.
pub(crate) fn anim_n(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let args = rt.stack.pop_n_int::<ANIM_DEF_ARGS>(ins.op)?;
    let def = rt.anim_def_from_args(ins.op, &args)?;
    rt.play_and_wait(&def, def.first_frame);
    Ok(())
}

/// Hands the pointer to a gyro: positive and negative step animations plus
/// the index of the dial being dragged.
pub(crate) fn anim_g(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let args = rt.stack.pop_n_int::<{ ANIM_DEF_ARGS * 2 + 1 }>(ins.op)?;
    let positive = rt.anim_def_from_args(ins.op, &args[..ANIM_DEF_ARGS])?;
    let negative = rt.anim_def_from_args(ins.op, &args[ANIM_DEF_ARGS..ANIM_DEF_ARGS * 2])?;
    let index = gyro_index(ins.op, args[ANIM_DEF_ARGS * 2])?;

    rt.gyros.positive_anim = positive;
    rt.gyros.negative_anim = negative;
    rt.gyros.active_gyro = index;
    rt.gyros.begin_drag(rt.mouse);
    rt.state = GameState::GyroIdle;
    debug!("dragging gyro {index} from {:?}", rt.mouse);
    Ok(())
}

/// Starts the pan that triggered the running pan interaction.
pub(crate) fn anim_r(rt: &mut Runtime, _ins: Instruction) -> OpResult {
    if let Some(direction) = rt.env.pan_interaction {
        rt.pan.anchor = rt.mouse;
        rt.begin_pan(direction);
    }
    Ok(())
}

/// Displays the final frame of an animation.
pub(crate) fn static_frame(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let args = rt.stack.pop_n_int::<ANIM_DEF_ARGS>(ins.op)?;
    let def = rt.anim_def_from_args(ins.op, &args)?;
    rt.change_animation(&def, def.last_frame, false);
    rt.state = GameState::WaitingForAnimation;
    Ok(())
}

/// Binds a looping idle animation to a facing direction.
pub(crate) fn s_anim_l(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let args = rt.stack.pop_n_int::<{ ANIM_DEF_ARGS + 1 }>(ins.op)?;
    let def = rt.anim_def_from_args(ins.op, &args[..ANIM_DEF_ARGS])?;
    let direction = args[ANIM_DEF_ARGS].rem_euclid(NUM_DIRECTIONS as StackInt) as u32;
    rt.idle.animations[direction as usize] = Some(def);
    if direction == rt.direction {
        rt.idle.playing = None;
    }
    Ok(())
}

pub(crate) fn change_l(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let screen = rt.stack.pop_int(ins.op)?;
    rt.screen = non_negative(ins.op, screen, "negative screen number")?;
    rt.pending.screen_change = true;
    Ok(())
}

pub(crate) fn anim_change(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let [first, last] = rt.stack.pop_n_int::<2>(ins.op)?;
    let first = non_negative(ins.op, first, "negative frame")?;
    let last = non_negative(ins.op, last, "negative frame")?;
    if last < first {
        return Err(invalid_argument(ins.op, last as StackInt, "last frame before first"));
    }
    rt.anim.set_range(first, last);
    Ok(())
}

pub(crate) fn anim_volume(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let volume = rt.stack.pop_int(ins.op)?;
    rt.anim_volume = volume.clamp(0, 100);
    Ok(())
}

/// Overrides the frame rate of the next animation started by a script.
pub(crate) fn speed(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let fps = rt.stack.pop_int(ins.op)?;
    rt.env.fps_override = u32::try_from(fps).ok().filter(|fps| *fps > 0);
    Ok(())
}

/// Registers the left and right panorama animations of this screen.
pub(crate) fn rotate(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let args = rt.stack.pop_n_int::<{ ANIM_DEF_ARGS * 2 + 1 }>(ins.op)?;
    rt.pan.left = Some(rt.anim_def_from_args(ins.op, &args[..ANIM_DEF_ARGS])?);
    rt.pan.right = Some(rt.anim_def_from_args(ins.op, &args[ANIM_DEF_ARGS..ANIM_DEF_ARGS * 2])?);
    rt.pan.frame_rate = u32::try_from(args[ANIM_DEF_ARGS * 2]).ok().filter(|fps| *fps > 0);
    Ok(())
}

pub(crate) fn rotate_update(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let fps = rt.stack.pop_int(ins.op)?;
    rt.pan.frame_rate = u32::try_from(fps).ok().filter(|fps| *fps > 0);
    Ok(())
}

pub(crate) fn parm0(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let [gyro, required] = rt.stack.pop_n_int::<2>(ins.op)?;
    let gyro = &mut rt.gyros.gyros[gyro_index(ins.op, gyro)?];
    gyro.required_state = required;
    gyro.require_state = true;
    Ok(())
}

pub(crate) fn parm1(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let [gyro, a, b, c] = rt.stack.pop_n_int::<4>(ins.op)?;
    let gyro = &mut rt.gyros.gyros[gyro_index(ins.op, gyro)?];
    gyro.required_previous_states = vec![a, b, c];
    Ok(())
}

pub(crate) fn parm2(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let [gyro, wrap, initial] = rt.stack.pop_n_int::<3>(ins.op)?;
    let gyro = &mut rt.gyros.gyros[gyro_index(ins.op, gyro)?];
    gyro.wrap_around = wrap != 0;
    gyro.current_state = initial;
    gyro.previous_states.clear();
    Ok(())
}

/// Interactions run after a gyro drag: one when solved, one otherwise.
pub(crate) fn parm3(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let [complete, failure, vertical] = rt.stack.pop_n_int::<3>(ins.op)?;
    rt.gyros.complete_interaction = non_negative(ins.op, complete, "negative interaction id")?;
    rt.gyros.failure_interaction = non_negative(ins.op, failure, "negative interaction id")?;
    rt.gyros.is_vertical = vertical != 0;
    Ok(())
}

pub(crate) fn parm_g(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let [gyro, margin, max] = rt.stack.pop_n_int::<3>(ins.op)?;
    let index = gyro_index(ins.op, gyro)?;
    let margin = match u32::try_from(margin) {
        Ok(margin) if margin > 0 => margin,
        _ => return Err(invalid_argument(ins.op, margin, "drag margin must be positive")),
    };
    let max = match u32::try_from(max) {
        Ok(max) if max > 0 => max,
        _ => return Err(invalid_argument(ins.op, max, "gyro maximum must be positive")),
    };
    rt.gyros.active_gyro = index;
    rt.gyros.drag_margin = margin;
    rt.gyros.max_value = max;
    Ok(())
}

pub(crate) fn angle_g_get(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let gyro = rt.stack.pop_int(ins.op)?;
    let state = rt.gyros.gyros[gyro_index(ins.op, gyro)?].current_state;
    rt.stack.push_int(state);
    Ok(())
}

pub(crate) fn s_parm_x(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let [initial, repeat, lock] = rt.stack.pop_n_int::<3>(ins.op)?;
    rt.pending_static_params.initial_delay = non_negative(ins.op, initial, "negative delay")?;
    rt.pending_static_params.repeat_delay = non_negative(ins.op, repeat, "negative delay")?;
    rt.pending_static_params.lock_interactions = lock != 0;
    Ok(())
}

/// Records a static animation pair. Playback is not performed; the record
/// stays available for hosts that want to inspect it.
pub(crate) fn s_anim_x(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let args = rt.stack.pop_n_int::<{ ANIM_DEF_ARGS * 2 + 1 }>(ins.op)?;
    let first = rt.anim_def_from_args(ins.op, &args[..ANIM_DEF_ARGS])?;
    let second = rt.anim_def_from_args(ins.op, &args[ANIM_DEF_ARGS..ANIM_DEF_ARGS * 2])?;
    debug!("static animation {} / {} recorded", first.name, second.name);
    rt.static_animation = Some(StaticAnimation {
        animations: [first, second],
        flags: args[ANIM_DEF_ARGS * 2],
        params: rt.pending_static_params,
    });
    Ok(())
}
