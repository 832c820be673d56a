//! Inventory, cursor, input gating, timers and other environment queries.

use log::{debug, info, warn};
use rand::Rng;
use vcruise_formats::SwappableState;

use crate::definitions::NUM_DIRECTIONS;
use crate::host::MenuKind;
use crate::runtime::{GameState, InventoryItem, Location, Runtime};
use crate::script::{Instruction, ScriptError};
use crate::value::StackInt;

use super::non_negative;

type OpResult = Result<(), ScriptError>;

fn item_id(ins: Instruction, value: StackInt) -> Result<u32, ScriptError> {
    non_negative(ins.op, value, "negative item id")
}

pub(crate) fn item_check(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let item = item_id(ins, rt.stack.pop_int(ins.op)?)?;
    let held = rt.inventory.iter().any(|slot| slot.item_id == item);
    rt.stack.push_bool(held);
    Ok(())
}

pub(crate) fn item_remove(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let item = item_id(ins, rt.stack.pop_int(ins.op)?)?;
    for slot in 0..rt.inventory.len() {
        if rt.inventory[slot].item_id == item {
            rt.inventory[slot] = InventoryItem::default();
            rt.redraw_tray_slot(slot);
        }
    }
    Ok(())
}

fn set_highlight(rt: &mut Runtime, item: u32, highlighted: bool) {
    for slot in 0..rt.inventory.len() {
        if rt.inventory[slot].item_id == item && rt.inventory[slot].highlighted != highlighted {
            rt.inventory[slot].highlighted = highlighted;
            rt.redraw_tray_slot(slot);
        }
    }
}

pub(crate) fn item_highlight_set(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let [item, flag] = rt.stack.pop_n_int::<2>(ins.op)?;
    let item = item_id(ins, item)?;
    set_highlight(rt, item, flag != 0);
    Ok(())
}

pub(crate) fn item_highlight_set_true(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let item = item_id(ins, rt.stack.pop_int(ins.op)?)?;
    set_highlight(rt, item, true);
    Ok(())
}

pub(crate) fn item_add(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let item = item_id(ins, rt.stack.pop_int(ins.op)?)?;
    if item == 0 {
        return Ok(());
    }
    match rt.inventory.iter().position(|slot| slot.item_id == 0) {
        Some(slot) => {
            rt.inventory[slot] = InventoryItem {
                item_id: item,
                highlighted: false,
            };
            rt.redraw_tray_slot(slot);
        }
        None => warn!("inventory is full, dropping item {item}"),
    }
    Ok(())
}

pub(crate) fn item_have_space(rt: &mut Runtime, _ins: Instruction) -> OpResult {
    let space = rt.inventory.iter().any(|slot| slot.item_id == 0);
    rt.stack.push_bool(space);
    Ok(())
}

pub(crate) fn item_clear(rt: &mut Runtime, _ins: Instruction) -> OpResult {
    for slot in 0..rt.inventory.len() {
        if rt.inventory[slot] != InventoryItem::default() {
            rt.inventory[slot] = InventoryItem::default();
            rt.redraw_tray_slot(slot);
        }
    }
    Ok(())
}

pub(crate) fn set_cursor(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let cursor = rt.stack.pop_int(ins.op)?;
    rt.set_cursor(u32::try_from(cursor).ok());
    Ok(())
}

/// Continues only when the script runs for a click. A hover run stops
/// here and marks the region clickable.
pub(crate) fn lmb(rt: &mut Runtime, _ins: Instruction) -> OpResult {
    if rt.env.lmb {
        return Ok(());
    }
    rt.idle.have_click = true;
    let cursor = rt.defs.config.interactive_cursor;
    rt.set_cursor(cursor);
    rt.terminate_script()
}

pub(crate) fn lmb1(rt: &mut Runtime, _ins: Instruction) -> OpResult {
    if rt.env.lmb_drag {
        return Ok(());
    }
    rt.terminate_script()
}

/// Faces a direction. With panorama animations registered the turn is
/// played and the script resumes once it reaches the target slice.
pub(crate) fn angle(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let direction = rt.stack.pop_int(ins.op)?;
    let direction = direction.rem_euclid(NUM_DIRECTIONS as StackInt) as u32;
    if let Some((turn, initial, stop)) = rt.face_direction_animation(direction) {
        debug!("turning from {} to {direction}", rt.direction);
        rt.change_animation(&turn, initial, false);
        rt.anim.set_stop_frame(Some(stop));
        rt.state = GameState::WaitingForFacing;
    }
    rt.direction = direction;
    rt.idle.playing = None;
    Ok(())
}

pub(crate) fn angle_get(rt: &mut Runtime, _ins: Instruction) -> OpResult {
    rt.stack.push_int(rt.direction as StackInt);
    Ok(())
}

pub(crate) fn esc_on(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let flag = rt.stack.pop_int(ins.op)?;
    rt.esc_armed = flag != 0;
    Ok(())
}

pub(crate) fn esc_off(rt: &mut Runtime, _ins: Instruction) -> OpResult {
    rt.esc_armed = false;
    Ok(())
}

/// Reports and clears the escape flag set by an interrupted animation.
pub(crate) fn esc_get(rt: &mut Runtime, _ins: Instruction) -> OpResult {
    let pressed = rt.env.esc;
    rt.env.esc = false;
    rt.stack.push_bool(pressed);
    Ok(())
}

pub(crate) fn set_timer(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let [key, seconds] = rt.stack.pop_n_int::<2>(ins.op)?;
    let key = non_negative(ins.op, key, "negative timer key")?;
    let seconds = non_negative(ins.op, seconds, "negative timer duration")?;
    let deadline = rt.now() + seconds as u64 * 1000;
    rt.timers.insert(key, deadline);
    Ok(())
}

/// Pushes 1 once the timer has run out (or was never set).
pub(crate) fn get_timer(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let key = non_negative(ins.op, rt.stack.pop_int(ins.op)?, "negative timer key")?;
    let now = rt.now();
    let completed = rt.timers.get(&key).map_or(true, |deadline| now >= *deadline);
    rt.stack.push_bool(completed);
    Ok(())
}

pub(crate) fn delay(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let millis = non_negative(ins.op, rt.stack.pop_int(ins.op)?, "negative delay")?;
    rt.delay_until = rt.now() + millis as u64;
    rt.state = GameState::Delay;
    Ok(())
}

pub(crate) fn random(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let limit = rt.stack.pop_int(ins.op)?;
    let value = if limit <= 0 {
        0
    } else {
        rt.rng.gen_range(0..limit)
    };
    rt.stack.push_int(value);
    Ok(())
}

pub(crate) fn random_inclusive(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let limit = rt.stack.pop_int(ins.op)?;
    let value = if limit <= 0 {
        0
    } else {
        rt.rng.gen_range(0..=limit)
    };
    rt.stack.push_int(value);
    Ok(())
}

pub(crate) fn set_room(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let room = non_negative(ins.op, rt.stack.pop_int(ins.op)?, "negative room number")?;
    rt.room = room;
    Ok(())
}

pub(crate) fn get_room(rt: &mut Runtime, _ins: Instruction) -> OpResult {
    rt.stack.push_int(rt.room as StackInt);
    Ok(())
}

/// Every disc is always present.
pub(crate) fn disc1(rt: &mut Runtime, ins: Instruction) -> OpResult {
    rt.stack.pop_n_int::<1>(ins.op)?;
    rt.stack.push_int(1);
    Ok(())
}

pub(crate) fn disc2(rt: &mut Runtime, ins: Instruction) -> OpResult {
    rt.stack.pop_n_int::<2>(ins.op)?;
    rt.stack.push_int(1);
    Ok(())
}

pub(crate) fn disc3(rt: &mut Runtime, ins: Instruction) -> OpResult {
    rt.stack.pop_n_int::<3>(ins.op)?;
    rt.stack.push_int(1);
    Ok(())
}

pub(crate) fn is_cd_version(rt: &mut Runtime, _ins: Instruction) -> OpResult {
    rt.stack.push_bool(rt.defs.config.is_cd_version);
    Ok(())
}

pub(crate) fn is_dvd_version(rt: &mut Runtime, _ins: Instruction) -> OpResult {
    rt.stack.push_bool(rt.defs.config.is_dvd_version);
    Ok(())
}

pub(crate) fn hide_panel(rt: &mut Runtime, _ins: Instruction) -> OpResult {
    if rt.tray_visible {
        rt.tray_visible = false;
        rt.host.presentation.show_tray(false);
    }
    Ok(())
}

pub(crate) fn allow_saves(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let flag = rt.stack.pop_int(ins.op)?;
    rt.saves_allowed = flag != 0;
    Ok(())
}

/// Records a checkpoint of the current state. `SaveAs` shares this; the
/// host decides when to persist the checkpoint.
pub(crate) fn save0(rt: &mut Runtime, _ins: Instruction) -> OpResult {
    if rt.is_in_game {
        rt.checkpoint = Some(rt.capture_snapshot());
        info!("checkpoint recorded in room {} screen {:#x}", rt.room, rt.screen);
    }
    Ok(())
}

pub(crate) fn back_start(rt: &mut Runtime, _ins: Instruction) -> OpResult {
    rt.is_in_game = false;
    rt.pending.menu = Some(MenuKind::Main);
    Ok(())
}

pub(crate) fn exit(rt: &mut Runtime, _ins: Instruction) -> OpResult {
    info!("game finished");
    rt.is_in_game = false;
    rt.checkpoint = None;
    rt.pending.menu = Some(MenuKind::Credits);
    rt.terminate_script()
}

pub(crate) fn hero_out(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let [room, screen, direction] = rt.stack.pop_n_int::<3>(ins.op)?;
    rt.heroes.swap_out = Location {
        room: non_negative(ins.op, room, "negative room number")?,
        screen: non_negative(ins.op, screen, "negative screen number")?,
        direction: direction.rem_euclid(NUM_DIRECTIONS as StackInt) as u32,
    };
    rt.pending.hero_swap = true;
    debug!("hero {} leaves for {:?}", rt.heroes.hero, rt.heroes.swap_out);
    Ok(())
}

pub(crate) fn hero_get(rt: &mut Runtime, _ins: Instruction) -> OpResult {
    rt.stack.push_int(rt.heroes.hero as StackInt);
    Ok(())
}

/// Pushes room, screen and direction of the given hero.
pub(crate) fn hero_get_pos(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let hero = rt.stack.pop_int(ins.op)?;
    let location = if hero == rt.heroes.hero as StackInt {
        rt.location()
    } else {
        rt.heroes
            .other
            .as_ref()
            .map(|state| Location {
                room: state.room_number,
                screen: state.screen_number,
                direction: state.direction,
            })
            .unwrap_or_default()
    };
    rt.stack.push_int(location.room as StackInt);
    rt.stack.push_int(location.screen as StackInt);
    rt.stack.push_int(location.direction as StackInt);
    Ok(())
}

pub(crate) fn hero_set_pos(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let [hero, room, screen, direction] = rt.stack.pop_n_int::<4>(ins.op)?;
    let room = non_negative(ins.op, room, "negative room number")?;
    let screen = non_negative(ins.op, screen, "negative screen number")?;
    let direction = direction.rem_euclid(NUM_DIRECTIONS as StackInt) as u32;
    if hero == rt.heroes.hero as StackInt {
        rt.room = room;
        rt.screen = screen;
        rt.direction = direction;
        rt.pending.screen_change = true;
    } else {
        let other = rt.heroes.other.get_or_insert_with(SwappableState::default);
        other.room_number = room;
        other.screen_number = screen;
        other.direction = direction;
        other.have_pending_post_swap_screen_reset = true;
    }
    Ok(())
}
