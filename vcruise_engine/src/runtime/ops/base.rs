//! Literals, arithmetic, variables, control flow and name resolution.

use crate::runtime::{CallFrame, Runtime};
use crate::script::{Instruction, ScriptError};
use crate::value::StackInt;

use super::{invalid_argument, non_negative};

type OpResult = Result<(), ScriptError>;

pub(crate) fn number(rt: &mut Runtime, ins: Instruction) -> OpResult {
    rt.stack.push_int(ins.arg);
    Ok(())
}

pub(crate) fn string(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let text = rt.string_operand(ins)?.to_string();
    rt.stack.push_string(text);
    Ok(())
}

pub(crate) fn drop(rt: &mut Runtime, ins: Instruction) -> OpResult {
    rt.stack.pop_n::<1>(ins.op)?;
    Ok(())
}

pub(crate) fn dup(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let top = rt.stack.peek(ins.op)?.clone();
    rt.stack.push(top);
    Ok(())
}

pub(crate) fn swap(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let [a, b] = rt.stack.pop_n::<2>(ins.op)?;
    rt.stack.push(b);
    rt.stack.push(a);
    Ok(())
}

fn binary(rt: &mut Runtime, ins: Instruction, f: impl FnOnce(StackInt, StackInt) -> StackInt) -> OpResult {
    let [a, b] = rt.stack.pop_n_int::<2>(ins.op)?;
    rt.stack.push_int(f(a, b));
    Ok(())
}

fn compare(rt: &mut Runtime, ins: Instruction, f: impl FnOnce(StackInt, StackInt) -> bool) -> OpResult {
    let [a, b] = rt.stack.pop_n_int::<2>(ins.op)?;
    rt.stack.push_bool(f(a, b));
    Ok(())
}

pub(crate) fn add(rt: &mut Runtime, ins: Instruction) -> OpResult {
    binary(rt, ins, StackInt::wrapping_add)
}

pub(crate) fn sub(rt: &mut Runtime, ins: Instruction) -> OpResult {
    binary(rt, ins, StackInt::wrapping_sub)
}

pub(crate) fn mul(rt: &mut Runtime, ins: Instruction) -> OpResult {
    binary(rt, ins, StackInt::wrapping_mul)
}

pub(crate) fn div(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let [a, b] = rt.stack.pop_n_int::<2>(ins.op)?;
    if b == 0 {
        return Err(ScriptError::DivideByZero { op: ins.op.name() });
    }
    rt.stack.push_int(a.wrapping_div(b));
    Ok(())
}

pub(crate) fn modulo(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let [a, b] = rt.stack.pop_n_int::<2>(ins.op)?;
    if b == 0 {
        return Err(ScriptError::DivideByZero { op: ins.op.name() });
    }
    rt.stack.push_int(a.wrapping_rem(b));
    Ok(())
}

pub(crate) fn negate(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let value = rt.stack.pop_int(ins.op)?;
    rt.stack.push_int(value.wrapping_neg());
    Ok(())
}

pub(crate) fn not(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let value = rt.stack.pop_int(ins.op)?;
    rt.stack.push_bool(value == 0);
    Ok(())
}

pub(crate) fn and(rt: &mut Runtime, ins: Instruction) -> OpResult {
    compare(rt, ins, |a, b| a != 0 && b != 0)
}

pub(crate) fn or(rt: &mut Runtime, ins: Instruction) -> OpResult {
    compare(rt, ins, |a, b| a != 0 || b != 0)
}

pub(crate) fn cmp_eq(rt: &mut Runtime, ins: Instruction) -> OpResult {
    compare(rt, ins, |a, b| a == b)
}

pub(crate) fn cmp_ne(rt: &mut Runtime, ins: Instruction) -> OpResult {
    compare(rt, ins, |a, b| a != b)
}

pub(crate) fn cmp_lt(rt: &mut Runtime, ins: Instruction) -> OpResult {
    compare(rt, ins, |a, b| a < b)
}

pub(crate) fn cmp_le(rt: &mut Runtime, ins: Instruction) -> OpResult {
    compare(rt, ins, |a, b| a <= b)
}

pub(crate) fn cmp_gt(rt: &mut Runtime, ins: Instruction) -> OpResult {
    compare(rt, ins, |a, b| a > b)
}

pub(crate) fn cmp_ge(rt: &mut Runtime, ins: Instruction) -> OpResult {
    compare(rt, ins, |a, b| a >= b)
}

pub(crate) fn bit_and(rt: &mut Runtime, ins: Instruction) -> OpResult {
    binary(rt, ins, |a, b| a & b)
}

pub(crate) fn bit_or(rt: &mut Runtime, ins: Instruction) -> OpResult {
    binary(rt, ins, |a, b| a | b)
}

fn bit_index(ins: Instruction, bit: StackInt) -> Result<u32, ScriptError> {
    match u32::try_from(bit) {
        Ok(bit) if bit < 32 => Ok(bit),
        _ => Err(invalid_argument(ins.op, bit, "bit index outside 0..32")),
    }
}

pub(crate) fn bit_load(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let [value, bit] = rt.stack.pop_n_int::<2>(ins.op)?;
    let bit = bit_index(ins, bit)?;
    rt.stack.push_int((value >> bit) & 1);
    Ok(())
}

pub(crate) fn bit_set0(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let [value, bit] = rt.stack.pop_n_int::<2>(ins.op)?;
    let bit = bit_index(ins, bit)?;
    rt.stack.push_int(value & !(1 << bit));
    Ok(())
}

pub(crate) fn bit_set1(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let [value, bit] = rt.stack.pop_n_int::<2>(ins.op)?;
    let bit = bit_index(ins, bit)?;
    rt.stack.push_int(value | (1 << bit));
    Ok(())
}

fn byte_shift(ins: Instruction, index: StackInt) -> Result<u32, ScriptError> {
    match u32::try_from(index) {
        Ok(index) if index < 4 => Ok(index * 8),
        _ => Err(invalid_argument(ins.op, index, "byte index outside 0..4")),
    }
}

pub(crate) fn extract_byte(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let [value, index] = rt.stack.pop_n_int::<2>(ins.op)?;
    let shift = byte_shift(ins, index)?;
    rt.stack.push_int((((value as u32) >> shift) & 0xff) as StackInt);
    Ok(())
}

pub(crate) fn insert_byte(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let [value, byte, index] = rt.stack.pop_n_int::<3>(ins.op)?;
    let shift = byte_shift(ins, index)?;
    let cleared = (value as u32) & !(0xff << shift);
    rt.stack.push_int((cleared | ((byte as u32 & 0xff) << shift)) as StackInt);
    Ok(())
}

pub(crate) fn get_digit(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let [value, digit] = rt.stack.pop_n_int::<2>(ins.op)?;
    let digit = match u32::try_from(digit) {
        Ok(digit) if digit < 10 => digit,
        _ => return Err(invalid_argument(ins.op, digit, "decimal digit outside 0..10")),
    };
    let divisor = 10_i64.pow(digit);
    rt.stack.push_int(((value as i64 / divisor) % 10) as StackInt);
    Ok(())
}

fn var_slot(ins: Instruction, slot: StackInt) -> Result<u32, ScriptError> {
    non_negative(ins.op, slot, "negative variable slot")
}

pub(crate) fn var_load(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let slot = var_slot(ins, rt.stack.pop_int(ins.op)?)?;
    let value = rt.variable(slot);
    rt.stack.push_int(value);
    Ok(())
}

pub(crate) fn var_store(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let [value, slot] = rt.stack.pop_n_int::<2>(ins.op)?;
    let key = rt.var_key(var_slot(ins, slot)?);
    rt.variables.insert(key, value);
    Ok(())
}

pub(crate) fn var_add_and_store(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let [value, slot] = rt.stack.pop_n_int::<2>(ins.op)?;
    let key = rt.var_key(var_slot(ins, slot)?);
    let entry = rt.variables.entry(key).or_insert(0);
    *entry = entry.wrapping_add(value);
    Ok(())
}

pub(crate) fn var_global_load(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let slot = var_slot(ins, rt.stack.pop_int(ins.op)?)?;
    let value = rt.global(slot);
    rt.stack.push_int(value);
    Ok(())
}

pub(crate) fn var_global_store(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let [value, slot] = rt.stack.pop_n_int::<2>(ins.op)?;
    rt.globals.insert(var_slot(ins, slot)?, value);
    Ok(())
}

fn set_half(rt: &mut Runtime, ins: Instruction, high: bool) -> OpResult {
    let [value, slot] = rt.stack.pop_n_int::<2>(ins.op)?;
    let key = rt.var_key(var_slot(ins, slot)?);
    let current = rt.variables.get(&key).copied().unwrap_or(0) as u32;
    let half = value as u32 & 0xffff;
    let updated = if high {
        (current & 0x0000_ffff) | (half << 16)
    } else {
        (current & 0xffff_0000) | half
    };
    rt.variables.insert(key, updated as StackInt);
    Ok(())
}

fn get_half(rt: &mut Runtime, ins: Instruction, high: bool) -> OpResult {
    let slot = var_slot(ins, rt.stack.pop_int(ins.op)?)?;
    let value = rt.variable(slot) as u32;
    let half = if high { value >> 16 } else { value & 0xffff };
    rt.stack.push_int(half as StackInt);
    Ok(())
}

pub(crate) fn lo_set(rt: &mut Runtime, ins: Instruction) -> OpResult {
    set_half(rt, ins, false)
}

pub(crate) fn lo_get(rt: &mut Runtime, ins: Instruction) -> OpResult {
    get_half(rt, ins, false)
}

pub(crate) fn hi_set(rt: &mut Runtime, ins: Instruction) -> OpResult {
    set_half(rt, ins, true)
}

pub(crate) fn hi_get(rt: &mut Runtime, ins: Instruction) -> OpResult {
    get_half(rt, ins, true)
}

/// Pops the top value when it equals the immediate, otherwise leaves it and
/// skips the next instruction.
pub(crate) fn check_value(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let top = rt.stack.peek(ins.op)?.clone().into_int(ins.op)?;
    if top == ins.arg {
        rt.stack.pop_n::<1>(ins.op)?;
    } else if let Some(frame) = rt.call_stack.last_mut() {
        frame.next_instruction += 1;
    }
    Ok(())
}

pub(crate) fn jump(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let Some(frame) = rt.call_stack.last_mut() else {
        return Ok(());
    };
    match usize::try_from(ins.arg) {
        Ok(target) if target <= frame.script.len() => {
            frame.next_instruction = target;
            Ok(())
        }
        _ => Err(invalid_argument(ins.op, ins.arg, "jump target outside script")),
    }
}

/// Abandons the running script for another interaction of this screen.
pub(crate) fn goto(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let id = rt.stack.pop_int(ins.op)?;
    let script = u32::try_from(id)
        .ok()
        .and_then(|id| rt.interaction_script(id))
        .ok_or(ScriptError::InvalidInteraction {
            op: ins.op.name(),
            id,
            room: rt.room,
            screen: rt.screen,
        })?;
    rt.call_stack.clear();
    rt.call_stack.push(CallFrame {
        script,
        next_instruction: 0,
    });
    Ok(())
}

pub(crate) fn call_function(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let script = rt
        .defs
        .scripts
        .function(ins.arg)
        .ok_or(ScriptError::InvalidFunction {
            op: ins.op.name(),
            index: ins.arg,
        })?;
    rt.call_stack.push(CallFrame {
        script,
        next_instruction: 0,
    });
    Ok(())
}

pub(crate) fn return_from_function(rt: &mut Runtime, _ins: Instruction) -> OpResult {
    rt.call_stack.pop();
    if rt.call_stack.is_empty() {
        rt.terminate_script()?;
    }
    Ok(())
}

pub(crate) fn anim_name(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let name = rt.string_operand(ins)?.to_string();
    let def = rt
        .defs
        .resolve_animation(rt.room, &name)
        .ok_or_else(|| rt.unresolved(ins.op, "animation", &name))?;
    rt.push_anim_def(&def);
    Ok(())
}

pub(crate) fn value_name(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let name = rt.string_operand(ins)?;
    let value = rt
        .defs
        .resolve_value(rt.room, name)
        .ok_or_else(|| rt.unresolved(ins.op, "value", name))?;
    rt.stack.push_int(value);
    Ok(())
}

pub(crate) fn var_name(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let name = rt.string_operand(ins)?;
    let slot = rt
        .defs
        .resolve_var(rt.room, name)
        .ok_or_else(|| rt.unresolved(ins.op, "variable", name))?;
    rt.stack.push_int(slot as StackInt);
    Ok(())
}

/// Pushes the wave name itself; sounds resolve lazily when triggered.
pub(crate) fn sound_name(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let name = rt.string_operand(ins)?.to_ascii_lowercase();
    rt.stack.push_string(name);
    Ok(())
}

pub(crate) fn cursor_name(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let name = rt.string_operand(ins)?;
    let cursor = rt
        .defs
        .resolve_cursor(name)
        .ok_or_else(|| rt.unresolved(ins.op, "cursor", name))?;
    rt.stack.push_int(cursor as StackInt);
    Ok(())
}

pub(crate) fn screen_name(rt: &mut Runtime, ins: Instruction) -> OpResult {
    let name = rt.string_operand(ins)?;
    let screen = rt
        .defs
        .resolve_screen(rt.room, name)
        .ok_or_else(|| rt.unresolved(ins.op, "screen", name))?;
    rt.stack.push_int(screen as StackInt);
    Ok(())
}
