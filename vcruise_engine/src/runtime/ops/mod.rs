//! Opcode handlers, grouped by the subsystem they drive.

pub(crate) mod anim;
pub(crate) mod base;
pub(crate) mod env;
pub(crate) mod sound;

use crate::definitions::AnimationDef;
use crate::script::{Instruction, ScriptError, ScriptOp};
use crate::types::Rect;
use crate::value::StackInt;

use super::Runtime;

/// Stack words making up one animation definition: resource id, first and
/// last frame, constraint rect (left, top, right, bottom) and name index.
pub(crate) const ANIM_DEF_ARGS: usize = 8;

impl Runtime {
    pub(crate) fn string_operand(&self, instruction: Instruction) -> Result<&str, ScriptError> {
        usize::try_from(instruction.arg)
            .ok()
            .and_then(|index| self.defs.scripts.strings.get(index))
            .map(String::as_str)
            .ok_or(ScriptError::InvalidString {
                op: instruction.op.name(),
                index: instruction.arg,
            })
    }

    pub(crate) fn unresolved(&self, op: ScriptOp, kind: &'static str, name: &str) -> ScriptError {
        ScriptError::UnresolvedName {
            op: op.name(),
            kind,
            name: name.to_string(),
            room: self.room,
        }
    }

    /// Interns an animation name so it can travel through the stack.
    pub(crate) fn intern_anim_name(&mut self, name: &str) -> StackInt {
        match self.anim_names.iter().position(|known| known == name) {
            Some(index) => index as StackInt,
            None => {
                self.anim_names.push(name.to_string());
                (self.anim_names.len() - 1) as StackInt
            }
        }
    }

    pub(crate) fn push_anim_def(&mut self, def: &AnimationDef) {
        let name = self.intern_anim_name(&def.name);
        let rect = def.constraint_rect;
        for value in [
            def.resource_id,
            def.first_frame as StackInt,
            def.last_frame as StackInt,
            rect.left,
            rect.top,
            rect.right,
            rect.bottom,
            name,
        ] {
            self.stack.push_int(value);
        }
    }

    pub(crate) fn anim_def_from_args(&self, op: ScriptOp, args: &[StackInt]) -> Result<AnimationDef, ScriptError> {
        let frame = |value: StackInt, detail| {
            u32::try_from(value).map_err(|_| ScriptError::InvalidArgument {
                op: op.name(),
                value: value as i64,
                detail,
            })
        };
        let name = usize::try_from(args[7])
            .ok()
            .and_then(|index| self.anim_names.get(index))
            .cloned()
            .unwrap_or_default();
        Ok(AnimationDef {
            resource_id: args[0],
            first_frame: frame(args[1], "negative first frame")?,
            last_frame: frame(args[2], "negative last frame")?,
            constraint_rect: Rect::new(args[3], args[4], args[5], args[6]),
            name,
        })
    }
}

pub(crate) fn invalid_argument(op: ScriptOp, value: StackInt, detail: &'static str) -> ScriptError {
    ScriptError::InvalidArgument {
        op: op.name(),
        value: value as i64,
        detail,
    }
}

pub(crate) fn non_negative(op: ScriptOp, value: StackInt, detail: &'static str) -> Result<u32, ScriptError> {
    u32::try_from(value).map_err(|_| invalid_argument(op, value, detail))
}
