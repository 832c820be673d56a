use std::fmt;

use crate::script::{ScriptError, ScriptOp};

pub type StackInt = i32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackValue {
    Integer(StackInt),
    Text(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueTag {
    Integer,
    Text,
}

impl fmt::Display for ValueTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueTag::Integer => f.write_str("integer"),
            ValueTag::Text => f.write_str("string"),
        }
    }
}

impl StackValue {
    pub fn tag(&self) -> ValueTag {
        match self {
            StackValue::Integer(_) => ValueTag::Integer,
            StackValue::Text(_) => ValueTag::Text,
        }
    }

    pub fn into_int(self, op: ScriptOp) -> Result<StackInt, ScriptError> {
        match self {
            StackValue::Integer(value) => Ok(value),
            StackValue::Text(_) => Err(mismatch(op, ValueTag::Integer, ValueTag::Text)),
        }
    }

    pub fn into_string(self, op: ScriptOp) -> Result<String, ScriptError> {
        match self {
            StackValue::Text(value) => Ok(value),
            StackValue::Integer(_) => Err(mismatch(op, ValueTag::Text, ValueTag::Integer)),
        }
    }
}

fn mismatch(op: ScriptOp, expected: ValueTag, found: ValueTag) -> ScriptError {
    ScriptError::TypeMismatch {
        op: op.name(),
        expected,
        found,
    }
}

/// Operand stack shared by every frame of the running script.
///
/// Multi-value pops return the values in push order: index 0 is the deepest
/// of the popped values. Tags are verified before anything is removed, so a
/// failed pop leaves the stack untouched.
#[derive(Debug, Clone, Default)]
pub struct OperandStack {
    values: Vec<StackValue>,
}

impl OperandStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: StackValue) {
        self.values.push(value);
    }

    pub fn push_int(&mut self, value: StackInt) {
        self.values.push(StackValue::Integer(value));
    }

    pub fn push_bool(&mut self, value: bool) {
        self.push_int(value as StackInt);
    }

    pub fn push_string(&mut self, value: impl Into<String>) {
        self.values.push(StackValue::Text(value.into()));
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn values(&self) -> &[StackValue] {
        &self.values
    }

    pub fn peek(&self, op: ScriptOp) -> Result<&StackValue, ScriptError> {
        self.values.last().ok_or(ScriptError::StackUnderflow {
            op: op.name(),
            needed: 1,
            available: 0,
        })
    }

    pub fn pop_n<const N: usize>(&mut self, op: ScriptOp) -> Result<[StackValue; N], ScriptError> {
        let start = self.check_available(op, N)?;
        let popped: Vec<StackValue> = self.values.drain(start..).collect();
        popped.try_into().map_err(|_| ScriptError::StackUnderflow {
            op: op.name(),
            needed: N,
            available: 0,
        })
    }

    pub fn pop_n_int<const N: usize>(&mut self, op: ScriptOp) -> Result<[StackInt; N], ScriptError> {
        let start = self.check_available(op, N)?;
        self.check_tags(op, start, ValueTag::Integer)?;
        let mut out = [0; N];
        for (slot, value) in out.iter_mut().zip(self.values.drain(start..)) {
            if let StackValue::Integer(value) = value {
                *slot = value;
            }
        }
        Ok(out)
    }

    pub fn pop_n_string<const N: usize>(
        &mut self,
        op: ScriptOp,
    ) -> Result<[String; N], ScriptError> {
        let start = self.check_available(op, N)?;
        self.check_tags(op, start, ValueTag::Text)?;
        let mut out: [String; N] = std::array::from_fn(|_| String::new());
        for (slot, value) in out.iter_mut().zip(self.values.drain(start..)) {
            if let StackValue::Text(value) = value {
                *slot = value;
            }
        }
        Ok(out)
    }

    pub fn pop_int(&mut self, op: ScriptOp) -> Result<StackInt, ScriptError> {
        let [value] = self.pop_n_int::<1>(op)?;
        Ok(value)
    }

    pub fn pop_string(&mut self, op: ScriptOp) -> Result<String, ScriptError> {
        let [value] = self.pop_n_string::<1>(op)?;
        Ok(value)
    }

    fn check_available(&self, op: ScriptOp, needed: usize) -> Result<usize, ScriptError> {
        let available = self.values.len();
        if available < needed {
            return Err(ScriptError::StackUnderflow {
                op: op.name(),
                needed,
                available,
            });
        }
        Ok(available - needed)
    }

    fn check_tags(&self, op: ScriptOp, start: usize, expected: ValueTag) -> Result<(), ScriptError> {
        match self.values[start..].iter().find(|value| value.tag() != expected) {
            Some(value) => Err(mismatch(op, expected, value.tag())),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_return_values_in_push_order() {
        let mut stack = OperandStack::new();
        stack.push_int(1);
        stack.push_int(2);
        stack.push_int(3);
        assert_eq!(stack.pop_n_int::<2>(ScriptOp::Add).unwrap(), [2, 3]);
        assert_eq!(stack.values(), &[StackValue::Integer(1)]);
    }

    #[test]
    fn underflow_reports_needed_and_available() {
        let mut stack = OperandStack::new();
        stack.push_int(4);
        let err = stack.pop_n_int::<2>(ScriptOp::Sub).unwrap_err();
        assert_eq!(
            err,
            ScriptError::StackUnderflow {
                op: "Sub",
                needed: 2,
                available: 1
            }
        );
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn tag_mismatch_leaves_stack_untouched() {
        let mut stack = OperandStack::new();
        stack.push_string("0001xyz");
        stack.push_int(7);
        let err = stack.pop_n_int::<2>(ScriptOp::Add).unwrap_err();
        assert!(matches!(
            err,
            ScriptError::TypeMismatch {
                expected: ValueTag::Integer,
                found: ValueTag::Text,
                ..
            }
        ));
        assert_eq!(stack.len(), 2);

        let err = stack.pop_string(ScriptOp::SoundS1).unwrap_err();
        assert!(matches!(err, ScriptError::TypeMismatch { found: ValueTag::Integer, .. }));
    }

    #[test]
    fn mixed_pops_convert_per_value() {
        let mut stack = OperandStack::new();
        stack.push_string("door");
        stack.push_int(80);
        let [name, volume] = stack.pop_n::<2>(ScriptOp::SoundS2).unwrap();
        assert_eq!(name.into_string(ScriptOp::SoundS2).unwrap(), "door");
        assert_eq!(volume.into_int(ScriptOp::SoundS2).unwrap(), 80);
        assert!(stack.is_empty());
    }
}
