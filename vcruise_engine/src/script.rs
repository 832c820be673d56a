use std::collections::BTreeMap;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::value::ValueTag;

/// Authoring errors raised while executing a script. Every variant carries
/// the name of the opcode that failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptError {
    #[error("{op}: stack underflow (needed {needed}, had {available})")]
    StackUnderflow {
        op: &'static str,
        needed: usize,
        available: usize,
    },
    #[error("{op}: expected {expected} operand but found {found}")]
    TypeMismatch {
        op: &'static str,
        expected: ValueTag,
        found: ValueTag,
    },
    #[error("{op}: {kind} '{name}' is not defined for room {room}")]
    UnresolvedName {
        op: &'static str,
        kind: &'static str,
        name: String,
        room: u32,
    },
    #[error("{op}: opcode is not implemented")]
    Unimplemented { op: &'static str },
    #[error("{op}: division by zero")]
    DivideByZero { op: &'static str },
    #[error("{op}: gyro index {index} is out of range")]
    InvalidGyro { op: &'static str, index: i32 },
    #[error("{op}: function {index} is not defined")]
    InvalidFunction { op: &'static str, index: i32 },
    #[error("{op}: string index {index} is out of range")]
    InvalidString { op: &'static str, index: i32 },
    #[error("{op}: interaction {id} has no script on screen {screen:#x} of room {room}")]
    InvalidInteraction {
        op: &'static str,
        id: i32,
        room: u32,
        screen: u32,
    },
    #[error("{op}: invalid argument {value} ({detail})")]
    InvalidArgument {
        op: &'static str,
        value: i64,
        detail: &'static str,
    },
}

macro_rules! script_ops {
    ($($op:ident),* $(,)?) => {
        /// Closed opcode catalogue shared by both game variants.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum ScriptOp {
            $($op,)*
        }

        impl ScriptOp {
            pub const ALL: &'static [ScriptOp] = &[$(ScriptOp::$op,)*];

            pub fn name(self) -> &'static str {
                match self {
                    $(ScriptOp::$op => stringify!($op),)*
                }
            }
        }
    };
}

script_ops! {
    // Literals and stack shuffling
    Number, String, Drop, Dup, Swap,
    // Arithmetic, logic and comparisons
    Add, Sub, Mul, Div, Mod, Negate, Not, And, Or,
    CmpEq, CmpNE, CmpLt, CmpLE, CmpGt, CmpGE,
    BitAnd, BitOr, BitLoad, BitSet0, BitSet1, ExtractByte, InsertByte, GetDigit,
    // Variables
    VarLoad, VarStore, VarAddAndStore, VarGlobalLoad, VarGlobalStore,
    LoSet, LoGet, HiSet, HiGet,
    // Control flow
    CheckValue, Jump, Goto, Fn, Return,
    // Inventory and cursor
    ItemCheck, ItemRemove, ItemHighlightSet, ItemHighlightSetTrue, ItemAdd, ItemHaveSpace, ItemClear,
    SetCursor, LMB, LMB1,
    // Reah sound family
    SoundS1, SoundS2, SoundS3, SoundL1, SoundL2, SoundL3, Sound3DS2, Sound3DL2, Range,
    StopAL, StopSndLA, StopSndLO, VolumeDn2, VolumeDn3, VolumeDn4, VolumeUp3,
    AddXSound, ClrXSound, SndAddRandom, SndClearRandom,
    // Schizm sound family
    SndPlay, SndPlayEx, SndPlay3D, SndPlaying, SndWait, SndHalt, SndToBack, SndStop, SndStopAll,
    VolumeAdd, VolumeChange,
    // Music
    Music, MusicVolRamp, MusicStop, MusicPlayScore, ScoreAlways, ScoreNormal,
    // Speech
    Say1, Say2, Say3, Say3Get, Speech, SpeechEx, SpeechTest, Dubbing,
    // Animation
    Anim, AnimS, AnimF, AnimN, AnimG, AnimR, Static, SAnimL, ChangeL, AnimChange, AnimVolume, Speed,
    Rotate, RotateUpdate,
    // Gyro puzzles
    Parm0, Parm1, Parm2, Parm3, ParmG, AngleGGet,
    // Static animation parameters
    SParmX, SAnimX,
    // Environment
    Angle, AngleGet, EscOn, EscOff, EscGet, SetTimer, GetTimer, Delay, Random, RandomInclusive,
    SetRoom, GetRoom, Disc1, Disc2, Disc3, IsCDVersion, IsDVDVersion, HidePanel, AllowSaves,
    Save0, SaveAs, BackStart, Exit,
    // Hero swap
    HeroOut, HeroGet, HeroGetPos, HeroSetPos,
    // Name resolution
    AnimName, ValueName, VarName, SoundName, CursorName, ScreenName,
    // Not supported
    Garbage, PuzzleInit, PuzzleCanPress, PuzzleDoMove1, PuzzleDoMove2, PuzzleDone, PuzzleWhoWon,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub op: ScriptOp,
    #[serde(default)]
    pub arg: i32,
}

impl Instruction {
    pub const fn new(op: ScriptOp, arg: i32) -> Self {
        Instruction { op, arg }
    }

    pub const fn bare(op: ScriptOp) -> Self {
        Instruction { op, arg: 0 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Script {
    pub instructions: Vec<Instruction>,
}

impl Script {
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Script { instructions }
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScreenScriptSet {
    #[serde(default)]
    pub entry_script: Option<Rc<Script>>,
    #[serde(default)]
    pub interaction_scripts: BTreeMap<u32, Rc<Script>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoomScriptSet {
    #[serde(default)]
    pub screens: BTreeMap<u32, ScreenScriptSet>,
}

/// Every script of a game: per-room screen scripts, the global function
/// table reached through `Fn`, and the string table used by `String`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScriptSet {
    #[serde(default)]
    pub rooms: BTreeMap<u32, RoomScriptSet>,
    #[serde(default)]
    pub functions: Vec<Option<Rc<Script>>>,
    #[serde(default)]
    pub strings: Vec<String>,
}

impl ScriptSet {
    pub fn screen(&self, room: u32, screen: u32) -> Option<&ScreenScriptSet> {
        self.rooms.get(&room)?.screens.get(&screen)
    }

    pub fn entry_script(&self, room: u32, screen: u32) -> Option<Rc<Script>> {
        self.screen(room, screen)?.entry_script.clone()
    }

    pub fn interaction_script(&self, room: u32, screen: u32, id: u32) -> Option<Rc<Script>> {
        self.screen(room, screen)?.interaction_scripts.get(&id).cloned()
    }

    pub fn function(&self, index: i32) -> Option<Rc<Script>> {
        let index = usize::try_from(index).ok()?;
        self.functions.get(index)?.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcode_names_match_variants() {
        assert_eq!(ScriptOp::VarAddAndStore.name(), "VarAddAndStore");
        assert_eq!(ScriptOp::ALL.first(), Some(&ScriptOp::Number));
        assert_eq!(ScriptOp::ALL.last(), Some(&ScriptOp::PuzzleWhoWon));
        assert!(ScriptOp::ALL.len() > 150);
    }

    #[test]
    fn script_sets_deserialize_from_json() {
        let json = r#"{
            "rooms": {"1": {"screens": {"160": {
                "entry_script": [{"op": "Number", "arg": 3}, {"op": "Drop"}],
                "interaction_scripts": {"7": [{"op": "LMB"}]}
            }}}},
            "functions": [null, [{"op": "Return"}]],
            "strings": ["hello"]
        }"#;
        let set: ScriptSet = serde_json::from_str(json).unwrap();
        let entry = set.entry_script(1, 0xa0).unwrap();
        assert_eq!(
            entry.instructions,
            vec![Instruction::new(ScriptOp::Number, 3), Instruction::bare(ScriptOp::Drop)]
        );
        assert!(set.interaction_script(1, 0xa0, 7).is_some());
        assert!(set.function(0).is_none());
        assert!(set.function(1).is_some());
        assert!(set.function(-1).is_none());
    }
}
