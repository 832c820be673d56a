//! Scene runtime for script-driven interactive movies: a tagged-value stack
//! VM, the cooperative game state machine it feeds, and the animation and
//! sound subsystems both drive.

pub mod animation;
pub mod definitions;
pub mod events;
pub mod gyro;
pub mod headless;
pub mod host;
pub mod runtime;
pub mod script;
pub mod session;
pub mod sound;
pub mod types;
pub mod value;

pub use definitions::{load_definitions, GameConfig, GameDefinitions, GameVariant};
pub use events::{KeymappedEvent, OsEvent};
pub use host::Host;
pub use runtime::{GameState, Location, Runtime, ScriptEnvironment};
pub use script::{Instruction, Script, ScriptError, ScriptOp};
pub use types::{Point, Rect};
pub use value::{OperandStack, StackValue};
