//! Script interpreter: decoded commands, constant resolution, movement
//! vocabulary and the suspend/resume execution loop.

pub mod command;
pub mod constants;
pub mod interpreter;
pub mod movement;
pub mod sources;
mod specials;
pub mod text;
pub mod tracker;

pub use command::{Command, Comparison, Condition, Operand};
pub use interpreter::{
    InterpreterSnapshot, MovementTarget, ScriptEnv, ScriptInterpreter, ScriptSignal, ScriptStatus,
    ScriptWait, PLAYER_OBJECT,
};
pub use movement::MovementStep;
pub use sources::ScriptSources;
pub use specials::VAR_BATTLE_OUTCOME;
