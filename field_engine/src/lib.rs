//! Overworld event-script interpreter and per-frame step callbacks, with a
//! headless field host for driving scripts outside a game loop.

pub mod headless;
pub mod host;
pub mod map_entry;
pub mod script;
pub mod session;
pub mod state;
pub mod step_callback;

pub use headless::{FieldEvent, HeadlessField};
pub use map_entry::{MapEntry, MapEntryKind};
pub use script::{ScriptInterpreter, ScriptSignal, ScriptSources, ScriptStatus, ScriptWait};
pub use session::{Session, SessionConfig, SessionError, SessionSnapshot};
pub use state::EventState;
pub use step_callback::{StepCallbackId, StepCallbackManager};
