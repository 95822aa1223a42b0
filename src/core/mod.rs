pub mod axis;
pub mod config;
pub mod flow;
pub mod message;
pub mod navigation;
pub mod protocol;
pub mod session;
pub mod tool;

pub use axis::{color_for_axis, default_axes, Axis};
pub use config::Config;
pub use flow::{FlowError, FlowRegistry, FlowRequest, FlowStep};
pub use message::{Message, Role};
pub use navigation::Navigation;
pub use protocol::{DialogueReply, DialogueRequest, HistoryTurn, INIT_MESSAGE};
pub use session::{Draft, SavedSession, Selection, SessionId, SessionKey, SessionStore};
pub use tool::{Stage, Tool, GENERIC_OPENER};
