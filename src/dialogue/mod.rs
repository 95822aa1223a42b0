pub mod controller;
pub mod manager;
pub mod service;

pub use controller::{
    DialogueController, DialogueSnapshot, DialogueState, Outbound, RequestKind, SessionSummary,
    Ticket,
};
pub use manager::{DialogueEvent, DialogueHandle};
pub use service::{DialogueError, DialogueService};
