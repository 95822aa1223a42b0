use async_trait::async_trait;

use crate::core::{DialogueReply, DialogueRequest};

#[derive(Debug, thiserror::Error)]
pub enum DialogueError {
    #[error("dialogue request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("dialogue service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("{0}")]
    Unavailable(String),
}

/// The remote side of a conversation: takes one turn, returns one reply.
#[async_trait]
pub trait DialogueService: Send + Sync {
    async fn exchange(&self, request: DialogueRequest) -> Result<DialogueReply, DialogueError>;
}
