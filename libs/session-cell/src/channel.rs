// libs/session-cell/src/channel.rs
use async_trait::async_trait;

use availability_cell::UserId;

use crate::models::{ChannelError, Prompt};

/// Outbound half of the chat transport. The core pushes prompts through it
/// and receives `Reply` values back via whatever loop the transport runs;
/// delivery is request/response and never blocks indefinitely.
#[async_trait]
pub trait ConversationChannel: Send + Sync {
    async fn prompt(&self, user_id: UserId, prompt: Prompt) -> Result<(), ChannelError>;
}
