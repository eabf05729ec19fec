// apps/bot/src/console.rs
use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use availability_cell::UserId;
use session_cell::{ChannelError, Choice, ConversationChannel, Prompt, Reply};

/// Conversation channel over stdin/stdout: prompts are printed with numbered
/// choices and the last offered choice list is remembered per user so a
/// typed number can be mapped back to the choice id.
pub struct ConsoleChannel {
    offered: Mutex<HashMap<UserId, Vec<Choice>>>,
}

impl ConsoleChannel {
    pub fn new() -> Self {
        Self {
            offered: Mutex::new(HashMap::new()),
        }
    }

    /// Turn a typed line into the reply kind the session machine expects: a
    /// number picks from the last prompt's choices, anything else is free
    /// text.
    pub async fn interpret(&self, user_id: UserId, line: &str) -> Reply {
        let trimmed = line.trim();
        if let Ok(number) = trimmed.parse::<usize>() {
            let offered = self.offered.lock().await;
            let picked = offered
                .get(&user_id)
                .and_then(|choices| number.checked_sub(1).and_then(|i| choices.get(i)));
            if let Some(choice) = picked {
                return Reply::Choice(choice.id.clone());
            }
        }
        Reply::Text(trimmed.to_string())
    }
}

#[async_trait]
impl ConversationChannel for ConsoleChannel {
    async fn prompt(&self, user_id: UserId, prompt: Prompt) -> Result<(), ChannelError> {
        println!("\n{}", prompt.text);
        for (index, choice) in prompt.choices.iter().enumerate() {
            println!("  {}. {}", index + 1, choice.label);
        }
        self.offered.lock().await.insert(user_id, prompt.choices);
        Ok(())
    }
}
