use anyhow::Result;
use async_trait::async_trait;
use std::sync::Mutex;

use crate::models::message::Message;
use crate::models::tool::Tool;
use crate::providers::base::{Provider, Usage};

/// Plays back a fixed script of assistant messages, one per completion.
/// When the script runs out it answers with an empty message so a test that
/// over-asks fails an assertion instead of hanging.
pub struct MockProvider {
    script: Mutex<Vec<Message>>,
}

impl MockProvider {
    pub fn new(script: Vec<Message>) -> Self {
        Self {
            script: Mutex::new(script),
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(
        &self,
        _system: &str,
        _messages: &[Message],
        _tools: &[Tool],
    ) -> Result<(Message, Usage)> {
        let mut script = self.script.lock().unwrap();
        if script.is_empty() {
            Ok((Message::assistant().with_text(""), Usage::default()))
        } else {
            Ok((script.remove(0), Usage::default()))
        }
    }
}
