use anyhow::Result;
use futures::StreamExt;

use crate::prompt::prompt::{InputType, Prompt};
use abacus::agent::Agent;
use abacus::models::message::Message;
use abacus::models::transcript::Transcript;

pub const GREETING: &str = "Hi! I can solve math problems and search information for you.";
const EMPTY_QUESTION_WARNING: &str = "Please enter a question.";

/// Interactive chat loop. The transcript holds only questions and final
/// answers; the intermediate tool traffic is rendered as it streams by and
/// then discarded.
pub struct Session<'a> {
    agent: Box<Agent>,
    prompt: Box<dyn Prompt + 'a>,
    transcript: Transcript,
}

impl<'a> Session<'a> {
    pub fn new(agent: Box<Agent>, prompt: Box<impl Prompt + 'a>) -> Self {
        Session {
            agent,
            prompt,
            transcript: Transcript::new(GREETING),
        }
    }

    pub async fn start(&mut self) -> Result<()> {
        self.prompt
            .render(Box::new(Message::assistant().with_text(GREETING)));

        loop {
            let input = self.prompt.get_input()?;
            match input.input_type {
                InputType::Message => {
                    // The prompt is not trusted to have trimmed the input
                    let content = input.content.unwrap_or_default();
                    let question = content.trim();
                    if question.is_empty() {
                        self.prompt.render(raw_message(EMPTY_QUESTION_WARNING));
                        continue;
                    }
                    self.run_turn(question).await;
                }
                InputType::Exit => break,
                InputType::AskAgain => continue,
            }
        }
        self.prompt.close();
        Ok(())
    }

    /// Run one question through the agent, rendering the streamed trace.
    /// Failures leave the transcript exactly as it was before the question.
    async fn run_turn(&mut self, question: &str) {
        self.transcript.push_user(question);
        let messages = self.transcript.messages().to_vec();

        self.prompt.show_busy();

        let mut stream = match self.agent.reply(&messages).await {
            Ok(stream) => stream,
            Err(e) => {
                self.prompt.hide_busy();
                self.prompt.render(raw_message(&format!("Error: {}", e)));
                self.transcript.rollback_turn();
                return;
            }
        };

        let mut answer: Option<String> = None;
        loop {
            match stream.next().await {
                Some(Ok(message)) => {
                    if !message.has_tool_request() && !message.text().is_empty() {
                        answer = Some(message.text());
                    }
                    self.prompt.render(Box::new(message));
                }
                Some(Err(e)) => {
                    drop(stream);
                    self.prompt.hide_busy();
                    self.prompt.render(raw_message(&format!("Error: {}", e)));
                    self.transcript.rollback_turn();
                    return;
                }
                None => break,
            }
        }

        self.prompt.hide_busy();

        match answer {
            Some(text) => self.transcript.push_assistant(text),
            None => self.transcript.rollback_turn(),
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }
}

fn raw_message(content: &str) -> Box<Message> {
    Box::new(Message::assistant().with_text(content))
}
