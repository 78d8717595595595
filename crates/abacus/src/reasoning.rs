use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::errors::{AgentError, AgentResult};
use crate::models::message::Message;
use crate::models::tool::{Tool, ToolCall};
use crate::prompt_template::load_prompt_file;
use crate::providers::base::Provider;
use crate::systems::System;

const REASONING_SYSTEM_PROMPT: &str = "You are an intelligent agent.";

/// Step-by-step reasoning as a capability: the question is substituted into
/// a fixed instruction template and sent to the model as a plain, tool-free
/// completion whose text is returned verbatim.
pub struct ReasoningSystem {
    provider: Box<dyn Provider>,
    tools: Vec<Tool>,
}

impl ReasoningSystem {
    pub fn new(provider: Box<dyn Provider>) -> Self {
        let solve_tool = Tool::new(
            "solve",
            "Solve logical and reasoning-based questions",
            json!({
                "type": "object",
                "properties": {
                    "question": {
                        "type": "string",
                        "description": "The question to reason through."
                    }
                },
                "required": ["question"]
            }),
        );

        Self {
            provider,
            tools: vec![solve_tool],
        }
    }

    async fn solve(&self, question: &str) -> AgentResult<String> {
        let mut context = HashMap::new();
        context.insert("question", question.to_string());
        let prompt = load_prompt_file("reasoning.md", &context)
            .map_err(|e| AgentError::Internal(e.to_string()))?;

        let messages = vec![Message::user().with_text(prompt)];
        let (response, _) = self
            .provider
            .complete(REASONING_SYSTEM_PROMPT, &messages, &[])
            .await
            .map_err(|e| AgentError::ExecutionError(e.to_string()))?;

        Ok(response.text())
    }
}

#[async_trait]
impl System for ReasoningSystem {
    fn name(&self) -> &str {
        "reasoning"
    }

    fn description(&self) -> &str {
        "Works through logic and word problems step by step"
    }

    fn instructions(&self) -> &str {
        "Use the solve tool for word problems and multi-step reasoning. Pass \
        the full question text as written."
    }

    fn tools(&self) -> &[Tool] {
        &self.tools
    }

    async fn call(&self, tool_call: ToolCall) -> AgentResult<String> {
        match tool_call.name.as_str() {
            "solve" => {
                let question = tool_call
                    .arguments
                    .get("question")
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        AgentError::InvalidParameters("question parameter required".into())
                    })?;
                self.solve(question).await
            }
            _ => Err(AgentError::ToolNotFound(tool_call.name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::mock::MockProvider;

    #[tokio::test]
    async fn test_solve_returns_completion_verbatim() {
        let answer = "Step 1: eat 2 bananas. 5 - 2 = 3 bananas left.";
        let provider = MockProvider::new(vec![Message::assistant().with_text(answer)]);
        let system = ReasoningSystem::new(Box::new(provider));

        let result = system
            .call(ToolCall::new(
                "solve",
                json!({"question": "I have 5 bananas and eat 2."}),
            ))
            .await
            .unwrap();

        assert_eq!(result, answer);
    }

    #[tokio::test]
    async fn test_call_missing_parameter() {
        let provider = MockProvider::new(vec![]);
        let system = ReasoningSystem::new(Box::new(provider));
        let result = system.call(ToolCall::new("solve", json!({}))).await;
        assert!(matches!(result, Err(AgentError::InvalidParameters(_))));
    }

    #[tokio::test]
    async fn test_call_unknown_tool() {
        let provider = MockProvider::new(vec![]);
        let system = ReasoningSystem::new(Box::new(provider));
        let result = system.call(ToolCall::new("ponder", json!({}))).await;
        assert!(matches!(result, Err(AgentError::ToolNotFound(_))));
    }
}
