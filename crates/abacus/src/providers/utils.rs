use anyhow::{anyhow, Result};
use serde_json::{json, Value};

use crate::errors::AgentError;
use crate::models::message::{Message, MessageContent};
use crate::models::role::Role;
use crate::models::tool::{Tool, ToolCall};

/// Convert internal messages to the OpenAI-compatible chat format Groq
/// accepts. Tool responses become separate "tool" role entries keyed by the
/// originating call id.
pub fn messages_to_groq_spec(messages: &[Message]) -> Vec<Value> {
    let mut messages_spec = Vec::new();

    for message in messages {
        let mut converted = json!({
            "role": message.role
        });

        let mut output = Vec::new();

        for content in &message.content {
            match content {
                MessageContent::Text(text) => {
                    if !text.is_empty() {
                        converted["content"] = json!(text);
                    }
                }
                MessageContent::ToolRequest(request) => match &request.tool_call {
                    Ok(tool_call) => {
                        let sanitized_name = sanitize_function_name(&tool_call.name);
                        let tool_calls = converted
                            .as_object_mut()
                            .unwrap()
                            .entry("tool_calls")
                            .or_insert(json!([]));

                        tool_calls.as_array_mut().unwrap().push(json!({
                            "id": request.id,
                            "type": "function",
                            "function": {
                                "name": sanitized_name,
                                "arguments": tool_call.arguments.to_string(),
                            }
                        }));
                    }
                    Err(e) => {
                        output.push(json!({
                            "role": "tool",
                            "content": format!("Error: {}", e),
                            "tool_call_id": request.id
                        }));
                    }
                },
                MessageContent::ToolResponse(response) => match &response.tool_result {
                    Ok(result) => {
                        output.push(json!({
                            "role": "tool",
                            "content": result,
                            "tool_call_id": response.id
                        }));
                    }
                    Err(e) => {
                        // Shown as output so the model can interpret the failure
                        output.push(json!({
                            "role": "tool",
                            "content": format!("The tool call returned the following error:\n{}", e),
                            "tool_call_id": response.id
                        }));
                    }
                },
            }
        }

        if converted.get("content").is_some() || converted.get("tool_calls").is_some() {
            output.insert(0, converted);
        }
        messages_spec.extend(output);
    }

    messages_spec
}

/// Convert internal tools to the OpenAI-compatible function specification
pub fn tools_to_groq_spec(tools: &[Tool]) -> Result<Vec<Value>> {
    let mut tool_names = std::collections::HashSet::new();
    let mut result = Vec::new();

    for tool in tools {
        if !tool_names.insert(&tool.name) {
            return Err(anyhow!("Duplicate tool name: {}", tool.name));
        }

        result.push(json!({
            "type": "function",
            "function": {
                "name": tool.name,
                "description": tool.description,
                "parameters": tool.parameters,
            }
        }));
    }

    Ok(result)
}

/// Convert a chat completions response to an internal message. Tool calls
/// with invalid names or undecodable arguments are captured as recoverable
/// errors inside the request so the agent loop can report them back to the
/// model instead of failing the reply.
pub fn groq_response_to_message(response: Value) -> Result<Message> {
    let original = response["choices"][0]["message"].clone();
    let mut content = Vec::new();

    if let Some(text) = original.get("content") {
        if let Some(text_str) = text.as_str() {
            content.push(MessageContent::text(text_str));
        }
    }

    if let Some(tool_calls) = original.get("tool_calls").and_then(|v| v.as_array()) {
        for tool_call in tool_calls {
            let id = tool_call["id"].as_str().unwrap_or_default().to_string();
            let function_name = tool_call["function"]["name"]
                .as_str()
                .unwrap_or_default()
                .to_string();
            let arguments = tool_call["function"]["arguments"]
                .as_str()
                .unwrap_or_default()
                .to_string();

            if !is_valid_function_name(&function_name) {
                let error = AgentError::ToolNotFound(format!(
                    "The provided function name '{}' had invalid characters, it must match [a-zA-Z0-9_-]+",
                    function_name
                ));
                content.push(MessageContent::tool_request(id, Err(error)));
            } else {
                match serde_json::from_str::<Value>(&arguments) {
                    Ok(params) => {
                        content.push(MessageContent::tool_request(
                            id,
                            Ok(ToolCall::new(&function_name, params)),
                        ));
                    }
                    Err(e) => {
                        let error = AgentError::InvalidParameters(format!(
                            "Could not interpret tool use parameters for id {}: {}",
                            id, e
                        ));
                        content.push(MessageContent::tool_request(id, Err(error)));
                    }
                }
            }
        }
    }

    Ok(Message {
        role: Role::Assistant,
        created: chrono::Utc::now().timestamp(),
        content,
    })
}

fn sanitize_function_name(name: &str) -> String {
    name.chars()
        .map(|c| if is_function_name_char(c) { c } else { '_' })
        .collect()
}

fn is_valid_function_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(is_function_name_char)
}

fn is_function_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

#[cfg(test)]
mod tests {
    use super::*;

    const GROQ_TOOL_USE_RESPONSE: &str = r#"{
        "choices": [{
            "role": "assistant",
            "message": {
                "tool_calls": [{
                    "id": "1",
                    "function": {
                        "name": "calculator__evaluate",
                        "arguments": "{\"expression\": \"2 + 2\"}"
                    }
                }]
            }
        }],
        "usage": {
            "prompt_tokens": 10,
            "completion_tokens": 25,
            "total_tokens": 35
        }
    }"#;

    #[test]
    fn test_messages_to_groq_spec() {
        let message = Message::user().with_text("Hello");
        let spec = messages_to_groq_spec(&[message]);

        assert_eq!(spec.len(), 1);
        assert_eq!(spec[0]["role"], "user");
        assert_eq!(spec[0]["content"], "Hello");
    }

    #[test]
    fn test_messages_to_groq_spec_tool_flow() {
        let mut messages = vec![
            Message::assistant().with_text("Hi there"),
            Message::user().with_text("What is 2 + 2?"),
            Message::assistant().with_tool_request(
                "call_1",
                Ok(ToolCall::new(
                    "calculator__evaluate",
                    json!({"expression": "2 + 2"}),
                )),
            ),
        ];
        messages.push(Message::user().with_tool_response("call_1", Ok("4".to_string())));

        let spec = messages_to_groq_spec(&messages);

        assert_eq!(spec.len(), 4);
        assert_eq!(spec[0]["role"], "assistant");
        assert_eq!(spec[1]["role"], "user");
        assert_eq!(spec[2]["role"], "assistant");
        assert!(spec[2]["tool_calls"].is_array());
        assert_eq!(spec[3]["role"], "tool");
        assert_eq!(spec[3]["content"], "4");
        assert_eq!(spec[3]["tool_call_id"], spec[2]["tool_calls"][0]["id"]);
    }

    #[test]
    fn test_messages_to_groq_spec_tool_error() {
        let message = Message::user().with_tool_response(
            "call_1",
            Err(AgentError::ExecutionError("boom".to_string())),
        );
        let spec = messages_to_groq_spec(&[message]);

        assert_eq!(spec.len(), 1);
        assert_eq!(spec[0]["role"], "tool");
        assert!(spec[0]["content"]
            .as_str()
            .unwrap()
            .contains("returned the following error"));
    }

    #[test]
    fn test_tools_to_groq_spec() -> Result<()> {
        let tool = Tool::new(
            "evaluate",
            "Evaluate an arithmetic expression",
            json!({
                "type": "object",
                "properties": {
                    "expression": {"type": "string"}
                },
                "required": ["expression"]
            }),
        );

        let spec = tools_to_groq_spec(&[tool])?;

        assert_eq!(spec.len(), 1);
        assert_eq!(spec[0]["type"], "function");
        assert_eq!(spec[0]["function"]["name"], "evaluate");
        Ok(())
    }

    #[test]
    fn test_tools_to_groq_spec_duplicate() {
        let parameters = json!({"type": "object", "properties": {}});
        let tool1 = Tool::new("evaluate", "first", parameters.clone());
        let tool2 = Tool::new("evaluate", "second", parameters);

        let result = tools_to_groq_spec(&[tool1, tool2]);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Duplicate tool name"));
    }

    #[test]
    fn test_response_to_message_text() -> Result<()> {
        let response = json!({
            "choices": [{
                "role": "assistant",
                "message": {
                    "content": "The answer is 4."
                }
            }]
        });

        let message = groq_response_to_message(response)?;
        assert_eq!(message.text(), "The answer is 4.");
        assert!(matches!(message.role, Role::Assistant));
        Ok(())
    }

    #[test]
    fn test_response_to_message_valid_tool_request() -> Result<()> {
        let response: Value = serde_json::from_str(GROQ_TOOL_USE_RESPONSE)?;
        let message = groq_response_to_message(response)?;

        assert_eq!(message.content.len(), 1);
        let request = message.content[0].as_tool_request().unwrap();
        let tool_call = request.tool_call.as_ref().unwrap();
        assert_eq!(tool_call.name, "calculator__evaluate");
        assert_eq!(tool_call.arguments, json!({"expression": "2 + 2"}));
        Ok(())
    }

    #[test]
    fn test_response_to_message_invalid_func_name() -> Result<()> {
        let mut response: Value = serde_json::from_str(GROQ_TOOL_USE_RESPONSE)?;
        response["choices"][0]["message"]["tool_calls"][0]["function"]["name"] =
            json!("invalid fn");

        let message = groq_response_to_message(response)?;
        let request = message.content[0].as_tool_request().unwrap();
        match &request.tool_call {
            Err(AgentError::ToolNotFound(msg)) => {
                assert!(msg.starts_with("The provided function name"));
            }
            _ => panic!("Expected ToolNotFound error"),
        }
        Ok(())
    }

    #[test]
    fn test_response_to_message_json_decode_error() -> Result<()> {
        let mut response: Value = serde_json::from_str(GROQ_TOOL_USE_RESPONSE)?;
        response["choices"][0]["message"]["tool_calls"][0]["function"]["arguments"] =
            json!("invalid json {");

        let message = groq_response_to_message(response)?;
        let request = message.content[0].as_tool_request().unwrap();
        match &request.tool_call {
            Err(AgentError::InvalidParameters(msg)) => {
                assert!(msg.starts_with("Could not interpret tool use parameters"));
            }
            _ => panic!("Expected InvalidParameters error"),
        }
        Ok(())
    }

    #[test]
    fn test_sanitize_function_name() {
        assert_eq!(sanitize_function_name("hello-world"), "hello-world");
        assert_eq!(sanitize_function_name("hello world"), "hello_world");
        assert_eq!(sanitize_function_name("hello@world"), "hello_world");
    }

    #[test]
    fn test_is_valid_function_name() {
        assert!(is_valid_function_name("calculator__evaluate"));
        assert!(is_valid_function_name("hello-world"));
        assert!(!is_valid_function_name("hello world"));
        assert!(!is_valid_function_name(""));
    }
}
