use async_trait::async_trait;

use crate::errors::AgentResult;
use crate::models::tool::{Tool, ToolCall};

/// A capability the agent can call: a named set of tools with a uniform
/// text-in, text-out invocation contract.
#[async_trait]
pub trait System: Send + Sync {
    /// Get the name of the system
    fn name(&self) -> &str;

    /// Get the system description
    fn description(&self) -> &str;

    /// Instructions telling the model when (and when not) to use it
    fn instructions(&self) -> &str;

    /// Get available tools
    fn tools(&self) -> &[Tool];

    /// Call a tool with the given parameters, returning its text output
    async fn call(&self, tool_call: ToolCall) -> AgentResult<String>;
}
