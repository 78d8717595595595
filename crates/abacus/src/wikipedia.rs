use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

use crate::errors::{AgentError, AgentResult};
use crate::systems::System;
use crate::models::tool::{Tool, ToolCall};

/// The fixed text returned when the search comes back empty.
pub const NO_RESULT: &str = "No good Wikipedia Search Result was found";

const RESULT_LIMIT: usize = 3;
const SUMMARY_CHAR_LIMIT: usize = 4000;

/// Free-text encyclopedia search over the MediaWiki API.
///
/// A query is resolved in two steps: a title search for the top matches,
/// then an extracts request for the plain-text intro of each page. The
/// relay adds no retry or timeout handling beyond the client's own.
pub struct WikipediaSystem {
    client: Client,
    host: String,
    tools: Vec<Tool>,
}

impl WikipediaSystem {
    pub fn new() -> Result<Self> {
        Self::with_host("https://en.wikipedia.org")
    }

    /// Build a system against a specific MediaWiki host
    pub fn with_host<S: Into<String>>(host: S) -> Result<Self> {
        let search_tool = Tool::new(
            "search",
            "Search Wikipedia for factual information",
            json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The topic to look up."
                    }
                },
                "required": ["query"]
            }),
        );

        let client = Client::builder().timeout(Duration::from_secs(60)).build()?;

        Ok(Self {
            client,
            host: host.into(),
            tools: vec![search_tool],
        })
    }

    async fn get_json(&self, url: &str) -> AgentResult<Value> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AgentError::ExecutionError(format!("wikipedia request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AgentError::ExecutionError(format!(
                "wikipedia request failed: {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AgentError::ExecutionError(format!("wikipedia response invalid: {}", e)))
    }

    async fn search(&self, query: &str) -> AgentResult<String> {
        let url = format!(
            "{}/w/api.php?action=query&list=search&srsearch={}&srlimit={}&format=json",
            self.host,
            urlencoding::encode(query),
            RESULT_LIMIT
        );
        let response = self.get_json(&url).await?;

        let titles: Vec<String> = response["query"]["search"]
            .as_array()
            .map(|hits| {
                hits.iter()
                    .filter_map(|hit| hit["title"].as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default();

        if titles.is_empty() {
            return Ok(NO_RESULT.to_string());
        }

        let url = format!(
            "{}/w/api.php?action=query&prop=extracts&exintro=1&explaintext=1&titles={}&format=json",
            self.host,
            urlencoding::encode(&titles.join("|"))
        );
        let response = self.get_json(&url).await?;

        let pages = response["query"]["pages"].clone();
        let empty = serde_json::Map::new();
        let pages = pages.as_object().unwrap_or(&empty);

        // pages are keyed by page id; keep the search ranking order
        let mut summaries = Vec::new();
        for title in &titles {
            let extract = pages
                .values()
                .find(|page| page["title"].as_str() == Some(title))
                .and_then(|page| page["extract"].as_str());
            if let Some(extract) = extract {
                summaries.push(format!("Page: {}\nSummary: {}", title, extract));
            }
        }

        if summaries.is_empty() {
            return Ok(NO_RESULT.to_string());
        }

        let summary = summaries.join("\n\n");
        if summary.chars().count() > SUMMARY_CHAR_LIMIT {
            Ok(summary.chars().take(SUMMARY_CHAR_LIMIT).collect())
        } else {
            Ok(summary)
        }
    }
}

#[async_trait]
impl System for WikipediaSystem {
    fn name(&self) -> &str {
        "wikipedia"
    }

    fn description(&self) -> &str {
        "Searches Wikipedia for factual information"
    }

    fn instructions(&self) -> &str {
        "Use the search tool to look up facts, people, places and events you \
        are not certain about."
    }

    fn tools(&self) -> &[Tool] {
        &self.tools
    }

    async fn call(&self, tool_call: ToolCall) -> AgentResult<String> {
        match tool_call.name.as_str() {
            "search" => {
                let query = tool_call
                    .arguments
                    .get("query")
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        AgentError::InvalidParameters("query parameter required".into())
                    })?;
                self.search(query).await
            }
            _ => Err(AgentError::ToolNotFound(tool_call.name)),
        }
    }
}
