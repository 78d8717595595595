use anyhow::Result;
use clap::Parser;
use console::style;
use std::env;

use abacus::agent::Agent;
use abacus::calculator::CalculatorSystem;
use abacus::providers::configs::{GroqProviderConfig, GROQ_DEFAULT_MODEL, GROQ_HOST};
use abacus::providers::groq::GroqProvider;
use abacus::reasoning::ReasoningSystem;
use abacus::wikipedia::WikipediaSystem;

mod prompt;
mod session;

use prompt::cliclack::CliclackPrompt;
use session::Session;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Groq API key (can also be set via GROQ_API_KEY environment variable)
    #[arg(long)]
    api_key: Option<String>,

    /// Model to use
    #[arg(short, long, default_value = GROQ_DEFAULT_MODEL)]
    model: String,

    /// Groq API host
    #[arg(long, default_value = GROQ_HOST)]
    host: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let resolved = resolve_api_key(cli.api_key.as_deref(), env::var("GROQ_API_KEY").ok());
    let api_key = match resolved.or_else(prompt_api_key) {
        Some(key) => key,
        None => {
            println!("Please add your GROQ API key to continue");
            return Ok(());
        }
    };

    let provider = GroqProvider::new(config(&cli, &api_key))?;
    let mut agent = Agent::new(Box::new(provider));

    agent.add_system(Box::new(CalculatorSystem::new()));
    agent.add_system(Box::new(WikipediaSystem::new()?));

    // The reasoning system makes its own completions, with its own client
    let reasoning_provider = GroqProvider::new(config(&cli, &api_key))?;
    agent.add_system(Box::new(ReasoningSystem::new(Box::new(reasoning_provider))));

    println!(
        "abacus {}",
        style("- type \"/exit\" to end the session").dim()
    );
    println!();

    let prompt = CliclackPrompt::new();
    let mut session = Session::new(Box::new(agent), Box::new(prompt));
    session.start().await
}

fn config(cli: &Cli, api_key: &str) -> GroqProviderConfig {
    GroqProviderConfig {
        host: cli.host.clone(),
        api_key: api_key.to_string(),
        model: cli.model.clone(),
        temperature: None,
        max_tokens: None,
    }
}

/// Resolve the API key from the non-interactive sources: the flag wins,
/// then the environment. Blank values count as absent. The key lives only
/// in process memory.
fn resolve_api_key(flag: Option<&str>, env_key: Option<String>) -> Option<String> {
    flag.map(str::trim)
        .filter(|key| !key.is_empty())
        .map(String::from)
        .or_else(|| {
            env_key
                .as_deref()
                .map(str::trim)
                .filter(|key| !key.is_empty())
                .map(String::from)
        })
}

/// Masked interactive fallback when neither flag nor environment had a key
fn prompt_api_key() -> Option<String> {
    let entered: String = cliclack::password("Enter your Groq API Key:")
        .mask('▪')
        .interact()
        .unwrap_or_default();

    let entered = entered.trim();
    if entered.is_empty() {
        None
    } else {
        Some(entered.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_wins_over_environment() {
        let key = resolve_api_key(Some("flag-key"), Some("env-key".to_string()));
        assert_eq!(key, Some("flag-key".to_string()));
    }

    #[test]
    fn test_environment_fallback() {
        let key = resolve_api_key(None, Some("  env-key  ".to_string()));
        assert_eq!(key, Some("env-key".to_string()));
    }

    #[test]
    fn test_blank_flag_falls_through_to_environment() {
        let key = resolve_api_key(Some("   "), Some("env-key".to_string()));
        assert_eq!(key, Some("env-key".to_string()));
    }

    #[test]
    fn test_missing_key_resolves_to_none() {
        assert_eq!(resolve_api_key(None, None), None);
        assert_eq!(resolve_api_key(Some(""), Some("   ".to_string())), None);
    }
}
