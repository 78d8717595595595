/// Default Groq API host
pub const GROQ_HOST: &str = "https://api.groq.com";

/// Default model for the assistant
pub const GROQ_DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";

/// Configuration for the Groq provider. The api_key is an opaque secret
/// supplied by the user; it is forwarded unmodified on every call and held
/// only for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct GroqProviderConfig {
    pub host: String,
    pub api_key: String,
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<i32>,
}

impl GroqProviderConfig {
    pub fn new<S: Into<String>>(api_key: S, model: S) -> Self {
        Self {
            host: GROQ_HOST.to_string(),
            api_key: api_key.into(),
            model: model.into(),
            temperature: None,
            max_tokens: None,
        }
    }
}
