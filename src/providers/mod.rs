pub mod anthropic;
pub(crate) mod http_errors;
pub mod ollama;
pub mod openai;
pub mod speech;

pub const OLLAMA_BASE_URL: &str = "http://localhost:11434";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    OpenAi,
    Anthropic,
    Gemini,
    OpenRouter,
    SambaNova,
    Mistral,
    Ollama,
}

/// Request/response dialect spoken by a provider endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wire {
    OpenAiCompatible,
    Anthropic,
    Ollama,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderConfig {
    pub id: ProviderId,
    pub name: &'static str,
    pub default_model: &'static str,
    /// `None` for providers that run locally without a key.
    pub credential_env_var: Option<&'static str>,
    pub api_base: &'static str,
    pub wire: Wire,
}

impl ProviderConfig {
    pub fn is_local(&self) -> bool {
        self.credential_env_var.is_none()
    }
}

/// Known providers in resolution order.
pub const PROVIDERS: &[ProviderConfig] = &[
    ProviderConfig {
        id: ProviderId::OpenAi,
        name: "openai",
        default_model: "gpt-4o",
        credential_env_var: Some("OPENAI_API_KEY"),
        api_base: "https://api.openai.com/v1",
        wire: Wire::OpenAiCompatible,
    },
    ProviderConfig {
        id: ProviderId::Anthropic,
        name: "anthropic",
        default_model: "claude-3-5-sonnet-20240620",
        credential_env_var: Some("ANTHROPIC_API_KEY"),
        api_base: "https://api.anthropic.com/v1",
        wire: Wire::Anthropic,
    },
    ProviderConfig {
        id: ProviderId::Gemini,
        name: "gemini",
        default_model: "gemini-1.5-flash",
        credential_env_var: Some("GEMINI_API_KEY"),
        api_base: "https://generativelanguage.googleapis.com/v1beta/openai",
        wire: Wire::OpenAiCompatible,
    },
    ProviderConfig {
        id: ProviderId::OpenRouter,
        name: "openrouter",
        default_model: "meta-llama/llama-3.1-70b-instruct",
        credential_env_var: Some("OPENROUTER_API_KEY"),
        api_base: "https://openrouter.ai/api/v1",
        wire: Wire::OpenAiCompatible,
    },
    ProviderConfig {
        id: ProviderId::SambaNova,
        name: "sambanova",
        default_model: "Meta-Llama-3.1-70B-Instruct",
        credential_env_var: Some("SAMBANOVA_API_KEY"),
        api_base: "https://api.sambanova.ai/v1",
        wire: Wire::OpenAiCompatible,
    },
    ProviderConfig {
        id: ProviderId::Mistral,
        name: "mistral",
        default_model: "mistral-large-latest",
        credential_env_var: Some("MISTRAL_API_KEY"),
        api_base: "https://api.mistral.ai/v1",
        wire: Wire::OpenAiCompatible,
    },
    ProviderConfig {
        id: ProviderId::Ollama,
        name: "ollama",
        default_model: "llama3.1",
        credential_env_var: None,
        api_base: OLLAMA_BASE_URL,
        wire: Wire::Ollama,
    },
];

pub fn provider(id: ProviderId) -> &'static ProviderConfig {
    PROVIDERS
        .iter()
        .find(|cfg| cfg.id == id)
        .unwrap_or(&PROVIDERS[0])
}
