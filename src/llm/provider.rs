//! Provider-specific URL and authentication rules.

/// Default Azure `OpenAI` API version.
pub const DEFAULT_AZURE_API_VERSION: &str = "2024-02-01";

/// Supported LLM providers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provider {
    /// `OpenAI` (api.openai.com)
    OpenAI,
    /// Azure `OpenAI` Service, or a proxy speaking its dialect
    AzureOpenAI {
        /// Deployment name (required for Azure)
        deployment_name: String,
        /// API version (e.g., "2024-02-01")
        api_version: String,
    },
    /// `OpenRouter` (openrouter.ai)
    OpenRouter,
    /// Groq (groq.com)
    Groq,
    /// Generic OpenAI-compatible provider
    Generic,
}

impl Provider {
    /// Detect provider from base URL.
    ///
    /// # Example
    ///
    /// ```rust
    /// use mcp_chatbot::llm::Provider;
    ///
    /// let provider = Provider::detect_from_url("https://api.openai.com");
    /// assert_eq!(provider, Provider::OpenAI);
    /// ```
    #[must_use]
    pub fn detect_from_url(base_url: &str) -> Self {
        let lower = base_url.to_lowercase();

        if lower.contains("azure.com") {
            Self::AzureOpenAI {
                deployment_name: String::new(),
                api_version: DEFAULT_AZURE_API_VERSION.to_string(),
            }
        } else if lower.contains("openrouter.ai") {
            Self::OpenRouter
        } else if lower.contains("groq.com") {
            Self::Groq
        } else if lower.contains("openai.com") {
            Self::OpenAI
        } else {
            Self::Generic
        }
    }

    /// Resolve the provider from URL detection plus explicit Azure settings.
    ///
    /// Setting an API version forces the Azure dialect even for hosts that
    /// aren't recognised (e.g. an internal proxy). A missing deployment name
    /// falls back to the model name.
    #[must_use]
    pub fn resolve(
        base_url: &str,
        model: &str,
        deployment_name: Option<&str>,
        api_version: Option<&str>,
    ) -> Self {
        let detected = Self::detect_from_url(base_url);
        let is_azure = matches!(detected, Self::AzureOpenAI { .. }) || api_version.is_some();
        if !is_azure {
            return detected;
        }

        Self::AzureOpenAI {
            deployment_name: deployment_name.unwrap_or(model).to_string(),
            api_version: api_version
                .unwrap_or(DEFAULT_AZURE_API_VERSION)
                .to_string(),
        }
    }

    /// Build the chat completions URL for this provider.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The base URL (trailing slash optional)
    #[must_use]
    pub fn build_chat_url(&self, base_url: &str) -> String {
        let base = base_url.trim_end_matches('/');

        match self {
            Self::AzureOpenAI {
                deployment_name,
                api_version,
            } => {
                format!(
                    "{base}/openai/deployments/{deployment_name}/chat/completions?api-version={api_version}"
                )
            }
            _ => format!("{base}/v1/chat/completions"),
        }
    }

    /// Azure authenticates with an `api-key` header instead of a bearer token.
    #[must_use]
    pub fn uses_api_key_header(&self) -> bool {
        matches!(self, Self::AzureOpenAI { .. })
    }
}
