use super::{
    anthropic::AnthropicProvider, base::Provider, configs::ProviderConfig,
    google::GoogleProvider, openai::OpenAiProvider,
};
use anyhow::Result;

pub fn get_provider(config: ProviderConfig) -> Result<Box<dyn Provider + Send + Sync>> {
    match config {
        ProviderConfig::OpenAi(openai_config) => Ok(Box::new(OpenAiProvider::new(openai_config)?)),
        ProviderConfig::Anthropic(anthropic_config) => {
            Ok(Box::new(AnthropicProvider::new(anthropic_config)?))
        }
        ProviderConfig::Google(google_config) => Ok(Box::new(GoogleProvider::new(google_config)?)),
    }
}
