use anyhow::Result;

/// Turns the markdown `explanation` of a model into its display format
pub trait ExplanationRenderer: Send + Sync {
    fn render(&self, markdown: &str) -> Result<String>;
}

/// Leaves the explanation as the markdown the LLM wrote
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughRenderer;

impl ExplanationRenderer for PassthroughRenderer {
    fn render(&self, markdown: &str) -> Result<String> {
        Ok(markdown.to_string())
    }
}
