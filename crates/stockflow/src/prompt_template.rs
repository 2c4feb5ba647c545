use serde::Serialize;
use std::collections::HashMap;
use tera::{Context, Error as TeraError, Tera};

pub const DEFAULT_SYSTEM_PROMPT: &str = include_str!("prompts/system.md");
pub const MENTOR_SYSTEM_PROMPT: &str = include_str!("prompts/mentor.md");
pub const DEFAULT_ASSISTANT_PROMPT: &str = include_str!("prompts/assistant.md");
pub const DEFAULT_FEEDBACK_PROMPT: &str = include_str!("prompts/feedback.md");
pub const DEFAULT_BACKGROUND_PROMPT: &str = include_str!("prompts/background.md");
pub const DEFAULT_PROBLEM_STATEMENT_PROMPT: &str = include_str!("prompts/problem_statement.md");

pub const BACKGROUND_PLACEHOLDER: &str = "background_knowledge";
pub const PROBLEM_STATEMENT_PLACEHOLDER: &str = "problem_statement";

pub fn load_prompt<T: Serialize>(template: &str, context_data: &T) -> Result<String, TeraError> {
    let mut tera = Tera::default();
    tera.add_raw_template("inline_template", template)?;
    let context = Context::from_serialize(context_data)?;
    let rendered = tera.render("inline_template", &context)?;
    Ok(rendered)
}

/// Make sure `template` mentions `{{ placeholder }}`, appending it after a blank line
/// when a custom template left it out.
pub fn ensure_placeholder(template: &str, placeholder: &str) -> String {
    if mentions_placeholder(template, placeholder) {
        template.to_string()
    } else {
        format!("{}\n\n{{{{ {} }}}}", template.trim(), placeholder)
    }
}

/// True when some `{{ ... }}` expression in `template` is exactly `placeholder`
fn mentions_placeholder(template: &str, placeholder: &str) -> bool {
    template.split("{{").skip(1).any(|rest| {
        rest.split_once("}}")
            .is_some_and(|(inner, _)| inner.trim() == placeholder)
    })
}

/// Render a template with a single placeholder substituted by `value`.
pub fn render_with_placeholder(
    template: &str,
    placeholder: &str,
    value: &str,
) -> Result<String, TeraError> {
    let template = ensure_placeholder(template, placeholder);
    let mut context = HashMap::new();
    context.insert(placeholder, value);
    load_prompt(&template, &context)
}
