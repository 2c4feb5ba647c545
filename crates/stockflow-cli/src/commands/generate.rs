use anyhow::{Context, Result};
use clap::{ArgGroup, Args};
use cliclack::spinner;
use console::Term;
use std::fs;
use std::path::{Path, PathBuf};

use stockflow::{CausalModel, EngineConfig, QuantitativeEngine};

#[derive(Args, Debug)]
#[command(group(
    ArgGroup::new("input")
        .required(true)
        .args(["prompt", "prompt_file"])
))]
pub struct GenerateArgs {
    /// Text describing the system to model
    #[arg(short, long)]
    pub prompt: Option<String>,

    /// Read the description from a file instead
    #[arg(long, value_name = "PATH")]
    pub prompt_file: Option<PathBuf>,

    /// JSON model to revise instead of starting from scratch
    #[arg(long, value_name = "PATH")]
    pub prior_model: Option<PathBuf>,

    /// Model to use, optionally followed by a reasoning effort (e.g. "o3 high").
    /// Defaults to STOCKFLOW_UNDERLYING_MODEL or gpt-4.1
    #[arg(short, long)]
    pub model: Option<String>,

    /// Ask for a teaching oriented explanation
    #[arg(long)]
    pub mentor: bool,

    /// Background knowledge handed to the model
    #[arg(long)]
    pub background: Option<String>,

    /// Problem statement the model should address
    #[arg(long)]
    pub problem: Option<String>,

    /// Print the model on a single line
    #[arg(long)]
    pub compact: bool,
}

pub async fn execute(args: GenerateArgs) -> Result<()> {
    let config = overlay_config(EngineConfig::from_env()?, &args);
    let prompt = read_prompt(&args)?;
    let prior = args
        .prior_model
        .as_deref()
        .map(read_prior_model)
        .transpose()?;

    let engine = QuantitativeEngine::from_config(&config)?;

    let interactive = Term::stderr().is_term();
    let spin = spinner();
    if interactive {
        spin.start(format!("generating with {}", config.underlying_model));
    }

    let result = engine.generate(&prompt, prior.as_ref(), &config).await;

    if interactive {
        spin.stop("");
    }

    let model = result.context("Failed to generate a model")?;
    println!("{}", render_output(&model, args.compact)?);
    Ok(())
}

/// Apply command line flags on top of the environment configuration
fn overlay_config(mut config: EngineConfig, args: &GenerateArgs) -> EngineConfig {
    if let Some(model) = &args.model {
        config.underlying_model = model.clone();
    }
    if args.mentor {
        config.mentor_mode = true;
    }
    if let Some(background) = &args.background {
        config.background_knowledge = Some(background.clone());
    }
    if let Some(problem) = &args.problem {
        config.problem_statement = Some(problem.clone());
    }
    config
}

fn read_prompt(args: &GenerateArgs) -> Result<String> {
    match (&args.prompt, &args.prompt_file) {
        (Some(prompt), _) => Ok(prompt.clone()),
        (None, Some(path)) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read prompt file {}", path.display())),
        (None, None) => anyhow::bail!("Either --prompt or --prompt-file is required"),
    }
}

fn read_prior_model(path: &Path) -> Result<CausalModel> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read prior model {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("{} is not a valid stock and flow model", path.display()))
}

fn render_output(model: &CausalModel, compact: bool) -> Result<String> {
    let output = if compact {
        serde_json::to_string(model)?
    } else {
        serde_json::to_string_pretty(model)?
    };
    Ok(output)
}
