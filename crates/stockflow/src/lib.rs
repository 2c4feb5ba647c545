pub mod config;
pub mod conversation;
pub mod engine;
pub mod errors;
pub mod models;
pub mod normalizer;
pub mod prompt_template;
pub mod providers;
pub mod render;
pub mod schema;

pub use config::EngineConfig;
pub use engine::{generate, QuantitativeEngine};
pub use errors::{EngineError, EngineResult};
pub use models::causal::CausalModel;
