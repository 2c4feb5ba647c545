//! These models represent the objects passed around by the engine
//!
//! There are two families of data we need to interact with:
//! - provider-agnostic conversation messages, built by the conversation builder and
//!   converted into each provider's wire shape right before the request is sent
//! - the causal model (variables and relationships) the LLM returns, which the
//!   normalizer repairs before it reaches a caller
//!
//! Provider wire shapes live next to the providers; these internal models are not an
//! exact match to any of them.
pub mod causal;
pub mod message;
