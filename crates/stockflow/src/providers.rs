pub mod anthropic;
pub mod base;
pub mod capabilities;
pub mod configs;
pub mod factory;
pub mod formats;
pub mod google;
pub mod openai;

#[cfg(test)]
pub mod mock;
