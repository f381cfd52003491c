// Single forecast: input model, prompt building, parsing and the end-to-end pipeline.

pub mod dates;
pub mod handlers;
pub mod models;
pub mod parser;
pub mod periods;
pub mod pipeline;
pub mod prompts;

#[cfg(test)]
pub mod test_support;

pub use pipeline::{ForecastPipeline, OutputStore};
