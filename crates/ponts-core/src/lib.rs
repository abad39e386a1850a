//! Core Ponts library: transcript session, stream driver, Ollama client,
//! reasoning segmentation, markdown/math rendering, config and logging.

pub mod config;
pub mod core;
pub mod logging;
pub mod markdown;
pub mod math;
pub mod prompts;
pub mod providers;
pub mod render;
pub mod segment;
pub mod style;
