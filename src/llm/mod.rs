pub mod annotator;
#[cfg(feature = "openai")]
pub mod client;
pub mod prompts;
pub mod types;

pub use annotator::*;
#[cfg(feature = "openai")]
pub use client::*;
pub use types::*;
