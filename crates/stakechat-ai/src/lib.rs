//! stakechat-ai: Client for the conversational agent HTTP API
//!
//! The agent turns free-text prompts into answers and, when it recognises a
//! transaction request, a structured set of extracted parameters.

pub mod client;
pub mod error;
pub mod types;

pub use client::{AgentApi, HttpAgentClient};
pub use error::{Error, Result};
pub use types::*;
