//! Data models for upstream API responses and MCP tool inputs.

mod inputs;
mod search;
mod sms;

pub use inputs::*;
pub use search::*;
pub use sms::*;

use serde::{Deserialize, Serialize};

/// Output format for tool responses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    /// Human-readable Markdown.
    #[default]
    Markdown,
    /// Machine-readable JSON.
    Json,
}
