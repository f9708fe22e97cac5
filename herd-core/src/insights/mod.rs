//! AMU insights — narrative analysis from a completion provider
//!
//! [`prompt`] serialises an animal and its recent records into a prompt;
//! [`client`] sends it to the completion provider with a bounded retry
//! policy and always hands back text.

pub mod client;
pub mod prompt;

pub use client::{
    generate_insight, ChatCompletionClient, CompletionBackend, InsightError, SYSTEM_PROMPT,
};
pub use prompt::{compose_prompt, RECENT_RECORD_LIMIT};
