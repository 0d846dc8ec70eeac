//! LLM backend implementations for CampusDesk.
//!
//! All backends implement the `campusdesk_core::Provider` trait.
//! [`build_from_config`] assembles the configured backend wrapped in the
//! timeout/retry policy.

pub mod builder;
pub mod gemini;
pub mod retry;

pub use builder::build_from_config;
pub use gemini::GeminiProvider;
pub use retry::{RetryPolicy, RetryProvider};
