//! # CampusDesk Core
//!
//! Domain types, traits, and error definitions for the CampusDesk
//! admissions assistant. This crate has **no framework dependencies**: it
//! defines the model that the provider, chat, and gateway crates build on.
//!
//! ## Layout
//!
//! - [`message`]: conversation turns and the per-session transcript
//! - [`provider`]: the backend abstraction plus generation/safety settings
//! - [`error`]: the error taxonomy shared by every crate

pub mod error;
pub mod message;
pub mod provider;

// Re-export key types at crate root for ergonomics
pub use error::{InputError, KnowledgeError, ProviderError};
pub use message::{Role, SessionId, Transcript, Turn};
pub use provider::{
    GenerationConfig, HarmBlockThreshold, HarmCategory, Provider, ProviderRequest,
    ProviderResponse, SafetySetting, Usage,
};
