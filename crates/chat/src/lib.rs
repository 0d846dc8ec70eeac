//! The CampusDesk chat pipeline.
//!
//! - [`knowledge`]: the immutable knowledge base and its TOML document format
//! - [`assembler`]: renders the knowledge base as prompt context
//! - [`composer`]: system rules + context + question → outgoing prompt
//! - [`session`]: per-conversation transcripts and the store that owns them
//! - [`augmenter`]: keyword-triggered knowledge appendices on replies
//! - [`service`]: [`ChatService`], which runs the whole flow per request

pub mod assembler;
pub mod augmenter;
pub mod composer;
pub mod knowledge;
pub mod service;
pub mod session;

pub use assembler::render_context;
pub use augmenter::{ResponseAugmenter, TriggerRule};
pub use composer::{DEFAULT_SYSTEM_PROMPT, PromptComposer};
pub use knowledge::{KnowledgeBase, KnowledgeEntry, KnowledgeValue};
pub use service::{APOLOGY, ChatReply, ChatService, ChatSettings};
pub use session::{ConversationSession, SessionHandle, SessionStore};
