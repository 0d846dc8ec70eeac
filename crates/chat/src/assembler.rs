//! Context assembly — flattens the knowledge base into one text block.
//!
//! # Format
//!
//! ```text
//! Information about {subject}:
//!
//! {key}: {text}
//!
//! {key}:
//!   {sub_key}: {text}
//!
//!   {sub_key}: {text}
//!
//! ```
//!
//! Entries are emitted in declaration order with no filtering: the whole
//! knowledge base is sent on every call. Rendering is deterministic, so the
//! composer renders once and reuses the result.

use std::fmt::Write;

use crate::knowledge::{KnowledgeBase, KnowledgeValue};

/// Render the knowledge base as prompt context.
pub fn render_context(kb: &KnowledgeBase) -> String {
    let mut context = format!("Information about {}:\n\n", kb.subject());

    for entry in kb.entries() {
        match &entry.value {
            KnowledgeValue::Text(text) => {
                let _ = write!(context, "{}: {}\n\n", entry.key, text);
            }
            KnowledgeValue::Nested(sections) => {
                let _ = writeln!(context, "{}:", entry.key);
                for (sub_key, text) in sections {
                    let _ = write!(context, "  {sub_key}: {text}\n\n");
                }
            }
        }
    }

    context
}
