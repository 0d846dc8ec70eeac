//! Prompt composition.
//!
//! The outgoing user turn is not the bare question: it is the behavioral
//! instruction block, then the rendered knowledge context, then the labeled
//! question, always in that order.

use std::path::Path;

use campusdesk_core::error::KnowledgeError;

use crate::assembler::render_context;
use crate::knowledge::KnowledgeBase;

/// The built-in behavioral instruction block.
pub const DEFAULT_SYSTEM_PROMPT: &str = include_str!("../data/system_prompt.txt");

/// Combines system instructions, knowledge context and the user question.
#[derive(Debug, Clone)]
pub struct PromptComposer {
    system_prompt: String,
    subject: String,
    context: String,
}

impl PromptComposer {
    /// Create a composer. The context is rendered once; the knowledge base
    /// is immutable for the life of the process.
    pub fn new(system_prompt: impl Into<String>, kb: &KnowledgeBase) -> Self {
        Self {
            system_prompt: system_prompt.into().trim().to_string(),
            subject: kb.subject().to_string(),
            context: render_context(kb),
        }
    }

    /// A composer using [`DEFAULT_SYSTEM_PROMPT`].
    pub fn with_default_prompt(kb: &KnowledgeBase) -> Self {
        Self::new(DEFAULT_SYSTEM_PROMPT, kb)
    }

    /// A composer whose instruction block is read from `path`, or the
    /// default when `path` is `None`.
    pub fn from_prompt_file(path: Option<&Path>, kb: &KnowledgeBase) -> Result<Self, KnowledgeError> {
        match path {
            Some(p) => {
                let prompt = std::fs::read_to_string(p).map_err(|e| KnowledgeError::ReadError {
                    path: p.to_path_buf(),
                    reason: e.to_string(),
                })?;
                Ok(Self::new(prompt, kb))
            }
            None => Ok(Self::with_default_prompt(kb)),
        }
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// The rendered knowledge context.
    pub fn context(&self) -> &str {
        &self.context
    }

    /// Compose the full prompt for one question.
    pub fn compose(&self, message: &str) -> String {
        format!(
            "{}\n\nHere is information about {} that you should use to answer:\n{}\n\nUser question: {}",
            self.system_prompt, self.subject, self.context, message
        )
    }
}
