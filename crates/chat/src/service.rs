//! The chat pipeline.
//!
//! question → compose prompt (system rules + full knowledge context +
//! question) → session exchange with the backend → keyword augmentation →
//! reply.
//!
//! Backend failures never reach the caller: they are logged and replaced by
//! [`APOLOGY`], and the session records nothing for the failed exchange.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use campusdesk_config::AppConfig;
use campusdesk_core::error::{InputError, KnowledgeError};
use campusdesk_core::provider::{GenerationConfig, Provider, ProviderRequest, SafetySetting};

use crate::augmenter::ResponseAugmenter;
use crate::composer::PromptComposer;
use crate::knowledge::KnowledgeBase;
use crate::session::{ConversationSession, SessionStore};

/// Reply sent when the backend cannot produce an answer.
pub const APOLOGY: &str =
    "I'm sorry, I'm having trouble processing your request right now. Please try again later.";

/// Knowledge entry listing the campus image paths.
pub const CAMPUS_IMAGES_KEY: &str = "campus_images";

/// The answer to one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    pub response: String,
    /// Always empty; kept for wire compatibility with existing clients.
    pub images: Vec<String>,
}

impl ChatReply {
    fn text(response: String) -> Self {
        Self {
            response,
            images: Vec::new(),
        }
    }
}

/// Backend request settings applied to every exchange.
#[derive(Debug, Clone)]
pub struct ChatSettings {
    pub model: String,
    pub generation: GenerationConfig,
    pub safety: Vec<SafetySetting>,
    /// Most recent history turns replayed per exchange; zero replays all.
    pub max_history_turns: usize,
}

impl Default for ChatSettings {
    fn default() -> Self {
        let backend = campusdesk_config::BackendConfig::default();
        Self {
            model: backend.model,
            generation: backend.generation,
            safety: backend.safety,
            max_history_turns: 0,
        }
    }
}

impl ChatSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            model: config.backend.model.clone(),
            generation: config.backend.generation.clone(),
            safety: config.backend.safety.clone(),
            max_history_turns: config.session.max_history_turns,
        }
    }
}

/// Owns the knowledge base, the sessions and the backend handle.
pub struct ChatService {
    provider: Arc<dyn Provider>,
    knowledge: Arc<KnowledgeBase>,
    composer: PromptComposer,
    augmenter: ResponseAugmenter,
    sessions: SessionStore,
    settings: ChatSettings,
}

impl ChatService {
    /// A service over `knowledge` using its declared trigger rules, the
    /// built-in system prompt and a single shared session.
    pub fn new(provider: Arc<dyn Provider>, knowledge: KnowledgeBase) -> Self {
        let composer = PromptComposer::with_default_prompt(&knowledge);
        let augmenter = ResponseAugmenter::for_knowledge(&knowledge);
        Self {
            provider,
            knowledge: Arc::new(knowledge),
            composer,
            augmenter,
            sessions: SessionStore::shared(),
            settings: ChatSettings::default(),
        }
    }

    /// Build the service described by `config` around `provider`.
    pub fn from_config(config: &AppConfig, provider: Arc<dyn Provider>) -> Result<Self, KnowledgeError> {
        let knowledge = KnowledgeBase::load_or_embedded(config.knowledge.path.as_deref().map(Path::new))?;
        let composer = PromptComposer::from_prompt_file(
            config.knowledge.system_prompt_path.as_deref().map(Path::new),
            &knowledge,
        )?;

        info!(
            subject = %knowledge.subject(),
            entries = knowledge.len(),
            triggers = knowledge.triggers().len(),
            session_mode = ?config.session.mode,
            "Knowledge base loaded"
        );

        Ok(Self::new(provider, knowledge)
            .with_composer(composer)
            .with_sessions(SessionStore::new(config.session.mode, config.session.max_sessions))
            .with_settings(ChatSettings::from_config(config)))
    }

    pub fn with_composer(mut self, composer: PromptComposer) -> Self {
        self.composer = composer;
        self
    }

    pub fn with_augmenter(mut self, augmenter: ResponseAugmenter) -> Self {
        self.augmenter = augmenter;
        self
    }

    pub fn with_sessions(mut self, sessions: SessionStore) -> Self {
        self.sessions = sessions;
        self
    }

    pub fn with_settings(mut self, settings: ChatSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.knowledge
    }

    pub fn composer(&self) -> &PromptComposer {
        &self.composer
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Answer `message` within the session selected by `session_key`.
    ///
    /// Fails only with [`InputError`] for a blank message. Backend errors
    /// are turned into [`APOLOGY`].
    pub async fn respond(&self, session_key: Option<&str>, message: &str) -> Result<ChatReply, InputError> {
        if message.trim().is_empty() {
            return Err(InputError("message must not be empty".into()));
        }

        let session = self.sessions.resolve(session_key).await;
        info!(
            message_len = message.len(),
            session = %self.sessions.key_for(session_key),
            "Chat request"
        );

        let prompt = self.composer.compose(message);
        let template = self.request_template();

        match ConversationSession::send(
            &session,
            self.provider.as_ref(),
            &template,
            &prompt,
            self.settings.max_history_turns,
        )
        .await
        {
            Ok(reply) => Ok(ChatReply::text(
                self.augmenter.augment(message, &reply, &self.knowledge),
            )),
            Err(e) => {
                error!(error = %e, provider = self.provider.name(), "Backend call failed");
                Ok(ChatReply::text(APOLOGY.to_string()))
            }
        }
    }

    /// Named campus image paths from the knowledge base.
    pub fn campus_images(&self) -> BTreeMap<String, String> {
        match self.knowledge.get(CAMPUS_IMAGES_KEY) {
            Some(crate::knowledge::KnowledgeValue::Nested(images)) => images.iter().cloned().collect(),
            _ => BTreeMap::new(),
        }
    }

    /// Turns recorded for `session_key`.
    pub async fn transcript_len(&self, session_key: Option<&str>) -> usize {
        self.sessions.transcript_len(session_key).await
    }

    fn request_template(&self) -> ProviderRequest {
        ProviderRequest {
            model: self.settings.model.clone(),
            turns: Vec::new(),
            generation: self.settings.generation.clone(),
            safety: self.settings.safety.clone(),
        }
    }
}
