//! Per-session chat state.
//!
//! A [`ChatSession`] is an explicit value owned by the interactive loop and
//! moved through each shell turn. Activating a persona builds a fresh
//! session from its manifest; `/reset` replaces it with a default one.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Local};
use rand::Rng;
use rand::seq::{IndexedRandom, SliceRandom};
use slashgpt_config::AppConfig;
use slashgpt_core::error::{Error, Result};
use slashgpt_core::manifest::Manifest;
use slashgpt_core::message::{Conversation, Message};
use tracing::{debug, info};

use crate::context::articles::{Retriever, build_augmented_prompt};
use crate::context::token::TokenCounters;
use crate::template::{Bindings, PromptTemplate, RANDOM};

/// Role key of the session that is active before any persona.
pub const DEFAULT_ROLE: &str = "GPT";

const DEFAULT_USER_NAME: &str = "You";

/// Model settings a session starts with unless its manifest overrides them.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionDefaults {
    pub model: String,
    pub temperature: f32,
}

impl SessionDefaults {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            model: config.openai.model.clone(),
            temperature: config.openai.temperature,
        }
    }
}

/// State of one chat session.
pub struct ChatSession {
    role: String,
    started_at: DateTime<Local>,
    user_name: String,
    bot_name: String,
    title: String,
    model: String,
    temperature: f32,
    manifest: Option<Manifest>,
    /// Prompt with `{random}` already filled; `{articles}` is filled per turn.
    template: Option<PromptTemplate>,
    retriever: Option<Arc<dyn Retriever>>,
    conversation: Conversation,
}

impl ChatSession {
    /// A session without a persona.
    pub fn new(defaults: &SessionDefaults) -> Self {
        Self {
            role: DEFAULT_ROLE.to_string(),
            started_at: Local::now(),
            user_name: DEFAULT_USER_NAME.to_string(),
            bot_name: DEFAULT_ROLE.to_string(),
            title: String::new(),
            model: defaults.model.clone(),
            temperature: defaults.temperature,
            manifest: None,
            template: None,
            retriever: None,
            conversation: Conversation::new(),
        }
    }

    /// A session for the persona `key`.
    ///
    /// The manifest's `data` pool is shuffled once and fills `{random}`
    /// placeholders left to right; the conversation starts with the
    /// resulting system prompt. Index lookup is left to the caller, see
    /// [`ChatSession::attach_retriever`].
    pub fn activate<R: Rng + ?Sized>(
        key: &str,
        manifest: &Manifest,
        defaults: &SessionDefaults,
        rng: &mut R,
    ) -> Self {
        let mut pool = manifest.data.clone();
        pool.shuffle(rng);

        let template = PromptTemplate::parse(&manifest.prompt_text())
            .bind(&Bindings::new().sequence(RANDOM, pool));
        let conversation = Conversation::with_system(template.to_string());

        let session = Self {
            role: key.to_string(),
            started_at: Local::now(),
            user_name: manifest
                .you
                .clone()
                .unwrap_or_else(|| DEFAULT_USER_NAME.to_string()),
            bot_name: manifest.bot.clone().unwrap_or_else(|| key.to_string()),
            title: manifest.title.clone().unwrap_or_default(),
            model: manifest
                .model
                .clone()
                .unwrap_or_else(|| defaults.model.clone()),
            temperature: manifest.temperature.unwrap_or(defaults.temperature),
            manifest: Some(manifest.clone()),
            template: Some(template),
            retriever: None,
            conversation,
        };

        info!(
            role = %session.role,
            model = %session.model,
            temperature = session.temperature,
            "Activated persona"
        );
        session
    }

    /// Use `retriever` to refresh `{articles}` before every model call.
    pub fn attach_retriever(&mut self, retriever: Arc<dyn Retriever>) {
        self.retriever = Some(retriever);
    }

    pub fn has_retriever(&self) -> bool {
        self.retriever.is_some()
    }

    /// Pick one of the manifest's greetings and add it as an assistant turn.
    pub fn pick_intro<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<String> {
        let intro = self.manifest.as_ref()?.intro.choose(rng)?.clone();
        self.conversation.push(Message::assistant(intro.clone()));
        Some(intro)
    }

    /// Add a user turn.
    ///
    /// With a retriever attached, the system prompt is then re-rendered
    /// from the template with freshly retrieved articles. If that fails the
    /// question stays in the conversation.
    pub async fn append_question(
        &mut self,
        question: impl Into<String>,
        counters: &TokenCounters,
        token_budget: usize,
    ) -> Result<()> {
        self.conversation.push(Message::user(question));

        let Some(retriever) = self.retriever.as_ref() else {
            return Ok(());
        };
        let template = self
            .template
            .as_ref()
            .ok_or_else(|| Error::Internal("Missing system message".into()))?;

        let counter = counters.counter_for(&self.model)?;
        let prompt = build_augmented_prompt(
            template,
            self.conversation.user_turns(),
            retriever.as_ref(),
            counter.as_ref(),
            token_budget,
        )
        .await?;

        debug!(chars = prompt.len(), "Refreshed system prompt");
        self.conversation.set_system_prompt(prompt)
    }

    /// Add the model's reply.
    pub fn push_reply(&mut self, message: Message) {
        self.conversation.push(message);
    }

    pub fn set_model(&mut self, model: impl Into<String>) {
        self.model = model.into();
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }

    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    pub fn bot_name(&self) -> &str {
        &self.bot_name
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    pub fn manifest(&self) -> Option<&Manifest> {
        self.manifest.as_ref()
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }
}

impl fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatSession")
            .field("role", &self.role)
            .field("started_at", &self.started_at)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("has_retriever", &self.retriever.is_some())
            .field("messages", &self.conversation.len())
            .finish()
    }
}
