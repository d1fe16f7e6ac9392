//! The slash-command shell.
//!
//! One call to [`Shell::handle`] processes one line of user input. The
//! session is moved in and handed back in the [`Turn`] (or in the
//! [`TurnError`] when the turn fails) so the caller always keeps ownership
//! of the conversation.
//!
//! | Input | Effect |
//! |-------|--------|
//! | empty | one-line help |
//! | `/help` | list persona keys |
//! | `/bye` | exit |
//! | `/prompt` | show the system prompt |
//! | `/gpt3`, `/gpt4` | switch model |
//! | `/sample` | ask the persona's sample question |
//! | `/reset` | start a default session |
//! | `/<key>` | activate persona `key` |
//! | anything else | ask the model |

use std::sync::{Arc, Mutex, PoisonError};

use rand::SeedableRng;
use rand::rngs::StdRng;
use slashgpt_config::{AppConfig, TokenizerKind};
use slashgpt_core::error::{Error, IndexError, Result};
use slashgpt_core::index::IndexCatalog;
use slashgpt_core::manifest::ManifestStore;
use slashgpt_core::provider::{Provider, ProviderRequest};
use tracing::{debug, info};

use crate::context::articles::{EmbeddingRetriever, Retriever};
use crate::context::token::TokenCounters;
use crate::session::{ChatSession, SessionDefaults};

/// Printed for an empty line and at startup.
pub const ONELINE_HELP: &str = "System Slashes: /bye, /reset, /help, /prompt, /gpt3, /gpt4";

const GPT3_MODEL: &str = "gpt-3.5-turbo";
const GPT4_MODEL: &str = "gpt-4";

/// A parsed `/command` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlashCommand<'a> {
    Help,
    Bye,
    Prompt,
    /// Switch to the named model
    Model(&'static str),
    Sample,
    Reset,
    /// Activate a persona (or report an unknown command)
    Persona(&'a str),
}

impl<'a> SlashCommand<'a> {
    /// `None` if the line is not a slash command.
    pub fn parse(line: &'a str) -> Option<Self> {
        let key = line.strip_prefix('/')?;
        Some(match key {
            "help" => Self::Help,
            "bye" => Self::Bye,
            "prompt" => Self::Prompt,
            "gpt3" => Self::Model(GPT3_MODEL),
            "gpt4" => Self::Model(GPT4_MODEL),
            "sample" => Self::Sample,
            "reset" => Self::Reset,
            other => Self::Persona(other),
        })
    }
}

/// Something to show the user.
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    /// Plain system text
    Notice(String),
    /// A line spoken by the bot
    Bot { name: String, text: String },
}

/// What the loop should do after a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// The model answered; the transcript changed
    Replied,
    Exit,
}

/// The result of one handled line.
#[derive(Debug)]
pub struct Turn {
    pub session: ChatSession,
    pub outputs: Vec<Output>,
    pub flow: Flow,
}

impl Turn {
    fn new(session: ChatSession, flow: Flow) -> Self {
        Self {
            session,
            outputs: Vec::new(),
            flow,
        }
    }

    fn notice(session: ChatSession, text: impl Into<String>) -> Self {
        Self::new(session, Flow::Continue).with(Output::Notice(text.into()))
    }

    fn with(mut self, output: Output) -> Self {
        self.outputs.push(output);
        self
    }
}

/// A failed turn. Carries the session back so the loop can continue.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct TurnError {
    pub session: ChatSession,
    #[source]
    pub error: Error,
}

/// Settings the shell applies to every session.
#[derive(Debug, Clone)]
pub struct ShellSettings {
    pub defaults: SessionDefaults,
    pub embedding_model: String,
    pub top_k: usize,
    pub token_budget: usize,
    pub tokenizer: TokenizerKind,
}

impl ShellSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            defaults: SessionDefaults::from_config(config),
            embedding_model: config.openai.embedding_model.clone(),
            top_k: config.retrieval.top_k,
            token_budget: config.retrieval.token_budget,
            tokenizer: config.retrieval.tokenizer,
        }
    }
}

/// Dispatches input lines against the loaded personas.
pub struct Shell {
    provider: Arc<dyn Provider>,
    catalog: Arc<dyn IndexCatalog>,
    manifests: ManifestStore,
    settings: ShellSettings,
    counters: TokenCounters,
    rng: Mutex<StdRng>,
}

impl Shell {
    pub fn new(
        provider: Arc<dyn Provider>,
        catalog: Arc<dyn IndexCatalog>,
        manifests: ManifestStore,
        settings: ShellSettings,
    ) -> Self {
        Self {
            provider,
            catalog,
            manifests,
            counters: TokenCounters::new(settings.tokenizer),
            settings,
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Use a fixed seed for shuffles and intro picks.
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    pub fn manifests(&self) -> &ManifestStore {
        &self.manifests
    }

    pub fn settings(&self) -> &ShellSettings {
        &self.settings
    }

    /// A session without a persona.
    pub fn new_session(&self) -> ChatSession {
        ChatSession::new(&self.settings.defaults)
    }

    /// Process one input line.
    pub async fn handle(
        &self,
        mut session: ChatSession,
        line: &str,
    ) -> std::result::Result<Turn, TurnError> {
        if line.is_empty() {
            return Ok(Turn::notice(session, ONELINE_HELP));
        }

        // A sample question is echoed before it is asked.
        let (question, echo) = match SlashCommand::parse(line) {
            None => (line.to_string(), false),
            Some(SlashCommand::Help) => {
                let keys: Vec<String> = self.manifests.keys().map(|k| format!("/{k}")).collect();
                return Ok(Turn::notice(session, format!("Extensions: {}", keys.join(", "))));
            }
            Some(SlashCommand::Bye) => return Ok(Turn::new(session, Flow::Exit)),
            Some(SlashCommand::Prompt) => {
                let prompt = session.conversation().system_prompt().map(str::to_string);
                return Ok(match prompt {
                    Some(prompt) => Turn::notice(session, prompt),
                    None => Turn::new(session, Flow::Continue),
                });
            }
            Some(SlashCommand::Model(model)) => {
                session.set_model(model);
                return Ok(Turn::notice(session, format!("Model = {model}")));
            }
            Some(SlashCommand::Reset) => {
                return Ok(Turn::new(self.new_session(), Flow::Continue));
            }
            Some(SlashCommand::Sample) if session.manifest().is_some() => {
                match session.manifest().and_then(|m| m.sample.clone()) {
                    Some(sample) => (sample, true),
                    None => return Ok(Turn::new(session, Flow::Continue)),
                }
            }
            Some(SlashCommand::Sample) => return self.activate(session, "sample").await,
            Some(SlashCommand::Persona(key)) => return self.activate(session, key).await,
        };

        let mut outputs = Vec::new();
        if echo {
            outputs.push(Output::Notice(question.clone()));
        }

        match self.submit(&mut session, question).await {
            Ok(text) => {
                outputs.push(Output::Bot {
                    name: session.bot_name().to_string(),
                    text,
                });
                Ok(Turn {
                    session,
                    outputs,
                    flow: Flow::Replied,
                })
            }
            Err(error) => Err(TurnError { session, error }),
        }
    }

    async fn activate(
        &self,
        session: ChatSession,
        key: &str,
    ) -> std::result::Result<Turn, TurnError> {
        let Some(manifest) = self.manifests.get(key) else {
            return Ok(Turn::notice(session, format!("Invalid slash command: {key}")));
        };

        let (mut next, intro) = {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            let mut next =
                ChatSession::activate(key, manifest, &self.settings.defaults, &mut *rng);
            let intro = next.pick_intro(&mut *rng);
            (next, intro)
        };

        if let Some(index_name) = manifest.articles.as_deref() {
            match self.open_retriever(index_name).await {
                Ok(retriever) => next.attach_retriever(retriever),
                Err(error) => return Err(TurnError { session, error }),
            }
        }

        // Temperatures print with a decimal point, as `1.0` rather than `1`.
        let announcement = format!(
            "Activating: {} (model={}, temperature={:?})",
            next.title(),
            next.model(),
            next.temperature()
        );
        let mut turn = Turn::notice(next, announcement);
        if let Some(text) = intro {
            let name = turn.session.bot_name().to_string();
            turn = turn.with(Output::Bot { name, text });
        }
        Ok(turn)
    }

    /// Open the named index after checking that the catalog lists it.
    async fn open_retriever(&self, name: &str) -> Result<Arc<dyn Retriever>> {
        let names = self.catalog.list_indexes().await?;
        if !names.iter().any(|n| n == name) {
            return Err(IndexError::NotFound(name.to_string()).into());
        }

        let index = self.catalog.open(name).await?;
        info!(catalog = %self.catalog.name(), index = %name, "Opened article index");
        Ok(Arc::new(EmbeddingRetriever::new(
            Arc::clone(&self.provider),
            self.settings.embedding_model.clone(),
            index,
            self.settings.top_k,
        )))
    }

    /// Append the question and ask the model. Returns the reply text.
    async fn submit(&self, session: &mut ChatSession, question: String) -> Result<String> {
        session
            .append_question(question, &self.counters, self.settings.token_budget)
            .await?;

        let request = ProviderRequest {
            model: session.model().to_string(),
            messages: session.conversation().messages().to_vec(),
            temperature: session.temperature(),
            max_tokens: None,
        };
        debug!(
            provider = %self.provider.name(),
            model = %request.model,
            messages = request.messages.len(),
            "Sending completion request"
        );

        let response = self.provider.complete(request).await?;
        let text = response.message.content.clone();
        session.push_reply(response.message);
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use slashgpt_core::error::ProviderError;
    use slashgpt_core::manifest::Manifest;
    use slashgpt_core::provider::{EmbeddingRequest, EmbeddingResponse, ProviderResponse};
    use slashgpt_core::message::Role;
    use slashgpt_index::LocalCatalog;

    fn settings() -> ShellSettings {
        ShellSettings {
            defaults: SessionDefaults {
                model: "gpt-3.5-turbo".into(),
                temperature: 0.7,
            },
            embedding_model: "text-embedding-ada-002".into(),
            top_k: 100,
            token_budget: 3596,
            tokenizer: TokenizerKind::Heuristic,
        }
    }

    fn manifests() -> ManifestStore {
        let mut store = ManifestStore::new();
        store.insert(
            "wiki",
            Manifest::from_json(
                r#"{"title":"Olympics Q&A","bot":"Wiki","temperature":"0.0",
                    "articles":"olympics","sample":"Who won curling?",
                    "prompt":["Answer using:{articles}"],"intro":["Ask me about the Olympics."]}"#,
            )
            .unwrap(),
        );
        store.insert(
            "poet",
            Manifest::from_json(r#"{"title":"Poet","prompt":["Write about {random}."],"data":["rain"]}"#)
                .unwrap(),
        );
        store.insert(
            "broken",
            Manifest::from_json(r#"{"title":"Broken","articles":"missing","prompt":["{articles}"]}"#)
                .unwrap(),
        );
        store
    }

    fn shell(provider: Arc<SequentialMockProvider>) -> Shell {
        Shell::new(provider, olympics_catalog(), manifests(), settings()).with_rng_seed(11)
    }

    fn notices(turn: &Turn) -> Vec<&str> {
        turn.outputs
            .iter()
            .filter_map(|o| match o {
                Output::Notice(text) => Some(text.as_str()),
                Output::Bot { .. } => None,
            })
            .collect()
    }

    #[test]
    fn parse_slash_commands() {
        assert_eq!(SlashCommand::parse("hello"), None);
        assert_eq!(SlashCommand::parse("/help"), Some(SlashCommand::Help));
        assert_eq!(SlashCommand::parse("/gpt4"), Some(SlashCommand::Model("gpt-4")));
        assert_eq!(SlashCommand::parse("/gpt3"), Some(SlashCommand::Model("gpt-3.5-turbo")));
        assert_eq!(SlashCommand::parse("/wiki"), Some(SlashCommand::Persona("wiki")));
        assert_eq!(SlashCommand::parse("/"), Some(SlashCommand::Persona("")));
    }

    #[tokio::test]
    async fn empty_line_prints_oneline_help() {
        let shell = shell(Arc::new(SequentialMockProvider::new(&[])));
        let turn = shell.handle(shell.new_session(), "").await.unwrap();
        assert_eq!(notices(&turn), vec![ONELINE_HELP]);
        assert_eq!(turn.flow, Flow::Continue);
    }

    #[tokio::test]
    async fn help_lists_personas_sorted() {
        let shell = shell(Arc::new(SequentialMockProvider::new(&[])));
        let turn = shell.handle(shell.new_session(), "/help").await.unwrap();
        assert_eq!(notices(&turn), vec!["Extensions: /broken, /poet, /wiki"]);
    }

    #[tokio::test]
    async fn bye_exits() {
        let shell = shell(Arc::new(SequentialMockProvider::new(&[])));
        let turn = shell.handle(shell.new_session(), "/bye").await.unwrap();
        assert_eq!(turn.flow, Flow::Exit);
    }

    #[tokio::test]
    async fn model_switch() {
        let shell = shell(Arc::new(SequentialMockProvider::new(&[])));
        let turn = shell.handle(shell.new_session(), "/gpt4").await.unwrap();
        assert_eq!(notices(&turn), vec!["Model = gpt-4"]);
        assert_eq!(turn.session.model(), "gpt-4");
    }

    #[tokio::test]
    async fn unknown_command_is_reported() {
        let shell = shell(Arc::new(SequentialMockProvider::new(&[])));
        let turn = shell.handle(shell.new_session(), "/nope").await.unwrap();
        assert_eq!(notices(&turn), vec!["Invalid slash command: nope"]);
        assert_eq!(turn.session.role(), "GPT");
    }

    #[tokio::test]
    async fn prompt_is_silent_without_system_message() {
        let shell = shell(Arc::new(SequentialMockProvider::new(&[])));
        let turn = shell.handle(shell.new_session(), "/prompt").await.unwrap();
        assert!(turn.outputs.is_empty());

        let turn = shell.handle(turn.session, "/poet").await.unwrap();
        let turn = shell.handle(turn.session, "/prompt").await.unwrap();
        assert_eq!(notices(&turn), vec!["Write about rain."]);
    }

    #[tokio::test]
    async fn plain_text_is_answered() {
        let provider = Arc::new(SequentialMockProvider::new(&["Hi there"]));
        let shell = shell(Arc::clone(&provider));

        let turn = shell.handle(shell.new_session(), "Hello").await.unwrap();
        assert_eq!(turn.flow, Flow::Replied);
        assert_eq!(
            turn.outputs,
            vec![Output::Bot {
                name: "GPT".into(),
                text: "Hi there".into()
            }]
        );

        let requests = provider.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].model, "gpt-3.5-turbo");
        assert!((requests[0].temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(turn.session.conversation().len(), 2);
        assert_eq!(turn.session.conversation().messages()[1].role, Role::Assistant);
    }

    #[tokio::test]
    async fn activation_announces_and_greets() {
        let shell = shell(Arc::new(SequentialMockProvider::new(&[])));
        let turn = shell.handle(shell.new_session(), "/wiki").await.unwrap();

        assert_eq!(
            turn.outputs,
            vec![
                Output::Notice("Activating: Olympics Q&A (model=gpt-3.5-turbo, temperature=0.0)".into()),
                Output::Bot {
                    name: "Wiki".into(),
                    text: "Ask me about the Olympics.".into()
                },
            ]
        );
        assert_eq!(turn.session.role(), "wiki");
        assert!(turn.session.has_retriever());
        assert_eq!(turn.session.conversation().len(), 2);
    }

    #[tokio::test]
    async fn whole_temperature_is_announced_as_float() {
        let mut store = manifests();
        store.insert(
            "plain",
            Manifest::from_json(r#"{"title":"Plain","temperature":"1","prompt":["Be plain."]}"#)
                .unwrap(),
        );
        let shell = Shell::new(
            Arc::new(SequentialMockProvider::new(&[])),
            olympics_catalog(),
            store,
            settings(),
        );

        let turn = shell.handle(shell.new_session(), "/plain").await.unwrap();
        assert_eq!(
            notices(&turn),
            vec!["Activating: Plain (model=gpt-3.5-turbo, temperature=1.0)"]
        );
    }

    #[tokio::test]
    async fn missing_index_fails_activation_and_keeps_session() {
        let shell = shell(Arc::new(SequentialMockProvider::new(&[])));
        let err = shell.handle(shell.new_session(), "/broken").await.unwrap_err();
        assert!(matches!(err.error, Error::Index(IndexError::NotFound(ref n)) if n == "missing"));
        assert_eq!(err.session.role(), "GPT");
    }

    #[tokio::test]
    async fn sample_is_echoed_and_asked_with_articles() {
        let provider = Arc::new(SequentialMockProvider::new(&["Sweden."]));
        let shell = shell(Arc::clone(&provider));

        let turn = shell.handle(shell.new_session(), "/wiki").await.unwrap();
        let turn = shell.handle(turn.session, "/sample").await.unwrap();

        assert_eq!(turn.flow, Flow::Replied);
        assert_eq!(notices(&turn), vec!["Who won curling?"]);
        assert_eq!(provider.embedded(), vec!["Who won curling?\n"]);

        let request = &provider.requests()[0];
        assert!((request.temperature - 0.0).abs() < f32::EPSILON);
        assert!(request.messages[0].content.contains("Sweden won curling gold."));
        assert_eq!(request.messages.last().unwrap().content, "Who won curling?");
    }

    #[tokio::test]
    async fn sample_without_manifest_is_a_persona_lookup() {
        let shell = shell(Arc::new(SequentialMockProvider::new(&[])));
        let turn = shell.handle(shell.new_session(), "/sample").await.unwrap();
        assert_eq!(notices(&turn), vec!["Invalid slash command: sample"]);
    }

    #[tokio::test]
    async fn sample_missing_from_manifest_does_nothing() {
        let shell = shell(Arc::new(SequentialMockProvider::new(&[])));
        let turn = shell.handle(shell.new_session(), "/poet").await.unwrap();
        let turn = shell.handle(turn.session, "/sample").await.unwrap();
        assert!(turn.outputs.is_empty());
        assert_eq!(turn.flow, Flow::Continue);
    }

    #[tokio::test]
    async fn reset_returns_default_session() {
        let shell = shell(Arc::new(SequentialMockProvider::new(&[])));
        let turn = shell.handle(shell.new_session(), "/poet").await.unwrap();
        assert_eq!(turn.session.role(), "poet");
        let turn = shell.handle(turn.session, "/reset").await.unwrap();
        assert_eq!(turn.session.role(), "GPT");
        assert!(turn.session.conversation().is_empty());
    }

    #[tokio::test]
    async fn retrieval_failure_keeps_question() {
        let mut catalog = LocalCatalog::new();
        catalog.insert(slashgpt_index::InMemoryIndex::new(
            "olympics",
            vec![slashgpt_index::IndexedPassage {
                id: "bad".into(),
                text: "three dims".into(),
                embedding: vec![1.0, 0.0, 0.0],
            }],
        ));
        let shell = Shell::new(
            Arc::new(SequentialMockProvider::new(&[])),
            Arc::new(catalog),
            manifests(),
            settings(),
        );

        let turn = shell.handle(shell.new_session(), "/wiki").await.unwrap();
        let err = shell.handle(turn.session, "Who won?").await.unwrap_err();
        assert!(matches!(err.error, Error::Index(IndexError::MalformedResponse(_))));
        let turns: Vec<&str> = err.session.conversation().user_turns().collect();
        assert_eq!(turns, vec!["Who won?"]);
    }

    /// Rate-limits the first completion, then answers.
    struct RateLimitedOnce {
        inner: SequentialMockProvider,
        failed: Mutex<bool>,
    }

    #[async_trait::async_trait]
    impl Provider for RateLimitedOnce {
        fn name(&self) -> &str {
            "rate_limited_once"
        }

        async fn complete(
            &self,
            request: ProviderRequest,
        ) -> std::result::Result<ProviderResponse, ProviderError> {
            {
                let mut failed = self.failed.lock().unwrap();
                if !*failed {
                    *failed = true;
                    return Err(ProviderError::RateLimited);
                }
            }
            self.inner.complete(request).await
        }

        async fn embed(
            &self,
            request: EmbeddingRequest,
        ) -> std::result::Result<EmbeddingResponse, ProviderError> {
            self.inner.embed(request).await
        }
    }

    #[tokio::test]
    async fn completion_failure_keeps_question_for_next_turn() {
        let provider = Arc::new(RateLimitedOnce {
            inner: SequentialMockProvider::new(&["Both noted."]),
            failed: Mutex::new(false),
        });
        let shell = Shell::new(
            Arc::clone(&provider) as Arc<dyn Provider>,
            olympics_catalog(),
            manifests(),
            settings(),
        );

        let err = shell.handle(shell.new_session(), "first").await.unwrap_err();
        assert!(matches!(err.error, Error::Provider(ProviderError::RateLimited)));
        assert_eq!(err.to_string(), "Provider error: Rate limited by provider");
        let turns: Vec<&str> = err.session.conversation().user_turns().collect();
        assert_eq!(turns, vec!["first"]);

        let turn = shell.handle(err.session, "second").await.unwrap();
        assert_eq!(turn.flow, Flow::Replied);

        let requests = provider.inner.requests();
        assert_eq!(requests.len(), 1);
        let sent: Vec<&str> = requests[0]
            .messages
            .iter()
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(sent, vec!["first", "second"]);
    }
}
