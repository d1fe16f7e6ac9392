//! The SlashGPT chat engine.
//!
//! Each user turn flows through:
//!
//! 1. **Parse** the line: a slash command or a question ([`shell`])
//! 2. **Append** the question to the session's conversation ([`session`])
//! 3. **Retrieve** passages for the user's turns and **pack** them under the
//!    token budget into the persona's `{articles}` slot ([`context`])
//! 4. **Send** the conversation to the completion provider and append the reply
//!
//! Persona activation fills `{random}` slots once from a shuffled pool
//! ([`template`]).

pub mod context;
pub mod session;
pub mod shell;
pub mod template;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use context::{
    EmbeddingRetriever, HeuristicCounter, Passage, ReferenceBlock, Retriever, TiktokenCounter,
    TokenCounter, TokenCounters, build_augmented_prompt,
};
pub use session::{ChatSession, DEFAULT_ROLE, SessionDefaults};
pub use shell::{Flow, ONELINE_HELP, Output, Shell, ShellSettings, SlashCommand, Turn, TurnError};
pub use template::{Binding, Bindings, PromptTemplate};
