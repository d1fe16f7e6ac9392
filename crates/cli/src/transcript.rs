//! Transcript persistence.
//!
//! Each session is written to `<output_dir>/<role>/<start-time>.json` as
//! the `[{role, content}]` array sent to the model. The file is rewritten
//! after every reply.

use std::fs;
use std::path::{Path, PathBuf};

use slashgpt_agent::ChatSession;
use slashgpt_core::error::Result;
use tracing::debug;

const FILE_TIME_FORMAT: &str = "%Y-%m-%d_%H-%M-%S%.6f";

/// Where the transcript of `session` lives under `output_dir`.
pub fn path_for(output_dir: &Path, session: &ChatSession) -> PathBuf {
    output_dir.join(session.role()).join(format!(
        "{}.json",
        session.started_at().format(FILE_TIME_FORMAT)
    ))
}

/// Write the session's messages, creating directories as needed.
pub fn save(output_dir: &Path, session: &ChatSession) -> Result<PathBuf> {
    let path = path_for(output_dir, session);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string(session.conversation())?;
    fs::write(&path, json)?;
    debug!(path = %path.display(), "Saved transcript");
    Ok(path)
}
