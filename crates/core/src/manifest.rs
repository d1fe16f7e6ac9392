//! Persona manifests and the store that loads them.
//!
//! A manifest is a JSON file under the prompts directory. The file name up
//! to its first `.` is the slash-command key that activates the persona:
//!
//! ```json
//! {
//!   "title": "Wikipedia Q&A",
//!   "bot": "Wiki",
//!   "temperature": "0.0",
//!   "articles": "wikipedia",
//!   "prompt": ["Answer using the articles below.", "{articles}"]
//! }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::error::ManifestError;

/// Static configuration for one persona. Immutable once loaded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Display title shown on activation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Free-form description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub about: Option<String>,

    /// Display name for the user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub you: Option<String>,

    /// Display name for the model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot: Option<String>,

    /// Model override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Temperature override (JSON number or numeric string)
    #[serde(
        default,
        deserialize_with = "deserialize_temperature",
        skip_serializing_if = "Option::is_none"
    )]
    pub temperature: Option<f32>,

    /// Prompt template, one entry per line
    #[serde(default, deserialize_with = "deserialize_lines")]
    pub prompt: Vec<String>,

    /// Pool for `{random}` placeholders
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data: Vec<String>,

    /// Name of the vector index backing `{articles}`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub articles: Option<String>,

    /// Example question for `/sample`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample: Option<String>,

    /// Greeting variants; one is picked at random on activation
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub intro: Vec<String>,
}

impl Manifest {
    /// Parse a manifest from JSON text.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// The prompt template as a single string.
    pub fn prompt_text(&self) -> String {
        self.prompt.join("\n")
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f32),
    Text(String),
}

fn deserialize_temperature<'de, D>(deserializer: D) -> Result<Option<f32>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumberOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrString::Number(n)) => Ok(Some(n)),
        Some(NumberOrString::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(NumberOrString::Text(s)) => s
            .trim()
            .parse::<f32>()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(ManifestError::InvalidTemperature(s))),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LinesOrText {
    Lines(Vec<String>),
    Text(String),
}

fn deserialize_lines<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match LinesOrText::deserialize(deserializer)? {
        LinesOrText::Lines(lines) => lines,
        LinesOrText::Text(text) => vec![text],
    })
}

/// Mapping from slash-command key to manifest.
#[derive(Debug, Clone, Default)]
pub struct ManifestStore {
    manifests: BTreeMap<String, Manifest>,
}

impl ManifestStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `*.json` file in `dir`.
    ///
    /// The key is the file name up to its first `.`. A missing directory
    /// yields an empty store; an unreadable or malformed manifest is an error.
    pub fn load_dir(dir: &Path) -> Result<Self, ManifestError> {
        let mut store = Self::new();

        let entries = match std::fs::read_dir(dir) {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(dir = %dir.display(), "No prompts directory, no personas loaded");
                return Ok(store);
            }
            Err(e) => {
                return Err(ManifestError::Read {
                    path: dir.to_path_buf(),
                    reason: e.to_string(),
                });
            }
        };

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .filter(|p| p.extension().and_then(|ext| ext.to_str()) == Some("json"))
            .collect();
        paths.sort();

        for path in paths {
            let Some(key) = manifest_key(&path) else {
                continue;
            };
            let text = std::fs::read_to_string(&path).map_err(|e| ManifestError::Read {
                path: path.clone(),
                reason: e.to_string(),
            })?;
            let manifest = Manifest::from_json(&text).map_err(|e| ManifestError::Parse {
                path: path.clone(),
                reason: e.to_string(),
            })?;
            debug!(key = %key, file = %path.display(), "Loaded manifest");
            store.insert(key, manifest);
        }

        Ok(store)
    }

    pub fn insert(&mut self, key: impl Into<String>, manifest: Manifest) {
        self.manifests.insert(key.into(), manifest);
    }

    pub fn get(&self, key: &str) -> Option<&Manifest> {
        self.manifests.get(key)
    }

    /// Keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.manifests.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Manifest)> {
        self.manifests.iter().map(|(k, m)| (k.as_str(), m))
    }

    pub fn len(&self) -> usize {
        self.manifests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.manifests.is_empty()
    }
}

fn manifest_key(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    let key = name.split('.').next()?;
    (!key.is_empty()).then(|| key.to_string())
}
