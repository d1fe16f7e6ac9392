//! Prompt templates with named `{placeholder}` slots.
//!
//! A template is parsed once into literal and placeholder segments.
//! Binding fills slots from an explicit map and yields a new template in
//! which filled slots have become literal text, so substituted values are
//! never re-scanned for placeholders.
//!
//! Only `{identifier}` forms are placeholders; any other brace (JSON
//! examples, `{}`) is literal text.

use std::collections::HashMap;
use std::fmt;

/// Slot filled with retrieved reference text.
pub const ARTICLES: &str = "articles";

/// Repeatable slot filled from the manifest's data pool.
pub const RANDOM: &str = "random";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

/// A parsed prompt template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptTemplate {
    segments: Vec<Segment>,
}

/// How one placeholder name is filled.
#[derive(Debug, Clone)]
pub enum Binding {
    /// Fill the first occurrence only.
    Once(String),
    /// Fill occurrences left to right, one item each, until exhausted.
    Sequence(Vec<String>),
}

impl Binding {
    fn value(&self, occurrence: usize) -> Option<&str> {
        match self {
            Binding::Once(value) => (occurrence == 0).then_some(value.as_str()),
            Binding::Sequence(items) => items.get(occurrence).map(String::as_str),
        }
    }
}

/// Placeholder name → binding.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    map: HashMap<String, Binding>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn once(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.map.insert(name.into(), Binding::Once(value.into()));
        self
    }

    pub fn sequence(mut self, name: impl Into<String>, items: Vec<String>) -> Self {
        self.map.insert(name.into(), Binding::Sequence(items));
        self
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl PromptTemplate {
    pub fn parse(text: &str) -> Self {
        let mut template = Self::default();
        let mut literal = String::new();
        let mut rest = text;

        while let Some(open) = rest.find('{') {
            literal.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            match after.find('}') {
                Some(close) if is_identifier(&after[..close]) => {
                    template.push_literal(std::mem::take(&mut literal));
                    template
                        .segments
                        .push(Segment::Placeholder(after[..close].to_string()));
                    rest = &after[close + 1..];
                }
                _ => {
                    literal.push('{');
                    rest = after;
                }
            }
        }
        literal.push_str(rest);
        template.push_literal(literal);
        template
    }

    fn push_literal(&mut self, text: String) {
        if text.is_empty() {
            return;
        }
        match self.segments.last_mut() {
            Some(Segment::Literal(prev)) => prev.push_str(&text),
            _ => self.segments.push(Segment::Literal(text)),
        }
    }

    /// Placeholder names in order of appearance, repeats included.
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Placeholder(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Number of occurrences of `name`.
    pub fn count(&self, name: &str) -> usize {
        self.placeholders().filter(|p| *p == name).count()
    }

    /// Fill placeholders from `bindings`, leaving unbound or exhausted ones
    /// in place.
    pub fn bind(&self, bindings: &Bindings) -> PromptTemplate {
        let mut used: HashMap<&str, usize> = HashMap::new();
        let mut bound = PromptTemplate::default();

        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => bound.push_literal(text.clone()),
                Segment::Placeholder(name) => {
                    let occurrence = used.entry(name.as_str()).or_insert(0);
                    match bindings.map.get(name).and_then(|b| b.value(*occurrence)) {
                        Some(value) => {
                            *occurrence += 1;
                            bound.push_literal(value.to_string());
                        }
                        None => bound.segments.push(segment.clone()),
                    }
                }
            }
        }

        bound
    }

    /// Fill placeholders and produce the final text.
    pub fn render(&self, bindings: &Bindings) -> String {
        self.bind(bindings).to_string()
    }
}

impl fmt::Display for PromptTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => f.write_str(text)?,
                Segment::Placeholder(name) => write!(f, "{{{name}}}")?,
            }
        }
        Ok(())
    }
}
