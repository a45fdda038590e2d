//! Named prompt templates.
//!
//! [`PromptCatalog`] maps template names to text. Templates use `{name}`
//! placeholders; literal braces are written `{{` and `}}`. A template value in
//! the JSON source may be a single string or a list of strings, which are
//! concatenated.
//!
//! The catalog is loaded once at startup and handed down explicitly, usually
//! as `Arc<PromptCatalog>`.

use crate::types::{AppError, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{debug, error};

const BUILTIN_PROMPTS: &str = include_str!("../../resources/prompts.json");

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTemplate {
    Text(String),
    Lines(Vec<String>),
}

/// Loaded prompt templates.
#[derive(Debug, Clone)]
pub struct PromptCatalog {
    templates: BTreeMap<String, String>,
}

impl PromptCatalog {
    /// Catalog compiled into the binary.
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_PROMPTS)
    }

    /// Parse a catalog from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: BTreeMap<String, RawTemplate> = serde_json::from_str(json).map_err(|e| {
            AppError::Config(format!("Prompt catalog is not a map of string or string-list values: {}", e))
        })?;

        let templates = raw
            .into_iter()
            .map(|(name, template)| {
                let text = match template {
                    RawTemplate::Text(text) => text,
                    RawTemplate::Lines(lines) => lines.concat(),
                };
                (name, text)
            })
            .collect::<BTreeMap<_, _>>();

        debug!(count = templates.len(), "Loaded prompt catalog");
        Ok(Self { templates })
    }

    /// Load a catalog from a JSON file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Cannot read prompt file {}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }

    /// Load from `path` when given, otherwise the built-in catalog.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_path(path),
            None => Self::builtin(),
        }
    }

    /// Number of templates.
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Whether the catalog holds no templates.
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Whether a template with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// Render template `name`, substituting `vars`.
    ///
    /// # Errors
    ///
    /// - [`AppError::PromptNotFound`] if no template has this name
    /// - [`AppError::Prompt`] if any placeholder is missing from `vars`; the
    ///   error lists every placeholder the template expects
    pub fn get(&self, name: &str, vars: &[(&str, String)]) -> Result<String> {
        let template = self.templates.get(name).ok_or_else(|| {
            error!(prompt = name, "Prompt is not found in the catalog");
            AppError::PromptNotFound(name.to_string())
        })?;

        let lookup: HashMap<&str, &str> = vars.iter().map(|(k, v)| (*k, v.as_str())).collect();

        render(template, &lookup).ok_or_else(|| {
            let variables = placeholders(template);
            error!(prompt = name, ?variables, "Prompt called with missing variables");
            AppError::Prompt {
                name: name.to_string(),
                variables,
            }
        })
    }

    /// Every template name with the placeholders it expects, sorted by name.
    pub fn describe(&self) -> Vec<(String, Vec<String>)> {
        self.templates
            .iter()
            .map(|(name, template)| (name.clone(), placeholders(template)))
            .collect()
    }
}

enum Token<'a> {
    Literal(&'a str),
    Placeholder(&'a str),
}

fn tokenize(template: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let bytes = template.as_bytes();
    let mut literal_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'{' if bytes.get(i + 1) == Some(&b'{') => {
                tokens.push(Token::Literal(&template[literal_start..i + 1]));
                i += 2;
                literal_start = i;
            }
            b'}' if bytes.get(i + 1) == Some(&b'}') => {
                tokens.push(Token::Literal(&template[literal_start..i + 1]));
                i += 2;
                literal_start = i;
            }
            b'{' => match template[i + 1..].find(['{', '}']) {
                Some(rel) if bytes[i + 1 + rel] == b'}' => {
                    tokens.push(Token::Literal(&template[literal_start..i]));
                    tokens.push(Token::Placeholder(&template[i + 1..i + 1 + rel]));
                    i += rel + 2;
                    literal_start = i;
                }
                _ => i += 1,
            },
            _ => i += 1,
        }
    }
    tokens.push(Token::Literal(&template[literal_start..]));
    tokens
}

fn render(template: &str, vars: &HashMap<&str, &str>) -> Option<String> {
    let mut out = String::with_capacity(template.len());
    for token in tokenize(template) {
        match token {
            Token::Literal(text) => out.push_str(text),
            Token::Placeholder(name) => out.push_str(vars.get(name)?),
        }
    }
    Some(out)
}

/// Placeholder names in order of first appearance.
pub fn placeholders(template: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for token in tokenize(template) {
        if let Token::Placeholder(name) = token {
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
    }
    names
}
