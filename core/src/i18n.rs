//! Prepared messages and translation catalogs.
//!
//! Every error raised by the engine is built from a [`Message`]: a template
//! with positional `{0}`, `{1}`, ... placeholders plus its arguments. The
//! template rendered as-is is the technical message; the template looked up
//! in a [`MessageCatalog`] first is the localized one.
//!
//! # Example YAML
//!
//! ```yaml
//! locale: de
//! messages:
//!   "Unsupported option or parameter found: {0}": "Nicht unterstützte Option oder Parameter: {0}"
//!   "at least {0}": "mindestens {0}"
//! ```

use std::collections::BTreeMap;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::settings::SettingsError;

/// A single message argument, either plain text or another prepared message
/// that gets translated along with its parent.
#[derive(Debug, Clone, PartialEq, Eq)]
enum MessageArg {
    Text(String),
    Nested(Message),
}

/// A message template with positional arguments, not yet rendered.
///
/// # Examples
///
/// ```
/// use optbind_core::{Message, MessageCatalog};
///
/// let msg = Message::new("Option \"{0}\" was given {1} times").arg("--name").arg(2);
/// assert_eq!(msg.render(), "Option \"--name\" was given 2 times");
///
/// let mut catalog = MessageCatalog::default();
/// catalog.insert("Option \"{0}\" was given {1} times", "Option \"{0}\" wurde {1} mal angegeben");
/// assert_eq!(msg.translate(&catalog), "Option \"--name\" wurde 2 mal angegeben");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    template: String,
    args: Vec<MessageArg>,
}

impl Message {
    /// Creates a message from a template.
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            args: Vec::new(),
        }
    }

    /// Appends a plain-text argument.
    pub fn arg(mut self, value: impl ToString) -> Self {
        self.args.push(MessageArg::Text(value.to_string()));
        self
    }

    /// Appends a nested message argument.
    pub fn arg_message(mut self, message: Message) -> Self {
        self.args.push(MessageArg::Nested(message));
        self
    }

    /// The untranslated template.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Renders the technical (untranslated) text.
    pub fn render(&self) -> String {
        let args: Vec<String> = self
            .args
            .iter()
            .map(|arg| match arg {
                MessageArg::Text(text) => text.clone(),
                MessageArg::Nested(message) => message.render(),
            })
            .collect();
        substitute(&self.template, &args)
    }

    /// Renders the localized text, falling back to the template when the
    /// catalog has no entry for it.
    pub fn translate(&self, catalog: &MessageCatalog) -> String {
        let template = catalog.lookup(&self.template).unwrap_or(&self.template);
        let args: Vec<String> = self
            .args
            .iter()
            .map(|arg| match arg {
                MessageArg::Text(text) => text.clone(),
                MessageArg::Nested(message) => message.translate(catalog),
            })
            .collect();
        substitute(template, &args)
    }
}

/// Single-pass placeholder substitution. Unknown indices and unbalanced braces
/// are copied through verbatim, and substituted text is never rescanned.
fn substitute(template: &str, args: &[String]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let digits = after.chars().take_while(char::is_ascii_digit).count();
        let closed = digits > 0 && after[digits..].starts_with('}');
        let index = if closed {
            after[..digits].parse::<usize>().ok()
        } else {
            None
        };

        match index.and_then(|i| args.get(i)) {
            Some(value) => {
                out.push_str(value);
                rest = &after[digits + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Translations keyed by message template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageCatalog {
    /// Informational locale tag (e.g. `"de"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    /// Template → translated template.
    #[serde(default)]
    pub messages: BTreeMap<String, String>,
}

impl MessageCatalog {
    /// Adds or replaces a translation.
    pub fn insert(&mut self, template: impl Into<String>, translation: impl Into<String>) {
        self.messages.insert(template.into(), translation.into());
    }

    /// Looks up the translation of a template.
    pub fn lookup(&self, template: &str) -> Option<&str> {
        self.messages.get(template).map(String::as_str)
    }

    /// Returns `true` when no translations are present.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Loads a catalog from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Io`] if the file cannot be read, or
    /// [`SettingsError::Yaml`] if it is not a valid catalog.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let file = std::fs::File::open(path)?;
        let catalog = serde_yaml::from_reader(BufReader::new(file))?;
        Ok(catalog)
    }

    /// Parses a catalog from YAML text.
    pub fn from_yaml_str(raw: &str) -> Result<Self, SettingsError> {
        Ok(serde_yaml::from_str(raw)?)
    }
}
