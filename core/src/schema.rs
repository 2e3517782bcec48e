//! Data-driven models.
//!
//! A [`ModelSchema`] describes options, a parameter and nested commands as
//! plain YAML or JSON. [`SchemaConfig`] turns it into a [`Configurable`]
//! that owns one slot per declared option and reports the bound values as
//! JSON.
//!
//! # Example YAML
//!
//! ```yaml
//! program: greet
//! options:
//!   - names: ["--name", "-n"]
//!     type: string
//!     default: world
//!   - names: ["--loud"]
//! commands:
//!   - names: ["repeat"]
//!     options:
//!       - names: ["--times"]
//!         type: number
//!         min_count: 1
//! ```
//!
//! # Examples
//!
//! ```
//! use std::rc::Rc;
//! use optbind_core::*;
//!
//! let schema = ModelSchema::from_yaml_str(r#"
//! options:
//!   - names: ["--name"]
//!     type: string
//!     default: world
//!   - names: ["--level"]
//!     type:
//!       choice: [low, high]
//! "#).unwrap();
//!
//! let config = Rc::new(SchemaConfig::new(&schema).unwrap());
//! let mut parser = CmdlineParser::new();
//! parser.add_object(&config).unwrap();
//! parser.parse(["--level", "high"]).unwrap();
//!
//! let values = config.values();
//! assert_eq!(values["name"], "world");
//! assert_eq!(values["level"], "high");
//! assert!(parser.parse(["--level", "max"]).is_err());
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::binding::{Binding, Callback, Slot};
use crate::error::{CmdlineError, ErrorKind, HandlerError, Result};
use crate::i18n::{Message, MessageCatalog};
use crate::model::{CommandSpec, Configurable, Declarator, OptionSpec};
use crate::settings::SettingsError;

/// Kind of value an option stores.
///
/// # Examples
///
/// ```
/// use optbind_core::ValueType;
///
/// let vt: ValueType = serde_yaml::from_str("number").unwrap();
/// assert_eq!(vt, ValueType::Number);
/// let vt: ValueType = serde_yaml::from_str("choice: [a, b]").unwrap();
/// assert_eq!(vt, ValueType::Choice(vec!["a".into(), "b".into()]));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    /// Switch without arguments.
    Flag,
    /// `on/off`, `true/false`, `1/0`.
    Bool,
    String,
    /// Signed integer.
    Number,
    Float,
    Path,
    /// Every argument of every occurrence.
    List,
    /// Key/value pairs.
    Map,
    /// One of a fixed set of words.
    Choice(Vec<String>),
}

impl ValueType {
    /// Argument labels used when an option declares none.
    fn default_args(&self) -> &'static [&'static str] {
        match self {
            Self::Flag => &[],
            Self::Map => &["KEY", "VALUE"],
            _ => &["VALUE"],
        }
    }
}

fn default_max_count() -> i64 {
    1
}

/// One option, or the parameter, of a [`ModelSchema`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptionSchema {
    pub names: Vec<String>,
    /// Key in the reported values; derived from the names when absent.
    pub key: Option<String>,
    pub args: Vec<String>,
    pub description: Option<String>,
    pub min_count: usize,
    /// Maximum occurrences; negative means unbounded.
    #[serde(default = "default_max_count")]
    pub max_count: i64,
    /// Inferred from the argument count when absent.
    #[serde(rename = "type")]
    pub value_type: Option<ValueType>,
    pub default: Option<Value>,
    pub is_help: bool,
    pub hidden: bool,
    pub requires: Vec<String>,
    pub conflicts_with: Vec<String>,
}

impl Default for OptionSchema {
    fn default() -> Self {
        Self {
            names: Vec::new(),
            key: None,
            args: Vec::new(),
            description: None,
            min_count: 0,
            max_count: default_max_count(),
            value_type: None,
            default: None,
            is_help: false,
            hidden: false,
            requires: Vec::new(),
            conflicts_with: Vec::new(),
        }
    }
}

impl OptionSchema {
    /// The declared type, or one inferred from the argument count.
    pub fn resolved_type(&self) -> ValueType {
        if let Some(value_type) = &self.value_type {
            return value_type.clone();
        }
        match (self.names.is_empty(), self.args.len()) {
            (true, _) => ValueType::List,
            (false, 0) => ValueType::Flag,
            (false, 1) => ValueType::String,
            (false, 2) => ValueType::Map,
            (false, _) => ValueType::List,
        }
    }

    /// The key under which the value is reported.
    pub fn resolved_key(&self) -> String {
        if let Some(key) = &self.key {
            return key.clone();
        }
        self.names
            .iter()
            .max_by_key(|name| name.len())
            .map(|name| name.trim_start_matches(|c: char| !c.is_alphanumeric()).to_string())
            .unwrap_or_else(|| "parameter".to_string())
    }

    fn to_spec(&self, value_type: &ValueType) -> OptionSpec {
        let args: Vec<&str> = if self.args.is_empty() {
            value_type.default_args().to_vec()
        } else {
            self.args.iter().map(String::as_str).collect()
        };
        let names: Vec<&str> = self.names.iter().map(String::as_str).collect();
        let mut spec = OptionSpec::new(&names)
            .with_args(&args)
            .with_min_count(self.min_count);
        spec.max_count = usize::try_from(self.max_count).ok();
        spec.description = self.description.clone();
        spec.is_help = self.is_help;
        spec.hidden = self.hidden;
        spec.requires = self.requires.clone();
        spec.conflicts_with = self.conflicts_with.clone();
        spec
    }
}

/// A sub-command of a [`ModelSchema`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandSchema {
    pub names: Vec<String>,
    pub description: Option<String>,
    pub hidden: bool,
    pub default_command: Option<String>,
    pub options: Vec<OptionSchema>,
    pub parameter: Option<OptionSchema>,
    pub commands: Vec<CommandSchema>,
}

/// A whole command-line model as data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSchema {
    pub program: Option<String>,
    pub about: Option<String>,
    pub default_command: Option<String>,
    pub options: Vec<OptionSchema>,
    pub parameter: Option<OptionSchema>,
    pub commands: Vec<CommandSchema>,
}

impl ModelSchema {
    /// Loads a schema; `.json` files are read as JSON, everything else as
    /// YAML.
    pub fn load(path: impl AsRef<Path>) -> std::result::Result<Self, SettingsError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        if path.extension().is_some_and(|ext| ext == "json") {
            Self::from_json_str(&raw)
        } else {
            Self::from_yaml_str(&raw)
        }
    }

    pub fn from_yaml_str(raw: &str) -> std::result::Result<Self, SettingsError> {
        Ok(serde_yaml::from_str(raw)?)
    }

    pub fn from_json_str(raw: &str) -> std::result::Result<Self, SettingsError> {
        Ok(serde_json::from_str(raw)?)
    }
}

#[derive(Debug, Clone)]
enum ValueSlot {
    Flag(Slot<bool>),
    Bool(Slot<Option<bool>>),
    String(Slot<Option<String>>),
    Number(Slot<Option<i64>>),
    Float(Slot<Option<f64>>),
    Path(Slot<Option<PathBuf>>),
    List(Slot<Vec<String>>),
    Map(Slot<BTreeMap<String, String>>),
    Choice(Slot<Option<String>>, Rc<[String]>),
}

impl ValueSlot {
    fn new(value_type: &ValueType) -> Self {
        match value_type {
            ValueType::Flag => Self::Flag(Slot::default()),
            ValueType::Bool => Self::Bool(Slot::default()),
            ValueType::String => Self::String(Slot::default()),
            ValueType::Number => Self::Number(Slot::default()),
            ValueType::Float => Self::Float(Slot::default()),
            ValueType::Path => Self::Path(Slot::default()),
            ValueType::List => Self::List(Slot::default()),
            ValueType::Map => Self::Map(Slot::default()),
            ValueType::Choice(allowed) => Self::Choice(Slot::default(), allowed.as_slice().into()),
        }
    }

    /// Stores a default; `false` when the JSON value does not fit.
    fn seed(&self, value: &Value) -> bool {
        match (self, value) {
            (Self::Flag(slot), Value::Bool(b)) => slot.set(*b),
            (Self::Bool(slot), Value::Bool(b)) => slot.set(Some(*b)),
            (Self::String(slot), Value::String(s)) => slot.set(Some(s.clone())),
            (Self::Number(slot), Value::Number(n)) if n.is_i64() => slot.set(n.as_i64()),
            (Self::Float(slot), Value::Number(n)) => slot.set(n.as_f64()),
            (Self::Path(slot), Value::String(s)) => slot.set(Some(PathBuf::from(s))),
            (Self::Choice(slot, allowed), Value::String(s)) if allowed.contains(s) => {
                slot.set(Some(s.clone()))
            }
            (Self::List(slot), Value::Array(items)) => {
                let Some(items) = items
                    .iter()
                    .map(|v| v.as_str().map(str::to_string))
                    .collect::<Option<Vec<_>>>()
                else {
                    return false;
                };
                slot.set(items);
            }
            (Self::Map(slot), Value::Object(entries)) => {
                let Some(entries) = entries
                    .iter()
                    .map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                    .collect::<Option<BTreeMap<_, _>>>()
                else {
                    return false;
                };
                slot.set(entries);
            }
            _ => return false,
        }
        true
    }

    fn binding(&self) -> Binding {
        match self {
            Self::Flag(slot) => Binding::of(slot),
            Self::Bool(slot) => Binding::of(slot),
            Self::String(slot) => Binding::of(slot),
            Self::Number(slot) => Binding::of(slot),
            Self::Float(slot) => Binding::of(slot),
            Self::Path(slot) => Binding::of(slot),
            Self::List(slot) => Binding::of(slot),
            Self::Map(slot) => Binding::of(slot),
            Self::Choice(slot, allowed) => Binding::callback(choice_callback(slot.clone(), Rc::clone(allowed))),
        }
    }

    fn to_json(&self) -> Value {
        match self {
            Self::Flag(slot) => Value::Bool(slot.get()),
            Self::Bool(slot) => slot.get().map_or(Value::Null, Value::Bool),
            Self::String(slot) | Self::Choice(slot, _) => slot.get().map_or(Value::Null, Value::String),
            Self::Number(slot) => slot.get().map_or(Value::Null, Value::from),
            Self::Float(slot) => slot.get().map_or(Value::Null, Value::from),
            Self::Path(slot) => slot
                .get()
                .map_or(Value::Null, |p| Value::String(p.display().to_string())),
            Self::List(slot) => Value::from(slot.get()),
            Self::Map(slot) => Value::Object(
                slot.get()
                    .into_iter()
                    .map(|(k, v)| (k, Value::String(v)))
                    .collect(),
            ),
        }
    }
}

fn choice_callback(slot: Slot<Option<String>>, allowed: Rc<[String]>) -> Callback {
    let check = move |args: &[String]| -> std::result::Result<(), HandlerError> {
        match args.iter().find(|arg| !allowed.contains(arg)) {
            Some(bad) => Err(HandlerError::new(
                Message::new("Invalid value \"{0}\". Allowed values are: {1}")
                    .arg(bad)
                    .arg(allowed.join(", ")),
            )),
            None => Ok(()),
        }
    };
    let validator = check.clone();
    Callback::new(move |args| {
        check(args)?;
        if let Some(last) = args.last() {
            slot.set(Some(last.clone()));
        }
        Ok(())
    })
    .with_validator(validator)
}

#[derive(Debug)]
struct BoundOption {
    key: String,
    spec: OptionSpec,
    slot: ValueSlot,
}

impl BoundOption {
    fn new(schema: &OptionSchema) -> Result<Self> {
        let value_type = schema.resolved_type();
        let slot = ValueSlot::new(&value_type);
        if let Some(default) = &schema.default
            && !slot.seed(default)
        {
            return Err(CmdlineError::new(
                ErrorKind::ModelInconsistency,
                Message::new("Default value {0} of option \"{1}\" does not match its type {2}.")
                    .arg(default)
                    .arg(schema.resolved_key())
                    .arg(format!("{value_type:?}")),
                &MessageCatalog::default(),
            ));
        }
        Ok(Self {
            key: schema.resolved_key(),
            spec: schema.to_spec(&value_type),
            slot,
        })
    }
}

/// A [`Configurable`] built from a [`ModelSchema`] or [`CommandSchema`].
#[derive(Debug)]
pub struct SchemaConfig {
    command: Option<CommandSpec>,
    options: Vec<BoundOption>,
    commands: Vec<Rc<SchemaConfig>>,
}

impl SchemaConfig {
    /// Allocates slots for the top level of `schema` and seeds defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::ModelInconsistency`] when a default does not fit
    /// its option's type.
    pub fn new(schema: &ModelSchema) -> Result<Self> {
        Self::build(None, &schema.options, schema.parameter.as_ref(), &schema.commands)
    }

    fn from_command(schema: &CommandSchema) -> Result<Self> {
        let names: Vec<&str> = schema.names.iter().map(String::as_str).collect();
        let mut spec = CommandSpec::new(&names);
        spec.description = schema.description.clone();
        spec.hidden = schema.hidden;
        spec.default_command = schema.default_command.clone();
        Self::build(Some(spec), &schema.options, schema.parameter.as_ref(), &schema.commands)
    }

    fn build(
        command: Option<CommandSpec>,
        options: &[OptionSchema],
        parameter: Option<&OptionSchema>,
        commands: &[CommandSchema],
    ) -> Result<Self> {
        let options = options
            .iter()
            .chain(parameter)
            .map(BoundOption::new)
            .collect::<Result<Vec<_>>>()?;
        let commands = commands
            .iter()
            .map(|c| Self::from_command(c).map(Rc::new))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            command,
            options,
            commands,
        })
    }

    /// Current values of this level, keyed by option key.
    pub fn values(&self) -> Value {
        let map: Map<String, Value> = self
            .options
            .iter()
            .map(|o| (o.key.clone(), o.slot.to_json()))
            .collect();
        Value::Object(map)
    }

    /// Values of this level plus those of the commands along `path`, each
    /// nested under its first name.
    pub fn values_along(&self, path: &[String]) -> Value {
        let mut values = self.values();
        if let Some((head, tail)) = path.split_first()
            && let Some(command) = self.find_command(head)
            && let Some(key) = command.command.as_ref().and_then(|spec| spec.names.first())
            && let Value::Object(map) = &mut values
        {
            map.insert(key.clone(), command.values_along(tail));
        }
        values
    }

    fn find_command(&self, name: &str) -> Option<&Rc<SchemaConfig>> {
        self.commands.iter().find(|c| {
            c.command
                .as_ref()
                .is_some_and(|spec| spec.names.iter().any(|n| n == name))
        })
    }
}

impl Configurable for SchemaConfig {
    fn declare(&self, decl: &mut Declarator<'_>) -> Result<()> {
        for option in &self.options {
            decl.option(option.spec.clone(), option.slot.binding())?;
        }
        for command in &self.commands {
            decl.command(Rc::clone(command))?;
        }
        Ok(())
    }

    fn command(&self) -> Option<CommandSpec> {
        self.command.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::CmdlineParser;

    const SCHEMA: &str = r#"
program: tool
options:
  - names: ["--verbose", "-v"]
  - names: ["--define", "-D"]
    max_count: -1
  - names: ["--jobs", "-j"]
    type: number
    default: 4
parameter:
  args: ["FILE"]
  max_count: -1
commands:
  - names: ["serve", "s"]
    options:
      - names: ["--port"]
        type: number
        min_count: 1
      - names: ["--root"]
        type: path
"#;

    fn parser_for(schema: &ModelSchema) -> (CmdlineParser, Rc<SchemaConfig>) {
        let config = Rc::new(SchemaConfig::new(schema).unwrap());
        let mut parser = CmdlineParser::new();
        parser.add_object(&config).unwrap();
        (parser, config)
    }

    #[test]
    fn test_types_are_inferred_from_args() {
        let schema = ModelSchema::from_yaml_str(SCHEMA).unwrap();
        assert_eq!(schema.options[0].resolved_type(), ValueType::Flag);
        assert_eq!(schema.options[1].resolved_type(), ValueType::Flag);
        assert_eq!(schema.parameter.as_ref().unwrap().resolved_type(), ValueType::List);
        assert_eq!(schema.options[1].resolved_key(), "define");
    }

    #[test]
    fn test_values_reflect_parse() {
        let mut schema = ModelSchema::from_yaml_str(SCHEMA).unwrap();
        schema.options[1].args = vec!["KEY".to_string(), "VALUE".to_string()];
        let (mut parser, config) = parser_for(&schema);

        parser
            .parse(["-v", "-D", "a", "1", "-D", "b", "2", "x.txt", "y.txt"])
            .unwrap();
        let values = config.values();
        assert_eq!(values["verbose"], true);
        assert_eq!(values["define"]["b"], "2");
        assert_eq!(values["jobs"], 4);
        assert_eq!(values["parameter"], serde_json::json!(["x.txt", "y.txt"]));
    }

    #[test]
    fn test_values_along_command_path() {
        let schema = ModelSchema::from_yaml_str(SCHEMA).unwrap();
        let (mut parser, config) = parser_for(&schema);

        let outcome = parser.parse(["s", "--port", "8080", "--root", "/srv"]).unwrap();
        assert_eq!(outcome.command_path, vec!["s"]);
        let values = config.values_along(&outcome.command_path);
        assert_eq!(values["serve"]["port"], 8080);
        assert_eq!(values["serve"]["root"], "/srv");
        assert_eq!(values["jobs"], 4);
    }

    #[test]
    fn test_command_requirements_are_enforced() {
        let schema = ModelSchema::from_yaml_str(SCHEMA).unwrap();
        let (mut parser, _config) = parser_for(&schema);
        let err = parser.parse(["serve"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CardinalityViolation);
    }

    #[test]
    fn test_bad_default_is_rejected() {
        let schema = ModelSchema::from_json_str(
            r#"{"options": [{"names": ["--jobs"], "type": "number", "default": "many"}]}"#,
        )
        .unwrap();
        let err = SchemaConfig::new(&schema).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ModelInconsistency);
    }

    #[test]
    fn test_invalid_choice_fails_before_any_write() {
        let schema = ModelSchema::from_yaml_str(
            r#"
options:
  - names: ["--name"]
    type: string
  - names: ["--mode"]
    type:
      choice: [fast, safe]
"#,
        )
        .unwrap();
        let (mut parser, config) = parser_for(&schema);
        let err = parser.parse(["--name", "x", "--mode", "turbo"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::HandlerApplicationFailure);
        assert_eq!(
            err.to_string(),
            "Invalid value \"turbo\". Allowed values are: fast, safe"
        );
        assert_eq!(config.values()["name"], Value::Null);
    }

    #[test]
    fn test_load_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        std::fs::write(&path, r#"{"program": "x", "options": [{"names": ["-q"]}]}"#).unwrap();
        let schema = ModelSchema::load(&path).unwrap();
        assert_eq!(schema.program.as_deref(), Some("x"));
        assert_eq!(schema.options[0].max_count, 1);
    }
}
