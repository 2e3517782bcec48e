//! The declared option model.
//!
//! A configuration object implements [`Configurable`] and describes its
//! options, its main parameter and its sub-commands through a
//! [`Declarator`]. Declaring resolves every option's handler and checks name
//! uniqueness, so a built [`OptionModel`] is consistent by construction and
//! immutable afterwards.
//!
//! # Examples
//!
//! ```
//! use optbind_core::*;
//!
//! struct Config {
//!     verbose: Slot<bool>,
//!     files: Slot<Vec<String>>,
//! }
//!
//! impl Configurable for Config {
//!     fn declare(&self, decl: &mut Declarator<'_>) -> Result<()> {
//!         decl.option(
//!             OptionSpec::new(&["--verbose", "-v"]).with_description("Talk more"),
//!             &self.verbose,
//!         )?;
//!         decl.option(
//!             OptionSpec::parameter().with_arg("FILE").unbounded(),
//!             &self.files,
//!         )?;
//!         Ok(())
//!     }
//! }
//!
//! let config = Config { verbose: Slot::default(), files: Slot::default() };
//! let mut parser = CmdlineParser::new();
//! parser.add_options(&config).unwrap();
//! parser.parse(["-v", "a.txt", "b.txt"]).unwrap();
//! assert!(config.verbose.get());
//! assert_eq!(config.files.get(), vec!["a.txt", "b.txt"]);
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::rc::Rc;

use crate::binding::Binding;
use crate::engine::Engine;
use crate::error::{CmdlineError, ErrorKind, Result};
use crate::i18n::{Message, MessageCatalog};
use crate::registry::{HandlerRegistry, HandlerRequest, OptionHandler};

/// Declaration of one option, or of the main parameter when `names` is
/// empty.
///
/// # Examples
///
/// ```
/// use optbind_core::OptionSpec;
///
/// let spec = OptionSpec::new(&["--define", "-D"])
///     .with_args(&["KEY", "VALUE"])
///     .unbounded();
/// assert_eq!(spec.args.len(), 2);
/// assert_eq!(spec.max_count, None);
///
/// let param = OptionSpec::parameter().with_arg("FILE").required();
/// assert!(param.is_parameter());
/// assert_eq!(param.min_count, 1);
/// ```
#[derive(Debug, Clone)]
pub struct OptionSpec {
    /// Tokens that select the option. Empty for the main parameter.
    pub names: Vec<String>,
    /// Text shown in usage.
    pub description: Option<String>,
    /// Argument labels; their number is the option's argument count.
    pub args: Vec<String>,
    /// Minimum number of occurrences.
    pub min_count: usize,
    /// Maximum number of occurrences; `None` is unbounded.
    pub max_count: Option<usize>,
    /// A match suppresses the validation pass.
    pub is_help: bool,
    /// Omitted from usage.
    pub hidden: bool,
    /// Options that must also be given when this one is.
    pub requires: Vec<String>,
    /// Options that must not be given together with this one.
    pub conflicts_with: Vec<String>,
    /// Explicitly requested handler.
    pub handler: Option<HandlerRequest>,
}

impl Default for OptionSpec {
    fn default() -> Self {
        Self {
            names: Vec::new(),
            description: None,
            args: Vec::new(),
            min_count: 0,
            max_count: Some(1),
            is_help: false,
            hidden: false,
            requires: Vec::new(),
            conflicts_with: Vec::new(),
            handler: None,
        }
    }
}

impl OptionSpec {
    /// Declares an option selected by any of `names`.
    pub fn new(names: &[&str]) -> Self {
        Self {
            names: names.iter().map(|n| n.to_string()).collect(),
            ..Self::default()
        }
    }

    /// Declares the main parameter.
    pub fn parameter() -> Self {
        Self::default()
    }

    /// Adds a description.
    pub fn with_description(mut self, desc: &str) -> Self {
        self.description = Some(desc.to_string());
        self
    }

    /// Appends one argument label.
    pub fn with_arg(mut self, label: &str) -> Self {
        self.args.push(label.to_string());
        self
    }

    /// Appends several argument labels.
    pub fn with_args(mut self, labels: &[&str]) -> Self {
        self.args.extend(labels.iter().map(|l| l.to_string()));
        self
    }

    /// Sets the minimum occurrence count.
    pub fn with_min_count(mut self, min: usize) -> Self {
        self.min_count = min;
        self
    }

    /// Sets the maximum occurrence count.
    pub fn with_max_count(mut self, max: usize) -> Self {
        self.max_count = Some(max);
        self
    }

    /// Removes the upper occurrence bound.
    pub fn unbounded(mut self) -> Self {
        self.max_count = None;
        self
    }

    /// Requires at least one occurrence.
    pub fn required(mut self) -> Self {
        self.min_count = self.min_count.max(1);
        self
    }

    /// Marks the option as a help request.
    pub fn help(mut self) -> Self {
        self.is_help = true;
        self
    }

    /// Hides the option from usage.
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Adds an option name that must also be given.
    pub fn with_requires(mut self, name: &str) -> Self {
        self.requires.push(name.to_string());
        self
    }

    /// Adds an option name that must not be given at the same time.
    pub fn with_conflict(mut self, name: &str) -> Self {
        self.conflicts_with.push(name.to_string());
        self
    }

    /// Requests handler type `H` instead of registry resolution.
    pub fn handler<H: OptionHandler + Default + 'static>(mut self) -> Self {
        self.handler = Some(HandlerRequest::of::<H>());
        self
    }

    /// Returns `true` for the main parameter.
    pub fn is_parameter(&self) -> bool {
        self.names.is_empty()
    }
}

/// A declared option bound to its slot and resolved handler.
pub struct OptionRecord {
    spec: OptionSpec,
    binding: Binding,
    handler: Rc<dyn OptionHandler>,
}

impl OptionRecord {
    pub fn names(&self) -> &[String] {
        &self.spec.names
    }

    pub fn args(&self) -> &[String] {
        &self.spec.args
    }

    pub fn arg_count(&self) -> usize {
        self.spec.args.len()
    }

    pub fn description(&self) -> Option<&str> {
        self.spec.description.as_deref()
    }

    pub fn min_count(&self) -> usize {
        self.spec.min_count
    }

    pub fn max_count(&self) -> Option<usize> {
        self.spec.max_count
    }

    pub fn is_help(&self) -> bool {
        self.spec.is_help
    }

    pub fn is_hidden(&self) -> bool {
        self.spec.hidden
    }

    pub fn requires(&self) -> &[String] {
        &self.spec.requires
    }

    pub fn conflicts_with(&self) -> &[String] {
        &self.spec.conflicts_with
    }

    pub fn is_parameter(&self) -> bool {
        self.spec.is_parameter()
    }

    /// First name of an option, or the space-joined argument labels of the
    /// parameter.
    pub fn display_name(&self) -> String {
        match self.spec.names.first() {
            Some(name) => name.clone(),
            None => self.spec.args.join(" "),
        }
    }

    /// Name of the resolved handler.
    pub fn handler_name(&self) -> &'static str {
        self.handler.name()
    }

    /// Whether `count` occurrences satisfy the declared bounds.
    pub fn accepts_count(&self, count: usize) -> bool {
        count >= self.spec.min_count && self.spec.max_count.is_none_or(|max| count <= max)
    }

    pub(crate) fn binding(&self) -> &Binding {
        &self.binding
    }

    pub(crate) fn handler(&self) -> &dyn OptionHandler {
        self.handler.as_ref()
    }
}

impl std::fmt::Debug for OptionRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptionRecord")
            .field("names", &self.spec.names)
            .field("args", &self.spec.args)
            .field("handler", &self.handler.name())
            .field("binding", &self.binding)
            .finish()
    }
}

/// Declaration of a sub-command, returned by [`Configurable::command`].
///
/// # Examples
///
/// ```
/// use optbind_core::CommandSpec;
///
/// let spec = CommandSpec::new(&["remote"])
///     .with_description("Manage remotes")
///     .with_default_command("list");
/// assert_eq!(spec.names, vec!["remote"]);
/// assert_eq!(spec.default_command.as_deref(), Some("list"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSpec {
    pub names: Vec<String>,
    pub description: Option<String>,
    pub hidden: bool,
    /// Nested command assumed when an unmatched token reaches this command.
    pub default_command: Option<String>,
}

impl CommandSpec {
    pub fn new(names: &[&str]) -> Self {
        Self {
            names: names.iter().map(|n| n.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, desc: &str) -> Self {
        self.description = Some(desc.to_string());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn with_default_command(mut self, name: &str) -> Self {
        self.default_command = Some(name.to_string());
        self
    }
}

/// A declared sub-command owning its nested engine.
pub struct CommandRecord {
    spec: CommandSpec,
    object: Rc<dyn Any>,
    engine: Engine,
}

impl CommandRecord {
    pub fn names(&self) -> &[String] {
        &self.spec.names
    }

    pub fn description(&self) -> Option<&str> {
        self.spec.description.as_deref()
    }

    pub fn is_hidden(&self) -> bool {
        self.spec.hidden
    }

    /// The command's own model.
    pub fn model(&self) -> &OptionModel {
        self.engine.model()
    }

    pub(crate) fn engine(&self) -> &Engine {
        &self.engine
    }

    pub(crate) fn object(&self) -> Rc<dyn Any> {
        Rc::clone(&self.object)
    }
}

impl std::fmt::Debug for CommandRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRecord")
            .field("names", &self.spec.names)
            .field("model", self.engine.model())
            .finish()
    }
}

#[derive(Debug, Clone, Copy)]
enum NameRef {
    Option(usize),
    Command(usize),
}

/// Options, parameter and commands of one configuration object graph.
#[derive(Debug, Default)]
pub struct OptionModel {
    options: Vec<OptionRecord>,
    parameter: Option<OptionRecord>,
    commands: Vec<CommandRecord>,
    names: HashMap<String, NameRef>,
}

impl OptionModel {
    /// Options in declaration order.
    pub fn options(&self) -> &[OptionRecord] {
        &self.options
    }

    pub fn parameter(&self) -> Option<&OptionRecord> {
        self.parameter.as_ref()
    }

    /// Commands in declaration order.
    pub fn commands(&self) -> &[CommandRecord] {
        &self.commands
    }

    /// Looks up an option by any of its names.
    pub fn option(&self, name: &str) -> Option<(usize, &OptionRecord)> {
        match self.names.get(name) {
            Some(NameRef::Option(idx)) => Some((*idx, &self.options[*idx])),
            _ => None,
        }
    }

    /// Looks up a command by any of its names.
    pub fn command(&self, name: &str) -> Option<(usize, &CommandRecord)> {
        match self.names.get(name) {
            Some(NameRef::Command(idx)) => Some((*idx, &self.commands[*idx])),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty() && self.parameter.is_none() && self.commands.is_empty()
    }

    fn claim_names(
        &mut self,
        names: &[String],
        target: NameRef,
        location: &str,
        catalog: &MessageCatalog,
    ) -> Result<()> {
        if let Some(name) = names.iter().find(|n| self.names.contains_key(*n)) {
            return Err(CmdlineError::new(
                ErrorKind::ModelInconsistency,
                Message::new("Duplicate command/option name \"{0}\" found in: {1}")
                    .arg(name)
                    .arg(location),
                catalog,
            ));
        }
        for name in names {
            self.names.insert(name.clone(), target);
        }
        Ok(())
    }
}

/// A configuration object that declares options.
pub trait Configurable {
    /// Declares this object's options, parameter and nested objects.
    fn declare(&self, decl: &mut Declarator<'_>) -> Result<()>;

    /// Returns the command declaration when this object is a sub-command.
    fn command(&self) -> Option<CommandSpec> {
        None
    }
}

/// How [`Declarator::delegate`] treats a nested object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DelegateMode {
    /// Flatten its options into the current model.
    #[default]
    Options,
    /// Add it as a sub-command.
    Command,
    /// Add it as a sub-command if it declares one, otherwise flatten it.
    CommandOrOptions,
}

/// Collects declarations into an [`OptionModel`].
pub struct Declarator<'a> {
    model: &'a mut OptionModel,
    registry: &'a HandlerRegistry,
    catalog: &'a MessageCatalog,
}

impl<'a> Declarator<'a> {
    pub(crate) fn new(
        model: &'a mut OptionModel,
        registry: &'a HandlerRegistry,
        catalog: &'a MessageCatalog,
    ) -> Self {
        Self {
            model,
            registry,
            catalog,
        }
    }

    fn inconsistency(&self, message: Message) -> CmdlineError {
        CmdlineError::new(ErrorKind::ModelInconsistency, message, self.catalog)
    }

    /// Declares an option writing to `target`. An empty name set declares
    /// the main parameter.
    pub fn option(&mut self, mut spec: OptionSpec, target: impl Into<Binding>) -> Result<()> {
        let binding = target.into();
        let location = format!("{} ({})", spec.names.join(","), binding.type_name());

        if spec.names.iter().any(String::is_empty) {
            return Err(self.inconsistency(
                Message::new("Empty option name found in: {0}").arg(&location),
            ));
        }

        if spec.is_parameter() && spec.args.is_empty() {
            return Err(self.inconsistency(Message::new(
                "Parameter definition must support at least one argument.",
            )));
        }

        let handler = self
            .registry
            .resolve(&binding, spec.args.len(), spec.handler.as_ref())
            .ok_or_else(|| {
                self.inconsistency(
                    Message::new("No suitable handler found for option(s): {0} ({1} argument(s))")
                        .arg(spec.names.join(","))
                        .arg(spec.args.len()),
                )
            })?;

        if spec.max_count == Some(0) {
            tracing::warn!(
                option = %location,
                "Option declared with max_count = 0 can never be given"
            );
        }

        if spec.is_parameter() {
            if let Some(first) = &self.model.parameter {
                return Err(self.inconsistency(
                    Message::new(
                        "More than one parameter definition found. First definition: {0} Second definition: {1}",
                    )
                    .arg(first.binding.type_name())
                    .arg(binding.type_name()),
                ));
            }
            if spec.is_help {
                tracing::warn!("Main parameter declared as help option; is_help is ignored");
                spec.is_help = false;
            }
            tracing::debug!(args = ?spec.args, handler = handler.name(), "Declared main parameter");
            self.model.parameter = Some(OptionRecord {
                spec,
                binding,
                handler,
            });
            return Ok(());
        }

        let idx = self.model.options.len();
        self.model
            .claim_names(&spec.names, NameRef::Option(idx), &location, self.catalog)?;
        tracing::debug!(names = ?spec.names, handler = handler.name(), "Declared option");
        self.model.options.push(OptionRecord {
            spec,
            binding,
            handler,
        });
        Ok(())
    }

    /// Flattens `delegate`'s declarations into the current model.
    pub fn embed<C: Configurable + ?Sized>(&mut self, delegate: &C) -> Result<()> {
        delegate.declare(self)
    }

    /// Adds `command` as a sub-command with its own nested model.
    pub fn command<C: Configurable + 'static>(&mut self, command: Rc<C>) -> Result<()> {
        let type_name = std::any::type_name::<C>();
        let spec = command
            .command()
            .filter(|spec| !spec.names.is_empty() && !spec.names.iter().any(String::is_empty))
            .ok_or_else(|| {
                self.inconsistency(
                    Message::new("Command found without required name in: {0}").arg(type_name),
                )
            })?;

        let mut nested = OptionModel::default();
        command.declare(&mut Declarator::new(&mut nested, self.registry, self.catalog))?;

        let idx = self.model.commands.len();
        let location = format!("{} ({type_name})", spec.names.join(","));
        self.model
            .claim_names(&spec.names, NameRef::Command(idx), &location, self.catalog)?;
        tracing::debug!(names = ?spec.names, "Declared command");

        let engine = Engine::new(nested, spec.default_command.clone());
        let object: Rc<dyn Any> = command;
        self.model.commands.push(CommandRecord {
            spec,
            object,
            engine,
        });
        Ok(())
    }

    /// Adds a nested object as options, as a command, or whichever it
    /// declares itself to be.
    pub fn delegate<C: Configurable + 'static>(&mut self, delegate: Rc<C>, mode: DelegateMode) -> Result<()> {
        match mode {
            DelegateMode::Options => self.embed(delegate.as_ref()),
            DelegateMode::Command => self.command(delegate),
            DelegateMode::CommandOrOptions if delegate.command().is_some() => self.command(delegate),
            DelegateMode::CommandOrOptions => self.embed(delegate.as_ref()),
        }
    }
}
