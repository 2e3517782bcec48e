//! The parser facade.

use std::rc::Rc;

use crate::argfile;
use crate::engine::{Engine, ParseContext, ParseMode};
use crate::error::{CmdlineError, ErrorKind, Result};
use crate::i18n::MessageCatalog;
use crate::model::{Configurable, Declarator, OptionModel};
use crate::registry::{HandlerRegistry, OptionHandler};
use crate::settings::{ParserSettings, normalize_prefix};
use crate::usage::UsageModel;
use crate::validate::validate_model;

/// Result of a successful parse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseOutcome {
    /// A help option was matched somewhere in the command chain.
    pub help_requested: bool,
    /// Matched command names, outermost first. Always empty for a dry run.
    pub command_path: Vec<String>,
}

/// Binds command-line tokens to configuration objects.
///
/// # Examples
///
/// ```
/// use std::rc::Rc;
/// use optbind_core::*;
///
/// struct Build {
///     release: Slot<bool>,
/// }
///
/// impl Configurable for Build {
///     fn declare(&self, decl: &mut Declarator<'_>) -> Result<()> {
///         decl.option(OptionSpec::new(&["--release"]), &self.release)
///     }
///
///     fn command(&self) -> Option<CommandSpec> {
///         Some(CommandSpec::new(&["build"]).with_description("Compile the project"))
///     }
/// }
///
/// struct Global {
///     help: Slot<bool>,
/// }
///
/// impl Configurable for Global {
///     fn declare(&self, decl: &mut Declarator<'_>) -> Result<()> {
///         decl.option(OptionSpec::new(&["--help", "-h"]).help(), &self.help)
///     }
/// }
///
/// let global = Rc::new(Global { help: Slot::default() });
/// let build = Rc::new(Build { release: Slot::default() });
///
/// let mut parser = CmdlineParser::new();
/// parser.set_program_name("mk");
/// parser.add_object(&global).unwrap();
/// parser.add_object(&build).unwrap();
///
/// let outcome = parser.parse(["build", "--release"]).unwrap();
/// assert_eq!(outcome.command_path, vec!["build"]);
/// assert!(build.release.get());
/// assert!(parser.parsed_command::<Build>().is_some());
/// ```
pub struct CmdlineParser {
    registry: HandlerRegistry,
    settings: ParserSettings,
    catalog: MessageCatalog,
    engine: Engine,
    debug_mode: bool,
}

impl Default for CmdlineParser {
    fn default() -> Self {
        Self::new()
    }
}

impl CmdlineParser {
    /// Creates a parser with the built-in handlers and default settings.
    pub fn new() -> Self {
        Self::with_registry(HandlerRegistry::with_defaults())
    }

    /// Creates a parser with the built-in handlers and the given settings.
    pub fn with_settings(settings: ParserSettings) -> Self {
        let mut parser = Self::new();
        parser.apply_settings(settings);
        parser
    }

    /// Creates a parser resolving handlers from `registry`.
    pub fn with_registry(registry: HandlerRegistry) -> Self {
        Self {
            registry,
            settings: ParserSettings::default(),
            catalog: MessageCatalog::default(),
            engine: Engine::new(OptionModel::default(), None),
            debug_mode: false,
        }
    }

    /// Replaces all settings.
    pub fn apply_settings(&mut self, settings: ParserSettings) {
        self.settings = settings.normalized();
        self.engine
            .set_default_command(self.settings.default_command.clone());
    }

    pub fn settings(&self) -> &ParserSettings {
        &self.settings
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// The top-level model.
    pub fn model(&self) -> &OptionModel {
        self.engine.model()
    }

    /// Adds a configuration object: as a command when it declares one,
    /// otherwise as top-level options.
    ///
    /// # Errors
    ///
    /// Returns a [`ErrorKind::ModelInconsistency`] error for duplicate
    /// names, a second parameter, or an option without a suitable handler.
    pub fn add_object<C: Configurable + 'static>(&mut self, object: &Rc<C>) -> Result<()> {
        let mut decl = Declarator::new(self.engine.model_mut(), &self.registry, &self.catalog);
        if object.command().is_some() {
            decl.command(Rc::clone(object))
        } else {
            decl.embed(object.as_ref())
        }
    }

    /// Adds a configuration object's options to the top-level model.
    pub fn add_options<C: Configurable + ?Sized>(&mut self, object: &C) -> Result<()> {
        let mut decl = Declarator::new(self.engine.model_mut(), &self.registry, &self.catalog);
        decl.embed(object)
    }

    /// Registers a handler. Only affects objects added afterwards.
    pub fn register_handler<H: OptionHandler + 'static>(&mut self, handler: H) {
        self.registry.register(handler);
    }

    pub fn unregister_handler<H: OptionHandler + 'static>(&mut self) {
        self.registry.unregister::<H>();
    }

    pub fn unregister_all_handlers(&mut self) {
        self.registry.unregister_all();
    }

    pub fn set_program_name(&mut self, name: &str) {
        self.settings.program_name = Some(name.to_string());
    }

    pub fn set_about_line(&mut self, about: &str) {
        self.settings.about_line = Some(about.to_string());
    }

    /// Sets the command assumed for the first token nothing else accepts.
    /// `None` or an empty name disables it.
    pub fn set_default_command(&mut self, name: Option<&str>) {
        self.settings.default_command = name.filter(|n| !n.is_empty()).map(str::to_string);
        self.engine
            .set_default_command(self.settings.default_command.clone());
    }

    /// Sets the argument-file prefix. `None` or a blank prefix disables
    /// argument files.
    pub fn set_args_file_prefix(&mut self, prefix: Option<&str>) {
        self.settings.args_file_prefix = normalize_prefix(prefix);
    }

    /// Sets the prefix for aggregated single-letter options. `None` or a
    /// blank prefix disables aggregation.
    pub fn set_aggregate_short_options_prefix(&mut self, prefix: Option<&str>) {
        self.settings.aggregate_short_options_prefix = normalize_prefix(prefix);
    }

    pub fn set_stop_options_after_parameter(&mut self, stop: bool) {
        self.settings.stop_options_after_parameter = stop;
    }

    pub fn set_debug_allowed(&mut self, allowed: bool) {
        self.settings.debug_allowed = allowed;
    }

    pub fn set_debug_mode(&mut self, debug: bool) {
        self.debug_mode = debug;
    }

    /// Whether debug tracing is on, either set here or switched on by the
    /// debug token during a parse.
    pub fn debug_mode(&self) -> bool {
        self.debug_mode
    }

    pub fn set_message_catalog(&mut self, catalog: MessageCatalog) {
        self.catalog = catalog;
    }

    /// Parses and applies `tokens`.
    pub fn parse<I, S>(&mut self, tokens: I) -> Result<ParseOutcome>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parse_with(tokens, ParseMode::default())
    }

    /// Checks `tokens` without applying anything.
    pub fn check<I, S>(&mut self, tokens: I) -> Result<ParseOutcome>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parse_with(
            tokens,
            ParseMode {
                dry_run: true,
                ..ParseMode::default()
            },
        )
    }

    /// Parses `tokens` under an explicit [`ParseMode`].
    pub fn parse_with<I, S>(&mut self, tokens: I, mode: ParseMode) -> Result<ParseOutcome>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tokens: Vec<String> = tokens.into_iter().map(Into::into).collect();
        tracing::debug!(tokens = tokens.len(), dry_run = mode.dry_run, "Parsing command line");

        let ctx = ParseContext::new(&self.settings, &self.catalog, self.debug_mode);
        let result = match self.settings.args_file_prefix.as_deref() {
            Some(prefix) => argfile::expand(tokens, prefix, &ctx),
            None => Ok(tokens),
        }
        .and_then(|tokens| self.engine.parse(&tokens, &ctx, mode));
        self.debug_mode = ctx.debug.get();

        let help_requested = result?;
        let command_path = if mode.dry_run {
            Vec::new()
        } else {
            self.engine.command_path()
        };
        Ok(ParseOutcome {
            help_requested,
            command_path,
        })
    }

    /// Runs the static consistency check over the whole command tree and
    /// reports the first issue.
    pub fn validate(&self) -> Result<()> {
        match validate_model(self.engine.model()).into_iter().next() {
            Some(issue) => Err(CmdlineError::new(
                ErrorKind::ModelInconsistency,
                issue.message(),
                &self.catalog,
            )),
            None => Ok(()),
        }
    }

    /// Name under which the top-level command was matched by the last parse.
    pub fn parsed_command_name(&self) -> Option<String> {
        self.engine.parsed_command().map(|(_, name)| name)
    }

    /// The object of the top-level command matched by the last parse.
    pub fn parsed_command<T: 'static>(&self) -> Option<Rc<T>> {
        let (record, _) = self.engine.parsed_command()?;
        record.object().downcast::<T>().ok()
    }

    /// Matched command names of the last parse, outermost first.
    pub fn parsed_command_path(&self) -> Vec<String> {
        self.engine.command_path()
    }

    /// Usage snapshot of the top level.
    pub fn usage_model(&self) -> UsageModel {
        UsageModel::new(
            self.engine.model(),
            self.settings.program_name.clone(),
            self.settings.about_line.clone(),
        )
    }

    /// Usage snapshot of a top-level command, named `"<program> <command>"`.
    pub fn command_usage_model(&self, name: &str) -> Option<UsageModel> {
        let (_, command) = self.engine.model().command(name)?;
        let program_name = match &self.settings.program_name {
            Some(program) => format!("{program} {name}"),
            None => name.to_string(),
        };
        Some(UsageModel::new(
            command.model(),
            Some(program_name),
            command.description().map(str::to_string),
        ))
    }
}

impl std::fmt::Debug for CmdlineParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CmdlineParser")
            .field("settings", &self.settings)
            .field("registry", &self.registry)
            .field("model", self.engine.model())
            .finish()
    }
}
