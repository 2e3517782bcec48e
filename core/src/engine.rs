//! Token dispatch.
//!
//! One [`Engine`] exists per node of the command tree. A real parse first
//! replays the same tokens as a dry run, which only checks arguments through
//! [`OptionHandler::check`](crate::OptionHandler::check), so any failure
//! surfaces before the first write to a configuration slot.

use std::cell::{Cell, RefCell};

use crate::error::{CmdlineError, ErrorKind, Result};
use crate::i18n::{Message, MessageCatalog};
use crate::model::{CommandRecord, OptionModel, OptionRecord};
use crate::settings::ParserSettings;
use crate::validate;

/// Emits a parse trace event; promoted to `info` on the `optbind::debug`
/// target while debug mode is on.
macro_rules! trace_parse {
    ($ctx:expr, $($arg:tt)+) => {
        if $ctx.debug.get() {
            tracing::info!(target: "optbind::debug", $($arg)+);
        } else {
            tracing::debug!($($arg)+);
        }
    };
}
pub(crate) use trace_parse;

/// Flags controlling one parse call.
///
/// # Examples
///
/// ```
/// use optbind_core::ParseMode;
///
/// let mode = ParseMode::default();
/// assert!(!mode.dry_run);
/// assert!(mode.skip_validation_on_help);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseMode {
    /// Check only; never write to configuration slots.
    pub dry_run: bool,
    /// Skip the validation pass of an engine that matched a help option.
    pub skip_validation_on_help: bool,
}

impl Default for ParseMode {
    fn default() -> Self {
        Self {
            dry_run: false,
            skip_validation_on_help: true,
        }
    }
}

impl ParseMode {
    fn as_dry_run(self) -> Self {
        Self {
            dry_run: true,
            ..self
        }
    }
}

/// Tree-wide state shared by every engine during one parse call.
pub(crate) struct ParseContext<'a> {
    pub settings: &'a ParserSettings,
    pub catalog: &'a MessageCatalog,
    pub debug: Cell<bool>,
}

impl<'a> ParseContext<'a> {
    pub fn new(settings: &'a ParserSettings, catalog: &'a MessageCatalog, debug: bool) -> Self {
        Self {
            settings,
            catalog,
            debug: Cell::new(debug),
        }
    }

    pub fn error(&self, kind: ErrorKind, message: Message) -> CmdlineError {
        CmdlineError::new(kind, message, self.catalog)
    }
}

/// Working state of one engine's dispatch loop.
#[derive(Debug)]
pub(crate) struct ParseSession {
    /// Occurrences per option, indexed like [`OptionModel::options`].
    pub counts: Vec<usize>,
    pub parameter_count: usize,
    pub parameter_args: Vec<String>,
    pub parsing_options: bool,
    pub help_detected: bool,
}

impl ParseSession {
    fn new(model: &OptionModel) -> Self {
        Self {
            counts: vec![0; model.options().len()],
            parameter_count: 0,
            parameter_args: Vec::new(),
            parsing_options: true,
            help_detected: false,
        }
    }
}

/// Parser for one node of the command tree.
#[derive(Debug)]
pub(crate) struct Engine {
    model: OptionModel,
    default_command: Option<String>,
    /// Index and matched name of the command taken by the last real run.
    parsed_command: RefCell<Option<(usize, String)>>,
}

impl Engine {
    pub fn new(model: OptionModel, default_command: Option<String>) -> Self {
        Self {
            model,
            default_command,
            parsed_command: RefCell::new(None),
        }
    }

    pub fn model(&self) -> &OptionModel {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut OptionModel {
        &mut self.model
    }

    pub fn set_default_command(&mut self, name: Option<String>) {
        self.default_command = name;
    }

    /// The command record and matched name of the last real run.
    pub fn parsed_command(&self) -> Option<(&CommandRecord, String)> {
        let parsed = self.parsed_command.borrow();
        let (idx, name) = parsed.as_ref()?;
        Some((self.model.commands().get(*idx)?, name.clone()))
    }

    /// Names matched along the command chain of the last real run.
    pub fn command_path(&self) -> Vec<String> {
        let mut path = Vec::new();
        let mut engine = self;
        while let Some((record, name)) = engine.parsed_command() {
            path.push(name);
            engine = record.engine();
        }
        path
    }

    /// Parses `tokens` against this engine's model. Returns whether a help
    /// option was matched here or in a delegated command.
    pub fn parse(&self, tokens: &[String], ctx: &ParseContext<'_>, mode: ParseMode) -> Result<bool> {
        if let Some(name) = &self.default_command
            && self.model.command(name).is_none()
        {
            return Err(ctx.error(
                ErrorKind::UnknownDefaultCommand,
                Message::new("Default command \"{0}\" is not a known command.").arg(name),
            ));
        }

        if mode.dry_run {
            if let Some(issue) = validate::check_model(&self.model).into_iter().next() {
                return Err(ctx.error(ErrorKind::ModelInconsistency, issue.message()));
            }
        } else {
            *self.parsed_command.borrow_mut() = None;
            trace_parse!(ctx, tokens = tokens.len(), "Checking command line before applying it");
            self.parse(tokens, ctx, mode.as_dry_run())?;
        }

        let mut session = ParseSession::new(&self.model);
        let help_in_command = self.dispatch(tokens, ctx, mode, &mut session)?;

        if let Some(parameter) = self.model.parameter()
            && !session.parameter_args.is_empty()
        {
            let name = parameter.display_name();
            trace_parse!(ctx, args = ?session.parameter_args, dry_run = mode.dry_run, "Applying main parameter");
            self.invoke(parameter, &session.parameter_args, &name, ctx, mode)?;
        }

        if mode.skip_validation_on_help && session.help_detected {
            trace_parse!(ctx, "Help requested, skipping validation");
        } else {
            validate::check_occurrences(&self.model, &session, ctx)?;
        }

        Ok(session.help_detected || help_in_command)
    }

    /// The dispatch loop. Returns the help flag of a delegated command.
    fn dispatch(
        &self,
        tokens: &[String],
        ctx: &ParseContext<'_>,
        mode: ParseMode,
        session: &mut ParseSession,
    ) -> Result<bool> {
        let settings = ctx.settings;
        let mut window = tokens.to_vec();
        let mut index = 0;

        while index < window.len() {
            let token = window[index].as_str();

            if session.parsing_options && token == settings.stop_token {
                trace_parse!(ctx, token, "Stop token found, disabling option parsing");
                session.parsing_options = false;
                index += 1;
                continue;
            }

            if settings.debug_allowed && settings.debug_token.as_deref() == Some(token) {
                if !ctx.debug.replace(true) {
                    trace_parse!(ctx, "Enabled debug mode");
                }
                index += 1;
                continue;
            }

            if session.parsing_options {
                if let Some((idx, option)) = self.model.option(token) {
                    session.counts[idx] += 1;
                    if option.is_help() {
                        trace_parse!(ctx, token, "Detected a help request");
                        session.help_detected = true;
                    }
                    let wanted = option.arg_count();
                    let given = window.len() - index - 1;
                    if given < wanted {
                        return Err(missing_option_arguments(ctx, option, token, given));
                    }
                    let args = &window[index + 1..index + 1 + wanted];
                    trace_parse!(ctx, option = token, ?args, dry_run = mode.dry_run, "Matched option");
                    self.invoke(option, args, token, ctx, mode)?;
                    index += 1 + wanted;
                    continue;
                }

                if let Some((idx, command)) = self.model.command(token) {
                    return self.delegate(idx, command, token, &window[index + 1..], ctx, mode);
                }

                if let Some(prefix) = settings.aggregate_short_options_prefix.as_deref()
                    && let Some(rewritten) = self.expand_aggregate(&window, index, prefix, ctx)?
                {
                    trace_parse!(ctx, token, ?rewritten, "Rewrote aggregated short options");
                    window = rewritten;
                    index = 0;
                    continue;
                }
            }

            if self.model.parameter().is_none()
                && let Some(name) = &self.default_command
                && let Some((idx, command)) = self.model.command(name)
            {
                trace_parse!(ctx, token, command = %name, "Unmatched token, assuming default command");
                return self.delegate(idx, command, name, &window[index..], ctx, mode);
            }

            if let Some(parameter) = self.model.parameter() {
                session.parameter_count += 1;
                if settings.stop_options_after_parameter && session.parsing_options {
                    trace_parse!(ctx, token, "Parameter found, disabling option parsing");
                    session.parsing_options = false;
                }
                let wanted = parameter.arg_count();
                let given = window.len() - index;
                if given < wanted {
                    return Err(ctx.error(
                        ErrorKind::MissingArguments,
                        Message::new(
                            "Missing arguments: {0} Parameter requires {1} arguments, but you gave {2}.",
                        )
                        .arg(format!("[{}]", parameter.args()[given..].join(", ")))
                        .arg(wanted)
                        .arg(given),
                    ));
                }
                session
                    .parameter_args
                    .extend_from_slice(&window[index..index + wanted]);
                index += wanted;
                continue;
            }

            return Err(ctx.error(
                ErrorKind::UnsupportedToken,
                Message::new("Unsupported option or parameter found: {0}").arg(token),
            ));
        }

        Ok(false)
    }

    /// Checks (dry run) or applies (real run) one option occurrence.
    fn invoke(
        &self,
        option: &OptionRecord,
        args: &[String],
        name: &str,
        ctx: &ParseContext<'_>,
        mode: ParseMode,
    ) -> Result<()> {
        let handler = option.handler();
        let outcome = if mode.dry_run {
            handler.check(option.binding(), args, name)
        } else {
            handler.apply(option.binding(), args, name)
        };
        outcome.map_err(|err| CmdlineError::from_handler(err, ctx.catalog))
    }

    /// Hands `rest` to a command's engine. A command consumes the remainder
    /// of the line.
    fn delegate(
        &self,
        idx: usize,
        command: &CommandRecord,
        name: &str,
        rest: &[String],
        ctx: &ParseContext<'_>,
        mode: ParseMode,
    ) -> Result<bool> {
        if !mode.dry_run {
            *self.parsed_command.borrow_mut() = Some((idx, name.to_string()));
        }
        trace_parse!(ctx, command = name, tokens = rest.len(), dry_run = mode.dry_run, "Delegating to command");
        command.engine().parse(rest, ctx, mode)
    }

    /// Rewrites `-abc x` into `-a -b -c x` when every letter names a
    /// prefix+letter option. Returns `None` when the token is not an
    /// aggregate; letters are resolved all-or-nothing.
    fn expand_aggregate(
        &self,
        window: &[String],
        index: usize,
        prefix: &str,
        ctx: &ParseContext<'_>,
    ) -> Result<Option<Vec<String>>> {
        let Some(letters) = window[index].strip_prefix(prefix) else {
            return Ok(None);
        };
        if letters.chars().count() < 2 {
            return Ok(None);
        }

        let mut resolved = Vec::new();
        for letter in letters.chars() {
            let name = format!("{prefix}{letter}");
            match self.model.option(&name) {
                Some((_, option)) => resolved.push((name, option)),
                None => return Ok(None),
            }
        }

        let mut rewritten = Vec::with_capacity(window.len());
        let mut next = index + 1;
        for (name, option) in resolved {
            let wanted = option.arg_count();
            let given = window.len() - next;
            if given < wanted {
                return Err(missing_option_arguments(ctx, option, &name, given));
            }
            rewritten.push(name);
            rewritten.extend_from_slice(&window[next..next + wanted]);
            next += wanted;
        }
        rewritten.extend_from_slice(&window[next..]);
        Ok(Some(rewritten))
    }
}

fn missing_option_arguments(
    ctx: &ParseContext<'_>,
    option: &OptionRecord,
    token: &str,
    given: usize,
) -> CmdlineError {
    ctx.error(
        ErrorKind::MissingArguments,
        Message::new("Missing argument(s): {0}. Option \"{1}\" requires {2} arguments, but you gave {3}.")
            .arg(option.args()[given..].join(", "))
            .arg(token)
            .arg(option.arg_count())
            .arg(given),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::Slot;
    use crate::model::{Configurable, Declarator, OptionSpec};
    use crate::registry::HandlerRegistry;

    struct Letters {
        l: Slot<bool>,
        s: Slot<bool>,
        f: Slot<String>,
        o: Slot<String>,
        rest: Slot<Vec<String>>,
    }

    impl Configurable for Letters {
        fn declare(&self, decl: &mut Declarator<'_>) -> Result<()> {
            decl.option(OptionSpec::new(&["-l"]), &self.l)?;
            decl.option(OptionSpec::new(&["-s"]), &self.s)?;
            decl.option(OptionSpec::new(&["-f"]).with_arg("FILE"), &self.f)?;
            decl.option(OptionSpec::new(&["-o"]).with_arg("OUT"), &self.o)?;
            decl.option(OptionSpec::parameter().with_arg("ARG").unbounded(), &self.rest)
        }
    }

    fn letters() -> Letters {
        Letters {
            l: Slot::default(),
            s: Slot::default(),
            f: Slot::default(),
            o: Slot::default(),
            rest: Slot::default(),
        }
    }

    fn engine_for(config: &dyn Configurable) -> Engine {
        let registry = HandlerRegistry::with_defaults();
        let catalog = MessageCatalog::default();
        let mut model = OptionModel::default();
        config
            .declare(&mut Declarator::new(&mut model, &registry, &catalog))
            .unwrap();
        Engine::new(model, None)
    }

    fn tokens(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn aggregating() -> ParserSettings {
        ParserSettings {
            aggregate_short_options_prefix: Some("-".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_aggregate_threads_arguments_in_letter_order() {
        let config = letters();
        let engine = engine_for(&config);
        let settings = aggregating();
        let catalog = MessageCatalog::default();
        let ctx = ParseContext::new(&settings, &catalog, false);

        let window = tokens(&["-fo", "a", "b", "c"]);
        let rewritten = engine.expand_aggregate(&window, 0, "-", &ctx).unwrap().unwrap();
        assert_eq!(rewritten, tokens(&["-f", "a", "-o", "b", "c"]));
    }

    #[test]
    fn test_partial_aggregate_is_not_an_aggregate() {
        let config = letters();
        let engine = engine_for(&config);
        let settings = aggregating();
        let catalog = MessageCatalog::default();
        let ctx = ParseContext::new(&settings, &catalog, false);

        let window = tokens(&["-lx"]);
        assert!(engine.expand_aggregate(&window, 0, "-", &ctx).unwrap().is_none());

        engine.parse(&window, &ctx, ParseMode::default()).unwrap();
        assert!(!config.l.get());
        assert_eq!(config.rest.get(), tokens(&["-lx"]));
    }

    #[test]
    fn test_aggregate_missing_argument_names_letter_option() {
        let config = letters();
        let engine = engine_for(&config);
        let settings = aggregating();
        let catalog = MessageCatalog::default();
        let ctx = ParseContext::new(&settings, &catalog, false);

        let err = engine
            .parse(&tokens(&["-lf"]), &ctx, ParseMode::default())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingArguments);
        assert_eq!(
            err.to_string(),
            "Missing argument(s): FILE. Option \"-f\" requires 1 arguments, but you gave 0."
        );
    }

    #[test]
    fn test_debug_token_switches_debug_mode() {
        let config = letters();
        let engine = engine_for(&config);
        let settings = ParserSettings::default();
        let catalog = MessageCatalog::default();
        let ctx = ParseContext::new(&settings, &catalog, false);

        engine
            .parse(&tokens(&["--OPTBIND_DEBUG", "-l"]), &ctx, ParseMode::default())
            .unwrap();
        assert!(ctx.debug.get());
        assert!(config.l.get());
        assert!(config.rest.get().is_empty());
    }

    #[test]
    fn test_debug_token_ignored_when_not_allowed() {
        let config = letters();
        let engine = engine_for(&config);
        let settings = ParserSettings {
            debug_allowed: false,
            ..Default::default()
        };
        let catalog = MessageCatalog::default();
        let ctx = ParseContext::new(&settings, &catalog, false);

        engine
            .parse(&tokens(&["--OPTBIND_DEBUG"]), &ctx, ParseMode::default())
            .unwrap();
        assert!(!ctx.debug.get());
        assert_eq!(config.rest.get(), tokens(&["--OPTBIND_DEBUG"]));
    }

    #[test]
    fn test_stop_token_turns_options_into_parameters() {
        let config = letters();
        let engine = engine_for(&config);
        let settings = ParserSettings::default();
        let catalog = MessageCatalog::default();
        let ctx = ParseContext::new(&settings, &catalog, false);

        engine
            .parse(&tokens(&["-s", "--", "-l", "--"]), &ctx, ParseMode::default())
            .unwrap();
        assert!(config.s.get());
        assert!(!config.l.get());
        assert_eq!(config.rest.get(), tokens(&["-l", "--"]));
    }

    #[test]
    fn test_dry_run_leaves_slots_untouched() {
        let config = letters();
        let engine = engine_for(&config);
        let settings = aggregating();
        let catalog = MessageCatalog::default();
        let ctx = ParseContext::new(&settings, &catalog, false);

        let mode = ParseMode {
            dry_run: true,
            ..Default::default()
        };
        engine
            .parse(&tokens(&["-ls", "-f", "x", "p"]), &ctx, mode)
            .unwrap();
        assert!(!config.l.get());
        assert!(!config.s.get());
        assert!(config.f.get().is_empty());
        assert!(config.rest.get().is_empty());
    }
}
