//! Model consistency and occurrence validation.
//!
//! [`validate_model`] is the input-independent static check: occurrence
//! bounds must be consistent and every `requires`/`conflicts_with` entry
//! must name an existing option of the same model. Name uniqueness and the
//! single-parameter rule are enforced while declaring, so a built model
//! cannot violate them.
//!
//! The occurrence check runs at the end of every parse and reports the first
//! violated bound, missing requirement or conflict.
//!
//! # Examples
//!
//! ```
//! use optbind_core::*;
//!
//! struct Config {
//!     quiet: Slot<bool>,
//!     verbose: Slot<bool>,
//! }
//!
//! impl Configurable for Config {
//!     fn declare(&self, decl: &mut Declarator<'_>) -> Result<()> {
//!         decl.option(OptionSpec::new(&["-q"]).with_conflict("-v"), &self.quiet)?;
//!         decl.option(OptionSpec::new(&["-v"]).with_conflict("--loud"), &self.verbose)
//!     }
//! }
//!
//! let mut parser = CmdlineParser::new();
//! parser.add_options(&Config { quiet: Slot::default(), verbose: Slot::default() }).unwrap();
//! let issues = validate_model(parser.model());
//! assert_eq!(
//!     issues,
//!     vec![ModelIssue::UnknownConflict { option: "-v".into(), conflict: "--loud".into() }]
//! );
//! ```

use thiserror::Error;

use crate::engine::{ParseContext, ParseSession};
use crate::error::{ErrorKind, Result};
use crate::i18n::Message;
use crate::model::{OptionModel, OptionRecord};

/// A static inconsistency in a declared model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelIssue {
    /// `max_count` is below `min_count`.
    #[error("The option \"{option}\" has inconsistent min..max count configuration (min={min}, max={max}).")]
    InconsistentCount {
        option: String,
        min: usize,
        max: usize,
    },
    /// A `requires` entry names no option of the model.
    #[error("The option \"{option}\" requires the unknown/missing option \"{required}\".")]
    UnknownRequires { option: String, required: String },
    /// A `conflicts_with` entry names the option itself.
    #[error("Option \"{option}\" is configured to conflicts with itself.")]
    SelfConflict { option: String },
    /// A `conflicts_with` entry names no option of the model.
    #[error("The option \"{option}\" conflicts with a unknown/missing option \"{conflict}\".")]
    UnknownConflict { option: String, conflict: String },
}

impl ModelIssue {
    /// The issue as a translatable message.
    pub fn message(&self) -> Message {
        match self {
            Self::InconsistentCount { option, min, max } => Message::new(
                "The option \"{0}\" has inconsistent min..max count configuration (min={1}, max={2}).",
            )
            .arg(option)
            .arg(min)
            .arg(max),
            Self::UnknownRequires { option, required } => {
                Message::new("The option \"{0}\" requires the unknown/missing option \"{1}\".")
                    .arg(option)
                    .arg(required)
            }
            Self::SelfConflict { option } => {
                Message::new("Option \"{0}\" is configured to conflicts with itself.").arg(option)
            }
            Self::UnknownConflict { option, conflict } => {
                Message::new("The option \"{0}\" conflicts with a unknown/missing option \"{1}\".")
                    .arg(option)
                    .arg(conflict)
            }
        }
    }
}

/// Statically checks a model and every command below it.
pub fn validate_model(model: &OptionModel) -> Vec<ModelIssue> {
    let mut issues = check_model(model);
    for command in model.commands() {
        issues.extend(validate_model(command.model()));
    }
    issues
}

/// Statically checks one model, without descending into commands.
pub(crate) fn check_model(model: &OptionModel) -> Vec<ModelIssue> {
    let mut issues = Vec::new();

    for option in model.options().iter().chain(model.parameter()) {
        let name = option.display_name();

        if let Some(max) = option.max_count()
            && max < option.min_count()
        {
            issues.push(ModelIssue::InconsistentCount {
                option: name.clone(),
                min: option.min_count(),
                max,
            });
        }

        for required in option.requires() {
            if model.option(required).is_none() {
                issues.push(ModelIssue::UnknownRequires {
                    option: name.clone(),
                    required: required.clone(),
                });
            }
        }

        for conflict in option.conflicts_with() {
            if option.names().contains(conflict) {
                issues.push(ModelIssue::SelfConflict {
                    option: name.clone(),
                });
            } else if model.option(conflict).is_none() {
                issues.push(ModelIssue::UnknownConflict {
                    option: name.clone(),
                    conflict: conflict.clone(),
                });
            }
        }
    }

    issues
}

/// Renders an occurrence range as "at least N", "exactly N" or
/// "between N and M".
fn range_message(option: &OptionRecord) -> Message {
    let min = option.min_count();
    match option.max_count() {
        None => Message::new("at least {0}").arg(min),
        Some(max) if max == min => Message::new("exactly {0}").arg(min),
        Some(max) => Message::new("between {0} and {1}").arg(min).arg(max),
    }
}

/// Checks the occurrence counts of a finished dispatch.
pub(crate) fn check_occurrences(
    model: &OptionModel,
    session: &ParseSession,
    ctx: &ParseContext<'_>,
) -> Result<()> {
    let counted = model
        .options()
        .iter()
        .zip(session.counts.iter().copied())
        .chain(model.parameter().map(|p| (p, session.parameter_count)));
    let counted: Vec<(&OptionRecord, usize)> = counted.collect();

    for &(option, count) in &counted {
        if option.accepts_count(count) {
            continue;
        }
        let template = if option.is_parameter() {
            "Main parameter \"{0}\" was given {1} times, but must be given {2} times"
        } else {
            "Option \"{0}\" was given {1} times, but must be given {2} times"
        };
        return Err(ctx.error(
            ErrorKind::CardinalityViolation,
            Message::new(template)
                .arg(option.display_name())
                .arg(count)
                .arg_message(range_message(option)),
        ));
    }

    let given = |name: &str| {
        model
            .option(name)
            .is_some_and(|(idx, _)| session.counts[idx] > 0)
    };

    for &(option, count) in &counted {
        if count == 0 {
            continue;
        }
        if let Some(required) = option.requires().iter().find(|r| !given(r.as_str())) {
            return Err(ctx.error(
                ErrorKind::MissingRequiredOption,
                Message::new("When using option \"{0}\" also option \"{1}\" must be given.")
                    .arg(option.display_name())
                    .arg(required),
            ));
        }
        if let Some(conflict) = option.conflicts_with().iter().find(|c| given(c.as_str())) {
            return Err(ctx.error(
                ErrorKind::ConflictingOptions,
                Message::new("Options \"{0}\" and \"{1}\" cannot be used at the same time.")
                    .arg(option.display_name())
                    .arg(conflict),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::Slot;
    use crate::i18n::MessageCatalog;
    use crate::model::{Configurable, Declarator, OptionSpec};
    use crate::registry::HandlerRegistry;
    use crate::settings::ParserSettings;

    struct Config {
        specs: Vec<OptionSpec>,
        slots: Vec<Slot<bool>>,
    }

    impl Config {
        fn new(specs: Vec<OptionSpec>) -> Self {
            let slots = specs.iter().map(|_| Slot::default()).collect();
            Self { specs, slots }
        }
    }

    impl Configurable for Config {
        fn declare(&self, decl: &mut Declarator<'_>) -> Result<()> {
            for (spec, slot) in self.specs.iter().zip(&self.slots) {
                decl.option(spec.clone(), slot)?;
            }
            Ok(())
        }
    }

    fn model(specs: Vec<OptionSpec>) -> OptionModel {
        let registry = HandlerRegistry::with_defaults();
        let catalog = MessageCatalog::default();
        let mut model = OptionModel::default();
        Config::new(specs)
            .declare(&mut Declarator::new(&mut model, &registry, &catalog))
            .unwrap();
        model
    }

    fn session(model: &OptionModel, counts: &[usize]) -> ParseSession {
        let mut session = ParseSession {
            counts: vec![0; model.options().len()],
            parameter_count: 0,
            parameter_args: Vec::new(),
            parsing_options: true,
            help_detected: false,
        };
        session.counts[..counts.len()].copy_from_slice(counts);
        session
    }

    fn check(model: &OptionModel, counts: &[usize]) -> Result<()> {
        let settings = ParserSettings::default();
        let catalog = MessageCatalog::default();
        let ctx = ParseContext::new(&settings, &catalog, false);
        check_occurrences(model, &session(model, counts), &ctx)
    }

    #[test]
    fn test_static_check_reports_every_issue() {
        let model = model(vec![
            OptionSpec::new(&["-a"]).with_min_count(2),
            OptionSpec::new(&["-b", "--bee"]).with_conflict("--bee").with_requires("-z"),
        ]);
        assert_eq!(
            validate_model(&model),
            vec![
                ModelIssue::InconsistentCount {
                    option: "-a".to_string(),
                    min: 2,
                    max: 1
                },
                ModelIssue::UnknownRequires {
                    option: "-b".to_string(),
                    required: "-z".to_string()
                },
                ModelIssue::SelfConflict {
                    option: "-b".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_issue_message_matches_display() {
        let issue = ModelIssue::UnknownConflict {
            option: "-q".to_string(),
            conflict: "-x".to_string(),
        };
        assert_eq!(issue.message().render(), issue.to_string());
    }

    #[test]
    fn test_cardinality_boundary() {
        let model = model(vec![OptionSpec::new(&["--once"]).required()]);
        for (count, ok) in [(0, false), (1, true), (2, false)] {
            let result = check(&model, &[count]);
            assert_eq!(result.is_ok(), ok, "count {count}");
        }
        let err = check(&model, &[2]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CardinalityViolation);
        assert_eq!(
            err.to_string(),
            "Option \"--once\" was given 2 times, but must be given exactly 1 times"
        );
    }

    #[test]
    fn test_range_wording() {
        let model = model(vec![
            OptionSpec::new(&["-a"]).with_min_count(2).unbounded(),
            OptionSpec::new(&["-b"]).with_min_count(1).with_max_count(3),
        ]);
        assert!(check(&model, &[1, 1]).unwrap_err().to_string().ends_with("at least 2 times"));
        assert!(
            check(&model, &[2, 4])
                .unwrap_err()
                .to_string()
                .ends_with("between 1 and 3 times")
        );
    }

    #[test]
    fn test_requires_is_one_directional() {
        let model = model(vec![
            OptionSpec::new(&["-a"]).with_requires("-b"),
            OptionSpec::new(&["-b"]),
        ]);
        assert!(check(&model, &[0, 1]).is_ok());
        let err = check(&model, &[1, 0]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredOption);
        assert_eq!(
            err.to_string(),
            "When using option \"-a\" also option \"-b\" must be given."
        );
    }

    #[test]
    fn test_conflicts() {
        let model = model(vec![
            OptionSpec::new(&["-a"]).with_conflict("-b"),
            OptionSpec::new(&["-b"]),
        ]);
        assert!(check(&model, &[1, 0]).is_ok());
        let err = check(&model, &[1, 1]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConflictingOptions);
    }
}
