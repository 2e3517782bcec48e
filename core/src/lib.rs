//! Binds command-line tokens to configuration objects.
//!
//! This crate defines the option model and the parsing engine:
//!
//! - [`Slot`] / [`Binding`] / [`Callback`]: configuration slots options
//!   write to.
//! - [`Configurable`] / [`Declarator`] / [`OptionSpec`] / [`CommandSpec`]:
//!   how a configuration object declares options, its main parameter and
//!   sub-commands.
//! - [`HandlerRegistry`] / [`OptionHandler`]: conversion from string
//!   arguments to slot values, resolved in registration order.
//! - [`CmdlineParser`]: argument-file expansion, a dry run, the real run
//!   with short-option aggregation and command delegation, then occurrence
//!   validation.
//! - [`validate_model`]: the input-independent consistency check.
//! - [`UsageModel`]: a read-only snapshot for usage renderers.
//! - [`ModelSchema`] / [`SchemaConfig`]: models described as YAML or JSON.
//!
//! # Example
//!
//! ```
//! use optbind_core::*;
//!
//! struct Config {
//!     help: Slot<bool>,
//!     name: Slot<String>,
//!     list: Slot<bool>,
//!     file: Slot<Option<String>>,
//! }
//!
//! impl Configurable for Config {
//!     fn declare(&self, decl: &mut Declarator<'_>) -> Result<()> {
//!         decl.option(OptionSpec::new(&["--help", "-h"]).help(), &self.help)?;
//!         decl.option(OptionSpec::new(&["--name"]).with_arg("NAME"), &self.name)?;
//!         decl.option(OptionSpec::new(&["-l"]), &self.list)?;
//!         decl.option(OptionSpec::new(&["-f"]).with_arg("FILE"), &self.file)
//!     }
//! }
//!
//! let config = Config {
//!     help: Slot::default(),
//!     name: Slot::new("x".to_string()),
//!     list: Slot::default(),
//!     file: Slot::default(),
//! };
//!
//! let mut parser = CmdlineParser::new();
//! parser.set_aggregate_short_options_prefix(Some("-"));
//! parser.add_options(&config).unwrap();
//!
//! parser.parse(["-lf", "notes.txt", "--name", "y"]).unwrap();
//! assert!(config.list.get());
//! assert_eq!(config.file.get().as_deref(), Some("notes.txt"));
//! assert_eq!(config.name.get(), "y");
//!
//! let err = parser.parse(["--bogus"]).unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::UnsupportedToken);
//! ```

mod argfile;
mod binding;
mod engine;
mod error;
mod handlers;
mod i18n;
mod model;
mod parser;
mod registry;
mod schema;
mod settings;
mod usage;
mod validate;

pub use binding::{Binding, Callback, Slot};
pub use engine::ParseMode;
pub use error::{CmdlineError, ErrorKind, HandlerError, Result};
pub use handlers::{
    BoolHandler, CallbackHandler, CollectionHandler, DisableFlagHandler, FlagHandler, MapHandler,
    ParseHandler, StringHandler,
};
pub use i18n::{Message, MessageCatalog};
pub use model::{
    CommandRecord, CommandSpec, Configurable, DelegateMode, Declarator, OptionModel, OptionRecord,
    OptionSpec,
};
pub use parser::{CmdlineParser, ParseOutcome};
pub use registry::{HandlerRegistry, HandlerRequest, OptionHandler};
pub use schema::{CommandSchema, ModelSchema, OptionSchema, SchemaConfig, ValueType};
pub use settings::{ParserSettings, SettingsError};
pub use usage::{CommandUsage, OptionUsage, UsageModel};
pub use validate::{ModelIssue, validate_model};
