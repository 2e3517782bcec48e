mod render;

use std::path::{Path, PathBuf};
use std::rc::Rc;

use clap::{Args, Parser, Subcommand};
use optbind_core::{CmdlineError, CmdlineParser, MessageCatalog, ModelSchema, ParserSettings, SchemaConfig};
use tracing_subscriber::EnvFilter;

use crate::render::{DEFAULT_WIDTH, UsageRenderer};

/// Environment variable holding the log filter directives.
const LOG_ENV: &str = "OPTBIND_LOG";

#[derive(Debug, Parser)]
#[command(name = "optbind", version)]
#[command(about = "Parse command lines against a YAML or JSON option model")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Parse tokens against a model and print the bound values as JSON.
    Parse(ParseArgs),
    /// Print the usage text of a model.
    Usage(UsageArgs),
    /// Run the static consistency check of a model.
    Validate(ValidateArgs),
}

#[derive(Debug, Args)]
struct ModelArgs {
    /// Model file (.json, otherwise YAML).
    #[arg(long)]
    model: PathBuf,
    /// Translation catalog (YAML).
    #[arg(long)]
    catalog: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct ParseArgs {
    #[command(flatten)]
    model: ModelArgs,
    /// Parser settings (YAML).
    #[arg(long)]
    settings: Option<PathBuf>,
    /// Check the tokens without applying them.
    #[arg(long)]
    dry_run: bool,
    /// Prefix for aggregated single-letter options (e.g. "-").
    #[arg(long, allow_hyphen_values = true)]
    aggregate: Option<String>,
    /// Line width of the usage text printed on a help request.
    #[arg(long, default_value_t = DEFAULT_WIDTH)]
    width: usize,
    /// Tokens to parse, after `--`.
    #[arg(last = true)]
    tokens: Vec<String>,
}

#[derive(Debug, Args)]
struct UsageArgs {
    #[command(flatten)]
    model: ModelArgs,
    /// Line width.
    #[arg(long, default_value_t = DEFAULT_WIDTH)]
    width: usize,
}

#[derive(Debug, Args)]
struct ValidateArgs {
    #[command(flatten)]
    model: ModelArgs,
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Parse(args) => run_parse(args),
        Command::Usage(args) => run_usage(args),
        Command::Validate(args) => run_validate(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

/// Logs go to stderr; stdout carries the JSON or usage output.
fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new("warn,optbind::debug=info"));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
}

/// A parser holding the object built from a model file.
struct Loaded {
    parser: CmdlineParser,
    config: Rc<SchemaConfig>,
    catalog: MessageCatalog,
}

fn load(args: &ModelArgs, settings: Option<&Path>) -> Result<Loaded, String> {
    let schema = ModelSchema::load(&args.model)
        .map_err(|err| format!("failed to load model {}: {err}", args.model.display()))?;
    let catalog = match &args.catalog {
        Some(path) => MessageCatalog::load(path)
            .map_err(|err| format!("failed to load catalog {}: {err}", path.display()))?,
        None => MessageCatalog::default(),
    };
    let settings = match settings {
        Some(path) => ParserSettings::load(path)
            .map_err(|err| format!("failed to load settings {}: {err}", path.display()))?,
        None => ParserSettings::default(),
    };

    let mut parser = CmdlineParser::with_settings(settings);
    parser.set_message_catalog(catalog.clone());
    if let Some(program) = &schema.program {
        parser.set_program_name(program);
    }
    if let Some(about) = &schema.about {
        parser.set_about_line(about);
    }
    if schema.default_command.is_some() {
        parser.set_default_command(schema.default_command.as_deref());
    }

    let config = Rc::new(SchemaConfig::new(&schema).map_err(localized)?);
    parser.add_object(&config).map_err(localized)?;
    tracing::debug!(
        model = %args.model.display(),
        options = parser.model().options().len(),
        commands = parser.model().commands().len(),
        "Loaded model"
    );

    Ok(Loaded {
        parser,
        config,
        catalog,
    })
}

fn localized(err: CmdlineError) -> String {
    err.localized_message().to_string()
}

fn run_parse(args: ParseArgs) -> Result<(), String> {
    let Loaded {
        mut parser,
        config,
        catalog,
    } = load(&args.model, args.settings.as_deref())?;
    if let Some(prefix) = &args.aggregate {
        parser.set_aggregate_short_options_prefix(Some(prefix));
    }

    let outcome = if args.dry_run {
        parser.check(args.tokens)
    } else {
        parser.parse(args.tokens)
    }
    .map_err(localized)?;

    if outcome.help_requested {
        let usage = match outcome.command_path.first() {
            Some(command) => parser
                .command_usage_model(command)
                .unwrap_or_else(|| parser.usage_model()),
            None => parser.usage_model(),
        };
        print!("{}", UsageRenderer::new(args.width).with_catalog(catalog).render(&usage));
        return Ok(());
    }

    let report = serde_json::json!({
        "command_path": outcome.command_path,
        "help_requested": outcome.help_requested,
        "values": config.values_along(&outcome.command_path),
    });
    let rendered = serde_json::to_string_pretty(&report)
        .map_err(|err| format!("failed to serialize result: {err}"))?;
    println!("{rendered}");
    Ok(())
}

fn run_usage(args: UsageArgs) -> Result<(), String> {
    let Loaded {
        parser, catalog, ..
    } = load(&args.model, None)?;
    let renderer = UsageRenderer::new(args.width).with_catalog(catalog);
    print!("{}", renderer.render(&parser.usage_model()));
    Ok(())
}

fn run_validate(args: ValidateArgs) -> Result<(), String> {
    let Loaded { parser, .. } = load(&args.model, None)?;
    parser.validate().map_err(localized)?;
    println!("Model is consistent.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_tokens_follow_double_dash() {
        let cli = Cli::try_parse_from([
            "optbind", "parse", "--model", "m.yaml", "--aggregate", "-", "--", "-lf", "x",
        ])
        .unwrap();
        let Command::Parse(args) = cli.command else {
            panic!("expected parse");
        };
        assert_eq!(args.aggregate.as_deref(), Some("-"));
        assert_eq!(args.tokens, vec!["-lf", "x"]);
        assert!(!args.dry_run);
    }
}
