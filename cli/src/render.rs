//! Plain-text usage rendering.
//!
//! Layout: about line, a `Usage:` synopsis, then two-column tables for
//! options, commands, each command's options and parameter, and finally the
//! top-level parameter. Hidden entries are left out.

use optbind_core::{CommandUsage, Message, MessageCatalog, OptionUsage, UsageModel};

pub const DEFAULT_WIDTH: usize = 80;

/// Indent before the first column.
const COLUMN_PREFIX: usize = 2;
/// Gap between the columns.
const COLUMN_SPACE: usize = 2;
/// Narrowest second column before descriptions move to their own line.
const MIN_DESCRIPTION_WIDTH: usize = 10;

/// Formats a [`UsageModel`] into text.
#[derive(Debug, Clone)]
pub struct UsageRenderer {
    width: usize,
    catalog: MessageCatalog,
}

impl Default for UsageRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_WIDTH)
    }
}

impl UsageRenderer {
    pub fn new(width: usize) -> Self {
        Self {
            width,
            catalog: MessageCatalog::default(),
        }
    }

    /// Translates headings and descriptions through `catalog`.
    pub fn with_catalog(mut self, catalog: MessageCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn render(&self, usage: &UsageModel) -> String {
        let options = sorted(usage.visible_options().collect(), |o: &OptionUsage| &o.names);
        let commands = sorted(usage.visible_commands().collect(), |c: &CommandUsage| &c.names);
        let mut out = String::new();

        if let Some(about) = usage.about_line.as_deref().filter(|a| !a.is_empty()) {
            out.push_str(&self.tr(about));
            out.push_str("\n\n");
        }

        out.push_str(&self.tr("Usage:"));
        out.push(' ');
        match usage.program_name.as_deref() {
            Some(program) => out.push_str(program),
            None => out.push_str(&self.tr("program")),
        }
        let mut synopsis = Vec::new();
        if !options.is_empty() {
            synopsis.push("[options]");
        }
        if usage.parameter.is_some() {
            synopsis.push("[parameter]");
        }
        if !commands.is_empty() {
            synopsis.push("[command]");
            if commands.iter().any(|c| c.visible_options().next().is_some()) {
                synopsis.push("[command options]");
            }
            if commands.iter().any(|c| c.parameter.is_some()) {
                synopsis.push("[command parameters]");
            }
        }
        for part in synopsis {
            out.push(' ');
            out.push_str(&self.tr(part));
        }
        out.push('\n');

        self.option_table(&mut out, &self.tr("Options:"), &options);
        self.command_table(&mut out, &commands);

        for command in &commands {
            let names = command.names.join(", ");
            let command_options = sorted(command.visible_options().collect(), |o: &OptionUsage| &o.names);
            let heading = Message::new("Options for command: {0}").arg(&names);
            self.option_table(&mut out, &heading.translate(&self.catalog), &command_options);
            if let Some(parameter) = &command.parameter {
                let heading = Message::new("Parameter for command: {0}").arg(&names);
                self.parameter(&mut out, &heading.translate(&self.catalog), parameter);
            }
        }

        if let Some(parameter) = &usage.parameter {
            self.parameter(&mut out, &self.tr("Parameter:"), parameter);
        }

        out
    }

    fn tr(&self, text: &str) -> String {
        Message::new(text).translate(&self.catalog)
    }

    /// A description, with `{0}`, `{1}`, ... replaced by the argument labels.
    fn description(&self, option: &OptionUsage) -> String {
        let Some(description) = option.description.as_deref() else {
            return String::new();
        };
        option
            .args
            .iter()
            .fold(Message::new(description), |message, arg| message.arg(self.tr(arg)))
            .translate(&self.catalog)
    }

    /// The option's signature with translated argument labels.
    fn signature(&self, option: &OptionUsage) -> String {
        OptionUsage {
            args: option.args.iter().map(|arg| self.tr(arg)).collect(),
            ..option.clone()
        }
        .signature()
    }

    fn option_table(&self, out: &mut String, heading: &str, options: &[&OptionUsage]) {
        if options.is_empty() {
            return;
        }
        let rows: Vec<(String, String)> = options
            .iter()
            .map(|o| (self.signature(o), self.description(o)))
            .collect();
        out.push('\n');
        out.push_str(heading);
        out.push('\n');
        self.table(out, &rows);
    }

    fn command_table(&self, out: &mut String, commands: &[&CommandUsage]) {
        if commands.is_empty() {
            return;
        }
        let rows: Vec<(String, String)> = commands
            .iter()
            .map(|c| {
                let description = c.description.as_deref().map(|d| self.tr(d));
                (c.names.join(","), description.unwrap_or_default())
            })
            .collect();
        out.push('\n');
        out.push_str(&self.tr("Commands:"));
        out.push('\n');
        self.table(out, &rows);
    }

    fn parameter(&self, out: &mut String, heading: &str, parameter: &OptionUsage) {
        out.push('\n');
        out.push_str(heading);
        out.push('\n');
        out.push_str(&" ".repeat(COLUMN_PREFIX));
        out.push_str(&self.signature(parameter));
        let description = self.description(parameter);
        if !description.is_empty() {
            out.push_str(&" ".repeat(COLUMN_SPACE));
            out.push_str(&description);
        }
        out.push('\n');
    }

    fn table(&self, out: &mut String, rows: &[(String, String)]) {
        let first_width = rows
            .iter()
            .map(|(first, _)| first.chars().count())
            .max()
            .unwrap_or(0)
            .max(2);
        let own_line = COLUMN_PREFIX + COLUMN_SPACE + first_width + MIN_DESCRIPTION_WIDTH > self.width;

        for (first, second) in rows {
            out.push_str(&" ".repeat(COLUMN_PREFIX));
            out.push_str(first);
            if !second.is_empty() {
                let column = if own_line {
                    out.push('\n');
                    COLUMN_PREFIX + COLUMN_SPACE
                } else {
                    COLUMN_PREFIX + first_width + COLUMN_SPACE
                };
                let used = if own_line { 0 } else { COLUMN_PREFIX + first.chars().count() };
                out.push_str(&" ".repeat(column - used));
                out.push_str(&wrap(second, column, self.width.saturating_sub(column)));
            }
            out.push('\n');
        }
    }
}

/// Sorts by first name, ignoring leading non-alphanumerics (`--all` sorts
/// as `all`).
fn sorted<'a, T>(mut items: Vec<&'a T>, names: impl Fn(&T) -> &Vec<String>) -> Vec<&'a T> {
    items.sort_by_cached_key(|item| {
        names(item)
            .first()
            .map(|name| name.trim_start_matches(|c: char| !c.is_ascii_alphanumeric()).to_string())
            .unwrap_or_default()
    });
    items
}

/// Greedy word wrap. Continuation lines are indented by `indent`; a word
/// longer than `width` gets a line of its own.
fn wrap(text: &str, indent: usize, width: usize) -> String {
    let width = width.max(1);
    let mut lines: Vec<String> = Vec::new();
    let mut line = String::new();
    for word in text.split_whitespace() {
        if !line.is_empty() && line.chars().count() + 1 + word.chars().count() > width {
            lines.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(word);
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines.join(&format!("\n{}", " ".repeat(indent)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn option(names: &[&str], args: &[&str], description: Option<&str>) -> OptionUsage {
        OptionUsage {
            names: names.iter().map(|n| n.to_string()).collect(),
            args: args.iter().map(|a| a.to_string()).collect(),
            description: description.map(str::to_string),
            hidden: false,
        }
    }

    fn usage() -> UsageModel {
        let mut secret = option(&["--secret"], &[], Some("Never shown"));
        secret.hidden = true;
        UsageModel {
            program_name: Some("tool".to_string()),
            about_line: Some("Does things.".to_string()),
            options: vec![
                option(&["--verbose", "-v"], &[], Some("Print more")),
                secret,
                option(&["-D"], &["KEY", "VALUE"], Some("Define {0} as {1}")),
            ],
            commands: vec![CommandUsage {
                names: vec!["build".to_string()],
                description: Some("Compile".to_string()),
                hidden: false,
                options: vec![option(&["--release"], &[], Some("Optimized"))],
                parameter: Some(option(&[], &["TARGET"], None)),
            }],
            parameter: Some(option(&[], &["FILE"], Some("Input files"))),
        }
    }

    #[test]
    fn test_render_layout() {
        let text = UsageRenderer::default().render(&usage());
        let expected = "\
Does things.

Usage: tool [options] [parameter] [command] [command options] [command parameters]

Options:
  -D KEY VALUE  Define KEY as VALUE
  --verbose,-v  Print more

Commands:
  build  Compile

Options for command: build
  --release  Optimized

Parameter for command: build
  TARGET

Parameter:
  FILE  Input files
";
        assert_eq!(text, expected);
        assert!(!text.contains("--secret"));
    }

    #[test]
    fn test_long_descriptions_wrap_under_second_column() {
        let model = UsageModel {
            program_name: None,
            about_line: None,
            options: vec![option(
                &["-q"],
                &[],
                Some("one two three four five six seven eight nine ten"),
            )],
            commands: Vec::new(),
            parameter: None,
        };
        let text = UsageRenderer::new(20).render(&model);
        assert_eq!(
            text,
            "Usage: program [options]\n\nOptions:\n  -q  one two three\n      four five six\n      seven eight\n      nine ten\n"
        );
    }

    #[test]
    fn test_wide_first_column_moves_description_down() {
        let model = UsageModel {
            program_name: Some("p".to_string()),
            about_line: None,
            options: vec![option(&["--a-very-long-option-name"], &["VALUE"], Some("Short"))],
            commands: Vec::new(),
            parameter: None,
        };
        let text = UsageRenderer::new(30).render(&model);
        assert!(text.contains("  --a-very-long-option-name VALUE\n    Short\n"));
    }

    #[test]
    fn test_catalog_translates_headings() {
        let mut catalog = MessageCatalog::default();
        catalog.insert("Usage:", "Aufruf:");
        catalog.insert("Options:", "Optionen:");
        catalog.insert("KEY", "SCHLÜSSEL");
        let text = UsageRenderer::default().with_catalog(catalog).render(&usage());
        assert!(text.starts_with("Does things.\n\nAufruf: tool"));
        assert!(text.contains("\nOptionen:\n"));
        assert!(text.contains("\n  -D SCHLÜSSEL VALUE  Define SCHLÜSSEL as VALUE\n"));
    }

    #[test]
    fn test_wrap_keeps_long_words_whole() {
        assert_eq!(wrap("abcdefghij xy", 2, 4), "abcdefghij\n  xy");
        assert_eq!(wrap("", 2, 4), "");
    }
}
