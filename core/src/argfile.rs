//! Argument-file expansion.
//!
//! A token starting with the configured prefix (`@args.txt`) is replaced by
//! the lines of the named file, in order and untrimmed. Lines read from a
//! file are not expanded again.

use std::path::Path;

use crate::engine::{ParseContext, trace_parse};
use crate::error::{ErrorKind, Result};
use crate::i18n::Message;

/// Expands every prefixed token in `tokens`.
pub(crate) fn expand(tokens: Vec<String>, prefix: &str, ctx: &ParseContext<'_>) -> Result<Vec<String>> {
    if !tokens.iter().any(|t| t.starts_with(prefix)) {
        return Ok(tokens);
    }

    let mut expanded = Vec::with_capacity(tokens.len());
    for token in tokens {
        match token.strip_prefix(prefix) {
            Some(path) => {
                let lines = read_lines(Path::new(path), &token, ctx)?;
                trace_parse!(ctx, token = %token, lines = lines.len(), "Expanded argument file");
                expanded.extend(lines);
            }
            None => expanded.push(token),
        }
    }
    Ok(expanded)
}

fn read_lines(path: &Path, token: &str, ctx: &ParseContext<'_>) -> Result<Vec<String>> {
    if !path.is_file() {
        return Err(ctx.error(
            ErrorKind::ArgumentFile,
            Message::new("File referenced via {0} does not exist.").arg(token),
        ));
    }
    let content = std::fs::read_to_string(path).map_err(|err| {
        ctx.error(
            ErrorKind::ArgumentFile,
            Message::new("File referenced via {0} could not be read.").arg(token),
        )
        .with_source(err)
    })?;
    Ok(content.lines().map(str::to_string).collect())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::i18n::MessageCatalog;
    use crate::settings::ParserSettings;

    fn run(tokens: Vec<String>) -> Result<Vec<String>> {
        let settings = ParserSettings::default();
        let catalog = MessageCatalog::default();
        let ctx = ParseContext::new(&settings, &catalog, false);
        expand(tokens, "@", &ctx)
    }

    #[test]
    fn test_expands_lines_in_place() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "--name\n\nsecond line\n@nested").unwrap();
        let token = format!("@{}", file.path().display());

        let expanded = run(vec!["-a".to_string(), token, "-b".to_string()]).unwrap();
        assert_eq!(expanded, vec!["-a", "--name", "", "second line", "@nested", "-b"]);
    }

    #[test]
    fn test_missing_file_names_token() {
        let dir = tempfile::tempdir().unwrap();
        let token = format!("@{}", dir.path().join("absent.txt").display());

        let err = run(vec![token.clone()]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentFile);
        assert_eq!(err.to_string(), format!("File referenced via {token} does not exist."));
    }

    #[test]
    fn test_directory_is_not_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let token = format!("@{}", dir.path().display());
        assert!(run(vec![token]).is_err());
    }

    #[test]
    fn test_plain_tokens_pass_through() {
        let tokens = vec!["a".to_string(), "b@c".to_string()];
        assert_eq!(run(tokens.clone()).unwrap(), tokens);
    }
}
