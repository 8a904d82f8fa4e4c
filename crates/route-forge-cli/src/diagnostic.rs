use std::ops::Range;

use miette::{Diagnostic, NamedSource, SourceSpan};

/// A TOML deserialization failure rendered with the offending span.
///
/// The module-level `#[allow(unused_assignments)]` in main.rs is required
/// because miette's derive macro generates assignment patterns that rustc
/// flags as unused.
#[derive(Debug, thiserror::Error, Diagnostic)]
#[error("{message}")]
pub struct TomlDiagnostic {
    #[source_code]
    src: NamedSource<String>,

    #[label("{label}")]
    span: SourceSpan,

    message: String,
    label: String,

    #[help]
    suggestion: Option<String>,
}

/// Builds a diagnostic for `message` at `span` within `source`.
pub fn toml_diagnostic(
    message: &str,
    span: Option<Range<usize>>,
    source: &str,
    filename: &str,
) -> TomlDiagnostic {
    let span: SourceSpan = match span {
        Some(range) => (range.start, range.end.saturating_sub(range.start)).into(),
        None => (0, 0).into(),
    };
    let (label, suggestion) = classify(message);
    TomlDiagnostic {
        src: NamedSource::new(filename, source.to_string()),
        span,
        message: message.trim().to_string(),
        label,
        suggestion,
    }
}

fn classify(message: &str) -> (String, Option<String>) {
    if message.contains("unknown field") {
        (
            "unknown key".to_string(),
            Some(
                "Model keys are: name, attributes, roles, routable, junction, upload, verbs, metadata."
                    .to_string(),
            ),
        )
    } else if message.contains("unknown verb") || message.contains("unknown variant") {
        (
            "unknown verb".to_string(),
            Some("Verbs are: get, post, put, patch, delete, upload.".to_string()),
        )
    } else if message.contains("invalid model name") {
        (
            "not URL-safe".to_string(),
            Some(format!("Use a name such as '{}'.", suggest_slug(message))),
        )
    } else if message.contains("unknown type") {
        (
            "unknown type".to_string(),
            Some(
                "Types are: string, integer, float, boolean, date, datetime, array, json."
                    .to_string(),
            ),
        )
    } else if message.contains("missing field") {
        ("required key missing".to_string(), None)
    } else {
        ("here".to_string(), None)
    }
}

/// Extracts the quoted name from an invalid-name message and turns it into
/// a slug that passes model-name validation.
fn suggest_slug(message: &str) -> String {
    let quoted = message.split('\'').nth(1).unwrap_or_default();
    let mut slug: String = quoted
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    let leading = slug.chars().take_while(|c| !c.is_ascii_alphabetic()).count();
    slug.replace_range(..leading, "");
    if slug.is_empty() {
        "model".to_string()
    } else {
        slug
    }
}

/// Renders a diagnostic as a miette report.
pub fn render(
    message: &str,
    span: Option<Range<usize>>,
    source: &str,
    filename: &str,
) -> miette::Report {
    miette::Report::new(toml_diagnostic(message, span, source, filename))
}
