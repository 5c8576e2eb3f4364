//! Prompt template loading and placeholder substitution.
//!
//! Prompt files contain literal JSON examples, so braces are everywhere.
//! Rendering therefore escapes every brace first and only re-opens the
//! placeholders we actually have values for:
//!
//! 1. `{` → `{{` and `}` → `}}` across the whole template
//! 2. for each variable `key`, `{{{{key}}}}` and `{{key}}` become `{key}`
//!    (authors may write either `{key}` or `{{key}}`)
//! 3. format-style substitution: `{{` → `{`, `}}` → `}`, `{key}` → value

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, instrument};

/// Variables available to a template, e.g. `custom_search`.
pub type PromptContext = BTreeMap<String, String>;

/// Why a prompt template could not be rendered.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("The file '{}' was not found.", .path.display())]
    NotFound { path: PathBuf },

    #[error("Failed to read template '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Missing variable for placeholder: '{name}'")]
    MissingVariable { name: String },

    #[error("Single '{brace}' encountered in template at byte {offset}")]
    UnbalancedBrace { brace: char, offset: usize },
}

/// Read the template at `path` and substitute `variables` into it.
#[instrument(level = "debug", skip_all, fields(path = %path.as_ref().display()))]
pub async fn render(
    path: impl AsRef<Path>,
    variables: &PromptContext,
) -> Result<String, TemplateError> {
    let path = path.as_ref();
    let template = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => TemplateError::NotFound {
                path: path.to_path_buf(),
            },
            _ => TemplateError::Io {
                path: path.to_path_buf(),
                source,
            },
        })?;
    let rendered = render_str(&template, variables)?;
    debug!(bytes = rendered.len(), "Rendered template");
    Ok(rendered)
}

/// Render an in-memory template. See the module docs for the rules.
pub fn render_str(template: &str, variables: &PromptContext) -> Result<String, TemplateError> {
    let mut escaped = template.replace('{', "{{").replace('}', "}}");
    for key in variables.keys() {
        escaped = escaped.replace(&format!("{{{{{{{{{key}}}}}}}}}"), &format!("{{{key}}}"));
        escaped = escaped.replace(&format!("{{{{{key}}}}}"), &format!("{{{key}}}"));
    }
    substitute(&escaped, variables)
}

/// Format-style substitution over an already escaped template.
fn substitute(escaped: &str, variables: &PromptContext) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(escaped.len());
    let mut rest = escaped;
    let mut offset = 0;

    while let Some(pos) = rest.find(['{', '}']) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        let consumed = if tail.starts_with("{{") {
            out.push('{');
            2
        } else if tail.starts_with("}}") {
            out.push('}');
            2
        } else if tail.starts_with('{') {
            let close = tail.find('}').ok_or(TemplateError::UnbalancedBrace {
                brace: '{',
                offset: offset + pos,
            })?;
            let name = &tail[1..close];
            let value = variables
                .get(name)
                .ok_or_else(|| TemplateError::MissingVariable {
                    name: name.to_string(),
                })?;
            out.push_str(value);
            close + 1
        } else {
            return Err(TemplateError::UnbalancedBrace {
                brace: '}',
                offset: offset + pos,
            });
        };
        offset += pos + consumed;
        rest = &rest[pos + consumed..];
    }
    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> PromptContext {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_substitutes_known_placeholder() {
        let out = render_str("Focus: {custom_search}.", &vars(&[("custom_search", "AI chips")])).unwrap();
        assert_eq!(out, "Focus: AI chips.");
    }

    #[test]
    fn test_double_braced_placeholder_is_also_substituted() {
        let out = render_str("Focus: {{custom_search}}", &vars(&[("custom_search", "rates")])).unwrap();
        assert_eq!(out, "Focus: rates");
    }

    #[test]
    fn test_literal_braces_survive() {
        let tpl = r#"Return {"daily_overviews": [{"date": "", "topics": []}]} about {custom_search} and {unknown}"#;
        let out = render_str(tpl, &vars(&[("custom_search", "housing")])).unwrap();
        assert_eq!(
            out,
            r#"Return {"daily_overviews": [{"date": "", "topics": []}]} about housing and {unknown}"#
        );
    }

    #[test]
    fn test_no_variables_leaves_template_untouched() {
        let tpl = "{a} {{b}} }{";
        assert_eq!(render_str(tpl, &PromptContext::new()).unwrap(), tpl);
    }

    #[test]
    fn test_substitute_reports_missing_variable() {
        let err = substitute("Hello {name}", &PromptContext::new()).unwrap_err();
        assert!(matches!(err, TemplateError::MissingVariable { ref name } if name == "name"));
        assert_eq!(err.to_string(), "Missing variable for placeholder: 'name'");
    }

    #[test]
    fn test_substitute_reports_unbalanced_brace() {
        let err = substitute("oops }", &PromptContext::new()).unwrap_err();
        assert!(matches!(err, TemplateError::UnbalancedBrace { brace: '}', offset: 5 }));
    }

    #[tokio::test]
    async fn test_render_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("daily_prompt.txt");
        std::fs::write(&path, "Topics on {custom_search}: {\"x\": 1}").unwrap();
        let out = render(&path, &vars(&[("custom_search", "jobs")])).await.unwrap();
        assert_eq!(out, "Topics on jobs: {\"x\": 1}");
    }

    #[tokio::test]
    async fn test_render_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = render(dir.path().join("nope.txt"), &PromptContext::new())
            .await
            .unwrap_err();
        assert!(matches!(err, TemplateError::NotFound { .. }));
        assert!(err.to_string().contains("nope.txt"));
    }

    #[tokio::test]
    async fn test_bundled_prompts_render() {
        let prompts = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("prompts");
        for tab in crate::models::TabType::ALL {
            let out = render(prompts.join(tab.template_file()), &vars(&[("custom_search", "tariffs")]))
                .await
                .unwrap();
            assert!(out.contains("User focus: tariffs"));
            assert!(out.contains(&format!("{{\"{}\":", tab.expected_key())));
        }
    }
}
