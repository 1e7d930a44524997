//! Rendering of `{{ .Key }}` placeholders in run-command tokens.

use regex::{Captures, Regex};
use std::sync::OnceLock;

use crate::error::{ConfigError, Result};

static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();

fn placeholder() -> &'static Regex {
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"\{\{\s*\.([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("Invalid placeholder regex")
    })
}

/// Values available to run-command templates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateData {
    /// Base image reference, exposed as `{{ .Image }}`
    pub image: String,
}

impl TemplateData {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
        }
    }

    fn lookup(&self, key: &str) -> Option<&str> {
        match key {
            "Image" => Some(&self.image),
            _ => None,
        }
    }
}

/// Render every placeholder in `template`. Unknown keys are an error.
pub fn render(template: &str, data: &TemplateData) -> Result<String> {
    let mut unknown = None;

    let rendered = placeholder().replace_all(template, |caps: &Captures| {
        let key = &caps[1];
        match data.lookup(key) {
            Some(value) => value.to_string(),
            None => {
                unknown.get_or_insert_with(|| key.to_string());
                String::new()
            }
        }
    });

    if let Some(key) = unknown {
        return Err(ConfigError::template(
            template,
            format!("unknown key .{}", key),
        ));
    }

    if rendered.contains("{{") || rendered.contains("}}") {
        return Err(ConfigError::template(template, "unterminated placeholder"));
    }

    Ok(rendered.into_owned())
}

/// Render a full run-command token list.
pub fn render_all(tokens: &[String], data: &TemplateData) -> Result<Vec<String>> {
    tokens.iter().map(|token| render(token, data)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_image() {
        let data = TemplateData::new("base:1.0");
        assert_eq!(render("{{ .Image }}", &data).unwrap(), "base:1.0");
        assert_eq!(render("{{.Image}}", &data).unwrap(), "base:1.0");
        assert_eq!(
            render("--label=from={{ .Image }}", &data).unwrap(),
            "--label=from=base:1.0"
        );
    }

    #[test]
    fn test_render_plain_token_untouched() {
        let data = TemplateData::new("base:1.0");
        assert_eq!(
            render("--entrypoint=/bin/sh", &data).unwrap(),
            "--entrypoint=/bin/sh"
        );
    }

    #[test]
    fn test_render_unknown_key() {
        let data = TemplateData::new("base:1.0");
        let err = render("{{ .Tag }}", &data).unwrap_err();
        assert!(matches!(err, ConfigError::Template { .. }));
        assert!(err.to_string().contains(".Tag"));
    }

    #[test]
    fn test_render_unterminated() {
        let data = TemplateData::new("base:1.0");
        assert!(render("{{ .Image", &data).is_err());
    }

    #[test]
    fn test_render_all() {
        let data = TemplateData::new("alpine");
        let tokens = vec!["-d".to_string(), "--".to_string(), "{{ .Image }}".to_string()];
        assert_eq!(
            render_all(&tokens, &data).unwrap(),
            vec!["-d", "--", "alpine"]
        );
    }
}
