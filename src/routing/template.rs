//! Route templates compiled to anchored, case-insensitive regexes.
//!
//! `/users/{id}` becomes `^/users/(?P<id>[^/]+)$`. A template containing `(`
//! is taken as a raw pattern and only anchored. That form skips escaping
//! entirely, so it is meant for routes that need something `{name}` cannot say.

use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

use crate::routing::{RouteError, params::Params};

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    // Matches an escaped `{name}` (regex::escape turns `{` into `\{`).
    Regex::new(r"\\\{([A-Za-z_][A-Za-z0-9_]*)\\\}").expect("placeholder pattern is valid")
});

/// Collapse repeated slashes, drop the trailing one, force a leading one.
pub fn normalize(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    format!("/{}", segments.join("/"))
}

#[derive(Debug, Clone)]
pub struct RouteTemplate {
    source: String,
    regex: Regex,
}

impl RouteTemplate {
    pub fn compile(template: &str) -> Result<Self, RouteError> {
        let source = normalize(template);

        let pattern = if source.contains('(') {
            format!("^{source}$")
        } else {
            let escaped = regex::escape(&source);
            let named = PLACEHOLDER.replace_all(&escaped, "(?P<$1>[^/]+)");
            format!("^{named}$")
        };

        let regex = RegexBuilder::new(&pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| RouteError::InvalidPattern {
                template: template.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self { source, regex })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    /// Match an already-normalized path, returning its captures in order.
    pub fn match_path(&self, path: &str) -> Option<Params> {
        let caps = self.regex.captures(path)?;
        let names = self.regex.capture_names().skip(1);

        let mut params = Params::default();
        for (i, name) in names.enumerate() {
            // Optional groups that did not participate are skipped.
            if let Some(m) = caps.get(i + 1) {
                params.push(name.map(str::to_string), m.as_str().to_string());
            }
        }
        Some(params)
    }
}
