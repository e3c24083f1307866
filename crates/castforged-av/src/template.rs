//! Placeholder substitution for custom encoder command lines.

use crate::sexagesimal::format_duration_sexagesimal;
use crate::{Error, Result};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Variable substitution context for custom command templates.
///
/// Placeholders use the `{name}` syntax. Unknown placeholders and stray
/// braces are left as written, and substituted values are never rescanned.
///
/// # Example
///
/// ```
/// use castforged_av::TemplateContext;
/// use std::path::Path;
/// use std::time::Duration;
///
/// let ctx = TemplateContext::new()
///     .with_source(Path::new("/media/My Movie.mkv"))?
///     .with_seek(Duration::from_secs(90), None);
///
/// assert_eq!(ctx.substitute("{filestem}.ts"), "My Movie.ts");
/// assert_eq!(ctx.substitute("-ss={start}"), "-ss=0:01:30");
/// assert_eq!(ctx.substitute("{length}"), "");
/// # Ok::<(), castforged_av::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct TemplateContext {
    vars: HashMap<String, String>,
}

impl TemplateContext {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set source-file variables.
    ///
    /// - `{input}`: full path to the source
    /// - `{filename}`: file name with extension
    /// - `{filestem}`: file name without extension
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `input` is not valid UTF-8.
    pub fn with_source(mut self, input: &Path) -> Result<Self> {
        self.set("input", path_str(input)?);
        if let Some(name) = input.file_name().and_then(|n| n.to_str()) {
            self.set("filename", name);
        }
        if let Some(stem) = input.file_stem().and_then(|s| s.to_str()) {
            self.set("filestem", stem);
        }
        Ok(self)
    }

    /// Set `{start}` and `{length}` in sexagesimal form.
    ///
    /// An absent length substitutes as the empty string.
    pub fn with_seek(mut self, start: Duration, length: Option<Duration>) -> Self {
        self.set("start", &format_duration_sexagesimal(start));
        self.set(
            "length",
            &length.map(format_duration_sexagesimal).unwrap_or_default(),
        );
        self
    }

    /// Add a custom variable.
    pub fn with_var(mut self, key: &str, value: &str) -> Self {
        self.set(key, value);
        self
    }

    /// Set a variable.
    pub fn set(&mut self, key: &str, value: &str) {
        self.vars.insert(key.to_string(), value.to_string());
    }

    /// Get a variable value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(|s| s.as_str())
    }

    /// Substitute variables in a string.
    pub fn substitute(&self, template: &str) -> String {
        let mut result = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(open) = rest.find('{') {
            result.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            match after.find('}') {
                Some(close) => match self.vars.get(&after[..close]) {
                    Some(value) => {
                        result.push_str(value);
                        rest = &after[close + 1..];
                    }
                    None => {
                        result.push('{');
                        rest = after;
                    }
                },
                None => {
                    result.push_str(&rest[open..]);
                    rest = "";
                }
            }
        }

        result.push_str(rest);
        result
    }

    /// Substitute variables in every argument.
    pub fn substitute_all(&self, args: &[String]) -> Vec<String> {
        args.iter().map(|arg| self.substitute(arg)).collect()
    }
}

/// `path` as text for an encoder argument.
///
/// Lossy conversion would hand the encoder a file that does not exist.
pub(crate) fn path_str(path: &Path) -> Result<&str> {
    path.to_str().ok_or_else(|| {
        Error::InvalidInput(format!("path is not valid UTF-8: {}", path.display()))
    })
}
