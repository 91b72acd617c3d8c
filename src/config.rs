//! Formatter and locator configuration.
//!
//! Both annotated and standalone mode share one [`FormatConfig`]. The
//! optional `octoquery.toml` file looks like:
//!
//! ```toml
//! [format]
//! indent_width = 4
//! keyword_case = "upper"
//! max_line_width = 100
//! one_join_per_line = true
//!
//! [annotations]
//! names = ["Query", "NativeQuery"]
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{OctoError, OctoResult};

pub const CONFIG_FILE_NAME: &str = "octoquery.toml";

/// Casing applied to SQL/JPQL keywords in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeywordCase {
    /// Keep keywords as written.
    Preserve,
    #[default]
    Upper,
    Lower,
}

impl KeywordCase {
    pub fn apply(self, word: &str) -> String {
        match self {
            KeywordCase::Preserve => word.to_string(),
            KeywordCase::Upper => word.to_uppercase(),
            KeywordCase::Lower => word.to_lowercase(),
        }
    }
}

/// Layout rules for the pretty printer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatConfig {
    pub indent_width: usize,
    pub keyword_case: KeywordCase,
    /// Soft wrap target; decides whether single items stay on the keyword line.
    pub max_line_width: usize,
    pub one_join_per_line: bool,
    /// Java only: rewrite single `"..."` literals that become multi-line as text blocks.
    pub promote_text_blocks: bool,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            indent_width: 4,
            keyword_case: KeywordCase::Upper,
            max_line_width: 100,
            one_join_per_line: true,
            promote_text_blocks: false,
        }
    }
}

impl FormatConfig {
    pub fn validate(&self) -> OctoResult<()> {
        if self.indent_width == 0 {
            return Err(OctoError::Config("indent_width must be greater than 0".into()));
        }
        if self.max_line_width == 0 {
            return Err(OctoError::Config("max_line_width must be greater than 0".into()));
        }
        Ok(())
    }

    pub(crate) fn indent(&self, level: usize) -> String {
        " ".repeat(self.indent_width * level)
    }
}

/// Which annotations hold query text and where their query argument lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationSet {
    /// Recognized annotation names, simple or qualified.
    pub names: Vec<String>,
    /// Annotations whose query is always native SQL.
    pub native: Vec<String>,
    /// Named arguments that may carry the query when it is not positional.
    pub attributes: Vec<String>,
}

impl Default for AnnotationSet {
    fn default() -> Self {
        Self {
            names: vec!["Query".into(), "NativeQuery".into()],
            native: vec!["NativeQuery".into()],
            attributes: vec!["value".into(), "query".into(), "sql".into()],
        }
    }
}

fn simple_name(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

impl AnnotationSet {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Match by simple name, so `@Query` and `@org.example.Query` both hit `Query`.
    pub fn recognizes(&self, written: &str) -> bool {
        let written = simple_name(written);
        self.names.iter().any(|n| simple_name(n) == written)
    }

    pub fn is_native(&self, written: &str) -> bool {
        let written = simple_name(written);
        self.native.iter().any(|n| simple_name(n) == written)
    }

    pub fn is_query_attribute(&self, name: &str) -> bool {
        self.attributes.iter().any(|a| a == name)
    }
}

/// Contents of `octoquery.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub format: FormatConfig,
    pub annotations: AnnotationSet,
}

impl ConfigFile {
    pub fn parse(content: &str) -> OctoResult<Self> {
        let config: ConfigFile =
            toml::from_str(content).map_err(|e| OctoError::Config(e.to_string()))?;
        config.format.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> OctoResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Explicit path first, then `./octoquery.toml`, then the user config dir.
    pub fn discover(explicit: Option<&Path>) -> OctoResult<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        for candidate in Self::candidates() {
            if candidate.is_file() {
                tracing::debug!(path = %candidate.display(), "loading config");
                return Self::load(&candidate);
            }
        }
        Ok(Self::default())
    }

    fn candidates() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(CONFIG_FILE_NAME)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("octoquery").join("config.toml"));
        }
        paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FormatConfig::default();
        assert_eq!(config.indent_width, 4);
        assert_eq!(config.keyword_case, KeywordCase::Upper);
        assert!(config.one_join_per_line);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_file() {
        let config = ConfigFile::parse(
            r#"
            [format]
            indent_width = 2
            keyword_case = "lower"

            [annotations]
            names = ["Query", "com.acme.Sql"]
            "#,
        )
        .unwrap();
        assert_eq!(config.format.indent_width, 2);
        assert_eq!(config.format.keyword_case, KeywordCase::Lower);
        assert_eq!(config.format.max_line_width, 100);
        assert!(config.annotations.recognizes("Sql"));
        assert_eq!(config.annotations.attributes, AnnotationSet::default().attributes);
    }

    #[test]
    fn test_rejects_zero_indent() {
        let err = ConfigFile::parse("[format]\nindent_width = 0\n").unwrap_err();
        assert!(matches!(err, OctoError::Config(_)));
    }

    #[test]
    fn test_recognizes_qualified_names() {
        let set = AnnotationSet::default();
        assert!(set.recognizes("Query"));
        assert!(set.recognizes("org.springframework.data.jpa.repository.Query"));
        assert!(!set.recognizes("Modifying"));
        assert!(set.is_native("NativeQuery"));
        assert!(!set.is_native("Query"));
    }

    #[test]
    fn test_keyword_case() {
        assert_eq!(KeywordCase::Upper.apply("select"), "SELECT");
        assert_eq!(KeywordCase::Lower.apply("SeLeCt"), "select");
        assert_eq!(KeywordCase::Preserve.apply("SeLeCt"), "SeLeCt");
    }
}
