//! YAML front matter parsing.
//!
//! Front matter format:
//! ```text
//! ---
//! tags: [rust, architecture]
//! aliases: [Plan]
//! ---
//! The actual note content here.
//! ```

use crate::{Error, Result};

/// Parser for YAML front matter in note content.
pub struct FrontMatter;

impl FrontMatter {
    /// The front matter delimiter.
    const DELIMITER: &'static str = "---";

    /// Splits content into raw YAML and body.
    ///
    /// Returns `None` when the content has no complete front matter block.
    #[must_use]
    pub fn split(content: &str) -> Option<(&str, &str)> {
        let rest = content
            .strip_prefix(Self::DELIMITER)?
            .strip_prefix('\n')
            .or_else(|| {
                content
                    .strip_prefix(Self::DELIMITER)
                    .and_then(|r| r.strip_prefix("\r\n"))
            })?;

        let mut offset = 0;
        for line in rest.split_inclusive('\n') {
            if line.trim_end() == Self::DELIMITER {
                let yaml = &rest[..offset];
                let body = &rest[offset + line.len()..];
                return Some((yaml, body));
            }
            offset += line.len();
        }
        None
    }

    /// Parses YAML front matter from content.
    ///
    /// Returns the parsed metadata and remaining body. Content without front
    /// matter yields an empty object and the original content.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is malformed.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use notecog::markdown::FrontMatter;
    ///
    /// let content = "---\ntags: [rust]\n---\nActual content";
    /// let (metadata, body) = FrontMatter::parse(content).unwrap();
    /// assert_eq!(metadata["tags"][0], "rust");
    /// assert_eq!(body, "Actual content");
    /// ```
    pub fn parse(content: &str) -> Result<(serde_json::Value, &str)> {
        let Some((yaml, body)) = Self::split(content) else {
            return Ok((serde_json::Value::Object(serde_json::Map::new()), content));
        };

        if yaml.trim().is_empty() {
            return Ok((serde_json::Value::Object(serde_json::Map::new()), body));
        }

        let metadata: serde_json::Value = serde_yaml_ng::from_str(yaml)
            .map_err(|e| Error::InvalidInput(format!("Invalid YAML front matter: {e}")))?;

        Ok((metadata, body))
    }

    /// Extracts just the body content without parsing metadata.
    #[must_use]
    pub fn body(content: &str) -> &str {
        Self::split(content).map_or(content, |(_, body)| body)
    }
}
