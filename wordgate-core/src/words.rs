//! Secret word matching.
//!
//! Words are stored base64-encoded at rest so they are not readable at a
//! glance in the repository. They are decoded once at startup.

use std::fs;
use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::info;

/// Immutable set of decoded secret words.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WordMatcher {
    words: Vec<String>,
}

impl WordMatcher {
    /// Decode every entry. A single bad entry fails the whole set.
    pub fn decode<I, S>(encoded: I) -> Result<Self, WordsError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut words = Vec::new();
        for (index, entry) in encoded.into_iter().enumerate() {
            let bytes = STANDARD
                .decode(entry.as_ref().trim())
                .map_err(|source| WordsError::Decode { index, source })?;
            let word =
                String::from_utf8(bytes).map_err(|source| WordsError::Utf8 { index, source })?;
            if !words.contains(&word) {
                words.push(word);
            }
        }
        Ok(Self { words })
    }

    /// Read a JSON array of base64 strings from `path` and decode it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, WordsError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| WordsError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let encoded: Vec<String> = serde_json::from_str(&content)?;
        let matcher = Self::decode(encoded)?;
        info!("Loaded {} secret words from {}", matcher.len(), path.display());
        Ok(matcher)
    }

    /// Whether any secret word occurs in `text` (case-sensitive).
    pub fn matches(&self, text: &str) -> bool {
        self.first_match(text).is_some()
    }

    /// The first secret word found in `text`, in load order.
    pub fn first_match(&self, text: &str) -> Option<&str> {
        self.words
            .iter()
            .find(|word| text.contains(word.as_str()))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// Secret word loading errors
#[derive(Debug, thiserror::Error)]
pub enum WordsError {
    #[error("Failed to read secret words file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Secret words file must be a JSON array of strings: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Secret word #{index} is not valid base64: {source}")]
    Decode {
        index: usize,
        #[source]
        source: base64::DecodeError,
    },
    #[error("Secret word #{index} is not valid UTF-8: {source}")]
    Utf8 {
        index: usize,
        #[source]
        source: std::string::FromUtf8Error,
    },
}
