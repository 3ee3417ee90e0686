use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::error::ChatStatsError;

/// Tokens shorter than this are never content words.
pub const MIN_CONTENT_LEN: usize = 3;

fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '\'' | '_' | '-')
}

/// Lazy, restartable token stream over a borrowed text.
///
/// Tokens are maximal runs of ASCII letters, digits, `'`, `_` and `-`,
/// lowercased, in left-to-right order. A clone continues from the current
/// position; call [`tokenize`] again to walk the text from the start.
#[derive(Debug, Clone)]
pub struct Tokens<'a> {
    rest: &'a str,
}

impl<'a> Iterator for Tokens<'a> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let start = self.rest.find(is_token_char)?;
        let tail = &self.rest[start..];
        // token chars are all ASCII, so byte offsets line up
        let end = tail.find(|c: char| !is_token_char(c)).unwrap_or(tail.len());
        self.rest = &tail[end..];
        Some(tail[..end].to_ascii_lowercase())
    }
}

pub fn tokenize(text: &str) -> Tokens<'_> {
    Tokens { rest: text }
}

/// Read-only stop-word set, loaded once at startup and shared by reference.
#[derive(Debug, Clone, Default)]
pub struct StopWords {
    words: HashSet<String>,
}

impl StopWords {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ChatStatsError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ChatStatsError::MissingStopWordFile {
            path: path.to_path_buf(),
            source,
        })?;
        let sw = Self::from_lines(&raw);
        tracing::info!(path = ?path, words = sw.len(), "stop words loaded");
        Ok(sw)
    }

    pub fn from_lines(raw: &str) -> Self {
        let words = raw
            .lines()
            .map(|l| l.trim().to_ascii_lowercase())
            .filter(|l| !l.is_empty())
            .collect();
        Self { words }
    }

    pub fn len(&self) -> usize { self.words.len() }

    pub fn is_empty(&self) -> bool { self.words.is_empty() }

    pub fn is_stop_word(&self, token: &str) -> bool {
        self.words.contains(token)
    }

    pub fn is_content_word(&self, token: &str) -> bool {
        token.len() >= MIN_CONTENT_LEN && !self.is_stop_word(token)
    }
}
