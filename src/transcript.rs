//! In-memory transcript buffer with save-to-file support.

use crate::error::Result;
use std::path::Path;

/// Holds the caption text currently on display.
///
/// The buffer is replaced wholesale by each display update rather than
/// appended to: a partial result supersedes the previous partial for the
/// same utterance, and the recognition pipeline already resolves which
/// text wins.
#[derive(Debug, Default)]
pub struct Transcript {
    text: String,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the displayed text.
    pub fn set(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Character count as shown to the user, not a byte count.
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    pub fn clear(&mut self) {
        self.text.clear();
    }

    /// Write the transcript to a file as UTF-8.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.text.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_replaces_rather_than_appends() {
        let mut transcript = Transcript::new();
        transcript.set("hello wor");
        transcript.set("hello world");
        assert_eq!(transcript.text(), "hello world");
    }

    #[test]
    fn char_count_is_characters_not_bytes() {
        let mut transcript = Transcript::new();
        transcript.set("テスト");
        assert_eq!(transcript.char_count(), 3);
        assert_eq!(transcript.text().len(), 9);
    }

    #[test]
    fn clear_empties_the_buffer() {
        let mut transcript = Transcript::new();
        transcript.set("something");
        transcript.clear();
        assert!(transcript.is_empty());
        assert_eq!(transcript.char_count(), 0);
    }

    #[test]
    fn save_writes_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transcript.txt");

        let mut transcript = Transcript::new();
        transcript.set("caption 日本語\n");
        transcript.save(&path).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "caption 日本語\n");
    }
}
