//! Extraction options.

/// Options for [`LoadedArchive::extract_all`](super::LoadedArchive::extract_all).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Recurse into embedded containers, producing a folder tree that
    /// rebuilds to the original bytes.
    pub nested: bool,
    /// Give wave and stream payloads their true extension in flat mode.
    ///
    /// Nested extraction always guesses for archive entries and never for
    /// bundle chunks.
    pub guess_extensions: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            nested: false,
            guess_extensions: true,
        }
    }
}

impl ExtractOptions {
    /// Creates extraction options with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets nested extraction.
    pub fn nested(mut self, nested: bool) -> Self {
        self.nested = nested;
        self
    }

    /// Sets extension guessing for flat extraction.
    pub fn guess_extensions(mut self, guess: bool) -> Self {
        self.guess_extensions = guess;
        self
    }
}
