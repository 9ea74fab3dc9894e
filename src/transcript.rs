//! Ordered transcript of finalized and in-progress lines.
//!
//! The log is append-only at phrase boundaries; between boundaries only the
//! last line is rewritten as the engine re-recognizes the growing clip. At
//! most one line is ever mutable: the last one.

/// One line of the transcript, copied out of the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptLine {
    /// Position in the log, starting at 0.
    pub index: usize,
    pub text: String,
}

/// Mutable sequence of transcript lines with single-writer semantics.
///
/// Only the pipeline driver writes to the log, so no locking is required.
#[derive(Debug, Default)]
pub struct TranscriptLog {
    lines: Vec<String>,
}

impl TranscriptLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Closes the current last line permanently and opens a new one.
    ///
    /// Used when a phrase boundary was declared.
    pub fn append_new(&mut self, text: impl Into<String>) {
        self.lines.push(text.into());
    }

    /// Overwrites the open last line in place.
    ///
    /// Used while a phrase is still being extended. Calling this on an empty
    /// log creates the first line, so initialization needs no special case in
    /// the driver.
    pub fn revise_last(&mut self, text: impl Into<String>) {
        match self.lines.last_mut() {
            Some(last) => *last = text.into(),
            None => self.lines.push(text.into()),
        }
    }

    /// Returns all lines in order as an immutable copy.
    pub fn snapshot(&self) -> Vec<TranscriptLine> {
        self.lines
            .iter()
            .enumerate()
            .map(|(index, text)| TranscriptLine {
                index,
                text: text.clone(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Full console view, one line per entry.
    pub fn render(&self) -> String {
        self.lines.join("\n")
    }
}
