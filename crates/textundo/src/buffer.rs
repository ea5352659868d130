#![forbid(unsafe_code)]

//! The text buffer contract consumed by edit commands.
//!
//! Commands never hold a reference to the text they edit. They receive a
//! `&mut dyn BufferContext` for the duration of a single `execute` or `undo`
//! call, read the current text, compute the replacement, and write it back
//! with exactly one [`BufferContext::replace_text`] call.
//!
//! # Offsets
//!
//! Every position in this crate is a **char offset** (count of Unicode scalar
//! values from the start of the text). Use [`byte_offset`] to turn one into a
//! slice index and [`clamp_offset`] to pull an arbitrary offset back into the
//! valid `[0, char_len]` range.

use thiserror::Error;

/// Reasons a host may refuse a buffer write.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BufferError {
    /// The buffer does not accept writes.
    #[error("buffer is read-only")]
    ReadOnly,
    /// The host rejected the write for its own reason.
    #[error("buffer rejected write: {0}")]
    Rejected(String),
}

/// Minimal capability a host exposes to edit commands.
///
/// The host owns the authoritative text and cursor. Implementations should
/// treat `replace_text` as a single atomic assignment: either the whole new
/// text becomes current, or an error is returned and nothing changes.
pub trait BufferContext {
    /// Current text.
    fn text(&self) -> &str;

    /// Replace the whole text.
    fn replace_text(&mut self, text: String) -> Result<(), BufferError>;

    /// Move the cursor to a char offset.
    fn set_cursor(&mut self, offset: usize);

    /// Length of the current text in chars.
    fn char_len(&self) -> usize {
        char_len(self.text())
    }
}

/// Number of chars in `text`.
#[inline]
#[must_use]
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Byte index of the char at `offset`, or `text.len()` past the end.
#[must_use]
pub fn byte_offset(text: &str, offset: usize) -> usize {
    text.char_indices()
        .nth(offset)
        .map_or(text.len(), |(idx, _)| idx)
}

/// Clamp a char offset into `[0, char_len(text)]`.
#[inline]
#[must_use]
pub fn clamp_offset(text: &str, offset: usize) -> usize {
    offset.min(char_len(text))
}

/// A `String`-backed buffer with a cursor.
///
/// This is the reference host used by tests and by embedders that do not
/// need their own storage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextBuffer {
    text: String,
    cursor: usize,
    read_only: bool,
}

impl TextBuffer {
    /// Create a buffer holding `text` with the cursor at the start.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            cursor: 0,
            read_only: false,
        }
    }

    /// Current cursor offset in chars.
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Whether writes are refused.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Toggle read-only mode. A read-only buffer fails every
    /// `replace_text` with [`BufferError::ReadOnly`].
    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    /// Consume the buffer and return its text.
    #[must_use]
    pub fn into_text(self) -> String {
        self.text
    }
}

impl BufferContext for TextBuffer {
    fn text(&self) -> &str {
        &self.text
    }

    fn replace_text(&mut self, text: String) -> Result<(), BufferError> {
        if self.read_only {
            return Err(BufferError::ReadOnly);
        }
        self.text = text;
        self.cursor = self.cursor.min(char_len(&self.text));
        Ok(())
    }

    fn set_cursor(&mut self, offset: usize) {
        self.cursor = clamp_offset(&self.text, offset);
    }
}

// ============================================================================
// Tests
// ============================================================================
