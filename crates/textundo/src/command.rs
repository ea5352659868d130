#![forbid(unsafe_code)]

//! Reversible text edit commands.
//!
//! The command set is closed: [`InsertText`], [`DeleteText`] and
//! [`ReplaceText`], unified by the [`EditCommand`] enum that the history
//! stores. All three implement the [`Edit`] capability trait.
//!
//! # Invariants
//!
//! - `execute()` followed by `undo()` restores the prior text exactly.
//! - `undo()` followed by `execute()` restores the executed text and cursor exactly.
//! - Inverse data (the removed text and the clamped range) is captured from
//!   the buffer at execute time, never at undo time.
//! - A command performs at most one `replace_text` per call, so a refused
//!   write leaves both the buffer and the command state untouched.
//!
//! # Failure Modes
//!
//! - **Refused write**: the host returns a [`BufferError`]; surfaced as
//!   [`CommandError::Buffer`].
//! - **Out-of-order use**: executing an applied command or undoing one that
//!   is not applied fails with [`CommandError::AlreadyApplied`] or
//!   [`CommandError::NotApplied`].
//! - **Out-of-range positions**: never an error; offsets are clamped into
//!   `[0, char_len]` and reversed ranges are normalised.

use std::fmt;

use thiserror::Error;

use crate::buffer::{BufferContext, BufferError, byte_offset, char_len, clamp_offset};

#[cfg(feature = "config-files")]
use serde::{Deserialize, Serialize};

/// Longest text excerpt quoted in a command description.
const DESCRIPTION_PREVIEW_CHARS: usize = 24;

/// Source of a command - who/what triggered it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "config-files", derive(Serialize, Deserialize))]
pub enum CommandSource {
    /// Direct user action (keyboard, mouse).
    #[default]
    User,
    /// Triggered programmatically by application code.
    Programmatic,
    /// Replayed from a recorded macro.
    Macro,
    /// Triggered by an external system/API.
    External,
}

impl fmt::Display for CommandSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::User => "user",
            Self::Programmatic => "programmatic",
            Self::Macro => "macro",
            Self::External => "external",
        };
        f.write_str(name)
    }
}

/// Metadata attached to every command for history listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandMetadata {
    /// Human-readable description (e.g. `Insert "a" at 3`).
    pub description: String,
    /// Who/what triggered the command.
    pub source: CommandSource,
}

impl CommandMetadata {
    /// Create new metadata with the given description.
    #[must_use]
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            source: CommandSource::User,
        }
    }

    /// Set the command source.
    #[must_use]
    pub fn with_source(mut self, source: CommandSource) -> Self {
        self.source = source;
        self
    }

    /// Size in bytes for memory accounting.
    #[must_use]
    pub fn size_bytes(&self) -> usize {
        std::mem::size_of::<Self>() + self.description.len()
    }
}

/// Result of command execution or undo.
pub type CommandResult = Result<(), CommandError>;

/// Errors that can occur during command execution or undo.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// The buffer refused the write.
    #[error(transparent)]
    Buffer(#[from] BufferError),
    /// `execute` was called on a command whose effect is already applied.
    #[error("command is already applied")]
    AlreadyApplied,
    /// `undo` was called on a command whose effect is not applied.
    #[error("command is not applied")]
    NotApplied,
}

/// A reversible edit over a [`BufferContext`].
pub trait Edit {
    /// Apply the edit. Called once on first execution and again on redo.
    fn execute(&mut self, buffer: &mut dyn BufferContext) -> CommandResult;

    /// Apply the exact inverse of the most recent `execute`.
    fn undo(&mut self, buffer: &mut dyn BufferContext) -> CommandResult;

    /// Whether the edit is reversible at all.
    fn can_undo(&self) -> bool {
        true
    }

    /// Get the command metadata.
    fn metadata(&self) -> &CommandMetadata;

    /// Human-readable description for history listings.
    fn description(&self) -> &str {
        &self.metadata().description
    }

    /// Whether the effect of this edit is currently in the buffer.
    fn is_applied(&self) -> bool;

    /// Size of this command in bytes for memory budgeting.
    fn size_bytes(&self) -> usize;
}

// ============================================================================
// Text helpers
// ============================================================================

/// Text between two char offsets. Offsets must already be clamped.
fn char_slice(text: &str, start: usize, end: usize) -> &str {
    &text[byte_offset(text, start)..byte_offset(text, end)]
}

/// `text` with the char range `[start, end)` replaced by `insert`.
fn splice(text: &str, start: usize, end: usize, insert: &str) -> String {
    let start = byte_offset(text, start);
    let end = byte_offset(text, end);
    let mut out = String::with_capacity(text.len() - (end - start) + insert.len());
    out.push_str(&text[..start]);
    out.push_str(insert);
    out.push_str(&text[end..]);
    out
}

/// Clamp both ends into the text and order them.
fn normalize_range(text: &str, start: usize, end: usize) -> (usize, usize) {
    let start = clamp_offset(text, start);
    let end = clamp_offset(text, end);
    (start.min(end), start.max(end))
}

fn preview(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(DESCRIPTION_PREVIEW_CHARS).collect();
    let mut out = head.escape_debug().to_string();
    if chars.next().is_some() {
        out.push('…');
    }
    out
}

/// Range and text captured at execute time.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Captured {
    start: usize,
    end: usize,
    text: String,
}

// ============================================================================
// InsertText
// ============================================================================

/// Insert `text` at a char position.
///
/// The cursor ends after the inserted text. Undo removes exactly the
/// inserted chars and puts the cursor back at the insertion point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertText {
    text: String,
    position: usize,
    metadata: CommandMetadata,
    /// Clamped position of the applied insertion.
    applied_at: Option<usize>,
}

impl InsertText {
    /// Create a new insert command.
    #[must_use]
    pub fn new(text: impl Into<String>, position: usize) -> Self {
        let text = text.into();
        let metadata = CommandMetadata::new(format!("Insert \"{}\" at {position}", preview(&text)));
        Self {
            text,
            position,
            metadata,
            applied_at: None,
        }
    }

    /// Set the command source.
    #[must_use]
    pub fn with_source(mut self, source: CommandSource) -> Self {
        self.metadata.source = source;
        self
    }

    /// Text to insert.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Requested insertion position.
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }
}

impl Edit for InsertText {
    fn execute(&mut self, buffer: &mut dyn BufferContext) -> CommandResult {
        if self.applied_at.is_some() {
            return Err(CommandError::AlreadyApplied);
        }
        let current = buffer.text();
        let position = clamp_offset(current, self.position);
        let updated = splice(current, position, position, &self.text);

        buffer.replace_text(updated)?;
        buffer.set_cursor(position + char_len(&self.text));
        self.applied_at = Some(position);
        Ok(())
    }

    fn undo(&mut self, buffer: &mut dyn BufferContext) -> CommandResult {
        let Some(position) = self.applied_at else {
            return Err(CommandError::NotApplied);
        };
        let current = buffer.text();
        let end = clamp_offset(current, position + char_len(&self.text));
        let updated = splice(current, position, end, "");

        buffer.replace_text(updated)?;
        buffer.set_cursor(position);
        self.applied_at = None;
        Ok(())
    }

    fn metadata(&self) -> &CommandMetadata {
        &self.metadata
    }

    fn is_applied(&self) -> bool {
        self.applied_at.is_some()
    }

    fn size_bytes(&self) -> usize {
        std::mem::size_of::<Self>() + self.text.len() + self.metadata.size_bytes()
    }
}

// ============================================================================
// DeleteText
// ============================================================================

/// Delete the char range `[start, end)`.
///
/// The removed text is read from the buffer before the write and kept for
/// undo, which reinserts it at `start` and puts the cursor at `end`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteText {
    start: usize,
    end: usize,
    metadata: CommandMetadata,
    captured: Option<Captured>,
    applied: bool,
}

impl DeleteText {
    /// Create a new delete command.
    #[must_use]
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start,
            end,
            metadata: CommandMetadata::new(format!("Delete {start}..{end}")),
            captured: None,
            applied: false,
        }
    }

    /// Set the command source.
    #[must_use]
    pub fn with_source(mut self, source: CommandSource) -> Self {
        self.metadata.source = source;
        self
    }

    /// Requested range start.
    #[must_use]
    pub fn start(&self) -> usize {
        self.start
    }

    /// Requested range end.
    #[must_use]
    pub fn end(&self) -> usize {
        self.end
    }

    /// Text removed by the most recent execute, if it ever ran.
    #[must_use]
    pub fn captured_text(&self) -> Option<&str> {
        self.captured.as_ref().map(|c| c.text.as_str())
    }
}

impl Edit for DeleteText {
    fn execute(&mut self, buffer: &mut dyn BufferContext) -> CommandResult {
        if self.applied {
            return Err(CommandError::AlreadyApplied);
        }
        let current = buffer.text();
        let (start, end) = normalize_range(current, self.start, self.end);
        let removed = char_slice(current, start, end).to_string();
        let updated = splice(current, start, end, "");

        buffer.replace_text(updated)?;
        buffer.set_cursor(start);
        self.captured = Some(Captured {
            start,
            end,
            text: removed,
        });
        self.applied = true;
        Ok(())
    }

    fn undo(&mut self, buffer: &mut dyn BufferContext) -> CommandResult {
        let Some(captured) = self.captured.as_ref().filter(|_| self.applied) else {
            return Err(CommandError::NotApplied);
        };
        let current = buffer.text();
        let start = clamp_offset(current, captured.start);
        let updated = splice(current, start, start, &captured.text);

        buffer.replace_text(updated)?;
        buffer.set_cursor(captured.end);
        self.applied = false;
        Ok(())
    }

    fn metadata(&self) -> &CommandMetadata {
        &self.metadata
    }

    fn is_applied(&self) -> bool {
        self.applied
    }

    fn size_bytes(&self) -> usize {
        std::mem::size_of::<Self>()
            + self.captured.as_ref().map_or(0, |c| c.text.len())
            + self.metadata.size_bytes()
    }
}

// ============================================================================
// ReplaceText
// ============================================================================

/// Replace the char range `[start, end)` with `new_text`.
///
/// The overwritten text is captured before the write. The cursor ends after
/// the new text; undo restores the old text and puts the cursor at `start`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplaceText {
    new_text: String,
    start: usize,
    end: usize,
    metadata: CommandMetadata,
    captured: Option<Captured>,
    applied: bool,
}

impl ReplaceText {
    /// Create a new replace command.
    #[must_use]
    pub fn new(start: usize, end: usize, new_text: impl Into<String>) -> Self {
        let new_text = new_text.into();
        let metadata =
            CommandMetadata::new(format!("Replace {start}..{end} with \"{}\"", preview(&new_text)));
        Self {
            new_text,
            start,
            end,
            metadata,
            captured: None,
            applied: false,
        }
    }

    /// Set the command source.
    #[must_use]
    pub fn with_source(mut self, source: CommandSource) -> Self {
        self.metadata.source = source;
        self
    }

    /// Replacement text.
    #[must_use]
    pub fn new_text(&self) -> &str {
        &self.new_text
    }

    /// Requested range start.
    #[must_use]
    pub fn start(&self) -> usize {
        self.start
    }

    /// Requested range end.
    #[must_use]
    pub fn end(&self) -> usize {
        self.end
    }

    /// Text overwritten by the most recent execute, if it ever ran.
    #[must_use]
    pub fn captured_text(&self) -> Option<&str> {
        self.captured.as_ref().map(|c| c.text.as_str())
    }
}

impl Edit for ReplaceText {
    fn execute(&mut self, buffer: &mut dyn BufferContext) -> CommandResult {
        if self.applied {
            return Err(CommandError::AlreadyApplied);
        }
        let current = buffer.text();
        let (start, end) = normalize_range(current, self.start, self.end);
        let replaced = char_slice(current, start, end).to_string();
        let updated = splice(current, start, end, &self.new_text);

        buffer.replace_text(updated)?;
        buffer.set_cursor(start + char_len(&self.new_text));
        self.captured = Some(Captured {
            start,
            end,
            text: replaced,
        });
        self.applied = true;
        Ok(())
    }

    fn undo(&mut self, buffer: &mut dyn BufferContext) -> CommandResult {
        let Some(captured) = self.captured.as_ref().filter(|_| self.applied) else {
            return Err(CommandError::NotApplied);
        };
        let current = buffer.text();
        let start = clamp_offset(current, captured.start);
        let end = clamp_offset(current, start + char_len(&self.new_text));
        let updated = splice(current, start, end, &captured.text);

        buffer.replace_text(updated)?;
        buffer.set_cursor(start);
        self.applied = false;
        Ok(())
    }

    fn metadata(&self) -> &CommandMetadata {
        &self.metadata
    }

    fn is_applied(&self) -> bool {
        self.applied
    }

    fn size_bytes(&self) -> usize {
        std::mem::size_of::<Self>()
            + self.new_text.len()
            + self.captured.as_ref().map_or(0, |c| c.text.len())
            + self.metadata.size_bytes()
    }
}

// ============================================================================
// EditCommand
// ============================================================================

/// The closed set of commands the history stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditCommand {
    Insert(InsertText),
    Delete(DeleteText),
    Replace(ReplaceText),
}

impl EditCommand {
    /// Shorthand for [`InsertText::new`].
    #[must_use]
    pub fn insert(text: impl Into<String>, position: usize) -> Self {
        Self::Insert(InsertText::new(text, position))
    }

    /// Shorthand for [`DeleteText::new`].
    #[must_use]
    pub fn delete(start: usize, end: usize) -> Self {
        Self::Delete(DeleteText::new(start, end))
    }

    /// Shorthand for [`ReplaceText::new`].
    #[must_use]
    pub fn replace(start: usize, end: usize, new_text: impl Into<String>) -> Self {
        Self::Replace(ReplaceText::new(start, end, new_text))
    }

    /// Short name of the variant, used in log fields.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Insert(_) => "insert",
            Self::Delete(_) => "delete",
            Self::Replace(_) => "replace",
        }
    }

    fn as_edit(&self) -> &dyn Edit {
        match self {
            Self::Insert(cmd) => cmd,
            Self::Delete(cmd) => cmd,
            Self::Replace(cmd) => cmd,
        }
    }

    fn as_edit_mut(&mut self) -> &mut dyn Edit {
        match self {
            Self::Insert(cmd) => cmd,
            Self::Delete(cmd) => cmd,
            Self::Replace(cmd) => cmd,
        }
    }
}

impl Edit for EditCommand {
    fn execute(&mut self, buffer: &mut dyn BufferContext) -> CommandResult {
        self.as_edit_mut().execute(buffer)
    }

    fn undo(&mut self, buffer: &mut dyn BufferContext) -> CommandResult {
        self.as_edit_mut().undo(buffer)
    }

    fn can_undo(&self) -> bool {
        self.as_edit().can_undo()
    }

    fn metadata(&self) -> &CommandMetadata {
        self.as_edit().metadata()
    }

    fn is_applied(&self) -> bool {
        self.as_edit().is_applied()
    }

    fn size_bytes(&self) -> usize {
        self.as_edit().size_bytes()
    }
}

impl From<InsertText> for EditCommand {
    fn from(cmd: InsertText) -> Self {
        Self::Insert(cmd)
    }
}

impl From<DeleteText> for EditCommand {
    fn from(cmd: DeleteText) -> Self {
        Self::Delete(cmd)
    }
}

impl From<ReplaceText> for EditCommand {
    fn from(cmd: ReplaceText) -> Self {
        Self::Replace(cmd)
    }
}

// ============================================================================
// Tests
// ============================================================================
