#![forbid(unsafe_code)]

//! Command execution and undo/redo history.
//!
//! [`CommandService`] owns the edited buffer and the history of executed
//! commands. The history is a single ordered sequence plus a cursor that
//! counts how many of its commands are currently applied:
//!
//! - **Branch truncation**: executing after undo drops the redo tail
//! - **Bounded size**: oldest commands evicted beyond `max_history_size`
//! - **Random access**: jump to any history point by stepping undo/redo
//!
//! # Invariants
//!
//! 1. `applied <= commands.len()` (after any operation)
//! 2. Commands `[0, applied)` are applied to the buffer, the rest are not
//! 3. `commands.len() <= config.max_history_size` after every execute and
//!    every config update
//! 4. A failed operation leaves `commands` and `applied` untouched
//!
//! # Memory Model
//!
//! Commands are stored in a `VecDeque` for O(1) eviction from the front.
//!
//! ```text
//! execute(e)                     commands: [a, b, c, d, e]   applied: 5
//! undo() x2                      commands: [a, b, c, d, e]   applied: 3
//! execute(f)  <-- new branch     commands: [a, b, c, f]      applied: 4
//! max_history_size = 3           commands: [b, c, f]         applied: 3
//! ```
//!
//! Evicted commands stay applied in the buffer; eviction only removes the
//! ability to undo past the retained window.

use std::collections::VecDeque;
use std::fmt;

#[cfg(feature = "config-files")]
use serde::{Deserialize, Serialize};

use crate::buffer::BufferContext;
use crate::command::{CommandError, CommandSource, Edit, EditCommand};
use crate::config::{ConfigUpdate, HistoryConfig};

/// Weight applied to description bytes in the memory estimate.
const MEMORY_USAGE_FACTOR: usize = 2;

/// Summary of the history for status displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "config-files", derive(Serialize, Deserialize))]
pub struct HistoryStats {
    /// Number of commands held.
    pub total_commands: usize,
    /// Number of commands currently applied.
    pub current_position: usize,
    pub can_undo: bool,
    pub can_redo: bool,
    /// Rough size estimate for display. Not used for limits.
    pub memory_usage: usize,
}

/// One row of the history listing.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config-files", derive(Serialize, Deserialize))]
pub struct HistoryEntry {
    pub index: usize,
    pub description: String,
    /// Whether the command's effect is currently in the buffer.
    pub executed: bool,
    pub can_undo: bool,
    pub source: CommandSource,
}

/// Executes edit commands against a buffer and keeps them for undo/redo.
///
/// Every public operation reports success as a `bool`; command failures are
/// logged and kept in [`last_error`](Self::last_error) instead of being
/// returned.
pub struct CommandService<B> {
    buffer: B,
    /// Executed commands, oldest first.
    commands: VecDeque<EditCommand>,
    /// Number of leading commands currently applied.
    applied: usize,
    config: HistoryConfig,
    last_error: Option<CommandError>,
}

impl<B> fmt::Debug for CommandService<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandService")
            .field("total_commands", &self.commands.len())
            .field("applied", &self.applied)
            .field("config", &self.config)
            .field("last_error", &self.last_error)
            .finish()
    }
}

impl<B: BufferContext + Default> Default for CommandService<B> {
    fn default() -> Self {
        Self::new(B::default())
    }
}

impl<B: BufferContext> CommandService<B> {
    /// Create a service over `buffer` with the default configuration.
    #[must_use]
    pub fn new(buffer: B) -> Self {
        Self::with_config(buffer, HistoryConfig::default())
    }

    /// Create a service over `buffer` with the given configuration.
    #[must_use]
    pub fn with_config(buffer: B, config: HistoryConfig) -> Self {
        Self {
            buffer,
            commands: VecDeque::new(),
            applied: 0,
            config,
            last_error: None,
        }
    }

    // ========================================================================
    // Buffer access
    // ========================================================================

    /// The edited buffer.
    #[must_use]
    pub fn buffer(&self) -> &B {
        &self.buffer
    }

    /// Mutable access to the edited buffer.
    ///
    /// Edits made here bypass the history. Undo data captured by earlier
    /// commands assumes the text they saw, so clear the history after
    /// changing the text directly.
    pub fn buffer_mut(&mut self) -> &mut B {
        &mut self.buffer
    }

    /// Consume the service and return the buffer.
    #[must_use]
    pub fn into_buffer(self) -> B {
        self.buffer
    }

    // ========================================================================
    // Core Operations
    // ========================================================================

    /// Execute a command and record it.
    ///
    /// On failure the command is dropped and the history is unchanged. On
    /// success any redo tail is discarded, the command is appended and the
    /// size bound is enforced.
    pub fn execute_command(&mut self, command: impl Into<EditCommand>) -> bool {
        let mut command = command.into();
        let _span = tracing::debug_span!("history.execute", kind = command.kind()).entered();

        if let Err(err) = command.execute(&mut self.buffer) {
            tracing::warn!(
                target: "textundo.history",
                kind = command.kind(),
                error = %err,
                "command execution failed"
            );
            self.last_error = Some(err);
            return false;
        }

        let truncated = self.applied < self.commands.len();
        if truncated {
            let dropped = self.commands.len() - self.applied;
            self.commands.truncate(self.applied);
            tracing::trace!(target: "textundo.history", dropped, "redo branch discarded");
        }

        tracing::debug!(
            target: "textundo.history",
            description = command.description(),
            position = self.applied,
            "command executed"
        );
        self.commands.push_back(command);
        self.applied += 1;
        self.last_error = None;

        let evicted = self.enforce_limit();
        if truncated || evicted {
            self.release_spare_capacity();
        }
        true
    }

    /// Undo the most recently applied command.
    ///
    /// Returns `false` without changing anything when there is nothing to
    /// undo or the command's undo fails.
    pub fn undo(&mut self) -> bool {
        if !self.can_undo() {
            return false;
        }
        let index = self.applied - 1;
        let _span = tracing::debug_span!("history.undo", index).entered();

        let command = &mut self.commands[index];
        match command.undo(&mut self.buffer) {
            Ok(()) => {
                tracing::debug!(
                    target: "textundo.history",
                    description = command.description(),
                    "command undone"
                );
                self.applied = index;
                self.last_error = None;
                true
            }
            Err(err) => {
                tracing::warn!(
                    target: "textundo.history",
                    description = command.description(),
                    error = %err,
                    "undo failed"
                );
                self.last_error = Some(err);
                false
            }
        }
    }

    /// Re-execute the next undone command.
    ///
    /// Returns `false` without changing anything when there is nothing to
    /// redo or the command fails.
    pub fn redo(&mut self) -> bool {
        if !self.can_redo() {
            return false;
        }
        let index = self.applied;
        let _span = tracing::debug_span!("history.redo", index).entered();

        let command = &mut self.commands[index];
        match command.execute(&mut self.buffer) {
            Ok(()) => {
                tracing::debug!(
                    target: "textundo.history",
                    description = command.description(),
                    "command redone"
                );
                self.applied = index + 1;
                self.last_error = None;
                true
            }
            Err(err) => {
                tracing::warn!(
                    target: "textundo.history",
                    description = command.description(),
                    error = %err,
                    "redo failed"
                );
                self.last_error = Some(err);
                false
            }
        }
    }

    /// Check if undo is available.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.current_command().is_some_and(Edit::can_undo)
    }

    /// Check if redo is available.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.applied < self.commands.len()
    }

    /// Move to a history point by stepping undo or redo one command at a time.
    ///
    /// `None` targets the state before the first held command, `Some(i)`
    /// the state right after command `i`. An out-of-range target returns
    /// `false` untouched. If a step fails the service stays at the position
    /// reached so far and `false` is returned.
    pub fn jump_to_history_point(&mut self, target: Option<usize>) -> bool {
        let target_applied = match target {
            None => 0,
            Some(index) if index < self.commands.len() => index + 1,
            Some(_) => return false,
        };
        let _span = tracing::debug_span!("history.jump", from = self.applied, to = target_applied)
            .entered();

        while self.applied > target_applied {
            if !self.undo() {
                return false;
            }
        }
        while self.applied < target_applied {
            if !self.redo() {
                return false;
            }
        }
        true
    }

    // ========================================================================
    // Info
    // ========================================================================

    /// Index of the last applied command (`None` when nothing is applied).
    #[must_use]
    pub fn current_index(&self) -> Option<usize> {
        self.applied.checked_sub(1)
    }

    /// Number of commands held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether the history holds no commands.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Error from the most recent failed command, cleared by the next success.
    #[must_use]
    pub fn last_error(&self) -> Option<&CommandError> {
        self.last_error.as_ref()
    }

    /// Get the description of the next undo command.
    #[must_use]
    pub fn next_undo_description(&self) -> Option<&str> {
        self.current_command().map(Edit::description)
    }

    /// Get the description of the next redo command.
    #[must_use]
    pub fn next_redo_description(&self) -> Option<&str> {
        self.commands.get(self.applied).map(Edit::description)
    }

    /// Summary counts for status displays.
    #[must_use]
    pub fn history_stats(&self) -> HistoryStats {
        HistoryStats {
            total_commands: self.commands.len(),
            current_position: self.applied,
            can_undo: self.can_undo(),
            can_redo: self.can_redo(),
            memory_usage: self.memory_usage(),
        }
    }

    /// Every held command in execution order.
    #[must_use]
    pub fn history_list(&self) -> Vec<HistoryEntry> {
        self.commands
            .iter()
            .enumerate()
            .map(|(index, command)| HistoryEntry {
                index,
                description: command.description().to_string(),
                executed: index < self.applied,
                can_undo: command.can_undo(),
                source: command.metadata().source,
            })
            .collect()
    }

    /// Heuristic memory estimate: description bytes times a small factor.
    #[must_use]
    pub fn memory_usage(&self) -> usize {
        self.commands
            .iter()
            .map(|c| c.description().len() * MEMORY_USAGE_FACTOR)
            .sum()
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    /// Get the current configuration.
    #[must_use]
    pub fn config(&self) -> HistoryConfig {
        self.config
    }

    /// Merge a partial update. A new history bound applies immediately.
    pub fn update_config(&mut self, update: ConfigUpdate) {
        self.config.apply(&update);
        tracing::debug!(target: "textundo.history", config = ?self.config, "config updated");
        if update.max_history_size.is_some() && self.enforce_limit() {
            self.release_spare_capacity();
        }
    }

    // ========================================================================
    // Maintenance
    // ========================================================================

    /// Forget all history. The buffer keeps its current text.
    pub fn clear_history(&mut self) {
        self.commands.clear();
        self.applied = 0;
        self.release_spare_capacity();
        tracing::debug!(target: "textundo.history", "history cleared");
    }

    fn current_command(&self) -> Option<&EditCommand> {
        self.current_index().and_then(|index| self.commands.get(index))
    }

    /// Evict the oldest commands beyond the configured bound.
    ///
    /// Returns whether anything was evicted.
    fn enforce_limit(&mut self) -> bool {
        let max = self.config.max_history_size;
        if self.commands.len() <= max {
            return false;
        }
        let overflow = self.commands.len() - max;
        self.commands.drain(..overflow);
        self.applied = self.applied.saturating_sub(overflow);
        tracing::trace!(
            target: "textundo.history",
            evicted = overflow,
            retained = self.commands.len(),
            "oldest commands evicted"
        );
        true
    }

    fn release_spare_capacity(&mut self) {
        if self.config.enable_memory_optimization
            && self.commands.capacity() > self.commands.len() * 2
        {
            self.commands.shrink_to_fit();
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{BufferError, TextBuffer};
    use crate::command::{DeleteText, InsertText, ReplaceText};

    fn service(text: &str) -> CommandService<TextBuffer> {
        CommandService::new(TextBuffer::new(text))
    }

    fn text(svc: &CommandService<TextBuffer>) -> &str {
        svc.buffer().text()
    }

    /// Append `n` single-digit inserts ("1", "2", ...) at the end.
    fn append_digits(svc: &mut CommandService<TextBuffer>, n: usize) {
        for i in 1..=n {
            let at = svc.buffer().char_len();
            assert!(svc.execute_command(InsertText::new(i.to_string(), at)));
        }
    }

    #[test]
    fn new_service_is_empty() {
        let svc = service("");
        assert!(svc.is_empty());
        assert_eq!(svc.current_index(), None);
        assert!(!svc.can_undo());
        assert!(!svc.can_redo());
        assert_eq!(svc.last_error(), None);
    }

    #[test]
    fn execute_enables_undo() {
        let mut svc = service("");
        assert!(svc.execute_command(InsertText::new("Hello", 0)));
        assert_eq!(text(&svc), "Hello");
        assert!(svc.can_undo());
        assert!(!svc.can_redo());
        assert_eq!(svc.current_index(), Some(0));
    }

    #[test]
    fn undo_and_redo_walk_the_history() {
        let mut svc = service("");
        svc.execute_command(InsertText::new("Hello", 0));
        svc.execute_command(InsertText::new(" World", 5));
        assert_eq!(text(&svc), "Hello World");

        assert!(svc.undo());
        assert_eq!(text(&svc), "Hello");
        assert!(svc.undo());
        assert_eq!(text(&svc), "");
        assert!(!svc.undo());

        assert!(svc.redo());
        assert_eq!(text(&svc), "Hello");
        assert!(svc.redo());
        assert_eq!(text(&svc), "Hello World");
        assert!(!svc.redo());
    }

    #[test]
    fn execute_after_undo_truncates_branch() {
        let mut svc = service("");
        svc.execute_command(InsertText::new("A", 0));
        svc.execute_command(InsertText::new("B", 1));
        svc.execute_command(InsertText::new("C", 2));
        svc.undo();
        svc.undo();
        assert_eq!(text(&svc), "A");

        assert!(svc.execute_command(InsertText::new("D", 1)));
        assert_eq!(text(&svc), "AD");
        assert_eq!(svc.history_stats().total_commands, 2);
        assert!(!svc.can_redo());
        let descriptions: Vec<_> = svc.history_list().into_iter().map(|e| e.description).collect();
        assert_eq!(descriptions, ["Insert \"A\" at 0", "Insert \"D\" at 1"]);
    }

    #[test]
    fn failed_execute_leaves_history_alone() {
        let mut svc = service("abc");
        svc.execute_command(InsertText::new("d", 3));
        svc.undo();
        svc.buffer_mut().set_read_only(true);

        assert!(!svc.execute_command(DeleteText::new(0, 1)));
        assert_eq!(svc.len(), 1);
        assert!(svc.can_redo());
        assert_eq!(
            svc.last_error(),
            Some(&CommandError::Buffer(BufferError::ReadOnly))
        );
    }

    #[test]
    fn failed_undo_keeps_position() {
        let mut svc = service("abc");
        svc.execute_command(ReplaceText::new(0, 3, "xyz"));
        svc.buffer_mut().set_read_only(true);

        assert!(!svc.undo());
        assert_eq!(svc.current_index(), Some(0));
        assert_eq!(text(&svc), "xyz");
        assert!(svc.last_error().is_some());

        svc.buffer_mut().set_read_only(false);
        assert!(svc.undo());
        assert_eq!(text(&svc), "abc");
        assert_eq!(svc.last_error(), None);
    }

    #[test]
    fn failed_redo_keeps_position() {
        let mut svc = service("abc");
        svc.execute_command(DeleteText::new(0, 1));
        svc.undo();
        svc.buffer_mut().set_read_only(true);

        assert!(!svc.redo());
        assert_eq!(svc.current_index(), None);
        assert!(svc.can_redo());
        assert_eq!(text(&svc), "abc");
    }

    #[test]
    fn size_bound_evicts_oldest() {
        let mut svc = CommandService::with_config(TextBuffer::default(), HistoryConfig::new(2));
        append_digits(&mut svc, 3);

        assert_eq!(text(&svc), "123");
        let stats = svc.history_stats();
        assert_eq!(stats.total_commands, 2);
        assert_eq!(stats.current_position, 2);
        let list = svc.history_list();
        assert_eq!(list[0].description, "Insert \"2\" at 1");
        assert_eq!(list[1].description, "Insert \"3\" at 2");

        // Only the retained window can be undone.
        assert!(svc.undo());
        assert!(svc.undo());
        assert!(!svc.undo());
        assert_eq!(text(&svc), "1");
    }

    #[test]
    fn shrinking_bound_applies_immediately() {
        let mut svc = service("");
        append_digits(&mut svc, 5);
        svc.undo();

        svc.update_config(ConfigUpdate::new().max_history_size(2));
        assert_eq!(svc.len(), 2);
        assert_eq!(svc.current_index(), Some(0));
        assert!(svc.can_redo());
        assert_eq!(svc.config().max_history_size, 2);
    }

    #[test]
    fn eviction_past_cursor_clamps_to_start() {
        let mut svc = service("");
        append_digits(&mut svc, 5);
        for _ in 0..4 {
            svc.undo();
        }
        assert_eq!(svc.current_index(), Some(0));

        svc.update_config(ConfigUpdate::new().max_history_size(2));
        assert_eq!(svc.len(), 2);
        assert_eq!(svc.current_index(), None);
        assert!(!svc.can_undo());
        assert!(svc.can_redo());
    }

    #[test]
    fn zero_bound_keeps_no_history() {
        let mut svc = CommandService::with_config(TextBuffer::default(), HistoryConfig::new(0));
        assert!(svc.execute_command(InsertText::new("x", 0)));
        assert_eq!(text(&svc), "x");
        assert!(svc.is_empty());
        assert!(!svc.can_undo());
    }

    #[test]
    fn update_without_bound_does_not_evict() {
        let mut svc = service("");
        append_digits(&mut svc, 3);
        svc.update_config(ConfigUpdate::new().auto_save_interval_ms(1000));
        assert_eq!(svc.len(), 3);
        assert_eq!(svc.config().auto_save_interval_ms, 1000);
    }

    #[test]
    fn config_is_a_copy() {
        let svc = service("");
        let mut config = svc.config();
        config.max_history_size = 1;
        assert_eq!(svc.config().max_history_size, 100);
    }

    #[test]
    fn clear_history_keeps_text() {
        let mut svc = service("");
        append_digits(&mut svc, 3);
        svc.undo();
        svc.clear_history();

        assert_eq!(text(&svc), "12");
        assert!(svc.is_empty());
        assert_eq!(svc.current_index(), None);
        assert!(!svc.can_undo());
        assert!(!svc.can_redo());
    }

    #[test]
    fn jump_moves_both_directions() {
        let mut svc = service("");
        append_digits(&mut svc, 4);

        assert!(svc.jump_to_history_point(Some(1)));
        assert_eq!(text(&svc), "12");
        assert_eq!(svc.current_index(), Some(1));

        assert!(svc.jump_to_history_point(None));
        assert_eq!(text(&svc), "");

        assert!(svc.jump_to_history_point(Some(3)));
        assert_eq!(text(&svc), "1234");

        assert!(svc.jump_to_history_point(Some(3)));
        assert_eq!(svc.current_index(), Some(3));
    }

    #[test]
    fn jump_out_of_range_is_rejected() {
        let mut svc = service("");
        append_digits(&mut svc, 2);
        assert!(!svc.jump_to_history_point(Some(2)));
        assert_eq!(svc.current_index(), Some(1));
        assert_eq!(svc.last_error(), None);

        let mut empty = service("");
        assert!(empty.jump_to_history_point(None));
        assert!(!empty.jump_to_history_point(Some(0)));
    }

    #[test]
    fn stats_report_memory_estimate() {
        let mut svc = service("");
        assert_eq!(svc.history_stats().memory_usage, 0);
        svc.execute_command(InsertText::new("a", 0));
        let expected = "Insert \"a\" at 0".len() * MEMORY_USAGE_FACTOR;
        assert_eq!(svc.history_stats().memory_usage, expected);
        assert_eq!(svc.memory_usage(), expected);
    }

    #[test]
    fn history_list_marks_executed_entries() {
        let mut svc = service("");
        append_digits(&mut svc, 3);
        svc.undo();

        let list = svc.history_list();
        assert_eq!(list.len(), 3);
        assert_eq!(
            list.iter().map(|e| e.executed).collect::<Vec<_>>(),
            [true, true, false]
        );
        assert!(list.iter().all(|e| e.can_undo));
        assert!(list.iter().enumerate().all(|(i, e)| e.index == i));
        assert!(list.iter().all(|e| e.source == CommandSource::User));
    }

    #[test]
    fn next_descriptions() {
        let mut svc = service("hello");
        svc.execute_command(DeleteText::new(0, 1));
        assert_eq!(svc.next_undo_description(), Some("Delete 0..1"));
        assert_eq!(svc.next_redo_description(), None);

        svc.undo();
        assert_eq!(svc.next_undo_description(), None);
        assert_eq!(svc.next_redo_description(), Some("Delete 0..1"));
    }

    #[test]
    fn memory_optimization_releases_capacity() {
        let mut svc = service("");
        append_digits(&mut svc, 64);
        svc.clear_history();
        assert!(svc.commands.capacity() < 64);

        let mut keep = CommandService::with_config(
            TextBuffer::default(),
            HistoryConfig {
                enable_memory_optimization: false,
                ..HistoryConfig::default()
            },
        );
        append_digits(&mut keep, 64);
        keep.clear_history();
        assert!(keep.commands.capacity() >= 64);
    }

    #[test]
    fn into_buffer_returns_final_text() {
        let mut svc = service("x");
        svc.execute_command(EditCommand::insert("y", 1));
        assert_eq!(svc.into_buffer().into_text(), "xy");
    }

    #[test]
    fn debug_impl() {
        let svc = service("");
        let debug_str = format!("{svc:?}");
        assert!(debug_str.contains("CommandService"));
        assert!(debug_str.contains("total_commands"));
    }
}
