#![forbid(unsafe_code)]

//! Command-based undo/redo for text buffers.
//!
//! Every mutation of a buffer is a reversible command. The
//! [`CommandService`] executes commands, records them in a bounded history,
//! and replays or reverses them with exact fidelity:
//!
//! - **Reversibility**: each command captures its inverse at execute time
//! - **Branch truncation**: a new edit after undo discards the redo tail
//! - **Bounded history**: oldest entries evicted past `max_history_size`
//! - **Jumps**: move to any retained history point in one call
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                     CommandService<B>                     │
//! │  commands: [ Insert | Delete | Replace | Insert | ... ]   │
//! │                               ▲ applied                   │
//! │          execute() / undo()   │                           │
//! │                 ▼             │                           │
//! │  ┌──────────────────────────────────────────────────┐     │
//! │  │ B: BufferContext   text · replace_text · cursor  │     │
//! │  └──────────────────────────────────────────────────┘     │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```
//! use textundo::{BufferContext, CommandService, DeleteText, InsertText, TextBuffer};
//!
//! let mut service = CommandService::new(TextBuffer::new(""));
//! assert!(service.execute_command(InsertText::new("Hello World", 0)));
//! assert!(service.execute_command(DeleteText::new(5, 11)));
//! assert_eq!(service.buffer().text(), "Hello");
//!
//! assert!(service.undo());
//! assert_eq!(service.buffer().text(), "Hello World");
//! assert!(service.redo());
//! assert_eq!(service.buffer().text(), "Hello");
//! ```
//!
//! # Threading
//!
//! The service is synchronous and does no locking. Hosts that share one
//! across threads must serialize access themselves.
//!
//! # Logging
//!
//! Operations emit `tracing` spans (`history.execute`, `history.undo`,
//! `history.redo`, `history.jump`) and events under the `textundo.history`
//! target. Failures are logged at `warn`. No subscriber is installed here.

pub mod buffer;
pub mod command;
pub mod config;
pub mod service;

pub use buffer::{BufferContext, BufferError, TextBuffer};
pub use command::{
    CommandError, CommandMetadata, CommandResult, CommandSource, DeleteText, Edit, EditCommand,
    InsertText, ReplaceText,
};
#[cfg(feature = "config-files")]
pub use config::ConfigError;
pub use config::{ConfigUpdate, HistoryConfig};
pub use service::{CommandService, HistoryEntry, HistoryStats};
