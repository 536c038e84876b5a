//! # lazytail-framework
//!
//! Incremental, timeout-bounded line tailing for container logs that are only
//! reachable through a polling log API.
//!
//! ## Overview
//!
//! A runtime's "follow" log mode has no deadline: if the container never writes
//! again, the caller blocks forever. lazytail-framework instead issues bounded
//! `since .. until` fetches over advancing windows, reassembles the bytes into
//! lines and hands them out one pull at a time, with an optional overall timeout.
//!
//! ## Core Concepts
//!
//! - **[`LogSource`]**: fetches the raw bytes a container produced inside a
//!   [`Window`]. Implement it for your runtime client.
//! - **[`LineTailer`]**: the pull-based state machine. Every call to
//!   [`LineTailer::next_line`] returns one complete line, the end of the
//!   sequence, or a fatal error.
//! - **[`TailerDesc`]**: configuration (start date, timeout, poll interval,
//!   hint delay).
//! - **[`TailerEvent`]**: side-channel notices (slow start-up, time-out),
//!   delivered to a handler instead of being mixed into the line sequence.
//!
//! ### Timeout
//!
//! With a positive timeout the sequence ends once the deadline passes without a
//! single byte of output. The first byte disables the timeout for good: a
//! container that logs is alive and is followed until the caller stops pulling.
//!
//! ## Quick Start
//!
//! ```rust
//! use lazytail_framework::{Chunk, LineTailer, LogSource, TailerDesc, Window};
//! use anyhow::Result;
//! use std::io::Cursor;
//!
//! struct Once(Option<&'static str>);
//!
//! impl LogSource for Once {
//!     fn fetch_chunk(&mut self, _window: &Window) -> Result<Chunk> {
//!         Ok(Box::new(Cursor::new(self.0.take().unwrap_or_default())))
//!     }
//! }
//!
//! let mut desc = TailerDesc::new();
//! desc.timeout_secs = 1;
//!
//! let tailer = LineTailer::new(Once(Some("starting\nready\n")), desc);
//! for line in tailer.take(2) {
//!     println!("{}", line?);
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod clock;
pub mod line_buffer;
pub mod source;
pub mod tailer;

// re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use line_buffer::{LineBuffer, PushOutcome};
pub use source::{Chunk, LogSource, ScriptedSource, Window};
pub use tailer::{LineTailer, TailerDesc, TailerEvent, log_event};
