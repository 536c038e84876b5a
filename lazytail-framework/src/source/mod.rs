//! Log source trait and the time window it is queried with.
//!
//! This module defines the collaborator the tailer pulls bytes from:
//!
//! - [`Window`]: a bounded `[since, until)` time range for one fetch
//! - [`LogSource`]: fetches the raw bytes a container produced inside a window
//! - [`Chunk`]: the byte stream returned by a single fetch
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  fetch_chunk(window)  ┌─────────────┐
//! │  LogSource   │ ────────────────────> │    Chunk    │ (raw bytes)
//! └──────────────┘                       └──────┬──────┘
//!                                               │
//!                                               │ byte by byte
//!                                               │
//! ┌──────────────┐      next_line()      ┌──────▼──────┐
//! │    caller    │ <──────────────────── │ LineTailer  │
//! └──────────────┘                       └─────────────┘
//! ```
//!
//! Windows handed to a source never overlap: the `since` of every window is
//! the `until` of the one before it.

mod scripted;

pub use scripted::ScriptedSource;

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::{fmt, io::Read};

/// Byte stream produced by one bounded fetch.
pub type Chunk = Box<dyn Read + Send>;

/// A bounded time range used for one log fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub since: DateTime<Utc>,
    pub until: DateTime<Utc>,
}

impl Window {
    /// Build a window, clamping `until` so that `since <= until` holds.
    pub fn new(since: DateTime<Utc>, until: DateTime<Utc>) -> Self {
        Self {
            since,
            until: until.max(since),
        }
    }

    /// The window that follows this one, ending at `now`.
    ///
    /// `until` only moves forward: a clock that steps backwards yields an
    /// empty window starting and ending at the previous `until`.
    pub fn next(&self, now: DateTime<Utc>) -> Self {
        Self::new(self.until, now)
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{} .. {})",
            self.since.format("%H:%M:%S%.3f"),
            self.until.format("%H:%M:%S%.3f")
        )
    }
}

/// Trait for fetching bounded log chunks from a container runtime.
///
/// Implement this trait to plug a runtime client (Docker, Podman, a test
/// double, ...) into the tailer. The source is responsible for:
/// - Holding the connection and the container reference
/// - Issuing one non-following, bounded log request per call
/// - Returning the raw bytes for that window, undecoded
///
/// # Bounded Contract
///
/// `fetch_chunk()` **must not follow** the log. The returned [`Chunk`] must
/// reach end-of-stream once the runtime has no more buffered output for the
/// window. No output is not an error: return an empty chunk.
///
/// # Errors
///
/// Connection loss, a vanished container or any other runtime failure must be
/// returned as `Err`. The tailer propagates it to its caller unchanged and
/// never retries a failed fetch on its own.
///
/// # Examples
///
/// ```rust
/// use lazytail_framework::{Chunk, LogSource, Window};
/// use anyhow::Result;
/// use std::io::Cursor;
///
/// struct Fixed(Vec<u8>);
///
/// impl LogSource for Fixed {
///     fn fetch_chunk(&mut self, _window: &Window) -> Result<Chunk> {
///         Ok(Box::new(Cursor::new(std::mem::take(&mut self.0))))
///     }
/// }
/// ```
pub trait LogSource: Send {
    /// Fetch every byte the container produced inside `window`.
    fn fetch_chunk(&mut self, window: &Window) -> Result<Chunk>;

    /// Human readable name of the tailed target, used in log messages.
    fn describe(&self) -> String {
        "log source".to_string()
    }
}

impl<S: LogSource + ?Sized> LogSource for Box<S> {
    fn fetch_chunk(&mut self, window: &Window) -> Result<Chunk> {
        (**self).fetch_chunk(window)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_new_clamps_until() {
        let window = Window::new(at(10), at(5));
        assert_eq!(window.since, at(10));
        assert_eq!(window.until, at(10));
    }

    #[test]
    fn test_next_starts_at_previous_until() {
        let first = Window::new(at(0), at(3));
        let second = first.next(at(7));
        assert_eq!(second.since, first.until);
        assert_eq!(second.until, at(7));
    }

    #[test]
    fn test_next_never_moves_backwards() {
        let first = Window::new(at(0), at(3));
        let second = first.next(at(1));
        assert_eq!(second.since, at(3));
        assert_eq!(second.until, at(3));
    }

    #[test]
    fn test_display() {
        let window = Window::new(at(0), at(1));
        assert_eq!(window.to_string(), "[00:00:00.000 .. 00:00:01.000)");
    }
}
