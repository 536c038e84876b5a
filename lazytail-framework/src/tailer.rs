use crate::{
    clock::{Clock, SystemClock},
    line_buffer::{LineBuffer, PushOutcome},
    source::{Chunk, LogSource, Window},
};
use anyhow::{Context, Result};
use chrono::{DateTime, TimeDelta, Utc};
use std::{
    io::{BufReader, Bytes, Read},
    time::Duration,
};

pub const DEFAULT_TIMEOUT_SECS: i64 = 5;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;
pub const DEFAULT_HINT_DELAY_SECS: u64 = 15;

/// Configuration for a [`LineTailer`].
#[derive(Debug, Clone)]
pub struct TailerDesc {
    /// Moment tailing began; the first window starts here. Defaults to now.
    pub start_date: Option<DateTime<Utc>>,
    /// Give up after this many seconds without any output. `<= 0` never gives up.
    pub timeout_secs: i64,
    /// Pause between two empty fetches.
    pub poll_interval: Duration,
    /// Delay after which a slow start-up is reported once.
    pub hint_delay: Duration,
}

impl TailerDesc {
    pub fn new() -> Self {
        Self {
            start_date: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            hint_delay: Duration::from_secs(DEFAULT_HINT_DELAY_SECS),
        }
    }
}

impl Default for TailerDesc {
    fn default() -> Self {
        Self::new()
    }
}

/// Side-channel notifications emitted while pulling lines.
///
/// These never carry line data; they only tell the caller how tailing is going.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TailerEvent {
    /// No line produced yet and the hint delay has passed. Sent at most once.
    SlowStartup { elapsed: TimeDelta },
    /// The timeout expired without any output. The sequence is over.
    TimedOut { waited: TimeDelta },
}

type EventHandler = Box<dyn FnMut(&TailerEvent) + Send>;

/// Default handler: report events through the `log` facade.
pub fn log_event(event: &TailerEvent) {
    match event {
        TailerEvent::SlowStartup { elapsed } => {
            log::info!(
                "Start-up has been running for {}s, the container setup may take a while.",
                elapsed.num_seconds()
            );
            log::info!(
                "[Tips] Press CTRL+C to stop following the logs; \
                 the start-up sequence will continue in the background."
            );
        }
        TailerEvent::TimedOut { waited } => {
            log::debug!(
                "Container log stream timed out after {}s without output",
                waited.num_seconds()
            );
        }
    }
}

enum TailerState {
    /// no chunk in hand, next step fetches one
    AwaitingWindow,
    /// draining the bytes of the current window
    ReadingChunk(Bytes<BufReader<Chunk>>),
    /// timed out; terminal
    Done,
}

enum Step {
    Line(String),
    Continue,
    End,
}

/// Pull-based, timeout-bounded line reader over a polled log source.
///
/// Each pull issues bounded fetches over advancing, non-overlapping windows
/// until a complete line is available. Lines are `\r`/`\n` terminated, UTF-8
/// decoded and trimmed; empty lines are never produced.
///
/// The sequence ends (`Ok(None)`) only when the timeout expires before the
/// source produced a single byte. Once anything has been seen the tailer keeps
/// polling until the caller drops it.
///
/// ```rust
/// use lazytail_framework::{LineTailer, ScriptedSource, TailerDesc};
///
/// let source = ScriptedSource::new().with_chunk("hello\nworld\n");
/// let mut tailer = LineTailer::new(source, TailerDesc::new());
/// assert_eq!(tailer.next_line().unwrap().as_deref(), Some("hello"));
/// assert_eq!(tailer.next_line().unwrap().as_deref(), Some("world"));
/// ```
pub struct LineTailer<S, C = SystemClock>
where
    S: LogSource,
    C: Clock,
{
    source: S,
    clock: C,
    poll_interval: Duration,
    start_date: DateTime<Utc>,
    window: Option<Window>,
    // set once the chunk of `window` has been drained or broke mid-read
    window_consumed: bool,
    state: TailerState,
    buffer: LineBuffer,
    // None once the timeout is disabled, or when it never applied
    timeout_deadline: Option<DateTime<Utc>>,
    hint_deadline: Option<DateTime<Utc>>,
    hint_sent: bool,
    on_event: EventHandler,
}

impl<S: LogSource> LineTailer<S, SystemClock> {
    pub fn new(source: S, desc: TailerDesc) -> Self {
        Self::with_clock(source, desc, SystemClock)
    }
}

impl<S, C> LineTailer<S, C>
where
    S: LogSource,
    C: Clock,
{
    pub fn with_clock(source: S, desc: TailerDesc, clock: C) -> Self {
        let start_date = desc.start_date.unwrap_or_else(|| clock.now());

        let timeout_deadline = if desc.timeout_secs > 0 {
            TimeDelta::try_seconds(desc.timeout_secs)
                .and_then(|delta| start_date.checked_add_signed(delta))
        } else {
            None
        };
        let hint_deadline = TimeDelta::from_std(desc.hint_delay)
            .ok()
            .and_then(|delta| start_date.checked_add_signed(delta));

        log::debug!(
            "LineTailer: Tailing {} from {} (timeout: {}s)",
            source.describe(),
            start_date,
            desc.timeout_secs
        );

        Self {
            source,
            clock,
            poll_interval: desc.poll_interval,
            start_date,
            window: None,
            window_consumed: false,
            state: TailerState::AwaitingWindow,
            buffer: LineBuffer::new(),
            timeout_deadline,
            hint_deadline,
            hint_sent: false,
            on_event: Box::new(log_event),
        }
    }

    /// Replace the default event handler (which logs through `log`).
    pub fn with_event_handler<F>(mut self, handler: F) -> Self
    where
        F: FnMut(&TailerEvent) + Send + 'static,
    {
        self.on_event = Box::new(handler);
        self
    }

    /// Pull the next complete line.
    ///
    /// Returns `Ok(None)` once the timeout expired; every later call returns
    /// `Ok(None)` as well. Decode errors and source failures are returned as
    /// `Err` immediately and are never retried here.
    pub fn next_line(&mut self) -> Result<Option<String>> {
        loop {
            match self.step()? {
                Step::Line(line) => return Ok(Some(line)),
                Step::Continue => continue,
                Step::End => return Ok(None),
            }
        }
    }

    pub fn hint_sent(&self) -> bool {
        self.hint_sent
    }

    pub fn timeout_enabled(&self) -> bool {
        self.timeout_deadline.is_some()
    }

    pub fn is_done(&self) -> bool {
        matches!(self.state, TailerState::Done)
    }

    /// Window of the most recent fetch, if any.
    pub fn window(&self) -> Option<Window> {
        self.window
    }

    pub fn start_date(&self) -> DateTime<Utc> {
        self.start_date
    }

    /// Number of bytes waiting for a terminator.
    pub fn pending_bytes(&self) -> usize {
        self.buffer.len()
    }

    fn step(&mut self) -> Result<Step> {
        match std::mem::replace(&mut self.state, TailerState::AwaitingWindow) {
            TailerState::Done => {
                self.state = TailerState::Done;
                Ok(Step::End)
            }
            TailerState::AwaitingWindow => {
                let window = self.current_window();
                let chunk = self
                    .source
                    .fetch_chunk(&window)
                    .with_context(|| format!("Failed to fetch logs for window {}", window))?;
                self.state = TailerState::ReadingChunk(BufReader::new(chunk).bytes());
                Ok(Step::Continue)
            }
            TailerState::ReadingChunk(mut bytes) => {
                while let Some(byte) = bytes.next() {
                    let byte = match byte {
                        Ok(byte) => byte,
                        Err(e) => {
                            // the rest of the window is lost; never refetch it
                            self.buffer.clear();
                            self.window_consumed = true;
                            return Err(e).context("Failed to read log chunk");
                        }
                    };
                    match self.buffer.push(byte) {
                        PushOutcome::Completed(raw) => {
                            self.state = TailerState::ReadingChunk(bytes);
                            // a line was produced, start-up is not slow
                            self.hint_deadline = None;
                            return LineBuffer::decode(raw).map(Step::Line);
                        }
                        PushOutcome::Appended => self.timeout_deadline = None,
                        PushOutcome::Skipped => {}
                    }
                }
                Ok(self.on_chunk_exhausted())
            }
        }
    }

    /// First pull fixes `until` to now. A consumed window is followed by the
    /// next one; a window whose fetch failed is requested again.
    fn current_window(&mut self) -> Window {
        let window = match self.window {
            None => Window::new(self.start_date, self.clock.now()),
            Some(window) if self.window_consumed => window.next(self.clock.now()),
            Some(window) => window,
        };
        self.window = Some(window);
        self.window_consumed = false;
        window
    }

    fn on_chunk_exhausted(&mut self) -> Step {
        let until = match self.window {
            Some(window) => window.until,
            None => self.clock.now(),
        };

        if let Some(deadline) = self.timeout_deadline
            && until >= deadline
        {
            self.state = TailerState::Done;
            (self.on_event)(&TailerEvent::TimedOut {
                waited: until - self.start_date,
            });
            return Step::End;
        }

        if !self.hint_sent
            && let Some(deadline) = self.hint_deadline
            && until >= deadline
        {
            self.hint_sent = true;
            (self.on_event)(&TailerEvent::SlowStartup {
                elapsed: until - self.start_date,
            });
        }

        self.clock.sleep(self.poll_interval);
        self.window_consumed = true;
        self.state = TailerState::AwaitingWindow;
        Step::Continue
    }
}

impl<S, C> Iterator for LineTailer<S, C>
where
    S: LogSource,
    C: Clock,
{
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_line().transpose()
    }
}
