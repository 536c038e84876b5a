use super::{Chunk, LogSource, Window};
use anyhow::{Result, anyhow};
use std::{
    collections::VecDeque,
    io::Cursor,
    sync::{Arc, Mutex},
};

enum Step {
    Bytes(Vec<u8>),
    Failure(String),
}

/// in-memory log source that replays a fixed script of fetch results
///
/// Each call to `fetch_chunk` consumes one scripted step. Once the script
/// runs out every further fetch returns an empty chunk, like a container
/// that stopped logging. Every requested window is recorded so callers can
/// inspect how the tailer advanced.
pub struct ScriptedSource {
    steps: VecDeque<Step>,
    windows: Arc<Mutex<Vec<Window>>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self {
            steps: VecDeque::new(),
            windows: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// queue a chunk containing `bytes`
    pub fn with_chunk(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.steps.push_back(Step::Bytes(bytes.into()));
        self
    }

    /// queue `count` empty chunks
    pub fn with_empty(mut self, count: usize) -> Self {
        for _ in 0..count {
            self.steps.push_back(Step::Bytes(Vec::new()));
        }
        self
    }

    /// queue a failed fetch
    pub fn with_failure(mut self, message: impl Into<String>) -> Self {
        self.steps.push_back(Step::Failure(message.into()));
        self
    }

    /// shared handle on the windows requested so far
    pub fn windows(&self) -> Arc<Mutex<Vec<Window>>> {
        self.windows.clone()
    }
}

impl Default for ScriptedSource {
    fn default() -> Self {
        Self::new()
    }
}

impl LogSource for ScriptedSource {
    fn fetch_chunk(&mut self, window: &Window) -> Result<Chunk> {
        if let Ok(mut windows) = self.windows.lock() {
            windows.push(*window);
        }

        match self.steps.pop_front() {
            Some(Step::Bytes(bytes)) => Ok(Box::new(Cursor::new(bytes))),
            Some(Step::Failure(message)) => Err(anyhow!(message)),
            None => Ok(Box::new(std::io::empty())),
        }
    }

    fn describe(&self) -> String {
        "scripted source".to_string()
    }
}
