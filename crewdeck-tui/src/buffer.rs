//! Line buffer between the coder's output readers and the supervisor.
//!
//! Bounded: when full, the oldest line is dropped so the reader never
//! waits on a slow supervisor call. Closing the buffer lets the consumer
//! drain what is left and then stop.

use std::collections::VecDeque;
use std::sync::Mutex;

use tokio::sync::Notify;

/// Default number of lines held before the oldest is dropped.
pub const DEFAULT_CAPACITY: usize = 4096;

#[derive(Debug, Default)]
struct Inner {
    lines: VecDeque<String>,
    dropped: u64,
    closed: bool,
}

/// FIFO of decoded output lines with a single consumer.
#[derive(Debug)]
pub struct LineBuffer {
    inner: Mutex<Inner>,
    notify: Notify,
    capacity: usize,
}

impl LineBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            notify: Notify::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a line. Returns false if the buffer is already closed.
    pub fn push(&self, line: String) -> bool {
        {
            let mut inner = self.inner.lock().unwrap();
            if inner.closed {
                return false;
            }
            if inner.lines.len() >= self.capacity {
                inner.lines.pop_front();
                inner.dropped += 1;
            }
            inner.lines.push_back(line);
        }
        self.notify.notify_one();
        true
    }

    /// No more lines will arrive.
    pub fn close(&self) {
        self.inner.lock().unwrap().closed = true;
        self.notify.notify_one();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().unwrap().closed
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lines discarded because the buffer was full.
    pub fn dropped(&self) -> u64 {
        self.inner.lock().unwrap().dropped
    }

    /// Remove up to `max` lines from the front without waiting.
    pub fn drain(&self, max: usize) -> Vec<String> {
        let mut inner = self.inner.lock().unwrap();
        let n = max.min(inner.lines.len());
        inner.lines.drain(..n).collect()
    }

    /// Wait for at least one line, then return up to `max` lines in arrival
    /// order. `None` once the buffer is closed and empty.
    pub async fn next_chunk(&self, max: usize) -> Option<Vec<String>> {
        let max = max.max(1);
        loop {
            {
                let mut inner = self.inner.lock().unwrap();
                if !inner.lines.is_empty() {
                    let n = max.min(inner.lines.len());
                    return Some(inner.lines.drain(..n).collect());
                }
                if inner.closed {
                    return None;
                }
            }
            self.notify.notified().await;
        }
    }
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
