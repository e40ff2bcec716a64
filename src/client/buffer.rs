//! Outbound message buffer.
//!
//! Serialized messages wait here until a drain pass delivers them. The buffer
//! belongs to the client, not to a transport handle, so it survives
//! reconnection.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;

use crate::error::{Error, Result};

// ============================================================================
// DrainOutcome
// ============================================================================

/// Result of one drain pass.
#[derive(Debug)]
pub struct DrainOutcome {
    /// Messages handed to the transport and removed.
    pub delivered: usize,
    /// Error that stopped the pass early, if any.
    pub failure: Option<Error>,
}

// ============================================================================
// OutboundBuffer
// ============================================================================

/// FIFO queue of serialized messages.
///
/// Append-only at the tail; items leave the head only after the transport
/// accepted them.
#[derive(Debug, Default)]
pub struct OutboundBuffer {
    queue: VecDeque<String>,
}

impl OutboundBuffer {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a message at the tail.
    #[inline]
    pub fn push(&mut self, message: String) {
        self.queue.push_back(message);
    }

    /// Number of buffered messages.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Returns `true` if nothing is buffered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Buffered messages, head first.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.queue.iter().map(String::as_str)
    }

    /// Hands every message to `send`, head first.
    ///
    /// A message is popped only after `send` returns `Ok`. The first error
    /// ends the pass and leaves the failed message at the head.
    pub fn drain<F>(&mut self, mut send: F) -> DrainOutcome
    where
        F: FnMut(&str) -> Result<()>,
    {
        let mut delivered = 0;

        while let Some(head) = self.queue.front() {
            if let Err(e) = send(head) {
                return DrainOutcome {
                    delivered,
                    failure: Some(e),
                };
            }
            self.queue.pop_front();
            delivered += 1;
        }

        DrainOutcome {
            delivered,
            failure: None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
