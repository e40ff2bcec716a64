//! Periodic heartbeat task.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Weak;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::identity::IdentityProvider;

use super::core::Shared;

// ============================================================================
// HeartbeatTask
// ============================================================================

/// Background task sending a heartbeat every interval.
///
/// The first heartbeat goes out one interval after start. The task ends when
/// stopped, when dropped, or once the client it serves is gone.
#[derive(Debug)]
pub struct HeartbeatTask {
    task: JoinHandle<()>,
}

impl HeartbeatTask {
    pub(crate) fn spawn(
        shared: Weak<Shared>,
        period: Duration,
        identity: Box<dyn IdentityProvider>,
    ) -> Result<Self> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| Error::NoRuntime)?;

        let task = runtime.spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                let Some(shared) = shared.upgrade() else {
                    break;
                };
                let sent = shared.heartbeat(&identity.identity());
                trace!(sent, "Heartbeat tick");
            }

            debug!("Heartbeat task finished");
        });

        debug!(period_ms = period.as_millis() as u64, "Heartbeat task started");

        Ok(Self { task })
    }

    /// Stops sending heartbeats.
    pub fn stop(self) {
        drop(self);
    }

    /// Returns `true` once the task has ended.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for HeartbeatTask {
    fn drop(&mut self) {
        if !self.task.is_finished() {
            self.task.abort();
            debug!("Aborted task 'heartbeat'");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
