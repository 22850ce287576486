//! Countdown timer for the active poll.
//!
//! The ticker task does not count anything itself. It only pushes a
//! [`TickTicket`] into the coordinator's queue once per period; the
//! [`Countdown`] owned by the classroom decides whether that ticket is still
//! current and does the decrement. A ticket that was already queued when the
//! countdown was cancelled or replaced no longer matches and is discarded.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::trace;

/// Identifies the countdown a tick belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TickTicket(u64);

impl TickTicket {
    /// Create a ticket for the given countdown generation.
    #[must_use]
    pub const fn new(generation: u64) -> Self {
        Self(generation)
    }

    /// Countdown generation.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.0
    }
}

/// Owned handle to a ticker task.
///
/// Cancelling is idempotent, and dropping the handle cancels the task.
#[derive(Debug, Default)]
pub struct TimerHandle {
    task: Option<JoinHandle<()>>,
}

impl TimerHandle {
    /// Spawn a task that sends `ticket` into `ticks` every `period`,
    /// starting one period from now.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn spawn(
        period: Duration,
        ticket: TickTicket,
        ticks: mpsc::UnboundedSender<TickTicket>,
    ) -> Self {
        let task = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                trace!(generation = ticket.generation(), "Timer tick");
                if ticks.send(ticket).is_err() {
                    break;
                }
            }
        });
        Self { task: Some(task) }
    }

    /// Stop the ticker. Safe to call when nothing is running.
    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    /// Whether a ticker task is still attached.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Remaining-time bookkeeping for one poll cycle.
#[derive(Debug)]
pub struct Countdown {
    ticket: TickTicket,
    remaining: u32,
    handle: TimerHandle,
}

impl Countdown {
    /// Start counting down from `seconds`, ticking every `period`.
    #[must_use]
    pub fn start(
        ticket: TickTicket,
        seconds: u32,
        period: Duration,
        ticks: mpsc::UnboundedSender<TickTicket>,
    ) -> Self {
        Self {
            ticket,
            remaining: seconds,
            handle: TimerHandle::spawn(period, ticket, ticks),
        }
    }

    /// Ticket expected from this countdown's ticker.
    #[must_use]
    pub fn ticket(&self) -> TickTicket {
        self.ticket
    }

    /// Seconds left.
    #[must_use]
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Apply one tick.
    ///
    /// Returns the new remaining time, or `None` if the ticket is stale or
    /// the countdown has already stopped. Reaching zero stops the ticker.
    pub fn tick(&mut self, ticket: TickTicket) -> Option<u32> {
        if ticket != self.ticket || !self.handle.is_running() {
            return None;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.handle.cancel();
        }
        Some(self.remaining)
    }

    /// Stop ticking. Later ticks are ignored.
    pub fn cancel(&mut self) {
        self.handle.cancel();
    }
}
