//! Inter-task queues between the control loop and the chat transport.
//!
//! Uses `embassy-sync` bounded channels so both sides can share static
//! queues without heap allocation.  Each queue has exactly one producer and
//! one consumer, which keeps delivery in production order.
//!
//! ```text
//! ┌──────────────┐  NotificationEvent  ┌──────────────┐
//! │ Control Loop │───────────────────▶│  Transport   │
//! │  (sync tick) │◀───────────────────│  (I/O task)  │
//! └──────────────┘   InboundCommand    └──────────────┘
//! ```
//!
//! The control loop must never block on a full queue.  Outbound overflow
//! drops the newest event, counts it, and warns; inbound traffic is rate
//! limited with a token bucket before it is queued.

use core::sync::atomic::{AtomicU32, Ordering};
use core::time::Duration;

use burster::Limiter;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::warn;

use crate::app::commands::InboundCommand;
use crate::app::events::NotificationEvent;
use crate::app::ports::{CommandSource, NotificationSink};

/// Channel depth for outbound notifications.
pub const NOTIFY_DEPTH: usize = 16;

/// Channel depth for inbound commands.
pub const CMD_DEPTH: usize = 8;

/// Sustained inbound command rate.
pub const CMD_RATE_PER_SEC: u64 = 2;

/// Inbound burst allowance before the token bucket starts refusing.
pub const CMD_BURST: u64 = 5;

// ───────────────────────────────────────────────────────────────
// Outbound: control loop → transport
// ───────────────────────────────────────────────────────────────

pub struct NotificationQueue {
    channel: Channel<CriticalSectionRawMutex, NotificationEvent, NOTIFY_DEPTH>,
    dropped: AtomicU32,
}

impl NotificationQueue {
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
            dropped: AtomicU32::new(0),
        }
    }

    /// Producer handle for the control loop.
    pub fn sender(&self) -> QueueSink<'_> {
        QueueSink { queue: self }
    }

    /// Non-blocking pop for the transport side.
    pub fn try_next(&self) -> Option<NotificationEvent> {
        self.channel.try_receive().ok()
    }

    /// Events discarded because the queue was full.
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.channel.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }
}

impl Default for NotificationQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// [`NotificationSink`] over a [`NotificationQueue`].
pub struct QueueSink<'a> {
    queue: &'a NotificationQueue,
}

impl NotificationSink for QueueSink<'_> {
    fn enqueue(&mut self, event: NotificationEvent) {
        if let Err(embassy_sync::channel::TrySendError::Full(event)) =
            self.queue.channel.try_send(event)
        {
            let n = self.queue.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            warn!("Notification queue full, dropped {:?} ({} total)", event, n);
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Inbound: transport → control loop
// ───────────────────────────────────────────────────────────────

pub struct CommandInbox {
    channel: Channel<CriticalSectionRawMutex, InboundCommand, CMD_DEPTH>,
}

impl CommandInbox {
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
        }
    }

    /// Producer handle for the transport task.  Pass `uptime` from
    /// [`adapters::time`](crate::adapters::time) on device.
    pub fn ingress(&self, now: fn() -> Duration) -> CommandIngress<'_> {
        CommandIngress {
            inbox: self,
            limiter: burster::TokenBucket::new_with_time_provider(
                CMD_RATE_PER_SEC,
                CMD_BURST,
                now,
            ),
        }
    }
}

impl Default for CommandInbox {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandSource for &CommandInbox {
    fn poll_inbound(&mut self) -> Option<InboundCommand> {
        self.channel.try_receive().ok()
    }
}

/// Why a command did not make it into the inbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejected {
    RateLimited,
    QueueFull,
}

/// Rate-limited producer side of a [`CommandInbox`].
pub struct CommandIngress<'a> {
    inbox: &'a CommandInbox,
    limiter: burster::TokenBucket<fn() -> Duration>,
}

impl CommandIngress<'_> {
    pub fn submit(&mut self, cmd: InboundCommand) -> Result<(), Rejected> {
        if self.limiter.try_consume(1).is_err() {
            warn!("Inbound command rate limit hit, dropping {:?}", cmd);
            return Err(Rejected::RateLimited);
        }
        self.inbox.channel.try_send(cmd).map_err(|_| {
            warn!("Command inbox full");
            Rejected::QueueFull
        })
    }
}
