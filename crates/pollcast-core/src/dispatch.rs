//! Fan-out of server frames to connected clients.
//!
//! Every attached connection owns an in-order outbound queue. A broadcast
//! places one shared frame in every queue, so all connections observe events
//! in the same order they were emitted.

use pollcast_protocol::ServerFrame;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// A frame queued for delivery, shared across recipients.
pub type Outbound = Arc<ServerFrame>;

/// Sending half of a connection's outbound queue.
pub type OutboundSender = mpsc::UnboundedSender<Outbound>;

/// Receiving half of a connection's outbound queue.
pub type OutboundReceiver = mpsc::UnboundedReceiver<Outbound>;

/// Tracks connected recipients and delivers frames to them.
#[derive(Debug, Default)]
pub struct Dispatcher {
    recipients: HashMap<String, OutboundSender>,
}

impl Dispatcher {
    /// Create a dispatcher with no recipients.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of attached connections.
    #[must_use]
    pub fn recipient_count(&self) -> usize {
        self.recipients.len()
    }

    /// Check if a connection is attached.
    #[must_use]
    pub fn is_attached(&self, connection_id: &str) -> bool {
        self.recipients.contains_key(connection_id)
    }

    /// Attach a connection's outbound queue.
    pub fn attach(&mut self, connection_id: impl Into<String>, sender: OutboundSender) {
        let conn_id = connection_id.into();
        debug!(connection = %conn_id, "Recipient attached");
        self.recipients.insert(conn_id, sender);
    }

    /// Detach a connection.
    ///
    /// Frames already queued are still delivered; afterwards the
    /// connection's receiver yields `None`.
    pub fn detach(&mut self, connection_id: &str) -> bool {
        let removed = self.recipients.remove(connection_id).is_some();
        if removed {
            debug!(connection = %connection_id, "Recipient detached");
        }
        removed
    }

    /// Send a frame to every attached connection.
    ///
    /// Returns the number of recipients. Connections whose receiver is gone
    /// are dropped.
    pub fn broadcast(&mut self, frame: ServerFrame) -> usize {
        let kind = frame.kind();
        let frame = Arc::new(frame);
        self.recipients
            .retain(|_, sender| sender.send(Arc::clone(&frame)).is_ok());
        trace!(event = kind, recipients = self.recipients.len(), "Broadcast");
        self.recipients.len()
    }

    /// Send a frame to a single connection.
    ///
    /// Returns `true` if the connection is attached and still receiving.
    pub fn send_to(&mut self, connection_id: &str, frame: ServerFrame) -> bool {
        let Some(sender) = self.recipients.get(connection_id) else {
            return false;
        };
        if sender.send(Arc::new(frame)).is_ok() {
            true
        } else {
            self.recipients.remove(connection_id);
            false
        }
    }
}
