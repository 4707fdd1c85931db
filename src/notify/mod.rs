//! Notifications
//!
//! Fire-and-forget delivery of [`CoinEvent`]s to collaborators such as
//! email or in-app alerts. Events are published only after the money
//! transaction has committed, and publishing never waits: a full or closed
//! channel drops the event with a log line.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

pub use crate::domain::CoinEvent;

/// Sink for committed ledger events
pub trait Notifier: Send + Sync {
    fn notify(&self, event: CoinEvent);
}

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, event: CoinEvent) {
        tracing::trace!(event_type = event.event_type(), "Notification discarded");
    }
}

/// Publishes events onto a bounded tokio channel
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    sender: mpsc::Sender<CoinEvent>,
}

impl ChannelNotifier {
    /// Create a notifier and the receiving end of its channel.
    /// A zero `buffer_size` is raised to one.
    pub fn new(buffer_size: usize) -> (Self, mpsc::Receiver<CoinEvent>) {
        let (sender, receiver) = mpsc::channel(buffer_size.max(1));
        (Self { sender }, receiver)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, event: CoinEvent) {
        match self.sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                tracing::warn!(
                    event_type = event.event_type(),
                    student_id = %event.student_id(),
                    "Notification channel full, event dropped"
                );
            }
            Err(TrySendError::Closed(event)) => {
                tracing::debug!(
                    event_type = event.event_type(),
                    "Notification channel closed, event dropped"
                );
            }
        }
    }
}

pub type Handler = Arc<dyn Fn(CoinEvent) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Drain `receiver` on a background task, running `handler` for each event.
/// The task ends once every [`ChannelNotifier`] clone has been dropped.
pub fn spawn_dispatcher(mut receiver: mpsc::Receiver<CoinEvent>, handler: Handler) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::debug!("Notification dispatcher started");
        while let Some(event) = receiver.recv().await {
            (handler)(event).await;
        }
        tracing::debug!("Notification dispatcher has shut down");
    })
}
