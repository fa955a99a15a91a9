//! Event-to-mail routing loop.
//!
//! [`NotificationRouter`] subscribes to the [`EventBus`](crate::EventBus)
//! and hands each [`ChangeEvent`] to a [`ChangeNotifier`]. Events are
//! processed one at a time, in publish order. Notification failures are
//! logged and never reach the code that published the event.

use reviewmail_notify::{ChangeEvent, ChangeNotifier, SendOutcome};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Counters reported when the router stops.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RouterStats {
    pub events: usize,
    pub sent: usize,
    pub skipped: usize,
    pub failed: usize,
}

pub struct NotificationRouter {
    notifier: ChangeNotifier,
}

impl NotificationRouter {
    pub fn new(notifier: ChangeNotifier) -> Self {
        Self { notifier }
    }

    /// Run the main routing loop.
    ///
    /// Exits when the bus is dropped (every event published before that is
    /// still processed) or when `cancel` fires.
    pub async fn run(
        self,
        mut receiver: broadcast::Receiver<ChangeEvent>,
        cancel: CancellationToken,
    ) -> RouterStats {
        let mut stats = RouterStats::default();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Notification router cancelled");
                    break;
                }
                received = receiver.recv() => match received {
                    Ok(event) => self.route_event(&event, &mut stats).await,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(skipped = n, "Notification router lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        tracing::info!("Event bus closed, notification router shutting down");
                        break;
                    }
                },
            }
        }

        tracing::info!(
            events = stats.events,
            sent = stats.sent,
            skipped = stats.skipped,
            failed = stats.failed,
            "Notification router stopped"
        );
        stats
    }

    async fn route_event(&self, event: &ChangeEvent, stats: &mut RouterStats) {
        stats.events += 1;
        match self.notifier.notify(event).await {
            Ok(outcomes) => {
                for outcome in outcomes {
                    match outcome {
                        SendOutcome::Sent { .. } => stats.sent += 1,
                        SendOutcome::Skipped { .. } => stats.skipped += 1,
                    }
                }
            }
            Err(e) => {
                stats.failed += 1;
                tracing::error!(
                    error = %e,
                    event_type = event.kind.name(),
                    change_id = %event.change.id,
                    "Failed to send change notification"
                );
            }
        }
    }
}
