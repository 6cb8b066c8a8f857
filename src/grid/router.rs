//! Event router: lease keepalive plus feed forwarding.
//!
//! Two background tasks feed the engine. The renewal task extends the
//! data-stream lease on a fixed period. The feed task turns the live event
//! feed into [`GridMessage`]s on a single ordered channel, dropping event
//! kinds the engine does not consume. The feed ending, failing or reporting
//! lease expiry is fatal: the task sends one `FeedClosed` and exits.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::StreamExt;
use log::{debug, error, info, warn};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};

use super::errors::GridResult;
use super::executor::{EventStream, GridExchange};
use super::types::{GridMessage, StreamEvent};

/// Handles of the two router tasks
pub struct EventRouter {
    renewal_handle: Option<JoinHandle<()>>,
    feed_handle: Option<JoinHandle<()>>,
}

impl EventRouter {
    /// Subscribe to the feed for `lease_id` and spawn both tasks.
    ///
    /// The first renewal happens one full `renew_interval` after start.
    pub async fn start<E: GridExchange + 'static>(
        exchange: Arc<E>,
        lease_id: String,
        tx: UnboundedSender<GridMessage>,
        renew_interval: Duration,
    ) -> GridResult<Self> {
        let events = exchange.stream_events(&lease_id).await?;

        let renewal_handle = tokio::spawn(Self::renewal_task(exchange, lease_id, renew_interval));
        let feed_handle = tokio::spawn(Self::feed_task(events, tx));
        info!("Event router started (lease renewal every {:?})", renew_interval);

        Ok(Self {
            renewal_handle: Some(renewal_handle),
            feed_handle: Some(feed_handle),
        })
    }

    /// Abort both tasks. Safe to call more than once.
    pub fn stop(&mut self) {
        let mut stopped = false;
        for handle in [self.renewal_handle.take(), self.feed_handle.take()].into_iter().flatten() {
            handle.abort();
            stopped = true;
        }
        if stopped {
            info!("Event router stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.renewal_handle.is_some() || self.feed_handle.is_some()
    }

    async fn renewal_task<E: GridExchange>(exchange: Arc<E>, lease_id: String, period: Duration) {
        let mut ticker = interval_at(Instant::now() + period, period);
        loop {
            ticker.tick().await;
            match exchange.renew_lease(&lease_id).await {
                Ok(()) => debug!("Data stream lease renewed"),
                Err(e) => warn!("Lease renewal failed: {}. Will retry on next interval.", e),
            }
        }
    }

    async fn feed_task(mut events: EventStream, tx: UnboundedSender<GridMessage>) {
        let reason = loop {
            let message = match events.next().await {
                Some(Ok(StreamEvent::Ready)) => GridMessage::Begin { timestamp: Utc::now() },
                Some(Ok(StreamEvent::ExecutionReport(report))) => {
                    debug!("Forwarding report for order {} ({:?})", report.order_id, report.status);
                    GridMessage::Execution(report)
                }
                Some(Ok(StreamEvent::Other(kind))) => {
                    debug!("Dropping {} event", kind);
                    continue;
                }
                Some(Ok(StreamEvent::LeaseExpired { lease_id })) => break format!("lease {lease_id} expired"),
                Some(Err(e)) => break format!("feed error: {e}"),
                None => break "feed ended".to_string(),
            };

            if tx.send(message).is_err() {
                debug!("Engine no longer listening, feed task exiting");
                return;
            }
        };

        error!("Event feed closed: {}", reason);
        let _ = tx.send(GridMessage::FeedClosed(reason));
    }
}

impl Drop for EventRouter {
    fn drop(&mut self) {
        self.stop();
    }
}
