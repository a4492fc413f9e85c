//! Timer-driven producer of expiration sweeps.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tracing::debug;

use super::request::DatasetRequest;

/// Posts a `Remove`-kind request to the coordinator every `interval`.
///
/// Expiration stays a plain request on the coordinator's input channel, so
/// the coordinator remains the only writer. Stops cooperatively at the next
/// tick after the stop signal fires, or when the coordinator is gone.
pub struct ExpirationSweeper {
    interval: Duration,
    input: mpsc::Sender<DatasetRequest>,
}

impl ExpirationSweeper {
    pub fn new(interval: Duration, input: mpsc::Sender<DatasetRequest>) -> Self {
        Self { interval, input }
    }

    pub async fn run(self, mut stop: oneshot::Receiver<()>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; the sweep cadence starts one
        // full interval from now.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if self.input.send(DatasetRequest::sweep()).await.is_err() {
                        debug!("coordinator gone, stopping expiration sweeper");
                        break;
                    }
                }
                _ = &mut stop => {
                    debug!("expiration sweeper stopped");
                    break;
                }
            }
        }
    }
}
