//! Async event watching.
//!
//! `WaitForEvent` blocks its thread with no timeout. [`EventWatcher`] moves
//! a [`PiControl`] onto a blocking task that waits in a loop and forwards
//! each event over a channel.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::control::{DriverEvent, PiControl};
use crate::error::Result;
use crate::transport::Driver;

const CHANNEL_CAPACITY: usize = 16;

/// Stream of driver events fed by a blocking task.
///
/// Dropping the watcher stops delivery, but the blocking task only notices
/// once the driver wakes it for the next event.
pub struct EventWatcher<D: Driver> {
    rx: mpsc::Receiver<Result<DriverEvent>>,
    task: JoinHandle<PiControl<D>>,
}

impl<D> EventWatcher<D>
where
    D: Driver + Send + 'static,
{
    /// Starts waiting on `control`. Must be called inside a Tokio runtime.
    pub fn spawn(mut control: PiControl<D>) -> Self {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);

        let task = tokio::task::spawn_blocking(move || {
            loop {
                match control.wait_for_event() {
                    Ok(event) => {
                        debug!(?event, "driver event");
                        if tx.blocking_send(Ok(event)).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "waiting for driver events stopped");
                        let _ = tx.blocking_send(Err(e));
                        break;
                    }
                }
            }
            control
        });

        Self { rx, task }
    }

    /// Next event, or `None` once the watcher has stopped.
    ///
    /// A failed wait is delivered once as `Err` and ends the stream.
    pub async fn next(&mut self) -> Option<Result<DriverEvent>> {
        self.rx.recv().await
    }

    /// Waits for the blocking task to stop and hands the client back.
    ///
    /// Returns `None` if the task panicked.
    pub async fn finish(self) -> Option<PiControl<D>> {
        drop(self.rx);
        self.task.await.ok()
    }
}
