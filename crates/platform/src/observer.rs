//! Power-source observation traits and types.

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::trace;

use crate::types::BatteryState;

/// Errors from the power-observation layer.
#[derive(Debug, Error)]
pub enum PowerError {
    /// No battery is present to watch.
    #[error("no battery available to watch")]
    Unavailable,

    /// The underlying battery subsystem failed.
    #[error("battery subsystem error: {0}")]
    Battery(#[from] starship_battery::Error),

    /// The poll thread could not be started.
    #[error("failed to spawn poll thread")]
    Spawn(#[source] std::io::Error),
}

/// Source of power-state readings.
///
/// Implementations deliver [`BatteryState`] values into a channel handed to
/// [`subscribe`](PowerObserver::subscribe); the returned [`Subscription`]
/// keeps delivery alive. Readings are raw: duplicates are the consumer's
/// problem.
pub trait PowerObserver {
    /// Whether external power is connected right now.
    ///
    /// A synchronous snapshot; never waits on the reading stream.
    fn is_plugged_in(&self) -> bool;

    /// Starts delivering readings into `tx`.
    ///
    /// Delivery stops when the returned handle is cancelled or dropped, or
    /// when the receiving side of `tx` goes away.
    fn subscribe(&mut self, tx: mpsc::Sender<BatteryState>) -> Result<Subscription, PowerError>;
}

/// Handle to an active observation.
///
/// Dropping the handle stops delivery; [`cancel`](Subscription::cancel) does
/// the same with intent spelled out.
#[derive(Debug)]
pub struct Subscription {
    // Disconnecting this channel wakes the producer and ends it.
    _stop: std::sync::mpsc::Sender<()>,
}

impl Subscription {
    /// Builds a handle from the stop side of a control channel.
    ///
    /// The producer should end delivery once the channel disconnects.
    pub fn new(stop: std::sync::mpsc::Sender<()>) -> Self {
        Self { _stop: stop }
    }

    /// Stops delivery for this subscription.
    pub fn cancel(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        trace!("power subscription closed");
    }
}
