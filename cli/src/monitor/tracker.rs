use thiserror::Error;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tracing::{debug, info};

use tether_platform::{BatteryState, ChargeStatus, PowerError, PowerObserver, Subscription};

use crate::config::RepeatPolicy;

const STATE_CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("could not start watching the power source")]
    TrackingUnavailable(#[source] PowerError),
    #[error("tracking is not active")]
    NotTracking,
}

/// Watches charge readings coming off a power observer.
///
/// While a session is active, readings are pulled with [`next_state`],
/// deduplicated according to the configured [`RepeatPolicy`].
///
/// [`next_state`]: ChargeTracker::next_state
pub struct ChargeTracker {
    observer: Box<dyn PowerObserver>,
    repeat_policy: RepeatPolicy,
    session: Option<Session>,
}

struct Session {
    subscription: Subscription,
    states: ReceiverStream<BatteryState>,
    last_status: Option<ChargeStatus>,
}

impl ChargeTracker {
    pub fn new(observer: Box<dyn PowerObserver>, repeat_policy: RepeatPolicy) -> Self {
        Self {
            observer,
            repeat_policy,
            session: None,
        }
    }

    pub fn is_tracking(&self) -> bool {
        self.session.is_some()
    }

    /// Point-in-time answer, independent of any active session.
    pub fn is_adapter_plugged_in(&self) -> bool {
        self.observer.is_plugged_in()
    }

    /// Starts a tracking session. Calling this while one is active is a
    /// no-op.
    pub fn start_tracking(&mut self) -> Result<(), TrackerError> {
        if self.session.is_some() {
            debug!("tracking already active");
            return Ok(());
        }

        let (tx, rx) = mpsc::channel(STATE_CHANNEL_CAPACITY);
        let subscription = self
            .observer
            .subscribe(tx)
            .map_err(TrackerError::TrackingUnavailable)?;

        self.session = Some(Session {
            subscription,
            states: ReceiverStream::new(rx),
            last_status: None,
        });
        info!(policy = self.repeat_policy.label(), "tracking started");
        Ok(())
    }

    pub fn stop_tracking(&mut self) -> Result<(), TrackerError> {
        let session = self.session.take().ok_or(TrackerError::NotTracking)?;
        session.subscription.cancel();
        info!("tracking stopped");
        Ok(())
    }

    /// Next reading that survives the repeat policy, or `None` once the
    /// session is closed or its stream has ended.
    pub async fn next_state(&mut self) -> Option<BatteryState> {
        let policy = self.repeat_policy;
        let session = self.session.as_mut()?;

        while let Some(state) = session.states.next().await {
            match policy {
                RepeatPolicy::PassThroughAll => return Some(state),
                RepeatPolicy::DedupeConsecutive => {
                    if session.last_status != Some(state.status) {
                        session.last_status = Some(state.status);
                        return Some(state);
                    }
                    debug!(status = %state.status, "dropped repeated reading");
                }
            }
        }

        None
    }
}
