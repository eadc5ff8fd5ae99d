//! Production observer backed by `starship-battery`.

use std::sync::mpsc::RecvTimeoutError;
use std::thread;
use std::time::Duration;

use starship_battery::{Battery, Manager};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::observer::{PowerError, PowerObserver, Subscription};
use crate::types::{BatteryState, ChargeStatus};

/// Polls the system battery on a background thread and emits one reading per
/// poll. Readings are raw; consecutive duplicates are expected.
pub struct SystemPowerObserver {
    manager: Manager,
    poll_interval: Duration,
}

impl SystemPowerObserver {
    /// Creates an observer polling at `poll_interval`.
    pub fn new(poll_interval: Duration) -> Result<Self, PowerError> {
        let manager = Manager::new()?;
        Ok(Self {
            manager,
            poll_interval,
        })
    }

    /// One reading taken right now, outside any subscription.
    pub fn snapshot(&self) -> BatteryState {
        BatteryState::now(self.snapshot_status())
    }

    fn snapshot_status(&self) -> ChargeStatus {
        let status = self
            .manager
            .batteries()
            .ok()
            .and_then(|mut batteries| batteries.next())
            .and_then(|battery| battery.ok())
            .map(|battery| ChargeStatus::from(battery.state()))
            .unwrap_or_default();
        refine_status(status)
    }
}

impl PowerObserver for SystemPowerObserver {
    fn is_plugged_in(&self) -> bool {
        #[cfg(target_os = "linux")]
        if let Some(online) = sysfs::ac_online() {
            return online;
        }

        // No adapter reading available; infer from the charge status.
        matches!(
            self.snapshot_status(),
            ChargeStatus::Charging | ChargeStatus::Full
        )
    }

    fn subscribe(&mut self, tx: mpsc::Sender<BatteryState>) -> Result<Subscription, PowerError> {
        // The poll thread owns its own manager; `Manager` is not shareable
        // across threads.
        let manager = Manager::new()?;
        let mut battery = manager
            .batteries()?
            .next()
            .ok_or(PowerError::Unavailable)??;

        let (stop_tx, stop_rx) = std::sync::mpsc::channel::<()>();
        let interval = self.poll_interval;

        thread::Builder::new()
            .name("tether-power-poll".into())
            .spawn(move || {
                debug!(interval_ms = interval.as_millis() as u64, "power poll started");
                // First reading goes out immediately; later ones follow the
                // poll cadence.
                loop {
                    let state = BatteryState::now(poll_status(&manager, &mut battery));
                    if tx.blocking_send(state).is_err() {
                        break;
                    }
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => continue,
                        _ => break,
                    }
                }
                debug!("power poll stopped");
            })
            .map_err(PowerError::Spawn)?;

        Ok(Subscription::new(stop_tx))
    }
}

fn poll_status(manager: &Manager, battery: &mut Battery) -> ChargeStatus {
    if let Err(e) = manager.refresh(battery) {
        warn!(error = %e, "battery refresh failed");
        return ChargeStatus::Unknown;
    }
    refine_status(ChargeStatus::from(battery.state()))
}

/// Some kernels report "Not charging" as a status the battery crate maps to
/// `Unknown`; the raw sysfs string disambiguates.
fn refine_status(status: ChargeStatus) -> ChargeStatus {
    #[cfg(target_os = "linux")]
    if status == ChargeStatus::Unknown {
        if let Some(raw) = sysfs::battery_status() {
            if raw.eq_ignore_ascii_case("not charging") {
                return ChargeStatus::NotCharging;
            }
        }
    }
    status
}

#[cfg(target_os = "linux")]
mod sysfs {
    use std::fs;
    use std::path::Path;

    const POWER_SUPPLY_PATH: &str = "/sys/class/power_supply";

    /// Whether any mains adapter reports online. `None` when sysfs exposes
    /// no adapter entry at all.
    pub fn ac_online() -> Option<bool> {
        let root = Path::new(POWER_SUPPLY_PATH);
        if !root.exists() {
            return None;
        }

        let mut mains_seen = false;
        if let Ok(entries) = fs::read_dir(root) {
            for entry in entries.flatten() {
                let path = entry.path();
                if let Ok(kind) = fs::read_to_string(path.join("type")) {
                    if kind.trim() == "Mains" {
                        mains_seen = true;
                        if let Ok(online) = fs::read_to_string(path.join("online")) {
                            if online.trim() == "1" {
                                return Some(true);
                            }
                        }
                    }
                }
            }
        }

        if mains_seen {
            Some(false)
        } else {
            None
        }
    }

    /// Raw status string of the first battery, if any.
    pub fn battery_status() -> Option<String> {
        let root = Path::new(POWER_SUPPLY_PATH);
        if let Ok(entries) = fs::read_dir(root) {
            for entry in entries.flatten() {
                let path = entry.path();
                if let Ok(kind) = fs::read_to_string(path.join("type")) {
                    if kind.trim() == "Battery" {
                        return fs::read_to_string(path.join("status"))
                            .ok()
                            .map(|s| s.trim().to_string());
                    }
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[ignore = "Requires battery hardware"]
    fn test_observer_snapshot() {
        let observer = SystemPowerObserver::new(Duration::from_millis(100)).unwrap();
        // Just exercise the snapshot paths; the value depends on the host.
        let _ = observer.is_plugged_in();
        let _ = observer.snapshot();
    }

    #[tokio::test]
    #[ignore = "Requires battery hardware"]
    async fn test_observer_delivers_readings() {
        let mut observer = SystemPowerObserver::new(Duration::from_millis(50)).unwrap();
        let (tx, mut rx) = mpsc::channel(4);
        let subscription = observer.subscribe(tx).unwrap();

        let first = rx.recv().await.expect("expected an immediate reading");
        assert!(first.timestamp <= chrono::Utc::now());

        subscription.cancel();
    }
}
