//! Shared types for power-source observation.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Battery charging status.
///
/// Deliberately coarser than what the OS reports: the monitor only needs to
/// know whether the battery is taking charge. Whether external power is
/// connected is a separate signal, sampled through
/// [`PowerObserver::is_plugged_in`](crate::PowerObserver::is_plugged_in).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChargeStatus {
    /// Battery is actively charging
    Charging,
    /// Battery is not taking charge (draining, or held at a charge limit)
    NotCharging,
    /// Battery is full
    Full,
    /// Status cannot be determined
    #[default]
    Unknown,
}

impl ChargeStatus {
    /// Returns a human-readable label for the charge status.
    pub fn label(&self) -> &'static str {
        match self {
            ChargeStatus::Charging => "Charging",
            ChargeStatus::NotCharging => "Not Charging",
            ChargeStatus::Full => "Full",
            ChargeStatus::Unknown => "Unknown",
        }
    }

    /// Returns true if the battery is currently charging.
    pub fn is_charging(&self) -> bool {
        matches!(self, ChargeStatus::Charging)
    }
}

impl fmt::Display for ChargeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl From<starship_battery::State> for ChargeStatus {
    fn from(state: starship_battery::State) -> Self {
        match state {
            starship_battery::State::Charging => ChargeStatus::Charging,
            starship_battery::State::Discharging => ChargeStatus::NotCharging,
            starship_battery::State::Empty => ChargeStatus::NotCharging,
            starship_battery::State::Full => ChargeStatus::Full,
            starship_battery::State::Unknown => ChargeStatus::Unknown,
        }
    }
}

/// One observed battery reading.
///
/// Immutable once produced; observers emit these into a channel and never
/// touch them again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatteryState {
    /// Charging status at the time of the reading.
    pub status: ChargeStatus,
    /// When the reading was taken.
    pub timestamp: DateTime<Utc>,
}

impl BatteryState {
    /// Creates a reading stamped with the current time.
    pub fn now(status: ChargeStatus) -> Self {
        Self {
            status,
            timestamp: Utc::now(),
        }
    }
}
