//! Power-source observation for tether.
//!
//! This crate provides the platform-agnostic [`PowerObserver`] trait for
//! watching adapter and charging state, the value types it emits, and
//! [`SystemPowerObserver`], the production implementation backed by
//! `starship-battery`.
//!
//! # Example
//!
//! ```ignore
//! use tether_platform::{PowerObserver, SystemPowerObserver};
//!
//! let mut observer = SystemPowerObserver::new(Duration::from_secs(1))?;
//! let (tx, mut rx) = tokio::sync::mpsc::channel(16);
//! let subscription = observer.subscribe(tx)?;
//! while let Some(state) = rx.recv().await {
//!     println!("{} (plugged: {})", state.status, observer.is_plugged_in());
//! }
//! ```

mod observer;
mod system;
mod types;

pub use observer::{PowerError, PowerObserver, Subscription};
pub use system::SystemPowerObserver;
pub use types::{BatteryState, ChargeStatus};
