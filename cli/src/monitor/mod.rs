mod alarm;
mod coordinator;
mod tracker;
mod watch;

pub use alarm::AlarmSignal;
pub use coordinator::StateCoordinator;
pub use tracker::ChargeTracker;
#[allow(unused_imports)]
pub use tracker::TrackerError;
pub use watch::run_monitor;
