use std::path::Path;
use std::time::Duration;

use tracing::{debug, info, warn};

use tether_platform::{BatteryState, ChargeStatus};

use crate::chooser::SoundChooser;
use crate::monitor::alarm::AlarmSignal;
use crate::monitor::tracker::ChargeTracker;
use crate::notify::{NotificationGateway, Push};
use crate::sound::{SoundAsset, SoundStore};

const SELECTION_SUCCESS_DELAY: Duration = Duration::from_millis(1500);
const SELECTION_FAILURE_DELAY: Duration = Duration::from_secs(2);

/// Ties the tracker, the alarm, the sound slot and the notification
/// gateway together and owns the three user-visible flags: tracking on,
/// alarm ringing, custom sound installed.
///
/// Failures surface as desktop notifications and log lines, never as
/// crashes.
pub struct StateCoordinator {
    tracker: ChargeTracker,
    alarm: AlarmSignal,
    store: SoundStore,
    gateway: Box<dyn NotificationGateway>,
    chooser: Box<dyn SoundChooser>,
    tracking: bool,
    has_custom_sound: bool,
}

impl StateCoordinator {
    pub fn new(
        tracker: ChargeTracker,
        alarm: AlarmSignal,
        store: SoundStore,
        gateway: Box<dyn NotificationGateway>,
        chooser: Box<dyn SoundChooser>,
    ) -> Self {
        let mut coordinator = Self {
            tracker,
            alarm,
            store,
            gateway,
            chooser,
            tracking: false,
            has_custom_sound: false,
        };
        coordinator.restore_stored_sound();
        coordinator
    }

    pub fn is_tracking(&self) -> bool {
        self.tracking
    }

    pub fn is_alarm_on(&self) -> bool {
        self.alarm.is_playing()
    }

    pub fn has_custom_sound(&self) -> bool {
        self.has_custom_sound
    }

    pub fn sound_name(&self) -> Option<String> {
        self.alarm.asset_name()
    }

    pub fn request_permission(&self) {
        if let Err(e) = self.gateway.request_permission() {
            warn!(error = %e, "notification permission not granted");
        }
    }

    /// Turns tracking on or off. A start that fails leaves tracking off
    /// and tells the user; stopping twice is harmless.
    pub fn set_tracking(&mut self, on: bool) {
        if on {
            match self.tracker.start_tracking() {
                Ok(()) => {
                    self.tracking = true;
                }
                Err(e) => {
                    warn!(error = %e, "tracking failed to start");
                    self.tracking = false;
                    self.alarm.signal(false);
                    self.notify(
                        Push::new("Tracking failed!")
                            .subtitle("Something went wrong")
                            .sound("dialog-warning"),
                    );
                }
            }
        } else {
            if let Err(e) = self.tracker.stop_tracking() {
                debug!(error = %e, "stop tracking skipped");
            }
            self.alarm.signal(false);
            self.tracking = false;
        }
    }

    /// Next deduplicated reading, or `None` while tracking is off.
    pub async fn next_state(&mut self) -> Option<BatteryState> {
        self.tracker.next_state().await
    }

    /// Applies one reading to the alarm.
    ///
    /// Plugging in silences a ringing alarm no matter what the reported
    /// status says. Running unplugged while not charging raises it. Any
    /// other combination leaves the alarm as it is, so an alarm raised
    /// earlier keeps ringing until power comes back.
    pub fn handle_state(&mut self, state: BatteryState) {
        let plugged = self.tracker.is_adapter_plugged_in();
        let not_charging = state.status == ChargeStatus::NotCharging;
        debug!(status = %state.status, plugged, "reading");

        if plugged && self.alarm.is_playing() {
            self.alarm.signal(false);
        }
        if !plugged && not_charging {
            self.alarm.signal(true);
        }
    }

    /// Asks the chooser for a sound file and installs the pick. A dismissed
    /// chooser is not an error.
    pub fn select_sound(&mut self) {
        match self.chooser.choose() {
            Ok(Some(path)) => self.install_sound(&path),
            Ok(None) => debug!("sound selection dismissed"),
            Err(e) => {
                warn!(error = %e, "sound selection failed");
                self.clear_flag_unless_armed();
                self.notify(selection_failed_push());
            }
        }
    }

    /// Installs the sound at `path` directly, skipping the chooser.
    pub fn set_sound_from(&mut self, path: &Path) {
        self.install_sound(path);
    }

    /// Drops the custom sound and falls back to the built-in tone.
    pub fn reset_sound(&mut self) {
        self.store.reset();
        self.alarm.set_asset(None);
        self.has_custom_sound = false;
        info!("custom sound reset");
    }

    pub fn shutdown(&mut self) {
        self.set_tracking(false);
    }

    fn install_sound(&mut self, path: &Path) {
        let asset = match SoundAsset::load(path) {
            Ok(asset) => asset,
            Err(e) => {
                warn!(error = %e, path = %path.display(), "selected sound did not load");
                self.clear_flag_unless_armed();
                self.notify(selection_failed_push());
                return;
            }
        };

        // The alarm rings with the new sound even if persisting it fails
        // below.
        self.alarm.set_asset(Some(asset));

        match self.store.save(path) {
            Ok(target) => {
                self.has_custom_sound = true;
                info!(target = %target.display(), "custom sound selected");
                self.notify(
                    Push::new("Successfully selected!")
                        .subtitle("Your custom sound is ready.")
                        .after(SELECTION_SUCCESS_DELAY),
                );
            }
            Err(e) => {
                warn!(error = %e, "selected sound was not saved");
                self.clear_flag_unless_armed();
                self.notify(
                    Push::new("Cant save selected sound!")
                        .subtitle("File may be corrupted or not accessible.")
                        .sound("dialog-warning")
                        .after(SELECTION_FAILURE_DELAY),
                );
            }
        }
    }

    /// The custom-sound flag survives a failure as long as the alarm still
    /// holds a playable asset.
    fn clear_flag_unless_armed(&mut self) {
        if !self.alarm.has_asset() {
            self.has_custom_sound = false;
        }
    }

    fn restore_stored_sound(&mut self) {
        let Some(path) = self.store.stored_path() else {
            return;
        };
        match SoundAsset::load(&path) {
            Ok(asset) => {
                info!(sound = %asset.file_name(), "restored custom sound");
                self.alarm.set_asset(Some(asset));
            }
            Err(e) => {
                warn!(error = %e, path = %path.display(), "stored sound did not load");
            }
        }
        // A file in the slot means the user picked a sound, playable or not.
        self.has_custom_sound = true;
    }

    fn notify(&self, push: Push) {
        if let Err(e) = self.gateway.send(push) {
            warn!(error = %e, "notification was not delivered");
        }
    }
}

fn selection_failed_push() -> Push {
    Push::new("Selection failed!")
        .subtitle("File may be corrupted or not accessible.")
        .sound("dialog-warning")
        .after(SELECTION_FAILURE_DELAY)
}
