use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, warn};

use crate::sound::{PulsePlayer, SoundAsset};

/// Interval between pulses when the installed sound has no probed duration.
const DEFAULT_PULSE_INTERVAL: Duration = Duration::from_secs(1);

/// Repeating audible alarm.
///
/// While on, a pulse plays immediately and then again every interval. The
/// interval is the installed sound's duration when known, one second
/// otherwise, so pulses ring back to back.
pub struct AlarmSignal {
    player: Arc<dyn PulsePlayer>,
    asset: Option<Arc<SoundAsset>>,
    task: Option<JoinHandle<()>>,
}

impl AlarmSignal {
    pub fn new(player: Arc<dyn PulsePlayer>) -> Self {
        Self {
            player,
            asset: None,
            task: None,
        }
    }

    pub fn has_asset(&self) -> bool {
        self.asset.is_some()
    }

    pub fn asset_name(&self) -> Option<String> {
        self.asset.as_ref().map(|a| a.file_name())
    }

    /// Installs or clears the custom sound. A ringing alarm restarts so the
    /// new cadence takes over right away.
    pub fn set_asset(&mut self, asset: Option<SoundAsset>) {
        self.asset = asset.map(Arc::new);
        if self.is_playing() {
            self.stop();
            self.start();
        }
    }

    /// Turns the alarm on or off. Signalling `true` while already ringing
    /// restarts the pulse cycle from now; `false` also silences a pulse
    /// still sounding.
    pub fn signal(&mut self, on: bool) {
        if on {
            if self.is_playing() {
                self.stop();
            }
            self.start();
        } else {
            self.stop();
        }
    }

    pub fn is_playing(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    fn start(&mut self) {
        let period = self
            .asset
            .as_ref()
            .and_then(|a| a.duration())
            .filter(|d| !d.is_zero())
            .unwrap_or(DEFAULT_PULSE_INTERVAL);
        let player = Arc::clone(&self.player);
        let asset = self.asset.clone();

        debug!(period_ms = period.as_millis() as u64, "alarm on");
        self.task = Some(tokio::spawn(async move {
            let mut tick = time::interval(period);
            tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tick.tick().await;
                if let Err(e) = player.play(asset.as_deref()).await {
                    warn!(error = %e, "alarm pulse failed");
                }
            }
        }));
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            // Aborting only cancels the schedule; the player silences a
            // pulse already handed to it.
            self.player.stop();
            debug!("alarm off");
        }
    }
}

impl Drop for AlarmSignal {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    use crate::sound::PlaybackError;

    struct CountingPlayer {
        pulses: Arc<AtomicUsize>,
        stops: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl PulsePlayer for CountingPlayer {
        async fn play(&self, _asset: Option<&SoundAsset>) -> Result<(), PlaybackError> {
            self.pulses.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn stop(&self) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn counting_alarm() -> (AlarmSignal, Arc<AtomicUsize>) {
        let pulses = Arc::new(AtomicUsize::new(0));
        let player = CountingPlayer {
            pulses: Arc::clone(&pulses),
            stops: Arc::new(AtomicUsize::new(0)),
        };
        (AlarmSignal::new(Arc::new(player)), pulses)
    }

    /// Lets the spawned pulse task observe the clock.
    async fn settle() {
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn first_pulse_fires_immediately() {
        let (mut alarm, pulses) = counting_alarm();
        alarm.signal(true);
        settle().await;
        assert_eq!(pulses.load(Ordering::SeqCst), 1);
        assert!(alarm.is_playing());
    }

    #[tokio::test(start_paused = true)]
    async fn default_cadence_is_one_second() {
        let (mut alarm, pulses) = counting_alarm();
        alarm.signal(true);
        settle().await;
        assert_eq!(pulses.load(Ordering::SeqCst), 1);

        time::advance(Duration::from_millis(500)).await;
        settle().await;
        assert_eq!(pulses.load(Ordering::SeqCst), 1);

        time::advance(Duration::from_millis(500)).await;
        settle().await;
        assert_eq!(pulses.load(Ordering::SeqCst), 2);

        time::advance(Duration::from_secs(1)).await;
        settle().await;
        assert_eq!(pulses.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn asset_duration_drives_the_cadence() {
        let (mut alarm, pulses) = counting_alarm();
        let asset = SoundAsset::with_duration("long.wav", Some(Duration::from_secs(3)));
        alarm.set_asset(Some(asset));
        assert!(!alarm.is_playing());
        assert_eq!(pulses.load(Ordering::SeqCst), 0);

        alarm.signal(true);
        settle().await;
        assert_eq!(pulses.load(Ordering::SeqCst), 1);

        time::advance(Duration::from_secs(1)).await;
        settle().await;
        assert_eq!(pulses.load(Ordering::SeqCst), 1);

        time::advance(Duration::from_secs(2)).await;
        settle().await;
        assert_eq!(pulses.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn set_asset_while_ringing_restarts_the_cycle() {
        let (mut alarm, pulses) = counting_alarm();
        alarm.signal(true);
        settle().await;
        assert_eq!(pulses.load(Ordering::SeqCst), 1);

        time::advance(Duration::from_millis(500)).await;
        settle().await;

        let asset = SoundAsset::with_duration("long.wav", Some(Duration::from_secs(3)));
        alarm.set_asset(Some(asset));
        settle().await;
        assert_eq!(pulses.load(Ordering::SeqCst), 2);

        // The old one-second schedule is gone.
        time::advance(Duration::from_secs(1)).await;
        settle().await;
        assert_eq!(pulses.load(Ordering::SeqCst), 2);

        time::advance(Duration::from_secs(2)).await;
        settle().await;
        assert_eq!(pulses.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_swaps_keep_a_single_schedule() {
        let (mut alarm, pulses) = counting_alarm();
        alarm.signal(true);
        settle().await;

        for (name, secs) in [("a.wav", 3), ("b.wav", 2), ("c.wav", 4)] {
            let asset = SoundAsset::with_duration(name, Some(Duration::from_secs(secs)));
            alarm.set_asset(Some(asset));
            settle().await;
        }
        // One immediate pulse per restart, nothing stacked beyond that.
        assert_eq!(pulses.load(Ordering::SeqCst), 4);

        // Earlier cadences would have fired by now.
        time::advance(Duration::from_secs(3)).await;
        settle().await;
        assert_eq!(pulses.load(Ordering::SeqCst), 4);

        time::advance(Duration::from_secs(1)).await;
        settle().await;
        assert_eq!(pulses.load(Ordering::SeqCst), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn signal_true_while_ringing_reanchors_the_cadence() {
        let (mut alarm, pulses) = counting_alarm();
        alarm.signal(true);
        settle().await;
        assert_eq!(pulses.load(Ordering::SeqCst), 1);

        time::advance(Duration::from_millis(600)).await;
        settle().await;
        assert_eq!(pulses.load(Ordering::SeqCst), 1);

        alarm.signal(true);
        settle().await;
        assert_eq!(pulses.load(Ordering::SeqCst), 2);

        // The original schedule would have fired here.
        time::advance(Duration::from_millis(400)).await;
        settle().await;
        assert_eq!(pulses.load(Ordering::SeqCst), 2);

        time::advance(Duration::from_millis(600)).await;
        settle().await;
        assert_eq!(pulses.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn signal_false_stops_pulsing() {
        let (mut alarm, pulses) = counting_alarm();
        alarm.signal(true);
        settle().await;
        assert_eq!(pulses.load(Ordering::SeqCst), 1);

        alarm.signal(false);
        assert!(!alarm.is_playing());

        time::advance(Duration::from_secs(5)).await;
        settle().await;
        assert_eq!(pulses.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn signal_false_silences_the_player() {
        let pulses = Arc::new(AtomicUsize::new(0));
        let stops = Arc::new(AtomicUsize::new(0));
        let player = CountingPlayer {
            pulses: Arc::clone(&pulses),
            stops: Arc::clone(&stops),
        };
        let mut alarm = AlarmSignal::new(Arc::new(player));

        alarm.signal(true);
        settle().await;
        assert_eq!(pulses.load(Ordering::SeqCst), 1);
        assert_eq!(stops.load(Ordering::SeqCst), 0);

        // The player is told to cut a pulse already sounding.
        alarm.signal(false);
        assert_eq!(stops.load(Ordering::SeqCst), 1);

        // A quiet alarm has nothing left to silence.
        alarm.signal(false);
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn signal_false_when_quiet_is_a_noop() {
        let (mut alarm, pulses) = counting_alarm();
        alarm.signal(false);
        assert!(!alarm.is_playing());
        assert_eq!(pulses.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn drop_aborts_the_pulse_task() {
        let (mut alarm, pulses) = counting_alarm();
        alarm.signal(true);
        settle().await;
        assert_eq!(pulses.load(Ordering::SeqCst), 1);

        drop(alarm);
        time::advance(Duration::from_secs(5)).await;
        settle().await;
        assert_eq!(pulses.load(Ordering::SeqCst), 1);
    }
}
